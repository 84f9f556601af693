use std::sync::Arc;

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::error;

use vouch_types::api::{Claims, InvitedUser, ProfileResponse};

use crate::auth::AppStateInner;
use crate::util::{parse_sqlite_timestamp, parse_uuid};

pub async fn me(
    State(state): State<Arc<AppStateInner>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.clone();
    let user_id = claims.sub.to_string();

    let (user, inviter_name, invited) = tokio::task::spawn_blocking(move || {
        let user = db
            .db
            .get_user_by_id(&user_id)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
            .ok_or(StatusCode::NOT_FOUND)?;

        let inviter_name = match &user.invited_by {
            Some(inviter_id) => db
                .db
                .get_user_by_id(inviter_id)
                .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
                .map(|u| u.display_name),
            None => None,
        };

        let invited = db
            .db
            .users_invited_by(&user.id)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

        Ok::<_, StatusCode>((user, inviter_name, invited))
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })??;

    Ok(Json(ProfileResponse {
        id: claims.sub,
        email: user.email,
        display_name: user.display_name,
        first_name: user.first_name,
        last_name: user.last_name,
        phone: user.phone,
        invited_by: inviter_name,
        invited_users: invited
            .into_iter()
            .map(|u| InvitedUser {
                id: parse_uuid(&u.id, "user id"),
                display_name: u.display_name,
            })
            .collect(),
        created_at: parse_sqlite_timestamp(&user.created_at),
    }))
}
