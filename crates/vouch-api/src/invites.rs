use std::sync::Arc;

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::error;

use vouch_types::api::{Claims, InviteResponse, InviteSummary};

use crate::auth::AppStateInner;
use crate::util::parse_sqlite_timestamp;

pub async fn create_invite(
    State(state): State<Arc<AppStateInner>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.clone();
    let inviter_id = claims.sub.to_string();

    let code = tokio::task::spawn_blocking(move || db.db.create_invite(&inviter_id))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|e| {
            error!("Invite creation failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    Ok((
        StatusCode::CREATED,
        Json(InviteResponse {
            code,
            created_at: chrono::Utc::now(),
        }),
    ))
}

pub async fn list_invites(
    State(state): State<Arc<AppStateInner>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.clone();
    let inviter_id = claims.sub.to_string();

    let rows = tokio::task::spawn_blocking(move || db.db.invites_for_inviter(&inviter_id))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let invites: Vec<InviteSummary> = rows
        .into_iter()
        .map(|row| InviteSummary {
            code: row.code,
            created_at: parse_sqlite_timestamp(&row.created_at),
            joined: row.used_by.is_some(),
        })
        .collect();

    Ok(Json(invites))
}
