use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use tracing::{error, info};
use uuid::Uuid;

use vouch_types::api::{AddConnectionRequest, Claims, ConnectionPeer, EligibilityResponse};
use vouch_types::models::EdgeOrigin;

use crate::auth::AppStateInner;
use crate::util::parse_uuid;

pub async fn list_connections(
    State(state): State<Arc<AppStateInner>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.clone();
    let user_id = claims.sub.to_string();

    let rows = tokio::task::spawn_blocking(move || db.db.friends_with_names(&user_id))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let peers: Vec<ConnectionPeer> = rows
        .into_iter()
        .map(|(id, display_name)| ConnectionPeer {
            id: parse_uuid(&id, "friend id"),
            display_name,
        })
        .collect();

    Ok(Json(peers))
}

/// Manual edge between two existing users, bypassing invite redemption.
/// Guarded by the shared admin token; disabled entirely when no token is
/// configured.
pub async fn add_connection(
    State(state): State<Arc<AppStateInner>>,
    headers: HeaderMap,
    Json(req): Json<AddConnectionRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let expected = state.admin_token.as_deref().ok_or(StatusCode::FORBIDDEN)?;
    let provided = headers
        .get("x-admin-token")
        .and_then(|v| v.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;
    if provided != expected {
        return Err(StatusCode::UNAUTHORIZED);
    }

    if req.user_id == req.friend_id {
        return Err(StatusCode::BAD_REQUEST);
    }

    let db = state.clone();
    let a = req.user_id.to_string();
    let b = req.friend_id.to_string();

    tokio::task::spawn_blocking(move || {
        for id in [&a, &b] {
            if db
                .db
                .get_user_by_id(id)
                .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
                .is_none()
            {
                return Err(StatusCode::NOT_FOUND);
            }
        }

        db.db
            .add_connection(&a, &b, EdgeOrigin::Manual)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })??;

    info!("Manual connection added: {} <-> {}", req.user_id, req.friend_id);
    Ok(StatusCode::NO_CONTENT)
}

/// The evaluator verdict for the caller against one seller, as consumed
/// by listing detail surfaces.
pub async fn check_eligibility(
    State(state): State<Arc<AppStateInner>>,
    Path(seller_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.clone();
    let buyer_id = claims.sub;

    let verdict = tokio::task::spawn_blocking(move || {
        vouch_graph::evaluate(&db.db, buyer_id, seller_id)
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(EligibilityResponse {
        seller_id,
        allowed: verdict.allowed,
        relation: verdict.relation,
    }))
}
