use std::sync::Arc;

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::error;

use vouch_graph::{Relation, reachable_within_two_hops};
use vouch_types::api::{Claims, FeedItem};

use crate::auth::AppStateInner;
use crate::listings::listing_response;
use crate::util::parse_uuid;

/// The friends feed: published listings from every seller within two
/// hops of the viewer, newest first, each annotated with the relation
/// that admitted it. One closure computation per request instead of a
/// graph walk per listing.
pub async fn get_feed(
    State(state): State<Arc<AppStateInner>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.clone();
    let viewer_id = claims.sub;

    let (reach, rows) = tokio::task::spawn_blocking(move || {
        let reach = reachable_within_two_hops(&db.db, viewer_id)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

        // Own listings live under /listings/mine, not in the feed.
        let seller_ids: Vec<String> = reach
            .iter()
            .filter(|(_, relation)| relation.tradeable())
            .map(|(id, _)| id.to_string())
            .collect();

        let rows = db
            .db
            .published_listings_by_sellers(&seller_ids)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

        Ok::<_, StatusCode>((reach, rows))
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })??;

    let items: Vec<FeedItem> = rows
        .into_iter()
        .map(|row| {
            let seller_id = parse_uuid(&row.seller_id, "seller id");
            let relation = reach.get(&seller_id).copied().unwrap_or(Relation::None);
            FeedItem {
                relation,
                listing: listing_response(row),
            }
        })
        .collect();

    Ok(Json(items))
}
