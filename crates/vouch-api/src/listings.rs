use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{error, warn};
use uuid::Uuid;

use vouch_db::models::{ListingRow, NewListing};
use vouch_types::api::{Claims, CreateListingRequest, ListingResponse, UpdateListingStatusRequest};
use vouch_types::models::ListingStatus;

use crate::auth::AppStateInner;
use crate::util::{parse_sqlite_timestamp, parse_uuid};
use crate::{ApiError, api_error};

pub(crate) fn listing_response(row: ListingRow) -> ListingResponse {
    let status = ListingStatus::parse(&row.status).unwrap_or_else(|| {
        warn!("Unknown status '{}' on listing '{}'", row.status, row.id);
        ListingStatus::Published
    });

    ListingResponse {
        id: parse_uuid(&row.id, "listing id"),
        seller_id: parse_uuid(&row.seller_id, "seller id"),
        seller_name: row.seller_name,
        title: row.title,
        description: row.description,
        price_cents: row.price_cents,
        brand: row.brand,
        category: row.category,
        condition: row.condition,
        retail_price_cents: row.retail_price_cents,
        status,
        created_at: parse_sqlite_timestamp(&row.created_at),
    }
}

pub async fn create_listing(
    State(state): State<Arc<AppStateInner>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateListingRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let title = req.title.trim().to_string();
    let description = req.description.trim().to_string();

    if title.is_empty() || description.is_empty() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "Title and description are required.",
        ));
    }
    if req.price_cents <= 0 {
        return Err(api_error(StatusCode::BAD_REQUEST, "Price must be positive."));
    }

    let status = if req.draft {
        ListingStatus::Draft
    } else {
        ListingStatus::Published
    };

    let listing_id = Uuid::new_v4();
    let seller_id = claims.sub.to_string();

    let db = state.clone();
    let row = tokio::task::spawn_blocking(move || {
        let id = listing_id.to_string();
        db.db.insert_listing(&NewListing {
            id: &id,
            seller_id: &seller_id,
            title: &title,
            description: &description,
            price_cents: req.price_cents,
            brand: req.brand.as_deref(),
            category: req.category.as_deref(),
            condition: req.condition.as_deref(),
            retail_price_cents: req.retail_price_cents,
            status: status.as_str(),
        })?;
        db.db
            .get_listing(&id)?
            .ok_or_else(|| anyhow::anyhow!("Listing vanished after insert: {}", id))
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong.")
    })?
    .map_err(|e| {
        error!("Listing creation failed: {}", e);
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong.")
    })?;

    Ok((StatusCode::CREATED, Json(listing_response(row))))
}

pub async fn my_listings(
    State(state): State<Arc<AppStateInner>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.clone();
    let seller_id = claims.sub.to_string();

    let rows = tokio::task::spawn_blocking(move || db.db.listings_for_seller(&seller_id))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let listings: Vec<ListingResponse> = rows.into_iter().map(listing_response).collect();
    Ok(Json(listings))
}

/// Listing detail. Owners see any status; everyone else sees only
/// published listings from sellers within two hops. Everything outside
/// that is a 404, so the listing's existence is not revealed.
pub async fn get_listing(
    State(state): State<Arc<AppStateInner>>,
    Path(listing_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.clone();
    let viewer_id = claims.sub;

    let row = tokio::task::spawn_blocking(move || {
        let row = db
            .db
            .get_listing(&listing_id.to_string())
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
            .ok_or(StatusCode::NOT_FOUND)?;

        if row.seller_id != viewer_id.to_string() {
            let seller_id: Uuid = row
                .seller_id
                .parse()
                .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
            let verdict = vouch_graph::evaluate(&db.db, viewer_id, seller_id)
                .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
            if !verdict.allowed || row.status != "published" {
                return Err(StatusCode::NOT_FOUND);
            }
        }

        Ok(row)
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })??;

    Ok(Json(listing_response(row)))
}

pub async fn update_listing_status(
    State(state): State<Arc<AppStateInner>>,
    Path(listing_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateListingStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.status == ListingStatus::Reserved {
        return Err(api_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "Listings are reserved by placing an order, not directly.",
        ));
    }

    let db = state.clone();
    let seller_id = claims.sub.to_string();

    let updated = tokio::task::spawn_blocking(move || {
        db.db
            .update_listing_status(&seller_id, &listing_id.to_string(), req.status)
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong.")
    })?
    .map_err(|_| api_error(StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong."))?;

    if !updated {
        return Err(api_error(
            StatusCode::NOT_FOUND,
            "No such listing, or it cannot change status right now.",
        ));
    }

    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_listing(
    State(state): State<Arc<AppStateInner>>,
    Path(listing_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.clone();
    let seller_id = claims.sub.to_string();

    let deleted = tokio::task::spawn_blocking(move || {
        db.db.delete_listing(&seller_id, &listing_id.to_string())
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    if !deleted {
        return Err(StatusCode::NOT_FOUND);
    }

    Ok(StatusCode::NO_CONTENT)
}
