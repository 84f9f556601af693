use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{error, warn};
use uuid::Uuid;

use vouch_db::models::{NewOrder, OrderRow};
use vouch_types::api::{
    Claims, OrderResponse, OrderStatusUpdateRequest, PlaceOrderRequest, ShippingUpdateRequest,
};
use vouch_types::models::OrderStatus;

use crate::auth::AppStateInner;
use crate::util::{parse_sqlite_timestamp, parse_uuid};
use crate::{ApiError, api_error};

fn order_response(row: OrderRow) -> OrderResponse {
    let status = OrderStatus::parse(&row.status).unwrap_or_else(|| {
        warn!("Unknown status '{}' on order '{}'", row.status, row.id);
        OrderStatus::Pending
    });

    OrderResponse {
        id: parse_uuid(&row.id, "order id"),
        buyer_id: parse_uuid(&row.buyer_id, "buyer id"),
        seller_id: parse_uuid(&row.seller_id, "seller id"),
        listing_id: parse_uuid(&row.listing_id, "listing id"),
        listing_title: row.listing_title,
        status,
        total_cents: row.total_cents,
        shipping_name: row.shipping_name,
        shipping_address1: row.shipping_address1,
        shipping_address2: row.shipping_address2,
        shipping_city: row.shipping_city,
        shipping_state: row.shipping_state,
        shipping_postal_code: row.shipping_postal_code,
        shipping_country: row.shipping_country,
        shipping_phone: row.shipping_phone,
        payment_method: row.payment_method,
        buyer_note: row.buyer_note,
        tracking_number: row.tracking_number,
        carrier: row.carrier,
        created_at: parse_sqlite_timestamp(&row.created_at),
        updated_at: parse_sqlite_timestamp(&row.updated_at),
    }
}

struct Shipping {
    name: String,
    address1: String,
    address2: Option<String>,
    city: String,
    state: String,
    postal_code: String,
    country: String,
    phone: String,
}

/// US/Canada shipping rules, matching the checkout form: 5-digit ZIPs,
/// 6-character Canadian postal codes, 10-digit phones normalized to
/// "(415) 555-1234".
fn validate_shipping(req: &PlaceOrderRequest) -> Result<Shipping, ApiError> {
    let name = req.shipping_name.trim();
    let address1 = req.shipping_address1.trim();
    let city = req.shipping_city.trim();
    if name.is_empty() || address1.is_empty() || city.is_empty() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "Full name, address line 1, and city are required.",
        ));
    }

    let country = req.shipping_country.trim();
    let postal: String = req
        .shipping_postal_code
        .trim()
        .to_uppercase()
        .replace(' ', "");
    match country {
        "United States" => {
            if postal.len() != 5 || !postal.chars().all(|c| c.is_ascii_digit()) {
                return Err(api_error(
                    StatusCode::BAD_REQUEST,
                    "For US addresses, ZIP code must be exactly 5 digits.",
                ));
            }
        }
        "Canada" => {
            if postal.len() != 6 || !postal.chars().all(|c| c.is_ascii_alphanumeric()) {
                return Err(api_error(
                    StatusCode::BAD_REQUEST,
                    "For Canada, postal code should be 6 characters (e.g., A1A1A1).",
                ));
            }
        }
        _ => {
            return Err(api_error(
                StatusCode::BAD_REQUEST,
                "Shipping is only available within the US and Canada.",
            ));
        }
    }

    let digits: String = req
        .shipping_phone
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect();
    if digits.len() != 10 {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "Please enter a valid 10-digit phone number for US/Canada.",
        ));
    }
    let phone = format!("({}) {}-{}", &digits[0..3], &digits[3..6], &digits[6..10]);

    Ok(Shipping {
        name: name.to_string(),
        address1: address1.to_string(),
        address2: req
            .shipping_address2
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        city: city.to_string(),
        state: req.shipping_state.trim().to_string(),
        postal_code: postal,
        country: country.to_string(),
        phone,
    })
}

/// Checkout. The trade gate is the evaluator: only `direct` and
/// `second_degree` sellers can be bought from. Order insert and listing
/// reservation are one transaction in the store.
pub async fn place_order(
    State(state): State<Arc<AppStateInner>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<PlaceOrderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let shipping = validate_shipping(&req)?;
    let payment_method = req.payment_method.trim().to_string();
    if payment_method.is_empty() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "A payment preference is required.",
        ));
    }

    let buyer_id = claims.sub;
    let order_id = Uuid::new_v4();
    let db = state.clone();

    let row = tokio::task::spawn_blocking(move || {
        let listing = db
            .db
            .get_listing(&req.listing_id.to_string())
            .map_err(storage_error)?
            .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Could not find the listing."))?;

        let seller_id: Uuid = listing.seller_id.parse().map_err(|_| internal())?;
        if seller_id == buyer_id {
            return Err(api_error(
                StatusCode::FORBIDDEN,
                "You cannot buy your own listing.",
            ));
        }

        let verdict =
            vouch_graph::evaluate(&db.db, buyer_id, seller_id).map_err(storage_error)?;
        if !verdict.relation.tradeable() {
            return Err(api_error(
                StatusCode::FORBIDDEN,
                "You can only trade with friends and friends of friends.",
            ));
        }

        let oid = order_id.to_string();
        let bid = buyer_id.to_string();
        let placed = db
            .db
            .create_order_reserving_listing(&NewOrder {
                id: &oid,
                buyer_id: &bid,
                seller_id: &listing.seller_id,
                listing_id: &listing.id,
                total_cents: listing.price_cents,
                shipping_name: &shipping.name,
                shipping_address1: &shipping.address1,
                shipping_address2: shipping.address2.as_deref(),
                shipping_city: &shipping.city,
                shipping_state: &shipping.state,
                shipping_postal_code: &shipping.postal_code,
                shipping_country: &shipping.country,
                shipping_phone: &shipping.phone,
                payment_method: &payment_method,
                buyer_note: req.buyer_note.as_deref(),
            })
            .map_err(storage_error)?;

        if !placed {
            return Err(api_error(
                StatusCode::CONFLICT,
                "This item is no longer available.",
            ));
        }

        db.db
            .get_order(&oid)
            .map_err(storage_error)?
            .ok_or_else(internal)
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        internal()
    })??;

    Ok((StatusCode::CREATED, Json(order_response(row))))
}

pub async fn my_purchases(
    State(state): State<Arc<AppStateInner>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    list_orders(state, claims.sub, OrderSide::Buyer).await
}

pub async fn my_sales(
    State(state): State<Arc<AppStateInner>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    list_orders(state, claims.sub, OrderSide::Seller).await
}

enum OrderSide {
    Buyer,
    Seller,
}

async fn list_orders(
    state: Arc<AppStateInner>,
    user_id: Uuid,
    side: OrderSide,
) -> Result<Json<Vec<OrderResponse>>, StatusCode> {
    let db = state.clone();
    let id = user_id.to_string();

    let rows = tokio::task::spawn_blocking(move || match side {
        OrderSide::Buyer => db.db.orders_for_buyer(&id),
        OrderSide::Seller => db.db.orders_for_seller(&id),
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(rows.into_iter().map(order_response).collect()))
}

/// Seller attaches tracking info; the order moves to `shipped`.
pub async fn update_shipping(
    State(state): State<Arc<AppStateInner>>,
    Path(order_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ShippingUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let tracking_number = req.tracking_number.trim().to_string();
    let carrier = req.carrier.trim().to_string();
    if tracking_number.is_empty() || carrier.is_empty() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "Tracking number and carrier are required.",
        ));
    }

    let db = state.clone();
    let actor_id = claims.sub.to_string();

    let row = tokio::task::spawn_blocking(move || {
        let oid = order_id.to_string();
        let row = db
            .db
            .get_order(&oid)
            .map_err(storage_error)?
            .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "No such order."))?;
        if row.seller_id != actor_id {
            return Err(api_error(
                StatusCode::FORBIDDEN,
                "Only the seller can ship an order.",
            ));
        }

        let shipped = db
            .db
            .ship_order(&oid, &actor_id, &tracking_number, &carrier)
            .map_err(storage_error)?;
        if !shipped {
            return Err(api_error(
                StatusCode::CONFLICT,
                "Only pending orders can be shipped.",
            ));
        }

        db.db
            .get_order(&oid)
            .map_err(storage_error)?
            .ok_or_else(internal)
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        internal()
    })??;

    Ok(Json(order_response(row)))
}

/// `delivered` (seller, after shipping) and `cancelled` (either party,
/// while pending, which puts the listing back on the market). `shipped` is
/// reached through the shipping endpoint, never here.
pub async fn update_order_status(
    State(state): State<Arc<AppStateInner>>,
    Path(order_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<OrderStatusUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let actor_id = claims.sub.to_string();

    let row = tokio::task::spawn_blocking(move || {
        let oid = order_id.to_string();
        let row = db
            .db
            .get_order(&oid)
            .map_err(storage_error)?
            .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "No such order."))?;

        match req.status {
            OrderStatus::Delivered => {
                if row.seller_id != actor_id {
                    return Err(api_error(
                        StatusCode::FORBIDDEN,
                        "Only the seller can confirm delivery.",
                    ));
                }
                let updated = db
                    .db
                    .mark_order_delivered(&oid, &actor_id)
                    .map_err(storage_error)?;
                if !updated {
                    return Err(api_error(
                        StatusCode::CONFLICT,
                        "Only shipped orders can be marked delivered.",
                    ));
                }
            }
            OrderStatus::Cancelled => {
                if row.buyer_id != actor_id && row.seller_id != actor_id {
                    return Err(api_error(
                        StatusCode::FORBIDDEN,
                        "Only the buyer or seller can cancel.",
                    ));
                }
                let updated = db.db.cancel_order(&oid, &actor_id).map_err(storage_error)?;
                if !updated {
                    return Err(api_error(
                        StatusCode::CONFLICT,
                        "Only pending orders can be cancelled.",
                    ));
                }
            }
            OrderStatus::Pending | OrderStatus::Shipped => {
                return Err(api_error(
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "Orders move to shipped via the shipping endpoint.",
                ));
            }
        }

        db.db
            .get_order(&oid)
            .map_err(storage_error)?
            .ok_or_else(internal)
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        internal()
    })??;

    Ok(Json(order_response(row)))
}

fn internal() -> ApiError {
    api_error(StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong.")
}

fn storage_error(e: anyhow::Error) -> ApiError {
    error!("Storage failure: {}", e);
    internal()
}
