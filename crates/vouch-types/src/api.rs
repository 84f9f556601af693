use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use vouch_graph::Relation;

use crate::models::{ListingStatus, OrderStatus};

// -- JWT Claims --

/// JWT claims shared between token minting (auth handlers) and the
/// bearer middleware. Canonical definition lives here in vouch-types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub email: String,
    pub password: String,
    /// Required for everyone except the very first account.
    #[serde(default)]
    pub invite_code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub email: String,
    pub display_name: String,
    pub token: String,
}

// -- Profile --

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    /// Display name of the user whose invite brought this account in.
    pub invited_by: Option<String>,
    pub invited_users: Vec<InvitedUser>,
    pub created_at: DateTime<Utc>,
}

/// Someone who joined through one of this user's invites.
#[derive(Debug, Serialize)]
pub struct InvitedUser {
    pub id: Uuid,
    pub display_name: String,
}

// -- Invites --

#[derive(Debug, Serialize)]
pub struct InviteResponse {
    pub code: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct InviteSummary {
    pub code: String,
    pub created_at: DateTime<Utc>,
    /// True once someone redeemed the code.
    pub joined: bool,
}

// -- Connections --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddConnectionRequest {
    pub user_id: Uuid,
    pub friend_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct ConnectionPeer {
    pub id: Uuid,
    pub display_name: String,
}

#[derive(Debug, Serialize)]
pub struct EligibilityResponse {
    pub seller_id: Uuid,
    pub allowed: bool,
    pub relation: Relation,
}

// -- Listings --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateListingRequest {
    pub title: String,
    pub description: String,
    pub price_cents: i64,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub condition: Option<String>,
    pub retail_price_cents: Option<i64>,
    /// Create as a draft instead of publishing immediately.
    #[serde(default)]
    pub draft: bool,
}

#[derive(Debug, Serialize)]
pub struct ListingResponse {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub seller_name: String,
    pub title: String,
    pub description: String,
    pub price_cents: i64,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub condition: Option<String>,
    pub retail_price_cents: Option<i64>,
    pub status: ListingStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateListingStatusRequest {
    pub status: ListingStatus,
}

/// One entry of the friends feed: a published listing annotated with how
/// the seller is reachable from the viewer.
#[derive(Debug, Serialize)]
pub struct FeedItem {
    pub relation: Relation,
    pub listing: ListingResponse,
}

// -- Orders --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlaceOrderRequest {
    pub listing_id: Uuid,
    pub shipping_name: String,
    pub shipping_address1: String,
    pub shipping_address2: Option<String>,
    pub shipping_city: String,
    pub shipping_state: String,
    pub shipping_postal_code: String,
    pub shipping_country: String,
    pub shipping_phone: String,
    /// Off-platform payment preference, e.g. "Venmo" or "Zelle".
    pub payment_method: String,
    pub buyer_note: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: Uuid,
    pub buyer_id: Uuid,
    pub seller_id: Uuid,
    pub listing_id: Uuid,
    pub listing_title: String,
    pub status: OrderStatus,
    pub total_cents: i64,
    pub shipping_name: String,
    pub shipping_address1: String,
    pub shipping_address2: Option<String>,
    pub shipping_city: String,
    pub shipping_state: String,
    pub shipping_postal_code: String,
    pub shipping_country: String,
    pub shipping_phone: String,
    pub payment_method: String,
    pub buyer_note: Option<String>,
    pub tracking_number: Option<String>,
    pub carrier: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShippingUpdateRequest {
    pub tracking_number: String,
    pub carrier: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderStatusUpdateRequest {
    pub status: OrderStatus,
}
