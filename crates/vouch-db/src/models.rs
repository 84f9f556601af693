/// Database row types — these map directly to SQLite rows.
/// Distinct from vouch-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: String,
    pub email: String,
    pub password: String,
    pub display_name: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub invited_by: Option<String>,
    pub created_at: String,
}

pub struct NewUser<'a> {
    pub id: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub display_name: &'a str,
    pub first_name: Option<&'a str>,
    pub last_name: Option<&'a str>,
    pub phone: Option<&'a str>,
}

pub struct InviteRow {
    pub code: String,
    pub inviter_id: String,
    pub used_by: Option<String>,
    pub created_at: String,
}

pub struct ListingRow {
    pub id: String,
    pub seller_id: String,
    pub seller_name: String,
    pub title: String,
    pub description: String,
    pub price_cents: i64,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub condition: Option<String>,
    pub retail_price_cents: Option<i64>,
    pub status: String,
    pub created_at: String,
}

pub struct NewListing<'a> {
    pub id: &'a str,
    pub seller_id: &'a str,
    pub title: &'a str,
    pub description: &'a str,
    pub price_cents: i64,
    pub brand: Option<&'a str>,
    pub category: Option<&'a str>,
    pub condition: Option<&'a str>,
    pub retail_price_cents: Option<i64>,
    pub status: &'a str,
}

pub struct OrderRow {
    pub id: String,
    pub buyer_id: String,
    pub seller_id: String,
    pub listing_id: String,
    pub listing_title: String,
    pub status: String,
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
    pub created_at: String,
    pub updated_at: String,
}

pub struct NewOrder<'a> {
    pub id: &'a str,
    pub buyer_id: &'a str,
    pub seller_id: &'a str,
    pub listing_id: &'a str,
    pub total_cents: i64,
    pub shipping_name: &'a str,
    pub shipping_address1: &'a str,
    pub shipping_address2: Option<&'a str>,
    pub shipping_city: &'a str,
    pub shipping_state: &'a str,
    pub shipping_postal_code: &'a str,
    pub shipping_country: &'a str,
    pub shipping_phone: &'a str,
    pub payment_method: &'a str,
    pub buyer_note: Option<&'a str>,
}
