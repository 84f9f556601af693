use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, patch, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use vouch_api::auth::{self, AppState, AppStateInner};
use vouch_api::middleware::require_auth;
use vouch_api::{connections, feed, invites, listings, orders, profile};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vouch=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("VOUCH_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let admin_token = std::env::var("VOUCH_ADMIN_TOKEN").ok();
    let db_path = std::env::var("VOUCH_DB_PATH").unwrap_or_else(|_| "vouch.db".into());
    let host = std::env::var("VOUCH_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("VOUCH_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    // Init database
    let db = vouch_db::Database::open(&PathBuf::from(&db_path))?;

    // Shared state
    let app_state: AppState = Arc::new(AppStateInner {
        db,
        jwt_secret,
        admin_token,
    });

    // Routes
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .with_state(app_state.clone());

    let protected_routes = Router::new()
        .route("/me", get(profile::me))
        .route("/invites", post(invites::create_invite).get(invites::list_invites))
        .route("/connections", get(connections::list_connections))
        .route("/eligibility/{seller_id}", get(connections::check_eligibility))
        .route("/feed", get(feed::get_feed))
        .route("/listings", post(listings::create_listing))
        .route("/listings/mine", get(listings::my_listings))
        .route(
            "/listings/{listing_id}",
            get(listings::get_listing).delete(listings::delete_listing),
        )
        .route("/listings/{listing_id}/status", patch(listings::update_listing_status))
        .route("/orders", post(orders::place_order))
        .route("/orders/purchases", get(orders::my_purchases))
        .route("/orders/sales", get(orders::my_sales))
        .route("/orders/{order_id}/shipping", patch(orders::update_shipping))
        .route("/orders/{order_id}/status", patch(orders::update_order_status))
        .layer(middleware::from_fn(require_auth))
        .with_state(app_state.clone());

    // Guarded by the shared admin token, not user auth
    let admin_routes = Router::new()
        .route("/admin/connections", post(connections::add_connection))
        .with_state(app_state);

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(admin_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Vouch server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
