use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::{SaltString, rand_core::OsRng}};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::error;
use uuid::Uuid;

use vouch_db::Database;
use vouch_db::models::NewUser;
use vouch_types::api::{Claims, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};

use crate::{ApiError, api_error};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    /// Shared secret for the manual-connection path; None disables it.
    pub admin_token: Option<String>,
}

/// One message for both unknown and already-spent codes, so outsiders
/// cannot probe which codes exist.
const INVITE_REJECTED: &str = "Invalid invite code. Please check with your friend.";

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = req.email.trim().to_lowercase();
    let first_name = req.first_name.trim().to_string();
    let last_name = req.last_name.trim().to_string();
    let phone = req.phone.trim().to_string();
    let invite_code = req
        .invite_code
        .as_deref()
        .map(str::trim)
        .unwrap_or_default()
        .to_string();

    // Validate input
    if email.is_empty() || !email.contains('@') {
        return Err(api_error(StatusCode::BAD_REQUEST, "A valid email is required."));
    }
    if first_name.is_empty() || last_name.is_empty() || phone.is_empty() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "Please fill in all required fields (name, phone, email).",
        ));
    }
    if req.password.len() < 8 {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "Password must be at least 8 characters long.",
        ));
    }

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|_| internal())?
        .to_string();

    let user_id = Uuid::new_v4();
    let display_name = first_name.clone();

    // User creation and invite redemption are one transaction in the
    // store; run the whole thing off the async runtime.
    let db = state.clone();
    let email_for_db = email.clone();
    tokio::task::spawn_blocking(move || {
        if db
            .db
            .get_user_by_email(&email_for_db)
            .map_err(|e| storage_error("user lookup", e))?
            .is_some()
        {
            return Err(api_error(
                StatusCode::CONFLICT,
                "This email already has an account.",
            ));
        }

        let id = user_id.to_string();
        let user = NewUser {
            id: &id,
            email: &email_for_db,
            password_hash: &password_hash,
            display_name: &display_name,
            first_name: Some(&first_name),
            last_name: Some(&last_name),
            phone: Some(&phone),
        };

        if invite_code.is_empty() {
            // Founder bootstrap: only the very first account may join
            // without a code.
            let created = db
                .db
                .register_founder(&user)
                .map_err(|e| storage_error("founder registration", e))?;
            if !created {
                return Err(api_error(
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "An invite code is required to join.",
                ));
            }
        } else {
            match db.db.register_with_invite(&user, &invite_code) {
                Ok(_inviter_id) => {}
                Err(e) if e.is_user_error() => {
                    return Err(api_error(StatusCode::UNPROCESSABLE_ENTITY, INVITE_REJECTED));
                }
                Err(e) => {
                    error!("Invite redemption failed: {}", e);
                    return Err(internal());
                }
            }
        }

        Ok(())
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        internal()
    })??;

    let token = create_token(&state.jwt_secret, user_id, &email).map_err(|_| internal())?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse { user_id, token }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let email = req.email.trim().to_lowercase();

    let db = state.clone();
    let user = tokio::task::spawn_blocking(move || db.db.get_user_by_email(&email))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::UNAUTHORIZED)?;

    // Verify password
    let parsed_hash =
        PasswordHash::new(&user.password).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    let user_id: Uuid = user.id.parse().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let token = create_token(&state.jwt_secret, user_id, &user.email)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(LoginResponse {
        user_id,
        email: user.email,
        display_name: user.display_name,
        token,
    }))
}

fn create_token(secret: &str, user_id: Uuid, email: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

fn internal() -> ApiError {
    api_error(StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong.")
}

fn storage_error(context: &str, e: anyhow::Error) -> ApiError {
    error!("Storage failure during {}: {}", context, e);
    internal()
}
