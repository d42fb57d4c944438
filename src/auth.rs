use actix_web::cookie::time::Duration as CookieDuration;
use actix_web::cookie::{Cookie, SameSite};
use actix_web::{web, HttpRequest, HttpResponse};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::config::{self, user_key, USERS_LIST_KEY, TOKEN_COOKIE};
use crate::core::db::Store;
use crate::core::errors::ApiError;
use crate::core::helpers::{hash_password, now_iso, sanitize_text, verify_password};
use crate::models::models::{AuthenticatedUser, LoginRequest, RegisterRequest, User};
use crate::users::load_posts;

#[derive(Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// Signs a session token embedding the user id, expiring after the
/// configured lifetime (24 hours by default). Stateless: nothing is stored
/// server-side, so tokens cannot be revoked before expiry.
pub fn issue_token(user_id: &str) -> Result<String, ApiError> {
    let now = chrono::Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        iat: now.timestamp(),
        exp: (now + chrono::Duration::hours(config::token_expiration_hours())).timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config::token_secret().as_bytes()),
    )
    .map_err(|e| ApiError::from(anyhow::Error::new(e)))
}

pub fn verify_token(token: &str) -> Option<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config::token_secret().as_bytes()),
        &Validation::default(),
    )
    .ok()
    .map(|data| data.claims)
}

/// Resolves the calling user from the session cookie (or a Bearer header),
/// rejecting tokens whose user no longer exists.
pub fn authenticated_user(req: &HttpRequest, store: &Store) -> Result<String, ApiError> {
    let token = match req.cookie(TOKEN_COOKIE) {
        Some(cookie) => cookie.value().to_string(),
        None => {
            let header = req
                .headers()
                .get("Authorization")
                .and_then(|h| h.to_str().ok())
                .unwrap_or_default();
            match header.strip_prefix("Bearer ") {
                Some(t) => t.to_string(),
                None => return Err(ApiError::Unauthorized),
            }
        }
    };

    let claims = verify_token(&token).ok_or(ApiError::Unauthorized)?;
    if store.get_json::<User>(&user_key(&claims.sub))?.is_none() {
        return Err(ApiError::Unauthorized);
    }
    Ok(claims.sub)
}

pub async fn register(
    store: web::Data<Store>,
    body: web::Json<RegisterRequest>,
) -> Result<HttpResponse, ApiError> {
    if body.username.is_empty() || body.email.is_empty() || body.password.is_empty() {
        return Err(ApiError::BadRequest("All fields are required".to_string()));
    }

    let id = Uuid::new_v4().to_string();
    let user = User {
        id: id.clone(),
        username: sanitize_text(&body.username),
        email: body.email.clone(),
        password: hash_password(&body.password)?,
        profile_picture: None,
        bio: None,
        gender: None,
        followers: vec![],
        following: vec![],
        posts: vec![],
        bookmarks: vec![],
        created_at: now_iso(),
    };

    // The duplicate scan, the user write, and the index append share one
    // transaction, so concurrent registers cannot slip past the email check
    // or commit a stale copy of the user index.
    store.with_txn(|tx| {
        let mut users: Vec<String> = tx.get_json(USERS_LIST_KEY)?.unwrap_or_default();
        for existing in &users {
            if let Some(u) = tx.get_json::<User>(&user_key(existing))? {
                if u.email == body.email {
                    return Err(ApiError::Conflict);
                }
            }
        }
        tx.set_json(&user_key(&id), &user)?;
        users.push(id.clone());
        tx.set_json(USERS_LIST_KEY, &users)?;
        Ok(())
    })?;

    info!(user_id = %id, "account created");
    Ok(HttpResponse::Created().json(serde_json::json!({
        "message": "Account created successfully.",
        "success": true,
    })))
}

pub async fn login(
    store: web::Data<Store>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    if body.email.is_empty() || body.password.is_empty() {
        return Err(ApiError::BadRequest(
            "Email and password are required".to_string(),
        ));
    }

    let users: Vec<String> = store.get_json(USERS_LIST_KEY)?.unwrap_or_default();
    let mut found: Option<User> = None;
    for id in users {
        if let Some(u) = store.get_json::<User>(&user_key(&id))? {
            if u.email == body.email {
                found = Some(u);
                break;
            }
        }
    }

    // Unknown email and wrong password share one error body so callers
    // cannot probe which emails have accounts.
    let user = found.ok_or(ApiError::InvalidCredentials)?;
    if !verify_password(&body.password, &user.password) {
        return Err(ApiError::InvalidCredentials);
    }

    let token = issue_token(&user.id)?;

    // Re-validate the owned-post list against each stored author id; stale
    // or foreign ids are dropped from the view.
    let posts = load_posts(&store, &user.posts)?
        .into_iter()
        .filter(|p| p.author == user.id)
        .collect::<Vec<_>>();

    let view = AuthenticatedUser {
        id: user.id.clone(),
        username: user.username.clone(),
        email: user.email.clone(),
        profile_picture: user.profile_picture.clone(),
        bio: user.bio.clone(),
        followers: user.followers.clone(),
        following: user.following.clone(),
        posts,
    };

    let cookie = Cookie::build(TOKEN_COOKIE, token)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .max_age(CookieDuration::hours(config::token_expiration_hours()))
        .finish();

    info!(user_id = %user.id, "login");
    Ok(HttpResponse::Ok().cookie(cookie).json(serde_json::json!({
        "message": format!("Welcome back {}", user.username),
        "success": true,
        "user": view,
    })))
}

pub async fn logout() -> Result<HttpResponse, ApiError> {
    let cleared = Cookie::build(TOKEN_COOKIE, "")
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .max_age(CookieDuration::ZERO)
        .finish();

    Ok(HttpResponse::Ok().cookie(cleared).json(serde_json::json!({
        "message": "Logged out successfully.",
        "success": true,
    })))
}
