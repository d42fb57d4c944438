pub mod auth;
pub mod client;
pub mod config;
pub mod core;
pub mod follow;
pub mod models;
pub mod users;

use actix_web::web;

use crate::core::errors::ApiError;

/// Route table shared by the server binary and the in-process tests. The
/// caller supplies `Store` and `ObjectStorage` app data.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|_err, _req| {
        ApiError::BadRequest("Invalid request body".to_string()).into()
    }))
    .route("/register", web::post().to(auth::register))
    .route("/login", web::post().to(auth::login))
    .route("/logout", web::post().to(auth::logout))
    .route("/profile/{id}", web::get().to(users::get_profile))
    .route("/profile/edit", web::post().to(users::edit_profile))
    .route("/suggested", web::get().to(users::get_suggested))
    .route(
        "/users/{id}/follow-or-unfollow",
        web::post().to(follow::follow_or_unfollow),
    );
}
