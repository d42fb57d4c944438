// Environment-driven configuration with local defaults, plus the store key
// layout and validation limits shared across handlers.

pub const USERS_LIST_KEY: &str = "users_list";
pub const TOKEN_COOKIE: &str = "token";

pub const MAX_BIO_LENGTH: usize = 500;

pub fn user_key(id: &str) -> String {
    format!("user:{}", id)
}

pub fn post_key(id: &str) -> String {
    format!("post:{}", id)
}

pub fn token_secret() -> String {
    std::env::var("HUDDLE_TOKEN_SECRET").unwrap_or_else(|_| "huddle-dev-secret".to_string())
}

pub fn token_expiration_hours() -> i64 {
    std::env::var("HUDDLE_TOKEN_EXPIRATION_HOURS")
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(24)
}

pub fn database_path() -> String {
    std::env::var("HUDDLE_DATABASE_PATH").unwrap_or_else(|_| "huddle.db".to_string())
}

pub fn bind_address() -> String {
    std::env::var("HUDDLE_BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string())
}

/// Endpoint of the external object storage that receives profile images.
/// Unset means image uploads are rejected.
pub fn upload_endpoint() -> Option<String> {
    std::env::var("HUDDLE_UPLOAD_ENDPOINT").ok()
}

pub fn seed_demo_data() -> bool {
    std::env::var("HUDDLE_SEED_DEMO")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false)
}
