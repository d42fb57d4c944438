use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::models::models::{AuthenticatedUser, PublicUser, UserProfile};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The server answered with its `{message, success:false}` error body.
    #[error("{message}")]
    Api { message: String },
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowResponse {
    pub message: String,
    pub success: bool,
    pub updated_follower_count: usize,
}

/// The slice of the HTTP API the state container's async actions need.
#[async_trait]
pub trait SocialApi {
    async fn follow_or_unfollow(&self, target_id: &str) -> Result<FollowResponse, ClientError>;
}

/// reqwest-backed API client. The session cookie set by `login` is kept in
/// the client's cookie store and sent on subsequent calls.
pub struct HttpApi {
    base_url: String,
    http: reqwest::Client,
}

#[derive(Deserialize)]
struct LoginResponse {
    user: AuthenticatedUser,
}

#[derive(Deserialize)]
struct ProfileResponse {
    user: UserProfile,
}

#[derive(Deserialize)]
struct SuggestedResponse {
    users: Vec<PublicUser>,
}

impl HttpApi {
    pub fn new(base_url: impl Into<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().cookie_store(true).build()?;
        Ok(HttpApi {
            base_url: base_url.into(),
            http,
        })
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthenticatedUser, ClientError> {
        let resp = self
            .http
            .post(format!("{}/login", self.base_url))
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;
        Ok(parse::<LoginResponse>(resp).await?.user)
    }

    pub async fn profile(&self, user_id: &str) -> Result<UserProfile, ClientError> {
        let resp = self
            .http
            .get(format!("{}/profile/{}", self.base_url, user_id))
            .send()
            .await?;
        Ok(parse::<ProfileResponse>(resp).await?.user)
    }

    pub async fn suggested(&self) -> Result<Vec<PublicUser>, ClientError> {
        let resp = self
            .http
            .get(format!("{}/suggested", self.base_url))
            .send()
            .await?;
        Ok(parse::<SuggestedResponse>(resp).await?.users)
    }
}

#[async_trait]
impl SocialApi for HttpApi {
    async fn follow_or_unfollow(&self, target_id: &str) -> Result<FollowResponse, ClientError> {
        let resp = self
            .http
            .post(format!("{}/users/{}/follow-or-unfollow", self.base_url, target_id))
            .send()
            .await?;
        parse(resp).await
    }
}

async fn parse<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ClientError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp.json().await?);
    }

    #[derive(Deserialize)]
    struct ErrorBody {
        message: String,
    }
    match resp.json::<ErrorBody>().await {
        Ok(body) => Err(ClientError::Api { message: body.message }),
        Err(_) => Err(ClientError::Api {
            message: format!("request failed with status {}", status),
        }),
    }
}
