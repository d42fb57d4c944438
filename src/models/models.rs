use serde::{Deserialize, Serialize};

/// Stored user document. Serialized in full into the document store; never
/// sent to clients directly, the view types below strip the password hash.
#[derive(Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub profile_picture: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub followers: Vec<String>,
    #[serde(default)]
    pub following: Vec<String>,
    #[serde(default)]
    pub posts: Vec<String>,
    #[serde(default)]
    pub bookmarks: Vec<String>,
    pub created_at: String,
}

/// Stored post document. Read-only in this core; created by seed fixtures.
#[derive(Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub author: String,
    pub content: String,
    pub created_at: String,
}

/// A user record with the password hash removed, post/bookmark ids left
/// unexpanded. Shape of the suggested-users listing.
#[derive(Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: String,
    pub username: String,
    pub email: String,
    pub profile_picture: Option<String>,
    pub bio: Option<String>,
    pub gender: Option<String>,
    pub followers: Vec<String>,
    pub following: Vec<String>,
    pub posts: Vec<String>,
    pub bookmarks: Vec<String>,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        PublicUser {
            id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            profile_picture: user.profile_picture.clone(),
            bio: user.bio.clone(),
            gender: user.gender.clone(),
            followers: user.followers.clone(),
            following: user.following.clone(),
            posts: user.posts.clone(),
            bookmarks: user.bookmarks.clone(),
        }
    }
}

/// Login response body: owned posts expanded inline, re-validated against
/// the stored author id. Held by the client store as the authenticated user.
#[derive(Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedUser {
    pub id: String,
    pub username: String,
    pub email: String,
    pub profile_picture: Option<String>,
    pub bio: Option<String>,
    pub followers: Vec<String>,
    pub following: Vec<String>,
    pub posts: Vec<Post>,
}

/// Profile page view: owned posts newest-first and bookmarked posts, both
/// expanded inline.
#[derive(Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub email: String,
    pub profile_picture: Option<String>,
    pub bio: Option<String>,
    pub gender: Option<String>,
    pub followers: Vec<String>,
    pub following: Vec<String>,
    pub posts: Vec<Post>,
    pub bookmarks: Vec<Post>,
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}
