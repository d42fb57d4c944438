use actix_multipart::form::bytes::Bytes as FileBytes;
use actix_multipart::form::text::Text;
use actix_multipart::form::MultipartForm;
use actix_web::{web, HttpRequest, HttpResponse};
use tracing::info;

use crate::auth::authenticated_user;
use crate::config::{post_key, user_key, MAX_BIO_LENGTH, USERS_LIST_KEY};
use crate::core::db::Store;
use crate::core::errors::ApiError;
use crate::core::helpers::sanitize_text;
use crate::core::object_storage::ObjectStorage;
use crate::models::models::{Post, PublicUser, User, UserProfile};

/// Resolves a list of post ids against the store, skipping ids whose
/// document has gone missing.
pub fn load_posts(store: &Store, ids: &[String]) -> Result<Vec<Post>, ApiError> {
    let mut posts = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(post) = store.get_json::<Post>(&post_key(id))? {
            posts.push(post);
        }
    }
    Ok(posts)
}

pub async fn get_profile(
    store: web::Data<Store>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let user_id = path.into_inner();
    let user = store
        .get_json::<User>(&user_key(&user_id))?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let mut posts = load_posts(&store, &user.posts)?;
    posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    let bookmarks = load_posts(&store, &user.bookmarks)?;

    let profile = UserProfile {
        id: user.id,
        username: user.username,
        email: user.email,
        profile_picture: user.profile_picture,
        bio: user.bio,
        gender: user.gender,
        followers: user.followers,
        following: user.following,
        posts,
        bookmarks,
    };

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "user": profile,
        "success": true,
    })))
}

#[derive(MultipartForm)]
pub struct EditProfileForm {
    pub bio: Option<Text<String>>,
    pub gender: Option<Text<String>>,
    #[multipart(limit = "5MB")]
    pub image: Option<FileBytes>,
}

/// Partial profile update: absent fields are left untouched, never cleared.
/// An attached image goes to external object storage first; if that upload
/// fails the whole request fails and nothing is persisted.
pub async fn edit_profile(
    req: HttpRequest,
    store: web::Data<Store>,
    uploader: web::Data<ObjectStorage>,
    MultipartForm(form): MultipartForm<EditProfileForm>,
) -> Result<HttpResponse, ApiError> {
    let caller_id = authenticated_user(&req, &store)?;

    let uploaded_url = match &form.image {
        Some(image) => {
            let content_type = image
                .content_type
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| "application/octet-stream".to_string());
            Some(uploader.upload(&image.data, &content_type).await?)
        }
        None => None,
    };

    let mut user = store
        .get_json::<User>(&user_key(&caller_id))?
        .ok_or_else(|| ApiError::NotFound("User not found.".to_string()))?;

    if let Some(bio) = &form.bio {
        if bio.len() > MAX_BIO_LENGTH {
            return Err(ApiError::BadRequest(
                "Bio too long (max 500 chars)".to_string(),
            ));
        }
        let sanitized = sanitize_text(bio);
        user.bio = if sanitized.is_empty() { None } else { Some(sanitized) };
    }
    if let Some(gender) = &form.gender {
        user.gender = Some(gender.to_string());
    }
    if let Some(url) = uploaded_url {
        user.profile_picture = Some(url);
    }

    store.set_json(&user_key(&caller_id), &user)?;

    info!(user_id = %caller_id, "profile updated");
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Profile updated.",
        "success": true,
        "user": PublicUser::from(&user),
    })))
}

/// Everyone except the caller, password stripped. An empty result is a soft
/// failure, not an internal error.
pub async fn get_suggested(
    req: HttpRequest,
    store: web::Data<Store>,
) -> Result<HttpResponse, ApiError> {
    let caller_id = authenticated_user(&req, &store)?;

    let ids: Vec<String> = store.get_json(USERS_LIST_KEY)?.unwrap_or_default();
    let mut suggested = Vec::new();
    for id in ids {
        if id == caller_id {
            continue;
        }
        if let Some(user) = store.get_json::<User>(&user_key(&id))? {
            suggested.push(PublicUser::from(&user));
        }
    }

    if suggested.is_empty() {
        return Err(ApiError::BadRequest(
            "No suggested users at this time".to_string(),
        ));
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "users": suggested,
    })))
}
