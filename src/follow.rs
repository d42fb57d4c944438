use actix_web::{web, HttpRequest, HttpResponse};
use tracing::info;

use crate::auth::authenticated_user;
use crate::config::user_key;
use crate::core::db::Store;
use crate::core::errors::ApiError;
use crate::models::models::User;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum FollowAction {
    Followed,
    Unfollowed,
}

impl FollowAction {
    fn message(self) -> &'static str {
        match self {
            FollowAction::Followed => "Followed successfully",
            FollowAction::Unfollowed => "Unfollowed successfully",
        }
    }
}

#[derive(Debug)]
pub struct FollowOutcome {
    pub action: FollowAction,
    /// Target's follower count re-read after the mutation committed.
    pub follower_count: usize,
}

/// Toggles the edge between caller and target. The edge is mirrored across
/// both user documents (caller.following and target.followers), and both
/// writes happen in one store transaction so a crash cannot leave the edge
/// asymmetric.
pub fn toggle_follow(store: &Store, caller_id: &str, target_id: &str) -> Result<FollowOutcome, ApiError> {
    if caller_id == target_id {
        return Err(ApiError::SelfReference);
    }

    store.with_txn(|tx| {
        let mut caller = tx
            .get_json::<User>(&user_key(caller_id))?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
        let mut target = tx
            .get_json::<User>(&user_key(target_id))?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

        let action = if caller.following.iter().any(|id| id == target_id) {
            caller.following.retain(|id| id != target_id);
            target.followers.retain(|id| id != caller_id);
            FollowAction::Unfollowed
        } else {
            caller.following.push(target_id.to_string());
            target.followers.push(caller_id.to_string());
            FollowAction::Followed
        };

        tx.set_json(&user_key(caller_id), &caller)?;
        tx.set_json(&user_key(target_id), &target)?;

        Ok(FollowOutcome {
            action,
            follower_count: target.followers.len(),
        })
    })
}

pub async fn follow_or_unfollow(
    req: HttpRequest,
    store: web::Data<Store>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let caller_id = authenticated_user(&req, &store)?;
    let target_id = path.into_inner();

    let outcome = toggle_follow(&store, &caller_id, &target_id)?;

    info!(
        caller = %caller_id,
        target = %target_id,
        action = ?outcome.action,
        "follow toggled"
    );
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": outcome.action.message(),
        "success": true,
        "updatedFollowerCount": outcome.follower_count,
    })))
}
