use crate::client::api::{ClientError, SocialApi};
use crate::models::models::{AuthenticatedUser, PublicUser, UserProfile};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Idle,
    Loading,
    Succeeded,
    Failed,
}

/// In-memory view state: the authenticated user, the suggested-users list,
/// the profile being viewed, and a selected user for detail views.
pub struct AuthState {
    pub user: Option<AuthenticatedUser>,
    pub suggested_users: Vec<PublicUser>,
    pub user_profile: Option<UserProfile>,
    pub selected_user: Option<PublicUser>,
    pub status: Status,
    pub error: Option<String>,
    /// Authoritative follower count of the last follow/unfollow target, as
    /// echoed by the server, for reconciling the optimistic merge.
    pub last_follower_count: Option<usize>,
}

impl Default for AuthState {
    fn default() -> Self {
        AuthState {
            user: None,
            suggested_users: Vec::new(),
            user_profile: None,
            selected_user: None,
            status: Status::Idle,
            error: None,
            last_follower_count: None,
        }
    }
}

impl AuthState {
    pub fn set_auth_user(&mut self, user: Option<AuthenticatedUser>) {
        self.user = user;
    }

    pub fn set_suggested_users(&mut self, users: Vec<PublicUser>) {
        self.suggested_users = users;
    }

    pub fn set_user_profile(&mut self, profile: Option<UserProfile>) {
        self.user_profile = profile;
    }

    pub fn set_selected_user(&mut self, user: Option<PublicUser>) {
        self.selected_user = user;
    }

    /// Optimistic merge after a successful follow call: the target joins the
    /// authed user's following list, and if the viewed profile is the target,
    /// the authed user joins its follower list.
    pub fn apply_follow(&mut self, target_id: &str) {
        let follower_id = match &self.user {
            Some(user) => user.id.clone(),
            None => return,
        };

        if let Some(profile) = &mut self.user_profile {
            if profile.id == target_id && !profile.followers.iter().any(|id| id == &follower_id) {
                profile.followers.push(follower_id);
            }
        }
        if let Some(user) = &mut self.user {
            if !user.following.iter().any(|id| id == target_id) {
                user.following.push(target_id.to_string());
            }
        }
    }

    /// Inverse merge after a successful unfollow call.
    pub fn apply_unfollow(&mut self, target_id: &str) {
        let follower_id = match &self.user {
            Some(user) => user.id.clone(),
            None => return,
        };

        if let Some(profile) = &mut self.user_profile {
            if profile.id == target_id {
                profile.followers.retain(|id| id != &follower_id);
            }
        }
        if let Some(user) = &mut self.user {
            user.following.retain(|id| id != target_id);
        }
    }
}

/// State container dispatching follow/unfollow network calls and merging
/// their results, Redux-slice style: on success the edge change is applied
/// optimistically without re-fetching canonical state; on failure prior
/// state is left untouched apart from the status flag and error.
pub struct ClientStore<A: SocialApi> {
    api: A,
    pub state: AuthState,
}

impl<A: SocialApi> ClientStore<A> {
    pub fn new(api: A) -> Self {
        ClientStore {
            api,
            state: AuthState::default(),
        }
    }

    pub async fn follow(&mut self, target_id: &str) -> Result<(), ClientError> {
        self.state.status = Status::Loading;
        match self.api.follow_or_unfollow(target_id).await {
            Ok(resp) => {
                self.state.apply_follow(target_id);
                self.state.last_follower_count = Some(resp.updated_follower_count);
                self.state.status = Status::Succeeded;
                self.state.error = None;
                Ok(())
            }
            Err(err) => {
                self.state.status = Status::Failed;
                self.state.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    pub async fn unfollow(&mut self, target_id: &str) -> Result<(), ClientError> {
        self.state.status = Status::Loading;
        match self.api.follow_or_unfollow(target_id).await {
            Ok(resp) => {
                self.state.apply_unfollow(target_id);
                self.state.last_follower_count = Some(resp.updated_follower_count);
                self.state.status = Status::Succeeded;
                self.state.error = None;
                Ok(())
            }
            Err(err) => {
                self.state.status = Status::Failed;
                self.state.error = Some(err.to_string());
                Err(err)
            }
        }
    }
}
