use crate::common::settings::FOLLOWS_DEFAULT_LIMIT;
use crate::common::validation::{
    validate_bio, validate_email, validate_post_content, validate_username,
};
use crate::common::{paginate, CounterChange, PageRequest, Pagination, SocialError};
use crate::notification::{notify, NewNotification};
use crate::post::{PostAgentClient, PostSummary};
use crate::user_directory::UserDirectoryAgentClient;
use golem_rust::{agent_definition, agent_implementation, Schema};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt::{Display, Formatter};

#[derive(Schema, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserRole {
    User,
    Admin,
}

impl Display for UserRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            UserRole::User => write!(f, "user"),
            UserRole::Admin => write!(f, "admin"),
        }
    }
}

/// One endpoint of a follow edge, as stored on the other endpoint.
#[derive(Schema, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowRef {
    pub user_id: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Schema, Clone, Debug, Serialize, Deserialize)]
pub struct FollowRefsPage {
    pub users: Vec<FollowRef>,
    pub pagination: Pagination,
}

#[derive(Schema, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FollowAction {
    Followed,
    Unfollowed,
}

#[derive(Schema, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowToggle {
    pub action: FollowAction,
    pub is_following: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UserCounter {
    Posts,
    Followers,
    Following,
}

#[derive(Schema, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCounters {
    pub post_count: u64,
    pub follower_count: u64,
    pub following_count: u64,
}

#[derive(Schema, Clone, Debug, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub bio: Option<String>,
    pub profile_image: Option<String>,
    pub cover_image: Option<String>,
}

/// Public view of a user; never carries the password hash or the edge maps.
#[derive(Schema, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub bio: String,
    pub profile_image: Option<String>,
    pub cover_image: Option<String>,
    pub counters: UserCounters,
    pub is_active: bool,
    pub role: UserRole,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Directory entry of a user, used by listings and rankings.
#[derive(Schema, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub bio: String,
    pub profile_image: Option<String>,
    pub follower_count: u64,
    pub following_count: u64,
    pub post_count: u64,
    pub is_active: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub bio: String,
    pub profile_image: Option<String>,
    pub cover_image: Option<String>,
    pub counters: UserCounters,
    pub is_active: bool,
    pub role: UserRole,
    pub following: HashMap<String, FollowRef>,
    pub followers: HashMap<String, FollowRef>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl User {
    pub(crate) fn new(
        user_id: String,
        username: String,
        email: String,
        password_hash: String,
    ) -> Self {
        let now = chrono::Utc::now();
        User {
            user_id,
            username,
            email,
            password_hash,
            bio: "".to_string(),
            profile_image: None,
            cover_image: None,
            counters: UserCounters::default(),
            is_active: true,
            role: UserRole::User,
            following: HashMap::new(),
            followers: HashMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// The only place a user counter changes.
    fn apply_counter(&mut self, counter: UserCounter, change: CounterChange) {
        let value = match counter {
            UserCounter::Posts => &mut self.counters.post_count,
            UserCounter::Followers => &mut self.counters.follower_count,
            UserCounter::Following => &mut self.counters.following_count,
        };
        *value = change.apply(*value);
        self.updated_at = chrono::Utc::now();
    }

    fn ensure_active(&self) -> Result<(), SocialError> {
        if self.is_active {
            Ok(())
        } else {
            Err(SocialError::forbidden("Account is deactivated"))
        }
    }

    pub(crate) fn ensure_can_follow(&self, user_id: &str) -> Result<(), SocialError> {
        self.ensure_active()?;
        if user_id == self.user_id {
            Err(SocialError::validation("You cannot follow yourself"))
        } else if self.following.contains_key(user_id) {
            Err(SocialError::conflict("You are already following this user"))
        } else {
            Ok(())
        }
    }

    pub(crate) fn add_following(
        &mut self,
        user_id: String,
        created_at: chrono::DateTime<chrono::Utc>,
    ) -> bool {
        if user_id == self.user_id || self.following.contains_key(&user_id) {
            false
        } else {
            self.following
                .insert(user_id.clone(), FollowRef { user_id, created_at });
            self.apply_counter(UserCounter::Following, CounterChange::Increment);
            true
        }
    }

    fn remove_following(&mut self, user_id: &str) -> Result<(), SocialError> {
        if user_id == self.user_id {
            Err(SocialError::validation("Invalid operation"))
        } else if self.following.remove(user_id).is_none() {
            Err(SocialError::not_found("You are not following this user"))
        } else {
            self.apply_counter(UserCounter::Following, CounterChange::Decrement);
            Ok(())
        }
    }

    pub(crate) fn add_follower(
        &mut self,
        user_id: String,
        created_at: chrono::DateTime<chrono::Utc>,
    ) -> bool {
        if user_id == self.user_id || self.followers.contains_key(&user_id) {
            false
        } else {
            self.followers
                .insert(user_id.clone(), FollowRef { user_id, created_at });
            self.apply_counter(UserCounter::Followers, CounterChange::Increment);
            true
        }
    }

    fn remove_follower(&mut self, user_id: &str) -> bool {
        if self.followers.remove(user_id).is_some() {
            self.apply_counter(UserCounter::Followers, CounterChange::Decrement);
            true
        } else {
            false
        }
    }

    /// Adds the following edge; the returned notification is for the followed user.
    pub(crate) fn follow(
        &mut self,
        user_id: String,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<NewNotification, SocialError> {
        self.ensure_can_follow(&user_id)?;
        self.add_following(user_id.clone(), now);
        Ok(NewNotification::follow(user_id, self.user_id.clone()))
    }

    /// Follows when not following yet, unfollows otherwise.
    pub(crate) fn toggle_follow(
        &mut self,
        user_id: String,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<(FollowToggle, Option<NewNotification>), SocialError> {
        if self.is_following(&user_id) {
            self.remove_following(&user_id)?;
            let toggle = FollowToggle {
                action: FollowAction::Unfollowed,
                is_following: false,
            };
            Ok((toggle, None))
        } else {
            let notification = self.follow(user_id, now)?;
            let toggle = FollowToggle {
                action: FollowAction::Followed,
                is_following: true,
            };
            Ok((toggle, Some(notification)))
        }
    }

    pub fn is_following(&self, user_id: &str) -> bool {
        self.following.contains_key(user_id)
    }

    pub fn following_ids(&self) -> HashSet<String> {
        self.following.keys().cloned().collect()
    }

    fn update_profile(&mut self, update: ProfileUpdate) -> Result<(), SocialError> {
        let bio = update.bio.map(|bio| validate_bio(&bio)).transpose()?;

        if let Some(bio) = bio {
            self.bio = bio;
        }
        if let Some(profile_image) = update.profile_image {
            self.profile_image = non_empty(profile_image);
        }
        if let Some(cover_image) = update.cover_image {
            self.cover_image = non_empty(cover_image);
        }
        self.updated_at = chrono::Utc::now();
        Ok(())
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            user_id: self.user_id.clone(),
            username: self.username.clone(),
            email: self.email.clone(),
            bio: self.bio.clone(),
            profile_image: self.profile_image.clone(),
            cover_image: self.cover_image.clone(),
            counters: self.counters.clone(),
            is_active: self.is_active,
            role: self.role,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            user_id: self.user_id.clone(),
            username: self.username.clone(),
            email: self.email.clone(),
            bio: self.bio.clone(),
            profile_image: self.profile_image.clone(),
            follower_count: self.counters.follower_count,
            following_count: self.counters.following_count,
            post_count: self.counters.post_count,
            is_active: self.is_active,
        }
    }
}

fn non_empty(value: String) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Follow edges newest first.
pub fn newest_first(edges: &HashMap<String, FollowRef>) -> Vec<FollowRef> {
    let mut edges: Vec<FollowRef> = edges.values().cloned().collect();
    edges.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.user_id.cmp(&b.user_id))
    });
    edges
}

/// Users that `other_following` contains and that are also in `user_following`,
/// in the order of `other_following`.
pub fn mutual_following(
    user_following: &HashSet<String>,
    other_following: &[FollowRef],
) -> Vec<String> {
    other_following
        .iter()
        .filter(|f| user_following.contains(&f.user_id))
        .map(|f| f.user_id.clone())
        .collect()
}

fn edges_page(edges: &HashMap<String, FollowRef>, request: &PageRequest) -> FollowRefsPage {
    let (users, pagination) = paginate(&newest_first(edges), request);
    FollowRefsPage { users, pagination }
}

fn sync_directory(user: &User) {
    UserDirectoryAgentClient::get().trigger_user_updated(user.summary());
}

/// Fails with not-found unless the directory knows `user_id`.
///
/// The directory never calls back into a user agent while answering, so a
/// user agent may wait on it.
async fn ensure_user_exists(user_id: &str) -> Result<(), SocialError> {
    let users = UserDirectoryAgentClient::get()
        .get_users(vec![user_id.to_string()])
        .await;

    if users.is_empty() {
        Err(SocialError::user_not_found())
    } else {
        Ok(())
    }
}

/// The followed side is applied without waiting on it, so two users following
/// each other at the same time never wait on one another.
fn apply_follow_side_effects(
    state: &User,
    user_id: &str,
    now: chrono::DateTime<chrono::Utc>,
    notification: Option<NewNotification>,
) {
    sync_directory(state);
    UserAgentClient::get(user_id.to_string()).trigger_add_follower(state.user_id.clone(), now);
    if let Some(notification) = notification {
        notify(notification);
    }
}

#[agent_definition]
trait UserAgent {
    fn new(id: String) -> Self;

    fn get_user(&self) -> Option<UserProfile>;

    fn get_summary(&self) -> Option<UserSummary>;

    fn init_user(
        &mut self,
        username: String,
        email: String,
        password_hash: String,
    ) -> Result<UserProfile, SocialError>;

    fn update_profile(&mut self, update: ProfileUpdate) -> Result<UserProfile, SocialError>;

    fn set_active(&mut self, active: bool) -> Result<UserProfile, SocialError>;

    async fn create_post(
        &mut self,
        content: String,
        image: Option<String>,
    ) -> Result<PostSummary, SocialError>;

    fn post_deleted(&mut self, post_id: String) -> Result<(), SocialError>;

    async fn follow(&mut self, user_id: String) -> Result<(), SocialError>;

    fn unfollow(&mut self, user_id: String) -> Result<(), SocialError>;

    async fn toggle_follow(&mut self, user_id: String) -> Result<FollowToggle, SocialError>;

    fn is_following(&self, user_id: String) -> bool;

    fn add_follower(
        &mut self,
        user_id: String,
        created_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<(), SocialError>;

    fn remove_follower(&mut self, user_id: String) -> Result<(), SocialError>;

    fn get_following_ids(&self) -> Option<HashSet<String>>;

    fn get_all_following(&self) -> Option<Vec<FollowRef>>;

    fn get_following(&self, page: Option<u32>, limit: Option<u32>) -> Option<FollowRefsPage>;

    fn get_followers(&self, page: Option<u32>, limit: Option<u32>) -> Option<FollowRefsPage>;
}

struct UserAgentImpl {
    _id: String,
    state: Option<User>,
}

impl UserAgentImpl {
    fn existing_state(&mut self) -> Result<&mut User, SocialError> {
        self.state.as_mut().ok_or_else(SocialError::user_not_found)
    }

    fn with_existing_state<T>(
        &mut self,
        f: impl FnOnce(&mut User) -> Result<T, SocialError>,
    ) -> Result<T, SocialError> {
        f(self.existing_state()?)
    }
}

#[agent_implementation]
impl UserAgent for UserAgentImpl {
    fn new(id: String) -> Self {
        UserAgentImpl {
            _id: id,
            state: None,
        }
    }

    fn get_user(&self) -> Option<UserProfile> {
        self.state.as_ref().map(|s| s.profile())
    }

    fn get_summary(&self) -> Option<UserSummary> {
        self.state.as_ref().map(|s| s.summary())
    }

    fn init_user(
        &mut self,
        username: String,
        email: String,
        password_hash: String,
    ) -> Result<UserProfile, SocialError> {
        if self.state.is_some() {
            Err(SocialError::conflict("User already exists"))
        } else {
            let username = validate_username(&username)?;
            let email = validate_email(&email)?;
            log::info!("init user - user id: {}, username: {username}", self._id);

            let user = User::new(self._id.clone(), username, email, password_hash);
            let profile = user.profile();
            sync_directory(&user);
            self.state = Some(user);
            Ok(profile)
        }
    }

    fn update_profile(&mut self, update: ProfileUpdate) -> Result<UserProfile, SocialError> {
        self.with_existing_state(|state| {
            log::info!("update profile - user id: {}", state.user_id);
            state.update_profile(update)?;
            sync_directory(state);
            Ok(state.profile())
        })
    }

    fn set_active(&mut self, active: bool) -> Result<UserProfile, SocialError> {
        self.with_existing_state(|state| {
            log::info!("set active - user id: {}, active: {active}", state.user_id);
            state.is_active = active;
            state.updated_at = chrono::Utc::now();
            sync_directory(state);
            Ok(state.profile())
        })
    }

    async fn create_post(
        &mut self,
        content: String,
        image: Option<String>,
    ) -> Result<PostSummary, SocialError> {
        let user_id = {
            let state = self.existing_state()?;
            state.ensure_active()?;
            state.user_id.clone()
        };
        let content = validate_post_content(&content)?;
        let post_id = uuid::Uuid::new_v4().to_string();

        log::info!("create post - user id: {user_id}, post id: {post_id}");

        let post = PostAgentClient::get(post_id)
            .init_post(user_id, content, image)
            .await?;

        self.with_existing_state(|state| {
            state.apply_counter(UserCounter::Posts, CounterChange::Increment);
            sync_directory(state);
            Ok(post)
        })
    }

    fn post_deleted(&mut self, post_id: String) -> Result<(), SocialError> {
        self.with_existing_state(|state| {
            log::info!("post deleted - user id: {}, post id: {post_id}", state.user_id);
            state.apply_counter(UserCounter::Posts, CounterChange::Decrement);
            sync_directory(state);
            Ok(())
        })
    }

    async fn follow(&mut self, user_id: String) -> Result<(), SocialError> {
        self.existing_state()?.ensure_can_follow(&user_id)?;
        ensure_user_exists(&user_id).await?;

        self.with_existing_state(|state| {
            log::info!(
                "follow - follower id: {}, following id: {user_id}",
                state.user_id
            );
            let now = chrono::Utc::now();
            let notification = state.follow(user_id.clone(), now)?;
            apply_follow_side_effects(state, &user_id, now, Some(notification));
            Ok(())
        })
    }

    fn unfollow(&mut self, user_id: String) -> Result<(), SocialError> {
        self.with_existing_state(|state| {
            log::info!(
                "unfollow - follower id: {}, following id: {user_id}",
                state.user_id
            );
            state.remove_following(&user_id)?;
            sync_directory(state);

            UserAgentClient::get(user_id).trigger_remove_follower(state.user_id.clone());
            Ok(())
        })
    }

    async fn toggle_follow(&mut self, user_id: String) -> Result<FollowToggle, SocialError> {
        if !self.existing_state()?.is_following(&user_id) {
            ensure_user_exists(&user_id).await?;
        }

        self.with_existing_state(|state| {
            let now = chrono::Utc::now();
            let (toggle, notification) = state.toggle_follow(user_id.clone(), now)?;
            log::info!(
                "toggle follow - follower id: {}, following id: {user_id}, following: {}",
                state.user_id,
                toggle.is_following
            );

            if toggle.is_following {
                apply_follow_side_effects(state, &user_id, now, notification);
            } else {
                sync_directory(state);
                UserAgentClient::get(user_id).trigger_remove_follower(state.user_id.clone());
            }
            Ok(toggle)
        })
    }

    fn is_following(&self, user_id: String) -> bool {
        self.state
            .as_ref()
            .is_some_and(|s| s.is_following(&user_id))
    }

    fn add_follower(
        &mut self,
        user_id: String,
        created_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<(), SocialError> {
        self.with_existing_state(|state| {
            log::info!(
                "add follower - user id: {}, follower id: {user_id}",
                state.user_id
            );
            if user_id == state.user_id {
                Err(SocialError::validation("You cannot follow yourself"))
            } else {
                if state.add_follower(user_id, created_at) {
                    sync_directory(state);
                }
                Ok(())
            }
        })
    }

    fn remove_follower(&mut self, user_id: String) -> Result<(), SocialError> {
        self.with_existing_state(|state| {
            log::info!(
                "remove follower - user id: {}, follower id: {user_id}",
                state.user_id
            );
            if state.remove_follower(&user_id) {
                sync_directory(state);
            } else {
                log::warn!(
                    "remove follower - user id: {}, follower id: {user_id} - edge not found",
                    state.user_id
                );
            }
            Ok(())
        })
    }

    fn get_following_ids(&self) -> Option<HashSet<String>> {
        self.state.as_ref().map(|s| s.following_ids())
    }

    fn get_all_following(&self) -> Option<Vec<FollowRef>> {
        self.state.as_ref().map(|s| newest_first(&s.following))
    }

    fn get_following(&self, page: Option<u32>, limit: Option<u32>) -> Option<FollowRefsPage> {
        let request = PageRequest::with_default_limit(page, limit, FOLLOWS_DEFAULT_LIMIT);
        self.state.as_ref().map(|s| edges_page(&s.following, &request))
    }

    fn get_followers(&self, page: Option<u32>, limit: Option<u32>) -> Option<FollowRefsPage> {
        let request = PageRequest::with_default_limit(page, limit, FOLLOWS_DEFAULT_LIMIT);
        self.state.as_ref().map(|s| edges_page(&s.followers, &request))
    }

    async fn load_snapshot(&mut self, bytes: Vec<u8>) -> Result<(), String> {
        let data: Option<User> = crate::common::snapshot::deserialize(&bytes)?;
        self.state = data;
        Ok(())
    }

    async fn save_snapshot(&self) -> Result<Vec<u8>, String> {
        crate::common::snapshot::serialize(&self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ErrorKind;
    use crate::notification::NotificationType;

    fn create_test_user(user_id: &str) -> User {
        User::new(
            user_id.to_string(),
            format!("{user_id}_name"),
            format!("{user_id}@test.com"),
            "hash".to_string(),
        )
    }

    /// Applies both sides of a follow edge the way the agents do.
    fn follow(follower: &mut User, following: &mut User) -> Result<(), SocialError> {
        let now = chrono::Utc::now();
        follower.follow(following.user_id.clone(), now)?;
        following.add_follower(follower.user_id.clone(), now);
        Ok(())
    }

    fn unfollow(follower: &mut User, following: &mut User) -> Result<(), SocialError> {
        follower.remove_following(&following.user_id)?;
        following.remove_follower(&follower.user_id);
        Ok(())
    }

    fn assert_counters_match_edges(user: &User) {
        assert_eq!(user.counters.following_count, user.following.len() as u64);
        assert_eq!(user.counters.follower_count, user.followers.len() as u64);
    }

    #[test]
    fn test_user_new() {
        let user = create_test_user("u1");
        assert_eq!(user.user_id, "u1");
        assert!(user.is_active);
        assert_eq!(user.role, UserRole::User);
        assert_eq!(user.counters, UserCounters::default());
        assert!(user.following.is_empty());
        assert!(user.followers.is_empty());
    }

    #[test]
    fn test_follow_updates_both_counters_by_one() {
        let mut alice = create_test_user("alice");
        let mut bob = create_test_user("bob");

        follow(&mut alice, &mut bob).unwrap();

        assert!(alice.is_following("bob"));
        assert_eq!(alice.counters.following_count, 1);
        assert_eq!(bob.counters.follower_count, 1);
        assert_eq!(alice.counters.follower_count, 0);
        assert_counters_match_edges(&alice);
        assert_counters_match_edges(&bob);
    }

    #[test]
    fn test_self_follow_is_rejected() {
        let mut alice = create_test_user("alice");
        let err = alice.ensure_can_follow("alice").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert_eq!(err.message, "You cannot follow yourself");

        assert!(!alice.add_following("alice".to_string(), chrono::Utc::now()));
        assert!(!alice.add_follower("alice".to_string(), chrono::Utc::now()));
        assert_counters_match_edges(&alice);
    }

    #[test]
    fn test_follow_twice_is_a_conflict_and_state_is_unchanged() {
        let mut alice = create_test_user("alice");
        let mut bob = create_test_user("bob");
        follow(&mut alice, &mut bob).unwrap();

        let err = follow(&mut alice, &mut bob).unwrap_err();

        assert_eq!(err.kind, ErrorKind::Conflict);
        assert_eq!(err.message, "You are already following this user");
        assert_eq!(alice.counters.following_count, 1);
        assert_eq!(bob.counters.follower_count, 1);
    }

    #[test]
    fn test_follow_then_unfollow_nets_zero() {
        let mut alice = create_test_user("alice");
        let mut bob = create_test_user("bob");

        follow(&mut alice, &mut bob).unwrap();
        unfollow(&mut alice, &mut bob).unwrap();

        assert!(!alice.is_following("bob"));
        assert_eq!(alice.counters, UserCounters::default());
        assert_eq!(bob.counters, UserCounters::default());
    }

    #[test]
    fn test_unfollow_without_edge_fails() {
        let mut alice = create_test_user("alice");
        let mut bob = create_test_user("bob");

        let err = unfollow(&mut alice, &mut bob).unwrap_err();

        assert_eq!(err.kind, ErrorKind::NotFound);
        assert_eq!(alice.counters.following_count, 0);
        assert_eq!(
            alice.remove_following("alice").unwrap_err().message,
            "Invalid operation"
        );
    }

    #[test]
    fn test_remove_unknown_follower_keeps_counter() {
        let mut bob = create_test_user("bob");
        assert!(!bob.remove_follower("alice"));
        assert_eq!(bob.counters.follower_count, 0);
    }

    #[test]
    fn test_deactivated_user_cannot_follow() {
        let mut alice = create_test_user("alice");
        alice.is_active = false;
        assert_eq!(
            alice.ensure_can_follow("bob").unwrap_err().kind,
            ErrorKind::Forbidden
        );
    }

    #[test]
    fn test_post_counter_never_underflows() {
        let mut alice = create_test_user("alice");
        alice.apply_counter(UserCounter::Posts, CounterChange::Increment);
        alice.apply_counter(UserCounter::Posts, CounterChange::Decrement);
        alice.apply_counter(UserCounter::Posts, CounterChange::Decrement);
        assert_eq!(alice.counters.post_count, 0);
    }

    #[test]
    fn test_mutual_following_filters_other_users_edges() {
        let now = chrono::Utc::now();
        let user_following: HashSet<String> =
            ["carol", "dave"].iter().map(|s| s.to_string()).collect();
        let other_following = vec![
            FollowRef {
                user_id: "dave".to_string(),
                created_at: now,
            },
            FollowRef {
                user_id: "erin".to_string(),
                created_at: now,
            },
            FollowRef {
                user_id: "carol".to_string(),
                created_at: now,
            },
        ];

        let mutual = mutual_following(&user_following, &other_following);

        assert_eq!(mutual, vec!["dave".to_string(), "carol".to_string()]);
    }

    #[test]
    fn test_edges_are_listed_newest_first() {
        let mut bob = create_test_user("bob");
        let now = chrono::Utc::now();
        bob.add_follower("alice".to_string(), now);
        bob.add_follower("carol".to_string(), now + chrono::Duration::seconds(5));
        bob.add_follower("dave".to_string(), now + chrono::Duration::seconds(1));

        let page = edges_page(&bob.followers, &PageRequest::new(Some(1), Some(2)));

        let ids: Vec<&str> = page.users.iter().map(|f| f.user_id.as_str()).collect();
        assert_eq!(ids, vec!["carol", "dave"]);
        assert_eq!(page.pagination.total_items, 3);
        assert!(page.pagination.has_next_page);
    }

    #[test]
    fn test_update_profile() {
        let mut alice = create_test_user("alice");

        alice
            .update_profile(ProfileUpdate {
                bio: Some("  hello there ".to_string()),
                profile_image: Some("https://img/a.png".to_string()),
                cover_image: None,
            })
            .unwrap();

        assert_eq!(alice.bio, "hello there");
        assert_eq!(alice.profile_image.as_deref(), Some("https://img/a.png"));
        assert_eq!(alice.cover_image, None);

        let err = alice
            .update_profile(ProfileUpdate {
                bio: Some("x".repeat(201)),
                ..ProfileUpdate::default()
            })
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert_eq!(alice.bio, "hello there");
    }

    #[test]
    fn test_profile_and_summary_carry_counters() {
        let mut alice = create_test_user("alice");
        let mut bob = create_test_user("bob");
        follow(&mut alice, &mut bob).unwrap();

        let summary = bob.summary();
        assert_eq!(summary.follower_count, 1);
        assert_eq!(summary.username, "bob_name");

        let profile = alice.profile();
        assert_eq!(profile.counters.following_count, 1);
    }

    #[test]
    fn test_follow_notifies_followed_user() {
        let mut a = create_test_user("a");

        let notification = a.follow("b".to_string(), chrono::Utc::now()).unwrap();

        assert_eq!(notification.recipient_id, "b");
        assert_eq!(notification.sender_id, "a");
        assert_eq!(notification.notification_type, NotificationType::Follow);
        assert!(!notification.is_self_notification());
    }

    #[test]
    fn test_toggle_follow_twice_returns_to_original_state() {
        let mut a = create_test_user("a");
        let now = chrono::Utc::now();

        let (first, notification) = a.toggle_follow("b".to_string(), now).unwrap();
        assert_eq!(first.action, FollowAction::Followed);
        assert!(first.is_following);
        assert!(notification.is_some());
        assert!(a.is_following("b"));
        assert_eq!(a.counters.following_count, 1);

        let (second, notification) = a.toggle_follow("b".to_string(), now).unwrap();
        assert_eq!(second.action, FollowAction::Unfollowed);
        assert!(!second.is_following);
        assert!(notification.is_none());
        assert!(a.following.is_empty());
        assert_eq!(a.counters.following_count, 0);
        assert_counters_match_edges(&a);
    }

    #[test]
    fn test_toggle_follow_self_is_rejected() {
        let mut a = create_test_user("a");

        let err = a.toggle_follow("a".to_string(), chrono::Utc::now()).unwrap_err();

        assert_eq!(err.kind, ErrorKind::Validation);
        assert!(a.following.is_empty());
        assert_eq!(a.counters.following_count, 0);
    }
}
