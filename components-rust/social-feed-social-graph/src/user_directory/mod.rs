use crate::common::query::{self, Query};
use crate::common::settings::SUGGESTIONS_DEFAULT_LIMIT;
use crate::common::validation::{validate_email, validate_username};
use crate::common::{paginate, PageRequest, Pagination, SocialError};
use crate::notification::{notify, NewNotification};
use crate::user::{UserAgentClient, UserProfile, UserSummary};
use golem_rust::{agent_definition, agent_implementation, Schema};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Schema, Clone, Debug, Serialize, Deserialize)]
pub struct UsersPage {
    pub users: Vec<UserSummary>,
    pub pagination: Pagination,
}

/// Registry of all users with case-insensitive username and email uniqueness.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Directory {
    pub users: HashMap<String, UserSummary>,
    pub usernames: HashMap<String, String>,
    pub emails: HashMap<String, String>,
}

impl Directory {
    fn reserve(&mut self, user_id: &str, username: &str, email: &str) -> Result<(), SocialError> {
        let username_key = username.to_lowercase();
        let email_key = email.to_lowercase();

        if self.usernames.contains_key(&username_key) || self.emails.contains_key(&email_key) {
            return Err(SocialError::conflict(
                "User already exists with this email or username",
            ));
        }

        self.usernames.insert(username_key, user_id.to_string());
        self.emails.insert(email_key, user_id.to_string());
        Ok(())
    }

    fn release(&mut self, user_id: &str) {
        self.usernames.retain(|_, id| id != user_id);
        self.emails.retain(|_, id| id != user_id);
        self.users.remove(user_id);
    }

    fn upsert(&mut self, summary: UserSummary) {
        if let Some(previous) = self.users.get(&summary.user_id) {
            if !previous.username.eq_ignore_ascii_case(&summary.username) {
                self.usernames.remove(&previous.username.to_lowercase());
            }
            if !previous.email.eq_ignore_ascii_case(&summary.email) {
                self.emails.remove(&previous.email.to_lowercase());
            }
        }
        self.usernames
            .insert(summary.username.to_lowercase(), summary.user_id.clone());
        self.emails
            .insert(summary.email.to_lowercase(), summary.user_id.clone());
        self.users.insert(summary.user_id.clone(), summary);
    }

    pub fn find_by_username(&self, username: &str) -> Option<&UserSummary> {
        self.usernames
            .get(&username.to_lowercase())
            .and_then(|id| self.users.get(id))
    }

    /// Summaries in the order of `user_ids`; unknown ids are skipped.
    pub fn get_users(&self, user_ids: &[String]) -> Vec<UserSummary> {
        user_ids
            .iter()
            .filter_map(|id| self.users.get(id).cloned())
            .collect()
    }

    /// Most followed users outside of `excluded` and `user_id` itself.
    pub fn suggestions(
        &self,
        user_id: &str,
        excluded: &HashSet<String>,
        limit: usize,
    ) -> Vec<UserSummary> {
        let mut candidates: Vec<&UserSummary> = self
            .users
            .values()
            .filter(|u| u.user_id != user_id && !excluded.contains(&u.user_id))
            .collect();

        candidates.sort_by(|a, b| {
            b.follower_count
                .cmp(&a.follower_count)
                .then_with(|| a.username.to_lowercase().cmp(&b.username.to_lowercase()))
        });

        candidates.into_iter().take(limit).cloned().collect()
    }

    pub fn search(
        &self,
        query: &str,
        current_user_id: Option<&str>,
        request: &PageRequest,
    ) -> UsersPage {
        let matcher = UserQueryMatcher::new(query);

        let mut found: Vec<UserSummary> = self
            .users
            .values()
            .filter(|u| u.is_active && Some(u.user_id.as_str()) != current_user_id)
            .filter(|u| matcher.matches_user(u))
            .cloned()
            .collect();
        found.sort_by(|a, b| {
            a.username
                .to_lowercase()
                .cmp(&b.username.to_lowercase())
        });

        let (users, pagination) = paginate(&found, request);
        UsersPage { users, pagination }
    }
}

struct UserQueryMatcher {
    query: Query,
}

impl UserQueryMatcher {
    fn new(query: &str) -> Self {
        Self {
            query: Query::new(query),
        }
    }

    fn matches_user(&self, user: &UserSummary) -> bool {
        if self.query.is_empty() {
            return false;
        }

        for (field, value) in self.query.field_filters.iter() {
            let matches = match field.as_str() {
                "username" => query::text_matches(&user.username, value),
                "email" => query::text_matches(&user.email, value),
                "user-id" | "user_id" => query::text_exact_matches(&user.user_id, value),
                _ => false,
            };

            if !matches {
                return false;
            }
        }

        self.query.terms.iter().all(|term| {
            query::text_matches(&user.username, term) || query::text_matches(&user.email, term)
        })
    }
}

#[agent_definition]
trait UserDirectoryAgent {
    fn new() -> Self;

    async fn register_user(
        &mut self,
        username: String,
        email: String,
        password_hash: String,
    ) -> Result<UserProfile, SocialError>;

    fn user_updated(&mut self, user: UserSummary);

    fn get_user_by_username(&self, username: String) -> Option<UserSummary>;

    fn get_users(&self, user_ids: Vec<String>) -> Vec<UserSummary>;

    fn get_suggestions(
        &self,
        user_id: String,
        excluded: Vec<String>,
        limit: Option<u32>,
    ) -> Vec<UserSummary>;

    fn search_users(
        &self,
        query: String,
        current_user_id: Option<String>,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> UsersPage;

    fn notify_mentions(&self, sender_id: String, post_id: String, usernames: Vec<String>);
}

struct UserDirectoryAgentImpl {
    state: Directory,
}

#[agent_implementation]
impl UserDirectoryAgent for UserDirectoryAgentImpl {
    fn new() -> Self {
        UserDirectoryAgentImpl {
            state: Directory::default(),
        }
    }

    async fn register_user(
        &mut self,
        username: String,
        email: String,
        password_hash: String,
    ) -> Result<UserProfile, SocialError> {
        let username = validate_username(&username)?;
        let email = validate_email(&email)?;
        let user_id = uuid::Uuid::new_v4().to_string();

        self.state.reserve(&user_id, &username, &email)?;

        log::info!("register user - user id: {user_id}, username: {username}");

        let result = UserAgentClient::get(user_id.clone())
            .init_user(username, email, password_hash)
            .await;

        if let Err(error) = &result {
            log::warn!("register user - user id: {user_id}, init failed: {error}");
            self.state.release(&user_id);
        }

        result
    }

    fn user_updated(&mut self, user: UserSummary) {
        log::debug!("user updated - user id: {}", user.user_id);
        self.state.upsert(user);
    }

    fn get_user_by_username(&self, username: String) -> Option<UserSummary> {
        self.state.find_by_username(&username).cloned()
    }

    fn get_users(&self, user_ids: Vec<String>) -> Vec<UserSummary> {
        self.state.get_users(&user_ids)
    }

    fn get_suggestions(
        &self,
        user_id: String,
        excluded: Vec<String>,
        limit: Option<u32>,
    ) -> Vec<UserSummary> {
        let limit = PageRequest::with_default_limit(None, limit, SUGGESTIONS_DEFAULT_LIMIT).limit;
        let excluded: HashSet<String> = excluded.into_iter().collect();
        self.state
            .suggestions(&user_id, &excluded, limit as usize)
    }

    fn search_users(
        &self,
        query: String,
        current_user_id: Option<String>,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> UsersPage {
        log::debug!("search users - query: {query}");
        self.state
            .search(&query, current_user_id.as_deref(), &PageRequest::new(page, limit))
    }

    fn notify_mentions(&self, sender_id: String, post_id: String, usernames: Vec<String>) {
        let recipients: HashSet<String> = usernames
            .iter()
            .filter_map(|username| self.state.find_by_username(username))
            .filter(|user| user.is_active && user.user_id != sender_id)
            .map(|user| user.user_id.clone())
            .collect();

        log::info!(
            "notify mentions - post id: {post_id}, sender id: {sender_id}, recipients: {}",
            recipients.len()
        );

        for recipient_id in recipients {
            notify(NewNotification::mention(
                recipient_id,
                sender_id.clone(),
                post_id.clone(),
            ));
        }
    }

    async fn load_snapshot(&mut self, bytes: Vec<u8>) -> Result<(), String> {
        self.state = crate::common::snapshot::deserialize(&bytes)?;
        Ok(())
    }

    async fn save_snapshot(&self) -> Result<Vec<u8>, String> {
        crate::common::snapshot::serialize(&self.state)
    }
}
