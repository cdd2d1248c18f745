use crate::common::settings::{COMMENTS_DEFAULT_LIMIT, LIKERS_DEFAULT_LIMIT, REPLIES_DEFAULT_LIMIT};
use crate::common::validation::{validate_comment_content, validate_post_content};
use crate::common::{paginate, CounterChange, PageRequest, Pagination, SocialError};
use crate::notification::{notify, NewNotification};
use crate::post_index::{PostIndexAgentClient, PostRef};
use crate::user::UserAgentClient;
use crate::user_directory::UserDirectoryAgentClient;
use crate::user_likes::UserLikesAgentClient;
use futures::future::join_all;
use golem_rust::{agent_definition, agent_implementation, Schema};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

const MAX_COMMENTS: usize = 2000;

static MENTION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^A-Za-z0-9_@])@([A-Za-z0-9_]{3,30})\b").expect("valid mention regex")
});

#[derive(Schema, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub comment_id: String,
    pub post_id: String,
    pub parent_comment_id: Option<String>,
    pub content: String,
    pub reply_count: u64,
    pub created_by: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Comment {
    fn new(
        post_id: String,
        user_id: String,
        content: String,
        parent_comment_id: Option<String>,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Self {
        let comment_id = uuid::Uuid::new_v4().to_string();
        Comment {
            comment_id,
            post_id,
            parent_comment_id,
            content,
            reply_count: 0,
            created_by: user_id,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Schema, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostLike {
    pub user_id: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Schema, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LikeAction {
    Liked,
    Unliked,
}

#[derive(Schema, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeToggle {
    pub action: LikeAction,
    pub is_liked: bool,
    pub like_count: u64,
}

#[derive(Schema, Clone, Debug, Default, Serialize, Deserialize)]
pub struct PostUpdate {
    pub content: Option<String>,
    /// An empty string removes the image.
    pub image: Option<String>,
}

#[derive(Schema, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostSummary {
    pub post_id: String,
    pub created_by: String,
    pub content: String,
    pub image: Option<String>,
    pub like_count: u64,
    pub comment_count: u64,
    pub is_edited: bool,
    pub edited_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Schema, Clone, Debug, Serialize, Deserialize)]
pub struct LikesPage {
    pub likes: Vec<PostLike>,
    pub pagination: Pagination,
}

#[derive(Schema, Clone, Debug, Serialize, Deserialize)]
pub struct CommentsPage {
    pub comments: Vec<Comment>,
    pub pagination: Pagination,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PostCounter {
    Likes,
    Comments,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Post {
    pub post_id: String,
    pub content: String,
    pub image: Option<String>,
    pub created_by: String,
    pub likes: HashMap<String, PostLike>,
    pub comments: HashMap<String, Comment>,
    pub like_count: u64,
    pub comment_count: u64,
    pub is_edited: bool,
    pub edited_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Post {
    pub(crate) fn new(
        post_id: String,
        created_by: String,
        content: String,
        image: Option<String>,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Self {
        Post {
            post_id,
            content,
            image: image.and_then(non_empty),
            created_by,
            likes: HashMap::new(),
            comments: HashMap::new(),
            like_count: 0,
            comment_count: 0,
            is_edited: false,
            edited_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// The only place a post counter changes.
    fn apply_counter(&mut self, counter: PostCounter, change: CounterChange, n: u64) {
        let value = match counter {
            PostCounter::Likes => &mut self.like_count,
            PostCounter::Comments => &mut self.comment_count,
        };
        *value = change.apply_n(*value, n);
    }

    fn ensure_author(&self, user_id: &str, action: &str) -> Result<(), SocialError> {
        if self.created_by == user_id {
            Ok(())
        } else {
            Err(SocialError::forbidden(format!(
                "Not authorized to {action} this post"
            )))
        }
    }

    fn update(
        &mut self,
        user_id: &str,
        update: PostUpdate,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<(), SocialError> {
        self.ensure_author(user_id, "update")?;
        let content = update
            .content
            .map(|c| validate_post_content(&c))
            .transpose()?;

        if let Some(content) = content {
            self.content = content;
        }
        if let Some(image) = update.image {
            self.image = non_empty(image);
        }
        self.is_edited = true;
        self.edited_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Removes the like of `user_id` if present, otherwise adds it.
    /// A new like on someone else's post yields a notification for the author.
    pub(crate) fn toggle_like(
        &mut self,
        user_id: String,
        now: chrono::DateTime<chrono::Utc>,
    ) -> (LikeToggle, Option<NewNotification>) {
        let (action, notification) = if self.likes.remove(&user_id).is_some() {
            self.apply_counter(PostCounter::Likes, CounterChange::Decrement, 1);
            (LikeAction::Unliked, None)
        } else {
            let notification = (user_id != self.created_by).then(|| {
                NewNotification::like(
                    self.created_by.clone(),
                    user_id.clone(),
                    self.post_id.clone(),
                )
            });
            self.likes.insert(
                user_id.clone(),
                PostLike {
                    user_id,
                    created_at: now,
                },
            );
            self.apply_counter(PostCounter::Likes, CounterChange::Increment, 1);
            (LikeAction::Liked, notification)
        };
        self.updated_at = now;

        let toggle = LikeToggle {
            action,
            is_liked: action == LikeAction::Liked,
            like_count: self.like_count,
        };
        (toggle, notification)
    }

    pub fn is_liked_by(&self, user_id: &str) -> bool {
        self.likes.contains_key(user_id)
    }

    fn likes_page(&self, request: &PageRequest) -> LikesPage {
        let mut likes: Vec<PostLike> = self.likes.values().cloned().collect();
        likes.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.user_id.cmp(&b.user_id))
        });
        let (likes, pagination) = paginate(&likes, request);
        LikesPage { likes, pagination }
    }

    pub(crate) fn add_comment(
        &mut self,
        user_id: String,
        content: String,
        parent_comment_id: Option<String>,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<(Comment, Option<NewNotification>), SocialError> {
        let content = validate_comment_content(&content)?;

        if self.comments.len() >= MAX_COMMENTS {
            return Err(SocialError::conflict("Max comments reached"));
        }

        if let Some(parent_id) = &parent_comment_id {
            match self.comments.get(parent_id) {
                None => return Err(SocialError::not_found("Parent comment not found")),
                Some(parent) if parent.parent_comment_id.is_some() => {
                    return Err(SocialError::validation(
                        "Replies can only be added to top-level comments",
                    ))
                }
                Some(_) => {}
            }
        }

        let comment = Comment::new(
            self.post_id.clone(),
            user_id,
            content,
            parent_comment_id.clone(),
            now,
        );

        if let Some(parent) = parent_comment_id.and_then(|id| self.comments.get_mut(&id)) {
            parent.reply_count = CounterChange::Increment.apply(parent.reply_count);
        }
        self.comments
            .insert(comment.comment_id.clone(), comment.clone());
        self.apply_counter(PostCounter::Comments, CounterChange::Increment, 1);
        self.updated_at = now;

        let notification = (comment.created_by != self.created_by).then(|| {
            NewNotification::comment(
                self.created_by.clone(),
                comment.created_by.clone(),
                self.post_id.clone(),
                comment.comment_id.clone(),
            )
        });

        Ok((comment, notification))
    }

    /// Deletes the comment and its direct replies; returns how many comments were removed.
    fn remove_comment(
        &mut self,
        comment_id: &str,
        user_id: &str,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<u64, SocialError> {
        let comment = self
            .comments
            .get(comment_id)
            .ok_or_else(|| SocialError::not_found("Comment not found"))?;

        if comment.created_by != user_id {
            return Err(SocialError::forbidden(
                "Not authorized to delete this comment",
            ));
        }

        let parent_comment_id = comment.parent_comment_id.clone();
        self.comments.remove(comment_id);

        if let Some(parent) = parent_comment_id.and_then(|id| self.comments.get_mut(&id)) {
            parent.reply_count = CounterChange::Decrement.apply(parent.reply_count);
        }

        let before = self.comments.len();
        self.comments
            .retain(|_, c| c.parent_comment_id.as_deref() != Some(comment_id));
        let removed = 1 + (before - self.comments.len()) as u64;

        self.apply_counter(PostCounter::Comments, CounterChange::Decrement, removed);
        self.updated_at = now;

        Ok(removed)
    }

    fn comments_page(&self, request: &PageRequest) -> CommentsPage {
        let mut comments: Vec<Comment> = self
            .comments
            .values()
            .filter(|c| c.parent_comment_id.is_none())
            .cloned()
            .collect();
        comments.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.comment_id.cmp(&b.comment_id))
        });
        let (comments, pagination) = paginate(&comments, request);
        CommentsPage {
            comments,
            pagination,
        }
    }

    fn replies_page(
        &self,
        comment_id: &str,
        request: &PageRequest,
    ) -> Result<CommentsPage, SocialError> {
        if !self.comments.contains_key(comment_id) {
            return Err(SocialError::not_found("Comment not found"));
        }

        let mut replies: Vec<Comment> = self
            .comments
            .values()
            .filter(|c| c.parent_comment_id.as_deref() == Some(comment_id))
            .cloned()
            .collect();
        replies.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.comment_id.cmp(&b.comment_id))
        });
        let (comments, pagination) = paginate(&replies, request);
        Ok(CommentsPage {
            comments,
            pagination,
        })
    }

    pub fn summary(&self) -> PostSummary {
        PostSummary {
            post_id: self.post_id.clone(),
            created_by: self.created_by.clone(),
            content: self.content.clone(),
            image: self.image.clone(),
            like_count: self.like_count,
            comment_count: self.comment_count,
            is_edited: self.is_edited,
            edited_at: self.edited_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    pub fn index_ref(&self) -> PostRef {
        PostRef {
            post_id: self.post_id.clone(),
            created_by: self.created_by.clone(),
            like_count: self.like_count,
            created_at: self.created_at,
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

/// Distinct `@username` mentions in order of appearance, compared case-insensitively.
pub fn extract_mentions(content: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    MENTION_REGEX
        .captures_iter(content)
        .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
        .filter(|username| seen.insert(username.to_lowercase()))
        .collect()
}

#[agent_definition]
trait PostAgent {
    fn new(id: String) -> Self;

    fn get_post(&self) -> Option<PostSummary>;

    fn init_post(
        &mut self,
        user_id: String,
        content: String,
        image: Option<String>,
    ) -> Result<PostSummary, SocialError>;

    fn update_post(
        &mut self,
        user_id: String,
        update: PostUpdate,
    ) -> Result<PostSummary, SocialError>;

    fn delete_post(&mut self, user_id: String) -> Result<(), SocialError>;

    fn toggle_like(&mut self, user_id: String) -> Result<LikeToggle, SocialError>;

    fn is_liked_by(&self, user_id: String) -> bool;

    fn get_likes(&self, page: Option<u32>, limit: Option<u32>) -> Option<LikesPage>;

    fn add_comment(
        &mut self,
        user_id: String,
        content: String,
        parent_comment_id: Option<String>,
    ) -> Result<Comment, SocialError>;

    fn delete_comment(&mut self, comment_id: String, user_id: String) -> Result<u64, SocialError>;

    fn get_comments(&self, page: Option<u32>, limit: Option<u32>) -> Option<CommentsPage>;

    fn get_replies(
        &self,
        comment_id: String,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> Result<CommentsPage, SocialError>;
}

struct PostAgentImpl {
    _id: String,
    state: Option<Post>,
}

impl PostAgentImpl {
    fn with_existing_state<T>(
        &mut self,
        f: impl FnOnce(&mut Post) -> Result<T, SocialError>,
    ) -> Result<T, SocialError> {
        match self.state.as_mut() {
            Some(state) => f(state),
            None => Err(SocialError::post_not_found()),
        }
    }
}

#[agent_implementation]
impl PostAgent for PostAgentImpl {
    fn new(id: String) -> Self {
        PostAgentImpl {
            _id: id,
            state: None,
        }
    }

    fn get_post(&self) -> Option<PostSummary> {
        self.state.as_ref().map(|s| s.summary())
    }

    fn init_post(
        &mut self,
        user_id: String,
        content: String,
        image: Option<String>,
    ) -> Result<PostSummary, SocialError> {
        if self.state.is_some() {
            Err(SocialError::conflict("Post already exists"))
        } else {
            let content = validate_post_content(&content)?;
            log::info!("init post - post id: {}, user id: {user_id}", self._id);

            let post = Post::new(
                self._id.clone(),
                user_id.clone(),
                content,
                image,
                chrono::Utc::now(),
            );

            PostIndexAgentClient::get().trigger_post_updated(post.index_ref());

            let mentions = extract_mentions(&post.content);
            if !mentions.is_empty() {
                UserDirectoryAgentClient::get().trigger_notify_mentions(
                    user_id,
                    post.post_id.clone(),
                    mentions,
                );
            }

            let summary = post.summary();
            self.state = Some(post);
            Ok(summary)
        }
    }

    fn update_post(
        &mut self,
        user_id: String,
        update: PostUpdate,
    ) -> Result<PostSummary, SocialError> {
        self.with_existing_state(|state| {
            log::info!(
                "update post - post id: {}, user id: {user_id}",
                state.post_id
            );
            state.update(&user_id, update, chrono::Utc::now())?;
            Ok(state.summary())
        })
    }

    fn delete_post(&mut self, user_id: String) -> Result<(), SocialError> {
        self.with_existing_state(|state| state.ensure_author(&user_id, "delete"))?;

        if let Some(post) = self.state.take() {
            log::info!(
                "delete post - post id: {}, user id: {user_id}, likes: {}, comments: {}",
                post.post_id,
                post.likes.len(),
                post.comments.len()
            );
            execute_post_deleted(&post);
        }
        Ok(())
    }

    fn toggle_like(&mut self, user_id: String) -> Result<LikeToggle, SocialError> {
        self.with_existing_state(|state| {
            let now = chrono::Utc::now();
            let (result, notification) = state.toggle_like(user_id.clone(), now);
            log::info!(
                "toggle like - post id: {}, user id: {user_id}, liked: {}, like count: {}",
                state.post_id,
                result.is_liked,
                result.like_count
            );

            PostIndexAgentClient::get().trigger_post_updated(state.index_ref());

            if result.is_liked {
                UserLikesAgentClient::get(user_id.clone()).trigger_like_added(
                    state.post_id.clone(),
                    now,
                );
            } else {
                UserLikesAgentClient::get(user_id).trigger_like_removed(state.post_id.clone());
            }
            if let Some(notification) = notification {
                notify(notification);
            }

            Ok(result)
        })
    }

    fn is_liked_by(&self, user_id: String) -> bool {
        self.state.as_ref().is_some_and(|s| s.is_liked_by(&user_id))
    }

    fn get_likes(&self, page: Option<u32>, limit: Option<u32>) -> Option<LikesPage> {
        let request = PageRequest::with_default_limit(page, limit, LIKERS_DEFAULT_LIMIT);
        self.state.as_ref().map(|s| s.likes_page(&request))
    }

    fn add_comment(
        &mut self,
        user_id: String,
        content: String,
        parent_comment_id: Option<String>,
    ) -> Result<Comment, SocialError> {
        self.with_existing_state(|state| {
            log::info!(
                "add comment - post id: {}, user id: {}, parent id: {}",
                state.post_id,
                user_id,
                parent_comment_id.clone().unwrap_or("N/A".to_string())
            );
            let (comment, notification) =
                state.add_comment(user_id, content, parent_comment_id, chrono::Utc::now())?;

            if let Some(notification) = notification {
                notify(notification);
            }

            Ok(comment)
        })
    }

    fn delete_comment(&mut self, comment_id: String, user_id: String) -> Result<u64, SocialError> {
        self.with_existing_state(|state| {
            let removed = state.remove_comment(&comment_id, &user_id, chrono::Utc::now())?;
            log::info!(
                "delete comment - post id: {}, comment id: {comment_id}, removed: {removed}, comment count: {}",
                state.post_id,
                state.comment_count
            );
            Ok(removed)
        })
    }

    fn get_comments(&self, page: Option<u32>, limit: Option<u32>) -> Option<CommentsPage> {
        let request = PageRequest::with_default_limit(page, limit, COMMENTS_DEFAULT_LIMIT);
        self.state.as_ref().map(|s| s.comments_page(&request))
    }

    fn get_replies(
        &self,
        comment_id: String,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> Result<CommentsPage, SocialError> {
        let request = PageRequest::with_default_limit(page, limit, REPLIES_DEFAULT_LIMIT);
        match &self.state {
            Some(state) => state.replies_page(&comment_id, &request),
            None => Err(SocialError::post_not_found()),
        }
    }

    async fn load_snapshot(&mut self, bytes: Vec<u8>) -> Result<(), String> {
        let data: Option<Post> = crate::common::snapshot::deserialize(&bytes)?;
        self.state = data;
        Ok(())
    }

    async fn save_snapshot(&self) -> Result<Vec<u8>, String> {
        crate::common::snapshot::serialize(&self.state)
    }
}

/// Deleting a post removes its likes, comments and catalog entry together with it.
fn execute_post_deleted(post: &Post) {
    UserAgentClient::get(post.created_by.clone()).trigger_post_deleted(post.post_id.clone());

    PostIndexAgentClient::get().trigger_post_removed(post.post_id.clone());

    for liker_id in post.likes.keys() {
        UserLikesAgentClient::get(liker_id.clone()).trigger_like_removed(post.post_id.clone());
    }
}

/// Fetches posts keeping the order of `post_ids`; missing posts are skipped.
pub async fn fetch_posts_by_ids(post_ids: &[String]) -> Vec<PostSummary> {
    let mut result: Vec<PostSummary> = vec![];

    for chunk in post_ids.chunks(10) {
        let clients = chunk
            .iter()
            .map(|post_id| PostAgentClient::get(post_id.clone()))
            .collect::<Vec<_>>();

        let tasks: Vec<_> = clients.iter().map(|client| client.get_post()).collect();
        let responses = join_all(tasks).await;

        result.extend(responses.into_iter().flatten());
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ErrorKind;
    use crate::notification::NotificationType;

    fn create_test_post() -> Post {
        Post::new(
            "post-1".to_string(),
            "author".to_string(),
            "hello".to_string(),
            None,
            chrono::Utc::now(),
        )
    }

    #[test]
    fn test_post_new() {
        let post = create_test_post();
        assert_eq!(post.post_id, "post-1");
        assert_eq!(post.created_by, "author");
        assert_eq!(post.like_count, 0);
        assert_eq!(post.comment_count, 0);
        assert!(!post.is_edited);
        assert!(post.edited_at.is_none());
        assert_eq!(post.created_at, post.updated_at);
    }

    #[test]
    fn test_toggle_like_twice_leaves_count_unchanged() {
        let mut post = create_test_post();
        let now = chrono::Utc::now();

        let (liked, _) = post.toggle_like("user1".to_string(), now);
        assert_eq!(liked.action, LikeAction::Liked);
        assert!(liked.is_liked);
        assert_eq!(liked.like_count, 1);
        assert!(post.is_liked_by("user1"));

        let (unliked, _) = post.toggle_like("user1".to_string(), now);
        assert_eq!(unliked.action, LikeAction::Unliked);
        assert!(!unliked.is_liked);
        assert_eq!(post.like_count, 0);
        assert!(post.likes.is_empty());
    }

    #[test]
    fn test_like_own_post_has_no_notification() {
        let mut post = create_test_post();
        let (liked, notification) = post.toggle_like("author".to_string(), chrono::Utc::now());
        assert!(liked.is_liked);
        assert!(notification.is_none());
    }

    #[test]
    fn test_like_other_post_notifies_author_once() {
        let mut post = create_test_post();
        let now = chrono::Utc::now();

        let (_, notification) = post.toggle_like("user1".to_string(), now);
        let notification = notification.unwrap();
        assert_eq!(notification.notification_type, NotificationType::Like);
        assert_eq!(notification.recipient_id, "author");
        assert_eq!(notification.sender_id, "user1");
        assert_eq!(notification.post_id.as_deref(), Some("post-1"));

        let (unliked, notification) = post.toggle_like("user1".to_string(), now);
        assert!(!unliked.is_liked);
        assert!(notification.is_none());
        assert!(post.likes.is_empty());
        assert_eq!(post.like_count, 0);
    }

    #[test]
    fn test_comment_notifies_post_author() {
        let mut post = create_test_post();
        let now = chrono::Utc::now();

        let (comment, notification) = post
            .add_comment("user1".to_string(), "Nice post!".to_string(), None, now)
            .unwrap();
        let notification = notification.unwrap();
        assert_eq!(notification.notification_type, NotificationType::Comment);
        assert_eq!(notification.recipient_id, "author");
        assert_eq!(notification.comment_id, Some(comment.comment_id.clone()));

        let (_, notification) = post
            .add_comment(
                "author".to_string(),
                "Thanks!".to_string(),
                Some(comment.comment_id),
                now,
            )
            .unwrap();
        assert!(notification.is_none());
    }

    #[test]
    fn test_like_count_tracks_edges() {
        let mut post = create_test_post();
        let now = chrono::Utc::now();
        for user in ["u1", "u2", "u3"] {
            post.toggle_like(user.to_string(), now);
        }
        post.toggle_like("u2".to_string(), now);

        assert_eq!(post.like_count, post.likes.len() as u64);
        assert_eq!(post.like_count, 2);
    }

    #[test]
    fn test_likes_page_newest_first() {
        let mut post = create_test_post();
        let now = chrono::Utc::now();
        post.toggle_like("u1".to_string(), now);
        post.toggle_like("u2".to_string(), now + chrono::Duration::seconds(2));
        post.toggle_like("u3".to_string(), now + chrono::Duration::seconds(1));

        let page = post.likes_page(&PageRequest::new(Some(1), Some(2)));
        let ids: Vec<&str> = page.likes.iter().map(|l| l.user_id.as_str()).collect();
        assert_eq!(ids, vec!["u2", "u3"]);
        assert_eq!(page.pagination.total_items, 3);
    }

    #[test]
    fn test_update_is_author_only_and_marks_edited() {
        let mut post = create_test_post();
        let now = chrono::Utc::now();

        let err = post
            .update(
                "intruder",
                PostUpdate {
                    content: Some("hacked".to_string()),
                    image: None,
                },
                now,
            )
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Forbidden);
        assert_eq!(post.content, "hello");

        post.update(
            "author",
            PostUpdate {
                content: Some(" updated ".to_string()),
                image: Some("https://img/p.png".to_string()),
            },
            now,
        )
        .unwrap();
        assert_eq!(post.content, "updated");
        assert_eq!(post.image.as_deref(), Some("https://img/p.png"));
        assert!(post.is_edited);
        assert_eq!(post.edited_at, Some(now));

        post.update(
            "author",
            PostUpdate {
                content: None,
                image: Some("".to_string()),
            },
            now,
        )
        .unwrap();
        assert_eq!(post.image, None);
    }

    #[test]
    fn test_add_comment_and_reply() {
        let mut post = create_test_post();
        let now = chrono::Utc::now();

        let (comment, _) = post
            .add_comment("user1".to_string(), "Nice post!".to_string(), None, now)
            .unwrap();
        let (reply, _) = post
            .add_comment(
                "user2".to_string(),
                "I agree.".to_string(),
                Some(comment.comment_id.clone()),
                now,
            )
            .unwrap();

        assert_eq!(post.comment_count, 2);
        assert_eq!(post.comments[&comment.comment_id].reply_count, 1);
        assert_eq!(reply.parent_comment_id, Some(comment.comment_id.clone()));
        assert_eq!(reply.post_id, "post-1");
    }

    #[test]
    fn test_add_comment_validation() {
        let mut post = create_test_post();
        let now = chrono::Utc::now();

        let err = post
            .add_comment("user1".to_string(), "x".to_string(), Some("missing".to_string()), now)
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
        assert_eq!(err.message, "Parent comment not found");

        let err = post
            .add_comment("user1".to_string(), "   ".to_string(), None, now)
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);

        let (top, _) = post
            .add_comment("user1".to_string(), "top".to_string(), None, now)
            .unwrap();
        let (reply, _) = post
            .add_comment("user2".to_string(), "reply".to_string(), Some(top.comment_id), now)
            .unwrap();
        let err = post
            .add_comment("user3".to_string(), "nested".to_string(), Some(reply.comment_id), now)
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert_eq!(post.comment_count, 2);
    }

    #[test]
    fn test_delete_comment_with_replies_decrements_by_n_plus_one() {
        let mut post = create_test_post();
        let now = chrono::Utc::now();

        let (top, _) = post
            .add_comment("user1".to_string(), "top".to_string(), None, now)
            .unwrap();
        let (other, _) = post
            .add_comment("user2".to_string(), "other".to_string(), None, now)
            .unwrap();
        for i in 0..3 {
            post.add_comment(
                format!("replier{i}"),
                "reply".to_string(),
                Some(top.comment_id.clone()),
                now,
            )
            .unwrap();
        }
        assert_eq!(post.comment_count, 5);

        let removed = post.remove_comment(&top.comment_id, "user1", now).unwrap();

        assert_eq!(removed, 4);
        assert_eq!(post.comment_count, 1);
        assert_eq!(post.comments.len(), 1);
        assert!(post.comments.contains_key(&other.comment_id));
    }

    #[test]
    fn test_delete_reply_decrements_parent_reply_count() {
        let mut post = create_test_post();
        let now = chrono::Utc::now();

        let (top, _) = post
            .add_comment("user1".to_string(), "top".to_string(), None, now)
            .unwrap();
        let (reply, _) = post
            .add_comment(
                "user2".to_string(),
                "reply".to_string(),
                Some(top.comment_id.clone()),
                now,
            )
            .unwrap();

        assert_eq!(post.remove_comment(&reply.comment_id, "user2", now).unwrap(), 1);
        assert_eq!(post.comments[&top.comment_id].reply_count, 0);
        assert_eq!(post.comment_count, 1);
    }

    #[test]
    fn test_delete_comment_is_author_only() {
        let mut post = create_test_post();
        let now = chrono::Utc::now();
        let (comment, _) = post
            .add_comment("user1".to_string(), "mine".to_string(), None, now)
            .unwrap();

        let err = post
            .remove_comment(&comment.comment_id, "user2", now)
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Forbidden);

        let err = post.remove_comment("missing", "user1", now).unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
        assert_eq!(post.comment_count, 1);
    }

    #[test]
    fn test_comment_listings() {
        let mut post = create_test_post();
        let now = chrono::Utc::now();

        let (first, _) = post
            .add_comment("user1".to_string(), "first".to_string(), None, now)
            .unwrap();
        let (second, _) = post
            .add_comment(
                "user2".to_string(),
                "second".to_string(),
                None,
                now + chrono::Duration::seconds(1),
            )
            .unwrap();
        let (reply_late, _) = post
            .add_comment(
                "user3".to_string(),
                "late".to_string(),
                Some(first.comment_id.clone()),
                now + chrono::Duration::seconds(5),
            )
            .unwrap();
        let (reply_early, _) = post
            .add_comment(
                "user4".to_string(),
                "early".to_string(),
                Some(first.comment_id.clone()),
                now + chrono::Duration::seconds(2),
            )
            .unwrap();

        let top = post.comments_page(&PageRequest::default());
        let top_ids: Vec<&str> = top.comments.iter().map(|c| c.comment_id.as_str()).collect();
        assert_eq!(top_ids, vec![second.comment_id.as_str(), first.comment_id.as_str()]);

        let replies = post
            .replies_page(&first.comment_id, &PageRequest::default())
            .unwrap();
        let reply_ids: Vec<&str> = replies
            .comments
            .iter()
            .map(|c| c.comment_id.as_str())
            .collect();
        assert_eq!(
            reply_ids,
            vec![reply_early.comment_id.as_str(), reply_late.comment_id.as_str()]
        );

        assert!(post.replies_page("missing", &PageRequest::default()).is_err());
    }

    #[test]
    fn test_extract_mentions() {
        let mentions = extract_mentions("hi @alice and @Bob_2, also @alice again; mail a@bc.de @xy");
        assert_eq!(mentions, vec!["alice".to_string(), "Bob_2".to_string()]);
        assert!(extract_mentions("no mentions here").is_empty());
    }

    #[test]
    fn test_summary_and_index_ref() {
        let mut post = create_test_post();
        post.toggle_like("user1".to_string(), chrono::Utc::now());

        let summary = post.summary();
        assert_eq!(summary.like_count, 1);
        assert_eq!(summary.content, "hello");

        let index_ref = post.index_ref();
        assert_eq!(index_ref.like_count, 1);
        assert_eq!(index_ref.created_by, "author");
    }
}
