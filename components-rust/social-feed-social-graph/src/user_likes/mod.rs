use crate::common::settings::DEFAULT_LIMIT;
use crate::common::{paginate, PageRequest, Pagination};
use golem_rust::{agent_definition, agent_implementation, Schema};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Schema, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikedRef {
    pub post_id: String,
    pub liked_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Schema, Clone, Debug, Serialize, Deserialize)]
pub struct LikedRefsPage {
    pub posts: Vec<LikedRef>,
    pub pagination: Pagination,
}

/// Posts liked by one user, mirrored from the like edges kept by the posts.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserLikes {
    pub user_id: String,
    pub likes: HashMap<String, chrono::DateTime<chrono::Utc>>,
}

impl UserLikes {
    fn new(user_id: String) -> Self {
        UserLikes {
            user_id,
            likes: HashMap::new(),
        }
    }

    fn add(&mut self, post_id: String, liked_at: chrono::DateTime<chrono::Utc>) {
        self.likes.insert(post_id, liked_at);
    }

    fn remove(&mut self, post_id: &str) -> bool {
        self.likes.remove(post_id).is_some()
    }

    pub fn is_liked(&self, post_id: &str) -> bool {
        self.likes.contains_key(post_id)
    }

    /// The subset of `post_ids` liked by the user, in the given order.
    pub fn liked_among(&self, post_ids: &[String]) -> Vec<String> {
        post_ids
            .iter()
            .filter(|id| self.is_liked(id))
            .cloned()
            .collect()
    }

    pub fn page(&self, request: &PageRequest) -> LikedRefsPage {
        let mut liked: Vec<LikedRef> = self
            .likes
            .iter()
            .map(|(post_id, liked_at)| LikedRef {
                post_id: post_id.clone(),
                liked_at: *liked_at,
            })
            .collect();
        liked.sort_by(|a, b| {
            b.liked_at
                .cmp(&a.liked_at)
                .then_with(|| a.post_id.cmp(&b.post_id))
        });
        let (posts, pagination) = paginate(&liked, request);
        LikedRefsPage { posts, pagination }
    }
}

#[agent_definition]
trait UserLikesAgent {
    fn new(id: String) -> Self;

    fn like_added(&mut self, post_id: String, liked_at: chrono::DateTime<chrono::Utc>);

    fn like_removed(&mut self, post_id: String);

    fn is_liked(&self, post_id: String) -> bool;

    fn liked_among(&self, post_ids: Vec<String>) -> Vec<String>;

    fn get_liked(&self, page: u32, limit: u32) -> LikedRefsPage;
}

struct UserLikesAgentImpl {
    _id: String,
    state: Option<UserLikes>,
}

impl UserLikesAgentImpl {
    fn get_state(&mut self) -> &mut UserLikes {
        self.state
            .get_or_insert_with(|| UserLikes::new(self._id.clone()))
    }
}

#[agent_implementation]
impl UserLikesAgent for UserLikesAgentImpl {
    fn new(id: String) -> Self {
        UserLikesAgentImpl {
            _id: id,
            state: None,
        }
    }

    fn like_added(&mut self, post_id: String, liked_at: chrono::DateTime<chrono::Utc>) {
        let state = self.get_state();
        log::info!(
            "like added - user id: {}, post id: {post_id}",
            state.user_id
        );
        state.add(post_id, liked_at);
    }

    fn like_removed(&mut self, post_id: String) {
        let state = self.get_state();
        log::info!(
            "like removed - user id: {}, post id: {post_id}",
            state.user_id
        );
        if !state.remove(&post_id) {
            log::warn!(
                "like removed - user id: {}, post id: {post_id} - like not found",
                state.user_id
            );
        }
    }

    fn is_liked(&self, post_id: String) -> bool {
        self.state.as_ref().is_some_and(|s| s.is_liked(&post_id))
    }

    fn liked_among(&self, post_ids: Vec<String>) -> Vec<String> {
        self.state
            .as_ref()
            .map(|s| s.liked_among(&post_ids))
            .unwrap_or_default()
    }

    fn get_liked(&self, page: u32, limit: u32) -> LikedRefsPage {
        // limits are already normalized by the caller
        let request = PageRequest::bounded(Some(page), Some(limit), DEFAULT_LIMIT, u32::MAX);
        match &self.state {
            Some(state) => state.page(&request),
            None => LikedRefsPage {
                posts: vec![],
                pagination: request.pagination(0),
            },
        }
    }

    async fn load_snapshot(&mut self, bytes: Vec<u8>) -> Result<(), String> {
        let data: Option<UserLikes> = crate::common::snapshot::deserialize(&bytes)?;
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

    fn create_test_likes() -> UserLikes {
        let now = chrono::Utc::now();
        let mut likes = UserLikes::new("u1".to_string());
        likes.add("p1".to_string(), now - chrono::Duration::minutes(3));
        likes.add("p2".to_string(), now - chrono::Duration::minutes(1));
        likes.add("p3".to_string(), now - chrono::Duration::minutes(2));
        likes
    }

    #[test]
    fn test_liked_among_keeps_order() {
        let likes = create_test_likes();
        let liked = likes.liked_among(&[
            "p3".to_string(),
            "p9".to_string(),
            "p1".to_string(),
        ]);
        assert_eq!(liked, vec!["p3".to_string(), "p1".to_string()]);
    }

    #[test]
    fn test_page_newest_first() {
        let likes = create_test_likes();
        let page = likes.page(&PageRequest::new(Some(1), Some(2)));
        let ids: Vec<&str> = page.posts.iter().map(|p| p.post_id.as_str()).collect();
        assert_eq!(ids, vec!["p2", "p3"]);
        assert!(page.pagination.has_next_page);
    }

    #[test]
    fn test_remove() {
        let mut likes = create_test_likes();
        assert!(likes.remove("p2"));
        assert!(!likes.remove("p2"));
        assert!(!likes.is_liked("p2"));
        assert_eq!(likes.likes.len(), 2);
    }
}
