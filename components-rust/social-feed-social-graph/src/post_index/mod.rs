use crate::common::settings::DEFAULT_LIMIT;
use crate::common::{paginate, PageRequest, Pagination};
use golem_rust::{agent_definition, agent_implementation, Schema};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Catalog entry of a post, enough to filter and order feeds without loading the post.
#[derive(Schema, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRef {
    pub post_id: String,
    pub created_by: String,
    pub like_count: u64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Schema, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PostOrder {
    #[default]
    Newest,
    MostLiked,
}

#[derive(Schema, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostQuery {
    /// Restricts the result to posts of these authors; `None` means all authors.
    pub authors: Option<Vec<String>>,
    pub created_since: Option<chrono::DateTime<chrono::Utc>>,
    pub order: PostOrder,
}

impl PostQuery {
    pub fn newest() -> Self {
        PostQuery::default()
    }

    pub fn by_authors(authors: Vec<String>) -> Self {
        PostQuery {
            authors: Some(authors),
            ..PostQuery::default()
        }
    }

    pub fn trending(created_since: chrono::DateTime<chrono::Utc>) -> Self {
        PostQuery {
            authors: None,
            created_since: Some(created_since),
            order: PostOrder::MostLiked,
        }
    }
}

#[derive(Schema, Clone, Debug, Serialize, Deserialize)]
pub struct PostRefsPage {
    pub posts: Vec<PostRef>,
    pub pagination: Pagination,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PostIndex {
    pub posts: HashMap<String, PostRef>,
    pub removed_posts: HashSet<String>,
}

impl PostIndex {
    /// Inserts or refreshes an entry; updates arriving after removal are ignored.
    fn update(&mut self, post: PostRef) -> bool {
        if self.removed_posts.contains(&post.post_id) {
            false
        } else {
            self.posts.insert(post.post_id.clone(), post);
            true
        }
    }

    fn remove(&mut self, post_id: &str) {
        self.posts.remove(post_id);
        self.removed_posts.insert(post_id.to_string());
    }

    pub fn query(&self, query: &PostQuery, request: &PageRequest) -> PostRefsPage {
        let authors: Option<HashSet<&String>> =
            query.authors.as_ref().map(|a| a.iter().collect());

        let mut posts: Vec<PostRef> = self
            .posts
            .values()
            .filter(|p| authors.as_ref().is_none_or(|a| a.contains(&p.created_by)))
            .filter(|p| query.created_since.is_none_or(|since| p.created_at >= since))
            .cloned()
            .collect();

        match query.order {
            PostOrder::Newest => posts.sort_by(|a, b| {
                b.created_at
                    .cmp(&a.created_at)
                    .then_with(|| a.post_id.cmp(&b.post_id))
            }),
            PostOrder::MostLiked => posts.sort_by(|a, b| {
                b.like_count
                    .cmp(&a.like_count)
                    .then_with(|| b.created_at.cmp(&a.created_at))
                    .then_with(|| a.post_id.cmp(&b.post_id))
            }),
        }

        let (posts, pagination) = paginate(&posts, request);
        PostRefsPage { posts, pagination }
    }
}

#[agent_definition]
trait PostIndexAgent {
    fn new() -> Self;

    fn post_updated(&mut self, post: PostRef);

    fn post_removed(&mut self, post_id: String);

    fn get_posts(&self, query: PostQuery, page: u32, limit: u32) -> PostRefsPage;
}

struct PostIndexAgentImpl {
    state: PostIndex,
}

#[agent_implementation]
impl PostIndexAgent for PostIndexAgentImpl {
    fn new() -> Self {
        PostIndexAgentImpl {
            state: PostIndex::default(),
        }
    }

    fn post_updated(&mut self, post: PostRef) {
        let post_id = post.post_id.clone();
        if self.state.update(post) {
            log::debug!("post updated - post id: {post_id}");
        } else {
            log::warn!("post updated - post id: {post_id} - post already removed");
        }
    }

    fn post_removed(&mut self, post_id: String) {
        log::info!("post removed - post id: {post_id}");
        self.state.remove(&post_id);
    }

    fn get_posts(&self, query: PostQuery, page: u32, limit: u32) -> PostRefsPage {
        // limits are already normalized by the caller
        let request = PageRequest::bounded(Some(page), Some(limit), DEFAULT_LIMIT, u32::MAX);
        self.state.query(&query, &request)
    }

    async fn load_snapshot(&mut self, bytes: Vec<u8>) -> Result<(), String> {
        self.state = crate::common::snapshot::deserialize(&bytes)?;
        Ok(())
    }

    async fn save_snapshot(&self) -> Result<Vec<u8>, String> {
        crate::common::snapshot::serialize(&self.state)
    }
}
