use crate::common::settings::{Settings, DEFAULT_LIMIT};
use crate::common::{PageRequest, Pagination, SocialError};
use crate::post::{fetch_posts_by_ids, PostSummary};
use crate::post_index::{PostIndexAgentClient, PostQuery, PostRefsPage};
use crate::user::UserAgentClient;
use crate::user_likes::{LikedRefsPage, UserLikesAgentClient};
use golem_rust::{agent_definition, agent_implementation, Schema};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Schema, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeedPost {
    pub post: PostSummary,
    /// `None` for anonymous viewers.
    pub is_liked: Option<bool>,
}

#[derive(Schema, Clone, Debug, Serialize, Deserialize)]
pub struct FeedPage {
    pub posts: Vec<FeedPost>,
    pub pagination: Pagination,
}

/// Collaborators the feed composer reads from.
#[allow(async_fn_in_trait)]
pub trait FeedSources {
    /// Users followed by `user_id`; fails when the user does not exist.
    async fn following_ids(&self, user_id: &str) -> Result<HashSet<String>, SocialError>;

    async fn post_refs(&self, query: PostQuery, request: &PageRequest) -> PostRefsPage;

    /// Posts in the order of `post_ids`, skipping deleted ones.
    async fn posts(&self, post_ids: &[String]) -> Vec<PostSummary>;

    /// The subset of `post_ids` liked by `user_id`, answered in one lookup.
    async fn liked_among(&self, user_id: &str, post_ids: &[String]) -> HashSet<String>;

    async fn liked_refs(&self, user_id: &str, request: &PageRequest) -> LikedRefsPage;
}

pub struct FeedComposer<S: FeedSources> {
    sources: S,
    settings: Settings,
}

impl<S: FeedSources> FeedComposer<S> {
    pub fn new(sources: S, settings: Settings) -> Self {
        FeedComposer { sources, settings }
    }

    pub fn page_request(&self, page: Option<u32>, limit: Option<u32>) -> PageRequest {
        PageRequest::bounded(page, limit, DEFAULT_LIMIT, self.settings.max_limit)
    }

    /// Posts of the user and of everyone the user follows, newest first.
    pub async fn personal_feed(
        &self,
        user_id: &str,
        request: &PageRequest,
    ) -> Result<FeedPage, SocialError> {
        let mut authors: Vec<String> = self
            .sources
            .following_ids(user_id)
            .await?
            .into_iter()
            .collect();
        authors.push(user_id.to_string());

        Ok(self
            .compose(PostQuery::by_authors(authors), Some(user_id), request)
            .await)
    }

    pub async fn global_feed(&self, viewer_id: Option<&str>, request: &PageRequest) -> FeedPage {
        self.compose(PostQuery::newest(), viewer_id, request).await
    }

    /// Posts of the trending window, most liked first and newer first on ties.
    pub async fn trending_feed(
        &self,
        viewer_id: Option<&str>,
        request: &PageRequest,
        now: chrono::DateTime<chrono::Utc>,
    ) -> FeedPage {
        let query = PostQuery::trending(now - self.settings.trending_window());
        self.compose(query, viewer_id, request).await
    }

    pub async fn user_posts(
        &self,
        author_id: &str,
        viewer_id: Option<&str>,
        request: &PageRequest,
    ) -> FeedPage {
        let query = PostQuery::by_authors(vec![author_id.to_string()]);
        self.compose(query, viewer_id, request).await
    }

    /// Posts liked by the user, most recently liked first; deleted posts are skipped.
    pub async fn liked_posts(&self, user_id: &str, request: &PageRequest) -> FeedPage {
        let liked = self.sources.liked_refs(user_id, request).await;
        let post_ids: Vec<String> = liked.posts.iter().map(|p| p.post_id.clone()).collect();

        let posts = self
            .sources
            .posts(&post_ids)
            .await
            .into_iter()
            .map(|post| FeedPost {
                post,
                is_liked: Some(true),
            })
            .collect();

        FeedPage {
            posts,
            pagination: liked.pagination,
        }
    }

    pub async fn get_post(
        &self,
        post_id: &str,
        viewer_id: Option<&str>,
    ) -> Result<FeedPost, SocialError> {
        let posts = self.sources.posts(&[post_id.to_string()]).await;
        self.annotate(posts, viewer_id)
            .await
            .pop()
            .ok_or_else(SocialError::post_not_found)
    }

    async fn compose(
        &self,
        query: PostQuery,
        viewer_id: Option<&str>,
        request: &PageRequest,
    ) -> FeedPage {
        let refs = self.sources.post_refs(query, request).await;
        let post_ids: Vec<String> = refs.posts.iter().map(|p| p.post_id.clone()).collect();
        let posts = self.sources.posts(&post_ids).await;

        FeedPage {
            posts: self.annotate(posts, viewer_id).await,
            pagination: refs.pagination,
        }
    }

    async fn annotate(&self, posts: Vec<PostSummary>, viewer_id: Option<&str>) -> Vec<FeedPost> {
        match viewer_id {
            Some(viewer_id) if !posts.is_empty() => {
                let post_ids: Vec<String> = posts.iter().map(|p| p.post_id.clone()).collect();
                let liked = self.sources.liked_among(viewer_id, &post_ids).await;

                posts
                    .into_iter()
                    .map(|post| FeedPost {
                        is_liked: Some(liked.contains(&post.post_id)),
                        post,
                    })
                    .collect()
            }
            Some(_) => vec![],
            None => posts
                .into_iter()
                .map(|post| FeedPost {
                    post,
                    is_liked: None,
                })
                .collect(),
        }
    }
}

/// Sources backed by the user, post index, post and like agents.
pub struct AgentFeedSources;

impl FeedSources for AgentFeedSources {
    async fn following_ids(&self, user_id: &str) -> Result<HashSet<String>, SocialError> {
        UserAgentClient::get(user_id.to_string())
            .get_following_ids()
            .await
            .ok_or_else(SocialError::user_not_found)
    }

    async fn post_refs(&self, query: PostQuery, request: &PageRequest) -> PostRefsPage {
        PostIndexAgentClient::get()
            .get_posts(query, request.page, request.limit)
            .await
    }

    async fn posts(&self, post_ids: &[String]) -> Vec<PostSummary> {
        fetch_posts_by_ids(post_ids).await
    }

    async fn liked_among(&self, user_id: &str, post_ids: &[String]) -> HashSet<String> {
        UserLikesAgentClient::get(user_id.to_string())
            .liked_among(post_ids.to_vec())
            .await
            .into_iter()
            .collect()
    }

    async fn liked_refs(&self, user_id: &str, request: &PageRequest) -> LikedRefsPage {
        UserLikesAgentClient::get(user_id.to_string())
            .get_liked(request.page, request.limit)
            .await
    }
}

#[agent_definition(mode = "ephemeral")]
trait FeedAgent {
    fn new() -> Self;

    async fn get_personal_feed(
        &mut self,
        user_id: String,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> Result<FeedPage, SocialError>;

    async fn get_global_feed(
        &mut self,
        viewer_id: Option<String>,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> FeedPage;

    async fn get_trending_feed(
        &mut self,
        viewer_id: Option<String>,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> FeedPage;

    async fn get_user_posts(
        &mut self,
        user_id: String,
        viewer_id: Option<String>,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> FeedPage;

    async fn get_liked_posts(
        &mut self,
        user_id: String,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> FeedPage;

    async fn get_post(
        &mut self,
        post_id: String,
        viewer_id: Option<String>,
    ) -> Result<FeedPost, SocialError>;
}

struct FeedAgentImpl {
    composer: FeedComposer<AgentFeedSources>,
}

#[agent_implementation]
impl FeedAgent for FeedAgentImpl {
    fn new() -> Self {
        FeedAgentImpl {
            composer: FeedComposer::new(AgentFeedSources, Settings::from_env()),
        }
    }

    async fn get_personal_feed(
        &mut self,
        user_id: String,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> Result<FeedPage, SocialError> {
        log::debug!("get personal feed - user id: {user_id}");
        let request = self.composer.page_request(page, limit);
        self.composer.personal_feed(&user_id, &request).await
    }

    async fn get_global_feed(
        &mut self,
        viewer_id: Option<String>,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> FeedPage {
        let request = self.composer.page_request(page, limit);
        self.composer
            .global_feed(viewer_id.as_deref(), &request)
            .await
    }

    async fn get_trending_feed(
        &mut self,
        viewer_id: Option<String>,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> FeedPage {
        let request = self.composer.page_request(page, limit);
        self.composer
            .trending_feed(viewer_id.as_deref(), &request, chrono::Utc::now())
            .await
    }

    async fn get_user_posts(
        &mut self,
        user_id: String,
        viewer_id: Option<String>,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> FeedPage {
        log::debug!("get user posts - user id: {user_id}");
        let request = self.composer.page_request(page, limit);
        self.composer
            .user_posts(&user_id, viewer_id.as_deref(), &request)
            .await
    }

    async fn get_liked_posts(
        &mut self,
        user_id: String,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> FeedPage {
        log::debug!("get liked posts - user id: {user_id}");
        let request = self.composer.page_request(page, limit);
        self.composer.liked_posts(&user_id, &request).await
    }

    async fn get_post(
        &mut self,
        post_id: String,
        viewer_id: Option<String>,
    ) -> Result<FeedPost, SocialError> {
        self.composer.get_post(&post_id, viewer_id.as_deref()).await
    }
}
