use crate::common::SocialError;
use crate::post::PostAgentClient;
use crate::user::{mutual_following, FollowRef, UserAgentClient, UserSummary};
use crate::user_directory::{UserDirectoryAgentClient, UsersPage};
use golem_rust::{agent_definition, agent_implementation, Schema};
use serde::{Deserialize, Serialize};

#[derive(Schema, Clone, Debug, Serialize, Deserialize)]
pub struct MutualUsers {
    pub users: Vec<UserSummary>,
    pub count: u64,
}

fn ref_ids(refs: &[FollowRef]) -> Vec<String> {
    refs.iter().map(|r| r.user_id.clone()).collect()
}

async fn fetch_user_summaries(user_ids: Vec<String>) -> Vec<UserSummary> {
    if user_ids.is_empty() {
        vec![]
    } else {
        UserDirectoryAgentClient::get().get_users(user_ids).await
    }
}

/// Read-only views over the follow graph joined with the user directory.
#[agent_definition(mode = "ephemeral")]
trait SocialGraphViewAgent {
    fn new() -> Self;

    async fn check_follow_status(&mut self, follower_id: String, following_id: String) -> bool;

    async fn get_followers(
        &mut self,
        user_id: String,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> Result<UsersPage, SocialError>;

    async fn get_following(
        &mut self,
        user_id: String,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> Result<UsersPage, SocialError>;

    async fn get_mutual(
        &mut self,
        user_id: String,
        other_user_id: String,
    ) -> Result<MutualUsers, SocialError>;

    async fn get_suggestions(
        &mut self,
        user_id: String,
        limit: Option<u32>,
    ) -> Result<Vec<UserSummary>, SocialError>;

    async fn get_post_likers(
        &mut self,
        post_id: String,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> Result<UsersPage, SocialError>;
}

struct SocialGraphViewAgentImpl {}

#[agent_implementation]
impl SocialGraphViewAgent for SocialGraphViewAgentImpl {
    fn new() -> Self {
        Self {}
    }

    async fn check_follow_status(&mut self, follower_id: String, following_id: String) -> bool {
        UserAgentClient::get(follower_id)
            .is_following(following_id)
            .await
    }

    async fn get_followers(
        &mut self,
        user_id: String,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> Result<UsersPage, SocialError> {
        log::debug!("get followers - user id: {user_id}");
        let refs = UserAgentClient::get(user_id)
            .get_followers(page, limit)
            .await
            .ok_or_else(SocialError::user_not_found)?;

        Ok(UsersPage {
            users: fetch_user_summaries(ref_ids(&refs.users)).await,
            pagination: refs.pagination,
        })
    }

    async fn get_following(
        &mut self,
        user_id: String,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> Result<UsersPage, SocialError> {
        log::debug!("get following - user id: {user_id}");
        let refs = UserAgentClient::get(user_id)
            .get_following(page, limit)
            .await
            .ok_or_else(SocialError::user_not_found)?;

        Ok(UsersPage {
            users: fetch_user_summaries(ref_ids(&refs.users)).await,
            pagination: refs.pagination,
        })
    }

    async fn get_mutual(
        &mut self,
        user_id: String,
        other_user_id: String,
    ) -> Result<MutualUsers, SocialError> {
        log::debug!("get mutual - user id: {user_id}, other user id: {other_user_id}");
        let user_following = UserAgentClient::get(user_id)
            .get_following_ids()
            .await
            .ok_or_else(SocialError::user_not_found)?;

        let other_following = UserAgentClient::get(other_user_id)
            .get_all_following()
            .await
            .ok_or_else(SocialError::user_not_found)?;

        let users =
            fetch_user_summaries(mutual_following(&user_following, &other_following)).await;

        Ok(MutualUsers {
            count: users.len() as u64,
            users,
        })
    }

    async fn get_suggestions(
        &mut self,
        user_id: String,
        limit: Option<u32>,
    ) -> Result<Vec<UserSummary>, SocialError> {
        log::debug!("get suggestions - user id: {user_id}");
        let following = UserAgentClient::get(user_id.clone())
            .get_following_ids()
            .await
            .ok_or_else(SocialError::user_not_found)?;

        Ok(UserDirectoryAgentClient::get()
            .get_suggestions(user_id, following.into_iter().collect(), limit)
            .await)
    }

    async fn get_post_likers(
        &mut self,
        post_id: String,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> Result<UsersPage, SocialError> {
        log::debug!("get post likers - post id: {post_id}");
        let likes = PostAgentClient::get(post_id)
            .get_likes(page, limit)
            .await
            .ok_or_else(SocialError::post_not_found)?;

        let user_ids = likes.likes.iter().map(|l| l.user_id.clone()).collect();

        Ok(UsersPage {
            users: fetch_user_summaries(user_ids).await,
            pagination: likes.pagination,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ref_ids_keep_order() {
        let now = chrono::Utc::now();
        let refs = vec![
            FollowRef {
                user_id: "b".to_string(),
                created_at: now,
            },
            FollowRef {
                user_id: "a".to_string(),
                created_at: now,
            },
        ];
        assert_eq!(ref_ids(&refs), vec!["b".to_string(), "a".to_string()]);
    }
}
