mod data;
mod domain;
mod goose_ext;

use crate::goose_ext::{GooseRequestExt, GooseResponseExt, Session};
use goose::prelude::*;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), GooseError> {
    let custom_host = match std::env::var("HOST") {
        Ok(host) => host,
        Err(_) => "".to_string(),
    };

    GooseAttack::initialize()?
        .register_scenario(
            scenario!("Read Feeds")
                .set_wait_time(Duration::from_secs(1), Duration::from_secs(5))?
                .register_transaction(transaction!(register_user).set_on_start())
                .register_transaction(transaction!(get_personal_feed))
                .register_transaction(transaction!(get_global_feed))
                .register_transaction(transaction!(get_trending_feed)),
        )
        .register_scenario(
            scenario!("Search Users and Suggestions")
                .set_wait_time(Duration::from_secs(2), Duration::from_secs(10))?
                .register_transaction(transaction!(register_user).set_on_start())
                .register_transaction(transaction!(search_users))
                .register_transaction(transaction!(get_suggestions)),
        )
        .register_scenario(
            scenario!("Toggle Follows")
                .set_wait_time(Duration::from_secs(2), Duration::from_secs(10))?
                .register_transaction(transaction!(register_user).set_on_start())
                .register_transaction(transaction!(toggle_follow)),
        )
        .register_scenario(
            scenario!("Create Post, Comments and Likes")
                .set_wait_time(Duration::from_secs(5), Duration::from_secs(15))?
                .register_transaction(transaction!(register_user).set_on_start())
                .register_transaction(transaction!(create_post_comments_and_likes)),
        )
        .register_scenario(
            scenario!("Read Notifications")
                .set_wait_time(Duration::from_secs(2), Duration::from_secs(10))?
                .register_transaction(transaction!(register_user).set_on_start())
                .register_transaction(transaction!(get_notifications)),
        )
        .set_default(GooseDefault::Host, custom_host.as_str())?
        .execute()
        .await?;

    Ok(())
}

async fn register_user(user: &mut GooseUser) -> TransactionResult {
    let username = data::rand_username();
    let register_user = domain::common::RegisterUser {
        email: format!("{username}@test.com"),
        username,
        password_hash: "benchmark".to_string(),
    };

    let response = user
        .post_request("user-register", "/v1/users", &register_user)
        .await?;

    let registered: domain::common::ApiResponse<domain::common::UserRegistered> =
        response.json().await?;
    let user_id = registered.data.user_id;

    data::remember_user_id(user_id.clone());
    user.set_session_data(Session { user_id });

    Ok(())
}

fn session_user_id(user: &GooseUser) -> String {
    user.get_session_data::<Session>()
        .map(|s| s.user_id.clone())
        .unwrap_or_default()
}

async fn get_personal_feed(user: &mut GooseUser) -> TransactionResult {
    let page = data::rand_page();

    let response = user
        .get_request(
            "feed-personal",
            format!("/v1/posts/feed/personal?page={page}").as_str(),
        )
        .await?;

    let _feed: domain::common::ApiResponse<domain::social_feed::FeedPage> = response.json().await?;

    Ok(())
}

async fn get_global_feed(user: &mut GooseUser) -> TransactionResult {
    let page = data::rand_page();

    let _response = user
        .get_request(
            "feed-global",
            format!("/v1/posts/feed/global?page={page}").as_str(),
        )
        .await?;

    Ok(())
}

async fn get_trending_feed(user: &mut GooseUser) -> TransactionResult {
    let _response = user
        .get_request("feed-trending", "/v1/posts/feed/trending")
        .await?;

    Ok(())
}

async fn search_users(user: &mut GooseUser) -> TransactionResult {
    let query = data::rand_search_query();

    let _response = user
        .get_request("user-search", format!("/v1/users/search?q={query}").as_str())
        .await?;

    Ok(())
}

async fn get_suggestions(user: &mut GooseUser) -> TransactionResult {
    let _response = user
        .get_request("follow-suggestions", "/v1/follows/suggestions?limit=10")
        .await?;

    Ok(())
}

async fn toggle_follow(user: &mut GooseUser) -> TransactionResult {
    let user_id = session_user_id(user);

    if let Some(other_user_id) = data::rand_known_user_id(&user_id) {
        let toggle_follow = domain::common::ToggleFollow {
            user_id: other_user_id.clone(),
        };
        let _response = user
            .post_request("follow-toggle", "/v1/follows/toggle", &toggle_follow)
            .await?;

        let _response = user
            .get_request(
                "follow-mutual",
                format!("/v1/follows/mutual/{other_user_id}").as_str(),
            )
            .await?;
    }

    Ok(())
}

async fn create_post_comments_and_likes(user: &mut GooseUser) -> TransactionResult {
    // 1. Create Post
    let create_post = domain::common::CreatePost {
        content: data::rand_post_content(),
        image: None,
    };
    let response = user
        .post_request("post-create", "/v1/posts", &create_post)
        .await?;

    let post_created_res: domain::common::ApiResponse<domain::common::PostCreated> =
        response.json().await?;
    let post_id = post_created_res.data.post_id;

    // 2. Like Post twice, which nets zero likes
    let toggle_like = domain::common::ToggleLike {
        post_id: post_id.clone(),
    };
    for _ in 0..2 {
        let _response = user
            .post_request("like-toggle", "/v1/likes/toggle", &toggle_like)
            .await?;
    }

    // 3. Add a comment with a reply
    let create_comment = domain::common::CreateComment {
        post_id: post_id.clone(),
        content: data::rand_comment_content(),
        parent_comment_id: None,
    };
    let response = user
        .post_request("comment-add", "/v1/comments", &create_comment)
        .await?;

    let comment_res: domain::common::ApiResponse<domain::common::CommentCreated> =
        response.json().await?;
    let comment_id = comment_res.data.comment_id;

    let create_reply = domain::common::CreateComment {
        post_id: post_id.clone(),
        content: data::rand_comment_content(),
        parent_comment_id: Some(comment_id.clone()),
    };
    let _response = user
        .post_request("comment-reply", "/v1/comments", &create_reply)
        .await?;

    let _response = user
        .get_request(
            "post-likers",
            format!("/v1/likes/post/{post_id}").as_str(),
        )
        .await?;

    // 4. Delete the comment together with its reply
    let _response = user
        .delete_request(
            "comment-delete",
            format!("/v1/comments/post/{post_id}/{comment_id}").as_str(),
        )
        .await?;

    Ok(())
}

async fn get_notifications(user: &mut GooseUser) -> TransactionResult {
    let response = user
        .get_request("notifications-get", "/v1/notifications")
        .await?;

    let _notifications: serde_json::Value = response.json().await?;

    let _response = user
        .put_request(
            "notifications-read-all",
            "/v1/notifications/read-all",
            &serde_json::json!({}),
        )
        .await?;

    Ok(())
}
