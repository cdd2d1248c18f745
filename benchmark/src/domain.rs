pub mod common {
    use serde::{Deserialize, Serialize};

    /// Body of every successful API response.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct ApiResponse<T> {
        pub success: bool,
        pub message: String,
        pub data: T,
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    #[serde(rename_all = "kebab-case")]
    pub struct RegisterUser {
        pub username: String,
        pub email: String,
        pub password_hash: String,
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    #[serde(rename_all = "kebab-case")]
    pub struct UserRegistered {
        pub user_id: String,
        pub username: String,
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    #[serde(rename_all = "kebab-case")]
    pub struct ToggleFollow {
        pub user_id: String,
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    #[serde(rename_all = "kebab-case")]
    pub struct CreatePost {
        pub content: String,
        pub image: Option<String>,
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    #[serde(rename_all = "kebab-case")]
    pub struct PostCreated {
        pub post_id: String,
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    #[serde(rename_all = "kebab-case")]
    pub struct ToggleLike {
        pub post_id: String,
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    #[serde(rename_all = "kebab-case")]
    pub struct CreateComment {
        pub post_id: String,
        pub content: String,
        pub parent_comment_id: Option<String>,
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    #[serde(rename_all = "kebab-case")]
    pub struct CommentCreated {
        pub comment_id: String,
    }
}

pub mod social_feed {
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Debug, Serialize, Deserialize)]
    #[serde(rename_all = "kebab-case")]
    pub struct PostSummary {
        pub post_id: String,
        pub created_by: String,
        pub content: String,
        pub like_count: u64,
        pub comment_count: u64,
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    #[serde(rename_all = "kebab-case")]
    pub struct FeedPost {
        pub post: PostSummary,
        pub is_liked: Option<bool>,
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    #[serde(rename_all = "kebab-case")]
    pub struct FeedPage {
        pub posts: Vec<FeedPost>,
    }
}
