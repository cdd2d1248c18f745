pub mod common;

pub mod feed;
pub mod notification;
pub mod post;
pub mod post_index;
pub mod social_graph;
pub mod user;
pub mod user_directory;
pub mod user_likes;
