use rand::prelude::SliceRandom;
use rand::Rng;
use std::sync::{LazyLock, Mutex};

static REGISTERED_USER_IDS: LazyLock<Mutex<Vec<String>>> = LazyLock::new(|| Mutex::new(vec![]));

pub fn remember_user_id(user_id: String) {
    if let Ok(mut user_ids) = REGISTERED_USER_IDS.lock() {
        user_ids.push(user_id);
    }
}

/// A user registered by any of the goose users, other than `except`.
pub fn rand_known_user_id(except: &str) -> Option<String> {
    let user_ids = REGISTERED_USER_IDS.lock().ok()?;
    let candidates: Vec<&String> = user_ids.iter().filter(|id| *id != except).collect();
    candidates
        .choose(&mut rand::thread_rng())
        .map(|id| id.to_string())
}

pub fn rand_username() -> String {
    let suffix: u32 = rand::thread_rng().gen_range(0..100_000_000);
    format!("bench_{suffix:08}")
}

pub fn rand_search_query() -> String {
    let queries = vec!["username:\"bench_0\"", "email:\"test.com\"", "bench_1", "bench_2"];
    queries.choose(&mut rand::thread_rng()).unwrap().to_string()
}

pub fn rand_page() -> u32 {
    rand::thread_rng().gen_range(1..4)
}

pub fn rand_post_content() -> String {
    let contents = vec![
        "Hello social network!",
        "Check out my new post.",
        "Golem is amazing.",
        "Rust is the best language.",
    ];
    contents
        .choose(&mut rand::thread_rng())
        .unwrap()
        .to_string()
}

pub fn rand_comment_content() -> String {
    let contents = vec![
        "Nice post!",
        "I agree.",
        "Interesting point.",
        "Keep it up!",
    ];
    contents
        .choose(&mut rand::thread_rng())
        .unwrap()
        .to_string()
}
