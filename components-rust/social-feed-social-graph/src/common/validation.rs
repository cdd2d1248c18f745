use super::error::SocialError;
use super::settings::{
    BIO_MAX_LENGTH, COMMENT_MAX_LENGTH, POST_MAX_LENGTH, USERNAME_MAX_LENGTH, USERNAME_MIN_LENGTH,
};
use email_address::EmailAddress;
use regex::Regex;
use std::str::FromStr;
use std::sync::LazyLock;

static USERNAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_]+$").expect("valid username regex"));

pub fn validate_username(username: &str) -> Result<String, SocialError> {
    let username = username.trim();
    let length = username.chars().count();

    if !(USERNAME_MIN_LENGTH..=USERNAME_MAX_LENGTH).contains(&length) {
        Err(SocialError::validation(format!(
            "Username must be between {USERNAME_MIN_LENGTH} and {USERNAME_MAX_LENGTH} characters"
        )))
    } else if !USERNAME_REGEX.is_match(username) {
        Err(SocialError::validation(
            "Username can only contain letters, numbers and underscores",
        ))
    } else {
        Ok(username.to_string())
    }
}

/// Returns the normalized (trimmed, lowercase) address.
pub fn validate_email(email: &str) -> Result<String, SocialError> {
    let email = email.trim().to_lowercase();

    EmailAddress::from_str(email.as_str())
        .map_err(|e| SocialError::validation(format!("Invalid email: {e}")))?;

    Ok(email)
}

pub fn validate_post_content(content: &str) -> Result<String, SocialError> {
    validate_text(content, POST_MAX_LENGTH, "Post content")
}

pub fn validate_comment_content(content: &str) -> Result<String, SocialError> {
    validate_text(content, COMMENT_MAX_LENGTH, "Comment content")
}

pub fn validate_bio(bio: &str) -> Result<String, SocialError> {
    let bio = bio.trim();
    if bio.chars().count() > BIO_MAX_LENGTH {
        Err(SocialError::validation(format!(
            "Bio cannot exceed {BIO_MAX_LENGTH} characters"
        )))
    } else {
        Ok(bio.to_string())
    }
}

fn validate_text(content: &str, max_length: usize, what: &str) -> Result<String, SocialError> {
    let content = content.trim();
    if content.is_empty() {
        Err(SocialError::validation(format!("{what} is required")))
    } else if content.chars().count() > max_length {
        Err(SocialError::validation(format!(
            "{what} cannot exceed {max_length} characters"
        )))
    } else {
        Ok(content.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ErrorKind;

    #[test]
    fn test_usernames() {
        assert_eq!(validate_username("  alice_01 ").unwrap(), "alice_01");
        assert!(validate_username("al").is_err());
        assert!(validate_username(&"a".repeat(31)).is_err());
        assert_eq!(
            validate_username("bad name").unwrap_err().kind,
            ErrorKind::Validation
        );
    }

    #[test]
    fn test_emails_are_lowercased() {
        assert_eq!(validate_email(" Alice@Example.COM ").unwrap(), "alice@example.com");
        assert!(validate_email("not-an-email").is_err());
    }

    #[test]
    fn test_content_is_trimmed_and_bounded() {
        assert_eq!(validate_post_content("  hello ").unwrap(), "hello");
        assert!(validate_post_content("   ").is_err());
        assert!(validate_post_content(&"x".repeat(1001)).is_err());
        assert!(validate_comment_content(&"x".repeat(500)).is_ok());
        assert!(validate_comment_content(&"x".repeat(501)).is_err());
        assert!(validate_bio(&"b".repeat(201)).is_err());
        assert_eq!(validate_bio("").unwrap(), "");
    }
}
