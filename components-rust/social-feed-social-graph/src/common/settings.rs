pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 50;

pub const NOTIFICATIONS_DEFAULT_LIMIT: u32 = 20;
pub const LIKERS_DEFAULT_LIMIT: u32 = 20;
pub const FOLLOWS_DEFAULT_LIMIT: u32 = 20;
pub const COMMENTS_DEFAULT_LIMIT: u32 = 20;
pub const REPLIES_DEFAULT_LIMIT: u32 = 10;
pub const SUGGESTIONS_DEFAULT_LIMIT: u32 = 10;

pub const TRENDING_WINDOW_HOURS: i64 = 24;

pub const USERNAME_MIN_LENGTH: usize = 3;
pub const USERNAME_MAX_LENGTH: usize = 30;
pub const BIO_MAX_LENGTH: usize = 200;
pub const POST_MAX_LENGTH: usize = 1000;
pub const COMMENT_MAX_LENGTH: usize = 500;

const TRENDING_WINDOW_HOURS_ENV: &str = "TRENDING_WINDOW_HOURS";
const MAX_PAGE_LIMIT_ENV: &str = "MAX_PAGE_LIMIT";

/// Worker level overrides, read from the agent environment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    pub trending_window_hours: i64,
    pub max_limit: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            trending_window_hours: TRENDING_WINDOW_HOURS,
            max_limit: MAX_LIMIT,
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Settings::default();

        Settings {
            trending_window_hours: parse_positive(
                TRENDING_WINDOW_HOURS_ENV,
                lookup(TRENDING_WINDOW_HOURS_ENV),
            )
            .unwrap_or(defaults.trending_window_hours),
            max_limit: parse_positive(MAX_PAGE_LIMIT_ENV, lookup(MAX_PAGE_LIMIT_ENV))
                .unwrap_or(defaults.max_limit),
        }
    }

    pub fn trending_window(&self) -> chrono::Duration {
        chrono::Duration::hours(self.trending_window_hours)
    }
}

fn parse_positive<T>(key: &str, value: Option<String>) -> Option<T>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    let value = value?;
    match value.trim().parse::<T>() {
        Ok(v) if v > T::default() => Some(v),
        _ => {
            log::warn!("settings - ignoring invalid value for {key}: {value}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_values_use_defaults() {
        let settings = Settings::from_lookup(|_| None);
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.trending_window(), chrono::Duration::hours(24));
    }

    #[test]
    fn test_overrides_are_applied_and_invalid_ones_ignored() {
        let settings = Settings::from_lookup(|key| match key {
            TRENDING_WINDOW_HOURS_ENV => Some("48".to_string()),
            MAX_PAGE_LIMIT_ENV => Some("-3".to_string()),
            _ => None,
        });
        assert_eq!(settings.trending_window_hours, 48);
        assert_eq!(settings.max_limit, MAX_LIMIT);
    }
}
