pub mod error;
pub mod pagination;
pub mod query;
pub mod settings;
pub mod validation;

pub use error::{ErrorKind, SocialError};
pub use pagination::{paginate, PageRequest, Pagination};

use serde::{Deserialize, Serialize};

/// Direction of a single denormalized counter adjustment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CounterChange {
    Increment,
    Decrement,
}

impl CounterChange {
    /// Counters never go below zero.
    pub fn apply(self, value: u64) -> u64 {
        match self {
            CounterChange::Increment => value.saturating_add(1),
            CounterChange::Decrement => value.saturating_sub(1),
        }
    }

    pub fn apply_n(self, value: u64, n: u64) -> u64 {
        match self {
            CounterChange::Increment => value.saturating_add(n),
            CounterChange::Decrement => value.saturating_sub(n),
        }
    }
}

pub(crate) mod snapshot {
    use serde::{de, Serialize};

    pub const SERIALIZATION_VERSION_V1: u8 = 1u8;

    pub(crate) fn serialize<T>(value: &T) -> Result<Vec<u8>, String>
    where
        T: ?Sized + Serialize,
    {
        let data = serde_json::to_vec_pretty(value).map_err(|err| err.to_string())?;

        let mut result = vec![SERIALIZATION_VERSION_V1];
        result.extend(data);

        Ok(result)
    }

    pub(crate) fn deserialize<'a, T>(bytes: &'a [u8]) -> Result<T, String>
    where
        T: de::Deserialize<'a>,
    {
        match bytes.split_first() {
            Some((&SERIALIZATION_VERSION_V1, data)) => {
                let value: T = serde_json::from_slice(data).map_err(|err| err.to_string())?;

                Ok(value)
            }
            Some(_) => Err("Unsupported serialization version".to_string()),
            None => Err("Empty snapshot".to_string()),
        }
    }

}

#[cfg(test)]
mod tests {
    use super::CounterChange;

    #[test]
    fn test_decrement_saturates_at_zero() {
        assert_eq!(CounterChange::Decrement.apply(0), 0);
        assert_eq!(CounterChange::Decrement.apply(2), 1);
        assert_eq!(CounterChange::Increment.apply(2), 3);
        assert_eq!(CounterChange::Decrement.apply_n(3, 5), 0);
    }
}
