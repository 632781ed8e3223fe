use serde::{
    Deserialize, Deserializer,
    de::{self, Unexpected, Visitor},
};
use std::fmt::{self, Formatter};
use thiserror::Error;
use time::Duration;

#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Debug, Default, Hash)]
pub struct PositiveDuration(Duration);

impl PositiveDuration {
    #[must_use]
    pub fn new(duration: Duration) -> Option<Self> {
        duration.is_positive().then_some(Self(duration))
    }

    pub fn from_seconds(seconds: i64) -> Result<Self, NonPositiveDurationError> {
        Duration::seconds(seconds).try_into()
    }

    #[must_use]
    pub fn get(&self) -> Duration {
        self.0
    }

    #[must_use]
    pub fn whole_seconds(&self) -> i64 {
        self.0.whole_seconds()
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The duration is not positive: {0}")]
pub struct NonPositiveDurationError(Duration);

impl TryFrom<Duration> for PositiveDuration {
    type Error = NonPositiveDurationError;

    fn try_from(value: Duration) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(NonPositiveDurationError(value))
    }
}

/// Unsigned integers that stand in for any larger request.
pub trait Saturating: TryFrom<u64> {
    const SATURATED: Self;
}

impl Saturating for u8 {
    const SATURATED: Self = Self::MAX;
}

impl Saturating for usize {
    const SATURATED: Self = Self::MAX;
}

struct SaturatingU64(u64);

impl<'de> Deserialize<'de> for SaturatingU64 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SaturatingVisitor;

        impl Visitor<'_> for SaturatingVisitor {
            type Value = u64;

            fn expecting(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
                formatter.write_str("a non-negative integer")
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<u64, E> {
                Ok(value)
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<u64, E> {
                if value.is_empty() || !value.bytes().all(|byte| byte.is_ascii_digit()) {
                    return Err(E::invalid_value(Unexpected::Str(value), &self));
                }

                // Only digits remain, so parsing can only fail on overflow.
                Ok(value.parse().unwrap_or(u64::MAX))
            }
        }

        deserializer.deserialize_any(SaturatingVisitor).map(Self)
    }
}

/// Deserializes an optional unsigned integer, from a number or a string of
/// digits, saturating at `T`'s maximum instead of rejecting large values.
///
/// Use with `#[serde(default, deserialize_with = "saturating")]`.
pub fn saturating<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Saturating,
{
    let value = Option::<SaturatingU64>::deserialize(deserializer)?;

    Ok(value.map(|SaturatingU64(value)| T::try_from(value).unwrap_or(T::SATURATED)))
}

#[cfg(test)]
mod tests {
    use crate::util::{PositiveDuration, saturating};
    use serde::Deserialize;
    use serde_json::json;
    use time::Duration;

    #[derive(Deserialize, Debug)]
    struct Limits {
        #[serde(default, deserialize_with = "saturating")]
        depth: Option<u8>,
        #[serde(default, deserialize_with = "saturating")]
        size: Option<usize>,
    }

    #[test]
    fn only_positive_durations() {
        assert_eq!(
            PositiveDuration::from_seconds(90).map(|duration| duration.get()),
            Ok(Duration::seconds(90))
        );
        assert!(PositiveDuration::from_seconds(0).is_err());
        assert!(PositiveDuration::new(Duration::milliseconds(-1)).is_none());
    }

    #[test]
    fn large_numbers_saturate() {
        let limits: Limits = serde_json::from_value(json!({
            "depth": "256",
            "size": "99999999999999999999999",
        }))
        .unwrap();
        assert_eq!(limits.depth, Some(u8::MAX));
        assert_eq!(limits.size, Some(usize::MAX));

        let limits: Limits = serde_json::from_value(json!({"depth": 3})).unwrap();
        assert_eq!(limits.depth, Some(3));
        assert_eq!(limits.size, None);
    }

    #[test]
    fn only_digits_are_numbers() {
        for invalid in ["", "-1", "+1", "two", "1.5"] {
            assert!(
                serde_json::from_value::<Limits>(json!({"size": invalid})).is_err(),
                "{invalid:?}"
            );
        }
    }
}
