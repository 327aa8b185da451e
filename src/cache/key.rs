//! Cache keys

use std::fmt;

use crate::dates::DateRange;

/// Profile with the generated plan
pub const USER_WITH_PLAN: &str = "userWithPlan";

/// Progress for a date range
pub const PROGRESS: &str = "progress";

/// Weight history for a date range
pub const WEIGHT_HISTORY: &str = "weightHistory";

/// Resource name followed by its parameters
///
/// Keys are compared part by part, so `["progress"]` is a prefix of every
/// progress key whatever its date range.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(parts.into_iter().map(Into::into).collect())
    }

    /// Key made of just a resource name, usable as a family prefix
    pub fn resource(name: &str) -> Self {
        Self(vec![name.to_string()])
    }

    /// Append a parameter
    pub fn with(mut self, part: impl Into<String>) -> Self {
        self.0.push(part.into());
        self
    }

    pub fn parts(&self) -> &[String] {
        &self.0
    }

    pub fn resource_name(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }

    pub fn user_with_plan() -> Self {
        Self::resource(USER_WITH_PLAN)
    }

    pub fn progress(range: &DateRange) -> Self {
        Self::resource(PROGRESS)
            .with(range.start_param())
            .with(range.end_param())
    }

    pub fn weight_history(range: &DateRange) -> Self {
        Self::resource(WEIGHT_HISTORY)
            .with(range.start_param())
            .with(range.end_param())
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}

impl<const N: usize> From<[&str; N]> for QueryKey {
    fn from(parts: [&str; N]) -> Self {
        Self::new(parts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_prefix_matching() {
        let key = QueryKey::from(["progress", "2024-01-01", "2024-02-01"]);

        assert!(key.starts_with(&QueryKey::resource(PROGRESS)));
        assert!(key.starts_with(&key));
        assert!(!key.starts_with(&QueryKey::resource(WEIGHT_HISTORY)));
        assert!(!QueryKey::resource(PROGRESS).starts_with(&key));
        // "prog" is not a prefix of the part "progress"
        assert!(!key.starts_with(&QueryKey::resource("prog")));
    }

    #[test]
    fn test_range_keys() {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
        );
        let key = QueryKey::weight_history(&range);

        assert_eq!(key, QueryKey::from(["weightHistory", "2024-01-01", "2024-02-01"]));
        assert_eq!(key.resource_name(), Some(WEIGHT_HISTORY));
        assert_eq!(key.to_string(), "[weightHistory, 2024-01-01, 2024-02-01]");
    }
}
