use crate::reddit::RedditRecord;
use itertools::Itertools;
use std::fmt;

/// Set of lowercase keywords. A record matches if its title or body contains
/// any of them, ignoring case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Keywords(Vec<String>);

impl Keywords {
    /// Parses a comma-separated list. Blank entries are dropped.
    pub(crate) fn parse(input: &str) -> Self {
        let keywords = input
            .split(',')
            .map(str::trim)
            .filter(|keyword| !keyword.is_empty())
            .map(str::to_lowercase)
            .unique()
            .collect();

        Self(keywords)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Always `true` when there are no keywords
    pub(crate) fn matches(&self, record: &RedditRecord) -> bool {
        if self.is_empty() {
            return true;
        }

        let title = record.title.to_lowercase();
        let body = record.body.to_lowercase();

        self.0
            .iter()
            .any(|keyword| title.contains(keyword.as_str()) || body.contains(keyword.as_str()))
    }

    /// Keeps the matching records in their original order
    pub(crate) fn filter(&self, records: Vec<RedditRecord>) -> Vec<RedditRecord> {
        if self.is_empty() {
            return records;
        }
        records
            .into_iter()
            .filter(|record| self.matches(record))
            .collect()
    }
}

impl fmt::Display for Keywords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.iter().format(", "))
    }
}
