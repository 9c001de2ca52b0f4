//! Validated parameters of the Reddit queries issued by the bot commands.

use crate::keywords::Keywords;
use lazy_regex::regex_is_match;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub(crate) enum ValidationError {
    #[error("The {what} is missing")]
    MissingTarget { what: &'static str },

    #[error("Too many arguments, expected at most {max}")]
    TooManyArguments { max: usize },

    #[error("`{input}` is not a valid Reddit username")]
    InvalidUsername { input: String },

    #[error("`{input}` is not a valid subreddit name")]
    InvalidSubreddit { input: String },

    #[error(
        "The limit must be a whole number from {} to {}, but got `{input}`",
        Limit::MIN,
        Limit::MAX
    )]
    InvalidLimit { input: String },

    #[error(
        "The number of days must be a whole number from {} to {}, but got `{input}`",
        Days::MIN,
        Days::MAX
    )]
    InvalidDays { input: String },
}

/// Name of a Reddit account without the `u/` prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Username(String);

/// Name of a subreddit without the `r/` prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SubredditName(String);

/// Number of records to show in the reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Limit(u8);

/// Size of the time window in days counting back from now
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Days(u16);

/// What a command asks for, already validated
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct QueryParams<T> {
    pub(crate) target: T,
    pub(crate) days: Option<Days>,
    pub(crate) keywords: Keywords,
    pub(crate) limit: Limit,
}

/// The thing a query is about, a user or a subreddit
pub(crate) trait Target: FromStr<Err = ValidationError> {
    /// Human readable name of the kind of target for error messages
    const WHAT: &'static str;
}

impl Target for Username {
    const WHAT: &'static str = "username";
}

impl Target for SubredditName {
    const WHAT: &'static str = "subreddit name";
}

impl<T: Target> QueryParams<T> {
    /// Parses `<target> [keywords] [limit]`.
    ///
    /// A single optional argument is the limit if it looks like an integer,
    /// otherwise it is the comma-separated keyword list.
    pub(crate) fn parse_listing(args: &str) -> Result<Self, ValidationError> {
        let (target, rest) = split_target::<T>(args)?;

        let (keywords, limit) = match rest.as_slice() {
            [] => (Keywords::default(), Limit::default()),
            [single] if single.parse::<i64>().is_ok() => (Keywords::default(), single.parse()?),
            [single] => (Keywords::parse(single), Limit::default()),
            [keywords, limit] => (Keywords::parse(keywords), limit.parse()?),
            _ => return Err(ValidationError::TooManyArguments { max: 3 }),
        };

        Ok(Self {
            target,
            days: None,
            keywords,
            limit,
        })
    }

    /// Parses `<target> [days]`
    pub(crate) fn parse_history(args: &str) -> Result<Self, ValidationError> {
        let (target, rest) = split_target::<T>(args)?;

        let days = match rest.as_slice() {
            [] => Days::default(),
            [days] => days.parse()?,
            _ => return Err(ValidationError::TooManyArguments { max: 2 }),
        };

        Ok(Self {
            target,
            days: Some(days),
            keywords: Keywords::default(),
            limit: Limit::default(),
        })
    }
}

fn split_target<T: Target>(args: &str) -> Result<(T, Vec<&str>), ValidationError> {
    let mut args = args.split_whitespace();
    let target = args
        .next()
        .ok_or(ValidationError::MissingTarget { what: T::WHAT })?
        .parse()?;

    Ok((target, args.collect()))
}

fn strip_prefixes<'a>(input: &'a str, prefixes: &[&str]) -> &'a str {
    prefixes
        .iter()
        .find_map(|prefix| input.strip_prefix(prefix))
        .unwrap_or(input)
}

impl FromStr for Username {
    type Err = ValidationError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let name = strip_prefixes(input, &["/u/", "u/"]);
        if !regex_is_match!(r"^[A-Za-z0-9_-]{3,20}$", name) {
            return Err(ValidationError::InvalidUsername {
                input: input.to_owned(),
            });
        }
        Ok(Self(name.to_owned()))
    }
}

impl FromStr for SubredditName {
    type Err = ValidationError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let name = strip_prefixes(input, &["/r/", "r/"]);
        if !regex_is_match!(r"^[A-Za-z0-9_]{2,21}$", name) {
            return Err(ValidationError::InvalidSubreddit {
                input: input.to_owned(),
            });
        }
        Ok(Self(name.to_owned()))
    }
}

impl Username {
    pub(crate) fn as_str(&self) -> &str {
        &self.0
    }
}

impl SubredditName {
    pub(crate) fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "u/{}", self.0)
    }
}

impl fmt::Display for SubredditName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r/{}", self.0)
    }
}

impl Limit {
    pub(crate) const MIN: u8 = 1;
    pub(crate) const MAX: u8 = 100;

    pub(crate) fn get(self) -> usize {
        self.0.into()
    }
}

impl Default for Limit {
    fn default() -> Self {
        Self(10)
    }
}

impl FromStr for Limit {
    type Err = ValidationError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        input
            .parse::<u8>()
            .ok()
            .filter(|limit| (Self::MIN..=Self::MAX).contains(limit))
            .map(Self)
            .ok_or_else(|| ValidationError::InvalidLimit {
                input: input.to_owned(),
            })
    }
}

impl Days {
    pub(crate) const MIN: u16 = 1;
    pub(crate) const MAX: u16 = 365;

    pub(crate) fn get(self) -> u16 {
        self.0
    }

    pub(crate) fn to_duration(self) -> chrono::Duration {
        chrono::Duration::days(self.0.into())
    }
}

impl Default for Days {
    fn default() -> Self {
        Self(30)
    }
}

impl FromStr for Days {
    type Err = ValidationError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        input
            .parse::<u16>()
            .ok()
            .filter(|days| (Self::MIN..=Self::MAX).contains(days))
            .map(Self)
            .ok_or_else(|| ValidationError::InvalidDays {
                input: input.to_owned(),
            })
    }
}
