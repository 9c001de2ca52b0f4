use crate::{observability, reddit, tg};
use serde::de::DeserializeOwned;

/// Process-wide configuration. It is loaded once at startup and then passed
/// down explicitly to the components that need it.
pub struct Config {
    pub(crate) tg: tg::Config,
    pub(crate) reddit: reddit::Config,
    pub(crate) metrics: observability::MetricsConfig,
}

impl Config {
    pub fn load() -> Result<Config, ConfigError> {
        Self::from_vars(std::env::vars())
    }

    pub(crate) fn from_vars(
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Config, ConfigError> {
        let vars: Vec<_> = vars.into_iter().collect();

        Ok(Self {
            tg: from_vars("TELEGRAM_", &vars)?,
            reddit: from_vars("REDDIT_", &vars)?,
            metrics: from_vars("METRICS_", &vars)?,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Required environment variable `{var}` is not set")]
    MissingVar { var: String },

    #[error("Invalid environment configuration (variables prefixed with `{prefix}`)")]
    Invalid {
        prefix: &'static str,
        source: envy::Error,
    },
}

pub(crate) fn from_env<T: DeserializeOwned>(prefix: &'static str) -> Result<T, ConfigError> {
    from_vars(prefix, &std::env::vars().collect::<Vec<_>>())
}

fn from_vars<T: DeserializeOwned>(
    prefix: &'static str,
    vars: &[(String, String)],
) -> Result<T, ConfigError> {
    // Empty values are reported the same way as absent ones
    let vars = vars
        .iter()
        .filter(|(key, value)| key.starts_with(prefix) && !value.trim().is_empty())
        .cloned();

    envy::prefixed(prefix)
        .from_iter(vars)
        .map_err(|source| {
            if let envy::Error::MissingValue(field) = &source {
                return ConfigError::MissingVar {
                    var: format!("{prefix}{}", field.to_uppercase()),
                };
            }
            ConfigError::Invalid { prefix, source }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect()
    }

    const COMPLETE: &[(&str, &str)] = &[
        ("TELEGRAM_BOT_TOKEN", "123:abc"),
        ("REDDIT_CLIENT_ID", "id"),
        ("REDDIT_CLIENT_SECRET", "secret"),
        ("REDDIT_USER_AGENT", "reddit-tg/0.1 by someone"),
    ];

    #[test]
    fn loads_complete_config() {
        let config = Config::from_vars(vars(COMPLETE)).unwrap();

        assert_eq!(config.tg.bot_token, "123:abc");
        assert_eq!(config.reddit.client_id, "id");
        assert_eq!(config.reddit.user_agent, "reddit-tg/0.1 by someone");
        assert_eq!(config.reddit.request_timeout().as_secs(), 15);
        assert_eq!(config.metrics.listen_addr, None);
    }

    #[test]
    fn missing_bot_token_is_named() {
        let pairs: Vec<_> = COMPLETE
            .iter()
            .copied()
            .filter(|(key, _)| *key != "TELEGRAM_BOT_TOKEN")
            .collect();

        let err = Config::from_vars(vars(&pairs)).err().unwrap();

        assert_matches!(&err, ConfigError::MissingVar { var } if var == "TELEGRAM_BOT_TOKEN");
        expect_test::expect!["Required environment variable `TELEGRAM_BOT_TOKEN` is not set"]
            .assert_eq(&err.to_string());
    }

    #[test]
    fn empty_value_counts_as_missing() {
        let mut pairs = vars(COMPLETE);
        pairs.push(("REDDIT_CLIENT_SECRET".to_owned(), "  ".to_owned()));
        pairs.retain(|(key, value)| key != "REDDIT_CLIENT_SECRET" || value.trim().is_empty());

        let err = Config::from_vars(pairs).err().unwrap();

        assert_matches!(err, ConfigError::MissingVar { var } if var == "REDDIT_CLIENT_SECRET");
    }

    #[test]
    fn invalid_optional_value_is_rejected() {
        let mut pairs = vars(COMPLETE);
        pairs.push(("REDDIT_REQUEST_TIMEOUT_SECS".to_owned(), "soon".to_owned()));

        let err = Config::from_vars(pairs).err().unwrap();

        assert_matches!(err, ConfigError::Invalid { prefix: "REDDIT_", .. });
    }
}
