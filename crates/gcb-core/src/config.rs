use std::{env, fs, path::Path, time::Duration};

use reqwest::Url;

use crate::{domain::ChatId, errors::Error, Result};

pub const DEFAULT_FEED_URL: &str = "https://hoyo-codes.seria.moe/codes?game=genshin";
pub const DEFAULT_REDEEM_URL: &str = "https://genshin.hoyoverse.com/en/gift";

/// Typed configuration for the bot.
///
/// Every value the core needs is carried here and handed to constructors; the
/// core never reads the process environment on its own.
#[derive(Clone, Debug)]
pub struct Config {
    // Platform
    pub telegram_bot_token: String,
    pub channel_id: ChatId,

    // Feed
    pub feed_url: String,
    pub redeem_url: Url,
    pub fetch_timeout: Duration,

    // Ledger
    pub database_url: String,
    pub store_timeout: Duration,

    // Pipeline / delivery
    pub poll_interval: Duration,
    pub delivery_timeout: Duration,
    pub message_limit: usize,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup (the environment in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).and_then(non_empty);

        // Required
        let telegram_bot_token = get("TELEGRAM_BOT_TOKEN").ok_or_else(|| {
            Error::Config("TELEGRAM_BOT_TOKEN environment variable is required".to_string())
        })?;
        let channel_raw = get("CHANNEL_ID").ok_or_else(|| {
            Error::Config("CHANNEL_ID environment variable is required".to_string())
        })?;
        let channel_id = channel_raw
            .trim()
            .parse::<i64>()
            .map(ChatId)
            .map_err(|_| Error::Config(format!("CHANNEL_ID is not a chat id: {channel_raw}")))?;
        let database_url = get("DATABASE_URL").ok_or_else(|| {
            Error::Config("DATABASE_URL environment variable is required".to_string())
        })?;

        // Feed
        let feed_url = get("FEED_URL").unwrap_or_else(|| DEFAULT_FEED_URL.to_string());
        let redeem_raw = get("REDEEM_URL").unwrap_or_else(|| DEFAULT_REDEEM_URL.to_string());
        let redeem_url = Url::parse(redeem_raw.trim()).map_err(|e| {
            Error::Config(format!("REDEEM_URL is not a valid url ({e}): {redeem_raw}"))
        })?;
        let fetch_timeout =
            Duration::from_millis(parse_u64(&get, "FETCH_TIMEOUT_MS")?.unwrap_or(10_000));

        // Ledger
        let store_timeout =
            Duration::from_millis(parse_u64(&get, "STORE_TIMEOUT_MS")?.unwrap_or(10_000));

        // Pipeline
        let poll_secs = parse_u64(&get, "POLL_INTERVAL_SECS")?.unwrap_or(20 * 60);
        if poll_secs == 0 {
            return Err(Error::Config(
                "POLL_INTERVAL_SECS must be greater than zero".to_string(),
            ));
        }
        let poll_interval = Duration::from_secs(poll_secs);
        let delivery_timeout =
            Duration::from_millis(parse_u64(&get, "DELIVERY_TIMEOUT_MS")?.unwrap_or(30_000));
        let message_limit = parse_u64(&get, "MESSAGE_LIMIT")?.unwrap_or(1900) as usize;

        Ok(Self {
            telegram_bot_token,
            channel_id,
            feed_url,
            redeem_url,
            fetch_timeout,
            database_url,
            store_timeout,
            poll_interval,
            delivery_timeout,
            message_limit,
        })
    }
}

fn parse_u64(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<u64>> {
    let Some(raw) = get(key) else {
        return Ok(None);
    };
    raw.trim()
        .parse::<u64>()
        .map(Some)
        .map_err(|_| Error::Config(format!("{key} must be a non-negative integer, got {raw}")))
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        env::set_var(key, strip_quotes(v.trim()));
    }
}

fn strip_quotes(s: &str) -> &str {
    if s.len() >= 2
        && ((s.starts_with('"') && s.ends_with('"')) || (s.starts_with('\'') && s.ends_with('\'')))
    {
        return &s[1..s.len() - 1];
    }
    s
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("TELEGRAM_BOT_TOKEN", "123:abc"),
        ("CHANNEL_ID", "-1001234"),
        ("DATABASE_URL", "postgres://localhost/codes"),
    ];

    #[test]
    fn defaults_apply_when_only_required_vars_are_set() {
        let cfg = Config::from_lookup(lookup(&REQUIRED)).unwrap();
        assert_eq!(cfg.channel_id, ChatId(-1001234));
        assert_eq!(cfg.feed_url, DEFAULT_FEED_URL);
        assert_eq!(cfg.redeem_url.as_str(), DEFAULT_REDEEM_URL);
        assert_eq!(cfg.poll_interval, Duration::from_secs(1200));
        assert_eq!(cfg.fetch_timeout, Duration::from_secs(10));
        assert_eq!(cfg.message_limit, 1900);
    }

    #[test]
    fn missing_required_var_is_a_config_error() {
        let err = Config::from_lookup(lookup(&REQUIRED[..2])).unwrap_err();
        assert!(matches!(err, Error::Config(m) if m.contains("DATABASE_URL")));

        let mut pairs = REQUIRED.to_vec();
        pairs[0].1 = "   ";
        let err = Config::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, Error::Config(m) if m.contains("TELEGRAM_BOT_TOKEN")));
    }

    #[test]
    fn rejects_non_numeric_channel_and_zero_interval() {
        let mut pairs = REQUIRED.to_vec();
        pairs[1].1 = "general";
        assert!(Config::from_lookup(lookup(&pairs)).is_err());

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("POLL_INTERVAL_SECS", "0"));
        assert!(Config::from_lookup(lookup(&pairs)).is_err());

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("REDEEM_URL", "not a url"));
        assert!(Config::from_lookup(lookup(&pairs)).is_err());
    }

    #[test]
    fn overrides_are_parsed() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("FEED_URL", "http://localhost:9000/codes"));
        pairs.push(("POLL_INTERVAL_SECS", "60"));
        pairs.push(("FETCH_TIMEOUT_MS", "2500"));
        pairs.push(("MESSAGE_LIMIT", "100"));
        let cfg = Config::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(cfg.feed_url, "http://localhost:9000/codes");
        assert_eq!(cfg.poll_interval, Duration::from_secs(60));
        assert_eq!(cfg.fetch_timeout, Duration::from_millis(2500));
        assert_eq!(cfg.message_limit, 100);
    }

    #[test]
    fn strips_matching_quotes_only() {
        assert_eq!(strip_quotes("\"abc\""), "abc");
        assert_eq!(strip_quotes("'abc'"), "abc");
        assert_eq!(strip_quotes("\"abc"), "\"abc");
    }
}
