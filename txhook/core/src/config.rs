use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use once_cell::sync::Lazy;
use serde_json::Value;
use thiserror::Error;

/// Whether the transaction-start patch may be installed.
pub const ENABLED: &str = "txhook.enabled";
/// Whether installed patches notify lifecycle observers.
pub const LIFECYCLE: &str = "txhook.lifecycle";

/// Environment variables mirrored into the store by [`sync_env_settings`].
const ENV_SETTINGS: [(&str, &str); 2] = [
    ("TXHOOK_ENABLED", ENABLED),
    ("TXHOOK_LIFECYCLE", LIFECYCLE),
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },
}

/// Global configuration key-value store.
pub static CONFIG_STORE: Lazy<RwLock<BTreeMap<String, Value>>> =
    Lazy::new(|| RwLock::new(BTreeMap::new()));

/// Get a configuration value.
pub fn get(key: &str) -> Option<Value> {
    CONFIG_STORE
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(key)
        .cloned()
}

/// Set a configuration value.
pub fn set<T: Into<Value>>(key: &str, value: T) {
    CONFIG_STORE
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(key.to_string(), value.into());
}

/// Get a configuration value as bool, accepting the textual forms
/// understood by [`parse_bool`].
pub fn get_bool(key: &str) -> Option<bool> {
    match get(key)? {
        Value::Bool(b) => Some(b),
        Value::String(s) => parse_bool(key, &s).ok(),
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        _ => None,
    }
}

/// Clear all configuration.
pub fn clear() {
    CONFIG_STORE
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .clear();
}

pub fn is_enabled() -> bool {
    get_bool(ENABLED).unwrap_or(true)
}

pub fn lifecycle_enabled() -> bool {
    get_bool(LIFECYCLE).unwrap_or(true)
}

pub fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw.to_string(),
        }),
    }
}

/// Copy `TXHOOK_*` environment settings into the store.
///
/// Unset and unparsable variables leave the store untouched, so the key keeps
/// its default. Every valid variable is applied; the first bad one is reported.
pub fn sync_env_settings() -> Result<(), ConfigError> {
    sync_settings(|name| std::env::var(name).ok())
}

fn sync_settings<F>(lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut first_err = None;
    for (env, key) in ENV_SETTINGS {
        let Some(raw) = lookup(env) else {
            continue;
        };
        match parse_bool(key, &raw) {
            Ok(value) => {
                log::debug!("setting update [{key}]={value} <= {env}");
                set(key, value);
            }
            Err(err) => {
                first_err.get_or_insert(err);
            }
        }
    }
    first_err.map_or(Ok(()), Err)
}
