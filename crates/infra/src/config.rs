//! Runtime configuration read from `STOCKLEDGER_*` environment variables.

use std::str::FromStr;

use crate::query::{PageLimits, Pagination};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryConfig {
    pub default_page_limit: usize,
    pub max_page_limit: usize,
    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub log_filter: String,
    pub log_json: bool,
    /// Load the demo catalog into an empty store at startup.
    pub seed_demo: bool,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            default_page_limit: Pagination::DEFAULT_LIMIT,
            max_page_limit: Pagination::MAX_LIMIT,
            log_filter: "info".to_string(),
            log_json: true,
            seed_demo: false,
        }
    }
}

impl InventoryConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unparseable values keep their default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let default_page_limit = parsed(&lookup, "STOCKLEDGER_DEFAULT_PAGE_LIMIT", defaults.default_page_limit)
            .max(1);
        let max_page_limit = parsed(&lookup, "STOCKLEDGER_MAX_PAGE_LIMIT", defaults.max_page_limit).max(1);
        let log_filter = lookup("STOCKLEDGER_LOG")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.log_filter);

        Self {
            default_page_limit: default_page_limit.min(max_page_limit),
            max_page_limit,
            log_filter,
            log_json: parsed(&lookup, "STOCKLEDGER_LOG_JSON", defaults.log_json),
            seed_demo: parsed(&lookup, "STOCKLEDGER_SEED_DEMO", defaults.seed_demo),
        }
    }

    /// Page-size bounds handed to the list services.
    pub fn page_limits(&self) -> PageLimits {
        PageLimits {
            default_limit: self.default_page_limit,
            max_limit: self.max_page_limit,
        }
    }
}

fn parsed<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Debug,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse::<T>().unwrap_or_else(|_| {
            tracing::warn!("{key}={raw:?} is not valid, falling back to {default:?}");
            default
        }),
    }
}
