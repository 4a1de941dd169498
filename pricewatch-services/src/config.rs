//! Runtime configuration loaded from the environment

use pricewatch_sources::{
    CoinCapSource, CoinGeckoSource, CoinGeckoTokenSource, JupiterSource, PriceSource,
};
use reqwest::Client;
use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::price_resolver::ResolverConfig;
use crate::scheduler::SchedulerConfig;

const DEFAULT_TRACKED_ASSETS: &str = "bitcoin,ethereum,solana,cardano";
const DEFAULT_SOURCES: &str = "coingecko,coincap,jupiter";
const DEFAULT_MINTS: &str = r#"{"solana":"So11111111111111111111111111111111111111112"}"#;

/// Known upstream price APIs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    CoinGecko,
    CoinCap,
    Jupiter,
    CoinGeckoToken,
}

impl SourceKind {
    fn build(self, http: &Client, mints: &HashMap<String, String>) -> Arc<dyn PriceSource> {
        match self {
            SourceKind::CoinGecko => Arc::new(CoinGeckoSource::new(http.clone())),
            SourceKind::CoinCap => Arc::new(CoinCapSource::new(http.clone())),
            SourceKind::Jupiter => Arc::new(JupiterSource::new(http.clone(), mints.clone())),
            SourceKind::CoinGeckoToken => {
                Arc::new(CoinGeckoTokenSource::new(http.clone(), mints.clone()))
            }
        }
    }
}

impl FromStr for SourceKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "coingecko" => Ok(SourceKind::CoinGecko),
            "coincap" => Ok(SourceKind::CoinCap),
            "jupiter" => Ok(SourceKind::Jupiter),
            "coingecko-token" => Ok(SourceKind::CoinGeckoToken),
            other => Err(ConfigError::UnknownSource(other.to_string())),
        }
    }
}

/// Service configuration
#[derive(Debug, Clone)]
pub struct PricewatchConfig {
    pub tracked_assets: Vec<String>,
    pub currency: String,
    pub refresh_interval: Duration,
    pub cache_ttl: Duration,
    pub source_timeout: Duration,
    /// Primary sources in the order they are tried
    pub sources: Vec<SourceKind>,
    /// Tried after every primary source failed
    pub fallback_source: Option<SourceKind>,
    /// Asset id to on-chain mint address, for mint-keyed sources
    pub asset_mints: HashMap<String, String>,
    pub alerts_db_path: PathBuf,
    pub discord_bot_token: Option<String>,
    pub server_port: u16,
}

impl PricewatchConfig {
    /// Load configuration from process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    ///
    /// Unset and empty variables take their defaults, except
    /// `TRACKED_ASSETS`, which must name at least one asset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let tracked_assets = match lookup("TRACKED_ASSETS") {
            Some(raw) => split_list(&raw),
            None => split_list(DEFAULT_TRACKED_ASSETS),
        };
        if tracked_assets.is_empty() {
            return Err(ConfigError::NoTrackedAssets);
        }

        let currency = var("DISPLAY_CURRENCY")
            .map(|c| c.trim().to_lowercase())
            .unwrap_or_else(|| "usd".to_string());

        let refresh_interval = parse_secs(&var, "PRICE_REFRESH_INTERVAL_SECS", 300)?;
        let cache_ttl = parse_secs(&var, "PRICE_CACHE_TTL_SECS", 300)?;
        let source_timeout = parse_secs(&var, "PRICE_SOURCE_TIMEOUT_SECS", 5)?;
        if cache_ttl.is_zero() {
            return Err(ConfigError::ZeroDuration("PRICE_CACHE_TTL_SECS"));
        }
        if refresh_interval.is_zero() {
            return Err(ConfigError::ZeroDuration("PRICE_REFRESH_INTERVAL_SECS"));
        }
        if source_timeout.is_zero() {
            return Err(ConfigError::ZeroDuration("PRICE_SOURCE_TIMEOUT_SECS"));
        }

        let sources = split_list(&var("PRICE_SOURCES").unwrap_or_else(|| DEFAULT_SOURCES.to_string()))
            .iter()
            .map(|s| s.parse())
            .collect::<Result<Vec<SourceKind>, _>>()?;
        if sources.is_empty() {
            return Err(ConfigError::NoSources);
        }

        let fallback_source = match var("PRICE_FALLBACK_SOURCE") {
            Some(name) if name.trim().eq_ignore_ascii_case("none") => None,
            Some(name) => Some(name.parse()?),
            None => Some(SourceKind::CoinGeckoToken),
        };

        let mints_json = var("ASSET_MINTS").unwrap_or_else(|| DEFAULT_MINTS.to_string());
        let asset_mints: HashMap<String, String> =
            serde_json::from_str(&mints_json).map_err(|e| ConfigError::InvalidJson {
                field: "ASSET_MINTS".to_string(),
                error: e.to_string(),
            })?;
        let asset_mints = asset_mints
            .into_iter()
            .map(|(asset, mint)| (asset.to_lowercase(), mint))
            .collect();

        let alerts_db_path = PathBuf::from(
            var("ALERTS_DB_PATH").unwrap_or_else(|| "data/alerts.db".to_string()),
        );

        let server_port = match var("SERVER_PORT") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidNumber {
                field: "SERVER_PORT".to_string(),
                value: raw,
            })?,
            None => 3001,
        };

        Ok(Self {
            tracked_assets,
            currency,
            refresh_interval,
            cache_ttl,
            source_timeout,
            sources,
            fallback_source,
            asset_mints,
            alerts_db_path,
            discord_bot_token: var("DISCORD_BOT_TOKEN"),
            server_port,
        })
    }

    /// Instantiate the configured primary sources and final fallback
    pub fn build_sources(
        &self,
        http: &Client,
    ) -> (Vec<Arc<dyn PriceSource>>, Option<Arc<dyn PriceSource>>) {
        let primaries = self
            .sources
            .iter()
            .map(|kind| kind.build(http, &self.asset_mints))
            .collect();
        let fallback = self
            .fallback_source
            .map(|kind| kind.build(http, &self.asset_mints));
        (primaries, fallback)
    }

    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            cache_ttl: self.cache_ttl,
            source_timeout: self.source_timeout,
        }
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            interval: self.refresh_interval,
            tracked_assets: self.tracked_assets.clone(),
            currency: self.currency.clone(),
        }
    }

    /// Whether an asset id is one the scheduler prices
    pub fn is_tracked(&self, asset_id: &str) -> bool {
        self.tracked_assets.iter().any(|a| a == asset_id)
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_secs<F>(var: &F, key: &str, default: u64) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| ConfigError::InvalidNumber {
                field: key.to_string(),
                value: raw,
            }),
        None => Ok(Duration::from_secs(default)),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("TRACKED_ASSETS must name at least one asset")]
    NoTrackedAssets,

    #[error("PRICE_SOURCES must name at least one source")]
    NoSources,

    #[error("Unknown price source: {0}")]
    UnknownSource(String),

    #[error("Invalid number in {field}: {value}")]
    InvalidNumber { field: String, value: String },

    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),

    #[error("Invalid JSON in {field}: {error}")]
    InvalidJson { field: String, error: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<PricewatchConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        PricewatchConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();

        assert_eq!(config.tracked_assets, vec!["bitcoin", "ethereum", "solana", "cardano"]);
        assert_eq!(config.currency, "usd");
        assert_eq!(config.refresh_interval, Duration::from_secs(300));
        assert_eq!(config.cache_ttl, Duration::from_secs(300));
        assert_eq!(config.source_timeout, Duration::from_secs(5));
        assert_eq!(
            config.sources,
            vec![SourceKind::CoinGecko, SourceKind::CoinCap, SourceKind::Jupiter]
        );
        assert_eq!(config.fallback_source, Some(SourceKind::CoinGeckoToken));
        assert_eq!(
            config.asset_mints.get("solana").map(String::as_str),
            Some("So11111111111111111111111111111111111111112")
        );
        assert_eq!(config.alerts_db_path, PathBuf::from("data/alerts.db"));
        assert!(config.discord_bot_token.is_none());
        assert_eq!(config.server_port, 3001);
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("TRACKED_ASSETS", " Solana , bitcoin,,"),
            ("DISPLAY_CURRENCY", "EUR"),
            ("PRICE_REFRESH_INTERVAL_SECS", "60"),
            ("PRICE_CACHE_TTL_SECS", "90"),
            ("PRICE_SOURCES", "coincap, coingecko"),
            ("PRICE_FALLBACK_SOURCE", "none"),
            ("ASSET_MINTS", r#"{"BONK":"DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263"}"#),
            ("DISCORD_BOT_TOKEN", "token"),
            ("SERVER_PORT", "8080"),
        ])
        .unwrap();

        assert_eq!(config.tracked_assets, vec!["solana", "bitcoin"]);
        assert_eq!(config.currency, "eur");
        assert_eq!(config.refresh_interval, Duration::from_secs(60));
        assert_eq!(config.cache_ttl, Duration::from_secs(90));
        assert_eq!(config.sources, vec![SourceKind::CoinCap, SourceKind::CoinGecko]);
        assert!(config.fallback_source.is_none());
        assert!(config.asset_mints.contains_key("bonk"));
        assert_eq!(config.discord_bot_token.as_deref(), Some("token"));
        assert_eq!(config.server_port, 8080);
        assert!(config.is_tracked("solana"));
        assert!(!config.is_tracked("cardano"));
    }

    #[test]
    fn test_empty_tracked_assets_is_fatal() {
        assert!(matches!(
            load(&[("TRACKED_ASSETS", " , ")]),
            Err(ConfigError::NoTrackedAssets)
        ));
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            load(&[("PRICE_SOURCES", "coingecko,binance")]),
            Err(ConfigError::UnknownSource(name)) if name == "binance"
        ));
        assert!(matches!(
            load(&[("PRICE_REFRESH_INTERVAL_SECS", "five")]),
            Err(ConfigError::InvalidNumber { .. })
        ));
        assert!(matches!(
            load(&[("PRICE_REFRESH_INTERVAL_SECS", "0")]),
            Err(ConfigError::ZeroDuration(_))
        ));
        assert!(matches!(
            load(&[("PRICE_CACHE_TTL_SECS", "0")]),
            Err(ConfigError::ZeroDuration("PRICE_CACHE_TTL_SECS"))
        ));
        assert!(matches!(
            load(&[("ASSET_MINTS", "not json")]),
            Err(ConfigError::InvalidJson { .. })
        ));
        assert!(matches!(
            load(&[("SERVER_PORT", "70000")]),
            Err(ConfigError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn test_build_sources_follows_configured_order() {
        let config = load(&[("PRICE_SOURCES", "jupiter,coingecko")]).unwrap();
        let (primaries, fallback) = config.build_sources(&Client::new());

        let names: Vec<&str> = primaries.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["jupiter", "coingecko"]);
        assert_eq!(fallback.unwrap().name(), "coingecko-token");
    }
}
