//! 配置管理模块
//! 支持从环境变量和配置文件加载配置

use std::{path::Path, str::FromStr};

use anyhow::{Context, Result};
use ethers::types::Address;
use serde::{Deserialize, Serialize};

use crate::domain::currency::DEFAULT_MIN_CONFIRMATIONS;

/// 价格缓存有效期上限（一天）
pub const MAX_CACHE_TTL_SECS: u64 = 86_400;

/// 应用配置结构体
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub oracle: OracleConfig,
    /// 额外注册的 ERC20 币种（内置币种之外）
    #[serde(default)]
    pub currencies: Vec<Erc20Entry>,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "text"
    pub ansi: bool,
}

/// 价格预言机配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    pub redstone_url: String,
    pub livecoinwatch_url: String,
    pub livecoinwatch_api_key: Option<String>,
    /// 内存缓存有效期（秒），0 表示不缓存
    pub cache_ttl_secs: u64,
    pub timeout_secs: u64,
}

/// 代币价格来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceSourceKind {
    #[default]
    Redstone,
    LiveCoinWatch,
}

/// 配置文件中声明的 ERC20 币种
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Erc20Entry {
    pub name: String,
    pub ticker: String,
    pub provider_url: String,
    pub contract_address: String,
    #[serde(default = "default_min_confirmations")]
    pub min_confirmations: u64,
    #[serde(default)]
    pub price_source: PriceSourceKind,
    /// 支付 Gas 的原生币行情代码
    #[serde(default = "default_gas_ticker")]
    pub gas_ticker: String,
}

fn default_min_confirmations() -> u64 {
    DEFAULT_MIN_CONFIRMATIONS
}

fn default_gas_ticker() -> String {
    "ETH".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            format: std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".into()),
            ansi: std::env::var("LOG_ANSI")
                .ok()
                .map(|v| v == "1")
                .unwrap_or(true),
        }
    }
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            redstone_url: std::env::var("REDSTONE_API_URL")
                .unwrap_or_else(|_| "https://api.redstone.finance".into()),
            livecoinwatch_url: std::env::var("LIVECOINWATCH_API_URL")
                .unwrap_or_else(|_| "https://api.livecoinwatch.com".into()),
            livecoinwatch_api_key: std::env::var("LIVECOINWATCH_API_KEY").ok(),
            cache_ttl_secs: std::env::var("PRICE_CACHE_TTL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(300),
            timeout_secs: std::env::var("PRICE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
        }
    }
}

impl Config {
    /// 从环境变量加载配置（会先读取 .env）
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            logging: LoggingConfig::default(),
            oracle: OracleConfig::default(),
            currencies: Vec::new(),
        })
    }

    /// 从配置文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: Config =
            toml::from_str(&content).with_context(|| "Failed to parse config file as TOML")?;

        Ok(config)
    }

    /// 从环境变量和配置文件合并加载（配置文件优先级更高）
    pub fn from_env_and_file<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        let mut config = Self::from_env()?;

        if let Some(path) = path {
            if path.as_ref().exists() {
                config = Self::from_file(path)?;
            }
        }

        Ok(config)
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            anyhow::bail!("LOG_LEVEL must be one of: {:?}", valid_levels);
        }

        if self.logging.format != "json" && self.logging.format != "text" {
            anyhow::bail!("LOG_FORMAT must be 'json' or 'text'");
        }

        validate_url("oracle.redstone_url", &self.oracle.redstone_url)?;
        validate_url("oracle.livecoinwatch_url", &self.oracle.livecoinwatch_url)?;

        if self.oracle.cache_ttl_secs > MAX_CACHE_TTL_SECS {
            anyhow::bail!(
                "oracle.cache_ttl_secs must not exceed {} seconds",
                MAX_CACHE_TTL_SECS
            );
        }

        if self.oracle.timeout_secs == 0 {
            anyhow::bail!("oracle.timeout_secs must be greater than 0");
        }

        let mut seen = std::collections::HashSet::new();
        for entry in &self.currencies {
            entry.validate()?;
            if !seen.insert(entry.name.to_lowercase()) {
                anyhow::bail!("duplicate currency entry: {}", entry.name);
            }
            if entry.price_source == PriceSourceKind::LiveCoinWatch
                && self.oracle.livecoinwatch_api_key.is_none()
            {
                anyhow::bail!(
                    "currency {} uses livecoinwatch but LIVECOINWATCH_API_KEY is not set",
                    entry.name
                );
            }
        }

        Ok(())
    }
}

impl Erc20Entry {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            anyhow::bail!("currency name must not be empty");
        }
        if self.ticker.trim().is_empty() {
            anyhow::bail!("currency {} has an empty ticker", self.name);
        }
        validate_url(&format!("{}.provider_url", self.name), &self.provider_url)?;
        self.parsed_contract_address()?;
        Ok(())
    }

    pub fn parsed_contract_address(&self) -> Result<Address> {
        Address::from_str(&self.contract_address).with_context(|| {
            format!(
                "invalid contract address for {}: {}",
                self.name, self.contract_address
            )
        })
    }
}

fn validate_url(field: &str, url: &str) -> Result<()> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        anyhow::bail!("{} must start with http:// or https://", field);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn test_config_from_env() {
        let config = Config::from_env().unwrap();
        assert!(config.currencies.is_empty());
    }

    #[test]
    fn test_config_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[logging]
level = "debug"
format = "json"
ansi = false

[oracle]
redstone_url = "https://api.redstone.finance"
livecoinwatch_url = "https://api.livecoinwatch.com"
livecoinwatch_api_key = "test-key"
cache_ttl_secs = 60
timeout_secs = 5

[[currencies]]
name = "usdc-boba"
ticker = "USDC"
provider_url = "https://mainnet.boba.network/"
contract_address = "0x66a2A913e447d6b4BF33EFbec43aAeF87890FBbc"
min_confirmations = 2
price_source = "livecoinwatch"
"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.oracle.cache_ttl_secs, 60);
        assert_eq!(config.currencies.len(), 1);

        let entry = &config.currencies[0];
        assert_eq!(entry.min_confirmations, 2);
        assert_eq!(entry.price_source, PriceSourceKind::LiveCoinWatch);
        assert_eq!(entry.gas_ticker, "ETH");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_entry_defaults() {
        let entry: Erc20Entry = toml::from_str(
            r#"
name = "dai"
ticker = "DAI"
provider_url = "https://cloudflare-eth.com/"
contract_address = "0x6B175474E89094C44Da98b954EedeAC495271d0F"
"#,
        )
        .unwrap();
        assert_eq!(entry.min_confirmations, DEFAULT_MIN_CONFIRMATIONS);
        assert_eq!(entry.price_source, PriceSourceKind::Redstone);
        assert!(entry.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.logging.level = "info".into();
        config.logging.format = "text".into();
        assert!(config.validate().is_ok());

        config.logging.format = "xml".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_cache_ttl_upper_bound() {
        let mut config = Config::default();
        config.logging.level = "info".into();
        config.logging.format = "text".into();

        config.oracle.cache_ttl_secs = MAX_CACHE_TTL_SECS;
        assert!(config.validate().is_ok());

        config.oracle.cache_ttl_secs = MAX_CACHE_TTL_SECS + 1;
        assert!(config.validate().is_err());

        config.oracle.cache_ttl_secs = u64::MAX / 2;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("cache_ttl_secs"));
    }

    #[test]
    fn test_validation_rejects_bad_entries() {
        let mut config = Config::default();
        config.logging.level = "info".into();
        config.logging.format = "text".into();
        config.currencies.push(Erc20Entry {
            name: "broken".into(),
            ticker: "BRK".into(),
            provider_url: "https://rpc.example".into(),
            contract_address: "0x1234".into(),
            min_confirmations: 1,
            price_source: PriceSourceKind::Redstone,
            gas_ticker: "ETH".into(),
        });
        assert!(config.validate().is_err());

        config.currencies[0].contract_address =
            "0x6B175474E89094C44Da98b954EedeAC495271d0F".into();
        config.currencies.push(config.currencies[0].clone());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }
}
