//! 价格预言机
//!
//! 返回某个行情代码的法币（USD）现价。价格一律解析为 `Decimal`，
//! 不经过 f64 运算。

use std::{collections::HashMap, str::FromStr, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::config::OracleConfig;

#[async_trait]
pub trait PriceOracle: Send + Sync {
    /// 获取单个币种价格（USD）
    async fn get_price(&self, ticker: &str) -> Result<Decimal>;
}

/// 价格数据结构
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Price {
    pub price_usd: Decimal,
    pub last_updated: DateTime<Utc>,
}

/// 按配置创建带超时的 HTTP 客户端
pub fn build_http_client(config: &OracleConfig) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.timeout_secs))
        .user_agent("chain-currency/0.1")
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// JSON 数值 -> Decimal，使用数字的文本表示避免浮点误差
pub fn decimal_from_json(value: &serde_json::Value) -> Result<Decimal> {
    let text = match value {
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s.trim().to_string(),
        other => anyhow::bail!("price is not a number: {}", other),
    };

    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .with_context(|| format!("Invalid price value: {}", text))
}

/// RedStone 价格 API
pub struct RedstonePriceClient {
    client: reqwest::Client,
    base_url: String,
}

impl RedstonePriceClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub fn from_config(config: &OracleConfig) -> Self {
        Self::new(build_http_client(config), config.redstone_url.clone())
    }
}

#[async_trait]
impl PriceOracle for RedstonePriceClient {
    async fn get_price(&self, ticker: &str) -> Result<Decimal> {
        let url = format!("{}/prices", self.base_url.trim_end_matches('/'));
        let symbol = ticker.to_uppercase();

        tracing::debug!(ticker = %symbol, url = %url, "Fetching price from RedStone");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("symbol", symbol.as_str()),
                ("provider", "redstone"),
                ("limit", "1"),
            ])
            .send()
            .await
            .context("Failed to fetch price from RedStone")?;

        if !response.status().is_success() {
            anyhow::bail!("RedStone API error: {}", response.status());
        }

        let body: serde_json::Value = response
            .json()
            .await
            .context("Failed to parse RedStone response")?;

        let value = body
            .get(0)
            .and_then(|entry| entry.get("value"))
            .ok_or_else(|| anyhow::anyhow!("Price not found for {}", symbol))?;

        decimal_from_json(value)
    }
}

/// LiveCoinWatch 价格 API（RedStone 未覆盖的代币）
pub struct LiveCoinWatchClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl LiveCoinWatchClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    pub fn from_config(config: &OracleConfig) -> Result<Self> {
        let api_key = config
            .livecoinwatch_api_key
            .clone()
            .ok_or_else(|| anyhow::anyhow!("LIVECOINWATCH_API_KEY is not configured"))?;
        Ok(Self::new(
            build_http_client(config),
            config.livecoinwatch_url.clone(),
            api_key,
        ))
    }
}

#[async_trait]
impl PriceOracle for LiveCoinWatchClient {
    async fn get_price(&self, ticker: &str) -> Result<Decimal> {
        let url = format!("{}/coins/single", self.base_url.trim_end_matches('/'));
        let code = ticker.to_uppercase();

        tracing::debug!(ticker = %code, url = %url, "Fetching price from LiveCoinWatch");

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .json(&serde_json::json!({ "currency": "USD", "code": code }))
            .send()
            .await
            .context("Failed to fetch price from LiveCoinWatch")?;

        if !response.status().is_success() {
            anyhow::bail!("LiveCoinWatch API error: {}", response.status());
        }

        let body: serde_json::Value = response
            .json()
            .await
            .context("Failed to parse LiveCoinWatch response")?;

        match body.get("rate") {
            Some(rate) if !rate.is_null() => decimal_from_json(rate),
            _ => anyhow::bail!("unable to get price for {}", code),
        }
    }
}

/// 内存缓存包装，缓存键为大写行情代码
pub struct CachedPriceOracle {
    inner: Arc<dyn PriceOracle>,
    ttl: Duration,
    cache: RwLock<HashMap<String, Price>>,
}

impl CachedPriceOracle {
    pub fn new(inner: Arc<dyn PriceOracle>, ttl_secs: u64) -> Self {
        Self {
            inner,
            ttl: Duration::from_secs(ttl_secs),
            cache: RwLock::new(HashMap::new()),
        }
    }

    async fn cached(&self, symbol: &str) -> Option<Decimal> {
        let cache = self.cache.read().await;
        let price = cache.get(symbol)?;
        // 时钟回拨时 age 为负，按未过期处理
        let fresh = match (Utc::now() - price.last_updated).to_std() {
            Ok(age) => age < self.ttl,
            Err(_) => true,
        };
        fresh.then_some(price.price_usd)
    }
}

#[async_trait]
impl PriceOracle for CachedPriceOracle {
    async fn get_price(&self, ticker: &str) -> Result<Decimal> {
        let symbol = ticker.to_uppercase();

        if let Some(price) = self.cached(&symbol).await {
            return Ok(price);
        }

        tracing::debug!(ticker = %symbol, "Price cache miss");
        let price = self.inner.get_price(&symbol).await?;

        let mut cache = self.cache.write().await;
        cache.insert(
            symbol,
            Price {
                price_usd: price,
                last_updated: Utc::now(),
            },
        );

        Ok(price)
    }
}
