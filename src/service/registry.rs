//! 币种注册表
//!
//! 按名称返回配置好的币种实例。内置币种之外，可以通过配置文件追加 ERC20 代币；
//! 同名条目以配置文件为准。

use std::{collections::HashMap, str::FromStr, sync::Arc};

use ethers::types::Address;
use once_cell::sync::Lazy;

use crate::{
    config::{Config, Erc20Entry, OracleConfig, PriceSourceKind},
    domain::CurrencyConfig,
    error::{CurrencyError, CurrencyResult},
    infrastructure::{ChainProvider, EthersChainProvider},
    service::{
        currency::{Currency, Erc20Currency},
        fee_estimator::OracleGasPriceSource,
        price_service::{CachedPriceOracle, LiveCoinWatchClient, PriceOracle, RedstonePriceClient},
    },
};

/// 内置 ERC20 币种
static BUILTIN_ERC20: Lazy<Vec<Erc20Entry>> = Lazy::new(|| {
    vec![Erc20Entry {
        name: "boba".to_string(),
        ticker: "BOBA".to_string(),
        provider_url: "https://mainnet.boba.network/".to_string(),
        contract_address: "0xa18bF3994C0Cc6E3b63ac420308E5383f53120D7".to_string(),
        min_confirmations: 1,
        // RedStone 不提供 BOBA 报价
        price_source: PriceSourceKind::LiveCoinWatch,
        gas_ticker: "ETH".to_string(),
    }]
});

pub struct CurrencyRegistry {
    entries: HashMap<String, Erc20Entry>,
    redstone: Arc<dyn PriceOracle>,
    livecoinwatch: Option<Arc<dyn PriceOracle>>,
}

impl CurrencyRegistry {
    /// 使用配置中的预言机地址创建（带内存缓存）
    pub fn new(config: &Config) -> CurrencyResult<Self> {
        let redstone: Arc<dyn PriceOracle> = Arc::new(CachedPriceOracle::new(
            Arc::new(RedstonePriceClient::from_config(&config.oracle)),
            config.oracle.cache_ttl_secs,
        ));
        let livecoinwatch = livecoinwatch_oracle(&config.oracle);

        Self::with_oracles(&config.currencies, redstone, livecoinwatch)
    }

    /// 指定预言机实例创建
    pub fn with_oracles(
        extra: &[Erc20Entry],
        redstone: Arc<dyn PriceOracle>,
        livecoinwatch: Option<Arc<dyn PriceOracle>>,
    ) -> CurrencyResult<Self> {
        let mut entries = HashMap::new();
        for entry in BUILTIN_ERC20.iter().chain(extra.iter()) {
            entry
                .validate()
                .map_err(|e| CurrencyError::Config(e.to_string()))?;
            entries.insert(entry.name.to_lowercase(), entry.clone());
        }

        Ok(Self {
            entries,
            redstone,
            livecoinwatch,
        })
    }

    /// 已注册的币种名称（排序）
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.entries.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn entry(&self, name: &str) -> Option<&Erc20Entry> {
        self.entries.get(&name.to_lowercase())
    }

    /// 按名称创建币种，`provider_url` / `contract_address` 覆盖注册表默认值
    pub fn get_currency(
        &self,
        name: &str,
        sender: Address,
        provider_url: Option<&str>,
        contract_address: Option<&str>,
    ) -> CurrencyResult<Arc<dyn Currency>> {
        let entry = self.lookup(name)?;
        let url = provider_url.unwrap_or(&entry.provider_url);
        let provider = EthersChainProvider::new(url).map_err(|e| match provider_url {
            Some(_) => CurrencyError::invalid_argument(format!("{:#}", e)),
            None => CurrencyError::Config(format!("{:#}", e)),
        })?;

        let currency =
            self.build(entry, url, sender, Arc::new(provider), contract_address)?;
        Ok(Arc::new(currency))
    }

    /// 使用外部提供的链节点创建 ERC20 币种
    pub fn get_erc20_with_provider(
        &self,
        name: &str,
        sender: Address,
        provider: Arc<dyn ChainProvider>,
        contract_address: Option<&str>,
    ) -> CurrencyResult<Erc20Currency> {
        let entry = self.lookup(name)?;
        self.build(entry, &entry.provider_url, sender, provider, contract_address)
    }

    fn lookup(&self, name: &str) -> CurrencyResult<&Erc20Entry> {
        self.entry(name).ok_or_else(|| {
            tracing::warn!(currency = %name, "Unknown currency requested");
            CurrencyError::UnsupportedCurrency(name.to_string())
        })
    }

    fn build(
        &self,
        entry: &Erc20Entry,
        provider_url: &str,
        sender: Address,
        provider: Arc<dyn ChainProvider>,
        contract_address: Option<&str>,
    ) -> CurrencyResult<Erc20Currency> {
        let contract = match contract_address {
            Some(raw) => Address::from_str(raw).map_err(|e| {
                CurrencyError::invalid_argument(format!("invalid contract address {}: {}", raw, e))
            })?,
            None => entry
                .parsed_contract_address()
                .map_err(|e| CurrencyError::Config(format!("{:#}", e)))?,
        };

        let token_oracle = match entry.price_source {
            PriceSourceKind::Redstone => self.redstone.clone(),
            PriceSourceKind::LiveCoinWatch => self.livecoinwatch.clone().ok_or_else(|| {
                CurrencyError::Config(format!(
                    "{} prices come from LiveCoinWatch but no API key is configured",
                    entry.name
                ))
            })?,
        };

        let config = CurrencyConfig::new(&entry.name, &entry.ticker, provider_url)
            .with_min_confirmations(entry.min_confirmations);

        let gas_source = Arc::new(OracleGasPriceSource::new(
            self.redstone.clone(),
            entry.gas_ticker.clone(),
            config.base.subunits,
        ));

        tracing::debug!(
            currency = %entry.name,
            contract = ?contract,
            provider = %provider_url,
            "Created ERC20 currency"
        );

        Ok(
            Erc20Currency::new(config, contract, sender, provider, token_oracle)
                .with_gas_price_source(gas_source),
        )
    }
}

fn livecoinwatch_oracle(config: &OracleConfig) -> Option<Arc<dyn PriceOracle>> {
    let client = LiveCoinWatchClient::from_config(config).ok()?;
    Some(Arc::new(CachedPriceOracle::new(
        Arc::new(client),
        config.cache_ttl_secs,
    )))
}
