//! 链无关的币种抽象
//!
//! 每个链族（EVM 原生币、ERC20 代币、账户模型链……）各自实现同一组操作：
//! 查询并归一化交易、估算转账手续费、构建未签名交易。本 crate 提供 ERC20 实现。

use std::sync::Arc;

use async_trait::async_trait;
use ethers::types::{Address, U256};
use rust_decimal::Decimal;

use crate::{
    domain::{
        amount::{from_base_units, to_base_units},
        BaseUnit, CurrencyConfig, NormalizedTransfer, PreparedTransaction,
    },
    error::{CurrencyError, CurrencyResult},
    infrastructure::ChainProvider,
    service::{
        fee_estimator::{FeeEstimator, FeeQuote, GasPriceSource, OracleGasPriceSource},
        price_service::PriceOracle,
        token_contract::TokenBinding,
        transaction_builder::TransactionBuilder,
        tx_decoder,
    },
};

#[async_trait]
pub trait Currency: Send + Sync {
    fn config(&self) -> &CurrencyConfig;

    /// 本币种的 Gas 币价格来源
    fn gas_price_source(&self) -> Arc<dyn GasPriceSource>;

    /// 本币种的法币价格
    async fn price(&self) -> CurrencyResult<Decimal>;

    /// 按交易ID查询并归一化转账
    async fn get_tx(&self, tx_id: &str) -> CurrencyResult<NormalizedTransfer>;

    /// 转账手续费，以本币种最小单位计
    async fn get_fee(&self, amount: U256, to: Address) -> CurrencyResult<U256>;

    /// 构建待签名交易
    async fn create_tx(&self, amount: U256, to: Address) -> CurrencyResult<PreparedTransaction>;
}

/// ERC20 代币
pub struct Erc20Currency {
    config: CurrencyConfig,
    provider: Arc<dyn ChainProvider>,
    binding: TokenBinding,
    token_oracle: Arc<dyn PriceOracle>,
    gas_source: Arc<dyn GasPriceSource>,
    fee_estimator: FeeEstimator,
    builder: TransactionBuilder,
}

impl Erc20Currency {
    /// Gas 币默认按 ETH 计价，可用 `with_gas_price_source` 覆盖
    pub fn new(
        config: CurrencyConfig,
        contract_address: Address,
        sender: Address,
        provider: Arc<dyn ChainProvider>,
        token_oracle: Arc<dyn PriceOracle>,
    ) -> Self {
        let gas_source: Arc<dyn GasPriceSource> =
            Arc::new(OracleGasPriceSource::ethereum(token_oracle.clone()));

        Self {
            config,
            binding: TokenBinding::new(contract_address, sender, provider.clone()),
            fee_estimator: FeeEstimator::new(provider.clone()),
            builder: TransactionBuilder::new(provider.clone()),
            provider,
            token_oracle,
            gas_source,
        }
    }

    pub fn with_gas_price_source(mut self, gas_source: Arc<dyn GasPriceSource>) -> Self {
        self.gas_source = gas_source;
        self
    }

    pub fn binding(&self) -> &TokenBinding {
        &self.binding
    }

    /// 代币基础单位（wei, 10^decimals），首次调用时解析 decimals
    pub async fn base(&self) -> CurrencyResult<BaseUnit> {
        let token = self.binding.materialize().await?;
        Ok(BaseUnit::new(self.config.base.unit.clone(), token.base))
    }

    /// 手续费明细
    pub async fn quote_fee(&self, amount: U256, to: Address) -> CurrencyResult<FeeQuote> {
        self.fee_estimator
            .quote(
                &self.binding,
                self.gas_source.as_ref(),
                self.token_oracle.as_ref(),
                &self.config.ticker,
                amount,
                to,
            )
            .await
    }

    /// "1.5" -> 最小单位
    pub async fn to_base_units(&self, amount: &str) -> CurrencyResult<U256> {
        let token = self.binding.materialize().await?;
        to_base_units(amount, token.decimals)
    }

    /// 最小单位 -> "1.500000"
    pub async fn from_base_units(&self, amount: U256) -> CurrencyResult<String> {
        let token = self.binding.materialize().await?;
        from_base_units(amount, token.decimals)
    }
}

#[async_trait]
impl Currency for Erc20Currency {
    fn config(&self) -> &CurrencyConfig {
        &self.config
    }

    fn gas_price_source(&self) -> Arc<dyn GasPriceSource> {
        self.gas_source.clone()
    }

    async fn price(&self) -> CurrencyResult<Decimal> {
        self.token_oracle
            .get_price(&self.config.ticker)
            .await
            .map_err(|e| CurrencyError::price_unavailable(format!("{} price: {}", self.config.ticker, e)))
    }

    async fn get_tx(&self, tx_id: &str) -> CurrencyResult<NormalizedTransfer> {
        self.binding.materialize().await?;
        tx_decoder::decode_transfer(self.provider.as_ref(), tx_id, self.config.min_confirmations).await
    }

    async fn get_fee(&self, amount: U256, to: Address) -> CurrencyResult<U256> {
        Ok(self.quote_fee(amount, to).await?.fee)
    }

    async fn create_tx(&self, amount: U256, to: Address) -> CurrencyResult<PreparedTransaction> {
        self.builder.build_transfer(&self.binding, amount, to).await
    }
}
