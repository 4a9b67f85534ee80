//! 手续费估算
//!
//! 把以 Gas 币计价的手续费（gas_price * gas_limit，单位 wei）换算成代币自身的
//! 最小单位：
//!
//! ```text
//! fee = floor(native_price * gas_cost * token_base / (native_base * token_price))
//! ```
//!
//! 价格展开为整数分数后在 U512 上做一次整数除法，结果向零取整（非负数即向下取整），
//! 调用方依赖的是低估而不是高估。

use std::sync::Arc;

use async_trait::async_trait;
use ethers::types::{Address, U256, U512};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    domain::amount::{to_hex_quantity, PriceRatio},
    error::{CurrencyError, CurrencyResult},
    infrastructure::ChainProvider,
    service::{price_service::PriceOracle, token_contract::TokenBinding},
};

/// 支付 Gas 的原生币价格
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeGasPrice {
    /// 每个整单位的法币价格
    pub fiat_price: Decimal,
    /// 每个整单位的最小单位数（wei -> ether 为 10^18）
    pub base: U256,
}

/// 每个币种提供自己的 Gas 币价格来源
///
/// 默认预言机未覆盖的链需要提供自己的实现。
#[async_trait]
pub trait GasPriceSource: Send + Sync {
    async fn native_gas_price(&self) -> CurrencyResult<NativeGasPrice>;
}

/// 通过价格预言机获取 Gas 币价格
pub struct OracleGasPriceSource {
    oracle: Arc<dyn PriceOracle>,
    ticker: String,
    base: U256,
}

impl OracleGasPriceSource {
    pub fn new(oracle: Arc<dyn PriceOracle>, ticker: impl Into<String>, base: U256) -> Self {
        Self {
            oracle,
            ticker: ticker.into(),
            base,
        }
    }

    /// ETH 计价，10^18 wei
    pub fn ethereum(oracle: Arc<dyn PriceOracle>) -> Self {
        Self::new(oracle, "ETH", U256::exp10(18))
    }
}

#[async_trait]
impl GasPriceSource for OracleGasPriceSource {
    async fn native_gas_price(&self) -> CurrencyResult<NativeGasPrice> {
        let fiat_price = self.oracle.get_price(&self.ticker).await.map_err(|e| {
            tracing::warn!(ticker = %self.ticker, error = ?e, "Gas currency price lookup failed");
            CurrencyError::price_unavailable(format!("{} price: {}", self.ticker, e))
        })?;

        Ok(NativeGasPrice {
            fiat_price,
            base: self.base,
        })
    }
}

/// 固定汇率（没有任何预言机覆盖的链）
pub struct FixedGasPriceSource {
    price: NativeGasPrice,
}

impl FixedGasPriceSource {
    pub fn new(fiat_price: Decimal, base: U256) -> Self {
        Self {
            price: NativeGasPrice { fiat_price, base },
        }
    }
}

#[async_trait]
impl GasPriceSource for FixedGasPriceSource {
    async fn native_gas_price(&self) -> CurrencyResult<NativeGasPrice> {
        Ok(self.price)
    }
}

/// 一次转账所需的网络 Gas 参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasParameters {
    pub gas_price: U256,
    pub gas_limit: U256,
}

impl GasParameters {
    /// gas_price * gas_limit（wei）
    pub fn gas_cost(&self) -> CurrencyResult<U256> {
        self.gas_price
            .checked_mul(self.gas_limit)
            .ok_or_else(|| CurrencyError::estimation_failed("gas cost overflows uint256"))
    }
}

/// 手续费报价明细
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeQuote {
    pub gas_price: U256,
    pub gas_limit: U256,
    /// wei
    pub gas_cost: U256,
    pub native_price: Decimal,
    pub token_price: Decimal,
    /// 代币最小单位
    pub fee: U256,
}

/// 查询当前 Gas 价格并估算 transfer 的 Gas 限制
///
/// 手续费估算和交易构建都走这条路径，每次调用都重新查询。
pub async fn estimate_gas_parameters(
    provider: &dyn ChainProvider,
    binding: &TokenBinding,
    recipient: Address,
    amount: U256,
) -> CurrencyResult<GasParameters> {
    let gas_price = provider.get_gas_price().await.map_err(|e| {
        tracing::warn!(error = ?e, "Gas price lookup failed");
        CurrencyError::estimation_failed(format!("gas price unavailable: {}", e))
    })?;

    let gas_limit = binding.estimate_transfer_gas(recipient, amount).await?;

    Ok(GasParameters {
        gas_price,
        gas_limit,
    })
}

fn checked(a: U512, b: U512) -> CurrencyResult<U512> {
    a.checked_mul(b)
        .ok_or_else(|| CurrencyError::estimation_failed("fee conversion overflow"))
}

/// 把 wei 计价的 Gas 成本换算为代币最小单位
pub fn convert_gas_cost(
    gas_cost: U256,
    native: &NativeGasPrice,
    token_price: Decimal,
    token_base: U256,
) -> CurrencyResult<U256> {
    let native_ratio = PriceRatio::from_decimal(native.fiat_price).ok_or_else(|| {
        CurrencyError::price_unavailable(format!("invalid gas currency price {}", native.fiat_price))
    })?;
    let token_ratio = PriceRatio::from_decimal(token_price).ok_or_else(|| {
        CurrencyError::price_unavailable(format!("invalid token price {}", token_price))
    })?;
    if native.base.is_zero() {
        return Err(CurrencyError::price_unavailable("gas currency base is zero"));
    }

    let numerator = checked(
        checked(
            checked(native_ratio.numerator, U512::from(gas_cost))?,
            U512::from(token_base),
        )?,
        token_ratio.denominator,
    )?;
    let denominator = checked(
        checked(native_ratio.denominator, U512::from(native.base))?,
        token_ratio.numerator,
    )?;

    U256::try_from(numerator / denominator)
        .map_err(|_| CurrencyError::estimation_failed("fee exceeds uint256"))
}

pub struct FeeEstimator {
    provider: Arc<dyn ChainProvider>,
}

impl FeeEstimator {
    pub fn new(provider: Arc<dyn ChainProvider>) -> Self {
        Self { provider }
    }

    /// 估算一次 transfer 的手续费（代币最小单位）
    pub async fn quote(
        &self,
        binding: &TokenBinding,
        gas_source: &dyn GasPriceSource,
        token_oracle: &dyn PriceOracle,
        ticker: &str,
        amount: U256,
        recipient: Address,
    ) -> CurrencyResult<FeeQuote> {
        let token = *binding.materialize().await?;

        tracing::debug!(
            ticker = %ticker,
            amount = %to_hex_quantity(amount),
            recipient = ?recipient,
            "Estimating transfer fee"
        );

        let gas = estimate_gas_parameters(self.provider.as_ref(), binding, recipient, amount).await?;
        let gas_cost = gas.gas_cost()?;

        let native = gas_source.native_gas_price().await?;

        let token_price = token_oracle.get_price(ticker).await.map_err(|e| {
            tracing::warn!(ticker = %ticker, error = ?e, "Token price lookup failed");
            CurrencyError::price_unavailable(format!("{} price: {}", ticker, e))
        })?;

        let fee = convert_gas_cost(gas_cost, &native, token_price, token.base)?;

        tracing::debug!(
            ticker = %ticker,
            gas_price = %gas.gas_price,
            gas_limit = %gas.gas_limit,
            native_price = %native.fiat_price,
            token_price = %token_price,
            fee = %fee,
            "Transfer fee estimated"
        );

        Ok(FeeQuote {
            gas_price: gas.gas_price,
            gas_limit: gas.gas_limit,
            gas_cost,
            native_price: native.fiat_price,
            token_price,
            fee,
        })
    }
}
