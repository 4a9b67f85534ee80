//! 链上数量工具
//!
//! 所有链上数量（余额、Gas 价格、手续费）统一使用 U256 整数，
//! 法币价格使用 `Decimal`，中间结果扩展到 U512，全程不经过浮点数。

use ethers::{
    types::{U256, U512},
    utils::{format_units, parse_units},
};
use rust_decimal::Decimal;

use crate::error::{CurrencyError, CurrencyResult};

/// U256 能表示的最大 10 的幂次
pub const MAX_DECIMALS: u32 = 77;

/// 编码为合约调用使用的十六进制数量（`0x` 前缀，无前导零）
pub fn to_hex_quantity(value: U256) -> String {
    format!("0x{:x}", value)
}

/// 10^decimals
pub fn pow10(decimals: u32) -> CurrencyResult<U256> {
    if decimals > MAX_DECIMALS {
        return Err(CurrencyError::invalid_argument(format!(
            "decimals {} exceeds {}",
            decimals, MAX_DECIMALS
        )));
    }
    Ok(U256::exp10(decimals as usize))
}

/// 人类可读金额 -> 最小单位（例如 "1.5" + 6 位小数 -> 1500000）
pub fn to_base_units(amount: &str, decimals: u32) -> CurrencyResult<U256> {
    if amount.trim_start().starts_with('-') {
        return Err(CurrencyError::invalid_argument(format!("negative amount: {}", amount)));
    }
    let parsed = parse_units(amount.trim(), decimals)
        .map_err(|e| CurrencyError::invalid_argument(format!("invalid amount {}: {}", amount, e)))?;
    Ok(parsed.into())
}

/// 最小单位 -> 人类可读金额
pub fn from_base_units(amount: U256, decimals: u32) -> CurrencyResult<String> {
    format_units(amount, decimals)
        .map_err(|e| CurrencyError::invalid_argument(format!("cannot format {}: {}", amount, e)))
}

/// 正的十进制价格展开为 `numerator / denominator`
///
/// `Decimal` 内部是 96 位尾数加 0..=28 的小数位，两者都能无损放入 U512。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceRatio {
    pub numerator: U512,
    pub denominator: U512,
}

impl PriceRatio {
    /// 非正价格返回 `None`
    pub fn from_decimal(price: Decimal) -> Option<Self> {
        if price.is_sign_negative() || price.is_zero() {
            return None;
        }
        let mantissa = u128::try_from(price.mantissa()).ok()?;
        Some(Self {
            numerator: U512::from(mantissa),
            denominator: U512::exp10(price.scale() as usize),
        })
    }
}
