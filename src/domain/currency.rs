//! 币种描述
//!
//! 在注册表构造时创建，之后只读。

use ethers::types::U256;
use serde::{Deserialize, Serialize};

/// 默认确认数
pub const DEFAULT_MIN_CONFIRMATIONS: u64 = 5;

/// 基础单位：单位名称 + 每个整单位包含的最小单位数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseUnit {
    /// 最小单位名称 (wei, lamports, ...)
    pub unit: String,
    /// 每个整单位的最小单位数 (例如 10^18)
    pub subunits: U256,
}

impl BaseUnit {
    pub fn new(unit: impl Into<String>, subunits: U256) -> Self {
        Self {
            unit: unit.into(),
            subunits,
        }
    }

    /// EVM 原生币：wei，10^18
    pub fn wei() -> Self {
        Self::new("wei", U256::exp10(18))
    }
}

impl Default for BaseUnit {
    fn default() -> Self {
        Self::wei()
    }
}

/// 币种配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrencyConfig {
    /// 规范名称 (boba, ethereum, ...)
    pub name: String,
    /// 行情代码 (BOBA, ETH, ...)
    pub ticker: String,
    /// 链节点 RPC 地址
    pub provider_url: String,
    /// 视为已确认所需的最少确认数
    pub min_confirmations: u64,
    /// 原生基础单位；代币的实际基础单位由链上 decimals 决定
    pub base: BaseUnit,
}

impl CurrencyConfig {
    pub fn new(
        name: impl Into<String>,
        ticker: impl Into<String>,
        provider_url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            ticker: ticker.into(),
            provider_url: provider_url.into(),
            min_confirmations: DEFAULT_MIN_CONFIRMATIONS,
            base: BaseUnit::default(),
        }
    }

    pub fn with_min_confirmations(mut self, min_confirmations: u64) -> Self {
        self.min_confirmations = min_confirmations;
        self
    }
}
