//! chain-currency - 链无关的币种抽象（ERC20 实现）
//!
//! 按交易ID查询并归一化代币转账、以代币单位估算手续费、构建待签名交易。
//! 本库不持有私钥，也不广播交易。

pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod service;

// 重新导出常用类型
pub use config::Config;
pub use error::{CurrencyError, CurrencyResult};

pub mod prelude {
    pub use crate::{
        config::Config,
        domain::{BaseUnit, CurrencyConfig, NormalizedTransfer, PreparedTransaction, UnsignedTransaction},
        error::{CurrencyError, CurrencyResult},
        infrastructure::{ChainProvider, EthersChainProvider},
        service::{Currency, CurrencyRegistry, Erc20Currency, GasPriceSource, PriceOracle},
    };
}
