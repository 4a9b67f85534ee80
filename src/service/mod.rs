pub mod currency;
pub mod fee_estimator; // 手续费估算与换算
pub mod price_service;
pub mod registry; // 名称 -> 币种
pub mod token_contract;
pub mod transaction_builder;
pub mod tx_decoder; // transfer 调用数据解析

pub use currency::{Currency, Erc20Currency};
pub use fee_estimator::{
    FeeEstimator, FeeQuote, FixedGasPriceSource, GasPriceSource, NativeGasPrice,
    OracleGasPriceSource,
};
pub use price_service::{CachedPriceOracle, LiveCoinWatchClient, PriceOracle, RedstonePriceClient};
pub use registry::CurrencyRegistry;
pub use token_contract::{TokenBinding, TokenDecimals};
pub use transaction_builder::TransactionBuilder;
