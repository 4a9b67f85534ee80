pub mod logging;
pub mod provider;

pub use provider::{ChainProvider, EthersChainProvider};
