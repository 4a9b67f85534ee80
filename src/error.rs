//! 币种核心错误类型
//!
//! 每种失败路径对应一个可区分的错误种类，调用方可据此决定是否重试。

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CurrencyError {
    /// 交易ID在链上无法解析
    #[error("transaction not found: {0}")]
    NotFound(String),

    /// 调用数据不是标准的 ERC20 transfer
    #[error("transaction is not an ERC20 transfer: {0}")]
    NotATransfer(String),

    /// 合约元数据（decimals）不可用
    #[error("token contract unavailable: {0}")]
    ContractUnavailable(String),

    /// 价格预言机调用失败或未返回汇率
    #[error("price unavailable: {0}")]
    PriceUnavailable(String),

    /// Gas 价格或 Gas 限制无法获取
    #[error("gas estimation failed: {0}")]
    EstimationFailed(String),

    /// 参数格式错误（交易ID、地址、金额）
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// 链节点传输失败（交易查询、链ID、nonce）
    #[error("provider error: {0}")]
    Provider(String),

    /// 注册表中不存在的币种
    #[error("unknown/unsupported currency: {0}")]
    UnsupportedCurrency(String),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type CurrencyResult<T> = Result<T, CurrencyError>;

impl CurrencyError {
    /// 稳定的错误码，便于日志和上层映射
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::NotATransfer(_) => "not_a_transfer",
            Self::ContractUnavailable(_) => "contract_unavailable",
            Self::PriceUnavailable(_) => "price_unavailable",
            Self::EstimationFailed(_) => "estimation_failed",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::Provider(_) => "provider_error",
            Self::UnsupportedCurrency(_) => "unsupported_currency",
            Self::Config(_) => "config_error",
        }
    }

    /// 是否属于瞬时故障（网络、预言机），调用方可以重试
    ///
    /// `NotATransfer` 是对交易的永久分类，重试没有意义。
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ContractUnavailable(_)
                | Self::PriceUnavailable(_)
                | Self::EstimationFailed(_)
                | Self::Provider(_)
        )
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn not_a_transfer(msg: impl Into<String>) -> Self {
        Self::NotATransfer(msg.into())
    }

    pub fn contract_unavailable(msg: impl Into<String>) -> Self {
        Self::ContractUnavailable(msg.into())
    }

    pub fn price_unavailable(msg: impl Into<String>) -> Self {
        Self::PriceUnavailable(msg.into())
    }

    pub fn estimation_failed(msg: impl Into<String>) -> Self {
        Self::EstimationFailed(msg.into())
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn provider(msg: impl Into<String>) -> Self {
        Self::Provider(msg.into())
    }
}
