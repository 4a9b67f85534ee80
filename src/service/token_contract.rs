//! 代币合约绑定
//!
//! 绑定到已部署的 ERC20 合约：查询 `decimals()`、编码 `transfer` 调用、
//! 估算 `transfer` 的 Gas。decimals 只在首次使用时查询一次。

use std::sync::Arc;

use ethers::types::{
    transaction::eip2718::TypedTransaction, Address, Bytes, TransactionRequest, U256,
};
use tokio::sync::OnceCell;

use crate::{
    domain::amount::{pow10, to_hex_quantity, MAX_DECIMALS},
    error::{CurrencyError, CurrencyResult},
    infrastructure::ChainProvider,
    service::tx_decoder::encode_transfer_call,
};

/// `decimals()` 的函数选择器
pub const DECIMALS_SELECTOR: [u8; 4] = [0x31, 0x3c, 0xe5, 0x67];

/// 已解析的代币精度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenDecimals {
    pub decimals: u32,
    /// 10^decimals
    pub base: U256,
}

pub struct TokenBinding {
    contract_address: Address,
    sender: Address,
    provider: Arc<dyn ChainProvider>,
    decimals: OnceCell<TokenDecimals>,
}

impl TokenBinding {
    pub fn new(contract_address: Address, sender: Address, provider: Arc<dyn ChainProvider>) -> Self {
        Self {
            contract_address,
            sender,
            provider,
            decimals: OnceCell::new(),
        }
    }

    pub fn contract_address(&self) -> Address {
        self.contract_address
    }

    pub fn sender(&self) -> Address {
        self.sender
    }

    pub fn is_materialized(&self) -> bool {
        self.decimals.initialized()
    }

    /// 返回已解析的精度，首次调用时查询链上 `decimals()`
    ///
    /// 并发的首次调用只会发出一次查询；查询失败不缓存任何状态。
    pub async fn materialize(&self) -> CurrencyResult<&TokenDecimals> {
        self.decimals
            .get_or_try_init(|| self.fetch_decimals())
            .await
    }

    async fn fetch_decimals(&self) -> CurrencyResult<TokenDecimals> {
        let call: TypedTransaction = TransactionRequest::new()
            .to(self.contract_address)
            .data(Bytes::from(DECIMALS_SELECTOR.to_vec()))
            .into();

        let raw = self.provider.call(&call).await.map_err(|e| {
            tracing::warn!(
                contract = ?self.contract_address,
                error = ?e,
                "Failed to query token decimals"
            );
            CurrencyError::contract_unavailable(format!(
                "decimals() failed for {:?}: {}",
                self.contract_address, e
            ))
        })?;

        let resolved = parse_decimals_word(&raw)?;

        tracing::debug!(
            contract = ?self.contract_address,
            decimals = resolved.decimals,
            "Resolved token decimals"
        );

        Ok(resolved)
    }

    pub fn encode_transfer(&self, recipient: Address, amount: U256) -> Bytes {
        encode_transfer_call(recipient, amount)
    }

    /// 从发送方到合约的 transfer 调用（未填充 Gas、nonce 等网络参数）
    pub fn transfer_request(&self, recipient: Address, amount: U256) -> TypedTransaction {
        TransactionRequest::new()
            .from(self.sender)
            .to(self.contract_address)
            .data(self.encode_transfer(recipient, amount))
            .into()
    }

    /// 估算 `transfer(recipient, amount)` 所需 Gas
    pub async fn estimate_transfer_gas(
        &self,
        recipient: Address,
        amount: U256,
    ) -> CurrencyResult<U256> {
        let request = self.transfer_request(recipient, amount);

        self.provider.estimate_gas(&request).await.map_err(|e| {
            tracing::warn!(
                contract = ?self.contract_address,
                recipient = ?recipient,
                amount = %to_hex_quantity(amount),
                error = ?e,
                "Transfer gas estimation failed"
            );
            CurrencyError::estimation_failed(format!("transfer gas estimate failed: {}", e))
        })
    }
}

/// 解析 `decimals()` 的 ABI 返回值（一个 32 字节字）
pub fn parse_decimals_word(raw: &[u8]) -> CurrencyResult<TokenDecimals> {
    if raw.len() < 32 {
        return Err(CurrencyError::contract_unavailable(format!(
            "decimals() returned {} bytes, expected 32",
            raw.len()
        )));
    }

    let value = U256::from_big_endian(&raw[..32]);
    if value > U256::from(MAX_DECIMALS) {
        return Err(CurrencyError::contract_unavailable(format!(
            "decimals() returned out-of-range value {}",
            value
        )));
    }

    let decimals = value.as_u32();
    Ok(TokenDecimals {
        decimals,
        base: pow10(decimals)?,
    })
}

#[cfg(test)]
mod tests {
    use ethers::utils::keccak256;

    use super::*;

    fn word(value: u64) -> Vec<u8> {
        let mut out = [0u8; 32];
        U256::from(value).to_big_endian(&mut out);
        out.to_vec()
    }

    #[test]
    fn test_decimals_selector() {
        let hash = keccak256("decimals()".as_bytes());
        assert_eq!(&hash[..4], &DECIMALS_SELECTOR);
    }

    #[test]
    fn test_parse_decimals_word() {
        let parsed = parse_decimals_word(&word(6)).unwrap();
        assert_eq!(parsed.decimals, 6);
        assert_eq!(parsed.base, U256::from(1_000_000u64));

        let parsed = parse_decimals_word(&word(18)).unwrap();
        assert_eq!(parsed.base, U256::exp10(18));
    }

    #[test]
    fn test_parse_decimals_rejects_bad_words() {
        assert!(matches!(
            parse_decimals_word(&[]),
            Err(CurrencyError::ContractUnavailable(_))
        ));
        assert!(matches!(
            parse_decimals_word(&word(78)),
            Err(CurrencyError::ContractUnavailable(_))
        ));
    }
}
