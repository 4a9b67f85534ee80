//! 未签名交易构建器
//!
//! 组装 `transfer(recipient, amount)` 调用及网络参数（Gas 价格、Gas 限制、链ID、nonce），
//! 交给外部签名方。签名和广播不在这里完成，返回的交易ID始终为空。

use std::sync::Arc;

use ethers::types::{Address, U256};

use crate::{
    domain::{amount::to_hex_quantity, PreparedTransaction, UnsignedTransaction},
    error::{CurrencyError, CurrencyResult},
    infrastructure::ChainProvider,
    service::{fee_estimator::estimate_gas_parameters, token_contract::TokenBinding},
};

pub struct TransactionBuilder {
    provider: Arc<dyn ChainProvider>,
}

impl TransactionBuilder {
    pub fn new(provider: Arc<dyn ChainProvider>) -> Self {
        Self { provider }
    }

    /// 构建未签名的代币转账交易
    ///
    /// Gas 参数、链ID 和 nonce 每次都重新从链上读取；构建失败后重试会拿到新的 nonce，
    /// 不会复用旧值。
    pub async fn build_transfer(
        &self,
        binding: &TokenBinding,
        amount: U256,
        recipient: Address,
    ) -> CurrencyResult<PreparedTransaction> {
        binding.materialize().await?;

        let data = binding.encode_transfer(recipient, amount);
        let gas = estimate_gas_parameters(self.provider.as_ref(), binding, recipient, amount).await?;

        let chain_id = self.provider.get_chain_id().await.map_err(|e| {
            tracing::warn!(error = ?e, "Chain id lookup failed");
            CurrencyError::provider(format!("chain id unavailable: {}", e))
        })?;
        if chain_id.bits() > 64 {
            return Err(CurrencyError::provider(format!(
                "chain id {} does not fit in u64",
                chain_id
            )));
        }

        let nonce = self
            .provider
            .get_transaction_count(binding.sender())
            .await
            .map_err(|e| {
                tracing::warn!(sender = ?binding.sender(), error = ?e, "Nonce lookup failed");
                CurrencyError::provider(format!("nonce unavailable: {}", e))
            })?;

        let tx = UnsignedTransaction {
            from: binding.sender(),
            to: binding.contract_address(),
            recipient,
            data,
            gas_price: gas.gas_price,
            gas_limit: gas.gas_limit,
            chain_id: chain_id.as_u64(),
            nonce,
        };

        tracing::info!(
            contract = ?tx.to,
            recipient = ?recipient,
            amount = %to_hex_quantity(amount),
            chain_id = tx.chain_id,
            nonce = %tx.nonce,
            gas_price = %tx.gas_price,
            gas_limit = %tx.gas_limit,
            "Built unsigned ERC20 transfer"
        );

        Ok(PreparedTransaction::unsigned(tx))
    }
}
