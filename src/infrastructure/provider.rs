//! 链节点访问接口
//!
//! 服务层只依赖 `ChainProvider` trait；生产实现基于 ethers-rs 的 HTTP Provider。
//! 超时由底层 HTTP 客户端负责，这里不做重试。

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use ethers::{
    providers::{Http, Middleware, Provider},
    types::{transaction::eip2718::TypedTransaction, Address, Bytes, Transaction, H256, U256, U64},
};

#[async_trait]
pub trait ChainProvider: Send + Sync {
    /// 按哈希查询交易，不存在时返回 None
    async fn get_transaction(&self, tx_hash: H256) -> Result<Option<Transaction>>;

    async fn get_block_number(&self) -> Result<U64>;

    async fn get_gas_price(&self) -> Result<U256>;

    async fn estimate_gas(&self, tx: &TypedTransaction) -> Result<U256>;

    /// eth_call，返回原始 ABI 编码结果
    async fn call(&self, tx: &TypedTransaction) -> Result<Bytes>;

    async fn get_transaction_count(&self, address: Address) -> Result<U256>;

    async fn get_chain_id(&self) -> Result<U256>;
}

/// 基于 ethers-rs 的 JSON-RPC 实现
#[derive(Clone)]
pub struct EthersChainProvider {
    inner: Arc<Provider<Http>>,
    url: String,
}

impl EthersChainProvider {
    /// 只解析 URL，不建立连接
    pub fn new(rpc_url: &str) -> Result<Self> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .with_context(|| format!("Failed to create Ethereum provider for {}", rpc_url))?;

        Ok(Self {
            inner: Arc::new(provider),
            url: rpc_url.to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ChainProvider for EthersChainProvider {
    async fn get_transaction(&self, tx_hash: H256) -> Result<Option<Transaction>> {
        self.inner
            .get_transaction(tx_hash)
            .await
            .with_context(|| format!("eth_getTransactionByHash failed for {:?}", tx_hash))
    }

    async fn get_block_number(&self) -> Result<U64> {
        self.inner
            .get_block_number()
            .await
            .context("eth_blockNumber failed")
    }

    async fn get_gas_price(&self) -> Result<U256> {
        self.inner
            .get_gas_price()
            .await
            .context("eth_gasPrice failed")
    }

    async fn estimate_gas(&self, tx: &TypedTransaction) -> Result<U256> {
        self.inner
            .estimate_gas(tx, None)
            .await
            .context("eth_estimateGas failed")
    }

    async fn call(&self, tx: &TypedTransaction) -> Result<Bytes> {
        self.inner.call(tx, None).await.context("eth_call failed")
    }

    async fn get_transaction_count(&self, address: Address) -> Result<U256> {
        self.inner
            .get_transaction_count(address, None)
            .await
            .with_context(|| format!("eth_getTransactionCount failed for {:?}", address))
    }

    async fn get_chain_id(&self) -> Result<U256> {
        self.inner.get_chainid().await.context("eth_chainId failed")
    }
}
