//! 测试辅助模块
//! 提供内存版链节点和价格预言机

#![allow(dead_code)]

use std::{
    collections::HashMap,
    str::FromStr,
    sync::{
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chain_currency::{
    domain::CurrencyConfig,
    infrastructure::ChainProvider,
    service::{price_service::PriceOracle, tx_decoder::encode_transfer_call, Erc20Currency},
};
use ethers::types::{
    transaction::eip2718::TypedTransaction, Address, Bytes, Transaction, H256, U256, U64,
};
use rust_decimal::Decimal;

pub const TOKEN_CONTRACT: &str = "0xa18bF3994C0Cc6E3b63ac420308E5383f53120D7";
pub const SENDER: &str = "0x00000000000000000000000000000000000000aa";
pub const RECIPIENT: &str = "0x0000000000000000000000000000000000000abc";

pub fn address(raw: &str) -> Address {
    Address::from_str(raw).expect("valid test address")
}

/// 内存版链节点，记录每类调用的次数
pub struct MockProvider {
    transactions: Mutex<HashMap<H256, Transaction>>,
    decimals: Mutex<Option<u8>>,
    pub gas_price: Mutex<U256>,
    pub gas_limit: Mutex<U256>,
    pub block_number: AtomicU64,
    pub nonce: AtomicU64,
    pub chain_id: AtomicU64,
    pub fail_transactions: AtomicBool,
    pub fail_gas_price: AtomicBool,
    pub fail_estimate: AtomicBool,
    pub decimals_calls: AtomicUsize,
    pub estimate_calls: AtomicUsize,
    pub nonce_calls: AtomicUsize,
    pub block_number_calls: AtomicUsize,
}

impl MockProvider {
    /// 18 位精度代币，Gas 价格 50 wei，Gas 限制 21000，Boba 链ID
    pub fn new() -> Self {
        Self {
            transactions: Mutex::new(HashMap::new()),
            decimals: Mutex::new(Some(18)),
            gas_price: Mutex::new(U256::from(50u64)),
            gas_limit: Mutex::new(U256::from(21_000u64)),
            block_number: AtomicU64::new(100),
            nonce: AtomicU64::new(0),
            chain_id: AtomicU64::new(288),
            fail_transactions: AtomicBool::new(false),
            fail_gas_price: AtomicBool::new(false),
            fail_estimate: AtomicBool::new(false),
            decimals_calls: AtomicUsize::new(0),
            estimate_calls: AtomicUsize::new(0),
            nonce_calls: AtomicUsize::new(0),
            block_number_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_decimals(self, decimals: Option<u8>) -> Self {
        *self.decimals.lock().unwrap() = decimals;
        self
    }

    pub fn set_decimals(&self, decimals: Option<u8>) {
        *self.decimals.lock().unwrap() = decimals;
    }

    pub fn insert_transaction(&self, tx: Transaction) {
        self.transactions.lock().unwrap().insert(tx.hash, tx);
    }
}

#[async_trait]
impl ChainProvider for MockProvider {
    async fn get_transaction(&self, tx_hash: H256) -> Result<Option<Transaction>> {
        if self.fail_transactions.load(Ordering::SeqCst) {
            return Err(anyhow!("connection refused"));
        }
        Ok(self.transactions.lock().unwrap().get(&tx_hash).cloned())
    }

    async fn get_block_number(&self) -> Result<U64> {
        self.block_number_calls.fetch_add(1, Ordering::SeqCst);
        Ok(U64::from(self.block_number.load(Ordering::SeqCst)))
    }

    async fn get_gas_price(&self) -> Result<U256> {
        if self.fail_gas_price.load(Ordering::SeqCst) {
            return Err(anyhow!("eth_gasPrice timed out"));
        }
        Ok(*self.gas_price.lock().unwrap())
    }

    async fn estimate_gas(&self, _tx: &TypedTransaction) -> Result<U256> {
        self.estimate_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_estimate.load(Ordering::SeqCst) {
            return Err(anyhow!("execution reverted"));
        }
        Ok(*self.gas_limit.lock().unwrap())
    }

    async fn call(&self, _tx: &TypedTransaction) -> Result<Bytes> {
        self.decimals_calls.fetch_add(1, Ordering::SeqCst);
        // 让并发的首次调用有机会交错
        tokio::task::yield_now().await;

        let decimals = *self.decimals.lock().unwrap();
        match decimals {
            Some(d) => {
                let mut word = [0u8; 32];
                word[31] = d;
                Ok(Bytes::from(word.to_vec()))
            }
            None => Err(anyhow!("contract not deployed")),
        }
    }

    async fn get_transaction_count(&self, _address: Address) -> Result<U256> {
        self.nonce_calls.fetch_add(1, Ordering::SeqCst);
        Ok(U256::from(self.nonce.load(Ordering::SeqCst)))
    }

    async fn get_chain_id(&self) -> Result<U256> {
        Ok(U256::from(self.chain_id.load(Ordering::SeqCst)))
    }
}

/// 按代码返回固定价格的预言机
pub struct MockOracle {
    prices: Mutex<HashMap<String, Decimal>>,
    pub fail: AtomicBool,
    pub calls: AtomicUsize,
}

impl MockOracle {
    pub fn new(prices: &[(&str, &str)]) -> Self {
        let prices = prices
            .iter()
            .map(|(symbol, price)| {
                (symbol.to_string(), Decimal::from_str(price).expect("valid test price"))
            })
            .collect();
        Self {
            prices: Mutex::new(prices),
            fail: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl PriceOracle for MockOracle {
    async fn get_price(&self, symbol: &str) -> Result<Decimal> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(anyhow!("oracle unreachable"));
        }
        self.prices
            .lock()
            .unwrap()
            .get(symbol)
            .copied()
            .ok_or_else(|| anyhow!("no price for {}", symbol))
    }
}

/// 已上链（或待打包）的 transfer 交易
pub fn transfer_transaction(
    hash: H256,
    recipient: Address,
    amount: U256,
    block_number: Option<u64>,
) -> Transaction {
    Transaction {
        hash,
        from: address(SENDER),
        to: Some(address(TOKEN_CONTRACT)),
        input: encode_transfer_call(recipient, amount),
        block_number: block_number.map(U64::from),
        ..Default::default()
    }
}

pub fn usdc_currency(provider: Arc<MockProvider>, oracle: Arc<MockOracle>) -> Erc20Currency {
    let config = CurrencyConfig::new("usdc", "USDC", "http://localhost:8545");
    Erc20Currency::new(
        config,
        address(TOKEN_CONTRACT),
        address(SENDER),
        provider,
        oracle,
    )
}
