//! 未签名交易构建的集成测试

mod common;

use std::sync::{atomic::Ordering, Arc};

use chain_currency::{
    service::{tx_decoder::decode_transfer_call, Currency},
    CurrencyError,
};
use common::{address, usdc_currency, MockOracle, MockProvider, RECIPIENT, SENDER, TOKEN_CONTRACT};
use ethers::types::U256;

fn oracle() -> Arc<MockOracle> {
    Arc::new(MockOracle::new(&[("ETH", "2000"), ("USDC", "1")]))
}

#[tokio::test]
async fn test_create_tx_fields() {
    let provider = Arc::new(MockProvider::new());
    provider.nonce.store(7, Ordering::SeqCst);
    let currency = usdc_currency(provider, oracle());

    let prepared = currency
        .create_tx(U256::from(1_000u64), address(RECIPIENT))
        .await
        .unwrap();

    assert!(prepared.tx_id.is_none());
    let tx = &prepared.tx;
    assert_eq!(tx.from, address(SENDER));
    assert_eq!(tx.to, address(TOKEN_CONTRACT));
    assert_eq!(tx.recipient, address(RECIPIENT));
    assert_eq!(tx.gas_price, U256::from(50u64));
    assert_eq!(tx.gas_limit, U256::from(21_000u64));
    assert_eq!(tx.chain_id, 288);
    assert_eq!(tx.nonce, U256::from(7u64));

    let call = decode_transfer_call(&tx.data).unwrap();
    assert_eq!(call.recipient, address(RECIPIENT));
    assert_eq!(call.amount, U256::from(1_000u64));

    assert!(!tx.signing_payload().is_empty());
}

#[tokio::test]
async fn test_create_tx_fetches_fresh_nonce() {
    let provider = Arc::new(MockProvider::new());
    let currency = usdc_currency(provider.clone(), oracle());

    provider.nonce.store(3, Ordering::SeqCst);
    let first = currency.create_tx(U256::one(), address(RECIPIENT)).await.unwrap();

    provider.nonce.store(4, Ordering::SeqCst);
    *provider.gas_price.lock().unwrap() = U256::from(60u64);
    let second = currency.create_tx(U256::one(), address(RECIPIENT)).await.unwrap();

    assert_eq!(first.tx.nonce, U256::from(3u64));
    assert_eq!(second.tx.nonce, U256::from(4u64));
    assert_eq!(second.tx.gas_price, U256::from(60u64));
    assert_eq!(provider.nonce_calls.load(Ordering::SeqCst), 2);
    assert_eq!(provider.estimate_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_create_tx_does_not_need_prices() {
    let provider = Arc::new(MockProvider::new());
    let oracle = oracle();
    oracle.fail.store(true, Ordering::SeqCst);
    let currency = usdc_currency(provider, oracle.clone());

    currency.create_tx(U256::one(), address(RECIPIENT)).await.unwrap();
    assert_eq!(oracle.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_create_tx_estimation_failure() {
    let provider = Arc::new(MockProvider::new());
    provider.fail_estimate.store(true, Ordering::SeqCst);
    let currency = usdc_currency(provider.clone(), oracle());

    let err = currency
        .create_tx(U256::one(), address(RECIPIENT))
        .await
        .unwrap_err();
    assert!(matches!(err, CurrencyError::EstimationFailed(_)));
    assert_eq!(provider.nonce_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_create_tx_requires_contract() {
    let provider = Arc::new(MockProvider::new().with_decimals(None));
    let currency = usdc_currency(provider, oracle());

    let err = currency
        .create_tx(U256::one(), address(RECIPIENT))
        .await
        .unwrap_err();
    assert!(matches!(err, CurrencyError::ContractUnavailable(_)));
}
