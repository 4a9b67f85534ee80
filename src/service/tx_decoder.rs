//! ERC20 transfer 调用数据解码
//!
//! 只支持 `transfer(address,uint256)` 这一种定长布局，不做通用 ABI 解码。
//! 68 字节的调用数据布局（括号内为带 `0x` 前缀的十六进制字符偏移）：
//!
//! | 字节      | 字符       | 内容                     |
//! |-----------|------------|--------------------------|
//! | `0..4`    | `2..10`    | 函数选择器 `a9059cbb`    |
//! | `4..16`   | `10..34`   | 地址左侧填充（不校验）   |
//! | `16..36`  | `34..74`   | 接收方地址               |
//! | `36..68`  | `74..138`  | 金额（uint256，大端）    |
//!
//! 长度或选择器不符的调用数据一律以 `NotATransfer` 拒绝，包括同一合约上的
//! 其他方法（`transferFrom`、`approve` 等）以及带额外参数的调用。

use std::{ops::Range, str::FromStr};

use ethers::{
    abi::{encode, Token},
    types::{Address, Bytes, Transaction, H256, U256, U64},
};

use crate::{
    domain::NormalizedTransfer,
    error::{CurrencyError, CurrencyResult},
    infrastructure::ChainProvider,
};

/// `transfer(address,uint256)` 的函数选择器
pub const TRANSFER_SELECTOR: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];

/// 选择器 + 两个 32 字节参数
pub const TRANSFER_CALL_LEN: usize = 68;

/// 带 `0x` 前缀的十六进制长度
pub const TRANSFER_CALL_HEX_LEN: usize = 2 + TRANSFER_CALL_LEN * 2;

const SELECTOR: Range<usize> = 0..4;
const RECIPIENT: Range<usize> = 16..36;
const AMOUNT: Range<usize> = 36..68;

/// 解码出的 transfer 参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferCall {
    pub recipient: Address,
    pub amount: U256,
}

/// 编码 `transfer(recipient, amount)` 调用数据
pub fn encode_transfer_call(recipient: Address, amount: U256) -> Bytes {
    let mut out = Vec::with_capacity(TRANSFER_CALL_LEN);
    out.extend_from_slice(&TRANSFER_SELECTOR);
    out.extend_from_slice(&encode(&[Token::Address(recipient), Token::Uint(amount)]));
    Bytes::from(out)
}

/// 按固定布局解码原始调用数据
pub fn decode_transfer_call(data: &[u8]) -> CurrencyResult<TransferCall> {
    if data.len() != TRANSFER_CALL_LEN {
        return Err(CurrencyError::not_a_transfer(format!(
            "call data is {} bytes, expected {}",
            data.len(),
            TRANSFER_CALL_LEN
        )));
    }

    if data[SELECTOR] != TRANSFER_SELECTOR {
        return Err(CurrencyError::not_a_transfer(format!(
            "selector 0x{} is not transfer(address,uint256)",
            hex::encode(&data[SELECTOR])
        )));
    }

    Ok(TransferCall {
        recipient: Address::from_slice(&data[RECIPIENT]),
        amount: U256::from_big_endian(&data[AMOUNT]),
    })
}

/// 解码 `0x` 前缀的十六进制调用数据（节点返回的 `input` 字段格式）
pub fn decode_transfer_hex(data: &str) -> CurrencyResult<TransferCall> {
    if data.len() != TRANSFER_CALL_HEX_LEN {
        return Err(CurrencyError::not_a_transfer(format!(
            "call data is {} characters, expected {}",
            data.len(),
            TRANSFER_CALL_HEX_LEN
        )));
    }

    let body = data
        .strip_prefix("0x")
        .ok_or_else(|| CurrencyError::not_a_transfer("call data must start with 0x"))?;

    let bytes = hex::decode(body)
        .map_err(|e| CurrencyError::not_a_transfer(format!("call data is not hex: {}", e)))?;

    decode_transfer_call(&bytes)
}

pub fn parse_tx_id(tx_id: &str) -> CurrencyResult<H256> {
    H256::from_str(tx_id.trim())
        .map_err(|e| CurrencyError::invalid_argument(format!("invalid transaction id {}: {}", tx_id, e)))
}

/// 已挖出交易的确认数：`latest - block + 1`；节点落后时为 0
pub fn confirmations(block_number: U64, latest_block: U64) -> u64 {
    if latest_block < block_number {
        0
    } else {
        (latest_block - block_number).as_u64().saturating_add(1)
    }
}

/// 将链上交易归一化为转账记录
///
/// `latest_block` 仅在交易已上链时需要。
pub fn normalize_transaction(
    tx: &Transaction,
    latest_block: Option<U64>,
    min_confirmations: u64,
) -> CurrencyResult<NormalizedTransfer> {
    let call = decode_transfer_call(&tx.input)?;

    let confirmation_count = match (tx.block_number, latest_block) {
        (Some(block), Some(latest)) => confirmations(block, latest),
        _ => 0,
    };

    Ok(NormalizedTransfer::new(
        tx.from,
        call.recipient,
        tx.block_number.map(|b| U256::from(b.as_u64())),
        call.amount,
        confirmation_count,
        min_confirmations,
    ))
}

/// 按交易ID查询并解码转账
pub async fn decode_transfer(
    provider: &dyn ChainProvider,
    tx_id: &str,
    min_confirmations: u64,
) -> CurrencyResult<NormalizedTransfer> {
    let hash = parse_tx_id(tx_id)?;

    let tx = provider
        .get_transaction(hash)
        .await
        .map_err(|e| {
            tracing::warn!(tx_id = %tx_id, error = ?e, "Transaction lookup failed");
            CurrencyError::provider(format!("transaction lookup failed: {}", e))
        })?
        .ok_or_else(|| CurrencyError::not_found(tx_id.to_string()))?;

    // 先校验调用数据，非 transfer 交易不再查询区块高度
    decode_transfer_call(&tx.input)?;

    let latest_block = match tx.block_number {
        Some(_) => Some(provider.get_block_number().await.map_err(|e| {
            CurrencyError::provider(format!("block number lookup failed: {}", e))
        })?),
        None => None,
    };

    let transfer = normalize_transaction(&tx, latest_block, min_confirmations)?;

    tracing::debug!(
        tx_id = %tx_id,
        from = ?transfer.from,
        to = ?transfer.to,
        amount = %transfer.amount,
        pending = transfer.pending,
        confirmed = transfer.confirmed,
        "Decoded ERC20 transfer"
    );

    Ok(transfer)
}
