//! 归一化的转账记录与未签名交易

use ethers::types::{
    transaction::eip2718::TypedTransaction, Address, Bytes, TransactionRequest, H256, U256, U64,
};
use serde::{Deserialize, Serialize};

/// 归一化的转账记录
///
/// 每次查询新建，构造后不再修改。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedTransfer {
    pub from: Address,
    pub to: Address,
    /// 所在区块高度，pending 时为 None
    pub block_height: Option<U256>,
    pub amount: U256,
    pub pending: bool,
    pub confirmed: bool,
}

impl NormalizedTransfer {
    /// pending 的交易永远不会被标记为 confirmed，即使 min_confirmations 为 0
    pub fn new(
        from: Address,
        to: Address,
        block_height: Option<U256>,
        amount: U256,
        confirmations: u64,
        min_confirmations: u64,
    ) -> Self {
        let pending = block_height.is_none();
        Self {
            from,
            to,
            block_height,
            amount,
            pending,
            confirmed: !pending && confirmations >= min_confirmations,
        }
    }
}

/// 待外部签名的未签名交易
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedTransaction {
    /// 发送方（钱包地址）
    pub from: Address,
    /// 交易目标：代币合约地址
    pub to: Address,
    /// 代币接收方（编码在 data 中）
    pub recipient: Address,
    /// transfer 调用数据
    pub data: Bytes,
    pub gas_price: U256,
    pub gas_limit: U256,
    pub chain_id: u64,
    pub nonce: U256,
}

impl UnsignedTransaction {
    /// 转换为 ethers 的 legacy 交易（EIP-155）
    pub fn to_typed_transaction(&self) -> TypedTransaction {
        TransactionRequest::new()
            .from(self.from)
            .to(self.to)
            .data(self.data.clone())
            .gas(self.gas_limit)
            .gas_price(self.gas_price)
            .nonce(self.nonce)
            .chain_id(U64::from(self.chain_id))
            .into()
    }

    /// 交给签名方的 RLP 编码载荷
    pub fn signing_payload(&self) -> Bytes {
        self.to_typed_transaction().rlp()
    }
}

/// 构建结果：交易ID在签名并广播之前保持为空
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreparedTransaction {
    pub tx_id: Option<H256>,
    pub tx: UnsignedTransaction,
}

impl PreparedTransaction {
    pub fn unsigned(tx: UnsignedTransaction) -> Self {
        Self { tx_id: None, tx }
    }
}
