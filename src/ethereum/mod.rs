pub mod abi;
pub mod bound;
pub mod codec;
pub mod contract;
pub mod provider;
pub mod utils;
pub mod watch;

use alloy::{
    network::ReceiptResponse,
    rpc::types::{Log, TransactionReceipt},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractInfo {
    pub name: String,
    pub address: Option<String>,
    pub abi: serde_json::Value,
    pub functions: Vec<FunctionSignature>,
    pub events: Vec<String>,
    pub deployable: bool,
    /// `Some(true)` when the address carries runtime code; `None` when no
    /// address is known or the node was not asked.
    pub has_code: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionSignature {
    pub signature: String,
    pub selector: String,
    pub state_mutability: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionInfo {
    pub hash: String,
    pub from: String,
    pub to: Option<String>,
    pub contract_address: Option<String>,
    pub gas_used: u64,
    pub effective_gas_price: String,
    pub block_number: Option<u64>,
    pub status: bool,
}

impl TransactionInfo {
    pub fn from_receipt(receipt: &TransactionReceipt) -> Self {
        Self {
            hash: format!("{:#x}", receipt.transaction_hash),
            from: receipt.from.to_checksum(None),
            to: receipt.to.map(|a| a.to_checksum(None)),
            contract_address: receipt.contract_address.map(|a| a.to_checksum(None)),
            gas_used: receipt.gas_used() as u64,
            effective_gas_price: receipt.effective_gas_price.to_string(),
            block_number: receipt.block_number,
            status: receipt.status(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventInfo {
    pub address: String,
    pub event: Option<String>,
    pub topics: Vec<String>,
    pub data: String,
    pub block_number: Option<u64>,
    pub transaction_hash: Option<String>,
    pub log_index: Option<u64>,
    pub decoded: Option<serde_json::Value>,
}

impl EventInfo {
    pub fn from_log(log: &Log, decoded: Option<codec::DecodedLog>) -> Self {
        let (event, decoded) = match decoded {
            Some(d) => (Some(d.event), Some(d.fields)),
            None => (None, None),
        };
        Self {
            address: log.address().to_checksum(None),
            event,
            topics: log.topics().iter().map(|t| format!("{:#x}", t)).collect(),
            data: log.data().data.to_string(),
            block_number: log.block_number,
            transaction_hash: log.transaction_hash.map(|h| format!("{:#x}", h)),
            log_index: log.log_index,
            decoded,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCall {
    pub function_name: String,
    pub parameters: serde_json::Value,
    pub from: Option<String>,
    pub gas_limit: Option<u64>,
    pub gas_price: Option<String>,
    pub value: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallResult {
    pub success: bool,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    pub gas_used: Option<u64>,
    pub transaction_hash: Option<String>,
}

impl CallResult {
    pub fn ok(result: serde_json::Value) -> Self {
        Self {
            success: true,
            result: Some(result),
            error: None,
            gas_used: None,
            transaction_hash: None,
        }
    }

    pub fn failed(error: String) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(error),
            gas_used: None,
            transaction_hash: None,
        }
    }
}
