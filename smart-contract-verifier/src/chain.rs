//! The `Chain` capability (§6.3): everything the orchestrator needs from an
//! RPC-backed blockchain, kept as a trait so the concrete multi-RPC-with-
//! fallback adapter lives outside this crate.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("all configured RPCs exhausted")]
    RpcExhausted,
    #[error("chain does not support trace_transaction")]
    TracingNotSupported,
    #[error("transaction {0} not found")]
    TxNotFound(String),
    #[error("rpc error: {0}")]
    Rpc(#[source] anyhow::Error),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub block_number: u64,
    pub from: String,
    pub to: Option<String>,
    pub data: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionReceipt {
    pub contract_address: Option<String>,
    pub transaction_index: u64,
    pub status: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreationData {
    pub creation_bytecode: Vec<u8>,
    pub receipt: TransactionReceipt,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    pub number: u64,
    pub transaction_hashes: Vec<String>,
}

/// A uniform bytecode/tx/trace fetch surface across chains and RPC variants.
/// Implementations canonicalize addresses to lowercase hex (§9 open question
/// (a)): a `contractAddress` differing only in checksum case is the same
/// address.
#[async_trait]
pub trait Chain: Send + Sync {
    async fn get_bytecode(
        &self,
        address: &str,
        block_number: Option<u64>,
    ) -> Result<Vec<u8>, ChainError>;

    async fn get_tx(&self, hash: &str) -> Result<Transaction, ChainError>;

    async fn get_tx_receipt(&self, hash: &str) -> Result<TransactionReceipt, ChainError>;

    /// If the receipt's `contractAddress` equals `address`, the creation
    /// bytecode is simply `tx.data`. Otherwise (factory deployment) this
    /// requires trace support: the innermost `create`/`create2` trace whose
    /// resulting address equals `address` supplies `trace.action.init`.
    async fn get_contract_creation_bytecode_and_receipt(
        &self,
        address: &str,
        tx_hash: &str,
        tx: Option<&Transaction>,
    ) -> Result<CreationData, ChainError>;

    async fn get_block_number(&self) -> Result<u64, ChainError>;

    async fn get_block(&self, number: u64, prefetch_txs: bool) -> Result<Block, ChainError>;
}

pub fn addresses_equal(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_case_does_not_affect_identity() {
        assert!(addresses_equal(
            "0x5B38Da6a701c568545dCfcB03FcB875f56beddC4",
            "0x5b38da6a701c568545dcfcb03fcb875f56beddc4",
        ));
    }

    #[test]
    fn different_addresses_are_not_equal() {
        assert!(!addresses_equal(
            "0x5B38Da6a701c568545dCfcB03FcB875f56beddC4",
            "0x0000000000000000000000000000000000dEaD",
        ));
    }
}
