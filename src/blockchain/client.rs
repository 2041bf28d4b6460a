use std::time::Duration;

use alloy_primitives::{Address, Bytes, B256};
use async_trait::async_trait;

use crate::error::ChainError;
use crate::models::{Block, CallRequest, Receipt};

/// Call surface over the remote node. Implementations are stateless
/// pass-throughs: no caching, one remote call per operation (except
/// receipt waiting, which polls).
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Current chain height
    async fn current_height(&self) -> Result<u64, ChainError>;

    /// Block with full transaction bodies; `NotFound` past the tip
    async fn get_block(&self, number: u64) -> Result<Block, ChainError>;

    async fn account_nonce(&self, address: Address) -> Result<u64, ChainError>;

    async fn gas_price(&self) -> Result<u128, ChainError>;

    async fn estimate_gas(&self, call: &CallRequest) -> Result<u64, ChainError>;

    /// Submit a signed transaction; `Rejected` when the node refuses it
    async fn send_raw_transaction(&self, raw: Bytes) -> Result<B256, ChainError>;

    /// `Ok(None)` when no receipt shows up before `timeout`
    async fn wait_for_receipt(&self, tx_hash: B256, timeout: Duration) -> Result<Option<Receipt>, ChainError>;
}
