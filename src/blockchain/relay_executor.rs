use std::sync::Arc;

use alloy::consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy::eips::eip2718::Encodable2718;
use alloy::signers::SignerSync;
use alloy_primitives::{Bytes, TxKind, U256};
use async_trait::async_trait;
use serde_json::json;

use crate::blockchain::calldata::RelayCall;
use crate::blockchain::client::ChainClient;
use crate::config::RelayContext;
use crate::error::{RelayFailure, RelayerError, SigningError};
use crate::logging::{LogContext, RelayLogger};
use crate::models::{CallRequest, DepositEvent, DepositKind, Receipt, RelayAttempt};
use crate::retry::RetryPolicy;

/// Forwards a detected deposit. Never fails outward: `None` means the
/// attempt budget ran out and the failure has been logged.
#[async_trait]
pub trait DepositRelay: Send + Sync {
    async fn relay(&self, event: &DepositEvent) -> Option<Receipt>;
}

/// Signs and submits `execTransaction` calls on the relay contract
pub struct RelayExecutor<C: ChainClient> {
    client: Arc<C>,
    context: Arc<RelayContext>,
    policy: RetryPolicy,
}

impl<C: ChainClient> RelayExecutor<C> {
    pub fn new(client: Arc<C>, context: Arc<RelayContext>) -> Self {
        let policy = RetryPolicy::new(context.max_attempts, context.retry_delay);
        Self { client, context, policy }
    }

    /// The relay-contract call that moves `event` to the destination
    pub fn build_call(&self, event: &DepositEvent) -> RelayCall {
        match &event.kind {
            DepositKind::Native => RelayCall::native(self.context.destination_address, event.amount),
            DepositKind::Token { contract, .. } => {
                RelayCall::token(*contract, self.context.destination_address, event.amount)
            }
        }
    }

    /// Legacy EIP-155 transaction to the relay contract, signed by the operator
    pub fn sign(&self, nonce: u64, gas_price: u128, gas_limit: u64, data: Bytes) -> Result<Bytes, SigningError> {
        let tx = TxLegacy {
            chain_id: Some(self.context.chain_id),
            nonce,
            gas_price,
            gas_limit,
            to: TxKind::Call(self.context.watched_address),
            value: U256::ZERO,
            input: data,
        };

        let signature = self.context.signer.sign_hash_sync(&tx.signature_hash())?;
        let envelope = TxEnvelope::from(tx.into_signed(signature));
        Ok(envelope.encoded_2718().into())
    }

    /// One pass of nonce -> gas -> estimate -> sign -> submit -> receipt
    async fn submit(&self, call: &RelayCall) -> Result<Receipt, RelayerError> {
        let operator = self.context.operator();
        let nonce = self.client.account_nonce(operator).await?;
        let gas_price = self.client.gas_price().await?;

        let data = call.encode();
        let request = CallRequest {
            from: operator,
            to: self.context.watched_address,
            data: data.clone(),
        };
        let gas_limit = self.client.estimate_gas(&request).await?;

        let raw = self.sign(nonce, gas_price, gas_limit, data)?;
        let tx_hash = self.client.send_raw_transaction(raw).await?;

        match self.client.wait_for_receipt(tx_hash, self.context.receipt_timeout).await? {
            Some(receipt) if receipt.succeeded() => Ok(receipt),
            Some(_) => Err(RelayFailure::Reverted { tx_hash }.into()),
            None => Err(RelayFailure::ReceiptTimeout {
                tx_hash,
                seconds: self.context.receipt_timeout.as_secs(),
            }
            .into()),
        }
    }

    async fn attempt(&self, call: &RelayCall, number: u32) -> Result<Receipt, RelayerError> {
        let mut record = RelayAttempt::new(call.to, call.value, call.data.clone(), number);
        let result = self.submit(call).await;

        match &result {
            Ok(_) => record.confirm(),
            Err(_) => record.fail(),
        }

        LogContext::new("relay", "attempt")
            .with_retry_count(record.attempt)
            .with_address(&record.destination.to_string())
            .with_amount(&record.value.to_string())
            .with_metadata("payload_len", json!(record.payload.len()))
            .with_metadata("outcome", json!(format!("{:?}", record.outcome)))
            .debug(&format!("Relay attempt {} finished", record.attempt));

        result
    }
}

#[async_trait]
impl<C: ChainClient> DepositRelay for RelayExecutor<C> {
    async fn relay(&self, event: &DepositEvent) -> Option<Receipt> {
        let call = self.build_call(event);
        let max_attempts = self.policy.max_attempts;

        let outcome = self
            .policy
            .execute(
                "relay_deposit",
                |number| self.attempt(&call, number),
                |error, number| RelayLogger::log_attempt_failure(event, number, max_attempts, error),
            )
            .await;

        match outcome.result {
            Ok(receipt) => {
                RelayLogger::log_relay_success(event, &receipt.transaction_hash.to_string(), outcome.attempts);
                Some(receipt)
            }
            Err(error) => {
                RelayLogger::log_terminal_failure(event, outcome.attempts, &error);
                None
            }
        }
    }
}
