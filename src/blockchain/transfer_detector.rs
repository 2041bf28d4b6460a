use alloy_primitives::{Address, U256};

use crate::blockchain::calldata::{decode_transfer, has_transfer_selector};
use crate::config::RelayContext;
use crate::error::PayloadError;
use crate::logging::LogContext;
use crate::models::{Block, DepositEvent, DepositKind, TokenRegistry, TransactionRecord};

/// Decides whether a transaction deposits funds into the watched address.
/// Pure and infallible so it can run on every transaction of every block.
#[derive(Debug, Clone)]
pub struct TransferDetector {
    watched_address: Address,
    tokens: TokenRegistry,
}

impl TransferDetector {
    pub fn new(watched_address: Address, tokens: TokenRegistry) -> Self {
        Self { watched_address, tokens }
    }

    pub fn from_context(context: &RelayContext) -> Self {
        Self::new(context.watched_address, context.tokens.clone())
    }

    /// Native value sent to the watched address wins; otherwise a `transfer`
    /// on a registered token naming the watched address; otherwise nothing.
    pub fn classify(&self, tx: &TransactionRecord) -> Option<DepositEvent> {
        let recipient = tx.to?;

        if recipient == self.watched_address && tx.value > U256::ZERO {
            return Some(DepositEvent {
                kind: DepositKind::Native,
                amount: tx.value,
                transaction_hash: tx.hash,
                block_number: tx.block_number,
            });
        }

        let symbol = self.tokens.symbol_for(&recipient)?;
        if !has_transfer_selector(&tx.input) {
            return None;
        }

        let args = match decode_transfer(&tx.input) {
            Ok(args) => args,
            Err(PayloadError::Truncated { .. }) => return None,
            Err(e) => {
                LogContext::new("classifier", "decode_transfer")
                    .with_transaction_hash(&tx.hash.to_string())
                    .with_block_number(tx.block_number)
                    .debug(&format!("Ignoring {} transfer call: {}", symbol, e));
                return None;
            }
        };

        if args.recipient != self.watched_address {
            return None;
        }

        Some(DepositEvent {
            kind: DepositKind::Token {
                contract: recipient,
                symbol: symbol.to_string(),
            },
            amount: args.amount,
            transaction_hash: tx.hash,
            block_number: tx.block_number,
        })
    }

    /// All deposits in a block, in transaction order
    pub fn classify_block(&self, block: &Block) -> Vec<DepositEvent> {
        block.transactions.iter().filter_map(|tx| self.classify(tx)).collect()
    }
}
