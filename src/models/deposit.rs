use std::collections::{BTreeMap, HashMap};
use std::fmt;

use alloy_primitives::{Address, Bytes, B256, U256};

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DepositKind {
    /// Base-currency value sent straight to the watched address
    Native,
    /// `transfer` call on a registered token naming the watched address
    Token { contract: Address, symbol: String },
}

impl DepositKind {
    pub fn label(&self) -> &str {
        match self {
            DepositKind::Native => "native",
            DepositKind::Token { .. } => "token",
        }
    }
}

/// A relevant deposit, consumed immediately by the relay executor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositEvent {
    pub kind: DepositKind,
    pub amount: U256,
    pub transaction_hash: B256,
    pub block_number: u64,
}

impl DepositEvent {
    pub fn token(&self) -> Option<Address> {
        match &self.kind {
            DepositKind::Native => None,
            DepositKind::Token { contract, .. } => Some(*contract),
        }
    }
}

impl fmt::Display for DepositEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            DepositKind::Native => write!(f, "{} wei native", self.amount),
            DepositKind::Token { symbol, contract } => {
                write!(f, "{} {} ({})", self.amount, symbol, contract)
            }
        }
    }
}

/// Symbol <-> contract mapping for recognised fungible tokens
#[derive(Debug, Clone, Default)]
pub struct TokenRegistry {
    by_address: HashMap<Address, String>,
}

impl TokenRegistry {
    /// Build from the `[tokens]` config table. Addresses compare byte-wise,
    /// so the hex case used in the config is irrelevant.
    pub fn from_symbols(tokens: &BTreeMap<String, String>) -> Result<Self, ConfigError> {
        let mut by_address = HashMap::with_capacity(tokens.len());
        for (symbol, raw) in tokens {
            let address: Address = raw.trim().parse().map_err(|_| ConfigError::InvalidAddress {
                key: format!("tokens.{}", symbol),
                value: raw.clone(),
            })?;
            by_address.insert(address, symbol.clone());
        }
        Ok(Self { by_address })
    }

    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, Address)>,
        S: Into<String>,
    {
        Self {
            by_address: pairs.into_iter().map(|(s, a)| (a, s.into())).collect(),
        }
    }

    pub fn symbol_for(&self, address: &Address) -> Option<&str> {
        self.by_address.get(address).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_address.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_address.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    Pending,
    Confirmed,
    Failed,
}

/// One signed submission of a relay call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayAttempt {
    pub destination: Address,
    pub value: U256,
    pub payload: Bytes,
    pub attempt: u32,
    pub outcome: RelayOutcome,
}

impl RelayAttempt {
    pub fn new(destination: Address, value: U256, payload: Bytes, attempt: u32) -> Self {
        Self {
            destination,
            value,
            payload,
            attempt,
            outcome: RelayOutcome::Pending,
        }
    }

    pub fn confirm(&mut self) {
        self.outcome = RelayOutcome::Confirmed;
    }

    pub fn fail(&mut self) {
        self.outcome = RelayOutcome::Failed;
    }
}
