pub mod chain;
pub mod deposit;

pub use chain::{Block, CallRequest, Receipt, TransactionRecord};
pub use deposit::{DepositEvent, DepositKind, RelayAttempt, RelayOutcome, TokenRegistry};
