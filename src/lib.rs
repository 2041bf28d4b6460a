pub mod blockchain;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod retry;

pub use blockchain::{BlockMonitor, ChainClient, DepositRelay, RelayExecutor, RpcClient, TransferDetector};
pub use config::{AppConfig, LoggingConfig, RelayConfig, RelayContext, RpcConfig, ScanConfig};
pub use error::{RelayerError, Result};
pub use logging::{ErrorLogger, LogContext, RelayLogger};
pub use retry::{RetryOutcome, RetryPolicy};
