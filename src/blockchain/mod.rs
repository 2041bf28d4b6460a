pub mod block_monitor;
pub mod calldata;
pub mod client;
pub mod relay_executor;
pub mod rpc_client;
pub mod transfer_detector;

pub use block_monitor::{BlockMonitor, CycleReport, ScanCursor};
pub use calldata::{RelayCall, TransferArgs};
pub use client::ChainClient;
pub use relay_executor::{DepositRelay, RelayExecutor};
pub use rpc_client::RpcClient;
pub use transfer_detector::TransferDetector;
