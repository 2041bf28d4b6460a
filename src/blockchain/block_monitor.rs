use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;

use crate::blockchain::client::ChainClient;
use crate::blockchain::relay_executor::DepositRelay;
use crate::blockchain::transfer_detector::TransferDetector;
use crate::config::RelayContext;
use crate::error::RelayerError;
use crate::logging::{ErrorLogger, LogContext, RelayLogger};

/// Highest block number already fully processed. Only moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanCursor(u64);

impl ScanCursor {
    pub fn new(start: u64) -> Self {
        Self(start)
    }

    pub fn position(&self) -> u64 {
        self.0
    }

    /// First block not yet processed
    pub fn next_block(&self) -> u64 {
        self.0.saturating_add(1)
    }

    /// Move to `block` if it is ahead; returns whether the cursor moved
    pub fn advance_to(&mut self, block: u64) -> bool {
        if block > self.0 {
            self.0 = block;
            true
        } else {
            false
        }
    }
}

/// What one polling cycle did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub height: u64,
    /// Inclusive range actually scanned; `None` when nothing was new
    pub range: Option<(u64, u64)>,
    pub blocks_scanned: u64,
    pub deposits: u32,
    pub relayed: u32,
    pub failed: u32,
    pub cursor: u64,
}

/// The scan loop: pulls new blocks, classifies their transactions and
/// hands every deposit to the relay, one block at a time.
pub struct BlockMonitor<C: ChainClient, R: DepositRelay> {
    client: Arc<C>,
    detector: TransferDetector,
    relay: R,
    cursor: ScanCursor,
    window_blocks: u64,
    poll_interval: Duration,
}

impl<C: ChainClient, R: DepositRelay> BlockMonitor<C, R> {
    pub fn new(client: Arc<C>, relay: R, context: &RelayContext) -> Self {
        Self {
            client,
            detector: TransferDetector::from_context(context),
            relay,
            cursor: ScanCursor::new(context.start_block),
            window_blocks: context.window_blocks,
            poll_interval: context.poll_interval,
        }
    }

    pub fn cursor(&self) -> ScanCursor {
        self.cursor
    }

    /// Blocks to scan for a chain at `height`: the trailing window, minus
    /// anything at or below the cursor
    pub fn scan_range(&self, height: u64) -> Option<(u64, u64)> {
        let from = height.saturating_sub(self.window_blocks).max(self.cursor.next_block());
        if from > height {
            None
        } else {
            Some((from, height))
        }
    }

    /// One Idle -> Scanning -> Idle pass. Relay failures are counted, not
    /// returned; chain errors end the cycle early with the cursor left at
    /// the last completed block.
    pub async fn run_cycle(&mut self) -> Result<CycleReport, RelayerError> {
        let height = self.client.current_height().await?;
        let range = self.scan_range(height);

        let mut report = CycleReport {
            height,
            range,
            ..CycleReport::default()
        };

        let (first, last) = range.unwrap_or((self.cursor.next_block(), height));
        RelayLogger::log_cycle_start(height, first, last, self.cursor.position());

        if let Some((from, to)) = range {
            for number in from..=to {
                let block = self.client.get_block(number).await?;

                for event in self.detector.classify_block(&block) {
                    report.deposits += 1;
                    RelayLogger::log_deposit_detected(&event);

                    match self.relay.relay(&event).await {
                        Some(_) => report.relayed += 1,
                        None => report.failed += 1,
                    }
                }

                self.cursor.advance_to(number);
                report.blocks_scanned += 1;
            }
        }

        // Relay outcomes never hold the cursor back
        self.cursor.advance_to(height);
        report.cursor = self.cursor.position();

        RelayLogger::log_cycle_complete(
            report.blocks_scanned,
            report.deposits,
            report.relayed,
            report.failed,
            report.cursor,
        );

        Ok(report)
    }

    /// Run cycles forever, sleeping `poll_interval` after each one
    /// whether it succeeded or not.
    pub async fn run_forever(mut self) {
        LogContext::new("block_monitor", "start")
            .with_block_number(self.cursor.position())
            .with_metadata("window_blocks", serde_json::json!(self.window_blocks))
            .with_metadata("poll_interval_seconds", serde_json::json!(self.poll_interval.as_secs()))
            .info("Starting deposit scan loop");

        loop {
            if let Err(e) = self.run_cycle().await {
                ErrorLogger::log_error(
                    &e,
                    Some(LogContext::new("block_monitor", "run_cycle").with_block_number(self.cursor.position())),
                );
            }

            sleep(self.poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{parse_signer, AppConfig};
    use crate::error::ChainError;
    use crate::models::{Block, CallRequest, DepositEvent, Receipt, TransactionRecord};
    use alloy_primitives::{Address, Bytes, B256, U256};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    const WATCHED: &str = "0x3Ef50d6213F36eb88b994FA6C78277B328216d52";
    const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn context(window: u64, start_block: u64) -> RelayContext {
        let mut config = AppConfig::default();
        config.relay.watched_address = WATCHED.to_string();
        config.relay.destination_address = "0xdD3BA483352ab5E74e4C52681Fd53DB4376e5c13".to_string();
        config.scan.window_blocks = window;
        config.scan.start_block = start_block;
        RelayContext::new(&config, parse_signer(TEST_KEY).unwrap()).unwrap()
    }

    /// Chain whose tip and block contents are set by the test
    #[derive(Default)]
    struct ScriptedChain {
        height: Mutex<u64>,
        deposits_at: HashMap<u64, u64>,
        missing: Mutex<Vec<u64>>,
        fetched: Mutex<Vec<u64>>,
    }

    impl ScriptedChain {
        fn at_height(height: u64) -> Self {
            Self {
                height: Mutex::new(height),
                ..Self::default()
            }
        }

        fn set_height(&self, height: u64) {
            *self.height.lock().unwrap() = height;
        }

        fn fetched(&self) -> Vec<u64> {
            self.fetched.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChainClient for ScriptedChain {
        async fn current_height(&self) -> Result<u64, ChainError> {
            Ok(*self.height.lock().unwrap())
        }

        async fn get_block(&self, number: u64) -> Result<Block, ChainError> {
            if self.missing.lock().unwrap().contains(&number) {
                return Err(ChainError::NotFound { what: format!("block {}", number) });
            }
            self.fetched.lock().unwrap().push(number);

            let transactions = match self.deposits_at.get(&number) {
                Some(value) => vec![TransactionRecord {
                    hash: B256::with_last_byte(number as u8),
                    from: Address::repeat_byte(0x01),
                    to: Some(WATCHED.parse().unwrap()),
                    value: U256::from(*value),
                    input: Bytes::new(),
                    block_number: number,
                }],
                None => Vec::new(),
            };

            Ok(Block { number, hash: None, timestamp: 0, transactions })
        }

        async fn account_nonce(&self, _address: Address) -> Result<u64, ChainError> {
            Ok(0)
        }

        async fn gas_price(&self) -> Result<u128, ChainError> {
            Ok(1)
        }

        async fn estimate_gas(&self, _call: &CallRequest) -> Result<u64, ChainError> {
            Ok(21_000)
        }

        async fn send_raw_transaction(&self, _raw: Bytes) -> Result<B256, ChainError> {
            Err(ChainError::Transport("not used".to_string()))
        }

        async fn wait_for_receipt(&self, _tx_hash: B256, _timeout: Duration) -> Result<Option<Receipt>, ChainError> {
            Ok(None)
        }
    }

    /// Records deposits; succeeds unless told otherwise
    #[derive(Default)]
    struct RecordingRelay {
        fail: bool,
        seen: Mutex<Vec<DepositEvent>>,
    }

    #[async_trait]
    impl DepositRelay for RecordingRelay {
        async fn relay(&self, event: &DepositEvent) -> Option<Receipt> {
            self.seen.lock().unwrap().push(event.clone());
            if self.fail {
                return None;
            }
            Some(Receipt {
                transaction_hash: event.transaction_hash,
                block_number: Some(event.block_number),
                status: Some(1),
                gas_used: None,
            })
        }
    }

    #[test]
    fn test_cursor_never_moves_backwards() {
        let mut cursor = ScanCursor::new(10);
        assert!(!cursor.advance_to(5));
        assert!(!cursor.advance_to(10));
        assert_eq!(cursor.position(), 10);
        assert!(cursor.advance_to(11));
        assert_eq!(cursor.next_block(), 12);
    }

    #[test]
    fn test_scan_range() {
        let chain = Arc::new(ScriptedChain::default());
        let monitor = BlockMonitor::new(chain, RecordingRelay::default(), &context(100, 0));

        assert_eq!(monitor.scan_range(1_000), Some((900, 1_000)));
        // Near genesis the window clamps at zero, and block 0 is at the cursor
        assert_eq!(monitor.scan_range(40), Some((1, 40)));
        assert_eq!(monitor.scan_range(0), None);

        let monitor = BlockMonitor::new(Arc::new(ScriptedChain::default()), RecordingRelay::default(), &context(100, 995));
        assert_eq!(monitor.scan_range(1_000), Some((996, 1_000)));
        assert_eq!(monitor.scan_range(995), None);
    }

    #[tokio::test]
    async fn test_overlapping_windows_never_rescan() {
        let chain = Arc::new(ScriptedChain::at_height(110));
        let mut monitor = BlockMonitor::new(chain.clone(), RecordingRelay::default(), &context(10, 0));

        let first = monitor.run_cycle().await.unwrap();
        assert_eq!(first.range, Some((100, 110)));
        assert_eq!(first.cursor, 110);

        chain.set_height(114);
        let second = monitor.run_cycle().await.unwrap();
        assert_eq!(second.range, Some((111, 114)));
        assert_eq!(second.blocks_scanned, 4);

        let third = monitor.run_cycle().await.unwrap();
        assert_eq!(third.range, None);
        assert_eq!(third.cursor, 114);

        let fetched = chain.fetched();
        let mut deduped = fetched.clone();
        deduped.dedup();
        assert_eq!(fetched, deduped);
        assert_eq!(fetched, (100..=114).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_failed_relay_still_advances_cursor() {
        let mut chain = ScriptedChain::at_height(20);
        chain.deposits_at.insert(18, 7);
        let chain = Arc::new(chain);
        let relay = RecordingRelay { fail: true, ..RecordingRelay::default() };
        let mut monitor = BlockMonitor::new(chain.clone(), relay, &context(5, 0));

        let report = monitor.run_cycle().await.unwrap();
        assert_eq!(report.deposits, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.relayed, 0);
        assert_eq!(report.cursor, 20);

        // The deposit in block 18 is not picked up again
        let report = monitor.run_cycle().await.unwrap();
        assert_eq!(report.deposits, 0);
        assert_eq!(monitor.relay.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_block_keeps_completed_progress() {
        let chain = ScriptedChain::at_height(10);
        chain.missing.lock().unwrap().push(8);
        let chain = Arc::new(chain);
        let mut monitor = BlockMonitor::new(chain.clone(), RecordingRelay::default(), &context(5, 0));

        let result = monitor.run_cycle().await;
        assert!(matches!(result, Err(RelayerError::Chain(ChainError::NotFound { .. }))));
        assert_eq!(monitor.cursor().position(), 7);
        assert_eq!(chain.fetched(), vec![5, 6, 7]);

        // Once block 8 is served the next cycle picks up exactly there
        chain.missing.lock().unwrap().clear();
        let report = monitor.run_cycle().await.unwrap();
        assert_eq!(report.range, Some((8, 10)));
        assert_eq!(report.cursor, 10);
        assert_eq!(chain.fetched(), vec![5, 6, 7, 8, 9, 10]);
    }

    #[tokio::test]
    async fn test_deposits_relayed_in_block_order() {
        let mut chain = ScriptedChain::at_height(30);
        chain.deposits_at.insert(27, 1);
        chain.deposits_at.insert(29, 2);
        let chain = Arc::new(chain);
        let mut monitor = BlockMonitor::new(chain, RecordingRelay::default(), &context(5, 0));

        let report = monitor.run_cycle().await.unwrap();
        assert_eq!(report.relayed, 2);

        let seen = monitor.relay.seen.lock().unwrap();
        assert_eq!(seen[0].block_number, 27);
        assert_eq!(seen[1].amount, U256::from(2u64));
    }
}
