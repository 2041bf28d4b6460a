use log::{debug, error, info, trace, warn};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::LoggingConfig;
use crate::error::{ErrorSeverity, RelayerError};
use crate::models::DepositEvent;

/// Structured logging context for the relayer
pub struct LogContext {
    pub component: String,
    pub operation: String,
    pub metadata: HashMap<String, Value>,
}

impl LogContext {
    pub fn new(component: &str, operation: &str) -> Self {
        Self {
            component: component.to_string(),
            operation: operation.to_string(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }

    pub fn with_block_number(self, block_number: u64) -> Self {
        self.with_metadata("block_number", json!(block_number))
    }

    pub fn with_transaction_hash(self, tx_hash: &str) -> Self {
        self.with_metadata("transaction_hash", json!(tx_hash))
    }

    pub fn with_address(self, address: &str) -> Self {
        self.with_metadata("address", json!(address))
    }

    pub fn with_amount(self, amount: &str) -> Self {
        self.with_metadata("amount", json!(amount))
    }

    pub fn with_retry_count(self, retry_count: u32) -> Self {
        self.with_metadata("retry_count", json!(retry_count))
    }

    fn format_message(&self, level: &str, message: &str) -> String {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        let mut log_entry = json!({
            "timestamp": timestamp,
            "level": level,
            "component": self.component,
            "operation": self.operation,
            "message": message,
        });

        for (key, value) in &self.metadata {
            log_entry[key] = value.clone();
        }

        log_entry.to_string()
    }

    pub fn info(&self, message: &str) {
        info!("{}", self.format_message("INFO", message));
    }

    pub fn warn(&self, message: &str) {
        warn!("{}", self.format_message("WARN", message));
    }

    pub fn error(&self, message: &str) {
        error!("{}", self.format_message("ERROR", message));
    }

    pub fn debug(&self, message: &str) {
        debug!("{}", self.format_message("DEBUG", message));
    }

    pub fn trace(&self, message: &str) {
        trace!("{}", self.format_message("TRACE", message));
    }
}

pub struct ErrorLogger;

impl ErrorLogger {
    pub fn log_error(error: &RelayerError, context: Option<LogContext>) {
        let severity = error.severity();

        let log_context = context
            .unwrap_or_else(|| LogContext::new("error", "unknown"))
            .with_metadata("error_type", json!(format!("{:?}", error)))
            .with_metadata("severity", json!(format!("{:?}", severity)))
            .with_metadata("recoverable", json!(error.is_recoverable()));

        let message = format!("Error occurred: {}", error);

        match severity {
            ErrorSeverity::Critical | ErrorSeverity::High => log_context.error(&message),
            ErrorSeverity::Medium => log_context.warn(&message),
            ErrorSeverity::Low => log_context.info(&message),
        }
    }
}

/// The externally visible event stream of the relayer
pub struct RelayLogger;

impl RelayLogger {
    pub fn log_cycle_start(height: u64, from_block: u64, to_block: u64, cursor: u64) {
        let context = LogContext::new("scanner", "cycle_start")
            .with_metadata("height", json!(height))
            .with_metadata("from_block", json!(from_block))
            .with_metadata("to_block", json!(to_block))
            .with_metadata("cursor", json!(cursor));

        if from_block > to_block {
            context.debug(&format!("No new blocks up to {}", height));
        } else {
            context.info(&format!("Scanning blocks {}..={} (height {})", from_block, to_block, height));
        }
    }

    pub fn log_deposit_detected(event: &DepositEvent) {
        let mut context = LogContext::new("classifier", "deposit_detected")
            .with_block_number(event.block_number)
            .with_transaction_hash(&event.transaction_hash.to_string())
            .with_amount(&event.amount.to_string())
            .with_metadata("kind", json!(event.kind.label()));

        if let Some(token) = event.token() {
            context = context.with_address(&token.to_string());
        }

        context.info(&format!("Deposit detected: {}", event));
    }

    pub fn log_relay_success(event: &DepositEvent, relay_tx_hash: &str, attempts: u32) {
        let context = LogContext::new("relay", "success")
            .with_transaction_hash(relay_tx_hash)
            .with_retry_count(attempts)
            .with_amount(&event.amount.to_string())
            .with_metadata("source_transaction", json!(event.transaction_hash.to_string()));

        context.info(&format!("Relayed {} in {} after {} attempt(s)", event, relay_tx_hash, attempts));
    }

    pub fn log_attempt_failure(event: &DepositEvent, attempt: u32, max_attempts: u32, error: &RelayerError) {
        let context = LogContext::new("relay", "attempt_failed")
            .with_retry_count(attempt)
            .with_metadata("max_attempts", json!(max_attempts))
            .with_metadata("source_transaction", json!(event.transaction_hash.to_string()))
            .with_metadata("error", json!(error.to_string()));

        context.warn(&format!("Relay attempt {} of {} failed: {}", attempt, max_attempts, error));
    }

    pub fn log_terminal_failure(event: &DepositEvent, attempts: u32, error: &RelayerError) {
        let context = LogContext::new("relay", "terminal_failure")
            .with_retry_count(attempts)
            .with_block_number(event.block_number)
            .with_amount(&event.amount.to_string())
            .with_metadata("source_transaction", json!(event.transaction_hash.to_string()))
            .with_metadata("error", json!(error.to_string()));

        context.error(&format!("Giving up on {} after {} attempts: {}", event, attempts, error));
    }

    pub fn log_cycle_complete(blocks_scanned: u64, deposits: u32, relayed: u32, failed: u32, cursor: u64) {
        let context = LogContext::new("scanner", "cycle_complete")
            .with_metadata("blocks_scanned", json!(blocks_scanned))
            .with_metadata("deposits", json!(deposits))
            .with_metadata("relayed", json!(relayed))
            .with_metadata("failed", json!(failed))
            .with_metadata("cursor", json!(cursor));

        if failed > 0 {
            context.warn(&format!("Cycle finished with {} failed relay(s), cursor at {}", failed, cursor));
        } else {
            context.debug(&format!("Cycle finished: {} blocks, {} deposits, cursor at {}", blocks_scanned, deposits, cursor));
        }
    }
}

/// Initialize logging. `RUST_LOG`, when set, overrides the configured level.
pub fn init_logging(config: &LoggingConfig) {
    let mut builder = env_logger::Builder::new();
    builder.parse_filters(&config.level);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }

    let json_lines = config.format == "json";
    builder.format(move |buf, record| {
        use std::io::Write;

        let message = record.args().to_string();
        if json_lines {
            return writeln!(buf, "{}", message);
        }

        if let Ok(json_value) = serde_json::from_str::<Value>(&message) {
            writeln!(buf, "{}", serde_json::to_string_pretty(&json_value)?)
        } else {
            writeln!(
                buf,
                "{} [{}] {}: {}",
                chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.target(),
                message
            )
        }
    });

    if builder.try_init().is_ok() {
        info!("Logging initialized (level={}, format={})", config.level, config.format);
    }
}
