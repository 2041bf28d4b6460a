use alloy_primitives::B256;
use thiserror::Error;

/// Main error type for the deposit relayer
#[derive(Error, Debug)]
pub enum RelayerError {
    #[error("Chain error: {0}")]
    Chain(#[from] ChainError),

    #[error("Relay error: {0}")]
    Relay(#[from] RelayFailure),

    #[error("Signing error: {0}")]
    Signing(#[from] SigningError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors raised by the chain client adapter
#[derive(Error, Debug)]
pub enum ChainError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Timeout after {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("Not found: {what}")]
    NotFound { what: String },

    #[error("Transaction rejected by node: code={code}, message={message}")]
    Rejected { code: i64, message: String },

    #[error("RPC method error: code={code}, message={message}")]
    Rpc { code: i64, message: String },

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Malformed call payloads. Never escalated past the classifier.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PayloadError {
    #[error("Payload truncated: expected {expected} bytes, got {got}")]
    Truncated { expected: usize, got: usize },

    #[error("Selector does not match transfer(address,uint256)")]
    SelectorMismatch,

    #[error("Address word has non-zero high bytes")]
    DirtyAddressPadding,
}

#[derive(Error, Debug)]
pub enum SigningError {
    #[error("Invalid operator private key: {0}")]
    InvalidKey(String),

    #[error("Signer failure: {0}")]
    Signer(#[from] alloy::signers::Error),
}

/// Outcomes of a submitted relay transaction that did not confirm
#[derive(Error, Debug)]
pub enum RelayFailure {
    #[error("Relay transaction {tx_hash} reverted")]
    Reverted { tx_hash: B256 },

    #[error("No receipt for {tx_hash} within {seconds} seconds")]
    ReceiptTimeout { tx_hash: B256, seconds: u64 },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required value: {0}")]
    MissingValue(String),

    #[error("Invalid configuration value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Invalid address for {key}: {value}")]
    InvalidAddress { key: String, value: String },

    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Configuration parsing failed: {0}")]
    Parsing(String),

    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
}

pub type Result<T> = std::result::Result<T, RelayerError>;

/// Error severity levels for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Critical,
    High,
    Medium,
    Low,
}

impl RelayerError {
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            RelayerError::Config(_) => ErrorSeverity::Critical,
            RelayerError::Signing(SigningError::InvalidKey(_)) => ErrorSeverity::Critical,

            RelayerError::Signing(_) => ErrorSeverity::High,
            RelayerError::Relay(RelayFailure::Reverted { .. }) => ErrorSeverity::High,
            RelayerError::Chain(ChainError::Rejected { .. }) => ErrorSeverity::High,

            RelayerError::Chain(ChainError::NotFound { .. }) => ErrorSeverity::Low,
            _ => ErrorSeverity::Medium,
        }
    }

    /// Whether the relay attempt boundary should try again. Only a key that
    /// never parsed or a bad config is final.
    pub fn is_recoverable(&self) -> bool {
        match self {
            RelayerError::Chain(_) => true,
            RelayerError::Relay(_) => true,
            RelayerError::Signing(SigningError::Signer(_)) => true,
            RelayerError::Signing(SigningError::InvalidKey(_)) => false,
            RelayerError::Config(_) => false,
        }
    }
}
