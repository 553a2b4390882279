//! Error handling for the ledger
//!
//! Every fallible ledger operation returns this error type. Boolean-shaped
//! APIs (`add_transaction`, `is_valid`) log the error and report `false`.

use std::fmt;

/// Result type alias for ledger operations
pub type Result<T> = std::result::Result<T, BlockchainError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockchainError {
    /// Malformed or rejected transaction
    Transaction(String),
    /// Placeholder signature does not match sender, recipient and value
    InvalidSignature { sender: String, recipient: String },
    /// Not enough unspent value to cover the requested amount
    InsufficientFunds { required: u64, available: u64 },
    /// An output with this id is already unspent in the ledger
    DuplicateOutput(String),
    /// The ledger's total value would no longer fit in a `u64`
    ValueOverflow { total: u64, added: u64 },
    /// Empty or otherwise unusable wallet address
    InvalidAddress(String),
    /// Block construction or validation errors
    InvalidBlock(String),
    /// Mining errors
    Mining(String),
    /// Proof-of-work search aborted by its signal
    MiningCancelled { nonce: i64 },
    /// Serialization/deserialization errors
    Serialization(String),
    /// Configuration errors
    Config(String),
    /// File I/O errors
    Io(String),
    /// Digest or clock errors
    Crypto(String),
}

impl fmt::Display for BlockchainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockchainError::Transaction(msg) => write!(f, "Transaction error: {msg}"),
            BlockchainError::InvalidSignature { sender, recipient } => {
                write!(f, "Invalid signature for transaction {sender} -> {recipient}")
            }
            BlockchainError::InsufficientFunds {
                required,
                available,
            } => {
                write!(
                    f,
                    "Insufficient funds: required {required}, available {available}"
                )
            }
            BlockchainError::DuplicateOutput(id) => {
                write!(f, "Output {id} is already in the ledger")
            }
            BlockchainError::ValueOverflow { total, added } => {
                write!(f, "Adding {added} to a ledger holding {total} overflows")
            }
            BlockchainError::InvalidAddress(addr) => write!(f, "Invalid address: {addr}"),
            BlockchainError::InvalidBlock(msg) => write!(f, "Invalid block: {msg}"),
            BlockchainError::Mining(msg) => write!(f, "Mining error: {msg}"),
            BlockchainError::MiningCancelled { nonce } => {
                write!(f, "Mining cancelled at nonce {nonce}")
            }
            BlockchainError::Serialization(msg) => write!(f, "Serialization error: {msg}"),
            BlockchainError::Config(msg) => write!(f, "Configuration error: {msg}"),
            BlockchainError::Io(msg) => write!(f, "I/O error: {msg}"),
            BlockchainError::Crypto(msg) => write!(f, "Cryptographic error: {msg}"),
        }
    }
}

impl std::error::Error for BlockchainError {}

impl From<std::io::Error> for BlockchainError {
    fn from(err: std::io::Error) -> Self {
        BlockchainError::Io(err.to_string())
    }
}

impl From<bincode::error::EncodeError> for BlockchainError {
    fn from(err: bincode::error::EncodeError) -> Self {
        BlockchainError::Serialization(err.to_string())
    }
}

impl From<bincode::error::DecodeError> for BlockchainError {
    fn from(err: bincode::error::DecodeError) -> Self {
        BlockchainError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for BlockchainError {
    fn from(err: serde_json::Error) -> Self {
        BlockchainError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for BlockchainError {
    fn from(err: toml::de::Error) -> Self {
        BlockchainError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_funds_message() {
        let err = BlockchainError::InsufficientFunds {
            required: 1000,
            available: 60,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient funds: required 1000, available 60"
        );
    }

    #[test]
    fn test_bincode_error_conversion() {
        let err: BlockchainError = bincode::decode_from_slice::<String, _>(
            &[0xFF, 0xFF, 0xFF],
            bincode::config::standard(),
        )
        .unwrap_err()
        .into();
        assert!(matches!(err, BlockchainError::Serialization(_)));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: BlockchainError = io.into();
        assert!(matches!(err, BlockchainError::Io(_)));
    }
}
