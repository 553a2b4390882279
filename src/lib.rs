//! # Architect Ledger - a single-node UTXO ledger sealed by proof-of-work
//!
//! Two mechanisms make this ledger tamper-evident and keep its books straight:
//!
//! - **Hash-chained blocks**: every block stores the SHA-256 of its
//!   predecessor and is mined until its own hash starts with a run of zero
//!   hex digits. Changing anything in a block breaks either its own hash or
//!   the link from the next block, and `Blockchain::is_valid` notices.
//! - **UTXO accounting**: value lives in unspent outputs held by a shared
//!   `UTXOSet`. A transaction consumes outputs, pays the recipient and
//!   returns the change to the sender, all under one lock.
//!
//! ## Layout
//! - `core/`: blocks, transactions, the chain and the proof-of-work search
//! - `storage/`: the in-memory UTXO set
//! - `wallet/`: balances and coin selection
//! - `config/`: genesis sentinel, difficulty and other settings
//! - `utils/`: hashing, timestamps and canonical encoding
//! - `cli/`: argument parsing for the demo binary
//!
//! Signatures are placeholders (sender, recipient and value concatenated);
//! there is no key material anywhere in the crate.

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod storage;
pub mod utils;
pub mod wallet;

// Re-export commonly used types for convenience
pub use cli::{Command, Opt};
pub use config::{Config, DEFAULT_DIFFICULTY, GENESIS_HASH, GLOBAL_CONFIG};
pub use core::{Block, Blockchain, MiningSignal, ProofOfWork, TXInput, TXOutput, Transaction};
pub use error::{BlockchainError, Result};
pub use storage::{LedgerState, UTXOSet};
pub use utils::{current_timestamp, sha256_digest, sha256_hex};
pub use wallet::{validate_address, Wallet};
