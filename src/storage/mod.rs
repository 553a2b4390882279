//! Ledger state
//!
//! The in-memory UTXO set that every transaction resolves against.

pub mod utxo_set;

pub use utxo_set::{LedgerState, UTXOSet};
