//! Core ledger functionality
//!
//! Blocks, transactions, the chain and the proof-of-work search that seals blocks.

pub mod block;
pub mod blockchain;
pub mod proof_of_work;
pub mod transaction;

pub use block::Block;
pub use blockchain::Blockchain;
pub use proof_of_work::{MiningSignal, ProofOfWork};
pub use transaction::{TXInput, TXOutput, Transaction};
