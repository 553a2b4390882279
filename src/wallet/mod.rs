//! Wallets and coin selection
//!
//! A wallet computes its balance from the shared ledger and picks outputs
//! to cover a payment.

#[allow(clippy::module_inception)]
pub mod wallet;

pub use wallet::{validate_address, Wallet};
