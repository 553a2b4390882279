//! Utility functions and helpers
//!
//! Hashing, timestamps and the canonical byte encoding used for digests.

pub mod crypto;
pub mod serialization;

pub use crypto::{current_timestamp, sha256_digest, sha256_hex};

pub use serialization::{deserialize, hash_fields, serialize};
