// Canonical byte encoding for everything that gets hashed.
// bincode's standard config is deterministic, so equal content always
// produces equal bytes and therefore equal digests.
use crate::error::{BlockchainError, Result};
use crate::utils::sha256_hex;

fn config() -> bincode::config::Configuration {
    bincode::config::standard()
}

pub fn serialize<T: bincode::Encode>(data: &T) -> Result<Vec<u8>> {
    Ok(bincode::encode_to_vec(data, config())?)
}

pub fn deserialize<T: bincode::Decode<()>>(bytes: &[u8]) -> Result<T> {
    let (data, read) = bincode::decode_from_slice(bytes, config())?;
    if read != bytes.len() {
        return Err(BlockchainError::Serialization(format!(
            "Trailing bytes after decoding: {} of {} consumed",
            read,
            bytes.len()
        )));
    }
    Ok(data)
}

/// Hex SHA-256 of the canonical encoding of `fields`.
///
/// Strings are length-prefixed by the encoding, so distinct field tuples
/// never hash the same bytes.
pub fn hash_fields<T: bincode::Encode>(fields: &T) -> Result<String> {
    Ok(sha256_hex(&serialize(fields)?))
}
