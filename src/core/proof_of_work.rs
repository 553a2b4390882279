use crate::config::validate_difficulty;
use crate::core::Block;
use crate::error::{BlockchainError, Result};
use crate::utils::{serialize, sha256_hex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

// How many nonces to try between deadline checks
const DEADLINE_CHECK_INTERVAL: i64 = 1024;

const MAX_NONCE: i64 = i64::MAX;

/// Abort handle for a proof-of-work search. Clones share the same flag, so
/// one clone can be handed to another thread and cancelled from there.
#[derive(Debug, Clone, Default)]
pub struct MiningSignal {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl MiningSignal {
    pub fn new() -> MiningSignal {
        MiningSignal::default()
    }

    pub fn with_timeout(timeout: Duration) -> MiningSignal {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(deadline: Instant) -> MiningSignal {
        MiningSignal {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: Some(deadline),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed) || self.is_expired()
    }

    fn is_expired(&self) -> bool {
        self.deadline
            .map(|deadline| Instant::now() >= deadline)
            .unwrap_or(false)
    }
}

pub struct ProofOfWork {
    difficulty: u32,
    prefix: String,
}

impl ProofOfWork {
    pub fn new(difficulty: u32) -> Result<ProofOfWork> {
        validate_difficulty(difficulty)?;
        Ok(ProofOfWork {
            difficulty,
            prefix: "0".repeat(difficulty as usize),
        })
    }

    pub fn get_difficulty(&self) -> u32 {
        self.difficulty
    }

    pub fn is_satisfied_by(&self, hash: &str) -> bool {
        hash.starts_with(self.prefix.as_str())
    }

    /// True when `hash` starts with `difficulty` zero hex digits.
    pub fn meets_difficulty(hash: &str, difficulty: u32) -> bool {
        let difficulty = difficulty as usize;
        hash.len() >= difficulty && hash.bytes().take(difficulty).all(|b| b == b'0')
    }

    /// Everything the block hash covers except the nonce:
    /// previous hash, encoded transactions, timestamp.
    fn prepare_header(block: &Block) -> Result<Vec<u8>> {
        let mut data_bytes = vec![];
        data_bytes.extend(block.get_pre_block_hash().as_bytes());
        data_bytes.extend(serialize(&block.get_transactions().to_vec())?);
        data_bytes.extend(block.get_timestamp().to_be_bytes());
        Ok(data_bytes)
    }

    fn hash_with_nonce(header: &[u8], nonce: i64) -> String {
        let mut data_bytes = Vec::with_capacity(header.len() + 8);
        data_bytes.extend_from_slice(header);
        data_bytes.extend(nonce.to_be_bytes());
        sha256_hex(data_bytes.as_slice())
    }

    /// Digest of `block` at its current nonce.
    pub fn calculate_hash(block: &Block) -> Result<String> {
        let header = Self::prepare_header(block)?;
        Ok(Self::hash_with_nonce(&header, block.get_nonce()))
    }

    /// Search nonces upward from the block's current nonce until the hash
    /// carries the zero prefix. Returns the number of hashes computed.
    ///
    /// If the signal fires first the block keeps the last nonce tried along
    /// with its matching hash, and `MiningCancelled` is returned.
    pub fn run(&self, block: &mut Block, signal: &MiningSignal) -> Result<u64> {
        let header = Self::prepare_header(block)?;
        let mut nonce = block.get_nonce();
        let mut hash = Self::hash_with_nonce(&header, nonce);
        let mut attempts = 1u64;

        log::info!(
            "Mining block on top of {} with difficulty {}",
            block.get_pre_block_hash(),
            self.difficulty
        );
        let started = Instant::now();

        while !self.is_satisfied_by(&hash) {
            if signal.cancelled.load(Ordering::Relaxed)
                || (nonce % DEADLINE_CHECK_INTERVAL == 0 && signal.is_expired())
            {
                block.set_proof(nonce, hash);
                log::warn!("Mining cancelled after {attempts} attempts at nonce {nonce}");
                return Err(BlockchainError::MiningCancelled { nonce });
            }
            if nonce == MAX_NONCE {
                block.set_proof(nonce, hash);
                return Err(BlockchainError::Mining("Nonce space exhausted".to_string()));
            }
            nonce += 1;
            hash = Self::hash_with_nonce(&header, nonce);
            attempts += 1;
        }

        log::info!(
            "Block mined: {hash} (nonce {nonce}, {attempts} attempts, {:?})",
            started.elapsed()
        );
        block.set_proof(nonce, hash);
        Ok(attempts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_block() -> Block {
        Block::new_block_with_timestamp("prev_hash", 1_700_000_000_000).unwrap()
    }

    #[test]
    fn test_prefix_matches_difficulty() {
        let pow = ProofOfWork::new(5).unwrap();
        assert!(pow.is_satisfied_by("00000f"));
        assert!(!pow.is_satisfied_by("0000f0"));
        assert_eq!(pow.get_difficulty(), 5);
        assert!(ProofOfWork::new(65).is_err());
    }

    #[test]
    fn test_meets_difficulty() {
        assert!(ProofOfWork::meets_difficulty("000abc", 3));
        assert!(!ProofOfWork::meets_difficulty("00abc", 3));
        assert!(ProofOfWork::meets_difficulty("anything", 0));
        assert!(!ProofOfWork::meets_difficulty("00", 3));
    }

    #[test]
    fn test_run_finds_valid_nonce() {
        let mut block = test_block();
        let pow = ProofOfWork::new(2).unwrap();

        let attempts = pow.run(&mut block, &MiningSignal::new()).unwrap();

        assert!(attempts >= 1);
        assert!(block.get_hash().starts_with("00"));
        assert_eq!(block.get_hash(), ProofOfWork::calculate_hash(&block).unwrap());
    }

    #[test]
    fn test_run_keeps_already_valid_nonce() {
        let mut block = test_block();
        let pow = ProofOfWork::new(0).unwrap();
        let attempts = pow.run(&mut block, &MiningSignal::new()).unwrap();
        assert_eq!(attempts, 1);
        assert_eq!(block.get_nonce(), 0);
    }

    #[test]
    fn test_cancelled_signal_stops_search() {
        let mut block = test_block();
        // 64 zero digits will not be found
        let pow = ProofOfWork::new(64).unwrap();
        let signal = MiningSignal::new();
        signal.cancel();

        let result = pow.run(&mut block, &signal);

        assert!(matches!(
            result,
            Err(BlockchainError::MiningCancelled { .. })
        ));
        // The stored hash still belongs to the stored nonce
        assert_eq!(block.get_hash(), ProofOfWork::calculate_hash(&block).unwrap());
    }

    #[test]
    fn test_expired_deadline_stops_search() {
        let mut block = test_block();
        let pow = ProofOfWork::new(64).unwrap();
        let signal = MiningSignal::with_timeout(Duration::from_millis(20));

        let result = pow.run(&mut block, &signal);

        assert!(matches!(
            result,
            Err(BlockchainError::MiningCancelled { .. })
        ));
        assert!(signal.is_cancelled());
    }

    #[test]
    fn test_signal_clones_share_flag() {
        let signal = MiningSignal::new();
        let remote = signal.clone();
        assert!(!signal.is_cancelled());
        remote.cancel();
        assert!(signal.is_cancelled());
    }

    #[test]
    fn test_hash_covers_nonce() {
        let header = b"header".to_vec();
        assert_ne!(
            ProofOfWork::hash_with_nonce(&header, 1),
            ProofOfWork::hash_with_nonce(&header, 2)
        );
        assert_eq!(
            ProofOfWork::hash_with_nonce(&header, 7),
            ProofOfWork::hash_with_nonce(&header, 7)
        );
    }
}
