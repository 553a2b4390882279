// This is the chain itself - an append-only list of blocks held in memory
// Integrity is not enforced on append; `is_valid` re-walks the whole list and
// reports tampering after the fact

use crate::config::{validate_difficulty, GENESIS_HASH, GLOBAL_CONFIG};
use crate::core::{Block, MiningSignal, ProofOfWork, Transaction};
use crate::error::{BlockchainError, Result};
use crate::storage::UTXOSet;
use log::info;
use parking_lot::RwLock;
use serde::Serialize;

pub struct Blockchain {
    // Readers take snapshots; only the final push of `append` takes the write lock
    blocks: RwLock<Vec<Block>>,
    difficulty: u32,
}

#[derive(Serialize)]
struct ChainDump<'a> {
    difficulty: u32,
    blocks: &'a [Block],
}

impl Default for Blockchain {
    fn default() -> Self {
        Self::new()
    }
}

impl Blockchain {
    /// An empty chain using the configured difficulty.
    pub fn new() -> Blockchain {
        Blockchain {
            blocks: RwLock::new(vec![]),
            difficulty: GLOBAL_CONFIG.get_difficulty(),
        }
    }

    pub fn with_difficulty(difficulty: u32) -> Result<Blockchain> {
        validate_difficulty(difficulty)?;
        Ok(Blockchain {
            blocks: RwLock::new(vec![]),
            difficulty,
        })
    }

    /// Rebuild a chain from a list of blocks, e.g. a snapshot taken with
    /// [`Blockchain::blocks`]. Nothing is validated here.
    pub fn from_blocks(blocks: Vec<Block>, difficulty: u32) -> Result<Blockchain> {
        validate_difficulty(difficulty)?;
        Ok(Blockchain {
            blocks: RwLock::new(blocks),
            difficulty,
        })
    }

    pub fn get_difficulty(&self) -> u32 {
        self.difficulty
    }

    /// Append an empty genesis block. Its hash is left unmined.
    pub fn initialize_chain(&self) -> Result<Block> {
        let genesis = Block::generate_genesis_block()?;
        info!("Created genesis block {}", genesis.get_hash());
        self.blocks.write().push(genesis.clone());
        Ok(genesis)
    }

    /// Mint `coins` out of nothing for `target_address`.
    ///
    /// Builds a genesis block carrying the origin transaction, credits the
    /// ledger with its single output and appends the block without mining.
    pub fn add_origin_transaction(
        &self,
        ledger: &UTXOSet,
        origin_address: &str,
        target_address: &str,
        coins: u64,
    ) -> Result<Block> {
        info!("Minting {coins} from {origin_address} to {target_address}");
        let mut genesis = Block::generate_genesis_block()?;

        // Serial and credit under one lock so concurrent mints never share an id
        let transaction = ledger.transact(|state| -> Result<Transaction> {
            let serial = state.next_origin_serial();
            let transaction = Transaction::new_origin_transaction(
                origin_address,
                target_address,
                coins,
                serial,
            )?;
            for output in transaction.get_outputs() {
                state.put(output.clone())?;
            }
            Ok(transaction)
        })?;
        genesis.push_origin_transaction(transaction);
        genesis.refresh_hash()?;

        self.blocks.write().push(genesis.clone());
        Ok(genesis)
    }

    /// Mine `block` at the chain's difficulty and append it. The block is not
    /// checked against the current tip.
    pub fn append(&self, block: Block) -> Result<Block> {
        self.append_with_signal(block, &MiningSignal::new())
    }

    /// Like [`Blockchain::append`], but the search can be aborted. A
    /// cancelled block is dropped and the chain stays as it was.
    pub fn append_with_signal(&self, mut block: Block, signal: &MiningSignal) -> Result<Block> {
        block.mine_with_signal(self.difficulty, signal)?;

        let mut blocks = self.blocks.write();
        blocks.push(block.clone());
        info!(
            "Appended block {} at height {}",
            block.get_hash(),
            blocks.len() - 1
        );
        Ok(block)
    }

    pub fn is_valid(&self) -> bool {
        match self.validate() {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Chain validation failed: {e}");
                false
            }
        }
    }

    /// Walk consecutive pairs and stop at the first one that breaks:
    /// the stored hash must match the recomputed one, link to the
    /// predecessor's hash, and carry the proof-of-work prefix.
    pub fn validate(&self) -> Result<()> {
        let blocks = self.blocks.read();
        if blocks.len() <= 1 {
            return Ok(());
        }

        let pow = ProofOfWork::new(self.difficulty)?;
        for (height, pair) in blocks.windows(2).enumerate() {
            let (prev, current) = (&pair[0], &pair[1]);
            let height = height + 1;

            let recomputed = current.calculate_hash()?;
            if current.get_hash() != recomputed {
                return Err(BlockchainError::InvalidBlock(format!(
                    "block {height}: stored hash {} does not match contents ({recomputed})",
                    current.get_hash()
                )));
            }

            if prev.get_hash() != current.get_pre_block_hash() {
                return Err(BlockchainError::InvalidBlock(format!(
                    "block {height}: previous hash {} does not link to {}",
                    current.get_pre_block_hash(),
                    prev.get_hash()
                )));
            }

            if !pow.is_satisfied_by(current.get_hash()) {
                return Err(BlockchainError::InvalidBlock(format!(
                    "block {height}: hash {} is not mined to difficulty {}",
                    current.get_hash(),
                    self.difficulty
                )));
            }
        }

        Ok(())
    }

    /// Snapshot of the blocks in chain order.
    pub fn blocks(&self) -> Vec<Block> {
        self.blocks.read().clone()
    }

    pub fn len(&self) -> usize {
        self.blocks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.read().is_empty()
    }

    pub fn get_tip_hash(&self) -> Option<String> {
        self.blocks
            .read()
            .last()
            .map(|block| block.get_hash().to_string())
    }

    /// Hash a new block should point at: the tip, or the genesis sentinel
    /// for an empty chain.
    pub fn next_pre_block_hash(&self) -> String {
        self.get_tip_hash()
            .unwrap_or_else(|| GENESIS_HASH.to_string())
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        let blocks = self.blocks.read();
        let dump = ChainDump {
            difficulty: self.difficulty,
            blocks: blocks.as_slice(),
        };
        Ok(serde_json::to_string_pretty(&dump)?)
    }
}
