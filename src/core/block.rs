use crate::config::GENESIS_HASH;
use crate::core::{MiningSignal, ProofOfWork, Transaction};
use crate::error::{BlockchainError, Result};
use crate::storage::UTXOSet;
use crate::utils::current_timestamp;
use log::info;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    timestamp: i64,
    pre_block_hash: String,
    hash: String,
    transactions: Vec<Transaction>,
    nonce: i64,
}

impl Block {
    /// An empty block on top of `pre_block_hash`, stamped with the current
    /// time. The hash is computed right away but the block is not mined.
    pub fn new_block(pre_block_hash: &str) -> Result<Block> {
        Self::new_block_with_timestamp(pre_block_hash, current_timestamp()?)
    }

    pub fn new_block_with_timestamp(pre_block_hash: &str, timestamp: i64) -> Result<Block> {
        let mut block = Block {
            timestamp,
            pre_block_hash: pre_block_hash.to_string(),
            hash: String::new(),
            transactions: vec![],
            nonce: 0,
        };
        block.refresh_hash()?;
        Ok(block)
    }

    pub fn generate_genesis_block() -> Result<Block> {
        Self::new_block(GENESIS_HASH)
    }

    /// Digest over the previous hash, the transactions, the timestamp and the nonce.
    pub fn calculate_hash(&self) -> Result<String> {
        ProofOfWork::calculate_hash(self)
    }

    /// Recompute and store the hash for the block's current contents.
    pub fn refresh_hash(&mut self) -> Result<&str> {
        self.hash = self.calculate_hash()?;
        Ok(self.hash.as_str())
    }

    pub fn mine(&mut self, difficulty: u32) -> Result<()> {
        self.mine_with_signal(difficulty, &MiningSignal::new())
    }

    pub fn mine_with_signal(&mut self, difficulty: u32, signal: &MiningSignal) -> Result<()> {
        let pow = ProofOfWork::new(difficulty)?;
        pow.run(self, signal)?;
        Ok(())
    }

    /// Process `transaction` against the ledger and embed it.
    ///
    /// Genesis blocks take no transactions. The stored hash is not updated;
    /// the block has to be mined again before it validates.
    pub fn try_add_transaction(
        &mut self,
        mut transaction: Transaction,
        ledger: &UTXOSet,
    ) -> Result<()> {
        if self.is_genesis() {
            return Err(BlockchainError::InvalidBlock(
                "Genesis block does not accept transactions".to_string(),
            ));
        }

        transaction.process(ledger)?;
        info!(
            "Added transaction {} to block",
            transaction.get_id().unwrap_or_default()
        );
        self.transactions.push(transaction);
        Ok(())
    }

    /// Boolean form of [`Block::try_add_transaction`]; the reason for a
    /// rejection is logged.
    pub fn add_transaction(&mut self, transaction: Transaction, ledger: &UTXOSet) -> bool {
        match self.try_add_transaction(transaction, ledger) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Transaction rejected: {e}");
                false
            }
        }
    }

    // Origin transactions are already settled and go straight into a genesis block
    pub(crate) fn push_origin_transaction(&mut self, transaction: Transaction) {
        self.transactions.push(transaction);
    }

    pub(crate) fn set_proof(&mut self, nonce: i64, hash: String) {
        self.nonce = nonce;
        self.hash = hash;
    }

    pub fn is_genesis(&self) -> bool {
        self.pre_block_hash == GENESIS_HASH
    }

    pub fn get_transactions(&self) -> &[Transaction] {
        self.transactions.as_slice()
    }

    pub fn get_pre_block_hash(&self) -> &str {
        self.pre_block_hash.as_str()
    }

    pub fn get_hash(&self) -> &str {
        self.hash.as_str()
    }

    pub fn get_timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn get_nonce(&self) -> i64 {
        self.nonce
    }

    /// Overwrite the stored hash without recomputing it.
    pub fn set_hash(&mut self, hash: &str) {
        self.hash = hash.to_string();
    }

    /// Point the block at a different predecessor. The stored hash goes stale.
    pub fn set_pre_block_hash(&mut self, pre_block_hash: &str) {
        self.pre_block_hash = pre_block_hash.to_string();
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
