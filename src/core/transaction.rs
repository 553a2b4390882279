// This file implements the transaction system - how value moves between addresses
// Each transaction consumes unspent outputs from the ledger and creates new ones:
// one paying the recipient and one returning the change to the sender

use crate::config::GENESIS_HASH;
use crate::error::{BlockchainError, Result};
use crate::storage::UTXOSet;
use crate::utils::hash_fields;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// This represents a transaction output - value owned by an address until spent
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct TXOutput {
    id: String,                    // Hash of the parent transaction id, index, owner and value
    recipient: String,             // The address that owns this output
    value: u64,                    // How much this output is worth
    parent_transaction_id: String, // The transaction that created this output
}

impl TXOutput {
    pub fn new(
        recipient: &str,
        value: u64,
        parent_transaction_id: &str,
        index: u64,
    ) -> Result<TXOutput> {
        let id = hash_fields(&(parent_transaction_id, index, recipient, value))?;
        Ok(TXOutput {
            id,
            recipient: recipient.to_string(),
            value,
            parent_transaction_id: parent_transaction_id.to_string(),
        })
    }

    pub fn get_id(&self) -> &str {
        self.id.as_str()
    }

    pub fn get_recipient(&self) -> &str {
        self.recipient.as_str()
    }

    pub fn get_value(&self) -> u64 {
        self.value
    }

    pub fn is_owned_by(&self, address: &str) -> bool {
        self.recipient == address
    }
}

// This represents a transaction input - a reference to an output I want to spend
// The referenced output is looked up once, while the transaction is processed
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct TXInput {
    utxo_id: String,
    utxo: Option<TXOutput>, // Filled in during processing, None if the id was not in the ledger
}

impl TXInput {
    pub fn new(utxo_id: &str) -> TXInput {
        TXInput {
            utxo_id: utxo_id.to_string(),
            utxo: None,
        }
    }

    pub fn get_utxo_id(&self) -> &str {
        self.utxo_id.as_str()
    }

    pub fn get_utxo(&self) -> Option<&TXOutput> {
        self.utxo.as_ref()
    }

    pub fn is_resolved(&self) -> bool {
        self.utxo.is_some()
    }

    /// Value contributed by this input; unresolved inputs contribute nothing.
    pub fn get_value(&self) -> u64 {
        self.utxo.as_ref().map(TXOutput::get_value).unwrap_or(0)
    }
}

// This is the main transaction structure
// The id stays empty until processing succeeds; after that the transaction is frozen
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct Transaction {
    id: Option<String>,
    sender: String,
    recipient: String,
    value: u64,
    signature: String,
    inputs: Vec<TXInput>,
    outputs: Vec<TXOutput>,
}

/// What processing computes inside the ledger lock.
struct Settlement {
    id: String,
    resolved: Vec<Option<TXOutput>>,
    outputs: Vec<TXOutput>,
}

impl Transaction {
    pub fn new(sender: &str, recipient: &str, value: u64, inputs: Vec<TXInput>) -> Transaction {
        Transaction {
            id: None,
            sender: sender.to_string(),
            recipient: recipient.to_string(),
            value,
            signature: String::new(),
            inputs,
            outputs: vec![],
        }
    }

    // The origin transaction is the only way new value enters the ledger
    // It has no inputs, a single output, and carries the genesis sentinel as its id.
    // Every origin shares that id, so the output is indexed by `serial` instead
    // of its position; each mint on a ledger must use a fresh serial.
    pub fn new_origin_transaction(
        sender: &str,
        recipient: &str,
        value: u64,
        serial: u64,
    ) -> Result<Transaction> {
        if value == 0 {
            return Err(BlockchainError::Transaction(
                "Origin value must be positive".to_string(),
            ));
        }

        let mut tx = Transaction::new(sender, recipient, value, vec![]);
        tx.generate_signature();
        tx.id = Some(GENESIS_HASH.to_string());
        tx.outputs
            .push(TXOutput::new(recipient, value, GENESIS_HASH, serial)?);
        Ok(tx)
    }

    /// The placeholder signature: sender, recipient and value concatenated.
    /// There is no key material involved.
    pub fn signature_payload(sender: &str, recipient: &str, value: u64) -> String {
        format!("{sender}{recipient}{value}")
    }

    pub fn generate_signature(&mut self) {
        self.signature = Self::signature_payload(&self.sender, &self.recipient, self.value);
    }

    pub fn verify_signature(&self) -> bool {
        self.signature == Self::signature_payload(&self.sender, &self.recipient, self.value)
    }

    /// Validate the transaction and settle it against the ledger.
    ///
    /// On success the inputs carry their resolved outputs, the two new
    /// outputs (payment, change) are in the ledger, the consumed outputs are
    /// gone from it and the transaction has its id. On any error the ledger
    /// and the transaction are left exactly as they were.
    pub fn process(&mut self, ledger: &UTXOSet) -> Result<()> {
        if self.id.is_some() {
            return Err(BlockchainError::Transaction(
                "Transaction has already been processed".to_string(),
            ));
        }

        // The only authenticity check this ledger has
        if !self.verify_signature() {
            log::warn!(
                "Rejecting transaction {} -> {}: signature mismatch",
                self.sender,
                self.recipient
            );
            return Err(BlockchainError::InvalidSignature {
                sender: self.sender.clone(),
                recipient: self.recipient.clone(),
            });
        }

        if self.value == 0 {
            return Err(BlockchainError::Transaction(
                "Amount must be positive".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for input in &self.inputs {
            if !seen.insert(input.get_utxo_id()) {
                return Err(BlockchainError::Transaction(format!(
                    "Output {} is referenced twice",
                    input.get_utxo_id()
                )));
            }
        }

        // Everything below happens under one lock so nobody sees a half-updated ledger
        let settlement = ledger.transact(|state| -> Result<Settlement> {
            let resolved: Vec<Option<TXOutput>> = self
                .inputs
                .iter()
                .map(|input| state.get(input.get_utxo_id()).cloned())
                .collect();

            let mut available = 0u64;
            for output in resolved.iter().flatten() {
                available = available.checked_add(output.get_value()).ok_or_else(|| {
                    BlockchainError::Transaction("Input value overflow".to_string())
                })?;
            }

            // Underfunded transactions are refused instead of minting negative change
            if available < self.value {
                return Err(BlockchainError::InsufficientFunds {
                    required: self.value,
                    available,
                });
            }

            let sequence = state.sequence();
            let id = hash_fields(&(
                self.sender.as_str(),
                self.recipient.as_str(),
                self.value,
                sequence,
            ))?;

            let outputs = vec![
                TXOutput::new(&self.recipient, self.value, &id, 0)?,
                TXOutput::new(&self.sender, available - self.value, &id, 1)?,
            ];
            // Checked before the first write so a clash leaves the ledger as it was
            if let Some(clash) = outputs.iter().find(|o| state.get(o.get_id()).is_some()) {
                return Err(BlockchainError::DuplicateOutput(clash.get_id().to_string()));
            }
            // Spend first: the new outputs add back exactly what was removed,
            // so the ledger total never passes its old value
            for output in resolved.iter().flatten() {
                state.remove(output.get_id());
            }
            for output in &outputs {
                state.put(output.clone())?;
            }
            state.next_sequence();

            Ok(Settlement {
                id,
                resolved,
                outputs,
            })
        });

        let settlement = match settlement {
            Ok(settlement) => settlement,
            Err(e) => {
                log::warn!(
                    "Rejecting transaction {} -> {} for {}: {e}",
                    self.sender,
                    self.recipient,
                    self.value
                );
                return Err(e);
            }
        };

        for (input, utxo) in self.inputs.iter_mut().zip(settlement.resolved) {
            input.utxo = utxo;
        }
        self.outputs = settlement.outputs;
        log::info!(
            "Processed transaction {}: {} -> {} ({}), change {}",
            settlement.id,
            self.sender,
            self.recipient,
            self.value,
            self.outputs[1].get_value()
        );
        self.id = Some(settlement.id);
        Ok(())
    }

    pub fn is_origin(&self) -> bool {
        self.inputs.is_empty() && self.id.as_deref() == Some(GENESIS_HASH)
    }

    pub fn is_processed(&self) -> bool {
        self.id.is_some()
    }

    pub fn get_id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn get_sender(&self) -> &str {
        self.sender.as_str()
    }

    pub fn get_recipient(&self) -> &str {
        self.recipient.as_str()
    }

    pub fn get_value(&self) -> u64 {
        self.value
    }

    pub fn get_signature(&self) -> &str {
        self.signature.as_str()
    }

    pub fn get_inputs(&self) -> &[TXInput] {
        self.inputs.as_slice()
    }

    pub fn get_outputs(&self) -> &[TXOutput] {
        self.outputs.as_slice()
    }

    /// Sum of the resolved inputs, or `None` if it does not fit in a `u64`.
    pub fn get_input_value(&self) -> Option<u64> {
        self.inputs
            .iter()
            .try_fold(0u64, |total, input| total.checked_add(input.get_value()))
    }

    /// Replace the placeholder signature. Used to build forged transactions.
    pub fn set_signature(&mut self, signature: &str) {
        self.signature = signature.to_string();
    }
}
