use crate::core::{TXInput, TXOutput, Transaction};
use crate::error::{BlockchainError, Result};
use crate::storage::UTXOSet;
use std::collections::BTreeMap;

/// An address plus the outputs it last saw in the ledger.
///
/// The local cache is only a hint. Balances are always recomputed from the
/// shared ledger, and outputs only really disappear when a transaction that
/// spends them is processed.
pub struct Wallet {
    address: String,
    ledger: UTXOSet,
    unspent: BTreeMap<String, TXOutput>,
}

impl Wallet {
    pub fn new(address: &str, ledger: &UTXOSet) -> Result<Wallet> {
        if !validate_address(address) {
            return Err(BlockchainError::InvalidAddress(address.to_string()));
        }
        Ok(Wallet {
            address: address.to_string(),
            ledger: ledger.clone(),
            unspent: BTreeMap::new(),
        })
    }

    pub fn get_address(&self) -> &str {
        self.address.as_str()
    }

    /// Sum of every ledger output owned by this address. The local cache is
    /// replaced with exactly the outputs found.
    pub fn get_balance(&mut self) -> u64 {
        let owned = self.ledger.find_utxo(&self.address);
        self.unspent = owned
            .into_iter()
            .map(|output| (output.get_id().to_string(), output))
            .collect();
        // The ledger caps its total at u64::MAX, so a subset cannot overflow
        self.unspent
            .values()
            .fold(0u64, |total, output| total.saturating_add(output.get_value()))
    }

    /// Outputs the wallet currently believes it can spend.
    pub fn cached_outputs(&self) -> impl Iterator<Item = &TXOutput> {
        self.unspent.values()
    }

    /// Build a signed transaction paying `value` to `recipient`.
    ///
    /// Refused with `InsufficientFunds` when the balance is too low; nothing
    /// is built in that case. The ledger is not touched here: the selected
    /// outputs are only dropped from the local cache until the transaction
    /// is processed.
    pub fn send_coins(&mut self, recipient: &str, value: u64) -> Result<Transaction> {
        if value == 0 {
            return Err(BlockchainError::Transaction(
                "Amount must be positive".to_string(),
            ));
        }
        if !validate_address(recipient) {
            return Err(BlockchainError::InvalidAddress(recipient.to_string()));
        }

        let balance = self.get_balance();
        if balance < value {
            log::info!(
                "{} cannot send {value} to {recipient}: balance is {balance}",
                self.address
            );
            return Err(BlockchainError::InsufficientFunds {
                required: value,
                available: balance,
            });
        }

        let inputs = self.gather_inputs(value);
        let mut transaction = Transaction::new(&self.address, recipient, value, inputs);
        transaction.generate_signature();

        for input in transaction.get_inputs() {
            self.unspent.remove(input.get_utxo_id());
        }

        log::debug!(
            "{} built transaction to {recipient} for {value} from {} inputs",
            self.address,
            transaction.get_inputs().len()
        );
        Ok(transaction)
    }

    // Take owned outputs in id order until the total strictly exceeds `value`.
    // An exact match keeps going, so it pulls in one more output if there is one.
    fn gather_inputs(&self, value: u64) -> Vec<TXInput> {
        let mut inputs = vec![];
        let mut total = 0u64;
        for output in self.unspent.values() {
            total = total.saturating_add(output.get_value());
            inputs.push(TXInput::new(output.get_id()));
            if total > value {
                break;
            }
        }
        inputs
    }
}

/// Addresses are plain owner names; anything non-blank is accepted.
pub fn validate_address(address: &str) -> bool {
    !address.trim().is_empty()
}
