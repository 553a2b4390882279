// The authoritative set of unspent outputs. Every wallet and every
// transaction resolves against one shared instance; clones of `UTXOSet`
// are handles onto the same state.

use crate::core::TXOutput;
use crate::error::{BlockchainError, Result};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Unspent outputs keyed by UTXO id, plus the counters that feed
/// transaction ids and origin output ids. Only reachable through
/// [`UTXOSet::transact`] or the single-operation helpers on `UTXOSet`, so it
/// is always observed whole.
///
/// The running total is kept in step with the map, and a put that would
/// push it past `u64::MAX` is refused, so any sum over unspent outputs fits.
#[derive(Debug, Default)]
pub struct LedgerState {
    utxos: BTreeMap<String, TXOutput>,
    total: u64,
    sequence: u64,
    origins: u64,
}

impl LedgerState {
    /// Insert an unspent output. An id that is already present is refused
    /// and the existing output stays.
    pub fn put(&mut self, output: TXOutput) -> Result<()> {
        if self.utxos.contains_key(output.get_id()) {
            return Err(BlockchainError::DuplicateOutput(output.get_id().to_string()));
        }
        self.total = self
            .total
            .checked_add(output.get_value())
            .ok_or(BlockchainError::ValueOverflow {
                total: self.total,
                added: output.get_value(),
            })?;
        log::debug!(
            "UTXO {} added: {} -> {}",
            output.get_id(),
            output.get_value(),
            output.get_recipient()
        );
        self.utxos.insert(output.get_id().to_string(), output);
        Ok(())
    }

    /// Removing an id that is not present is a no-op.
    pub fn remove(&mut self, id: &str) -> Option<TXOutput> {
        let removed = self.utxos.remove(id);
        if let Some(output) = &removed {
            self.total -= output.get_value();
            log::debug!(
                "UTXO {} consumed: {} from {}",
                id,
                output.get_value(),
                output.get_recipient()
            );
        }
        removed
    }

    pub fn get(&self, id: &str) -> Option<&TXOutput> {
        self.utxos.get(id)
    }

    /// Iteration order is the id order, so it is stable between calls.
    pub fn values(&self) -> impl Iterator<Item = &TXOutput> {
        self.utxos.values()
    }

    /// Hand out the current sequence number and advance the counter.
    pub fn next_sequence(&mut self) -> u64 {
        let current = self.sequence;
        self.sequence += 1;
        current
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Hand out the serial for the next origin output.
    pub fn next_origin_serial(&mut self) -> u64 {
        let current = self.origins;
        self.origins += 1;
        current
    }

    pub fn total_value(&self) -> u64 {
        self.total
    }
}

#[derive(Debug, Clone, Default)]
pub struct UTXOSet {
    inner: Arc<Mutex<LedgerState>>,
}

impl UTXOSet {
    pub fn new() -> UTXOSet {
        UTXOSet::default()
    }

    /// Run `f` while holding the ledger lock. Nothing else can read or write
    /// the set until `f` returns.
    pub fn transact<R>(&self, f: impl FnOnce(&mut LedgerState) -> R) -> R {
        let mut state = self.inner.lock();
        f(&mut state)
    }

    pub fn put(&self, output: TXOutput) -> Result<()> {
        self.transact(|state| state.put(output))
    }

    pub fn remove(&self, id: &str) -> Option<TXOutput> {
        self.transact(|state| state.remove(id))
    }

    pub fn get(&self, id: &str) -> Option<TXOutput> {
        self.transact(|state| state.get(id).cloned())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.transact(|state| state.get(id).is_some())
    }

    /// Snapshot of every unspent output.
    pub fn values(&self) -> Vec<TXOutput> {
        self.transact(|state| state.values().cloned().collect())
    }

    pub fn find_utxo(&self, address: &str) -> Vec<TXOutput> {
        self.transact(|state| {
            state
                .values()
                .filter(|output| output.is_owned_by(address))
                .cloned()
                .collect()
        })
    }

    pub fn total_value(&self) -> u64 {
        self.transact(|state| state.total_value())
    }

    pub fn count(&self) -> usize {
        self.transact(|state| state.utxos.len())
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    pub fn sequence(&self) -> u64 {
        self.transact(|state| state.sequence())
    }

    /// True when both handles point at the same ledger.
    pub fn same_ledger(&self, other: &UTXOSet) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(owner: &str, value: u64, parent: &str) -> TXOutput {
        TXOutput::new(owner, value, parent, 0).unwrap()
    }

    #[test]
    fn test_put_get_remove() {
        let ledger = UTXOSet::new();
        let out = output("Wallet A", 100, "tx1");
        let id = out.get_id().to_string();

        ledger.put(out.clone()).unwrap();
        assert_eq!(ledger.get(&id), Some(out.clone()));
        assert_eq!(ledger.count(), 1);

        assert_eq!(ledger.remove(&id), Some(out));
        assert!(ledger.get(&id).is_none());
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let ledger = UTXOSet::new();
        ledger.put(output("Wallet A", 5, "tx1")).unwrap();
        assert!(ledger.remove("does-not-exist").is_none());
        assert_eq!(ledger.count(), 1);
    }

    #[test]
    fn test_find_utxo_filters_by_owner() {
        let ledger = UTXOSet::new();
        ledger.put(output("Wallet A", 10, "tx1")).unwrap();
        ledger.put(output("Wallet A", 15, "tx2")).unwrap();
        ledger.put(output("Wallet B", 7, "tx3")).unwrap();

        let owned = ledger.find_utxo("Wallet A");
        assert_eq!(owned.len(), 2);
        assert_eq!(owned.iter().map(TXOutput::get_value).sum::<u64>(), 25);
        assert_eq!(ledger.total_value(), 32);
    }

    #[test]
    fn test_clones_share_state() {
        let ledger = UTXOSet::new();
        let handle = ledger.clone();
        handle.put(output("Wallet B", 40, "tx1")).unwrap();

        assert_eq!(ledger.total_value(), 40);
        assert!(ledger.same_ledger(&handle));
        assert!(!ledger.same_ledger(&UTXOSet::new()));
    }

    #[test]
    fn test_values_order_is_stable() {
        let ledger = UTXOSet::new();
        for i in 0..10 {
            ledger.put(output("Wallet A", i, &format!("tx{i}"))).unwrap();
        }
        let first: Vec<String> = ledger.values().iter().map(|o| o.get_id().to_string()).collect();
        let second: Vec<String> = ledger.values().iter().map(|o| o.get_id().to_string()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_sequence_advances() {
        let ledger = UTXOSet::new();
        assert_eq!(ledger.transact(|state| state.next_sequence()), 0);
        assert_eq!(ledger.transact(|state| state.next_sequence()), 1);
        assert_eq!(ledger.sequence(), 2);
    }

    #[test]
    fn test_put_refuses_existing_id() {
        let ledger = UTXOSet::new();
        let out = output("Wallet A", 8, "tx1");
        ledger.put(out.clone()).unwrap();

        assert_eq!(
            ledger.put(out.clone()),
            Err(BlockchainError::DuplicateOutput(out.get_id().to_string()))
        );
        assert_eq!(ledger.count(), 1);
        assert_eq!(ledger.total_value(), 8);
    }

    #[test]
    fn test_total_tracks_puts_and_removes() {
        let ledger = UTXOSet::new();
        let out = output("Wallet A", 30, "tx1");
        let id = out.get_id().to_string();
        ledger.put(out).unwrap();
        ledger.put(output("Wallet B", 12, "tx2")).unwrap();
        assert_eq!(ledger.total_value(), 42);

        ledger.remove(&id);
        ledger.remove(&id);
        assert_eq!(ledger.total_value(), 12);
    }

    #[test]
    fn test_put_refuses_overflowing_total() {
        let ledger = UTXOSet::new();
        ledger.put(output("Wallet A", u64::MAX, "tx1")).unwrap();

        let result = ledger.put(output("Wallet B", 1, "tx2"));
        assert!(matches!(result, Err(BlockchainError::ValueOverflow { .. })));
        assert_eq!(ledger.count(), 1);
        assert_eq!(ledger.total_value(), u64::MAX);
    }

    #[test]
    fn test_origin_serials_advance() {
        let ledger = UTXOSet::new();
        assert_eq!(ledger.transact(|state| state.next_origin_serial()), 0);
        assert_eq!(ledger.transact(|state| state.next_origin_serial()), 1);
        assert_eq!(ledger.sequence(), 0);
    }
}
