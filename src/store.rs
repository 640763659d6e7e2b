//! sled-backed persistence.
//!
//! Every entity kind lives in its own tree, keyed by record id, with values
//! encoded as CBOR. Secondary uniqueness indexes (importer transfer numbers,
//! distribution record numbers, usernames) are separate trees mapping the
//! natural key to the record id. Ledgers are keyed by [`LedgerKind::key`];
//! their entries live in `ledger_entries` under `{kind}/{sequence}` with a
//! big-endian sequence, so a prefix scan yields one ledger's history in order.
use std::sync::Arc;

use sled::transaction::{ConflictableTransactionError, TransactionalTree};
use sled::{Db, Tree};

use crate::error::{BackofficeError, Result};
use crate::ledger::{Ledger, LedgerEntry};
use crate::types::{EntrySource, LedgerKind, PetroleumType};

pub(crate) type TxResult<T> = std::result::Result<T, ConflictableTransactionError<BackofficeError>>;

#[derive(Clone)]
pub struct Store {
    instance: Arc<Db>,
    pub(crate) ledgers: Tree,
    pub(crate) ledger_entries: Tree,
    pub(crate) transfers: Tree,
    pub(crate) agreements: Tree,
    pub(crate) agreement_numbers: Tree,
    pub(crate) distributions: Tree,
    pub(crate) counters: Tree,
    pub(crate) records: Tree,
    pub(crate) record_numbers: Tree,
    pub(crate) users: Tree,
    pub(crate) usernames: Tree,
}

impl Store {
    pub fn open(instance: Arc<Db>) -> Result<Self> {
        Ok(Self {
            ledgers: instance.open_tree("ledgers")?,
            ledger_entries: instance.open_tree("ledger_entries")?,
            transfers: instance.open_tree("transfer_forms")?,
            agreements: instance.open_tree("importer_agreements")?,
            agreement_numbers: instance.open_tree("importer_agreement_numbers")?,
            distributions: instance.open_tree("distributions")?,
            counters: instance.open_tree("counters")?,
            records: instance.open_tree("distribution_records")?,
            record_numbers: instance.open_tree("distribution_record_numbers")?,
            users: instance.open_tree("users")?,
            usernames: instance.open_tree("usernames")?,
            instance,
        })
    }

    pub fn flush(&self) -> Result<()> {
        self.instance.flush()?;
        Ok(())
    }

    /// Current state of a ledger; a ledger that was never written is empty.
    pub fn ledger(&self, kind: LedgerKind) -> Result<Ledger> {
        Ok(get(&self.ledgers, kind.key())?.unwrap_or_else(|| Ledger::new(kind)))
    }

    /// Every entry of one ledger, oldest first.
    pub fn ledger_entries(&self, kind: LedgerKind) -> Result<Vec<LedgerEntry>> {
        self.ledger_entries
            .scan_prefix(entry_prefix(kind))
            .values()
            .map(|value| decode(&value?))
            .collect()
    }
}

fn entry_prefix(kind: LedgerKind) -> Vec<u8> {
    let mut prefix = kind.key().to_vec();
    prefix.push(b'/');
    prefix
}

pub(crate) fn entry_key(kind: LedgerKind, sequence: u64) -> Vec<u8> {
    let mut key = entry_prefix(kind);
    key.extend_from_slice(&sequence.to_be_bytes());
    key
}

pub(crate) fn encode<T: minicbor::Encode<()>>(value: &T) -> Result<Vec<u8>> {
    minicbor::to_vec(value).map_err(|e| BackofficeError::Encode(e.to_string()))
}

pub(crate) fn decode<T>(bytes: &[u8]) -> Result<T>
where
    T: for<'b> minicbor::Decode<'b, ()>,
{
    Ok(minicbor::decode(bytes)?)
}

pub(crate) fn get<T>(tree: &Tree, key: impl AsRef<[u8]>) -> Result<Option<T>>
where
    T: for<'b> minicbor::Decode<'b, ()>,
{
    tree.get(key)?.map(|bytes| decode(&bytes)).transpose()
}

pub(crate) fn put<T: minicbor::Encode<()>>(tree: &Tree, key: impl AsRef<[u8]>, value: &T) -> Result<()> {
    tree.insert(key.as_ref(), encode(value)?)?;
    Ok(())
}

/// Decodes every value in `tree`.
pub(crate) fn scan<T>(tree: &Tree) -> Result<Vec<T>>
where
    T: for<'b> minicbor::Decode<'b, ()>,
{
    tree.iter()
        .values()
        .map(|value| decode(&value?))
        .collect()
}

/// Lifts a service error into a transaction abort.
pub(crate) fn abort<T>(result: Result<T>) -> TxResult<T> {
    result.map_err(ConflictableTransactionError::Abort)
}

pub(crate) fn tx_get<T>(tree: &TransactionalTree, key: impl AsRef<[u8]>) -> TxResult<Option<T>>
where
    T: for<'b> minicbor::Decode<'b, ()>,
{
    match tree.get(key.as_ref())? {
        Some(bytes) => abort(decode(&bytes)).map(Some),
        None => Ok(None),
    }
}

pub(crate) fn tx_put<T: minicbor::Encode<()>>(
    tree: &TransactionalTree,
    key: impl AsRef<[u8]>,
    value: &T,
) -> TxResult<()> {
    let bytes = abort(encode(value))?;
    tree.insert(key.as_ref(), bytes)?;
    Ok(())
}

pub(crate) fn tx_ledger(tree: &TransactionalTree, kind: LedgerKind) -> TxResult<Ledger> {
    Ok(tx_get(tree, kind.key())?.unwrap_or_else(|| Ledger::new(kind)))
}

pub(crate) fn tx_put_ledger(tree: &TransactionalTree, ledger: &Ledger) -> TxResult<()> {
    tx_put(tree, ledger.kind.key(), ledger)
}

pub(crate) fn tx_put_entry(tree: &TransactionalTree, entry: &LedgerEntry) -> TxResult<()> {
    tx_put(tree, entry_key(entry.ledger, entry.sequence), entry)
}

/// Applies one movement to a ledger and writes both the ledger and the new
/// entry within the caller's transaction.
pub(crate) fn tx_apply(
    ledgers: &TransactionalTree,
    entries: &TransactionalTree,
    kind: LedgerKind,
    product: PetroleumType,
    signed_amount: f64,
    source: EntrySource,
    reference: &str,
) -> TxResult<Ledger> {
    let mut ledger = tx_ledger(ledgers, kind)?;
    let entry = abort(ledger.apply_transaction(product, signed_amount, source, reference))?;
    tx_put_ledger(ledgers, &ledger)?;
    tx_put_entry(entries, &entry)?;
    Ok(ledger)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_keys_sort_by_sequence_within_a_ledger() {
        let low = entry_key(LedgerKind::Storage, 255);
        let high = entry_key(LedgerKind::Storage, 256);
        assert!(low < high);
        assert!(low.starts_with(b"storage/"));
        assert!(!entry_key(LedgerKind::SalesFloor, 0).starts_with(&entry_prefix(LedgerKind::Storage)));
    }
}
