//! Service layer API for back-office operations.
//!
//! Every operation that touches more than one document (a ledger and the
//! workflow record that moved stock through it, or a record and its
//! uniqueness index) runs inside a single sled transaction.
use std::sync::Arc;

use sled::Tree;

use crate::error::{BackofficeError, Result};
use crate::store::{self, Store, TxResult, abort, tx_get, tx_put};

mod distributions;
mod importers;
mod ledgers;
mod records;
mod transfers;
mod users;

pub use ledgers::{BalanceSheet, SalesFloorMovement, StorageMovement};

pub struct BackofficeService {
    store: Store,
}

impl BackofficeService {
    pub fn new(instance: Arc<sled::Db>) -> Result<Self> {
        Ok(Self {
            store: Store::open(instance)?,
        })
    }

    pub fn flush(&self) -> Result<()> {
        self.store.flush()
    }
}

/// Loads a record or reports `what` as missing.
fn load<T>(tree: &Tree, id: &str, what: &'static str) -> Result<T>
where
    T: for<'b> minicbor::Decode<'b, ()>,
{
    store::get(tree, id)?.ok_or(BackofficeError::NotFound(what))
}

/// Read-modify-write of a single record inside a transaction.
fn update_record<T, F>(tree: &Tree, id: &str, what: &'static str, f: F) -> Result<T>
where
    T: minicbor::Encode<()> + for<'b> minicbor::Decode<'b, ()>,
    F: Fn(&mut T) -> Result<()>,
{
    let record = tree.transaction(|tx| -> TxResult<T> {
        let mut record: T = abort(tx_get(tx, id)?.ok_or(BackofficeError::NotFound(what)))?;
        abort(f(&mut record))?;
        tx_put(tx, id, &record)?;
        Ok(record)
    })?;
    Ok(record)
}
