use sled::Transactional;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{BackofficeService, load};
use crate::error::{BackofficeError, Result};
use crate::ledger::{Balances, Ledger, LedgerEntry, LedgerSnapshot};
use crate::pagination::{DEFAULT_LIMIT, Page, PageRequest};
use crate::store::{TxResult, abort, tx_apply, tx_ledger, tx_put_entry, tx_put_ledger};
use crate::transfer::TransferForm;
use crate::types::{Direction, EntrySource, LedgerKind, PetroleumType};

const SETTINGS_REFERENCE: &str = "Manual balance adjustment via settings";

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BalanceSheet {
    pub storage: Balances,
    pub sales_floor: Balances,
}

/// Manual movement into or out of bulk storage.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct StorageMovement {
    pub amount: f64,
    #[serde(rename = "type")]
    pub direction: Direction,
    pub petroleum_type: PetroleumType,
    pub description: String,
}

/// Manual sales-floor correction tied to an existing transfer form.
/// `amount` is signed: positive adds stock, negative removes it.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SalesFloorMovement {
    pub petroleum_type: PetroleumType,
    pub amount: f64,
    pub transfer_id: String,
    pub description: String,
}

impl BackofficeService {
    pub fn ledger(&self, kind: LedgerKind) -> Result<Ledger> {
        self.store.ledger(kind)
    }

    /// A ledger with its whole history, oldest entry first.
    pub fn ledger_snapshot(&self, kind: LedgerKind) -> Result<LedgerSnapshot> {
        Ok(LedgerSnapshot {
            ledger: self.store.ledger(kind)?,
            entries: self.store.ledger_entries(kind)?,
        })
    }

    /// Ledger entries, newest first.
    pub fn ledger_entries(&self, kind: LedgerKind, request: PageRequest) -> Result<Page<LedgerEntry>> {
        let mut entries = self.store.ledger_entries(kind)?;
        entries.reverse();
        Ok(Page::from_sorted(entries, request, DEFAULT_LIMIT))
    }

    pub fn balances(&self) -> Result<BalanceSheet> {
        Ok(BalanceSheet {
            storage: self.store.ledger(LedgerKind::Storage)?.balances(),
            sales_floor: self.store.ledger(LedgerKind::SalesFloor)?.balances(),
        })
    }

    /// Overwrites every quantity of one ledger. Each product that changes gets
    /// an adjustment entry carrying the signed difference.
    pub fn set_balances(&self, kind: LedgerKind, target: Balances) -> Result<Ledger> {
        for product in PetroleumType::ALL {
            let value = target.get(product);
            if !value.is_finite() || value < 0.0 {
                return Err(BackofficeError::Validation(format!(
                    "{product} balance cannot be negative"
                )));
            }
        }

        let trees = (&self.store.ledgers, &self.store.ledger_entries);
        let ledger = trees.transaction(|(ledgers, entries)| -> TxResult<Ledger> {
            let mut ledger = tx_ledger(ledgers, kind)?;
            for product in PetroleumType::ALL {
                let entry = abort(ledger.set_balance(
                    product,
                    target.get(product),
                    EntrySource::Adjustment,
                    SETTINGS_REFERENCE,
                ))?;
                if let Some(entry) = entry {
                    tx_put_entry(entries, &entry)?;
                }
            }
            tx_put_ledger(ledgers, &ledger)?;
            Ok(ledger)
        })?;

        info!(ledger = %kind, pms = target.pms, ago = target.ago, atk = target.atk, "balances set");
        Ok(ledger)
    }

    pub fn record_storage_movement(&self, movement: StorageMovement) -> Result<Ledger> {
        if !movement.amount.is_finite() || movement.amount <= 0.0 {
            return Err(BackofficeError::Validation(
                "Amount must be greater than zero".into(),
            ));
        }
        if movement.description.trim().is_empty() {
            return Err(BackofficeError::Validation("Description is required".into()));
        }
        let signed = match movement.direction {
            Direction::Addition => movement.amount,
            Direction::Reduction => -movement.amount,
        };

        self.apply_to_ledger(
            LedgerKind::Storage,
            movement.petroleum_type,
            signed,
            EntrySource::Adjustment,
            movement.description.trim(),
        )
    }

    pub fn record_sales_floor_movement(&self, movement: SalesFloorMovement) -> Result<Ledger> {
        if movement.description.trim().is_empty() || movement.transfer_id.trim().is_empty() {
            return Err(BackofficeError::Validation(
                "Missing required fields. Please provide petroleumType, amount, transferId, and description".into(),
            ));
        }
        let transfer: TransferForm =
            load(&self.store.transfers, movement.transfer_id.trim(), "Transfer")?;
        if transfer.petroleum_type != movement.petroleum_type {
            return Err(BackofficeError::Validation(format!(
                "Petroleum type mismatch. Transfer is for {} but received {}",
                transfer.petroleum_type, movement.petroleum_type
            )));
        }

        self.apply_to_ledger(
            LedgerKind::SalesFloor,
            movement.petroleum_type,
            movement.amount,
            EntrySource::Transfer,
            movement.description.trim(),
        )
    }

    fn apply_to_ledger(
        &self,
        kind: LedgerKind,
        product: PetroleumType,
        signed_amount: f64,
        source: EntrySource,
        reference: &str,
    ) -> Result<Ledger> {
        let trees = (&self.store.ledgers, &self.store.ledger_entries);
        let ledger = trees.transaction(|(ledgers, entries)| -> TxResult<Ledger> {
            tx_apply(ledgers, entries, kind, product, signed_amount, source, reference)
        })?;

        info!(ledger = %kind, %product, amount = signed_amount, reference, "ledger movement recorded");
        Ok(ledger)
    }
}
