//! Balance-plus-history records for the storage and sales-floor locations.
//!
//! A [`Ledger`] holds one quantity per [`PetroleumType`] and the sequence
//! number of its next entry. The only way to change a quantity is
//! [`Ledger::apply_transaction`], which refuses to go below zero and hands
//! back the matching [`LedgerEntry`]. Entries are stored one per key next to
//! the ledger, so the ledger document stays the same size as history grows.
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{BackofficeError, Result};
use crate::types::{Direction, EntrySource, LedgerKind, PetroleumType, TimeStamp};
use crate::utils;

#[derive(
    minicbor::Encode, minicbor::Decode, Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq,
)]
pub struct Balances {
    #[n(0)]
    pub pms: f64,
    #[n(1)]
    pub ago: f64,
    #[n(2)]
    pub atk: f64,
}

impl Balances {
    pub fn new(pms: f64, ago: f64, atk: f64) -> Self {
        Self { pms, ago, atk }
    }
    pub fn get(&self, product: PetroleumType) -> f64 {
        match product {
            PetroleumType::Pms => self.pms,
            PetroleumType::Ago => self.ago,
            PetroleumType::Atk => self.atk,
        }
    }
    fn get_mut(&mut self, product: PetroleumType) -> &mut f64 {
        match product {
            PetroleumType::Pms => &mut self.pms,
            PetroleumType::Ago => &mut self.ago,
            PetroleumType::Atk => &mut self.atk,
        }
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Serialize, Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub amount: f64, // always absolute, sign lives in `direction`
    #[n(2)]
    pub direction: Direction,
    #[n(3)]
    pub product: PetroleumType,
    #[n(4)]
    pub source: EntrySource,
    #[n(5)]
    pub reference: String,
    #[n(6)]
    pub date: TimeStamp<Utc>,
    #[n(7)]
    #[serde(skip)]
    pub ledger: LedgerKind,
    /// Position in the owning ledger's history, starting at zero.
    #[n(8)]
    #[serde(skip)]
    pub sequence: u64,
}

#[derive(minicbor::Encode, minicbor::Decode, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Ledger {
    #[n(0)]
    pub kind: LedgerKind,
    #[n(1)]
    #[serde(flatten)]
    balances: Balances,
    #[n(2)]
    entry_count: u64,
    /// Time of the last movement; `None` until the first one.
    #[n(3)]
    pub updated_at: Option<TimeStamp<Utc>>,
}

/// A ledger together with its full history, oldest entry first.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct LedgerSnapshot {
    #[serde(flatten)]
    pub ledger: Ledger,
    pub entries: Vec<LedgerEntry>,
}

impl Ledger {
    /// An empty ledger, as seen on first access to a location.
    pub fn new(kind: LedgerKind) -> Self {
        Self {
            kind,
            balances: Balances::default(),
            entry_count: 0,
            updated_at: None,
        }
    }
    pub fn balances(&self) -> Balances {
        self.balances
    }
    pub fn balance(&self, product: PetroleumType) -> f64 {
        self.balances.get(product)
    }
    /// Number of movements ever recorded; also the sequence of the next entry.
    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }

    /// Moves `signed_amount` gallons of `product` into (positive) or out of
    /// (negative) this ledger and records the movement.
    ///
    /// Fails with [`BackofficeError::InsufficientBalance`] when the quantity
    /// would drop below zero; the ledger is untouched in that case.
    pub fn apply_transaction(
        &mut self,
        product: PetroleumType,
        signed_amount: f64,
        source: EntrySource,
        reference: impl Into<String>,
    ) -> Result<LedgerEntry> {
        if !signed_amount.is_finite() || signed_amount == 0.0 {
            return Err(BackofficeError::Validation(
                "Amount must be a non-zero number of gallons".into(),
            ));
        }

        let current = self.balances.get(product);
        let new_value = current + signed_amount;
        if new_value < 0.0 {
            return Err(BackofficeError::InsufficientBalance {
                product,
                location: self.kind,
                available: current,
                required: signed_amount.abs(),
            });
        }

        self.record(product, new_value, signed_amount, source, reference.into())
    }

    /// Sets `product` to an absolute quantity, recording the difference as a
    /// single entry. Returns `None` when the quantity is already `target`.
    pub fn set_balance(
        &mut self,
        product: PetroleumType,
        target: f64,
        source: EntrySource,
        reference: impl Into<String>,
    ) -> Result<Option<LedgerEntry>> {
        if !target.is_finite() || target < 0.0 {
            return Err(BackofficeError::Validation(format!(
                "{product} balance cannot be negative"
            )));
        }
        let current = self.balances.get(product);
        if target == current {
            return Ok(None);
        }
        self.record(product, target, target - current, source, reference.into())
            .map(Some)
    }

    fn record(
        &mut self,
        product: PetroleumType,
        new_value: f64,
        delta: f64,
        source: EntrySource,
        reference: String,
    ) -> Result<LedgerEntry> {
        let direction = if delta > 0.0 {
            Direction::Addition
        } else {
            Direction::Reduction
        };
        let entry = LedgerEntry {
            id: utils::new_uuid_to_bech32("entry")?,
            amount: delta.abs(),
            direction,
            product,
            source,
            reference,
            date: TimeStamp::new(),
            ledger: self.kind,
            sequence: self.entry_count,
        };

        *self.balances.get_mut(product) = new_value;
        self.entry_count += 1;
        self.updated_at = Some(entry.date.clone());

        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addition_then_reduction() {
        let mut ledger = Ledger::new(LedgerKind::Storage);
        ledger
            .apply_transaction(PetroleumType::Pms, 100.0, EntrySource::Import, "Transfer #IMP-1")
            .unwrap();
        let entry = ledger
            .apply_transaction(PetroleumType::Pms, -40.0, EntrySource::Transfer, "Transfer #SPI-1")
            .unwrap();

        assert_eq!(entry.amount, 40.0);
        assert_eq!(entry.direction, Direction::Reduction);
        assert_eq!(entry.ledger, LedgerKind::Storage);
        assert_eq!(entry.sequence, 1);
        assert_eq!(ledger.balance(PetroleumType::Pms), 60.0);
        assert_eq!(ledger.entry_count(), 2);
        assert_eq!(ledger.updated_at, Some(entry.date));
    }

    #[test]
    fn untouched_ledger_is_stable() {
        let ledger = Ledger::new(LedgerKind::SalesFloor);

        assert_eq!(ledger, Ledger::new(LedgerKind::SalesFloor));
        assert_eq!(ledger.updated_at, None);
        assert_eq!(ledger.entry_count(), 0);
    }

    #[test]
    fn overdraw_leaves_ledger_untouched() {
        let mut ledger = Ledger::new(LedgerKind::SalesFloor);
        ledger
            .apply_transaction(PetroleumType::Ago, 10.0, EntrySource::Transfer, "t")
            .unwrap();
        let before = ledger.clone();

        let err = ledger
            .apply_transaction(PetroleumType::Ago, -10.5, EntrySource::Distribution, "2025-000001")
            .unwrap_err();

        assert!(matches!(
            err,
            BackofficeError::InsufficientBalance { available, required, .. }
                if available == 10.0 && required == 10.5
        ));
        assert_eq!(ledger, before);
    }

    #[test]
    fn zero_and_nan_amounts_are_rejected() {
        let mut ledger = Ledger::new(LedgerKind::Storage);
        assert!(ledger
            .apply_transaction(PetroleumType::Atk, 0.0, EntrySource::Adjustment, "x")
            .is_err());
        assert!(ledger
            .apply_transaction(PetroleumType::Atk, f64::NAN, EntrySource::Adjustment, "x")
            .is_err());
        assert_eq!(ledger.entry_count(), 0);
        assert_eq!(ledger.updated_at, None);
    }

    #[test]
    fn set_balance_records_the_difference() {
        let mut ledger = Ledger::new(LedgerKind::SalesFloor);
        ledger
            .apply_transaction(PetroleumType::Pms, 30.0, EntrySource::Transfer, "t")
            .unwrap();

        let entry = ledger
            .set_balance(PetroleumType::Pms, 12.0, EntrySource::Adjustment, "settings")
            .unwrap()
            .unwrap();
        assert_eq!(entry.direction, Direction::Reduction);
        assert_eq!(entry.amount, 18.0);
        assert_eq!(ledger.balance(PetroleumType::Pms), 12.0);
        assert_eq!(ledger.entry_count(), 2);

        let unchanged = ledger
            .set_balance(PetroleumType::Pms, 12.0, EntrySource::Adjustment, "settings")
            .unwrap();
        assert!(unchanged.is_none());
        assert!(ledger
            .set_balance(PetroleumType::Ago, -1.0, EntrySource::Adjustment, "settings")
            .is_err());
    }

    #[test]
    fn ledger_cbor_roundtrip() {
        let mut ledger = Ledger::new(LedgerKind::Storage);
        let entry = ledger
            .apply_transaction(PetroleumType::Atk, 12.5, EntrySource::Import, "ref")
            .unwrap();

        let encoded = minicbor::to_vec(&ledger).unwrap();
        let decoded: Ledger = minicbor::decode(&encoded).unwrap();
        assert_eq!(ledger, decoded);

        let encoded = minicbor::to_vec(&entry).unwrap();
        let decoded: LedgerEntry = minicbor::decode(&encoded).unwrap();
        assert_eq!(entry, decoded);
    }
}
