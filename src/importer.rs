//! Importer agreements: inbound stock bought from a supplier into storage.
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{BackofficeError, Result};
use crate::types::{ApprovalStatus, PetroleumType, TimeStamp};

#[derive(minicbor::Encode, minicbor::Decode, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImporterAgreement {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub transfer_number: String, // unique across agreements
    #[n(2)]
    pub petroleum_type: PetroleumType,
    #[n(3)]
    pub date: TimeStamp<Utc>,
    #[n(4)]
    pub buying_importer: String,
    #[n(5)]
    pub buying_importers_representative: Option<String>,
    #[n(6)]
    pub quantity_words: String,
    #[n(7)]
    pub quantity_number: f64,
    #[n(8)]
    pub selling_importer: String,
    #[n(9)]
    pub selling_importers_representative: Option<String>,
    #[n(10)]
    pub dmd_operations: Option<String>,
    #[n(11)]
    pub located_at: String,
    #[n(12)]
    pub stock_in_tank: f64,
    #[n(13)]
    pub operations_manager: Option<String>,
    #[n(14)]
    pub managing_director: Option<String>,
    #[n(15)]
    pub status: ApprovalStatus,
    #[n(16)]
    pub created_at: TimeStamp<Utc>,
    #[n(17)]
    pub updated_at: TimeStamp<Utc>,
}

impl ImporterAgreement {
    pub fn ledger_reference(&self) -> String {
        format!(
            "Transfer #{} approved - Importer Agreement",
            self.transfer_number
        )
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewImporterAgreement {
    pub transfer_number: String,
    pub petroleum_type: PetroleumType,
    #[serde(default)]
    pub date: Option<TimeStamp<Utc>>,
    pub buying_importer: String,
    #[serde(default)]
    pub buying_importers_representative: Option<String>,
    pub quantity_words: String,
    pub quantity_number: f64,
    pub selling_importer: String,
    #[serde(default)]
    pub selling_importers_representative: Option<String>,
    #[serde(default)]
    pub dmd_operations: Option<String>,
    pub located_at: String,
    pub stock_in_tank: f64,
    #[serde(default)]
    pub operations_manager: Option<String>,
    #[serde(default)]
    pub managing_director: Option<String>,
}

fn require(field: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(BackofficeError::Validation(format!("{field} is required")));
    }
    Ok(value.to_string())
}

impl NewImporterAgreement {
    pub fn validate_and_finalise(self, id: String) -> Result<ImporterAgreement> {
        let transfer_number = require("Transfer number", &self.transfer_number)?;
        let buying_importer = require("Buying importer", &self.buying_importer)?;
        let selling_importer = require("Selling importer", &self.selling_importer)?;
        let quantity_words = require("Quantity in words", &self.quantity_words)?;
        let located_at = require("Location", &self.located_at)?;

        if !self.quantity_number.is_finite() || self.quantity_number <= 0.0 {
            return Err(BackofficeError::Validation(
                "Quantity must be greater than zero".into(),
            ));
        }
        if !self.stock_in_tank.is_finite() || self.stock_in_tank < 0.0 {
            return Err(BackofficeError::Validation(
                "Stock in tank cannot be negative".into(),
            ));
        }

        let now = TimeStamp::new();
        Ok(ImporterAgreement {
            id,
            transfer_number,
            petroleum_type: self.petroleum_type,
            date: self.date.unwrap_or_else(|| now.clone()),
            buying_importer,
            buying_importers_representative: self.buying_importers_representative,
            quantity_words,
            quantity_number: self.quantity_number,
            selling_importer,
            selling_importers_representative: self.selling_importers_representative,
            dmd_operations: self.dmd_operations,
            located_at,
            stock_in_tank: self.stock_in_tank,
            operations_manager: self.operations_manager,
            managing_director: self.managing_director,
            status: ApprovalStatus::Pending,
            created_at: now.clone(),
            updated_at: now,
        })
    }
}
