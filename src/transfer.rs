//! Transfer forms: requests to move stock from bulk storage to the sales floor.
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{BackofficeError, Result};
use crate::types::{ApprovalStatus, PetroleumType, TimeStamp};

#[derive(minicbor::Encode, minicbor::Decode, Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
pub struct ManagerSignature {
    #[n(0)]
    pub name: Option<String>,
    #[n(1)]
    pub title: Option<String>,
    #[n(2)]
    pub section: Option<String>,
    #[n(3)]
    pub company: Option<String>,
}

#[derive(minicbor::Encode, minicbor::Decode, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TransferForm {
    #[n(0)]
    pub id: String, // bech32 encoded uuid7, hrp "xfer"
    #[n(1)]
    pub form_number: String,
    #[n(2)]
    pub distributor: Option<String>,
    #[n(3)]
    pub petroleum_type: PetroleumType,
    #[n(4)]
    pub us_gallons: f64,
    #[n(5)]
    pub quantity: f64,
    #[n(6)]
    pub total: f64,
    #[n(7)]
    pub status: ApprovalStatus,
    #[n(8)]
    pub approved_by: Option<String>,
    #[n(9)]
    pub approved_at: Option<TimeStamp<Utc>>,
    #[n(10)]
    pub manager: Option<ManagerSignature>,
    #[n(11)]
    pub created_by: Option<String>,
    #[n(12)]
    pub created_at: TimeStamp<Utc>,
    #[n(13)]
    pub updated_at: TimeStamp<Utc>,
}

impl TransferForm {
    /// Reference written into both ledgers when the form is approved.
    pub fn ledger_reference(&self) -> String {
        format!("Transfer #{}", self.form_number)
    }
}

/// Draft of a transfer form as submitted by a client.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewTransferForm {
    form_number: String,
    #[serde(default)]
    distributor: Option<String>,
    petroleum_type: PetroleumType,
    #[serde(default)]
    us_gallons: f64,
    quantity: f64,
    #[serde(default)]
    total: f64,
    #[serde(default)]
    manager: Option<ManagerSignature>,
    #[serde(default)]
    created_by: Option<String>,
}

impl NewTransferForm {
    pub fn new(form_number: &str, petroleum_type: PetroleumType, quantity: f64) -> Self {
        Self {
            form_number: form_number.to_string(),
            distributor: None,
            petroleum_type,
            us_gallons: quantity,
            quantity,
            total: 0.0,
            manager: None,
            created_by: None,
        }
    }
    pub fn set_distributor(mut self, distributor: &str) -> Self {
        self.distributor = Some(distributor.to_string());
        self
    }
    pub fn set_us_gallons(mut self, us_gallons: f64) -> Self {
        self.us_gallons = us_gallons;
        self
    }
    pub fn set_total(mut self, total: f64) -> Self {
        self.total = total;
        self
    }
    pub fn set_manager(mut self, manager: ManagerSignature) -> Self {
        self.manager = Some(manager);
        self
    }
    pub fn set_created_by(mut self, user: &str) -> Self {
        self.created_by = Some(user.to_string());
        self
    }

    // Checks fields and returns a pending form stamped with `id`
    pub fn validate_and_finalise(self, id: String) -> Result<TransferForm> {
        if self.form_number.trim().is_empty() {
            return Err(BackofficeError::Validation("Form number is required".into()));
        }
        if !self.quantity.is_finite() || self.quantity <= 0.0 {
            return Err(BackofficeError::Validation(
                "Quantity must be greater than zero".into(),
            ));
        }
        if !self.us_gallons.is_finite() || self.us_gallons < 0.0 {
            return Err(BackofficeError::Validation("US gallons cannot be negative".into()));
        }
        if !self.total.is_finite() || self.total < 0.0 {
            return Err(BackofficeError::Validation("Total cannot be negative".into()));
        }

        let now = TimeStamp::new();
        Ok(TransferForm {
            id,
            form_number: self.form_number.trim().to_string(),
            distributor: self.distributor,
            petroleum_type: self.petroleum_type,
            us_gallons: self.us_gallons,
            quantity: self.quantity,
            total: self.total,
            status: ApprovalStatus::Pending,
            approved_by: None,
            approved_at: None,
            manager: self.manager,
            created_by: self.created_by,
            created_at: now.clone(),
            updated_at: now,
        })
    }
}
