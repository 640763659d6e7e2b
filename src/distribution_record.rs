//! Denormalised distribution log kept by the depot office. It has no effect
//! on the ledgers or on distribution orders.
use std::collections::HashSet;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{BackofficeError, Result};
use crate::types::TimeStamp;

#[derive(minicbor::Encode, minicbor::Decode, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DistributionRecord {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub date: TimeStamp<Utc>,
    #[n(2)]
    pub delivery_order_number: String,
    #[n(3)]
    pub truck_number: String,
    #[n(4)]
    pub pms_amount: f64,
    #[n(5)]
    pub ago_amount: f64,
    #[n(6)]
    pub customer_name: String,
    #[n(7)]
    pub company: String,
    #[n(8)]
    pub created_by: String,
    #[n(9)]
    pub created_at: TimeStamp<Utc>,
    #[n(10)]
    pub updated_at: TimeStamp<Utc>,
}

impl DistributionRecord {
    fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("Delivery order number", &self.delivery_order_number),
            ("Truck number", &self.truck_number),
            ("Customer name", &self.customer_name),
            ("Company", &self.company),
            ("Created by", &self.created_by),
        ] {
            if value.trim().is_empty() {
                return Err(BackofficeError::Validation(format!("{field} is required")));
            }
        }
        for amount in [self.pms_amount, self.ago_amount] {
            if !amount.is_finite() || amount < 0.0 {
                return Err(BackofficeError::Validation(
                    "Product amounts cannot be negative".into(),
                ));
            }
        }
        if self.pms_amount == 0.0 && self.ago_amount == 0.0 {
            return Err(BackofficeError::Validation(
                "At least one product amount (PMS or AGO) must be specified".into(),
            ));
        }
        Ok(())
    }

    /// Applies the editable fields of `update` and re-validates.
    pub fn apply_update(&mut self, update: DistributionRecordUpdate) -> Result<()> {
        let mut next = self.clone();
        if let Some(date) = update.date {
            next.date = date;
        }
        if let Some(truck_number) = update.truck_number {
            next.truck_number = truck_number;
        }
        if let Some(pms_amount) = update.pms_amount {
            next.pms_amount = pms_amount;
        }
        if let Some(ago_amount) = update.ago_amount {
            next.ago_amount = ago_amount;
        }
        if let Some(customer_name) = update.customer_name {
            next.customer_name = customer_name;
        }
        if let Some(company) = update.company {
            next.company = company;
        }
        next.validate()?;
        next.updated_at = TimeStamp::new();
        *self = next;
        Ok(())
    }

    pub fn within(&self, range: &DateRange) -> bool {
        range.start.as_ref().is_none_or(|start| &self.date >= start)
            && range.end.as_ref().is_none_or(|end| &self.date <= end)
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewDistributionRecord {
    #[serde(default)]
    pub date: Option<TimeStamp<Utc>>,
    pub delivery_order_number: String,
    pub truck_number: String,
    #[serde(default)]
    pub pms_amount: f64,
    #[serde(default)]
    pub ago_amount: f64,
    pub customer_name: String,
    pub company: String,
    pub created_by: String,
}

impl NewDistributionRecord {
    pub fn validate_and_finalise(self, id: String) -> Result<DistributionRecord> {
        let now = TimeStamp::new();
        let record = DistributionRecord {
            id,
            date: self.date.unwrap_or_else(|| now.clone()),
            delivery_order_number: self.delivery_order_number.trim().to_string(),
            truck_number: self.truck_number,
            pms_amount: self.pms_amount,
            ago_amount: self.ago_amount,
            customer_name: self.customer_name,
            company: self.company,
            created_by: self.created_by,
            created_at: now.clone(),
            updated_at: now,
        };
        record.validate()?;
        Ok(record)
    }
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DistributionRecordUpdate {
    pub date: Option<TimeStamp<Utc>>,
    pub truck_number: Option<String>,
    pub pms_amount: Option<f64>,
    pub ago_amount: Option<f64>,
    pub customer_name: Option<String>,
    pub company: Option<String>,
}

/// Inclusive date range; an open end is unbounded.
#[derive(Debug, Default, Clone)]
pub struct DateRange {
    pub start: Option<TimeStamp<Utc>>,
    pub end: Option<TimeStamp<Utc>>,
}

#[derive(Serialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DistributionSummary {
    pub total_pms: f64,
    pub total_ago: f64,
    pub record_count: u64,
    pub unique_customer_count: u64,
    pub unique_company_count: u64,
}

impl DistributionSummary {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a DistributionRecord>) -> Self {
        let mut summary = Self::default();
        let mut customers = HashSet::new();
        let mut companies = HashSet::new();
        for record in records {
            summary.total_pms += record.pms_amount;
            summary.total_ago += record.ago_amount;
            summary.record_count += 1;
            customers.insert(record.customer_name.as_str());
            companies.insert(record.company.as_str());
        }
        summary.unique_customer_count = customers.len() as u64;
        summary.unique_company_count = companies.len() as u64;
        summary
    }
}
