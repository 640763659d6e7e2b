//! Distribution orders: sales to customers, paid in one or more instalments.
//!
//! Totals are never trusted from the caller. [`Distribution::recompute`] runs
//! before every save and derives the amounts, the outstanding balance and the
//! automatic `approved -> completed` promotion.
use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{BackofficeError, Result};
use crate::types::{PetroleumType, TimeStamp};

#[derive(
    minicbor::Encode, minicbor::Decode, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq,
)]
#[cbor(index_only)]
#[serde(rename_all = "lowercase")]
pub enum DistributionStatus {
    #[n(0)]
    Pending,
    #[n(1)]
    Issued,
    #[n(2)]
    Lifting,
    #[n(3)]
    Approved,
    #[n(4)]
    Completed,
}

impl FromStr for DistributionStatus {
    type Err = BackofficeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(DistributionStatus::Pending),
            "issued" => Ok(DistributionStatus::Issued),
            "lifting" => Ok(DistributionStatus::Lifting),
            "approved" => Ok(DistributionStatus::Approved),
            "completed" => Ok(DistributionStatus::Completed),
            _ => Err(BackofficeError::Validation("Invalid status".into())),
        }
    }
}

#[derive(
    minicbor::Encode, minicbor::Decode, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq,
)]
#[cbor(index_only)]
#[serde(rename_all = "lowercase")]
pub enum PaymentType {
    #[n(0)]
    Cash,
    #[n(1)]
    Onbill,
}

impl FromStr for PaymentType {
    type Err = BackofficeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "cash" => Ok(PaymentType::Cash),
            "onbill" => Ok(PaymentType::Onbill),
            _ => Err(BackofficeError::Validation(
                "Payment type must be cash or onbill".into(),
            )),
        }
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Serialize, Debug, Clone, PartialEq)]
pub struct Payment {
    #[n(0)]
    pub amount: f64,
    #[n(1)]
    #[serde(rename = "type")]
    pub kind: PaymentType,
    #[n(2)]
    pub date: TimeStamp<Utc>,
    #[n(3)]
    pub description: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct NewPayment {
    pub amount: f64,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl NewPayment {
    pub fn new(amount: f64, kind: PaymentType) -> Self {
        Self {
            amount,
            kind: match kind {
                PaymentType::Cash => "cash".into(),
                PaymentType::Onbill => "onbill".into(),
            },
            description: None,
        }
    }

    pub fn into_payment(self) -> Result<Payment> {
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(BackofficeError::Validation(
                "Payment amount must be greater than zero".into(),
            ));
        }
        Ok(Payment {
            amount: self.amount,
            kind: self.kind.parse()?,
            date: TimeStamp::new(),
            description: self.description,
        })
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Signature {
    #[n(0)]
    pub name: String,
    #[n(1)]
    #[serde(default)]
    pub date: Option<TimeStamp<Utc>>,
}

#[derive(minicbor::Encode, minicbor::Decode, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Distribution {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub delivery_order: String,
    #[n(2)]
    pub status: DistributionStatus,
    #[n(3)]
    pub date: TimeStamp<Utc>,
    #[n(4)]
    pub customer_name: String,
    #[n(5)]
    pub address: String,
    #[n(6)]
    pub product: PetroleumType,
    #[n(7)]
    pub quantity_words: String,
    #[n(8)]
    pub gallons: f64,
    #[n(9)]
    pub unit_price: f64,
    #[n(10)]
    pub product_amount: f64,
    #[n(11)]
    pub total_amount: f64,
    #[n(12)]
    pub payments: Vec<Payment>,
    #[n(13)]
    pub total_paid: f64,
    #[n(14)]
    pub balance: f64,
    #[n(15)]
    pub lpo_number: Option<String>,
    #[n(16)]
    pub driver_signature: Option<Signature>,
    #[n(17)]
    pub truck_number: Option<String>,
    #[n(18)]
    pub customer_signature: Option<Signature>,
    #[n(19)]
    pub created_by: String,
    #[n(20)]
    pub approved_by: Option<String>,
    #[n(21)]
    pub approved_at: Option<TimeStamp<Utc>>,
    #[n(22)]
    pub created_at: TimeStamp<Utc>,
    #[n(23)]
    pub updated_at: TimeStamp<Utc>,
}

impl Distribution {
    /// Derives amounts, payment totals and the balance, then promotes a fully
    /// paid `approved` order to `completed`. Also refreshes `updated_at`.
    pub fn recompute(&mut self) {
        self.product_amount = self.gallons * self.unit_price;
        self.total_amount = self.product_amount;
        self.total_paid = self.payments.iter().map(|p| p.amount).sum();
        self.balance = self.total_amount - self.total_paid;

        if self.balance <= 0.0 && self.status == DistributionStatus::Approved {
            self.status = DistributionStatus::Completed;
        }
        self.updated_at = TimeStamp::new();
    }

    pub fn add_payment(&mut self, payment: Payment) {
        self.payments.push(payment);
        self.recompute();
    }
}

/// A delivery order number: `{year}-{sequence:06}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct DeliveryOrder {
    pub year: i32,
    pub sequence: u64,
}

impl DeliveryOrder {
    pub fn new(year: i32, sequence: u64) -> Self {
        Self { year, sequence }
    }
    /// Counter key for the year's sequence.
    pub fn counter_key(year: i32) -> String {
        format!("delivery-order/{year}")
    }
}

impl fmt::Display for DeliveryOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:06}", self.year, self.sequence)
    }
}

impl FromStr for DeliveryOrder {
    type Err = BackofficeError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || BackofficeError::Validation(format!("Invalid delivery order {s:?}"));
        let (year, sequence) = s.split_once('-').ok_or_else(invalid)?;
        Ok(Self {
            year: year.parse().map_err(|_| invalid())?,
            sequence: sequence.parse().map_err(|_| invalid())?,
        })
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewDistribution {
    pub customer_name: String,
    pub address: String,
    pub product: PetroleumType,
    pub quantity_words: String,
    pub gallons: f64,
    pub unit_price: f64,
    #[serde(default)]
    pub date: Option<TimeStamp<Utc>>,
    #[serde(default)]
    pub payments: Vec<NewPayment>,
    #[serde(default)]
    pub lpo_number: Option<String>,
    #[serde(default)]
    pub truck_number: Option<String>,
    #[serde(default)]
    pub driver_signature: Option<Signature>,
    #[serde(default)]
    pub customer_signature: Option<Signature>,
    pub created_by: String,
}

impl NewDistribution {
    pub fn new(
        customer_name: &str,
        product: PetroleumType,
        gallons: f64,
        unit_price: f64,
        created_by: &str,
    ) -> Self {
        Self {
            customer_name: customer_name.to_string(),
            address: "N/A".to_string(),
            product,
            quantity_words: format!("{gallons} gallons"),
            gallons,
            unit_price,
            date: None,
            payments: vec![],
            lpo_number: None,
            truck_number: None,
            driver_signature: None,
            customer_signature: None,
            created_by: created_by.to_string(),
        }
    }
    pub fn set_address(mut self, address: &str) -> Self {
        self.address = address.to_string();
        self
    }
    pub fn set_truck_number(mut self, truck: &str) -> Self {
        self.truck_number = Some(truck.to_string());
        self
    }
    pub fn add_payment(mut self, payment: NewPayment) -> Self {
        self.payments.push(payment);
        self
    }

    /// Validates the draft and builds a pending order. `delivery_order` is
    /// assigned by the caller from the per-year counter.
    pub fn validate_and_finalise(self, id: String, delivery_order: DeliveryOrder) -> Result<Distribution> {
        for (field, value) in [
            ("Customer name", &self.customer_name),
            ("Address", &self.address),
            ("Quantity in words", &self.quantity_words),
            ("Created by", &self.created_by),
        ] {
            if value.trim().is_empty() {
                return Err(BackofficeError::Validation(format!("{field} is required")));
            }
        }
        if !self.gallons.is_finite() || self.gallons <= 0.0 {
            return Err(BackofficeError::Validation(
                "Gallons must be greater than zero".into(),
            ));
        }
        if !self.unit_price.is_finite() || self.unit_price < 0.0 {
            return Err(BackofficeError::Validation(
                "Unit price cannot be negative".into(),
            ));
        }
        let payments = self
            .payments
            .into_iter()
            .map(NewPayment::into_payment)
            .collect::<Result<Vec<_>>>()?;

        let now = TimeStamp::new();
        let mut distribution = Distribution {
            id,
            delivery_order: delivery_order.to_string(),
            status: DistributionStatus::Pending,
            date: self.date.unwrap_or_else(|| now.clone()),
            customer_name: self.customer_name.trim().to_string(),
            address: self.address.trim().to_string(),
            product: self.product,
            quantity_words: self.quantity_words,
            gallons: self.gallons,
            unit_price: self.unit_price,
            product_amount: 0.0,
            total_amount: 0.0,
            payments,
            total_paid: 0.0,
            balance: 0.0,
            lpo_number: self.lpo_number,
            driver_signature: self.driver_signature,
            truck_number: self.truck_number,
            customer_signature: self.customer_signature,
            created_by: self.created_by,
            approved_by: None,
            approved_at: None,
            created_at: now.clone(),
            updated_at: now,
        };
        distribution.recompute();

        Ok(distribution)
    }
}
