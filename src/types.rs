//! Shared value types: timestamps, petroleum products and ledger vocabulary.
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::BackofficeError;

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct TimeStamp<T: TimeZone>(DateTime<T>);

impl PartialOrd for TimeStamp<Utc> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimeStamp<Utc> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl TimeStamp<Utc> {
    pub fn new() -> Self {
        Self(Utc::now())
    }
    /// Returns `None` for out-of-range components instead of panicking.
    pub fn new_with(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> Option<Self> {
        Utc.with_ymd_and_hms(year, month, day, hour, min, sec)
            .single()
            .filter(Self::storable)
            .map(Self)
    }
    pub fn year(&self) -> i32 {
        self.0.year()
    }
    /// Accepts RFC 3339 (`2025-03-01T10:00:00Z`) or a bare date (`2025-03-01`, midnight UTC).
    ///
    /// Dates the nanosecond storage encoding cannot hold (before 1677 or after 2262)
    /// are rejected here rather than at write time.
    pub fn parse(input: &str) -> Result<Self, BackofficeError> {
        let input = input.trim();
        let parsed = match DateTime::parse_from_rfc3339(input) {
            Ok(dt) => dt.with_timezone(&Utc),
            Err(_) => NaiveDate::parse_from_str(input, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc())
                .ok_or_else(|| BackofficeError::Validation(format!("Invalid date: {input}")))?,
        };
        Self::checked(parsed, input)
    }
    /// Like [`TimeStamp::parse`], but a bare date covers the whole day.
    pub fn parse_inclusive_end(input: &str) -> Result<Self, BackofficeError> {
        let parsed = Self::parse(input)?;
        if DateTime::parse_from_rfc3339(input.trim()).is_ok() {
            return Ok(parsed);
        }
        Self::checked(
            parsed.0 + chrono::Duration::days(1) - chrono::Duration::nanoseconds(1),
            input.trim(),
        )
    }

    fn storable(dt: &DateTime<Utc>) -> bool {
        dt.timestamp_nanos_opt().is_some()
    }

    fn checked(dt: DateTime<Utc>, input: &str) -> Result<Self, BackofficeError> {
        if Self::storable(&dt) {
            Ok(Self(dt))
        } else {
            Err(BackofficeError::Validation(format!("Date out of range: {input}")))
        }
    }
}

impl Default for TimeStamp<Utc> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> minicbor::Encode<C> for TimeStamp<Utc> {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        if let Some(nsec) = self.0.timestamp_nanos_opt() {
            return e.i64(nsec)?.ok();
        }

        Err(minicbor::encode::Error::message(
            "failed to encode timestamp. timestamp_nanos_opt returned None",
        ))
    }
}

impl<'b, C> minicbor::Decode<'b, C> for TimeStamp<Utc> {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let nsecs = d.i64()?;

        Ok(TimeStamp(DateTime::from_timestamp_nanos(nsecs)))
    }
}

impl Serialize for TimeStamp<Utc> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TimeStamp<Utc> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        TimeStamp::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Petroleum products held in the ledgers. `ATK` is canonical; `KERO` is accepted on input.
#[derive(
    minicbor::Encode, minicbor::Decode, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash,
)]
#[cbor(index_only)]
pub enum PetroleumType {
    #[n(0)]
    #[serde(rename = "PMS")]
    Pms,
    #[n(1)]
    #[serde(rename = "AGO")]
    Ago,
    #[n(2)]
    #[serde(rename = "ATK")]
    Atk,
}

impl PetroleumType {
    pub const ALL: [PetroleumType; 3] = [PetroleumType::Pms, PetroleumType::Ago, PetroleumType::Atk];

    pub fn as_str(&self) -> &'static str {
        match self {
            PetroleumType::Pms => "PMS",
            PetroleumType::Ago => "AGO",
            PetroleumType::Atk => "ATK",
        }
    }
}

impl fmt::Display for PetroleumType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PetroleumType {
    type Err = BackofficeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PMS" => Ok(PetroleumType::Pms),
            "AGO" => Ok(PetroleumType::Ago),
            "ATK" | "KERO" => Ok(PetroleumType::Atk),
            other => Err(BackofficeError::Validation(format!(
                "Invalid petroleum type {other:?}. Must be PMS, AGO, or ATK"
            ))),
        }
    }
}

impl<'de> Deserialize<'de> for PetroleumType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// The two stock-holding locations. Each one owns exactly one ledger.
#[derive(
    minicbor::Encode,
    minicbor::Decode,
    Serialize,
    Deserialize,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
)]
#[cbor(index_only)]
#[serde(rename_all = "camelCase")]
pub enum LedgerKind {
    #[n(0)]
    Storage,
    #[n(1)]
    SalesFloor,
}

impl LedgerKind {
    /// Key of the ledger document in the ledgers tree.
    pub fn key(&self) -> &'static [u8] {
        match self {
            LedgerKind::Storage => b"storage",
            LedgerKind::SalesFloor => b"sales-floor",
        }
    }
}

impl fmt::Display for LedgerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerKind::Storage => f.write_str("storage"),
            LedgerKind::SalesFloor => f.write_str("sales floor"),
        }
    }
}

impl FromStr for LedgerKind {
    type Err = BackofficeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "storage" => Ok(LedgerKind::Storage),
            "salesFloor" | "sales-floor" => Ok(LedgerKind::SalesFloor),
            _ => Err(BackofficeError::Validation("Invalid type specified".into())),
        }
    }
}

#[derive(
    minicbor::Encode,
    minicbor::Decode,
    Serialize,
    Deserialize,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
)]
#[cbor(index_only)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[n(0)]
    Addition,
    #[n(1)]
    Reduction,
}

/// What caused a ledger movement.
#[derive(
    minicbor::Encode,
    minicbor::Decode,
    Serialize,
    Deserialize,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
)]
#[cbor(index_only)]
#[serde(rename_all = "lowercase")]
pub enum EntrySource {
    #[n(0)]
    Import,
    #[n(1)]
    Transfer,
    #[n(2)]
    Distribution,
    #[n(3)]
    Adjustment,
}

/// Two-state lifecycle shared by transfer forms and importer agreements.
#[derive(
    minicbor::Encode,
    minicbor::Decode,
    Serialize,
    Deserialize,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
)]
#[cbor(index_only)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    #[n(0)]
    Pending,
    #[n(1)]
    Approved,
}

impl FromStr for ApprovalStatus {
    type Err = BackofficeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ApprovalStatus::Pending),
            "approved" => Ok(ApprovalStatus::Approved),
            _ => Err(BackofficeError::Validation("Invalid status".into())),
        }
    }
}
