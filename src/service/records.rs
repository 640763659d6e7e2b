use chrono::Utc;
use sled::Transactional;
use tracing::info;

use super::{BackofficeService, load};
use crate::distribution_record::{
    DateRange, DistributionRecord, DistributionRecordUpdate, DistributionSummary,
    NewDistributionRecord,
};
use crate::error::{BackofficeError, Result};
use crate::store::{self, TxResult, abort, tx_get, tx_put};
use crate::types::TimeStamp;
use crate::utils;

const WHAT: &str = "Distribution record";

impl BackofficeService {
    /// Logs a distribution. Delivery order numbers are unique across records.
    pub fn create_record(&self, draft: NewDistributionRecord) -> Result<DistributionRecord> {
        let record = draft.validate_and_finalise(utils::new_uuid_to_bech32("drec")?)?;

        (&self.store.records, &self.store.record_numbers).transaction(
            |(records, numbers)| -> TxResult<()> {
                let number = record.delivery_order_number.as_bytes();
                if numbers.get(number)?.is_some() {
                    return abort(Err(BackofficeError::Validation(format!(
                        "A record with delivery order number {} already exists",
                        record.delivery_order_number
                    ))));
                }
                numbers.insert(number, record.id.as_bytes())?;
                tx_put(records, &record.id, &record)?;
                Ok(())
            },
        )?;

        info!(id = %record.id, delivery_order = %record.delivery_order_number, "distribution record created");
        Ok(record)
    }

    /// Records within `range`, most recent date first.
    pub fn list_records(&self, range: &DateRange) -> Result<Vec<DistributionRecord>> {
        let mut records: Vec<DistributionRecord> = store::scan(&self.store.records)?;
        records.retain(|record| record.within(range));
        records.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(records)
    }

    pub fn record(&self, id: &str) -> Result<DistributionRecord> {
        load(&self.store.records, id, WHAT)
    }

    pub fn update_record(
        &self,
        id: &str,
        update: DistributionRecordUpdate,
    ) -> Result<DistributionRecord> {
        let record = super::update_record(
            &self.store.records,
            id,
            WHAT,
            |record: &mut DistributionRecord| record.apply_update(update.clone()),
        )?;

        info!(id, "distribution record updated");
        Ok(record)
    }

    pub fn delete_record(&self, id: &str) -> Result<()> {
        (&self.store.records, &self.store.record_numbers).transaction(
            |(records, numbers)| -> TxResult<()> {
                let record: DistributionRecord =
                    abort(tx_get(records, id)?.ok_or(BackofficeError::NotFound(WHAT)))?;
                numbers.remove(record.delivery_order_number.as_bytes())?;
                records.remove(id)?;
                Ok(())
            },
        )?;

        info!(id, "distribution record deleted");
        Ok(())
    }

    /// Totals over an inclusive date range. Both bounds are required.
    pub fn record_summary(
        &self,
        start: Option<TimeStamp<Utc>>,
        end: Option<TimeStamp<Utc>>,
    ) -> Result<DistributionSummary> {
        let (Some(start), Some(end)) = (start, end) else {
            return Err(BackofficeError::Validation(
                "Start date and end date are required".into(),
            ));
        };
        let records = self.list_records(&DateRange {
            start: Some(start),
            end: Some(end),
        })?;
        Ok(DistributionSummary::from_records(&records))
    }
}
