use sled::Transactional;
use tracing::{debug, info};

use super::{BackofficeService, load, update_record};
use crate::distribution::{
    DeliveryOrder, Distribution, DistributionStatus, NewDistribution, NewPayment,
};
use crate::error::{BackofficeError, Result};
use crate::pagination::{Page, PageRequest};
use crate::store::{self, TxResult, abort, tx_apply, tx_get, tx_put};
use crate::types::{EntrySource, LedgerKind, TimeStamp};
use crate::utils;

const WHAT: &str = "Distribution order";
const DEFAULT_ORDER_LIMIT: u64 = 10;
const DEFAULT_APPROVER: &str = "System";

impl BackofficeService {
    /// Creates a pending order and assigns the next delivery order number of
    /// the current year. The counter bump and the insert share a transaction.
    pub fn create_distribution(&self, draft: NewDistribution) -> Result<Distribution> {
        let id = utils::new_uuid_to_bech32("dist")?;
        let year = TimeStamp::new().year();
        self.seed_delivery_counter(year)?;
        let counter_key = DeliveryOrder::counter_key(year);

        let distribution = (&self.store.distributions, &self.store.counters).transaction(
            |(distributions, counters)| -> TxResult<Distribution> {
                let sequence = tx_get::<u64>(counters, &counter_key)?.unwrap_or(0) + 1;
                let distribution = abort(
                    draft
                        .clone()
                        .validate_and_finalise(id.clone(), DeliveryOrder::new(year, sequence)),
                )?;
                tx_put(counters, &counter_key, &sequence)?;
                tx_put(distributions, &distribution.id, &distribution)?;
                Ok(distribution)
            },
        )?;

        info!(
            id = %distribution.id,
            delivery_order = %distribution.delivery_order,
            product = %distribution.product,
            gallons = distribution.gallons,
            "distribution order created"
        );
        Ok(distribution)
    }

    /// Starts a missing year counter from the highest delivery order already
    /// stored for that year, so orders written before the counter existed
    /// are never renumbered.
    fn seed_delivery_counter(&self, year: i32) -> Result<()> {
        let key = DeliveryOrder::counter_key(year);
        if self.store.counters.contains_key(&key)? {
            return Ok(());
        }

        let highest = store::scan::<Distribution>(&self.store.distributions)?
            .iter()
            .filter_map(|d| d.delivery_order.parse::<DeliveryOrder>().ok())
            .filter(|order| order.year == year)
            .map(|order| order.sequence)
            .max();

        if let Some(highest) = highest {
            let seeded = self.store.counters.compare_and_swap(
                key.as_bytes(),
                None::<&[u8]>,
                Some(store::encode(&highest)?),
            )?;
            match seeded {
                Ok(()) => debug!(year, highest, "delivery order counter seeded"),
                Err(_) => debug!(year, highest, "delivery order counter already seeded"),
            }
        }
        Ok(())
    }

    pub fn distribution(&self, id: &str) -> Result<Distribution> {
        load(&self.store.distributions, id, WHAT)
    }

    pub fn list_distributions(&self, request: PageRequest) -> Result<Page<Distribution>> {
        let mut orders: Vec<Distribution> = store::scan(&self.store.distributions)?;
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(Page::from_sorted(orders, request, DEFAULT_ORDER_LIMIT))
    }

    /// Sets the order status. Entering `approved` from any other status
    /// debits the sales floor by the order's gallons and stamps the approver
    /// (`System` when none is given); every other change is status only.
    pub fn update_distribution_status(
        &self,
        id: &str,
        status: &str,
        approved_by: Option<&str>,
    ) -> Result<Distribution> {
        let status: DistributionStatus = status.parse()?;
        let approver = approved_by
            .map(str::trim)
            .filter(|approver| !approver.is_empty())
            .unwrap_or(DEFAULT_APPROVER);

        let trees = (&self.store.ledgers, &self.store.ledger_entries, &self.store.distributions);
        let (distribution, debited) = trees.transaction(
            |(ledgers, entries, distributions)| -> TxResult<(Distribution, bool)> {
                let mut distribution: Distribution =
                    abort(tx_get(distributions, id)?.ok_or(BackofficeError::NotFound(WHAT)))?;

                let debit = status == DistributionStatus::Approved
                    && distribution.status != DistributionStatus::Approved;
                if debit {
                    tx_apply(
                        ledgers,
                        entries,
                        LedgerKind::SalesFloor,
                        distribution.product,
                        -distribution.gallons,
                        EntrySource::Distribution,
                        distribution.delivery_order.as_str(),
                    )?;
                    distribution.approved_by = Some(approver.to_string());
                    distribution.approved_at = Some(TimeStamp::new());
                }

                distribution.status = status;
                distribution.recompute();
                tx_put(distributions, id, &distribution)?;
                Ok((distribution, debit))
            },
        )?;

        if debited {
            info!(
                id,
                delivery_order = %distribution.delivery_order,
                product = %distribution.product,
                gallons = distribution.gallons,
                approver,
                "distribution order approved"
            );
        } else {
            debug!(id, status = ?distribution.status, "distribution status updated");
        }
        Ok(distribution)
    }

    /// Appends a payment and recomputes totals; a fully paid approved order
    /// becomes `completed`.
    pub fn add_payment(&self, id: &str, payment: NewPayment) -> Result<Distribution> {
        let payment = payment.into_payment()?;
        let distribution = update_record(
            &self.store.distributions,
            id,
            WHAT,
            |distribution: &mut Distribution| {
                distribution.add_payment(payment.clone());
                Ok(())
            },
        )?;

        info!(
            id,
            amount = payment.amount,
            balance = distribution.balance,
            status = ?distribution.status,
            "payment recorded"
        );
        Ok(distribution)
    }

    /// Deletes an order that is still `pending`.
    pub fn delete_distribution(&self, id: &str) -> Result<()> {
        self.store.distributions.transaction(|distributions| -> TxResult<()> {
            let distribution: Distribution =
                abort(tx_get(distributions, id)?.ok_or(BackofficeError::NotFound(WHAT)))?;
            if distribution.status != DistributionStatus::Pending {
                return abort(Err(BackofficeError::InvalidState(
                    "Can only delete pending distribution orders".into(),
                )));
            }
            distributions.remove(id)?;
            Ok(())
        })?;

        info!(id, "distribution order deleted");
        Ok(())
    }
}
