use sled::Transactional;
use tracing::info;

use super::{BackofficeService, load};
use crate::error::{BackofficeError, Result};
use crate::importer::{ImporterAgreement, NewImporterAgreement};
use crate::pagination::{DEFAULT_LIMIT, Page, PageRequest};
use crate::store::{self, TxResult, abort, tx_apply, tx_get, tx_put};
use crate::types::{ApprovalStatus, EntrySource, LedgerKind, TimeStamp};
use crate::utils;

const WHAT: &str = "Agreement";

impl BackofficeService {
    /// Records a pending agreement. Transfer numbers are unique.
    pub fn create_agreement(&self, draft: NewImporterAgreement) -> Result<ImporterAgreement> {
        let agreement = draft.validate_and_finalise(utils::new_uuid_to_bech32("imp")?)?;

        (&self.store.agreements, &self.store.agreement_numbers).transaction(
            |(agreements, numbers)| -> TxResult<()> {
                if numbers.get(agreement.transfer_number.as_bytes())?.is_some() {
                    return abort(Err(BackofficeError::Validation(format!(
                        "An agreement with transfer number {} already exists",
                        agreement.transfer_number
                    ))));
                }
                numbers.insert(agreement.transfer_number.as_bytes(), agreement.id.as_bytes())?;
                tx_put(agreements, &agreement.id, &agreement)?;
                Ok(())
            },
        )?;

        info!(id = %agreement.id, transfer = %agreement.transfer_number, "importer agreement created");
        Ok(agreement)
    }

    pub fn agreement(&self, id: &str) -> Result<ImporterAgreement> {
        load(&self.store.agreements, id, WHAT)
    }

    pub fn list_agreements(&self, request: PageRequest) -> Result<Page<ImporterAgreement>> {
        let mut agreements: Vec<ImporterAgreement> = store::scan(&self.store.agreements)?;
        agreements.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(Page::from_sorted(agreements, request, DEFAULT_LIMIT))
    }

    /// Moves an agreement to `status`. The first transition to `approved`
    /// credits storage with the agreed quantity; repeating it is a no-op.
    pub fn update_agreement_status(&self, id: &str, status: &str) -> Result<ImporterAgreement> {
        let status: ApprovalStatus = status.parse()?;

        let trees = (&self.store.ledgers, &self.store.ledger_entries, &self.store.agreements);
        let (agreement, credited) = trees.transaction(
            |(ledgers, entries, agreements)| -> TxResult<(ImporterAgreement, bool)> {
                let mut agreement: ImporterAgreement =
                    abort(tx_get(agreements, id)?.ok_or(BackofficeError::NotFound(WHAT)))?;

                let credited = match (agreement.status, status) {
                    (ApprovalStatus::Approved, ApprovalStatus::Pending) => {
                        return abort(Err(BackofficeError::InvalidState(
                            "Approved agreements cannot return to pending".into(),
                        )));
                    }
                    (ApprovalStatus::Pending, ApprovalStatus::Approved) => {
                        tx_apply(
                            ledgers,
                            entries,
                            LedgerKind::Storage,
                            agreement.petroleum_type,
                            agreement.quantity_number,
                            EntrySource::Import,
                            &agreement.ledger_reference(),
                        )?;
                        true
                    }
                    _ => false,
                };

                agreement.status = status;
                agreement.updated_at = TimeStamp::new();
                tx_put(agreements, id, &agreement)?;
                Ok((agreement, credited))
            },
        )?;

        if credited {
            info!(
                id,
                transfer = %agreement.transfer_number,
                product = %agreement.petroleum_type,
                quantity = agreement.quantity_number,
                "importer agreement approved"
            );
        }
        Ok(agreement)
    }

    /// Deletes an agreement that has not been approved.
    pub fn delete_agreement(&self, id: &str) -> Result<()> {
        (&self.store.agreements, &self.store.agreement_numbers).transaction(
            |(agreements, numbers)| -> TxResult<()> {
                let agreement: ImporterAgreement =
                    abort(tx_get(agreements, id)?.ok_or(BackofficeError::NotFound(WHAT)))?;
                if agreement.status == ApprovalStatus::Approved {
                    return abort(Err(BackofficeError::InvalidState(
                        "Cannot delete approved agreement".into(),
                    )));
                }
                numbers.remove(agreement.transfer_number.as_bytes())?;
                agreements.remove(id)?;
                Ok(())
            },
        )?;

        info!(id, "importer agreement deleted");
        Ok(())
    }
}
