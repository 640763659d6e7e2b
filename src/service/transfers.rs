use sled::Transactional;
use tracing::info;

use super::{BackofficeService, load, update_record};
use crate::error::{BackofficeError, Result};
use crate::pagination::{DEFAULT_LIMIT, Page, PageRequest};
use crate::store::{self, TxResult, abort, tx_apply, tx_get, tx_put};
use crate::transfer::{NewTransferForm, TransferForm};
use crate::types::{ApprovalStatus, EntrySource, LedgerKind, TimeStamp};
use crate::utils;

const WHAT: &str = "Transfer form";

impl BackofficeService {
    /// Record a new transfer form in the `pending` state
    pub fn create_transfer(&self, draft: NewTransferForm) -> Result<TransferForm> {
        let form = draft.validate_and_finalise(utils::new_uuid_to_bech32("xfer")?)?;
        store::put(&self.store.transfers, &form.id, &form)?;

        info!(id = %form.id, form = %form.form_number, product = %form.petroleum_type, "transfer form created");
        Ok(form)
    }

    pub fn transfer(&self, id: &str) -> Result<TransferForm> {
        load(&self.store.transfers, id, WHAT)
    }

    /// Transfer forms, newest first.
    pub fn list_transfers(&self, request: PageRequest) -> Result<Page<TransferForm>> {
        let mut forms: Vec<TransferForm> = store::scan(&self.store.transfers)?;
        forms.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(Page::from_sorted(forms, request, DEFAULT_LIMIT))
    }

    /// Moves a transfer form to `status`.
    ///
    /// Approval debits storage and credits the sales floor by the form's
    /// quantity and stamps the approver, all in one transaction. An approved
    /// form is final: any further status change is rejected.
    pub fn update_transfer_status(
        &self,
        id: &str,
        status: &str,
        approved_by: Option<&str>,
    ) -> Result<TransferForm> {
        let status: ApprovalStatus = status.parse()?;
        let current: TransferForm = load(&self.store.transfers, id, WHAT)?;
        if current.status == ApprovalStatus::Approved {
            return Err(BackofficeError::Validation(
                "Transfer form is already approved".into(),
            ));
        }

        match status {
            ApprovalStatus::Pending => update_record(&self.store.transfers, id, WHAT, |form: &mut TransferForm| {
                form.updated_at = TimeStamp::new();
                Ok(())
            }),
            ApprovalStatus::Approved => {
                let approver = approved_by
                    .map(str::trim)
                    .filter(|approver| !approver.is_empty())
                    .ok_or_else(|| BackofficeError::Validation("Approval signature required".into()))?;
                self.approve_transfer(id, approver)
            }
        }
    }

    fn approve_transfer(&self, id: &str, approver: &str) -> Result<TransferForm> {
        let trees = (&self.store.ledgers, &self.store.ledger_entries, &self.store.transfers);
        let form = trees.transaction(|(ledgers, entries, transfers)| -> TxResult<TransferForm> {
            let mut form: TransferForm =
                abort(tx_get(transfers, id)?.ok_or(BackofficeError::NotFound(WHAT)))?;
            if form.status == ApprovalStatus::Approved {
                return abort(Err(BackofficeError::Validation(
                    "Transfer form is already approved".into(),
                )));
            }

            let reference = form.ledger_reference();
            tx_apply(
                ledgers,
                entries,
                LedgerKind::Storage,
                form.petroleum_type,
                -form.quantity,
                EntrySource::Transfer,
                &reference,
            )?;
            tx_apply(
                ledgers,
                entries,
                LedgerKind::SalesFloor,
                form.petroleum_type,
                form.quantity,
                EntrySource::Transfer,
                &reference,
            )?;

            let now = TimeStamp::new();
            form.status = ApprovalStatus::Approved;
            form.approved_by = Some(approver.to_string());
            form.approved_at = Some(now.clone());
            form.updated_at = now;

            tx_put(transfers, id, &form)?;
            Ok(form)
        })?;

        info!(
            id,
            form = %form.form_number,
            product = %form.petroleum_type,
            quantity = form.quantity,
            approver,
            "transfer approved"
        );
        Ok(form)
    }

    /// Deletes a pending transfer form.
    pub fn delete_transfer(&self, id: &str) -> Result<()> {
        self.store.transfers.transaction(|transfers| -> TxResult<()> {
            let form: TransferForm =
                abort(tx_get(transfers, id)?.ok_or(BackofficeError::NotFound(WHAT)))?;
            if form.status == ApprovalStatus::Approved {
                return abort(Err(BackofficeError::InvalidState(
                    "Cannot delete approved transfer".into(),
                )));
            }
            transfers.remove(id)?;
            Ok(())
        })?;

        info!(id, "transfer form deleted");
        Ok(())
    }
}
