//! JSON HTTP surface over [`BackofficeService`].
//!
//! Handlers are thin: they decode the request, call one service operation and
//! serialize its result. Every failure is a [`BackofficeError`] rendered as
//! `{"message": ...}` with the matching status code.
use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts, Path, Request, State};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{error, warn};

use crate::distribution::{NewDistribution, NewPayment};
use crate::distribution_record::{DateRange, DistributionRecordUpdate, NewDistributionRecord};
use crate::error::BackofficeError;
use crate::importer::NewImporterAgreement;
use crate::ledger::Balances;
use crate::pagination::PageRequest;
use crate::service::{BackofficeService, SalesFloorMovement, StorageMovement};
use crate::transfer::NewTransferForm;
use crate::types::{LedgerKind, TimeStamp};
use crate::user::{Credentials, NewUser, UserUpdate};

type Shared = Arc<BackofficeService>;
type ApiResult = Result<Response, BackofficeError>;

impl BackofficeError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::InsufficientBalance { .. } | Self::InvalidState(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Storage(_) | Self::Encode(_) | Self::Decode(_) | Self::Identifier(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for BackofficeError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = if self.is_client_error() {
            warn!(%status, error = %self, "request rejected");
            self.to_string()
        } else {
            error!(%status, error = %self, "request failed");
            "Internal server error".to_string()
        };
        (status, Json(json!({ "message": message }))).into_response()
    }
}

/// `Json` whose rejection is reported as a validation error.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = BackofficeError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection: JsonRejection| BackofficeError::Validation(rejection.body_text()))?;
        Ok(Self(value))
    }
}

/// `Query` whose rejection is reported as a validation error.
pub struct ApiQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = BackofficeError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let axum::extract::Query(value) =
            axum::extract::Query::<T>::from_request_parts(parts, state)
                .await
                .map_err(|rejection: QueryRejection| {
                    BackofficeError::Validation(rejection.body_text())
                })?;
        Ok(Self(value))
    }
}

fn ok<T: serde::Serialize>(value: T) -> ApiResult {
    Ok(Json(value).into_response())
}

fn created<T: serde::Serialize>(value: T) -> ApiResult {
    Ok((StatusCode::CREATED, Json(value)).into_response())
}

fn message(text: &str) -> ApiResult {
    ok(json!({ "message": text }))
}

pub fn router(service: Shared) -> Router {
    Router::new()
        .route("/api/storage/balance", get(storage_balance))
        .route(
            "/api/storage/transactions",
            get(storage_transactions).post(storage_movement),
        )
        .route(
            "/api/importer/agreements",
            get(list_agreements).post(create_agreement),
        )
        .route(
            "/api/importer/agreements/{id}",
            get(get_agreement).delete(delete_agreement),
        )
        .route(
            "/api/importer/agreements/{id}/status",
            patch(agreement_status),
        )
        .route("/api/sales-floor", get(sales_floor).post(sales_floor_movement))
        .route("/api/sales-floor/balance", get(sales_floor_balance))
        .route("/api/sales-floor/history", get(sales_floor_transactions))
        .route("/api/sales-floor/transactions", get(sales_floor_transactions))
        .route(
            "/api/transfer/transfers",
            get(list_transfers).post(create_transfer),
        )
        .route(
            "/api/transfer/transfers/{id}",
            get(get_transfer).delete(delete_transfer),
        )
        .route("/api/transfer/transfers/{id}/status", patch(transfer_status))
        .route(
            "/api/distribution/orders",
            get(list_distributions).post(create_distribution),
        )
        .route(
            "/api/distribution/orders/{id}",
            get(get_distribution).delete(delete_distribution),
        )
        .route(
            "/api/distribution/orders/{id}/status",
            patch(distribution_status),
        )
        .route(
            "/api/distribution/orders/{id}/payment",
            patch(distribution_payment),
        )
        .route(
            "/api/distribution-record/records",
            get(list_records).post(create_record),
        )
        .route(
            "/api/distribution-record/records/summary",
            get(record_summary),
        )
        .route(
            "/api/distribution-record/records/{id}",
            get(get_record).patch(update_record).delete(delete_record),
        )
        .route("/api/settings/balances", get(all_balances).post(set_balances))
        .route("/api/users/login", post(login))
        .route("/api/users", get(list_users).post(create_user))
        .route("/api/users/profile/{id}", get(user_profile))
        .route("/api/users/{id}/password", put(change_password))
        .route("/api/users/{id}/password/reset", post(reset_password))
        .route("/api/users/{id}", put(update_user).delete(delete_user))
        .with_state(service)
}

// storage

async fn storage_balance(State(service): State<Shared>) -> ApiResult {
    ok(service.ledger(LedgerKind::Storage)?.balances())
}

async fn storage_transactions(
    State(service): State<Shared>,
    ApiQuery(page): ApiQuery<PageRequest>,
) -> ApiResult {
    ok(service.ledger_entries(LedgerKind::Storage, page)?)
}

async fn storage_movement(
    State(service): State<Shared>,
    ApiJson(movement): ApiJson<StorageMovement>,
) -> ApiResult {
    created(service.record_storage_movement(movement)?)
}

// importer agreements

#[derive(Deserialize)]
struct AgreementStatus {
    status: String,
}

async fn list_agreements(
    State(service): State<Shared>,
    ApiQuery(page): ApiQuery<PageRequest>,
) -> ApiResult {
    ok(service.list_agreements(page)?)
}

async fn create_agreement(
    State(service): State<Shared>,
    ApiJson(draft): ApiJson<NewImporterAgreement>,
) -> ApiResult {
    created(service.create_agreement(draft)?)
}

async fn get_agreement(State(service): State<Shared>, Path(id): Path<String>) -> ApiResult {
    ok(service.agreement(&id)?)
}

async fn agreement_status(
    State(service): State<Shared>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<AgreementStatus>,
) -> ApiResult {
    ok(service.update_agreement_status(&id, &body.status)?)
}

async fn delete_agreement(State(service): State<Shared>, Path(id): Path<String>) -> ApiResult {
    service.delete_agreement(&id)?;
    message("Agreement deleted successfully")
}

// sales floor

async fn sales_floor(State(service): State<Shared>) -> ApiResult {
    ok(service.ledger_snapshot(LedgerKind::SalesFloor)?)
}

async fn sales_floor_balance(State(service): State<Shared>) -> ApiResult {
    ok(service.ledger(LedgerKind::SalesFloor)?.balances())
}

async fn sales_floor_transactions(
    State(service): State<Shared>,
    ApiQuery(page): ApiQuery<PageRequest>,
) -> ApiResult {
    ok(service.ledger_entries(LedgerKind::SalesFloor, page)?)
}

async fn sales_floor_movement(
    State(service): State<Shared>,
    ApiJson(movement): ApiJson<SalesFloorMovement>,
) -> ApiResult {
    ok(service.record_sales_floor_movement(movement)?)
}

// transfer forms

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusChange {
    status: String,
    #[serde(default)]
    approved_by: Option<String>,
}

async fn list_transfers(
    State(service): State<Shared>,
    ApiQuery(page): ApiQuery<PageRequest>,
) -> ApiResult {
    ok(service.list_transfers(page)?)
}

async fn create_transfer(
    State(service): State<Shared>,
    ApiJson(draft): ApiJson<NewTransferForm>,
) -> ApiResult {
    created(service.create_transfer(draft)?)
}

async fn get_transfer(State(service): State<Shared>, Path(id): Path<String>) -> ApiResult {
    ok(service.transfer(&id)?)
}

async fn transfer_status(
    State(service): State<Shared>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<StatusChange>,
) -> ApiResult {
    ok(service.update_transfer_status(&id, &body.status, body.approved_by.as_deref())?)
}

async fn delete_transfer(State(service): State<Shared>, Path(id): Path<String>) -> ApiResult {
    service.delete_transfer(&id)?;
    message("Transfer form deleted successfully")
}

// distribution orders

async fn list_distributions(
    State(service): State<Shared>,
    ApiQuery(page): ApiQuery<PageRequest>,
) -> ApiResult {
    ok(service.list_distributions(page)?)
}

async fn create_distribution(
    State(service): State<Shared>,
    ApiJson(draft): ApiJson<NewDistribution>,
) -> ApiResult {
    created(service.create_distribution(draft)?)
}

async fn get_distribution(State(service): State<Shared>, Path(id): Path<String>) -> ApiResult {
    ok(service.distribution(&id)?)
}

async fn distribution_status(
    State(service): State<Shared>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<StatusChange>,
) -> ApiResult {
    ok(service.update_distribution_status(&id, &body.status, body.approved_by.as_deref())?)
}

async fn distribution_payment(
    State(service): State<Shared>,
    Path(id): Path<String>,
    ApiJson(payment): ApiJson<NewPayment>,
) -> ApiResult {
    ok(service.add_payment(&id, payment)?)
}

async fn delete_distribution(State(service): State<Shared>, Path(id): Path<String>) -> ApiResult {
    service.delete_distribution(&id)?;
    message("Distribution order deleted")
}

// distribution records

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DateQuery {
    start_date: Option<String>,
    end_date: Option<String>,
}

impl DateQuery {
    fn into_range(self) -> Result<DateRange, BackofficeError> {
        Ok(DateRange {
            start: self.start_date.as_deref().map(TimeStamp::parse).transpose()?,
            end: self
                .end_date
                .as_deref()
                .map(TimeStamp::parse_inclusive_end)
                .transpose()?,
        })
    }
}

async fn list_records(
    State(service): State<Shared>,
    ApiQuery(query): ApiQuery<DateQuery>,
) -> ApiResult {
    ok(service.list_records(&query.into_range()?)?)
}

async fn create_record(
    State(service): State<Shared>,
    ApiJson(draft): ApiJson<NewDistributionRecord>,
) -> ApiResult {
    created(service.create_record(draft)?)
}

async fn record_summary(
    State(service): State<Shared>,
    ApiQuery(query): ApiQuery<DateQuery>,
) -> ApiResult {
    let range = query.into_range()?;
    ok(service.record_summary(range.start, range.end)?)
}

async fn get_record(State(service): State<Shared>, Path(id): Path<String>) -> ApiResult {
    ok(service.record(&id)?)
}

async fn update_record(
    State(service): State<Shared>,
    Path(id): Path<String>,
    ApiJson(update): ApiJson<DistributionRecordUpdate>,
) -> ApiResult {
    ok(service.update_record(&id, update)?)
}

async fn delete_record(State(service): State<Shared>, Path(id): Path<String>) -> ApiResult {
    service.delete_record(&id)?;
    message("Distribution record deleted successfully")
}

// settings

#[derive(Deserialize)]
struct BalanceTarget {
    #[serde(rename = "type")]
    kind: LedgerKind,
    #[serde(flatten)]
    balances: Balances,
}

async fn all_balances(State(service): State<Shared>) -> ApiResult {
    ok(service.balances()?)
}

async fn set_balances(
    State(service): State<Shared>,
    ApiJson(target): ApiJson<BalanceTarget>,
) -> ApiResult {
    service.set_balances(target.kind, target.balances)?;
    message(&format!("{} balances updated successfully", target.kind))
}

// users

#[derive(Deserialize)]
struct PasswordChange {
    password: String,
}

async fn login(
    State(service): State<Shared>,
    ApiJson(credentials): ApiJson<Credentials>,
) -> ApiResult {
    ok(json!({ "user": service.login(credentials)? }))
}

async fn list_users(State(service): State<Shared>) -> ApiResult {
    ok(service.list_users()?)
}

async fn create_user(
    State(service): State<Shared>,
    ApiJson(new): ApiJson<NewUser>,
) -> ApiResult {
    let user = service.create_user(new)?;
    created(json!({ "message": "User created successfully", "user": user }))
}

async fn user_profile(State(service): State<Shared>, Path(id): Path<String>) -> ApiResult {
    ok(service.user_profile(&id)?)
}

async fn change_password(
    State(service): State<Shared>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<PasswordChange>,
) -> ApiResult {
    service.change_password(&id, &body.password)?;
    message("Password updated successfully")
}

async fn reset_password(State(service): State<Shared>, Path(id): Path<String>) -> ApiResult {
    let temporary = service.reset_password(&id)?;
    ok(json!({
        "message": "Password reset successfully",
        "tempPassword": temporary,
    }))
}

async fn update_user(
    State(service): State<Shared>,
    Path(id): Path<String>,
    ApiJson(update): ApiJson<UserUpdate>,
) -> ApiResult {
    let user = service.update_user(&id, update)?;
    ok(json!({ "message": "User updated successfully", "user": user }))
}

async fn delete_user(State(service): State<Shared>, Path(id): Path<String>) -> ApiResult {
    service.delete_user(&id)?;
    message("User deleted successfully")
}
