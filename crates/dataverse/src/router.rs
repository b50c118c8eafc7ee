//! JSON API under `/api/v1`.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::contracts::{
    AccrualFilter, ContractFilter, ContractTerms, NewAccrual, NewAuthorContent, NewContract,
    NewContractor, NewPaymentScheme,
};
use crate::ids::{AccrualId, ContentId, ContractId, ContractorId, PaymentSchemeId, StaffId, ThreadId};
use crate::service::{DataverseService, ServiceError};
use crate::staff::{NewDepartment, NewStaffMember};
use crate::store::{DataError, DatasetRepository, RepositoryError};
use crate::threads::{NewEducationThread, ThreadFilter};

type Service<R> = State<Arc<DataverseService<R>>>;

/// Router builder exposing the record families and their derived statuses.
pub fn dataverse_router<R>(service: Arc<DataverseService<R>>) -> Router
where
    R: DatasetRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/contractors",
            get(list_contractors::<R>).post(register_contractor::<R>),
        )
        .route(
            "/api/v1/contractors/:id",
            get(get_contractor::<R>).delete(delete_contractor::<R>),
        )
        .route(
            "/api/v1/payment-schemes",
            get(list_payment_schemes::<R>).post(create_payment_scheme::<R>),
        )
        .route(
            "/api/v1/payment-schemes/:id",
            delete(delete_payment_scheme::<R>),
        )
        .route(
            "/api/v1/contents",
            get(list_contents::<R>).post(create_content::<R>),
        )
        .route("/api/v1/contents/:id", delete(delete_content::<R>))
        .route(
            "/api/v1/contracts",
            get(list_contracts::<R>).post(create_contract::<R>),
        )
        .route(
            "/api/v1/contracts/:id",
            get(get_contract::<R>).delete(delete_contract::<R>),
        )
        .route("/api/v1/contracts/:id/terms", put(attach_terms::<R>))
        .route("/api/v1/contracts/:id/supersede", post(supersede::<R>))
        .route("/api/v1/contracts/:id/terminate", post(terminate::<R>))
        .route("/api/v1/contracts/:id/suspend", post(suspend::<R>))
        .route("/api/v1/contracts/:id/resume", post(resume::<R>))
        .route("/api/v1/contracts/:id/chain", get(chain::<R>))
        .route("/api/v1/contracts/:id/latest", get(latest_version::<R>))
        .route(
            "/api/v1/contracts/:id/managers",
            get(list_managers::<R>).post(assign_manager::<R>),
        )
        .route(
            "/api/v1/accruals",
            get(list_accruals::<R>).post(record_accrual::<R>),
        )
        .route("/api/v1/accruals/import", post(import_accruals::<R>))
        .route("/api/v1/accruals/:id", get(get_accrual::<R>))
        .route("/api/v1/accruals/:id/confirm", post(confirm_accrual::<R>))
        .route("/api/v1/accruals/:id/pay", post(pay_accrual::<R>))
        .route(
            "/api/v1/threads",
            get(list_threads::<R>).post(create_thread::<R>),
        )
        .route(
            "/api/v1/threads/:id",
            get(get_thread::<R>).delete(delete_thread::<R>),
        )
        .route("/api/v1/threads/:id/contracts", post(assign_contract::<R>))
        .route(
            "/api/v1/threads/:id/contracts/:contract",
            delete(unassign_contract::<R>),
        )
        .route(
            "/api/v1/staff",
            get(list_staff::<R>).post(register_staff::<R>),
        )
        .route(
            "/api/v1/departments",
            get(list_departments::<R>).post(create_department::<R>),
        )
        .route("/api/v1/summary", get(summary::<R>))
        .with_state(service)
}

/// Optional evaluation instant for derived statuses; defaults to now.
#[derive(Debug, Default, Deserialize)]
pub struct AtQuery {
    #[serde(default)]
    pub at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct SupersedeRequest {
    pub replacement: ContractId,
}

#[derive(Debug, Default, Deserialize)]
pub struct TerminateRequest {
    #[serde(default)]
    pub on: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TimestampRequest {
    #[serde(default)]
    pub at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct ManagerRequest {
    pub manager: StaffId,
}

#[derive(Debug, Deserialize)]
pub struct AssignmentRequest {
    pub contract: ContractId,
}

pub(crate) fn status_for(error: &ServiceError) -> StatusCode {
    match error {
        ServiceError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
        ServiceError::Import(_) => StatusCode::BAD_REQUEST,
        ServiceError::Data(source) | ServiceError::LedgerRow { source, .. } => match source {
            DataError::NotFound { .. } => StatusCode::NOT_FOUND,
            DataError::Duplicate { .. } | DataError::Protected { .. } | DataError::Conflict(_) => {
                StatusCode::CONFLICT
            }
            DataError::Invalid { .. } | DataError::UnknownContractNumber(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
        },
    }
}

/// Run a service call on the blocking pool. Snapshot-backed writes sync to
/// disk while holding the dataset lock.
async fn blocking<R, T, F>(service: Arc<DataverseService<R>>, call: F) -> Result<T, ServiceError>
where
    R: DatasetRepository + 'static,
    T: Send + 'static,
    F: FnOnce(&DataverseService<R>) -> Result<T, ServiceError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || call(&service))
        .await
        .map_err(|err| {
            ServiceError::Repository(RepositoryError::Unavailable(format!(
                "service task failed: {err}"
            )))
        })?
}

fn respond<T: Serialize>(status: StatusCode, result: Result<T, ServiceError>) -> Response {
    match result {
        Ok(body) => (status, Json(body)).into_response(),
        Err(error) => {
            let payload = json!({
                "error": error.to_string(),
            });
            (status_for(&error), Json(payload)).into_response()
        }
    }
}

async fn list_contractors<R: DatasetRepository + 'static>(
    State(service): Service<R>,
) -> Response {
    let result = blocking(service, move |service| service.contractors()).await;
    respond(StatusCode::OK, result)
}

async fn register_contractor<R: DatasetRepository + 'static>(
    State(service): Service<R>,
    Json(new): Json<NewContractor>,
) -> Response {
    let result = blocking(service, move |service| service.register_contractor(new)).await;
    respond(StatusCode::CREATED, result)
}

async fn get_contractor<R: DatasetRepository + 'static>(
    State(service): Service<R>,
    Path(id): Path<u64>,
) -> Response {
    let result = blocking(service, move |service| service.contractor(ContractorId(id))).await;
    respond(StatusCode::OK, result)
}

async fn delete_contractor<R: DatasetRepository + 'static>(
    State(service): Service<R>,
    Path(id): Path<u64>,
) -> Response {
    let result = blocking(service, move |service| service.delete_contractor(ContractorId(id))).await;
    respond(StatusCode::OK, result)
}

async fn list_payment_schemes<R: DatasetRepository + 'static>(
    State(service): Service<R>,
) -> Response {
    let result = blocking(service, move |service| service.payment_schemes()).await;
    respond(StatusCode::OK, result)
}

async fn create_payment_scheme<R: DatasetRepository + 'static>(
    State(service): Service<R>,
    Json(new): Json<NewPaymentScheme>,
) -> Response {
    let result = blocking(service, move |service| service.create_payment_scheme(new)).await;
    respond(StatusCode::CREATED, result)
}

async fn delete_payment_scheme<R: DatasetRepository + 'static>(
    State(service): Service<R>,
    Path(id): Path<u64>,
) -> Response {
    let result = blocking(service, move |service| service.delete_payment_scheme(PaymentSchemeId(id))).await;
    respond(StatusCode::OK, result)
}

async fn list_contents<R: DatasetRepository + 'static>(State(service): Service<R>) -> Response {
    let result = blocking(service, move |service| service.contents()).await;
    respond(StatusCode::OK, result)
}

async fn create_content<R: DatasetRepository + 'static>(
    State(service): Service<R>,
    Json(new): Json<NewAuthorContent>,
) -> Response {
    let result = blocking(service, move |service| service.create_content(new)).await;
    respond(StatusCode::CREATED, result)
}

async fn delete_content<R: DatasetRepository + 'static>(
    State(service): Service<R>,
    Path(id): Path<u64>,
) -> Response {
    let result = blocking(service, move |service| service.delete_content(ContentId(id))).await;
    respond(StatusCode::OK, result)
}

async fn list_contracts<R: DatasetRepository + 'static>(
    State(service): Service<R>,
    Query(filter): Query<ContractFilter>,
    Query(at): Query<AtQuery>,
) -> Response {
    let result = blocking(service, move |service| service.contracts(&filter, at.at)).await;
    respond(StatusCode::OK, result)
}

async fn create_contract<R: DatasetRepository + 'static>(
    State(service): Service<R>,
    Json(new): Json<NewContract>,
) -> Response {
    let result = blocking(service, move |service| service.create_contract(new)).await;
    respond(StatusCode::CREATED, result)
}

async fn get_contract<R: DatasetRepository + 'static>(
    State(service): Service<R>,
    Path(id): Path<u64>,
    Query(at): Query<AtQuery>,
) -> Response {
    let result = blocking(service, move |service| service.contract(ContractId(id), at.at)).await;
    respond(StatusCode::OK, result)
}

async fn delete_contract<R: DatasetRepository + 'static>(
    State(service): Service<R>,
    Path(id): Path<u64>,
) -> Response {
    let result = blocking(service, move |service| service.delete_contract(ContractId(id))).await;
    respond(StatusCode::OK, result)
}

async fn attach_terms<R: DatasetRepository + 'static>(
    State(service): Service<R>,
    Path(id): Path<u64>,
    Json(terms): Json<ContractTerms>,
) -> Response {
    let result = blocking(service, move |service| service.attach_terms(ContractId(id), terms)).await;
    respond(StatusCode::OK, result)
}

async fn supersede<R: DatasetRepository + 'static>(
    State(service): Service<R>,
    Path(id): Path<u64>,
    Json(request): Json<SupersedeRequest>,
) -> Response {
    let result = blocking(service, move |service| service.supersede(ContractId(id), request.replacement)).await;
    respond(StatusCode::OK, result)
}

async fn terminate<R: DatasetRepository + 'static>(
    State(service): Service<R>,
    Path(id): Path<u64>,
    Json(request): Json<TerminateRequest>,
) -> Response {
    let result = blocking(service, move |service| service.terminate(ContractId(id), request.on)).await;
    respond(StatusCode::OK, result)
}

async fn suspend<R: DatasetRepository + 'static>(
    State(service): Service<R>,
    Path(id): Path<u64>,
) -> Response {
    let result = blocking(service, move |service| service.set_accruals_allowed(ContractId(id), false)).await;
    respond(StatusCode::OK, result)
}

async fn resume<R: DatasetRepository + 'static>(
    State(service): Service<R>,
    Path(id): Path<u64>,
) -> Response {
    let result = blocking(service, move |service| service.set_accruals_allowed(ContractId(id), true)).await;
    respond(StatusCode::OK, result)
}

async fn chain<R: DatasetRepository + 'static>(
    State(service): Service<R>,
    Path(id): Path<u64>,
    Query(at): Query<AtQuery>,
) -> Response {
    let result = blocking(service, move |service| service.chain(ContractId(id), at.at)).await;
    respond(StatusCode::OK, result)
}

async fn latest_version<R: DatasetRepository + 'static>(
    State(service): Service<R>,
    Path(id): Path<u64>,
    Query(at): Query<AtQuery>,
) -> Response {
    let result = blocking(service, move |service| service.latest_version(ContractId(id), at.at)).await;
    respond(StatusCode::OK, result)
}

async fn list_managers<R: DatasetRepository + 'static>(
    State(service): Service<R>,
    Path(id): Path<u64>,
) -> Response {
    let result = blocking(service, move |service| service.managers(ContractId(id))).await;
    respond(StatusCode::OK, result)
}

async fn assign_manager<R: DatasetRepository + 'static>(
    State(service): Service<R>,
    Path(id): Path<u64>,
    Json(request): Json<ManagerRequest>,
) -> Response {
    let result = blocking(service, move |service| service.assign_manager(ContractId(id), request.manager)).await;
    respond(StatusCode::CREATED, result)
}

async fn list_accruals<R: DatasetRepository + 'static>(
    State(service): Service<R>,
    Query(filter): Query<AccrualFilter>,
    Query(at): Query<AtQuery>,
) -> Response {
    let result = blocking(service, move |service| service.accruals(&filter, at.at)).await;
    respond(StatusCode::OK, result)
}

async fn record_accrual<R: DatasetRepository + 'static>(
    State(service): Service<R>,
    Json(new): Json<NewAccrual>,
) -> Response {
    let result = blocking(service, move |service| service.record_accrual(new)).await;
    respond(StatusCode::CREATED, result)
}

/// Body is the raw CSV ledger.
async fn import_accruals<R: DatasetRepository + 'static>(
    State(service): Service<R>,
    body: String,
) -> Response {
    let result = blocking(service, move |service| service.import_accruals(body.as_bytes())).await;
    respond(StatusCode::CREATED, result)
}

async fn get_accrual<R: DatasetRepository + 'static>(
    State(service): Service<R>,
    Path(id): Path<u64>,
    Query(at): Query<AtQuery>,
) -> Response {
    let result = blocking(service, move |service| service.accrual(AccrualId(id), at.at)).await;
    respond(StatusCode::OK, result)
}

async fn confirm_accrual<R: DatasetRepository + 'static>(
    State(service): Service<R>,
    Path(id): Path<u64>,
    Json(request): Json<TimestampRequest>,
) -> Response {
    let result = blocking(service, move |service| service.confirm_accrual(AccrualId(id), request.at)).await;
    respond(StatusCode::OK, result)
}

async fn pay_accrual<R: DatasetRepository + 'static>(
    State(service): Service<R>,
    Path(id): Path<u64>,
    Json(request): Json<TimestampRequest>,
) -> Response {
    let result = blocking(service, move |service| service.pay_accrual(AccrualId(id), request.at)).await;
    respond(StatusCode::OK, result)
}

async fn list_threads<R: DatasetRepository + 'static>(
    State(service): Service<R>,
    Query(filter): Query<ThreadFilter>,
    Query(at): Query<AtQuery>,
) -> Response {
    let result = blocking(service, move |service| service.threads(&filter, at.at)).await;
    respond(StatusCode::OK, result)
}

async fn create_thread<R: DatasetRepository + 'static>(
    State(service): Service<R>,
    Json(new): Json<NewEducationThread>,
) -> Response {
    let result = blocking(service, move |service| service.create_thread(new)).await;
    respond(StatusCode::CREATED, result)
}

async fn get_thread<R: DatasetRepository + 'static>(
    State(service): Service<R>,
    Path(id): Path<u64>,
    Query(at): Query<AtQuery>,
) -> Response {
    let result = blocking(service, move |service| service.thread(ThreadId(id), at.at)).await;
    respond(StatusCode::OK, result)
}

async fn delete_thread<R: DatasetRepository + 'static>(
    State(service): Service<R>,
    Path(id): Path<u64>,
) -> Response {
    let result = blocking(service, move |service| service.delete_thread(ThreadId(id))).await;
    respond(StatusCode::OK, result)
}

async fn assign_contract<R: DatasetRepository + 'static>(
    State(service): Service<R>,
    Path(id): Path<u64>,
    Json(request): Json<AssignmentRequest>,
) -> Response {
    let result = blocking(service, move |service| service.assign_contract(ThreadId(id), request.contract)).await;
    respond(StatusCode::CREATED, result)
}

async fn unassign_contract<R: DatasetRepository + 'static>(
    State(service): Service<R>,
    Path((id, contract)): Path<(u64, u64)>,
) -> Response {
    let result = blocking(service, move |service| service.unassign_contract(ThreadId(id), ContractId(contract))).await;
    respond(StatusCode::OK, result)
}

async fn list_staff<R: DatasetRepository + 'static>(State(service): Service<R>) -> Response {
    let result = blocking(service, move |service| service.staff()).await;
    respond(StatusCode::OK, result)
}

async fn register_staff<R: DatasetRepository + 'static>(
    State(service): Service<R>,
    Json(new): Json<NewStaffMember>,
) -> Response {
    let result = blocking(service, move |service| service.register_staff(new)).await;
    respond(StatusCode::CREATED, result)
}

async fn list_departments<R: DatasetRepository + 'static>(
    State(service): Service<R>,
) -> Response {
    let result = blocking(service, move |service| service.departments()).await;
    respond(StatusCode::OK, result)
}

async fn create_department<R: DatasetRepository + 'static>(
    State(service): Service<R>,
    Json(new): Json<NewDepartment>,
) -> Response {
    let result = blocking(service, move |service| service.create_department(new)).await;
    respond(StatusCode::CREATED, result)
}

async fn summary<R: DatasetRepository + 'static>(
    State(service): Service<R>,
    Query(at): Query<AtQuery>,
) -> Response {
    let result = blocking(service, move |service| service.summary(at.at)).await;
    respond(StatusCode::OK, result)
}
