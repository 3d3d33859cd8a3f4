// src/services/api_server.rs
//! HTTP API for the cold chain ledger.
//!
//! Exposes the ledger operations to administrative callers, issuers and
//! auditors as JSON endpoints:
//! - Entity registration and lookup
//! - Vaccine batch creation, lookup and custody history
//! - Certificate issuance, lookup and signature verification
//! - Audit event log and full state snapshot
//!
//! The ledger sits behind a single `RwLock`. Each mutation holds the write
//! lock for its whole duration, which gives every call the atomic,
//! totally ordered execution the ledger relies on.

use crate::contracts::events::EventRecord;
use crate::contracts::ledger::{ColdChain, Snapshot};
use crate::error::{ColdChainError, ErrorKind};
use crate::models::certificate::Certificate;
use crate::models::entity::{Entity, Mode};
use crate::models::status::Status;
use crate::models::vaccine_batch::VaccineBatch;
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        FromRequest, FromRequestParts, Json, Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use ethers::types::{Address, Bytes, H256};
use log::info;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Ledger shared between request handlers.
pub type SharedLedger = Arc<RwLock<ColdChain>>;

// API request and response structures

/// Request payload for registering an entity
#[derive(Serialize, Deserialize)]
struct AddEntityRequest {
    id: Address,
    /// Role label, parsed by the ledger so unknown roles surface as `InvalidMode`
    mode: String,
}

/// Response for entity registration, mirroring the `AddEntity` event
#[derive(Serialize, Deserialize)]
struct AddEntityResponse {
    entity_id: Address,
    entity_mode: Mode,
}

/// Request payload for creating a vaccine batch
#[derive(Serialize, Deserialize)]
struct AddVaccineBatchRequest {
    brand: String,
    manufacturer: Address,
}

/// Response for batch creation, mirroring the `AddVaccineBatch` event
#[derive(Serialize, Deserialize)]
struct AddVaccineBatchResponse {
    vaccine_batch_id: u64,
    manufacturer: Address,
}

/// Request payload for issuing a certificate
#[derive(Serialize, Deserialize)]
struct IssueCertificateRequest {
    issuer: Address,
    prover: Address,
    status: String,
    vaccine_batch_id: u64,
    /// Hex-encoded 65-byte signature
    signature: Bytes,
}

/// Response for certificate issuance, mirroring the `IssueCertificate` event
#[derive(Serialize, Deserialize)]
struct IssueCertificateResponse {
    issuer: Address,
    prover: Address,
    certificate_id: u64,
}

/// Request payload for checking a certificate signature
#[derive(Serialize, Deserialize)]
struct VerifySignatureRequest {
    message_digest: H256,
    issuer: Address,
}

/// Response for signature verification
#[derive(Serialize, Deserialize)]
struct VerifySignatureResponse {
    is_matching: bool,
}

/// Query parameters for polling the event log
#[derive(Serialize, Deserialize)]
struct EventsQuery {
    since: Option<u64>,
}

/// Body returned for every failed request
#[derive(Serialize, Deserialize)]
struct ErrorResponse {
    error: String,
    kind: String,
}

impl IntoResponse for ColdChainError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let status = match kind {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Invalid => StatusCode::BAD_REQUEST,
            ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorResponse {
            error: self.to_string(),
            kind: format!("{:?}", kind),
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ColdChainError>;

// Input extractors that reject with `ColdChainError`, so unparseable input
// gets the same JSON error body as a ledger rejection.

#[derive(FromRequest)]
#[from_request(via(Json), rejection(ColdChainError))]
struct ApiJson<T>(T);

#[derive(FromRequestParts)]
#[from_request(via(Path), rejection(ColdChainError))]
struct ApiPath<T>(T);

#[derive(FromRequestParts)]
#[from_request(via(Query), rejection(ColdChainError))]
struct ApiQuery<T>(T);

impl From<JsonRejection> for ColdChainError {
    fn from(rejection: JsonRejection) -> Self {
        ColdChainError::MalformedRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ColdChainError {
    fn from(rejection: PathRejection) -> Self {
        ColdChainError::MalformedRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ColdChainError {
    fn from(rejection: QueryRejection) -> Self {
        ColdChainError::MalformedRequest(rejection.body_text())
    }
}

/// API server state containing the shared ledger
#[derive(Clone)]
pub struct ApiServer {
    ledger: SharedLedger,
}

impl ApiServer {
    /// Creates a new API server around an existing ledger
    pub fn new(ledger: ColdChain) -> Self {
        ApiServer {
            ledger: Arc::new(RwLock::new(ledger)),
        }
    }

    /// Handle to the ledger, e.g. for snapshotting after shutdown
    pub fn ledger(&self) -> SharedLedger {
        self.ledger.clone()
    }

    /// Builds the router with all API routes
    pub fn router(&self) -> Router {
        Router::new()
            .route("/entities", post(Self::add_entity_handler))
            .route("/entities/:id", get(Self::get_entity_handler))
            .route("/vaccine-batches", post(Self::add_vaccine_batch_handler))
            .route("/vaccine-batches/:id", get(Self::get_vaccine_batch_handler))
            .route(
                "/vaccine-batches/:id/certificates",
                get(Self::batch_history_handler),
            )
            .route("/certificates", post(Self::issue_certificate_handler))
            .route("/certificates/:id", get(Self::get_certificate_handler))
            .route(
                "/certificates/:id/verify",
                post(Self::verify_signature_handler),
            )
            .route("/events", get(Self::events_handler))
            .route("/snapshot", get(Self::snapshot_handler))
            .with_state(self.ledger.clone())
    }

    /// Serves the API until `shutdown` resolves
    ///
    /// # Arguments
    /// * `addr` - Socket address to bind to (e.g., "127.0.0.1:3000")
    /// * `shutdown` - Future that triggers a graceful shutdown
    pub async fn run(
        &self,
        addr: SocketAddr,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> std::io::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("API server listening on http://{}", listener.local_addr()?);
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
    }

    // =====================
    // Entity Handlers
    // =====================

    /// # Endpoint
    /// POST /entities
    ///
    /// # Responses
    /// - 201 Created: entity registered
    /// - 400 Bad Request: unknown mode or unparseable body
    /// - 409 Conflict: address already registered
    async fn add_entity_handler(
        State(ledger): State<SharedLedger>,
        ApiJson(payload): ApiJson<AddEntityRequest>,
    ) -> ApiResult<impl IntoResponse> {
        let mode: Mode = payload.mode.parse()?;
        ledger.write().await.add_entity(payload.id, mode)?;
        Ok((
            StatusCode::CREATED,
            Json(AddEntityResponse {
                entity_id: payload.id,
                entity_mode: mode,
            }),
        ))
    }

    /// # Endpoint
    /// GET /entities/:id
    async fn get_entity_handler(
        State(ledger): State<SharedLedger>,
        ApiPath(id): ApiPath<Address>,
    ) -> ApiResult<Json<Entity>> {
        let entity = ledger.read().await.get_entity(id)?.clone();
        Ok(Json(entity))
    }

    // =====================
    // Vaccine Batch Handlers
    // =====================

    /// # Endpoint
    /// POST /vaccine-batches
    ///
    /// # Responses
    /// - 201 Created: returns the new batch id
    /// - 404 Not Found: manufacturer is not registered
    async fn add_vaccine_batch_handler(
        State(ledger): State<SharedLedger>,
        ApiJson(payload): ApiJson<AddVaccineBatchRequest>,
    ) -> ApiResult<impl IntoResponse> {
        let vaccine_batch_id = ledger
            .write()
            .await
            .add_vaccine_batch(payload.brand, payload.manufacturer)?;
        Ok((
            StatusCode::CREATED,
            Json(AddVaccineBatchResponse {
                vaccine_batch_id,
                manufacturer: payload.manufacturer,
            }),
        ))
    }

    /// # Endpoint
    /// GET /vaccine-batches/:id
    async fn get_vaccine_batch_handler(
        State(ledger): State<SharedLedger>,
        ApiPath(id): ApiPath<u64>,
    ) -> ApiResult<Json<VaccineBatch>> {
        let batch = ledger.read().await.get_vaccine_batch(id)?.clone();
        Ok(Json(batch))
    }

    /// # Endpoint
    /// GET /vaccine-batches/:id/certificates
    async fn batch_history_handler(
        State(ledger): State<SharedLedger>,
        ApiPath(id): ApiPath<u64>,
    ) -> ApiResult<Json<Vec<Certificate>>> {
        let history = ledger
            .read()
            .await
            .batch_history(id)?
            .into_iter()
            .cloned()
            .collect();
        Ok(Json(history))
    }

    // =====================
    // Certificate Handlers
    // =====================

    /// # Endpoint
    /// POST /certificates
    ///
    /// # Responses
    /// - 201 Created: returns the new certificate id
    /// - 400 Bad Request: unknown status or out-of-order custody transition
    /// - 404 Not Found: issuer, prover or batch missing
    async fn issue_certificate_handler(
        State(ledger): State<SharedLedger>,
        ApiJson(payload): ApiJson<IssueCertificateRequest>,
    ) -> ApiResult<impl IntoResponse> {
        let status: Status = payload.status.parse()?;
        let certificate_id = ledger.write().await.issue_certificate(
            payload.issuer,
            payload.prover,
            status,
            payload.vaccine_batch_id,
            payload.signature,
        )?;
        Ok((
            StatusCode::CREATED,
            Json(IssueCertificateResponse {
                issuer: payload.issuer,
                prover: payload.prover,
                certificate_id,
            }),
        ))
    }

    /// # Endpoint
    /// GET /certificates/:id
    async fn get_certificate_handler(
        State(ledger): State<SharedLedger>,
        ApiPath(id): ApiPath<u64>,
    ) -> ApiResult<Json<Certificate>> {
        let certificate = ledger.read().await.get_certificate(id)?.clone();
        Ok(Json(certificate))
    }

    /// # Endpoint
    /// POST /certificates/:id/verify
    ///
    /// # Responses
    /// - 200 OK: `is_matching` is false for any cryptographic mismatch
    /// - 404 Not Found: certificate missing
    async fn verify_signature_handler(
        State(ledger): State<SharedLedger>,
        ApiPath(id): ApiPath<u64>,
        ApiJson(payload): ApiJson<VerifySignatureRequest>,
    ) -> ApiResult<Json<VerifySignatureResponse>> {
        let is_matching = ledger
            .read()
            .await
            .is_matching_signature(payload.message_digest, id, payload.issuer)?;
        Ok(Json(VerifySignatureResponse { is_matching }))
    }

    // =====================
    // Audit Handlers
    // =====================

    /// # Endpoint
    /// GET /events?since=<sequence>
    async fn events_handler(
        State(ledger): State<SharedLedger>,
        ApiQuery(query): ApiQuery<EventsQuery>,
    ) -> Json<Vec<EventRecord>> {
        let records = ledger
            .read()
            .await
            .events()
            .since(query.since.unwrap_or(0))
            .to_vec();
        Json(records)
    }

    /// # Endpoint
    /// GET /snapshot
    async fn snapshot_handler(State(ledger): State<SharedLedger>) -> Json<Snapshot> {
        let snapshot = ledger.read().await.snapshot();
        Json(snapshot)
    }
}
