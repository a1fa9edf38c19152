//! # API REST
//!
//! REST surface for the clinic access subsystem.
//!
//! Handles:
//! - HTTP endpoints with axum (redemption, link minting, sealing, verification)
//! - OpenAPI/Swagger documentation via utoipa
//! - REST-specific concerns (JSON DTOs, CORS, status-code mapping)
//!
//! Error mapping follows the core taxonomy: `Validation` → 400 and
//! `NotFound` → 404 with generic bodies, everything else is logged with full
//! context and returned as a bare 500. Clients are never told why a secret
//! failed to resolve beyond "not found".

use axum::{
    extract::{Path as AxumPath, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

use clinic_core::{
    seed::seed_demo, AccessError, CaseSecret, CoreConfig, DocumentSealer, LinkMinter, RecordStore,
    RedemptionService, Verified, Verifier,
};

/// Application state shared across REST API handlers.
///
/// Services are constructed once from the injected store and configuration;
/// handlers only call into them.
#[derive(Clone)]
pub struct AppState {
    redemption: RedemptionService,
    minter: LinkMinter,
    sealer: DocumentSealer,
    verifier: Verifier,
}

impl AppState {
    pub fn new(store: Arc<RecordStore>, cfg: Arc<CoreConfig>) -> Self {
        Self {
            redemption: RedemptionService::new(store.clone(), cfg.clone()),
            minter: LinkMinter::new(store.clone(), cfg),
            sealer: DocumentSealer::new(store.clone()),
            verifier: Verifier::new(store),
        }
    }
}

/// Build application state from environment variables.
///
/// Resolved once at startup, mirroring the core's no-ambient-config rule:
///
/// - `CLINIC_PUBLIC_ORIGIN`: origin for shareable URLs (default
///   "http://localhost:3000")
/// - `CLINIC_HANDLE_DOMAIN`: domain for ephemeral contact handles (default
///   "access.clinic.example")
/// - `CLINIC_DATA_FILE`: JSON snapshot file; omitted means in-memory only
/// - `CLINIC_DEV_SEED`: "1" plants the demo records at startup
pub fn state_from_env() -> anyhow::Result<AppState> {
    let origin =
        std::env::var("CLINIC_PUBLIC_ORIGIN").unwrap_or_else(|_| "http://localhost:3000".into());
    let handle_domain =
        std::env::var("CLINIC_HANDLE_DOMAIN").unwrap_or_else(|_| "access.clinic.example".into());

    let cfg = Arc::new(CoreConfig::new(origin, handle_domain)?);

    let store = match std::env::var("CLINIC_DATA_FILE").ok().map(PathBuf::from) {
        Some(path) => Arc::new(RecordStore::open(path)?),
        None => Arc::new(RecordStore::in_memory()),
    };

    if std::env::var("CLINIC_DEV_SEED").is_ok_and(|v| v == "1") {
        let seed = seed_demo(&store)?;
        tracing::info!(code = %seed.case_code, "dev seed active");
    }

    Ok(AppState::new(store, cfg))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RedeemCodeReq {
    /// Human-typed case code, e.g. "P-ABC123".
    pub code: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RedeemLinkReq {
    /// Link token lifted from a shared access URL.
    pub token: String,
}

/// One-time-disclosure credentials. The secret is not retrievable again.
#[derive(Debug, Serialize, ToSchema)]
pub struct CredentialsRes {
    pub contact: String,
    pub secret: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AccessLinkRes {
    pub token: String,
    pub url: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FingerprintRes {
    pub fingerprint: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VerifyRes {
    /// Which collection matched: "document" or "case".
    pub kind: String,
    pub record: serde_json::Value,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        redeem_code,
        redeem_link,
        mint_access_link,
        seal_document,
        verify_fingerprint,
    ),
    components(schemas(
        RedeemCodeReq,
        RedeemLinkReq,
        CredentialsRes,
        AccessLinkRes,
        FingerprintRes,
        VerifyRes,
        HealthRes,
    ))
)]
struct ApiDoc;

/// Build the REST router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/auth/code", post(redeem_code))
        .route("/auth/link", post(redeem_link))
        .route("/cases/:id/access-link", post(mint_access_link))
        .route("/documents/:id/fingerprint", post(seal_document))
        .route("/verify/:fingerprint", get(verify_fingerprint))
        .merge(
            SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind `addr` and serve the router until shutdown.
pub async fn serve(addr: &str, state: AppState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("clinic REST API listening on {}", addr);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// Map a core error onto a client-facing response.
///
/// Expected outcomes become terse 4xx responses; anything else is logged
/// server-side with full context and flattened to a generic 500.
fn reject(context: &'static str, err: AccessError) -> (StatusCode, &'static str) {
    match err {
        AccessError::Validation(_) => (StatusCode::BAD_REQUEST, "Bad request"),
        AccessError::NotFound(_) => (StatusCode::NOT_FOUND, "Not found"),
        other => {
            tracing::error!("{context}: {other}");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
        }
    }
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
#[axum::debug_handler]
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthRes {
        ok: true,
        message: "clinic REST API is alive".into(),
    })
}

#[utoipa::path(
    post,
    path = "/auth/code",
    request_body = RedeemCodeReq,
    responses(
        (status = 200, description = "Credentials issued", body = CredentialsRes),
        (status = 400, description = "Missing or empty code"),
        (status = 404, description = "No case matches the code"),
        (status = 500, description = "Internal server error")
    )
)]
/// Redeem a case code for ephemeral credentials
///
/// Issues (or rotates) the one-time-disclosure credentials scoped to the
/// case identified by `code`. The session subsystem consumes the returned
/// pair to establish a session.
#[axum::debug_handler]
async fn redeem_code(
    State(state): State<AppState>,
    Json(req): Json<RedeemCodeReq>,
) -> Result<Json<CredentialsRes>, (StatusCode, &'static str)> {
    let issued = state
        .redemption
        .redeem(&CaseSecret::Code(req.code))
        .map_err(|e| reject("redeem code", e))?;

    Ok(Json(CredentialsRes {
        contact: issued.contact,
        secret: issued.secret.expose().to_string(),
    }))
}

#[utoipa::path(
    post,
    path = "/auth/link",
    request_body = RedeemLinkReq,
    responses(
        (status = 200, description = "Credentials issued", body = CredentialsRes),
        (status = 400, description = "Missing or empty token"),
        (status = 404, description = "No case matches the token"),
        (status = 500, description = "Internal server error")
    )
)]
/// Redeem an access-link token for ephemeral credentials
#[axum::debug_handler]
async fn redeem_link(
    State(state): State<AppState>,
    Json(req): Json<RedeemLinkReq>,
) -> Result<Json<CredentialsRes>, (StatusCode, &'static str)> {
    let issued = state
        .redemption
        .redeem(&CaseSecret::LinkToken(req.token))
        .map_err(|e| reject("redeem link", e))?;

    Ok(Json(CredentialsRes {
        contact: issued.contact,
        secret: issued.secret.expose().to_string(),
    }))
}

#[utoipa::path(
    post,
    path = "/cases/{id}/access-link",
    params(
        ("id" = String, Path, description = "Case identifier (UUID)")
    ),
    responses(
        (status = 200, description = "Access link (idempotent)", body = AccessLinkRes),
        (status = 404, description = "Case not found"),
        (status = 500, description = "Internal server error")
    )
)]
/// Mint the shareable access link for a case
///
/// Idempotent: a case's token never changes once assigned.
#[axum::debug_handler]
async fn mint_access_link(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<Uuid>,
) -> Result<Json<AccessLinkRes>, (StatusCode, &'static str)> {
    let minted = state.minter.mint(id).map_err(|e| reject("mint link", e))?;

    Ok(Json(AccessLinkRes {
        token: minted.token,
        url: minted.url,
    }))
}

#[utoipa::path(
    post,
    path = "/documents/{id}/fingerprint",
    params(
        ("id" = String, Path, description = "Document identifier (UUID)")
    ),
    responses(
        (status = 200, description = "Fingerprint (idempotent once sealed)", body = FingerprintRes),
        (status = 400, description = "Document is still a draft"),
        (status = 404, description = "Document not found"),
        (status = 500, description = "Internal server error")
    )
)]
/// Seal a published document, persisting its integrity fingerprint
#[axum::debug_handler]
async fn seal_document(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<Uuid>,
) -> Result<Json<FingerprintRes>, (StatusCode, &'static str)> {
    let fingerprint = state
        .sealer
        .seal(id)
        .map_err(|e| reject("seal document", e))?;

    Ok(Json(FingerprintRes { fingerprint }))
}

#[utoipa::path(
    get,
    path = "/verify/{fingerprint}",
    params(
        ("fingerprint" = String, Path, description = "Fingerprint or case link token")
    ),
    responses(
        (status = 200, description = "Matching record", body = VerifyRes),
        (status = 404, description = "No record matches"),
        (status = 500, description = "Internal server error")
    )
)]
/// Verify a document fingerprint or case link token
///
/// Public and side-effect free; anyone holding a printed fingerprint can
/// check it without authenticating.
#[axum::debug_handler]
async fn verify_fingerprint(
    State(state): State<AppState>,
    AxumPath(fingerprint): AxumPath<String>,
) -> Result<Json<VerifyRes>, (StatusCode, &'static str)> {
    let verified = state
        .verifier
        .verify(&fingerprint)
        .map_err(|e| reject("verify", e))?;

    let (kind, record) = match verified {
        Verified::Document(doc) => ("document", serde_json::to_value(doc)),
        Verified::Case(case) => ("case", serde_json::to_value(case)),
    };
    let record = record.map_err(|e| {
        tracing::error!("verify: failed to serialise record: {e}");
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
    })?;

    Ok(Json(VerifyRes {
        kind: kind.to_string(),
        record,
    }))
}
