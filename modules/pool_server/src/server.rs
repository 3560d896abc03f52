//! Routes and CORS for a running pool

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::{HeaderValue, Method, StatusCode, header, request::Parts},
    routing::{get, post},
};
use gasless_common::{
    LedgerQuery, Signer, SponsorError,
    protocol::{ConditionsResponse, PoolRequest, PoolResponse},
};
use gasless_module_sponsor::Pool;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

/// Origins are checked against the conditions in force when the request
/// arrives
fn cors<L, S>(pool: Arc<Pool<L, S>>) -> CorsLayer
where
    L: LedgerQuery + 'static,
    S: Signer + 'static,
{
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _: &Parts| {
                origin.to_str().is_ok_and(|origin| pool.conditions().allows_origin(origin))
            },
        ))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
}

pub fn router<L, S>(pool: Arc<Pool<L, S>>) -> Router
where
    L: LedgerQuery + 'static,
    S: Signer + 'static,
{
    Router::new()
        .route("/", post(handle_request::<L, S>))
        .route("/conditions", get(get_conditions::<L, S>))
        .layer(cors(pool.clone()))
        .with_state(pool)
}

fn failure(error: &SponsorError) -> (StatusCode, Json<PoolResponse>) {
    let status =
        StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(PoolResponse::failed(error)))
}

async fn handle_request<L, S>(
    State(pool): State<Arc<Pool<L, S>>>,
    payload: Result<Json<PoolRequest>, JsonRejection>,
) -> (StatusCode, Json<PoolResponse>)
where
    L: LedgerQuery + 'static,
    S: Signer + 'static,
{
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            let error = SponsorError::InvalidRequest(rejection.body_text());
            warn!("Malformed request: {error}");
            return failure(&error);
        }
    };

    let sponsoring = request.pool_id.is_some();
    match pool.handle(request).await {
        Ok(tx_cbor) => {
            info!(sponsoring, "Request served");
            (StatusCode::OK, Json(PoolResponse::ok(tx_cbor)))
        }
        Err(error) => {
            warn!(code = error.code(), "Request rejected: {error}");
            failure(&error)
        }
    }
}

async fn get_conditions<L, S>(State(pool): State<Arc<Pool<L, S>>>) -> Json<ConditionsResponse>
where
    L: LedgerQuery + 'static,
    S: Signer + 'static,
{
    Json(ConditionsResponse {
        pub_key: pool.key_hash(),
        conditions: pool.conditions().as_ref().clone(),
    })
}
