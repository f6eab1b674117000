//! HTTP surface
//!
//! Warp filters for the dataset and query API, plus rejection handling
//! that renders every failure as a JSON error object.

use std::convert::Infallible;
use std::net::SocketAddr;

use serde_json::json;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

use crate::app_state::AppState;
use crate::error::ApiReject;

pub mod handlers;
pub mod rate_limit;

#[cfg(test)]
mod tests;

/// Maximum accepted upload size (10 MB)
const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Maximum accepted query body size
const MAX_QUERY_BYTES: u64 = 1024 * 1024;

/// The full route tree, rejection handling included.
pub fn routes(
    state: AppState,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    upload(state.clone())
        .or(list(state.clone()))
        .or(detail(state.clone()))
        .or(query(state.clone()))
        .or(demo(state))
        .or(health())
        .recover(handle_rejection)
}

/// Bind and run the server until the process exits.
pub async fn serve(state: AppState) {
    let addr = SocketAddr::new(state.settings.host, state.settings.port);
    tracing::info!("listening on http://{}", addr);
    warp::serve(routes(state)).run(addr).await;
}

fn with_state(
    state: AppState,
) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

fn upload(
    state: AppState,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::path!("api" / "datasets")
        .and(warp::post())
        .and(warp::multipart::form().max_length(MAX_UPLOAD_BYTES))
        .and(with_state(state))
        .and_then(handlers::upload_dataset)
}

fn list(
    state: AppState,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::path!("api" / "datasets")
        .and(warp::get())
        .and(with_state(state))
        .and_then(handlers::list_datasets)
}

fn detail(
    state: AppState,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::path!("api" / "datasets" / String)
        .and(warp::get())
        .and(with_state(state))
        .and_then(handlers::get_dataset)
}

fn query(
    state: AppState,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::path!("api" / "query")
        .and(warp::post())
        .and(warp::addr::remote())
        .and(warp::body::content_length_limit(MAX_QUERY_BYTES))
        .and(warp::body::json())
        .and(with_state(state))
        .and_then(handlers::query)
}

fn demo(
    state: AppState,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::path!("api" / "demo" / String)
        .and(warp::post())
        .and(with_state(state))
        .and_then(handlers::load_sample)
}

fn health() -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::path!("health").and(warp::get()).and_then(handlers::health)
}

/// Render every rejection as a JSON error object with the right status.
async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let response = if let Some(ApiReject(api_error)) = err.find::<ApiReject>() {
        api_error.to_response()
    } else if err.is_not_found() {
        json_response(StatusCode::NOT_FOUND, json!({ "error": "not found" }))
    } else if err
        .find::<warp::filters::body::BodyDeserializeError>()
        .is_some()
    {
        json_response(
            StatusCode::BAD_REQUEST,
            json!({ "error": "invalid request body" }),
        )
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        json_response(
            StatusCode::PAYLOAD_TOO_LARGE,
            json!({ "error": "request body too large" }),
        )
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        json_response(
            StatusCode::METHOD_NOT_ALLOWED,
            json!({ "error": "method not allowed" }),
        )
    } else {
        tracing::error!("unhandled rejection: {:?}", err);
        json_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "error": "internal server error" }),
        )
    };

    Ok(response)
}

fn json_response(status: StatusCode, body: serde_json::Value) -> warp::reply::Response {
    warp::reply::with_status(warp::reply::json(&body), status).into_response()
}
