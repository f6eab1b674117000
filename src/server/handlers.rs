//! Request handlers
//!
//! One async function per operation, each converting module errors into
//! the API taxonomy and rejecting; the rejection handler renders them.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use bytes::Buf;
use chrono::{DateTime, Utc};
use futures_util::TryStreamExt;
use serde::{Deserialize, Serialize};
use serde_json::json;
use warp::http::StatusCode;
use warp::multipart::{FormData, Part};
use warp::{Rejection, Reply};

use crate::analysis::{build_prompt, Turn};
use crate::app_state::AppState;
use crate::completion::{parse_payload, send_with_retry, AnswerPayload};
use crate::csv::{parse_table, summarize, TableData};
use crate::demo;
use crate::error::{reject, ApiError};

/// Rows returned in the dataset detail view
const DETAIL_SAMPLE_ROWS: usize = 10;

// ============================================================================
// Upload
// ============================================================================

#[derive(Default)]
struct Upload {
    file: Option<(Option<String>, Vec<u8>)>,
    name: Option<String>,
    description: Option<String>,
}

pub async fn upload_dataset(form: FormData, state: AppState) -> Result<impl Reply, Rejection> {
    let upload = read_upload(form).await.map_err(reject)?;

    let (filename, bytes) = upload
        .file
        .ok_or_else(|| reject(ApiError::InvalidInput("no file uploaded".to_string())))?;

    let content = String::from_utf8_lossy(&bytes);
    let name = upload
        .name
        .or(filename)
        .unwrap_or_else(|| "uploaded dataset".to_string());

    let reply = ingest(&state, name, upload.description.unwrap_or_default(), &content)?;
    Ok(reply)
}

/// Drain the multipart form into its fields.
async fn read_upload(form: FormData) -> Result<Upload, ApiError> {
    let parts: Vec<Part> = form
        .try_collect()
        .await
        .map_err(|e| ApiError::InvalidInput(format!("malformed multipart body: {}", e)))?;

    let mut upload = Upload::default();
    for part in parts {
        match part.name() {
            "file" => {
                let filename = part.filename().map(str::to_string);
                let bytes = part_bytes(part).await?;
                upload.file = Some((filename, bytes));
            }
            "name" => {
                upload.name = Some(part_text(part).await?);
            }
            "description" => {
                upload.description = Some(part_text(part).await?);
            }
            other => {
                tracing::debug!("ignoring unexpected multipart field {:?}", other);
            }
        }
    }

    Ok(upload)
}

async fn part_bytes(part: Part) -> Result<Vec<u8>, ApiError> {
    part.stream()
        .try_fold(Vec::new(), |mut acc, mut buf| async move {
            while buf.has_remaining() {
                let chunk = buf.chunk();
                acc.extend_from_slice(chunk);
                let len = chunk.len();
                buf.advance(len);
            }
            Ok(acc)
        })
        .await
        .map_err(|e| ApiError::InvalidInput(format!("failed to read upload: {}", e)))
}

async fn part_text(part: Part) -> Result<String, ApiError> {
    let bytes = part_bytes(part).await?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Shared ingestion path for uploads and demo loads: parse, summarize,
/// store, and reply 201 with the id and summary.
fn ingest(
    state: &AppState,
    name: String,
    description: String,
    content: &str,
) -> Result<warp::reply::WithStatus<warp::reply::Json>, Rejection> {
    let table: TableData = parse_table(content).map_err(|e| reject(e.into()))?;
    let summary = summarize(&table);

    let dataset = state
        .datasets
        .insert(name, description, table, summary)
        .map_err(|e| reject(e.into()))?;

    tracing::info!(
        "ingested dataset {} ({:?}, {} rows, {} columns)",
        dataset.id,
        dataset.name,
        dataset.summary.total_rows,
        dataset.summary.column_count()
    );

    Ok(warp::reply::with_status(
        warp::reply::json(&json!({
            "datasetId": dataset.id,
            "summary": dataset.summary,
        })),
        StatusCode::CREATED,
    ))
}

// ============================================================================
// Dataset listing and detail
// ============================================================================

pub async fn list_datasets(state: AppState) -> Result<impl Reply, Rejection> {
    Ok(warp::reply::json(&json!({
        "datasets": state.datasets.list(),
    })))
}

pub async fn get_dataset(id: String, state: AppState) -> Result<impl Reply, Rejection> {
    let dataset = state
        .datasets
        .get(&id)
        .ok_or_else(|| reject(ApiError::NotFound(format!("dataset {}", id))))?;

    Ok(warp::reply::json(&json!({
        "id": dataset.id,
        "name": dataset.name,
        "description": dataset.description,
        "summary": dataset.summary,
        "uploadedAt": dataset.uploaded_at,
        "sampleRows": dataset.table.sample_records(DETAIL_SAMPLE_ROWS),
    })))
}

// ============================================================================
// Query
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    #[serde(default, alias = "query")]
    pub question: String,
    #[serde(default)]
    pub dataset_id: String,
    #[serde(default, alias = "context")]
    pub prior_turns: Vec<Turn>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    answer: AnswerPayload,
    cached: bool,
    timestamp: DateTime<Utc>,
}

pub async fn query(
    addr: Option<SocketAddr>,
    request: QueryRequest,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    let client_ip = addr
        .map(|a| a.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
    if let Err(retry_after) = state.limiter.check(client_ip) {
        tracing::info!("rate limit exceeded for {}", client_ip);
        return Err(reject(ApiError::RateLimited { retry_after }));
    }

    if request.question.trim().is_empty() || request.dataset_id.is_empty() {
        return Err(reject(ApiError::InvalidInput(
            "question and datasetId are required".to_string(),
        )));
    }

    let dataset = state
        .datasets
        .get(&request.dataset_id)
        .ok_or_else(|| reject(ApiError::NotFound(format!("dataset {}", request.dataset_id))))?;

    if let Some(cached) = state.answers.get(&dataset.id, &request.question) {
        tracing::debug!("answer cache hit for dataset {}", dataset.id);
        return Ok(warp::reply::json(&QueryResponse {
            answer: cached.payload,
            cached: true,
            timestamp: cached.created_at,
        }));
    }

    let prompt = build_prompt(&dataset, &request.question, &request.prior_turns);
    tracing::debug!(
        "sending prompt for dataset {} ({} chars)",
        dataset.id,
        prompt.len()
    );

    let raw = send_with_retry(state.completion.as_ref(), &prompt, &state.settings.retry)
        .await
        .map_err(|e| reject(e.into()))?;

    let payload = parse_payload(&raw);
    state
        .answers
        .put(&dataset.id, &request.question, payload.clone());

    Ok(warp::reply::json(&QueryResponse {
        answer: payload,
        cached: false,
        timestamp: Utc::now(),
    }))
}

// ============================================================================
// Demo datasets and health
// ============================================================================

pub async fn load_sample(key: String, state: AppState) -> Result<impl Reply, Rejection> {
    let sample = demo::find_sample(&key)
        .ok_or_else(|| reject(ApiError::NotFound(format!("sample dataset {}", key))))?;

    let content = demo::read_sample(&state.settings.demo_dir, sample)
        .await
        .map_err(|e| {
            tracing::error!("failed to read sample dataset {}: {}", sample.file, e);
            reject(ApiError::Internal(format!(
                "failed to read sample dataset {}",
                sample.key
            )))
        })?;

    ingest(
        &state,
        sample.name.to_string(),
        sample.description.to_string(),
        &content,
    )
}

pub async fn health() -> Result<impl Reply, Rejection> {
    Ok(warp::reply::json(&json!({
        "status": "ok",
        "timestamp": Utc::now(),
    })))
}
