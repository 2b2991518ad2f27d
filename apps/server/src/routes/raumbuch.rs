// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Room book endpoints.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Multipart, State},
    http::{header, StatusCode},
    response::Response,
    Json,
};
use raumbuch_processing::ProcessingStats;

use crate::error::ApiError;
use crate::services::{DiskCache, ReportJob, Upload};
use crate::types::{AllowListResponse, PreviewResponse};
use crate::AppState;

const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Read the `file` field and the optional `allow_list` field.
async fn extract_upload(multipart: &mut Multipart) -> Result<Upload, ApiError> {
    let mut upload = Upload::default();
    let mut has_file = false;

    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().unwrap_or_default().to_string();
        tracing::debug!(field_name = %field_name, file_name = %file_name, "Processing multipart field");

        match field_name.as_str() {
            "file" => {
                let bytes = field.bytes().await?;
                tracing::debug!(size = bytes.len(), "Extracted file from multipart");
                upload.file_name = if file_name.is_empty() {
                    "model.ifc".to_string()
                } else {
                    file_name
                };
                upload.data = bytes.to_vec();
                has_file = true;
            }
            "allow_list" => {
                let bytes = field.bytes().await?;
                let name = if file_name.is_empty() {
                    "allow_list.xlsx".to_string()
                } else {
                    file_name
                };
                upload.allow_list = Some((name, bytes.to_vec()));
            }
            _ => {}
        }
    }

    if !has_file {
        tracing::warn!("No 'file' field found in multipart request");
        return Err(ApiError::MissingFile);
    }
    Ok(upload)
}

/// Decode the upload off the async runtime.
async fn prepare_job(state: &AppState, multipart: &mut Multipart) -> Result<ReportJob, ApiError> {
    let upload = extract_upload(multipart).await?;

    let max_bytes = state.config.max_file_size_bytes();
    if upload.data.len() > max_bytes {
        return Err(ApiError::FileTooLarge {
            max_mb: state.config.max_file_size_mb,
        });
    }

    let configured = Arc::clone(&state.allow_list);
    tokio::task::spawn_blocking(move || ReportJob::prepare(upload, &configured, max_bytes)).await?
}

/// GET /api/v1/allow-list - The allow-list loaded at startup.
pub async fn allow_list(State(state): State<AppState>) -> Json<AllowListResponse> {
    Json(AllowListResponse {
        count: state.allow_list.len(),
        fingerprint: state.allow_list.fingerprint(),
        entries: state.allow_list.entries().to_vec(),
    })
}

/// POST /api/v1/raumbuch/preview - Room book as JSON with unique labels.
pub async fn preview(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<PreviewResponse>, ApiError> {
    let job = prepare_job(&state, &mut multipart).await?;
    let key = job.preview_key();

    if let Some(cache) = &state.cache {
        if let Some(mut cached) = cache_get::<PreviewResponse>(cache, &key).await {
            tracing::info!(cache_key = %key, "Cache HIT");
            cached.from_cache = true;
            cached.file_name = job.file_name.clone();
            cached.report_file_name = job.report_file_name();
            cached.message = raumbuch_processing::success_message(&job.file_name);
            return Ok(Json(cached));
        }
        tracing::info!(cache_key = %key, size = job.content.len(), "Cache MISS - processing");
    }

    let response = tokio::task::spawn_blocking(move || job.preview()).await??;

    if let Some(cache) = state.cache.clone() {
        let response = response.clone();
        tokio::spawn(async move {
            if let Err(e) = cache.set(&key, &response).await {
                tracing::error!(error = %e, "Failed to cache preview");
            }
        });
    }

    Ok(Json(response))
}

/// POST /api/v1/raumbuch/export - Room book as an xlsx download.
///
/// Response format:
/// - Content-Type: xlsx
/// - Content-Disposition: attachment with `<model stem>_Raumbuch.xlsx`
/// - X-Raumbuch-Stats: JSON-encoded processing statistics
pub async fn export(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let job = prepare_job(&state, &mut multipart).await?;
    let file_name = job.report_file_name();
    let bytes_key = job.export_key();
    let stats_key = job.export_stats_key();

    if let Some(cache) = &state.cache {
        let bytes = cache_get_bytes(cache, &bytes_key).await;
        let stats = cache_get::<ProcessingStats>(cache, &stats_key).await;
        if let (Some(bytes), Some(stats)) = (bytes, stats) {
            tracing::info!(cache_key = %job.cache_key, "Cache HIT");
            return xlsx_response(bytes, &stats, &file_name);
        }
        tracing::info!(cache_key = %job.cache_key, size = job.content.len(), "Cache MISS - processing");
    }

    let (bytes, stats) = tokio::task::spawn_blocking(move || job.export()).await??;

    if let Some(cache) = state.cache.clone() {
        let bytes = bytes.clone();
        let stats = stats.clone();
        tokio::spawn(async move {
            if let Err(e) = cache.set_bytes(&bytes_key, &bytes).await {
                tracing::error!(error = %e, "Failed to cache report");
                return;
            }
            if let Err(e) = cache.set(&stats_key, &stats).await {
                tracing::error!(error = %e, "Failed to cache report stats");
            }
        });
    }

    xlsx_response(bytes, &stats, &file_name)
}

fn xlsx_response(
    bytes: Vec<u8>,
    stats: &ProcessingStats,
    file_name: &str,
) -> Result<Response, ApiError> {
    let stats_json = serde_json::to_string(stats)?;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        file_name.replace(['"', '\\'], "_")
    );

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, XLSX_CONTENT_TYPE)
        .header(header::CONTENT_DISPOSITION, disposition)
        .header("X-Raumbuch-Stats", stats_json)
        .header(header::CONTENT_LENGTH, bytes.len())
        .body(Body::from(bytes))
        .map_err(|e| ApiError::Internal(e.to_string()))
}

/// Cache reads never fail a request.
async fn cache_get<T: serde::de::DeserializeOwned>(cache: &DiskCache, key: &str) -> Option<T> {
    cache.get(key).await.unwrap_or_else(|e| {
        tracing::warn!(error = %e, cache_key = %key, "Cache read failed");
        None
    })
}

async fn cache_get_bytes(cache: &DiskCache, key: &str) -> Option<Vec<u8>> {
    cache.get_bytes(key).await.unwrap_or_else(|e| {
        tracing::warn!(error = %e, cache_key = %key, "Cache read failed");
        None
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use axum::http::Request;
    use raumbuch_processing::{AllowListEntry, AllowListIndex};
    use tower::ServiceExt;

    const MODEL: &str = r"ISO-10303-21;
HEADER;
FILE_SCHEMA(('IFC2X3'));
ENDSEC;
DATA;
#1=IFCSPACE('2hQBAVPOr5VxhS3Jl0O47h',$,'12',$,$,$,$,$,.ELEMENT.,.INTERNAL.,$);
#2=IFCSPACE('3ZYW59sxj8lei475l7EhLU',$,'*',$,$,$,$,$,.ELEMENT.,.INTERNAL.,$);
#10=IFCPROPERTYSET('0pset1',$,'Pset_A',$,(#11,#12));
#11=IFCPROPERTYSINGLEVALUE('Width',$,IFCLENGTHMEASURE(3.5),$);
#12=IFCPROPERTYSINGLEVALUE('Height',$,IFCLENGTHMEASURE(2.1),$);
#20=IFCELEMENTQUANTITY('0qto1',$,'BaseQuantities',$,$,(#21));
#21=IFCQUANTITYAREA('NetFloorArea',$,$,14.004);
#30=IFCRELDEFINESBYPROPERTIES('0rel1',$,$,$,(#1,#2),#10);
#31=IFCRELDEFINESBYPROPERTIES('0rel2',$,$,$,(#1),#20);
ENDSEC;
END-ISO-10303-21;
";

    const BOUNDARY: &str = "raumbuch-test-boundary";

    fn state(cache: Option<Arc<DiskCache>>) -> AppState {
        AppState {
            allow_list: Arc::new(AllowListIndex::from_entries([
                AllowListEntry::new("Pset_A", "Width", Some("Breite")),
                AllowListEntry::new("Pset_A", "Height", Some("Breite")),
            ])),
            cache,
            config: Arc::new(Config {
                port: 0,
                allow_list_path: "unused.xlsx".into(),
                cache_dir: String::new(),
                cache_enabled: false,
                max_file_size_mb: 1,
                request_timeout_secs: 30,
            }),
        }
    }

    fn multipart(fields: &[(&str, &str, &[u8])]) -> Request<Body> {
        let mut body = Vec::new();
        for (name, file_name, data) in fields {
            body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
            body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                     Content-Type: application/octet-stream\r\n\r\n",
                    name, file_name
                )
                .as_bytes(),
            );
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        body_request(body)
    }

    fn body_request(body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/v1/raumbuch/preview")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn at(mut request: Request<Body>, uri: &str) -> Request<Body> {
        *request.uri_mut() = uri.parse().unwrap();
        request
    }

    async fn json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let app = crate::router(state(None));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json(response).await["allow_list_entries"], 2);
    }

    #[tokio::test]
    async fn test_preview_disambiguates_labels() {
        let app = crate::router(state(None));
        let response = app
            .oneshot(multipart(&[("file", "Haus.ifc", MODEL.as_bytes())]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json(response).await;
        assert_eq!(body["file_name"], "Haus.ifc");
        assert_eq!(body["report_file_name"], "Haus_Raumbuch.xlsx");
        assert!(body["message"].as_str().unwrap().contains("Haus.ifc"));
        assert_eq!(
            body["table"]["columns"],
            serde_json::json!(["Laufnummer", "Breite", "Breite_1", "Fläche Ist [m²]"])
        );
        assert_eq!(body["table"]["rows"], serde_json::json!([[12, 3.5, 2.1, 14.0]]));
        assert_eq!(body["stats"]["sentinel_rows_dropped"], 1);
        assert_eq!(body["from_cache"], false);
    }

    #[tokio::test]
    async fn test_export_download() {
        let app = crate::router(state(None));
        let request = at(
            multipart(&[("file", "Haus.ifc", MODEL.as_bytes())]),
            "/api/v1/raumbuch/export",
        );
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_TYPE], XLSX_CONTENT_TYPE);
        assert_eq!(
            headers[header::CONTENT_DISPOSITION],
            "attachment; filename=\"Haus_Raumbuch.xlsx\""
        );
        let stats: serde_json::Value =
            serde_json::from_str(headers["X-Raumbuch-Stats"].to_str().unwrap()).unwrap();
        assert_eq!(stats["rooms_reported"], 1);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }

    #[tokio::test]
    async fn test_uploaded_allow_list_overrides() {
        let app = crate::router(state(None));
        let response = app
            .oneshot(multipart(&[
                ("allow_list", "liste.csv", b"PSet,Property\nPset_A,Height\n"),
                ("file", "Haus.ifc", MODEL.as_bytes()),
            ]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json(response).await["table"]["columns"],
            serde_json::json!(["Laufnummer", "Height", "Fläche Ist [m²]"])
        );
    }

    #[tokio::test]
    async fn test_errors() {
        let app = crate::router(state(None));

        let missing = app
            .clone()
            .oneshot(multipart(&[("other", "x.txt", b"hello")]))
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json(missing).await["code"], "MISSING_FILE");

        let unreadable = app
            .clone()
            .oneshot(multipart(&[("file", "x.ifc", b"not a model")]))
            .await
            .unwrap();
        assert_eq!(unreadable.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json(unreadable).await["code"], "DOCUMENT_UNREADABLE");

        let bad_list = app
            .oneshot(multipart(&[
                ("file", "Haus.ifc", MODEL.as_bytes()),
                ("allow_list", "liste.csv", b"Gruppe,Merkmal\n"),
            ]))
            .await
            .unwrap();
        assert_eq!(bad_list.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json(bad_list).await["code"], "ALLOW_LIST_ERROR");
    }

    #[tokio::test]
    async fn test_preview_served_from_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(DiskCache::new(&dir.path().to_string_lossy()).await);
        let app = crate::router(state(Some(cache.clone())));

        let first = app
            .clone()
            .oneshot(multipart(&[("file", "Haus.ifc", MODEL.as_bytes())]))
            .await
            .unwrap();
        let first = json(first).await;
        let key = format!("{}.preview", first["cache_key"].as_str().unwrap());

        // The write happens in the background
        for _ in 0..50 {
            if cache.get_bytes(&key).await.unwrap().is_some() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }

        let second = app
            .oneshot(multipart(&[("file", "Kopie.ifc", MODEL.as_bytes())]))
            .await
            .unwrap();
        let second = json(second).await;
        assert_eq!(second["from_cache"], true);
        assert_eq!(second["file_name"], "Kopie.ifc");
        assert_eq!(second["table"], first["table"]);
    }
}
