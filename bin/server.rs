// Statement Normalizer - Web Server
// Upload a statement, get back the standardized CSV

use anyhow::Context;
use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::fs::OpenOptions;
use std::io;
use std::path::{Path as FsPath, PathBuf};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

use statement_normalizer::{
    output_file_name, BankFormat, NormalizationReport, NormalizeError, Normalizer,
    NormalizerConfig,
};

/// Form field carrying the uploaded statement
const UPLOAD_FIELD: &str = "statement_file";

const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Shared application state
#[derive(Clone)]
struct AppState {
    normalizer: Arc<Normalizer>,
    media_dir: Arc<PathBuf>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Upload result returned to the browser
#[derive(Serialize)]
struct UploadResponse {
    format: String,
    rows: usize,
    output_file: String,
    download_url: String,
}

impl From<NormalizationReport> for UploadResponse {
    fn from(report: NormalizationReport) -> Self {
        let output_file = report
            .output
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();

        UploadResponse {
            format: report.format.to_string(),
            rows: report.rows,
            download_url: format!("/download/{}", output_file),
            output_file,
        }
    }
}

/// Why an upload could not be turned into a report
enum UploadError {
    Store(io::Error),
    Normalize(NormalizeError),
}

fn failure(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ApiResponse::<()>::err(message))).into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok(serde_json::json!({
        "status": "ok",
        "version": statement_normalizer::VERSION,
    })))
}

/// GET / - Upload form
async fn serve_index() -> impl IntoResponse {
    Html(INDEX_HTML)
}

/// POST /upload - Save the statement, standardize it, report the result
async fn upload_statement(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let (file_name, bytes) = loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.name() == Some(UPLOAD_FIELD) => {
                let Some(file_name) = field.file_name().map(str::to_string) else {
                    return failure(StatusCode::BAD_REQUEST, "upload has no file name");
                };
                match field.bytes().await {
                    Ok(bytes) => break (file_name, bytes),
                    Err(e) => return failure(StatusCode::BAD_REQUEST, e.to_string()),
                }
            }
            Ok(Some(_)) => continue,
            Ok(None) => {
                return failure(
                    StatusCode::BAD_REQUEST,
                    format!("missing form field '{}'", UPLOAD_FIELD),
                )
            }
            Err(e) => return failure(StatusCode::BAD_REQUEST, e.to_string()),
        }
    };

    let Some(file_name) = safe_file_name(&file_name) else {
        return failure(StatusCode::BAD_REQUEST, "invalid file name");
    };
    if !file_name.to_lowercase().ends_with(".csv") {
        return failure(StatusCode::BAD_REQUEST, "only .csv statements are accepted");
    }

    let normalizer = state.normalizer.clone();
    let media_dir = state.media_dir.clone();
    let result = tokio::task::spawn_blocking(move || -> Result<NormalizationReport, UploadError> {
        std::fs::create_dir_all(media_dir.as_path()).map_err(UploadError::Store)?;
        let input = reserve_path(&media_dir, &file_name).map_err(UploadError::Store)?;
        std::fs::write(&input, &bytes).map_err(UploadError::Store)?;
        info!("received {} ({} bytes)", input.display(), bytes.len());

        let format = normalizer.detect(&input).map_err(UploadError::Normalize)?;
        let output = output_path(&media_dir, &input, format, chrono::Utc::now().timestamp())
            .map_err(UploadError::Store)?;
        normalizer
            .standardize_report(&input, &output)
            .map_err(UploadError::Normalize)
    })
    .await;

    match result {
        Ok(Ok(report)) => {
            (StatusCode::OK, Json(ApiResponse::ok(UploadResponse::from(report)))).into_response()
        }
        Ok(Err(UploadError::Store(e))) => {
            error!("storing upload in {}: {}", state.media_dir.display(), e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, "could not store the upload")
        }
        Ok(Err(UploadError::Normalize(e))) => {
            warn!("standardize failed: {}", e);
            failure(StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
        }
        Err(e) => {
            error!("standardize task panicked: {}", e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
        }
    }
}

/// GET /download/:filename - Serve a standardized CSV as an attachment
async fn download(State(state): State<AppState>, Path(filename): Path<String>) -> Response {
    let Some(filename) = safe_file_name(&filename) else {
        return failure(StatusCode::BAD_REQUEST, "invalid file name");
    };

    match tokio::fs::read(state.media_dir.join(&filename)).await {
        Ok(bytes) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/csv".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", filename),
                ),
            ],
            bytes,
        )
            .into_response(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            failure(StatusCode::NOT_FOUND, format!("{} not found", filename))
        }
        Err(e) => {
            error!("reading {}: {}", filename, e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, "could not read the file")
        }
    }
}

/// Last path component, if it is a plain file name.
fn safe_file_name(raw: &str) -> Option<String> {
    let name = raw.rsplit(['/', '\\']).next()?.trim();
    if name.is_empty() || name == "." || name == ".." || name.contains('"') {
        return None;
    }
    Some(name.to_string())
}

/// Create `dir/name`, or `dir/<stem>_<n>.<ext>` when that name is taken, and
/// return the path claimed. Creation is exclusive.
fn reserve_path(dir: &FsPath, name: &str) -> io::Result<PathBuf> {
    let path = FsPath::new(name);
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("upload");
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("csv");

    let mut n = 0u32;
    loop {
        let candidate = if n == 0 {
            dir.join(name)
        } else {
            dir.join(format!("{}_{}.{}", stem, n, ext))
        };
        match OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(_) => return Ok(candidate),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => n += 1,
            Err(e) => return Err(e),
        }
    }
}

/// Standardized name for a stored upload, claimed next to it.
fn output_path(
    media_dir: &FsPath,
    input: &FsPath,
    format: BankFormat,
    timestamp: i64,
) -> io::Result<PathBuf> {
    let stored = input
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    reserve_path(media_dir, &output_file_name(stored, format, timestamp))
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = match std::env::var("NORMALIZER_CONFIG") {
        Ok(path) => NormalizerConfig::load(FsPath::new(&path))
            .with_context(|| format!("loading {}", path))?,
        Err(_) => NormalizerConfig::default(),
    };
    let media_dir = std::env::var("NORMALIZER_MEDIA_DIR").unwrap_or_else(|_| "media".to_string());
    let addr = std::env::var("NORMALIZER_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

    let state = AppState {
        normalizer: Arc::new(Normalizer::new(config)),
        media_dir: Arc::new(PathBuf::from(&media_dir)),
    };

    let app = Router::new()
        .route("/", get(serve_index))
        .route("/upload", post(upload_statement))
        .route("/download/:filename", get(download))
        .route("/api/health", get(health_check))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;

    info!("serving on http://{} (media dir: {})", addr, media_dir);

    axum::serve(listener, app).await.context("server stopped")?;
    Ok(())
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Statement Normalizer</title>
<style>
  body { font-family: sans-serif; max-width: 40rem; margin: 3rem auto; }
  #result { margin-top: 1.5rem; }
  .error { color: #b00020; }
</style>
</head>
<body>
<h1>Statement Normalizer</h1>
<p>Upload an HDFC, ICICI, Axis or IDFC statement export (.csv).</p>
<form id="upload" enctype="multipart/form-data">
  <input type="file" name="statement_file" accept=".csv" required>
  <button type="submit">Standardize</button>
</form>
<div id="result"></div>
<script>
document.getElementById("upload").addEventListener("submit", async (event) => {
  event.preventDefault();
  const result = document.getElementById("result");
  result.textContent = "Processing…";
  const response = await fetch("/upload", { method: "POST", body: new FormData(event.target) });
  const body = await response.json();
  if (body.success) {
    const d = body.data;
    result.innerHTML = `${d.rows} rows (${d.format}) <a href="${d.download_url}">${d.output_file}</a>`;
  } else {
    result.innerHTML = `<span class="error">${body.error}</span>`;
  }
});
</script>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_file_name() {
        assert_eq!(safe_file_name("hdfc.csv").as_deref(), Some("hdfc.csv"));
        assert_eq!(safe_file_name("../../etc/passwd").as_deref(), Some("passwd"));
        assert_eq!(safe_file_name("C:\\Users\\me\\Case2.csv").as_deref(), Some("Case2.csv"));
        assert_eq!(safe_file_name(".."), None);
        assert_eq!(safe_file_name("dir/"), None);
    }

    #[test]
    fn test_reserve_path_appends_counter() {
        let dir = tempfile::tempdir().unwrap();
        let first = reserve_path(dir.path(), "jan.csv").unwrap();
        assert_eq!(first, dir.path().join("jan.csv"));
        assert!(first.exists());

        assert_eq!(reserve_path(dir.path(), "jan.csv").unwrap(), dir.path().join("jan_1.csv"));
        assert_eq!(reserve_path(dir.path(), "jan.csv").unwrap(), dir.path().join("jan_2.csv"));
    }

    #[test]
    fn test_output_never_replaces_the_upload() {
        let dir = tempfile::tempdir().unwrap();
        let input = reserve_path(dir.path(), "IciciCase3.csv").unwrap();
        std::fs::write(&input, "statement").unwrap();

        let output = output_path(dir.path(), &input, BankFormat::Icici, 0).unwrap();
        assert_eq!(output, dir.path().join("IciciCase3_1.csv"));
        assert_eq!(std::fs::read_to_string(&input).unwrap(), "statement");
    }

    #[test]
    fn test_repeated_uploads_get_distinct_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let first_in = reserve_path(dir.path(), "Case3_hdfc.csv").unwrap();
        let second_in = reserve_path(dir.path(), "Case3_hdfc.csv").unwrap();
        assert_eq!(second_in, dir.path().join("Case3_hdfc_1.csv"));

        let first_out = output_path(dir.path(), &first_in, BankFormat::Hdfc, 0).unwrap();
        let second_out = output_path(dir.path(), &second_in, BankFormat::Hdfc, 0).unwrap();
        assert_eq!(first_out, dir.path().join("HdfcCase3.csv"));
        assert_eq!(second_out, dir.path().join("HdfcCase3_1.csv"));
    }
}
