use super::app_error::AppError;
use super::state::HttpServerState;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, Path, State};
use axum::http::{Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use std::path::{Component, PathBuf};
use tracing::{error, info, warn};

/// Uploads under this field name are pictures and are not echoed to the log.
pub const IMAGE_FIELD: &str = "Image";

/// Store every file part of a multipart POST in the upload directory.
///
/// Each file is named after its form field, not after the file name
/// declared by the client. The report file is removed first, whatever
/// the request contains.
pub async fn receive_upload(
    State(state): State<HttpServerState>,
    Path(path): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, AppError> {
    info!(path = %path, "New data request");

    remove_report(&state).await;

    let mut files = 0usize;
    let mut form_items = 0usize;

    match multipart {
        Ok(mut multipart) => {
            while let Some(field) = multipart.next_field().await.map_err(AppError::bad_request)? {
                let name = field.name().unwrap_or_default().to_string();
                match field.file_name().map(str::to_string) {
                    Some(file_name) => {
                        let bytes = field.bytes().await.map_err(AppError::bad_request)?;
                        files += 1;
                        store_file(&state, &name, &file_name, &bytes).await?;
                    }
                    None => {
                        let value = field.text().await.map_err(AppError::bad_request)?;
                        form_items += 1;
                        info!(name = %name, value = %value, "Form item");
                    }
                }
            }
        }
        Err(rejection) => {
            info!(reason = %rejection, "POST without multipart payload");
        }
    }

    info!(files, form_items, "POST received");

    tokio::time::sleep(state.response_delay).await;

    Ok(([(header::CONTENT_TYPE, "application/json")], "{}").into_response())
}

/// Any other method on the upload route.
pub async fn method_not_allowed(method: Method, uri: Uri) -> StatusCode {
    info!(method = %method, uri = %uri, "Method not supported");
    StatusCode::METHOD_NOT_ALLOWED
}

async fn remove_report(state: &HttpServerState) {
    let report = state.upload_dir.join(state.report_file.as_str());
    if let Err(error) = tokio::fs::remove_file(&report).await {
        warn!(report = %report.display(), %error, "Could not remove report");
    }
}

async fn store_file(
    state: &HttpServerState,
    name: &str,
    file_name: &str,
    bytes: &[u8],
) -> Result<(), AppError> {
    let Some(target) = upload_target(state, name) else {
        warn!(field = %name, "Ignoring upload with a field name that is not a plain file name");
        return Ok(());
    };

    info!(
        field = %name,
        file_name = %file_name,
        size = bytes.len(),
        target = %target.display(),
        "Saving upload"
    );
    tokio::fs::write(&target, bytes).await?;

    if name != IMAGE_FIELD {
        let contents = tokio::fs::read(&target).await?;
        log_contents(name, &contents);
    }

    Ok(())
}

/// Only single, normal path components are accepted as file names.
fn upload_target(state: &HttpServerState, name: &str) -> Option<PathBuf> {
    let mut components = std::path::Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(file)), None) => Some(state.upload_dir.join(file)),
        _ => None,
    }
}

fn log_contents(name: &str, contents: &[u8]) {
    info!(field = %name, contents = %String::from_utf8_lossy(contents), "Uploaded file");
    match serde_json::from_slice::<serde_json::Value>(contents) {
        Ok(document) => info!(field = %name, json = %document, "Uploaded JSON"),
        Err(err) => error!(field = %name, error = %err, "Invalid JSON in upload"),
    }
}
