use actix_session::Session;
use actix_web::{web, HttpResponse};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use log::{error, info, warn};
use serde::Deserialize;
use serde_json::json;

use crate::handlers::{error_response, not_initialized, session_id};
use crate::models::upload::UploadedFile;
use crate::routes::app_state::AppState;
use crate::services::chat_service;

#[derive(Debug, Deserialize)]
pub struct UploadPayload {
    pub name: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    /// File content, base64 encoded.
    pub data: String,
}

#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    pub files: Vec<UploadPayload>,
}

/// Strips an optional `data:...;base64,` prefix before decoding.
fn decode_payload(payload: &UploadPayload) -> Result<UploadedFile, base64::DecodeError> {
    let encoded = match payload.data.split_once(";base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => payload.data.as_str(),
    };
    let bytes = STANDARD.decode(encoded.trim())?;
    Ok(UploadedFile::new(payload.name.clone(), payload.mime_type.as_deref(), bytes))
}

pub async fn handle_upload(
    data: web::Data<AppState>,
    session: Session,
    req_body: web::Json<UploadRequest>,
) -> HttpResponse {
    let Some(session_id) = session_id(&session) else {
        return not_initialized();
    };

    let mut files = Vec::with_capacity(req_body.files.len());
    for payload in &req_body.files {
        match decode_payload(payload) {
            Ok(file) => files.push(file),
            Err(e) => {
                warn!("Rejecting upload of {}: {}", payload.name, e);
                return HttpResponse::BadRequest()
                    .json(json!({"error": format!("Invalid base64 data for {}", payload.name)}));
            }
        }
    }
    info!("Session {} uploaded {} file(s)", session_id, files.len());

    match chat_service::upload_files(&data.session_manager, &session_id, data.generator.as_ref(), &files).await {
        Ok((view, previews)) => HttpResponse::Ok().json(json!({"state": view, "previews": previews})),
        Err(e) => {
            error!("Upload failed for session {}: {}", session_id, e);
            error_response(e)
        }
    }
}
