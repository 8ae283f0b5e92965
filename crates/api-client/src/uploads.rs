//! Resume uploads
//!
//! Files go to the upload endpoint as a single multipart field named
//! `file`. The server stores them on a CDN and answers with a URL and a
//! `publicId`, which is what applications reference and what deletion
//! takes. Public ids contain `/`, so they are percent-encoded as one path
//! segment.

use std::path::Path;

use bytes::Bytes;
use serde::Deserialize;
use tracing::debug;
use transport::{ApiRequest, FormPart};

use crate::applications::ResumeRef;
use crate::client::AuthClient;
use crate::error::{Error, Result};
use crate::jobs::Acknowledgement;
use crate::{path_segment, validate};

pub const UPLOAD_RESUME_PATH: &str = "/uploads/resume";
pub const UPLOAD_FIELD: &str = "file";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Uploaded {
    url: String,
    public_id: String,
    original_name: String,
}

/// Upload resume bytes.
pub async fn upload_resume(
    client: &AuthClient,
    file_name: &str,
    mime: &str,
    bytes: Bytes,
) -> Result<ResumeRef> {
    validate::resume_size(bytes.len())?;
    let request = ApiRequest::post(UPLOAD_RESUME_PATH).multipart(vec![FormPart {
        name: UPLOAD_FIELD.to_string(),
        file_name: file_name.to_string(),
        mime: mime.to_string(),
        bytes,
    }]);

    let uploaded: Uploaded = client.send_json(request).await?;
    debug!(public_id = %uploaded.public_id, "resume uploaded");
    Ok(ResumeRef {
        url: uploaded.url,
        public_id: uploaded.public_id,
        original_name: uploaded.original_name,
    })
}

/// Read a resume from disk and upload it.
pub async fn upload_resume_file(client: &AuthClient, path: &Path) -> Result<ResumeRef> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| Error::Invalid(format!("cannot read {}: {e}", path.display())))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "resume".to_string());
    upload_resume(client, &file_name, mime_for(path), Bytes::from(bytes)).await
}

/// Upload a new resume, first deleting the stored file with public id
/// `previous` if one is given.
pub async fn replace_resume(
    client: &AuthClient,
    previous: Option<&str>,
    path: &Path,
) -> Result<ResumeRef> {
    if let Some(previous) = previous {
        delete(client, previous).await?;
    }
    upload_resume_file(client, path).await
}

/// Delete a stored file by public id.
pub async fn delete(client: &AuthClient, public_id: &str) -> Result<Acknowledgement> {
    let path = format!("/uploads/{}", path_segment(public_id)?);
    let ack: Acknowledgement = client.send_json(ApiRequest::delete(path)).await?;
    Ok(ack)
}

fn mime_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("pdf") => "application/pdf",
        Some("doc") => "application/msword",
        Some("docx") => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        Some("txt") => "text/plain",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}
