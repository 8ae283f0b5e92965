//! Job postings
//!
//! Anyone signed in can list jobs; create, update and delete are admin-only
//! on the server.

use serde::{Deserialize, Serialize};
use transport::ApiRequest;

use crate::client::AuthClient;
use crate::error::Result;
use crate::{path_segment, validate};

pub const JOBS_PATH: &str = "/jobs";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    #[serde(alias = "_id")]
    pub id: String,
    pub role: String,
    pub company: String,
    #[serde(default)]
    pub salary: Option<String>,
    #[serde(default)]
    pub experience: Option<String>,
    #[serde(default)]
    pub job_description: Option<String>,
    #[serde(default)]
    pub posted_date: Option<String>,
}

/// Payload for a new posting. The server defaults `experience` to
/// "Fresher" and `posted_date` to now.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewJob {
    pub company: String,
    pub role: String,
    pub salary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experience: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub posted_date: Option<String>,
}

/// Partial update; only set fields are sent.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experience: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub posted_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JobEnvelope {
    job: Job,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Acknowledgement {
    #[serde(default, alias = "msg")]
    pub message: String,
}

/// All postings, newest first.
pub async fn list(client: &AuthClient) -> Result<Vec<Job>> {
    client.send_json(ApiRequest::get(JOBS_PATH)).await
}

pub async fn create(client: &AuthClient, job: &NewJob) -> Result<Job> {
    validate::required(
        &[&job.company, &job.role, &job.salary],
        "Company, role, and salary are required",
    )?;
    let envelope: JobEnvelope = client
        .send_json(ApiRequest::post(JOBS_PATH).json(job)?)
        .await?;
    Ok(envelope.job)
}

pub async fn update(client: &AuthClient, id: &str, changes: &JobUpdate) -> Result<Job> {
    let path = format!("{JOBS_PATH}/{}", path_segment(id)?);
    let envelope: JobEnvelope = client
        .send_json(ApiRequest::put(path).json(changes)?)
        .await?;
    Ok(envelope.job)
}

pub async fn delete(client: &AuthClient, id: &str) -> Result<Acknowledgement> {
    let path = format!("{JOBS_PATH}/{}", path_segment(id)?);
    client.send_json(ApiRequest::delete(path)).await
}
