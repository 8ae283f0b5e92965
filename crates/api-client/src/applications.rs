//! Job applications and the applicant pipeline

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use transport::ApiRequest;

use crate::client::AuthClient;
use crate::error::{Error, Result};
use crate::{path_segment, validate};

pub const APPLY_PATH: &str = "/applications/apply";
pub const MY_APPLICATIONS_PATH: &str = "/applications/my-applications";
pub const ALL_APPLICATIONS_PATH: &str = "/applications/getapplications";

/// Pipeline stage. Changing it emails the applicant server-side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApplicationStatus {
    #[default]
    Applied,
    #[serde(rename = "Interview Scheduled")]
    InterviewScheduled,
    Offer,
    Rejected,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 4] = [
        ApplicationStatus::Applied,
        ApplicationStatus::InterviewScheduled,
        ApplicationStatus::Offer,
        ApplicationStatus::Rejected,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ApplicationStatus::Applied => "Applied",
            ApplicationStatus::InterviewScheduled => "Interview Scheduled",
            ApplicationStatus::Offer => "Offer",
            ApplicationStatus::Rejected => "Rejected",
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ApplicationStatus {
    type Err = Error;

    /// Case-insensitive; accepts "interview-scheduled" and "interview_scheduled".
    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase().replace(['-', '_'], " ");
        match normalized.as_str() {
            "applied" => Ok(ApplicationStatus::Applied),
            "interview scheduled" | "interview" => Ok(ApplicationStatus::InterviewScheduled),
            "offer" => Ok(ApplicationStatus::Offer),
            "rejected" => Ok(ApplicationStatus::Rejected),
            _ => Err(Error::Invalid(format!(
                "unknown application status {s:?} (expected Applied, Interview Scheduled, Offer or Rejected)"
            ))),
        }
    }
}

/// Uploaded resume as returned by the upload endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeRef {
    pub url: String,
    pub public_id: String,
    pub original_name: String,
}

/// Job details copied onto the application when it was submitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSnapshot {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub salary: Option<String>,
    #[serde(default)]
    pub experience: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub resume: ResumeRef,
    #[serde(default)]
    pub job_snapshot: Option<JobSnapshot>,
    #[serde(default)]
    pub status: ApplicationStatus,
    #[serde(default)]
    pub viewed_by_admin: bool,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Application {
    /// "role at company" from the snapshot, if present.
    pub fn headline(&self) -> String {
        let snapshot = self.job_snapshot.clone().unwrap_or_default();
        format!(
            "{} at {}",
            snapshot.role.as_deref().unwrap_or("unknown role"),
            snapshot.company.as_deref().unwrap_or("unknown company"),
        )
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyRequest {
    pub job_id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub resume: ResumeRef,
}

#[derive(Debug, Deserialize)]
struct ApplicationEnvelope {
    application: Application,
}

#[derive(Debug, Serialize)]
struct StatusChange {
    status: ApplicationStatus,
}

/// Counts per pipeline stage, for the admin analytics view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationStats {
    pub total: usize,
    pub applied: usize,
    pub interview_scheduled: usize,
    pub offer: usize,
    pub rejected: usize,
    pub unviewed: usize,
}

impl ApplicationStats {
    pub fn from_applications(applications: &[Application]) -> Self {
        let mut stats = Self {
            total: applications.len(),
            ..Self::default()
        };
        for application in applications {
            match application.status {
                ApplicationStatus::Applied => stats.applied += 1,
                ApplicationStatus::InterviewScheduled => stats.interview_scheduled += 1,
                ApplicationStatus::Offer => stats.offer += 1,
                ApplicationStatus::Rejected => stats.rejected += 1,
            }
            if !application.viewed_by_admin {
                stats.unviewed += 1;
            }
        }
        stats
    }
}

/// Submit an application. The server rejects duplicates per job.
pub async fn apply(client: &AuthClient, request: &ApplyRequest) -> Result<Application> {
    validate::required(
        &[&request.job_id, &request.name, &request.email, &request.phone],
        "Missing required fields",
    )?;
    validate::email(&request.email)?;
    validate::name(&request.name)?;
    validate::phone(&request.phone)?;
    validate::required(
        &[
            &request.resume.url,
            &request.resume.public_id,
            &request.resume.original_name,
        ],
        "Resume upload information is missing",
    )?;

    let envelope: ApplicationEnvelope = client
        .send_json(ApiRequest::post(APPLY_PATH).json(request)?)
        .await?;
    Ok(envelope.application)
}

/// The signed-in user's applications, newest first.
pub async fn mine(client: &AuthClient) -> Result<Vec<Application>> {
    client.send_json(ApiRequest::get(MY_APPLICATIONS_PATH)).await
}

/// Every application (admin only).
pub async fn all(client: &AuthClient) -> Result<Vec<Application>> {
    client.send_json(ApiRequest::get(ALL_APPLICATIONS_PATH)).await
}

/// Move an application to a new stage (admin only).
pub async fn update_status(
    client: &AuthClient,
    id: &str,
    status: ApplicationStatus,
) -> Result<Application> {
    let path = format!("/applications/{}/status", path_segment(id)?);
    let envelope: ApplicationEnvelope = client
        .send_json(ApiRequest::put(path).json(&StatusChange { status })?)
        .await?;
    Ok(envelope.application)
}

/// Record that an admin opened the resume.
pub async fn mark_viewed(client: &AuthClient, id: &str) -> Result<Application> {
    let path = format!("/applications/{}/viewed", path_segment(id)?);
    let envelope: ApplicationEnvelope = client.send_json(ApiRequest::put(path)).await?;
    Ok(envelope.application)
}
