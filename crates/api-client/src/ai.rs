//! AI-assisted text generation
//!
//! Thin bindings over the server's generative endpoints. Generation can take
//! several seconds; callers should size the transport timeout accordingly.

use serde::{Deserialize, Serialize};
use transport::ApiRequest;

use crate::client::AuthClient;
use crate::error::Result;
use crate::validate;

pub const COVER_LETTER_PATH: &str = "/ai/cover-letter";
pub const RESUME_FEEDBACK_PATH: &str = "/ai/resume-feedback";
pub const INTERVIEW_QUESTIONS_PATH: &str = "/ai/interview-questions";

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverLetterRequest {
    pub role: String,
    pub company: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume_text: Option<String>,
    /// Server default is "professional"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_points: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverLetter {
    #[serde(default)]
    pub cover_letter: String,
    #[serde(default)]
    pub highlights: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeFeedbackRequest {
    pub resume_text: String,
    pub job_description: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResumeFeedback {
    #[serde(default)]
    pub feedback: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct InterviewQuestionsRequest {
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InterviewQuestions {
    #[serde(default)]
    pub questions: Vec<String>,
}

pub async fn cover_letter(client: &AuthClient, request: &CoverLetterRequest) -> Result<CoverLetter> {
    validate::required(&[&request.role, &request.company], "Please provide role and company")?;
    client
        .send_json(ApiRequest::post(COVER_LETTER_PATH).json(request)?)
        .await
}

pub async fn resume_feedback(
    client: &AuthClient,
    request: &ResumeFeedbackRequest,
) -> Result<ResumeFeedback> {
    validate::required(
        &[&request.resume_text, &request.job_description],
        "Please provide resumeText and jobDescription",
    )?;
    client
        .send_json(ApiRequest::post(RESUME_FEEDBACK_PATH).json(request)?)
        .await
}

pub async fn interview_questions(
    client: &AuthClient,
    request: &InterviewQuestionsRequest,
) -> Result<InterviewQuestions> {
    validate::required(&[&request.role], "Please provide role")?;
    client
        .send_json(ApiRequest::post(INTERVIEW_QUESTIONS_PATH).json(request)?)
        .await
}
