//! Command dispatch
//!
//! Each command maps onto one or two api-client calls and yields a JSON value
//! for printing. Reading local files (resumes) happens here, not in the
//! parser.

use anyhow::{Context, Result, bail};
use api_client::ai::{CoverLetterRequest, InterviewQuestionsRequest, ResumeFeedbackRequest};
use api_client::{
    ApplicationStats, ApplyRequest, AuthClient, JobUpdate, NewJob, ai, applications, jobs,
    profile, uploads, validate,
};
use serde_json::{Value, json};
use session::{AccessClaims, RegisterRequest};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::warn;

use crate::cli::{Command, USAGE};
use crate::config::Config;
use crate::error::Error;

/// Run one command against the API.
pub async fn execute(client: &AuthClient, config: &Config, command: Command) -> Result<Value> {
    let value = match command {
        Command::Login { email } => {
            let password = password(config)?;
            let user = client.login(&email, password).await?;
            json!({ "message": "Logged in", "user": user })
        }
        Command::Register {
            name,
            email,
            admin_key,
        } => {
            let password = password(config)?;
            let request = RegisterRequest {
                name,
                email,
                password: password.to_string(),
                role: admin_key.as_ref().map(|_| session::Role::Admin),
                admin_key,
            };
            let response = client.register(&request).await?;
            json!({ "message": response.message, "user": response.user })
        }
        Command::Logout => {
            client.logout().await?;
            json!({ "message": "Logged out" })
        }
        Command::Whoami => whoami(client).await?,
        Command::Refresh => {
            client.refresh_session().await?;
            json!({ "message": "Session refreshed" })
        }
        Command::ProfileUpdate { email, name } => {
            let user = profile::update(client, &profile::ProfileUpdate { name, email }).await?;
            serde_json::to_value(user)?
        }
        Command::Jobs => serde_json::to_value(jobs::list(client).await?)?,
        Command::JobAdd {
            company,
            role,
            salary,
            experience,
            description,
        } => {
            let job = jobs::create(
                client,
                &NewJob {
                    company,
                    role,
                    salary,
                    experience,
                    job_description: description,
                    posted_date: None,
                },
            )
            .await?;
            serde_json::to_value(job)?
        }
        Command::JobEdit {
            id,
            company,
            role,
            salary,
            experience,
            description,
        } => {
            let changes = JobUpdate {
                company,
                role,
                salary,
                experience,
                job_description: description,
                posted_date: None,
            };
            serde_json::to_value(jobs::update(client, &id, &changes).await?)?
        }
        Command::JobDelete { id } => serde_json::to_value(jobs::delete(client, &id).await?)?,
        Command::Apply {
            job_id,
            name,
            email,
            phone,
            resume,
            replace,
        } => {
            let applicant = Applicant {
                job_id,
                name,
                email,
                phone,
            };
            apply(client, applicant, &resume, replace.as_deref()).await?
        }
        Command::Applications { all } => {
            let list = if all {
                applications::all(client).await?
            } else {
                applications::mine(client).await?
            };
            serde_json::to_value(list)?
        }
        Command::Stats => {
            let list = applications::all(client).await?;
            serde_json::to_value(ApplicationStats::from_applications(&list))?
        }
        Command::SetStatus { id, status } => {
            serde_json::to_value(applications::update_status(client, &id, status).await?)?
        }
        Command::MarkViewed { id } => {
            serde_json::to_value(applications::mark_viewed(client, &id).await?)?
        }
        Command::CoverLetter {
            role,
            company,
            tone,
            resume,
            extra,
        } => {
            let resume_text = match resume {
                Some(path) => Some(read_text(&path).await?),
                None => None,
            };
            let request = CoverLetterRequest {
                role,
                company,
                resume_text,
                tone,
                extra_points: extra,
            };
            serde_json::to_value(ai::cover_letter(client, &request).await?)?
        }
        Command::Feedback {
            resume,
            job_description,
        } => {
            let request = ResumeFeedbackRequest {
                resume_text: read_text(&resume).await?,
                job_description,
            };
            serde_json::to_value(ai::resume_feedback(client, &request).await?)?
        }
        Command::Questions { role, company } => {
            let request = InterviewQuestionsRequest { role, company };
            serde_json::to_value(ai::interview_questions(client, &request).await?)?
        }
        Command::Help => Value::String(USAGE.to_string()),
        Command::Shell => bail!("already in a shell"),
    };

    Ok(value)
}

fn password(config: &Config) -> Result<&str> {
    config
        .session
        .password
        .as_ref()
        .map(|secret| secret.expose().as_str())
        .ok_or_else(|| Error::MissingPassword.into())
}

async fn whoami(client: &AuthClient) -> Result<Value> {
    let Some(user) = client.check_auth().await? else {
        return Ok(json!({ "authenticated": false }));
    };

    let expires_in = match client.store().access_token().await {
        Some(token) => AccessClaims::decode(&token)
            .ok()
            .and_then(|claims| claims.seconds_remaining(now_secs())),
        None => None,
    };

    Ok(json!({
        "authenticated": true,
        "user": user,
        "expiresInSecs": expires_in,
    }))
}

struct Applicant {
    job_id: String,
    name: String,
    email: String,
    phone: String,
}

/// Upload the resume, then submit the application. The upload is removed
/// again if the application is refused. With `replace`, that stored resume
/// is deleted before the new one is uploaded.
async fn apply(
    client: &AuthClient,
    applicant: Applicant,
    resume_path: &Path,
    replace: Option<&str>,
) -> Result<Value> {
    // Fail before uploading anything
    validate::name(&applicant.name)?;
    validate::email(&applicant.email)?;
    validate::phone(&applicant.phone)?;

    let resume = uploads::replace_resume(client, replace, resume_path)
        .await
        .with_context(|| format!("failed to upload {}", resume_path.display()))?;
    let public_id = resume.public_id.clone();

    let request = ApplyRequest {
        job_id: applicant.job_id,
        name: applicant.name,
        email: applicant.email,
        phone: applicant.phone,
        resume,
    };

    match applications::apply(client, &request).await {
        Ok(application) => Ok(serde_json::to_value(application)?),
        Err(e) => {
            if let Err(cleanup) = uploads::delete(client, &public_id).await {
                warn!(public_id = %public_id, error = %cleanup, "failed to remove orphaned resume");
            }
            Err(e.into())
        }
    }
}

async fn read_text(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
