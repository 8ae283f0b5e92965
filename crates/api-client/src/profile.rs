//! Signed-in user's profile

use serde::Serialize;
use session::User;
use transport::ApiRequest;

use crate::client::{AuthClient, PROFILE_PATH};
use crate::error::Result;
use crate::validate;

/// Fields the user may change. The server requires a valid email on every
/// update.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub email: String,
}

pub async fn get(client: &AuthClient) -> Result<User> {
    let user: User = client.send_json(ApiRequest::get(PROFILE_PATH)).await?;
    client.store().set_identity(user.clone()).await;
    Ok(user)
}

/// Update the profile and record the returned identity.
pub async fn update(client: &AuthClient, changes: &ProfileUpdate) -> Result<User> {
    validate::email(&changes.email)?;
    if let Some(name) = &changes.name {
        validate::name(name)?;
    }

    let user: User = client
        .send_json(ApiRequest::put(PROFILE_PATH).json(changes)?)
        .await?;
    client.store().set_identity(user.clone()).await;
    Ok(user)
}
