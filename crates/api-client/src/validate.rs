//! Input checks run before a request is sent
//!
//! These mirror the server's own validation so the user gets the same
//! message without a round trip. The server stays authoritative.

use crate::error::{Error, Result};

/// Largest resume the upload endpoint accepts.
pub const MAX_RESUME_BYTES: usize = 2 * 1024 * 1024;

pub const MIN_NAME_LEN: usize = 2;
pub const MIN_PASSWORD_LEN: usize = 6;
pub const PHONE_DIGITS: usize = 10;

/// `local@domain.tld` with no whitespace and a TLD of at least two characters.
pub fn email(value: &str) -> Result<()> {
    if is_valid_email(value) {
        Ok(())
    } else {
        Err(Error::Invalid("Invalid email format".into()))
    }
}

fn is_valid_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && tld.chars().count() >= 2,
        None => false,
    }
}

pub fn name(value: &str) -> Result<()> {
    if value.trim().chars().count() < MIN_NAME_LEN {
        return Err(Error::Invalid(
            "The name must be at least two characters long".into(),
        ));
    }
    Ok(())
}

pub fn password(value: &str) -> Result<()> {
    if value.chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::Invalid(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

pub fn phone(value: &str) -> Result<()> {
    if value.len() != PHONE_DIGITS || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::Invalid("Mobile number should be 10 digits".into()));
    }
    Ok(())
}

pub fn resume_size(len: usize) -> Result<()> {
    if len == 0 {
        return Err(Error::Invalid("No file uploaded".into()));
    }
    if len > MAX_RESUME_BYTES {
        return Err(Error::Invalid(
            "File too large. Maximum allowed size is 2MB.".into(),
        ));
    }
    Ok(())
}

/// Reject blank required fields. `message` is shown as-is.
pub fn required(fields: &[&str], message: &str) -> Result<()> {
    if fields.iter().any(|f| f.trim().is_empty()) {
        return Err(Error::Invalid(message.to_string()));
    }
    Ok(())
}
