use crate::error::EngineError;
use lockbox_core::{CreateLockbox, UpdateLockbox};

pub(crate) fn validate_create(req: &CreateLockbox) -> Result<(), EngineError> {
    if req.name.trim().is_empty() {
        return Err(EngineError::Validation("name must not be empty".into()));
    }
    if req.content.trim().is_empty() {
        return Err(EngineError::Validation("content must not be empty".into()));
    }
    Ok(())
}

pub(crate) fn validate_update(req: &UpdateLockbox) -> Result<(), EngineError> {
    if req.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(EngineError::Validation("name must not be empty".into()));
    }
    if req.content.as_deref().is_some_and(|c| c.trim().is_empty()) {
        return Err(EngineError::Validation("content must not be empty".into()));
    }
    Ok(())
}

pub(crate) fn validate_new_password(
    password: &str,
    confirm: &str,
    min_len: usize,
) -> Result<(), EngineError> {
    if password.len() < min_len {
        return Err(EngineError::Validation(format!(
            "password must be at least {min_len} characters"
        )));
    }
    if password != confirm {
        return Err(EngineError::Validation(
            "password confirmation does not match".into(),
        ));
    }
    Ok(())
}
