//! Master-password authentication gate.
//!
//! A [`Session`] only exists on the far side of this gate: setting the master
//! password (first run) or verifying it (every run after) is what constructs
//! the session context and starts its background work.

use crate::config::SessionConfig;
use crate::error::EngineError;
use crate::session::Session;
use crate::validate;
use lockbox_core::SecretStore;
use std::sync::Arc;

pub struct Authenticator {
    store: Arc<dyn SecretStore>,
    config: SessionConfig,
}

impl Authenticator {
    pub fn new(store: Arc<dyn SecretStore>, config: SessionConfig) -> Self {
        Self { store, config }
    }

    pub async fn is_master_password_set(&self) -> Result<bool, EngineError> {
        Ok(self.store.is_master_password_set().await?)
    }

    /// First-run setup: validates length and confirmation client-side, then
    /// sets the password and opens a session.
    pub async fn set_master_password(
        &self,
        password: &str,
        confirm: &str,
    ) -> Result<Session, EngineError> {
        validate::validate_new_password(password, confirm, self.config.min_password_len)?;
        self.store.set_master_password(password).await?;
        Session::start(self.store.clone(), self.config.clone()).await
    }

    /// Verify the master password and open a session. A wrong password is
    /// `EngineError::Auth`; the engine never retries on the caller's behalf.
    pub async fn login(&self, password: &str) -> Result<Session, EngineError> {
        if !self.store.verify_master_password(password).await? {
            return Err(EngineError::Auth);
        }
        Session::start(self.store.clone(), self.config.clone()).await
    }
}
