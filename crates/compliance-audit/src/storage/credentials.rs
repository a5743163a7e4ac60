//! Admin credentials
//!
//! The password is kept in plain text under a single key, seeded with a fixed fallback on
//! first run. There is no hashing, lockout or rate limiting.

use std::sync::Arc;

use super::kv::KeyValueStore;
use crate::config::AdminConfig;
use crate::error::{Error, Result};

/// Storage key holding the admin password
pub const PASSWORD_KEY: &str = "admin_password";

pub struct CredentialStore {
    backing: Arc<dyn KeyValueStore>,
    admin_id: String,
    default_password: String,
}

impl CredentialStore {
    pub fn new(backing: Arc<dyn KeyValueStore>, config: &AdminConfig) -> Self {
        Self {
            backing,
            admin_id: config.admin_id.clone(),
            default_password: config.default_password.clone(),
        }
    }

    /// Seed the fallback password if none is stored
    pub async fn ensure_default(&self) -> Result<()> {
        if self.backing.get(PASSWORD_KEY).await?.is_none() {
            self.backing.set(PASSWORD_KEY, &self.default_password).await?;
            tracing::info!("Admin password initialized to the default");
        }
        Ok(())
    }

    async fn current_password(&self) -> Result<String> {
        Ok(self
            .backing
            .get(PASSWORD_KEY)
            .await?
            .unwrap_or_else(|| self.default_password.clone()))
    }

    /// Check an admin login
    pub async fn verify(&self, admin_id: &str, password: &str) -> Result<()> {
        if admin_id == self.admin_id && password == self.current_password().await? {
            Ok(())
        } else {
            tracing::warn!("Rejected admin login for {:?}", admin_id);
            Err(Error::Unauthorized(
                "아이디 또는 비밀번호가 일치하지 않습니다.".to_string(),
            ))
        }
    }

    /// Change the password after confirming the current one
    pub async fn change_password(&self, current: &str, new: &str, confirm: &str) -> Result<()> {
        if current != self.current_password().await? {
            return Err(Error::Unauthorized("Current password is incorrect".to_string()));
        }
        if new != confirm {
            return Err(Error::validation("New password and confirmation do not match"));
        }
        if new.is_empty() {
            return Err(Error::validation("New password must not be empty"));
        }

        self.backing.set(PASSWORD_KEY, new).await?;
        tracing::info!("Admin password changed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn store() -> (Arc<MemoryStore>, CredentialStore) {
        let backing = Arc::new(MemoryStore::new());
        let creds = CredentialStore::new(backing.clone(), &AdminConfig::default());
        (backing, creds)
    }

    #[tokio::test]
    async fn test_default_password_seeded() {
        let (backing, creds) = store();
        creds.ensure_default().await.unwrap();

        assert_eq!(backing.get(PASSWORD_KEY).await.unwrap().as_deref(), Some("0000"));
        assert!(creds.verify("kidari", "0000").await.is_ok());
        assert!(matches!(
            creds.verify("admin", "0000").await,
            Err(Error::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_existing_password_not_overwritten() {
        let (backing, creds) = store();
        backing.set(PASSWORD_KEY, "s3cret").await.unwrap();
        creds.ensure_default().await.unwrap();

        assert!(creds.verify("kidari", "0000").await.is_err());
        assert!(creds.verify("kidari", "s3cret").await.is_ok());
    }

    #[tokio::test]
    async fn test_change_password() {
        let (_, creds) = store();
        creds.ensure_default().await.unwrap();

        assert!(matches!(
            creds.change_password("1234", "new", "new").await,
            Err(Error::Unauthorized(_))
        ));
        assert!(matches!(
            creds.change_password("0000", "new", "other").await,
            Err(Error::Validation(_))
        ));

        creds.change_password("0000", "new", "new").await.unwrap();
        assert!(creds.verify("kidari", "new").await.is_ok());
        assert!(creds.verify("kidari", "0000").await.is_err());
    }
}
