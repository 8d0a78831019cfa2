//! Registration, login and user lookup.

use uuid::Uuid;

use crate::credential::{check_password_strength, Credential, Verification};
use crate::db::{Database, UserRepository};
use crate::error::{LedgerError, Result};
use crate::models::{User, UserProfile};

#[derive(Clone)]
pub struct IdentityStore {
    db: Database,
}

impl IdentityStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn users(&self) -> UserRepository {
        UserRepository::new(self.db.clone())
    }

    /// Creates a user with a salted password hash.
    ///
    /// Fails with `WeakPassword` before touching storage, and with
    /// `EmailTaken` if any user already has the (normalized) email.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<UserProfile> {
        if !check_password_strength(password).is_valid {
            return Err(LedgerError::WeakPassword);
        }

        let repo = self.users();
        let _users = self.db.locks().users.lock().await;

        let user = User::new(name.trim(), email, Credential::from_password(password));
        if repo.get_by_email(&user.email).await?.is_some() {
            return Err(LedgerError::EmailTaken(user.email));
        }
        repo.create(&user).await?;

        tracing::info!(user_id = %user.id, "registered user");
        Ok(user.profile())
    }

    /// Checks an email/password pair.
    ///
    /// A user still carrying a plaintext legacy credential is moved to a
    /// salted hash on the first successful login.
    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile> {
        let repo = self.users();
        let _users = self.db.locks().users.lock().await;

        let user = repo
            .get_by_email(email)
            .await?
            .ok_or(LedgerError::InvalidCredentials)?;

        match user.credential.verify(password) {
            Verification::Rejected => Err(LedgerError::InvalidCredentials),
            Verification::Accepted => Ok(user.profile()),
            Verification::Upgraded(credential) => {
                repo.update_credential(user.id, &credential).await?;
                tracing::info!(user_id = %user.id, "migrated legacy credential");
                Ok(user.profile())
            }
        }
    }

    pub async fn get(&self, user_id: Uuid) -> Result<Option<UserProfile>> {
        Ok(self.users().get_by_id(user_id).await?.map(|u| u.profile()))
    }

    /// Display name for a user id, as denormalized onto usage days.
    pub async fn resolve_name(&self, user_id: Uuid) -> Result<String> {
        self.get(user_id)
            .await?
            .map(|p| p.name)
            .ok_or(LedgerError::UserNotFound(user_id))
    }

    pub async fn list(&self) -> Result<Vec<UserProfile>> {
        Ok(self
            .users()
            .list()
            .await?
            .into_iter()
            .map(|u| u.profile())
            .collect())
    }
}
