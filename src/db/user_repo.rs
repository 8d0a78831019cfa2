use sqlx::SqliteExecutor;
use uuid::Uuid;

use super::{parse_timestamp, parse_uuid, Database};
use crate::credential::Credential;
use crate::models::{normalize_email, User};

pub struct UserRepository {
    db: Database,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: String,
    name: String,
    email: String,
    password_hash: Option<String>,
    password_salt: Option<String>,
    legacy_password: Option<String>,
    created_at: String,
}

impl UserRow {
    fn into_user(self) -> Result<User, sqlx::Error> {
        let credential = match (self.password_hash, self.password_salt, self.legacy_password) {
            (Some(hash), Some(salt), _) => Credential::Hashed { hash, salt },
            (_, _, Some(password)) => Credential::Legacy { password },
            _ => {
                return Err(sqlx::Error::Decode(
                    format!("user {} has no credential", self.id).into(),
                ))
            }
        };

        Ok(User {
            id: parse_uuid(&self.id)?,
            name: self.name,
            email: self.email,
            credential,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

/// Splits a credential into the (hash, salt, legacy) column triple.
fn credential_columns(credential: &Credential) -> (Option<&str>, Option<&str>, Option<&str>) {
    match credential {
        Credential::Hashed { hash, salt } => (Some(hash.as_str()), Some(salt.as_str()), None),
        Credential::Legacy { password } => (None, None, Some(password.as_str())),
    }
}

/// Stores the email normalized, whatever path the record came in on.
pub(crate) async fn insert_user<'e, E>(executor: E, user: &User) -> Result<(), sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let (hash, salt, legacy) = credential_columns(&user.credential);

    sqlx::query(
        r#"
        INSERT INTO users (id, name, email, password_hash, password_salt, legacy_password, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(user.id.to_string())
    .bind(&user.name)
    .bind(normalize_email(&user.email))
    .bind(hash)
    .bind(salt)
    .bind(legacy)
    .bind(user.created_at.to_rfc3339())
    .execute(executor)
    .await?;

    Ok(())
}

pub(crate) async fn list_users<'e, E>(executor: E) -> Result<Vec<User>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let rows: Vec<UserRow> = sqlx::query_as("SELECT * FROM users ORDER BY rowid")
        .fetch_all(executor)
        .await?;

    rows.into_iter().map(UserRow::into_user).collect()
}

impl UserRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn create(&self, user: &User) -> Result<(), sqlx::Error> {
        insert_user(self.db.pool(), user).await
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<User>, sqlx::Error> {
        let row: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(self.db.pool())
            .await?;

        row.map(UserRow::into_user).transpose()
    }

    /// Looks up a user by email. If a sync left two records with the same
    /// email, the oldest row wins.
    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        let row: Option<UserRow> =
            sqlx::query_as("SELECT * FROM users WHERE email = ? ORDER BY rowid LIMIT 1")
                .bind(normalize_email(email))
                .fetch_optional(self.db.pool())
                .await?;

        row.map(UserRow::into_user).transpose()
    }

    pub async fn list(&self) -> Result<Vec<User>, sqlx::Error> {
        list_users(self.db.pool()).await
    }

    pub async fn update_credential(
        &self,
        id: Uuid,
        credential: &Credential,
    ) -> Result<(), sqlx::Error> {
        let (hash, salt, legacy) = credential_columns(credential);

        sqlx::query(
            "UPDATE users SET password_hash = ?, password_salt = ?, legacy_password = ? WHERE id = ?",
        )
        .bind(hash)
        .bind(salt)
        .bind(legacy)
        .bind(id.to_string())
        .execute(self.db.pool())
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::setup_db;

    #[tokio::test]
    async fn test_create_and_get_user() {
        let ctx = setup_db().await;
        let repo = UserRepository::new(ctx.db.clone());

        let user = User::new("Ana", "ana@example.com", Credential::from_password("pw"));
        repo.create(&user).await.unwrap();

        let fetched = repo.get_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(fetched, user);

        let by_email = repo.get_by_email("ANA@example.com ").await.unwrap().unwrap();
        assert_eq!(by_email.id, user.id);
    }

    #[tokio::test]
    async fn test_get_missing_user() {
        let ctx = setup_db().await;
        let repo = UserRepository::new(ctx.db.clone());

        assert!(repo.get_by_id(Uuid::new_v4()).await.unwrap().is_none());
        assert!(repo.get_by_email("nobody@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_legacy_credential_roundtrip_and_update() {
        let ctx = setup_db().await;
        let repo = UserRepository::new(ctx.db.clone());

        let user = User::new(
            "Old",
            "old@example.com",
            Credential::Legacy {
                password: "legacy".to_string(),
            },
        );
        repo.create(&user).await.unwrap();

        let fetched = repo.get_by_id(user.id).await.unwrap().unwrap();
        assert!(fetched.credential.is_legacy());

        let replacement = Credential::from_password("legacy");
        repo.update_credential(user.id, &replacement).await.unwrap();

        let fetched = repo.get_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(fetched.credential, replacement);

        let (legacy,): (Option<String>,) =
            sqlx::query_as("SELECT legacy_password FROM users WHERE id = ?")
                .bind(user.id.to_string())
                .fetch_one(ctx.db.pool())
                .await
                .unwrap();
        assert!(legacy.is_none());
    }

    #[tokio::test]
    async fn test_list_preserves_insertion_order() {
        let ctx = setup_db().await;
        let repo = UserRepository::new(ctx.db.clone());

        for name in ["Zoe", "Ana", "Max"] {
            let email = format!("{}@example.com", name.to_lowercase());
            repo.create(&User::new(name, email, Credential::from_password("pw")))
                .await
                .unwrap();
        }

        let names: Vec<String> = repo.list().await.unwrap().into_iter().map(|u| u.name).collect();
        assert_eq!(names, vec!["Zoe", "Ana", "Max"]);
    }

    #[tokio::test]
    async fn test_stored_email_is_normalized() {
        let ctx = setup_db().await;
        let repo = UserRepository::new(ctx.db.clone());

        let mut user = User::new("Ana", "ana@example.com", Credential::from_password("pw"));
        user.email = " Ana@Example.com".to_string();
        repo.create(&user).await.unwrap();

        let by_email = repo.get_by_email("Ana@Example.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, user.id);
        assert_eq!(by_email.email, "ana@example.com");
    }
}
