//! Data access for `sys_users`. Every read skips soft-deleted rows.

use super::page_offset;
use crate::models::user::{NewUser, User, UserChanges};
use chrono::Utc;
use sqlx::{QueryBuilder, SqlitePool, sqlite::Sqlite};

const USER_COLUMNS: &str = "user_id, user_name, email, hashed_password, full_name, is_active, \
                            is_deleted, user_type, created_at, updated_at";

#[derive(Clone)]
pub struct UserRepository {
    db: SqlitePool,
}

impl UserRepository {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn get_by_id(&self, user_id: i64) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM sys_users WHERE user_id = ? AND is_deleted = 0",
            USER_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
    }

    pub async fn get_by_user_name(&self, user_name: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM sys_users WHERE user_name = ? AND is_deleted = 0",
            USER_COLUMNS
        ))
        .bind(user_name)
        .fetch_optional(&self.db)
        .await
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM sys_users WHERE email = ? AND is_deleted = 0",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await
    }

    /// One page of users, newest first, plus the total count.
    pub async fn get_list(&self, page: i64, size: i64) -> Result<(Vec<User>, i64), sqlx::Error> {
        let offset = page_offset(page, size);

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sys_users WHERE is_deleted = 0")
            .fetch_one(&self.db)
            .await?;

        let items = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM sys_users WHERE is_deleted = 0 ORDER BY user_id DESC LIMIT ? OFFSET ?",
            USER_COLUMNS
        ))
        .bind(size)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;

        Ok((items, total))
    }

    pub async fn create(&self, user: NewUser) -> Result<User, sqlx::Error> {
        let now = Utc::now();
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO sys_users (
                user_name, email, hashed_password, full_name,
                is_active, is_deleted, user_type, created_at, updated_at
             ) VALUES (?, ?, ?, ?, 1, 0, ?, ?, ?)
             RETURNING {}",
            USER_COLUMNS
        ))
        .bind(&user.user_name)
        .bind(&user.email)
        .bind(&user.hashed_password)
        .bind(&user.full_name)
        .bind(user.user_type)
        .bind(now)
        .bind(now)
        .fetch_one(&self.db)
        .await
    }

    /// Apply `changes` and return the refreshed row, or `None` when the user
    /// does not exist.
    pub async fn update(
        &self,
        user_id: i64,
        changes: UserChanges,
    ) -> Result<Option<User>, sqlx::Error> {
        let mut builder = QueryBuilder::<Sqlite>::new("UPDATE sys_users SET updated_at = ");
        builder.push_bind(Utc::now());

        if let Some(email) = changes.email {
            builder.push(", email = ");
            builder.push_bind(email);
        }
        if let Some(full_name) = changes.full_name {
            builder.push(", full_name = ");
            builder.push_bind(full_name);
        }
        if let Some(hash) = changes.hashed_password {
            builder.push(", hashed_password = ");
            builder.push_bind(hash);
        }
        if let Some(active) = changes.is_active {
            builder.push(", is_active = ");
            builder.push_bind(active);
        }

        builder.push(" WHERE user_id = ");
        builder.push_bind(user_id);
        builder.push(" AND is_deleted = 0");

        let result = builder.build().execute(&self.db).await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_by_id(user_id).await
    }

    pub async fn set_user_type(&self, user_id: i64, user_type: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE sys_users SET user_type = ?, updated_at = ? WHERE user_id = ? AND is_deleted = 0",
        )
        .bind(user_type)
        .bind(Utc::now())
        .bind(user_id)
        .execute(&self.db)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Soft delete. Returns false when nothing was deleted.
    ///
    /// The unique columns are renamed so the name and email can be reused.
    pub async fn delete(&self, user_id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE sys_users
             SET is_deleted = 1,
                 user_name = user_name || '#deleted-' || user_id,
                 email = CASE WHEN email IS NULL THEN NULL ELSE email || '#deleted-' || user_id END,
                 updated_at = ?
             WHERE user_id = ? AND is_deleted = 0",
        )
        .bind(Utc::now())
        .bind(user_id)
        .execute(&self.db)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Return true if SQLx error indicates a unique constraint violation.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.message().to_ascii_lowercase().contains("unique")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db, models::user::USER_TYPE_NORMAL};

    async fn repo() -> UserRepository {
        let pool = db::connect("sqlite::memory:").await.unwrap();
        db::run_migrations(&pool).await.unwrap();
        UserRepository::new(pool)
    }

    fn new_user(name: &str, email: Option<&str>) -> NewUser {
        NewUser {
            user_name: name.into(),
            email: email.map(str::to_string),
            hashed_password: "hash".into(),
            full_name: None,
            user_type: USER_TYPE_NORMAL,
        }
    }

    #[tokio::test]
    async fn create_then_lookup_by_each_key() {
        let repo = repo().await;
        let created = repo
            .create(new_user("alice", Some("alice@example.com")))
            .await
            .unwrap();
        assert!(created.is_active);
        assert!(!created.is_deleted);

        let by_id = repo.get_by_id(created.user_id).await.unwrap().unwrap();
        assert_eq!(by_id.user_name, "alice");
        assert!(repo.get_by_user_name("alice").await.unwrap().is_some());
        assert!(
            repo.get_by_email("alice@example.com")
                .await
                .unwrap()
                .is_some()
        );
        assert!(repo.get_by_user_name("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_user_name_is_a_unique_violation() {
        let repo = repo().await;
        repo.create(new_user("alice", None)).await.unwrap();
        let err = repo.create(new_user("alice", None)).await.unwrap_err();
        assert!(is_unique_violation(&err));
    }

    #[tokio::test]
    async fn list_is_newest_first_and_paged() {
        let repo = repo().await;
        for name in ["u-one", "u-two", "u-three"] {
            repo.create(new_user(name, None)).await.unwrap();
        }

        let (page1, total) = repo.get_list(1, 2).await.unwrap();
        assert_eq!(total, 3);
        assert_eq!(
            page1.iter().map(|u| u.user_name.as_str()).collect::<Vec<_>>(),
            vec!["u-three", "u-two"]
        );

        let (page2, _) = repo.get_list(2, 2).await.unwrap();
        assert_eq!(page2.len(), 1);
        assert_eq!(page2[0].user_name, "u-one");
    }

    #[tokio::test]
    async fn update_only_touches_given_columns() {
        let repo = repo().await;
        let user = repo
            .create(new_user("alice", Some("a@example.com")))
            .await
            .unwrap();

        let updated = repo
            .update(
                user.user_id,
                UserChanges {
                    full_name: Some("Alice A.".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.full_name.as_deref(), Some("Alice A."));
        assert_eq!(updated.email.as_deref(), Some("a@example.com"));
        assert!(updated.updated_at >= user.updated_at);

        assert!(
            repo.update(999, UserChanges::default())
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn soft_delete_hides_user_and_frees_name() {
        let repo = repo().await;
        let user = repo
            .create(new_user("alice", Some("a@example.com")))
            .await
            .unwrap();

        assert!(repo.delete(user.user_id).await.unwrap());
        assert!(!repo.delete(user.user_id).await.unwrap());
        assert!(repo.get_by_id(user.user_id).await.unwrap().is_none());
        assert_eq!(repo.get_list(1, 10).await.unwrap().1, 0);

        repo.create(new_user("alice", Some("a@example.com")))
            .await
            .unwrap();
    }
}
