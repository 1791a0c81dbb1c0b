use crate::{
    models::user::{
        NewUser, USER_TYPE_ADMIN, USER_TYPE_NORMAL, User, UserChanges, UserCreate, UserOut,
        UserUpdate,
    },
    repositories::user_repository::{UserRepository, is_unique_violation},
    response::PageData,
    services::{
        password::{self, PasswordError},
        permissions::{self, PermissionDenied, UserOperation},
        token_store::TokenStore,
        validation::{self, ValidationError},
    },
};
use thiserror::Error;

pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Error)]
pub enum UserError {
    #[error("User {0} does not exist")]
    NotFound(i64),
    #[error("User name {0} already exists")]
    UserNameTaken(String),
    #[error("Email {0} is already registered")]
    EmailTaken(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Forbidden(#[from] PermissionDenied),
    #[error(transparent)]
    Password(#[from] PasswordError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type UserResult<T> = Result<T, UserError>;

/// Business rules for user accounts.
#[derive(Clone)]
pub struct UserService {
    repo: UserRepository,
    store: TokenStore,
}

impl UserService {
    pub fn new(repo: UserRepository, store: TokenStore) -> Self {
        Self { repo, store }
    }

    pub async fn get_user(&self, user_id: i64) -> UserResult<User> {
        self.repo
            .get_by_id(user_id)
            .await?
            .ok_or(UserError::NotFound(user_id))
    }

    /// Fetch a user on behalf of `actor`, enforcing view permission.
    pub async fn view_user(&self, user_id: i64, actor: &User) -> UserResult<UserOut> {
        let target = self.get_user(user_id).await?;
        permissions::can_operate_user(actor, &target, UserOperation::View)?;
        Ok(target.into())
    }

    pub async fn list_users(&self, page: i64, size: i64) -> UserResult<PageData<UserOut>> {
        let page = page.max(1);
        let size = size.clamp(1, MAX_PAGE_SIZE);
        let (users, total) = self.repo.get_list(page, size).await?;
        Ok(PageData::new(users, total, page, size).map(UserOut::from))
    }

    /// Register a normal user.
    pub async fn create_user(&self, input: UserCreate) -> UserResult<UserOut> {
        let user = self.insert(input, USER_TYPE_NORMAL).await?;
        tracing::info!(user_id = user.user_id, user_name = %user.user_name, "user created");
        Ok(user.into())
    }

    async fn insert(&self, input: UserCreate, user_type: i64) -> UserResult<User> {
        let user_name = input.user_name.trim().to_string();
        let email = normalize(input.email);
        let full_name = normalize(input.full_name);

        validation::validate_user_name(&user_name)?;
        validation::validate_password(&input.password)?;
        if let Some(email) = &email {
            validation::validate_email(email)?;
        }
        if let Some(full_name) = &full_name {
            validation::validate_full_name(full_name)?;
        }

        if self.repo.get_by_user_name(&user_name).await?.is_some() {
            return Err(UserError::UserNameTaken(user_name));
        }
        if let Some(email) = &email {
            if self.repo.get_by_email(email).await?.is_some() {
                return Err(UserError::EmailTaken(email.clone()));
            }
        }

        let hashed_password = password::hash_password_async(input.password).await?;
        let new_user = NewUser {
            user_name: user_name.clone(),
            email,
            hashed_password,
            full_name,
            user_type,
        };
        match self.repo.create(new_user).await {
            Ok(user) => Ok(user),
            // Lost a race against a concurrent registration.
            Err(err) if is_unique_violation(&err) => Err(UserError::UserNameTaken(user_name)),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn update_user(
        &self,
        user_id: i64,
        input: UserUpdate,
        actor: &User,
    ) -> UserResult<UserOut> {
        let target = self.get_user(user_id).await?;
        permissions::can_operate_user(actor, &target, UserOperation::Update)?;

        if input.is_active.is_some() && !actor.is_admin() {
            return Err(PermissionDenied::new(
                "Only administrators can change the account status",
            )
            .into());
        }

        let mut changes = UserChanges {
            email: normalize(input.email),
            full_name: input.full_name.map(|name| name.trim().to_string()),
            is_active: input.is_active,
            ..Default::default()
        };

        if let Some(email) = &changes.email {
            validation::validate_email(email)?;
            if let Some(owner) = self.repo.get_by_email(email).await? {
                if owner.user_id != user_id {
                    return Err(UserError::EmailTaken(email.clone()));
                }
            }
        }
        if let Some(full_name) = &changes.full_name {
            validation::validate_full_name(full_name)?;
        }
        if let Some(new_password) = input.password {
            validation::validate_password(&new_password)?;
            changes.hashed_password = Some(password::hash_password_async(new_password).await?);
        }

        if changes.is_empty() {
            return Ok(target.into());
        }

        let deactivated = changes.is_active == Some(false) && target.is_active;
        let new_email = changes.email.clone().unwrap_or_default();
        let updated = match self.repo.update(user_id, changes).await {
            Ok(Some(user)) => user,
            Ok(None) => return Err(UserError::NotFound(user_id)),
            Err(err) if is_unique_violation(&err) => {
                return Err(UserError::EmailTaken(new_email));
            }
            Err(err) => return Err(err.into()),
        };

        if deactivated {
            self.store.revoke_all_user_tokens(user_id).await;
        }
        tracing::info!(user_id, actor = actor.user_id, "user updated");
        Ok(updated.into())
    }

    pub async fn delete_user(&self, user_id: i64, actor: &User) -> UserResult<()> {
        let target = self.get_user(user_id).await?;
        permissions::can_operate_user(actor, &target, UserOperation::Delete)?;

        if !self.repo.delete(user_id).await? {
            return Err(UserError::NotFound(user_id));
        }
        self.store.revoke_all_user_tokens(user_id).await;
        tracing::info!(user_id, actor = actor.user_id, "user deleted");
        Ok(())
    }

    /// Create an administrator, or promote an existing account and reset its
    /// password. Returns the user and whether it was newly created.
    pub async fn ensure_admin(&self, user_name: &str, secret: &str) -> UserResult<(User, bool)> {
        validation::validate_password(secret)?;

        let Some(existing) = self.repo.get_by_user_name(user_name.trim()).await? else {
            let input = UserCreate {
                user_name: user_name.to_string(),
                password: secret.to_string(),
                email: None,
                full_name: None,
            };
            let user = self.insert(input, USER_TYPE_ADMIN).await?;
            return Ok((user, true));
        };

        self.repo
            .set_user_type(existing.user_id, USER_TYPE_ADMIN)
            .await?;
        let changes = UserChanges {
            hashed_password: Some(password::hash_password_async(secret.to_string()).await?),
            is_active: Some(true),
            ..Default::default()
        };
        let user = self
            .repo
            .update(existing.user_id, changes)
            .await?
            .ok_or(UserError::NotFound(existing.user_id))?;
        self.store.revoke_all_user_tokens(user.user_id).await;
        Ok((user, false))
    }
}

/// Trim, and treat blank strings as absent.
fn normalize(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use std::time::Duration;

    const PASSWORD: &str = "Str0ng!Pass";

    async fn service() -> (UserService, TokenStore) {
        let pool = db::connect("sqlite::memory:").await.unwrap();
        db::run_migrations(&pool).await.unwrap();
        let store = TokenStore::new(Duration::from_secs(60), Duration::from_secs(600));
        (UserService::new(UserRepository::new(pool), store.clone()), store)
    }

    fn create(name: &str, email: Option<&str>) -> UserCreate {
        UserCreate {
            user_name: name.into(),
            password: PASSWORD.into(),
            email: email.map(str::to_string),
            full_name: None,
        }
    }

    #[tokio::test]
    async fn registration_creates_normal_user_with_hashed_password() {
        let (svc, _) = service().await;
        let out = svc
            .create_user(create("alice", Some("alice@example.com")))
            .await
            .unwrap();
        assert_eq!(out.user_type, USER_TYPE_NORMAL);
        assert!(out.is_active);

        let stored = svc.get_user(out.user_id).await.unwrap();
        assert_ne!(stored.hashed_password, PASSWORD);
        assert!(password::verify_password(PASSWORD, &stored.hashed_password));
    }

    #[tokio::test]
    async fn duplicates_are_business_errors() {
        let (svc, _) = service().await;
        svc.create_user(create("alice", Some("a@example.com")))
            .await
            .unwrap();

        let err = svc.create_user(create("alice", None)).await.unwrap_err();
        assert_eq!(err.to_string(), "User name alice already exists");

        let err = svc
            .create_user(create("bob", Some("a@example.com")))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Email a@example.com is already registered");
    }

    #[tokio::test]
    async fn invalid_input_is_rejected_before_insert() {
        let (svc, _) = service().await;
        let mut weak = create("alice", None);
        weak.password = "password1A!".into();
        assert!(matches!(
            svc.create_user(weak).await,
            Err(UserError::Validation(ValidationError { field: "password", .. }))
        ));
        assert!(matches!(
            svc.create_user(create("alice", Some("nope"))).await,
            Err(UserError::Validation(ValidationError { field: "email", .. }))
        ));
        assert_eq!(svc.list_users(1, 10).await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn list_clamps_paging() {
        let (svc, _) = service().await;
        for name in ["u-one", "u-two", "u-three"] {
            svc.create_user(create(name, None)).await.unwrap();
        }
        let page = svc.list_users(0, 1000).await.unwrap();
        assert_eq!(page.page, 1);
        assert_eq!(page.page_size, MAX_PAGE_SIZE);
        assert_eq!(page.total, 3);

        let page = svc.list_users(2, 2).await.unwrap();
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.total_page, 2);
    }

    #[tokio::test]
    async fn normal_user_cannot_change_active_flag() {
        let (svc, _) = service().await;
        let alice = svc.create_user(create("alice", None)).await.unwrap();
        let actor = svc.get_user(alice.user_id).await.unwrap();

        let err = svc
            .update_user(
                alice.user_id,
                UserUpdate {
                    is_active: Some(false),
                    ..Default::default()
                },
                &actor,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::Forbidden(_)));

        let out = svc
            .update_user(
                alice.user_id,
                UserUpdate {
                    full_name: Some("Alice A.".into()),
                    ..Default::default()
                },
                &actor,
            )
            .await
            .unwrap();
        assert_eq!(out.full_name.as_deref(), Some("Alice A."));
    }

    #[tokio::test]
    async fn admin_deactivation_revokes_sessions() {
        let (svc, store) = service().await;
        let (admin, created) = svc.ensure_admin("root", PASSWORD).await.unwrap();
        assert!(created);
        let alice = svc.create_user(create("alice", None)).await.unwrap();
        store.store_access_token(alice.user_id, "alice-token").await;

        let out = svc
            .update_user(
                alice.user_id,
                UserUpdate {
                    is_active: Some(false),
                    ..Default::default()
                },
                &admin,
            )
            .await
            .unwrap();
        assert!(!out.is_active);
        assert_eq!(store.user_for_access_token("alice-token").await, None);
    }

    #[tokio::test]
    async fn email_update_checks_other_owners() {
        let (svc, _) = service().await;
        svc.create_user(create("alice", Some("a@example.com")))
            .await
            .unwrap();
        let bob = svc
            .create_user(create("bob", Some("b@example.com")))
            .await
            .unwrap();
        let actor = svc.get_user(bob.user_id).await.unwrap();

        let err = svc
            .update_user(
                bob.user_id,
                UserUpdate {
                    email: Some("a@example.com".into()),
                    ..Default::default()
                },
                &actor,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::EmailTaken(_)));

        // Keeping one's own address is fine.
        svc.update_user(
            bob.user_id,
            UserUpdate {
                email: Some("b@example.com".into()),
                ..Default::default()
            },
            &actor,
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn delete_is_admin_only_and_revokes_tokens() {
        let (svc, store) = service().await;
        let (admin, _) = svc.ensure_admin("root", PASSWORD).await.unwrap();
        let alice = svc.create_user(create("alice", None)).await.unwrap();
        let alice_user = svc.get_user(alice.user_id).await.unwrap();
        store.store_refresh_token(alice.user_id, "alice-refresh").await;

        assert!(matches!(
            svc.delete_user(alice.user_id, &alice_user).await,
            Err(UserError::Forbidden(_))
        ));
        assert!(matches!(
            svc.delete_user(admin.user_id, &admin).await,
            Err(UserError::Forbidden(_))
        ));

        svc.delete_user(alice.user_id, &admin).await.unwrap();
        assert!(matches!(
            svc.get_user(alice.user_id).await,
            Err(UserError::NotFound(_))
        ));
        assert_eq!(store.user_for_refresh_token("alice-refresh").await, None);
    }

    #[tokio::test]
    async fn ensure_admin_promotes_existing_user() {
        let (svc, _) = service().await;
        let alice = svc.create_user(create("alice", None)).await.unwrap();

        let (admin, created) = svc.ensure_admin("alice", "N3w!Secret").await.unwrap();
        assert!(!created);
        assert_eq!(admin.user_id, alice.user_id);
        assert!(admin.is_admin());
        assert!(password::verify_password("N3w!Secret", &admin.hashed_password));
    }
}
