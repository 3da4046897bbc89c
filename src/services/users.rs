use uuid::Uuid;

use crate::{
    crypto::password,
    error::{AppError, Result},
    models::user::{NewUser, Role, User},
    store::UserStore,
};

/// Partial update for a user. `None` fields are left as they are.
#[derive(Clone, Debug, Default)]
pub struct UserChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<Role>,
    pub department_id: Option<Uuid>,
    pub is_active: Option<bool>,
}

/// Account management: registration, admin CRUD and password changes.
#[derive(Clone)]
pub struct UserService<S> {
    store: S,
}

impl<S> UserService<S>
where
    S: UserStore + Clone + Send + Sync + 'static,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Self-service sign-up. New accounts are plain employees.
    pub async fn register(
        &self,
        email: String,
        pass: String,
        first_name: String,
        last_name: String,
    ) -> Result<User> {
        self.create(email, pass, first_name, last_name, Role::Employee, None)
            .await
    }

    /// Creates an account with an explicit role and department.
    pub async fn create(
        &self,
        email: String,
        pass: String,
        first_name: String,
        last_name: String,
        role: Role,
        department_id: Option<Uuid>,
    ) -> Result<User> {
        // Pre-check for a friendly error; the unique index still backstops
        // concurrent registrations.
        if self.store.find_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let password_hash = password::hash_password(&pass)?;
        let user = self
            .store
            .create(NewUser {
                id: Uuid::new_v4(),
                email,
                password_hash,
                first_name,
                last_name,
                role,
                department_id,
            })
            .await?;

        tracing::info!("User created: {} ({:?})", user.id, user.role);
        Ok(user)
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<User> {
        self.store.find_by_id(id).await?.ok_or(AppError::NotFound)
    }

    pub async fn list(&self, page: i64, limit: i64) -> Result<(Vec<User>, i64)> {
        let page = page.max(1);
        let limit = limit.max(1);
        self.store.list(limit, (page - 1) * limit).await
    }

    /// Applies the non-`None` fields of `changes` to the user.
    pub async fn update(&self, id: Uuid, changes: UserChanges) -> Result<User> {
        let mut user = self.get_by_id(id).await?;

        if let Some(first_name) = changes.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = changes.last_name {
            user.last_name = last_name;
        }
        if let Some(role) = changes.role {
            user.role = role;
        }
        if let Some(department_id) = changes.department_id {
            user.department_id = Some(department_id);
        }
        if let Some(is_active) = changes.is_active {
            user.is_active = is_active;
        }

        self.store.update(&user).await
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        if !self.store.soft_delete(id).await? {
            return Err(AppError::NotFound);
        }
        tracing::info!("User deleted: {}", id);
        Ok(())
    }

    /// Swaps the password after verifying the current one.
    pub async fn change_password(&self, id: Uuid, old: String, new: String) -> Result<()> {
        let mut user = self.get_by_id(id).await?;

        if !password::verify_password(&old, &user.password_hash)? {
            return Err(AppError::InvalidCredentials);
        }

        user.password_hash = password::hash_password(&new)?;
        self.store.update(&user).await?;

        tracing::info!("Password changed for user: {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::memory::MemUserStore;

    fn service() -> (UserService<MemUserStore>, MemUserStore) {
        let store = MemUserStore::default();
        (UserService::new(store.clone()), store)
    }

    #[tokio::test]
    async fn register_defaults_to_active_employee() {
        let (svc, _) = service();

        let user = svc
            .register(
                "new@example.com".to_string(),
                "long-enough-password".to_string(),
                "New".to_string(),
                "Hire".to_string(),
            )
            .await
            .unwrap();

        assert_eq!(user.role, Role::Employee);
        assert!(user.is_active);
        assert!(user.department_id.is_none());
        assert!(password::verify_password("long-enough-password", &user.password_hash).unwrap());
    }

    #[tokio::test]
    async fn register_rejects_taken_email() {
        let (svc, _) = service();

        svc.register(
            "dup@example.com".to_string(),
            "long-enough-password".to_string(),
            "First".to_string(),
            "One".to_string(),
        )
        .await
        .unwrap();

        assert!(matches!(
            svc.register(
                "dup@example.com".to_string(),
                "another-password-here".to_string(),
                "Second".to_string(),
                "One".to_string(),
            )
            .await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn admin_create_honors_role() {
        let (svc, _) = service();

        let user = svc
            .create(
                "mgr@example.com".to_string(),
                "long-enough-password".to_string(),
                "Middle".to_string(),
                "Manager".to_string(),
                Role::Manager,
                None,
            )
            .await
            .unwrap();

        assert_eq!(user.role, Role::Manager);
        assert!(user.role.is_staff());
    }

    #[tokio::test]
    async fn update_touches_only_given_fields() {
        let (svc, _) = service();
        let user = svc
            .register(
                "worker@example.com".to_string(),
                "long-enough-password".to_string(),
                "Old".to_string(),
                "Name".to_string(),
            )
            .await
            .unwrap();

        let updated = svc
            .update(
                user.id,
                UserChanges {
                    first_name: Some("New".to_string()),
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.first_name, "New");
        assert_eq!(updated.last_name, "Name");
        assert_eq!(updated.role, Role::Employee);
        assert!(!updated.is_active);
    }

    #[tokio::test]
    async fn delete_then_lookup_is_not_found() {
        let (svc, _) = service();
        let user = svc
            .register(
                "gone@example.com".to_string(),
                "long-enough-password".to_string(),
                "Soon".to_string(),
                "Gone".to_string(),
            )
            .await
            .unwrap();

        svc.delete(user.id).await.unwrap();

        assert!(matches!(svc.get_by_id(user.id).await, Err(AppError::NotFound)));
        assert!(matches!(svc.delete(user.id).await, Err(AppError::NotFound)));
    }

    #[tokio::test]
    async fn deleted_email_can_be_reused() {
        let (svc, _) = service();
        let user = svc
            .register(
                "recycle@example.com".to_string(),
                "long-enough-password".to_string(),
                "First".to_string(),
                "Owner".to_string(),
            )
            .await
            .unwrap();
        svc.delete(user.id).await.unwrap();

        assert!(
            svc.register(
                "recycle@example.com".to_string(),
                "long-enough-password".to_string(),
                "Second".to_string(),
                "Owner".to_string(),
            )
            .await
            .is_ok()
        );
    }

    #[tokio::test]
    async fn change_password_requires_current_one() {
        let (svc, _) = service();
        let user = svc
            .register(
                "worker@example.com".to_string(),
                "original-password!".to_string(),
                "Pw".to_string(),
                "Owner".to_string(),
            )
            .await
            .unwrap();

        assert!(matches!(
            svc.change_password(user.id, "wrong-guess".to_string(), "new-password-123".to_string())
                .await,
            Err(AppError::InvalidCredentials)
        ));

        svc.change_password(
            user.id,
            "original-password!".to_string(),
            "new-password-123".to_string(),
        )
        .await
        .unwrap();

        let stored = svc.get_by_id(user.id).await.unwrap();
        assert!(password::verify_password("new-password-123", &stored.password_hash).unwrap());
        assert!(!password::verify_password("original-password!", &stored.password_hash).unwrap());
    }

    #[tokio::test]
    async fn list_pages_and_counts() {
        let (svc, _) = service();
        for i in 0..5 {
            svc.register(
                format!("user{i}@example.com"),
                "long-enough-password".to_string(),
                "User".to_string(),
                format!("Number{i}"),
            )
            .await
            .unwrap();
        }

        let (page, total) = svc.list(1, 3).await.unwrap();
        assert_eq!(total, 5);
        assert_eq!(page.len(), 3);

        let (rest, _) = svc.list(2, 3).await.unwrap();
        assert_eq!(rest.len(), 2);
    }
}
