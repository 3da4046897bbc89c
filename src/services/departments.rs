use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::department::{Department, NewDepartment},
    store::DepartmentStore,
};

/// Partial update for a department. `None` fields are left as they are.
#[derive(Clone, Debug, Default)]
pub struct DepartmentChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub manager_id: Option<Uuid>,
}

/// Department CRUD.
#[derive(Clone)]
pub struct DepartmentService<S> {
    store: S,
}

impl<S> DepartmentService<S>
where
    S: DepartmentStore + Clone + Send + Sync + 'static,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn create(
        &self,
        name: String,
        description: String,
        manager_id: Option<Uuid>,
    ) -> Result<Department> {
        let dept = self
            .store
            .create(NewDepartment {
                id: Uuid::new_v4(),
                name,
                description,
                manager_id,
            })
            .await?;

        tracing::info!("Department created: {} ({})", dept.name, dept.id);
        Ok(dept)
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Department> {
        self.store.find_by_id(id).await?.ok_or(AppError::NotFound)
    }

    pub async fn list_all(&self) -> Result<Vec<Department>> {
        self.store.list_all().await
    }

    /// Applies the non-`None` fields of `changes` to the department.
    pub async fn update(&self, id: Uuid, changes: DepartmentChanges) -> Result<Department> {
        let mut dept = self.get_by_id(id).await?;

        if let Some(name) = changes.name {
            dept.name = name;
        }
        if let Some(description) = changes.description {
            dept.description = description;
        }
        if let Some(manager_id) = changes.manager_id {
            dept.manager_id = Some(manager_id);
        }

        self.store.update(&dept).await
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        if !self.store.soft_delete(id).await? {
            return Err(AppError::NotFound);
        }
        tracing::info!("Department deleted: {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::memory::MemDepartmentStore;

    fn service() -> DepartmentService<MemDepartmentStore> {
        DepartmentService::new(MemDepartmentStore::default())
    }

    #[tokio::test]
    async fn create_then_list_roundtrip() {
        let svc = service();

        let eng = svc
            .create("Engineering".to_string(), "Builds things".to_string(), None)
            .await
            .unwrap();
        svc.create("Sales".to_string(), String::new(), None).await.unwrap();

        let all = svc.list_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(svc.get_by_id(eng.id).await.unwrap().name, "Engineering");
    }

    #[tokio::test]
    async fn duplicate_name_conflicts() {
        let svc = service();
        svc.create("Engineering".to_string(), String::new(), None)
            .await
            .unwrap();

        assert!(matches!(
            svc.create("Engineering".to_string(), String::new(), None).await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn update_touches_only_given_fields() {
        let svc = service();
        let dept = svc
            .create("Engineering".to_string(), "Old blurb".to_string(), None)
            .await
            .unwrap();

        let manager = Uuid::new_v4();
        let updated = svc
            .update(
                dept.id,
                DepartmentChanges {
                    manager_id: Some(manager),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "Engineering");
        assert_eq!(updated.description, "Old blurb");
        assert_eq!(updated.manager_id, Some(manager));
    }

    #[tokio::test]
    async fn delete_then_lookup_is_not_found() {
        let svc = service();
        let dept = svc
            .create("Temporary".to_string(), String::new(), None)
            .await
            .unwrap();

        svc.delete(dept.id).await.unwrap();

        assert!(matches!(svc.get_by_id(dept.id).await, Err(AppError::NotFound)));
        assert!(matches!(svc.delete(dept.id).await, Err(AppError::NotFound)));
        assert!(svc.list_all().await.unwrap().is_empty());
    }
}
