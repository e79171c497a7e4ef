//! Taxonomy service
//!
//! Tags and the category tree.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;

use super::audit_service::AuditService;
use crate::domain::entities::taxonomy::{creates_cycle, normalize_color, normalize_tag_name};
use crate::domain::entities::{
    optional_text, required_text, AuditAction, Category, CategoryChanges, CategoryId,
    EmployeeId, NewCategory, NewTag, Page, Tag, TagChanges, TagId, MAX_PAGE_SIZE,
};
use crate::domain::ports::{AuditLogRepository, CategoryRepository, TagRepository};
use crate::error::{AppError, DomainError};

/// Service for managing tags and categories
pub struct TaxonomyService<G, C, A>
where
    G: TagRepository,
    C: CategoryRepository,
    A: AuditLogRepository,
{
    tags: Arc<G>,
    categories: Arc<C>,
    audit: AuditService<A>,
}

impl<G, C, A> TaxonomyService<G, C, A>
where
    G: TagRepository,
    C: CategoryRepository,
    A: AuditLogRepository,
{
    pub fn new(tags: Arc<G>, categories: Arc<C>, audit: AuditService<A>) -> Self {
        Self {
            tags,
            categories,
            audit,
        }
    }

    // ------------------------------------------------------------------
    // Tags
    // ------------------------------------------------------------------

    pub async fn list_tags(&self, page: Page) -> Result<Vec<Tag>, AppError> {
        Ok(self.tags.list(page.clamped()).await?)
    }

    pub async fn get_tag(&self, id: &TagId) -> Result<Tag, AppError> {
        self.tags
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Tag {}", id)))
    }

    pub async fn create_tag(
        &self,
        new: NewTag,
        actor: Option<EmployeeId>,
    ) -> Result<Tag, AppError> {
        let name = normalize_tag_name(&new.name).map_err(DomainError::Validation)?;
        let color = new
            .color
            .as_deref()
            .map(normalize_color)
            .transpose()
            .map_err(DomainError::Validation)?;

        if self.tags.find_by_name(&name).await?.is_some() {
            return Err(
                DomainError::AlreadyExists(format!("Tag '{}' already exists", name)).into(),
            );
        }

        let tag = self.tags.create(&NewTag { name, color }).await?;

        tracing::info!(tag_id = %tag.id, name = %tag.name, "Tag created");
        self.audit
            .record("tag", tag.id.0, AuditAction::Create, actor, json!({ "name": tag.name }))
            .await;

        Ok(tag)
    }

    pub async fn update_tag(
        &self,
        id: &TagId,
        changes: TagChanges,
        actor: Option<EmployeeId>,
    ) -> Result<Tag, AppError> {
        self.get_tag(id).await?;

        let name = match changes.name.as_deref() {
            Some(name) => {
                let name = normalize_tag_name(name).map_err(DomainError::Validation)?;
                if let Some(other) = self.tags.find_by_name(&name).await? {
                    if other.id != *id {
                        return Err(DomainError::AlreadyExists(format!(
                            "Tag '{}' already exists",
                            name
                        ))
                        .into());
                    }
                }
                Some(name)
            }
            None => None,
        };
        let color = match changes.color {
            Some(Some(color)) => {
                Some(Some(normalize_color(&color).map_err(DomainError::Validation)?))
            }
            other => other,
        };

        let tag = self.tags.update(id, &TagChanges { name, color }).await?;

        self.audit
            .record("tag", id.0, AuditAction::Update, actor, json!({ "name": tag.name }))
            .await;

        Ok(tag)
    }

    pub async fn delete_tag(&self, id: &TagId, actor: Option<EmployeeId>) -> Result<(), AppError> {
        let tag = self.get_tag(id).await?;
        self.tags.delete(id).await?;

        tracing::info!(tag_id = %id, "Tag deleted");
        self.audit
            .record(
                "tag",
                id.0,
                AuditAction::Delete,
                actor,
                json!({ "name": tag.name, "template_count": tag.template_count }),
            )
            .await;

        Ok(())
    }

    // ------------------------------------------------------------------
    // Categories
    // ------------------------------------------------------------------

    pub async fn list_categories(&self, page: Page) -> Result<Vec<Category>, AppError> {
        Ok(self.categories.list(page.clamped()).await?)
    }

    pub async fn get_category(&self, id: &CategoryId) -> Result<Category, AppError> {
        self.categories
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Category {}", id)))
    }

    pub async fn create_category(
        &self,
        new: NewCategory,
        actor: Option<EmployeeId>,
    ) -> Result<Category, AppError> {
        let name = required_text("Name", &new.name, 100).map_err(DomainError::Validation)?;
        if self.categories.find_by_name(&name).await?.is_some() {
            return Err(DomainError::AlreadyExists(format!(
                "Category '{}' already exists",
                name
            ))
            .into());
        }
        if let Some(parent_id) = new.parent_id {
            self.ensure_parent_exists(&parent_id).await?;
        }

        let category = self
            .categories
            .create(&NewCategory {
                name,
                description: optional_text(new.description.as_deref()),
                parent_id: new.parent_id,
                sort_order: new.sort_order,
            })
            .await?;

        tracing::info!(category_id = %category.id, name = %category.name, "Category created");
        self.audit
            .record(
                "category",
                category.id.0,
                AuditAction::Create,
                actor,
                json!({ "name": category.name, "parent_id": category.parent_id }),
            )
            .await;

        Ok(category)
    }

    pub async fn update_category(
        &self,
        id: &CategoryId,
        mut changes: CategoryChanges,
        actor: Option<EmployeeId>,
    ) -> Result<Category, AppError> {
        self.get_category(id).await?;

        if let Some(name) = &changes.name {
            let name = required_text("Name", name, 100).map_err(DomainError::Validation)?;
            if let Some(other) = self.categories.find_by_name(&name).await? {
                if other.id != *id {
                    return Err(DomainError::AlreadyExists(format!(
                        "Category '{}' already exists",
                        name
                    ))
                    .into());
                }
            }
            changes.name = Some(name);
        }
        changes.description = changes
            .description
            .map(|d| optional_text(d.as_deref()));

        if let Some(Some(parent_id)) = changes.parent_id {
            self.ensure_parent_exists(&parent_id).await?;
            let parents = self.parent_map().await?;
            if creates_cycle(*id, parent_id, |c| parents.get(&c).copied()) {
                return Err(DomainError::Validation(format!(
                    "Category {} cannot be moved under its own descendant {}",
                    id, parent_id
                ))
                .into());
            }
        }

        let category = self.categories.update(id, &changes).await?;

        self.audit
            .record(
                "category",
                id.0,
                AuditAction::Update,
                actor,
                json!({ "name": category.name, "parent_id": category.parent_id }),
            )
            .await;

        Ok(category)
    }

    /// Delete a leaf category; categories with children are a conflict
    pub async fn delete_category(
        &self,
        id: &CategoryId,
        actor: Option<EmployeeId>,
    ) -> Result<(), AppError> {
        let category = self.get_category(id).await?;

        let children = self.categories.count_children(id).await?;
        if children > 0 {
            return Err(DomainError::Conflict(format!(
                "Category '{}' still has {} child categories",
                category.name, children
            ))
            .into());
        }

        self.categories.delete(id).await?;

        tracing::info!(category_id = %id, "Category deleted");
        self.audit
            .record(
                "category",
                id.0,
                AuditAction::Delete,
                actor,
                json!({ "name": category.name }),
            )
            .await;

        Ok(())
    }

    async fn ensure_parent_exists(&self, parent_id: &CategoryId) -> Result<(), AppError> {
        if self.categories.find_by_id(parent_id).await?.is_none() {
            return Err(DomainError::Validation(format!(
                "Parent category {} does not exist",
                parent_id
            ))
            .into());
        }
        Ok(())
    }

    /// Current parent of every category, read page by page
    async fn parent_map(&self) -> Result<HashMap<CategoryId, CategoryId>, AppError> {
        let mut parents = HashMap::new();
        let mut offset = 0;

        loop {
            let batch = self
                .categories
                .list(Page::new(MAX_PAGE_SIZE, offset))
                .await?;
            let fetched = batch.len() as u64;

            parents.extend(
                batch
                    .into_iter()
                    .filter_map(|c| c.parent_id.map(|parent| (c.id, parent))),
            );

            if fetched < MAX_PAGE_SIZE {
                break;
            }
            offset += fetched;
        }

        Ok(parents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{
        test_category, test_tag, InMemoryAuditLogRepository, InMemoryCategoryRepository,
        InMemoryTagRepository,
    };

    type Service =
        TaxonomyService<InMemoryTagRepository, InMemoryCategoryRepository, InMemoryAuditLogRepository>;

    fn service(tags: InMemoryTagRepository, categories: InMemoryCategoryRepository) -> Service {
        TaxonomyService::new(
            Arc::new(tags),
            Arc::new(categories),
            AuditService::new(Arc::new(InMemoryAuditLogRepository::new())),
        )
    }

    fn child_of(name: &str, parent: &Category) -> Category {
        let mut category = test_category(name);
        category.parent_id = Some(parent.id);
        category
    }

    #[tokio::test]
    async fn create_tag_normalizes_name_and_color() {
        let service = service(InMemoryTagRepository::new(), InMemoryCategoryRepository::new());

        let tag = service
            .create_tag(
                NewTag {
                    name: "  Luxury ".to_string(),
                    color: Some("#AABBCC".to_string()),
                },
                None,
            )
            .await
            .unwrap();

        assert_eq!(tag.name, "luxury");
        assert_eq!(tag.color.as_deref(), Some("#aabbcc"));
        assert_eq!(tag.template_count, 0);
    }

    #[tokio::test]
    async fn create_tag_rejects_duplicates_case_insensitively() {
        let service = service(
            InMemoryTagRepository::new().with_tag(test_tag("luxury")),
            InMemoryCategoryRepository::new(),
        );

        let err = service
            .create_tag(
                NewTag {
                    name: "LUXURY".to_string(),
                    color: None,
                },
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Domain(DomainError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn create_tag_rejects_bad_color() {
        let service = service(InMemoryTagRepository::new(), InMemoryCategoryRepository::new());
        let err = service
            .create_tag(
                NewTag {
                    name: "new".to_string(),
                    color: Some("red".to_string()),
                },
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Domain(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn update_tag_can_clear_color() {
        let mut tag = test_tag("luxury");
        tag.color = Some("#000000".to_string());
        let service = service(
            InMemoryTagRepository::new().with_tag(tag.clone()),
            InMemoryCategoryRepository::new(),
        );

        let updated = service
            .update_tag(
                &tag.id,
                TagChanges {
                    name: None,
                    color: Some(None),
                },
                None,
            )
            .await
            .unwrap();
        assert_eq!(updated.color, None);
        assert_eq!(updated.name, "luxury");
    }

    #[tokio::test]
    async fn create_category_requires_existing_parent() {
        let service = service(InMemoryTagRepository::new(), InMemoryCategoryRepository::new());

        let err = service
            .create_category(
                NewCategory {
                    name: "Flyers".to_string(),
                    description: None,
                    parent_id: Some(CategoryId::new()),
                    sort_order: 0,
                },
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Domain(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn update_category_rejects_cycles() {
        let root = test_category("Marketing");
        let child = child_of("Print", &root);
        let grandchild = child_of("Flyers", &child);
        let service = service(
            InMemoryTagRepository::new(),
            InMemoryCategoryRepository::new()
                .with_category(root.clone())
                .with_category(child.clone())
                .with_category(grandchild.clone()),
        );

        let err = service
            .update_category(
                &root.id,
                CategoryChanges {
                    parent_id: Some(Some(grandchild.id)),
                    ..Default::default()
                },
                None,
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("descendant"));

        // Detaching from the tree is always allowed
        let detached = service
            .update_category(
                &child.id,
                CategoryChanges {
                    parent_id: Some(None),
                    ..Default::default()
                },
                None,
            )
            .await
            .unwrap();
        assert_eq!(detached.parent_id, None);
    }

    #[tokio::test]
    async fn delete_category_with_children_conflicts() {
        let root = test_category("Marketing");
        let child = child_of("Print", &root);
        let service = service(
            InMemoryTagRepository::new(),
            InMemoryCategoryRepository::new()
                .with_category(root.clone())
                .with_category(child.clone()),
        );

        let err = service.delete_category(&root.id, None).await.unwrap_err();
        assert!(matches!(err, AppError::Domain(DomainError::Conflict(_))));

        service.delete_category(&child.id, None).await.unwrap();
        service.delete_category(&root.id, None).await.unwrap();
    }
}
