//! Mock implementations of port traits
//!
//! These are in-memory implementations that can be configured for testing.
//! They store data in memory and allow tests to verify behavior.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::domain::entities::{
    AssetChanges, AssetFilter, AssetId, AuditFilter, AuditLog, AuditLogId, Category,
    CategoryChanges, CategoryId, Checklist, ChecklistChanges, ChecklistId, ChecklistItem,
    ChecklistItemChanges, ChecklistItemId, CodePattern, CodePatternChanges, CodePatternId,
    CompanyAsset, Employee, EmployeeChanges, EmployeeFilter, EmployeeId, ExternalListing,
    ImportSummary, LayoutPartial, LayoutPartialChanges, LayoutPartialId, ListingChanges,
    ListingFilter, ListingId, MergeField, MergeFieldChanges, MergeFieldId, NewAsset, NewAuditLog,
    NewCategory, NewChecklist, NewChecklistItem, NewCodePattern, NewEmployee, NewLayoutPartial,
    NewListing, NewMergeField, NewOffice, NewTag, NewTemplate, NewTerritory, Office,
    OfficeChanges, OfficeId, Page, PostalCode, PostalCodeAssignment, SystemRole, Tag, TagChanges,
    TagId, Template, TemplateChanges, TemplateFilter, TemplateId, TemplateStatus,
    TemplateVersion, Territory, TerritoryChanges, TerritoryId,
};
use crate::domain::entities::territory::taken_codes_message;
use crate::domain::ports::{
    AssetRepository, AuditLogRepository, CategoryRepository, ChecklistRepository,
    CodePatternRepository, EmployeeRepository, GraphChannel, GraphChatMessage, GraphClient,
    GraphDriveItem, GraphSite, GraphTeam, LayoutPartialRepository, ListingRepository,
    MergeFieldRepository, OfficeRepository, TagRepository, TemplateRepository,
    TerritoryRepository,
};
use crate::error::{DomainError, GraphError};

fn not_found(what: &str, id: impl std::fmt::Display) -> DomainError {
    DomainError::NotFound(format!("{} {}", what, id))
}

// ============================================================================
// In-Memory Template Repository
// ============================================================================

#[derive(Default)]
pub struct InMemoryTemplateRepository {
    templates: Arc<RwLock<HashMap<TemplateId, Template>>>,
    versions: Arc<RwLock<HashMap<TemplateId, Vec<TemplateVersion>>>>,
}

impl InMemoryTemplateRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate with a template; its current content becomes its only version
    pub fn with_template(self, template: Template) -> Self {
        self.versions.write().unwrap().insert(
            template.id,
            vec![TemplateVersion {
                template_id: template.id,
                version_number: template.current_version,
                content: template.content.clone(),
                change_note: None,
                created_by: template.created_by,
                created_at: template.created_at,
            }],
        );
        self.templates.write().unwrap().insert(template.id, template);
        self
    }
}

#[async_trait]
impl TemplateRepository for InMemoryTemplateRepository {
    async fn list(
        &self,
        filter: &TemplateFilter,
        page: Page,
    ) -> Result<Vec<Template>, DomainError> {
        let templates = self.templates.read().unwrap();
        let mut matching: Vec<Template> = templates
            .values()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(page.apply(matching))
    }

    async fn find_by_id(&self, id: &TemplateId) -> Result<Option<Template>, DomainError> {
        Ok(self.templates.read().unwrap().get(id).cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Template>, DomainError> {
        Ok(self
            .templates
            .read()
            .unwrap()
            .values()
            .find(|t| t.slug == slug)
            .cloned())
    }

    async fn create(&self, new: &NewTemplate, slug: &str) -> Result<Template, DomainError> {
        let mut templates = self.templates.write().unwrap();
        if templates.values().any(|t| t.slug == slug) {
            return Err(DomainError::AlreadyExists(format!("slug {}", slug)));
        }

        let now = Utc::now();
        let template = Template {
            id: TemplateId::new(),
            name: new.name.clone(),
            slug: slug.to_string(),
            description: new.description.clone(),
            content: new.content.clone(),
            status: TemplateStatus::Draft,
            current_version: 1,
            created_by: new.created_by,
            tag_ids: new.tag_ids.clone(),
            category_ids: new.category_ids.clone(),
            created_at: now,
            updated_at: now,
        };

        self.versions.write().unwrap().insert(
            template.id,
            vec![TemplateVersion {
                template_id: template.id,
                version_number: 1,
                content: template.content.clone(),
                change_note: None,
                created_by: new.created_by,
                created_at: now,
            }],
        );
        templates.insert(template.id, template.clone());
        Ok(template)
    }

    async fn update(
        &self,
        id: &TemplateId,
        changes: &TemplateChanges,
    ) -> Result<Template, DomainError> {
        let mut templates = self.templates.write().unwrap();
        let template = templates
            .get_mut(id)
            .ok_or_else(|| not_found("Template", id))?;

        if let Some(name) = &changes.name {
            template.name = name.clone();
        }
        if let Some(description) = &changes.description {
            template.description = description.clone();
        }
        if let Some(tag_ids) = &changes.tag_ids {
            template.tag_ids = tag_ids.clone();
        }
        if let Some(category_ids) = &changes.category_ids {
            template.category_ids = category_ids.clone();
        }
        if let Some(content) = &changes.content {
            template.current_version += 1;
            template.content = content.clone();
            self.versions
                .write()
                .unwrap()
                .entry(*id)
                .or_default()
                .push(TemplateVersion {
                    template_id: *id,
                    version_number: template.current_version,
                    content: content.clone(),
                    change_note: changes.change_note.clone(),
                    created_by: changes.updated_by,
                    created_at: Utc::now(),
                });
        }
        template.updated_at = Utc::now();

        Ok(template.clone())
    }

    async fn set_status(
        &self,
        id: &TemplateId,
        status: TemplateStatus,
    ) -> Result<Template, DomainError> {
        let mut templates = self.templates.write().unwrap();
        let template = templates
            .get_mut(id)
            .ok_or_else(|| not_found("Template", id))?;
        template.status = status;
        template.updated_at = Utc::now();
        Ok(template.clone())
    }

    async fn delete(&self, id: &TemplateId) -> Result<(), DomainError> {
        self.templates
            .write()
            .unwrap()
            .remove(id)
            .ok_or_else(|| not_found("Template", id))?;
        self.versions.write().unwrap().remove(id);
        Ok(())
    }

    async fn list_versions(&self, id: &TemplateId) -> Result<Vec<TemplateVersion>, DomainError> {
        let mut versions = self
            .versions
            .read()
            .unwrap()
            .get(id)
            .cloned()
            .unwrap_or_default();
        versions.sort_by(|a, b| b.version_number.cmp(&a.version_number));
        Ok(versions)
    }

    async fn find_version(
        &self,
        id: &TemplateId,
        version_number: i32,
    ) -> Result<Option<TemplateVersion>, DomainError> {
        Ok(self.versions.read().unwrap().get(id).and_then(|versions| {
            versions
                .iter()
                .find(|v| v.version_number == version_number)
                .cloned()
        }))
    }
}

// ============================================================================
// In-Memory Tag Repository
// ============================================================================

#[derive(Default)]
pub struct InMemoryTagRepository {
    tags: Arc<RwLock<HashMap<TagId, Tag>>>,
}

impl InMemoryTagRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tag(self, tag: Tag) -> Self {
        self.tags.write().unwrap().insert(tag.id, tag);
        self
    }
}

#[async_trait]
impl TagRepository for InMemoryTagRepository {
    async fn list(&self, page: Page) -> Result<Vec<Tag>, DomainError> {
        let mut tags: Vec<Tag> = self.tags.read().unwrap().values().cloned().collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(page.apply(tags))
    }

    async fn find_by_id(&self, id: &TagId) -> Result<Option<Tag>, DomainError> {
        Ok(self.tags.read().unwrap().get(id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Tag>, DomainError> {
        Ok(self
            .tags
            .read()
            .unwrap()
            .values()
            .find(|t| t.name == name)
            .cloned())
    }

    async fn missing(&self, ids: &[TagId]) -> Result<Vec<TagId>, DomainError> {
        let tags = self.tags.read().unwrap();
        Ok(ids.iter().filter(|id| !tags.contains_key(id)).copied().collect())
    }

    async fn create(&self, new: &NewTag) -> Result<Tag, DomainError> {
        let tag = Tag {
            id: TagId::new(),
            name: new.name.clone(),
            color: new.color.clone(),
            template_count: 0,
            created_at: Utc::now(),
        };
        self.tags.write().unwrap().insert(tag.id, tag.clone());
        Ok(tag)
    }

    async fn update(&self, id: &TagId, changes: &TagChanges) -> Result<Tag, DomainError> {
        let mut tags = self.tags.write().unwrap();
        let tag = tags.get_mut(id).ok_or_else(|| not_found("Tag", id))?;
        if let Some(name) = &changes.name {
            tag.name = name.clone();
        }
        if let Some(color) = &changes.color {
            tag.color = color.clone();
        }
        Ok(tag.clone())
    }

    async fn delete(&self, id: &TagId) -> Result<(), DomainError> {
        self.tags
            .write()
            .unwrap()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| not_found("Tag", id))
    }
}

// ============================================================================
// In-Memory Category Repository
// ============================================================================

#[derive(Default)]
pub struct InMemoryCategoryRepository {
    categories: Arc<RwLock<HashMap<CategoryId, Category>>>,
}

impl InMemoryCategoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_category(self, category: Category) -> Self {
        self.categories
            .write()
            .unwrap()
            .insert(category.id, category);
        self
    }
}

#[async_trait]
impl CategoryRepository for InMemoryCategoryRepository {
    async fn list(&self, page: Page) -> Result<Vec<Category>, DomainError> {
        let mut categories: Vec<Category> =
            self.categories.read().unwrap().values().cloned().collect();
        categories.sort_by(|a, b| {
            a.sort_order
                .cmp(&b.sort_order)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(page.apply(categories))
    }

    async fn find_by_id(&self, id: &CategoryId) -> Result<Option<Category>, DomainError> {
        Ok(self.categories.read().unwrap().get(id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Category>, DomainError> {
        Ok(self
            .categories
            .read()
            .unwrap()
            .values()
            .find(|c| c.name == name)
            .cloned())
    }

    async fn missing(&self, ids: &[CategoryId]) -> Result<Vec<CategoryId>, DomainError> {
        let categories = self.categories.read().unwrap();
        Ok(ids
            .iter()
            .filter(|id| !categories.contains_key(id))
            .copied()
            .collect())
    }

    async fn count_children(&self, id: &CategoryId) -> Result<u64, DomainError> {
        Ok(self
            .categories
            .read()
            .unwrap()
            .values()
            .filter(|c| c.parent_id == Some(*id))
            .count() as u64)
    }

    async fn create(&self, new: &NewCategory) -> Result<Category, DomainError> {
        let category = Category {
            id: CategoryId::new(),
            name: new.name.clone(),
            description: new.description.clone(),
            parent_id: new.parent_id,
            sort_order: new.sort_order,
            created_at: Utc::now(),
        };
        self.categories
            .write()
            .unwrap()
            .insert(category.id, category.clone());
        Ok(category)
    }

    async fn update(
        &self,
        id: &CategoryId,
        changes: &CategoryChanges,
    ) -> Result<Category, DomainError> {
        let mut categories = self.categories.write().unwrap();
        let category = categories
            .get_mut(id)
            .ok_or_else(|| not_found("Category", id))?;
        if let Some(name) = &changes.name {
            category.name = name.clone();
        }
        if let Some(description) = &changes.description {
            category.description = description.clone();
        }
        if let Some(parent_id) = changes.parent_id {
            category.parent_id = parent_id;
        }
        if let Some(sort_order) = changes.sort_order {
            category.sort_order = sort_order;
        }
        Ok(category.clone())
    }

    async fn delete(&self, id: &CategoryId) -> Result<(), DomainError> {
        let mut categories = self.categories.write().unwrap();
        if categories.values().any(|c| c.parent_id == Some(*id)) {
            return Err(DomainError::Conflict(format!("Category {} has children", id)));
        }
        categories
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| not_found("Category", id))
    }
}

// ============================================================================
// In-Memory Audit Log Repository
// ============================================================================

#[derive(Default)]
pub struct InMemoryAuditLogRepository {
    entries: Arc<RwLock<Vec<AuditLog>>>,
    should_fail: bool,
}

impl InMemoryAuditLogRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// A log whose appends always fail
    pub fn failing() -> Self {
        Self {
            entries: Arc::new(RwLock::new(Vec::new())),
            should_fail: true,
        }
    }

    /// Every entry in append order
    pub fn entries(&self) -> Vec<AuditLog> {
        self.entries.read().unwrap().clone()
    }
}

#[async_trait]
impl AuditLogRepository for InMemoryAuditLogRepository {
    async fn append(&self, entry: &NewAuditLog) -> Result<AuditLog, DomainError> {
        if self.should_fail {
            return Err(DomainError::Database("audit table unavailable".to_string()));
        }

        let log = AuditLog {
            id: AuditLogId::new(),
            entity_type: entry.entity_type.to_string(),
            entity_id: entry.entity_id,
            action: entry.action,
            actor_id: entry.actor_id,
            details: entry.details.clone(),
            created_at: Utc::now(),
        };
        self.entries.write().unwrap().push(log.clone());
        Ok(log)
    }

    async fn list(&self, filter: &AuditFilter, page: Page) -> Result<Vec<AuditLog>, DomainError> {
        let entries = self.entries.read().unwrap();
        Ok(page.apply(entries.iter().rev().filter(|e| filter.matches(e)).cloned()))
    }
}

// ============================================================================
// In-Memory Content Library Repositories
// ============================================================================

#[derive(Default)]
pub struct InMemoryMergeFieldRepository {
    fields: Arc<RwLock<HashMap<MergeFieldId, MergeField>>>,
}

impl InMemoryMergeFieldRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(self, field: MergeField) -> Self {
        self.fields.write().unwrap().insert(field.id, field);
        self
    }

    fn sorted(&self) -> Vec<MergeField> {
        let mut fields: Vec<MergeField> = self.fields.read().unwrap().values().cloned().collect();
        fields.sort_by(|a, b| a.key.cmp(&b.key));
        fields
    }
}

#[async_trait]
impl MergeFieldRepository for InMemoryMergeFieldRepository {
    async fn list(&self, page: Page) -> Result<Vec<MergeField>, DomainError> {
        Ok(page.apply(self.sorted()))
    }

    async fn all(&self) -> Result<Vec<MergeField>, DomainError> {
        Ok(self.sorted())
    }

    async fn find_by_id(&self, id: &MergeFieldId) -> Result<Option<MergeField>, DomainError> {
        Ok(self.fields.read().unwrap().get(id).cloned())
    }

    async fn find_by_key(&self, key: &str) -> Result<Option<MergeField>, DomainError> {
        Ok(self
            .fields
            .read()
            .unwrap()
            .values()
            .find(|f| f.key == key)
            .cloned())
    }

    async fn create(&self, new: &NewMergeField) -> Result<MergeField, DomainError> {
        let now = Utc::now();
        let field = MergeField {
            id: MergeFieldId::new(),
            key: new.key.clone(),
            label: new.label.clone(),
            description: new.description.clone(),
            sample_value: new.sample_value.clone(),
            data_type: new.data_type,
            created_at: now,
            updated_at: now,
        };
        self.fields.write().unwrap().insert(field.id, field.clone());
        Ok(field)
    }

    async fn update(
        &self,
        id: &MergeFieldId,
        changes: &MergeFieldChanges,
    ) -> Result<MergeField, DomainError> {
        let mut fields = self.fields.write().unwrap();
        let field = fields
            .get_mut(id)
            .ok_or_else(|| not_found("Merge field", id))?;
        if let Some(label) = &changes.label {
            field.label = label.clone();
        }
        if let Some(description) = &changes.description {
            field.description = description.clone();
        }
        if let Some(sample_value) = &changes.sample_value {
            field.sample_value = sample_value.clone();
        }
        if let Some(data_type) = changes.data_type {
            field.data_type = data_type;
        }
        field.updated_at = Utc::now();
        Ok(field.clone())
    }

    async fn delete(&self, id: &MergeFieldId) -> Result<(), DomainError> {
        self.fields
            .write()
            .unwrap()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| not_found("Merge field", id))
    }
}

#[derive(Default)]
pub struct InMemoryCodePatternRepository {
    patterns: Arc<RwLock<HashMap<CodePatternId, CodePattern>>>,
}

impl InMemoryCodePatternRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CodePatternRepository for InMemoryCodePatternRepository {
    async fn list(&self, page: Page) -> Result<Vec<CodePattern>, DomainError> {
        let mut patterns: Vec<CodePattern> =
            self.patterns.read().unwrap().values().cloned().collect();
        patterns.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(page.apply(patterns))
    }

    async fn find_by_id(&self, id: &CodePatternId) -> Result<Option<CodePattern>, DomainError> {
        Ok(self.patterns.read().unwrap().get(id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<CodePattern>, DomainError> {
        Ok(self
            .patterns
            .read()
            .unwrap()
            .values()
            .find(|p| p.name == name)
            .cloned())
    }

    async fn create(&self, new: &NewCodePattern) -> Result<CodePattern, DomainError> {
        let now = Utc::now();
        let pattern = CodePattern {
            id: CodePatternId::new(),
            name: new.name.clone(),
            description: new.description.clone(),
            snippet: new.snippet.clone(),
            created_at: now,
            updated_at: now,
        };
        self.patterns
            .write()
            .unwrap()
            .insert(pattern.id, pattern.clone());
        Ok(pattern)
    }

    async fn update(
        &self,
        id: &CodePatternId,
        changes: &CodePatternChanges,
    ) -> Result<CodePattern, DomainError> {
        let mut patterns = self.patterns.write().unwrap();
        let pattern = patterns
            .get_mut(id)
            .ok_or_else(|| not_found("Code pattern", id))?;
        if let Some(name) = &changes.name {
            pattern.name = name.clone();
        }
        if let Some(description) = &changes.description {
            pattern.description = description.clone();
        }
        if let Some(snippet) = &changes.snippet {
            pattern.snippet = snippet.clone();
        }
        pattern.updated_at = Utc::now();
        Ok(pattern.clone())
    }

    async fn delete(&self, id: &CodePatternId) -> Result<(), DomainError> {
        self.patterns
            .write()
            .unwrap()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| not_found("Code pattern", id))
    }
}

#[derive(Default)]
pub struct InMemoryLayoutPartialRepository {
    partials: Arc<RwLock<HashMap<LayoutPartialId, LayoutPartial>>>,
}

impl InMemoryLayoutPartialRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_partial(self, partial: LayoutPartial) -> Self {
        self.partials.write().unwrap().insert(partial.id, partial);
        self
    }

    fn sorted(&self) -> Vec<LayoutPartial> {
        let mut partials: Vec<LayoutPartial> =
            self.partials.read().unwrap().values().cloned().collect();
        partials.sort_by(|a, b| a.name.cmp(&b.name));
        partials
    }
}

#[async_trait]
impl LayoutPartialRepository for InMemoryLayoutPartialRepository {
    async fn list(&self, page: Page) -> Result<Vec<LayoutPartial>, DomainError> {
        Ok(page.apply(self.sorted()))
    }

    async fn all(&self) -> Result<Vec<LayoutPartial>, DomainError> {
        Ok(self.sorted())
    }

    async fn find_by_id(
        &self,
        id: &LayoutPartialId,
    ) -> Result<Option<LayoutPartial>, DomainError> {
        Ok(self.partials.read().unwrap().get(id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<LayoutPartial>, DomainError> {
        Ok(self
            .partials
            .read()
            .unwrap()
            .values()
            .find(|p| p.name == name)
            .cloned())
    }

    async fn create(&self, new: &NewLayoutPartial) -> Result<LayoutPartial, DomainError> {
        let now = Utc::now();
        let partial = LayoutPartial {
            id: LayoutPartialId::new(),
            name: new.name.clone(),
            kind: new.kind,
            content: new.content.clone(),
            created_at: now,
            updated_at: now,
        };
        self.partials
            .write()
            .unwrap()
            .insert(partial.id, partial.clone());
        Ok(partial)
    }

    async fn update(
        &self,
        id: &LayoutPartialId,
        changes: &LayoutPartialChanges,
    ) -> Result<LayoutPartial, DomainError> {
        let mut partials = self.partials.write().unwrap();
        let partial = partials
            .get_mut(id)
            .ok_or_else(|| not_found("Layout partial", id))?;
        if let Some(name) = &changes.name {
            partial.name = name.clone();
        }
        if let Some(kind) = changes.kind {
            partial.kind = kind;
        }
        if let Some(content) = &changes.content {
            partial.content = content.clone();
        }
        partial.updated_at = Utc::now();
        Ok(partial.clone())
    }

    async fn delete(&self, id: &LayoutPartialId) -> Result<(), DomainError> {
        self.partials
            .write()
            .unwrap()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| not_found("Layout partial", id))
    }
}

// ============================================================================
// In-Memory Office Repository
// ============================================================================

#[derive(Default)]
pub struct InMemoryOfficeRepository {
    offices: Arc<RwLock<HashMap<OfficeId, Office>>>,
}

impl InMemoryOfficeRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_office(self, office: Office) -> Self {
        self.offices.write().unwrap().insert(office.id, office);
        self
    }
}

#[async_trait]
impl OfficeRepository for InMemoryOfficeRepository {
    async fn list(&self, active: Option<bool>, page: Page) -> Result<Vec<Office>, DomainError> {
        let mut offices: Vec<Office> = self
            .offices
            .read()
            .unwrap()
            .values()
            .filter(|o| active.map_or(true, |a| o.is_active == a))
            .cloned()
            .collect();
        offices.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(page.apply(offices))
    }

    async fn find_by_id(&self, id: &OfficeId) -> Result<Option<Office>, DomainError> {
        Ok(self.offices.read().unwrap().get(id).cloned())
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Office>, DomainError> {
        Ok(self
            .offices
            .read()
            .unwrap()
            .values()
            .find(|o| o.code == code)
            .cloned())
    }

    async fn create(&self, new: &NewOffice) -> Result<Office, DomainError> {
        let now = Utc::now();
        let office = Office {
            id: OfficeId::new(),
            name: new.name.clone(),
            code: new.code.clone(),
            street: new.street.clone(),
            city: new.city.clone(),
            state: new.state.clone(),
            postal_code: new.postal_code.clone(),
            phone: new.phone.clone(),
            email: new.email.clone(),
            is_active: new.is_active,
            created_at: now,
            updated_at: now,
        };
        self.offices
            .write()
            .unwrap()
            .insert(office.id, office.clone());
        Ok(office)
    }

    async fn update(
        &self,
        id: &OfficeId,
        changes: &OfficeChanges,
    ) -> Result<Office, DomainError> {
        let mut offices = self.offices.write().unwrap();
        let office = offices.get_mut(id).ok_or_else(|| not_found("Office", id))?;
        if let Some(name) = &changes.name {
            office.name = name.clone();
        }
        if let Some(code) = &changes.code {
            office.code = code.clone();
        }
        if let Some(street) = &changes.street {
            office.street = street.clone();
        }
        if let Some(city) = &changes.city {
            office.city = city.clone();
        }
        if let Some(state) = &changes.state {
            office.state = state.clone();
        }
        if let Some(postal_code) = &changes.postal_code {
            office.postal_code = postal_code.clone();
        }
        if let Some(phone) = &changes.phone {
            office.phone = phone.clone();
        }
        if let Some(email) = &changes.email {
            office.email = email.clone();
        }
        if let Some(is_active) = changes.is_active {
            office.is_active = is_active;
        }
        office.updated_at = Utc::now();
        Ok(office.clone())
    }

    async fn delete(&self, id: &OfficeId) -> Result<(), DomainError> {
        self.offices
            .write()
            .unwrap()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| not_found("Office", id))
    }
}

// ============================================================================
// In-Memory Employee Repository
// ============================================================================

#[derive(Default)]
pub struct InMemoryEmployeeRepository {
    employees: Arc<RwLock<HashMap<EmployeeId, Employee>>>,
    api_key_hashes: Arc<RwLock<HashMap<EmployeeId, String>>>,
}

impl InMemoryEmployeeRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_employee(self, employee: Employee) -> Self {
        self.employees
            .write()
            .unwrap()
            .insert(employee.id, employee);
        self
    }

    /// Pre-populate with an employee who authenticates with `api_key_hash`
    pub fn with_employee_key(self, employee: Employee, api_key_hash: &str) -> Self {
        self.api_key_hashes
            .write()
            .unwrap()
            .insert(employee.id, api_key_hash.to_string());
        self.with_employee(employee)
    }

    fn hydrate(&self, mut employee: Employee) -> Employee {
        employee.has_api_key = self.api_key_hashes.read().unwrap().contains_key(&employee.id);
        employee
    }
}

#[async_trait]
impl EmployeeRepository for InMemoryEmployeeRepository {
    async fn list(
        &self,
        filter: &EmployeeFilter,
        page: Page,
    ) -> Result<Vec<Employee>, DomainError> {
        let mut employees: Vec<Employee> = self
            .employees
            .read()
            .unwrap()
            .values()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        employees.sort_by(|a, b| {
            a.last_name
                .cmp(&b.last_name)
                .then_with(|| a.first_name.cmp(&b.first_name))
        });
        Ok(page
            .apply(employees)
            .into_iter()
            .map(|e| self.hydrate(e))
            .collect())
    }

    async fn count(&self, filter: &EmployeeFilter) -> Result<u64, DomainError> {
        Ok(self
            .employees
            .read()
            .unwrap()
            .values()
            .filter(|e| filter.matches(e))
            .count() as u64)
    }

    async fn find_by_id(&self, id: &EmployeeId) -> Result<Option<Employee>, DomainError> {
        let employee = self.employees.read().unwrap().get(id).cloned();
        Ok(employee.map(|e| self.hydrate(e)))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Employee>, DomainError> {
        let employee = self
            .employees
            .read()
            .unwrap()
            .values()
            .find(|e| e.email == email)
            .cloned();
        Ok(employee.map(|e| self.hydrate(e)))
    }

    async fn find_by_api_key_hash(&self, hash: &str) -> Result<Option<Employee>, DomainError> {
        let id = self
            .api_key_hashes
            .read()
            .unwrap()
            .iter()
            .find(|(_, h)| h.as_str() == hash)
            .map(|(id, _)| *id);

        let employee = id
            .and_then(|id| self.employees.read().unwrap().get(&id).cloned())
            .filter(|e| e.is_active);
        Ok(employee.map(|e| self.hydrate(e)))
    }

    async fn create(&self, new: &NewEmployee) -> Result<Employee, DomainError> {
        let mut employees = self.employees.write().unwrap();
        if employees.values().any(|e| e.email == new.email) {
            return Err(DomainError::AlreadyExists(format!("email {}", new.email)));
        }

        let now = Utc::now();
        let employee = Employee {
            id: EmployeeId::new(),
            office_id: new.office_id,
            first_name: new.first_name.clone(),
            last_name: new.last_name.clone(),
            email: new.email.clone(),
            title: new.title.clone(),
            phone: new.phone.clone(),
            is_active: new.is_active,
            roles: new.roles.clone(),
            has_api_key: false,
            created_at: now,
            updated_at: now,
        };
        employees.insert(employee.id, employee.clone());
        Ok(employee)
    }

    async fn update(
        &self,
        id: &EmployeeId,
        changes: &EmployeeChanges,
    ) -> Result<Employee, DomainError> {
        let updated = {
            let mut employees = self.employees.write().unwrap();
            let employee = employees
                .get_mut(id)
                .ok_or_else(|| not_found("Employee", id))?;
            if let Some(office_id) = changes.office_id {
                employee.office_id = office_id;
            }
            if let Some(first_name) = &changes.first_name {
                employee.first_name = first_name.clone();
            }
            if let Some(last_name) = &changes.last_name {
                employee.last_name = last_name.clone();
            }
            if let Some(email) = &changes.email {
                employee.email = email.clone();
            }
            if let Some(title) = &changes.title {
                employee.title = title.clone();
            }
            if let Some(phone) = &changes.phone {
                employee.phone = phone.clone();
            }
            if let Some(is_active) = changes.is_active {
                employee.is_active = is_active;
            }
            employee.updated_at = Utc::now();
            employee.clone()
        };
        Ok(self.hydrate(updated))
    }

    async fn set_roles(
        &self,
        id: &EmployeeId,
        roles: &[SystemRole],
    ) -> Result<Employee, DomainError> {
        let updated = {
            let mut employees = self.employees.write().unwrap();
            let employee = employees
                .get_mut(id)
                .ok_or_else(|| not_found("Employee", id))?;
            employee.roles = roles.to_vec();
            employee.updated_at = Utc::now();
            employee.clone()
        };
        Ok(self.hydrate(updated))
    }

    async fn set_api_key_hash(
        &self,
        id: &EmployeeId,
        hash: Option<&str>,
    ) -> Result<(), DomainError> {
        if !self.employees.read().unwrap().contains_key(id) {
            return Err(not_found("Employee", id));
        }
        let mut hashes = self.api_key_hashes.write().unwrap();
        match hash {
            Some(hash) => hashes.insert(*id, hash.to_string()),
            None => hashes.remove(id),
        };
        Ok(())
    }

    async fn delete(&self, id: &EmployeeId) -> Result<(), DomainError> {
        self.api_key_hashes.write().unwrap().remove(id);
        self.employees
            .write()
            .unwrap()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| not_found("Employee", id))
    }
}

// ============================================================================
// In-Memory Asset Repository
// ============================================================================

#[derive(Default)]
pub struct InMemoryAssetRepository {
    assets: Arc<RwLock<HashMap<AssetId, CompanyAsset>>>,
}

impl InMemoryAssetRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_asset(self, asset: CompanyAsset) -> Self {
        self.assets.write().unwrap().insert(asset.id, asset);
        self
    }
}

#[async_trait]
impl AssetRepository for InMemoryAssetRepository {
    async fn list(
        &self,
        filter: &AssetFilter,
        page: Page,
    ) -> Result<Vec<CompanyAsset>, DomainError> {
        let mut assets: Vec<CompanyAsset> = self
            .assets
            .read()
            .unwrap()
            .values()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        assets.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(page.apply(assets))
    }

    async fn find_by_id(&self, id: &AssetId) -> Result<Option<CompanyAsset>, DomainError> {
        Ok(self.assets.read().unwrap().get(id).cloned())
    }

    async fn create(&self, new: &NewAsset) -> Result<CompanyAsset, DomainError> {
        let now = Utc::now();
        let asset = CompanyAsset {
            id: AssetId::new(),
            name: new.name.clone(),
            asset_type: new.asset_type,
            url: new.url.clone(),
            mime_type: new.mime_type.clone(),
            description: new.description.clone(),
            office_id: new.office_id,
            created_at: now,
            updated_at: now,
        };
        self.assets.write().unwrap().insert(asset.id, asset.clone());
        Ok(asset)
    }

    async fn update(
        &self,
        id: &AssetId,
        changes: &AssetChanges,
    ) -> Result<CompanyAsset, DomainError> {
        let mut assets = self.assets.write().unwrap();
        let asset = assets.get_mut(id).ok_or_else(|| not_found("Asset", id))?;
        if let Some(name) = &changes.name {
            asset.name = name.clone();
        }
        if let Some(asset_type) = changes.asset_type {
            asset.asset_type = asset_type;
        }
        if let Some(url) = &changes.url {
            asset.url = url.clone();
        }
        if let Some(mime_type) = &changes.mime_type {
            asset.mime_type = mime_type.clone();
        }
        if let Some(description) = &changes.description {
            asset.description = description.clone();
        }
        if let Some(office_id) = changes.office_id {
            asset.office_id = office_id;
        }
        asset.updated_at = Utc::now();
        Ok(asset.clone())
    }

    async fn delete(&self, id: &AssetId) -> Result<(), DomainError> {
        self.assets
            .write()
            .unwrap()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| not_found("Asset", id))
    }
}

// ============================================================================
// In-Memory Listing Repository
// ============================================================================

#[derive(Default)]
pub struct InMemoryListingRepository {
    listings: Arc<RwLock<HashMap<ListingId, ExternalListing>>>,
}

impl InMemoryListingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_listing(self, listing: ExternalListing) -> Self {
        self.listings.write().unwrap().insert(listing.id, listing);
        self
    }
}

fn listing_from(new: &NewListing, id: ListingId, created_at: DateTime<Utc>) -> ExternalListing {
    ExternalListing {
        id,
        source: new.source.clone(),
        external_id: new.external_id.clone(),
        office_id: new.office_id,
        agent_id: new.agent_id,
        address: new.address.clone(),
        city: new.city.clone(),
        state: new.state.clone(),
        postal_code: new.postal_code.clone(),
        price_cents: new.price_cents,
        status: new.status,
        bedrooms: new.bedrooms,
        bathrooms: new.bathrooms,
        listed_at: new.listed_at,
        created_at,
        updated_at: Utc::now(),
    }
}

#[async_trait]
impl ListingRepository for InMemoryListingRepository {
    async fn list(
        &self,
        filter: &ListingFilter,
        page: Page,
    ) -> Result<Vec<ExternalListing>, DomainError> {
        let mut listings: Vec<ExternalListing> = self
            .listings
            .read()
            .unwrap()
            .values()
            .filter(|l| filter.matches(l))
            .cloned()
            .collect();
        listings.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(page.apply(listings))
    }

    async fn find_by_id(&self, id: &ListingId) -> Result<Option<ExternalListing>, DomainError> {
        Ok(self.listings.read().unwrap().get(id).cloned())
    }

    async fn find_by_external_id(
        &self,
        source: &str,
        external_id: &str,
    ) -> Result<Option<ExternalListing>, DomainError> {
        Ok(self
            .listings
            .read()
            .unwrap()
            .values()
            .find(|l| l.source == source && l.external_id == external_id)
            .cloned())
    }

    async fn create(&self, new: &NewListing) -> Result<ExternalListing, DomainError> {
        let listing = listing_from(new, ListingId::new(), Utc::now());
        self.listings
            .write()
            .unwrap()
            .insert(listing.id, listing.clone());
        Ok(listing)
    }

    async fn update(
        &self,
        id: &ListingId,
        changes: &ListingChanges,
    ) -> Result<ExternalListing, DomainError> {
        let mut listings = self.listings.write().unwrap();
        let listing = listings.get_mut(id).ok_or_else(|| not_found("Listing", id))?;
        if let Some(office_id) = changes.office_id {
            listing.office_id = office_id;
        }
        if let Some(agent_id) = changes.agent_id {
            listing.agent_id = agent_id;
        }
        if let Some(address) = &changes.address {
            listing.address = address.clone();
        }
        if let Some(city) = &changes.city {
            listing.city = city.clone();
        }
        if let Some(state) = &changes.state {
            listing.state = state.clone();
        }
        if let Some(postal_code) = &changes.postal_code {
            listing.postal_code = postal_code.clone();
        }
        if let Some(price_cents) = changes.price_cents {
            listing.price_cents = price_cents;
        }
        if let Some(status) = changes.status {
            listing.status = status;
        }
        if let Some(bedrooms) = changes.bedrooms {
            listing.bedrooms = bedrooms;
        }
        if let Some(bathrooms) = changes.bathrooms {
            listing.bathrooms = bathrooms;
        }
        if let Some(listed_at) = changes.listed_at {
            listing.listed_at = listed_at;
        }
        listing.updated_at = Utc::now();
        Ok(listing.clone())
    }

    async fn upsert_many(&self, new: &[NewListing]) -> Result<ImportSummary, DomainError> {
        let mut listings = self.listings.write().unwrap();
        let mut summary = ImportSummary::default();

        for item in new {
            let existing = listings
                .values()
                .find(|l| l.source == item.source && l.external_id == item.external_id)
                .map(|l| (l.id, l.created_at));

            let listing = match existing {
                Some((id, created_at)) => {
                    summary.updated += 1;
                    listing_from(item, id, created_at)
                }
                None => {
                    summary.created += 1;
                    listing_from(item, ListingId::new(), Utc::now())
                }
            };
            listings.insert(listing.id, listing);
        }

        Ok(summary)
    }

    async fn delete(&self, id: &ListingId) -> Result<(), DomainError> {
        self.listings
            .write()
            .unwrap()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| not_found("Listing", id))
    }
}

// ============================================================================
// In-Memory Checklist Repository
// ============================================================================

#[derive(Default)]
pub struct InMemoryChecklistRepository {
    checklists: Arc<RwLock<HashMap<ChecklistId, Checklist>>>,
}

impl InMemoryChecklistRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_checklist(self, checklist: Checklist) -> Self {
        self.checklists
            .write()
            .unwrap()
            .insert(checklist.id, checklist);
        self
    }

    fn with_item<T>(
        &self,
        id: &ChecklistId,
        item_id: &ChecklistItemId,
        f: impl FnOnce(&mut ChecklistItem) -> T,
    ) -> Result<T, DomainError> {
        let mut checklists = self.checklists.write().unwrap();
        let checklist = checklists
            .get_mut(id)
            .ok_or_else(|| not_found("Checklist", id))?;
        let item = checklist
            .items
            .iter_mut()
            .find(|i| i.id == *item_id)
            .ok_or_else(|| not_found("Checklist item", item_id))?;
        let result = f(item);
        checklist.items.sort_by_key(|i| i.position);
        Ok(result)
    }
}

fn new_item(checklist_id: ChecklistId, item: &NewChecklistItem, position: i32) -> ChecklistItem {
    ChecklistItem {
        id: ChecklistItemId::new(),
        checklist_id,
        position,
        text: item.text.clone(),
        is_required: item.is_required,
        completed_at: None,
        created_at: Utc::now(),
    }
}

#[async_trait]
impl ChecklistRepository for InMemoryChecklistRepository {
    async fn list(
        &self,
        office_id: Option<OfficeId>,
        page: Page,
    ) -> Result<Vec<Checklist>, DomainError> {
        let mut checklists: Vec<Checklist> = self
            .checklists
            .read()
            .unwrap()
            .values()
            .filter(|c| office_id.map_or(true, |id| c.office_id == Some(id)))
            .cloned()
            .collect();
        checklists.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(page.apply(checklists))
    }

    async fn find_by_id(&self, id: &ChecklistId) -> Result<Option<Checklist>, DomainError> {
        Ok(self.checklists.read().unwrap().get(id).cloned())
    }

    async fn create(&self, new: &NewChecklist) -> Result<Checklist, DomainError> {
        let now = Utc::now();
        let id = ChecklistId::new();
        let checklist = Checklist {
            id,
            name: new.name.clone(),
            description: new.description.clone(),
            office_id: new.office_id,
            items: new
                .items
                .iter()
                .enumerate()
                .map(|(position, item)| new_item(id, item, position as i32))
                .collect(),
            created_at: now,
            updated_at: now,
        };
        self.checklists
            .write()
            .unwrap()
            .insert(id, checklist.clone());
        Ok(checklist)
    }

    async fn update(
        &self,
        id: &ChecklistId,
        changes: &ChecklistChanges,
    ) -> Result<Checklist, DomainError> {
        let mut checklists = self.checklists.write().unwrap();
        let checklist = checklists
            .get_mut(id)
            .ok_or_else(|| not_found("Checklist", id))?;
        if let Some(name) = &changes.name {
            checklist.name = name.clone();
        }
        if let Some(description) = &changes.description {
            checklist.description = description.clone();
        }
        if let Some(office_id) = changes.office_id {
            checklist.office_id = office_id;
        }
        checklist.updated_at = Utc::now();
        Ok(checklist.clone())
    }

    async fn delete(&self, id: &ChecklistId) -> Result<(), DomainError> {
        self.checklists
            .write()
            .unwrap()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| not_found("Checklist", id))
    }

    async fn add_item(
        &self,
        id: &ChecklistId,
        item: &NewChecklistItem,
        position: i32,
    ) -> Result<ChecklistItem, DomainError> {
        let mut checklists = self.checklists.write().unwrap();
        let checklist = checklists
            .get_mut(id)
            .ok_or_else(|| not_found("Checklist", id))?;
        let item = new_item(*id, item, position);
        checklist.items.push(item.clone());
        checklist.items.sort_by_key(|i| i.position);
        Ok(item)
    }

    async fn update_item(
        &self,
        id: &ChecklistId,
        item_id: &ChecklistItemId,
        changes: &ChecklistItemChanges,
    ) -> Result<ChecklistItem, DomainError> {
        self.with_item(id, item_id, |item| {
            if let Some(text) = &changes.text {
                item.text = text.clone();
            }
            if let Some(is_required) = changes.is_required {
                item.is_required = is_required;
            }
            if let Some(position) = changes.position {
                item.position = position;
            }
            item.clone()
        })
    }

    async fn set_item_completed(
        &self,
        id: &ChecklistId,
        item_id: &ChecklistItemId,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<ChecklistItem, DomainError> {
        self.with_item(id, item_id, |item| {
            item.completed_at = completed_at;
            item.clone()
        })
    }

    async fn delete_item(
        &self,
        id: &ChecklistId,
        item_id: &ChecklistItemId,
    ) -> Result<(), DomainError> {
        let mut checklists = self.checklists.write().unwrap();
        let checklist = checklists
            .get_mut(id)
            .ok_or_else(|| not_found("Checklist", id))?;
        let before = checklist.items.len();
        checklist.items.retain(|i| i.id != *item_id);
        if checklist.items.len() == before {
            return Err(not_found("Checklist item", item_id));
        }
        Ok(())
    }
}

// ============================================================================
// In-Memory Territory Repository
// ============================================================================

#[derive(Default)]
pub struct InMemoryTerritoryRepository {
    territories: Arc<RwLock<HashMap<TerritoryId, Territory>>>,
    postal_codes: Arc<RwLock<HashMap<String, PostalCode>>>,
}

impl InMemoryTerritoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_territory(self, territory: Territory) -> Self {
        {
            let mut codes = self.postal_codes.write().unwrap();
            for code in &territory.postal_codes {
                codes.insert(
                    code.clone(),
                    PostalCode {
                        code: code.clone(),
                        territory_id: Some(territory.id),
                        city: None,
                        state: None,
                    },
                );
            }
        }
        self.territories
            .write()
            .unwrap()
            .insert(territory.id, territory);
        self
    }

    /// Fill `postal_codes` from the code table
    fn hydrate(&self, mut territory: Territory) -> Territory {
        let mut codes: Vec<String> = self
            .postal_codes
            .read()
            .unwrap()
            .values()
            .filter(|pc| pc.territory_id == Some(territory.id))
            .map(|pc| pc.code.clone())
            .collect();
        codes.sort();
        territory.postal_codes = codes;
        territory
    }
}

#[async_trait]
impl TerritoryRepository for InMemoryTerritoryRepository {
    async fn list(&self, page: Page) -> Result<Vec<Territory>, DomainError> {
        let mut territories: Vec<Territory> =
            self.territories.read().unwrap().values().cloned().collect();
        territories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(page
            .apply(territories)
            .into_iter()
            .map(|t| self.hydrate(t))
            .collect())
    }

    async fn find_by_id(&self, id: &TerritoryId) -> Result<Option<Territory>, DomainError> {
        let territory = self.territories.read().unwrap().get(id).cloned();
        Ok(territory.map(|t| self.hydrate(t)))
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Territory>, DomainError> {
        let territory = self
            .territories
            .read()
            .unwrap()
            .values()
            .find(|t| t.name == name)
            .cloned();
        Ok(territory.map(|t| self.hydrate(t)))
    }

    async fn create(&self, new: &NewTerritory) -> Result<Territory, DomainError> {
        let now = Utc::now();
        let territory = Territory {
            id: TerritoryId::new(),
            name: new.name.clone(),
            description: new.description.clone(),
            office_id: new.office_id,
            postal_codes: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        self.territories
            .write()
            .unwrap()
            .insert(territory.id, territory.clone());
        Ok(territory)
    }

    async fn update(
        &self,
        id: &TerritoryId,
        changes: &TerritoryChanges,
    ) -> Result<Territory, DomainError> {
        let updated = {
            let mut territories = self.territories.write().unwrap();
            let territory = territories
                .get_mut(id)
                .ok_or_else(|| not_found("Territory", id))?;
            if let Some(name) = &changes.name {
                territory.name = name.clone();
            }
            if let Some(description) = &changes.description {
                territory.description = description.clone();
            }
            if let Some(office_id) = changes.office_id {
                territory.office_id = office_id;
            }
            territory.updated_at = Utc::now();
            territory.clone()
        };
        Ok(self.hydrate(updated))
    }

    async fn delete(&self, id: &TerritoryId) -> Result<(), DomainError> {
        self.territories
            .write()
            .unwrap()
            .remove(id)
            .ok_or_else(|| not_found("Territory", id))?;
        for pc in self.postal_codes.write().unwrap().values_mut() {
            if pc.territory_id == Some(*id) {
                pc.territory_id = None;
            }
        }
        Ok(())
    }

    async fn find_postal_codes(&self, codes: &[String]) -> Result<Vec<PostalCode>, DomainError> {
        let table = self.postal_codes.read().unwrap();
        Ok(codes.iter().filter_map(|c| table.get(c).cloned()).collect())
    }

    async fn assign_postal_codes(
        &self,
        id: &TerritoryId,
        codes: &[String],
        force: bool,
    ) -> Result<PostalCodeAssignment, DomainError> {
        let territory = self
            .territories
            .read()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| not_found("Territory", id))?;

        let moved = {
            let mut table = self.postal_codes.write().unwrap();
            let moved: Vec<PostalCode> = codes
                .iter()
                .filter_map(|code| table.get(code))
                .filter(|pc| pc.territory_id.is_some_and(|owner| owner != *id))
                .cloned()
                .collect();
            if !moved.is_empty() && !force {
                return Err(DomainError::Conflict(taken_codes_message(&moved)));
            }

            for code in codes {
                table
                    .entry(code.clone())
                    .or_insert_with(|| PostalCode {
                        code: code.clone(),
                        territory_id: None,
                        city: None,
                        state: None,
                    })
                    .territory_id = Some(*id);
            }
            moved
        };

        Ok(PostalCodeAssignment {
            territory: self.hydrate(territory),
            moved,
        })
    }

    async fn remove_postal_code(&self, id: &TerritoryId, code: &str) -> Result<bool, DomainError> {
        let mut table = self.postal_codes.write().unwrap();
        match table.get_mut(code) {
            Some(pc) if pc.territory_id == Some(*id) => {
                pc.territory_id = None;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

// ============================================================================
// Mock Graph Client
// ============================================================================

/// (site_id, path, content) of an uploaded file
pub type Upload = (String, String, String);
/// (team_id, channel_id, html) of a posted message
pub type PostedMessage = (String, String, String);

/// A mock Graph client that records uploads and messages
pub struct MockGraphClient {
    configured: bool,
    uploads: Arc<RwLock<Vec<Upload>>>,
    messages: Arc<RwLock<Vec<PostedMessage>>>,
}

impl Default for MockGraphClient {
    fn default() -> Self {
        Self {
            configured: true,
            uploads: Arc::new(RwLock::new(Vec::new())),
            messages: Arc::new(RwLock::new(Vec::new())),
        }
    }
}

impl MockGraphClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// A client without credentials; every call fails with `NotConfigured`
    pub fn unconfigured() -> Self {
        Self {
            configured: false,
            ..Self::default()
        }
    }

    pub fn uploads(&self) -> Vec<Upload> {
        self.uploads.read().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<PostedMessage> {
        self.messages.read().unwrap().clone()
    }

    fn check(&self) -> Result<(), GraphError> {
        if self.configured {
            Ok(())
        } else {
            Err(GraphError::NotConfigured)
        }
    }
}

#[async_trait]
impl GraphClient for MockGraphClient {
    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn list_teams(&self) -> Result<Vec<GraphTeam>, GraphError> {
        self.check()?;
        Ok(vec![GraphTeam {
            id: "team-1".to_string(),
            display_name: "Marketing".to_string(),
            description: None,
        }])
    }

    async fn list_channels(&self, team_id: &str) -> Result<Vec<GraphChannel>, GraphError> {
        self.check()?;
        if team_id != "team-1" {
            return Err(GraphError::NotFound(format!("team {}", team_id)));
        }
        Ok(vec![GraphChannel {
            id: "chan-1".to_string(),
            display_name: "General".to_string(),
            description: None,
            web_url: None,
        }])
    }

    async fn search_sites(&self, query: &str) -> Result<Vec<GraphSite>, GraphError> {
        self.check()?;
        Ok(vec![GraphSite {
            id: "site-1".to_string(),
            display_name: Some(query.to_string()),
            name: None,
            web_url: "https://contoso.sharepoint.com/sites/marketing".to_string(),
        }])
    }

    async fn get_site(&self, hostname: &str, path: &str) -> Result<GraphSite, GraphError> {
        self.check()?;
        Ok(GraphSite {
            id: "site-1".to_string(),
            display_name: None,
            name: None,
            web_url: format!("https://{}{}", hostname, path),
        })
    }

    async fn list_drive_children(
        &self,
        _site_id: &str,
        _folder_path: &str,
    ) -> Result<Vec<GraphDriveItem>, GraphError> {
        self.check()?;
        Ok(Vec::new())
    }

    async fn upload_file(
        &self,
        site_id: &str,
        file_path: &str,
        content: Vec<u8>,
        _content_type: &str,
    ) -> Result<GraphDriveItem, GraphError> {
        self.check()?;
        let size = content.len() as i64;
        self.uploads.write().unwrap().push((
            site_id.to_string(),
            file_path.to_string(),
            String::from_utf8_lossy(&content).into_owned(),
        ));
        Ok(GraphDriveItem {
            id: format!("item-{}", self.uploads.read().unwrap().len()),
            name: file_path.rsplit('/').next().unwrap_or(file_path).to_string(),
            size: Some(size),
            web_url: None,
            folder: None,
            last_modified_date_time: None,
        })
    }

    async fn post_channel_message(
        &self,
        team_id: &str,
        channel_id: &str,
        html: &str,
    ) -> Result<GraphChatMessage, GraphError> {
        self.check()?;
        self.messages.write().unwrap().push((
            team_id.to_string(),
            channel_id.to_string(),
            html.to_string(),
        ));
        Ok(GraphChatMessage {
            id: format!("msg-{}", self.messages.read().unwrap().len()),
            web_url: None,
        })
    }
}
