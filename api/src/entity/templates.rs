use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "templates")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(unique)]
    pub slug: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    #[sea_orm(column_type = "Text")]
    pub content: String,
    pub status: String,
    pub current_version: i32,
    pub created_by: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::template_versions::Entity")]
    TemplateVersions,
    #[sea_orm(has_many = "super::template_tags::Entity")]
    TemplateTags,
    #[sea_orm(has_many = "super::template_categories::Entity")]
    TemplateCategories,
}

impl Related<super::template_versions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TemplateVersions.def()
    }
}

impl Related<super::template_tags::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TemplateTags.def()
    }
}

impl Related<super::template_categories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TemplateCategories.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
