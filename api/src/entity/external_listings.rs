use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "external_listings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub source: String,
    pub external_id: String,
    pub office_id: Option<Uuid>,
    pub agent_id: Option<Uuid>,
    pub address: String,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub price_cents: Option<i64>,
    pub status: String,
    pub bedrooms: Option<i32>,
    #[sea_orm(column_type = "Double", nullable)]
    pub bathrooms: Option<f64>,
    pub listed_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::offices::Entity",
        from = "Column::OfficeId",
        to = "super::offices::Column::Id",
        on_delete = "SetNull"
    )]
    Office,
    #[sea_orm(
        belongs_to = "super::employees::Entity",
        from = "Column::AgentId",
        to = "super::employees::Column::Id",
        on_delete = "SetNull"
    )]
    Agent,
}

impl ActiveModelBehavior for ActiveModel {}
