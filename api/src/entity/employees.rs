use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "employees")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub office_id: Option<Uuid>,
    pub first_name: String,
    pub last_name: String,
    #[sea_orm(unique)]
    pub email: String,
    pub title: Option<String>,
    pub phone: Option<String>,
    pub is_active: bool,
    #[sea_orm(unique)]
    pub api_key_hash: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::offices::Entity",
        from = "Column::OfficeId",
        to = "super::offices::Column::Id",
        on_delete = "Restrict"
    )]
    Office,
    #[sea_orm(has_many = "super::employee_roles::Entity")]
    EmployeeRoles,
}

impl Related<super::offices::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Office.def()
    }
}

impl Related<super::employee_roles::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::EmployeeRoles.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
