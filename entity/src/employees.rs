use sea_orm::prelude::{DateTimeWithTimeZone, *};
use uuid::Uuid;

/// A locally known employee.
///
/// `external_id` is the roster provider's identifier and the reconciliation
/// key for directory syncs. `department` and `is_manager` are owned locally;
/// the sync job never writes them after the row exists.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "employees")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub external_id: String,
    pub name: String,
    pub role: Option<String>,
    pub department: Option<String>,
    pub is_manager: bool,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        panic!("no relations")
    }
}

impl ActiveModelBehavior for ActiveModel {}
