//! Knowledge graph entity (node)

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "kg_entities")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i64,

    /// Category label (person, organization, place, competition, venue)
    #[sea_orm(column_type = "Text")]
    pub category: String,

    /// Canonical display name
    #[sea_orm(column_type = "Text")]
    pub name: String,

    /// Free-form attributes as JSONB
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub properties: Option<Json>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::kg_relation::Entity")]
    OutgoingEdges,
}

impl Related<super::kg_relation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OutgoingEdges.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
