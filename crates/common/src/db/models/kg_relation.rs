//! Knowledge graph relation (typed directed edge)

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "kg_relations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub source_id: i64,

    /// Upper-snake-case relation type, e.g. AFFILIATED_WITH
    #[sea_orm(column_type = "Text")]
    pub relation_type: String,

    pub target_id: i64,

    /// Start of the relation's validity, as recorded by the importer
    #[sea_orm(column_type = "Text", nullable)]
    pub from_period: Option<String>,

    /// End of the relation's validity
    #[sea_orm(column_type = "Text", nullable)]
    pub to_period: Option<String>,

    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub properties: Option<Json>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::kg_entity::Entity",
        from = "Column::SourceId",
        to = "super::kg_entity::Column::Id",
        on_delete = "Cascade"
    )]
    Source,

    #[sea_orm(
        belongs_to = "super::kg_entity::Entity",
        from = "Column::TargetId",
        to = "super::kg_entity::Column::Id",
        on_delete = "Cascade"
    )]
    Target,
}

impl Related<super::kg_entity::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Source.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
