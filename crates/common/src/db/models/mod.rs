//! SeaORM entity models
//!
//! Read-only views of the knowledge graph tables populated by the importer

mod kg_entity;
mod kg_relation;

pub use kg_entity::{
    ActiveModel as KgEntityActiveModel,
    Column as KgEntityColumn,
    Entity as KgEntityEntity,
    Model as KgEntity,
};

pub use kg_relation::{
    ActiveModel as KgRelationActiveModel,
    Column as KgRelationColumn,
    Entity as KgRelationEntity,
    Model as KgRelation,
};
