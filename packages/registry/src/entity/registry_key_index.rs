use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Global key index: which partition currently holds `(namespace, key)`.
///
/// The composite primary key is what guarantees a key lives in at most one
/// partition.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "registry_key_index")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub namespace: String,
    #[sea_orm(primary_key)]
    pub key: String,

    pub partition: String,
}

impl ActiveModelBehavior for ActiveModel {}
