use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "registry_entry")]
pub struct Model {
    /// Owning persona id, or the system partition.
    #[sea_orm(primary_key)]
    pub partition: String,
    #[sea_orm(primary_key)]
    pub namespace: String,
    #[sea_orm(primary_key)]
    pub key: String,

    #[sea_orm(column_type = "JsonBinary")]
    pub data: Json,

    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
