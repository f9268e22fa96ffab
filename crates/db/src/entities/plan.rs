//! Subscription plan entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "plans")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub name: String,

    #[sea_orm(column_type = "Double")]
    pub price: f64,

    /// How many sites the user may subscribe to
    pub max_sites: i32,

    /// AI analyses allowed per calendar month; zero or negative means unlimited
    pub max_ai_analyses: i32,

    /// Marketing feature list
    #[sea_orm(column_type = "JsonBinary")]
    pub features: Json,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
