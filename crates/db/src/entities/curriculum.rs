//! Curriculum (resume) entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "curricula")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub user_id: i32,

    pub title: String,

    /// Only the active curriculum is used for matching
    #[sea_orm(default_value = false)]
    pub is_active: bool,

    #[sea_orm(column_type = "Text")]
    pub summary: String,

    #[sea_orm(column_type = "Text")]
    pub skills: String,

    #[sea_orm(column_type = "Text")]
    pub languages: String,

    /// Array of `{company, title, description}`
    #[sea_orm(column_type = "JsonBinary")]
    pub experiences: Json,

    /// Array of `{institution, degree, start_date, end_date}`
    #[sea_orm(column_type = "JsonBinary")]
    pub educations: Json,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
