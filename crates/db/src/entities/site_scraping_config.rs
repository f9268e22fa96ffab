//! Site scraping configuration entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "site_scraping_configs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub site_name: String,

    pub base_url: String,

    #[sea_orm(default_value = true)]
    pub is_active: bool,

    /// `HTML`, `API` or `HEADLESS`
    pub scraping_type: String,

    // Selector strategy
    #[sea_orm(nullable)]
    pub job_list_item_selector: Option<String>,
    #[sea_orm(nullable)]
    pub title_selector: Option<String>,
    #[sea_orm(nullable)]
    pub link_selector: Option<String>,
    #[sea_orm(nullable)]
    pub link_attribute: Option<String>,
    #[sea_orm(nullable)]
    pub location_selector: Option<String>,
    #[sea_orm(nullable)]
    pub next_page_selector: Option<String>,
    #[sea_orm(nullable)]
    pub job_description_selector: Option<String>,
    #[sea_orm(nullable)]
    pub job_requisition_id_selector: Option<String>,

    // API strategy
    #[sea_orm(nullable)]
    pub api_endpoint_template: Option<String>,
    #[sea_orm(nullable)]
    pub api_method: Option<String>,
    /// Object of header name to value
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub api_headers_json: Option<Json>,
    #[sea_orm(column_type = "Text", nullable)]
    pub api_payload_template: Option<String>,
    /// JSON path mapping for the response
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub json_data_mappings: Option<Json>,

    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
