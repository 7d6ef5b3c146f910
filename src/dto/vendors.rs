use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Vendor;

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterVendorRequest {
    pub name: String,
    #[serde(default)]
    pub phone: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateVendorRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VendorList {
    pub items: Vec<Vendor>,
}
