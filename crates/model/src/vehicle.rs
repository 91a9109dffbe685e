use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::id::{HasId, Id};

use crate::{company::Company, ExampleData};

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub company_id: Id<Company>,
    pub name: String,
    pub license_plate: Option<String>,
    pub is_active: bool,
}

impl HasId for Vehicle {
    type IdType = i32;
}

impl ExampleData for Vehicle {
    fn example_data() -> Self {
        Self {
            company_id: Id::new(1),
            name: "Truck 7".to_owned(),
            license_plate: Some("KI-NH 707".to_owned()),
            is_active: true,
        }
    }
}
