use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::id::HasId;

use crate::ExampleData;

/// Demurrage threshold for companies which did not configure their own.
pub const DEFAULT_DEMURRAGE_THRESHOLD_MINUTES: i32 = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub name: String,
    /// Stops lasting strictly longer than this are billed as demurrage.
    pub demurrage_threshold_minutes: i32,
}

impl Company {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            demurrage_threshold_minutes: DEFAULT_DEMURRAGE_THRESHOLD_MINUTES,
        }
    }

    pub fn with_threshold(mut self, minutes: i32) -> Self {
        self.demurrage_threshold_minutes = minutes;
        self
    }
}

impl HasId for Company {
    type IdType = i32;
}

impl ExampleData for Company {
    fn example_data() -> Self {
        Self::new("Nordic Haulage")
    }
}
