use crate::model::{generate_id, Id};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    #[serde(rename = "_id")]
    pub id: Id,
    pub name: String,
}

impl Project {
    pub fn new(name: String) -> Self {
        Self {
            id: generate_id(),
            name,
        }
    }
}
