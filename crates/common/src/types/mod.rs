use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug)]
pub struct Health {
    pub status: &'static str,
    pub database: &'static str,
}

/// Generic `{ "detail": ... }` acknowledgement body.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Detail {
    pub detail: String,
}

impl Detail {
    pub fn new(detail: impl Into<String>) -> Self {
        Self { detail: detail.into() }
    }
}
