use serde::{Deserialize, Serialize};

use crate::geo::BoundingBox;

/// What the next dispatch sync fetches.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncMode {
    #[default]
    None,
    PatrolGroup { name: String },
    Map { bounds: BoundingBox },
}

impl SyncMode {
    pub fn patrol_group(name: impl Into<String>) -> Self {
        SyncMode::PatrolGroup { name: name.into() }
    }

    pub const fn map(bounds: BoundingBox) -> Self {
        SyncMode::Map { bounds }
    }

    pub const fn bounds(&self) -> Option<&BoundingBox> {
        match self {
            SyncMode::Map { bounds } => Some(bounds),
            _ => None,
        }
    }
}
