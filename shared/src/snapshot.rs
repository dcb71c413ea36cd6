use serde::{Deserialize, Serialize};

use crate::incident::Incident;
use crate::officer::Officer;
use crate::patrol::{Broadcast, Patrol};
use crate::resource::Resource;

/// Everything one dispatch sync returns. Replaces the previous snapshot wholesale.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SyncSnapshot {
    #[serde(default)]
    pub incidents: Vec<Incident>,
    #[serde(default)]
    pub resources: Vec<Resource>,
    #[serde(default)]
    pub officers: Vec<Officer>,
    #[serde(default)]
    pub patrols: Vec<Patrol>,
    #[serde(default)]
    pub broadcasts: Vec<Broadcast>,
}

#[cfg(test)]
mod tests {
    use super::SyncSnapshot;

    #[test]
    fn missing_collections_decode_as_empty() {
        let snapshot: SyncSnapshot =
            serde_json::from_str(r#"{"resources":[{"callsign":"P24"}]}"#).expect("decode");
        assert_eq!(snapshot.resources.len(), 1);
        assert!(snapshot.incidents.is_empty());
        assert!(snapshot.broadcasts.is_empty());
    }
}
