use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::resource::ResourceStatus;
use crate::shift::BookOnRequest;

/// Change notifications published by the sync coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CoordinatorEvent {
    SyncChanged {
        seq: u64,
        synced_at: DateTime<Utc>,
        incidents: usize,
        resources: usize,
        officers: usize,
    },
    BookOnChanged {
        seq: u64,
        book_on: Option<BookOnRequest>,
    },
    CallsignChanged {
        seq: u64,
        callsign: String,
        status: ResourceStatus,
        current_incident: Option<String>,
    },
    ShiftEnding {
        seq: u64,
        callsign: String,
        shift_end: DateTime<Utc>,
    },
    ManifestChanged {
        seq: u64,
        checked_at: DateTime<Utc>,
        entries: usize,
    },
}

impl CoordinatorEvent {
    pub const fn seq(&self) -> u64 {
        match self {
            CoordinatorEvent::SyncChanged { seq, .. }
            | CoordinatorEvent::BookOnChanged { seq, .. }
            | CoordinatorEvent::CallsignChanged { seq, .. }
            | CoordinatorEvent::ShiftEnding { seq, .. }
            | CoordinatorEvent::ManifestChanged { seq, .. } => *seq,
        }
    }

    /// SSE event name.
    pub const fn kind(&self) -> &'static str {
        match self {
            CoordinatorEvent::SyncChanged { .. } => "sync",
            CoordinatorEvent::BookOnChanged { .. } => "book_on",
            CoordinatorEvent::CallsignChanged { .. } => "callsign",
            CoordinatorEvent::ShiftEnding { .. } => "shift_ending",
            CoordinatorEvent::ManifestChanged { .. } => "manifest",
        }
    }
}
