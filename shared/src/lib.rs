pub mod events;
pub mod geo;
pub mod incident;
pub mod manifest;
pub mod officer;
pub mod patrol;
pub mod resource;
pub mod shift;
pub mod snapshot;
pub mod sync_mode;

pub use events::*;
pub use geo::{BoundingBox, Coordinate};
pub use incident::*;
pub use manifest::ManifestEntry;
pub use officer::Officer;
pub use patrol::{Broadcast, Patrol};
pub use resource::*;
pub use shift::*;
pub use snapshot::SyncSnapshot;
pub use sync_mode::SyncMode;
