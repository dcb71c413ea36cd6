pub mod manifest_loader;
pub mod sync_poller;
