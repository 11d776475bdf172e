pub mod sync_committee;
pub mod light_client;
pub mod checkpoint;
pub mod store;

pub use sync_committee::*;
pub use light_client::*;
pub use checkpoint::*;
pub use store::SyncCommitteeStore;
