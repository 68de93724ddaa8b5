//! External key-value and object storage used by the relay.

pub mod directory;
pub mod object;
pub mod params;
pub mod traits;

pub use directory::SubscriberDirectory;
pub use object::{FsObjectStore, HttpObjectStore};
pub use params::FsParameterStore;
pub use traits::{ObjectStore, ParameterStore};
