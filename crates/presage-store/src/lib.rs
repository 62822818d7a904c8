pub mod error;
pub mod json_bridge;
pub mod schema;
pub mod settings;
pub mod store;

pub use error::{Result, StoreError};
pub use settings::Settings;
pub use store::SqliteBackend;
