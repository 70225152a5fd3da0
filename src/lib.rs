pub mod agent;
pub mod checkpoint;
pub mod error;
pub mod models;
pub mod observability;
pub mod providers;
pub mod traits;

pub use error::*;
pub use models::*;
pub use traits::*;
