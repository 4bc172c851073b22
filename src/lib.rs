pub mod cache;
pub mod config;
pub mod errors;
pub mod eval;
pub mod fetch;
pub mod model;
pub mod models;
pub mod scrapers;
pub mod teams;
pub mod utils;

pub use cache::*;
pub use config::*;
pub use errors::*;
pub use eval::*;
pub use fetch::*;
pub use model::*;
pub use models::*;
pub use scrapers::*;
pub use teams::*;
pub use utils::*;
