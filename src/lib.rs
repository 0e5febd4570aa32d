// Library root for the Tutorial REST API

pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod pagination;
pub mod routes;
pub mod store;

// Re-export commonly used types
pub use db::Database;
pub use error::{ApiError, ApiResult};
pub use models::{CreateTutorialRequest, Tutorial, UpdateTutorialRequest};
pub use pagination::{CursorCodec, Page, PageInfo};
pub use routes::{create_router, AppState};
pub use store::{MemoryStore, TutorialStore};
