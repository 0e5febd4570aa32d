// Store module
// Repository seam between the HTTP handlers and persistence

pub mod memory;

use async_trait::async_trait;

use crate::error::ApiResult;
use crate::models::{NewTutorial, Tutorial, TutorialChanges};
use crate::pagination::{PageWindow, WindowRows};

pub use memory::MemoryStore;

/// Persistence operations for tutorials.
///
/// Built once at start-up and shared with the router as `Arc<dyn TutorialStore>`.
/// Mutations report the number of affected rows; callers decide what zero means.
#[async_trait]
pub trait TutorialStore: Send + Sync {
    /// Cheap liveness probe.
    async fn ping(&self) -> ApiResult<()>;

    async fn create(&self, tutorial: NewTutorial) -> ApiResult<Tutorial>;

    /// All tutorials, optionally restricted to titles containing `title_filter`
    /// (case-insensitive).
    async fn find_all(&self, title_filter: Option<&str>) -> ApiResult<Vec<Tutorial>>;

    async fn find_by_id(&self, id: i32) -> ApiResult<Option<Tutorial>>;

    async fn update(&self, id: i32, changes: &TutorialChanges) -> ApiResult<u64>;

    async fn delete(&self, id: i32) -> ApiResult<u64>;

    async fn delete_all(&self) -> ApiResult<u64>;

    /// One window of published tutorials ordered by ascending id.
    async fn find_published(&self, window: &PageWindow) -> ApiResult<WindowRows<Tutorial>>;
}
