use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::info;

use super::TutorialStore;
use crate::error::ApiResult;
use crate::models::{NewTutorial, Tutorial, TutorialChanges};
use crate::pagination::{PageWindow, Position, WindowRows};

#[derive(Debug, Default)]
struct Tables {
    last_id: i32,
    tutorials: BTreeMap<i32, Tutorial>,
}

/// Process-local store backed by an ordered map.
///
/// Ids keep increasing after deletes, matching a `SERIAL` column.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TutorialStore for MemoryStore {
    async fn ping(&self) -> ApiResult<()> {
        Ok(())
    }

    async fn create(&self, tutorial: NewTutorial) -> ApiResult<Tutorial> {
        let mut tables = self.tables.write().await;
        tables.last_id += 1;

        let now = Utc::now();
        let created = Tutorial {
            id: tables.last_id,
            title: tutorial.title,
            description: tutorial.description,
            published: tutorial.published,
            created_at: now,
            updated_at: now,
        };
        tables.tutorials.insert(created.id, created.clone());

        info!("Created tutorial with id: {}", created.id);
        Ok(created)
    }

    async fn find_all(&self, title_filter: Option<&str>) -> ApiResult<Vec<Tutorial>> {
        let needle = title_filter.map(str::to_lowercase);
        let tables = self.tables.read().await;

        Ok(tables
            .tutorials
            .values()
            .filter(|t| match needle {
                Some(ref needle) => t.title.to_lowercase().contains(needle.as_str()),
                None => true,
            })
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, id: i32) -> ApiResult<Option<Tutorial>> {
        Ok(self.tables.read().await.tutorials.get(&id).cloned())
    }

    async fn update(&self, id: i32, changes: &TutorialChanges) -> ApiResult<u64> {
        let mut tables = self.tables.write().await;
        match tables.tutorials.get_mut(&id) {
            Some(tutorial) => {
                tutorial.apply(changes);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete(&self, id: i32) -> ApiResult<u64> {
        let removed = self.tables.write().await.tutorials.remove(&id);
        Ok(u64::from(removed.is_some()))
    }

    async fn delete_all(&self) -> ApiResult<u64> {
        let mut tables = self.tables.write().await;
        let removed = tables.tutorials.len() as u64;
        tables.tutorials.clear();
        Ok(removed)
    }

    async fn find_published(&self, window: &PageWindow) -> ApiResult<WindowRows<Tutorial>> {
        let tables = self.tables.read().await;
        let published: Vec<&Tutorial> = tables.tutorials.values().filter(|t| t.published).collect();
        let total_count = published.len() as i64;
        let limit = window.limit.max(0) as usize;

        let (items, cursor_count): (Vec<Tutorial>, i64) = match window.position {
            None => (
                published.iter().take(limit).map(|t| (*t).clone()).collect(),
                total_count,
            ),
            Some(Position::After(after)) => {
                let side: Vec<&Tutorial> =
                    published.into_iter().filter(|t| t.id > after).collect();
                let count = side.len() as i64;
                (side.into_iter().take(limit).cloned().collect(), count)
            }
            Some(Position::Before(before)) => {
                let side: Vec<&Tutorial> =
                    published.into_iter().filter(|t| t.id < before).collect();
                let count = side.len() as i64;
                let skip = side.len().saturating_sub(limit);
                (side.into_iter().skip(skip).cloned().collect(), count)
            }
        };

        Ok(WindowRows {
            items,
            total_count,
            cursor_count,
        })
    }
}
