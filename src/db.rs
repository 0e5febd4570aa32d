use async_trait::async_trait;
use deadpool_postgres::{Config, ManagerConfig, Object, Pool, PoolConfig, RecyclingMethod, Runtime};
use native_tls::TlsConnector;
use postgres_native_tls::MakeTlsConnector;
use tokio_postgres::types::ToSql;
use tokio_postgres::Row;
use tracing::{error, info};

use crate::config::{DatabaseConfig, SslMode};
use crate::error::ApiError;
use crate::models::{NewTutorial, Tutorial, TutorialChanges};
use crate::pagination::{PageWindow, Position, WindowRows};
use crate::store::TutorialStore;

const TUTORIAL_COLUMNS: &str = "id, title, description, published, created_at, updated_at";

/// PostgreSQL-backed tutorial repository.
/// Holds a deadpool `Pool`; every operation borrows one connection for a single statement.
#[derive(Clone)]
pub struct Database {
    pool: Pool,
}

fn tutorial_from_row(row: &Row) -> Tutorial {
    Tutorial {
        id: row.get(0),
        title: row.get(1),
        description: row.get(2),
        published: row.get(3),
        created_at: row.get(4),
        updated_at: row.get(5),
    }
}

/// Escapes `LIKE` metacharacters so the filter matches a literal substring.
fn like_pattern(filter: &str) -> String {
    let mut escaped = String::with_capacity(filter.len() + 2);
    escaped.push('%');
    for c in filter.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

impl Database {
    /// Builds the pool and checks that a connection can be opened.
    pub async fn new(config: DatabaseConfig) -> Result<Self, ApiError> {
        info!(
            "Creating PostgreSQL connection pool for host: {}:{}",
            config.host, config.port
        );

        let pool = Self::create_pool(config)?;

        let db = Database { pool };
        db.test_connection().await?;

        Ok(db)
    }

    fn create_pool(config: DatabaseConfig) -> Result<Pool, ApiError> {
        let mut pg_config = Config::new();

        pg_config.host = Some(config.host);
        pg_config.port = Some(config.port);
        pg_config.dbname = Some(config.database);
        pg_config.user = Some(config.username);
        pg_config.password = config.password;
        pg_config.ssl_mode = Some(match config.ssl_mode {
            SslMode::Disable => deadpool_postgres::SslMode::Disable,
            SslMode::Prefer => deadpool_postgres::SslMode::Prefer,
            SslMode::Require => deadpool_postgres::SslMode::Require,
        });

        pg_config.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        let mut pool_config = PoolConfig::new(config.max_connections as usize);
        pool_config.timeouts.wait = Some(config.connection_timeout);
        pool_config.timeouts.create = Some(config.connection_timeout);
        pg_config.pool = Some(pool_config);

        let tls_connector = TlsConnector::builder().build().map_err(|e| {
            error!("Failed to create TLS connector: {}", e);
            ApiError::Database(format!("TLS connector creation failed: {}", e))
        })?;
        let tls = MakeTlsConnector::new(tls_connector);

        pg_config
            .create_pool(Some(Runtime::Tokio1), tls)
            .map_err(|e| {
                error!("Failed to create connection pool: {}", e);
                ApiError::Database(format!("Connection pool creation failed: {}", e))
            })
    }

    async fn get_connection(&self) -> Result<Object, ApiError> {
        self.pool.get().await.map_err(ApiError::from)
    }

    async fn test_connection(&self) -> Result<(), ApiError> {
        let client = self.get_connection().await?;

        client.execute("SELECT 1", &[]).await.map_err(|e| {
            error!("Database connection test failed: {}", e);
            ApiError::Database(format!("Connection test failed: {}", e))
        })?;

        info!("Database connection test successful");
        Ok(())
    }

    /// Creates the `tutorials` table and its indexes when missing.
    pub async fn migrate(&self) -> Result<(), ApiError> {
        info!("Running database migrations");

        let client = self.get_connection().await?;

        let tutorials_table = r#"
            CREATE TABLE IF NOT EXISTS tutorials (
                id SERIAL PRIMARY KEY,
                title VARCHAR(255) NOT NULL CHECK (btrim(title) <> ''),
                description TEXT,
                published BOOLEAN NOT NULL DEFAULT FALSE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
        "#;

        client.execute(tutorials_table, &[]).await.map_err(|e| {
            error!("Failed to create tutorials table: {}", e);
            ApiError::Database(format!("Tutorials table creation failed: {}", e))
        })?;

        let published_index =
            "CREATE INDEX IF NOT EXISTS idx_tutorials_published_id ON tutorials(id) WHERE published";
        client.execute(published_index, &[]).await.map_err(|e| {
            error!("Failed to create tutorials published index: {}", e);
            ApiError::Database(format!("Tutorials published index creation failed: {}", e))
        })?;

        info!("Database migrations completed successfully");
        Ok(())
    }
}

#[async_trait]
impl TutorialStore for Database {
    async fn ping(&self) -> Result<(), ApiError> {
        let client = self.get_connection().await?;

        client.execute("SELECT 1", &[]).await.map_err(|e| {
            error!("Database health check failed: {}", e);
            ApiError::Database(format!("Health check failed: {}", e))
        })?;

        Ok(())
    }

    async fn create(&self, tutorial: NewTutorial) -> Result<Tutorial, ApiError> {
        let client = self.get_connection().await?;

        let query = format!(
            "INSERT INTO tutorials (title, description, published) VALUES ($1, $2, $3) RETURNING {}",
            TUTORIAL_COLUMNS
        );

        let row = client
            .query_one(
                &query,
                &[&tutorial.title, &tutorial.description, &tutorial.published],
            )
            .await
            .map_err(ApiError::from)?;

        let created = tutorial_from_row(&row);
        info!("Created tutorial with id: {}", created.id);
        Ok(created)
    }

    async fn find_all(&self, title_filter: Option<&str>) -> Result<Vec<Tutorial>, ApiError> {
        let client = self.get_connection().await?;

        let rows = match title_filter {
            Some(filter) => {
                let query = format!(
                    "SELECT {} FROM tutorials WHERE title ILIKE $1 ORDER BY id",
                    TUTORIAL_COLUMNS
                );
                client.query(&query, &[&like_pattern(filter)]).await
            }
            None => {
                let query = format!("SELECT {} FROM tutorials ORDER BY id", TUTORIAL_COLUMNS);
                client.query(&query, &[]).await
            }
        }
        .map_err(ApiError::from)?;

        Ok(rows.iter().map(tutorial_from_row).collect())
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<Tutorial>, ApiError> {
        let client = self.get_connection().await?;
        let query = format!("SELECT {} FROM tutorials WHERE id = $1", TUTORIAL_COLUMNS);

        let row = client
            .query_opt(&query, &[&id])
            .await
            .map_err(ApiError::from)?;

        Ok(row.as_ref().map(tutorial_from_row))
    }

    async fn update(&self, id: i32, changes: &TutorialChanges) -> Result<u64, ApiError> {
        let client = self.get_connection().await?;

        // Build the SET list from the fields that are present
        let mut assignments = Vec::new();
        let mut params: Vec<&(dyn ToSql + Sync)> = Vec::new();

        if let Some(ref title) = changes.title {
            params.push(title);
            assignments.push(format!("title = ${}", params.len()));
        }

        if let Some(ref description) = changes.description {
            params.push(description);
            assignments.push(format!("description = ${}", params.len()));
        }

        if let Some(ref published) = changes.published {
            params.push(published);
            assignments.push(format!("published = ${}", params.len()));
        }

        assignments.push("updated_at = NOW()".to_string());
        params.push(&id);

        let query = format!(
            "UPDATE tutorials SET {} WHERE id = ${}",
            assignments.join(", "),
            params.len()
        );

        let rows_affected = client
            .execute(&query, &params)
            .await
            .map_err(ApiError::from)?;

        if rows_affected > 0 {
            info!("Updated tutorial with id: {}", id);
        }
        Ok(rows_affected)
    }

    async fn delete(&self, id: i32) -> Result<u64, ApiError> {
        let client = self.get_connection().await?;

        let rows_affected = client
            .execute("DELETE FROM tutorials WHERE id = $1", &[&id])
            .await
            .map_err(ApiError::from)?;

        if rows_affected > 0 {
            info!("Deleted tutorial with id: {}", id);
        }
        Ok(rows_affected)
    }

    async fn delete_all(&self) -> Result<u64, ApiError> {
        let client = self.get_connection().await?;

        let rows_affected = client
            .execute("DELETE FROM tutorials", &[])
            .await
            .map_err(ApiError::from)?;

        info!("Deleted {} tutorials", rows_affected);
        Ok(rows_affected)
    }

    async fn find_published(&self, window: &PageWindow) -> Result<WindowRows<Tutorial>, ApiError> {
        let client = self.get_connection().await?;

        // Both counts come from one statement so they agree with each other
        let (rows, counts) = match window.position {
            None => {
                let query = format!(
                    "SELECT {} FROM tutorials WHERE published ORDER BY id ASC LIMIT $1",
                    TUTORIAL_COLUMNS
                );
                let rows = client.query(&query, &[&window.limit]).await;
                let counts = client
                    .query_one(
                        "SELECT COUNT(*), COUNT(*) FROM tutorials WHERE published",
                        &[],
                    )
                    .await;
                (rows, counts)
            }
            Some(Position::After(after)) => {
                let query = format!(
                    "SELECT {} FROM tutorials WHERE published AND id > $1 ORDER BY id ASC LIMIT $2",
                    TUTORIAL_COLUMNS
                );
                let rows = client.query(&query, &[&after, &window.limit]).await;
                let counts = client
                    .query_one(
                        "SELECT COUNT(*), COUNT(*) FILTER (WHERE id > $1) FROM tutorials WHERE published",
                        &[&after],
                    )
                    .await;
                (rows, counts)
            }
            Some(Position::Before(before)) => {
                let query = format!(
                    "SELECT {} FROM tutorials WHERE published AND id < $1 ORDER BY id DESC LIMIT $2",
                    TUTORIAL_COLUMNS
                );
                let rows = client.query(&query, &[&before, &window.limit]).await;
                let counts = client
                    .query_one(
                        "SELECT COUNT(*), COUNT(*) FILTER (WHERE id < $1) FROM tutorials WHERE published",
                        &[&before],
                    )
                    .await;
                (rows, counts)
            }
        };

        let mut items: Vec<Tutorial> = rows
            .map_err(ApiError::from)?
            .iter()
            .map(tutorial_from_row)
            .collect();
        let counts = counts.map_err(ApiError::from)?;

        if matches!(window.position, Some(Position::Before(_))) {
            items.reverse();
        }

        Ok(WindowRows {
            items,
            total_count: counts.get(0),
            cursor_count: counts.get(1),
        })
    }
}
