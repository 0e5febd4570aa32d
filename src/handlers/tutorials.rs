// Tutorial handlers
// HTTP handlers for tutorial management operations

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;
use tracing::{error, info};

use crate::{
    error::ApiError,
    extract::{Payload, TutorialId, ValidQuery},
    models::{CreateTutorialRequest, MessageResponse, UpdateTutorialRequest},
    pagination::{Page, PageQuery, PageWindow},
    routes::AppState,
};

const CREATE_FAILED: &str = "Some error occurred while creating the Tutorial.";
const RETRIEVE_FAILED: &str = "Some error occurred while retrieving tutorials.";
const DELETE_ALL_FAILED: &str = "Some error occurred while removing all tutorials.";

/// Query parameters for listing tutorials
#[derive(Debug, Default, Deserialize)]
pub struct ListTutorialsQuery {
    pub title: Option<String>,
}

/// Create a new tutorial
/// POST /api/tutorials
pub async fn create_tutorial(
    State(state): State<AppState>,
    Payload(request): Payload<CreateTutorialRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let tutorial = request.validate().map_err(ApiError::Validation)?;
    info!("Creating new tutorial with title: {}", tutorial.title);

    let created = state.store.create(tutorial).await.map_err(|e| {
        error!("Failed to create tutorial: {}", e);
        e.or_message(CREATE_FAILED)
    })?;

    info!("Successfully created tutorial with id: {}", created.id);
    Ok((StatusCode::CREATED, Json(created)))
}

/// List tutorials, optionally filtered by a title substring
/// GET /api/tutorials?title=<text>
pub async fn find_all_tutorials(
    State(state): State<AppState>,
    ValidQuery(params): ValidQuery<ListTutorialsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = params
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty());

    match filter {
        Some(title) => info!("Fetching tutorials with title containing: {}", title),
        None => info!("Fetching all tutorials"),
    }

    let tutorials = state.store.find_all(filter).await.map_err(|e| {
        error!("Failed to retrieve tutorials: {}", e);
        e.with_message(RETRIEVE_FAILED)
    })?;

    info!("Retrieved {} tutorials", tutorials.len());
    Ok(Json(tutorials))
}

/// Get a tutorial by id; responds with `null` when it does not exist
/// GET /api/tutorials/:id
pub async fn find_one_tutorial(
    State(state): State<AppState>,
    TutorialId(id): TutorialId,
) -> Result<impl IntoResponse, ApiError> {
    info!("Fetching tutorial with id: {}", id);

    let tutorial = state
        .store
        .find_by_id(id)
        .await
        .map_err(|e| {
            error!("Failed to retrieve tutorial with id {}: {}", id, e);
            e.with_message(format!("Error retrieving Tutorial with id={}", id))
        })?;

    if tutorial.is_none() {
        info!("Tutorial with id {} not found", id);
    }
    Ok(Json(tutorial))
}

/// Apply a partial update
/// PUT /api/tutorials/:id
pub async fn update_tutorial(
    State(state): State<AppState>,
    TutorialId(id): TutorialId,
    Payload(request): Payload<UpdateTutorialRequest>,
) -> Result<impl IntoResponse, ApiError> {
    info!("Updating tutorial with id: {}", id);

    let changes = request.validate().map_err(ApiError::Validation)?;

    let rows_affected = if changes.is_empty() {
        0
    } else {
        state
            .store
            .update(id, &changes)
            .await
            .map_err(|e| {
                error!("Failed to update tutorial with id {}: {}", id, e);
                e.with_message(format!("Error updating Tutorial with id={}", id))
            })?
    };

    let message = if rows_affected > 0 {
        info!("Successfully updated tutorial with id: {}", id);
        "Tutorial was updated successfully.".to_string()
    } else {
        format!(
            "Cannot update Tutorial with id={}. Maybe Tutorial was not found or req.body is empty!",
            id
        )
    };

    Ok(Json(MessageResponse::new(message)))
}

/// Delete a tutorial by id
/// DELETE /api/tutorials/:id
pub async fn delete_tutorial(
    State(state): State<AppState>,
    TutorialId(id): TutorialId,
) -> Result<impl IntoResponse, ApiError> {
    info!("Deleting tutorial with id: {}", id);

    let rows_affected = state
        .store
        .delete(id)
        .await
        .map_err(|e| {
            error!("Failed to delete tutorial with id {}: {}", id, e);
            e.with_message(format!("Could not delete Tutorial with id={}", id))
        })?;

    let message = if rows_affected > 0 {
        info!("Successfully deleted tutorial with id: {}", id);
        "Tutorial was deleted successfully!".to_string()
    } else {
        format!("Cannot delete Tutorial with id={}. Maybe Tutorial was not found!", id)
    };

    Ok(Json(MessageResponse::new(message)))
}

/// Delete every tutorial
/// DELETE /api/tutorials
pub async fn delete_all_tutorials(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    info!("Deleting all tutorials");

    let removed = state.store.delete_all().await.map_err(|e| {
        error!("Failed to delete all tutorials: {}", e);
        e.or_message(DELETE_ALL_FAILED)
    })?;

    Ok(Json(MessageResponse::new(format!(
        "{} Tutorials were deleted successfully!",
        removed
    ))))
}

/// Cursor-paginated listing of published tutorials
/// GET /api/tutorials/published?after=&before=&limit=
pub async fn find_all_published(
    State(state): State<AppState>,
    ValidQuery(params): ValidQuery<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let window = PageWindow::from_query(&params, &state.cursors)?;
    info!(
        "Fetching published tutorials (limit: {}, position: {:?})",
        window.limit, window.position
    );

    let rows = state.store.find_published(&window).await.map_err(|e| {
        error!("Failed to retrieve published tutorials: {}", e);
        e.or_message(RETRIEVE_FAILED)
    })?;

    let page = Page::assemble(&window, rows, &state.cursors);
    info!(
        "Retrieved {} of {} published tutorials",
        page.data.len(),
        page.total_count
    );
    Ok(Json(page))
}
