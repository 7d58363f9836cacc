//! Book catalog route handlers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::AppState;
use crate::books::{Book, BookInput};
use crate::error::Result;

/// Query parameters for listing books.
#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub skip: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    10
}

pub async fn root() -> Json<Value> {
    Json(json!({ "message": "Welcome to the Library Management API" }))
}

pub async fn list_books(
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
) -> Json<Vec<Book>> {
    Json(state.books.list(page.skip, page.limit))
}

pub async fn get_book(State(state): State<AppState>, Path(id): Path<u64>) -> Result<Json<Book>> {
    state.books.get(id).map(Json)
}

pub async fn create_book(
    State(state): State<AppState>,
    Json(input): Json<BookInput>,
) -> (StatusCode, Json<Book>) {
    let book = state.books.create(input);
    info!(id = book.id, "Created book");
    (StatusCode::CREATED, Json(book))
}

pub async fn update_book(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(input): Json<BookInput>,
) -> Result<Json<Book>> {
    state.books.update(id, input).map(Json)
}

pub async fn delete_book(State(state): State<AppState>, Path(id): Path<u64>) -> Result<Json<Value>> {
    state.books.delete(id)?;
    info!(id, "Deleted book");
    Ok(Json(json!({ "message": format!("Book with id {} has been deleted", id) })))
}
