// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Category routes.

use crate::error::Result;
use crate::extract::ValidJson;
use crate::models::CategoryView;
use crate::response::ApiResponse;
use crate::routes::Empty;
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_categories))
        .route("/{category_id}", get(get_category))
}

pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_category))
        .route("/{category_id}", put(update_category).delete(delete_category))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 64, message = "must be 1 to 64 characters"))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 1000, message = "must be at most 1000 characters"))]
    pub description: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCategoryRequest {
    #[validate(length(min = 1, max = 64, message = "must be 1 to 64 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 1000, message = "must be at most 1000 characters"))]
    pub description: Option<String>,
}

async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> Result<ApiResponse<Vec<CategoryView>>> {
    let categories = state.categories.list().await?;
    Ok(ApiResponse::ok(categories, "Categories fetched successfully"))
}

async fn get_category(
    State(state): State<Arc<AppState>>,
    Path(category_id): Path<String>,
) -> Result<ApiResponse<CategoryView>> {
    let category = state.categories.get(&category_id).await?;
    Ok(ApiResponse::ok(category, "Category fetched successfully"))
}

async fn create_category(
    State(state): State<Arc<AppState>>,
    ValidJson(body): ValidJson<CreateCategoryRequest>,
) -> Result<ApiResponse<CategoryView>> {
    let category = state
        .categories
        .create(&body.name, &body.description)
        .await?;
    Ok(ApiResponse::created(category, "Category created successfully"))
}

async fn update_category(
    State(state): State<Arc<AppState>>,
    Path(category_id): Path<String>,
    ValidJson(body): ValidJson<UpdateCategoryRequest>,
) -> Result<ApiResponse<CategoryView>> {
    let category = state
        .categories
        .update(
            &category_id,
            body.name.as_deref(),
            body.description.as_deref(),
        )
        .await?;
    Ok(ApiResponse::ok(category, "Category updated successfully"))
}

async fn delete_category(
    State(state): State<Arc<AppState>>,
    Path(category_id): Path<String>,
) -> Result<ApiResponse<Empty>> {
    state.categories.delete(&category_id).await?;
    Ok(ApiResponse::ok(Empty {}, "Category deleted successfully"))
}
