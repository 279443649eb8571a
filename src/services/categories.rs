// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Category management.

use crate::db::Store;
use crate::error::{AppError, Result};
use crate::models::{new_id, parse_id, Category, CategoryView};
use chrono::Utc;

#[derive(Clone)]
pub struct CategoryService {
    db: Store,
}

impl CategoryService {
    pub fn new(db: Store) -> Self {
        Self { db }
    }

    async fn load(&self, raw_id: &str) -> Result<Category> {
        let id = parse_id(raw_id, "categoryId")?;
        self.db
            .get_category(&id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Category {}", id)))
    }

    pub async fn create(&self, name: &str, description: &str) -> Result<CategoryView> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::InvalidArgument(
                "Category name is required".to_string(),
            ));
        }

        let now = Utc::now();
        let category = Category {
            id: new_id(),
            name: name.to_string(),
            description: description.trim().to_string(),
            created_at: now,
            updated_at: now,
        };
        self.db.insert_category(&category).await?;

        tracing::info!(category_id = %category.id, name = %category.name, "Category created");
        Ok(CategoryView::from(&category))
    }

    /// All categories, alphabetically.
    pub async fn list(&self) -> Result<Vec<CategoryView>> {
        let mut categories = self.db.list_categories().await?;
        categories.sort_by_key(|c| Category::name_key(&c.name));
        Ok(categories.iter().map(CategoryView::from).collect())
    }

    pub async fn get(&self, raw_id: &str) -> Result<CategoryView> {
        Ok(CategoryView::from(&self.load(raw_id).await?))
    }

    /// Apply the given fields; absent fields keep their value.
    pub async fn update(
        &self,
        raw_id: &str,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<CategoryView> {
        let mut category = self.load(raw_id).await?;
        let previous_name = category.name.clone();

        if let Some(name) = name {
            let name = name.trim();
            if name.is_empty() {
                return Err(AppError::InvalidArgument(
                    "Category name must not be empty".to_string(),
                ));
            }
            category.name = name.to_string();
        }
        if let Some(description) = description {
            category.description = description.trim().to_string();
        }
        category.updated_at = Utc::now();

        self.db.update_category(&category, &previous_name).await?;
        Ok(CategoryView::from(&category))
    }

    /// Posts keep the dangling ID; views drop it when resolving names.
    pub async fn delete(&self, raw_id: &str) -> Result<()> {
        let id = parse_id(raw_id, "categoryId")?;
        if !self.db.delete_category(&id).await? {
            return Err(AppError::NotFound(format!("Category {}", id)));
        }
        tracing::info!(category_id = %id, "Category deleted");
        Ok(())
    }
}
