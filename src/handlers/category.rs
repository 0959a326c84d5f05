use crate::error::AppResult;
use crate::models::{CategoryModel, SubcategoryModel};
use crate::response::ApiResponse;
use crate::services::category::{CategoryService, CategoryWithSubcategories};
use axum::{response::IntoResponse, Extension};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct SubcategoryResponse {
    pub id: i32,
    pub slug: String,
    pub name: String,
}

impl From<SubcategoryModel> for SubcategoryResponse {
    fn from(s: SubcategoryModel) -> Self {
        Self {
            id: s.id,
            slug: s.slug,
            name: s.name,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryResponse {
    pub id: i32,
    pub slug: String,
    pub name: String,
    /// Department complaints in this category are routed to
    pub department: String,
    pub subcategories: Vec<SubcategoryResponse>,
}

impl CategoryResponse {
    fn new(category: CategoryModel, subcategories: Vec<SubcategoryModel>) -> Self {
        Self {
            id: category.id,
            slug: category.slug,
            name: category.name,
            department: category.department,
            subcategories: subcategories.into_iter().map(Into::into).collect(),
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/categories",
    responses(
        (status = 200, description = "Complaint categories with their subcategories", body = Vec<CategoryResponse>),
    ),
    tag = "categories"
)]
pub async fn list_categories(
    Extension(db): Extension<DatabaseConnection>,
) -> AppResult<impl IntoResponse> {
    let categories = CategoryService::list(&db).await?;
    let items: Vec<CategoryResponse> = categories
        .into_iter()
        .map(|CategoryWithSubcategories { category, subcategories }| {
            CategoryResponse::new(category, subcategories)
        })
        .collect();
    Ok(ApiResponse::ok(items))
}
