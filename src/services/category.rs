use crate::{
    error::{AppError, AppResult},
    models::{category, subcategory, Category, CategoryModel, Subcategory, SubcategoryModel},
};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder};
use std::collections::HashMap;

/// What complaint creation needs to know about a category reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRef {
    pub category_id: i32,
    pub subcategory_id: Option<i32>,
    pub department: String,
}

#[derive(Debug, Clone)]
pub struct CategoryWithSubcategories {
    pub category: CategoryModel,
    pub subcategories: Vec<SubcategoryModel>,
}

/// Read-only access to the category reference tables.
pub struct CategoryService;

impl CategoryService {
    /// Confirms the category exists and, when given, that the subcategory belongs to it.
    pub async fn resolve<C: ConnectionTrait>(
        conn: &C,
        category_id: i32,
        subcategory_id: Option<i32>,
    ) -> AppResult<CategoryRef> {
        let category = Category::find_by_id(category_id)
            .one(conn)
            .await?
            .ok_or_else(|| AppError::Validation(format!("Unknown category {}", category_id)))?;

        if let Some(sub_id) = subcategory_id {
            Subcategory::find_by_id(sub_id)
                .filter(subcategory::Column::CategoryId.eq(category_id))
                .one(conn)
                .await?
                .ok_or_else(|| {
                    AppError::Validation(format!(
                        "Subcategory {} does not belong to category {}",
                        sub_id, category_id
                    ))
                })?;
        }

        Ok(CategoryRef {
            category_id,
            subcategory_id,
            department: category.department,
        })
    }

    pub async fn list<C: ConnectionTrait>(conn: &C) -> AppResult<Vec<CategoryWithSubcategories>> {
        let categories = Category::find()
            .order_by_asc(category::Column::DisplayOrder)
            .order_by_asc(category::Column::Id)
            .all(conn)
            .await?;

        let subcategories = Subcategory::find()
            .order_by_asc(subcategory::Column::DisplayOrder)
            .order_by_asc(subcategory::Column::Id)
            .all(conn)
            .await?;

        let mut by_category: HashMap<i32, Vec<SubcategoryModel>> = HashMap::new();
        for sub in subcategories {
            by_category.entry(sub.category_id).or_default().push(sub);
        }

        Ok(categories
            .into_iter()
            .map(|category| CategoryWithSubcategories {
                subcategories: by_category.remove(&category.id).unwrap_or_default(),
                category,
            })
            .collect())
    }
}
