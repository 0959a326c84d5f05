use axum::{response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const DEFAULT_PER_PAGE: u64 = 20;
pub const MAX_PER_PAGE: u64 = 100;

/// Success envelope. Failures are rendered by [`crate::error::AppError`].
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> axum::response::Response {
        Json(self).into_response()
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedResponse<T: Serialize> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub total_pages: u64,
}

impl<T: Serialize> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, total: u64, page: u64, per_page: u64) -> Self {
        Self {
            items,
            total,
            page,
            per_page,
            total_pages: total.div_ceil(per_page.max(1)),
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct PaginationQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

impl PaginationQuery {
    /// 1-based page and a page size clamped to `1..=MAX_PER_PAGE`.
    pub fn resolve(&self) -> (u64, u64) {
        (
            self.page.unwrap_or(1).max(1),
            self.per_page
                .unwrap_or(DEFAULT_PER_PAGE)
                .clamp(1, MAX_PER_PAGE),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(PaginatedResponse::<u8>::new(vec![], 101, 1, 20).total_pages, 6);
        assert_eq!(PaginatedResponse::<u8>::new(vec![], 60, 1, 20).total_pages, 3);
        assert_eq!(PaginatedResponse::<u8>::new(vec![], 0, 1, 20).total_pages, 0);
        assert_eq!(PaginatedResponse::<u8>::new(vec![], 1, 1, 20).total_pages, 1);
    }

    #[test]
    fn pagination_defaults_and_clamps() {
        assert_eq!(PaginationQuery::default().resolve(), (1, DEFAULT_PER_PAGE));

        let query = PaginationQuery {
            page: Some(0),
            per_page: Some(10_000),
        };
        assert_eq!(query.resolve(), (1, MAX_PER_PAGE));

        let query = PaginationQuery {
            page: Some(3),
            per_page: Some(0),
        };
        assert_eq!(query.resolve(), (3, 1));
    }

    #[test]
    fn envelope_serializes_data() {
        let json = serde_json::to_value(ApiResponse::ok(7)).unwrap();
        assert_eq!(json, serde_json::json!({ "success": true, "data": 7 }));
    }
}
