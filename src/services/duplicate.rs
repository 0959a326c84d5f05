use crate::{
    config::rules::RulesConfig,
    error::AppResult,
    models::{complaint, Complaint},
    utils::geo::{self, GeoPoint},
};
use chrono::NaiveDateTime;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect, Statement};
use serde::Serialize;
use std::time::Duration;
use utoipa::ToSchema;
use uuid::Uuid;

/// First key of the two-part advisory lock taken while checking a category.
const CATEGORY_LOCK_NAMESPACE: i32 = 0x0C1D_0001;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct DuplicateMatch {
    pub complaint_id: Uuid,
    pub distance_meters: f64,
    pub created_at: NaiveDateTime,
}

/// Detects reports of the same category filed recently near the same spot,
/// regardless of who filed them. Advisory only: the caller decides what to do.
pub struct DuplicateGuard {
    radius_meters: f64,
}

impl DuplicateGuard {
    pub fn new(radius_meters: f64) -> Self {
        Self { radius_meters }
    }

    pub fn from_rules(rules: &RulesConfig) -> Self {
        Self::new(rules.duplicate_radius_meters)
    }

    /// Serializes duplicate checks for one category until the transaction ends,
    /// so two concurrent nearby submissions cannot both pass.
    pub async fn lock_category<C: ConnectionTrait>(conn: &C, category_id: i32) -> AppResult<()> {
        conn.execute(Statement::from_sql_and_values(
            sea_orm::DatabaseBackend::Postgres,
            "SELECT pg_advisory_xact_lock($1, $2)",
            vec![CATEGORY_LOCK_NAMESPACE.into(), category_id.into()],
        ))
        .await?;
        Ok(())
    }

    pub async fn check<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: Option<Uuid>,
        category_id: i32,
        point: GeoPoint,
        window: Duration,
    ) -> AppResult<bool> {
        let found = self
            .find_duplicate(conn, category_id, point, window)
            .await?;
        if let Some(m) = &found {
            tracing::info!(
                user_id = ?user_id,
                category_id,
                existing = %m.complaint_id,
                distance_m = m.distance_meters,
                "Likely duplicate report"
            );
        }
        Ok(found.is_some())
    }

    /// Nearest complaint in `category_id` within the radius, created inside `window`.
    pub async fn find_duplicate<C: ConnectionTrait>(
        &self,
        conn: &C,
        category_id: i32,
        point: GeoPoint,
        window: Duration,
    ) -> AppResult<Option<DuplicateMatch>> {
        let now = chrono::Utc::now().naive_utc();
        let cutoff = now - chrono::Duration::seconds(window.as_secs() as i64);
        let bbox = geo::bounding_box(point, self.radius_meters);

        let candidates: Vec<(Uuid, f64, f64, NaiveDateTime)> = Complaint::find()
            .select_only()
            .column(complaint::Column::Id)
            .column(complaint::Column::Latitude)
            .column(complaint::Column::Longitude)
            .column(complaint::Column::CreatedAt)
            .filter(complaint::Column::CategoryId.eq(category_id))
            .filter(complaint::Column::CreatedAt.gte(cutoff))
            .filter(complaint::Column::Latitude.between(bbox.min_latitude, bbox.max_latitude))
            .filter(complaint::Column::Longitude.between(bbox.min_longitude, bbox.max_longitude))
            .into_tuple()
            .all(conn)
            .await?;

        Ok(nearest_within(
            candidates
                .into_iter()
                .map(|(id, lat, lng, created_at)| (id, GeoPoint::new(lat, lng), created_at)),
            point,
            self.radius_meters,
        ))
    }
}

fn nearest_within<I>(candidates: I, point: GeoPoint, radius_meters: f64) -> Option<DuplicateMatch>
where
    I: IntoIterator<Item = (Uuid, GeoPoint, NaiveDateTime)>,
{
    candidates
        .into_iter()
        .map(|(complaint_id, at, created_at)| DuplicateMatch {
            complaint_id,
            distance_meters: geo::distance_meters(point, at),
            created_at,
        })
        .filter(|m| m.distance_meters <= radius_meters)
        .min_by(|a, b| a.distance_meters.total_cmp(&b.distance_meters))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(lat: f64, lng: f64) -> GeoPoint {
        GeoPoint::new(lat, lng)
    }

    fn ts() -> NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(2026, 3, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    #[test]
    fn picks_nearest_candidate_inside_radius() {
        let origin = at(12.9716, 77.5946);
        let near = Uuid::new_v4();
        let nearer = Uuid::new_v4();
        let far = Uuid::new_v4();
        let found = nearest_within(
            vec![
                (near, at(12.9719, 77.5946), ts()),
                (nearer, at(12.9717, 77.5946), ts()),
                (far, at(12.9800, 77.5946), ts()),
            ],
            origin,
            50.0,
        )
        .unwrap();
        assert_eq!(found.complaint_id, nearer);
        assert!(found.distance_meters < 15.0);
    }

    #[test]
    fn nothing_inside_radius_is_not_a_duplicate() {
        let origin = at(12.9716, 77.5946);
        let found = nearest_within(
            vec![(Uuid::new_v4(), at(12.9726, 77.5946), ts())],
            origin,
            50.0,
        );
        assert!(found.is_none());
    }

    #[test]
    fn empty_candidate_set() {
        assert!(nearest_within(Vec::new(), at(0.0, 0.0), 50.0).is_none());
    }
}
