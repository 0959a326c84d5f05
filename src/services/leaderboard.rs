use crate::{error::AppResult, services::cache::CacheService};
use chrono::NaiveDateTime;
use sea_orm::{DatabaseConnection, FromQueryResult, Statement};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

const LEADERBOARD_CACHE_KEY: &str = "leaderboard:top";
/// Bumped on every change to standings; cached boards are keyed by it.
const LEADERBOARD_GENERATION_KEY: &str = "leaderboard:generation";
const CACHE_TTL_LEADERBOARD: u64 = 60;
/// Depth of the cached standings; requests are served by slicing it.
pub const MAX_LEADERBOARD_SIZE: u64 = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LeaderboardEntry {
    pub rank: u64,
    pub user_id: Uuid,
    pub display_name: String,
    pub points: i64,
    pub total_reports: i64,
    pub first_report_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct UserRank {
    pub user_id: Uuid,
    pub rank: u64,
    pub points: i64,
}

#[derive(Debug, FromQueryResult)]
struct StandingRow {
    user_id: Uuid,
    display_name: String,
    points: i64,
    total_reports: i64,
    first_report_at: Option<NaiveDateTime>,
}

#[derive(Debug, FromQueryResult)]
struct RankRow {
    points: i64,
    rank: i64,
}

/// Competition ranking over rows already sorted by points descending:
/// equal points share a rank, and the next distinct score skips ahead.
fn assign_ranks(rows: Vec<StandingRow>) -> Vec<LeaderboardEntry> {
    let mut entries = Vec::with_capacity(rows.len());
    let mut rank = 0u64;
    let mut previous: Option<i64> = None;
    for (position, row) in rows.into_iter().enumerate() {
        if previous != Some(row.points) {
            rank = position as u64 + 1;
            previous = Some(row.points);
        }
        entries.push(LeaderboardEntry {
            rank,
            user_id: row.user_id,
            display_name: row.display_name,
            points: row.points,
            total_reports: row.total_reports,
            first_report_at: row.first_report_at,
        });
    }
    entries
}

fn board_key(generation: u64) -> String {
    format!("{}:{}", LEADERBOARD_CACHE_KEY, generation)
}

/// Retires every cached board. A read that raced the change can only write
/// under the old generation, which no later read consults.
pub async fn invalidate_standings(cache: &CacheService) {
    cache.incr(LEADERBOARD_GENERATION_KEY).await;
}

/// Read-only ranked views over the points ledger.
pub struct LeaderboardService {
    db: DatabaseConnection,
    cache: Option<CacheService>,
}

impl LeaderboardService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db, cache: None }
    }

    pub fn with_cache(mut self, cache: Option<CacheService>) -> Self {
        self.cache = cache;
        self
    }

    /// Users with ledger activity ordered by points, then earliest qualifying
    /// report, then user id.
    pub async fn top_n(&self, n: u64) -> AppResult<Vec<LeaderboardEntry>> {
        self.standings(0, n).await
    }

    /// A window of the standings starting at `offset`. Windows past the cached
    /// depth are empty.
    pub async fn standings(&self, offset: u64, limit: u64) -> AppResult<Vec<LeaderboardEntry>> {
        let limit = limit.clamp(1, MAX_LEADERBOARD_SIZE) as usize;
        let offset = offset.min(MAX_LEADERBOARD_SIZE) as usize;

        let cache_key = match &self.cache {
            Some(cache) => {
                let generation = cache
                    .get::<u64>(LEADERBOARD_GENERATION_KEY)
                    .await
                    .unwrap_or(0);
                let key = board_key(generation);
                if let Some(cached) = cache.get::<Vec<LeaderboardEntry>>(&key).await {
                    return Ok(cached.into_iter().skip(offset).take(limit).collect());
                }
                Some(key)
            }
            None => None,
        };

        // Only credited reports count; rejection or a false_report penalty withdraws one.
        let rows = StandingRow::find_by_statement(Statement::from_sql_and_values(
            sea_orm::DatabaseBackend::Postgres,
            "WITH standings AS (
                 SELECT user_id,
                        SUM(delta)::BIGINT AS points,
                        MIN(created_at) FILTER (WHERE action = 'valid_report') AS first_report_at
                 FROM points_ledger
                 GROUP BY user_id
             )
             SELECT s.user_id,
                    p.display_name,
                    s.points,
                    s.first_report_at,
                    (SELECT COUNT(*)
                     FROM points_ledger v
                     JOIN complaints c ON c.id = v.complaint_id
                     WHERE v.user_id = s.user_id
                       AND v.action = 'valid_report'
                       AND c.status <> 'rejected'
                       AND NOT EXISTS (
                           SELECT 1 FROM points_ledger f
                           WHERE f.complaint_id = v.complaint_id
                             AND f.user_id = v.user_id
                             AND f.action = 'false_report'
                       ))::BIGINT AS total_reports
             FROM standings s
             JOIN profiles p ON p.id = s.user_id
             ORDER BY s.points DESC, s.first_report_at ASC NULLS LAST, s.user_id ASC
             LIMIT $1",
            vec![(MAX_LEADERBOARD_SIZE as i64).into()],
        ))
        .all(&self.db)
        .await?;

        let standings = assign_ranks(rows);

        if let (Some(cache), Some(key)) = (&self.cache, cache_key) {
            cache.set(&key, &standings, CACHE_TTL_LEADERBOARD).await;
        }

        Ok(standings.into_iter().skip(offset).take(limit).collect())
    }

    /// `None` when the user has never earned or lost a point.
    pub async fn rank_of(&self, user_id: Uuid) -> AppResult<Option<UserRank>> {
        let row = RankRow::find_by_statement(Statement::from_sql_and_values(
            sea_orm::DatabaseBackend::Postgres,
            "WITH totals AS (
                 SELECT user_id, SUM(delta)::BIGINT AS points
                 FROM points_ledger
                 GROUP BY user_id
             )
             SELECT t.points,
                    (1 + (SELECT COUNT(*) FROM totals o WHERE o.points > t.points))::BIGINT AS rank
             FROM totals t
             WHERE t.user_id = $1",
            vec![user_id.into()],
        ))
        .one(&self.db)
        .await?;

        Ok(row.map(|r| UserRank {
            user_id,
            rank: r.rank.max(1) as u64,
            points: r.points,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(points: i64) -> StandingRow {
        StandingRow {
            user_id: Uuid::new_v4(),
            display_name: "Citizen".to_string(),
            points,
            total_reports: 1,
            first_report_at: None,
        }
    }

    fn ranks(points: &[i64]) -> Vec<u64> {
        assign_ranks(points.iter().copied().map(row).collect())
            .into_iter()
            .map(|e| e.rank)
            .collect()
    }

    #[test]
    fn distinct_scores_rank_sequentially() {
        assert_eq!(ranks(&[50, 40, 10]), vec![1, 2, 3]);
    }

    #[test]
    fn ties_share_rank_and_skip_ahead() {
        assert_eq!(ranks(&[30, 30, 20, 10, 10, 10, -20]), vec![1, 1, 3, 4, 4, 4, 7]);
    }

    #[test]
    fn empty_board() {
        assert!(ranks(&[]).is_empty());
    }

    #[test]
    fn order_is_preserved() {
        let rows = vec![row(20), row(20), row(5)];
        let ids: Vec<Uuid> = rows.iter().map(|r| r.user_id).collect();
        let entries = assign_ranks(rows);
        assert_eq!(
            entries.iter().map(|e| e.user_id).collect::<Vec<_>>(),
            ids
        );
    }

    #[test]
    fn each_generation_has_its_own_board() {
        assert_eq!(board_key(0), "leaderboard:top:0");
        assert_ne!(board_key(7), board_key(8));
    }
}
