use crate::{
    error::{AppError, AppResult},
    models::{profile, Profile, ProfileModel, ProfileRole},
};
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, DatabaseConnection, EntityTrait, Set, Statement,
};
use uuid::Uuid;

const DEFAULT_DISPLAY_NAME: &str = "Citizen";
const MAX_DISPLAY_NAME_CHARS: usize = 100;

pub struct ProfileService {
    db: DatabaseConnection,
}

impl ProfileService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Returns the profile for a verified identity, creating it on first sight.
    pub async fn ensure(&self, id: Uuid, display_name: Option<&str>) -> AppResult<ProfileModel> {
        if let Some(existing) = Profile::find_by_id(id).one(&self.db).await? {
            return Ok(existing);
        }

        let now = chrono::Utc::now().naive_utc();
        self.db
            .execute(Statement::from_sql_and_values(
                sea_orm::DatabaseBackend::Postgres,
                "INSERT INTO profiles (id, display_name, role, points, created_at, updated_at)
                 VALUES ($1, $2, 'citizen', 0, $3, $3)
                 ON CONFLICT (id) DO NOTHING",
                vec![
                    id.into(),
                    normalize_display_name(display_name).into(),
                    now.into(),
                ],
            ))
            .await?;

        tracing::info!(user_id = %id, "Provisioned profile");
        self.get(id).await
    }

    pub async fn get(&self, id: Uuid) -> AppResult<ProfileModel> {
        Profile::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)
    }

    pub async fn set_role(&self, id: Uuid, role: ProfileRole) -> AppResult<ProfileModel> {
        let existing = self.get(id).await?;
        let mut active: profile::ActiveModel = existing.into();
        active.role = Set(role);
        active.updated_at = Set(chrono::Utc::now().naive_utc());
        Ok(active.update(&self.db).await?)
    }
}

fn normalize_display_name(raw: Option<&str>) -> String {
    let trimmed = raw.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        return DEFAULT_DISPLAY_NAME.to_string();
    }
    trimmed.chars().take(MAX_DISPLAY_NAME_CHARS).collect()
}
