use std::env;
use std::time::Duration;

/// Business rules for complaint intake. Point values live in
/// [`crate::models::PointAction::points`] and are not configurable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RulesConfig {
    pub daily_report_limit: u32,
    pub duplicate_radius_meters: f64,
    pub duplicate_window_hours: u32,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            daily_report_limit: 5,
            duplicate_radius_meters: 50.0,
            duplicate_window_hours: 2,
        }
    }
}

impl RulesConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            daily_report_limit: read_positive("DAILY_REPORT_LIMIT", defaults.daily_report_limit),
            duplicate_radius_meters: read_positive(
                "DUPLICATE_RADIUS_METERS",
                defaults.duplicate_radius_meters,
            ),
            duplicate_window_hours: read_positive(
                "DUPLICATE_WINDOW_HOURS",
                defaults.duplicate_window_hours,
            ),
        }
    }

    pub fn duplicate_window(&self) -> Duration {
        Duration::from_secs(u64::from(self.duplicate_window_hours) * 3600)
    }
}

fn read_positive<T>(var_name: &str, default: T) -> T
where
    T: std::str::FromStr + PartialOrd + Default + Copy + std::fmt::Display,
{
    match env::var(var_name) {
        Ok(raw) => match parse_positive(&raw) {
            Some(value) => value,
            None => {
                tracing::warn!(
                    "Invalid {} '{}', falling back to default {}",
                    var_name,
                    raw,
                    default
                );
                default
            }
        },
        Err(_) => default,
    }
}

fn parse_positive<T>(raw: &str) -> Option<T>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    raw.trim()
        .parse::<T>()
        .ok()
        .filter(|value| *value > T::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_published_rules() {
        let cfg = RulesConfig::default();
        assert_eq!(cfg.daily_report_limit, 5);
        assert_eq!(cfg.duplicate_radius_meters, 50.0);
        assert_eq!(cfg.duplicate_window_hours, 2);
        assert_eq!(cfg.duplicate_window(), Duration::from_secs(7200));
    }

    #[test]
    fn parse_positive_rejects_zero_and_garbage() {
        assert_eq!(parse_positive::<u32>(" 7 "), Some(7));
        assert_eq!(parse_positive::<u32>("0"), None);
        assert_eq!(parse_positive::<u32>("-3"), None);
        assert_eq!(parse_positive::<f64>("abc"), None);
        assert_eq!(parse_positive::<f64>("12.5"), Some(12.5));
    }
}
