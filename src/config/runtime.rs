use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, Utc};
use std::env;
use std::time::Duration;

/// IST, the civic timezone of the default deployment.
const DEFAULT_UTC_OFFSET_MINUTES: i32 = 330;
const DEFAULT_SUBMIT_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_LEDGER_RETRY_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone, Copy)]
pub struct RuntimeConfig {
    /// Offset used to decide which calendar day a submission belongs to.
    pub civic_offset: FixedOffset,
    pub submit_timeout: Duration,
    pub ledger_retry_attempts: u32,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            civic_offset: FixedOffset::east_opt(DEFAULT_UTC_OFFSET_MINUTES * 60)
                .unwrap_or_else(|| Utc.fix()),
            submit_timeout: Duration::from_millis(DEFAULT_SUBMIT_TIMEOUT_MS),
            ledger_retry_attempts: DEFAULT_LEDGER_RETRY_ATTEMPTS,
        }
    }
}

impl RuntimeConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(raw) = env::var("CIVIC_UTC_OFFSET_MINUTES") {
            match parse_offset_minutes(&raw) {
                Some(offset) => cfg.civic_offset = offset,
                None => tracing::warn!("Invalid CIVIC_UTC_OFFSET_MINUTES '{}'", raw),
            }
        }

        if let Some(ms) = env::var("SUBMIT_TIMEOUT_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|ms| *ms > 0)
        {
            cfg.submit_timeout = Duration::from_millis(ms);
        }

        if let Some(attempts) = env::var("LEDGER_RETRY_ATTEMPTS")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            cfg.ledger_retry_attempts = attempts;
        }

        cfg
    }

    pub fn civic_date(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.civic_offset).date_naive()
    }

    pub fn civic_today(&self) -> NaiveDate {
        self.civic_date(Utc::now())
    }

    /// UTC instant (as stored, naive) at which the civic `date` begins.
    pub fn civic_day_start_utc(&self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(NaiveTime::MIN)
            - chrono::Duration::seconds(i64::from(self.civic_offset.local_minus_utc()))
    }
}

fn parse_offset_minutes(raw: &str) -> Option<FixedOffset> {
    raw.trim()
        .parse::<i32>()
        .ok()
        .and_then(|m| m.checked_mul(60))
        .and_then(FixedOffset::east_opt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn civic_day_rolls_over_at_local_midnight() {
        let cfg = RuntimeConfig::default();
        // 18:29 UTC is 23:59 IST, 18:30 UTC is 00:00 IST the next day.
        let before = Utc.with_ymd_and_hms(2026, 3, 1, 18, 29, 0).unwrap();
        let after = Utc.with_ymd_and_hms(2026, 3, 1, 18, 30, 0).unwrap();
        assert_eq!(
            cfg.civic_date(before),
            NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
        );
        assert_eq!(
            cfg.civic_date(after),
            NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
        );
    }

    #[test]
    fn utc_offset_uses_utc_date() {
        let cfg = RuntimeConfig {
            civic_offset: FixedOffset::east_opt(0).unwrap(),
            ..RuntimeConfig::default()
        };
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 23, 59, 59).unwrap();
        assert_eq!(cfg.civic_date(at), NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());
    }

    #[test]
    fn civic_day_starts_before_utc_midnight_for_ist() {
        let cfg = RuntimeConfig::default();
        let date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let expected = NaiveDate::from_ymd_opt(2026, 3, 1)
            .unwrap()
            .and_hms_opt(18, 30, 0)
            .unwrap();
        assert_eq!(cfg.civic_day_start_utc(date), expected);
    }

    #[test]
    fn offset_parsing_rejects_out_of_range_values() {
        assert_eq!(
            parse_offset_minutes(" -300 "),
            FixedOffset::west_opt(5 * 3600)
        );
        assert_eq!(parse_offset_minutes("330"), FixedOffset::east_opt(19_800));
        assert_eq!(parse_offset_minutes("1440"), None);
        assert_eq!(parse_offset_minutes("2147483647"), None);
        assert_eq!(parse_offset_minutes("-2147483648"), None);
        assert_eq!(parse_offset_minutes("ist"), None);
    }
}
