use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRule {
    pub per_second: u64,
    pub burst_size: u32,
}

impl RateLimitRule {
    const fn new(per_second: u64, burst_size: u32) -> Self {
        Self {
            per_second,
            burst_size,
        }
    }
}

/// Token-bucket settings per route group.
///
/// `submit` guards complaint intake and the duplicate pre-check, `public_read`
/// the anonymous reads (complaints, leaderboard, categories), `staff` the
/// authenticated dashboard and profile routes.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub submit: RateLimitRule,
    pub public_read: RateLimitRule,
    pub staff: RateLimitRule,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            submit: RateLimitRule::new(2, 5),
            public_read: RateLimitRule::new(30, 60),
            staff: RateLimitRule::new(10, 20),
        }
    }
}

impl RateLimitConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.enabled = parse_bool_env("RATE_LIMIT_ENABLED", cfg.enabled);

        if let Ok(raw) = env::var("RATE_LIMIT_CONFIG") {
            match parse_overrides(&raw) {
                Ok(overrides) => {
                    for (group, rule) in overrides {
                        cfg.apply(group, rule);
                    }
                }
                Err(err) => {
                    tracing::warn!("Invalid RATE_LIMIT_CONFIG '{}': {}", raw, err);
                }
            }
        }

        cfg
    }

    /// A group of `None` applies the rule to every route group.
    fn apply(&mut self, group: Option<RouteGroup>, rule: RateLimitRule) {
        match group {
            None => {
                self.submit = rule;
                self.public_read = rule;
                self.staff = rule;
            }
            Some(RouteGroup::Submit) => self.submit = rule,
            Some(RouteGroup::PublicRead) => self.public_read = rule,
            Some(RouteGroup::Staff) => self.staff = rule,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RouteGroup {
    Submit,
    PublicRead,
    Staff,
}

impl RouteGroup {
    fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "submit" | "intake" => Some(RouteGroup::Submit),
            "public" | "public_read" | "public-read" => Some(RouteGroup::PublicRead),
            "staff" | "protected" => Some(RouteGroup::Staff),
            _ => None,
        }
    }
}

pub(crate) fn parse_bool_env(var_name: &str, default: bool) -> bool {
    env::var(var_name)
        .ok()
        .and_then(|value| match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}

/// Parses `"10:20"` (every group) or `"submit=2:5,public=30:60,staff=10:20"`.
/// Later entries win, so a bare rule followed by named ones works as a base.
fn parse_overrides(raw: &str) -> Result<Vec<(Option<RouteGroup>, RateLimitRule)>, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("empty value".to_string());
    }

    trimmed
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| -> Result<_, String> {
            match item.split_once('=') {
                None => Ok((None, parse_rule(item)?)),
                Some((name, rule)) => {
                    let group = RouteGroup::parse(name).ok_or_else(|| {
                        format!(
                            "unknown group '{}', expected submit/public/staff",
                            name.trim()
                        )
                    })?;
                    Ok((Some(group), parse_rule(rule.trim())?))
                }
            }
        })
        .collect()
}

fn parse_rule(raw: &str) -> Result<RateLimitRule, String> {
    let (per_second, burst_size) = raw
        .split_once(':')
        .ok_or_else(|| format!("invalid rule '{}', expected per:burst", raw))?;

    let per_second: u64 = per_second
        .trim()
        .parse()
        .map_err(|_| format!("invalid per_second '{}'", per_second.trim()))?;
    let burst_size: u32 = burst_size
        .trim()
        .parse()
        .map_err(|_| format!("invalid burst_size '{}'", burst_size.trim()))?;

    if per_second == 0 || burst_size == 0 {
        return Err(format!("rule '{}' must be positive on both sides", raw));
    }
    Ok(RateLimitRule::new(per_second, burst_size))
}
