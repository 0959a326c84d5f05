use anyhow::Result;
use std::env;

/// Verification settings for tokens issued by the external identity provider.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Shared HS256 secret of the identity provider.
    pub secret: String,
    /// Expected `aud` claim; unchecked when unset.
    pub audience: Option<String>,
    pub leeway_secs: u64,
}

impl JwtConfig {
    pub fn from_env() -> Result<Self> {
        let secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable must be set"))?;

        if secret.len() < 32 {
            return Err(anyhow::anyhow!(
                "JWT_SECRET must be at least 32 characters"
            ));
        }

        let audience = env::var("JWT_AUDIENCE")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let leeway_secs = env::var("JWT_LEEWAY_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);

        Ok(Self {
            secret,
            audience,
            leeway_secs,
        })
    }
}
