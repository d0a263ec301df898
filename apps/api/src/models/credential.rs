use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Tokens refreshed this close to expiry are treated as already expired.
const EXPIRY_LEEWAY_SECS: i64 = 60;

/// Google OAuth tokens for one user. At most one row per user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct GoogleAuthCredential {
    pub user_id: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub access_token_expires: DateTime<Utc>,
}

impl GoogleAuthCredential {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.access_token_expires <= now + Duration::seconds(EXPIRY_LEEWAY_SECS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_includes_leeway() {
        let now = Utc::now();
        let mut credential = GoogleAuthCredential {
            user_id: "u1".into(),
            access_token: "at".into(),
            refresh_token: None,
            access_token_expires: now + Duration::seconds(30),
        };
        assert!(credential.is_expired(now));
        credential.access_token_expires = now + Duration::minutes(10);
        assert!(!credential.is_expired(now));
    }
}
