use chrono::{DateTime, Utc};
use utility::id::{HasId, Id};

use crate::user::User;

/// A bearer token handed out to a user. Tokens are issued elsewhere, this
/// service only resolves them.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub user_id: Id<User>,
    pub token: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}

impl HasId for Session {
    type IdType = i32;
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    #[test]
    fn sessions_without_expiry_never_expire() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let session = Session {
            user_id: Id::new(1),
            token: "abc".to_owned(),
            created_at: now,
            expires_at: None,
        };
        assert!(!session.is_expired(now + Duration::days(10_000)));

        let expiring = Session {
            expires_at: Some(now + Duration::hours(1)),
            ..session
        };
        assert!(!expiring.is_expired(now));
        assert!(expiring.is_expired(now + Duration::hours(1)));
    }
}
