use chrono::{DateTime, Utc};

use crate::error::WorklogError;

/// Per user bookkeeping. The user settings themselves live in the configuration.
pub trait UserRepository: Send + Sync {
    /// # Errors
    /// Database failures
    fn last_sync(&self, user_id: i64) -> Result<Option<DateTime<Utc>>, WorklogError>;

    /// # Errors
    /// Database failures
    fn set_last_sync(&self, user_id: i64, at: DateTime<Utc>) -> Result<(), WorklogError>;
}
