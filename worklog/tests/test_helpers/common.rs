use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use worklog::date::Clock;
use worklog::{error::WorklogError, ApplicationRuntime, ApplicationRuntimeBuilder};

use crate::test_helpers::fake_connector::FakeConnectorFactory;
use crate::test_helpers::fixtures::test_configuration;

/// Connection ids of [`test_configuration`]
pub const TOGGL: i64 = 1;
pub const JIRA: i64 = 2;
pub const GITLAB: i64 = 3;

pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Monday morning in the week the fixtures are recorded
pub fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 11, 8, 0, 0).unwrap()
}

/// Creates a test runtime with an in-memory database and fake providers
pub fn create_test_runtime(
    connectors: Arc<FakeConnectorFactory>,
) -> Result<Arc<ApplicationRuntime>, WorklogError> {
    // Initialize logger only once
    let _ = env_logger::builder().is_test(true).try_init();

    let runtime = ApplicationRuntimeBuilder::new()
        .with_configuration(test_configuration())
        .use_in_memory_db()
        .with_connector_factory(connectors)
        .with_clock(Arc::new(FixedClock(test_now())))
        .build()?;

    Ok(Arc::new(runtime))
}
