pub mod common;
pub mod fake_connector;
pub mod fixtures;
