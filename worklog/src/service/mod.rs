pub mod ingest;
pub mod synchronization;
pub mod worklog_service;
