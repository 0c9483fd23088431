//! The lifecycle of a synchronization run.
//!
//! A run is created active, has its worklogs imported from the source and
//! checked against the target, and ends up either completed by a successful
//! export or cancelled. Failing imports and validations discard the run, a
//! failing export leaves it active so it can be retried.
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{Duration, NaiveDateTime, Offset};
use connectors::{
    Connector, ConnectorRegistry, ExportOutcome, ExportWorklog, IssueSuggestion,
};
use log::{debug, error, info, warn};
use tokio::sync::OwnedMutexGuard;

use crate::connection::{ConnectorFactory, CredentialSource};
use crate::date::{self, Clock};
use crate::error::WorklogError;
use crate::repository::synchronization_repository::SynchronizationRepository;
use crate::repository::user_repository::UserRepository;
use crate::repository::worklog_repository::WorklogRepository;
use crate::service::ingest::WorklogIngestionEngine;
use crate::types::{
    NewSynchronization, ProviderConnection, RunSummary, SynchronizationRun, UserContext,
};

/// Serialises the phases of one run. Entries nobody holds or waits for are
/// dropped on the next acquire.
#[derive(Default)]
pub struct RunLocks {
    locks: Mutex<HashMap<i64, Arc<tokio::sync::Mutex<()>>>>,
}

impl RunLocks {
    /// # Errors
    /// `LockPoisoned` if the lock table is unusable
    pub async fn acquire(&self, run_id: i64) -> Result<OwnedMutexGuard<()>, WorklogError> {
        let lock = {
            let mut locks = self.locks.lock().map_err(|_| WorklogError::LockPoisoned)?;
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(run_id).or_default().clone()
        };
        Ok(lock.lock_owned().await)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ValidationOutcome {
    pub confirmed: usize,
    pub rejected: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExportReport {
    pub exported: usize,
    pub rejected: usize,
}

pub struct Synchronizer {
    worklogs: Arc<dyn WorklogRepository>,
    runs: Arc<dyn SynchronizationRepository>,
    users: Arc<dyn UserRepository>,
    credentials: Arc<dyn CredentialSource>,
    connectors: Arc<dyn ConnectorFactory>,
    clock: Arc<dyn Clock>,
    ingestion: WorklogIngestionEngine,
    locks: RunLocks,
}

impl Synchronizer {
    pub fn new(
        worklogs: Arc<dyn WorklogRepository>,
        runs: Arc<dyn SynchronizationRepository>,
        users: Arc<dyn UserRepository>,
        credentials: Arc<dyn CredentialSource>,
        connectors: Arc<dyn ConnectorFactory>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            ingestion: WorklogIngestionEngine::new(worklogs.clone(), clock.clone()),
            worklogs,
            runs,
            users,
            credentials,
            connectors,
            clock,
            locks: RunLocks::default(),
        }
    }

    /// Stores a new active run between two of the user's connections
    ///
    /// # Errors
    /// `InvalidSelection` if source or target is missing or both are the same,
    /// `NotFound` for unknown connections
    pub fn create(
        &self,
        user: &UserContext,
        source_id: Option<i64>,
        target_id: Option<i64>,
        date_started_from: NaiveDateTime,
    ) -> Result<SynchronizationRun, WorklogError> {
        let (Some(source_id), Some(target_id)) = (source_id, target_id) else {
            return Err(WorklogError::InvalidSelection(
                "both a source and a target must be selected".to_string(),
            ));
        };
        if source_id == target_id {
            return Err(WorklogError::InvalidSelection(
                "source and target must be different connections".to_string(),
            ));
        }
        self.connection(user, source_id)?;
        self.connection(user, target_id)?;

        let run = self.runs.create(&NewSynchronization {
            user_id: user.id,
            source_id,
            target_id,
            date_started_from,
            date_created: self.clock.now(),
        })?;
        info!(
            "Created synchronization {} from connection {source_id} to {target_id}",
            run.id
        );
        Ok(run)
    }

    /// Imports the source's entries since the start of the run and stores them
    ///
    /// # Returns
    /// The number of worklogs written
    ///
    /// # Errors
    /// `InactiveRun` for runs no longer active. Any other failure discards the run.
    pub async fn import_phase(&self, user: &UserContext, run_id: i64) -> Result<usize, WorklogError> {
        let _guard = self.locks.acquire(run_id).await?;
        let run = self.active_run(user, run_id)?;

        match self.import(user, &run).await {
            Ok(written) => Ok(written),
            Err(err) => {
                self.discard(&run, &err);
                Err(err)
            }
        }
    }

    async fn import(&self, user: &UserContext, run: &SynchronizationRun) -> Result<usize, WorklogError> {
        let source = self.connection(user, run.source_id)?;
        let target = self.connection(user, run.target_id)?;
        let connector = self.connectors.create(&source)?;

        let start = date::localize(run.date_started_from, user.timezone)?;
        let end = self.clock.now() + Duration::days(1);
        let end = end.with_timezone(&end.offset().fix());

        let entries = connector.import_worklogs(start, end).await?;
        info!(
            "Imported {} entries from {} for synchronization {}",
            entries.len(),
            source.provider,
            run.id
        );
        self.ingestion
            .ingest(user, run.id, entries, &provider_name(&target))
    }

    /// Checks the issue reference of every exportable worklog against the target
    ///
    /// # Errors
    /// `InactiveRun` for runs no longer active. Any other failure discards the run.
    pub async fn validate_phase(
        &self,
        user: &UserContext,
        run_id: i64,
    ) -> Result<ValidationOutcome, WorklogError> {
        let _guard = self.locks.acquire(run_id).await?;
        let run = self.active_run(user, run_id)?;

        match self.validate(user, &run).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                self.discard(&run, &err);
                Err(err)
            }
        }
    }

    async fn validate(
        &self,
        user: &UserContext,
        run: &SynchronizationRun,
    ) -> Result<ValidationOutcome, WorklogError> {
        let target = self.connection(user, run.target_id)?;
        let connector = self.connectors.create(&target)?;

        let mut outcomes = Vec::new();
        let mut result = ValidationOutcome::default();
        for worklog in self.worklogs.find_top_level_valid_for_run(run.id)? {
            let confirmed = match worklog.issue_id.as_deref() {
                Some(issue_id) => connector.validate_issue(issue_id).await?,
                None => false,
            };
            if confirmed {
                result.confirmed += 1;
            } else {
                warn!(
                    "Worklog {} refers to {:?}, which {} does not know",
                    worklog.id, worklog.issue_id, target.name
                );
                result.rejected += 1;
            }
            outcomes.push((worklog.id, confirmed));
        }
        self.worklogs.apply_validation(&outcomes)?;
        Ok(result)
    }

    /// Creates a run, imports and validates in one go
    ///
    /// # Errors
    /// See [`Self::create`], [`Self::import_phase`] and [`Self::validate_phase`]
    pub async fn start(
        &self,
        user: &UserContext,
        source_id: Option<i64>,
        target_id: Option<i64>,
        date_started_from: NaiveDateTime,
    ) -> Result<RunSummary, WorklogError> {
        let run = self.create(user, source_id, target_id, date_started_from)?;
        self.import_phase(user, run.id).await?;
        self.validate_phase(user, run.id).await?;
        self.summary(user, run.id)
    }

    /// Sends the valid top level worklogs to the target and completes the run.
    ///
    /// Worklogs the target rejects for pointing at unknown issues are marked
    /// invalid. If the target fails part way, the worklogs it never received
    /// are removed and the run stays active.
    ///
    /// # Errors
    /// `InactiveRun` if the run is completed or cancelled, `ExportFailure` if
    /// the target failed part way
    pub async fn export_phase(&self, user: &UserContext, run_id: i64) -> Result<ExportReport, WorklogError> {
        let _guard = self.locks.acquire(run_id).await?;
        let run = self.active_run(user, run_id)?;

        let target = self.connection(user, run.target_id)?;
        let connector: Arc<dyn Connector> = self.connectors.create(&target)?;

        let selected = self.worklogs.find_top_level_valid_for_run(run.id)?;
        let batch: Vec<ExportWorklog> = selected
            .iter()
            .map(|w| ExportWorklog {
                issue_id: w.issue_id.clone().unwrap_or_default(),
                date_started: w.date_started,
                duration: w.duration,
                comment: w.comment.clone(),
            })
            .collect();
        debug!("Exporting {} worklog(s) to {}", batch.len(), target.name);

        let outcome = connector.export_worklogs(&batch).await?;

        let rejected: Vec<i64> = outcome
            .rejected()
            .iter()
            .filter_map(|&i| selected.get(i).map(|w| w.id))
            .collect();
        if !rejected.is_empty() {
            warn!("{} rejected {} worklog(s) of synchronization {}", target.name, rejected.len(), run.id);
            self.worklogs.mark_invalid(&rejected)?;
        }

        match outcome {
            ExportOutcome::Completed { .. } => {
                self.users.set_last_sync(user.id, self.clock.now())?;
                if !self.runs.mark_completed(run.id)? {
                    return Err(WorklogError::InactiveRun(run.id));
                }
                info!("Synchronization {} completed", run.id);
                Ok(ExportReport {
                    exported: selected.len() - rejected.len(),
                    rejected: rejected.len(),
                })
            }
            ExportOutcome::PartialFailure { index, reason, .. } => {
                let unsent: Vec<i64> = selected.iter().skip(index).map(|w| w.id).collect();
                warn!(
                    "Export of synchronization {} stopped at #{index}, discarding {} unsent worklog(s): {reason}",
                    run.id,
                    unsent.len()
                );
                self.worklogs.delete_many(&unsent)?;
                Err(WorklogError::ExportFailure { index, reason })
            }
        }
    }

    /// Drops the worklogs of a run and flags it cancelled. The run itself is kept.
    ///
    /// # Errors
    /// `AlreadyCompleted` for completed runs, which are left untouched
    pub async fn cancel(&self, user: &UserContext, run_id: i64) -> Result<(), WorklogError> {
        let _guard = self.locks.acquire(run_id).await?;
        let run = self.run(user, run_id)?;
        if run.is_completed {
            return Err(WorklogError::AlreadyCompleted(run.id));
        }
        if run.is_cancelled {
            return Ok(());
        }

        match self.runs.cancel(run.id)? {
            Some(deleted) => {
                info!("Synchronization {} cancelled, {deleted} worklog(s) removed", run.id);
            }
            // Lost a race against another process
            None => {
                if self.run(user, run_id)?.is_completed {
                    return Err(WorklogError::AlreadyCompleted(run.id));
                }
            }
        }
        Ok(())
    }

    /// Issue suggestions from the target. Offers the term itself as a last resort.
    ///
    /// # Errors
    /// If the run or its target cannot be found
    pub async fn search_issues(
        &self,
        user: &UserContext,
        run_id: i64,
        term: &str,
    ) -> Result<Vec<IssueSuggestion>, WorklogError> {
        let term = term.trim();
        if term.is_empty() {
            return Ok(Vec::new());
        }
        let run = self.run(user, run_id)?;
        let target = self.connection(user, run.target_id)?;
        let connector = self.connectors.create(&target)?;

        let suggestions = match connector.search_issues(term).await {
            Ok(found) => found,
            Err(err) => {
                warn!("Issue search in {} failed: {err}", target.name);
                Vec::new()
            }
        };
        if suggestions.is_empty() {
            return Ok(vec![IssueSuggestion {
                id: term.to_string(),
                label: format!("Use \"{term}\" as issue ID"),
            }]);
        }
        Ok(suggestions)
    }

    /// # Errors
    /// `NotFound` if the user has no such run
    pub fn summary(&self, user: &UserContext, run_id: i64) -> Result<RunSummary, WorklogError> {
        let run = self.run(user, run_id)?;
        let worklogs = self.worklogs.find_top_level_for_run(run.id)?;
        Ok(RunSummary::new(run, worklogs))
    }

    /// The user's runs, most recent first
    ///
    /// # Errors
    /// Storage failures
    pub fn runs(&self, user: &UserContext) -> Result<Vec<SynchronizationRun>, WorklogError> {
        self.runs.find_for_user(user.id)
    }

    /// # Errors
    /// Storage failures
    pub fn unfinished_runs(&self, user: &UserContext) -> Result<Vec<SynchronizationRun>, WorklogError> {
        Ok(self
            .runs(user)?
            .into_iter()
            .filter(SynchronizationRun::is_active)
            .collect())
    }

    fn run(&self, user: &UserContext, run_id: i64) -> Result<SynchronizationRun, WorklogError> {
        self.runs
            .find_by_id(run_id)?
            .filter(|run| run.user_id == user.id)
            .ok_or_else(|| WorklogError::NotFound(format!("synchronization {run_id}")))
    }

    fn active_run(&self, user: &UserContext, run_id: i64) -> Result<SynchronizationRun, WorklogError> {
        let run = self.run(user, run_id)?;
        if !run.is_active() {
            return Err(WorklogError::InactiveRun(run.id));
        }
        Ok(run)
    }

    fn connection(&self, user: &UserContext, id: i64) -> Result<ProviderConnection, WorklogError> {
        let connection = self.credentials.connection(id)?;
        if connection.user_id != user.id {
            return Err(WorklogError::NotFound(format!("connection {id}")));
        }
        Ok(connection)
    }

    fn discard(&self, run: &SynchronizationRun, cause: &WorklogError) {
        warn!("Discarding synchronization {}: {cause}", run.id);
        if let Err(err) = self.runs.delete(run.id) {
            error!("Unable to discard synchronization {}: {err}", run.id);
        }
    }
}

/// The registry's spelling of the connection's provider
fn provider_name(connection: &ProviderConnection) -> String {
    ConnectorRegistry::kind(&connection.provider)
        .map_or_else(|| connection.provider.clone(), |kind| kind.name().to_string())
}
