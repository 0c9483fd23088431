use crate::connection::{ConnectorFactory, CredentialSource, RegistryConnectorFactory};
use crate::date::{Clock, SystemClock};
use crate::error::WorklogError;
use crate::repository::database_manager::{DatabaseConfig, DatabaseManager};
use crate::service::synchronization::{ExportReport, Synchronizer, ValidationOutcome};
use crate::service::worklog_service::WorkLogService;
use crate::types::{ProviderConnection, RunSummary, SynchronizationRun, UserContext, WorklogRecord};
use config::AppConfiguration;
use connectors::{IssueSuggestion, ProviderKind};
use log::debug;
use operation::{
    cancel::{self, Cancel},
    del::{self, Del},
    edit::{self, Edit},
    export::{self, Export},
    issues::{self, Issues},
    runs,
    show::{self, Show},
    sync::Sync,
    validate::{self, Validate},
};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

pub mod config;
pub mod connection;
pub mod date;
pub mod error;
pub mod operation;
pub mod parser;
pub mod repository;
pub mod service;
pub mod types;

pub struct ApplicationRuntime {
    config: AppConfiguration,
    user: UserContext,
    synchronizer: Synchronizer,
    worklog_service: WorkLogService,
}

pub enum Operation {
    Sync(Sync),
    Validate(Validate),
    Show(Show),
    Export(Export),
    Cancel(Cancel),
    Edit(Edit),
    Del(Del),
    Issues(Issues),
    Runs,
    Providers,
}

pub enum OperationResult {
    Synchronised {
        summary: RunSummary,
        unfinished: Vec<SynchronizationRun>,
    },
    Validated(ValidationOutcome, RunSummary),
    /// Aggregates map to their members, when asked for
    Summary(RunSummary, BTreeMap<i64, Vec<WorklogRecord>>),
    Exported(ExportReport),
    Cancelled(i64),
    Edited(WorklogRecord),
    Deleted(i64),
    IssueSuggestions(Vec<IssueSuggestion>),
    Runs {
        runs: Vec<SynchronizationRun>,
        days_since_last_sync: Option<i64>,
    },
    Providers {
        kinds: Vec<ProviderKind>,
        connections: Vec<ProviderConnection>,
    },
}

impl ApplicationRuntime {
    /// Creates a new instance of `ApplicationRuntime` from the configuration file
    /// and the worklog database named in it.
    ///
    /// # Errors
    ///
    /// - Returns an error if the configuration fails to load.
    /// - Returns an error if the user settings in the configuration are unusable.
    /// - Returns an error if the initialization of the local worklog storage fails.
    pub fn new() -> Result<Self, WorklogError> {
        ApplicationRuntimeBuilder::new().build()
    }

    #[must_use]
    pub fn configuration(&self) -> &AppConfiguration {
        &self.config
    }

    #[must_use]
    pub fn user(&self) -> &UserContext {
        &self.user
    }

    #[must_use]
    pub fn synchronizer(&self) -> &Synchronizer {
        &self.synchronizer
    }

    #[must_use]
    pub fn worklog_service(&self) -> &WorkLogService {
        &self.worklog_service
    }

    /// Executes the specified `Operation` and returns the result.
    ///
    /// # Errors
    ///
    /// Whatever the operation reports, see the modules of [`operation`].
    pub async fn execute(&self, operation: Operation) -> Result<OperationResult, WorklogError> {
        match operation {
            Operation::Sync(instructions) => {
                let (summary, unfinished) = operation::sync::execute(self, &instructions).await?;
                Ok(OperationResult::Synchronised {
                    summary,
                    unfinished,
                })
            }
            Operation::Validate(instructions) => {
                let (outcome, summary) = validate::execute(self, &instructions).await?;
                Ok(OperationResult::Validated(outcome, summary))
            }
            Operation::Show(instructions) => {
                let (summary, members) = show::execute(self, &instructions)?;
                Ok(OperationResult::Summary(summary, members))
            }
            Operation::Export(instructions) => {
                Ok(OperationResult::Exported(export::execute(self, &instructions).await?))
            }
            Operation::Cancel(instructions) => {
                Ok(OperationResult::Cancelled(cancel::execute(self, &instructions).await?))
            }
            Operation::Edit(instructions) => {
                Ok(OperationResult::Edited(edit::execute(self, instructions)?))
            }
            Operation::Del(instructions) => {
                let id = del::execute(self, &instructions)?;
                Ok(OperationResult::Deleted(id))
            }
            Operation::Issues(instructions) => {
                let suggestions = issues::execute(self, &instructions).await?;
                Ok(OperationResult::IssueSuggestions(suggestions))
            }
            Operation::Runs => {
                let (runs, days_since_last_sync) = runs::execute(self)?;
                Ok(OperationResult::Runs {
                    runs,
                    days_since_last_sync,
                })
            }
            Operation::Providers => Ok(OperationResult::Providers {
                kinds: ProviderKind::ALL.to_vec(),
                connections: self.config.connections(),
            }),
        }
    }
}

/// Assembles an [`ApplicationRuntime`]. Everything not supplied falls back to
/// the configuration file, the database it names, the provider registry and
/// the system clock.
#[derive(Default)]
pub struct ApplicationRuntimeBuilder {
    config: Option<AppConfiguration>,
    database_path: Option<PathBuf>,
    in_memory_db: bool,
    connector_factory: Option<Arc<dyn ConnectorFactory>>,
    clock: Option<Arc<dyn Clock>>,
}

impl ApplicationRuntimeBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_configuration(mut self, config: AppConfiguration) -> Self {
        self.config = Some(config);
        self
    }

    #[must_use]
    pub fn use_in_memory_db(mut self) -> Self {
        self.in_memory_db = true;
        self
    }

    #[must_use]
    pub fn with_database_path(mut self, path: PathBuf) -> Self {
        self.database_path = Some(path);
        self
    }

    #[must_use]
    pub fn with_connector_factory(mut self, factory: Arc<dyn ConnectorFactory>) -> Self {
        self.connector_factory = Some(factory);
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// # Errors
    /// If the configuration cannot be loaded, the user settings are unusable
    /// or the database cannot be opened
    pub fn build(self) -> Result<ApplicationRuntime, WorklogError> {
        let config = match self.config {
            Some(config) => config,
            None => config::load()?,
        };
        let user = config.user_context()?;

        let database_config = if self.in_memory_db {
            DatabaseConfig::SqliteInMemory
        } else {
            DatabaseConfig::SqliteOnDisk {
                path: self
                    .database_path
                    .unwrap_or_else(|| PathBuf::from(&config.application_data.local_worklog)),
            }
        };
        let db_manager = DatabaseManager::new(&database_config)?;
        debug!("Worklog database opened");

        let worklogs = db_manager.create_worklog_repository();
        let runs = db_manager.create_synchronization_repository();
        let users = db_manager.create_user_repository();
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let connectors = self
            .connector_factory
            .unwrap_or_else(|| Arc::new(RegistryConnectorFactory));
        let credentials: Arc<dyn CredentialSource> = Arc::new(config.clone());

        let synchronizer = Synchronizer::new(
            worklogs.clone(),
            runs.clone(),
            users.clone(),
            credentials,
            connectors,
            clock.clone(),
        );
        let worklog_service = WorkLogService::new(worklogs, runs, users, clock);

        Ok(ApplicationRuntime {
            config,
            user,
            synchronizer,
            worklog_service,
        })
    }
}
