pub mod cli;
pub mod config;
pub mod csv_source;
pub mod db;
pub mod error;
pub mod logging;
pub mod services;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use vocab_core::{ReviewScheduler, StepScheduler, SystemClock, WordStore};

use crate::cli::{Cli, Services};
use crate::config::Config;
use crate::db::SqliteStore;
use crate::services::{ImportService, StudyService};

/// Wire the services onto one shared store and scheduler.
pub fn build_services(store: Arc<dyn WordStore>, config: &Config) -> Services {
    let scheduler: Arc<dyn ReviewScheduler> = Arc::new(StepScheduler::default());
    tracing::debug!(scheduler = scheduler.name(), "Building services");

    Services {
        import: ImportService::new(store.clone(), config.import)
            .with_scheduler(scheduler.clone()),
        study: StudyService::new(store, Arc::new(SystemClock))
            .with_scheduler(scheduler)
            .with_answer_retries(config.answer_retries),
    }
}

pub fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    logging::init_tracing(&config.log_level);

    tracing::debug!(path = %config.database_path.display(), "Opening database");
    let store = SqliteStore::open(&config.database_path).with_context(|| {
        format!("Failed to open database at {}", config.database_path.display())
    })?;

    let services = build_services(Arc::new(store), &config);
    let stdout = std::io::stdout();
    cli::execute(cli, &services, &mut stdout.lock())
}
