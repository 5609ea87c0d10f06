//! # Reconciliation System Bootstrap
//!
//! Wires every collaborator of the reconciliation engine from a validated
//! [`PagientConfig`] and exposes start/stop/status control over the poller.

use std::sync::Arc;

use sqlx::PgPool;
use tokio::sync::broadcast;
use tracing::{info, warn};

use super::pipeline::ReconciliationPipeline;
use super::poller::{PollerHandle, ReconciliationPoller};
use crate::bridge::{build_queue_source, ExternalQueueSource};
use crate::config::PagientConfig;
use crate::database::{DatabaseConnection, PatientStore, PgPatientStore, StoreError};
use crate::dispatch::{CallDispatcher, EasyCallDispatcher};
use crate::error::{PagientError, Result};
use crate::events::{PatientEventPublisher, PublishedPatientEvent};
use crate::state_machine::PatientStateMachine;

/// Running reconciliation engine and the handles around it
#[derive(Debug)]
pub struct ReconciliationSystem {
    config: PagientConfig,
    database: Option<DatabaseConnection>,
    publisher: PatientEventPublisher,
    state_machine: PatientStateMachine,
    poller: PollerHandle,
}

/// System status information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemStatus {
    pub running: bool,
    pub room_label: String,
    pub ticks: u64,
    pub failed_ticks: u64,
    pub subscribers: usize,
}

impl ReconciliationSystem {
    /// Connect to PostgreSQL and build the configured queue source and dispatcher
    pub async fn bootstrap(config: PagientConfig) -> Result<Self> {
        config.validate()?;

        let database = DatabaseConnection::new(&config.database)
            .await
            .map_err(|e| PagientError::from(StoreError::Database(e)))?;
        if !database
            .health_check()
            .await
            .map_err(|e| PagientError::from(StoreError::Database(e)))?
        {
            warn!("Patient database health check returned an unexpected result");
        }
        let store: Arc<dyn PatientStore> = Arc::new(PgPatientStore::new(database.pool().clone()));
        let source = build_queue_source(&config.bridge.source)?;
        let dispatcher: Arc<dyn CallDispatcher> = Arc::new(EasyCallDispatcher::new(&config.easy_call)?);

        let mut system = Self::from_parts(config, store, source, dispatcher);
        system.database = Some(database);

        info!(
            room = %system.config.bridge.room_label,
            queue_limit = ?system.config.bridge.queue_limit(),
            "Reconciliation system bootstrapped"
        );
        Ok(system)
    }

    /// Assemble the system around already built collaborators
    pub fn from_parts(
        config: PagientConfig,
        store: Arc<dyn PatientStore>,
        source: Arc<dyn ExternalQueueSource>,
        dispatcher: Arc<dyn CallDispatcher>,
    ) -> Self {
        let publisher = PatientEventPublisher::new(config.events.channel_capacity);
        let state_machine = PatientStateMachine::new(
            store.clone(),
            dispatcher,
            Arc::new(publisher.clone()),
            config.easy_call.timeout(),
        );
        let pipeline = ReconciliationPipeline::new(
            store,
            source,
            state_machine.clone(),
            config.bridge.room_label.clone(),
            config.bridge.queue_limit(),
        );
        let poller = PollerHandle::new(ReconciliationPoller::new(pipeline));

        Self {
            config,
            database: None,
            publisher,
            state_machine,
            poller,
        }
    }

    /// Start polling, unless disabled by configuration
    pub fn start(&self) -> Result<()> {
        if !self.config.poller.enabled {
            info!("Reconciliation poller disabled by configuration");
            return Ok(());
        }
        self.poller.start(self.config.poller.polling_interval())
    }

    /// Signal the poller without waiting for it
    pub fn cancel(&self) {
        self.poller.cancel();
    }

    /// Stop polling, wait for the in-flight tick and close the pool
    pub async fn shutdown(self) -> Result<()> {
        self.poller.stop().await?;
        if let Some(database) = self.database {
            database.close().await;
        }
        info!("Reconciliation system shut down");
        Ok(())
    }

    pub fn status(&self) -> SystemStatus {
        let stats = self.poller.stats();
        SystemStatus {
            running: self.poller.is_running(),
            room_label: self.config.bridge.room_label.clone(),
            ticks: stats.ticks(),
            failed_ticks: stats.failed_ticks(),
            subscribers: self.publisher.subscriber_count(),
        }
    }

    pub fn config(&self) -> &PagientConfig {
        &self.config
    }

    /// Pool of the patient database, when bootstrapped against PostgreSQL
    pub fn pool(&self) -> Option<&PgPool> {
        self.database.as_ref().map(DatabaseConnection::pool)
    }

    /// State machine for administrative status edits
    pub fn state_machine(&self) -> &PatientStateMachine {
        &self.state_machine
    }

    pub fn publisher(&self) -> &PatientEventPublisher {
        &self.publisher
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PublishedPatientEvent> {
        self.publisher.subscribe()
    }

    pub fn poller(&self) -> &PollerHandle {
        &self.poller
    }
}
