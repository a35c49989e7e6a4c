//! Worker lifecycle: install, wait, activate, run.
//!
//! ```text
//! Installing --(manifest cached)--> Waiting --(FORCE_ACTIVATE)--> Activating --> Active
//!      \------------(FORCE_ACTIVATE received during install)-----/
//! ```
//!
//! Install pre-populates the static partition from the shell manifest.
//! Activation deletes every partition outside the current version set and
//! then claims all open client sessions. Both run alongside live strategy
//! executions; a read that races a deletion is just a miss.

pub mod control;
pub mod sessions;

pub use control::ControlCommand;
pub use sessions::ClientSessions;

use crate::fetch::resolve_manifest_path;
use crate::request::Request;
use crate::strategy::StrategyContext;
use fallow_core::{AppConfig, Error, EvictionReport, PartitionKind};
use futures_util::future::join_all;
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{mpsc, watch};
use url::Url;

/// Lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Installing,
    Waiting,
    Activating,
    Active,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Installing => "installing",
            Phase::Waiting => "waiting",
            Phase::Activating => "activating",
            Phase::Active => "active",
        })
    }
}

/// What the pre-cache pass managed to store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    pub cached: Vec<String>,
    pub failed: Vec<String>,
}

/// Result of an activation sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActivationReport {
    /// Stale partitions deleted.
    pub deleted: Vec<String>,
    /// Client sessions newly claimed.
    pub claimed: usize,
}

/// Result of handling one control command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlOutcome {
    Activated(ActivationReport),
    /// Received during install; activation follows install directly.
    ActivationQueued,
    /// Already activating or active.
    AlreadyActive,
    Evicted(EvictionReport),
    EvictionFailed(String),
}

/// Drives install and activation and serves the control channel.
pub struct LifecycleController {
    ctx: StrategyContext,
    manifest: Vec<Url>,
    eviction_max_age: chrono::Duration,
    phase: watch::Sender<Phase>,
    install_started: AtomicBool,
    skip_waiting: AtomicBool,
    sessions: ClientSessions,
    last_activation: Mutex<Option<ActivationReport>>,
}

impl LifecycleController {
    pub fn new(ctx: StrategyContext, manifest: Vec<Url>, eviction_max_age: chrono::Duration) -> Self {
        let (phase, _) = watch::channel(Phase::Installing);
        Self {
            ctx,
            manifest,
            eviction_max_age,
            phase,
            install_started: AtomicBool::new(false),
            skip_waiting: AtomicBool::new(false),
            sessions: ClientSessions::new(),
            last_activation: Mutex::new(None),
        }
    }

    pub fn from_config(config: &AppConfig, ctx: StrategyContext) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidInput(e.to_string()))?;
        let manifest = config
            .precache_manifest
            .iter()
            .map(|path| resolve_manifest_path(&origin, path).map_err(|e| Error::InvalidUrl(format!("{path}: {e}"))))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(ctx, manifest, config.eviction_max_age()))
    }

    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    /// Observe phase transitions.
    pub fn subscribe(&self) -> watch::Receiver<Phase> {
        self.phase.subscribe()
    }

    pub fn sessions(&self) -> &ClientSessions {
        &self.sessions
    }

    pub fn version(&self) -> &str {
        self.ctx.partitions.version()
    }

    pub fn manifest(&self) -> &[Url] {
        &self.manifest
    }

    /// Report of the most recent activation, if one has finished.
    pub fn last_activation(&self) -> Option<ActivationReport> {
        self.last_activation.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Register a client session and return the version controlling it.
    ///
    /// A client connecting once activation has started is controlled
    /// immediately; earlier clients are claimed by the activation.
    pub async fn connect_client(&self, id: &str) -> Option<String> {
        self.sessions.open(id).await;
        if matches!(self.phase(), Phase::Activating | Phase::Active) {
            self.sessions.claim_session(id, self.version()).await;
        }
        let controller = self.sessions.controller(id).await;
        tracing::info!(session = id, controller = ?controller, "client connected");
        controller
    }

    /// Pre-cache the shell manifest, then move to `Waiting`, or straight on to
    /// activation if `FORCE_ACTIVATE` arrived meanwhile.
    ///
    /// Runs at most once. Individual manifest failures are logged and not
    /// retried. Install succeeds even when nothing could be cached.
    pub async fn install(&self) -> InstallReport {
        let mut first = false;
        self.phase.send_if_modified(|phase| {
            first = *phase == Phase::Installing && !self.install_started.swap(true, Ordering::SeqCst);
            false
        });
        if !first {
            tracing::warn!(phase = %self.phase(), "install already started; ignoring");
            return InstallReport::default();
        }

        tracing::info!(version = self.version(), entries = self.manifest.len(), "installing");

        let results = join_all(self.manifest.iter().map(|url| self.precache(url))).await;

        let mut report = InstallReport::default();
        for (url, result) in self.manifest.iter().zip(results) {
            match result {
                Ok(()) => report.cached.push(url.to_string()),
                Err(e) => {
                    tracing::warn!(%url, error = %e, "failed to pre-cache manifest entry");
                    report.failed.push(url.to_string());
                }
            }
        }

        if report.cached.is_empty() && !self.manifest.is_empty() {
            tracing::error!(
                failed = report.failed.len(),
                "pre-cache manifest entirely unreachable; install continues without a shell"
            );
        }

        let mut activate_now = false;
        self.phase.send_if_modified(|phase| {
            if *phase != Phase::Installing {
                return false;
            }
            if self.skip_waiting.load(Ordering::SeqCst) {
                *phase = Phase::Activating;
                activate_now = true;
            } else {
                *phase = Phase::Waiting;
            }
            true
        });

        tracing::info!(cached = report.cached.len(), failed = report.failed.len(), "install finished");

        if activate_now {
            self.finish_activation().await;
        }

        report
    }

    async fn precache(&self, url: &Url) -> Result<(), Error> {
        let request = Request::get(url.clone());
        let response = self.ctx.fetcher.fetch(&request, self.ctx.timeouts.navigation).await?;
        if !response.is_cacheable() {
            return Err(Error::HttpError(format!("{url}: status {}", response.status)));
        }
        self.ctx
            .partitions
            .store(PartitionKind::Static, "GET", url.as_str(), &response)
            .await?;
        Ok(())
    }

    /// Request activation.
    ///
    /// From `Waiting` this activates now. During install it queues
    /// activation to follow install directly. Once activating or active it
    /// does nothing.
    pub async fn activate(&self) -> ControlOutcome {
        let mut outcome = ControlOutcome::AlreadyActive;
        let mut activate_now = false;
        self.phase.send_if_modified(|phase| match phase {
            Phase::Installing => {
                self.skip_waiting.store(true, Ordering::SeqCst);
                outcome = ControlOutcome::ActivationQueued;
                false
            }
            Phase::Waiting => {
                *phase = Phase::Activating;
                activate_now = true;
                true
            }
            Phase::Activating | Phase::Active => false,
        });
        if activate_now {
            outcome = ControlOutcome::Activated(self.finish_activation().await);
        }
        outcome
    }

    async fn finish_activation(&self) -> ActivationReport {
        tracing::info!(version = self.version(), "activating");

        if let Err(e) = self.ctx.partitions.ensure_current().await {
            tracing::warn!(error = %e, "failed to create current partitions; they will be created on first use");
        }
        let deleted = match self.ctx.partitions.sweep_stale().await {
            Ok(deleted) => deleted,
            Err(e) => {
                tracing::warn!(error = %e, "stale partition sweep failed; retrying on next activation");
                Vec::new()
            }
        };
        let claimed = self.sessions.claim(self.version()).await;
        let report = ActivationReport { deleted, claimed };

        *self.last_activation.lock().unwrap_or_else(PoisonError::into_inner) = Some(report.clone());
        self.phase.send_replace(Phase::Active);
        tracing::info!(deleted = report.deleted.len(), claimed, "active");

        report
    }

    /// Handle one control command.
    pub async fn handle(&self, command: ControlCommand) -> ControlOutcome {
        match command {
            ControlCommand::ForceActivate => self.activate().await,
            ControlCommand::RunEvictionSweep => {
                match self
                    .ctx
                    .partitions
                    .evict_expired(PartitionKind::Api, self.eviction_max_age)
                    .await
                {
                    Ok(report) => ControlOutcome::Evicted(report),
                    Err(e) => {
                        tracing::warn!(error = %e, "eviction sweep failed");
                        ControlOutcome::EvictionFailed(e.to_string())
                    }
                }
            }
        }
    }

    /// Install, then keep serving control messages until the channel closes.
    ///
    /// Messages are handled while install is still running, so an early
    /// `FORCE_ACTIVATE` skips the waiting phase. Unrecognized messages are
    /// ignored.
    pub async fn run(self: Arc<Self>, mut control: mpsc::Receiver<String>) {
        let install = async {
            self.install().await;
        };
        let commands = async {
            while let Some(message) = control.recv().await {
                match ControlCommand::parse(&message) {
                    Some(command) => {
                        let outcome = self.handle(command).await;
                        tracing::info!(%command, ?outcome, "control command handled");
                    }
                    None => tracing::debug!(%message, "ignoring unrecognized control message"),
                }
            }
        };
        tokio::join!(install, commands);
    }
}
