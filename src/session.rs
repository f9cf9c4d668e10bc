//! Load lifecycle for one diagram view.
//!
//! Each `begin` hands out a ticket; only the newest ticket may report
//! progress or settle the status, so a slow load for a scope the user has
//! already left cannot overwrite the current one.

use serde::Serialize;
use tracing::debug;

use crate::config::EngineConfig;
use crate::diagram::Diagram;
use crate::error::LoadError;
use crate::loader::{LoadOutcome, LoadScope, Loader};
use crate::model::{DetailLevel, LoadProgress};
use crate::source::DataSource;

/// Identifies one load attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoadTicket(u64);

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum LoadStatus {
    #[default]
    Idle,
    Loading(LoadProgress),
    /// Scope resolved to no tables.
    Empty,
    Failed {
        message: String,
    },
    Ready,
}

#[derive(Debug, Default)]
pub struct Session {
    generation: u64,
    scope: Option<LoadScope>,
    status: LoadStatus,
    diagram: Option<Diagram>,
    detail: DetailLevel,
    config: EngineConfig,
}

impl Session {
    pub fn new(config: EngineConfig, detail: DetailLevel) -> Self {
        Self {
            config,
            detail,
            ..Self::default()
        }
    }

    pub fn status(&self) -> &LoadStatus {
        &self.status
    }

    pub fn scope(&self) -> Option<&LoadScope> {
        self.scope.as_ref()
    }

    pub fn diagram(&self) -> Option<&Diagram> {
        self.diagram.as_ref()
    }

    pub fn diagram_mut(&mut self) -> Option<&mut Diagram> {
        self.diagram.as_mut()
    }

    /// Start a load for `scope`, invalidating any load still in flight.
    /// The previous diagram is cleared so nothing stale is shown.
    pub fn begin(&mut self, scope: LoadScope) -> LoadTicket {
        self.generation += 1;
        self.scope = Some(scope);
        self.diagram = None;
        self.status = LoadStatus::Loading(LoadProgress::default());
        LoadTicket(self.generation)
    }

    pub fn is_current(&self, ticket: LoadTicket) -> bool {
        ticket.0 == self.generation
    }

    pub fn progress(&mut self, ticket: LoadTicket, progress: LoadProgress) {
        if self.is_current(ticket) {
            self.status = LoadStatus::Loading(progress);
        }
    }

    /// Settle a load. Returns `false` when the ticket is stale and the result
    /// was discarded.
    pub fn finish(&mut self, ticket: LoadTicket, result: Result<LoadOutcome, LoadError>) -> bool {
        if !self.is_current(ticket) {
            debug!(
                ticket = ticket.0,
                current = self.generation,
                "discarding stale load result"
            );
            return false;
        }

        match result {
            Ok(outcome) if outcome.is_empty() => {
                self.status = LoadStatus::Empty;
            }
            Ok(outcome) => {
                self.diagram = Some(Diagram::from_outcome(outcome, self.detail, &self.config));
                self.status = LoadStatus::Ready;
            }
            Err(e) => {
                self.status = LoadStatus::Failed {
                    message: e.user_message(),
                };
            }
        }
        true
    }

    /// Scope to reload after a failure. Retrying is a fresh load, never a
    /// resume.
    pub fn retry(&self) -> Option<LoadScope> {
        match self.status {
            LoadStatus::Failed { .. } => self.scope.clone(),
            _ => None,
        }
    }

    /// Begin, load and finish in one step.
    pub async fn load(&mut self, source: &dyn DataSource, scope: LoadScope) -> &LoadStatus {
        let ticket = self.begin(scope.clone());
        let loader = Loader::new(source, &self.config.loader);

        let result = loader.load(&scope, |p| self.progress(ticket, p)).await;
        self.finish(ticket, result);
        &self.status
    }
}
