//! Saga state machine.
//!
//! Every save or delete runs as a [`SagaRun`] driven through one
//! [`transition`] function:
//!
//! ```text
//! Started ──MetadataStepSucceeded──▶ MetadataWritten ──PayloadStepSucceeded──▶ PayloadWritten ──Commit──▶ Committed
//!    │                                     │
//!    └─MetadataStepFailed──▶ Aborted       └─PayloadStepFailed──▶ Compensating ──CompensationSucceeded──▶ Compensated
//!                                                                      │
//!                                                                      └─CompensationFailed──▶ CompensationFailed
//! ```
//!
//! For a delete saga the metadata step is the removal of the record and the
//! payload step is the removal of the payload; compensation restores the
//! record.

use docvault_core::{
    CompensationFailure, DocVaultResult, DocumentId, SagaError, SagaKind,
};
use std::fmt;

/// Position of a saga run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SagaState {
    Started,
    MetadataWritten,
    Compensating,
    PayloadWritten,
    Committed,
    Compensated,
    Aborted,
    CompensationFailed,
}

impl SagaState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SagaState::Started => "started",
            SagaState::MetadataWritten => "metadata_written",
            SagaState::Compensating => "compensating",
            SagaState::PayloadWritten => "payload_written",
            SagaState::Committed => "committed",
            SagaState::Compensated => "compensated",
            SagaState::Aborted => "aborted",
            SagaState::CompensationFailed => "compensation_failed",
        }
    }

    /// Terminal states accept no further events.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SagaState::Committed
                | SagaState::Compensated
                | SagaState::Aborted
                | SagaState::CompensationFailed
        )
    }
}

impl fmt::Display for SagaState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a saga step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SagaEvent {
    MetadataStepSucceeded,
    MetadataStepFailed,
    PayloadStepSucceeded,
    PayloadStepFailed,
    CompensationSucceeded,
    CompensationFailed,
    Commit,
}

impl SagaEvent {
    pub const ALL: [SagaEvent; 7] = [
        SagaEvent::MetadataStepSucceeded,
        SagaEvent::MetadataStepFailed,
        SagaEvent::PayloadStepSucceeded,
        SagaEvent::PayloadStepFailed,
        SagaEvent::CompensationSucceeded,
        SagaEvent::CompensationFailed,
        SagaEvent::Commit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SagaEvent::MetadataStepSucceeded => "metadata_step_succeeded",
            SagaEvent::MetadataStepFailed => "metadata_step_failed",
            SagaEvent::PayloadStepSucceeded => "payload_step_succeeded",
            SagaEvent::PayloadStepFailed => "payload_step_failed",
            SagaEvent::CompensationSucceeded => "compensation_succeeded",
            SagaEvent::CompensationFailed => "compensation_failed",
            SagaEvent::Commit => "commit",
        }
    }
}

impl fmt::Display for SagaEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The saga transition function.
pub fn transition(state: SagaState, event: SagaEvent) -> Result<SagaState, SagaError> {
    use SagaEvent as E;
    use SagaState as S;

    match (state, event) {
        (S::Started, E::MetadataStepSucceeded) => Ok(S::MetadataWritten),
        (S::Started, E::MetadataStepFailed) => Ok(S::Aborted),
        (S::MetadataWritten, E::PayloadStepSucceeded) => Ok(S::PayloadWritten),
        (S::MetadataWritten, E::PayloadStepFailed) => Ok(S::Compensating),
        (S::Compensating, E::CompensationSucceeded) => Ok(S::Compensated),
        (S::Compensating, E::CompensationFailed) => Ok(S::CompensationFailed),
        (S::PayloadWritten, E::Commit) => Ok(S::Committed),
        (from, event) => Err(SagaError::InvalidTransition {
            from: from.to_string(),
            event: event.to_string(),
        }),
    }
}

/// One saga invocation and the states it has passed through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SagaRun {
    kind: SagaKind,
    id: DocumentId,
    state: SagaState,
    history: Vec<SagaState>,
}

impl SagaRun {
    pub fn new(kind: SagaKind, id: DocumentId) -> Self {
        Self {
            kind,
            id,
            state: SagaState::Started,
            history: vec![SagaState::Started],
        }
    }

    pub fn kind(&self) -> SagaKind {
        self.kind
    }

    pub fn id(&self) -> DocumentId {
        self.id
    }

    pub fn state(&self) -> SagaState {
        self.state
    }

    pub fn history(&self) -> &[SagaState] {
        &self.history
    }

    /// Apply `event`, recording the new state.
    pub fn apply(&mut self, event: SagaEvent) -> Result<SagaState, SagaError> {
        let next = transition(self.state, event)?;
        tracing::trace!(
            target: "docvault::saga",
            saga = %self.kind,
            document_id = %self.id,
            from = %self.state,
            to = %next,
            event = %event,
            "saga transition"
        );
        self.state = next;
        self.history.push(next);
        Ok(next)
    }
}

/// Everything a finished saga has to say about itself.
#[derive(Debug, Clone, PartialEq)]
pub struct SagaReport<T> {
    pub kind: SagaKind,
    pub id: DocumentId,
    /// What the caller of `save`/`delete` gets.
    pub outcome: DocVaultResult<T>,
    pub history: Vec<SagaState>,
    pub final_state: SagaState,
    /// Set when a compensation itself failed and left an orphan behind.
    pub compensation_failure: Option<CompensationFailure>,
}

impl<T> SagaReport<T> {
    pub fn is_committed(&self) -> bool {
        self.final_state == SagaState::Committed
    }

    pub fn into_outcome(self) -> DocVaultResult<T> {
        self.outcome
    }
}
