//! Per-search lifecycle.
//!
//! ```text
//! Idle → Searching → { CacheHit | AwaitingExternalCall } → Ranked → Presented
//!            └──────────────┴──────────────┴─────────────────┴──→ Failed
//! Presented / Failed → Idle (new search or explicit clear)
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchPhase {
    #[default]
    Idle,
    Searching,
    CacheHit,
    AwaitingExternalCall,
    Ranked,
    Presented,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid search phase transition {from:?} → {to:?}")]
pub struct InvalidTransition {
    pub from: SearchPhase,
    pub to: SearchPhase,
}

impl SearchPhase {
    #[must_use]
    pub fn can_transition_to(self, next: SearchPhase) -> bool {
        use SearchPhase::{AwaitingExternalCall, CacheHit, Failed, Idle, Presented, Ranked, Searching};
        matches!(
            (self, next),
            (Idle, Searching)
                | (Searching, CacheHit | AwaitingExternalCall | Failed)
                | (CacheHit | AwaitingExternalCall, Ranked | Failed)
                | (Ranked, Presented | Failed)
                | (Presented | Failed, Idle)
        )
    }

    /// # Errors
    ///
    /// Returns [`InvalidTransition`] if `next` is not reachable from `self`.
    pub fn transition(self, next: SearchPhase) -> Result<SearchPhase, InvalidTransition> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, SearchPhase::Presented | SearchPhase::Failed)
    }

    /// `true` while a search is underway.
    #[must_use]
    pub fn is_loading(self) -> bool {
        matches!(
            self,
            SearchPhase::Searching
                | SearchPhase::CacheHit
                | SearchPhase::AwaitingExternalCall
                | SearchPhase::Ranked
        )
    }
}
