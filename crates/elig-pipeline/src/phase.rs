//! Verification phase state machine.
//!
//! ```text
//! idle ──start──▶ api ──succeeded──▶ complete
//!                  │ ──failed─────▶ error
//!                  └──thin──▶ rpa ──fallback_failed──▶ complete (api only)
//!                              └──fallback_succeeded──▶ merging ──merged──▶ complete
//! ```
//!
//! `start` is also legal from `complete` and `error`; a retry begins a new run.

use serde::{Deserialize, Serialize};

use crate::error::PhaseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Idle,
    Api,
    Rpa,
    Merging,
    Complete,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseEvent {
    Start,
    ApiSucceeded,
    ApiThin,
    ApiFailed,
    FallbackSucceeded,
    FallbackFailed,
    Merged,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Api => "api",
            Phase::Rpa => "rpa",
            Phase::Merging => "merging",
            Phase::Complete => "complete",
            Phase::Error => "error",
        }
    }

    /// A pipeline is running for this patient.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Phase::Api | Phase::Rpa | Phase::Merging)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Complete | Phase::Error)
    }

    /// Total transition function: every (phase, event) pair yields either the
    /// next phase or a [`PhaseError`].
    pub fn apply(self, event: PhaseEvent) -> Result<Phase, PhaseError> {
        use Phase::*;
        use PhaseEvent::*;
        match (self, event) {
            (Idle | Complete | Error, Start) => Ok(Api),
            (Api, ApiSucceeded) => Ok(Complete),
            (Api, ApiThin) => Ok(Rpa),
            (Api, ApiFailed) => Ok(Error),
            (Rpa, FallbackSucceeded) => Ok(Merging),
            (Rpa, FallbackFailed) => Ok(Complete),
            (Merging, Merged) => Ok(Complete),
            (from, event) => Err(PhaseError { from, event }),
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::fmt::Display for PhaseEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PhaseEvent::Start => "start",
            PhaseEvent::ApiSucceeded => "api_succeeded",
            PhaseEvent::ApiThin => "api_thin",
            PhaseEvent::ApiFailed => "api_failed",
            PhaseEvent::FallbackSucceeded => "fallback_succeeded",
            PhaseEvent::FallbackFailed => "fallback_failed",
            PhaseEvent::Merged => "merged",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PHASES: [Phase; 6] = [
        Phase::Idle,
        Phase::Api,
        Phase::Rpa,
        Phase::Merging,
        Phase::Complete,
        Phase::Error,
    ];
    const EVENTS: [PhaseEvent; 7] = [
        PhaseEvent::Start,
        PhaseEvent::ApiSucceeded,
        PhaseEvent::ApiThin,
        PhaseEvent::ApiFailed,
        PhaseEvent::FallbackSucceeded,
        PhaseEvent::FallbackFailed,
        PhaseEvent::Merged,
    ];

    #[test]
    fn happy_paths() {
        let p = Phase::Idle.apply(PhaseEvent::Start).unwrap();
        assert_eq!(p, Phase::Api);
        assert_eq!(p.apply(PhaseEvent::ApiSucceeded).unwrap(), Phase::Complete);

        let p = p.apply(PhaseEvent::ApiThin).unwrap();
        assert_eq!(p, Phase::Rpa);
        let m = p.apply(PhaseEvent::FallbackSucceeded).unwrap();
        assert_eq!(m.apply(PhaseEvent::Merged).unwrap(), Phase::Complete);
        assert_eq!(p.apply(PhaseEvent::FallbackFailed).unwrap(), Phase::Complete);

        assert_eq!(
            Phase::Api.apply(PhaseEvent::ApiFailed).unwrap(),
            Phase::Error
        );
    }

    #[test]
    fn in_flight_phases_reject_start() {
        for p in [Phase::Api, Phase::Rpa, Phase::Merging] {
            assert!(p.is_in_flight());
            let err = p.apply(PhaseEvent::Start).unwrap_err();
            assert_eq!(err.from, p);
        }
    }

    #[test]
    fn function_is_total_and_exactly_nine_edges_exist() {
        let legal = PHASES
            .iter()
            .flat_map(|p| EVENTS.iter().map(move |e| p.apply(*e)))
            .filter(Result::is_ok)
            .count();
        assert_eq!(legal, 9);
    }

    #[test]
    fn terminal_phases_can_restart() {
        for p in [Phase::Complete, Phase::Error, Phase::Idle] {
            assert!(!p.is_in_flight());
            assert_eq!(p.apply(PhaseEvent::Start).unwrap(), Phase::Api);
        }
    }

    #[test]
    fn error_message_names_phase_and_event() {
        let err = Phase::Complete.apply(PhaseEvent::Merged).unwrap_err();
        assert_eq!(err.to_string(), "invalid phase transition: merged while complete");
    }
}
