//! Eligibility verification pipeline.
//!
//! Async orchestration around the pure rules in `elig_core`:
//! - [`VerificationPhaseController`]: per-patient `api → rpa → merging` runs
//! - [`VerificationStore`]: where phases and results are published
//! - [`VerificationSource`]: clearinghouse, portal scraper, fixtures
//! - [`AutoTriggerScheduler`]: automatic checks ahead of appointments

pub mod config;
pub mod controller;
pub mod error;
pub mod http;
pub mod memory;
pub mod phase;
pub mod scheduler;
pub mod source;
pub mod store;

pub use config::PipelineConfig;
pub use controller::{InFlightGuard, VerificationPhaseController, VerifyOutcome};
pub use error::{PhaseError, PipelineError, Result, StoreError, StoreResult};
pub use http::{HttpSource, HttpSourceConfig};
pub use memory::MemoryVerificationStore;
pub use phase::{Phase, PhaseEvent};
pub use scheduler::{AutoTriggerScheduler, ScheduledVerification};
pub use source::{FixtureSource, VerificationSource};
pub use store::{PhaseSnapshot, VerificationStore};
