//! Domain model for eligibility verification.
//!
//! - `Patient`: the scheduled patient and procedure text
//! - `VerificationResult`: the normalized benefits answer
//! - `Trigger`: why a verification ran
//! - `ErrorCategory`: failure taxonomy shared by every source

pub mod error;
pub mod money;
pub mod patient;
pub mod trigger;
pub mod verification;

pub use error::{EligError, ErrorCategory, Result, SourceError};
pub use money::{format_dollars, Money};
pub use patient::{Patient, PatientIdentity, ToothRecord};
pub use trigger::Trigger;
pub use verification::{
    ActionFlags, AssignmentOfBenefits, CategoryCoverage, FrequencyCounter, MedicaidFrequency,
    MedicaidInfo, MissingToothClause, OrthoBenefits, PlanStatus, PreventiveBenefits,
    RestorativeBenefits, ResultSource, VerificationResult, VerificationStatus, THIN_DATA_FLAG,
};
