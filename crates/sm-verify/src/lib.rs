//! `sm-verify` - Cross-strategy verification for `sm-matrix`.
//!
//! Multiplies seeded random operands with every configured strategy,
//! checks each product against the reference, and records how long each
//! strategy took.

pub mod config;
pub mod error;
pub mod harness;
pub mod report;

pub use config::VerifyConfig;
pub use error::{Result, VerifyError};
pub use harness::Verifier;
pub use report::{CaseReport, Outcome, StrategyRun, VerificationReport};
