//! # Needs Assessment Storage common library
//!
//! Core of the needs assessment backend shared by every front end:
//! - Form definitions, units and answers
//! - Response validation with dynamic `required`/`hidden` rules
//! - Append-only corrections: resolution, diffs and version preconditions
//! - Unit-normalised aggregation and recursive grouping for reports
//! - Store contract, notification events and configuration loading

pub mod aggregation;
pub mod assessment;
pub mod config;
pub mod correction;
pub mod endpoint;
pub mod error;
pub mod events;
pub mod expression;
pub mod form;
pub mod service;
pub mod store;
pub mod uuid_utils;
pub mod validation;
pub mod version;

pub use assessment::{Correction, CorrectionRequest, Submission};
pub use error::{Error, Result};
pub use form::{Answer, Form, Response};
pub use service::AssessmentService;
pub use version::Precondition;
