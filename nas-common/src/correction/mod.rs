//! Corrections of submitted responses
//!
//! Resolution and diffing are independent views over the same data:
//! [`resolve`] folds whole-answer overwrites onto a base response to obtain
//! the current state, [`diff`] classifies per-question changes for audit
//! text and notifications.

mod diff;
mod resolve;
mod text;

pub use diff::{diff, AnswerChange, CorrectionDiff};
pub use resolve::{apply, resolve};
pub use text::{answer_to_text, diff_to_text};
