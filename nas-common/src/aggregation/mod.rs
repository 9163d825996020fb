//! Numeric reports over many submissions
//!
//! Integer answers are converted into their base units and summed per
//! question; results can be grouped recursively by arbitrary answers.
//!
//! Free text answers never appear in a report. They may identify
//! individuals and must not be published.

mod group;
mod report;
mod summary;

pub use group::{group, group_items, GroupKey, Grouped};
pub use report::{Filter, FilterMatch, QuestionRef, Report, ReportQuery};
pub use summary::{summarize, summarize_resolved, Stats, SubmissionHistory, Summary, UnitTotals};
