//! Administration commands over a bundle file
//!
//! A bundle is a JSON document holding forms, submissions and corrections:
//!
//! ```json
//! {
//!   "forms": { "<id>": { "$schema": "...", "$id": "...", "sections": [] } },
//!   "submissions": [{ "id": "<id>", "form": "<form uri>", "response": {} }],
//!   "corrections": [{ "id": "<id>", "form": "...", "submission": "...",
//!                     "submissionVersion": 1, "response": {}, "author": "..." }]
//! }
//! ```
//!
//! Corrections are listed in creation order. Records are loaded as they are,
//! without validation; only new corrections are checked. The bundle file is
//! never written back.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use nas_common::aggregation::Report;
use nas_common::correction::diff_to_text;
use nas_common::endpoint::Endpoint;
use nas_common::events::EventBus;
use nas_common::expression::{ExpressionEngine, NoExpressions};
use nas_common::service::CurrentResponse;
use nas_common::store::{InMemoryStore, Store};
use nas_common::validation::ValidationReport;
use nas_common::{
    AssessmentService, Correction, CorrectionRequest, Form, Precondition, Response, Submission,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// A stored record with its id inlined
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleRecord<T> {
    pub id: String,
    #[serde(flatten)]
    pub data: T,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bundle {
    #[serde(default)]
    pub forms: BTreeMap<String, Form>,
    #[serde(default)]
    pub submissions: Vec<BundleRecord<Submission>>,
    #[serde(default)]
    pub corrections: Vec<BundleRecord<Correction>>,
}

impl Bundle {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read bundle {}", path.display()))?;
        let bundle: Bundle = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse bundle {}", path.display()))?;
        debug!(
            forms = bundle.forms.len(),
            submissions = bundle.submissions.len(),
            corrections = bundle.corrections.len(),
            "Bundle loaded"
        );
        Ok(bundle)
    }
}

/// Bundle loaded into an assessment service
pub struct Workspace {
    pub bundle: Bundle,
    pub service: AssessmentService,
}

impl Workspace {
    pub async fn open(bundle: Bundle, endpoint: Endpoint, event_capacity: usize) -> Result<Self> {
        Self::with_engine(bundle, endpoint, event_capacity, Arc::new(NoExpressions)).await
    }

    pub async fn with_engine(
        bundle: Bundle,
        endpoint: Endpoint,
        event_capacity: usize,
        engine: Arc<dyn ExpressionEngine>,
    ) -> Result<Self> {
        let forms = Arc::new(InMemoryStore::new("form"));
        let submissions = Arc::new(InMemoryStore::new("submission"));
        let corrections = Arc::new(InMemoryStore::new("correction"));

        for (id, form) in &bundle.forms {
            let mut form = form.clone();
            form.id = endpoint.form_uri(id);
            forms.persist(id, form).await?;
        }
        for record in &bundle.submissions {
            submissions.persist(&record.id, record.data.clone()).await?;
        }
        for record in &bundle.corrections {
            corrections.persist(&record.id, record.data.clone()).await?;
        }

        let service = AssessmentService::with_stores(
            endpoint,
            engine,
            EventBus::new(event_capacity),
            forms,
            submissions,
            corrections,
        );
        Ok(Self { bundle, service })
    }

    pub async fn validate(&self, form_id: &str, response: &Response) -> Result<ValidationReport> {
        let form = self.service.form(form_id).await?;
        Ok(self.service.validate(&form, response))
    }

    pub async fn current(&self, submission_id: &str) -> Result<CurrentResponse> {
        Ok(self.service.current(submission_id).await?)
    }

    /// Audit text of everything corrected since submission
    pub async fn diff_text(&self, submission_id: &str) -> Result<String> {
        let (form, diff) = self.service.submission_diff(submission_id).await?;
        Ok(diff_to_text(&form, &diff))
    }

    /// Append a correction and record it in the in-memory bundle
    ///
    /// Returns the id of the new correction.
    pub async fn correct(
        &mut self,
        submission_id: &str,
        response: Response,
        precondition: &Precondition,
        author: &str,
    ) -> Result<String> {
        let submission = self.service.submission(submission_id).await?;
        let request = CorrectionRequest {
            form: submission.form,
            submission: self.service.endpoint().submission_uri(submission_id),
            response,
        };
        let created = self
            .service
            .correct(submission_id, request, precondition, author)
            .await?;

        let record = self
            .service
            .corrections(submission_id)
            .await?
            .into_iter()
            .find(|r| r.id == created.id)
            .ok_or_else(|| anyhow!("Correction {} missing after persist", created.id))?;
        self.bundle.corrections.push(BundleRecord {
            id: record.id,
            data: record.data,
        });
        info!(correction = %created.uri, "Correction recorded");
        Ok(created.id)
    }

    /// Report for `form_id`
    ///
    /// Filters are `sectionId.questionId=value`; `group_by` is a comma
    /// separated list of `sectionId.questionId`.
    pub async fn report(
        &self,
        form_id: &str,
        filters: &[String],
        group_by: Option<&str>,
    ) -> Result<Report> {
        let mut pairs = Vec::with_capacity(filters.len() + 1);
        for filter in filters {
            let (key, value) = filter.split_once('=').ok_or_else(|| {
                anyhow!("Filter must look like section.question=value, got \"{}\"", filter)
            })?;
            pairs.push((key, value));
        }
        if let Some(group_by) = group_by {
            pairs.push(("groupBy", group_by));
        }
        Ok(self.service.report(form_id, pairs).await?)
    }
}

/// Message to show for a failed command
///
/// Expected errors are shown as they are; internal failures only expose a
/// correlation id.
pub fn describe(err: &anyhow::Error) -> String {
    match err.downcast_ref::<nas_common::Error>() {
        Some(e) => e.public_message(),
        None => format!("{:#}", err),
    }
}

/// Write `value` as pretty JSON followed by a newline
pub fn write_json<W: Write, T: Serialize>(mut out: W, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut out, value).context("Failed to write JSON")?;
    writeln!(out).context("Failed to write JSON")?;
    Ok(())
}

/// Read a response document from a JSON file
pub fn read_response(path: &Path) -> Result<Response> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read response {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse response {}", path.display()))
}
