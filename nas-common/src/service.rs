//! Assessment service
//!
//! Ties stores, validation, correction resolution and reporting together.
//! Every externally visible operation of the backend goes through
//! [`AssessmentService`].

use std::sync::Arc;

use futures::future::try_join_all;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::aggregation::{Report, ReportQuery, SubmissionHistory};
use crate::assessment::{Correction, CorrectionRequest, Submission};
use crate::correction::{diff, resolve, CorrectionDiff};
use crate::endpoint::Endpoint;
use crate::events::{EventBus, NotificationEvent};
use crate::expression::ExpressionEngine;
use crate::form::{Form, Response};
use crate::store::{search, InMemoryStore, Record, Store};
use crate::uuid_utils;
use crate::validation::{validate_response, ValidationReport};
use crate::version::{check_version, current_version, Precondition};
use crate::{Error, Result};

/// Resolved state of a submission
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentResponse {
    pub form: String,
    pub response: Response,
    /// Version a correction has to declare next
    pub version: u32,
}

/// Identifier and URI of a newly created record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Created {
    pub id: String,
    pub uri: String,
}

pub struct AssessmentService {
    forms: Arc<dyn Store<Form>>,
    submissions: Arc<dyn Store<Submission>>,
    corrections: Arc<dyn Store<Correction>>,
    engine: Arc<dyn ExpressionEngine>,
    endpoint: Endpoint,
    events: EventBus,
    /// Serialises count-check-persist of corrections
    correction_lock: Mutex<()>,
}

impl AssessmentService {
    /// Service backed by in-memory stores
    pub fn new(endpoint: Endpoint, engine: Arc<dyn ExpressionEngine>, events: EventBus) -> Self {
        Self::with_stores(
            endpoint,
            engine,
            events,
            Arc::new(InMemoryStore::new("form")),
            Arc::new(InMemoryStore::new("submission")),
            Arc::new(InMemoryStore::new("correction")),
        )
    }

    pub fn with_stores(
        endpoint: Endpoint,
        engine: Arc<dyn ExpressionEngine>,
        events: EventBus,
        forms: Arc<dyn Store<Form>>,
        submissions: Arc<dyn Store<Submission>>,
        corrections: Arc<dyn Store<Correction>>,
    ) -> Self {
        Self {
            forms,
            submissions,
            corrections,
            engine,
            endpoint,
            events,
            correction_lock: Mutex::new(()),
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Persist `form` under `id`
    ///
    /// The form's `$id` is replaced by its URI on this endpoint.
    pub async fn create_form(&self, id: &str, mut form: Form) -> Result<Created> {
        form.check()?;
        let uri = self.endpoint.form_uri(id);
        form.id = uri.clone();
        self.forms.persist(id, form).await?;
        info!(form = %uri, "Form created");
        Ok(Created {
            id: id.to_string(),
            uri,
        })
    }

    pub async fn form(&self, id: &str) -> Result<Form> {
        self.forms
            .get(id)
            .await?
            .map(|r| r.data)
            .ok_or_else(|| Error::NotFound(format!("Form {}", id)))
    }

    /// Form referenced by `uri`
    async fn form_by_uri(&self, uri: &str) -> Result<Form> {
        let id = self
            .endpoint
            .form_id(uri)
            .ok_or_else(|| Error::NotFound(format!("Form {}", uri)))?;
        self.form(id).await
    }

    pub fn validate(&self, form: &Form, response: &Response) -> ValidationReport {
        validate_response(form, response, self.engine.as_ref())
    }

    /// Validate and persist a new submission for form `form_id`
    pub async fn submit(&self, form_id: &str, response: Response) -> Result<Created> {
        let form = self.form(form_id).await?;
        let report = self.validate(&form, &response);
        if !report.valid {
            debug!(form = %form.id, failures = report.failures().count(), "Submission rejected");
            return Err(Error::InvalidResponse(report));
        }

        let id = uuid_utils::generate_id();
        let uri = self.endpoint.submission_uri(&id);
        let submission = Submission {
            form: form.id.clone(),
            response,
        };
        self.submissions.persist(&id, submission.clone()).await?;
        info!(submission = %uri, form = %form.id, "Submission created");

        self.events.emit_lossy(NotificationEvent::SubmissionCreated {
            submission_id: id.clone(),
            submission_uri: uri.clone(),
            submission,
            form,
            timestamp: chrono::Utc::now(),
        });
        Ok(Created { id, uri })
    }

    pub async fn submission(&self, id: &str) -> Result<Submission> {
        self.submissions
            .get(id)
            .await?
            .map(|r| r.data)
            .ok_or_else(|| Error::NotFound(format!("Submission {}", id)))
    }

    /// Corrections of a submission in creation order
    pub async fn corrections(&self, submission_id: &str) -> Result<Vec<Record<Correction>>> {
        let uri = self.endpoint.submission_uri(submission_id);
        self.corrections.find_all(&search("submission", &uri)).await
    }

    /// Resolved response and current version
    pub async fn current(&self, submission_id: &str) -> Result<CurrentResponse> {
        let submission = self.submission(submission_id).await?;
        let corrections = self.corrections(submission_id).await?;
        let response = resolve(
            &submission.response,
            corrections.iter().map(|r| &r.data.response),
        );
        Ok(CurrentResponse {
            form: submission.form,
            response,
            version: current_version(corrections.len()),
        })
    }

    /// Difference between the submitted and the current response
    pub async fn submission_diff(&self, submission_id: &str) -> Result<(Form, CorrectionDiff)> {
        let submission = self.submission(submission_id).await?;
        let corrections = self.corrections(submission_id).await?;
        let form = self.form_by_uri(&submission.form).await?;
        let current = resolve(
            &submission.response,
            corrections.iter().map(|r| &r.data.response),
        );
        let difference = diff(&form, &submission.response, &current);
        Ok((form, difference))
    }

    /// Append a correction to submission `submission_id`
    ///
    /// The correction is accepted only if `precondition` names the current
    /// version and the corrected response is valid against the current form.
    /// Nothing is persisted otherwise.
    pub async fn correct(
        &self,
        submission_id: &str,
        request: CorrectionRequest,
        precondition: &Precondition,
        author: &str,
    ) -> Result<Created> {
        let submission_uri = self.endpoint.submission_uri(submission_id);
        if request.submission != submission_uri {
            return Err(Error::InvalidInput(format!(
                "Correction targets {}, expected {}",
                request.submission, submission_uri
            )));
        }
        let submission = self.submission(submission_id).await?;
        if request.form != submission.form {
            return Err(Error::InvalidInput(format!(
                "Correction uses form {}, submission was made with {}",
                request.form, submission.form
            )));
        }

        let guard = self.correction_lock.lock().await;

        let existing = self.corrections(submission_id).await?;
        let version = check_version(precondition, existing.len()).map_err(|e| {
            warn!(submission = %submission_uri, %precondition, "Correction rejected: {}", e);
            e
        })?;

        let form = self.form_by_uri(&submission.form).await?;
        let before = resolve(
            &submission.response,
            existing.iter().map(|r| &r.data.response),
        );
        let after = resolve(&before, [&request.response]);
        let report = self.validate(&form, &after);
        if !report.valid {
            debug!(submission = %submission_uri, "Corrected response is not valid");
            return Err(Error::InvalidResponse(report));
        }

        let id = uuid_utils::generate_id();
        let correction = request.into_correction(version, author);
        self.corrections
            .persist(&id, correction.clone())
            .await
            .map_err(|e| {
                error!(submission = %submission_uri, "Failed to persist correction: {}", e);
                e
            })?;
        drop(guard);

        info!(
            submission = %submission_uri,
            correction = %id,
            version = version + 1,
            author,
            "Correction created"
        );

        self.events.emit_lossy(NotificationEvent::CorrectionCreated {
            correction_id: id.clone(),
            correction,
            diff: diff(&form, &before, &after),
            form,
            submission_uri,
            submission,
            author: author.to_string(),
            timestamp: chrono::Utc::now(),
        });

        Ok(Created {
            uri: self.endpoint.correction_uri(&id),
            id,
        })
    }

    /// Report over the current responses of all submissions for `form_id`
    ///
    /// `pairs` are raw request parameters, see [`ReportQuery::parse`].
    pub async fn report<'a, I>(&self, form_id: &str, pairs: I) -> Result<Report>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let form = self.form(form_id).await?;
        let query = ReportQuery::parse(&form, pairs)?;

        let submissions = self.submissions.find_all(&search("form", &form.id)).await?;
        let histories = try_join_all(submissions.into_iter().map(|record| async move {
            let corrections = self.corrections(&record.id).await?;
            Ok::<_, Error>(SubmissionHistory {
                id: record.id,
                response: record.data.response,
                corrections: corrections.into_iter().map(|r| r.data.response).collect(),
            })
        }))
        .await?;

        let resolved: Vec<Response> = histories.iter().map(SubmissionHistory::resolved).collect();
        debug!(form = %form.id, submissions = resolved.len(), "Resolved submissions for report");
        Ok(query.run(&form, resolved))
    }
}
