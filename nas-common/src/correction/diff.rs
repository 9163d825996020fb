use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::form::{Answer, Form, Response};

/// Change of a single answer between two responses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerChange {
    /// Answer present on both sides with different values
    Changed { old: Answer, new: Answer },
    /// Answer removed by the correction
    Unset { unset: Answer },
    /// Answer added by the correction
    Set { set: Answer },
}

/// Section id -> question id -> change
pub type CorrectionDiff = BTreeMap<String, BTreeMap<String, AnswerChange>>;

/// Per-question difference between `submission` and `correction`
///
/// Only questions defined in `form` are compared, so the diff never
/// references a question the current form no longer has.
pub fn diff(form: &Form, submission: &Response, correction: &Response) -> CorrectionDiff {
    let mut difference = CorrectionDiff::new();

    for (section, question) in form.questions() {
        let answer = submission.answer(&section.id, &question.id);
        let corrected = correction.answer(&section.id, &question.id);

        let change = match (answer, corrected) {
            (Some(old), Some(new)) if old == new => continue,
            (None, None) => continue,
            (Some(old), Some(new)) => AnswerChange::Changed {
                old: old.clone(),
                new: new.clone(),
            },
            (Some(old), None) => AnswerChange::Unset { unset: old.clone() },
            (None, Some(new)) => AnswerChange::Set { set: new.clone() },
        };

        difference
            .entry(section.id.clone())
            .or_default()
            .insert(question.id.clone(), change);
    }

    difference
}
