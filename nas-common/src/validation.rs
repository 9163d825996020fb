//! Response validation against a form
//!
//! Hidden sections and questions are skipped entirely and do not appear in
//! the report. Visible questions are checked for required-ness and format.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::expression::ExpressionEngine;
use crate::form::{Answer, Form, Format, Question, Response};

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r".+@.+\..+").expect("email pattern is a valid regex"));

/// Outcome of validating a response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    /// True iff every visible section is valid
    pub valid: bool,
    /// Section id -> question id -> valid, visible questions only
    pub validation: BTreeMap<String, BTreeMap<String, bool>>,
    /// Section id -> valid, visible sections only
    pub section_validation: BTreeMap<String, bool>,
}

impl ValidationReport {
    /// `(section id, question id)` of every failed question
    pub fn failures(&self) -> impl Iterator<Item = (&str, &str)> {
        self.validation.iter().flat_map(|(section_id, questions)| {
            questions
                .iter()
                .filter(|(_, valid)| !**valid)
                .map(move |(question_id, _)| (section_id.as_str(), question_id.as_str()))
        })
    }
}

/// Validate `response` against `form`
pub fn validate_response(
    form: &Form,
    response: &Response,
    engine: &dyn ExpressionEngine,
) -> ValidationReport {
    let mut report = ValidationReport {
        valid: true,
        ..Default::default()
    };

    for section in &form.sections {
        if section.is_hidden(engine, response) {
            continue;
        }
        let mut section_valid = true;
        let questions = report.validation.entry(section.id.clone()).or_default();

        for question in &section.questions {
            if question.is_hidden(engine, response) {
                continue;
            }
            let answer = response.answer(&section.id, &question.id);
            let valid = validate_question(question, answer, response, engine);
            questions.insert(question.id.clone(), valid);
            section_valid &= valid;
        }

        report.section_validation.insert(section.id.clone(), section_valid);
        report.valid &= section_valid;
    }

    report
}

/// Validate a single answer
///
/// A missing or blank answer is valid iff the question is not required.
pub fn validate_question(
    question: &Question,
    answer: Option<&Answer>,
    response: &Response,
    engine: &dyn ExpressionEngine,
) -> bool {
    let answer = match answer {
        Some(answer) if !answer.is_blank() => answer,
        _ => return !question.is_required(engine, response),
    };
    check_format(&question.format, answer)
}

fn check_format(format: &Format, answer: &Answer) -> bool {
    match (format, answer) {
        (Format::Email, Answer::Text(email)) => EMAIL_PATTERN.is_match(email),
        (Format::Text(text), Answer::Text(value)) => {
            let length = value.chars().count();
            length >= 1 && text.max_length.map_or(true, |max| length <= max)
        }
        (Format::SingleSelect(select), Answer::Text(id)) => select.has_option(id),
        (Format::Region(regions), Answer::Text(id)) => regions.region(id).is_some(),
        (Format::MultiSelect(select), Answer::Selection(ids)) => {
            !ids.is_empty() && ids.iter().all(|id| select.has_option(id))
        }
        (Format::PositiveInteger(_), Answer::Quantity(value, _)) => *value > 0.0,
        (Format::NonNegativeInteger(_), Answer::Quantity(value, _)) => *value >= 0.0,
        _ => false,
    }
}
