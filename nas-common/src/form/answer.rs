//! Answers and responses

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Answer to a single question
///
/// Absence of an answer is key absence in the [`Response`], never a null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    /// Text, email, single-select option id or region id
    Text(String),
    /// Integer formats: `[value, unitId]`
    Quantity(f64, String),
    /// Multi-select option ids
    Selection(Vec<String>),
}

impl Answer {
    pub fn text(value: impl Into<String>) -> Self {
        Answer::Text(value.into())
    }

    pub fn quantity(value: f64, unit: impl Into<String>) -> Self {
        Answer::Quantity(value, unit.into())
    }

    pub fn selection<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Answer::Selection(ids.into_iter().map(Into::into).collect())
    }

    /// Empty text or empty selection counts as unanswered
    pub fn is_blank(&self) -> bool {
        match self {
            Answer::Text(s) => s.is_empty(),
            Answer::Selection(ids) => ids.is_empty(),
            Answer::Quantity(..) => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Answer::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_quantity(&self) -> Option<(f64, &str)> {
        match self {
            Answer::Quantity(value, unit) => Some((*value, unit.as_str())),
            _ => None,
        }
    }

    pub fn as_selection(&self) -> Option<&[String]> {
        match self {
            Answer::Selection(ids) => Some(ids),
            _ => None,
        }
    }

    /// Key used when grouping responses by this answer
    ///
    /// Array answers join their elements with `,`.
    pub fn group_key(&self) -> String {
        match self {
            Answer::Text(s) => s.clone(),
            Answer::Quantity(value, unit) => format!("{},{}", value, unit),
            Answer::Selection(ids) => ids.join(","),
        }
    }
}

/// Answers of one section, keyed by question id
pub type SectionAnswers = BTreeMap<String, Answer>;

/// Section id -> question id -> answer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Response(BTreeMap<String, SectionAnswers>);

impl Response {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer stored at `section_id.question_id`
    pub fn answer(&self, section_id: &str, question_id: &str) -> Option<&Answer> {
        self.0.get(section_id)?.get(question_id)
    }

    pub fn section(&self, section_id: &str) -> Option<&SectionAnswers> {
        self.0.get(section_id)
    }

    /// Store `answer`, replacing whatever was there
    pub fn set(
        &mut self,
        section_id: impl Into<String>,
        question_id: impl Into<String>,
        answer: Answer,
    ) {
        self.0
            .entry(section_id.into())
            .or_default()
            .insert(question_id.into(), answer);
    }

    /// Builder-style [`Response::set`]
    pub fn with(mut self, section_id: &str, question_id: &str, answer: Answer) -> Self {
        self.set(section_id, question_id, answer);
        self
    }

    /// Iterate over every `(section id, question id, answer)`
    pub fn answers(&self) -> impl Iterator<Item = (&str, &str, &Answer)> {
        self.0.iter().flat_map(|(section_id, questions)| {
            questions.iter().map(move |(question_id, answer)| {
                (section_id.as_str(), question_id.as_str(), answer)
            })
        })
    }
}

impl From<BTreeMap<String, SectionAnswers>> for Response {
    fn from(map: BTreeMap<String, SectionAnswers>) -> Self {
        Self(map)
    }
}
