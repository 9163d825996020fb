use std::fmt;

use tracing::debug;

use crate::form::{Answer, Form, Format, Response};
use crate::{Error, Result};

use super::group::{group, GroupKey, Grouped};
use super::summary::{summarize_resolved, Summary};

/// Report over resolved responses, nested once per grouping key
pub type Report = Grouped<Summary>;

/// Reference to a question as `sectionId.questionId`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QuestionRef {
    pub section_id: String,
    pub question_id: String,
}

impl QuestionRef {
    pub fn new(section_id: impl Into<String>, question_id: impl Into<String>) -> Self {
        Self {
            section_id: section_id.into(),
            question_id: question_id.into(),
        }
    }

    /// Parse `sectionId.questionId` and make sure `form` defines it
    pub fn parse(form: &Form, raw: &str) -> Result<Self> {
        let mut parts = raw.split('.');
        let (Some(section_id), Some(question_id), None) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(Error::MalformedQuery(format!(
                "Must provide section ID and question ID separated by a dot, got \"{}\"",
                raw
            )));
        };
        if section_id.is_empty() || question_id.is_empty() {
            return Err(Error::MalformedQuery(format!(
                "Must provide section ID and question ID separated by a dot, got \"{}\"",
                raw
            )));
        }
        if form.section(section_id).is_none() {
            return Err(Error::MalformedQuery(format!("Unknown section \"{}\"", section_id)));
        }
        if form.question(section_id, question_id).is_none() {
            return Err(Error::MalformedQuery(format!("Unknown question \"{}\"", raw)));
        }
        Ok(Self::new(section_id, question_id))
    }

    pub fn answer<'a>(&self, response: &'a Response) -> Option<&'a Answer> {
        response.answer(&self.section_id, &self.question_id)
    }
}

impl fmt::Display for QuestionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.section_id, self.question_id)
    }
}

impl GroupKey<Response> for QuestionRef {
    fn key(&self, response: &Response) -> Option<String> {
        self.answer(response).map(Answer::group_key)
    }
}

/// How a filter compares an answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterMatch {
    /// Answer is exactly this string
    Equals(String),
    /// Answered region belongs to this country
    CountryCode(String),
}

/// Equality filter on a single question
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub question: QuestionRef,
    pub matches: FilterMatch,
    /// Region ids of the question with their country codes
    regions: Vec<(String, String)>,
}

impl Filter {
    /// Build a filter for `key=value`
    ///
    /// `countryCode:XX` is accepted on region questions only; any other
    /// `property:` prefix is rejected.
    pub fn parse(form: &Form, key: &str, value: &str) -> Result<Self> {
        let question = QuestionRef::parse(form, key)?;
        let format = form
            .question(&question.section_id, &question.question_id)
            .map(|q| &q.format)
            .ok_or_else(|| Error::MalformedQuery(format!("Unknown question \"{}\"", key)))?;

        let Some((property, argument)) = value.split_once(':') else {
            return Ok(Self {
                question,
                matches: FilterMatch::Equals(value.to_string()),
                regions: Vec::new(),
            });
        };

        match (format, property) {
            (Format::Region(regions), "countryCode") => Ok(Self {
                question,
                matches: FilterMatch::CountryCode(argument.to_string()),
                regions: regions
                    .regions
                    .iter()
                    .map(|r| (r.id.clone(), r.country_code.clone()))
                    .collect(),
            }),
            _ => Err(Error::MalformedQuery(format!(
                "Question format \"{}\" does not support property \"{}\"",
                format.type_name(),
                property
            ))),
        }
    }

    pub fn matches(&self, response: &Response) -> bool {
        let Some(answer) = self.question.answer(response).and_then(Answer::as_text) else {
            return false;
        };
        match &self.matches {
            FilterMatch::Equals(expected) => answer == expected,
            FilterMatch::CountryCode(code) => self
                .regions
                .iter()
                .any(|(id, country)| id == answer && country == code),
        }
    }
}

/// Filters and grouping parsed from request parameters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportQuery {
    pub filters: Vec<Filter>,
    pub group_by: Vec<QuestionRef>,
}

impl ReportQuery {
    /// Parse raw `key=value` parameters against `form`
    ///
    /// `ts` is ignored, `groupBy` lists comma separated question references
    /// and every other key is a filter.
    pub fn parse<'a, I>(form: &Form, pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut query = ReportQuery::default();
        for (key, value) in pairs {
            match key {
                "ts" => continue,
                "groupBy" => {
                    for raw in value.split(',') {
                        query.group_by.push(QuestionRef::parse(form, raw)?);
                    }
                }
                _ => query.filters.push(Filter::parse(form, key, value)?),
            }
        }
        Ok(query)
    }

    /// Whether `response` passes every filter
    pub fn accepts(&self, response: &Response) -> bool {
        self.filters.iter().all(|f| f.matches(response))
    }

    /// Filter, group and summarise resolved responses
    pub fn run(&self, form: &Form, responses: Vec<Response>) -> Report {
        let total = responses.len();
        let selected: Vec<Response> = responses.into_iter().filter(|r| self.accepts(r)).collect();
        debug!(
            total,
            selected = selected.len(),
            groups = self.group_by.len(),
            "Building report"
        );
        group(selected, &self.group_by, &|members: Vec<Response>| {
            summarize_resolved(form, &members)
        })
    }
}
