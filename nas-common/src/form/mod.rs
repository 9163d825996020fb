//! Form definitions
//!
//! A form is a static, versioned description of sections and questions.
//! Forms are never mutated; a changed form is a new form with a new `$id`.

mod answer;
mod units;

pub use answer::{Answer, Response, SectionAnswers};
pub use units::{find_unit, BaseUnit, Unit};

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::expression::{evaluate_condition, ExpressionEngine};
use crate::{Error, Result};

/// Needs assessment form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Form {
    #[serde(rename = "$schema")]
    pub schema: String,
    #[serde(rename = "$id")]
    pub id: String,
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Hides the section and all of its questions
    #[serde(default, skip_serializing_if = "Rule::is_default")]
    pub hidden: Rule,
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Rule::is_default")]
    pub required: Rule,
    #[serde(default, skip_serializing_if = "Rule::is_default")]
    pub hidden: Rule,
    pub format: Format,
}

/// Literal flag or expression evaluated against the full response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Rule {
    Literal(bool),
    Expression(String),
}

impl Default for Rule {
    fn default() -> Self {
        Rule::Literal(false)
    }
}

impl Rule {
    fn is_default(&self) -> bool {
        *self == Rule::Literal(false)
    }

    /// Whether the rule holds for `response`
    ///
    /// Expressions that fail or yield a non-boolean evaluate to `false`.
    pub fn holds(&self, engine: &dyn ExpressionEngine, response: &Response) -> bool {
        match self {
            Rule::Literal(flag) => *flag,
            Rule::Expression(expression) => evaluate_condition(engine, expression, response),
        }
    }
}

/// Answer format of a question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Format {
    Text(TextFormat),
    Email,
    PositiveInteger(IntegerFormat),
    NonNegativeInteger(IntegerFormat),
    SingleSelect(SelectFormat),
    MultiSelect(SelectFormat),
    Region(RegionFormat),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextFormat {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multi_line: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegerFormat {
    pub units: Vec<Unit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectFormat {
    pub options: Vec<SelectOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionFormat {
    pub regions: Vec<Region>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    pub id: String,
    pub locality: String,
    /// Two-letter ISO country code, `00` for "other country"
    pub country_code: String,
}

impl Format {
    /// Units of the integer formats
    pub fn units(&self) -> Option<&[Unit]> {
        match self {
            Format::PositiveInteger(f) | Format::NonNegativeInteger(f) => Some(&f.units),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Format::Text(_) => "text",
            Format::Email => "email",
            Format::PositiveInteger(_) => "positive-integer",
            Format::NonNegativeInteger(_) => "non-negative-integer",
            Format::SingleSelect(_) => "single-select",
            Format::MultiSelect(_) => "multi-select",
            Format::Region(_) => "region",
        }
    }
}

impl SelectFormat {
    pub fn has_option(&self, id: &str) -> bool {
        self.options.iter().any(|o| o.id == id)
    }
}

impl RegionFormat {
    pub fn region(&self, id: &str) -> Option<&Region> {
        self.regions.iter().find(|r| r.id == id)
    }
}

impl Section {
    pub fn question(&self, question_id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == question_id)
    }

    pub fn is_hidden(&self, engine: &dyn ExpressionEngine, response: &Response) -> bool {
        self.hidden.holds(engine, response)
    }
}

impl Question {
    pub fn is_hidden(&self, engine: &dyn ExpressionEngine, response: &Response) -> bool {
        self.hidden.holds(engine, response)
    }

    pub fn is_required(&self, engine: &dyn ExpressionEngine, response: &Response) -> bool {
        self.required.holds(engine, response)
    }
}

impl Form {
    pub fn section(&self, section_id: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.id == section_id)
    }

    pub fn question(&self, section_id: &str, question_id: &str) -> Option<&Question> {
        self.section(section_id)?.question(question_id)
    }

    /// Iterate over every `(section, question)` in form order
    pub fn questions(&self) -> impl Iterator<Item = (&Section, &Question)> {
        self.sections
            .iter()
            .flat_map(|s| s.questions.iter().map(move |q| (s, q)))
    }

    /// Check the structural invariants the rest of the crate relies on
    ///
    /// Ids are unique within their scope, select and region formats list at
    /// least one choice, integer formats list at least one unit and every
    /// conversion factor is positive.
    pub fn check(&self) -> Result<()> {
        let mut section_ids = HashSet::new();
        for section in &self.sections {
            if !section_ids.insert(section.id.as_str()) {
                return Err(Error::InvalidInput(format!("Duplicate section id \"{}\"", section.id)));
            }
            let mut question_ids = HashSet::new();
            for question in &section.questions {
                let path = format!("{}.{}", section.id, question.id);
                if !question_ids.insert(question.id.as_str()) {
                    return Err(Error::InvalidInput(format!("Duplicate question id \"{}\"", path)));
                }
                check_format(&path, &question.format)?;
            }
        }
        Ok(())
    }
}

fn check_format(path: &str, format: &Format) -> Result<()> {
    let empty = match format {
        Format::SingleSelect(f) | Format::MultiSelect(f) => f.options.is_empty(),
        Format::Region(f) => f.regions.is_empty(),
        Format::PositiveInteger(f) | Format::NonNegativeInteger(f) => {
            for unit in &f.units {
                if let Some(base) = &unit.base_unit {
                    if base.conversion_factor.is_nan() || base.conversion_factor <= 0.0 {
                        return Err(Error::InvalidInput(format!(
                            "Unit \"{}\" of \"{}\" needs a positive conversion factor",
                            unit.id, path
                        )));
                    }
                }
            }
            f.units.is_empty()
        }
        Format::Text(_) | Format::Email => false,
    };
    if empty {
        return Err(Error::InvalidInput(format!(
            "Question \"{}\" of type {} needs at least one choice",
            path,
            format.type_name()
        )));
    }
    Ok(())
}
