use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::correction::resolve;
use crate::form::{find_unit, Form, Response};

/// Base unit id -> total
pub type UnitTotals = BTreeMap<String, f64>;

/// Unit-normalised totals across responses
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    /// Section id -> question id -> base unit id -> total
    pub summary: BTreeMap<String, BTreeMap<String, UnitTotals>>,
    pub stats: Stats,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    /// Responses processed, including those contributing no numbers
    pub count: usize,
}

/// A submission's base response and its corrections in creation order
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionHistory {
    pub id: String,
    pub response: Response,
    pub corrections: Vec<Response>,
}

impl SubmissionHistory {
    /// Current response of this submission
    pub fn resolved(&self) -> Response {
        resolve(&self.response, &self.corrections)
    }
}

impl Summary {
    /// Total for `section_id.question_id` in `unit_id`
    pub fn total(&self, section_id: &str, question_id: &str, unit_id: &str) -> Option<f64> {
        self.summary.get(section_id)?.get(question_id)?.get(unit_id).copied()
    }

    fn add(&mut self, section_id: &str, question_id: &str, unit_id: &str, value: f64) {
        *self
            .summary
            .entry(section_id.to_string())
            .or_default()
            .entry(question_id.to_string())
            .or_default()
            .entry(unit_id.to_string())
            .or_insert(0.0) += value;
    }
}

/// Resolve every submission against its corrections, then summarise
pub fn summarize(form: &Form, submissions: &[SubmissionHistory]) -> Summary {
    let resolved: Vec<Response> = submissions.iter().map(SubmissionHistory::resolved).collect();
    summarize_resolved(form, &resolved)
}

/// Summarise already resolved responses
///
/// Only `positive-integer` and `non-negative-integer` questions contribute.
/// Values whose unit the question does not define are skipped.
pub fn summarize_resolved<'a, I>(form: &Form, responses: I) -> Summary
where
    I: IntoIterator<Item = &'a Response>,
{
    let mut summary = Summary::default();

    for response in responses {
        for (section, question) in form.questions() {
            let Some(units) = question.format.units() else {
                continue;
            };
            let Some((value, unit_id)) = response
                .answer(&section.id, &question.id)
                .and_then(|a| a.as_quantity())
            else {
                continue;
            };
            let Some(unit) = find_unit(units, unit_id) else {
                warn!(
                    section = %section.id,
                    question = %question.id,
                    unit = unit_id,
                    "Skipping value with unknown unit"
                );
                continue;
            };

            let (value, base_id) = unit.normalize(value);
            summary.add(&section.id, &question.id, base_id, value);
        }
        summary.stats.count += 1;
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::Answer;
    use serde_json::json;

    fn unit_form() -> Form {
        serde_json::from_value(json!({
            "$schema": "https://example.com/form.schema.json",
            "$id": "https://example.com/form/units",
            "sections": [
                {
                    "id": "foodItems",
                    "title": "Food items",
                    "questions": [
                        {
                            "id": "rice",
                            "title": "Rice",
                            "format": { "type": "positive-integer", "units": [
                                { "id": "epal", "title": "Euro pallets",
                                  "baseUnit": { "id": "kg", "title": "Kilogram", "conversionFactor": 760 } },
                                { "id": "kg", "title": "Kilogram" }
                            ] }
                        },
                        {
                            "id": "cannedTomatoes",
                            "title": "Canned Tomatoes",
                            "format": { "type": "positive-integer", "units": [
                                { "id": "epal", "title": "Euro pallets",
                                  "baseUnit": { "id": "cans", "title": "Cans", "conversionFactor": 384 } },
                                { "id": "cans", "title": "Cans (#10 kitchen size)" }
                            ] }
                        },
                        { "id": "comment", "title": "Comment", "format": { "type": "text" } }
                    ]
                },
                {
                    "id": "hygieneItems",
                    "title": "Hygiene items",
                    "questions": [{
                        "id": "washingDetergent",
                        "title": "Washing Detergent",
                        "format": { "type": "non-negative-integer", "units": [
                            { "id": "bottle1l", "title": "1L bottle",
                              "baseUnit": { "id": "washCycles", "title": "wash cycles", "conversionFactor": 38 } },
                            { "id": "bag5k", "title": "5k bag",
                              "baseUnit": { "id": "washCycles", "title": "wash cycles", "conversionFactor": 90 } }
                        ] }
                    }]
                }
            ]
        }))
        .unwrap()
    }

    fn history(
        response: serde_json::Value,
        corrections: Vec<serde_json::Value>,
    ) -> SubmissionHistory {
        SubmissionHistory {
            id: crate::uuid_utils::generate_id(),
            response: serde_json::from_value(response).unwrap(),
            corrections: corrections
                .into_iter()
                .map(|c| serde_json::from_value(c).unwrap())
                .collect(),
        }
    }

    #[test]
    fn test_units_are_normalized_and_summed() {
        let summary = summarize(
            &unit_form(),
            &[
                history(
                    json!({
                        "foodItems": { "rice": [2, "epal"], "cannedTomatoes": [100, "cans"] },
                        "hygieneItems": { "washingDetergent": [10, "bottle1l"] }
                    }),
                    vec![],
                ),
                history(
                    json!({
                        "foodItems": { "rice": [200, "kg"], "cannedTomatoes": [3, "epal"] },
                        "hygieneItems": { "washingDetergent": [10, "bag5k"] }
                    }),
                    vec![],
                ),
            ],
        );

        assert_eq!(summary.total("foodItems", "rice", "kg"), Some(2.0 * 760.0 + 200.0));
        assert_eq!(summary.total("foodItems", "rice", "kg"), Some(1720.0));
        assert_eq!(summary.total("foodItems", "cannedTomatoes", "cans"), Some(100.0 + 3.0 * 384.0));
        assert_eq!(
            summary.total("hygieneItems", "washingDetergent", "washCycles"),
            Some(10.0 * 38.0 + 10.0 * 90.0)
        );
        assert!(summary.total("foodItems", "rice", "epal").is_none());
        assert_eq!(summary.stats.count, 2);
    }

    #[test]
    fn test_corrections_are_applied_before_summing() {
        let summary = summarize(
            &unit_form(),
            &[history(
                json!({ "foodItems": { "rice": [2, "epal"] } }),
                vec![
                    json!({ "foodItems": { "rice": [1, "epal"] } }),
                    json!({ "foodItems": { "rice": [50, "kg"] } }),
                ],
            )],
        );

        assert_eq!(summary.total("foodItems", "rice", "kg"), Some(50.0));
    }

    #[test]
    fn test_unknown_units_and_non_numbers_are_skipped() {
        let summary = summarize(
            &unit_form(),
            &[
                history(json!({ "foodItems": { "rice": [3, "sacks"], "comment": "lots" } }), vec![]),
                history(json!({ "foodItems": { "rice": "many" } }), vec![]),
                history(json!({}), vec![]),
            ],
        );

        assert!(summary.summary.is_empty());
        assert_eq!(summary.stats.count, 3);
    }

    #[test]
    fn test_free_text_never_summarized() {
        let response = Response::new()
            .with("foodItems", "comment", Answer::text("call alex@example.com"))
            .with("foodItems", "rice", Answer::quantity(5.0, "kg"));
        let summary = summarize_resolved(&unit_form(), [&response]);

        let value = serde_json::to_value(&summary).unwrap();
        assert!(!value.to_string().contains("alex@example.com"));
        assert_eq!(value["summary"]["foodItems"]["rice"]["kg"], 5.0);
        assert_eq!(value["stats"]["count"], 1);
    }
}
