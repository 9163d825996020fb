use crate::form::{Answer, Form};

use super::diff::{AnswerChange, CorrectionDiff};

/// Human-readable rendering of an answer
pub fn answer_to_text(answer: &Answer) -> String {
    match answer {
        Answer::Text(s) => s.clone(),
        Answer::Quantity(value, unit) => format!("{} {}", value, unit),
        Answer::Selection(ids) => ids.join(", "),
    }
}

fn change_to_text(change: &AnswerChange) -> String {
    match change {
        AnswerChange::Changed { old, new } => format!(
            "  OLD: {}\n  NEW: {}",
            answer_to_text(old),
            answer_to_text(new)
        ),
        AnswerChange::Unset { unset } => format!("  DEL: {}", answer_to_text(unset)),
        AnswerChange::Set { set } => format!("  NEW: {}", answer_to_text(set)),
    }
}

/// Audit text for a correction diff, as used in notifications
///
/// Entries follow form order; entries for ids the form does not define come
/// last and are labelled with the raw ids.
pub fn diff_to_text(form: &Form, diff: &CorrectionDiff) -> String {
    let mut entries = Vec::new();

    for (section, question) in form.questions() {
        if let Some(change) = diff.get(&section.id).and_then(|q| q.get(&question.id)) {
            entries.push((section.title.as_str(), question.title.as_str(), change));
        }
    }
    for (section_id, questions) in diff {
        for (question_id, change) in questions {
            if form.question(section_id, question_id).is_none() {
                let section_label = form
                    .section(section_id)
                    .map(|s| s.title.as_str())
                    .unwrap_or(section_id);
                entries.push((section_label, question_id.as_str(), change));
            }
        }
    }

    entries
        .into_iter()
        .map(|(section, question, change)| {
            format!("- {}: {}\n{}\n", section, question, change_to_text(change))
        })
        .collect::<Vec<_>>()
        .join("\n")
}
