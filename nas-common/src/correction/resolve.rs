use crate::form::Response;

/// Overwrite every answer present in `correction` onto `target`
///
/// Whole-answer replacement: a corrected multi-select replaces the previous
/// selection, it is not merged with it.
pub fn apply(target: &mut Response, correction: &Response) {
    for (section_id, question_id, answer) in correction.answers() {
        target.set(section_id, question_id, answer.clone());
    }
}

/// Current response after folding `corrections`, in creation order, onto `base`
///
/// Answers absent from a correction keep their prior value.
pub fn resolve<'a, I>(base: &Response, corrections: I) -> Response
where
    I: IntoIterator<Item = &'a Response>,
{
    corrections.into_iter().fold(base.clone(), |mut current, correction| {
        apply(&mut current, correction);
        current
    })
}
