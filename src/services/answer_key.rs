use std::collections::HashSet;

use regex::Regex;

use crate::services::question_parser::DraftQuestion;

/// Matches `{id} [.)] [Ans:] {option}` pairs of a trailing answer-key section.
pub(crate) struct AnswerKeyResolver {
    pair: Regex,
}

impl AnswerKeyResolver {
    pub(crate) fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            pair: Regex::new(
                r"(?i)(\d+|[IVX]+-\d+)\s*[\.\)]?\s*(?:Ans[:\s]+)?(\([a-d]\)|[a-d][\.\)])",
            )?,
        })
    }

    pub(crate) fn pairs<'a>(&self, section: &'a str) -> Vec<(String, &'a str)> {
        self.pair
            .captures_iter(section)
            .filter_map(|caps| {
                let id = caps.get(1)?.as_str().to_ascii_uppercase();
                let answer = caps.get(2)?.as_str();
                Some((id, answer))
            })
            .collect()
    }

    /// Writes matched answers into `drafts` and returns how many distinct
    /// drafts received one. A bare `5` also matches `II-5`; the first draft in
    /// document order wins. Unmatched pairs are ignored.
    pub(crate) fn apply(&self, section: &str, drafts: &mut [DraftQuestion]) -> usize {
        let mut resolved = HashSet::new();

        for (id, answer) in self.pairs(section) {
            let suffix = format!("-{id}");
            let target = drafts.iter().position(|draft| {
                draft.hierarchical_id == id || draft.hierarchical_id.ends_with(&suffix)
            });
            if let Some(idx) = target {
                drafts[idx].answer_key = answer.to_string();
                resolved.insert(idx);
            }
        }

        resolved.len()
    }
}
