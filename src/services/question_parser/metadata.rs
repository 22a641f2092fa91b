use regex::Regex;

use crate::db::types::BloomLevel;

/// Inline labels found inside one question block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct InlineMetadata {
    pub(crate) bloom_level: BloomLevel,
    pub(crate) co_code: Option<String>,
    pub(crate) topic: Option<String>,
}

pub(crate) struct MetadataPatterns {
    option_marker: Regex,
    bloom: Regex,
    co_token: Regex,
    topic: Regex,
    labeled_outcome: Regex,
    bracketed_outcome: Regex,
    trailing_outcomes: Regex,
}

impl MetadataPatterns {
    pub(crate) fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            option_marker: Regex::new(r"(?i)(?:^|\s|[\.!\?,]|\))(\([a-d]\)|[a-d][\.\)])(?:\s|$)")?,
            bloom: Regex::new(r"(?i)Bloom(?:'s)?\s*(?:Taxonomy\s*)?Level:\s*(L[1-5])")?,
            co_token: Regex::new(r"(?i)\b(CO[1-9])\b")?,
            topic: Regex::new(r"(?i)Topic:\s*([^\n\r\t,]+)")?,
            labeled_outcome: Regex::new(r"(?i)Course\s*Outcome:\s*CO[1-9]\b")?,
            bracketed_outcome: Regex::new(r"(?i)[\(\[]\s*CO[1-9]\s*[\)\]]")?,
            trailing_outcomes: Regex::new(r"(?i)(?:\s*\bCO[1-9]\b)+\s*$")?,
        })
    }

    /// Splits a block into its stem and `"{marker} {content}"` options.
    pub(crate) fn split_options(&self, block: &str) -> (String, Vec<String>) {
        let markers: Vec<(usize, usize, &str)> = self
            .option_marker
            .captures_iter(block)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let label = caps.get(1)?;
                Some((label.start(), whole.end(), label.as_str()))
            })
            .collect();

        let Some(&(first_start, _, _)) = markers.first() else {
            return (block.trim().to_string(), Vec::new());
        };

        let stem = block[..first_start].trim().to_string();
        let options = markers
            .iter()
            .enumerate()
            .map(|(idx, &(_, content_start, label))| {
                let content_end = markers.get(idx + 1).map_or(block.len(), |next| next.0);
                let content = block.get(content_start..content_end).unwrap_or_default().trim();
                if content.is_empty() {
                    label.to_string()
                } else {
                    format!("{label} {content}")
                }
            })
            .collect();

        (stem, options)
    }

    pub(crate) fn extract(&self, block: &str) -> InlineMetadata {
        let bloom_level = self
            .bloom
            .captures(block)
            .and_then(|caps| caps.get(1))
            .map(|level| BloomLevel::parse_or_default(level.as_str()))
            .unwrap_or_default();

        let (stem, options) = self.split_options(block);
        let co_code = std::iter::once(stem.as_str())
            .chain(options.iter().map(String::as_str))
            .find_map(|segment| self.outcome_code(segment));

        let topic = self
            .topic
            .captures(block)
            .and_then(|caps| caps.get(1))
            .map(|name| name.as_str().trim().to_string())
            .filter(|name| !name.is_empty());

        InlineMetadata { bloom_level, co_code, topic }
    }

    /// Outcome code of the earliest phrase `scrub` strips from `segment`:
    /// `Course Outcome: COn`, a bracketed `(COn)`, or codes trailing the text.
    fn outcome_code(&self, segment: &str) -> Option<String> {
        let without_labels = self.bloom.replace_all(segment, "");
        let without_labels = self.topic.replace_all(&without_labels, "");
        let cleaned = without_labels.trim();

        [&self.labeled_outcome, &self.bracketed_outcome, &self.trailing_outcomes]
            .into_iter()
            .filter_map(|pattern| pattern.find(cleaned))
            .min_by_key(|found| found.start())
            .and_then(|found| self.co_token.find(found.as_str()))
            .map(|code| code.as_str().to_ascii_uppercase())
    }

    /// Removes labeled metadata phrases. A bare `COn` is only removed when it
    /// trails the text, so prose such as "CO2 emissions" survives. Repeats
    /// until nothing changes, which makes the result a fixed point.
    pub(crate) fn scrub(&self, text: &str) -> String {
        let mut current = text.trim().to_string();
        loop {
            let mut next = self.bloom.replace_all(&current, "").into_owned();
            next = self.topic.replace_all(&next, "").into_owned();
            next = self.labeled_outcome.replace_all(&next, "").into_owned();
            next = self.bracketed_outcome.replace_all(&next, "").into_owned();
            next = self.trailing_outcomes.replace_all(&next, "").into_owned();
            next = collapse_spaces(&next);
            if next == current {
                return current;
            }
            current = next;
        }
    }

    /// Cuts `stem` at the first option marker left in it.
    pub(crate) fn truncate_stray_option(&self, stem: &str) -> String {
        match self.option_marker.find(stem) {
            Some(found) => stem[..found.start()].trim().to_string(),
            None => stem.to_string(),
        }
    }
}

fn collapse_spaces(text: &str) -> String {
    text.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
