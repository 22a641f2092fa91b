use regex::Regex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum MarkerKind {
    /// `PART A` .. `PART G`.
    Part(char),
    AnswerKey,
    /// Group prefix such as `II.`; spelled-out labels are stored as numerals.
    Roman(String),
    /// Item label as written: `5` or `II-5`.
    Number(String),
    Unit(i32),
}

/// A marker occupying `start..end` of the normalized text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Marker {
    pub(crate) start: usize,
    pub(crate) end: usize,
    pub(crate) kind: MarkerKind,
}

pub(crate) struct MarkerLexer {
    part: Regex,
    answer_key: Regex,
    roman: Regex,
    number: Regex,
    unit: Regex,
}

impl MarkerLexer {
    pub(crate) fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            part: Regex::new(r"(?i)\bPART\s+([A-G])\b")?,
            answer_key: Regex::new(r"(?i)\bANSWER\s*KEY\b")?,
            roman: Regex::new(
                r"(?:^|\s)(VIII|VII|VI|III|II|IV|IX|I|V|X|One|Two|Three|Four|Five)[\.\)]\s+",
            )?,
            number: Regex::new(r"(?i)(?:^|\s)(\d+|[IVX]+-\d+)[\.\)]\s+")?,
            unit: Regex::new(
                r"(?i)(?:^|\n)(?:Unit|Module|Chapter)[\s-]*(V|IV|III|II|I|1|2|3|4|5|One|Two|Three|Four|Five)\b[:\s]*",
            )?,
        })
    }

    /// All markers of `text`, ordered by start offset. Markers of different
    /// kinds that begin at the same offset keep a stable kind order.
    pub(crate) fn tokenize(&self, text: &str) -> Vec<Marker> {
        let mut markers = Vec::new();

        for caps in self.part.captures_iter(text) {
            if let (Some(whole), Some(label)) = (caps.get(0), caps.get(1)) {
                let letter = label.as_str().chars().next().unwrap_or('A').to_ascii_uppercase();
                markers.push(Marker { start: whole.start(), end: whole.end(), kind: MarkerKind::Part(letter) });
            }
        }

        for found in self.answer_key.find_iter(text) {
            markers.push(Marker { start: found.start(), end: found.end(), kind: MarkerKind::AnswerKey });
        }

        for caps in self.roman.captures_iter(text) {
            if let (Some(whole), Some(label)) = (caps.get(0), caps.get(1)) {
                markers.push(Marker {
                    start: whole.start(),
                    end: whole.end(),
                    kind: MarkerKind::Roman(roman_label(label.as_str())),
                });
            }
        }

        for caps in self.number.captures_iter(text) {
            if let (Some(whole), Some(label)) = (caps.get(0), caps.get(1)) {
                markers.push(Marker {
                    start: whole.start(),
                    end: whole.end(),
                    kind: MarkerKind::Number(label.as_str().to_string()),
                });
            }
        }

        for caps in self.unit.captures_iter(text) {
            if let (Some(whole), Some(label)) = (caps.get(0), caps.get(1)) {
                if let Some(number) = unit_number(label.as_str()) {
                    markers.push(Marker { start: whole.start(), end: whole.end(), kind: MarkerKind::Unit(number) });
                }
            }
        }

        markers.sort_by_key(|marker| marker.start);
        markers
    }
}

fn roman_label(label: &str) -> String {
    match label {
        "One" => "I".to_string(),
        "Two" => "II".to_string(),
        "Three" => "III".to_string(),
        "Four" => "IV".to_string(),
        "Five" => "V".to_string(),
        other => other.to_string(),
    }
}

/// Maps a unit heading label (`IV`, `4`, `four`) to its number.
pub(crate) fn unit_number(label: &str) -> Option<i32> {
    match label.trim().to_ascii_uppercase().as_str() {
        "I" | "1" | "ONE" => Some(1),
        "II" | "2" | "TWO" => Some(2),
        "III" | "3" | "THREE" => Some(3),
        "IV" | "4" | "FOUR" => Some(4),
        "V" | "5" | "FIVE" => Some(5),
        _ => None,
    }
}
