use super::TextSpan;

/// Number of digits in a tag code
pub const CODE_WIDTH: usize = 3;

/// Code read from a region, if any, with the mean span confidence
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedNumber {
    pub code: Option<String>,
    pub confidence: f32,
}

impl ExtractedNumber {
    pub fn none() -> Self {
        Self {
            code: None,
            confidence: 0.0,
        }
    }
}

/// Join all spans with a space and pull a fixed-width code out of the text.
///
/// The confidence is the mean over all spans; it drops to zero when no code
/// can be found.
pub fn extract_number(spans: &[TextSpan]) -> ExtractedNumber {
    if spans.is_empty() {
        return ExtractedNumber::none();
    }

    let text = spans.iter().map(|s| s.text.as_str()).collect::<Vec<_>>().join(" ");
    let confidence = spans.iter().map(|s| s.confidence).sum::<f32>() / spans.len() as f32;

    match extract_code(&text) {
        Some(code) => ExtractedNumber {
            code: Some(code),
            confidence,
        },
        None => ExtractedNumber::none(),
    }
}

/// Find a code in free text, in order of preference:
/// a standalone run of exactly three digits, a standalone run of one or two
/// digits (zero-padded), then the first three digits anywhere (zero-padded).
/// A digit run is standalone when it is bounded by non-digits or the text ends.
pub fn extract_code(text: &str) -> Option<String> {
    let runs: Vec<&str> = text
        .split(|c: char| !c.is_ascii_digit())
        .filter(|run| !run.is_empty())
        .collect();

    if let Some(run) = runs.iter().find(|run| run.len() == CODE_WIDTH) {
        return Some(run.to_string());
    }
    if let Some(run) = runs.iter().find(|run| run.len() < CODE_WIDTH) {
        return Some(pad(run));
    }

    let digits: String = text.chars().filter(char::is_ascii_digit).take(CODE_WIDTH).collect();
    (!digits.is_empty()).then(|| pad(&digits))
}

fn pad(digits: &str) -> String {
    format!("{:0>width$}", digits, width = CODE_WIDTH)
}
