//! Line-sectioned fallback for AI replies that are prose instead of JSON
//!
//! Lossy by nature: original formatting, text outside any section and text
//! sharing a line with a section header are not recoverable.

use std::sync::LazyLock;

use regex::Regex;

/// Section header, e.g. `Image descriptions:`, `## Summary`, `**Questions -**`
static HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[#*\s]*(image\s+descriptions?|summary|questions?)\b\**\s*(?:[:\-].*)?$")
        .expect("section header pattern is valid")
});

/// Enumeration marker in front of a question, e.g. `1.`, `2)`, `(3)`, `-`, `*`
///
/// A line holding only a marker matches as a whole.
static ENUMERATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[-*•]|\(?\d+[.)]?)(?:\s+|$)").expect("enumeration pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    ImageDescriptions,
    Summary,
    Questions,
}

impl Section {
    fn from_header(line: &str) -> Option<Self> {
        let captures = HEADER.captures(line)?;
        let keyword = captures.get(1)?.as_str().to_lowercase();

        Some(if keyword.starts_with("image") {
            Self::ImageDescriptions
        } else if keyword.starts_with("summary") {
            Self::Summary
        } else {
            Self::Questions
        })
    }
}

/// Content recovered from a prose reply
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionedText {
    pub image_descriptions: Vec<String>,
    /// Summary lines joined by single spaces
    pub summary: String,
    /// Questions with their enumeration markers removed
    pub questions: Vec<String>,
}

impl SectionedText {
    /// True when no section produced any content
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.image_descriptions.is_empty() && self.summary.is_empty() && self.questions.is_empty()
    }
}

/// Splits a prose reply into image descriptions, summary and questions
///
/// Header lines switch the current section and are dropped. Blank lines and
/// lines before the first header are ignored.
#[must_use]
pub fn parse_sections(text: &str) -> SectionedText {
    let mut section = Section::None;
    let mut parsed = SectionedText::default();

    for line in text.lines().map(str::trim) {
        if let Some(next) = Section::from_header(line) {
            section = next;
            continue;
        }
        if line.is_empty() {
            continue;
        }

        match section {
            Section::None => {}
            Section::ImageDescriptions => parsed.image_descriptions.push(line.to_string()),
            Section::Summary => {
                if !parsed.summary.is_empty() {
                    parsed.summary.push(' ');
                }
                parsed.summary.push_str(line);
            }
            Section::Questions => {
                let question = ENUMERATION.replace(line, "");
                if !question.is_empty() {
                    parsed.questions.push(question.into_owned());
                }
            }
        }
    }

    parsed
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_bare_markers_are_not_questions() {
        let parsed = parse_sections("Questions\n-\n1.\n(2)\n3. Where were you?\n1.5 hours felt long?");

        assert_eq!(
            parsed.questions,
            vec!["Where were you?".to_string(), "1.5 hours felt long?".to_string()]
        );
    }

    #[test]
    fn test_questions_strip_enumeration_markers() {
        let parsed = parse_sections("Questions:\n1. How did it feel?\n- What else happened?");

        assert_eq!(
            parsed.questions,
            vec!["How did it feel?".to_string(), "What else happened?".to_string()]
        );
        assert!(parsed.image_descriptions.is_empty());
        assert_eq!(parsed.summary, "");
    }

    #[test]
    fn test_all_sections() {
        let text = "\
Image descriptions:
A dog running on the beach.
Sunset over the pier.

Summary -
A relaxed day
by the sea.

Questions
2) Who were you with?
(3) Was the water cold?
";
        let parsed = parse_sections(text);

        assert_eq!(
            parsed.image_descriptions,
            vec![
                "A dog running on the beach.".to_string(),
                "Sunset over the pier.".to_string()
            ]
        );
        assert_eq!(parsed.summary, "A relaxed day by the sea.");
        assert_eq!(
            parsed.questions,
            vec!["Who were you with?".to_string(), "Was the water cold?".to_string()]
        );
    }

    #[test]
    fn test_text_before_first_header_is_ignored() {
        let parsed = parse_sections("Sure! Here is your analysis.\nNothing structured here.");

        assert!(parsed.is_empty());
    }

    #[test]
    fn test_headers_are_case_insensitive_and_not_emitted() {
        let parsed = parse_sections("SUMMARY:\nfine day\nimage description\nquestion -\nwhy?");

        assert_eq!(parsed.summary, "fine day");
        assert!(parsed.image_descriptions.is_empty());
        assert_eq!(parsed.questions, vec!["why?".to_string()]);
    }

    #[test]
    fn test_markdown_headers() {
        let parsed = parse_sections("## Summary\nquiet\n**Questions:**\n* anything new?");

        assert_eq!(parsed.summary, "quiet");
        assert_eq!(parsed.questions, vec!["anything new?".to_string()]);
    }

    #[test]
    fn test_line_starting_with_keyword_is_content() {
        let parsed = parse_sections("Summary:\nSummary of events was short");

        assert_eq!(parsed.summary, "Summary of events was short");
    }

    #[test]
    fn test_same_input_same_output() {
        let text = "Summary:\na\nQuestions:\n1. b?";

        assert_eq!(parse_sections(text), parse_sections(text));
    }
}
