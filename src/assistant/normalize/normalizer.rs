//! Response normalization into the canonical four-section layout.
//!
//! Pipeline:
//! 1. Inputs that already carry each marker exactly once, on its own line, pass through.
//! 2. Inputs with header lines (`**Name**` or `# Name`) are regrouped by section.
//! 3. Inputs without headers are split into paragraphs.
//! 4. Missing sections get stand-in bullets; everything is re-emitted in fixed order.

use regex::Regex;
use tracing::debug;

use crate::assistant::normalize::sections::{
    DISCLAIMER_MARKER, HeaderKind, INFORMATION_MARKER, NEXT_STEPS_MARKER, PrimaryTitle,
    RECOMMENDATIONS_MARKER, REQUIRED_MARKERS, SYMPTOMS_MARKER, Section,
};

/// One classified input line.
#[derive(Debug)]
enum Line<'a> {
    Blank,
    Header(HeaderKind),
    Content(&'a str),
}

/// Sections collected from the input before gaps are filled.
#[derive(Debug, Default)]
struct Draft {
    bullets: [Vec<String>; 4],
    primary: Option<PrimaryTitle>,
}

impl Draft {
    fn push(&mut self, section: Section, bullet: String) {
        let bucket = &mut self.bullets[section.index()];
        if !bucket.contains(&bullet) {
            bucket.push(bullet);
        }
    }

    fn render(self) -> String {
        let primary = self.primary.unwrap_or_default();
        let mut blocks = Vec::with_capacity(Section::ORDER.len());

        for (section, bullets) in Section::ORDER.into_iter().zip(self.bullets) {
            let body = if bullets.is_empty() {
                section
                    .default_bullets()
                    .iter()
                    .map(|line| format!("- {line}"))
                    .collect::<Vec<_>>()
                    .join("\n")
            } else {
                bullets.join("\n")
            };
            blocks.push(format!("{}\n{body}", section.marker(primary)));
        }

        blocks.join("\n\n")
    }
}

/// Rewrites free text into the canonical section layout.
#[derive(Clone, Debug)]
pub struct ResponseNormalizer {
    bold_header: Regex,
    hash_header: Regex,
    bullet_prefix: Regex,
    rule_line: Regex,
}

impl ResponseNormalizer {
    /// Compile the line patterns.
    ///
    /// # Errors
    /// Returns an error if a pattern fails to compile.
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            bold_header: Regex::new(r"^\*\*\s*([^*]+?)\s*\*\*\s*:?$")?,
            hash_header: Regex::new(r"^#{1,6}\s+(.+?)(?:\s+#+)?$")?,
            bullet_prefix: Regex::new(r"^(?:[•–]\s*|[-*+](?:\s+|$))+")?,
            rule_line: Regex::new(r"^[-*_=]{3,}$")?,
        })
    }

    /// Normalize a model reply.
    ///
    /// The output holds exactly one primary marker (`**Information**` or `**Symptoms**`)
    /// and exactly one of each other marker, and normalizing it again returns it unchanged.
    #[must_use]
    pub fn normalize(&self, text: &str) -> String {
        if is_canonical(text) {
            debug!("response already canonical");
            return text.to_string();
        }

        let lines: Vec<Line<'_>> = text.lines().map(|line| self.classify_line(line)).collect();
        let has_headers = lines.iter().any(|line| matches!(line, Line::Header(_)));

        let draft = if has_headers {
            debug!("normalizing sectioned response");
            self.regroup(lines)
        } else {
            debug!("normalizing plain response");
            self.paragraphs(&lines)
        };

        draft.render()
    }

    fn classify_line<'a>(&self, raw: &'a str) -> Line<'a> {
        let line = raw.trim();
        if line.is_empty() || self.rule_line.is_match(line) {
            return Line::Blank;
        }

        let title = self
            .bold_header
            .captures(line)
            .or_else(|| self.hash_header.captures(line))
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().trim_matches('*').trim());

        match title {
            Some(title) if !title.is_empty() => Line::Header(HeaderKind::from_title(title)),
            _ => Line::Content(line),
        }
    }

    fn regroup(&self, lines: Vec<Line<'_>>) -> Draft {
        let mut draft = Draft::default();
        let mut current = Section::Primary;

        for line in lines {
            match line {
                Line::Blank => {}
                Line::Header(HeaderKind::Known(section, title)) => {
                    current = section;
                    if let Some(title) = title {
                        draft.primary.get_or_insert(title);
                    }
                }
                Line::Header(HeaderKind::Unknown(title)) => {
                    current = Section::Primary;
                    if let Some(bullet) = self.bullet(&title) {
                        draft.push(Section::Primary, bullet);
                    }
                }
                Line::Content(text) => {
                    if let Some(bullet) = self.bullet(text) {
                        draft.push(current, bullet);
                    }
                }
            }
        }

        draft
    }

    fn paragraphs(&self, lines: &[Line<'_>]) -> Draft {
        let mut draft = Draft::default();
        let mut paragraph = 0usize;
        let mut in_paragraph = false;

        for line in lines {
            let Line::Content(text) = line else {
                if in_paragraph {
                    paragraph += 1;
                    in_paragraph = false;
                }
                continue;
            };
            let Some(bullet) = self.bullet(text) else {
                continue;
            };
            let section = match paragraph {
                0 => Section::Primary,
                1 => Section::Recommendations,
                _ => Section::NextSteps,
            };
            draft.push(section, bullet);
            in_paragraph = true;
        }

        draft
    }

    /// One content line as a `- ` bullet, or `None` if nothing is left.
    fn bullet(&self, text: &str) -> Option<String> {
        let stripped = self.bullet_prefix.replace(text.trim(), "");
        let cleaned = neutralize_markers(&stripped);
        let cleaned = cleaned.trim();
        if cleaned.is_empty() {
            None
        } else {
            Some(format!("- {cleaned}"))
        }
    }
}

/// Each required marker exactly once, each on its own line.
fn is_canonical(text: &str) -> bool {
    let occurrences = |marker: &str| text.matches(marker).count();
    let standalone = |marker: &str| text.lines().filter(|line| line.trim() == marker).count();

    if occurrences(INFORMATION_MARKER) + occurrences(SYMPTOMS_MARKER) != 1 {
        return false;
    }
    if [RECOMMENDATIONS_MARKER, DISCLAIMER_MARKER, NEXT_STEPS_MARKER]
        .into_iter()
        .any(|marker| occurrences(marker) != 1)
    {
        return false;
    }

    REQUIRED_MARKERS
        .into_iter()
        .all(|marker| occurrences(marker) == standalone(marker))
}

/// Strip the asterisks from required markers found inside content.
fn neutralize_markers(text: &str) -> String {
    let mut out = text.to_string();
    loop {
        let mut changed = false;
        for marker in REQUIRED_MARKERS {
            if out.contains(marker) {
                out = out.replace(marker, &marker[2..marker.len() - 2]);
                changed = true;
            }
        }
        if !changed {
            return out;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CANONICAL_SYMPTOMS: &str = "**Symptoms**
- Headache
- Mild fever

**Recommendations**
- Rest

**Medical Disclaimer**
- This information is for general guidance only

**Next Steps**
- Call your doctor if it persists";

    fn normalizer() -> ResponseNormalizer {
        ResponseNormalizer::new().unwrap()
    }

    fn assert_exactly_once(output: &str) {
        assert_eq!(
            output.matches(INFORMATION_MARKER).count() + output.matches(SYMPTOMS_MARKER).count(),
            1,
            "primary marker in:\n{output}"
        );
        for marker in [RECOMMENDATIONS_MARKER, DISCLAIMER_MARKER, NEXT_STEPS_MARKER] {
            assert_eq!(output.matches(marker).count(), 1, "{marker} in:\n{output}");
        }
    }

    #[test]
    fn test_canonical_input_is_returned_unchanged() {
        let n = normalizer();
        assert_eq!(n.normalize(CANONICAL_SYMPTOMS), CANONICAL_SYMPTOMS);
    }

    #[test]
    fn test_plain_paragraphs() {
        let n = normalizer();
        let input = "Broken arms cause pain and swelling.\n\nImmobilize the arm and apply ice.\n\nSee a doctor immediately.";
        let output = n.normalize(input);
        assert_exactly_once(&output);
        assert!(output.starts_with("**Information**\n- Broken arms cause pain and swelling."));
        assert!(output.contains("**Recommendations**\n- Immobilize the arm and apply ice."));
        assert!(output.contains("**Next Steps**\n- See a doctor immediately."));
        assert!(output.contains("- Not a substitute for professional medical advice"));
    }

    #[test]
    fn test_fourth_paragraph_joins_next_steps() {
        let n = normalizer();
        let output = n.normalize("a\n\nb\n\nc\n\nd");
        assert!(output.ends_with("**Next Steps**\n- c\n- d"));
    }

    #[test]
    fn test_empty_input_gets_all_defaults() {
        let n = normalizer();
        let output = n.normalize("");
        assert_exactly_once(&output);
        assert!(output.starts_with("**Information**\n- No specific information provided"));
        assert!(output.contains("- Keep track of your symptoms"));
        assert!(output.contains("- Document any specific concerns"));
    }

    #[test]
    fn test_missing_sections_are_filled() {
        let n = normalizer();
        let output = n.normalize("**Symptoms**\n* Cough\n• Fatigue\n\n**Recommendations**\n1. Drink water");
        assert_exactly_once(&output);
        assert!(output.starts_with("**Symptoms**\n- Cough\n- Fatigue\n\n**Recommendations**\n- 1. Drink water"));
        assert!(output.contains("**Medical Disclaimer**\n- This information is for general guidance only"));
    }

    #[test]
    fn test_duplicated_sections_merge() {
        let n = normalizer();
        let input = "**Information**\n- A\n**Recommendations**\n- B\n**Information**\n- A\n- C\n**Recommendations**\n- B";
        let output = n.normalize(input);
        assert_exactly_once(&output);
        assert!(output.starts_with("**Information**\n- A\n- C\n\n**Recommendations**\n- B\n\n"));
    }

    #[test]
    fn test_sections_are_reordered() {
        let n = normalizer();
        let input = "**Next Steps**\n- follow up\n\n**Information**\n- info";
        let output = n.normalize(input);
        let info = output.find(INFORMATION_MARKER).unwrap();
        let next = output.find(NEXT_STEPS_MARKER).unwrap();
        assert!(info < next);
        assert!(output.ends_with("**Next Steps**\n- follow up"));
    }

    #[test]
    fn test_hash_headings_and_colons() {
        let n = normalizer();
        let input = "## Symptoms\n- sneezing\n### Recommendations:\n- rest\n**Disclaimer:**\n- talk to a doctor\n# Next steps\n- sleep";
        let output = n.normalize(input);
        assert_eq!(
            output,
            "**Symptoms**\n- sneezing\n\n**Recommendations**\n- rest\n\n**Medical Disclaimer**\n- talk to a doctor\n\n**Next Steps**\n- sleep"
        );
    }

    #[test]
    fn test_error_section_is_primary_and_preamble_kept() {
        let n = normalizer();
        let input = "Sorry about that.\n**Error**\n- I apologize, but I encountered an error\n**Next Steps**\n- Try again";
        let output = n.normalize(input);
        assert!(output.starts_with(
            "**Information**\n- Sorry about that.\n- I apologize, but I encountered an error"
        ));
        assert!(output.ends_with("**Next Steps**\n- Try again"));
    }

    #[test]
    fn test_unknown_header_lands_in_primary() {
        let n = normalizer();
        let output = n.normalize("**Causes**\n- Viral infection\n**Recommendations**\n- Rest");
        assert!(output.starts_with("**Information**\n- Causes\n- Viral infection"));
    }

    #[test]
    fn test_repeated_marker_blob_is_collapsed() {
        let n = normalizer();
        let blob = format!("{CANONICAL_SYMPTOMS}\n\n{CANONICAL_SYMPTOMS}");
        let output = n.normalize(&blob);
        assert_exactly_once(&output);
        assert!(output.starts_with("**Symptoms**"));
    }

    #[test]
    fn test_inline_markers_are_neutralized() {
        let n = normalizer();
        let input = "See **Recommendations** below. Also ****Next Steps**** matter.";
        let output = n.normalize(input);
        assert_exactly_once(&output);
        assert!(output.contains("- See Recommendations below. Also Next Steps matter."));
    }

    #[test]
    fn test_primary_title_from_first_primary_header() {
        let n = normalizer();
        let output = n.normalize("**Information**\n- a\n**Symptoms**\n- b");
        assert!(output.starts_with("**Information**\n- a\n- b"));
        assert!(!output.contains(SYMPTOMS_MARKER));
    }

    #[test]
    fn test_rules_and_bare_dashes_are_dropped() {
        let n = normalizer();
        let output = n.normalize("**Information**\n---\n-\n- - real point\n");
        assert!(output.starts_with("**Information**\n- real point\n\n"));
    }

    #[test]
    fn test_idempotent_across_shapes() {
        let n = normalizer();
        let inputs = [
            "",
            "just one line",
            "a\n\nb\n\nc",
            "**Recommendations**\n- x",
            "## Symptoms\n* y\n\n**Information**\n- z",
            "**Information** inline text\n**Next Steps**",
            "**Information**\n**Recommendations**\n**Medical Disclaimer**\n**Next Steps**\n**Next Steps**",
        ];
        for input in inputs {
            let once = n.normalize(input);
            assert_exactly_once(&once);
            assert_eq!(n.normalize(&once), once, "input: {input:?}");
        }
    }

    #[test]
    fn test_canonical_check_requires_standalone_lines() {
        assert!(is_canonical(CANONICAL_SYMPTOMS));
        assert!(!is_canonical("**Information** text\n**Recommendations**\n**Medical Disclaimer**\n**Next Steps**"));
        assert!(!is_canonical(
            "**Information**\n**Symptoms**\n**Recommendations**\n**Medical Disclaimer**\n**Next Steps**"
        ));
    }
}
