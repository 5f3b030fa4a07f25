//! Parsing of free-text model replies.
//!
//! Models return prose, fenced code, or loosely formatted issue lists. This
//! module is the one place that turns those replies into typed values; it never
//! fails, it skips what it cannot read.

use crate::quality::{AestheticFinding, Severity};

/// Words in a problem description that make an aesthetic finding high severity.
const HIGH_SEVERITY_WORDS: [&str; 3] = ["overlap", "cover", "unreadable"];

/// Phrases a vision model uses to report a clean frame.
const NO_ISSUE_PHRASES: [&str; 2] = ["no issues detected", "no aesthetic issues detected"];

/// A fenced block found in a reply.
struct FencedBlock<'a> {
    lang: &'a str,
    body: &'a str,
}

fn fenced_blocks(text: &str) -> Vec<FencedBlock<'_>> {
    let mut blocks = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find("```") {
        let after_ticks = &rest[open + 3..];
        let (lang, body_start) = match after_ticks.find('\n') {
            Some(nl) => (after_ticks[..nl].trim(), &after_ticks[nl + 1..]),
            None => (after_ticks.trim(), ""),
        };

        match body_start.find("```") {
            Some(close) => {
                blocks.push(FencedBlock { lang, body: &body_start[..close] });
                rest = &body_start[close + 3..];
            }
            None => {
                // Unterminated fence: the model was cut off mid-block.
                blocks.push(FencedBlock { lang, body: body_start });
                break;
            }
        }
    }

    blocks
}

/// Extract program text from a reply, dropping code fences and surrounding prose.
///
/// A block tagged `python`/`py` wins over other fenced blocks; without any
/// fence the whole reply is the program.
pub fn strip_code_fences(reply: &str) -> String {
    let blocks = fenced_blocks(reply);

    let chosen = blocks
        .iter()
        .find(|b| matches!(b.lang.to_lowercase().as_str(), "python" | "py" | "python3"))
        .or_else(|| blocks.first());

    match chosen {
        Some(block) => block.body.trim().to_string(),
        None => reply.trim().to_string(),
    }
}

/// True when the reply states that the frame has no issues.
pub fn is_no_issues(reply: &str) -> bool {
    let lower = reply.to_lowercase();
    NO_ISSUE_PHRASES.iter().any(|p| lower.contains(p))
}

/// Severity of an aesthetic problem, inferred from its wording.
pub fn infer_severity(problem: &str) -> Severity {
    let lower = problem.to_lowercase();
    if HIGH_SEVERITY_WORDS.iter().any(|w| lower.contains(w)) {
        Severity::High
    } else {
        Severity::Medium
    }
}

fn strip_list_marker(line: &str) -> &str {
    let line = line.trim();
    let line = line
        .strip_prefix("- ")
        .or_else(|| line.strip_prefix("* "))
        .or_else(|| line.strip_prefix("• "))
        .unwrap_or(line);

    // "1. " / "2) "
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let after = &line[digits..];
        if let Some(stripped) = after.strip_prefix(". ").or_else(|| after.strip_prefix(") ")) {
            return stripped.trim_start();
        }
    }
    line
}

fn clean_field(field: &str) -> String {
    field
        .trim()
        .trim_matches(|c| matches!(c, '[' | ']' | '*' | '`' | '"'))
        .trim()
        .to_string()
}

/// Parse one `element - problem - fix` line.
pub fn parse_finding_line(line: &str) -> Option<(String, String, String)> {
    let line = strip_list_marker(line);
    let parts: Vec<&str> = line.split(" - ").collect();
    if parts.len() < 3 {
        return None;
    }

    let element = clean_field(parts[0]);
    let problem = clean_field(parts[1]);
    let fix = clean_field(&parts[2..].join(" - "));

    if element.is_empty() || problem.is_empty() {
        return None;
    }
    Some((element, problem, fix))
}

/// Parse a vision reply for one frame into findings.
pub fn parse_findings(reply: &str, frame_index: u64) -> Vec<AestheticFinding> {
    if is_no_issues(reply) {
        return Vec::new();
    }

    reply
        .lines()
        .filter_map(parse_finding_line)
        .map(|(element, problem, remedy)| AestheticFinding {
            frame_index,
            severity: infer_severity(&problem),
            element,
            problem,
            remedy,
        })
        .collect()
}
