//! Freeform reproduction text → ordered, numbered steps.
//!
//! Strategies run in strict precedence and the first one yielding at least
//! two steps wins:
//!
//! | # | Strategy  | Line marker                                   |
//! |---|-----------|-----------------------------------------------|
//! | 1 | Numbered  | `3.` `3)` `3:` `3-` or `Step 3:` (any case)   |
//! | 2 | Bulleted  | `-` `*` `•` `◦` `▪` `▫`                       |
//! | 3 | Sentences | split after `.` `!` `?` followed by whitespace |
//! | 4 | Fallback  | whole input as step 1                         |
//!
//! A line strategy applies only when at least one line carries its marker.
//! An unmarked line then continues the previous step, and an unmarked
//! first line seeds step 1. Sequence numbers are always
//! reassigned `1..=N` in source order, whatever numbers the text used.
//!
//! Validation is advisory: `validate_parsed_steps` reports problems but
//! never rewrites the steps.

use crate::id::DefectId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use winnow::ascii::{Caseless, space0, space1};
use winnow::combinator::opt;
use winnow::prelude::*;
use winnow::token::{literal, one_of, take_while};

/// One reproduction step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedStep {
    pub sequence: u32,
    pub description: String,
}

impl ParsedStep {
    pub fn new(sequence: u32, description: impl Into<String>) -> Self {
        Self {
            sequence,
            description: description.into(),
        }
    }
}

/// Which strategy produced a parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseStrategy {
    Numbered,
    Bulleted,
    Sentences,
    Fallback,
}

/// Steps plus the strategy that won. `strategy` is `None` for blank input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepParse {
    pub steps: Vec<ParsedStep>,
    pub strategy: Option<ParseStrategy>,
}

// ─── Public API ───────────────────────────────────────────────────────────

/// Parse text into steps, discarding which strategy won.
#[must_use]
pub fn auto_parse_steps(text: &str) -> Vec<ParsedStep> {
    parse_steps(text).steps
}

/// Parse text into steps using the first strategy that finds two or more.
///
/// When none reaches two, a line strategy that found exactly one marked
/// step supplies it. Otherwise the text is a single fragment and the parse
/// is reported as `Fallback`.
#[must_use]
pub fn parse_steps(text: &str) -> StepParse {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return StepParse {
            steps: Vec::new(),
            strategy: None,
        };
    }

    let sentences = split_sentences(trimmed);
    let candidates = [
        (ParseStrategy::Numbered, parse_numbered(trimmed)),
        (ParseStrategy::Bulleted, parse_bulleted(trimmed)),
        (ParseStrategy::Sentences, sentences.clone()),
    ];

    let winner = candidates.iter().find(|(_, steps)| steps.len() >= 2).or_else(|| {
        candidates
            .iter()
            .find(|(strategy, steps)| *strategy != ParseStrategy::Sentences && steps.len() == 1)
    });

    match winner {
        Some((strategy, steps)) => {
            log::debug!("parsed {} step(s) with {strategy:?} strategy", steps.len());
            StepParse {
                steps: steps.clone(),
                strategy: Some(*strategy),
            }
        }
        None => {
            let steps = match sentences.as_slice() {
                [single] => vec![single.clone()],
                _ => vec![ParsedStep::new(1, trimmed)],
            };
            StepParse {
                steps,
                strategy: Some(ParseStrategy::Fallback),
            }
        }
    }
}

/// Numbered-list strategy.
#[must_use]
pub fn parse_numbered(text: &str) -> Vec<ParsedStep> {
    collect_marked_lines(text, numbered_marker)
}

/// Bullet-list strategy.
#[must_use]
pub fn parse_bulleted(text: &str) -> Vec<ParsedStep> {
    collect_marked_lines(text, bullet_marker)
}

/// Sentence-splitting strategy.
#[must_use]
pub fn split_sentences(text: &str) -> Vec<ParsedStep> {
    let mut fragments = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?')
            && chars.peek().is_some_and(|(_, next)| next.is_whitespace())
        {
            let end = i + c.len_utf8();
            fragments.push(&text[start..end]);
            start = end;
        }
    }
    fragments.push(&text[start..]);

    let descriptions = fragments
        .into_iter()
        .map(|f| normalize_whitespace(strip_marker(f.trim())))
        .filter(|f| !f.is_empty());
    number(descriptions)
}

// ─── Line markers ─────────────────────────────────────────────────────────

fn numbered_marker(input: &mut &str) -> ModalResult<()> {
    (
        opt(step_keyword),
        take_while(1.., |c: char| c.is_ascii_digit()),
        one_of(['.', ')', ':', '-']),
        space0,
    )
        .void()
        .parse_next(input)
}

fn step_keyword(input: &mut &str) -> ModalResult<()> {
    (literal(Caseless("step")), space1).void().parse_next(input)
}

fn bullet_marker(input: &mut &str) -> ModalResult<()> {
    (one_of(['-', '*', '•', '◦', '▪', '▫']), space0)
        .void()
        .parse_next(input)
}

/// Remove one leading numbering or bullet artifact, if any.
fn strip_marker(fragment: &str) -> &str {
    let markers: [fn(&mut &str) -> ModalResult<()>; 2] = [numbered_marker, bullet_marker];
    for marker in markers {
        let mut rest = fragment;
        if marker(&mut rest).is_ok() {
            return rest.trim_start();
        }
    }
    fragment
}

fn collect_marked_lines(text: &str, mut marker: impl FnMut(&mut &str) -> ModalResult<()>) -> Vec<ParsedStep> {
    let mut descriptions: Vec<String> = Vec::new();
    let mut any_marked = false;
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut rest = line;
        let marked = marker(&mut rest).is_ok() && !rest.trim().is_empty();
        if marked {
            any_marked = true;
            descriptions.push(rest.trim().to_string());
        } else if let Some(last) = descriptions.last_mut() {
            last.push(' ');
            last.push_str(line);
        } else {
            descriptions.push(line.to_string());
        }
    }
    if !any_marked {
        return Vec::new();
    }
    number(descriptions)
}

fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn number(descriptions: impl IntoIterator<Item = String>) -> Vec<ParsedStep> {
    descriptions
        .into_iter()
        .zip(1u32..)
        .map(|(description, sequence)| ParsedStep {
            sequence,
            description,
        })
        .collect()
}

// ─── Validation ───────────────────────────────────────────────────────────

/// Rule identifiers of validation findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepRule {
    NoSteps,
    EmptyDescription,
    DuplicateSequence,
    NonContiguous,
}

/// A single validation finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepIssue {
    pub rule: StepRule,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepValidation {
    pub is_valid: bool,
    pub errors: Vec<StepIssue>,
}

impl StepValidation {
    pub fn has(&self, rule: StepRule) -> bool {
        self.errors.iter().any(|e| e.rule == rule)
    }
}

/// Check parsed (or user-edited) steps. Advisory only.
#[must_use]
pub fn validate_parsed_steps(steps: &[ParsedStep]) -> StepValidation {
    let mut errors = Vec::new();
    if steps.is_empty() {
        errors.push(StepIssue {
            rule: StepRule::NoSteps,
            message: "No steps were found.".into(),
            sequence: None,
        });
    }
    check_descriptions(steps, &mut errors);
    check_duplicates(steps, &mut errors);
    check_contiguous(steps, &mut errors);
    StepValidation {
        is_valid: errors.is_empty(),
        errors,
    }
}

fn check_descriptions(steps: &[ParsedStep], errors: &mut Vec<StepIssue>) {
    for step in steps.iter().filter(|s| s.description.trim().is_empty()) {
        errors.push(StepIssue {
            rule: StepRule::EmptyDescription,
            message: format!("Step {} has an empty description.", step.sequence),
            sequence: Some(step.sequence),
        });
    }
}

fn check_duplicates(steps: &[ParsedStep], errors: &mut Vec<StepIssue>) {
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    for step in steps {
        if !seen.insert(step.sequence) && reported.insert(step.sequence) {
            errors.push(StepIssue {
                rule: StepRule::DuplicateSequence,
                message: format!("Sequence number {} is used more than once.", step.sequence),
                sequence: Some(step.sequence),
            });
        }
    }
}

fn check_contiguous(steps: &[ParsedStep], errors: &mut Vec<StepIssue>) {
    let mut sequences: Vec<u32> = steps.iter().map(|s| s.sequence).collect();
    sequences.sort_unstable();
    let first_gap = sequences
        .iter()
        .zip(1u32..)
        .find(|(actual, expected)| **actual != *expected);
    if let Some((actual, expected)) = first_gap {
        errors.push(StepIssue {
            rule: StepRule::NonContiguous,
            message: format!(
                "Step sequence must run 1..={} without gaps; expected {expected}, found {actual}.",
                steps.len()
            ),
            sequence: Some(*actual),
        });
    }
}

// ─── Migration payloads ───────────────────────────────────────────────────

/// Response of `preview-migration`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationPreview {
    pub steps: Vec<ParsedStep>,
    pub validation: StepValidation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<ParseStrategy>,
}

/// Parse and validate without persisting anything.
#[must_use]
pub fn preview_migration(text: &str) -> MigrationPreview {
    let parse = parse_steps(text);
    let validation = validate_parsed_steps(&parse.steps);
    MigrationPreview {
        steps: parse.steps,
        validation,
        strategy: parse.strategy,
    }
}

/// Body of `execute-migration`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationRequest {
    pub steps: Vec<ParsedStep>,
    pub original_text: String,
}

/// A persisted structured step of a defect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefectStep {
    pub defect_id: DefectId,
    pub sequence: u32,
    pub description: String,
}

/// Result of `execute-migration`. Invalid steps are persisted as given;
/// the validation travels along so the caller can show what was accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationOutcome {
    pub steps: Vec<DefectStep>,
    pub validation: StepValidation,
}

impl MigrationRequest {
    /// Convert to persisted rows ordered by sequence (stable for ties).
    pub fn into_outcome(self, defect_id: DefectId) -> MigrationOutcome {
        let validation = validate_parsed_steps(&self.steps);
        let mut steps: Vec<DefectStep> = self
            .steps
            .into_iter()
            .map(|s| DefectStep {
                defect_id,
                sequence: s.sequence,
                description: s.description.trim().to_string(),
            })
            .collect();
        steps.sort_by_key(|s| s.sequence);
        MigrationOutcome { steps, validation }
    }
}

/// Persist-ready rows for `defect`. Invalid steps are kept and reported.
pub fn execute_migration(defect: DefectId, request: MigrationRequest) -> MigrationOutcome {
    request.into_outcome(defect)
}
