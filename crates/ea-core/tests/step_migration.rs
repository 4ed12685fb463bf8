//! Integration tests: free-text reproduction steps → structured steps.

use ea_core::steps::{ParseStrategy, StepRule, parse_steps};
use ea_core::{
    DefectId, MigrationRequest, ParsedStep, auto_parse_steps, preview_migration, validate_parsed_steps,
};
use pretty_assertions::assert_eq;

fn descriptions(steps: &[ParsedStep]) -> Vec<&str> {
    steps.iter().map(|s| s.description.as_str()).collect()
}

fn sequences(steps: &[ParsedStep]) -> Vec<u32> {
    steps.iter().map(|s| s.sequence).collect()
}

// ─── Strategies on realistic input ──────────────────────────────────────

#[test]
fn numbered_report_with_header_and_continuation() {
    let parse = parse_steps(include_str!("fixtures/numbered_repro.txt"));
    assert_eq!(parse.strategy, Some(ParseStrategy::Numbered));
    assert_eq!(
        descriptions(&parse.steps),
        vec![
            "Steps to reproduce:",
            "Log in as an architect",
            "Open the \"Payments\" model and wait for the canvas to load",
            "Drag the Ledger database onto the API service",
            "Release the mouse",
        ]
    );
    assert_eq!(sequences(&parse.steps), vec![1, 2, 3, 4, 5]);
}

#[test]
fn bulleted_report_mixes_glyphs() {
    let parse = parse_steps(include_str!("fixtures/bulleted_repro.txt"));
    assert_eq!(parse.strategy, Some(ParseStrategy::Bulleted));
    assert_eq!(
        descriptions(&parse.steps),
        vec![
            "Open the model list",
            "Select \"Core Banking\" (it may take a while)",
            "Press Delete",
        ]
    );
}

#[test]
fn prose_report_splits_into_sentences() {
    let parse = parse_steps(include_str!("fixtures/prose_repro.txt"));
    assert_eq!(parse.strategy, Some(ParseStrategy::Sentences));
    assert_eq!(
        descriptions(&parse.steps),
        vec![
            "Open the canvas.",
            "Zoom in twice!",
            "Does the label still render?",
            "It does not.",
        ]
    );
}

// ─── Parser properties ──────────────────────────────────────────────────

#[test]
fn every_parse_is_contiguous_and_non_blank() {
    let inputs = [
        include_str!("fixtures/numbered_repro.txt"),
        include_str!("fixtures/bulleted_repro.txt"),
        include_str!("fixtures/prose_repro.txt"),
        "just one line",
        "1. only\n",
    ];
    for input in inputs {
        let steps = auto_parse_steps(input);
        let expected: Vec<u32> = (1..=steps.len() as u32).collect();
        assert_eq!(sequences(&steps), expected, "input {input:?}");
        assert!(
            steps.iter().all(|s| !s.description.trim().is_empty()),
            "blank step from {input:?}"
        );
        assert!(validate_parsed_steps(&steps).is_valid, "input {input:?}");
    }
}

#[test]
fn blank_input_yields_nothing() {
    assert!(auto_parse_steps("").is_empty());
    assert!(auto_parse_steps(" \n\t \n").is_empty());
}

#[test]
fn single_line_falls_back_to_whole_text() {
    assert_eq!(
        auto_parse_steps("  Canvas freezes on load  "),
        vec![ParsedStep::new(1, "Canvas freezes on load")]
    );
}

// ─── Migration flow ─────────────────────────────────────────────────────

#[test]
fn preview_then_execute_keeps_order() {
    let text = include_str!("fixtures/bulleted_repro.txt");
    let preview = preview_migration(text);
    assert!(preview.validation.is_valid);

    let defect = DefectId::intern("DEF-1042");
    let outcome = MigrationRequest {
        steps: preview.steps.clone(),
        original_text: text.to_string(),
    }
    .into_outcome(defect);
    assert!(outcome.validation.is_valid);
    assert_eq!(outcome.steps.len(), 3);
    assert!(outcome.steps.iter().all(|s| s.defect_id == defect));
    assert_eq!(outcome.steps[2].description, "Press Delete");
}

#[test]
fn hand_edited_steps_are_persisted_with_findings() {
    let edited = vec![
        ParsedStep::new(2, "Open the model"),
        ParsedStep::new(1, "Log in"),
        ParsedStep::new(2, "  "),
        ParsedStep::new(5, "Drag"),
    ];
    let outcome = MigrationRequest {
        steps: edited,
        original_text: "Log in and open the model, then drag.".into(),
    }
    .into_outcome(DefectId::intern("DEF-7"));

    assert!(!outcome.validation.is_valid);
    assert!(outcome.validation.has(StepRule::EmptyDescription));
    assert!(outcome.validation.has(StepRule::DuplicateSequence));
    assert!(outcome.validation.has(StepRule::NonContiguous));
    // Permissive: every row is kept, ordered by sequence.
    let seqs: Vec<u32> = outcome.steps.iter().map(|s| s.sequence).collect();
    assert_eq!(seqs, vec![1, 2, 2, 5]);
}

#[test]
fn preview_payload_is_camel_case_json() {
    let preview = preview_migration("1. a\n2. b");
    let json = serde_json::to_value(&preview).unwrap();
    assert_eq!(json["validation"]["isValid"], serde_json::Value::Bool(true));
    assert_eq!(json["steps"][1]["sequence"], serde_json::json!(2));
    assert_eq!(json["strategy"], serde_json::json!("numbered"));
}
