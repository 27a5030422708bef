use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use super::document::FlowDocument;

static SCREEN_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_]+$").expect("valid regex"));

/// Problems the provider would reject, found without a network round trip.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FlowIssue {
    EmptyDocument,
    InvalidScreenId { screen: String },
    DuplicateScreenId { screen: String },
    DuplicateBlockId { screen: String, block: String },
    EmptyOptions { screen: String, block: String },
}

impl std::fmt::Display for FlowIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlowIssue::EmptyDocument => write!(f, "flow has no screens"),
            FlowIssue::InvalidScreenId { screen } => {
                write!(f, "screen id `{screen}` may only contain letters and underscores")
            }
            FlowIssue::DuplicateScreenId { screen } => write!(f, "screen id `{screen}` is used twice"),
            FlowIssue::DuplicateBlockId { screen, block } => {
                write!(f, "block id `{block}` is used twice on screen `{screen}`")
            }
            FlowIssue::EmptyOptions { screen, block } => {
                write!(f, "block `{block}` on screen `{screen}` has no options")
            }
        }
    }
}

pub fn is_valid_screen_id(id: &str) -> bool {
    SCREEN_ID.is_match(id)
}

/// Lists every issue in document order; an empty list means the document is clean.
pub fn validate(document: &FlowDocument) -> Vec<FlowIssue> {
    let mut issues = Vec::new();
    if document.is_empty() {
        issues.push(FlowIssue::EmptyDocument);
        return issues;
    }

    let mut screen_ids = HashSet::new();
    for screen in document.screens() {
        if !is_valid_screen_id(&screen.id) {
            issues.push(FlowIssue::InvalidScreenId {
                screen: screen.id.clone(),
            });
        }
        if !screen_ids.insert(screen.id.as_str()) {
            issues.push(FlowIssue::DuplicateScreenId {
                screen: screen.id.clone(),
            });
        }

        let mut block_ids = HashSet::new();
        for block in &screen.blocks {
            if !block_ids.insert(block.id.as_str()) {
                issues.push(FlowIssue::DuplicateBlockId {
                    screen: screen.id.clone(),
                    block: block.id.clone(),
                });
            }
            if block.kind.has_options() && block.options.is_empty() {
                issues.push(FlowIssue::EmptyOptions {
                    screen: screen.id.clone(),
                    block: block.id.clone(),
                });
            }
        }
    }
    issues
}
