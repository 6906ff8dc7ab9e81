//! Tag normalization, merging, and policy validation
//!
//! Websites disagree on how many tags they want and how they count them
//! (cardinality vs. total joined length), so this module only flags limit
//! overruns as warnings; each adapter decides whether its site truncates
//! or rejects. Too few tags is always blocking.

use crate::types::ValidationReport;

/// Characters never allowed inside a tag, stripped during normalization.
pub const ILLEGAL_TAG_CHARACTERS: &[char] = &[
    '"', ';', '\\', '[', ']', '{', '}', '|', '!', '@', '$', '%', '^', '&', '*', '+', '=', '<',
    '>', '`', '~',
];

/// How a [`TagPolicy`] upper limit is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagLimitMode {
    /// Limit counts tags
    Count,
    /// Limit counts characters of the tags joined with ", "
    JoinedLength,
}

/// One website's tag constraints.
#[derive(Debug, Clone)]
pub struct TagPolicy {
    pub min_count: usize,
    pub max_count: Option<usize>,
    pub mode: TagLimitMode,
    pub max_length: Option<usize>,
}

impl TagPolicy {
    pub fn counted(min_count: usize, max_count: Option<usize>) -> Self {
        Self {
            min_count,
            max_count,
            mode: TagLimitMode::Count,
            max_length: None,
        }
    }

    pub fn joined(min_count: usize, max_length: usize) -> Self {
        Self {
            min_count,
            max_count: None,
            mode: TagLimitMode::JoinedLength,
            max_length: Some(max_length),
        }
    }
}

/// Strip illegal characters, trim whitespace, drop tags emptied by the
/// cleanup, and remove exact duplicates (case-sensitive) while preserving
/// first-seen order.
pub fn normalize(raw: &[String]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::with_capacity(raw.len());
    for tag in raw {
        let cleaned: String = tag
            .chars()
            .filter(|c| !ILLEGAL_TAG_CHARACTERS.contains(c))
            .collect();
        let cleaned = cleaned.trim().to_string();
        if cleaned.is_empty() {
            continue;
        }
        if !seen.contains(&cleaned) {
            seen.push(cleaned);
        }
    }
    seen
}

/// Combine a submission's own tags with website-independent defaults.
///
/// Returns `own` alone when `extend` is false; otherwise `own` followed by
/// `defaults`, deduplicated.
pub fn merge(own: &[String], defaults: &[String], extend: bool) -> Vec<String> {
    if !extend {
        return own.to_vec();
    }
    let mut merged = own.to_vec();
    for tag in defaults {
        if !merged.contains(tag) {
            merged.push(tag.clone());
        }
    }
    merged
}

/// Check an effective tag list against a website's policy.
pub fn validate(tags: &[String], policy: &TagPolicy) -> ValidationReport {
    let mut report = ValidationReport::new();

    if tags.len() < policy.min_count {
        report.problem(format!(
            "Requires at least {} tag{}.",
            policy.min_count,
            if policy.min_count == 1 { "" } else { "s" }
        ));
    }

    match policy.mode {
        TagLimitMode::Count => {
            if let Some(max) = policy.max_count {
                if tags.len() > max {
                    report.warning(format!(
                        "Provided {} tags, but only {} will be used.",
                        tags.len(),
                        max
                    ));
                }
            }
        }
        TagLimitMode::JoinedLength => {
            if let Some(max) = policy.max_length {
                let joined_len = joined_length(tags);
                if joined_len > max {
                    report.warning(format!(
                        "Tags take up {} characters, over the {} character limit; they may be truncated.",
                        joined_len, max
                    ));
                }
            }
        }
    }

    report
}

/// Replace spaces inside each tag, for sites whose tag field treats
/// whitespace as a delimiter.
pub fn replace_spaces(tags: &[String], replacer: &str) -> Vec<String> {
    tags.iter().map(|t| t.replace(' ', replacer)).collect()
}

fn joined_length(tags: &[String]) -> usize {
    if tags.is_empty() {
        return 0;
    }
    let chars: usize = tags.iter().map(|t| t.chars().count()).sum();
    chars + (tags.len() - 1) * 2 // ", " separators
}
