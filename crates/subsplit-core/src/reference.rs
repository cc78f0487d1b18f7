//! Push reference classification.

use derive_more::Display;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static TAG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"refs/tags/(.+)$").expect("valid tag pattern"));

static HEAD_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"refs/heads/(.+)$").expect("valid head pattern"));

/// What a push asks the split tool to publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(tag = "kind", content = "name", rename_all = "lowercase")]
pub enum SplitInstruction {
    /// Publish a single tag.
    #[display("tag {_0}")]
    Tag(String),
    /// Publish a single branch.
    #[display("branch {_0}")]
    Head(String),
}

/// Classify a push reference.
///
/// The tag pattern is tried before the head pattern and the first match
/// wins. Returns `None` for any other reference shape (pull request refs,
/// notes, bare names).
pub fn classify(reference: &str) -> Option<SplitInstruction> {
    if let Some(caps) = TAG_PATTERN.captures(reference) {
        return Some(SplitInstruction::Tag(caps[1].to_string()));
    }
    if let Some(caps) = HEAD_PATTERN.captures(reference) {
        return Some(SplitInstruction::Head(caps[1].to_string()));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_tag() {
        assert_eq!(
            classify("refs/tags/v1.2.0"),
            Some(SplitInstruction::Tag("v1.2.0".to_string()))
        );
    }

    #[test]
    fn test_classify_head() {
        assert_eq!(
            classify("refs/heads/main"),
            Some(SplitInstruction::Head("main".to_string()))
        );
    }

    #[test]
    fn test_classify_keeps_slashes_in_name() {
        assert_eq!(
            classify("refs/heads/feature/split-tool"),
            Some(SplitInstruction::Head("feature/split-tool".to_string()))
        );
        assert_eq!(
            classify("refs/tags/release/2.0"),
            Some(SplitInstruction::Tag("release/2.0".to_string()))
        );
    }

    #[test]
    fn test_classify_rejects_other_shapes() {
        for reference in [
            "refs/pull/3/merge",
            "refs/notes/commits",
            "main",
            "",
            "refs/heads/",
            "refs/tags/",
            "REFS/HEADS/main",
        ] {
            assert_eq!(classify(reference), None, "reference {reference:?}");
        }
    }

    #[test]
    fn test_tag_takes_precedence() {
        assert_eq!(
            classify("refs/heads/refs/tags/v1"),
            Some(SplitInstruction::Tag("v1".to_string()))
        );
    }

    #[test]
    fn test_instruction_display() {
        assert_eq!(SplitInstruction::Tag("v1".into()).to_string(), "tag v1");
        assert_eq!(SplitInstruction::Head("main".into()).to_string(), "branch main");
    }
}
