//! Split sets, workspace naming and publish filters.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::SplitInstruction;

/// Length of a workspace directory name, in hex characters.
pub const WORKSPACE_NAME_LEN: usize = 32;

/// Ordered list of split targets handed to `git subsplit publish`.
///
/// Each entry is a path specifier such as `src/Foo:git@host:org/foo.git`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SplitSet(Vec<String>);

impl SplitSet {
    pub fn new(targets: Vec<String>) -> Self {
        Self(targets)
    }

    pub fn targets(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// All targets as one space separated publish expression.
    pub fn joined(&self) -> String {
        self.0.join(" ")
    }

    /// Directory name for this split set: hex of the joined expression,
    /// cut to [`WORKSPACE_NAME_LEN`] characters.
    ///
    /// Shorter expressions keep their full hex encoding. The name depends on
    /// target order, so `[a, b]` and `[b, a]` get different workspaces.
    pub fn workspace_name(&self) -> String {
        let mut name = hex::encode(self.joined());
        name.truncate(WORKSPACE_NAME_LEN);
        name
    }

    pub fn workspace_path(&self, working_dir: &Path) -> PathBuf {
        working_dir.join(self.workspace_name())
    }

    /// Workspace for the target at `index` when targets are split one by
    /// one: the whole-set name suffixed with the index.
    ///
    /// Truncated hex names collide for targets sharing a 16-byte prefix, and
    /// for repeated entries, so the single-target set's own name is not used.
    pub fn target_workspace_path(&self, working_dir: &Path, index: usize) -> PathBuf {
        working_dir.join(format!("{}-{}", self.workspace_name(), index))
    }

    /// One single-target set per entry, used for per-target splitting.
    pub fn singletons(&self) -> impl Iterator<Item = SplitSet> + '_ {
        self.0.iter().map(|target| SplitSet(vec![target.clone()]))
    }
}

impl From<Vec<String>> for SplitSet {
    fn from(targets: Vec<String>) -> Self {
        Self(targets)
    }
}

impl From<&[&str]> for SplitSet {
    fn from(targets: &[&str]) -> Self {
        Self(targets.iter().map(|t| t.to_string()).collect())
    }
}

/// The heads/tags filter pair passed to `git subsplit publish`.
///
/// Exactly one side is active; the other is disabled with `--no-heads` or
/// `--no-tags`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishFilters {
    pub heads: Option<String>,
    pub tags: Option<String>,
}

impl PublishFilters {
    pub fn heads_arg(&self) -> String {
        match &self.heads {
            Some(name) => format!("--heads={}", name),
            None => "--no-heads".to_string(),
        }
    }

    pub fn tags_arg(&self) -> String {
        match &self.tags {
            Some(name) => format!("--tags={}", name),
            None => "--no-tags".to_string(),
        }
    }

    pub fn args(&self) -> [String; 2] {
        [self.heads_arg(), self.tags_arg()]
    }
}

impl From<&SplitInstruction> for PublishFilters {
    fn from(instruction: &SplitInstruction) -> Self {
        match instruction {
            SplitInstruction::Head(name) => Self {
                heads: Some(name.clone()),
                tags: None,
            },
            SplitInstruction::Tag(name) => Self {
                heads: None,
                tags: Some(name.clone()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(targets: &[&str]) -> SplitSet {
        SplitSet::from(targets)
    }

    #[test]
    fn test_workspace_name_is_hex_of_joined_targets() {
        let split = set(&["pkgA", "pkgB"]);
        assert_eq!(split.joined(), "pkgA pkgB");
        assert_eq!(split.workspace_name(), hex::encode("pkgA pkgB"));
    }

    #[test]
    fn test_workspace_name_is_truncated() {
        let split = set(&["src/Component/Console:git@github.com:acme/console.git"]);
        let name = split.workspace_name();
        assert_eq!(name.len(), WORKSPACE_NAME_LEN);
        assert!(hex::encode(split.joined()).starts_with(&name));
    }

    #[test]
    fn test_workspace_path_is_deterministic() {
        let root = Path::new("/var/lib/subsplit");
        let a = set(&["src/A:git@x:a.git", "src/B:git@x:b.git"]);
        let b = set(&["src/A:git@x:a.git", "src/B:git@x:b.git"]);
        assert_eq!(a.workspace_path(root), b.workspace_path(root));
        assert!(a.workspace_path(root).starts_with(root));
    }

    #[test]
    fn test_workspace_path_is_order_sensitive() {
        let root = Path::new("/tmp");
        assert_ne!(
            set(&["pkgA", "pkgB"]).workspace_path(root),
            set(&["pkgB", "pkgA"]).workspace_path(root)
        );
    }

    #[test]
    fn test_target_workspaces_are_distinct() {
        let root = Path::new("/w");
        let split = set(&[
            "src/Component/Console:git@x:console.git",
            "src/Component/Container:git@x:container.git",
            "src/Component/Console:git@x:console.git",
        ]);

        let paths: Vec<_> = (0..split.len())
            .map(|i| split.target_workspace_path(root, i))
            .collect();

        assert_eq!(
            paths[0],
            root.join(format!("{}-0", split.workspace_name()))
        );
        assert_ne!(paths[0], paths[1]);
        assert_ne!(paths[0], paths[2]);
        assert_ne!(paths[1], paths[2]);
        assert!(paths.iter().all(|p| *p != split.workspace_path(root)));
    }

    #[test]
    fn test_singletons() {
        let split = set(&["a", "b", "c"]);
        let singles: Vec<_> = split.singletons().collect();
        assert_eq!(singles.len(), 3);
        assert_eq!(singles[1].targets(), ["b".to_string()]);
    }

    #[test]
    fn test_head_instruction_activates_heads_only() {
        let filters = PublishFilters::from(&SplitInstruction::Head("main".into()));
        assert_eq!(filters.args(), ["--heads=main".to_string(), "--no-tags".to_string()]);
    }

    #[test]
    fn test_tag_instruction_activates_tags_only() {
        let filters = PublishFilters::from(&SplitInstruction::Tag("v2.1".into()));
        assert_eq!(filters.args(), ["--no-heads".to_string(), "--tags=v2.1".to_string()]);
    }

    #[test]
    fn test_exactly_one_filter_active() {
        for instruction in [
            SplitInstruction::Head("dev".into()),
            SplitInstruction::Tag("v1".into()),
        ] {
            let filters = PublishFilters::from(&instruction);
            assert!(filters.heads.is_some() ^ filters.tags.is_some());
        }
    }
}
