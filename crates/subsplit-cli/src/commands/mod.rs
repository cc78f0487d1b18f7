//! CLI command implementations.

pub mod queue;

use anyhow::Result;
use std::io::Write;
use std::path::Path;

pub fn validate(path: &Path, out: &mut impl Write) -> Result<()> {
    let config = subsplit_config::load_config(path)?;
    writeln!(out, "Configuration is valid")?;
    writeln!(out, "  repository: {}", config.url)?;
    writeln!(out, "  splits:     {}", config.splits.len())?;
    writeln!(
        out,
        "  workspace:  {}",
        config
            .split_set()
            .workspace_path(&config.working_directory)
            .display()
    )?;
    writeln!(
        out,
        "  notify:     {}",
        if config.notifications_enabled() {
            "enabled"
        } else {
            "disabled"
        }
    )?;
    Ok(())
}

pub fn classify(reference: &str, out: &mut impl Write) -> Result<()> {
    match subsplit_core::classify(reference) {
        Some(instruction) => writeln!(out, "{}", instruction)?,
        None => writeln!(out, "invalid reference: {}", reference)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(f: impl FnOnce(&mut Vec<u8>) -> Result<()>) -> String {
        let mut out = Vec::new();
        f(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_classify_output() {
        assert_eq!(
            output(|out| classify("refs/tags/v1.2.0", out)),
            "tag v1.2.0\n"
        );
        assert_eq!(
            output(|out| classify("refs/heads/main", out)),
            "branch main\n"
        );
        assert_eq!(
            output(|out| classify("refs/pull/3/merge", out)),
            "invalid reference: refs/pull/3/merge\n"
        );
    }

    #[test]
    fn test_validate_good_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{
                "working-directory": "/tmp/work",
                "url": "git@example.com:mono.git",
                "splits": ["pkgA", "pkgB"],
                "redis": {"host": "localhost:6379", "prefix": "t"}
            }"#,
        )
        .unwrap();

        let text = output(|out| validate(&path, out));
        assert!(text.starts_with("Configuration is valid"));
        assert!(text.contains("splits:     2"));
        assert!(text.contains("notify:     disabled"));
    }

    #[test]
    fn test_validate_rejects_missing_splits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"working-directory": "/tmp/work", "url": "x", "splits": []}"#,
        )
        .unwrap();

        let mut out = Vec::new();
        assert!(validate(&path, &mut out).is_err());
        assert!(out.is_empty());
    }

    #[test]
    fn test_validate_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut out = Vec::new();
        assert!(validate(&dir.path().join("absent.json"), &mut out).is_err());
    }
}
