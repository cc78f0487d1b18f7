//! Queue inspection and recovery commands.

use anyhow::{Context, Result, bail};
use std::io::Write;
use std::path::Path;
use subsplit_core::JobPayload;
use subsplit_core::queue::JobQueue;
use tracing::info;

pub async fn status(queue: &dyn JobQueue, out: &mut impl Write) -> Result<()> {
    let stats = queue.stats().await?;
    writeln!(out, "incoming:   {}", stats.incoming)?;
    writeln!(out, "processing: {}", stats.processing)?;
    Ok(())
}

pub async fn list_incoming(queue: &dyn JobQueue, out: &mut impl Write) -> Result<()> {
    print_payloads(&queue.incoming().await?, out)
}

pub async fn list_processing(queue: &dyn JobQueue, out: &mut impl Write) -> Result<()> {
    print_payloads(&queue.in_flight().await?, out)
}

/// Move in-flight jobs back to the front of the intake list.
pub async fn replay(
    queue: &dyn JobQueue,
    all: bool,
    payload: Option<&str>,
    out: &mut impl Write,
) -> Result<()> {
    let targets = match (all, payload) {
        (true, _) => queue.in_flight().await?,
        (false, Some(payload)) => vec![JobPayload::from(payload)],
        (false, None) => bail!("pass a payload or --all"),
    };

    let mut moved = 0;
    for payload in &targets {
        if queue.requeue(payload).await? {
            moved += 1;
            info!(payload = %payload.lossy(), "Requeued job");
        } else {
            writeln!(out, "not in flight: {}", payload.lossy())?;
        }
    }

    writeln!(out, "replayed {} of {} job(s)", moved, targets.len())?;
    if moved < targets.len() && !all {
        bail!("payload is not in flight");
    }
    Ok(())
}

/// Push the contents of `file` as a job, exactly as intake would.
pub async fn enqueue(queue: &dyn JobQueue, file: &Path, out: &mut impl Write) -> Result<()> {
    let bytes = std::fs::read(file).with_context(|| format!("unable to read {}", file.display()))?;
    let payload = JobPayload::new(bytes);

    if let Err(e) = payload.decode() {
        // Enqueue anyway; the worker skips what it cannot decode.
        writeln!(out, "warning: payload is not a push event: {}", e)?;
    }

    queue.enqueue(&payload).await?;
    writeln!(out, "enqueued {} byte(s)", payload.as_bytes().len())?;
    Ok(())
}

fn print_payloads(payloads: &[JobPayload], out: &mut impl Write) -> Result<()> {
    if payloads.is_empty() {
        writeln!(out, "(empty)")?;
        return Ok(());
    }
    for payload in payloads {
        writeln!(out, "{}", payload.lossy())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use subsplit_scheduler::MemoryJobQueue;

    const PUSH: &str = r#"{"repository":{"url":"git@example.com:mono.git"},"ref":"refs/heads/main"}"#;

    fn text(out: Vec<u8>) -> String {
        String::from_utf8(out).unwrap()
    }

    #[tokio::test]
    async fn test_status_and_lists() {
        let queue = MemoryJobQueue::new();
        queue.enqueue(&JobPayload::from("first")).await.unwrap();
        queue.enqueue(&JobPayload::from("second")).await.unwrap();
        queue.claim().await.unwrap();

        let mut out = Vec::new();
        status(&queue, &mut out).await.unwrap();
        assert_eq!(text(out), "incoming:   1\nprocessing: 1\n");

        let mut out = Vec::new();
        list_incoming(&queue, &mut out).await.unwrap();
        assert_eq!(text(out), "second\n");

        let mut out = Vec::new();
        list_processing(&queue, &mut out).await.unwrap();
        assert_eq!(text(out), "first\n");
    }

    #[tokio::test]
    async fn test_list_empty() {
        let queue = MemoryJobQueue::new();
        let mut out = Vec::new();
        list_processing(&queue, &mut out).await.unwrap();
        assert_eq!(text(out), "(empty)\n");
    }

    #[tokio::test]
    async fn test_replay_all() {
        let queue = MemoryJobQueue::new();
        queue.enqueue(&JobPayload::from("a")).await.unwrap();
        queue.enqueue(&JobPayload::from("b")).await.unwrap();
        queue.claim().await.unwrap();
        queue.claim().await.unwrap();

        let mut out = Vec::new();
        replay(&queue, true, None, &mut out).await.unwrap();

        assert_eq!(text(out), "replayed 2 of 2 job(s)\n");
        let stats = queue.stats().await.unwrap();
        assert_eq!((stats.incoming, stats.processing), (2, 0));
    }

    #[tokio::test]
    async fn test_replay_single_payload() {
        let queue = MemoryJobQueue::new();
        queue.enqueue(&JobPayload::from("stuck")).await.unwrap();
        queue.claim().await.unwrap();

        let mut out = Vec::new();
        replay(&queue, false, Some("stuck"), &mut out).await.unwrap();
        assert_eq!(queue.incoming().await.unwrap(), vec![JobPayload::from("stuck")]);

        let mut out = Vec::new();
        assert!(replay(&queue, false, Some("stuck"), &mut out).await.is_err());
        assert!(text(out).starts_with("not in flight: stuck"));
    }

    #[tokio::test]
    async fn test_replay_needs_a_target() {
        let queue = MemoryJobQueue::new();
        let mut out = Vec::new();
        assert!(replay(&queue, false, None, &mut out).await.is_err());
    }

    #[tokio::test]
    async fn test_enqueue_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("push.json");
        std::fs::write(&path, PUSH).unwrap();
        let queue = MemoryJobQueue::new();

        let mut out = Vec::new();
        enqueue(&queue, &path, &mut out).await.unwrap();

        assert_eq!(text(out), format!("enqueued {} byte(s)\n", PUSH.len()));
        assert_eq!(queue.incoming().await.unwrap(), vec![JobPayload::from(PUSH)]);
    }

    #[tokio::test]
    async fn test_enqueue_warns_on_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk.txt");
        std::fs::write(&path, "not json").unwrap();
        let queue = MemoryJobQueue::new();

        let mut out = Vec::new();
        enqueue(&queue, &path, &mut out).await.unwrap();

        assert!(text(out).starts_with("warning: payload is not a push event"));
        assert_eq!(queue.stats().await.unwrap().incoming, 1);
    }
}
