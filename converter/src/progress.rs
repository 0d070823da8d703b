//! Spinner shown on stdout while a batch runs.

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

pub const PATTERNS: [&str; 5] = ["[.  ]", "[.. ]", "[...]", "[ ..]", "[  .]"];

pub const TICK: Duration = Duration::from_millis(100);

pub fn frame(step: usize, done: usize, total: usize) -> String {
    format!(
        "\r{} Processed {}/{} demo files",
        PATTERNS[step % PATTERNS.len()],
        done,
        total
    )
}

/// Redraws the spinner every [`TICK`] until `stop` is cancelled, then draws
/// the final count and ends the line.
pub fn spawn(
    total: usize,
    done: Arc<AtomicUsize>,
    stop: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(TICK);
        let mut step = 0usize;

        loop {
            tokio::select! {
                _ = stop.cancelled() => break,
                _ = interval.tick() => {
                    draw(&frame(step, done.load(Ordering::Relaxed), total));
                    step = step.wrapping_add(1);
                }
            }
        }

        draw(&format!("{}\n", frame(step, done.load(Ordering::Relaxed), total)));
    })
}

fn draw(line: &str) {
    let mut stdout = std::io::stdout().lock();
    if let Err(e) = stdout.write_all(line.as_bytes()).and_then(|_| stdout.flush()) {
        tracing::debug!("Drawing progress: {:?}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_cycle() {
        assert_eq!("\r[.  ] Processed 0/3 demo files", frame(0, 0, 3));
        assert_eq!("\r[  .] Processed 2/3 demo files", frame(4, 2, 3));
        assert_eq!(frame(1, 1, 3), frame(6, 1, 3));
    }

    #[tokio::test(start_paused = true)]
    async fn stops_when_cancelled() {
        let stop = CancellationToken::new();
        let handle = spawn(1, Arc::new(AtomicUsize::new(0)), stop.clone());

        tokio::time::sleep(TICK * 3).await;
        stop.cancel();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("ticker should stop")
            .unwrap();
    }
}
