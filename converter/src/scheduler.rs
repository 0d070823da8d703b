use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use extraction::Decoder;
use tokio_util::sync::CancellationToken;

use crate::summary::BatchSummary;

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("reading input folder {path:?}: {source}")]
    ReadInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("creating output folder {path:?}: {source}")]
    CreateOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("writing report {path:?}: {source}")]
    Report {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("worker task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone)]
pub struct Options {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Upper bound on workers, the available parallelism if `None`
    pub workers: Option<usize>,
    pub extension: String,
    pub progress: bool,
    pub extraction: extraction::Config,
}

impl From<&crate::config::BatchArgs> for Options {
    fn from(args: &crate::config::BatchArgs) -> Self {
        Self {
            input_dir: args.input.clone(),
            output_dir: args.output.clone(),
            workers: args.workers.map(|w| w.get()),
            extension: args.extension.clone(),
            progress: !args.no_progress,
            extraction: args.winner_mode.into(),
        }
    }
}

/// Never more workers than files, and at least one.
pub fn worker_count(limit: Option<usize>, files: usize) -> usize {
    let limit = limit.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    });

    limit.min(files).max(1)
}

/// Where the CSV for `input` goes: same file stem, `.csv` extension.
pub fn output_path(output_dir: &Path, input: &Path) -> PathBuf {
    let mut name = input.file_stem().unwrap_or(input.as_os_str()).to_os_string();
    name.push(".csv");
    output_dir.join(name)
}

/// Regular files directly inside `dir` whose extension matches, sorted by
/// path.
pub async fn list_inputs(dir: &Path, extension: &str) -> Result<Vec<PathBuf>, BatchError> {
    let read_error = |source| BatchError::ReadInput {
        path: dir.to_path_buf(),
        source,
    };
    let extension = extension.trim_start_matches('.');

    let mut entries = tokio::fs::read_dir(dir).await.map_err(read_error)?;
    let mut inputs = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(read_error)? {
        let path = entry.path();

        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case(extension))
            .unwrap_or(false);
        if !matches {
            continue;
        }

        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => inputs.push(path),
            Ok(_) => {}
            Err(e) => tracing::warn!(?path, "Reading metadata: {}", e),
        };
    }

    inputs.sort();
    Ok(inputs)
}

/// Converts every matching file of the input folder with a pool of blocking
/// workers.
///
/// Failing files never abort the batch, they end up in the summary's
/// corrupted list and their partial output is removed.
#[tracing::instrument(skip(decoder, options), fields(input = ?options.input_dir, output = ?options.output_dir))]
pub async fn run<D>(decoder: Arc<D>, options: &Options) -> Result<BatchSummary, BatchError>
where
    D: Decoder + 'static,
{
    let start = std::time::Instant::now();

    let inputs = list_inputs(&options.input_dir, &options.extension).await?;

    tokio::fs::create_dir_all(&options.output_dir)
        .await
        .map_err(|source| BatchError::CreateOutput {
            path: options.output_dir.clone(),
            source,
        })?;

    let total = inputs.len();

    let mut summary = BatchSummary::new(total);
    if inputs.is_empty() {
        tracing::info!("No demo files found");
        return Ok(summary);
    }

    let workers = worker_count(options.workers, total);
    tracing::info!(files = total, workers, "Starting conversion");

    let done = Arc::new(AtomicUsize::new(0));
    let stop = CancellationToken::new();
    let ticker = options
        .progress
        .then(|| crate::progress::spawn(total, done.clone(), stop.clone()));

    // Zero capacity, every path is handed directly to an idle worker
    let (work_tx, work_rx) = crossbeam_channel::bounded::<PathBuf>(0);
    let (outcome_tx, mut outcome_rx) = tokio::sync::mpsc::unbounded_channel();

    let mut handles = Vec::with_capacity(workers + 1);
    for id in 0..workers {
        let work_rx = work_rx.clone();
        let outcome_tx = outcome_tx.clone();
        let decoder = decoder.clone();
        let output_dir = options.output_dir.clone();
        let config = options.extraction.clone();

        handles.push(tokio::task::spawn_blocking(move || {
            let _tracing_guard = tracing::debug_span!("Worker", id).entered();

            for input in work_rx.iter() {
                let output = output_path(&output_dir, &input);
                let outcome = extraction::convert(decoder.as_ref(), &config, &input, &output);

                if !outcome.success() {
                    remove_output(&outcome.output);
                }

                if outcome_tx.send(outcome).is_err() {
                    break;
                }
            }
        }));
    }
    drop(work_rx);
    drop(outcome_tx);

    handles.push(tokio::task::spawn_blocking(move || {
        for input in inputs {
            if work_tx.send(input).is_err() {
                tracing::error!("All workers exited early");
                break;
            }
        }
    }));

    while let Some(outcome) = outcome_rx.recv().await {
        summary.record(outcome);
        done.fetch_add(1, Ordering::Relaxed);
    }

    let joined = futures::future::join_all(handles).await;

    stop.cancel();
    if let Some(ticker) = ticker {
        if let Err(e) = ticker.await {
            tracing::warn!("Progress ticker: {:?}", e);
        }
    }

    for result in joined {
        result?;
    }

    summary.elapsed = start.elapsed();
    tracing::info!(
        processed = summary.processed,
        corrupted = summary.corrupted.len(),
        "Finished conversion"
    );

    Ok(summary)
}

fn remove_output(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!(?path, "Removed partial output"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(?path, "Removing partial output: {}", e),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workers_bounded_by_files() {
        assert_eq!(2, worker_count(Some(8), 2));
        assert_eq!(4, worker_count(Some(4), 10));
        assert_eq!(1, worker_count(Some(4), 0));
        assert!(worker_count(None, 3) <= 3);
    }

    #[test]
    fn csv_next_to_stem() {
        assert_eq!(
            PathBuf::from("csv-out/match.1.csv"),
            output_path(Path::new("csv-out"), Path::new("demo-in/match.1.dem"))
        );
        assert_eq!(
            PathBuf::from("out/final.csv"),
            output_path(Path::new("out"), Path::new("/tmp/final.DEM"))
        );
    }

    #[test]
    #[tracing_test::traced_test]
    fn removing_missing_output_is_quiet() {
        let dir = tempfile::tempdir().unwrap();

        remove_output(&dir.path().join("never-written.csv"));
        assert!(!logs_contain("Removing partial output"));

        remove_output(dir.path());
        assert!(logs_contain("Removing partial output"));
    }
}
