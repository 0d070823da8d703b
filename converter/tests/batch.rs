use std::path::PathBuf;
use std::sync::Arc;

use converter::scheduler::{self, BatchError, Options};
use pretty_assertions::assert_eq;

mod common;
use common::{write, TextDecoder};

fn options(input: &std::path::Path, output: &std::path::Path) -> Options {
    Options {
        input_dir: input.to_path_buf(),
        output_dir: output.to_path_buf(),
        workers: Some(2),
        extension: "dem".to_owned(),
        progress: false,
        extraction: Default::default(),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn corrupted_file_is_quarantined() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();

    write(input.path(), "a.dem", "kill\nkill\n");
    write(input.path(), "b.dem", "kill\n");
    write(input.path(), "c.dem", "corrupt");

    let summary = scheduler::run(Arc::new(TextDecoder), &options(input.path(), output.path()))
        .await
        .unwrap();

    assert_eq!(3, summary.total);
    assert_eq!(2, summary.processed);
    assert_eq!(
        vec![input.path().join("c.dem").as_path()],
        summary.corrupted_paths()
    );

    assert!(output.path().join("a.csv").exists());
    assert!(output.path().join("b.csv").exists());
    assert!(!output.path().join("c.csv").exists());

    let text = summary.to_string();
    assert!(text.starts_with("Processed 2 of 3 files in "));
    assert!(text.ends_with(&format!(
        "\n\nCorrupted demo files:\n{}",
        input.path().join("c.dem").display()
    )));
}

#[tokio::test]
async fn empty_folder() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();

    let summary = scheduler::run(Arc::new(TextDecoder), &options(input.path(), output.path()))
        .await
        .unwrap();

    assert_eq!((0, 0), (summary.total, summary.processed));
    assert!(summary.corrupted.is_empty());
    assert!(summary.to_string().starts_with("Processed 0 of 0 files in "));
}

#[tokio::test]
async fn only_matching_files_are_converted() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();

    write(input.path(), "notes.txt", "kill\n");
    write(input.path(), "LOUD.DEM", "kill\n");
    std::fs::create_dir(input.path().join("nested.dem")).unwrap();

    let summary = scheduler::run(Arc::new(TextDecoder), &options(input.path(), output.path()))
        .await
        .unwrap();

    assert_eq!((1, 1), (summary.total, summary.processed));

    let mut produced: Vec<PathBuf> = std::fs::read_dir(output.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().into())
        .collect();
    produced.sort();
    assert_eq!(vec![PathBuf::from("LOUD.csv")], produced);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn every_file_is_accounted_for() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();

    for i in 0..20 {
        let content = if i % 7 == 0 { "corrupt" } else { "kill\n" };
        write(input.path(), &format!("match{:02}.dem", i), content);
    }

    let mut opts = options(input.path(), output.path());
    opts.workers = Some(4);
    let summary = scheduler::run(Arc::new(TextDecoder), &opts).await.unwrap();

    assert_eq!(20, summary.processed + summary.corrupted.len());
    assert_eq!(3, summary.corrupted.len());
}

#[tokio::test]
async fn header_comes_first() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();

    write(input.path(), "quiet.dem", "");
    write(input.path(), "busy.dem", "kill\nkill\nkill\n");

    scheduler::run(Arc::new(TextDecoder), &options(input.path(), output.path()))
        .await
        .unwrap();

    let header = extraction::row::header();

    let quiet = std::fs::read_to_string(output.path().join("quiet.csv")).unwrap();
    assert_eq!(format!("{}\n", header), quiet);

    let busy = std::fs::read_to_string(output.path().join("busy.csv")).unwrap();
    assert!(busy.starts_with(&header));
    assert_eq!(5, busy.lines().count());
    assert_eq!(3, busy.lines().filter(|l| l.starts_with("Kill,")).count());
}

#[tokio::test]
async fn missing_input_folder() {
    let dir = tempfile::tempdir().unwrap();

    let result = scheduler::run(
        Arc::new(TextDecoder),
        &options(&dir.path().join("missing"), &dir.path().join("out")),
    )
    .await;

    match result {
        Err(BatchError::ReadInput { path, .. }) => assert_eq!(dir.path().join("missing"), path),
        other => panic!("Expected ReadInput error, got {:?}", other),
    };
    assert!(!dir.path().join("out").exists());
}

#[tokio::test]
async fn report_is_json() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();

    write(input.path(), "broken.dem", "corrupt");

    let summary = scheduler::run(Arc::new(TextDecoder), &options(input.path(), output.path()))
        .await
        .unwrap();

    let report = output.path().join("report.json");
    summary.write_report(&report).unwrap();

    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report).unwrap()).unwrap();
    assert_eq!(1, value["total"]);
    assert_eq!(0, value["processed"]);
    assert_eq!(
        input.path().join("broken.dem").to_str().unwrap(),
        value["corrupted"][0]["path"]
    );
}
