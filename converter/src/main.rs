use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::prelude::__tracing_subscriber_SubscriberExt;

use converter::config::{BatchArgs, Cli, Command, ServeArgs};
use converter::scheduler::{self, BatchError};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let registry = tracing_subscriber::Registry::default()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            cli.log_level,
        ))
        .with(tracing_subscriber::filter::filter_fn(|meta| {
            meta.target().contains("converter") || meta.target().contains("extraction")
        }));
    if let Err(e) = tracing::subscriber::set_global_default(registry) {
        eprintln!("Setting up logging: {}", e);
    }

    let result = match cli.command {
        Some(Command::Serve(args)) => serve(args).await,
        Some(Command::Batch(args)) => batch(args).await,
        None => batch(cli.batch).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum Error {
    #[error(transparent)]
    Batch(#[from] BatchError),
    #[error("creating work folder: {0}")]
    WorkDir(#[source] std::io::Error),
    #[error("binding {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("serving: {0}")]
    Serve(#[source] std::io::Error),
}

async fn batch(args: BatchArgs) -> Result<(), Error> {
    println!("Started processing demo files...");

    let summary = scheduler::run(
        Arc::new(extraction::demo::CsDemoDecoder),
        &scheduler::Options::from(&args),
    )
    .await?;

    println!("{}", summary);

    if let Some(path) = args.report {
        summary
            .write_report(&path)
            .map_err(|source| BatchError::Report { path, source })?;
        tracing::info!("Wrote report");
    }

    Ok(())
}

async fn serve(args: ServeArgs) -> Result<(), Error> {
    tokio::fs::create_dir_all(&args.work_dir)
        .await
        .map_err(Error::WorkDir)?;

    let router = axum::Router::new()
        .nest(
            "/api",
            converter::api::router(
                Arc::new(extraction::demo::CsDemoDecoder),
                args.work_dir.clone(),
                args.winner_mode.into(),
            ),
        )
        .fallback_service(tower_http::services::ServeDir::new(&args.static_dir));

    let listener = tokio::net::TcpListener::bind(&args.bind)
        .await
        .map_err(|source| Error::Bind {
            addr: args.bind.clone(),
            source,
        })?;
    tracing::info!(bind = %args.bind, "Listening");

    axum::serve(listener, router).await.map_err(Error::Serve)
}
