use std::io::Write;
use std::path::{Path, PathBuf};

use crate::dispatch::{drain, DrainError, Extractor, Stats};
use crate::event::{DecodeError, Decoder};
use crate::row::header;
use crate::state::Config;

#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("creating output file: {0}")]
    CreateOutput(#[source] std::io::Error),
    #[error("writing output file: {0}")]
    Write(#[source] std::io::Error),
    #[error("opening demo: {0}")]
    Open(#[source] DecodeError),
    #[error("parsing demo: {0}")]
    Decode(#[source] DecodeError),
    #[error("decoder panicked: {0}")]
    Panicked(String),
}

/// The result of converting a single file.
#[derive(Debug)]
pub struct ConversionOutcome {
    pub input: PathBuf,
    pub output: PathBuf,
    pub result: Result<Stats, ConvertError>,
}

impl ConversionOutcome {
    pub fn success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn error(&self) -> Option<&ConvertError> {
        self.result.as_ref().err()
    }
}

/// Converts one demo into a CSV file at `output`.
///
/// The output file is left behind on failure, removing it is up to the
/// caller.
#[tracing::instrument(skip(decoder, config))]
pub fn convert<D>(decoder: &D, config: &Config, input: &Path, output: &Path) -> ConversionOutcome
where
    D: Decoder,
{
    tracing::info!("Converting demo");

    let result = match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        convert_file(decoder, config, input, output)
    })) {
        Ok(r) => r,
        Err(payload) => Err(ConvertError::Panicked(panic_message(payload.as_ref()))),
    };

    match &result {
        Ok(stats) => tracing::info!(rounds = stats.rounds, kills = stats.kills, "Converted demo"),
        Err(e) => tracing::error!("Converting demo: {}", e),
    };

    ConversionOutcome {
        input: input.to_path_buf(),
        output: output.to_path_buf(),
        result,
    }
}

fn convert_file<D>(
    decoder: &D,
    config: &Config,
    input: &Path,
    output: &Path,
) -> Result<Stats, ConvertError>
where
    D: Decoder,
{
    let file = std::fs::File::create(output).map_err(ConvertError::CreateOutput)?;
    let mut out = std::io::BufWriter::new(file);

    out.write_all(header().as_bytes()).map_err(ConvertError::Write)?;

    let mut source = decoder.open(input).map_err(ConvertError::Open)?;

    let mut extractor = Extractor::new(config.clone(), out);
    match drain(&mut source, &mut extractor) {
        Ok(events) => tracing::debug!(events, "Drained demo"),
        Err(DrainError::Decode(e)) => return Err(ConvertError::Decode(e)),
        Err(DrainError::Handler(e)) => return Err(ConvertError::Write(e)),
    };

    let stats = extractor.stats();
    extractor.into_inner().flush().map_err(ConvertError::Write)?;

    Ok(stats)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_owned()
    }
}
