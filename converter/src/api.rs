use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use futures::TryStreamExt;
use tokio::io::AsyncWriteExt;

use extraction::Decoder;

pub const UPLOAD_FIELD: &str = "demo";

struct ConvertState<D> {
    decoder: Arc<D>,
    work_dir: PathBuf,
    config: extraction::Config,
}

pub fn router<D, P>(decoder: Arc<D>, work_dir: P, config: extraction::Config) -> axum::Router
where
    D: Decoder + 'static,
    P: Into<PathBuf>,
{
    axum::Router::new()
        .route(
            "/convert",
            axum::routing::post(convert::<D>).layer(DefaultBodyLimit::max(500 * 1024 * 1024)),
        )
        .with_state(Arc::new(ConvertState {
            decoder,
            work_dir: work_dir.into(),
            config,
        }))
}

type ApiError = (StatusCode, String);

fn internal<E>(context: &'static str) -> impl FnOnce(E) -> ApiError
where
    E: std::fmt::Display,
{
    move |e| {
        tracing::error!("{}: {}", context, e);
        (StatusCode::INTERNAL_SERVER_ERROR, context.to_owned())
    }
}

#[tracing::instrument(skip(state, form))]
async fn convert<D>(
    State(state): State<Arc<ConvertState<D>>>,
    form: Multipart,
) -> Result<Response, ApiError>
where
    D: Decoder + 'static,
{
    // Every request gets its own scratch folder, removed afterwards
    let request_dir = state.work_dir.join(uuid::Uuid::now_v7().to_string());
    tokio::fs::create_dir_all(&request_dir)
        .await
        .map_err(internal("Creating work folder"))?;

    let result = convert_upload(state.as_ref(), &request_dir, form).await;

    if let Err(e) = tokio::fs::remove_dir_all(&request_dir).await {
        tracing::warn!(?request_dir, "Removing work folder: {}", e);
    }

    result
}

async fn convert_upload<D>(
    state: &ConvertState<D>,
    request_dir: &Path,
    form: Multipart,
) -> Result<Response, ApiError>
where
    D: Decoder + 'static,
{
    let input = request_dir.join("upload.dem");
    let output = request_dir.join("upload.csv");

    let file_name = store_upload(form, &input).await?.ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            format!("Missing '{}' upload", UPLOAD_FIELD),
        )
    })?;
    tracing::info!(?file_name, "Received upload");

    let decoder = state.decoder.clone();
    let config = state.config.clone();
    let (input_path, output_path) = (input.clone(), output.clone());
    let outcome = tokio::task::spawn_blocking(move || {
        extraction::convert(decoder.as_ref(), &config, &input_path, &output_path)
    })
    .await
    .map_err(internal("Running conversion"))?;

    if let Some(e) = outcome.error() {
        return Err((StatusCode::UNPROCESSABLE_ENTITY, e.to_string()));
    }

    let csv = tokio::fs::read(&output)
        .await
        .map_err(internal("Reading converted file"))?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_owned()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", csv_file_name(&file_name)),
            ),
        ],
        csv,
    )
        .into_response())
}

/// Streams the upload field to `path`, returning the client's file name.
/// `None` if the form has no such field.
async fn store_upload(mut form: Multipart, path: &Path) -> Result<Option<String>, ApiError> {
    while let Some(field) = form
        .next_field()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or("demo.dem").to_owned();

        async {
            // Convert the stream into an `AsyncRead`.
            let body_with_io_error = field.map_err(std::io::Error::other);
            let body_reader = tokio_util::io::StreamReader::new(body_with_io_error);
            futures::pin_mut!(body_reader);

            let mut file = tokio::io::BufWriter::new(tokio::fs::File::create(path).await?);

            tokio::io::copy(&mut body_reader, &mut file).await?;
            file.flush().await?;

            Ok::<_, std::io::Error>(())
        }
        .await
        .map_err(internal("Storing upload"))?;

        return Ok(Some(file_name));
    }

    Ok(None)
}

/// The download name for an uploaded file name, e.g. `match.dem` -> `match.csv`.
pub fn csv_file_name(upload: &str) -> String {
    let stem = Path::new(upload)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("demo");

    let stem: String = stem.chars().filter(|c| *c != '"' && !c.is_control()).collect();
    format!("{}.csv", stem)
}
