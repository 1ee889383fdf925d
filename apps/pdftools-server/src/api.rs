//! API handlers for the pdftools server
//!
//! Image endpoints work on in-memory buffers. PDF endpoints spool their
//! uploads to the scratch directory, write the result there and stream it
//! back; all of those files belong to the request's [`RequestFiles`] guard.

use std::path::PathBuf;

use axum::{
    extract::{Multipart, State},
    response::Response,
    Json,
};
use pdftools_core::{
    compress, convert, images_to_pdf, merge_documents, parse_page_spec, resolve_page_box,
    split_ranges, ImageFormat, PageBox, Quality, TransformError, UploadedFile,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::download::{file_attachment, image_attachment};
use crate::error::ApiError;
use crate::form::Form;
use crate::scratch::RequestFiles;
use crate::AppState;

const COMPRESS_FAILED: &str = "Internal server error during compression";
const CONVERT_FAILED: &str = "Internal server error during conversion";
const IMAGES_TO_PDF_FAILED: &str = "Server error while creating PDF";
const SPLIT_FAILED: &str = "Failed to split PDF";
const MERGE_FAILED: &str = "Failed to merge PDFs";

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Handler: GET /health
pub async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "pdftools-server",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Handler: POST /image/compress
///
/// Fields: `image` (file), `quality` (10-100). The output format follows the
/// upload's file extension.
pub async fn handle_compress(multipart: Multipart) -> Result<Response, ApiError> {
    let mut form = Form::from_multipart(multipart).await?;

    let file = form
        .take_file("image")
        .ok_or_else(|| ApiError::bad_request("No image uploaded"))?;
    let quality = form
        .text("quality")
        .ok_or_else(|| ApiError::bad_request("Invalid quality value (10-100)"))
        .and_then(|raw| {
            Quality::parse(raw).map_err(|e| ApiError::from_transform(COMPRESS_FAILED, e))
        })?;
    let format = ImageFormat::from_file_name(&file.original_name);

    info!(
        "Compress request: file={}, size={}, format={:?}, quality={}",
        file.original_name,
        file.size_bytes(),
        format,
        quality.get()
    );

    let bytes = run_blocking(COMPRESS_FAILED, move || {
        compress(&file.content, format, quality)
    })
    .await?;

    Ok(image_attachment(
        bytes,
        format.mime_type(),
        &format!("compressed.{}", format.extension()),
    ))
}

/// Handler: POST /image/convert
///
/// Fields: `image` (file), `format` (jpeg, jpg, png or webp).
pub async fn handle_convert(multipart: Multipart) -> Result<Response, ApiError> {
    let mut form = Form::from_multipart(multipart).await?;

    let file = form.take_file("image");
    let requested = form.text("format").unwrap_or_default().to_string();
    let (file, format) = match (file, ImageFormat::parse_target(&requested)) {
        (Some(file), Ok(format)) => (file, format),
        _ => return Err(ApiError::bad_request("Invalid file or format")),
    };

    info!(
        "Convert request: file={}, size={}, target={}",
        file.original_name,
        file.size_bytes(),
        requested
    );

    let bytes = run_blocking(CONVERT_FAILED, move || convert(&file.content, format)).await?;

    // The suggested name keeps the spelling the client asked for
    Ok(image_attachment(
        bytes,
        format.mime_type(),
        &format!("converted.{}", requested),
    ))
}

/// Handler: POST /pdf/imgtopdf
///
/// Fields: `images` (files), `paperSize` (default A4), `orientation`
/// (default portrait).
pub async fn handle_images_to_pdf(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let mut form = Form::from_multipart(multipart).await?;

    let uploads = form.take_files("images");
    if uploads.is_empty() {
        return Err(ApiError::bad_request("No images uploaded"));
    }
    let paper_size = form.text("paperSize").unwrap_or("A4");
    let orientation = form.text("orientation").unwrap_or("portrait");
    let page = resolve_page_box(paper_size, orientation)
        .map_err(|e| ApiError::from_transform(IMAGES_TO_PDF_FAILED, e))?;

    info!(
        "Images to PDF request: images={}, paper={}, orientation={}",
        uploads.len(),
        paper_size,
        orientation
    );

    let mut files = state.scratch.request();
    let uploads = spool_uploads(&mut files, "image", uploads, IMAGES_TO_PDF_FAILED).await?;

    let assembled = run_blocking(IMAGES_TO_PDF_FAILED, move || images_to_pdf(&uploads, page))
        .await?;
    if !assembled.skipped.is_empty() {
        warn!(
            "Skipped {} of {} images",
            assembled.skipped.len(),
            assembled.skipped.len() + assembled.page_count
        );
    }

    send_pdf(files, "converted", assembled.bytes, IMAGES_TO_PDF_FAILED).await
}

/// Handler: POST /pdf/split-pdf
///
/// Fields: `pdf` (file), `pages` (e.g. "1-3,5").
pub async fn handle_split_pdf(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let mut form = Form::from_multipart(multipart).await?;

    let spec = form.text("pages").unwrap_or_default().to_string();
    let ranges = parse_page_spec(&spec).map_err(|e| ApiError::from_transform(SPLIT_FAILED, e))?;
    let upload = form
        .take_file("pdf")
        .ok_or_else(|| ApiError::bad_request("No PDF uploaded"))?;

    info!(
        "Split request: file={}, size={}, pages={}",
        upload.original_name,
        upload.size_bytes(),
        spec
    );

    let mut files = state.scratch.request();
    let mut uploads = spool_uploads(&mut files, "pdf", vec![upload], SPLIT_FAILED).await?;
    let source = uploads.remove(0).content;

    let bytes = run_blocking(SPLIT_FAILED, move || split_ranges(&source, &ranges)).await?;

    send_pdf(files, "split", bytes, SPLIT_FAILED).await
}

/// Handler: POST /pdf/merge-pdfs
///
/// Fields: `pdfs` (files). Every page is fitted onto an A4 portrait page.
pub async fn handle_merge_pdfs(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let mut form = Form::from_multipart(multipart).await?;

    let uploads = form.take_files("pdfs");
    if uploads.is_empty() {
        return Err(ApiError::bad_request("No PDFs uploaded"));
    }

    info!("Merge request: documents={}", uploads.len());

    let mut files = state.scratch.request();
    let uploads = spool_uploads(&mut files, "pdf", uploads, MERGE_FAILED).await?;
    let sources: Vec<Vec<u8>> = uploads.into_iter().map(|u| u.content).collect();

    let bytes = run_blocking(MERGE_FAILED, move || {
        merge_documents(sources, PageBox::A4_PORTRAIT)
    })
    .await?;

    send_pdf(files, "merged", bytes, MERGE_FAILED).await
}

/// Run CPU-bound work off the async runtime.
async fn run_blocking<T, F>(context: &'static str, job: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, TransformError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(ApiError::processing(context))?
        .map_err(|e| ApiError::from_transform(context, e))
}

/// Move uploads to disk, then read them back for processing.
async fn spool_uploads(
    files: &mut RequestFiles,
    prefix: &str,
    uploads: Vec<UploadedFile>,
    context: &'static str,
) -> Result<Vec<UploadedFile>, ApiError> {
    let mut spooled: Vec<(PathBuf, UploadedFile)> = Vec::with_capacity(uploads.len());
    for mut upload in uploads {
        let path = files
            .spool(prefix, &upload.content)
            .await
            .map_err(ApiError::processing(context))?;
        upload.content = Vec::new();
        spooled.push((path, upload));
    }

    let mut loaded = Vec::with_capacity(spooled.len());
    for (path, mut upload) in spooled {
        upload.content = tokio::fs::read(&path)
            .await
            .map_err(ApiError::processing(context))?;
        loaded.push(upload);
    }
    Ok(loaded)
}

/// Write `bytes` to a registered output path and stream it back.
async fn send_pdf(
    mut files: RequestFiles,
    prefix: &str,
    bytes: Vec<u8>,
    context: &'static str,
) -> Result<Response, ApiError> {
    let path = files.output_path(prefix, "pdf");
    tokio::fs::write(&path, &bytes)
        .await
        .map_err(ApiError::processing(context))?;

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("{}.pdf", prefix));

    info!("Sending {} ({} bytes)", file_name, bytes.len());
    debug!("Holding {} scratch files until the download ends", files.len());
    file_attachment(&path, files, &file_name)
        .await
        .map_err(ApiError::processing(context))
}
