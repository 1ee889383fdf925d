//! Attachment responses

use std::io;
use std::path::Path;

use axum::{
    body::{Body, Bytes},
    http::header,
    response::{IntoResponse, Response},
};
use futures::stream;
use tokio::io::AsyncReadExt;

use crate::scratch::RequestFiles;

const CHUNK_SIZE: usize = 64 * 1024;

/// An in-memory image sent as a download.
pub fn image_attachment(bytes: Vec<u8>, mime_type: &str, file_name: &str) -> Response {
    (
        [
            (header::CONTENT_TYPE, mime_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition(file_name)),
        ],
        bytes,
    )
        .into_response()
}

/// Stream the PDF at `path` as a download.
///
/// `files` rides along inside the body, so the request's scratch files are
/// deleted once the last chunk has been sent (off the runtime threads) or,
/// through the guard's `Drop`, when the client goes away.
pub async fn file_attachment(
    path: &Path,
    files: RequestFiles,
    file_name: &str,
) -> io::Result<Response> {
    let file = tokio::fs::File::open(path).await?;
    let length = file.metadata().await?.len();

    let chunks = stream::unfold(Some((file, files)), |state| async move {
        let (mut file, mut files) = state?;
        let mut buf = vec![0u8; CHUNK_SIZE];
        match file.read(&mut buf).await {
            Ok(0) => {
                // Close before deleting
                drop(file);
                files.cleanup().await;
                None
            }
            Ok(n) => {
                buf.truncate(n);
                Some((Ok(Bytes::from(buf)), Some((file, files))))
            }
            Err(e) => Some((Err(e), None)),
        }
    });

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition(file_name)),
            (header::CONTENT_LENGTH, length.to_string()),
        ],
        Body::from_stream(chunks),
    )
        .into_response())
}

fn disposition(file_name: &str) -> String {
    format!("attachment; filename=\"{}\"", file_name)
}
