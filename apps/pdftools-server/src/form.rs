//! Multipart form intake

use std::collections::HashMap;

use axum::extract::Multipart;
use pdftools_core::UploadedFile;

use crate::error::ApiError;

/// A fully read multipart body: text fields plus file parts in arrival order.
#[derive(Debug, Default)]
pub struct Form {
    fields: HashMap<String, String>,
    files: Vec<(String, UploadedFile)>,
}

impl Form {
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = Form::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::bad_request(format!("Malformed upload: {}", e)))?
        {
            let name = field.name().unwrap_or_default().to_string();

            match field.file_name().map(str::to_string) {
                Some(original_name) => {
                    let mime_type = field
                        .content_type()
                        .unwrap_or("application/octet-stream")
                        .to_string();
                    let content = field
                        .bytes()
                        .await
                        .map_err(|e| ApiError::bad_request(format!("Malformed upload: {}", e)))?
                        .to_vec();
                    form.files.push((
                        name,
                        UploadedFile {
                            original_name,
                            mime_type,
                            content,
                        },
                    ));
                }
                None => {
                    let value = field
                        .text()
                        .await
                        .map_err(|e| ApiError::bad_request(format!("Malformed upload: {}", e)))?;
                    form.fields.insert(name, value);
                }
            }
        }

        Ok(form)
    }

    /// A text field, if sent.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Remove and return the first file sent under `name`.
    pub fn take_file(&mut self, name: &str) -> Option<UploadedFile> {
        let index = self.files.iter().position(|(field, _)| field == name)?;
        Some(self.files.remove(index).1)
    }

    /// Remove and return every file sent under `name`, in order.
    pub fn take_files(&mut self, name: &str) -> Vec<UploadedFile> {
        let (taken, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.files)
            .into_iter()
            .partition(|(field, _)| field == name);
        self.files = kept;
        taken.into_iter().map(|(_, file)| file).collect()
    }
}
