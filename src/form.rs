//! `multipart/form-data` parsing.

use std::collections::HashMap;

use bytes::Bytes;
use multer::Multipart;

use crate::error::Error;

/// A parsed multipart form: plain fields and uploaded files, keyed by field
/// name. Repeated fields keep their order of appearance.
#[derive(Debug, Default)]
pub struct MultipartForm {
    pub values: HashMap<String, Vec<String>>,
    pub files: HashMap<String, Vec<FormFile>>,
}

/// One uploaded file, held in memory.
#[derive(Debug, Clone)]
pub struct FormFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl MultipartForm {
    /// First value of a plain field.
    pub fn value(&self, name: &str) -> Option<&str> {
        self.values.get(name)?.first().map(String::as_str)
    }

    /// First file uploaded under `name`.
    pub fn file(&self, name: &str) -> Option<&FormFile> {
        self.files.get(name)?.first()
    }
}

pub(crate) async fn read_form(mut multipart: Multipart<'_>) -> Result<MultipartForm, Error> {
    let mut form = MultipartForm::default();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_owned();
        match field.file_name().map(str::to_owned) {
            Some(file_name) => {
                let content_type = field.content_type().map(ToString::to_string);
                let data = field.bytes().await?;
                form.files.entry(name).or_default().push(FormFile { file_name, content_type, data });
            }
            None => {
                let value = field.text().await?;
                form.values.entry(name).or_default().push(value);
            }
        }
    }
    Ok(form)
}
