use std::fs::File;
use std::path::Path;

use reqwest::Method;
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{RequestBuilder, Response};
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;

use crate::diagnostics::describe_failure;
use crate::domain::{ExportFormat, RecordId};
use crate::error::MefError;
use crate::fs_util::copy_chunked;
use crate::session::{CatalogSession, JSON, ZIP};

/// Fixed parameters of every import call.
pub const IMPORT_PARAMS: [(&str, &str); 2] =
    [("metadataType", "METADATA"), ("uuidProcessing", "OVERWRITE")];

/// The catalog endpoints the transfer pipeline drives.
pub trait CatalogApi: Send + Sync {
    /// `GET /q`; also becomes the session's "last query".
    fn search(&self, params: &[(String, String)]) -> Result<Value, MefError>;
    /// `PUT /selections/{bucket}`; an empty `ids` asks the server to add the last query's hits.
    fn add_to_selection(&self, bucket: &str, ids: &[RecordId]) -> Result<(), MefError>;
    fn selection(&self, bucket: &str) -> Result<Vec<RecordId>, MefError>;
    fn delete_selection(&self, bucket: &str) -> Result<(), MefError>;
    /// Streams `GET /mef.export` for `bucket` into `destination`, returning the bytes written.
    fn export_mef(
        &self,
        bucket: &str,
        format: ExportFormat,
        destination: &Path,
    ) -> Result<u64, MefError>;
    fn put_record(&self, xml: &str) -> Result<(), MefError>;
    fn upload_records(&self, archive: &Path) -> Result<(), MefError>;
    fn upload_mef(&self, archive: &Path) -> Result<(), MefError>;
}

impl CatalogSession {
    fn send(&self, request: RequestBuilder) -> Result<Response, MefError> {
        let response = request
            .send()
            .map_err(|err| MefError::CatalogHttp(err.to_string()))?;
        handle_status(response)
    }

    fn archive_part(archive: &Path) -> Result<Part, MefError> {
        Part::file(archive)
            .map_err(|err| {
                MefError::Filesystem(format!("open archive {}: {err}", archive.display()))
            })?
            .mime_str(ZIP)
            .map_err(|err| MefError::CatalogHttp(err.to_string()))
    }
}

/// Turns an error status into [`MefError::CatalogStatus`] with a readable body.
pub fn handle_status(response: Response) -> Result<Response, MefError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let url = response.url().to_string();
    let message = response
        .text()
        .map(|body| describe_failure(&body))
        .unwrap_or_else(|_| "catalog request failed".to_string());
    Err(MefError::CatalogStatus {
        status,
        url,
        message,
    })
}

impl CatalogApi for CatalogSession {
    fn search(&self, params: &[(String, String)]) -> Result<Value, MefError> {
        let response = self.send(self.request(Method::GET, "q", JSON).query(params))?;
        response
            .json()
            .map_err(|err| MefError::MalformedResponse(format!("q: {err}")))
    }

    fn add_to_selection(&self, bucket: &str, ids: &[RecordId]) -> Result<(), MefError> {
        let params = ids
            .iter()
            .map(|id| ("uuid", id.as_str()))
            .collect::<Vec<_>>();
        let mut request = self.request(Method::PUT, &format!("selections/{bucket}"), JSON);
        if !params.is_empty() {
            request = request.query(&params);
        }
        self.send(request)?;
        Ok(())
    }

    fn selection(&self, bucket: &str) -> Result<Vec<RecordId>, MefError> {
        let response =
            self.send(self.request(Method::GET, &format!("selections/{bucket}"), JSON))?;
        response
            .json()
            .map_err(|err| MefError::MalformedResponse(format!("selections/{bucket}: {err}")))
    }

    fn delete_selection(&self, bucket: &str) -> Result<(), MefError> {
        self.send(self.request(Method::DELETE, &format!("selections/{bucket}"), JSON))?;
        Ok(())
    }

    fn export_mef(
        &self,
        bucket: &str,
        format: ExportFormat,
        destination: &Path,
    ) -> Result<u64, MefError> {
        let request = self.request(Method::GET, "mef.export", ZIP).query(&[
            ("version", "2"),
            ("format", format.as_str()),
            ("bucket", bucket),
        ]);
        let mut response = self.send(request)?;
        let mut file = File::create(destination).map_err(|err| {
            MefError::Filesystem(format!("create {}: {err}", destination.display()))
        })?;
        copy_chunked(&mut response, &mut file)
    }

    fn put_record(&self, xml: &str) -> Result<(), MefError> {
        let request = self
            .authenticated(Method::PUT, "records", JSON)
            .query(&IMPORT_PARAMS)
            .header(CONTENT_TYPE, "application/xml")
            .body(xml.to_string());
        self.send(request)?;
        Ok(())
    }

    fn upload_records(&self, archive: &Path) -> Result<(), MefError> {
        let form = IMPORT_PARAMS
            .iter()
            .fold(Form::new(), |form, (key, value)| form.text(*key, *value))
            .part("file", Self::archive_part(archive)?);
        self.send(self.authenticated(Method::POST, "records", JSON).multipart(form))?;
        Ok(())
    }

    fn upload_mef(&self, archive: &Path) -> Result<(), MefError> {
        let form = Form::new().part("mefFile", Self::archive_part(archive)?);
        let request = self
            .authenticated(Method::POST, "mef.import", JSON)
            .query(&IMPORT_PARAMS)
            .query(&[("file_type", "mef")])
            .multipart(form);
        self.send(request)?;
        Ok(())
    }
}
