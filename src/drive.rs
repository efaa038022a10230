//! Thin client for the handful of Drive v3 calls an upload needs.

use crate::config::Endpoints;
use mime::Mime;
use reqwest::{
    header::{CONTENT_LENGTH, CONTENT_TYPE, LOCATION},
    Body, Client, RequestBuilder, Response, StatusCode,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use tokio::fs::File;
use tokio_util::io::ReaderStream;

const FILE_FIELDS: &str = "id,name";
const LIST_FIELDS: &str = "files(id,name)";

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("Drive API returned {status}: {body}")]
    Api { status: StatusCode, body: String },
    #[error("unable to reach the Drive API: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unable to read the local file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Drive API did not return a file id")]
    MissingId,
    #[error("Drive API did not return an upload session location")]
    MissingSessionUri,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Deserialize, Debug)]
struct FileList {
    #[serde(default)]
    files: Vec<RemoteFile>,
}

#[derive(Serialize, Debug)]
struct FileMetadata<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "no_parents")]
    parents: &'a [&'a str],
}

fn no_parents(parents: &&[&str]) -> bool {
    parents.is_empty()
}

///Local content for a create or update
#[derive(Debug, Clone)]
pub struct Media {
    pub path: PathBuf,
    pub mime_type: Mime,
}

/// The remote operations the upload controller relies on.
#[allow(async_fn_in_trait)]
pub trait DriveApi {
    ///Non-trashed files in `folder_id` called exactly `name`, in API order
    async fn find_by_name(
        &self,
        folder_id: &str,
        name: &str,
    ) -> Result<Vec<RemoteFile>, TransferError>;

    async fn create(
        &self,
        folder_id: &str,
        name: &str,
        media: &Media,
    ) -> Result<RemoteFile, TransferError>;

    ///Replaces the content and name of `id`, keeping the id
    async fn update(&self, id: &str, name: &str, media: &Media) -> Result<RemoteFile, TransferError>;
}

impl<T: DriveApi> DriveApi for &T {
    async fn find_by_name(
        &self,
        folder_id: &str,
        name: &str,
    ) -> Result<Vec<RemoteFile>, TransferError> {
        (**self).find_by_name(folder_id, name).await
    }

    async fn create(
        &self,
        folder_id: &str,
        name: &str,
        media: &Media,
    ) -> Result<RemoteFile, TransferError> {
        (**self).create(folder_id, name, media).await
    }

    async fn update(&self, id: &str, name: &str, media: &Media) -> Result<RemoteFile, TransferError> {
        (**self).update(id, name, media).await
    }
}

///Escapes a value for use inside a single-quoted Drive query string
pub fn escape_query_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if c == '\\' || c == '\'' {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

pub fn name_in_folder_query(folder_id: &str, name: &str) -> String {
    format!(
        "name = '{}' and '{}' in parents and trashed = false",
        escape_query_value(name),
        escape_query_value(folder_id)
    )
}

async fn error_for_api(rsp: Response) -> Result<Response, TransferError> {
    let status = rsp.status();
    if status.is_success() {
        return Ok(rsp);
    }

    let body = rsp.text().await.unwrap_or_default();
    Err(TransferError::Api { status, body })
}

#[derive(Clone)]
pub struct DriveClient {
    http: Client,
    access_token: String,
    endpoints: Endpoints,
}

impl DriveClient {
    pub fn new(http: Client, access_token: String, endpoints: Endpoints) -> Self {
        Self {
            http,
            access_token,
            endpoints,
        }
    }

    /// Opens a resumable session with the metadata, then sends the whole file in one `PUT`.
    async fn upload_with_session(
        &self,
        start: RequestBuilder,
        metadata: &FileMetadata<'_>,
        media: &Media,
    ) -> Result<RemoteFile, TransferError> {
        let rsp = start
            .bearer_auth(&self.access_token)
            .query(&[("uploadType", "resumable"), ("fields", FILE_FIELDS)])
            .header("X-Upload-Content-Type", media.mime_type.essence_str())
            .json(metadata)
            .send()
            .await?;
        let rsp = error_for_api(rsp).await?;

        let session = rsp
            .headers()
            .get(LOCATION)
            .and_then(|x| x.to_str().ok())
            .ok_or(TransferError::MissingSessionUri)?
            .to_owned();
        trace!(%session, "Opened upload session");

        let file = File::open(&media.path).await?;
        let len = file.metadata().await?.len();
        let body = Body::wrap_stream(ReaderStream::new(file));

        info!(path=?media.path, len, content_type=%media.mime_type, "Sending file contents");
        let rsp = self
            .http
            .put(&session)
            .header(CONTENT_LENGTH, len)
            .header(CONTENT_TYPE, media.mime_type.essence_str())
            .body(body)
            .send()
            .await?;

        Ok(error_for_api(rsp).await?.json::<RemoteFile>().await?)
    }
}

impl DriveApi for DriveClient {
    #[instrument(skip(self))]
    async fn find_by_name(
        &self,
        folder_id: &str,
        name: &str,
    ) -> Result<Vec<RemoteFile>, TransferError> {
        let q = name_in_folder_query(folder_id, name);

        let rsp = self
            .http
            .get(&self.endpoints.files)
            .bearer_auth(&self.access_token)
            .query(&[("q", q.as_str()), ("fields", LIST_FIELDS), ("spaces", "drive")])
            .send()
            .await?;
        let list = error_for_api(rsp).await?.json::<FileList>().await?;

        debug!(found = list.files.len(), "Listed matching files");
        Ok(list.files)
    }

    #[instrument(skip(self, media))]
    async fn create(
        &self,
        folder_id: &str,
        name: &str,
        media: &Media,
    ) -> Result<RemoteFile, TransferError> {
        let metadata = FileMetadata {
            name,
            parents: &[folder_id],
        };
        let start = self.http.post(&self.endpoints.upload);

        self.upload_with_session(start, &metadata, media).await
    }

    #[instrument(skip(self, media))]
    async fn update(
        &self,
        id: &str,
        name: &str,
        media: &Media,
    ) -> Result<RemoteFile, TransferError> {
        let metadata = FileMetadata { name, parents: &[] };
        let start = self.http.patch(format!("{}/{id}", self.endpoints.upload));

        self.upload_with_session(start, &metadata, media).await
    }
}
