use crate::{
    config::Config,
    drive::{DriveApi, Media, TransferError},
};
use color_eyre::owo_colors::OwoColorize;
use mime::Mime;
use std::{
    fmt::{Display, Formatter},
    path::{Path, PathBuf},
};

#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub local_path: PathBuf,
    pub display_name: String,
    pub folder_id: String,
    pub mime_type: Option<Mime>,
}

impl UploadRequest {
    pub fn new(local_path: impl Into<PathBuf>, display_name: String, config: &Config) -> Self {
        Self {
            local_path: local_path.into(),
            display_name,
            folder_id: config.folder_id.clone(),
            mime_type: config.mime_type.clone(),
        }
    }

    ///configured hint, or a guess from the extension
    pub fn content_type(&self) -> Mime {
        content_type(self.mime_type.as_ref(), &self.local_path)
    }
}

pub fn content_type(hint: Option<&Mime>, path: &Path) -> Mime {
    match hint {
        Some(hint) => hint.clone(),
        None => new_mime_guess::from_path(path).first_or_octet_stream(),
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum UploadAction {
    Created,
    Revised,
}

impl Display for UploadAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadAction::Created => write!(f, "created"),
            UploadAction::Revised => write!(f, "revised"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    pub id: String,
    pub action: UploadAction,
}

pub struct Uploader<A> {
    api: A,
    revise_existing: bool,
}

impl<A: DriveApi> Uploader<A> {
    pub fn new(api: A, config: &Config) -> Self {
        Self {
            api,
            revise_existing: config.revise_existing,
        }
    }

    /// Revises the first same-named file in the folder, or creates a new one.
    ///
    /// Which file gets revised when several share the name is down to the order the
    /// API lists them in.
    #[instrument(skip_all, fields(name = %request.display_name, folder = %request.folder_id))]
    pub async fn upload(&self, request: &UploadRequest) -> Result<UploadOutcome, TransferError> {
        let media = Media {
            path: request.local_path.clone(),
            mime_type: request.content_type(),
        };

        let existing = if self.revise_existing {
            self.api
                .find_by_name(&request.folder_id, &request.display_name)
                .await?
                .into_iter()
                .next()
        } else {
            None
        };

        let (file, action) = match existing {
            Some(existing) => {
                println!("\n{}", "> Updating existing file...".bold());
                info!(id = %existing.id, "Revising existing file");
                let file = self
                    .api
                    .update(&existing.id, &request.display_name, &media)
                    .await?;
                (file, UploadAction::Revised)
            }
            None => {
                println!("\n{}", "> Adding new file...".bold());
                info!("Creating new file");
                let file = self
                    .api
                    .create(&request.folder_id, &request.display_name, &media)
                    .await?;
                (file, UploadAction::Created)
            }
        };

        if file.id.is_empty() {
            return Err(TransferError::MissingId);
        }

        info!(id = %file.id, %action, "Upload finished");
        Ok(UploadOutcome {
            id: file.id,
            action,
        })
    }
}
