use color_eyre::eyre::{bail, WrapErr};
use mime::Mime;
use std::path::PathBuf;

///Drive alias for the root of "My Drive"
pub const DEFAULT_FOLDER_ID: &str = "root";
pub const DEFAULT_CLIENT_SECRET: &str = "credentials.json";
pub const DEFAULT_TOKEN_CACHE: &str = "token.json";

pub const FILES_URI: &str = "https://www.googleapis.com/drive/v3/files";
pub const UPLOAD_URI: &str = "https://www.googleapis.com/upload/drive/v3/files";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub files: String,
    pub upload: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            files: FILES_URI.to_owned(),
            upload: UPLOAD_URI.to_owned(),
        }
    }
}

/// Everything a run needs to know that isn't typed in at the prompt.
///
/// Built once in `main` and handed to the [`crate::auth::CredentialManager`] and
/// the [`crate::upload::Uploader`].
#[derive(Debug, Clone)]
pub struct Config {
    pub folder_id: String,
    ///if a file with the upload name already exists in the folder, add a revision instead of a new file
    pub revise_existing: bool,
    ///when unset, the content type is guessed from the file extension
    pub mime_type: Option<Mime>,
    pub client_secret_path: PathBuf,
    pub token_cache_path: PathBuf,
    pub endpoints: Endpoints,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            folder_id: DEFAULT_FOLDER_ID.to_owned(),
            revise_existing: true,
            mime_type: None,
            client_secret_path: PathBuf::from(DEFAULT_CLIENT_SECRET),
            token_cache_path: PathBuf::from(DEFAULT_TOKEN_CACHE),
            endpoints: Endpoints::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> color_eyre::Result<Self> {
        Self::from_lookup(|key| dotenvy::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> color_eyre::Result<Self> {
        let mut config = Self::default();

        if let Some(folder_id) = lookup("DRIVE_FOLDER_ID").filter(|x| !x.trim().is_empty()) {
            config.folder_id = folder_id.trim().to_owned();
        }

        if let Some(revise) = lookup("DRIVEUP_REVISE_EXISTING") {
            config.revise_existing = parse_bool(&revise)
                .wrap_err("unable to parse env var DRIVEUP_REVISE_EXISTING")?;
        }

        if let Some(mime_type) = lookup("DRIVEUP_MIME_TYPE").filter(|x| !x.trim().is_empty()) {
            let mime_type: Mime = mime_type
                .trim()
                .parse()
                .wrap_err_with(|| format!("invalid DRIVEUP_MIME_TYPE {mime_type:?}"))?;
            config.mime_type = Some(mime_type);
        }

        if let Some(path) = lookup("DRIVEUP_CLIENT_SECRET") {
            config.client_secret_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("DRIVEUP_TOKEN_CACHE") {
            config.token_cache_path = PathBuf::from(path);
        }

        debug!(?config, "Loaded config");

        Ok(config)
    }
}

fn parse_bool(raw: &str) -> color_eyre::Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Ok(true),
        "0" | "false" | "no" | "n" | "off" => Ok(false),
        other => bail!("expected a boolean, found {other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = Config::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config.folder_id, "root");
        assert!(config.revise_existing);
        assert!(config.mime_type.is_none());
        assert_eq!(config.client_secret_path, PathBuf::from("credentials.json"));
        assert_eq!(config.token_cache_path, PathBuf::from("token.json"));
        assert_eq!(config.endpoints, Endpoints::default());
    }

    #[test]
    fn reads_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("DRIVE_FOLDER_ID", " 1AbCdEf "),
            ("DRIVEUP_REVISE_EXISTING", "no"),
            ("DRIVEUP_MIME_TYPE", "text/csv"),
            ("DRIVEUP_CLIENT_SECRET", "/etc/driveup/secret.json"),
            ("DRIVEUP_TOKEN_CACHE", "/tmp/token.json"),
        ]))
        .unwrap();

        assert_eq!(config.folder_id, "1AbCdEf");
        assert!(!config.revise_existing);
        assert_eq!(config.mime_type, Some(mime::TEXT_CSV));
        assert_eq!(
            config.client_secret_path,
            PathBuf::from("/etc/driveup/secret.json")
        );
        assert_eq!(config.token_cache_path, PathBuf::from("/tmp/token.json"));
    }

    #[test]
    fn blank_mime_type_means_guess() {
        let config = Config::from_lookup(lookup(&[("DRIVEUP_MIME_TYPE", "  ")])).unwrap();
        assert!(config.mime_type.is_none());
    }

    #[test]
    fn rejects_bad_values() {
        assert!(Config::from_lookup(lookup(&[("DRIVEUP_REVISE_EXISTING", "maybe")])).is_err());
        assert!(Config::from_lookup(lookup(&[("DRIVEUP_MIME_TYPE", "not a mime")])).is_err());
    }
}
