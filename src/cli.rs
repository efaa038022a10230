use crate::{
    config::Config,
    drive::DriveApi,
    prompt::{plan_upload, Plan, Prompter},
    upload::{UploadOutcome, UploadRequest, Uploader},
};
use color_eyre::{
    eyre::{bail, WrapErr},
    owo_colors::OwoColorize,
};
use std::{env::args, future::Future};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UsageError {
    #[error("No filename given.")]
    MissingPath,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    pub path: String,
    ///anything after the path, which is not used
    pub ignored: Vec<String>,
}

impl Args {
    pub fn parse() -> Self {
        match Self::from_args(args().skip(1)) {
            Ok(args) => args,
            Err(e) => {
                eprintln!("{} {e}", "Error!".red().bold());
                eprintln!();
                print_usage();
                std::process::exit(1);
            }
        }
    }

    pub fn from_args(mut args: impl Iterator<Item = String>) -> Result<Self, UsageError> {
        let path = args.next().ok_or(UsageError::MissingPath)?;

        Ok(Self {
            path,
            ignored: args.collect(),
        })
    }
}

fn print_usage() {
    eprintln!(
        "{} is a command-line utility to upload a file to a Google Drive folder",
        "driveup".bold()
    );
    eprintln!();
    eprintln!("Usage: {} {}", "driveup".bold(), "[FILE]".blue());
    eprintln!(
        "  Uploads {} to the configured folder, revising a file of the same name if one exists",
        "FILE".blue()
    );
    eprintln!("  eg. `{}`", "driveup /tmp/report.csv".cyan());
    eprintln!();
    eprintln!("{}", "Environment Variables".underline());
    eprintln!(
        "{} - the ID of the Drive folder to upload to. Defaults to `root`",
        "DRIVE_FOLDER_ID".green()
    );
    eprintln!(
        "{} - whether to revise a same-named file instead of adding a new one. Defaults to `true`",
        "DRIVEUP_REVISE_EXISTING".green()
    );
    eprintln!(
        "{} - content type to upload with. Guessed from the extension if unset",
        "DRIVEUP_MIME_TYPE".green()
    );
    eprintln!(
        "{} - path to the OAuth client secret. Defaults to `credentials.json`",
        "DRIVEUP_CLIENT_SECRET".green()
    );
    eprintln!(
        "{} - path to the cached token. Defaults to `token.json`",
        "DRIVEUP_TOKEN_CACHE".green()
    );
    eprintln!(
        "{} - the sentry DSN for error reporting. Optional",
        "SENTRY_DSN".green()
    );
}

/// Runs one upload: the dialogue, then `connect`, then the upload itself.
///
/// Returns `None` when the user backs out, in which case `connect` is never called.
/// Neither is it when `args.path` is not a readable regular file.
pub async fn run<P, F, Fut, A>(
    prompter: &mut P,
    args: &Args,
    config: &Config,
    connect: F,
) -> color_eyre::Result<Option<UploadOutcome>>
where
    P: Prompter,
    F: FnOnce() -> Fut,
    Fut: Future<Output = color_eyre::Result<A>>,
    A: DriveApi,
{
    let Plan::Upload { name } = plan_upload(prompter, &args.path)? else {
        info!(path = %args.path, "Upload declined");
        return Ok(None);
    };

    let local = tokio::fs::metadata(&args.path)
        .await
        .wrap_err_with(|| format!("unable to read `{}`", args.path))?;
    if !local.is_file() {
        bail!("`{}` is not a file", args.path);
    }

    let request = UploadRequest::new(&args.path, name, config);
    let uploader = Uploader::new(connect().await?, config);
    let outcome = uploader.upload(&request).await?;

    Ok(Some(outcome))
}
