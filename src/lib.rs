use dotenvy::var;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub mod auth;
pub mod cli;
pub mod config;
pub mod drive;
pub mod prompt;
pub mod upload;

#[cfg(test)]
mod testing;

#[macro_use]
extern crate tracing;

pub fn setup() {
    if cfg!(debug_assertions) {
        for (key, value) in &[
            ("RUST_SPANTRACE", "full"),
            ("RUST_LIB_BACKTRACE", "full"),
            ("RUST_BACKTRACE", "full"),
            ("RUST_LOG", "info"),
        ] {
            match std::env::var(key) {
                Err(_) => {
                    trace!(%key, %value, "Setting env var");
                    // SAFETY: runs once at startup, before any other thread exists
                    unsafe { std::env::set_var(key, value) };
                }
                Ok(found) => {
                    trace!(%key, %found, "Found existing env var");
                }
            }
        }
    }

    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Error loading .env: {e:?}");
        }
    }

    let sub = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env());

    if var("SENTRY_DSN").is_ok() {
        sub.with(sentry::integrations::tracing::layer()).init();
    } else {
        sub.init();
    }

    color_eyre::install().expect("unable to install color-eyre");
}

///Keeps the sentry client alive for the rest of `main` when a DSN is configured
pub fn init_sentry() -> Option<sentry::ClientInitGuard> {
    let dsn = match var("SENTRY_DSN") {
        Ok(x) => match x.parse() {
            Ok(x) => x,
            Err(e) => {
                warn!(?e, "Error parsing sentry DSN");
                return None;
            }
        },
        Err(_) => {
            debug!("No Sentry DSN detected");
            return None;
        }
    };

    Some(sentry::init(sentry::ClientOptions {
        dsn: Some(dsn),
        release: sentry::release_name!(),
        ..Default::default()
    }))
}
