//! Fakes shared by the unit tests.

use crate::{
    drive::{DriveApi, Media, RemoteFile, TransferError},
    prompt::{choose, Prompter},
};
use color_eyre::eyre::eyre;
use http_body_util::{BodyExt, Full};
use hyper::{
    body::{Bytes, Incoming},
    header::HeaderMap,
    server::conn::http1,
    service::service_fn,
    Request, Response, StatusCode,
};
use hyper_util::rt::TokioIo;
use std::{
    cell::RefCell,
    collections::VecDeque,
    path::PathBuf,
    sync::{Arc, Mutex},
};
use tokio::net::TcpListener;

pub fn temp_path(name: &str) -> PathBuf {
    let mut suffix = [0_u8; 8];
    getrandom::getrandom(&mut suffix).unwrap();
    let suffix: String = suffix.iter().map(|x| format!("{x:02x}")).collect();

    let dir = std::env::temp_dir().join(format!("driveup-test-{suffix}"));
    std::fs::create_dir_all(&dir).unwrap();
    dir.join(name)
}

///`y`/`yes` in any case is yes, an empty line is `default`, anything else is no
fn is_affirmative(answer: &str, default: bool) -> bool {
    let answer = answer.trim();
    if answer.is_empty() {
        return default;
    }

    matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes")
}

pub struct ScriptedPrompter {
    answers: VecDeque<String>,
    pub asked: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new<const N: usize>(answers: [&str; N]) -> Self {
        Self {
            answers: answers.iter().map(|x| x.to_string()).collect(),
            asked: vec![],
        }
    }

    fn next(&mut self, asked: String) -> color_eyre::Result<String> {
        self.asked.push(asked.clone());
        self.answers
            .pop_front()
            .ok_or_else(|| eyre!("script ran out of answers at {asked:?}"))
    }
}

impl Prompter for ScriptedPrompter {
    fn input(&mut self, prompt: &str, default: &str) -> color_eyre::Result<String> {
        let answer = self.next(format!("{prompt} [{default}]"))?;
        Ok(choose(&answer, default))
    }

    fn confirm(&mut self, prompt: &str, default: bool) -> color_eyre::Result<bool> {
        let shown = if default { "y" } else { "n" };
        let answer = self.next(format!("{prompt} [{shown}]"))?;
        Ok(is_affirmative(&answer, default))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriveCall {
    Find { folder_id: String, name: String },
    Create { folder_id: String, name: String },
    Update { id: String, name: String },
}

#[derive(Default)]
pub struct FakeDrive {
    pub existing: Vec<RemoteFile>,
    ///id handed back by create, `None` means `created-1`
    pub created_id: Option<String>,
    pub calls: RefCell<Vec<DriveCall>>,
}

impl FakeDrive {
    pub fn with_existing(files: &[(&str, &str)]) -> Self {
        Self {
            existing: files
                .iter()
                .map(|(id, name)| RemoteFile {
                    id: id.to_string(),
                    name: name.to_string(),
                })
                .collect(),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<DriveCall> {
        self.calls.borrow().clone()
    }
}

impl DriveApi for FakeDrive {
    async fn find_by_name(
        &self,
        folder_id: &str,
        name: &str,
    ) -> Result<Vec<RemoteFile>, TransferError> {
        self.calls.borrow_mut().push(DriveCall::Find {
            folder_id: folder_id.into(),
            name: name.into(),
        });
        Ok(self
            .existing
            .iter()
            .filter(|x| x.name == name)
            .cloned()
            .collect())
    }

    async fn create(
        &self,
        folder_id: &str,
        name: &str,
        _media: &Media,
    ) -> Result<RemoteFile, TransferError> {
        self.calls.borrow_mut().push(DriveCall::Create {
            folder_id: folder_id.into(),
            name: name.into(),
        });
        Ok(RemoteFile {
            id: self.created_id.clone().unwrap_or_else(|| "created-1".into()),
            name: name.into(),
        })
    }

    async fn update(
        &self,
        id: &str,
        name: &str,
        _media: &Media,
    ) -> Result<RemoteFile, TransferError> {
        self.calls.borrow_mut().push(DriveCall::Update {
            id: id.into(),
            name: name.into(),
        });
        Ok(RemoteFile {
            id: id.into(),
            name: name.into(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub query: String,
    pub headers: HeaderMap,
    pub body: String,
}

impl Recorded {
    pub fn query_pair(&self, key: &str) -> Option<String> {
        reqwest::Url::parse(&format!("http://localhost/?{}", self.query))
            .ok()?
            .query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    pub fn form_pair(&self, key: &str) -> Option<String> {
        reqwest::Url::parse(&format!("http://localhost/?{}", self.body))
            .ok()?
            .query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    pub fn header(&self, name: &str) -> Option<String> {
        self.headers
            .get(name)
            .and_then(|x| x.to_str().ok())
            .map(ToOwned::to_owned)
    }
}

pub struct Reply {
    pub status: u16,
    pub headers: Vec<(&'static str, String)>,
    pub body: String,
}

impl Reply {
    pub fn json(status: u16, body: &str) -> Self {
        Self {
            status,
            headers: vec![("Content-Type", "application/json".into())],
            body: body.into(),
        }
    }

    pub fn empty(status: u16) -> Self {
        Self {
            status,
            headers: vec![],
            body: String::new(),
        }
    }

    pub fn with_header(mut self, name: &'static str, value: String) -> Self {
        self.headers.push((name, value));
        self
    }
}

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// An HTTP server on a random loopback port that answers with `handler` and
/// remembers every request it saw.
pub struct TestServer {
    pub base: String,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl TestServer {
    pub async fn start<F>(handler: F) -> Self
    where
        F: Fn(&Recorded, &str) -> Reply + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(vec![]));
        let handler = Arc::new(handler);

        let task_base = base.clone();
        let task_requests = requests.clone();
        tokio::spawn(async move {
            while let Ok((stream, _addr)) = listener.accept().await {
                let handler = handler.clone();
                let requests = task_requests.clone();
                let base = task_base.clone();

                let svc = service_fn(move |req: Request<Incoming>| {
                    let handler = handler.clone();
                    let requests = requests.clone();
                    let base = base.clone();
                    async move {
                        let (parts, body) = req.into_parts();
                        let body = body.collect().await?.to_bytes();
                        let recorded = Recorded {
                            method: parts.method.to_string(),
                            path: parts.uri.path().to_owned(),
                            query: parts.uri.query().unwrap_or_default().to_owned(),
                            headers: parts.headers,
                            body: String::from_utf8_lossy(&body).into_owned(),
                        };

                        let reply = handler(&recorded, &base);
                        requests.lock().unwrap().push(recorded);

                        let mut builder =
                            Response::builder().status(StatusCode::from_u16(reply.status)?);
                        for (name, value) in reply.headers {
                            builder = builder.header(name, value);
                        }
                        Ok::<_, BoxError>(builder.body(Full::new(Bytes::from(reply.body)))?)
                    }
                });

                let conn = http1::Builder::new().serve_connection(TokioIo::new(stream), svc);
                tokio::spawn(conn);
            }
        });

        Self { base, requests }
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }
}

#[test]
fn scripted_confirm_answers() {
    assert!(is_affirmative("", true));
    assert!(!is_affirmative("", false));
    assert!(is_affirmative("Y", false));
    assert!(is_affirmative("yes", false));
    assert!(!is_affirmative("n", true));
    assert!(!is_affirmative("sure", true));
}
