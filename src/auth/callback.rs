use crate::auth::AuthError;
use http_body_util::Full;
use hyper::{
    body::{Bytes, Incoming},
    http,
    server::conn::http1,
    service::Service,
    Method, Request, Response, StatusCode,
};
use hyper_util::rt::TokioIo;
use std::{future::Future, net::SocketAddr, pin::Pin, sync::Arc, time::Duration};
use tokio::{
    net::TcpListener,
    sync::mpsc::{channel, Sender},
    task::JoinSet,
};

const DONE_PAGE: &str = "<html><body><h3>driveup</h3><p>Authorization complete. You may close this window.</p></body></html>";
const FAILED_PAGE: &str = "<html><body><h3>driveup</h3><p>Authorization failed. Check the terminal for details.</p></body></html>";

///Query parameters of the redirect back from the consent screen
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

impl CallbackParams {
    pub fn from_query(query: &str) -> Self {
        let mut params = Self::default();
        let Ok(url) = reqwest::Url::parse(&format!("http://127.0.0.1/?{query}")) else {
            return params;
        };

        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "code" => params.code = Some(value.into_owned()),
                "state" => params.state = Some(value.into_owned()),
                "error" => params.error = Some(value.into_owned()),
                _ => {}
            }
        }
        params
    }

    fn is_redirect(&self) -> bool {
        self.code.is_some() || self.error.is_some()
    }

    ///The authorization code, provided `state` is the one we sent
    pub fn into_code(self, expected_state: &str) -> Result<String, AuthError> {
        if let Some(error) = self.error {
            return Err(AuthError::Denied(error));
        }
        if self.state.as_deref() != Some(expected_state) {
            return Err(AuthError::StateMismatch);
        }
        self.code.ok_or(AuthError::MissingCode)
    }
}

#[derive(Debug, Clone)]
struct CallbackService {
    expected_state: Arc<str>,
    found: Sender<CallbackParams>,
}

impl Service<Request<Incoming>> for CallbackService {
    type Response = Response<Full<Bytes>>;
    type Error = http::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let found = self.found.clone();
        let expected_state = self.expected_state.clone();

        Box::pin(async move {
            if req.method() != Method::GET {
                return Response::builder()
                    .status(StatusCode::METHOD_NOT_ALLOWED)
                    .body(Full::default());
            }

            let params = CallbackParams::from_query(req.uri().query().unwrap_or_default());
            if !params.is_redirect() {
                trace!(path = %req.uri().path(), "Ignoring unrelated request");
                return Response::builder()
                    .status(StatusCode::NOT_FOUND)
                    .body(Full::default());
            }

            //only the redirect carrying our state may end the wait
            if params.state.as_deref() != Some(&*expected_state) {
                warn!(state = ?params.state, "Ignoring callback with an unexpected state");
                return Response::builder()
                    .status(StatusCode::BAD_REQUEST)
                    .header("Content-Type", "text/html; charset=utf-8")
                    .body(Full::new(Bytes::from_static(FAILED_PAGE.as_bytes())));
            }

            let page = if params.error.is_some() {
                FAILED_PAGE
            } else {
                DONE_PAGE
            };
            let _ = found.send(params).await;

            Response::builder()
                .status(StatusCode::OK)
                .header("Content-Type", "text/html; charset=utf-8")
                .header("Connection", "close")
                .body(Full::new(Bytes::from_static(page.as_bytes())))
        })
    }
}

/// A one-shot HTTP listener on the loopback interface that the consent screen
/// redirects back to.
pub struct Loopback {
    listener: TcpListener,
    addr: SocketAddr,
}

impl Loopback {
    pub async fn bind() -> Result<Self, AuthError> {
        let listener = TcpListener::bind(("127.0.0.1", 0))
            .await
            .map_err(AuthError::Listener)?;
        let addr = listener.local_addr().map_err(AuthError::Listener)?;
        debug!(?addr, "Bound authorization listener");

        Ok(Self { listener, addr })
    }

    pub fn redirect_uri(&self) -> String {
        format!("http://{}/", self.addr)
    }

    ///Serves connections until a redirect carrying `expected_state` and a code or an error arrives
    pub async fn wait_for_code(self, expected_state: &str) -> Result<String, AuthError> {
        let (send, mut recv) = channel(1);
        let svc = CallbackService {
            expected_state: Arc::from(expected_state),
            found: send,
        };
        let mut http = http1::Builder::new();
        http.keep_alive(false);

        let mut connections = JoinSet::new();

        let params = loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    let (stream, peer) = accepted.map_err(AuthError::Listener)?;
                    trace!(?peer, "Accepted callback connection");

                    let conn = http.serve_connection(TokioIo::new(stream), svc.clone());
                    connections.spawn(async move {
                        if let Err(e) = conn.await {
                            warn!(?e, "Error serving callback request");
                        }
                    });
                }
                Some(params) = recv.recv() => break params,
            }
        };

        //let the browser get its page before the listener goes away
        let drain = async { while connections.join_next().await.is_some() {} };
        if tokio::time::timeout(Duration::from_secs(2), drain).await.is_err() {
            debug!("Timed out waiting for callback connections to close");
        }

        params.into_code(expected_state)
    }
}
