#![allow(dead_code)]

use std::{
    convert::Infallible,
    net::SocketAddr,
    path::Path,
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{
    Router,
    body::{Body, Bytes},
    extract::State,
    http::{Method, StatusCode, Uri, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use futures::StreamExt as _;
use osc_cam_rs::client::ClientConfig;
use serde_json::Value;
use tokio::net::TcpListener;

/// A request received by the fake camera.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: String,
    pub path: String,
    pub body: Vec<u8>,
}

impl Request {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or(Value::Null)
    }

    /// Name of a `commands/execute` request.
    pub fn command(&self) -> Option<String> {
        self.json().get("name").and_then(Value::as_str).map(str::to_owned)
    }
}

/// A reply of the fake camera. The body is sent in `chunks`, with a short pause between them.
pub struct Reply {
    pub status: u16,
    pub chunks: Vec<Vec<u8>>,
    /// Never answer, keeping the connection open.
    pub stall: bool,
}

impl Reply {
    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            chunks: vec![serde_json::to_vec(&body).unwrap()],
            stall: false,
        }
    }

    pub fn chunked(chunks: Vec<Vec<u8>>) -> Self {
        Self {
            status: 200,
            chunks,
            stall: false,
        }
    }

    pub fn stalled() -> Self {
        Self {
            status: 200,
            chunks: Vec::new(),
            stall: true,
        }
    }
}

type Handler = Arc<dyn Fn(&Request) -> Reply + Send + Sync>;

struct Camera {
    handler: Handler,
    requests: Arc<Mutex<Vec<Request>>>,
}

/// An HTTP server standing in for a camera, answering every path with `handler`.
pub struct FakeCamera {
    listener: TcpListener,
    pub addr: SocketAddr,
    pub requests: Arc<Mutex<Vec<Request>>>,
}

impl FakeCamera {
    pub async fn bind() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
        let addr = listener.local_addr().unwrap();

        Self {
            listener,
            addr,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Client configuration pointing at this server.
    pub fn config(&self) -> ClientConfig {
        ClientConfig {
            status_poll_interval_ms: 10,
            ..ClientConfig::new("127.0.0.1", self.port())
        }
    }

    /// Client configuration pointing at this server, writing files into `dir`.
    pub fn config_in(&self, dir: &Path) -> ClientConfig {
        ClientConfig {
            output_dir: dir.to_owned(),
            ..self.config()
        }
    }

    /// Starts answering requests with `handler`.
    ///
    /// Returns the list of received requests.
    pub fn serve(self, handler: impl Fn(&Request) -> Reply + Send + Sync + 'static) -> Arc<Mutex<Vec<Request>>> {
        let camera = Arc::new(Camera {
            handler: Arc::new(handler),
            requests: self.requests.clone(),
        });

        let app = Router::new().fallback(answer).with_state(camera);
        let listener = self.listener;

        tokio::spawn(async move { axum::serve(listener, app).await });

        self.requests
    }
}

async fn answer(State(camera): State<Arc<Camera>>, method: Method, uri: Uri, body: Bytes) -> Response {
    let request = Request {
        method: method.to_string(),
        path: uri.path().to_owned(),
        body: body.to_vec(),
    };

    let reply = (camera.handler)(&request);
    camera.requests.lock().unwrap().push(request);

    if reply.stall {
        std::future::pending::<()>().await;
    }

    let chunks = futures::stream::iter(reply.chunks).then(|chunk| async move {
        tokio::time::sleep(Duration::from_millis(5)).await;
        Ok::<_, Infallible>(chunk)
    });

    (
        StatusCode::from_u16(reply.status).unwrap(),
        [(CONTENT_TYPE, "application/json")],
        Body::from_stream(chunks),
    )
        .into_response()
}

/// Names of the files in `dir`, sorted.
pub fn files_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// `info` response advertising `port` for both HTTP endpoints.
pub fn info_reply(port: u16, api: &[&str]) -> Reply {
    Reply::json(
        200,
        serde_json::json!({
            "manufacturer": "Fake",
            "model": "Fake 360",
            "firmwareVersion": "1.0",
            "endpoints": { "httpPort": port, "httpUpdatesPort": port },
            "api": api,
        }),
    )
}

pub fn session_reply() -> Reply {
    Reply::json(
        200,
        serde_json::json!({
            "name": "camera.startSession",
            "state": "done",
            "results": { "sessionId": "SID_0001", "timeout": 180 },
        }),
    )
}

/// API list of a camera supporting every endpoint used by the tests.
pub const FULL_API: &[&str] = &[
    "/osc/info",
    "/osc/state",
    "/osc/checkForUpdates",
    "/osc/commands/execute",
    "/osc/commands/status",
    "/osc/_bublUpdate",
    "/osc/_bublGetImage",
    "/osc/commands/_bublStop",
    "/osc/commands/_bublPoll",
];
