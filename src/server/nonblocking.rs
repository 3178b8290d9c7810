//! Non-blocking server host
//!
//! Exposes each handler operation as a JSON route:
//!
//! | Method | Path                                        | Handler    |
//! |--------|---------------------------------------------|------------|
//! | GET    | `/identity/plugin-info`                     | identity   |
//! | GET    | `/identity/capabilities`                    | identity   |
//! | GET    | `/identity/probe`                           | identity   |
//! | GET    | `/controller/capabilities`                  | controller |
//! | POST   | `/controller/validate-volume-capabilities`  | controller |
//! | GET    | `/node/info`                                | node       |
//! | GET    | `/node/capabilities`                        | node       |
//!
//! Routes of a handler that is not part of the set answer 501.

use super::endpoint::{parse_endpoint, Endpoint};
use crate::domain::ports::{AccessMode, HandlerSet, ServerHost};
use crate::error::{Error, Result};
use async_trait::async_trait;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, Server, StatusCode};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

// =============================================================================
// Request Types
// =============================================================================

/// Body of `POST /controller/validate-volume-capabilities`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateVolumeCapabilitiesRequest {
    pub volume_id: String,
    pub access_modes: Vec<AccessMode>,
}

// =============================================================================
// Server
// =============================================================================

/// Server host that binds on `start` and serves on a background task
///
/// Single use: once `stop` has been called, `start` is rejected.
#[derive(Default)]
pub struct NonBlockingServer {
    shutdown: CancellationToken,
    task: Mutex<Option<JoinHandle<Result<()>>>>,
    local_addr: Mutex<Option<SocketAddr>>,
}

impl NonBlockingServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound address of a tcp endpoint, once started
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.lock()
    }

    fn bind_tcp(&self, address: &str, handlers: Arc<HandlerSet>) -> Result<JoinHandle<Result<()>>> {
        let addr = address
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| Error::InvalidEndpoint {
                endpoint: address.to_string(),
                reason: "address did not resolve".to_string(),
            })?;

        let make_svc = make_service_fn(move |_conn| {
            let handlers = handlers.clone();
            async move {
                Ok::<_, Infallible>(service_fn(move |req| route(handlers.clone(), req)))
            }
        });

        let server = Server::try_bind(&addr)
            .map_err(|e| Error::Server(format!("failed to bind {}: {}", addr, e)))?
            .serve(make_svc);
        let local_addr = server.local_addr();
        *self.local_addr.lock() = Some(local_addr);
        info!("Listening for connections on tcp://{}", local_addr);

        let shutdown = self.shutdown.clone();
        let server = server.with_graceful_shutdown(async move { shutdown.cancelled().await });
        Ok(tokio::spawn(async move {
            server
                .await
                .map_err(|e| Error::Server(format!("server error: {}", e)))
        }))
    }

    fn bind_unix(
        &self,
        path: &std::path::Path,
        handlers: Arc<HandlerSet>,
    ) -> Result<JoinHandle<Result<()>>> {
        // Remove a socket left behind by a previous run
        if let Err(e) = std::fs::remove_file(path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                return Err(Error::Io(e));
            }
        }
        let listener = tokio::net::UnixListener::bind(path)?;
        info!("Listening for connections on unix://{}", path.display());

        let incoming = futures::stream::unfold(listener, |listener| async move {
            let conn = listener.accept().await.map(|(stream, _)| stream);
            Some((conn, listener))
        });

        let make_svc = make_service_fn(move |_conn| {
            let handlers = handlers.clone();
            async move {
                Ok::<_, Infallible>(service_fn(move |req| route(handlers.clone(), req)))
            }
        });

        let shutdown = self.shutdown.clone();
        let server = Server::builder(hyper::server::accept::from_stream(incoming))
            .serve(make_svc)
            .with_graceful_shutdown(async move { shutdown.cancelled().await });
        Ok(tokio::spawn(async move {
            server
                .await
                .map_err(|e| Error::Server(format!("server error: {}", e)))
        }))
    }
}

#[async_trait]
impl ServerHost for NonBlockingServer {
    async fn start(&self, endpoint: &str, handlers: HandlerSet) -> Result<()> {
        // The shutdown token is one-shot; a stopped host stays stopped.
        if self.shutdown.is_cancelled() {
            return Err(Error::Server("server already stopped".to_string()));
        }
        if self.task.lock().is_some() {
            return Err(Error::Server("server already started".to_string()));
        }

        let handlers = Arc::new(handlers);
        let task = match parse_endpoint(endpoint)? {
            Endpoint::Tcp(address) => self.bind_tcp(&address, handlers)?,
            Endpoint::Unix(path) => self.bind_unix(&path, handlers)?,
        };
        *self.task.lock() = Some(task);
        Ok(())
    }

    async fn wait(&self) -> Result<()> {
        let task = self.task.lock().take();
        let Some(task) = task else {
            return Err(Error::Server("server was not started".to_string()));
        };
        let result = task
            .await
            .map_err(|e| Error::Server(format!("server task failed: {}", e)))?;
        info!("Server stopped");
        result
    }

    fn stop(&self) {
        info!("Stopping server");
        self.shutdown.cancel();
    }
}

// =============================================================================
// Routing
// =============================================================================

async fn route(
    handlers: Arc<HandlerSet>,
    req: Request<Body>,
) -> std::result::Result<Response<Body>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    debug!("{} {}", method, path);

    let response = match dispatch(&handlers, &method, &path, req).await {
        Ok(response) => response,
        Err(e) => {
            error!("{} {} failed: {}", method, path, e);
            error_response(&e)
        }
    };
    Ok(response)
}

async fn dispatch(
    handlers: &HandlerSet,
    method: &Method,
    path: &str,
    req: Request<Body>,
) -> Result<Response<Body>> {
    match (method, path) {
        (&Method::GET, "/identity/plugin-info") => {
            json(StatusCode::OK, &handlers.identity.get_plugin_info().await?)
        }
        (&Method::GET, "/identity/capabilities") => {
            json(StatusCode::OK, &handlers.identity.get_plugin_capabilities().await?)
        }
        (&Method::GET, "/identity/probe") => json(StatusCode::OK, &handlers.identity.probe().await?),

        (&Method::GET, "/controller/capabilities") => match &handlers.controller {
            Some(controller) => json(StatusCode::OK, &controller.controller_get_capabilities().await?),
            None => not_implemented("controller"),
        },
        (&Method::POST, "/controller/validate-volume-capabilities") => match &handlers.controller {
            Some(controller) => {
                let body = hyper::body::to_bytes(req.into_body())
                    .await
                    .map_err(|e| Error::Server(format!("failed to read request body: {}", e)))?;
                let request: ValidateVolumeCapabilitiesRequest = serde_json::from_slice(&body)?;
                let result = controller
                    .validate_volume_capabilities(&request.volume_id, &request.access_modes)
                    .await?;
                json(StatusCode::OK, &result)
            }
            None => not_implemented("controller"),
        },

        (&Method::GET, "/node/info") => match &handlers.node {
            Some(node) => json(StatusCode::OK, &node.node_get_info().await?),
            None => not_implemented("node"),
        },
        (&Method::GET, "/node/capabilities") => match &handlers.node {
            Some(node) => json(StatusCode::OK, &node.node_get_capabilities().await?),
            None => not_implemented("node"),
        },

        _ => json(
            StatusCode::NOT_FOUND,
            &serde_json::json!({ "error": format!("no route for {} {}", method, path) }),
        ),
    }
}

fn json<T: Serialize>(status: StatusCode, value: &T) -> Result<Response<Body>> {
    Ok(respond(status, serde_json::to_vec(value)?))
}

fn not_implemented(service: &str) -> Result<Response<Body>> {
    json(
        StatusCode::NOT_IMPLEMENTED,
        &serde_json::json!({ "error": format!("{} service is not enabled", service) }),
    )
}

fn error_response(err: &Error) -> Response<Body> {
    let status = match err {
        Error::InvalidArgument(_) | Error::Json(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let body = serde_json::json!({ "error": err.to_string() }).to_string();
    respond(status, body.into_bytes())
}

fn respond(status: StatusCode, body: Vec<u8>) -> Response<Body> {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{CsiDriver, PluginConfig, PluginRole};
    use assert_matches::assert_matches;

    fn handlers(role: &str) -> HandlerSet {
        let config = PluginConfig {
            role: PluginRole::from(role),
            node_id: "node-1".to_string(),
            ..Default::default()
        };
        CsiDriver::new(config).unwrap().handlers()
    }

    async fn call(handlers: &HandlerSet, method: Method, path: &str, body: &str) -> (StatusCode, serde_json::Value) {
        let req = Request::builder()
            .method(method.clone())
            .uri(path)
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = route(Arc::new(handlers.clone()), req).await.unwrap();
        let status = response.status();
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_identity_routes() {
        let handlers = handlers("controller");
        let (status, body) = call(&handlers, Method::GET, "/identity/plugin-info", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "csi.storage.billyronks.io");

        let (status, body) = call(&handlers, Method::GET, "/identity/capabilities", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!(["CONTROLLER_SERVICE"]));
    }

    #[tokio::test]
    async fn test_missing_handler_answers_not_implemented() {
        let handlers = handlers("controller");
        let (status, _) = call(&handlers, Method::GET, "/node/info", "").await;
        assert_eq!(status, StatusCode::NOT_IMPLEMENTED);

        let handlers = self::handlers("node");
        let (status, _) = call(&handlers, Method::GET, "/controller/capabilities", "").await;
        assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
        let (status, body) = call(&handlers, Method::GET, "/node/info", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["node_id"], "node-1");
    }

    #[tokio::test]
    async fn test_validate_route() {
        let handlers = handlers("controller");
        let (status, body) = call(
            &handlers,
            Method::POST,
            "/controller/validate-volume-capabilities",
            r#"{"volume_id":"vol-1","access_modes":["SINGLE_NODE_WRITER"]}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["confirmed"], serde_json::json!(["SINGLE_NODE_WRITER"]));

        let (status, _) = call(
            &handlers,
            Method::POST,
            "/controller/validate-volume-capabilities",
            r#"{"volume_id":"","access_modes":["SINGLE_NODE_WRITER"]}"#,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(
            &handlers,
            Method::POST,
            "/controller/validate-volume-capabilities",
            "not json",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let (status, _) = call(&handlers("node"), Method::GET, "/nope", "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_wait_before_start() {
        let server = NonBlockingServer::new();
        assert_matches!(server.wait().await, Err(Error::Server(_)));
    }

    #[tokio::test]
    async fn test_invalid_endpoint() {
        let server = NonBlockingServer::new();
        let result = server.start("/tmp/csi.sock", handlers("node")).await;
        assert_matches!(result, Err(Error::InvalidEndpoint { .. }));
    }

    #[tokio::test]
    async fn test_unix_socket_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let socket = dir.path().join("csi.sock");
        // stale file from a previous run
        std::fs::write(&socket, b"").unwrap();

        let server = NonBlockingServer::new();
        let endpoint = format!("unix://{}", socket.display());
        server.start(&endpoint, handlers("node")).await.unwrap();
        assert!(socket.exists());

        assert_matches!(
            server.start(&endpoint, handlers("node")).await,
            Err(Error::Server(_))
        );

        server.stop();
        tokio_test::assert_ok!(server.wait().await);
    }

    #[tokio::test]
    async fn test_restart_after_stop_is_rejected() {
        let server = NonBlockingServer::new();
        server
            .start("tcp://127.0.0.1:0", handlers("controller"))
            .await
            .unwrap();
        server.stop();
        tokio_test::assert_ok!(server.wait().await);

        assert_matches!(
            server.start("tcp://127.0.0.1:0", handlers("controller")).await,
            Err(Error::Server(msg)) if msg == "server already stopped"
        );
        assert_matches!(server.wait().await, Err(Error::Server(_)));
    }

    #[tokio::test]
    async fn test_stop_before_start_is_sticky() {
        let server = NonBlockingServer::new();
        server.stop();
        assert_matches!(
            server.start("tcp://127.0.0.1:0", handlers("node")).await,
            Err(Error::Server(msg)) if msg == "server already stopped"
        );
        assert!(server.local_addr().is_none());
    }
}
