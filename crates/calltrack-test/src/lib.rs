//! Helpers for testing the call tracking service.
//!
//! When writing tests, keep the following points in mind:
//!
//!  - In every test, call [`setup`]. This will set up the logger so that all
//!    console output is captured by the test runner.
//!
//!  - When using [`HitCounter`], make sure that the server is held until all
//!    requests to it have been made. If the server is dropped, connections to
//!    it will fail. To avoid this, assign it to a variable:
//!    `let server = HitCounter::new();`.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Request};
use axum::middleware::{self, Next};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router, http::StatusCode};
use serde_json::json;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::fmt;
use url::Url;

/// Setup the test environment.
///
///  - Initializes logs: The logger only captures logs from the `calltrack`
///    crates and mutes everything else.
pub fn setup() {
    fmt()
        .with_env_filter(EnvFilter::new(
            "calltrack_service=trace,calltrack_cache=trace",
        ))
        .with_target(false)
        .pretty()
        .with_test_writer()
        .try_init()
        .ok();
}

/// A local HTTP server for tests.
pub struct Server {
    handle: tokio::task::JoinHandle<()>,
    socket: SocketAddr,
}

impl Server {
    fn with_router(router: Router) -> Self {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let socket = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let listener = tokio::net::TcpListener::from_std(listener).unwrap();
            axum::serve(listener, router).await.unwrap();
        });

        Self { handle, socket }
    }

    /// Returns the socket address that this server listens on.
    pub fn addr(&self) -> SocketAddr {
        self.socket
    }

    /// Returns the port that this server listens on.
    pub fn port(&self) -> u16 {
        self.addr().port()
    }

    /// Returns a full URL pointing to the given path.
    ///
    /// This URL uses `localhost` as hostname.
    pub fn url(&self, path: &str) -> Url {
        let path = path.trim_start_matches('/');
        format!("http://localhost:{}/{}", self.port(), path)
            .parse()
            .unwrap()
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// A test server simulating a call tracking vendor, counting the requests it
/// receives.
///
/// Routes:
///
///  - `/number/:num` responds with `{"phoneNumber": "+<num>"}`.
///  - `/formatted/:num` additionally includes a `formattedPhoneNumber` of
///    `(<num>)`.
///  - `/delay/:time/:num` sleeps for the given duration before responding
///    like `/number`.
///  - `/flaky/:num` responds with a server error on the first request per
///    path and like `/number` afterwards.
///  - `/respond_statuscode/:num` responds with the given status code.
///  - `/malformed` responds with a body that is not JSON.
///  - `/empty` responds with an empty `phoneNumber`.
pub struct HitCounter {
    server: Server,
    hits: Arc<Mutex<BTreeMap<String, usize>>>,
}

impl HitCounter {
    /// Creates a new test server.
    pub fn new() -> Self {
        let hits = Arc::new(Mutex::new(BTreeMap::new()));

        let hitcounter = {
            let hits = Arc::clone(&hits);
            move |req: Request, next: Next| {
                let hits = Arc::clone(&hits);
                async move {
                    {
                        let mut hits = hits.lock().unwrap();
                        let hits = hits.entry(req.uri().to_string()).or_default();
                        *hits += 1;
                    }

                    next.run(req).await
                }
            }
        };

        // The flaky route keeps its own per-path counter, independent of the
        // hit counter which is drained by `accesses`.
        let flaky_hits: Arc<Mutex<BTreeMap<String, usize>>> = Default::default();

        let router = Router::new()
            .route(
                "/number/:num",
                get(|Path(num): Path<String>| async move { number_response(&num) }),
            )
            .route(
                "/formatted/:num",
                get(|Path(num): Path<String>| async move {
                    Json(json!({
                        "phoneNumber": format!("+{num}"),
                        "formattedPhoneNumber": format!("({num})"),
                    }))
                }),
            )
            .route(
                "/delay/:time/:num",
                get(|Path((time, num)): Path<(String, String)>| async move {
                    let duration = humantime::parse_duration(&time).unwrap();
                    tokio::time::sleep(duration).await;

                    number_response(&num)
                }),
            )
            .route(
                "/flaky/:num",
                get({
                    let flaky_hits = Arc::clone(&flaky_hits);
                    move |Path(num): Path<String>| {
                        let flaky_hits = Arc::clone(&flaky_hits);
                        async move {
                            let attempt = {
                                let mut flaky_hits = flaky_hits.lock().unwrap();
                                let attempt = flaky_hits.entry(num.clone()).or_default();
                                *attempt += 1;
                                *attempt
                            };

                            if attempt == 1 {
                                StatusCode::INTERNAL_SERVER_ERROR.into_response()
                            } else {
                                number_response(&num).into_response()
                            }
                        }
                    }
                }),
            )
            .route(
                "/respond_statuscode/:num",
                get(|Path(num): Path<u16>| async move {
                    StatusCode::from_u16(num).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
                }),
            )
            .route("/malformed", get(|| async { "phone number: maybe" }))
            .route(
                "/empty",
                get(|| async { Json(json!({"phoneNumber": ""})) }),
            )
            .layer(middleware::from_fn(hitcounter));

        let server = Server::with_router(router);

        Self { server, hits }
    }

    /// Returns the total number of requests served so far, and resets the counts.
    pub fn accesses(&self) -> usize {
        let map = std::mem::take(&mut *self.hits.lock().unwrap());
        map.into_values().sum()
    }

    /// Returns a full URL pointing to the given path.
    pub fn url(&self, path: &str) -> Url {
        self.server.url(path)
    }
}

impl Default for HitCounter {
    fn default() -> Self {
        Self::new()
    }
}

fn number_response(num: &str) -> Json<serde_json::Value> {
    Json(json!({ "phoneNumber": format!("+{num}") }))
}
