mod matches;
mod rounds;
mod stage_items;
mod stages;
mod tournaments;

use crate::engine;
use crate::{Error, State, StatusCodeError};

use std::convert::Infallible;
use std::fmt::Display;
use std::net::SocketAddr;
use std::pin::Pin;
use std::str::FromStr;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::future::BoxFuture;
use futures::Future;
use hyper::header::{
    HeaderValue, IntoHeaderName, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_ORIGIN,
    CONTENT_LENGTH, CONTENT_TYPE, ORIGIN,
};
use hyper::http::request::Parts;
use hyper::server::conn::Http;
use hyper::service::Service;
use hyper::{Body, HeaderMap, Method, StatusCode, Uri};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::net::TcpSocket;
use tokio::time::Instant;
use tourney_api::error::ErrorResponse;

/// The maximum size of a request body in bytes.
const MAX_BODY_SIZE: u64 = 16384;

/// The time a client has to transmit the request body.
const BODY_TIMEOUT: Duration = Duration::from_secs(30);

pub type Result = std::result::Result<Response, Error>;

pub async fn bind(addr: SocketAddr, state: State) -> std::result::Result<(), Error> {
    let mut shutdown_rx = state.shutdown_rx.clone();

    let service = RootService { state };

    let socket = match addr {
        SocketAddr::V4(_) => TcpSocket::new_v4()?,
        SocketAddr::V6(_) => TcpSocket::new_v6()?,
    };
    if let Err(err) = socket.set_reuseaddr(true) {
        log::warn!("Failed to set SO_REUSEADDR flag: {}", err);
    }

    socket.bind(addr)?;
    let listener = socket.listen(1024)?;
    log::info!("Listening on {}", addr);

    loop {
        tokio::select! {
            res = listener.accept() => {
                let (stream, addr) = match res {
                    Ok((stream, addr)) => (stream, addr),
                    Err(err) => {
                        log::warn!("Failed to accept connection: {:?}", err);
                        continue;
                    }
                };
                log::debug!("Accepting new connection from {:?}", addr);

                let service = service.clone();
                let mut shutdown_rx = shutdown_rx.clone();
                tokio::task::spawn(async move {
                    let conn = Http::new()
                        .http1_keep_alive(true)
                        .serve_connection(stream, service);
                    tokio::pin!(conn);

                    tokio::select! {
                        res = &mut conn => {
                            if let Err(err) = res {
                                log::warn!("Http error: {:?}", err);
                            }
                        }
                        _ = shutdown_rx.changed() => {
                            log::debug!("Shutting down connection");
                            conn.as_mut().graceful_shutdown();

                            if let Err(err) = conn.await {
                                log::warn!("Http error: {:?}", err);
                            }
                        }
                    }
                });
            }
            // Shut down the server.
            _ = shutdown_rx.changed() => {
                log::debug!("Shutting down http server");
                return Ok(());
            }
        }
    }
}

#[derive(Clone, Debug)]
struct RootService {
    state: State,
}

impl Service<hyper::Request<Body>> for RootService {
    type Response = hyper::Response<Body>;
    type Error = Infallible;
    type Future = RootServiceFuture;

    fn poll_ready(&mut self, _cx: &mut Context) -> Poll<std::result::Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    #[inline]
    fn call(&mut self, req: hyper::Request<Body>) -> Self::Future {
        RootServiceFuture(Box::pin(service_root(req, self.state.clone())))
    }
}

struct RootServiceFuture(BoxFuture<'static, std::result::Result<hyper::Response<Body>, Infallible>>);

impl Future for RootServiceFuture {
    type Output = std::result::Result<hyper::Response<Body>, Infallible>;

    #[inline]
    fn poll(mut self: Pin<&mut Self>, cx: &mut Context) -> Poll<Self::Output> {
        self.0.as_mut().poll(cx)
    }
}

async fn service_root(
    req: hyper::Request<Body>,
    state: State,
) -> std::result::Result<hyper::Response<Body>, Infallible> {
    log::trace!("Received Request:");
    log::trace!("Head: {} {}", req.method(), req.uri());
    log::trace!("Headers: {:?}", req.headers());

    let req = Request::new(req, state);
    let origin = req.headers().get(ORIGIN).cloned();

    let res = route(req).await;

    let mut resp = match res {
        Ok(resp) => resp,
        Err(err) => error_response(err),
    };

    if let Some(origin) = origin {
        log::trace!("Setting CORS for origin: {:?}", origin);
        resp = resp.header(ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    }

    resp = resp.header(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("content-type"),
    );

    Ok(resp.build())
}

async fn route(req: Request) -> Result {
    if matches!(*req.method(), Method::POST | Method::PUT | Method::PATCH)
        && req.content_length()? > MAX_BODY_SIZE
    {
        return Err(StatusCodeError::payload_too_large().into());
    }

    let path = String::from(req.uri().path());
    let mut uri = RequestUri::new(&path);

    log::debug!("{} {:?}", req.method(), uri);

    match uri.take_str() {
        Some("rounds") => rounds::route(req, uri).await,
        Some("stages") => stages::route(req, uri).await,
        Some("stageItem") => stage_items::route(req, uri).await,
        Some("match") => matches::route(req, uri).await,
        Some("tournaments") => tournaments::route(req, uri).await,
        _ => Err(StatusCodeError::not_found().into()),
    }
}

/// Converts an [`Error`] into the response returned to the client.
fn error_response(err: Error) -> Response {
    let (status, body) = match err {
        Error::Engine(err) => {
            let status = match err {
                engine::Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
                engine::Error::AlreadyScheduled(_)
                | engine::Error::MatchCompleted(_)
                | engine::Error::ConcurrencyConflict => StatusCode::CONFLICT,
                engine::Error::NotFound { .. } => StatusCode::NOT_FOUND,
                engine::Error::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            };

            let body = if status == StatusCode::INTERNAL_SERVER_ERROR {
                log::error!("{}", err);
                ErrorResponse::new(err.code(), "Internal Server Error")
            } else {
                ErrorResponse::new(err.code(), &err)
            };

            (status, body)
        }
        Error::StatusCodeError(err) => {
            let code = err
                .code
                .canonical_reason()
                .unwrap_or("error")
                .to_lowercase()
                .replace(' ', "_");

            (err.code, ErrorResponse::new(code, err.message))
        }
        err => {
            log::error!("{}", err);

            (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new("internal", "Internal Server Error"),
            )
        }
    };

    Response::ok().status(status).json(&body).unwrap_or_else(|err| {
        log::error!("Failed to serialize error response: {}", err);
        Response::ok().status(StatusCode::INTERNAL_SERVER_ERROR)
    })
}

#[derive(Debug)]
pub struct Request {
    pub parts: Parts,
    pub body: Option<Body>,
    state: State,
}

impl Request {
    #[inline]
    fn new(req: hyper::Request<Body>, state: State) -> Self {
        let (parts, body) = req.into_parts();

        Self {
            parts,
            body: Some(body),
            state,
        }
    }

    #[inline]
    pub fn state(&self) -> &State {
        &self.state
    }

    #[inline]
    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    #[inline]
    pub fn headers(&self) -> &HeaderMap<HeaderValue> {
        &self.parts.headers
    }

    #[inline]
    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    /// Reads the body and deserializes it from json. The body must arrive within
    /// [`BODY_TIMEOUT`].
    pub async fn json<T>(&mut self) -> std::result::Result<T, Error>
    where
        T: DeserializeOwned,
    {
        let body = match self.body.take() {
            Some(body) => body,
            None => {
                return Err(StatusCodeError::bad_request()
                    .message("body already consumed")
                    .into())
            }
        };

        let deadline = Instant::now() + BODY_TIMEOUT;

        let bytes = tokio::select! {
            res = hyper::body::to_bytes(body) => {
                res?
            }
            _ = tokio::time::sleep_until(deadline) => {
                log::info!("Client failed to transmit body in {}s, dropping connection", BODY_TIMEOUT.as_secs());
                return Err(StatusCodeError::request_timeout().into());
            }
        };

        // The header may be missing or lie about the size.
        if bytes.len() as u64 > MAX_BODY_SIZE {
            return Err(StatusCodeError::payload_too_large().into());
        }

        match serde_json::from_slice(&bytes) {
            Ok(value) => Ok(value),
            Err(err) => Err(StatusCodeError::new(StatusCode::BAD_REQUEST, err).into()),
        }
    }

    /// Returns the value of the "Content-Length" header. If the header is not present or has an
    /// invalid value an error is returned.
    pub fn content_length(&self) -> std::result::Result<u64, Error> {
        match self.headers().get(CONTENT_LENGTH) {
            Some(value) => match value.to_str().ok().and_then(|value| value.parse().ok()) {
                Some(value) => Ok(value),
                None => {
                    log::debug!("Invalid \"Content-Length\" header: {:?}", value);

                    Err(StatusCodeError::bad_request().into())
                }
            },
            None => Err(StatusCodeError::length_required().into()),
        }
    }

    /// Returns `true` if the query parameter `key` is set to `true` or `1`. A missing parameter
    /// is `false`.
    pub fn query_flag(&self, key: &str) -> std::result::Result<bool, Error> {
        let query = self.uri().query().unwrap_or_default();

        for pair in query.split('&') {
            let (name, value) = pair.split_once('=').unwrap_or((pair, "true"));
            if name != key {
                continue;
            }

            return match value {
                "true" | "1" => Ok(true),
                "false" | "0" => Ok(false),
                _ => Err(StatusCodeError::bad_request()
                    .message(format!("invalid value for {}: {}", key, value))
                    .into()),
            };
        }

        Ok(false)
    }
}

#[derive(Copy, Clone, Debug)]
pub struct RequestUri<'a> {
    path: &'a str,
}

impl<'a> RequestUri<'a> {
    pub fn new(mut path: &'a str) -> Self {
        if let Some(stripped) = path.strip_prefix('/') {
            path = stripped;
        }

        Self { path }
    }

    pub fn take(&mut self) -> Option<UriPart> {
        let part = self.take_str()?;

        Some(UriPart { part })
    }

    pub fn take_str(&mut self) -> Option<&str> {
        if self.path.is_empty() {
            None
        } else {
            Some(match self.path.split_once('/') {
                Some((part, rem)) => {
                    self.path = rem;
                    part
                }
                None => {
                    let path = self.path;
                    self.path = "";
                    path
                }
            })
        }
    }
}

#[derive(Copy, Clone, Debug)]
pub struct UriPart<'a> {
    part: &'a str,
}

impl<'a> UriPart<'a> {
    pub fn parse<T>(&self) -> std::result::Result<T, Error>
    where
        T: FromStr,
    {
        match self.part.parse() {
            Ok(v) => Ok(v),
            Err(_) => Err(StatusCodeError::bad_request()
                .message(format!("invalid id: {}", self.part))
                .into()),
        }
    }
}

#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Body,
}

impl Response {
    /// 200 OK
    pub fn ok() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Body::empty(),
        }
    }

    /// 201 Created
    pub fn created() -> Self {
        Self::ok().status(StatusCode::CREATED)
    }

    /// 204 No Content
    pub fn no_content() -> Self {
        Self::ok().status(StatusCode::NO_CONTENT)
    }

    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn json<T>(mut self, body: &T) -> std::result::Result<Self, Error>
    where
        T: Serialize,
    {
        self.body = Body::from(serde_json::to_vec(body)?);
        Ok(self.header(CONTENT_TYPE, HeaderValue::from_static("application/json")))
    }

    pub fn header<K>(mut self, key: K, value: HeaderValue) -> Self
    where
        K: IntoHeaderName,
    {
        self.headers.append(key, value);
        self
    }

    fn build(self) -> hyper::Response<Body> {
        let mut resp = hyper::Response::new(self.body);
        *resp.status_mut() = self.status;
        *resp.headers_mut() = self.headers;
        resp
    }
}

/// Checks the request method and runs the specified path. If no matching method is found
/// an method_not_allowed error is returned.
#[macro_export]
macro_rules! method {
    ($req:expr, {$($method:expr => $branch:expr),* $(,)?}) => {
        match $req.method() {
            $(
                method if method == $method => $branch,
            )*
            method if method == hyper::Method::OPTIONS => {
                use $crate::http::Response;
                use hyper::header::{HeaderValue, ALLOW, ACCESS_CONTROL_ALLOW_METHODS};

                let allow = [$($method.as_str()),*].join(",");
                match HeaderValue::from_str(&allow) {
                    Ok(allow) => Ok(Response::no_content()
                        .header(ALLOW, allow.clone())
                        .header(ACCESS_CONTROL_ALLOW_METHODS, allow)),
                    Err(err) => Err($crate::StatusCodeError::new(
                        hyper::StatusCode::INTERNAL_SERVER_ERROR,
                        err,
                    )
                    .into()),
                }
            }
            _ => Err($crate::StatusCodeError::method_not_allowed().into()),
        }
    };
}

/// Formats a not found message for a path segment.
fn unknown_path<T>(segment: T) -> Error
where
    T: Display,
{
    StatusCodeError::not_found()
        .message(format!("unknown path: {}", segment))
        .into()
}

#[cfg(test)]
pub(crate) mod tests {
    use hyper::header::CONTENT_LENGTH;
    use hyper::{Body, Method, StatusCode};
    use serde_json::Value;
    use tokio::sync::watch;

    use super::{service_root, RequestUri};
    use crate::engine::tests::engine;
    use crate::{Config, State};

    pub fn state() -> State {
        let (_, shutdown_rx) = watch::channel(());

        State::from_parts(Config::default(), engine(), shutdown_rx)
    }

    /// Sends a request to the service and returns the status with the json body.
    pub async fn request(
        state: &State,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let body = body.map(|body| body.to_string()).unwrap_or_default();

        let req = hyper::Request::builder()
            .method(method)
            .uri(uri)
            .header(CONTENT_LENGTH, body.len())
            .body(Body::from(body))
            .unwrap();

        let resp = service_root(req, state.clone()).await.unwrap();
        let status = resp.status();

        let bytes = hyper::body::to_bytes(resp.into_body()).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        (status, value)
    }

    #[test]
    fn test_request_uri() {
        let mut uri = RequestUri::new("/stageItem/12/rounds");
        assert_eq!(uri.take_str(), Some("stageItem"));
        assert_eq!(uri.take().unwrap().parse::<u64>().unwrap(), 12);
        assert_eq!(uri.take_str(), Some("rounds"));
        assert_eq!(uri.take_str(), None);

        let mut uri = RequestUri::new("/");
        assert_eq!(uri.take_str(), None);
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let state = state();

        let (status, body) = request(&state, Method::GET, "/brackets", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "not_found");

        let (status, _) = request(&state, Method::DELETE, "/match/1", None).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

        let (status, body) = request(&state, Method::GET, "/match/abc", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "bad_request");
    }

    #[tokio::test]
    async fn test_body_limits() {
        let state = state();

        let req = hyper::Request::builder()
            .method(Method::PATCH)
            .uri("/match/1")
            .body(Body::empty())
            .unwrap();
        let resp = service_root(req, state.clone()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::LENGTH_REQUIRED);

        let req = hyper::Request::builder()
            .method(Method::PATCH)
            .uri("/match/1")
            .header(CONTENT_LENGTH, 20000)
            .body(Body::empty())
            .unwrap();
        let resp = service_root(req, state.clone()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_options() {
        let state = state();

        let req = hyper::Request::builder()
            .method(Method::OPTIONS)
            .uri("/match/1")
            .header("Origin", "http://localhost:5173")
            .body(Body::empty())
            .unwrap();
        let resp = service_root(req, state.clone()).await.unwrap();

        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert_eq!(resp.headers()["allow"], "GET,PATCH");
        assert_eq!(
            resp.headers()["access-control-allow-origin"],
            "http://localhost:5173"
        );
    }
}
