use std::convert::Infallible;
use std::fmt::Display;
use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use http_body_util::{BodyExt, combinators::BoxBody};
use hyper::body::Body;
use hyper::{Method, Request, Response, StatusCode};
use tracing::{error, info, warn};

use crate::AppState;
use crate::auth::DecodedToken;
use crate::error::ApiError;
use crate::handlers::http::utils::{deliver_problem, deliver_serialized_json};
use crate::handlers::http::{auth, users};

pub type HandlerResult = Result<Response<BoxBody<Bytes, Infallible>>, ApiError>;

type HandlerFuture = Pin<Box<dyn Future<Output = HandlerResult> + Send>>;

// ---------------------------------------------------------------------------
// Handler type aliases
// ---------------------------------------------------------------------------
//
//   OpenHandler   : no identity. Receives (req, state).
//                   Login, register, logout, health.
//
//   AuthedHandler : runs after the gate admitted the request. Receives
//                   (req, state, identity).

type OpenHandler = Box<dyn Fn(Request<Bytes>, AppState) -> HandlerFuture + Send + Sync>;

type AuthedHandler =
    Box<dyn Fn(Request<Bytes>, AppState, DecodedToken) -> HandlerFuture + Send + Sync>;

enum RouteKind {
    Open(OpenHandler),
    Authed(AuthedHandler),
}

struct Route {
    method: Method,
    path: String,
    kind: RouteKind,
}

pub struct Router {
    routes: Vec<Route>,
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("routes_count", &self.routes.len())
            .finish()
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    fn open<F, Fut>(mut self, method: Method, path: &str, handler: F) -> Self
    where
        F: Fn(Request<Bytes>, AppState) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.routes.push(Route {
            method,
            path: path.to_string(),
            kind: RouteKind::Open(Box::new(move |req, state| Box::pin(handler(req, state)))),
        });
        self
    }

    fn authed<F, Fut>(mut self, method: Method, path: &str, handler: F) -> Self
    where
        F: Fn(Request<Bytes>, AppState, DecodedToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.routes.push(Route {
            method,
            path: path.to_string(),
            kind: RouteKind::Authed(Box::new(move |req, state, identity| {
                Box::pin(handler(req, state, identity))
            })),
        });
        self
    }

    // ── Open ──────────────────────────────────────────────────────────────────

    pub fn get<F, Fut>(self, path: &str, handler: F) -> Self
    where
        F: Fn(Request<Bytes>, AppState) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.open(Method::GET, path, handler)
    }

    pub fn post<F, Fut>(self, path: &str, handler: F) -> Self
    where
        F: Fn(Request<Bytes>, AppState) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.open(Method::POST, path, handler)
    }

    // ── Authed ────────────────────────────────────────────────────────────────
    //
    // The gate has already verified the token by the time these run; the
    // handler receives the decoded identity and must not re-check it.

    pub fn get_authed<F, Fut>(self, path: &str, handler: F) -> Self
    where
        F: Fn(Request<Bytes>, AppState, DecodedToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.authed(Method::GET, path, handler)
    }

    // ── Dispatch ──────────────────────────────────────────────────────────────

    /// Collect the body, run the gate, dispatch. Never fails: every error
    /// becomes a problem document whose `instance` is the request path.
    pub async fn route<B>(&self, req: Request<B>, state: AppState) -> Response<BoxBody<Bytes, Infallible>>
    where
        B: Body,
        B::Error: Display,
    {
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        match self.dispatch(req, state).await {
            Ok(response) => {
                info!("{} {} -> {}", method, path, response.status().as_u16());
                response
            }
            Err(e) => {
                let status = e.status();
                if status.is_server_error() {
                    error!("{} {} -> {}: {:?}", method, path, status.as_u16(), e);
                } else {
                    warn!("{} {} -> {}: {}", method, path, status.as_u16(), e);
                }
                deliver_problem(&e.to_problem(&path))
            }
        }
    }

    async fn dispatch<B>(&self, req: Request<B>, state: AppState) -> HandlerResult
    where
        B: Body,
        B::Error: Display,
    {
        let (parts, body) = req.into_parts();
        let bytes = body
            .collect()
            .await
            .map_err(|e| {
                warn!("Failed to read request body: {}", e);
                ApiError::wrong_body_format("The request body could not be read")
            })?
            .to_bytes();
        let mut req = Request::from_parts(parts, bytes);

        // The gate runs for every path, matched or not, so an unknown
        // protected path without a token is a 401 rather than a 404.
        state.gate.admit(&mut req).await?;

        let path = req.uri().path().to_string();
        let route = self
            .routes
            .iter()
            .find(|r| r.method == req.method() && Self::path_matches(&r.path, &path))
            .ok_or_else(|| ApiError::NoRoute(path.clone()))?;

        match &route.kind {
            RouteKind::Open(h) => h(req, state).await,
            RouteKind::Authed(h) => {
                let identity = match req.extensions_mut().remove::<DecodedToken>() {
                    Some(identity) => identity,
                    // Registered as authed under a public root: check anyway.
                    None => state.gate.authenticate(req.headers()).await?,
                };
                h(req, state, identity).await
            }
        }
    }

    // ── Path matching ─────────────────────────────────────────────────────────

    pub fn path_matches(route_path: &str, request_path: &str) -> bool {
        let clean = request_path.split('?').next().unwrap_or(request_path);

        if route_path == clean {
            return true;
        }

        // Segment-by-segment matching for `:param` wildcards.
        let route_segs: Vec<&str> = route_path.split('/').collect();
        let path_segs: Vec<&str> = clean.split('/').collect();

        if route_segs.len() != path_segs.len() {
            return false;
        }

        route_segs
            .iter()
            .zip(path_segs.iter())
            .all(|(r, p)| (r.starts_with(':') && !p.is_empty()) || r == p)
    }
}

// ---------------------------------------------------------------------------
// API router
//
//   .get / .post          → open, allowed only under a public root
//   .get_authed           → identity required; the gate has run already
//
// Exact routes are registered before `:param` routes so `/users/me` is not
// swallowed by `/users/:username`.
// ---------------------------------------------------------------------------

pub fn build_router() -> Router {
    Router::new()
        .get("/health", handle_health)
        .post("/auth/register", auth::handle_register)
        .post("/auth/login", auth::handle_login)
        .post("/auth/logout", auth::handle_logout)
        .get_authed("/users", users::handle_list_users)
        .get_authed("/users/me", users::handle_me)
        .get_authed("/users/:username", users::handle_get_user)
}

async fn handle_health(_req: Request<Bytes>, _state: AppState) -> HandlerResult {
    Ok(deliver_serialized_json(
        &serde_json::json!({ "status": "ok" }),
        StatusCode::OK,
    )?)
}
