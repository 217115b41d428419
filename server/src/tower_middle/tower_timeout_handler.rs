use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use hyper::{Request, Response, StatusCode};
use tokio::time;
use tower::{Layer, Service};

use shared::types::ErrorResponse;

use crate::handlers::http::utils::deliver_problem;

/// Tower layer for request timeouts
///
/// If the inner service does not respond within the configured duration, a
/// 408 problem document is returned and the inner future is dropped. Store
/// calls it had already issued finish or fail on their own.
#[derive(Clone, Debug)]
pub struct TimeoutLayer {
    duration: Duration,
}

impl TimeoutLayer {
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }
}

impl<S> Layer<S> for TimeoutLayer {
    type Service = TimeoutService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TimeoutService {
            inner,
            duration: self.duration,
        }
    }
}

#[derive(Clone, Debug)]
pub struct TimeoutService<S> {
    inner: S,
    duration: Duration,
}

impl<S, ReqBody> Service<Request<ReqBody>> for TimeoutService<S>
where
    S: Service<Request<ReqBody>, Response = Response<BoxBody<Bytes, Infallible>>>
        + Clone
        + Send
        + 'static,
    S::Future: Send + 'static,
    ReqBody: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let duration = self.duration;
        let instance = req.uri().path().to_string();
        let fut = self.inner.call(req);

        Box::pin(async move {
            match time::timeout(duration, fut).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!("Request to {} timed out after {:?}", instance, duration);

                    let problem = ErrorResponse::new(
                        StatusCode::REQUEST_TIMEOUT.as_u16(),
                        "Request Timeout",
                        "The server did not finish the request in time",
                        &instance,
                    );
                    Ok(deliver_problem(&problem))
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::http::utils::full;
    use http_body_util::BodyExt;
    use tower::{ServiceBuilder, ServiceExt, service_fn};

    async fn sleep_then_respond(
        delay: Duration,
    ) -> Result<Response<BoxBody<Bytes, Infallible>>, Infallible> {
        time::sleep(delay).await;
        Ok(Response::new(full("done")))
    }

    #[tokio::test]
    async fn fast_requests_pass_through() {
        let svc = ServiceBuilder::new()
            .layer(TimeoutLayer::new(Duration::from_secs(5)))
            .service(service_fn(|_req: Request<()>| {
                sleep_then_respond(Duration::from_millis(1))
            }));

        let response = svc
            .oneshot(Request::builder().uri("/health").body(()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn slow_requests_get_a_408_problem() {
        let svc = ServiceBuilder::new()
            .layer(TimeoutLayer::new(Duration::from_millis(10)))
            .service(service_fn(|_req: Request<()>| {
                sleep_then_respond(Duration::from_secs(5))
            }));

        let response = svc
            .oneshot(Request::builder().uri("/users").body(()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let problem: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(problem.instance, "/users");
        assert_eq!(problem.status, 408);
    }
}
