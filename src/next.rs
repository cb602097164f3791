use std::{convert::Infallible, future::Future};

use futures_util::future::{ready, Ready};
use http::{Method, Request, Response, StatusCode};
use http_body_util::Empty;
use hyper::body::Bytes;

use crate::error::BoxError;

/// The rest of the handler chain.
///
/// `Static` calls this for every request it does not answer itself, and returns whatever it
/// produces without looking at it. Implemented for async closures taking the request, and for
/// hyper services through `FromService`.
pub trait Next<B>: Send + Sync + 'static {
    /// Response body type.
    type Body: hyper::body::Body<Data = Bytes>;

    /// Error type.
    type Error: Into<BoxError>;

    /// Future type that `call` returns.
    type Future: Future<Output = Result<Response<Self::Body>, Self::Error>> + Send + 'static;

    /// Handle a request passed on by the static stage.
    fn call(&self, req: Request<B>) -> Self::Future;
}

impl<B, F, Fut, RB, E> Next<B> for F
where
    F: Fn(Request<B>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response<RB>, E>> + Send + 'static,
    RB: hyper::body::Body<Data = Bytes>,
    E: Into<BoxError>,
{
    type Body = RB;
    type Error = E;
    type Future = Fut;

    fn call(&self, req: Request<B>) -> Fut {
        self(req)
    }
}

/// The default end of the chain.
///
/// Responds with 404 to `GET` and `HEAD`, and with 400 to other methods.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotFound;

impl<B> Next<B> for NotFound {
    type Body = Empty<Bytes>;
    type Error = Infallible;
    type Future = Ready<Result<Response<Empty<Bytes>>, Infallible>>;

    fn call(&self, req: Request<B>) -> Self::Future {
        let mut res = Response::new(Empty::new());
        *res.status_mut() = match *req.method() {
            Method::GET | Method::HEAD => StatusCode::NOT_FOUND,
            _ => StatusCode::BAD_REQUEST,
        };
        ready(Ok(res))
    }
}

/// Adapter to use a hyper `Service` as the next handler.
#[derive(Debug, Clone)]
pub struct FromService<S>(pub S);

impl<B, S, RB> Next<B> for FromService<S>
where
    S: hyper::service::Service<Request<B>, Response = Response<RB>> + Send + Sync + 'static,
    S::Future: Send + 'static,
    S::Error: Into<BoxError>,
    RB: hyper::body::Body<Data = Bytes>,
{
    type Body = RB;
    type Error = S::Error;
    type Future = S::Future;

    fn call(&self, req: Request<B>) -> Self::Future {
        self.0.call(req)
    }
}
