use http::{
    header, response::Builder as HttpResponseBuilder, HeaderMap, Method, Request, Response,
    Result, StatusCode,
};

use crate::{
    resolve::{Decision, DelegateReason},
    util::{Body, FileResponseBuilder},
};

/// Utility to build the default response for a `Decision`.
///
/// `Static` only uses this for redirects and files, and hands delegated requests to the next
/// handler. When the resolver is used on its own, delegated requests get a plain 400 or 404
/// response from here instead.
#[derive(Clone, Debug, Default)]
pub struct ResponseBuilder {
    /// Inner file response builder.
    pub file_response_builder: FileResponseBuilder,
}

impl ResponseBuilder {
    /// Create a new response builder with a default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply parameters based on a request.
    pub fn request<B>(&mut self, req: &Request<B>) -> &mut Self {
        self.request_parts(req.method(), req.headers())
    }

    /// Apply parameters based on request parts.
    pub fn request_parts(&mut self, method: &Method, headers: &HeaderMap) -> &mut Self {
        self.file_response_builder.request_parts(method, headers);
        self
    }

    /// Add cache headers to responses for the given lifespan.
    pub fn cache_headers(&mut self, value: Option<u32>) -> &mut Self {
        self.file_response_builder.cache_headers(value);
        self
    }

    /// Build a response for the given decision.
    pub fn build<F>(&self, decision: Decision<F>) -> Result<Response<Body<F>>> {
        match decision {
            Decision::Delegate(DelegateReason::MethodNotMatched) => HttpResponseBuilder::new()
                .status(StatusCode::BAD_REQUEST)
                .body(Body::Empty),
            Decision::Delegate(_) => HttpResponseBuilder::new()
                .status(StatusCode::NOT_FOUND)
                .body(Body::Empty),
            Decision::Redirect(location) => HttpResponseBuilder::new()
                .status(StatusCode::FOUND)
                .header(header::LOCATION, location)
                .body(Body::Empty),
            Decision::Serve(file) => self.file_response_builder.build(file),
        }
    }
}
