use std::{future::Future, path::PathBuf, pin::Pin, sync::Arc};

use http::{Request, Response};
use http_body_util::Either;
use tracing::{debug, trace};

use crate::{
    config::{is_plain_file_name, StaticConfig, DEFAULT_INDEX_FILE},
    error::{ConfigError, Error},
    next::{Next, NotFound},
    resolve::{Decision, Resolver},
    response_builder::ResponseBuilder,
    util::Body,
    vfs::{FileOpener, TokioFileOpener},
};

/// Response type of the static stage: either our own, or whatever the next handler produced.
pub type StaticResponse<F, NB> = Response<Either<Body<F>, NB>>;

/// High-level interface for serving static files as one stage of a handler chain.
///
/// This struct serves files from a single root. Requests are mapped onto the file system by
/// stripping the optional prefix and appending the rest of the URL path to the root. Regular
/// files are served, and directories are served through their index file. Anything that cannot
/// be served is passed on to the next handler, which defaults to `NotFound`.
///
/// Settings are applied with the builder methods. This struct also implements the
/// `hyper::service::Service` trait, which simply wraps `Static::serve`.
pub struct Static<O = TokioFileOpener, N = NotFound> {
    /// The resolver instance used to decide on requests.
    pub resolver: Resolver<O>,
    /// The handler to pass requests on to.
    pub next: Arc<N>,
}

impl<O, N> Clone for Static<O, N> {
    fn clone(&self) -> Self {
        Self {
            resolver: self.resolver.clone(),
            next: self.next.clone(),
        }
    }
}

impl Static<TokioFileOpener, NotFound> {
    /// Create a new instance of `Static` with a given root path.
    ///
    /// The path may be absolute or relative. If `Path::new("")` is given, files will be served
    /// from the current directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_opener(TokioFileOpener::new(root))
    }
}

impl<O: FileOpener> Static<O, NotFound> {
    /// Create a new instance of `Static` with a custom file system, using default settings.
    pub fn with_opener(opener: O) -> Self {
        Self {
            resolver: Resolver::with_opener(opener),
            next: Arc::new(NotFound),
        }
    }

    /// Create a new instance of `Static` from loaded settings.
    pub fn from_config(opener: O, config: StaticConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut static_ = Self::with_opener(opener);
        static_.resolver.config = Arc::new(config);
        Ok(static_)
    }
}

impl<O: FileOpener, N> Static<O, N> {
    /// Pass requests that are not served here on to the given handler.
    pub fn next<N2>(self, next: N2) -> Static<O, N2> {
        Static {
            resolver: self.resolver,
            next: Arc::new(next),
        }
    }

    /// Only serve requests below the given URL prefix. An empty prefix matches everything.
    pub fn prefix(&mut self, value: impl Into<String>) -> &mut Self {
        Arc::make_mut(&mut self.resolver.config).prefix = value.into();
        self
    }

    /// Serve this file for directory requests. An empty name restores `index.html`.
    ///
    /// The name must be a single path component, eg. `default.htm`. Anything else is rejected
    /// and leaves the current setting in place.
    pub fn index_file(&mut self, value: impl Into<String>) -> Result<&mut Self, ConfigError> {
        let mut value = value.into();
        if value.is_empty() {
            value = DEFAULT_INDEX_FILE.to_owned();
        }
        if !is_plain_file_name(&value) {
            return Err(ConfigError::InvalidIndexFile { value });
        }
        Arc::make_mut(&mut self.resolver.config).index_file = value;
        Ok(self)
    }

    /// Add cache headers to responses for the given lifespan.
    pub fn cache_headers(&mut self, value: Option<u32>) -> &mut Self {
        Arc::make_mut(&mut self.resolver.config).cache_max_age = value;
        self
    }

    /// Serve a request, or pass it on to the next handler.
    pub async fn serve<B>(
        self,
        request: Request<B>,
    ) -> Result<StaticResponse<O::File, N::Body>, Error>
    where
        N: Next<B>,
    {
        let decision = self.resolver.resolve_request(&request).await;
        let response = match decision {
            Decision::Delegate(reason) => {
                trace!(path = request.uri().path(), ?reason, "passing request on");
                let response = self
                    .next
                    .call(request)
                    .await
                    .map_err(|err| Error::Next(err.into()))?;
                return Ok(response.map(Either::Right));
            }
            Decision::Redirect(ref location) => {
                debug!(path = request.uri().path(), %location, "redirecting to directory");
                self.response_builder(&request).build(decision)?
            }
            Decision::Serve(ref file) => {
                trace!(path = %file.path.display(), size = file.size, "serving file");
                self.response_builder(&request).build(decision)?
            }
        };
        Ok(response.map(Either::Left))
    }

    fn response_builder<B>(&self, request: &Request<B>) -> ResponseBuilder {
        let mut builder = ResponseBuilder::new();
        builder
            .request(request)
            .cache_headers(self.resolver.config.cache_max_age);
        builder
    }
}

impl<O, N, B> hyper::service::Service<Request<B>> for Static<O, N>
where
    O: FileOpener,
    N: Next<B>,
    B: Send + 'static,
{
    type Response = StaticResponse<O::File, N::Body>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, request: Request<B>) -> Self::Future {
        Box::pin(self.clone().serve(request))
    }
}
