use std::{future::Future, path::PathBuf, sync::Arc, time::SystemTime};

use http::{Method, Request};

use crate::{
    config::{is_plain_file_name, StaticConfig},
    util::{decode_percents, sanitize_path},
    vfs::{FileOpener, FileWithMetadata, TokioFileOpener},
};

/// Why a request was passed on to the next handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelegateReason {
    /// The request was not a `GET` or `HEAD` request.
    MethodNotMatched,
    /// The request path is outside the configured prefix.
    PrefixNotMatched,
    /// The path did not decode to valid UTF-8, or the file could not be opened or stat-ed.
    LookupFailed,
    /// A directory was requested, but it has no usable index file.
    DirectoryWithoutIndex,
}

/// A file found for a request, ready to be handed to a content responder.
#[derive(Debug)]
pub struct ResolvedFile<F> {
    /// Open file handle.
    pub handle: F,
    /// Path of the file relative to the root. Used to infer the content type.
    pub path: PathBuf,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time.
    pub modified: Option<SystemTime>,
}

impl<F> ResolvedFile<F> {
    fn new(path: PathBuf, file: FileWithMetadata<F>) -> Self {
        Self {
            handle: file.handle,
            path,
            size: file.size,
            modified: file.modified,
        }
    }
}

/// The outcome of resolving a request.
#[derive(Debug)]
pub enum Decision<F> {
    /// Not ours to answer; invoke the rest of the chain.
    Delegate(DelegateReason),
    /// A directory was requested without a trailing slash. Contains the location to redirect to.
    Redirect(String),
    /// Serve this file.
    Serve(ResolvedFile<F>),
}

/// Decides, per request, whether the configured root can answer it.
///
/// The resolver only opens files; it never writes a response. That is left to whoever acts on
/// the returned `Decision`, typically `Static`.
pub struct Resolver<O = TokioFileOpener> {
    /// The file system to look up files in.
    pub opener: Arc<O>,
    /// Prefix, index file and cache settings.
    pub config: Arc<StaticConfig>,
}

impl<O> Clone for Resolver<O> {
    fn clone(&self) -> Self {
        Self {
            opener: self.opener.clone(),
            config: self.config.clone(),
        }
    }
}

impl Resolver<TokioFileOpener> {
    /// Create a resolver for a directory on disk, with default settings.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_opener(TokioFileOpener::new(root))
    }
}

impl<O: FileOpener> Resolver<O> {
    /// Create a resolver with a custom file system, with default settings.
    pub fn with_opener(opener: O) -> Self {
        Self {
            opener: Arc::new(opener),
            config: Arc::new(StaticConfig::default()),
        }
    }

    /// Resolve a request.
    ///
    /// Only `GET` and `HEAD` requests are considered; anything else is delegated. The returned
    /// future does not borrow the request.
    pub fn resolve_request<B>(
        &self,
        req: &Request<B>,
    ) -> impl Future<Output = Decision<O::File>> + Send + '_ {
        let method = req.method().clone();
        let uri = req.uri().clone();
        async move {
            match method {
                Method::GET | Method::HEAD => {}
                _ => return Decision::Delegate(DelegateReason::MethodNotMatched),
            }

            let mut decision = self.resolve_path(uri.path()).await;
            if let Decision::Redirect(ref mut location) = decision {
                if let Some(query) = uri.query() {
                    location.push('?');
                    location.push_str(query);
                }
            }
            decision
        }
    }

    /// Resolve a raw (still percent-encoded) URL path.
    ///
    /// Unlike `resolve_request`, it is up to the caller to check the request method.
    pub async fn resolve_path(&self, request_path: &str) -> Decision<O::File> {
        let decoded = match decode_percents(request_path) {
            Some(decoded) => decoded,
            None => return Decision::Delegate(DelegateReason::LookupFailed),
        };

        let candidate = match self.strip_prefix(&decoded) {
            Some(candidate) => candidate,
            None => return Decision::Delegate(DelegateReason::PrefixNotMatched),
        };

        let mut path = sanitize_path(candidate);
        let file = match self.opener.open(&path).await {
            Ok(file) => file,
            Err(_) => return Decision::Delegate(DelegateReason::LookupFailed),
        };

        if !file.is_dir {
            return Decision::Serve(ResolvedFile::new(path, file));
        }
        // Release the directory handle before anything else happens.
        drop(file);

        // Relative links in the index only work from a URL ending in a slash.
        if !request_path.ends_with('/') {
            return Decision::Redirect(directory_location(request_path));
        }

        if !is_plain_file_name(&self.config.index_file) {
            return Decision::Delegate(DelegateReason::DirectoryWithoutIndex);
        }
        path.push(&self.config.index_file);
        match self.opener.open(&path).await {
            Ok(index) if !index.is_dir => Decision::Serve(ResolvedFile::new(path, index)),
            _ => Decision::Delegate(DelegateReason::DirectoryWithoutIndex),
        }
    }

    /// Strip the configured prefix, if any.
    ///
    /// Returns `None` if the path is outside the prefix, including partial segment matches such
    /// as `/staticfoo` for a prefix of `/static`.
    fn strip_prefix<'a>(&self, path: &'a str) -> Option<&'a str> {
        let prefix = self.config.prefix.as_str();
        if prefix.is_empty() {
            return Some(path);
        }
        let rest = path.strip_prefix(prefix)?;
        if rest.is_empty() || rest.starts_with('/') {
            Some(rest)
        } else {
            None
        }
    }
}

/// Location of a directory requested without its trailing slash.
///
/// Leading slashes collapse into one, as `//host/` would name another host.
fn directory_location(request_path: &str) -> String {
    let rest = request_path.trim_start_matches('/');
    if rest.is_empty() {
        "/".to_owned()
    } else {
        format!("/{rest}/")
    }
}
