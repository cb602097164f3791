use std::time::{SystemTime, UNIX_EPOCH};

use http::{
    header, response::Builder as HttpResponseBuilder, HeaderMap, Method, Request, Response,
    Result, StatusCode,
};
use http_range::{HttpRange, HttpRangeParseError};
use rand::{distributions::Alphanumeric, thread_rng, Rng};

use super::{Body, FileBytesStream, FileBytesStreamMultiRange, FileBytesStreamRange};
use crate::resolve::ResolvedFile;

const BOUNDARY_LENGTH: usize = 60;

/// Utility to build responses for serving a resolved file.
///
/// This takes care of content type, caching headers, conditional requests and byte ranges.
/// Fields can be set directly, but are typically initialized through `from_request` and the
/// builder methods.
#[derive(Clone, Debug, Default)]
pub struct FileResponseBuilder {
    /// Whether to send cache headers, and what lifespan to indicate.
    pub cache_headers: Option<u32>,
    /// Whether this is a `HEAD` request, with no response body.
    pub is_head: bool,
    /// The parsed value of the `If-Modified-Since` request header.
    pub if_modified_since: Option<SystemTime>,
    /// The file ranges to read, if any, otherwise we read from the beginning.
    pub range: Option<String>,
    /// The unparsed value of the `If-Range` request header. May match etag or last-modified.
    pub if_range: Option<String>,
}

impl FileResponseBuilder {
    /// Create a new builder with a default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply parameters based on a request.
    pub fn from_request<B>(req: &Request<B>) -> Self {
        let mut builder = Self::new();
        builder.request_parts(req.method(), req.headers());
        builder
    }

    /// Apply parameters based on request parts.
    pub fn request_parts(&mut self, method: &Method, headers: &HeaderMap) -> &mut Self {
        self.is_head = *method == Method::HEAD;
        self.if_modified_since = header_str(headers, header::IF_MODIFIED_SINCE)
            .and_then(|v| httpdate::parse_http_date(v).ok());
        self.range = header_str(headers, header::RANGE).map(str::to_owned);
        self.if_range = header_str(headers, header::IF_RANGE).map(str::to_owned);
        self
    }

    /// Add cache headers to responses for the given lifespan.
    pub fn cache_headers(&mut self, value: Option<u32>) -> &mut Self {
        self.cache_headers = value;
        self
    }

    /// Build a response for the given file.
    pub fn build<F>(&self, file: ResolvedFile<F>) -> Result<Response<Body<F>>> {
        let mut res = HttpResponseBuilder::new();
        let mut range_allowed = self.if_range.is_none();

        if let Some(modified) = file.modified {
            if let Ok(since_epoch) = modified.duration_since(UNIX_EPOCH) {
                let secs = since_epoch.as_secs();

                // HTTP dates have second precision, so compare on that.
                let not_modified = self
                    .if_modified_since
                    .and_then(|v| v.duration_since(UNIX_EPOCH).ok())
                    .is_some_and(|v| secs <= v.as_secs());
                if not_modified {
                    return HttpResponseBuilder::new()
                        .status(StatusCode::NOT_MODIFIED)
                        .body(Body::Empty);
                }

                let etag = format!(
                    "W/\"{0:x}-{1:x}.{2:x}\"",
                    file.size,
                    secs,
                    since_epoch.subsec_nanos()
                );
                let last_modified = httpdate::fmt_http_date(modified);
                if let Some(ref if_range) = self.if_range {
                    range_allowed = *if_range == etag || *if_range == last_modified;
                }

                res = res
                    .header(header::LAST_MODIFIED, last_modified)
                    .header(header::ETAG, etag);
            }
        }

        if let Some(seconds) = self.cache_headers {
            res = res.header(
                header::CACHE_CONTROL,
                format!("public, max-age={seconds}"),
            );
        }

        let mime = mime_guess::from_path(&file.path).first_or_octet_stream();
        res = res.header(header::ACCEPT_RANGES, "bytes");

        if range_allowed {
            if let Some(ref range) = self.range {
                match HttpRange::parse(range, file.size) {
                    Ok(ranges) if ranges.len() == 1 => {
                        let range = ranges[0];
                        return res
                            .status(StatusCode::PARTIAL_CONTENT)
                            .header(header::CONTENT_TYPE, mime.as_ref())
                            .header(header::CONTENT_LENGTH, range.length)
                            .header(
                                header::CONTENT_RANGE,
                                format!(
                                    "bytes {}-{}/{}",
                                    range.start,
                                    range.start + range.length - 1,
                                    file.size
                                ),
                            )
                            .body(if self.is_head {
                                Body::Empty
                            } else {
                                Body::Range(FileBytesStreamRange::new(file.handle, range))
                            });
                    }
                    Ok(ranges) if ranges.len() > 1 => {
                        let boundary: String = thread_rng()
                            .sample_iter(&Alphanumeric)
                            .take(BOUNDARY_LENGTH)
                            .map(char::from)
                            .collect();
                        let stream = FileBytesStreamMultiRange::new(
                            file.handle,
                            ranges,
                            &boundary,
                            mime.as_ref(),
                            file.size,
                        );
                        return res
                            .status(StatusCode::PARTIAL_CONTENT)
                            .header(
                                header::CONTENT_TYPE,
                                format!("multipart/byteranges; boundary={boundary}"),
                            )
                            .header(header::CONTENT_LENGTH, stream.content_length())
                            .body(if self.is_head {
                                Body::Empty
                            } else {
                                Body::MultiRange(stream)
                            });
                    }
                    Err(HttpRangeParseError::NoOverlap) => {
                        return res
                            .status(StatusCode::RANGE_NOT_SATISFIABLE)
                            .header(header::CONTENT_RANGE, format!("bytes */{}", file.size))
                            .body(Body::Empty);
                    }
                    // An empty or malformed header is ignored.
                    Ok(_) | Err(HttpRangeParseError::InvalidRange) => {}
                }
            }
        }

        res.status(StatusCode::OK)
            .header(header::CONTENT_TYPE, mime.as_ref())
            .header(header::CONTENT_LENGTH, file.size)
            .body(if self.is_head {
                Body::Empty
            } else {
                Body::Full(FileBytesStream::new_with_limit(file.handle, file.size))
            })
    }
}

fn header_str(headers: &HeaderMap, name: header::HeaderName) -> Option<&str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
