#![crate_name = "hyper_static_chain"]
#![deny(missing_docs)]

//! Static file serving as one stage of a [Hyper 1.0](https://github.com/hyperium/hyper)
//! handler chain.
//!
//! The `Static` stage answers `GET` and `HEAD` requests for files under a root directory, and
//! passes every other request on to the next handler. Nothing that goes wrong while looking up
//! a file is turned into an error response here: a missing file, a permission problem or a
//! directory without an index file simply means the request is not ours, and the rest of the
//! chain gets to answer it.
//!
//! ## Basic usage
//!
//! ```rust
//! use hyper_static_chain::Static;
//!
//! // Serve `my/doc/root/` below `/static`, with a 404 for everything else.
//! let mut static_ = Static::new("my/doc/root/");
//! static_.prefix("/static").cache_headers(Some(3600));
//!
//! // A dummy request, but normally obtained from Hyper.
//! let request = http::Request::get("/static/foo/bar.txt")
//!     .body(())
//!     .unwrap();
//!
//! // Returns a future for the response.
//! let response_future = static_.clone().serve(request);
//! ```
//!
//! The next handler can be any async closure, or a hyper service wrapped in `FromService`:
//!
//! ```rust
//! use http::{Request, Response};
//! use http_body_util::Full;
//! use hyper::body::Bytes;
//! use hyper_static_chain::Static;
//!
//! let static_ = Static::new("public/").next(|_req: Request<()>| async {
//!     Ok::<_, std::convert::Infallible>(Response::new(Full::new(Bytes::from("fallback"))))
//! });
//! ```
//!
//! `Static` also implements `hyper::service::Service`, so it can be handed to a hyper server
//! connection directly.
//!
//! ## Advanced usage
//!
//! `Static` is a thin wrapper around `Resolver`, which makes the decision, and
//! `ResponseBuilder`, which turns the decision into a response:
//!
//! ```rust
//! use hyper_static_chain::{Decision, Resolver, ResponseBuilder};
//!
//! #[tokio::main]
//! async fn main() {
//!     let resolver = Resolver::new("my/doc/root/");
//!
//!     let request = http::Request::get("/foo/bar.txt")
//!         .body(())
//!         .unwrap();
//!
//!     // Returns one of `Delegate`, `Redirect` or `Serve`.
//!     let decision = resolver.resolve_request(&request).await;
//!     if let Decision::Delegate(reason) = decision {
//!         println!("not ours: {:?}", reason);
//!         return;
//!     }
//!
//!     let response = ResponseBuilder::new()
//!         .request(&request)
//!         .build(decision)
//!         .unwrap();
//! }
//! ```
//!
//! File responses are built by `FileResponseBuilder`, which handles content types, caching
//! headers, conditional requests and byte ranges. Files are opened through the `FileOpener`
//! trait; `TokioFileOpener` reads from disk, and `MemoryFs` serves from memory.

mod config;
mod error;
mod next;
mod resolve;
mod response_builder;
mod service;
mod util;

pub mod vfs;

pub use crate::config::*;
pub use crate::error::*;
pub use crate::next::*;
pub use crate::resolve::*;
pub use crate::response_builder::*;
pub use crate::service::*;
pub use crate::util::{
    Body, FileBytesStream, FileBytesStreamMultiRange, FileBytesStreamRange, FileResponseBuilder,
};
pub use crate::vfs::{FileOpener, FileWithMetadata, MemoryFs, TokioFileOpener};
