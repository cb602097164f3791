use std::{
    io::Error as IoError,
    pin::Pin,
    task::{ready, Context, Poll},
};

use futures_util::stream::Stream;
use hyper::body::{Bytes, Frame, SizeHint};
use tokio::{
    fs::File,
    io::{AsyncRead, AsyncSeek},
};

use crate::util::{FileBytesStream, FileBytesStreamMultiRange, FileBytesStreamRange};

/// Hyper body for responses produced by the static file stage.
pub enum Body<F = File> {
    /// No response body, used for redirects, `HEAD` and 'not modified' responses.
    Empty,
    /// A complete file.
    Full(FileBytesStream<F>),
    /// A single range from a file.
    Range(FileBytesStreamRange<F>),
    /// Several ranges from a file, as `multipart/byteranges`.
    MultiRange(FileBytesStreamMultiRange<F>),
}

impl<F> hyper::body::Body for Body<F>
where
    F: AsyncRead + AsyncSeek + Unpin,
{
    type Data = Bytes;
    type Error = IoError;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Bytes>, IoError>>> {
        let chunk = ready!(match *self {
            Body::Empty => return Poll::Ready(None),
            Body::Full(ref mut stream) => Pin::new(stream).poll_next(cx),
            Body::Range(ref mut stream) => Pin::new(stream).poll_next(cx),
            Body::MultiRange(ref mut stream) => Pin::new(stream).poll_next(cx),
        });
        Poll::Ready(chunk.map(|res| res.map(Frame::data)))
    }

    fn is_end_stream(&self) -> bool {
        matches!(self, Body::Empty)
    }

    fn size_hint(&self) -> SizeHint {
        match self {
            Body::Empty => SizeHint::with_exact(0),
            _ => SizeHint::default(),
        }
    }
}
