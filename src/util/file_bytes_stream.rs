use std::{
    cmp::min,
    fmt::Write as _,
    io::{Error as IoError, SeekFrom},
    pin::Pin,
    task::{ready, Context, Poll},
    vec,
};

use futures_util::stream::Stream;
use http_range::HttpRange;
use hyper::body::Bytes;
use tokio::{
    fs::File,
    io::{AsyncRead, AsyncSeek, ReadBuf},
};

const CHUNK_SIZE: usize = 8 * 1024;

/// Stream of `Bytes` chunks read from an `AsyncRead`, such as a tokio `File`.
pub struct FileBytesStream<F = File> {
    file: F,
    buf: Box<[u8]>,
    remaining: u64,
}

impl<F> FileBytesStream<F> {
    /// Stream the file until end of file.
    pub fn new(file: F) -> Self {
        Self::new_with_limit(file, u64::MAX)
    }

    /// Stream at most `limit` bytes of the file.
    pub fn new_with_limit(file: F, limit: u64) -> Self {
        Self {
            file,
            buf: vec![0; CHUNK_SIZE].into_boxed_slice(),
            remaining: limit,
        }
    }
}

impl<F> Stream for FileBytesStream<F>
where
    F: AsyncRead + Unpin,
{
    type Item = Result<Bytes, IoError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        if this.remaining == 0 {
            return Poll::Ready(None);
        }

        let len = min(this.remaining, this.buf.len() as u64) as usize;
        let mut read_buf = ReadBuf::new(&mut this.buf[..len]);
        if let Err(err) = ready!(Pin::new(&mut this.file).poll_read(cx, &mut read_buf)) {
            return Poll::Ready(Some(Err(err)));
        }

        let filled = read_buf.filled();
        if filled.is_empty() {
            return Poll::Ready(None);
        }
        this.remaining -= filled.len() as u64;
        Poll::Ready(Some(Ok(Bytes::copy_from_slice(filled))))
    }
}

enum SeekState {
    Start(u64),
    Seeking,
    Done,
}

/// Stream of a single byte range of an `AsyncRead + AsyncSeek`.
pub struct FileBytesStreamRange<F = File> {
    inner: FileBytesStream<F>,
    seek: SeekState,
}

impl<F> FileBytesStreamRange<F> {
    /// Stream the bytes of `file` covered by `range`.
    pub fn new(file: F, range: HttpRange) -> Self {
        Self {
            inner: FileBytesStream::new_with_limit(file, range.length),
            seek: SeekState::Start(range.start),
        }
    }

    fn restart(&mut self, range: HttpRange) {
        self.inner.remaining = range.length;
        self.seek = SeekState::Start(range.start);
    }
}

impl<F> Stream for FileBytesStreamRange<F>
where
    F: AsyncRead + AsyncSeek + Unpin,
{
    type Item = Result<Bytes, IoError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        loop {
            match this.seek {
                SeekState::Start(offset) => {
                    if let Err(err) =
                        Pin::new(&mut this.inner.file).start_seek(SeekFrom::Start(offset))
                    {
                        return Poll::Ready(Some(Err(err)));
                    }
                    this.seek = SeekState::Seeking;
                }
                SeekState::Seeking => {
                    if let Err(err) = ready!(Pin::new(&mut this.inner.file).poll_complete(cx)) {
                        return Poll::Ready(Some(Err(err)));
                    }
                    this.seek = SeekState::Done;
                }
                SeekState::Done => return Pin::new(&mut this.inner).poll_next(cx),
            }
        }
    }
}

/// Stream of several byte ranges of a file, framed as a `multipart/byteranges` body.
///
/// Part headers are rendered up front, so the total length is known before streaming starts.
pub struct FileBytesStreamMultiRange<F = File> {
    current: FileBytesStreamRange<F>,
    parts: vec::IntoIter<(Bytes, HttpRange)>,
    trailer: Option<Bytes>,
    content_length: u64,
}

impl<F> FileBytesStreamMultiRange<F> {
    /// Create a multipart stream for `ranges` of a file of `file_length` bytes.
    ///
    /// `boundary` separates the parts and must not occur in the file. `content_type` is
    /// repeated in every part header, and omitted when empty.
    pub fn new(
        file: F,
        ranges: Vec<HttpRange>,
        boundary: &str,
        content_type: &str,
        file_length: u64,
    ) -> Self {
        let mut content_length = 0;
        let parts: Vec<_> = ranges
            .into_iter()
            .enumerate()
            .map(|(idx, range)| {
                let header =
                    part_header(boundary, content_type, range, idx == 0, file_length);
                content_length += header.len() as u64 + range.length;
                (Bytes::from(header), range)
            })
            .collect();
        let trailer = Bytes::from(format!("\r\n--{boundary}--\r\n"));
        content_length += trailer.len() as u64;

        Self {
            current: FileBytesStreamRange::new(file, HttpRange { start: 0, length: 0 }),
            parts: parts.into_iter(),
            trailer: Some(trailer),
            content_length,
        }
    }

    /// Total length of the multipart body, including part headers and the closing boundary.
    pub fn content_length(&self) -> u64 {
        self.content_length
    }
}

fn part_header(
    boundary: &str,
    content_type: &str,
    range: HttpRange,
    is_first: bool,
    file_length: u64,
) -> String {
    let mut header = String::new();
    if !is_first {
        header.push_str("\r\n");
    }
    let end = range.start + range.length - 1;
    // Writing into a `String` cannot fail.
    let _ = write!(
        header,
        "--{boundary}\r\nContent-Range: bytes {}-{end}/{file_length}\r\n",
        range.start
    );
    if !content_type.is_empty() {
        let _ = write!(header, "Content-Type: {content_type}\r\n");
    }
    header.push_str("\r\n");
    header
}

impl<F> Stream for FileBytesStreamMultiRange<F>
where
    F: AsyncRead + AsyncSeek + Unpin,
{
    type Item = Result<Bytes, IoError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        if this.current.inner.remaining > 0 {
            if let Some(chunk) = ready!(Pin::new(&mut this.current).poll_next(cx)) {
                return Poll::Ready(Some(chunk));
            }
            // Early end of file: the part is short, move on to the next one.
            this.current.inner.remaining = 0;
        }

        match this.parts.next() {
            Some((header, range)) => {
                this.current.restart(range);
                Poll::Ready(Some(Ok(header)))
            }
            None => Poll::Ready(this.trailer.take().map(Ok)),
        }
    }
}
