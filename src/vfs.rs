//! File system layer the resolver looks files up in.

use std::{
    collections::HashMap,
    fs::OpenOptions,
    future::Future,
    io::{Cursor, Error, ErrorKind},
    path::{Component, Path, PathBuf},
    pin::Pin,
    task::{Context, Poll},
    time::SystemTime,
};

use futures_util::future::{ready, Ready};
use hyper::body::Bytes;
use tokio::{
    fs::{self, File},
    task::{spawn_blocking, JoinHandle},
};

#[cfg(windows)]
use std::os::windows::fs::OpenOptionsExt;
#[cfg(windows)]
use winapi::um::winbase::FILE_FLAG_BACKUP_SEMANTICS;

/// Open file handle with metadata.
///
/// Opening and stat-ing happen together, so a failure of either surfaces as a single error from
/// `FileOpener::open`. The handle is closed when this struct is dropped.
#[derive(Debug)]
pub struct FileWithMetadata<F = File> {
    /// Open file handle.
    pub handle: F,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time.
    pub modified: Option<SystemTime>,
    /// Whether this is a directory.
    pub is_dir: bool,
}

/// Trait for a simple virtual filesystem layer.
///
/// Paths handed to `open` are already sanitized: they are relative, and contain no `..` or root
/// components. Keeping lookups inside the root is up to the implementation beyond that, eg. when
/// following symlinks.
pub trait FileOpener: Send + Sync + 'static {
    /// File handle type.
    ///
    /// To be served, the handle must also implement `AsyncRead`, `AsyncSeek` and `Unpin`.
    type File: Send + 'static;

    /// Future type that `open` returns.
    type Future: Future<Output = Result<FileWithMetadata<Self::File>, Error>> + Send;

    /// Open a file and return a `FileWithMetadata`.
    fn open(&self, path: &Path) -> Self::Future;
}

/// Filesystem implementation that uses `tokio::fs`.
#[derive(Debug, Clone)]
pub struct TokioFileOpener {
    /// The virtual root directory to use when opening files.
    ///
    /// The path may be absolute or relative.
    pub root: PathBuf,
}

impl TokioFileOpener {
    /// Create a new `TokioFileOpener` for the given root path.
    ///
    /// The path may be absolute or relative.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl FileOpener for TokioFileOpener {
    type File = File;
    type Future = TokioFileFuture;

    fn open(&self, path: &Path) -> Self::Future {
        let full_path = self.root.join(path);

        // Open and metadata in one blocking task, rather than one per async call.
        let inner = spawn_blocking(move || {
            let mut opts = OpenOptions::new();
            opts.read(true);

            // Directories can only be opened with this flag on Windows.
            #[cfg(windows)]
            opts.custom_flags(FILE_FLAG_BACKUP_SEMANTICS);

            let handle = opts.open(full_path)?;
            let metadata = handle.metadata()?;
            Ok(FileWithMetadata {
                handle: File::from_std(handle),
                size: metadata.len(),
                modified: metadata.modified().ok(),
                is_dir: metadata.is_dir(),
            })
        });

        TokioFileFuture { inner }
    }
}

/// Future type produced by `TokioFileOpener`.
pub struct TokioFileFuture {
    inner: JoinHandle<Result<FileWithMetadata<File>, Error>>,
}

impl Future for TokioFileFuture {
    type Output = Result<FileWithMetadata<File>, Error>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.inner).poll(cx) {
            Poll::Ready(Ok(res)) => Poll::Ready(res),
            Poll::Ready(Err(_)) => Poll::Ready(Err(Error::other("background task failed"))),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// An in-memory virtual filesystem.
///
/// The root (the empty path) always exists as a directory. Useful for embedded assets, and for
/// exercising the resolver without touching the disk.
pub struct MemoryFs {
    files: HashMap<PathBuf, FileWithMetadata<Bytes>>,
}

impl Default for MemoryFs {
    fn default() -> Self {
        let mut files = HashMap::new();
        files.insert(PathBuf::new(), directory_entry());
        Self { files }
    }
}

fn directory_entry() -> FileWithMetadata<Bytes> {
    FileWithMetadata {
        handle: Bytes::new(),
        size: 0,
        modified: None,
        is_dir: true,
    }
}

impl MemoryFs {
    /// Initialize a `MemoryFs` from a directory.
    ///
    /// This loads all files and their contents into memory. Symlinks are followed.
    pub async fn from_dir(path: impl AsRef<Path>) -> Result<Self, Error> {
        let mut memory = Self::default();

        // Pending directories as `(real path, virtual path)`.
        let mut pending = vec![(path.as_ref().to_path_buf(), PathBuf::new())];
        while let Some((dir, base)) = pending.pop() {
            let mut entries = fs::read_dir(dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let metadata = fs::metadata(entry.path()).await?;
                let virtual_path = base.join(entry.file_name());

                if metadata.is_dir() {
                    memory.add_dir(&virtual_path);
                    pending.push((entry.path(), virtual_path));
                } else if metadata.is_file() {
                    let data = fs::read(entry.path()).await?;
                    memory.add(virtual_path, data.into(), metadata.modified().ok());
                }
            }
        }

        Ok(memory)
    }

    /// Add a file to the `MemoryFs`.
    ///
    /// Directory entries leading up to the path are created as needed. An existing entry at the
    /// path itself is overwritten.
    pub fn add(
        &mut self,
        path: impl Into<PathBuf>,
        data: Bytes,
        modified: Option<SystemTime>,
    ) -> &mut Self {
        let path = path.into();
        if let Some(parent) = path.parent() {
            self.add_dir(parent);
        }

        let size = data.len() as u64;
        self.files.insert(
            path,
            FileWithMetadata {
                handle: data,
                size,
                modified,
                is_dir: false,
            },
        );
        self
    }

    /// Add a directory, and any directories leading up to it.
    pub fn add_dir(&mut self, path: impl AsRef<Path>) -> &mut Self {
        let mut dir_path = PathBuf::new();
        for component in path.as_ref().components() {
            if let Component::Normal(segment) = component {
                dir_path.push(segment);
                self.files
                    .entry(dir_path.clone())
                    .or_insert_with(directory_entry);
            }
        }
        self
    }
}

impl FileOpener for MemoryFs {
    type File = Cursor<Bytes>;
    type Future = Ready<Result<FileWithMetadata<Self::File>, Error>>;

    fn open(&self, path: &Path) -> Self::Future {
        ready(
            self.files
                .get(path)
                .map(|file| FileWithMetadata {
                    handle: Cursor::new(file.handle.clone()),
                    size: file.size,
                    modified: file.modified,
                    is_dir: file.is_dir,
                })
                .ok_or_else(|| Error::new(ErrorKind::NotFound, "Not found")),
        )
    }
}
