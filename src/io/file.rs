use std::fs::{File, OpenOptions};
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::{FileMode, IoStream, IoSystem};

/// Stream over a file on disk.
#[derive(Debug)]
pub struct FileIoStream {
    file: File,
    path: PathBuf,
}

impl FileIoStream {
    pub fn open(path: impl AsRef<Path>, mode: FileMode) -> io::Result<Self> {
        let path = path.as_ref();
        let mut options = OpenOptions::new();
        match mode {
            FileMode::Read => options.read(true),
            FileMode::Write => options.write(true).create(true).truncate(true),
            FileMode::ReadWrite => options.read(true).write(true).create(true),
            FileMode::Append => options.append(true).create(true),
        };
        Ok(Self {
            file: options.open(path)?,
            path: path.to_path_buf(),
        })
    }

    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Read for FileIoStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Write for FileIoStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl Seek for FileIoStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }
}

impl IoStream for FileIoStream {
    fn size(&mut self) -> io::Result<u64> {
        Ok(self.file.metadata()?.len())
    }
}

/// In-memory stream, mostly useful for tests and for serving embedded data.
impl IoStream for Cursor<Vec<u8>> {}

/// [`IoSystem`] over the local file system.
///
/// Relative paths are resolved against each search directory in order; the
/// first directory containing the file wins. Files opened for writing land in
/// the first search directory.
#[derive(Debug, Clone, Default)]
pub struct FileIoSystem {
    search_directories: Vec<PathBuf>,
}

impl FileIoSystem {
    #[must_use]
    pub fn new<I, P>(search_directories: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            search_directories: search_directories.into_iter().map(Into::into).collect(),
        }
    }

    pub fn add_search_directory(&mut self, dir: impl Into<PathBuf>) {
        self.search_directories.push(dir.into());
    }

    #[must_use]
    pub fn search_directories(&self) -> &[PathBuf] {
        &self.search_directories
    }

    /// Resolves `path` to an existing file, if any.
    #[must_use]
    pub fn resolve(&self, path: &str) -> Option<PathBuf> {
        let path = Path::new(path);
        if path.is_absolute() || self.search_directories.is_empty() {
            return path.is_file().then(|| path.to_path_buf());
        }
        self.search_directories.iter().map(|dir| dir.join(path)).find(|p| p.is_file())
    }

    fn resolve_for_write(&self, path: &str) -> PathBuf {
        let p = Path::new(path);
        match self.search_directories.first() {
            Some(dir) if !p.is_absolute() => dir.join(p),
            _ => p.to_path_buf(),
        }
    }
}

impl IoSystem for FileIoSystem {
    fn open(&mut self, path: &str, mode: FileMode) -> io::Result<Box<dyn IoStream>> {
        let resolved = match mode {
            FileMode::Read => self
                .resolve(path)
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("{path} not found")))?,
            _ => self.resolve(path).unwrap_or_else(|| self.resolve_for_write(path)),
        };
        log::debug!("Opening {} ({mode:?})", resolved.display());
        Ok(Box::new(FileIoStream::open(resolved, mode)?))
    }

    fn exists(&self, path: &str) -> bool {
        self.resolve(path).is_some()
    }
}
