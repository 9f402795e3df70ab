use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};

/// Upper bound on the number of bytes read from a single pseudo-file.
///
/// Large enough to take `/proc/meminfo` wholesale while keeping small counter
/// files like `cpu.max` to a single short read.
pub const MAX_PROBE_BYTES: u64 = 64 * 1024;

/// The single recoverable condition of this crate: a metric file could not be used.
///
/// Every variant carries the offending path. Resolvers treat any of them as
/// "fall through to the next strategy".
#[derive(Debug, thiserror::Error)]
pub enum Unavailable {
    #[error("failed to open file `{path}`: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read file `{path}`: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("file `{path}` is empty")]
    Empty { path: PathBuf },
    #[error("failed to parse file `{path}`: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl Unavailable {
    /// Returns the path of the file that could not be used.
    pub fn path(&self) -> &Path {
        match self {
            Unavailable::Open { path, .. }
            | Unavailable::Read { path, .. }
            | Unavailable::Empty { path }
            | Unavailable::Parse { path, .. } => path,
        }
    }
}

pub type Result<T> = std::result::Result<T, Unavailable>;

/// Reads single pseudo-files such as `cpu.max` or `/proc/meminfo`.
///
/// Implementations must never panic; every failure is reported as [`Unavailable`].
pub trait FileProbe: std::fmt::Debug + Send + Sync {
    /// Returns the contents of `path` with trailing whitespace removed.
    ///
    /// # Errors
    ///
    /// Returns [`Unavailable`] if the file is missing, unreadable or empty.
    fn read(&self, path: &Path) -> Result<String>;

    /// Returns `true` if `path` can be read.
    fn exists(&self, path: &Path) -> bool {
        self.read(path).is_ok()
    }
}

/// [`FileProbe`] backed by the real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostProbe;

impl FileProbe for HostProbe {
    fn read(&self, path: &Path) -> Result<String> {
        let file = File::open(path).map_err(|source| Unavailable::Open {
            path: path.to_path_buf(),
            source,
        })?;

        let mut content = String::with_capacity(256);
        file.take(MAX_PROBE_BYTES)
            .read_to_string(&mut content)
            .map_err(|source| Unavailable::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let trimmed_len = content.trim_end().len();
        if trimmed_len == 0 {
            return Err(Unavailable::Empty {
                path: path.to_path_buf(),
            });
        }
        content.truncate(trimmed_len);

        Ok(content)
    }
}

/// Reads `path` and parses it with a reader-based stat parser.
///
/// Parse failures are reported as [`Unavailable::Parse`].
pub fn read_parsed<T>(
    probe: &dyn FileProbe,
    path: &Path,
    parse: impl FnOnce(&mut Cursor<String>) -> io::Result<T>,
) -> Result<T> {
    let content = probe.read(path)?;
    parse(&mut Cursor::new(content)).map_err(|source| Unavailable::Parse {
        path: path.to_path_buf(),
        source,
    })
}
