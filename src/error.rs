use std::fmt;
use std::path::PathBuf;

/// Classified failure kinds for remote-store (GitHub Contents API) calls,
/// derived from the HTTP response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteErrorKind {
    Unauthorized,
    NotFound,
    Conflict,
    Other(u16),
}

impl fmt::Display for RemoteErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteErrorKind::Unauthorized => write!(f, "unauthorized (check your token)"),
            RemoteErrorKind::NotFound => write!(f, "not found"),
            RemoteErrorKind::Conflict => write!(f, "conflict (stale version token)"),
            RemoteErrorKind::Other(status) => write!(f, "request failed with status {}", status),
        }
    }
}

/// Main error type for exercise store operations
#[derive(Debug)]
pub enum StoreError {
    Io {
        source: std::io::Error,
        context: String,
    },
    Config {
        message: String,
        path: Option<PathBuf>,
    },
    InvalidInput {
        message: String,
    },
    /// The staged project has no build descriptor (package.json).
    InvalidPackage {
        path: PathBuf,
    },
    Archive {
        path: PathBuf,
        reason: String,
    },
    Build {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },
    BuildTimeout {
        command: String,
        seconds: u64,
    },
    NoOutputDirectory {
        searched: Vec<String>,
    },
    NotFound {
        resource: String,
        identifier: String,
    },
    Remote {
        operation: String,
        path: String,
        kind: RemoteErrorKind,
    },
    Generic {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Io { context, .. } => {
                write!(f, "IO error during {}", context)
            }
            StoreError::Config { message, path } => {
                if let Some(path) = path {
                    write!(f, "Configuration error in {}: {}", path.display(), message)
                } else {
                    write!(f, "Configuration error: {}", message)
                }
            }
            StoreError::InvalidInput { message } => {
                write!(f, "Invalid input: {}", message)
            }
            StoreError::InvalidPackage { path } => {
                write!(
                    f,
                    "Invalid package: no package.json found under {}",
                    path.display()
                )
            }
            StoreError::Archive { path, reason } => {
                write!(f, "Failed to extract archive {}: {}", path.display(), reason)
            }
            StoreError::Build { command, exit_code, stderr } => {
                if let Some(code) = exit_code {
                    write!(f, "Build command '{}' failed with exit code {}: {}", command, code, stderr)
                } else {
                    write!(f, "Build command '{}' failed: {}", command, stderr)
                }
            }
            StoreError::BuildTimeout { command, seconds } => {
                write!(f, "Build command '{}' exceeded the {}s time budget", command, seconds)
            }
            StoreError::NoOutputDirectory { searched } => {
                write!(f, "No build output directory found (searched: {})", searched.join(", "))
            }
            StoreError::NotFound { resource, identifier } => {
                write!(f, "{} '{}' not found", resource, identifier)
            }
            StoreError::Remote { operation, path, kind } => {
                write!(f, "Remote {} of '{}' failed: {}", operation, path, kind)
            }
            StoreError::Generic { message, .. } => {
                write!(f, "{}", message)
            }
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Io { source, .. } => Some(source),
            StoreError::Generic { source, .. } => source.as_ref().map(|s| s.as_ref() as &(dyn std::error::Error + 'static)),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

pub trait ErrorContext<T> {
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;

    fn with_io_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ErrorContext<T> for std::result::Result<T, std::io::Error> {
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| StoreError::Generic {
            message: f(),
            source: Some(Box::new(e)),
        })
    }

    fn with_io_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| StoreError::Io {
            source: e,
            context: f(),
        })
    }
}

impl<T> ErrorContext<T> for std::result::Result<T, StoreError> {
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| StoreError::Generic {
            message: f(),
            source: Some(Box::new(e)),
        })
    }

    fn with_io_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self
    }
}

// Conversion from anyhow::Error for use at the CLI boundary. The reverse
// direction is covered by anyhow's blanket From impl.
impl From<anyhow::Error> for StoreError {
    fn from(err: anyhow::Error) -> Self {
        StoreError::Generic {
            message: err.to_string(),
            source: None,
        }
    }
}

/// Map an HTTP status code onto the remote failure taxonomy.
pub fn classify_status(status: u16) -> RemoteErrorKind {
    match status {
        401 | 403 => RemoteErrorKind::Unauthorized,
        404 => RemoteErrorKind::NotFound,
        409 | 422 => RemoteErrorKind::Conflict,
        other => RemoteErrorKind::Other(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_status_maps_the_taxonomy() {
        assert_eq!(classify_status(401), RemoteErrorKind::Unauthorized);
        assert_eq!(classify_status(403), RemoteErrorKind::Unauthorized);
        assert_eq!(classify_status(404), RemoteErrorKind::NotFound);
        assert_eq!(classify_status(409), RemoteErrorKind::Conflict);
        assert_eq!(classify_status(422), RemoteErrorKind::Conflict);
        assert_eq!(classify_status(500), RemoteErrorKind::Other(500));
    }

    #[test]
    fn display_includes_command_diagnostics() {
        let err = StoreError::Build {
            command: "npm run build".to_string(),
            exit_code: Some(1),
            stderr: "vite: not found".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("npm run build"));
        assert!(text.contains("exit code 1"));
        assert!(text.contains("vite: not found"));
    }
}
