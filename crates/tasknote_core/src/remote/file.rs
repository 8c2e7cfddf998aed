use super::{DocumentStore, RemoteOperation, RemoteResult, TransportError};
use log::error;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Note document kept as a local markdown file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDocumentStore {
    path: PathBuf,
}

impl FileDocumentStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DocumentStore for FileDocumentStore {
    fn read(&self) -> RemoteResult<String> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => Ok(text),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(String::new()),
            Err(err) => {
                error!(
                    "event=remote_read module=remote status=error error_code=io_error error={}",
                    err
                );
                Err(io_error(RemoteOperation::Read, &self.path, &err))
            }
        }
    }

    fn write(&mut self, text: &str) -> RemoteResult<()> {
        std::fs::write(&self.path, text).map_err(|err| {
            error!(
                "event=remote_write module=remote status=error error_code=io_error error={}",
                err
            );
            io_error(RemoteOperation::Write, &self.path, &err)
        })
    }
}

fn io_error(operation: RemoteOperation, path: &Path, err: &std::io::Error) -> TransportError {
    let retryable = matches!(
        err.kind(),
        ErrorKind::Interrupted | ErrorKind::WouldBlock | ErrorKind::TimedOut
    );
    TransportError::new(
        operation,
        "io_error",
        format!("`{}`: {err}", path.display()),
        retryable,
    )
}
