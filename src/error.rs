use std::path::PathBuf;

/// Errors detected on the Rust side of the DUOLib boundary.
///
/// A native call that returns `false` is not an error here; wrappers hand that
/// back as `Ok(false)` or `Ok(None)`.
#[derive(Debug, thiserror::Error)]
pub enum DuoError {
    #[error("You need to copy '{file}' from DUOSDK into {} to make this crate work", dir.display())]
    LibraryNotFound { file: &'static str, dir: PathBuf },

    #[error("Could not determine the install directory to search for DUOLib")]
    NoInstallDir,

    #[error("Loading DUOLib failed: {0}")]
    Load(#[from] libloading::Error),

    #[error("DUOLib does not export '{name}': {source}")]
    MissingSymbol {
        name: &'static str,
        #[source]
        source: libloading::Error,
    },

    #[error("DUO device is closed")]
    DeviceClosed,

    #[error("Cannot {operation} while the session is {state}")]
    InvalidState {
        operation: &'static str,
        state: crate::device::SessionState,
    },

    #[error("{parameter:?} is not available in the {revision} SDK revision")]
    Unsupported {
        parameter: crate::params::Parameter,
        revision: &'static str,
    },

    #[error("Capture stream stopped")]
    StreamStopped,

    #[error("Timeout waiting for a frame")]
    Timeout,

    #[error("Failed to spawn frame handler thread: {0}")]
    Spawn(#[source] std::io::Error),
}
