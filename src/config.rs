//! Environment-driven settings.
//!
//! | Variable            | Meaning                                        | Default |
//! |---------------------|------------------------------------------------|---------|
//! | `DUO3D_LIB_DIR`     | directory holding the DUOLib shared library    | one level above the executable's directory |
//! | `DUO3D_QUEUE_DEPTH` | frames buffered between callback and consumer  | 8       |
//! | `DUO3D_COPY_PIXELS` | copy left/right images out of each frame       | true    |

use std::path::PathBuf;

pub const ENV_LIB_DIR: &str = "DUO3D_LIB_DIR";
pub const ENV_QUEUE_DEPTH: &str = "DUO3D_QUEUE_DEPTH";
pub const ENV_COPY_PIXELS: &str = "DUO3D_COPY_PIXELS";

pub const DEFAULT_QUEUE_DEPTH: usize = 8;

/// Capture session options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureConfig {
    /// Capacity of the bounded channel fed by the frame callback. Frames
    /// arriving while it is full are dropped.
    pub queue_depth: usize,
    /// Copy both images into every [`Frame`](crate::Frame). Turn off for
    /// IMU-only consumers to keep the callback short.
    pub copy_pixels: bool,
    /// Run this device as sync master (`StartDUO` `masterMode`).
    pub master_mode: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            queue_depth: DEFAULT_QUEUE_DEPTH,
            copy_pixels: true,
            master_mode: true,
        }
    }
}

impl CaptureConfig {
    /// Defaults overridden by `DUO3D_QUEUE_DEPTH` and `DUO3D_COPY_PIXELS`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            queue_depth: read_env_usize(ENV_QUEUE_DEPTH, defaults.queue_depth).max(1),
            copy_pixels: read_env_bool(ENV_COPY_PIXELS, defaults.copy_pixels),
            master_mode: defaults.master_mode,
        }
    }
}

/// Library directory override from `DUO3D_LIB_DIR`, if set and non-empty.
pub fn lib_dir_override() -> Option<PathBuf> {
    std::env::var_os(ENV_LIB_DIR)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub(crate) fn read_env_bool(name: &str, default: bool) -> bool {
    std::env::var(name)
        .ok()
        .and_then(|v| parse_bool(&v))
        .unwrap_or(default)
}

pub(crate) fn read_env_usize(name: &str, default: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(default)
}
