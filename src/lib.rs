//! # duo3d - Rust bindings for the DUO3D stereo camera SDK
//!
//! Loads the vendor's DUOLib at runtime (libloading) and exposes it safely:
//! - Bit-exact `#[repr(C)]` mirrors of every record DUOLib exchanges
//! - Resolution enumeration and the binning helper
//! - Device parameters behind a [`ParameterStore`] with one backend per SDK revision
//! - Frame capture through a callback trampoline feeding a bounded channel
//!
//! The shared library is looked up one directory above the running executable
//! (override with `DUO3D_LIB_DIR`) and stays loaded for the life of the process.
//!
//! ## Quick Start
//! ```no_run
//! use duo3d::{CaptureConfig, Device, DuoLibrary, ResolutionFilter, find_optimal_binning};
//! use std::time::Duration;
//!
//! let lib = DuoLibrary::global().unwrap();
//! let filter = ResolutionFilter::size(320, 240)
//!     .with_binning(find_optimal_binning(320, 240))
//!     .with_fps(30.0);
//! let modes = lib.enumerate_resolutions(&filter, 1);
//!
//! let mut device = Device::new(lib);
//! assert!(device.open().unwrap());
//! device.set_resolution_info(modes[0]).unwrap();
//!
//! let stream = device.start_capture(&CaptureConfig::default()).unwrap().unwrap();
//! for _ in 0..100 {
//!     let frame = stream.recv_timeout(Duration::from_secs(1)).unwrap();
//!     println!("{:.1} ms, {} IMU samples", frame.timestamp_ms(), frame.imu.len());
//! }
//! device.stop_capture().unwrap();
//! ```

pub mod error;
pub mod types;
pub mod resolution;
pub mod config;
pub mod sys;
pub mod library;
pub mod params;
pub mod direct;
pub mod param_id;
pub mod capture;
pub mod device;

#[cfg(test)]
mod mock;

pub use error::DuoError;
pub use types::*;
pub use resolution::{find_optimal_binning, ResolutionFilter, SENSOR_HEIGHT, SENSOR_WIDTH};
pub use config::CaptureConfig;
pub use sys::Revision;
pub use library::{library_file_name, DuoLibrary, Sdk};
pub use params::{Parameter, ParameterStore, Setting, Value};
pub use direct::DirectCall;
pub use param_id::ParameterId;
pub use capture::{CaptureStats, CaptureStream};
pub use device::{Device, SessionState};

/// Result type alias for duo3d operations.
pub type Result<T> = std::result::Result<T, DuoError>;
