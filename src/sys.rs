//! Native entry points shared by every DUOLib revision, and the revision capability trait.
//!
//! Signatures mirror `DUOLib.h`. All entry points use the platform C calling
//! convention the vendor builds with (`cdecl` on 32-bit Windows).

use crate::params::ParameterStore;
use crate::types::{DuoInstance, ImuLayout, RawFrame, ResolutionInfo};
use crate::{DuoError, Result};
use libloading::Library;
use std::ffi::{c_char, c_int, c_void};

/// `DUOFrameCallback`. `None` is the empty callback (NULL function pointer).
///
/// Invoked on DUOLib's capture thread once per frame. The frame pointer is only
/// valid until the callback returns.
pub type FrameCallback<S> =
    Option<unsafe extern "C" fn(frame: *const RawFrame<S>, user_data: *mut c_void)>;

/// Entry points present in every SDK revision.
pub struct CoreApi<S> {
    /// `const char* GetDUOLibVersion()`
    pub get_lib_version: unsafe extern "C" fn() -> *const c_char,
    /// `int EnumerateDUOResolutions(DUOResolutionInfo*, int32_t size, int32_t width, int32_t height, int32_t binning, float fps)`
    pub enumerate_resolutions:
        unsafe extern "C" fn(*mut ResolutionInfo, i32, i32, i32, i32, f32) -> c_int,
    /// `bool OpenDUO(DUOInstance*)`
    pub open: unsafe extern "C" fn(*mut DuoInstance) -> bool,
    /// `bool CloseDUO(DUOInstance)`
    pub close: unsafe extern "C" fn(DuoInstance) -> bool,
    /// `bool StartDUO(DUOInstance, DUOFrameCallback, void* pUserData, bool masterMode)`
    pub start: unsafe extern "C" fn(DuoInstance, FrameCallback<S>, *mut c_void, bool) -> bool,
    /// `bool StopDUO(DUOInstance)`
    pub stop: unsafe extern "C" fn(DuoInstance) -> bool,
}

impl<S> CoreApi<S> {
    /// # Safety
    /// `lib` must be a DUOLib build whose exports match the signatures above.
    pub unsafe fn resolve(lib: &Library) -> Result<Self> {
        Ok(Self {
            get_lib_version: symbol(lib, "GetDUOLibVersion")?,
            enumerate_resolutions: symbol(lib, "EnumerateDUOResolutions")?,
            open: symbol(lib, "OpenDUO")?,
            close: symbol(lib, "CloseDUO")?,
            start: symbol(lib, "StartDUO")?,
            stop: symbol(lib, "StopDUO")?,
        })
    }
}

/// A vendor SDK revision: its IMU sample layout and how it exposes parameters.
///
/// DUOLib builds are not interchangeable across revisions; pick the one
/// matching the shipped header.
pub trait Revision: Send + Sync + 'static {
    /// Name used in logs and errors.
    const NAME: &'static str;

    /// IMU sample layout inside this revision's `DUOFrame`.
    type Sample: ImuLayout;

    /// Parameter backend.
    type Params: ParameterStore;

    /// # Safety
    /// `lib` must be a DUOLib build of this revision.
    unsafe fn resolve_params(lib: &Library) -> Result<Self::Params>;
}

/// Copy a required function pointer out of `lib`.
///
/// # Safety
/// `T` must be the exact function pointer type of the export.
pub(crate) unsafe fn symbol<T: Copy>(lib: &Library, name: &'static str) -> Result<T> {
    lib.get::<T>(name.as_bytes())
        .map(|sym| *sym)
        .map_err(|source| DuoError::MissingSymbol { name, source })
}

/// Like [`symbol`], for exports that only some builds carry.
pub(crate) unsafe fn optional_symbol<T: Copy>(lib: &Library, name: &'static str) -> Option<T> {
    match lib.get::<T>(name.as_bytes()) {
        Ok(sym) => Some(*sym),
        Err(e) => {
            log::debug!("Optional DUOLib export '{}' not available: {}", name, e);
            None
        }
    }
}
