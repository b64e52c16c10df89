//! Locating and loading the vendor's DUOLib shared library.
//!
//! The library is looked up next to the install, one directory above the
//! directory holding the running executable (the layout DUOSDK packages
//! expect), unless `DUO3D_LIB_DIR` points elsewhere. A missing file is reported
//! with its name and the directory searched before the OS loader is involved.
//!
//! Once loaded, the library stays mapped for the rest of the process: DUOLib
//! has no unload contract, so nothing here ever unloads it.

use crate::config;
use crate::resolution::ResolutionFilter;
use crate::sys::{CoreApi, Revision};
use crate::types::ResolutionInfo;
use crate::{DuoError, Result};
use libloading::Library;
use std::ffi::CStr;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock, PoisonError};

/// Revision the process-wide library is bound as.
#[cfg(not(feature = "parameter-id"))]
pub type Sdk = crate::direct::DirectCall;
/// Revision the process-wide library is bound as.
#[cfg(feature = "parameter-id")]
pub type Sdk = crate::param_id::ParameterId;

static GLOBAL: OnceLock<DuoLibrary<Sdk>> = OnceLock::new();
static LOAD_LOCK: Mutex<()> = Mutex::new(());

/// Platform file name of the vendor library.
pub const fn library_file_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "DUOLib.dll"
    } else if cfg!(target_os = "macos") {
        "libDUO.dylib"
    } else {
        "libDUO.so"
    }
}

/// Directory searched when no explicit one is given.
pub fn default_lib_dir() -> Result<PathBuf> {
    if let Some(dir) = config::lib_dir_override() {
        return Ok(dir);
    }
    let exe = std::env::current_exe().map_err(|_| DuoError::NoInstallDir)?;
    exe.parent()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .ok_or(DuoError::NoInstallDir)
}

/// A loaded DUOLib with its entry points resolved for revision `R`.
pub struct DuoLibrary<R: Revision> {
    core: CoreApi<R::Sample>,
    params: R::Params,
    path: Option<PathBuf>,
    // Keeps the mapping alive for the function pointers above. Declared last
    // so it is dropped after them.
    _lib: Option<Library>,
}

impl<R: Revision> DuoLibrary<R> {
    /// Load `dir/<platform file name>` and resolve every required export.
    pub fn load_from(dir: &Path) -> Result<Self> {
        let file = library_file_name();
        let path = dir.join(file);
        if !path.is_file() {
            return Err(DuoError::LibraryNotFound {
                file,
                dir: dir.to_path_buf(),
            });
        }

        // SAFETY: loading runs the vendor library's initialisers; DUOLib is
        // the trusted collaborator this crate exists to call into.
        let lib = unsafe { Library::new(&path)? };
        let (core, params) = unsafe { (CoreApi::resolve(&lib)?, R::resolve_params(&lib)?) };

        log::info!("Loaded {} as {} revision", path.display(), R::NAME);

        Ok(Self {
            core,
            params,
            path: Some(path),
            _lib: Some(lib),
        })
    }

    /// Load from [`default_lib_dir`].
    pub fn load_default() -> Result<Self> {
        Self::load_from(&default_lib_dir()?)
    }

    /// Wrap already-resolved entry points, e.g. a statically linked or fake DUOLib.
    pub fn from_parts(core: CoreApi<R::Sample>, params: R::Params) -> Self {
        Self {
            core,
            params,
            path: None,
            _lib: None,
        }
    }

    /// Pin this library for the rest of the process.
    pub fn leak(self) -> &'static Self {
        Box::leak(Box::new(self))
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn core(&self) -> &CoreApi<R::Sample> {
        &self.core
    }

    pub fn params(&self) -> &R::Params {
        &self.params
    }

    /// `GetDUOLibVersion`. `None` if DUOLib returns a null pointer.
    pub fn version(&self) -> Option<String> {
        let ptr = unsafe { (self.core.get_lib_version)() };
        if ptr.is_null() {
            return None;
        }
        // SAFETY: DUOLib returns a static NUL-terminated string.
        Some(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
    }

    /// `EnumerateDUOResolutions`: up to `capacity` modes matching `filter`.
    ///
    /// Needs no open device.
    pub fn enumerate_resolutions(
        &self,
        filter: &ResolutionFilter,
        capacity: usize,
    ) -> Vec<ResolutionInfo> {
        let mut list = vec![ResolutionInfo::default(); capacity];
        let size = i32::try_from(capacity).unwrap_or(i32::MAX);
        let (width, height, binning, fps) = filter.to_native();

        let found = unsafe {
            (self.core.enumerate_resolutions)(list.as_mut_ptr(), size, width, height, binning, fps)
        };
        log::debug!("EnumerateDUOResolutions({:?}) -> {}", filter, found);

        list.truncate(usize::try_from(found).unwrap_or(0).min(capacity));
        list
    }
}

impl DuoLibrary<Sdk> {
    /// The process-wide library, loaded from [`default_lib_dir`] on first use.
    ///
    /// A failed load is not cached; the next call tries again.
    pub fn global() -> Result<&'static Self> {
        if let Some(lib) = GLOBAL.get() {
            return Ok(lib);
        }
        let _guard = LOAD_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(lib) = GLOBAL.get() {
            return Ok(lib);
        }
        let lib = Self::load_default()?;
        Ok(GLOBAL.get_or_init(|| lib))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::direct::DirectCall;
    use crate::mock;
    use crate::types::Binning;

    #[test]
    fn test_library_file_name() {
        let name = library_file_name();
        #[cfg(target_os = "linux")]
        assert_eq!(name, "libDUO.so");
        #[cfg(target_os = "windows")]
        assert_eq!(name, "DUOLib.dll");
        #[cfg(target_os = "macos")]
        assert_eq!(name, "libDUO.dylib");
        assert!(!name.is_empty());
    }

    #[test]
    fn test_missing_library_names_file_and_dir() {
        let scratch = tempfile::tempdir().unwrap();
        let dir = scratch.path();
        match DuoLibrary::<DirectCall>::load_from(dir) {
            Err(DuoError::LibraryNotFound { file, dir: searched }) => {
                assert_eq!(file, library_file_name());
                assert_eq!(searched, dir);
            }
            Err(e) => panic!("unexpected error: {}", e),
            Ok(_) => panic!("loaded a library from an empty directory"),
        }

        let msg = match DuoLibrary::<DirectCall>::load_from(dir) {
            Err(e) => e.to_string(),
            Ok(_) => unreachable!(),
        };
        assert!(msg.contains(library_file_name()));
        assert!(msg.contains(&dir.display().to_string()));

        let searched = dir.to_path_buf();
        drop(scratch);
        assert!(!searched.exists());
    }

    #[test]
    fn test_version_and_enumeration() {
        let lib = mock::library();
        assert_eq!(lib.version().as_deref(), Some(mock::LIB_VERSION));
        assert!(lib.path().is_none());

        let all = lib.enumerate_resolutions(&ResolutionFilter::any(), 16);
        assert_eq!(all.len(), mock::RESOLUTIONS.len());

        let qvga = ResolutionFilter::size(320, 240)
            .with_binning(Binning::HORIZONTAL2 | Binning::VERTICAL2)
            .with_fps(30.0);
        let found = lib.enumerate_resolutions(&qvga, 1);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].width, 320);
        assert_eq!(found[0].binning_flags(), Binning::HORIZONTAL2 | Binning::VERTICAL2);
    }

    #[test]
    fn test_enumeration_respects_capacity() {
        let lib = mock::library();
        let found = lib.enumerate_resolutions(&ResolutionFilter::any(), 2);
        assert_eq!(found.len(), 2);
        assert!(lib.enumerate_resolutions(&ResolutionFilter::any(), 0).is_empty());
    }
}
