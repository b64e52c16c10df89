//! Device parameters as a capability interface.
//!
//! DUOLib exposes its parameters in two incompatible shapes depending on the SDK
//! revision: one native getter/setter per parameter, or a single
//! `GetDUOParameter`/`SetDUOParameter` pair keyed by [`ParamId`]. Both sit behind
//! [`ParameterStore`]; see [`crate::direct`] and [`crate::param_id`].

use crate::types::{
    AccelRange, DuoInstance, ExposureUnit, Extrinsics, GyroRange, Intrinsics, LedSeq,
    ResolutionInfo, StereoParameters,
};
use crate::{DuoError, Result};
use std::ffi::c_char;

/// Parameter selector of the multiplexed API (`DUOParameter` enum).
///
/// The numeric values are part of the vendor ABI.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamId {
    /// Unit selector: percentage.
    Percentage = 0,
    /// Unit selector: milliseconds.
    Milliseconds = 1,
    DeviceName = 2,
    SerialNumber = 3,
    FirmwareVersion = 4,
    FirmwareBuild = 5,
    ResolutionInfo = 6,
    FrameDimension = 7,
    Exposure = 8,
    Gain = 9,
    HFlip = 10,
    VFlip = 11,
    SwapCameras = 12,
    LedPwm = 13,
    LedPwmSeq = 14,
    CalibrationPresent = 15,
    Fov = 16,
    Undistort = 17,
    Intrinsics = 18,
    Extrinsics = 19,
    StereoParameters = 20,
    ImuRange = 21,
}

impl From<ExposureUnit> for ParamId {
    fn from(unit: ExposureUnit) -> Self {
        match unit {
            ExposureUnit::Percentage => ParamId::Percentage,
            ExposureUnit::Milliseconds => ParamId::Milliseconds,
        }
    }
}

/// Logical device parameter, independent of how a revision reaches it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parameter {
    DeviceName,
    SerialNumber,
    FirmwareVersion,
    FirmwareBuild,
    ResolutionInfo,
    FrameDimension,
    Exposure(ExposureUnit),
    AutoExposure,
    Gain,
    HFlip,
    VFlip,
    CameraSwap,
    LedPwm,
    LedPwmSeq,
    CalibrationPresent,
    Fov,
    RectifiedFov,
    Undistort,
    Intrinsics,
    Extrinsics,
    StereoParameters,
    ImuRange,
    ImuRate,
}

/// A value to write to the device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Setting<'a> {
    ResolutionInfo(ResolutionInfo),
    Exposure(f64, ExposureUnit),
    AutoExposure(bool),
    Gain(f64),
    HFlip(bool),
    VFlip(bool),
    CameraSwap(bool),
    LedPwm(f64),
    LedPwmSeq(&'a [LedSeq]),
    Undistort(bool),
    ImuRange(AccelRange, GyroRange),
    /// IMU sampling rate in Hz, [50, 500].
    ImuRate(f64),
}

impl Setting<'_> {
    pub fn parameter(&self) -> Parameter {
        match self {
            Setting::ResolutionInfo(_) => Parameter::ResolutionInfo,
            Setting::Exposure(_, unit) => Parameter::Exposure(*unit),
            Setting::AutoExposure(_) => Parameter::AutoExposure,
            Setting::Gain(_) => Parameter::Gain,
            Setting::HFlip(_) => Parameter::HFlip,
            Setting::VFlip(_) => Parameter::VFlip,
            Setting::CameraSwap(_) => Parameter::CameraSwap,
            Setting::LedPwm(_) => Parameter::LedPwm,
            Setting::LedPwmSeq(_) => Parameter::LedPwmSeq,
            Setting::Undistort(_) => Parameter::Undistort,
            Setting::ImuRange(..) => Parameter::ImuRange,
            Setting::ImuRate(_) => Parameter::ImuRate,
        }
    }
}

/// A value read back from the device.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Resolution(ResolutionInfo),
    Dimension { width: u32, height: u32 },
    Scalar(f64),
    Flag(bool),
    /// Field of view as four doubles, in the order DUOLib writes them.
    Fov([f64; 4]),
    Intrinsics(Intrinsics),
    Extrinsics(Extrinsics),
    Stereo(StereoParameters),
    ImuRange { accel: AccelRange, gyro: GyroRange },
}

impl Value {
    pub fn into_text(self) -> Option<String> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn into_scalar(self) -> Option<f64> {
        match self {
            Value::Scalar(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_flag(self) -> Option<bool> {
        match self {
            Value::Flag(v) => Some(v),
            _ => None,
        }
    }
}

/// Get/set access to device parameters for one SDK revision.
///
/// `get` returns `Ok(None)` and `set` returns `Ok(false)` when the native call
/// reports failure; DUOLib gives no further reason. `Err` is reserved for
/// parameters the revision cannot express at all.
pub trait ParameterStore: Send + Sync {
    /// Revision name used in diagnostics.
    fn revision(&self) -> &'static str;

    /// # Safety
    /// `duo` must be a handle returned by a successful `OpenDUO` and not yet closed.
    unsafe fn get(&self, duo: DuoInstance, parameter: Parameter) -> Result<Option<Value>>;

    /// # Safety
    /// Same handle contract as [`ParameterStore::get`].
    unsafe fn set(&self, duo: DuoInstance, setting: &Setting<'_>) -> Result<bool>;

    fn unsupported(&self, parameter: Parameter) -> DuoError {
        DuoError::Unsupported {
            parameter,
            revision: self.revision(),
        }
    }
}

/// Read a NUL-terminated string out of a fixed-size text buffer.
pub(crate) fn text_from_buffer(buf: &[c_char]) -> String {
    let end = buf.iter().position(|&c| c == 0).unwrap_or(buf.len());
    let bytes: Vec<u8> = buf[..end].iter().map(|&c| c as u8).collect();
    String::from_utf8_lossy(&bytes).to_string()
}

/// Build [`Value::ImuRange`] from raw selectors, logging values this crate does not know.
pub(crate) fn imu_range_value(accel: i32, gyro: i32) -> Option<Value> {
    match (AccelRange::from_raw(accel), GyroRange::from_raw(gyro)) {
        (Some(accel), Some(gyro)) => Some(Value::ImuRange { accel, gyro }),
        _ => {
            log::warn!("Unknown IMU range reported: accel={} gyro={}", accel, gyro);
            None
        }
    }
}
