//! Direct-call revision: one native getter/setter per parameter.

use crate::params::{imu_range_value, text_from_buffer, Parameter, ParameterStore, Setting, Value};
use crate::sys::{optional_symbol, symbol, Revision};
use crate::types::{
    DuoInstance, ExposureUnit, Extrinsics, ImuSample, Intrinsics, LedSeq, ResolutionInfo,
    StereoParameters, TEXT_BUFFER_LEN,
};
use crate::Result;
use libloading::Library;
use std::ffi::{c_char, c_int};

pub type GetTextFn = unsafe extern "C" fn(DuoInstance, *mut c_char) -> bool;
pub type GetF64Fn = unsafe extern "C" fn(DuoInstance, *mut f64) -> bool;
pub type GetBoolFn = unsafe extern "C" fn(DuoInstance, *mut bool) -> bool;
pub type SetF64Fn = unsafe extern "C" fn(DuoInstance, f64) -> bool;
pub type SetBoolFn = unsafe extern "C" fn(DuoInstance, bool) -> bool;

/// The direct-call SDK revision. Its IMU samples carry their own timestamp.
pub struct DirectCall;

impl Revision for DirectCall {
    const NAME: &'static str = "direct-call";
    type Sample = ImuSample;
    type Params = DirectApi;

    unsafe fn resolve_params(lib: &Library) -> Result<DirectApi> {
        DirectApi::resolve(lib)
    }
}

/// Per-parameter entry points. `Option` fields are exports missing from some builds.
pub struct DirectApi {
    pub get_device_name: GetTextFn,
    pub get_serial_number: GetTextFn,
    pub get_firmware_version: GetTextFn,
    pub get_firmware_build: GetTextFn,
    pub get_resolution_info: unsafe extern "C" fn(DuoInstance, *mut ResolutionInfo) -> bool,
    pub get_frame_dimension: unsafe extern "C" fn(DuoInstance, *mut u32, *mut u32) -> bool,
    pub get_exposure: GetF64Fn,
    pub get_exposure_ms: GetF64Fn,
    pub get_auto_exposure: Option<GetBoolFn>,
    pub get_gain: GetF64Fn,
    pub get_hflip: GetBoolFn,
    pub get_vflip: GetBoolFn,
    pub get_camera_swap: GetBoolFn,
    pub get_led_pwm: GetF64Fn,
    pub get_calibration_present: GetBoolFn,
    /// Writes four doubles.
    pub get_fov: GetF64Fn,
    /// Writes four doubles.
    pub get_rectified_fov: Option<GetF64Fn>,
    pub get_undistort: GetBoolFn,
    pub get_intrinsics: unsafe extern "C" fn(DuoInstance, *mut Intrinsics) -> bool,
    pub get_extrinsics: unsafe extern "C" fn(DuoInstance, *mut Extrinsics) -> bool,
    pub get_stereo_parameters: unsafe extern "C" fn(DuoInstance, *mut StereoParameters) -> bool,
    pub get_imu_range: unsafe extern "C" fn(DuoInstance, *mut c_int, *mut c_int) -> bool,

    /// Takes the descriptor by value.
    pub set_resolution_info: unsafe extern "C" fn(DuoInstance, ResolutionInfo) -> bool,
    pub set_exposure: SetF64Fn,
    pub set_exposure_ms: SetF64Fn,
    pub set_auto_exposure: Option<SetBoolFn>,
    pub set_gain: SetF64Fn,
    pub set_hflip: SetBoolFn,
    pub set_vflip: SetBoolFn,
    pub set_camera_swap: SetBoolFn,
    pub set_led_pwm: SetF64Fn,
    pub set_led_pwm_seq: unsafe extern "C" fn(DuoInstance, *const LedSeq, u32) -> bool,
    pub set_undistort: SetBoolFn,
    pub set_imu_range: unsafe extern "C" fn(DuoInstance, c_int, c_int) -> bool,
    pub set_imu_rate: Option<SetF64Fn>,
}

impl DirectApi {
    /// # Safety
    /// `lib` must be a direct-call DUOLib build.
    pub unsafe fn resolve(lib: &Library) -> Result<Self> {
        Ok(Self {
            get_device_name: symbol(lib, "GetDUODeviceName")?,
            get_serial_number: symbol(lib, "GetDUOSerialNumber")?,
            get_firmware_version: symbol(lib, "GetDUOFirmwareVersion")?,
            get_firmware_build: symbol(lib, "GetDUOFirmwareBuild")?,
            get_resolution_info: symbol(lib, "GetDUOResolutionInfo")?,
            get_frame_dimension: symbol(lib, "GetDUOFrameDimension")?,
            get_exposure: symbol(lib, "GetDUOExposure")?,
            get_exposure_ms: symbol(lib, "GetDUOExposureMS")?,
            get_auto_exposure: optional_symbol(lib, "GetDUOAutoExposure"),
            get_gain: symbol(lib, "GetDUOGain")?,
            get_hflip: symbol(lib, "GetDUOHFlip")?,
            get_vflip: symbol(lib, "GetDUOVFlip")?,
            get_camera_swap: symbol(lib, "GetDUOCameraSwap")?,
            get_led_pwm: symbol(lib, "GetDUOLedPWM")?,
            get_calibration_present: symbol(lib, "GetDUOCalibrationPresent")?,
            get_fov: symbol(lib, "GetDUOFOV")?,
            get_rectified_fov: optional_symbol(lib, "GetDUORectifiedFOV"),
            get_undistort: symbol(lib, "GetDUOUndistort")?,
            get_intrinsics: symbol(lib, "GetDUOIntrinsics")?,
            get_extrinsics: symbol(lib, "GetDUOExtrinsics")?,
            get_stereo_parameters: symbol(lib, "GetDUOStereoParameters")?,
            get_imu_range: symbol(lib, "GetDUOIMURange")?,
            set_resolution_info: symbol(lib, "SetDUOResolutionInfo")?,
            set_exposure: symbol(lib, "SetDUOExposure")?,
            set_exposure_ms: symbol(lib, "SetDUOExposureMS")?,
            set_auto_exposure: optional_symbol(lib, "SetDUOAutoExposure"),
            set_gain: symbol(lib, "SetDUOGain")?,
            set_hflip: symbol(lib, "SetDUOHFlip")?,
            set_vflip: symbol(lib, "SetDUOVFlip")?,
            set_camera_swap: symbol(lib, "SetDUOCameraSwap")?,
            set_led_pwm: symbol(lib, "SetDUOLedPWM")?,
            set_led_pwm_seq: symbol(lib, "SetDUOLedPWMSeq")?,
            set_undistort: symbol(lib, "SetDUOUndistort")?,
            set_imu_range: symbol(lib, "SetDUOIMURange")?,
            set_imu_rate: optional_symbol(lib, "SetDUOIMURate"),
        })
    }
}

unsafe fn read_text(f: GetTextFn, duo: DuoInstance) -> Option<Value> {
    let mut buf = [0 as c_char; TEXT_BUFFER_LEN];
    f(duo, buf.as_mut_ptr()).then(|| Value::Text(text_from_buffer(&buf)))
}

unsafe fn read_f64(f: GetF64Fn, duo: DuoInstance) -> Option<Value> {
    let mut val = 0.0f64;
    if f(duo, &mut val) {
        Some(Value::Scalar(val))
    } else {
        None
    }
}

unsafe fn read_bool(f: GetBoolFn, duo: DuoInstance) -> Option<Value> {
    let mut val = false;
    if f(duo, &mut val) {
        Some(Value::Flag(val))
    } else {
        None
    }
}

unsafe fn read_fov(f: GetF64Fn, duo: DuoInstance) -> Option<Value> {
    let mut fov = [0.0f64; 4];
    if f(duo, fov.as_mut_ptr()) {
        Some(Value::Fov(fov))
    } else {
        None
    }
}

unsafe fn read_record<T: Default>(
    f: unsafe extern "C" fn(DuoInstance, *mut T) -> bool,
    duo: DuoInstance,
) -> Option<T> {
    let mut val = T::default();
    if f(duo, &mut val) {
        Some(val)
    } else {
        None
    }
}

impl ParameterStore for DirectApi {
    fn revision(&self) -> &'static str {
        DirectCall::NAME
    }

    unsafe fn get(&self, duo: DuoInstance, parameter: Parameter) -> Result<Option<Value>> {
        let value = match parameter {
            Parameter::DeviceName => read_text(self.get_device_name, duo),
            Parameter::SerialNumber => read_text(self.get_serial_number, duo),
            Parameter::FirmwareVersion => read_text(self.get_firmware_version, duo),
            Parameter::FirmwareBuild => read_text(self.get_firmware_build, duo),
            Parameter::ResolutionInfo => {
                read_record(self.get_resolution_info, duo).map(Value::Resolution)
            }
            Parameter::FrameDimension => {
                let (mut width, mut height) = (0u32, 0u32);
                if (self.get_frame_dimension)(duo, &mut width, &mut height) {
                    Some(Value::Dimension { width, height })
                } else {
                    None
                }
            }
            Parameter::Exposure(ExposureUnit::Percentage) => read_f64(self.get_exposure, duo),
            Parameter::Exposure(ExposureUnit::Milliseconds) => read_f64(self.get_exposure_ms, duo),
            Parameter::AutoExposure => {
                let f = self
                    .get_auto_exposure
                    .ok_or_else(|| self.unsupported(parameter))?;
                read_bool(f, duo)
            }
            Parameter::Gain => read_f64(self.get_gain, duo),
            Parameter::HFlip => read_bool(self.get_hflip, duo),
            Parameter::VFlip => read_bool(self.get_vflip, duo),
            Parameter::CameraSwap => read_bool(self.get_camera_swap, duo),
            Parameter::LedPwm => read_f64(self.get_led_pwm, duo),
            Parameter::CalibrationPresent => read_bool(self.get_calibration_present, duo),
            Parameter::Fov => read_fov(self.get_fov, duo),
            Parameter::RectifiedFov => {
                let f = self
                    .get_rectified_fov
                    .ok_or_else(|| self.unsupported(parameter))?;
                read_fov(f, duo)
            }
            Parameter::Undistort => read_bool(self.get_undistort, duo),
            Parameter::Intrinsics => read_record(self.get_intrinsics, duo).map(Value::Intrinsics),
            Parameter::Extrinsics => read_record(self.get_extrinsics, duo).map(Value::Extrinsics),
            Parameter::StereoParameters => {
                read_record(self.get_stereo_parameters, duo).map(Value::Stereo)
            }
            Parameter::ImuRange => {
                let (mut accel, mut gyro): (c_int, c_int) = (0, 0);
                if (self.get_imu_range)(duo, &mut accel, &mut gyro) {
                    imu_range_value(accel, gyro)
                } else {
                    None
                }
            }
            // Write-only in every DUOLib build.
            Parameter::LedPwmSeq | Parameter::ImuRate => return Err(self.unsupported(parameter)),
        };
        Ok(value)
    }

    unsafe fn set(&self, duo: DuoInstance, setting: &Setting<'_>) -> Result<bool> {
        let ok = match *setting {
            Setting::ResolutionInfo(ri) => (self.set_resolution_info)(duo, ri),
            Setting::Exposure(val, ExposureUnit::Percentage) => (self.set_exposure)(duo, val),
            Setting::Exposure(val, ExposureUnit::Milliseconds) => (self.set_exposure_ms)(duo, val),
            Setting::AutoExposure(val) => {
                let f = self
                    .set_auto_exposure
                    .ok_or_else(|| self.unsupported(setting.parameter()))?;
                f(duo, val)
            }
            Setting::Gain(val) => (self.set_gain)(duo, val),
            Setting::HFlip(val) => (self.set_hflip)(duo, val),
            Setting::VFlip(val) => (self.set_vflip)(duo, val),
            Setting::CameraSwap(val) => (self.set_camera_swap)(duo, val),
            Setting::LedPwm(val) => (self.set_led_pwm)(duo, val),
            Setting::LedPwmSeq(seq) => {
                (self.set_led_pwm_seq)(duo, seq.as_ptr(), seq.len() as u32)
            }
            Setting::Undistort(val) => (self.set_undistort)(duo, val),
            Setting::ImuRange(accel, gyro) => {
                (self.set_imu_range)(duo, accel as c_int, gyro as c_int)
            }
            Setting::ImuRate(rate) => {
                let f = self
                    .set_imu_rate
                    .ok_or_else(|| self.unsupported(setting.parameter()))?;
                f(duo, rate)
            }
        };
        Ok(ok)
    }
}
