//! Parameter-ID revision: every parameter goes through the variadic
//! `GetDUOParameter(duo, id, ...)` / `SetDUOParameter(duo, id, ...)` pair.
//!
//! Argument lists depend on the [`ParamId`]. Each request is first encoded into
//! a [`GetCall`] / [`SetCall`] describing the exact trailing arguments, then
//! dispatched. Scalars narrower than `int` are passed as `int` (C default
//! argument promotion).

use crate::params::{
    imu_range_value, text_from_buffer, ParamId, Parameter, ParameterStore, Setting, Value,
};
use crate::sys::{symbol, Revision};
use crate::types::{
    DuoInstance, Extrinsics, ImuSampleUntimed, Intrinsics, LedSeq, ResolutionInfo,
    StereoParameters, TEXT_BUFFER_LEN,
};
use crate::Result;
use libloading::Library;
use std::ffi::{c_char, c_int, c_uint};

/// `bool GetDUOParameter(DUOInstance, DUOParameter, ...)`
pub type GetParameterFn = unsafe extern "C" fn(DuoInstance, c_int, ...) -> bool;
/// `bool SetDUOParameter(DUOInstance, DUOParameter, ...)`
pub type SetParameterFn = unsafe extern "C" fn(DuoInstance, c_int, ...) -> bool;

/// The parameter-ID SDK revision. Its IMU samples rely on the frame timestamp.
pub struct ParameterId;

impl Revision for ParameterId {
    const NAME: &'static str = "parameter-id";
    type Sample = ImuSampleUntimed;
    type Params = ParamIdApi;

    unsafe fn resolve_params(lib: &Library) -> Result<ParamIdApi> {
        Ok(ParamIdApi {
            get_parameter: symbol(lib, "GetDUOParameter")?,
            set_parameter: symbol(lib, "SetDUOParameter")?,
        })
    }
}

pub struct ParamIdApi {
    pub get_parameter: GetParameterFn,
    pub set_parameter: SetParameterFn,
}

/// Trailing arguments of one `GetDUOParameter` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GetCall {
    /// `char*` of at least [`TEXT_BUFFER_LEN`] bytes.
    Text(ParamId),
    /// `DUOResolutionInfo*`
    Resolution,
    /// `uint32_t* width, uint32_t* height`
    Dimension,
    /// `double* value, DUOParameter unit`
    Exposure(ParamId),
    /// `double*`
    Double(ParamId),
    /// `bool*`
    Flag(ParamId),
    /// `DUOResolutionInfo* current, double fov[4]`
    Fov,
    Intrinsics,
    Extrinsics,
    Stereo,
    /// `int* accel, int* gyro`
    ImuRange,
}

/// Trailing arguments of one `SetDUOParameter` call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SetCall<'a> {
    /// `DUOResolutionInfo*`
    Resolution(&'a ResolutionInfo),
    /// `double value, DUOParameter unit`
    Exposure(f64, ParamId),
    /// `double`
    Double(ParamId, f64),
    /// `bool`, promoted to `int`
    Flag(ParamId, c_int),
    /// `DUOLEDSeq*, uint32_t count`
    LedSequence(&'a [LedSeq]),
    /// `int accel, int gyro`
    ImuRange(c_int, c_int),
}

/// Encode a read. `None` when the revision has no ID for the parameter.
pub fn encode_get(parameter: Parameter) -> Option<GetCall> {
    let call = match parameter {
        Parameter::DeviceName => GetCall::Text(ParamId::DeviceName),
        Parameter::SerialNumber => GetCall::Text(ParamId::SerialNumber),
        Parameter::FirmwareVersion => GetCall::Text(ParamId::FirmwareVersion),
        Parameter::FirmwareBuild => GetCall::Text(ParamId::FirmwareBuild),
        Parameter::ResolutionInfo => GetCall::Resolution,
        Parameter::FrameDimension => GetCall::Dimension,
        Parameter::Exposure(unit) => GetCall::Exposure(unit.into()),
        Parameter::Gain => GetCall::Double(ParamId::Gain),
        Parameter::HFlip => GetCall::Flag(ParamId::HFlip),
        Parameter::VFlip => GetCall::Flag(ParamId::VFlip),
        Parameter::CameraSwap => GetCall::Flag(ParamId::SwapCameras),
        Parameter::LedPwm => GetCall::Double(ParamId::LedPwm),
        Parameter::CalibrationPresent => GetCall::Flag(ParamId::CalibrationPresent),
        Parameter::Fov => GetCall::Fov,
        Parameter::Undistort => GetCall::Flag(ParamId::Undistort),
        Parameter::Intrinsics => GetCall::Intrinsics,
        Parameter::Extrinsics => GetCall::Extrinsics,
        Parameter::StereoParameters => GetCall::Stereo,
        Parameter::ImuRange => GetCall::ImuRange,
        Parameter::AutoExposure
        | Parameter::RectifiedFov
        | Parameter::LedPwmSeq
        | Parameter::ImuRate => return None,
    };
    Some(call)
}

/// Encode a write. `None` when the revision has no ID for the parameter.
pub fn encode_set<'a>(setting: &'a Setting<'a>) -> Option<SetCall<'a>> {
    let call = match setting {
        Setting::ResolutionInfo(ri) => SetCall::Resolution(ri),
        Setting::Exposure(val, unit) => SetCall::Exposure(*val, (*unit).into()),
        Setting::Gain(val) => SetCall::Double(ParamId::Gain, *val),
        Setting::HFlip(val) => SetCall::Flag(ParamId::HFlip, c_int::from(*val)),
        Setting::VFlip(val) => SetCall::Flag(ParamId::VFlip, c_int::from(*val)),
        Setting::CameraSwap(val) => SetCall::Flag(ParamId::SwapCameras, c_int::from(*val)),
        Setting::LedPwm(val) => SetCall::Double(ParamId::LedPwm, *val),
        Setting::LedPwmSeq(seq) => SetCall::LedSequence(*seq),
        Setting::Undistort(val) => SetCall::Flag(ParamId::Undistort, c_int::from(*val)),
        Setting::ImuRange(accel, gyro) => SetCall::ImuRange(*accel as c_int, *gyro as c_int),
        Setting::AutoExposure(_) | Setting::ImuRate(_) => return None,
    };
    Some(call)
}

impl SetCall<'_> {
    pub fn id(&self) -> ParamId {
        match self {
            SetCall::Resolution(_) => ParamId::ResolutionInfo,
            SetCall::Exposure(..) => ParamId::Exposure,
            SetCall::Double(id, _) | SetCall::Flag(id, _) => *id,
            SetCall::LedSequence(_) => ParamId::LedPwmSeq,
            SetCall::ImuRange(..) => ParamId::ImuRange,
        }
    }
}

impl ParamIdApi {
    unsafe fn get_record<T: Default>(&self, duo: DuoInstance, id: ParamId) -> Option<T> {
        let mut val = T::default();
        if (self.get_parameter)(duo, id as c_int, &mut val as *mut T) {
            Some(val)
        } else {
            None
        }
    }

    unsafe fn invoke_get(&self, duo: DuoInstance, call: GetCall) -> Option<Value> {
        let get = self.get_parameter;
        match call {
            GetCall::Text(id) => {
                let mut buf = [0 as c_char; TEXT_BUFFER_LEN];
                get(duo, id as c_int, buf.as_mut_ptr())
                    .then(|| Value::Text(text_from_buffer(&buf)))
            }
            GetCall::Resolution => self
                .get_record::<ResolutionInfo>(duo, ParamId::ResolutionInfo)
                .map(Value::Resolution),
            GetCall::Dimension => {
                let (mut width, mut height) = (0u32, 0u32);
                let ok = get(
                    duo,
                    ParamId::FrameDimension as c_int,
                    &mut width as *mut u32,
                    &mut height as *mut u32,
                );
                ok.then_some(Value::Dimension { width, height })
            }
            GetCall::Exposure(unit) => {
                let mut val = 0.0f64;
                let ok = get(
                    duo,
                    ParamId::Exposure as c_int,
                    &mut val as *mut f64,
                    unit as c_int,
                );
                ok.then_some(Value::Scalar(val))
            }
            GetCall::Double(id) => {
                let mut val = 0.0f64;
                let ok = get(duo, id as c_int, &mut val as *mut f64);
                ok.then_some(Value::Scalar(val))
            }
            GetCall::Flag(id) => {
                let mut val = false;
                let ok = get(duo, id as c_int, &mut val as *mut bool);
                ok.then_some(Value::Flag(val))
            }
            GetCall::Fov => {
                // TODO: confirm the DUO_FOV trailing argument order against the
                // shipped DUOLib.h; (resolution*, double[4]) is unverified.
                let mut current = self.get_record::<ResolutionInfo>(duo, ParamId::ResolutionInfo)?;
                let mut fov = [0.0f64; 4];
                let ok = get(
                    duo,
                    ParamId::Fov as c_int,
                    &mut current as *mut ResolutionInfo,
                    fov.as_mut_ptr(),
                );
                ok.then_some(Value::Fov(fov))
            }
            GetCall::Intrinsics => self
                .get_record::<Intrinsics>(duo, ParamId::Intrinsics)
                .map(Value::Intrinsics),
            GetCall::Extrinsics => self
                .get_record::<Extrinsics>(duo, ParamId::Extrinsics)
                .map(Value::Extrinsics),
            GetCall::Stereo => self
                .get_record::<StereoParameters>(duo, ParamId::StereoParameters)
                .map(Value::Stereo),
            GetCall::ImuRange => {
                let (mut accel, mut gyro): (c_int, c_int) = (0, 0);
                let ok = get(
                    duo,
                    ParamId::ImuRange as c_int,
                    &mut accel as *mut c_int,
                    &mut gyro as *mut c_int,
                );
                if ok {
                    imu_range_value(accel, gyro)
                } else {
                    None
                }
            }
        }
    }

    unsafe fn invoke_set(&self, duo: DuoInstance, call: SetCall<'_>) -> bool {
        let set = self.set_parameter;
        let id = call.id() as c_int;
        match call {
            SetCall::Resolution(ri) => set(duo, id, ri as *const ResolutionInfo),
            SetCall::Exposure(val, unit) => set(duo, id, val, unit as c_int),
            SetCall::Double(_, val) => set(duo, id, val),
            SetCall::Flag(_, val) => set(duo, id, val),
            SetCall::LedSequence(seq) => set(duo, id, seq.as_ptr(), seq.len() as c_uint),
            SetCall::ImuRange(accel, gyro) => set(duo, id, accel, gyro),
        }
    }
}

impl ParameterStore for ParamIdApi {
    fn revision(&self) -> &'static str {
        ParameterId::NAME
    }

    unsafe fn get(&self, duo: DuoInstance, parameter: Parameter) -> Result<Option<Value>> {
        let call = encode_get(parameter).ok_or_else(|| self.unsupported(parameter))?;
        Ok(self.invoke_get(duo, call))
    }

    unsafe fn set(&self, duo: DuoInstance, setting: &Setting<'_>) -> Result<bool> {
        let call = encode_set(setting).ok_or_else(|| self.unsupported(setting.parameter()))?;
        Ok(self.invoke_set(duo, call))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AccelRange, ExposureUnit, GyroRange};

    #[test]
    fn test_encode_get_uses_id_table() {
        assert_eq!(
            encode_get(Parameter::SerialNumber),
            Some(GetCall::Text(ParamId::SerialNumber))
        );
        assert_eq!(
            encode_get(Parameter::Exposure(ExposureUnit::Milliseconds)),
            Some(GetCall::Exposure(ParamId::Milliseconds))
        );
        assert_eq!(
            encode_get(Parameter::CameraSwap),
            Some(GetCall::Flag(ParamId::SwapCameras))
        );
        assert_eq!(encode_get(Parameter::Fov), Some(GetCall::Fov));
        assert_eq!(encode_get(Parameter::AutoExposure), None);
        assert_eq!(encode_get(Parameter::RectifiedFov), None);
    }

    #[test]
    fn test_encode_set_promotes_flags() {
        let flip = Setting::HFlip(true);
        let call = encode_set(&flip).unwrap();
        assert_eq!(call, SetCall::Flag(ParamId::HFlip, 1));
        assert_eq!(call.id() as i32, 10);

        let exposure = Setting::Exposure(12.5, ExposureUnit::Percentage);
        let call = encode_set(&exposure).unwrap();
        assert_eq!(call, SetCall::Exposure(12.5, ParamId::Percentage));
        assert_eq!(call.id() as i32, 8);

        let range = Setting::ImuRange(AccelRange::G8, GyroRange::Dps500);
        let call = encode_set(&range).unwrap();
        assert_eq!(call, SetCall::ImuRange(2, 1));
        assert_eq!(call.id() as i32, 21);

        let ri = Setting::ResolutionInfo(ResolutionInfo::default());
        assert_eq!(encode_set(&ri).unwrap().id() as i32, 6);
    }

    #[test]
    fn test_encode_set_led_sequence_borrows_caller_slice() {
        let seq = [LedSeq { pwm: [1, 2, 3, 4] }; 3];
        let setting = Setting::LedPwmSeq(&seq);
        match encode_set(&setting) {
            Some(SetCall::LedSequence(s)) => {
                assert_eq!(s.len(), 3);
                assert_eq!(s.as_ptr(), seq.as_ptr());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_encode_set_unsupported() {
        assert_eq!(encode_set(&Setting::AutoExposure(true)), None);
        assert_eq!(encode_set(&Setting::ImuRate(100.0)), None);
    }
}
