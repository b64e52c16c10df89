//! In-process stand-in for a direct-call DUOLib build.
//!
//! Every entry point is a Rust `extern "C"` function with the vendor
//! signature. Each `OpenDUO` allocates its own device state, so tests running
//! in parallel never observe each other.

use crate::direct::{DirectApi, DirectCall};
use crate::library::DuoLibrary;
use crate::sys::{CoreApi, FrameCallback};
use crate::types::{
    CameraIntrinsics, DuoInstance, Extrinsics, FrameDirect, ImuSample, Intrinsics, LedSeq,
    ResolutionInfo, StereoParameters, MAX_IMU_SAMPLES,
};
use std::ffi::{c_char, c_int, c_void};
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

pub const LIB_VERSION: &str = "1.0.80.20";
pub const DEVICE_NAME: &str = "DUO MLX";
pub const SERIAL_NUMBER: &str = "MOCK0001";
pub const FOCAL_LENGTH: f64 = 372.5;
pub const FOV: [f64; 4] = [82.5, 63.0, 81.0, 61.5];

pub const RESOLUTIONS: [ResolutionInfo; 3] = [
    ResolutionInfo {
        width: 752,
        height: 480,
        binning: 0,
        fps: 30.0,
        min_fps: 1.0,
        max_fps: 56.0,
    },
    ResolutionInfo {
        width: 376,
        height: 240,
        binning: 5,
        fps: 30.0,
        min_fps: 1.0,
        max_fps: 98.0,
    },
    ResolutionInfo {
        width: 320,
        height: 240,
        binning: 5,
        fps: 30.0,
        min_fps: 1.0,
        max_fps: 106.0,
    },
];

struct State {
    resolution: ResolutionInfo,
    exposure: f64,
    exposure_ms: f64,
    auto_exposure: bool,
    gain: f64,
    hflip: bool,
    vflip: bool,
    camera_swap: bool,
    led_pwm: f64,
    led_seq: Vec<LedSeq>,
    undistort: bool,
    accel_range: c_int,
    gyro_range: c_int,
    imu_rate: f64,
    capturing: bool,
    callback: FrameCallback<ImuSample>,
    user_data: usize,
    fail_next_stop: bool,
}

struct MockDevice {
    state: Mutex<State>,
}

impl MockDevice {
    fn new() -> Self {
        Self {
            state: Mutex::new(State {
                resolution: RESOLUTIONS[0],
                exposure: 50.0,
                exposure_ms: 10.0,
                auto_exposure: false,
                gain: 0.0,
                hflip: false,
                vflip: false,
                camera_swap: false,
                led_pwm: 0.0,
                led_seq: Vec::new(),
                undistort: false,
                accel_range: 0,
                gyro_range: 0,
                imu_rate: 100.0,
                capturing: false,
                callback: None,
                user_data: 0,
                fail_next_stop: false,
            }),
        }
    }
}

unsafe fn state<'a>(duo: DuoInstance) -> MutexGuard<'a, State> {
    let device = &*(duo as *const MockDevice);
    device.state.lock().unwrap_or_else(PoisonError::into_inner)
}

unsafe fn write_text(buf: *mut c_char, text: &str) -> bool {
    let bytes = text.as_bytes();
    std::ptr::copy_nonoverlapping(bytes.as_ptr() as *const c_char, buf, bytes.len());
    *buf.add(bytes.len()) = 0;
    true
}

unsafe extern "C" fn get_lib_version() -> *const c_char {
    static VERSION: &[u8] = b"1.0.80.20\0";
    VERSION.as_ptr() as *const c_char
}

unsafe extern "C" fn enumerate_resolutions(
    list: *mut ResolutionInfo,
    size: i32,
    width: i32,
    height: i32,
    binning: i32,
    fps: f32,
) -> c_int {
    let matching = RESOLUTIONS.iter().filter(|ri| {
        (width < 0 || ri.width == width)
            && (height < 0 || ri.height == height)
            && (binning < 0 || ri.binning == binning)
            && (fps < 0.0 || (ri.min_fps..=ri.max_fps).contains(&fps))
    });
    let mut count = 0;
    for ri in matching.take(size.max(0) as usize) {
        *list.add(count) = ResolutionInfo { fps: fps.max(ri.fps), ..*ri };
        count += 1;
    }
    count as c_int
}

unsafe extern "C" fn open(out: *mut DuoInstance) -> bool {
    *out = Box::into_raw(Box::new(MockDevice::new())) as DuoInstance;
    true
}

unsafe extern "C" fn close(duo: DuoInstance) -> bool {
    if duo.is_null() {
        return false;
    }
    drop(Box::from_raw(duo as *mut MockDevice));
    true
}

unsafe extern "C" fn start(
    duo: DuoInstance,
    callback: FrameCallback<ImuSample>,
    user_data: *mut c_void,
    _master: bool,
) -> bool {
    let mut st = state(duo);
    if st.capturing {
        return false;
    }
    st.capturing = true;
    st.callback = callback;
    st.user_data = user_data as usize;
    true
}

unsafe extern "C" fn stop(duo: DuoInstance) -> bool {
    let mut st = state(duo);
    if st.fail_next_stop {
        st.fail_next_stop = false;
        return false;
    }
    st.capturing = false;
    st.callback = None;
    st.user_data = 0;
    true
}

macro_rules! accessors {
    ($get:ident, $set:ident, $field:ident, $ty:ty) => {
        unsafe extern "C" fn $get(duo: DuoInstance, out: *mut $ty) -> bool {
            *out = state(duo).$field;
            true
        }

        unsafe extern "C" fn $set(duo: DuoInstance, val: $ty) -> bool {
            state(duo).$field = val;
            true
        }
    };
}

accessors!(get_exposure_ms, set_exposure_ms, exposure_ms, f64);
accessors!(get_auto_exposure, set_auto_exposure, auto_exposure, bool);
accessors!(get_hflip, set_hflip, hflip, bool);
accessors!(get_vflip, set_vflip, vflip, bool);
accessors!(get_camera_swap, set_camera_swap, camera_swap, bool);
accessors!(get_led_pwm, set_led_pwm, led_pwm, f64);
accessors!(get_undistort, set_undistort, undistort, bool);

unsafe extern "C" fn get_exposure(duo: DuoInstance, out: *mut f64) -> bool {
    *out = state(duo).exposure;
    true
}

unsafe extern "C" fn set_exposure(duo: DuoInstance, val: f64) -> bool {
    if !(0.0..=100.0).contains(&val) {
        return false;
    }
    state(duo).exposure = val;
    true
}

unsafe extern "C" fn get_gain(duo: DuoInstance, out: *mut f64) -> bool {
    *out = state(duo).gain;
    true
}

unsafe extern "C" fn set_gain(duo: DuoInstance, val: f64) -> bool {
    if !(0.0..=100.0).contains(&val) {
        return false;
    }
    state(duo).gain = val;
    true
}

unsafe extern "C" fn get_device_name(_duo: DuoInstance, buf: *mut c_char) -> bool {
    write_text(buf, DEVICE_NAME)
}

unsafe extern "C" fn get_serial_number(_duo: DuoInstance, buf: *mut c_char) -> bool {
    write_text(buf, SERIAL_NUMBER)
}

unsafe extern "C" fn get_firmware_version(_duo: DuoInstance, buf: *mut c_char) -> bool {
    write_text(buf, "1.2.0")
}

unsafe extern "C" fn get_firmware_build(_duo: DuoInstance, buf: *mut c_char) -> bool {
    write_text(buf, "2016-05-04")
}

unsafe extern "C" fn get_resolution_info(duo: DuoInstance, out: *mut ResolutionInfo) -> bool {
    *out = state(duo).resolution;
    true
}

unsafe extern "C" fn set_resolution_info(duo: DuoInstance, ri: ResolutionInfo) -> bool {
    let known = RESOLUTIONS.iter().any(|r| {
        r.width == ri.width && r.height == ri.height && r.binning == ri.binning
    });
    if !known {
        return false;
    }
    state(duo).resolution = ri;
    true
}

unsafe extern "C" fn get_frame_dimension(duo: DuoInstance, w: *mut u32, h: *mut u32) -> bool {
    let ri = state(duo).resolution;
    *w = ri.width as u32;
    *h = ri.height as u32;
    true
}

unsafe extern "C" fn get_calibration_present(_duo: DuoInstance, out: *mut bool) -> bool {
    *out = true;
    true
}

unsafe extern "C" fn get_fov(_duo: DuoInstance, out: *mut f64) -> bool {
    std::ptr::copy_nonoverlapping(FOV.as_ptr(), out, FOV.len());
    true
}

unsafe extern "C" fn get_rectified_fov(_duo: DuoInstance, out: *mut f64) -> bool {
    for (i, v) in FOV.iter().enumerate() {
        *out.add(i) = v - 2.0;
    }
    true
}

unsafe extern "C" fn get_intrinsics(_duo: DuoInstance, out: *mut Intrinsics) -> bool {
    let cam = CameraIntrinsics {
        fx: FOCAL_LENGTH,
        fy: FOCAL_LENGTH,
        cx: 376.0,
        cy: 240.0,
        ..Default::default()
    };
    *out = Intrinsics {
        width: 752,
        height: 480,
        left: cam,
        right: cam,
    };
    true
}

unsafe extern "C" fn get_extrinsics(_duo: DuoInstance, out: *mut Extrinsics) -> bool {
    *out = Extrinsics {
        rotation: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
        translation: [-30.0, 0.0, 0.0],
    };
    true
}

unsafe extern "C" fn get_stereo_parameters(_duo: DuoInstance, out: *mut StereoParameters) -> bool {
    let mut stereo = StereoParameters::default();
    stereo.q[0] = 1.0;
    stereo.q[15] = 1.0;
    *out = stereo;
    true
}

unsafe extern "C" fn get_imu_range(duo: DuoInstance, accel: *mut c_int, gyro: *mut c_int) -> bool {
    let st = state(duo);
    *accel = st.accel_range;
    *gyro = st.gyro_range;
    true
}

unsafe extern "C" fn set_imu_range(duo: DuoInstance, accel: c_int, gyro: c_int) -> bool {
    if !(0..=3).contains(&accel) || !(0..=3).contains(&gyro) {
        return false;
    }
    let mut st = state(duo);
    st.accel_range = accel;
    st.gyro_range = gyro;
    true
}

unsafe extern "C" fn set_imu_rate(duo: DuoInstance, rate: f64) -> bool {
    if !(50.0..=500.0).contains(&rate) {
        return false;
    }
    state(duo).imu_rate = rate;
    true
}

unsafe extern "C" fn set_led_pwm_seq(duo: DuoInstance, seq: *const LedSeq, count: u32) -> bool {
    if seq.is_null() && count > 0 {
        return false;
    }
    let steps = if count == 0 {
        Vec::new()
    } else {
        std::slice::from_raw_parts(seq, count as usize).to_vec()
    };
    state(duo).led_seq = steps;
    true
}

pub fn core_api() -> CoreApi<ImuSample> {
    CoreApi {
        get_lib_version,
        enumerate_resolutions,
        open,
        close,
        start,
        stop,
    }
}

pub fn direct_api() -> DirectApi {
    DirectApi {
        get_device_name,
        get_serial_number,
        get_firmware_version,
        get_firmware_build,
        get_resolution_info,
        get_frame_dimension,
        get_exposure,
        get_exposure_ms,
        get_auto_exposure: Some(get_auto_exposure),
        get_gain,
        get_hflip,
        get_vflip,
        get_camera_swap,
        get_led_pwm,
        get_calibration_present,
        get_fov,
        get_rectified_fov: Some(get_rectified_fov),
        get_undistort,
        get_intrinsics,
        get_extrinsics,
        get_stereo_parameters,
        get_imu_range,
        set_resolution_info,
        set_exposure,
        set_exposure_ms,
        set_auto_exposure: Some(set_auto_exposure),
        set_gain,
        set_hflip,
        set_vflip,
        set_camera_swap,
        set_led_pwm,
        set_led_pwm_seq,
        set_undistort,
        set_imu_range,
        set_imu_rate: Some(set_imu_rate),
    }
}

/// Shared fake library with every optional export present.
pub fn library() -> &'static DuoLibrary<DirectCall> {
    static LIBRARY: OnceLock<DuoLibrary<DirectCall>> = OnceLock::new();
    LIBRARY.get_or_init(|| DuoLibrary::from_parts(core_api(), direct_api()))
}

pub fn open_handle() -> DuoInstance {
    let mut duo: DuoInstance = std::ptr::null_mut();
    assert!(unsafe { open(&mut duo) });
    duo
}

/// # Safety
/// `duo` must come from [`open_handle`] and not be used afterwards.
pub unsafe fn close_handle(duo: DuoInstance) {
    assert!(close(duo));
}

pub fn led_sequence(duo: DuoInstance) -> Vec<LedSeq> {
    unsafe { state(duo) }.led_seq.clone()
}

pub fn is_capturing(duo: DuoInstance) -> bool {
    unsafe { state(duo) }.capturing
}

pub fn imu_rate(duo: DuoInstance) -> f64 {
    unsafe { state(duo) }.imu_rate
}

/// Make the next `StopDUO` on `duo` report failure.
pub fn fail_next_stop(duo: DuoInstance) {
    unsafe { state(duo) }.fail_next_stop = true;
}

/// Deliver `count` frames to the registered callback from a separate thread,
/// the way DUOLib's capture thread does. Returns the number of invocations.
pub fn emit_frames(duo: DuoInstance, count: u32) -> u32 {
    let (callback, user_data, capturing, ri, steps) = {
        let st = unsafe { state(duo) };
        (st.callback, st.user_data, st.capturing, st.resolution, st.led_seq.len())
    };
    let callback = match callback {
        Some(cb) if capturing => cb,
        _ => return 0,
    };

    let handle = std::thread::spawn(move || {
        let (width, height) = (ri.width as u32, ri.height as u32);
        for i in 0..count {
            let mut left = vec![(i % 256) as u8; (width * height) as usize];
            let mut right = vec![255 - (i % 256) as u8; (width * height) as usize];
            let mut frame = FrameDirect {
                width,
                height,
                led_seq_tag: if steps == 0 { 0 } else { (i as usize % steps) as u8 },
                timestamp: i * 333,
                left_data: left.as_mut_ptr(),
                right_data: right.as_mut_ptr(),
                imu_present: 1,
                imu_samples: 2,
                imu_data: [ImuSample::default(); MAX_IMU_SAMPLES],
            };
            for (n, sample) in frame.imu_data.iter_mut().take(2).enumerate() {
                sample.timestamp = i * 333 + n as u32 * 10;
                sample.temperature = 31.5;
                sample.accel = [0.0, 0.0, 1.0];
            }
            unsafe { callback(&frame, user_data as *mut c_void) };
        }
        count
    });
    handle.join().unwrap_or(0)
}
