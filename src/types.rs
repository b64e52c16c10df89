//! Record layouts exchanged with DUOLib, plus the owned host-side copies built from them.
//!
//! Every `#[repr(C)]` type here mirrors a structure in the vendor's `DUOLib.h`
//! field for field. Session/runtime records use natural alignment; calibration
//! records are declared `#pragma pack(1)` by the vendor and are `packed` here.
//! Changing a field type or order corrupts memory at the native boundary.

use std::ffi::c_void;
use std::time::Duration;

/// Opaque DUO session token (`DUOInstance`). Never dereferenced on the Rust side.
pub type DuoInstance = *mut c_void;

/// Capacity of the inline IMU sample array in a frame record.
pub const MAX_IMU_SAMPLES: usize = 100;

/// Size of the text buffers handed to DUOLib for string out-parameters.
/// The vendor documents 252 bytes as the minimum.
pub const TEXT_BUFFER_LEN: usize = 260;

bitflags::bitflags! {
    /// Sensor binning mode (`DUO_BIN_*`). Flags combine with bitwise OR.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[repr(transparent)]
    pub struct Binning: i32 {
        const HORIZONTAL2 = 1;
        const HORIZONTAL4 = 2;
        const VERTICAL2   = 4;
        const VERTICAL4   = 8;
    }
}

impl Binning {
    /// `DUO_BIN_NONE`.
    pub const NONE: Binning = Binning::empty();
    /// `DUO_BIN_ANY`, the enumeration wildcard. Not a valid mode on its own.
    pub const ANY_RAW: i32 = -1;
}

/// Resolution descriptor (`DUOResolutionInfo`).
///
/// Only pass a descriptor to `SetDUOResolutionInfo` that was returned by
/// `EnumerateDUOResolutions` for the same device generation; DUOLib does not
/// validate arbitrary combinations.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ResolutionInfo {
    pub width: i32,
    pub height: i32,
    /// Raw `DUO_BIN_*` bits; see [`ResolutionInfo::binning_flags`].
    pub binning: i32,
    pub fps: f32,
    pub min_fps: f32,
    pub max_fps: f32,
}

impl ResolutionInfo {
    pub fn binning_flags(&self) -> Binning {
        Binning::from_bits_retain(self.binning)
    }
}

/// IMU sample as laid out by SDK revisions that stamp every sample (`DUOIMUSample`).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ImuSample {
    /// Sample time in 100 µs ticks.
    pub timestamp: u32,
    /// Temperature in °C.
    pub temperature: f32,
    /// Acceleration (x, y, z) in g.
    pub accel: [f32; 3],
    /// Angular rate (x, y, z) in deg/s.
    pub gyro: [f32; 3],
}

/// IMU sample as laid out by SDK revisions that only stamp the frame.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ImuSampleUntimed {
    /// Temperature in °C.
    pub temperature: f32,
    /// Acceleration (x, y, z) in g.
    pub accel: [f32; 3],
    /// Angular rate (x, y, z) in deg/s.
    pub gyro: [f32; 3],
}

/// Native IMU sample layouts that can be embedded in a [`RawFrame`].
pub trait ImuLayout: Copy + Send + 'static {
    /// Whether the layout carries its own tick timestamp.
    const TIMESTAMPED: bool;

    fn reading(&self) -> ImuReading;
}

impl ImuLayout for ImuSample {
    const TIMESTAMPED: bool = true;

    fn reading(&self) -> ImuReading {
        ImuReading {
            timestamp: Some(self.timestamp),
            temperature: self.temperature,
            accel: self.accel,
            gyro: self.gyro,
        }
    }
}

impl ImuLayout for ImuSampleUntimed {
    const TIMESTAMPED: bool = false;

    fn reading(&self) -> ImuReading {
        ImuReading {
            timestamp: None,
            temperature: self.temperature,
            accel: self.accel,
            gyro: self.gyro,
        }
    }
}

/// Frame record (`DUOFrame`) handed to the frame callback on the capture thread.
///
/// The record and both pixel buffers belong to DUOLib and are only valid while
/// the callback that received them is running.
#[repr(C)]
pub struct RawFrame<S> {
    pub width: u32,
    pub height: u32,
    /// LED sequence step this frame was captured under.
    pub led_seq_tag: u8,
    /// Frame time in 100 µs ticks.
    pub timestamp: u32,
    pub left_data: *mut u8,
    pub right_data: *mut u8,
    /// Non-zero when the device has an IMU (DUO MLX).
    pub imu_present: u8,
    /// Number of valid entries in `imu_data`.
    pub imu_samples: u32,
    pub imu_data: [S; MAX_IMU_SAMPLES],
}

/// Frame record of the direct-call SDK revision.
pub type FrameDirect = RawFrame<ImuSample>;
/// Frame record of the parameter-ID SDK revision.
pub type FrameParameterId = RawFrame<ImuSampleUntimed>;

impl<S: ImuLayout> RawFrame<S> {
    /// Valid IMU samples, clamped to the inline capacity.
    pub fn imu(&self) -> &[S] {
        let count = (self.imu_samples as usize).min(MAX_IMU_SAMPLES);
        &self.imu_data[..count]
    }

    /// Bytes in one 8-bit monochrome image of this frame.
    pub fn image_len(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Left image bytes.
    ///
    /// # Safety
    /// Only valid inside the frame callback that received `self`; the slice
    /// must not outlive that invocation.
    pub unsafe fn left(&self) -> Option<&[u8]> {
        image_slice(self.left_data, self.image_len())
    }

    /// Right image bytes.
    ///
    /// # Safety
    /// Same contract as [`RawFrame::left`].
    pub unsafe fn right(&self) -> Option<&[u8]> {
        image_slice(self.right_data, self.image_len())
    }

    /// Copy everything the host needs out of the native record.
    ///
    /// # Safety
    /// Must run inside the frame callback that received `self`.
    pub unsafe fn to_frame(&self, copy_pixels: bool) -> Frame {
        let (left, right) = if copy_pixels {
            (
                self.left().map(<[u8]>::to_vec).unwrap_or_default(),
                self.right().map(<[u8]>::to_vec).unwrap_or_default(),
            )
        } else {
            (Vec::new(), Vec::new())
        };
        let imu_present = self.imu_present != 0;
        let imu = if imu_present {
            self.imu().iter().map(ImuLayout::reading).collect()
        } else {
            Vec::new()
        };

        Frame {
            width: self.width,
            height: self.height,
            led_seq_tag: self.led_seq_tag,
            timestamp_ticks: self.timestamp,
            left,
            right,
            imu_present,
            imu,
        }
    }
}

unsafe fn image_slice<'a>(data: *const u8, len: usize) -> Option<&'a [u8]> {
    if data.is_null() || len == 0 {
        None
    } else {
        Some(std::slice::from_raw_parts(data, len))
    }
}

/// LED PWM sequence step (`DUOLEDSeq`). Values are percentages in [0, 100].
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedSeq {
    pub pwm: [u8; 4],
}

/// Per-camera intrinsics (`INTR`), byte packed.
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CameraIntrinsics {
    /// Radial distortion.
    pub k1: f64,
    pub k2: f64,
    pub k3: f64,
    pub k4: f64,
    pub k5: f64,
    pub k6: f64,
    /// Tangential distortion.
    pub p1: f64,
    pub p2: f64,
    /// Focal lengths in pixels.
    pub fx: f64,
    pub fy: f64,
    /// Principal point.
    pub cx: f64,
    pub cy: f64,
}

/// Stereo head intrinsics (`DUO_INTR`), byte packed.
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Intrinsics {
    pub width: u16,
    pub height: u16,
    pub left: CameraIntrinsics,
    pub right: CameraIntrinsics,
}

/// Left-to-right camera extrinsics (`DUO_EXTR`), byte packed.
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Extrinsics {
    /// 3x3 row-major rotation.
    pub rotation: [f64; 9],
    pub translation: [f64; 3],
}

/// Rectification parameters (`DUO_STEREO`), byte packed.
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StereoParameters {
    /// 3x3 camera matrices.
    pub m1: [f64; 9],
    pub m2: [f64; 9],
    /// 1x8 distortion parameters.
    pub d1: [f64; 8],
    pub d2: [f64; 8],
    /// 3x3 rotation between left and right camera.
    pub r: [f64; 9],
    /// 3x1 translation between left and right camera.
    pub t: [f64; 3],
    /// 3x3 rectified rotations.
    pub r1: [f64; 9],
    pub r2: [f64; 9],
    /// 3x4 rectified projections.
    pub p1: [f64; 12],
    pub p2: [f64; 12],
    /// 4x4 disparity-to-depth mapping.
    pub q: [f64; 16],
}

/// Accelerometer full-scale range (`DUO_ACCEL_*`).
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccelRange {
    G2 = 0,
    G4 = 1,
    G8 = 2,
    G16 = 3,
}

impl AccelRange {
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(Self::G2),
            1 => Some(Self::G4),
            2 => Some(Self::G8),
            3 => Some(Self::G16),
            _ => None,
        }
    }
}

/// Gyroscope full-scale range in deg/s (`DUO_GYRO_*`).
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GyroRange {
    Dps250 = 0,
    Dps500 = 1,
    Dps1000 = 2,
    Dps2000 = 3,
}

impl GyroRange {
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(Self::Dps250),
            1 => Some(Self::Dps500),
            2 => Some(Self::Dps1000),
            3 => Some(Self::Dps2000),
            _ => None,
        }
    }
}

/// Unit selector for exposure values.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExposureUnit {
    /// Percentage of the frame period, [0, 100].
    Percentage = 0,
    Milliseconds = 1,
}

/// IMU reading copied out of a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImuReading {
    /// Sample time in 100 µs ticks, when the SDK revision provides one.
    pub timestamp: Option<u32>,
    pub temperature: f32,
    pub accel: [f32; 3],
    pub gyro: [f32; 3],
}

/// Owned copy of one captured stereo frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub led_seq_tag: u8,
    /// Frame time in 100 µs ticks.
    pub timestamp_ticks: u32,
    /// Left image, empty when pixel copying is disabled.
    pub left: Vec<u8>,
    /// Right image, empty when pixel copying is disabled.
    pub right: Vec<u8>,
    pub imu_present: bool,
    pub imu: Vec<ImuReading>,
}

impl Frame {
    pub fn timestamp(&self) -> Duration {
        Duration::from_micros(u64::from(self.timestamp_ticks) * 100)
    }

    pub fn timestamp_ms(&self) -> f64 {
        f64::from(self.timestamp_ticks) / 10.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{align_of, offset_of, size_of};

    #[test]
    fn test_resolution_info_layout() {
        assert_eq!(size_of::<ResolutionInfo>(), 24);
        assert_eq!(offset_of!(ResolutionInfo, binning), 8);
        assert_eq!(offset_of!(ResolutionInfo, fps), 12);
        assert_eq!(offset_of!(ResolutionInfo, max_fps), 20);
    }

    #[test]
    fn test_imu_sample_layouts() {
        assert_eq!(size_of::<ImuSample>(), 32);
        assert_eq!(offset_of!(ImuSample, temperature), 4);
        assert_eq!(offset_of!(ImuSample, accel), 8);
        assert_eq!(offset_of!(ImuSample, gyro), 20);

        assert_eq!(size_of::<ImuSampleUntimed>(), 28);
        assert_eq!(offset_of!(ImuSampleUntimed, accel), 4);
        assert_eq!(offset_of!(ImuSampleUntimed, gyro), 16);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_frame_layout_64bit() {
        assert_eq!(offset_of!(FrameDirect, height), 4);
        assert_eq!(offset_of!(FrameDirect, led_seq_tag), 8);
        assert_eq!(offset_of!(FrameDirect, timestamp), 12);
        assert_eq!(offset_of!(FrameDirect, left_data), 16);
        assert_eq!(offset_of!(FrameDirect, right_data), 24);
        assert_eq!(offset_of!(FrameDirect, imu_present), 32);
        assert_eq!(offset_of!(FrameDirect, imu_samples), 36);
        assert_eq!(offset_of!(FrameDirect, imu_data), 40);
        assert_eq!(size_of::<FrameDirect>(), 40 + 32 * MAX_IMU_SAMPLES);
        assert_eq!(align_of::<FrameDirect>(), 8);

        assert_eq!(offset_of!(FrameParameterId, imu_data), 40);
        assert_eq!(size_of::<FrameParameterId>(), 40 + 28 * MAX_IMU_SAMPLES);
    }

    #[test]
    fn test_led_seq_layout() {
        assert_eq!(size_of::<LedSeq>(), 4);
        assert_eq!(align_of::<LedSeq>(), 1);
    }

    #[test]
    fn test_calibration_records_are_packed() {
        assert_eq!(size_of::<CameraIntrinsics>(), 12 * 8);
        assert_eq!(align_of::<CameraIntrinsics>(), 1);
        assert_eq!(offset_of!(CameraIntrinsics, fx), 64);

        assert_eq!(size_of::<Intrinsics>(), 4 + 2 * 96);
        assert_eq!(offset_of!(Intrinsics, height), 2);
        assert_eq!(offset_of!(Intrinsics, left), 4);
        assert_eq!(offset_of!(Intrinsics, right), 100);

        assert_eq!(size_of::<Extrinsics>(), 96);
        assert_eq!(offset_of!(Extrinsics, translation), 72);

        assert_eq!(size_of::<StereoParameters>(), 104 * 8);
        assert_eq!(offset_of!(StereoParameters, d1), 144);
        assert_eq!(offset_of!(StereoParameters, r), 272);
        assert_eq!(offset_of!(StereoParameters, t), 344);
        assert_eq!(offset_of!(StereoParameters, p1), 512);
        assert_eq!(offset_of!(StereoParameters, q), 704);
        assert_eq!(align_of::<StereoParameters>(), 1);
    }

    #[test]
    fn test_frame_copy_clamps_imu_count() {
        let mut left = vec![7u8; 6];
        let mut right = vec![9u8; 6];
        let mut raw = FrameDirect {
            width: 3,
            height: 2,
            led_seq_tag: 1,
            timestamp: 1234,
            left_data: left.as_mut_ptr(),
            right_data: right.as_mut_ptr(),
            imu_present: 1,
            imu_samples: 500,
            imu_data: [ImuSample::default(); MAX_IMU_SAMPLES],
        };
        raw.imu_data[0].timestamp = 42;

        let frame = unsafe { raw.to_frame(true) };
        assert_eq!(frame.imu.len(), MAX_IMU_SAMPLES);
        assert_eq!(frame.imu[0].timestamp, Some(42));
        assert_eq!(frame.left, left);
        assert_eq!(frame.right, right);
        assert!((frame.timestamp_ms() - 123.4).abs() < 1e-9);
        assert_eq!(frame.timestamp(), Duration::from_micros(123_400));

        raw.imu_present = 0;
        raw.left_data = std::ptr::null_mut();
        let frame = unsafe { raw.to_frame(true) };
        assert!(frame.imu.is_empty());
        assert!(frame.left.is_empty());
    }
}
