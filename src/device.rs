use crate::capture::{self, CaptureContext, CaptureStats, CaptureStream};
use crate::config::CaptureConfig;
use crate::library::{DuoLibrary, Sdk};
use crate::params::{Parameter, ParameterStore, Setting, Value};
use crate::sys::Revision;
use crate::types::{
    AccelRange, DuoInstance, ExposureUnit, Extrinsics, Frame, GyroRange, Intrinsics, LedSeq,
    ResolutionInfo, StereoParameters,
};
use crate::{DuoError, Result};
use std::ffi::c_void;
use std::fmt;
use std::ptr::NonNull;
use std::thread::JoinHandle;

/// Where a [`Device`] is in the DUOLib session lifecycle.
///
/// `Closed → Opened → (Configured) → Capturing → Opened → Closed`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Closed,
    Opened,
    /// Opened, with a resolution applied.
    Configured,
    Capturing,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionState::Closed => "closed",
            SessionState::Opened => "opened",
            SessionState::Configured => "configured",
            SessionState::Capturing => "capturing",
        })
    }
}

/// Resources owned while DUOLib may call back into us.
struct ActiveCapture {
    /// `None` when capture was started with the empty callback.
    context: Option<Box<CaptureContext>>,
    worker: Option<JoinHandle<()>>,
}

/// A DUO camera session.
///
/// Wraps the native `DUOInstance` with a host-side state tag. Calls through a
/// closed session fail with [`DuoError::DeviceClosed`] instead of reaching
/// DUOLib. Dropping an open session stops capture and closes it.
pub struct Device<R: Revision = Sdk> {
    lib: &'static DuoLibrary<R>,
    handle: Option<NonNull<c_void>>,
    state: SessionState,
    capture: Option<ActiveCapture>,
}

// SAFETY: a DUOInstance is not tied to the thread that opened it; DUOLib
// documents its calls as usable from any host thread.
unsafe impl<R: Revision> Send for Device<R> {}

impl Device<Sdk> {
    /// A closed session on the process-wide library.
    pub fn global() -> Result<Self> {
        Ok(Self::new(DuoLibrary::global()?))
    }
}

impl<R: Revision> Device<R> {
    /// A closed session on `lib`. Call [`Device::open`] before anything else.
    pub fn new(lib: &'static DuoLibrary<R>) -> Self {
        Self {
            lib,
            handle: None,
            state: SessionState::Closed,
            capture: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn library(&self) -> &'static DuoLibrary<R> {
        self.lib
    }

    /// The native handle while open.
    pub fn as_raw(&self) -> Option<DuoInstance> {
        self.handle.map(NonNull::as_ptr)
    }

    fn raw(&self) -> Result<DuoInstance> {
        self.as_raw().ok_or(DuoError::DeviceClosed)
    }

    /// `OpenDUO`. Returns `Ok(false)` if no device could be opened.
    pub fn open(&mut self) -> Result<bool> {
        if self.state != SessionState::Closed {
            return Err(DuoError::InvalidState {
                operation: "open",
                state: self.state,
            });
        }

        let mut duo: DuoInstance = std::ptr::null_mut();
        let ok = unsafe { (self.lib.core().open)(&mut duo) };
        match (ok, NonNull::new(duo)) {
            (true, Some(handle)) => {
                self.handle = Some(handle);
                self.state = SessionState::Opened;
                log::info!("Opened DUO device ({} revision)", R::NAME);
                Ok(true)
            }
            (true, None) => {
                log::warn!("OpenDUO reported success without a handle");
                Ok(false)
            }
            (false, _) => {
                log::warn!("OpenDUO failed");
                Ok(false)
            }
        }
    }

    /// `CloseDUO`. Capture must be stopped first.
    pub fn close(&mut self) -> Result<bool> {
        let duo = self.raw()?;
        if self.state == SessionState::Capturing {
            return Err(DuoError::InvalidState {
                operation: "close",
                state: self.state,
            });
        }

        if unsafe { (self.lib.core().close)(duo) } {
            self.handle = None;
            self.state = SessionState::Closed;
            log::info!("Closed DUO device");
            Ok(true)
        } else {
            log::warn!("CloseDUO failed");
            Ok(false)
        }
    }

    fn check_can_start(&self) -> Result<DuoInstance> {
        let duo = self.raw()?;
        if self.state == SessionState::Capturing {
            return Err(DuoError::InvalidState {
                operation: "start capture",
                state: self.state,
            });
        }
        Ok(duo)
    }

    fn start_with_context(
        &mut self,
        duo: DuoInstance,
        context: Box<CaptureContext>,
        master_mode: bool,
    ) -> bool {
        let ok = unsafe {
            (self.lib.core().start)(
                duo,
                Some(capture::trampoline::<R::Sample>),
                context.as_user_data(),
                master_mode,
            )
        };
        if ok {
            self.capture = Some(ActiveCapture {
                context: Some(context),
                worker: None,
            });
            self.state = SessionState::Capturing;
            log::info!("DUO capture started (master={})", master_mode);
        } else {
            log::warn!("StartDUO failed");
        }
        ok
    }

    /// `StartDUO` with frames delivered through the returned stream.
    ///
    /// `Ok(None)` if DUOLib refused to start.
    pub fn start_capture(&mut self, config: &CaptureConfig) -> Result<Option<CaptureStream>> {
        let duo = self.check_can_start()?;
        let (context, stream) = capture::channel(config);
        Ok(self
            .start_with_context(duo, context, config.master_mode)
            .then_some(stream))
    }

    /// `StartDUO` with `handler` run for every frame on a worker thread.
    pub fn start_capture_with<F>(&mut self, config: &CaptureConfig, handler: F) -> Result<bool>
    where
        F: FnMut(Frame) + Send + 'static,
    {
        let duo = self.check_can_start()?;
        let (context, stream) = capture::channel(config);
        let worker = capture::spawn_handler(stream, handler)?;

        if self.start_with_context(duo, context, config.master_mode) {
            if let Some(active) = self.capture.as_mut() {
                active.worker = Some(worker);
            }
            Ok(true)
        } else {
            // The refused context was dropped above, which ends the worker.
            let _ = worker.join();
            Ok(false)
        }
    }

    /// `StartDUO` with the empty callback, for parameter-only sessions.
    pub fn start_without_callback(&mut self, master_mode: bool) -> Result<bool> {
        let duo = self.check_can_start()?;
        let ok = unsafe { (self.lib.core().start)(duo, None, std::ptr::null_mut(), master_mode) };
        if ok {
            self.capture = Some(ActiveCapture {
                context: None,
                worker: None,
            });
            self.state = SessionState::Capturing;
            log::info!("DUO capture started without callback (master={})", master_mode);
        } else {
            log::warn!("StartDUO failed");
        }
        Ok(ok)
    }

    /// `StopDUO`. Blocks until DUOLib no longer calls back.
    ///
    /// The frame callback state is only released once DUOLib confirms the
    /// stop; on `Ok(false)` the session stays capturing.
    pub fn stop_capture(&mut self) -> Result<bool> {
        let duo = self.raw()?;
        if self.state != SessionState::Capturing {
            return Err(DuoError::InvalidState {
                operation: "stop capture",
                state: self.state,
            });
        }

        if !unsafe { (self.lib.core().stop)(duo) } {
            log::warn!("StopDUO failed, capture still active");
            return Ok(false);
        }

        if let Some(active) = self.capture.take() {
            if let Some(stats) = active.context.as_ref().map(|ctx| ctx.stats()) {
                log::info!(
                    "DUO capture stopped: {} frames delivered, {} dropped",
                    stats.delivered,
                    stats.dropped
                );
            }
            drop(active.context);
            if let Some(worker) = active.worker {
                let _ = worker.join();
            }
        }
        self.state = SessionState::Opened;
        Ok(true)
    }

    /// Frame counts of the running capture, if it has a callback.
    pub fn capture_stats(&self) -> Option<CaptureStats> {
        self.capture
            .as_ref()
            .and_then(|active| active.context.as_ref())
            .map(|ctx| ctx.stats())
    }

    // --- Parameters ---

    /// Read any parameter through the revision's backend.
    pub fn get(&self, parameter: Parameter) -> Result<Option<Value>> {
        let duo = self.raw()?;
        unsafe { self.lib.params().get(duo, parameter) }
    }

    /// Write any parameter through the revision's backend.
    pub fn set(&mut self, setting: &Setting<'_>) -> Result<bool> {
        let duo = self.raw()?;
        let ok = unsafe { self.lib.params().set(duo, setting) }?;
        if ok {
            if let (Setting::ResolutionInfo(_), SessionState::Opened) = (setting, self.state) {
                self.state = SessionState::Configured;
            }
        } else {
            log::debug!("DUOLib rejected {:?}", setting.parameter());
        }
        Ok(ok)
    }

    fn get_with<T>(
        &self,
        parameter: Parameter,
        f: impl FnOnce(Value) -> Option<T>,
    ) -> Result<Option<T>> {
        Ok(self.get(parameter)?.and_then(f))
    }

    pub fn device_name(&self) -> Result<Option<String>> {
        self.get_with(Parameter::DeviceName, Value::into_text)
    }

    pub fn serial_number(&self) -> Result<Option<String>> {
        self.get_with(Parameter::SerialNumber, Value::into_text)
    }

    pub fn firmware_version(&self) -> Result<Option<String>> {
        self.get_with(Parameter::FirmwareVersion, Value::into_text)
    }

    pub fn firmware_build(&self) -> Result<Option<String>> {
        self.get_with(Parameter::FirmwareBuild, Value::into_text)
    }

    pub fn resolution_info(&self) -> Result<Option<ResolutionInfo>> {
        self.get_with(Parameter::ResolutionInfo, |v| match v {
            Value::Resolution(ri) => Some(ri),
            _ => None,
        })
    }

    /// Apply a descriptor obtained from
    /// [`DuoLibrary::enumerate_resolutions`]. Moves an opened session to
    /// [`SessionState::Configured`].
    pub fn set_resolution_info(&mut self, info: ResolutionInfo) -> Result<bool> {
        self.set(&Setting::ResolutionInfo(info))
    }

    /// Current frame `(width, height)`.
    pub fn frame_dimension(&self) -> Result<Option<(u32, u32)>> {
        self.get_with(Parameter::FrameDimension, |v| match v {
            Value::Dimension { width, height } => Some((width, height)),
            _ => None,
        })
    }

    /// Exposure in percent of the frame period.
    pub fn exposure(&self) -> Result<Option<f64>> {
        self.get_with(Parameter::Exposure(ExposureUnit::Percentage), Value::into_scalar)
    }

    pub fn set_exposure(&mut self, percent: f64) -> Result<bool> {
        self.set(&Setting::Exposure(percent, ExposureUnit::Percentage))
    }

    pub fn exposure_ms(&self) -> Result<Option<f64>> {
        self.get_with(Parameter::Exposure(ExposureUnit::Milliseconds), Value::into_scalar)
    }

    pub fn set_exposure_ms(&mut self, ms: f64) -> Result<bool> {
        self.set(&Setting::Exposure(ms, ExposureUnit::Milliseconds))
    }

    pub fn auto_exposure(&self) -> Result<Option<bool>> {
        self.get_with(Parameter::AutoExposure, Value::into_flag)
    }

    pub fn set_auto_exposure(&mut self, enable: bool) -> Result<bool> {
        self.set(&Setting::AutoExposure(enable))
    }

    /// Gain in percent.
    pub fn gain(&self) -> Result<Option<f64>> {
        self.get_with(Parameter::Gain, Value::into_scalar)
    }

    pub fn set_gain(&mut self, percent: f64) -> Result<bool> {
        self.set(&Setting::Gain(percent))
    }

    pub fn hflip(&self) -> Result<Option<bool>> {
        self.get_with(Parameter::HFlip, Value::into_flag)
    }

    pub fn set_hflip(&mut self, flip: bool) -> Result<bool> {
        self.set(&Setting::HFlip(flip))
    }

    pub fn vflip(&self) -> Result<Option<bool>> {
        self.get_with(Parameter::VFlip, Value::into_flag)
    }

    pub fn set_vflip(&mut self, flip: bool) -> Result<bool> {
        self.set(&Setting::VFlip(flip))
    }

    pub fn camera_swap(&self) -> Result<Option<bool>> {
        self.get_with(Parameter::CameraSwap, Value::into_flag)
    }

    pub fn set_camera_swap(&mut self, swap: bool) -> Result<bool> {
        self.set(&Setting::CameraSwap(swap))
    }

    /// LED brightness in percent.
    pub fn led_pwm(&self) -> Result<Option<f64>> {
        self.get_with(Parameter::LedPwm, Value::into_scalar)
    }

    pub fn set_led_pwm(&mut self, percent: f64) -> Result<bool> {
        self.set(&Setting::LedPwm(percent))
    }

    /// Program an LED sequence; frames carry the index of the step they were
    /// captured under in [`Frame::led_seq_tag`].
    pub fn set_led_pwm_seq(&mut self, steps: &[LedSeq]) -> Result<bool> {
        self.set(&Setting::LedPwmSeq(steps))
    }

    pub fn calibration_present(&self) -> Result<Option<bool>> {
        self.get_with(Parameter::CalibrationPresent, Value::into_flag)
    }

    pub fn fov(&self) -> Result<Option<[f64; 4]>> {
        self.get_with(Parameter::Fov, |v| match v {
            Value::Fov(fov) => Some(fov),
            _ => None,
        })
    }

    pub fn rectified_fov(&self) -> Result<Option<[f64; 4]>> {
        self.get_with(Parameter::RectifiedFov, |v| match v {
            Value::Fov(fov) => Some(fov),
            _ => None,
        })
    }

    pub fn undistort(&self) -> Result<Option<bool>> {
        self.get_with(Parameter::Undistort, Value::into_flag)
    }

    pub fn set_undistort(&mut self, enable: bool) -> Result<bool> {
        self.set(&Setting::Undistort(enable))
    }

    pub fn intrinsics(&self) -> Result<Option<Intrinsics>> {
        self.get_with(Parameter::Intrinsics, |v| match v {
            Value::Intrinsics(intr) => Some(intr),
            _ => None,
        })
    }

    pub fn extrinsics(&self) -> Result<Option<Extrinsics>> {
        self.get_with(Parameter::Extrinsics, |v| match v {
            Value::Extrinsics(extr) => Some(extr),
            _ => None,
        })
    }

    pub fn stereo_parameters(&self) -> Result<Option<StereoParameters>> {
        self.get_with(Parameter::StereoParameters, |v| match v {
            Value::Stereo(stereo) => Some(stereo),
            _ => None,
        })
    }

    pub fn imu_range(&self) -> Result<Option<(AccelRange, GyroRange)>> {
        self.get_with(Parameter::ImuRange, |v| match v {
            Value::ImuRange { accel, gyro } => Some((accel, gyro)),
            _ => None,
        })
    }

    pub fn set_imu_range(&mut self, accel: AccelRange, gyro: GyroRange) -> Result<bool> {
        self.set(&Setting::ImuRange(accel, gyro))
    }

    /// IMU sampling rate in Hz, [50, 500].
    pub fn set_imu_rate(&mut self, hz: f64) -> Result<bool> {
        self.set(&Setting::ImuRate(hz))
    }
}

impl<R: Revision> Drop for Device<R> {
    fn drop(&mut self) {
        if self.state == SessionState::Capturing && !matches!(self.stop_capture(), Ok(true)) {
            // DUOLib may still call into the context; it must outlive us.
            if let Some(active) = self.capture.take() {
                if let Some(context) = active.context {
                    log::warn!("StopDUO failed on drop, leaking frame callback state");
                    Box::leak(context);
                }
                // The handler never sees its channel close; detach it.
                drop(active.worker);
            }
            self.state = SessionState::Opened;
        }
        if self.state != SessionState::Closed {
            let _ = self.close();
        }
    }
}
