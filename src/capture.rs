use crate::config::CaptureConfig;
use crate::types::{Frame, ImuLayout, RawFrame};
use crate::{DuoError, Result};
use crossbeam_channel::{Receiver, Sender, TrySendError};
use std::ffi::c_void;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Frame counts for one capture session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureStats {
    /// Frames handed to the channel.
    pub delivered: u64,
    /// Frames discarded because the channel was full or its consumer was gone.
    pub dropped: u64,
}

#[derive(Default)]
struct Counters {
    delivered: AtomicU64,
    dropped: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> CaptureStats {
        CaptureStats {
            delivered: self.delivered.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

/// State the trampoline reaches through `pUserData`.
///
/// Must stay at a fixed address from `StartDUO` until a successful `StopDUO`.
pub(crate) struct CaptureContext {
    sender: Sender<Frame>,
    copy_pixels: bool,
    counters: Arc<Counters>,
}

impl CaptureContext {
    pub(crate) fn as_user_data(&self) -> *mut c_void {
        self as *const Self as *mut c_void
    }

    pub(crate) fn stats(&self) -> CaptureStats {
        self.counters.snapshot()
    }
}

/// Create a boxed trampoline context and the stream draining it.
pub(crate) fn channel(config: &CaptureConfig) -> (Box<CaptureContext>, CaptureStream) {
    let (sender, receiver) = crossbeam_channel::bounded(config.queue_depth.max(1));
    let counters = Arc::new(Counters::default());
    let context = Box::new(CaptureContext {
        sender,
        copy_pixels: config.copy_pixels,
        counters: counters.clone(),
    });
    (context, CaptureStream { receiver, counters })
}

/// `DUOFrameCallback` registered with `StartDUO`.
///
/// Runs on DUOLib's capture thread. Copies what the host needs out of the
/// native record and never blocks: a full channel drops the frame.
///
/// # Safety
/// `user_data` must point to a live [`CaptureContext`] and `frame` must be the
/// record DUOLib passes for this invocation.
pub(crate) unsafe extern "C" fn trampoline<S: ImuLayout>(
    frame: *const RawFrame<S>,
    user_data: *mut c_void,
) {
    if frame.is_null() || user_data.is_null() {
        return;
    }
    let ctx = &*(user_data as *const CaptureContext);
    let frame = (*frame).to_frame(ctx.copy_pixels);

    match ctx.sender.try_send(frame) {
        Ok(()) => {
            ctx.counters.delivered.fetch_add(1, Ordering::Relaxed);
        }
        Err(TrySendError::Full(frame)) => {
            ctx.counters.dropped.fetch_add(1, Ordering::Relaxed);
            log::trace!("Frame channel full, dropping frame at {} ticks", frame.timestamp_ticks);
        }
        Err(TrySendError::Disconnected(_)) => {
            ctx.counters.dropped.fetch_add(1, Ordering::Relaxed);
            log::trace!("Frame consumer gone, dropping frame");
        }
    }
}

/// Receiving end of an active capture.
///
/// Frames arrive in capture order. The stream reports
/// [`DuoError::StreamStopped`] once capture has been stopped and every
/// buffered frame has been read.
pub struct CaptureStream {
    receiver: Receiver<Frame>,
    counters: Arc<Counters>,
}

impl CaptureStream {
    /// Receive the next frame (blocks until available).
    pub fn recv(&self) -> Result<Frame> {
        self.receiver.recv().map_err(|_| DuoError::StreamStopped)
    }

    /// Try to receive a frame without blocking.
    pub fn try_recv(&self) -> Option<Frame> {
        self.receiver.try_recv().ok()
    }

    /// Receive a frame with a timeout.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Frame> {
        self.receiver.recv_timeout(timeout).map_err(|e| match e {
            crossbeam_channel::RecvTimeoutError::Timeout => DuoError::Timeout,
            crossbeam_channel::RecvTimeoutError::Disconnected => DuoError::StreamStopped,
        })
    }

    /// Frames currently buffered.
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }

    pub fn stats(&self) -> CaptureStats {
        self.counters.snapshot()
    }
}

impl Iterator for CaptureStream {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        self.recv().ok()
    }
}

/// Run `handler` for every frame of `stream` on a dedicated thread.
///
/// The thread ends once the trampoline context is released and the channel
/// has been drained.
pub(crate) fn spawn_handler<F>(stream: CaptureStream, mut handler: F) -> Result<JoinHandle<()>>
where
    F: FnMut(Frame) + Send + 'static,
{
    std::thread::Builder::new()
        .name("duo3d-frames".into())
        .spawn(move || {
            log::debug!("Frame handler started");
            for frame in stream {
                handler(frame);
            }
            log::debug!("Frame handler finished");
        })
        .map_err(DuoError::Spawn)
}
