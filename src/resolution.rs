use crate::types::Binning;

/// Native sensor width in pixels (no binning).
pub const SENSOR_WIDTH: i32 = 752;
/// Native sensor height in pixels (no binning).
pub const SENSOR_HEIGHT: i32 = 480;

/// Pick the binning that maximises the imaging area used for a `width`x`height` frame.
///
/// Not a DUOLib entry point. The thresholds use integer division against the
/// native sensor size and must stay exactly as they are: stored calibration
/// data was computed against these choices.
pub fn find_optimal_binning(width: i32, height: i32) -> Binning {
    let mut binning = Binning::NONE;
    if width <= SENSOR_WIDTH / 2 {
        binning |= Binning::HORIZONTAL2;
    }
    if height <= SENSOR_HEIGHT / 4 {
        binning |= Binning::VERTICAL4;
    } else if height <= SENSOR_HEIGHT / 2 {
        binning |= Binning::VERTICAL2;
    }
    binning
}

/// Filter for `EnumerateDUOResolutions`. `None` fields are wildcards.
///
/// Leaving width, height and fps unset enumerates every supported mode.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ResolutionFilter {
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub binning: Option<Binning>,
    pub fps: Option<f32>,
}

impl ResolutionFilter {
    /// Match every supported resolution.
    pub fn any() -> Self {
        Self::default()
    }

    /// Match a frame size with any binning and frame rate.
    pub fn size(width: i32, height: i32) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            ..Self::default()
        }
    }

    pub fn with_binning(mut self, binning: Binning) -> Self {
        self.binning = Some(binning);
        self
    }

    pub fn with_fps(mut self, fps: f32) -> Self {
        self.fps = Some(fps);
        self
    }

    /// Native argument list: `(width, height, binning, fps)` with `-1` as the wildcard.
    pub fn to_native(&self) -> (i32, i32, i32, f32) {
        (
            self.width.unwrap_or(-1),
            self.height.unwrap_or(-1),
            self.binning.map_or(Binning::ANY_RAW, |b| b.bits()),
            self.fps.unwrap_or(-1.0),
        )
    }
}
