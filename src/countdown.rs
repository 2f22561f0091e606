/// Urgency band of the rest timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Urgency {
    Normal,
    Warning,
    Critical,
}

pub const WARNING_THRESHOLD_SECS: u32 = 30;
pub const CRITICAL_THRESHOLD_SECS: u32 = 10;

impl Urgency {
    pub fn for_seconds(secs: u32) -> Self {
        if secs <= CRITICAL_THRESHOLD_SECS {
            Urgency::Critical
        } else if secs <= WARNING_THRESHOLD_SECS {
            Urgency::Warning
        } else {
            Urgency::Normal
        }
    }

    pub fn pulses(&self) -> bool {
        matches!(self, Urgency::Critical)
    }
}

/// `MM:SS`, minutes are not wrapped at an hour
pub fn format_countdown(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Render-time view of the rest timer. `phase` is the animation counter,
/// advanced by the caller once per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestCountdown {
    pub seconds: u32,
    pub phase: u64,
}

impl RestCountdown {
    pub fn new(seconds: u32, phase: u64) -> Self {
        Self { seconds, phase }
    }

    pub fn label(&self) -> String {
        format_countdown(self.seconds)
    }

    pub fn urgency(&self) -> Urgency {
        Urgency::for_seconds(self.seconds)
    }

    /// True on the "bright" half of the pulse; always false outside the
    /// critical band.
    pub fn pulse_on(&self) -> bool {
        self.urgency().pulses() && self.phase % 2 == 0
    }
}
