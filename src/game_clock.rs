use std::fmt;
use std::str::FromStr;

pub const QUARTER_SECONDS: u32 = 15 * 60;

/// Game clock shown as "M:SS". Counts down and never goes below "0:00".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct GameClock {
    minutes: u32,
    seconds: u32,
}

impl GameClock {
    pub fn start_of_quarter() -> Self {
        Self {
            minutes: 15,
            seconds: 0,
        }
    }

    pub fn new(minutes: u32, seconds: u32) -> Self {
        let total = minutes
            .saturating_mul(60)
            .saturating_add(seconds)
            .min(QUARTER_SECONDS);
        Self {
            minutes: total / 60,
            seconds: total % 60,
        }
    }

    pub fn total_seconds(self) -> u32 {
        self.minutes * 60 + self.seconds
    }

    pub fn is_expired(self) -> bool {
        self.minutes == 0 && self.seconds == 0
    }

    /// Runs `elapsed` seconds off the clock, borrowing a minute when the
    /// seconds column underflows and clamping at "0:00".
    pub fn run_off(&mut self, elapsed: u32) {
        let mut remaining = elapsed;
        while remaining > 0 {
            if self.seconds >= remaining {
                self.seconds -= remaining;
                return;
            }
            if self.minutes == 0 {
                self.seconds = 0;
                return;
            }
            remaining -= self.seconds;
            self.minutes -= 1;
            self.seconds = 60;
        }
    }
}

impl fmt::Display for GameClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:02}", self.minutes, self.seconds)
    }
}

impl FromStr for GameClock {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let (m, s) = raw
            .trim()
            .split_once(':')
            .ok_or_else(|| format!("clock missing ':' in {raw:?}"))?;
        let minutes = m
            .parse::<u32>()
            .map_err(|_| format!("bad minutes in {raw:?}"))?;
        let seconds = s
            .parse::<u32>()
            .map_err(|_| format!("bad seconds in {raw:?}"))?;
        if seconds >= 60 || s.len() != 2 {
            return Err(format!("bad seconds in {raw:?}"));
        }
        let total = minutes
            .checked_mul(60)
            .and_then(|secs| secs.checked_add(seconds));
        if total.is_none_or(|total| total > QUARTER_SECONDS) {
            return Err(format!("clock beyond quarter length: {raw:?}"));
        }
        Ok(Self { minutes, seconds })
    }
}
