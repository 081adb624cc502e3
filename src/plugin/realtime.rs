// RealTime - signed timestamp with nanosecond resolution
//
// Block timestamps and feature timestamps/durations share this type.
// It is signed because boundary refinement can move a timestamp back
// into the previous block.

use serde::{Serialize, Serializer};
use std::fmt;
use std::ops::{Add, Neg, Sub};

const NANOS_PER_SEC: i64 = 1_000_000_000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RealTime {
    nanos: i64,
}

impl RealTime {
    pub const ZERO: RealTime = RealTime { nanos: 0 };

    pub fn from_nanos(nanos: i64) -> Self {
        Self { nanos }
    }

    pub fn from_secs_f64(secs: f64) -> Self {
        Self {
            nanos: (secs * NANOS_PER_SEC as f64).round() as i64,
        }
    }

    /// Convert a (possibly negative) frame count at `sample_rate` to time
    ///
    /// Whole seconds are split off first so that long streams do not
    /// overflow the intermediate product.
    pub fn from_frames(frames: i64, sample_rate: u32) -> Self {
        if sample_rate == 0 {
            return Self::ZERO;
        }
        if frames < 0 {
            return -Self::from_frames(-frames, sample_rate);
        }
        let rate = sample_rate as i64;
        let secs = frames / rate;
        let rem = frames % rate;
        Self {
            nanos: secs * NANOS_PER_SEC + rem * NANOS_PER_SEC / rate,
        }
    }

    /// Nearest frame index at `sample_rate`
    pub fn to_frames(self, sample_rate: u32) -> i64 {
        let secs = self.as_secs_f64();
        (secs * sample_rate as f64).round() as i64
    }

    pub fn as_nanos(self) -> i64 {
        self.nanos
    }

    pub fn as_secs_f64(self) -> f64 {
        self.nanos as f64 / NANOS_PER_SEC as f64
    }
}

impl Add for RealTime {
    type Output = RealTime;

    fn add(self, rhs: RealTime) -> RealTime {
        RealTime {
            nanos: self.nanos + rhs.nanos,
        }
    }
}

impl Sub for RealTime {
    type Output = RealTime;

    fn sub(self, rhs: RealTime) -> RealTime {
        RealTime {
            nanos: self.nanos - rhs.nanos,
        }
    }
}

impl Neg for RealTime {
    type Output = RealTime;

    fn neg(self) -> RealTime {
        RealTime { nanos: -self.nanos }
    }
}

impl fmt::Display for RealTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.nanos < 0 { "-" } else { "" };
        let abs = self.nanos.unsigned_abs();
        write!(
            f,
            "{}{}.{:09}",
            sign,
            abs / NANOS_PER_SEC as u64,
            abs % NANOS_PER_SEC as u64
        )
    }
}

impl Serialize for RealTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_secs_f64())
    }
}
