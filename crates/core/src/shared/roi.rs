use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Region of interest in frame-absolute pixel coordinates.
///
/// `(x1, y1)` is the top-left corner (inclusive), `(x2, y2)` the
/// bottom-right corner (exclusive), matching array slicing semantics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roi {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl Roi {
    pub const fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> i32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> i32 {
        self.y2 - self.y1
    }

    /// Translation from ROI-local to frame-global coordinates.
    pub fn offset(&self) -> (f64, f64) {
        (self.x1 as f64, self.y1 as f64)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.x1 < 0 || self.y1 < 0 {
            return Err(format!("ROI origin must be non-negative, got {self}"));
        }
        if self.x2 <= self.x1 || self.y2 <= self.y1 {
            return Err(format!("ROI must have positive width and height, got {self}"));
        }
        Ok(())
    }

    /// Intersection with a `width` × `height` frame, or `None` if empty.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<Roi> {
        let x1 = self.x1.clamp(0, width as i32);
        let y1 = self.y1.clamp(0, height as i32);
        let x2 = self.x2.clamp(0, width as i32);
        let y2 = self.y2.clamp(0, height as i32);
        if x2 <= x1 || y2 <= y1 {
            None
        } else {
            Some(Roi { x1, y1, x2, y2 })
        }
    }
}

impl fmt::Display for Roi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.x1, self.y1, self.x2, self.y2)
    }
}

/// Parses `"x1,y1,x2,y2"`.
impl FromStr for Roi {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<i32> = s
            .split(',')
            .map(|p| p.trim().parse::<i32>())
            .collect::<Result<_, _>>()
            .map_err(|e| format!("invalid ROI '{s}': {e}"))?;
        match parts.as_slice() {
            [x1, y1, x2, y2] => Ok(Roi::new(*x1, *y1, *x2, *y2)),
            _ => Err(format!("ROI must have 4 comma-separated integers, got '{s}'")),
        }
    }
}
