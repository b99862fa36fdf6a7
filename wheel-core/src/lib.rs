use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const FULL_TURN: f64 = 360.0;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WheelItem {
    pub name: String,
    pub priority: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Slice {
    pub item: WheelItem,
    pub start_angle: f64,
    pub end_angle: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WheelStatus {
    #[default]
    Idle,
    Spinning,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WheelError {
    #[error("no items to spin")]
    Empty,
    #[error("total item weight is zero")]
    ZeroWeight,
    #[error("wheel already spinning")]
    AlreadySpinning,
}

/// Partitions [0, 360) into contiguous slices in input order, first slice
/// starting at angle 0, width proportional to priority over the total.
///
/// A list whose priorities sum to zero is rejected rather than clamped or
/// filtered. Individual zero-priority items are allowed when the total is
/// positive; they get a zero-width slice and can never be selected.
pub fn slices(items: &[WheelItem]) -> Result<Vec<Slice>, WheelError> {
    if items.is_empty() {
        return Err(WheelError::Empty);
    }

    let total: u64 = items.iter().map(|i| u64::from(i.priority)).sum();
    if total == 0 {
        return Err(WheelError::ZeroWeight);
    }

    let mut out = Vec::with_capacity(items.len());
    let mut current = 0.0;
    for (index, item) in items.iter().enumerate() {
        let width = item.priority as f64 / total as f64 * FULL_TURN;
        // Pin the final edge to exactly 360 so accumulated rounding cannot
        // leave the landing angle outside every slice.
        let end = if index == items.len() - 1 {
            FULL_TURN
        } else {
            current + width
        };
        out.push(Slice {
            item: item.clone(),
            start_angle: current,
            end_angle: end,
        });
        current = end;
    }

    Ok(out)
}

/// The wheel rotates clockwise while slices are assigned counter-clockwise
/// from 0, so the landing angle inverts the accumulated rotation.
pub fn landing_angle(rotation: f64) -> f64 {
    (FULL_TURN - rotation.rem_euclid(FULL_TURN)).rem_euclid(FULL_TURN)
}

pub fn slice_at(slices: &[Slice], angle: f64) -> Option<&Slice> {
    slices
        .iter()
        .find(|s| angle >= s.start_angle && angle < s.end_angle)
}

/// Spin state machine. Rotation accumulates across spins and is only zeroed
/// by an explicit [`Wheel::reset`]. The timed part of a spin lives with the
/// caller; this type decides what a spin lands on once the caller says the
/// animation is over.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Wheel {
    pub rotation: f64,
    pub status: WheelStatus,
    pub selected: Option<WheelItem>,
    slices: Vec<Slice>,
}

impl Wheel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Computes slices for `items`, samples 3-5 full turns plus a random
    /// offset on top of the accumulated rotation, and enters Spinning.
    /// Returns the new total rotation in degrees.
    pub fn begin_spin(
        &mut self,
        items: &[WheelItem],
        rng: &mut impl Rng,
    ) -> Result<f64, WheelError> {
        if matches!(self.status, WheelStatus::Spinning) {
            return Err(WheelError::AlreadySpinning);
        }

        let slices = slices(items)?;

        let turns = 3.0 + rng.gen::<f64>() * 2.0;
        let offset = rng.gen::<f64>() * FULL_TURN;
        self.rotation += turns * FULL_TURN + offset;
        self.status = WheelStatus::Spinning;
        self.selected = None;
        self.slices = slices;

        Ok(self.rotation)
    }

    /// Resolves the spin from the landing angle and returns to Idle.
    /// A no-op returning None when the wheel is not spinning.
    pub fn finish_spin(&mut self) -> Option<WheelItem> {
        if !matches!(self.status, WheelStatus::Spinning) {
            return None;
        }

        let angle = landing_angle(self.rotation);
        let selected = slice_at(&self.slices, angle).map(|s| s.item.clone());
        self.status = WheelStatus::Idle;
        self.selected = selected.clone();
        selected
    }

    /// Allowed in any state: zeroes the rotation and clears any spin in
    /// progress along with the last selection.
    pub fn reset(&mut self) {
        self.rotation = 0.0;
        self.status = WheelStatus::Idle;
        self.selected = None;
        self.slices.clear();
    }
}
