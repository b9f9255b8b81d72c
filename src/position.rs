//! Tape position translation
//!
//! A tape location has three equivalent views:
//!
//! * the grid coordinate `(track, x)`, where `track` is the index of an
//!   8-wide track group (the drive reads 8 physical tracks in parallel) and
//!   `x` is the frame position along the tape,
//! * the flattened physical block number `track * frames_per_track + x`,
//! * the logical block number software is meant to use, which follows the
//!   serpentine direction of travel and hides the parking zone.
//!
//! Data is laid out boustrophedon style: even tracks are written with X
//! increasing, odd tracks with X decreasing, so the drive never has to rewind
//! between track groups.

use crate::cartridge::{CartridgeType, Geometry};
use crate::error::{Result, TapeError};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Rendered in place of a logical block number for positions in the parking zone.
pub const PARKING_ZONE_SENTINEL: &str = "PARK";

#[derive(Debug, Clone, Copy)]
pub struct PhysicalPosition {
    cartridge: CartridgeType,
    geometry: Geometry,
    track: u32,
    x: u32,
}

impl PhysicalPosition {
    /// Position at the very start of the tape (track 0, X 0).
    pub fn new(cartridge: CartridgeType) -> Result<Self> {
        let geometry = *cartridge.geometry_for("PhysicalPosition")?;
        Ok(Self {
            cartridge,
            geometry,
            track: 0,
            x: 0,
        })
    }

    pub fn from_grid(cartridge: CartridgeType, track: u32, x: u32) -> Result<Self> {
        let mut position = Self::new(cartridge)?;
        position.set_grid(track, x)?;
        Ok(position)
    }

    pub fn from_physical_block(cartridge: CartridgeType, physical_block: u32) -> Result<Self> {
        let mut position = Self::new(cartridge)?;
        position.set_physical_block(physical_block)?;
        Ok(position)
    }

    pub fn from_logical_block(cartridge: CartridgeType, logical_block: u32) -> Result<Self> {
        let mut position = Self::new(cartridge)?;
        position.set_logical_block(logical_block)?;
        Ok(position)
    }

    /// Decodes the drive's `track << 24 | x` position encoding.
    pub fn from_hardware_address(cartridge: CartridgeType, raw: u32) -> Result<Self> {
        if (raw >> 16) & 0xFF != 0 {
            return Err(TapeError::geometry(format!(
                "Hardware position {:08X} has a non-zero reserved byte",
                raw
            )));
        }
        Self::from_grid(cartridge, raw >> 24, raw & 0xFFFF)
    }

    pub fn set_grid(&mut self, track: u32, x: u32) -> Result<()> {
        if track >= self.geometry.logical_track_count || x >= self.geometry.frames_per_track {
            return Err(TapeError::geometry(format!(
                "Position T{}:X{} is outside the {} grid ({} tracks x {} frames)",
                track,
                x,
                self.cartridge,
                self.geometry.logical_track_count,
                self.geometry.frames_per_track
            )));
        }
        self.track = track;
        self.x = x;
        Ok(())
    }

    pub fn set_physical_block(&mut self, physical_block: u32) -> Result<()> {
        let count = self.geometry.physical_block_count();
        if physical_block >= count {
            return Err(TapeError::geometry(format!(
                "Physical block {} out of range for {} ({} blocks)",
                physical_block, self.cartridge, count
            )));
        }
        self.track = physical_block / self.geometry.frames_per_track;
        self.x = physical_block % self.geometry.frames_per_track;
        Ok(())
    }

    pub fn set_logical_block(&mut self, logical_block: u32) -> Result<()> {
        let count = self.geometry.logical_block_count();
        if logical_block >= count {
            return Err(TapeError::geometry(format!(
                "Logical block {} out of range for {} ({} blocks)",
                logical_block, self.cartridge, count
            )));
        }
        let per_track = self.geometry.logical_frames_per_track();
        let track = logical_block / per_track;
        self.x = x_for_logical_offset(&self.geometry, track, logical_block % per_track);
        self.track = track;
        Ok(())
    }

    pub fn cartridge(&self) -> CartridgeType {
        self.cartridge
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn track(&self) -> u32 {
        self.track
    }

    pub fn x(&self) -> u32 {
        self.x
    }

    pub fn to_physical_block(&self) -> u32 {
        self.track * self.geometry.frames_per_track + self.x
    }

    pub fn to_hardware_address(&self) -> u32 {
        (self.track << 24) | self.x
    }

    pub fn in_parking_zone(&self) -> bool {
        self.geometry.is_in_parking_zone(self.x)
    }

    pub fn is_representable_as_logical_block(&self) -> bool {
        !self.in_parking_zone()
    }

    pub fn to_logical_block(&self) -> Result<u32> {
        match logical_offset_for_x(&self.geometry, self.track, self.x) {
            Some(offset) => Ok(self.track * self.geometry.logical_frames_per_track() + offset),
            None => Err(TapeError::geometry(format!(
                "Position {} lies in the parking zone and has no logical block number",
                self
            ))),
        }
    }

    pub fn to_physical_block_string(&self) -> String {
        self.to_physical_block().to_string()
    }

    pub fn to_logical_block_string(&self) -> String {
        match self.to_logical_block() {
            Ok(logical) => logical.to_string(),
            Err(_) => PARKING_ZONE_SENTINEL.to_string(),
        }
    }

    /// Advances one frame along the serpentine path.
    ///
    /// Returns false once the end of the last track has been passed; the
    /// cursor then wraps back to track 0, X 0.
    pub fn try_increase_physical_block(&mut self, skip_parking_zone: bool) -> bool {
        let frames = self.geometry.frames_per_track;
        let last_track = self.geometry.logical_track_count - 1;
        let (mut track, mut x) = (self.track, self.x);

        if track % 2 == 0 {
            if x + 1 < frames {
                x += 1;
            } else if track < last_track {
                track += 1;
                x = frames - 1;
            } else {
                self.wrap();
                return false;
            }
        } else if x > 0 {
            x -= 1;
        } else if track < last_track {
            track += 1;
            x = 0;
        } else {
            self.wrap();
            return false;
        }

        if skip_parking_zone {
            if let Some((start, end)) = self.geometry.parking_zone {
                if x >= start && x < end {
                    x = if track % 2 == 0 { end } else { start - 1 };
                }
            }
        }

        self.track = track;
        self.x = x;
        true
    }

    /// Moves to the next logical block, if there is one.
    pub fn try_increase_logical_block(&mut self) -> bool {
        let Ok(logical) = self.to_logical_block() else {
            return false;
        };
        if logical >= self.geometry.max_logical_block() {
            return false;
        }
        self.set_logical_block(logical + 1).is_ok()
    }

    fn wrap(&mut self) {
        self.track = 0;
        self.x = 0;
    }
}

/// X coordinate of the `offset`-th logical frame on `track`, counted along the
/// direction of travel and skipping the parking zone.
fn x_for_logical_offset(geometry: &Geometry, track: u32, offset: u32) -> u32 {
    let frames = geometry.frames_per_track;
    let forward = track % 2 == 0;
    match geometry.parking_zone {
        None if forward => offset,
        None => frames - 1 - offset,
        Some((start, end)) => {
            let length = end - start;
            if forward {
                if offset < start {
                    offset
                } else {
                    offset + length
                }
            } else if offset < frames - end {
                frames - 1 - offset
            } else {
                frames - 1 - offset - length
            }
        }
    }
}

fn logical_offset_for_x(geometry: &Geometry, track: u32, x: u32) -> Option<u32> {
    if geometry.is_in_parking_zone(x) {
        return None;
    }
    let frames = geometry.frames_per_track;
    let forward = track % 2 == 0;
    let offset = match geometry.parking_zone {
        None if forward => x,
        None => frames - 1 - x,
        Some((start, end)) => {
            let length = end - start;
            if forward {
                if x < start {
                    x
                } else {
                    x - length
                }
            } else if x >= end {
                frames - 1 - x
            } else {
                frames - 1 - x - length
            }
        }
    };
    Some(offset)
}

impl PartialEq for PhysicalPosition {
    fn eq(&self, other: &Self) -> bool {
        self.cartridge == other.cartridge && self.to_physical_block() == other.to_physical_block()
    }
}

impl Eq for PhysicalPosition {}

impl Hash for PhysicalPosition {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.cartridge.hash(state);
        self.to_physical_block().hash(state);
    }
}

impl fmt::Display for PhysicalPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{:02}:X{:05}", self.track, self.x)
    }
}
