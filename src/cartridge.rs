//! Cartridge geometry
//!
//! Static layout constants for each ADR cartridge generation. Only the
//! generations whose layout has been confirmed against real dumps carry a
//! [`Geometry`]; every query against the others fails with
//! [`TapeError::NotImplemented`] naming the property that was asked for.

use crate::error::{Result, TapeError};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Number of physical tracks written in parallel by the head assembly.
pub const TRACKS_PER_GROUP: u32 = 8;

/// Physical track count shared by every supported generation.
pub const PHYSICAL_TRACK_COUNT: u32 = 192;

/// Cartridge generations recognised in tape definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CartridgeType {
    /// Unconstrained layout spanning everything the hardware position field can encode
    Raw,
    /// ADR 30GB (15GB native)
    Adr30,
    /// ADR 50GB (25GB native), has a parking zone
    Adr50,
    /// ADR2 60GB, layout unconfirmed
    Adr60,
    /// ADR2 120GB, layout unconfirmed
    Adr120,
}

/// Layout constants of one cartridge generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub physical_track_count: u32,
    pub logical_track_count: u32,
    pub frames_per_track: u32,
    /// Half-open X range `[start, end)` reserved for parking, if any
    pub parking_zone: Option<(u32, u32)>,
}

const RAW_GEOMETRY: Geometry = Geometry {
    physical_track_count: PHYSICAL_TRACK_COUNT,
    logical_track_count: PHYSICAL_TRACK_COUNT / TRACKS_PER_GROUP,
    frames_per_track: 0x1_0000,
    parking_zone: None,
};

const ADR30_GEOMETRY: Geometry = Geometry {
    physical_track_count: PHYSICAL_TRACK_COUNT,
    logical_track_count: PHYSICAL_TRACK_COUNT / TRACKS_PER_GROUP,
    frames_per_track: 19239,
    parking_zone: None,
};

// 99 frames per track are reserved around the middle of the tape
const ADR50_GEOMETRY: Geometry = Geometry {
    physical_track_count: PHYSICAL_TRACK_COUNT,
    logical_track_count: PHYSICAL_TRACK_COUNT / TRACKS_PER_GROUP,
    frames_per_track: 31959,
    parking_zone: Some((15930, 16029)),
};

impl Geometry {
    pub fn has_parking_zone(&self) -> bool {
        self.parking_zone.is_some()
    }

    /// Number of frames per track covered by the parking zone.
    pub fn parking_zone_length(&self) -> u32 {
        self.parking_zone.map(|(start, end)| end - start).unwrap_or(0)
    }

    /// Logical blocks available on one track.
    pub fn logical_frames_per_track(&self) -> u32 {
        self.frames_per_track - self.parking_zone_length()
    }

    pub fn physical_block_count(&self) -> u32 {
        self.logical_track_count * self.frames_per_track
    }

    pub fn logical_block_count(&self) -> u32 {
        self.logical_track_count * self.logical_frames_per_track()
    }

    pub fn max_logical_block(&self) -> u32 {
        self.logical_block_count() - 1
    }

    pub fn is_in_parking_zone(&self, x: u32) -> bool {
        match self.parking_zone {
            Some((start, end)) => x >= start && x < end,
            None => false,
        }
    }
}

impl CartridgeType {
    /// Geometry for this generation; `property` names what the caller needs it for.
    pub fn geometry_for(self, property: &'static str) -> Result<&'static Geometry> {
        match self {
            CartridgeType::Raw => Ok(&RAW_GEOMETRY),
            CartridgeType::Adr30 => Ok(&ADR30_GEOMETRY),
            CartridgeType::Adr50 => Ok(&ADR50_GEOMETRY),
            CartridgeType::Adr60 | CartridgeType::Adr120 => {
                Err(TapeError::not_implemented(self, property))
            }
        }
    }

    pub fn geometry(self) -> Result<&'static Geometry> {
        self.geometry_for("Geometry")
    }

    pub fn is_implemented(self) -> bool {
        self.geometry().is_ok()
    }

    pub fn physical_track_count(self) -> Result<u32> {
        Ok(self.geometry_for("PhysicalTrackCount")?.physical_track_count)
    }

    pub fn logical_track_count(self) -> Result<u32> {
        Ok(self.geometry_for("LogicalTrackCount")?.logical_track_count)
    }

    pub fn frames_per_track(self) -> Result<u32> {
        Ok(self.geometry_for("FramesPerTrack")?.frames_per_track)
    }

    pub fn has_parking_zone(self) -> Result<bool> {
        Ok(self.geometry_for("HasParkingZone")?.has_parking_zone())
    }

    pub fn parking_zone_start(self) -> Result<Option<u32>> {
        Ok(self
            .geometry_for("ParkingZoneStart")?
            .parking_zone
            .map(|(start, _)| start))
    }

    pub fn parking_zone_end(self) -> Result<Option<u32>> {
        Ok(self
            .geometry_for("ParkingZoneEnd")?
            .parking_zone
            .map(|(_, end)| end))
    }

    pub fn logical_block_count(self) -> Result<u32> {
        Ok(self.geometry_for("LogicalBlockCount")?.logical_block_count())
    }

    pub fn max_logical_block(self) -> Result<u32> {
        Ok(self.geometry_for("MaxLogicalBlock")?.max_logical_block())
    }

    pub fn physical_block_count(self) -> Result<u32> {
        Ok(self.geometry_for("PhysicalBlockCount")?.physical_block_count())
    }

    pub fn config_name(self) -> &'static str {
        match self {
            CartridgeType::Raw => "raw",
            CartridgeType::Adr30 => "adr30",
            CartridgeType::Adr50 => "adr50",
            CartridgeType::Adr60 => "adr60",
            CartridgeType::Adr120 => "adr120",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            CartridgeType::Raw => "Raw (unconstrained layout)",
            CartridgeType::Adr30 => "ADR 30GB",
            CartridgeType::Adr50 => "ADR 50GB",
            CartridgeType::Adr60 => "ADR2 60GB",
            CartridgeType::Adr120 => "ADR2 120GB",
        }
    }
}

impl fmt::Display for CartridgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.config_name())
    }
}

impl FromStr for CartridgeType {
    type Err = TapeError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_' && *c != ' ')
            .collect::<String>()
            .to_ascii_lowercase();

        match normalized.as_str() {
            "raw" => Ok(CartridgeType::Raw),
            "adr30" | "30gb" | "di30" => Ok(CartridgeType::Adr30),
            "adr50" | "50gb" | "di50" => Ok(CartridgeType::Adr50),
            "adr60" | "60gb" | "adr260" => Ok(CartridgeType::Adr60),
            "adr120" | "120gb" | "adr2120" => Ok(CartridgeType::Adr120),
            _ => Err(TapeError::configuration(format!(
                "Unknown cartridge type '{}'",
                s
            ))),
        }
    }
}

impl Serialize for CartridgeType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.config_name())
    }
}

impl<'de> Deserialize<'de> for CartridgeType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_geometry() {
        assert_eq!(CartridgeType::Adr30.physical_track_count().unwrap(), 192);
        assert_eq!(CartridgeType::Adr30.logical_track_count().unwrap(), 24);
        assert_eq!(CartridgeType::Adr30.frames_per_track().unwrap(), 19239);
        assert!(!CartridgeType::Adr30.has_parking_zone().unwrap());
        assert_eq!(CartridgeType::Adr30.logical_block_count().unwrap(), 24 * 19239);

        assert!(CartridgeType::Adr50.has_parking_zone().unwrap());
        assert_eq!(CartridgeType::Adr50.parking_zone_start().unwrap(), Some(15930));
        assert_eq!(CartridgeType::Adr50.parking_zone_end().unwrap(), Some(16029));
        assert_eq!(CartridgeType::Adr50.logical_block_count().unwrap(), 24 * 31860);
        assert_eq!(CartridgeType::Adr50.max_logical_block().unwrap(), 24 * 31860 - 1);
    }

    #[test]
    fn test_unimplemented_types_name_the_property() {
        let err = CartridgeType::Adr60.frames_per_track().unwrap_err();
        match err {
            TapeError::NotImplemented {
                cartridge,
                property,
            } => {
                assert_eq!(cartridge, CartridgeType::Adr60);
                assert_eq!(property, "FramesPerTrack");
            }
            other => panic!("unexpected error: {other}"),
        }

        let err = CartridgeType::Adr120.parking_zone_end().unwrap_err();
        assert!(err.to_string().contains("ParkingZoneEnd"));
        assert!(!CartridgeType::Adr120.is_implemented());
    }

    #[test]
    fn test_parse_cartridge_type() {
        assert_eq!("ADR-50".parse::<CartridgeType>().unwrap(), CartridgeType::Adr50);
        assert_eq!("adr30".parse::<CartridgeType>().unwrap(), CartridgeType::Adr30);
        assert_eq!(" raw ".parse::<CartridgeType>().unwrap(), CartridgeType::Raw);
        assert_eq!("adr120".parse::<CartridgeType>().unwrap(), CartridgeType::Adr120);
        assert!("lto4".parse::<CartridgeType>().is_err());
    }

    #[test]
    fn test_serde_round_trip() {
        let json = serde_json::to_string(&CartridgeType::Adr50).unwrap();
        assert_eq!(json, "\"adr50\"");
        let parsed: CartridgeType = serde_json::from_str("\"ADR-30\"").unwrap();
        assert_eq!(parsed, CartridgeType::Adr30);
    }
}
