//! Role catalog
//!
//! Static enumeration of vehicle types, sound roles and the two object
//! shapes a role can be realized by. Nothing in here depends on a scene.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Class of vehicle, e.g. a specific locomotive model
///
/// Built-in types are known at compile time; types registered by external
/// content packs show up as [`VehicleType::Custom`] carrying their tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum VehicleType {
    /// Small diesel-electric shunter
    DE2,
    /// Six-axle diesel-electric road locomotive
    DE6,
    /// Diesel-hydraulic locomotive
    DH4,
    /// Diesel-mechanical shunter with a gearbox
    DM3,
    /// Diesel-mechanical utility rail vehicle
    DM1U,
    /// 0-6-0 steam tank locomotive
    S060,
    /// 2-8-2 steam road locomotive
    S282,
    /// Battery-electric microshunter
    BE2,
    /// Human powered handcar
    Handcar,
    /// Externally registered type, identified by its tag
    Custom(String),
}

impl VehicleType {
    /// Every compile-time vehicle type
    pub const BUILTIN: [Self; 9] = [
        Self::DE2,
        Self::DE6,
        Self::DH4,
        Self::DM3,
        Self::DM1U,
        Self::S060,
        Self::S282,
        Self::BE2,
        Self::Handcar,
    ];

    /// Tag used in persisted state and logs
    pub fn tag(&self) -> &str {
        match self {
            Self::DE2 => "DE2",
            Self::DE6 => "DE6",
            Self::DH4 => "DH4",
            Self::DM3 => "DM3",
            Self::DM1U => "DM1U",
            Self::S060 => "S060",
            Self::S282 => "S282",
            Self::BE2 => "BE2",
            Self::Handcar => "Handcar",
            Self::Custom(tag) => tag,
        }
    }

    /// Parse a tag; anything unknown becomes a custom type
    pub fn from_tag(tag: &str) -> Self {
        Self::BUILTIN
            .iter()
            .find(|t| t.tag().eq_ignore_ascii_case(tag))
            .cloned()
            .unwrap_or_else(|| Self::Custom(tag.to_string()))
    }

    /// Whether this type was registered at runtime
    pub fn is_custom(&self) -> bool {
        matches!(self, Self::Custom(_))
    }
}

impl fmt::Display for VehicleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl From<String> for VehicleType {
    fn from(tag: String) -> Self {
        Self::from_tag(&tag)
    }
}

impl From<VehicleType> for String {
    fn from(vehicle_type: VehicleType) -> Self {
        vehicle_type.tag().to_string()
    }
}

/// How a role is realized on a vehicle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    /// Ordered layers with a shared pitch range and curve-driven modulation
    MultiLayer,
    /// Flat array of interchangeable clips, no curve support
    ClipSet,
}

/// Semantic sound slot on a vehicle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Role {
    /// Sustained horn
    HornLoop,
    /// Short horn blast
    HornHit,
    /// Bell
    Bell,
    /// Steam whistle
    Whistle,
    /// Engine at idle
    EngineIdle,
    /// Engine under load
    EngineLoad,
    /// Engine starting up
    EngineStartup,
    /// Engine shutting down
    EngineShutdown,
    /// Electric traction motors
    TractionMotors,
    /// Air compressor
    Compressor,
    /// Dynamic brake blower
    DynamicBrake,
    /// Gear change clunk
    GearShift,
    /// Slowest steam chuff band
    SteamChuff2Hz,
    /// Steam chuff at 4 beats per second
    SteamChuff4Hz,
    /// Steam chuff at 8 beats per second
    SteamChuff8Hz,
    /// Fastest steam chuff band
    SteamChuff16Hz,
}

impl Role {
    /// Every role, in catalog order
    pub const ALL: [Self; 16] = [
        Self::HornLoop,
        Self::HornHit,
        Self::Bell,
        Self::Whistle,
        Self::EngineIdle,
        Self::EngineLoad,
        Self::EngineStartup,
        Self::EngineShutdown,
        Self::TractionMotors,
        Self::Compressor,
        Self::DynamicBrake,
        Self::GearShift,
        Self::SteamChuff2Hz,
        Self::SteamChuff4Hz,
        Self::SteamChuff8Hz,
        Self::SteamChuff16Hz,
    ];

    /// Stable snake_case name used for catalog directories and persistence
    pub fn stem(self) -> &'static str {
        match self {
            Self::HornLoop => "horn_loop",
            Self::HornHit => "horn_hit",
            Self::Bell => "bell",
            Self::Whistle => "whistle",
            Self::EngineIdle => "engine_idle",
            Self::EngineLoad => "engine_load",
            Self::EngineStartup => "engine_startup",
            Self::EngineShutdown => "engine_shutdown",
            Self::TractionMotors => "traction_motors",
            Self::Compressor => "compressor",
            Self::DynamicBrake => "dynamic_brake",
            Self::GearShift => "gear_shift",
            Self::SteamChuff2Hz => "steam_chuff_2hz",
            Self::SteamChuff4Hz => "steam_chuff_4hz",
            Self::SteamChuff8Hz => "steam_chuff_8hz",
            Self::SteamChuff16Hz => "steam_chuff_16hz",
        }
    }

    /// Look a role up by its stem
    pub fn from_stem(stem: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|r| r.stem() == stem)
    }

    /// Shape of the object that realizes this role
    pub fn shape(self) -> Shape {
        match self {
            Self::HornHit | Self::EngineStartup | Self::EngineShutdown | Self::GearShift => {
                Shape::ClipSet
            }
            _ => Shape::MultiLayer,
        }
    }

    /// Steam chuff bands live under a dedicated controller
    pub fn is_chuff(self) -> bool {
        matches!(
            self,
            Self::SteamChuff2Hz | Self::SteamChuff4Hz | Self::SteamChuff8Hz | Self::SteamChuff16Hz
        )
    }

    /// Loops whose pitch/volume are continuously driven by the simulation
    pub fn is_continuous_loop(self) -> bool {
        matches!(
            self,
            Self::EngineIdle | Self::EngineLoad | Self::TractionMotors | Self::DynamicBrake
        ) || self.is_chuff()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.stem())
    }
}

impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_stem(&value).ok_or_else(|| format!("unknown sound role '{value}'"))
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.stem().to_string()
    }
}

const GENERIC_PREFIX: &str = "generic:";

/// Key for anything that can be overridden: a semantic role or a generic sound
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SoundKey {
    /// Sound with a known semantic role
    Role(Role),
    /// Audio-bearing node without a role, keyed by its clip name
    Generic(String),
}

impl SoundKey {
    /// Role, if this key has one
    pub fn role(&self) -> Option<Role> {
        match self {
            Self::Role(role) => Some(*role),
            Self::Generic(_) => None,
        }
    }

    /// Whether a loop that is continuously modulated sits behind this key
    pub fn is_continuous_loop(&self) -> bool {
        self.role().is_some_and(Role::is_continuous_loop)
    }
}

impl From<Role> for SoundKey {
    fn from(role: Role) -> Self {
        Self::Role(role)
    }
}

impl fmt::Display for SoundKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Role(role) => f.write_str(role.stem()),
            Self::Generic(name) => write!(f, "{GENERIC_PREFIX}{name}"),
        }
    }
}

impl FromStr for SoundKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(name) = s.strip_prefix(GENERIC_PREFIX) {
            if name.is_empty() {
                return Err("empty generic sound name".to_string());
            }
            return Ok(Self::Generic(name.to_string()));
        }
        Role::from_stem(s)
            .map(Self::Role)
            .ok_or_else(|| format!("unknown sound role '{s}'"))
    }
}

impl TryFrom<String> for SoundKey {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SoundKey> for String {
    fn from(key: SoundKey) -> Self {
        key.to_string()
    }
}
