use core::fmt;
use core::ops::{Add, Mul, Sub};
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// World-space position or direction.
///
/// Serialized explicitly as a `[x, y, z]` array so snapshots stay stable regardless of how a
/// generic serializer would lay out a struct.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(from = "[f32; 3]", into = "[f32; 3]")
)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn distance(self, other: Self) -> f32 {
        (other - self).length()
    }

    /// Step from `self` towards `target` by at most `max_step`, landing exactly on `target` when
    /// it is within reach.
    pub fn move_towards(self, target: Self, max_step: f32) -> Self {
        let delta = target - self;
        let dist = delta.length();
        if dist <= max_step.max(0.0) || dist <= f32::EPSILON {
            return target;
        }
        self + delta * (max_step / dist)
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }

    pub fn to_le_bytes(self) -> [u8; 12] {
        let mut out = [0_u8; 12];
        for (i, v) in self.to_array().iter().enumerate() {
            out[i * 4..(i + 1) * 4].copy_from_slice(&v.to_le_bytes());
        }
        out
    }

    pub fn from_le_bytes(bytes: [u8; 12]) -> Self {
        let mut v = [0.0_f32; 3];
        for (i, slot) in v.iter_mut().enumerate() {
            let mut w = [0_u8; 4];
            w.copy_from_slice(&bytes[i * 4..(i + 1) * 4]);
            *slot = f32::from_le_bytes(w);
        }
        Self::from(v)
    }
}

impl From<[f32; 3]> for Vec3 {
    fn from(v: [f32; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

impl From<Vec3> for [f32; 3] {
    fn from(v: Vec3) -> Self {
        v.to_array()
    }
}

impl Add for Vec3 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

/// Text form: `x,y,z`.
impl fmt::Display for Vec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.x, self.y, self.z)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid vec3 literal {0:?}: expected `x,y,z`")]
pub struct ParseVec3Error(pub String);

impl FromStr for Vec3 {
    type Err = ParseVec3Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(',').map(|p| p.trim().parse::<f32>());
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(Ok(x)), Some(Ok(y)), Some(Ok(z)), None) => Ok(Self::new(x, y, z)),
            _ => Err(ParseVec3Error(s.to_string())),
        }
    }
}
