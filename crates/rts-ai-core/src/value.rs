use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::Vec3;

/// A single blackboard / context value.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(tag = "type", content = "value", rename_all = "snake_case")
)]
pub enum BbValue {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Vec3(Vec3),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum ValueKind {
    Int,
    Float,
    Str,
    Bool,
    Vec3,
}

impl BbValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            BbValue::Int(_) => ValueKind::Int,
            BbValue::Float(_) => ValueKind::Float,
            BbValue::Str(_) => ValueKind::Str,
            BbValue::Bool(_) => ValueKind::Bool,
            BbValue::Vec3(_) => ValueKind::Vec3,
        }
    }

    /// Equality for change detection: floats compare by bit pattern, so `NaN` matches itself.
    pub fn same_as(&self, other: &BbValue) -> bool {
        match (self, other) {
            (BbValue::Float(a), BbValue::Float(b)) => a.to_bits() == b.to_bits(),
            (BbValue::Vec3(a), BbValue::Vec3(b)) => a.to_le_bytes() == b.to_le_bytes(),
            _ => self == other,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            BbValue::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Stable 64-bit fingerprint, used for replay digests.
    pub fn fingerprint(&self) -> u64 {
        let (tag, bits) = match self {
            BbValue::Int(v) => (1, *v as u64),
            BbValue::Float(v) => (2, v.to_bits()),
            BbValue::Str(s) => (3, crate::rng::hash_str(s)),
            BbValue::Bool(b) => (4, *b as u64),
            BbValue::Vec3(v) => {
                let bytes = v.to_le_bytes();
                let mut acc = 0_u64;
                for chunk in bytes.chunks(4) {
                    let mut w = [0_u8; 4];
                    w.copy_from_slice(chunk);
                    acc = crate::rng::mix64(acc ^ u32::from_le_bytes(w) as u64);
                }
                (5, acc)
            }
        };
        crate::rng::mix64(bits ^ crate::rng::mix64(tag))
    }
}

impl fmt::Display for BbValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BbValue::Int(v) => write!(f, "{v}"),
            BbValue::Float(v) => write!(f, "{v}"),
            BbValue::Str(s) => f.write_str(s),
            BbValue::Bool(b) => write!(f, "{b}"),
            BbValue::Vec3(v) => write!(f, "{v}"),
        }
    }
}

impl From<i64> for BbValue {
    fn from(v: i64) -> Self {
        BbValue::Int(v)
    }
}

impl From<i32> for BbValue {
    fn from(v: i32) -> Self {
        BbValue::Int(v as i64)
    }
}

impl From<u32> for BbValue {
    fn from(v: u32) -> Self {
        BbValue::Int(v as i64)
    }
}

/// Unit ids are stored bit-for-bit in an `Int`.
impl From<u64> for BbValue {
    fn from(v: u64) -> Self {
        BbValue::Int(v as i64)
    }
}

impl From<f64> for BbValue {
    fn from(v: f64) -> Self {
        BbValue::Float(v)
    }
}

impl From<f32> for BbValue {
    fn from(v: f32) -> Self {
        BbValue::Float(v as f64)
    }
}

impl From<bool> for BbValue {
    fn from(v: bool) -> Self {
        BbValue::Bool(v)
    }
}

impl From<String> for BbValue {
    fn from(v: String) -> Self {
        BbValue::Str(v)
    }
}

impl From<&str> for BbValue {
    fn from(v: &str) -> Self {
        BbValue::Str(v.to_string())
    }
}

impl From<Vec3> for BbValue {
    fn from(v: Vec3) -> Self {
        BbValue::Vec3(v)
    }
}

/// Types that can be read back out of a [`BbValue`].
///
/// Integers widen into floats on read; nothing else converts implicitly.
pub trait BbType: Sized + Into<BbValue> {
    fn from_value(value: &BbValue) -> Option<Self>;
}

impl BbType for i64 {
    fn from_value(value: &BbValue) -> Option<Self> {
        match value {
            BbValue::Int(v) => Some(*v),
            _ => None,
        }
    }
}

impl BbType for i32 {
    fn from_value(value: &BbValue) -> Option<Self> {
        match value {
            BbValue::Int(v) => i32::try_from(*v).ok(),
            _ => None,
        }
    }
}

impl BbType for u32 {
    fn from_value(value: &BbValue) -> Option<Self> {
        match value {
            BbValue::Int(v) => u32::try_from(*v).ok(),
            _ => None,
        }
    }
}

impl BbType for u64 {
    fn from_value(value: &BbValue) -> Option<Self> {
        match value {
            BbValue::Int(v) => Some(*v as u64),
            _ => None,
        }
    }
}

impl BbType for f64 {
    fn from_value(value: &BbValue) -> Option<Self> {
        match value {
            BbValue::Float(v) => Some(*v),
            BbValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }
}

impl BbType for f32 {
    fn from_value(value: &BbValue) -> Option<Self> {
        f64::from_value(value).map(|v| v as f32)
    }
}

impl BbType for bool {
    fn from_value(value: &BbValue) -> Option<Self> {
        match value {
            BbValue::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl BbType for String {
    fn from_value(value: &BbValue) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

impl BbType for Vec3 {
    fn from_value(value: &BbValue) -> Option<Self> {
        match value {
            BbValue::Vec3(v) => Some(*v),
            _ => None,
        }
    }
}
