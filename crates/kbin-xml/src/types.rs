//! The kbin type table.
//!
//! Every node in the node stream carries a type id. The id decides how many
//! primitive units the node's value holds, how wide each unit is, and how the
//! value is written as text. Adding a type is one line in [`TYPES`].

use kbin_common::StorageUnit;

use crate::error::TypeKey;
use crate::{Error, Result};

/// How many units one value of a type holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repeat {
    /// A scalar (`Fixed(1)`) or fixed-size vector.
    Fixed(usize),
    /// Length-prefixed in the data stream (strings and binary blobs).
    Variable,
}

/// Text representation rule for a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextFormat {
    /// No value (void nodes, stream markers).
    None,
    /// Plain decimal integers.
    Integer,
    /// Floats with six fractional digits.
    Float,
    /// `0`/`1`.
    Bool,
    /// Dotted quad.
    Ip4,
    /// Lowercase hex pairs.
    Hex,
    /// Encoded text with a trailing NUL.
    Text,
}

/// One entry of the type table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeSpec {
    /// Wire id (without the array bit).
    pub id: u8,
    /// Primitive unit; `None` for void and markers.
    pub unit: Option<StorageUnit>,
    /// Units per value.
    pub repeat: Repeat,
    /// Text rule.
    pub format: TextFormat,
    /// Aliases; the first one is written back as `__type`.
    pub names: &'static [&'static str],
}

/// Mask for the array bit in a node-stream type byte.
pub const ARRAY_BIT: u8 = 0x40;

/// Void node (also used as the node-start marker).
pub const VOID: u8 = 1;
/// Attribute record.
pub const ATTR: u8 = 46;
/// Closes the current node.
pub const NODE_END: u8 = 190;
/// Terminates the node stream.
pub const END_SECTION: u8 = 191;

const fn spec(
    id: u8,
    unit: Option<StorageUnit>,
    repeat: Repeat,
    format: TextFormat,
    names: &'static [&'static str],
) -> TypeSpec {
    TypeSpec {
        id,
        unit,
        repeat,
        format,
        names,
    }
}

const fn int(id: u8, unit: StorageUnit, count: usize, names: &'static [&'static str]) -> TypeSpec {
    spec(id, Some(unit), Repeat::Fixed(count), TextFormat::Integer, names)
}

const fn float(id: u8, unit: StorageUnit, count: usize, names: &'static [&'static str]) -> TypeSpec {
    spec(id, Some(unit), Repeat::Fixed(count), TextFormat::Float, names)
}

const fn boolean(id: u8, count: usize, names: &'static [&'static str]) -> TypeSpec {
    spec(id, Some(StorageUnit::S8), Repeat::Fixed(count), TextFormat::Bool, names)
}

const fn marker(id: u8, names: &'static [&'static str]) -> TypeSpec {
    spec(id, None, Repeat::Fixed(0), TextFormat::None, names)
}

use StorageUnit::{F32, F64, S16, S32, S64, S8, U16, U32, U64, U8};

/// All known types, ordered by id.
pub static TYPES: &[TypeSpec] = &[
    spec(VOID, None, Repeat::Fixed(0), TextFormat::None, &["void", "nodeStart"]),
    int(2, S8, 1, &["s8"]),
    int(3, U8, 1, &["u8"]),
    int(4, S16, 1, &["s16"]),
    int(5, U16, 1, &["u16"]),
    int(6, S32, 1, &["s32"]),
    int(7, U32, 1, &["u32"]),
    int(8, S64, 1, &["s64"]),
    int(9, U64, 1, &["u64"]),
    spec(10, Some(StorageUnit::RawBytes), Repeat::Variable, TextFormat::Hex, &["bin", "binary"]),
    spec(11, Some(StorageUnit::UtfText), Repeat::Variable, TextFormat::Text, &["str", "string"]),
    spec(12, Some(U32), Repeat::Fixed(1), TextFormat::Ip4, &["ip4"]),
    int(13, U32, 1, &["time"]),
    float(14, F32, 1, &["float", "f"]),
    float(15, F64, 1, &["double", "d"]),
    int(16, S8, 2, &["2s8"]),
    int(17, U8, 2, &["2u8"]),
    int(18, S16, 2, &["2s16"]),
    int(19, U16, 2, &["2u16"]),
    int(20, S32, 2, &["2s32"]),
    int(21, U32, 2, &["2u32"]),
    int(22, S64, 2, &["2s64", "vs64"]),
    int(23, U64, 2, &["2u64", "vu64"]),
    float(24, F32, 2, &["2f"]),
    float(25, F64, 2, &["2d", "vd"]),
    int(26, S8, 3, &["3s8"]),
    int(27, U8, 3, &["3u8"]),
    int(28, S16, 3, &["3s16"]),
    int(29, U16, 3, &["3u16"]),
    int(30, S32, 3, &["3s32"]),
    int(31, U32, 3, &["3u32"]),
    int(32, S64, 3, &["3s64"]),
    int(33, U64, 3, &["3u64"]),
    float(34, F32, 3, &["3f"]),
    float(35, F64, 3, &["3d"]),
    int(36, S8, 4, &["4s8"]),
    int(37, U8, 4, &["4u8"]),
    int(38, S16, 4, &["4s16"]),
    int(39, U16, 4, &["4u16"]),
    int(40, S32, 4, &["4s32", "vs32"]),
    int(41, U32, 4, &["4u32", "vu32"]),
    int(42, S64, 4, &["4s64"]),
    int(43, U64, 4, &["4u64"]),
    float(44, F32, 4, &["4f", "vf"]),
    float(45, F64, 4, &["4d"]),
    marker(ATTR, &["attr"]),
    int(48, S8, 16, &["vs8"]),
    int(49, U8, 16, &["vu8"]),
    int(50, S16, 8, &["vs16"]),
    int(51, U16, 8, &["vu16"]),
    boolean(52, 1, &["bool", "b"]),
    boolean(53, 2, &["2b"]),
    boolean(54, 3, &["3b"]),
    boolean(55, 4, &["4b"]),
    boolean(56, 16, &["vb"]),
    marker(NODE_END, &["nodeEnd"]),
    marker(END_SECTION, &["endSection"]),
];

impl TypeSpec {
    /// Primary alias.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.names[0]
    }

    /// Width of one storage unit, 0 for types without one.
    #[inline]
    pub fn unit_width(&self) -> usize {
        self.unit.map_or(0, StorageUnit::width)
    }

    /// Fixed number of units per value, `None` for variable-length kinds.
    #[inline]
    pub fn fixed_count(&self) -> Option<usize> {
        match self.repeat {
            Repeat::Fixed(count) => Some(count),
            Repeat::Variable => None,
        }
    }

    /// Whether this is a stream marker rather than a node type.
    #[inline]
    pub fn is_marker(&self) -> bool {
        matches!(self.id, ATTR | NODE_END | END_SECTION)
    }

    /// Whether nodes of this type carry no value.
    #[inline]
    pub fn is_void(&self) -> bool {
        self.id == VOID
    }
}

/// Look up a type by wire id.
pub fn lookup_by_id(id: u8) -> Option<&'static TypeSpec> {
    TYPES.iter().find(|spec| spec.id == id)
}

/// Look up a type by any of its aliases.
pub fn lookup_by_name(name: &str) -> Option<&'static TypeSpec> {
    TYPES.iter().find(|spec| spec.names.contains(&name))
}

/// Look up a type by wire id, failing with [`Error::UnknownType`].
pub fn require_id(id: u8) -> Result<&'static TypeSpec> {
    lookup_by_id(id).ok_or(Error::UnknownType(TypeKey::Id(id)))
}

/// Look up a type by alias, failing with [`Error::UnknownType`].
pub fn require_name(name: &str) -> Result<&'static TypeSpec> {
    lookup_by_name(name).ok_or_else(|| Error::UnknownType(TypeKey::Name(name.to_string())))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_ids_and_names_are_unique() {
        let mut ids = HashSet::new();
        let mut names = HashSet::new();
        for spec in TYPES {
            assert!(ids.insert(spec.id), "duplicate id {}", spec.id);
            assert!(spec.id & ARRAY_BIT == 0, "id {} overlaps the array bit", spec.id);
            assert!(!spec.names.is_empty());
            for name in spec.names {
                assert!(names.insert(*name), "duplicate name {}", name);
            }
        }
    }

    #[test]
    fn test_lookup() {
        let spec = lookup_by_name("3u8").unwrap();
        assert_eq!(spec.id, 27);
        assert_eq!(spec.unit, Some(StorageUnit::U8));
        assert_eq!(spec.repeat, Repeat::Fixed(3));

        assert_eq!(lookup_by_name("string").unwrap().id, 11);
        assert_eq!(lookup_by_name("vu16").unwrap().fixed_count(), Some(8));
        assert_eq!(lookup_by_id(12).unwrap().name(), "ip4");
        assert!(lookup_by_id(47).is_none());
        assert!(lookup_by_id(57).is_none());
    }

    #[test]
    fn test_unknown_type() {
        assert!(matches!(require_id(47), Err(Error::UnknownType(TypeKey::Id(47)))));
        assert!(matches!(
            require_name("u128"),
            Err(Error::UnknownType(TypeKey::Name(ref name))) if name == "u128"
        ));
    }

    #[test]
    fn test_markers() {
        assert!(require_id(ATTR).unwrap().is_marker());
        assert!(require_id(NODE_END).unwrap().is_marker());
        assert!(require_id(END_SECTION).unwrap().is_marker());
        assert!(!require_id(VOID).unwrap().is_marker());
        assert_eq!(NODE_END | ARRAY_BIT, 0xFE);
        assert_eq!(END_SECTION | ARRAY_BIT, 0xFF);
    }

    #[test]
    fn test_variable_kinds() {
        let bin = require_name("bin").unwrap();
        assert_eq!(bin.fixed_count(), None);
        assert_eq!(bin.unit_width(), 1);
        assert_eq!(require_name("bool").unwrap().unit, Some(StorageUnit::S8));
    }
}
