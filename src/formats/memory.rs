//! In-memory dataset hierarchy.
//!
//! [`MemoryTree`] implements [`DatasetTree`] over nested groups held in
//! memory. Arrays can be inserted as decoded values, as raw little-endian
//! bytes, or loaded from a JSON manifest:
//!
//! ```json
//! { "collection": { "type": "group", "members": {
//!     "geometry_0": { "type": "group", "members": {
//!         "vertex": { "type": "array", "kind": "float64", "shape": [2, 3],
//!                     "values": [0, 0, 0, 1, 0, 0] } } } } } }
//! ```
//!
//! Group members are kept in name order.

use crate::error::{FieldError, Result};
use crate::formats::tree::{ArrayInfo, DatasetTree};
use crate::types::ElementKind;
use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A group or array in a [`MemoryTree`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TreeEntry {
    /// Named members, in name order
    Group {
        /// Child entries by name
        #[serde(default)]
        members: BTreeMap<String, TreeEntry>,
    },
    /// Leaf array with decoded values
    Array {
        /// Stored element type
        kind: ElementKind,
        /// Dimensions, outermost first
        shape: Vec<usize>,
        /// Row-major values; empty for non-numeric kinds
        #[serde(default)]
        values: Vec<f64>,
    },
}

impl TreeEntry {
    fn group() -> Self {
        TreeEntry::Group {
            members: BTreeMap::new(),
        }
    }
}

/// Dataset hierarchy held entirely in memory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoryTree {
    root: BTreeMap<String, TreeEntry>,
}

fn components(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|c| !c.is_empty())
}

impl MemoryTree {
    /// Empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a tree from a JSON manifest.
    pub fn from_json(json: &str) -> Result<Self> {
        let tree: Self = serde_json::from_str(json)
            .map_err(|e| FieldError::structure("manifest", e.to_string()))?;
        check_shapes("", &tree.root)?;
        Ok(tree)
    }

    /// Serialize the tree as a JSON manifest.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| FieldError::Config {
            message: e.to_string(),
        })
    }

    /// Create a group and any missing parents.
    pub fn insert_group(&mut self, path: &str) -> Result<()> {
        self.group_mut(path).map(|_| ())
    }

    /// Insert an array of decoded values, creating parent groups.
    ///
    /// Numeric arrays must hold exactly `shape.iter().product()` values.
    pub fn insert_array(
        &mut self,
        path: &str,
        kind: ElementKind,
        shape: Vec<usize>,
        values: Vec<f64>,
    ) -> Result<()> {
        let size: usize = shape.iter().product();
        if kind.is_numeric() && values.len() != size {
            return Err(FieldError::structure(
                path,
                format!("shape {:?} needs {} values, got {}", shape, size, values.len()),
            ));
        }

        let (parent, leaf) = match path.trim_end_matches('/').rsplit_once('/') {
            Some((parent, leaf)) => (parent, leaf),
            None => ("", path.trim_end_matches('/')),
        };
        if leaf.is_empty() {
            return Err(FieldError::structure(path, "array path has no name"));
        }
        let members = self.group_mut(parent)?;
        if let Some(TreeEntry::Group { .. }) = members.get(leaf) {
            return Err(FieldError::structure(path, "a group already exists here"));
        }
        members.insert(leaf.to_string(), TreeEntry::Array { kind, shape, values });
        Ok(())
    }

    /// Insert an array from raw little-endian element bytes.
    pub fn insert_raw(
        &mut self,
        path: &str,
        kind: ElementKind,
        shape: Vec<usize>,
        bytes: &[u8],
    ) -> Result<()> {
        let values = decode_le(path, &kind, bytes)?;
        self.insert_array(path, kind, shape, values)
    }

    fn entry(&self, path: &str) -> Option<&TreeEntry> {
        let mut parts = components(path);
        let mut current = self.root.get(parts.next()?)?;
        for part in parts {
            match current {
                TreeEntry::Group { members } => current = members.get(part)?,
                TreeEntry::Array { .. } => return None,
            }
        }
        Some(current)
    }

    fn group_mut(&mut self, path: &str) -> Result<&mut BTreeMap<String, TreeEntry>> {
        let mut members = &mut self.root;
        for part in components(path) {
            members = match members.entry(part.to_string()).or_insert_with(TreeEntry::group) {
                TreeEntry::Group { members: inner } => inner,
                TreeEntry::Array { .. } => {
                    return Err(FieldError::structure(path, format!("{} is an array", part)));
                }
            };
        }
        Ok(members)
    }
}

/// Reject numeric arrays whose values do not fill their shape.
fn check_shapes(prefix: &str, members: &BTreeMap<String, TreeEntry>) -> Result<()> {
    for (name, entry) in members {
        let path = crate::formats::tree::join_path(prefix, name);
        match entry {
            TreeEntry::Group { members } => check_shapes(&path, members)?,
            TreeEntry::Array { kind, shape, values } => {
                let size: usize = shape.iter().product();
                if kind.is_numeric() && values.len() != size {
                    return Err(FieldError::structure(
                        path,
                        format!("shape {:?} needs {} values, got {}", shape, size, values.len()),
                    ));
                }
            }
        }
    }
    Ok(())
}

/// Decode little-endian elements of `kind` to `f64`.
fn decode_le(path: &str, kind: &ElementKind, bytes: &[u8]) -> Result<Vec<f64>> {
    let width = kind
        .byte_width()
        .ok_or_else(|| FieldError::structure(path, format!("cannot decode element type {}", kind)))?;
    if bytes.len() % width != 0 {
        return Err(FieldError::structure(
            path,
            format!("{} bytes is not a multiple of the {}-byte element width", bytes.len(), width),
        ));
    }

    let chunks = bytes.chunks_exact(width);
    let values = match kind {
        ElementKind::Float64 => chunks.map(LittleEndian::read_f64).collect(),
        ElementKind::Float32 => chunks.map(|c| LittleEndian::read_f32(c) as f64).collect(),
        ElementKind::Int64 => chunks.map(|c| LittleEndian::read_i64(c) as f64).collect(),
        ElementKind::Int32 => chunks.map(|c| LittleEndian::read_i32(c) as f64).collect(),
        ElementKind::UInt8 => bytes.iter().map(|&b| f64::from(b)).collect(),
        ElementKind::Other(_) => Vec::new(),
    };
    Ok(values)
}

impl DatasetTree for MemoryTree {
    fn contains(&self, path: &str) -> bool {
        components(path).next().is_none() || self.entry(path).is_some()
    }

    fn is_group(&self, path: &str) -> bool {
        components(path).next().is_none() || matches!(self.entry(path), Some(TreeEntry::Group { .. }))
    }

    fn members(&self, path: &str) -> Result<Vec<String>> {
        if components(path).next().is_none() {
            return Ok(self.root.keys().cloned().collect());
        }
        match self.entry(path) {
            Some(TreeEntry::Group { members }) => Ok(members.keys().cloned().collect()),
            Some(TreeEntry::Array { .. }) => Err(FieldError::structure(path, "not a group")),
            None => Err(FieldError::structure(path, "no such group")),
        }
    }

    fn array_info(&self, path: &str) -> Result<ArrayInfo> {
        match self.entry(path) {
            Some(TreeEntry::Array { kind, shape, .. }) => Ok(ArrayInfo {
                shape: shape.clone(),
                element_kind: kind.clone(),
            }),
            Some(TreeEntry::Group { .. }) => Err(FieldError::structure(path, "not an array")),
            None => Err(FieldError::structure(path, "no such array")),
        }
    }

    fn read_array(&self, path: &str, limit: Option<usize>) -> Result<Vec<f64>> {
        match self.entry(path) {
            Some(TreeEntry::Array { kind, values, .. }) => {
                if !kind.is_numeric() {
                    return Err(FieldError::structure(
                        path,
                        format!("element type {} is not numeric", kind),
                    ));
                }
                let n = limit.map_or(values.len(), |l| l.min(values.len()));
                Ok(values[..n].to_vec())
            }
            Some(TreeEntry::Group { .. }) => Err(FieldError::structure(path, "not an array")),
            None => Err(FieldError::structure(path, "no such array")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_insert_and_read() {
        let mut tree = MemoryTree::new();
        tree.insert_array("a/b/c", ElementKind::Float64, vec![3], vec![0.1, 0.2, 0.3])
            .unwrap();
        assert!(tree.is_group("a"));
        assert!(tree.is_group("a/b"));
        assert!(!tree.is_group("a/b/c"));
        assert!(tree.contains("a/b/c"));
        assert!(!tree.contains("a/x"));
        assert_eq!(tree.members("a/b").unwrap(), vec!["c".to_string()]);
        assert_eq!(tree.read_array("a/b/c", Some(2)).unwrap(), vec![0.1, 0.2]);
        assert_eq!(tree.array_info("a/b/c").unwrap().size(), 3);
    }

    #[test]
    fn test_shape_mismatch_is_rejected() {
        let mut tree = MemoryTree::new();
        let err = tree
            .insert_array("x", ElementKind::Float64, vec![2, 2], vec![1.0])
            .unwrap_err();
        assert!(matches!(err, FieldError::Structure { .. }));
    }

    #[test]
    fn test_array_blocks_group_creation() {
        let mut tree = MemoryTree::new();
        tree.insert_array("x", ElementKind::Int32, vec![1], vec![1.0]).unwrap();
        assert!(tree.insert_group("x/y").is_err());
    }

    #[test]
    fn test_insert_raw_little_endian() {
        let mut bytes = Vec::new();
        for v in [0.0f64, 0.5, 1.0] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        let mut tree = MemoryTree::new();
        tree.insert_raw("f", ElementKind::Float64, vec![3], &bytes).unwrap();
        assert_eq!(tree.read_array("f", None).unwrap(), vec![0.0, 0.5, 1.0]);

        let ints: Vec<u8> = [7i32, -2].iter().flat_map(|v| v.to_le_bytes()).collect();
        tree.insert_raw("i", ElementKind::Int32, vec![2], &ints).unwrap();
        assert_eq!(tree.read_array("i", None).unwrap(), vec![7.0, -2.0]);

        assert!(tree.insert_raw("bad", ElementKind::Float32, vec![1], &[0, 1, 2]).is_err());
    }

    #[test]
    fn test_non_numeric_read_fails() {
        let mut tree = MemoryTree::new();
        tree.insert_array("s", ElementKind::Other("string".into()), vec![4], Vec::new())
            .unwrap();
        assert_eq!(tree.array_info("s").unwrap().size(), 4);
        assert!(tree.read_array("s", None).is_err());
    }

    #[test]
    fn test_json_manifest_round_trip() {
        let json = r#"{
            "collection": { "type": "group", "members": {
                "geometry_0": { "type": "group", "members": {
                    "vertex": { "type": "array", "kind": "float64", "shape": [2, 3],
                                "values": [0, 0, 0, 1, 0, 0] }
                }}
            }}
        }"#;
        let tree = MemoryTree::from_json(json).unwrap();
        assert_eq!(
            tree.array_info("collection/geometry_0/vertex").unwrap().shape,
            vec![2, 3]
        );
        let again = MemoryTree::from_json(&tree.to_json().unwrap()).unwrap();
        assert_eq!(again, tree);
    }

    #[test]
    fn test_manifest_shape_checked() {
        let json = r#"{ "v": { "type": "array", "kind": "float64", "shape": [3], "values": [1] } }"#;
        assert!(MemoryTree::from_json(json).is_err());
        assert!(MemoryTree::from_json("not json").is_err());
    }

    #[test]
    fn test_root_is_group() {
        let mut tree = MemoryTree::new();
        tree.insert_group("collection").unwrap();
        assert!(tree.is_group(""));
        assert_eq!(tree.members("").unwrap(), vec!["collection".to_string()]);
    }
}
