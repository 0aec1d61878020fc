//! Binary dataset hierarchy walker.
//!
//! The binary source is a container with the layout
//!
//! ```text
//! collection/
//!   geometry_<g>/
//!     vertex                 (N x 3 coordinates)
//!     state_<s>/
//!       dataset_<i>/
//!         <leaf arrays>
//! ```
//!
//! The container itself is consumed through the [`DatasetTree`] trait.
//! Indexed groups are enumerated from 0 until the hierarchy reports no
//! further group. `dataset_<i>` indices belong to the storage hierarchy
//! only; they carry no relation to the order of same-named segments in a
//! text document.

use crate::error::{FieldError, Result};
use crate::types::{DatasetTreeNode, ElementKind, MeshCoverage};
use tracing::debug;

/// Name of the root collection group.
pub const COLLECTION: &str = "collection";
/// Prefix of geometry groups.
pub const GEOMETRY_PREFIX: &str = "geometry_";
/// Prefix of state groups.
pub const STATE_PREFIX: &str = "state_";
/// Prefix of dataset groups.
pub const DATASET_PREFIX: &str = "dataset_";
/// Mesh vertex array under a geometry group.
pub const VERTEX_LEAF: &str = "vertex";

/// Shape and element type of a leaf array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayInfo {
    /// Dimensions, outermost first
    pub shape: Vec<usize>,
    /// Stored element type
    pub element_kind: ElementKind,
}

impl ArrayInfo {
    /// Total element count (1 for a scalar).
    pub fn size(&self) -> usize {
        self.shape.iter().product()
    }
}

/// Grouping and indexing API of a hierarchical container.
///
/// Paths are `/`-separated and relative to the container root.
pub trait DatasetTree {
    /// Whether a group or array exists at `path`.
    fn contains(&self, path: &str) -> bool;

    /// Whether `path` names a group.
    fn is_group(&self, path: &str) -> bool;

    /// Names of the direct members of the group at `path`.
    fn members(&self, path: &str) -> Result<Vec<String>>;

    /// Shape and element type of the array at `path`.
    fn array_info(&self, path: &str) -> Result<ArrayInfo>;

    /// Read up to `limit` elements of the array at `path` as `f64`.
    fn read_array(&self, path: &str, limit: Option<usize>) -> Result<Vec<f64>>;
}

/// Join two path fragments with a single `/`.
pub fn join_path(parent: &str, child: &str) -> String {
    let parent = parent.trim_end_matches('/');
    let child = child.trim_start_matches('/');
    if parent.is_empty() {
        child.to_string()
    } else {
        format!("{}/{}", parent, child)
    }
}

/// Leaves found under one state group.
#[derive(Debug, Default)]
pub struct StateWalk {
    /// Leaves in walk order: by group index, then member order
    pub nodes: Vec<DatasetTreeNode>,
    /// Members that could not be described
    pub errors: Vec<FieldError>,
}

/// Enumerate every leaf array under `state_path/dataset_<i>`.
///
/// Fails only if `state_path` itself is not a group. A dataset group that
/// cannot be listed is recorded in `errors` and the walk moves on.
pub fn walk_state<T: DatasetTree + ?Sized>(tree: &T, state_path: &str) -> Result<StateWalk> {
    if !tree.is_group(state_path) {
        return Err(FieldError::structure(state_path, "state group not found"));
    }

    let mut walk = StateWalk::default();
    for index in 0.. {
        let group_name = format!("{}{}", DATASET_PREFIX, index);
        let group_path = join_path(state_path, &group_name);
        if !tree.contains(&group_path) {
            break;
        }
        if !tree.is_group(&group_path) {
            walk.errors
                .push(FieldError::structure(&group_path, "expected a dataset group"));
            continue;
        }

        let members = match tree.members(&group_path) {
            Ok(members) => members,
            Err(err) => {
                walk.errors.push(err);
                continue;
            }
        };
        for leaf_name in members {
            let leaf_path = join_path(&group_path, &leaf_name);
            if tree.is_group(&leaf_path) {
                continue;
            }
            match tree.array_info(&leaf_path) {
                Ok(info) => walk.nodes.push(DatasetTreeNode {
                    group_index: index,
                    path: join_path(&group_name, &leaf_name),
                    leaf_name,
                    size: info.size(),
                    shape: info.shape,
                    element_kind: info.element_kind,
                }),
                Err(err) => walk.errors.push(err),
            }
        }
    }

    debug!(
        state = state_path,
        leaves = walk.nodes.len(),
        errors = walk.errors.len(),
        "walked state group"
    );
    Ok(walk)
}

/// Order leaves by size, largest first; ties keep walk order.
pub fn rank_by_size(nodes: &[DatasetTreeNode]) -> Vec<DatasetTreeNode> {
    let mut ranked = nodes.to_vec();
    ranked.sort_by(|a, b| b.size.cmp(&a.size));
    ranked
}

/// Every leaf sharing the maximum size, in walk order.
pub fn tied_max(nodes: &[DatasetTreeNode]) -> Vec<DatasetTreeNode> {
    let Some(max) = nodes.iter().map(|n| n.size).max() else {
        return Vec::new();
    };
    nodes.iter().filter(|n| n.size == max).cloned().collect()
}

/// Mesh point count from the `vertex` array of a geometry group.
pub fn vertex_count<T: DatasetTree + ?Sized>(tree: &T, geometry_path: &str) -> Result<usize> {
    let path = join_path(geometry_path, VERTEX_LEAF);
    if !tree.contains(&path) {
        return Err(FieldError::structure(path, "vertex array not found"));
    }
    let info = tree.array_info(&path)?;
    info.shape
        .first()
        .copied()
        .ok_or_else(|| FieldError::structure(path, "vertex array has no dimensions"))
}

/// Compare the largest field size against the mesh vertex count.
pub fn cross_check(max_size: usize, vertices: usize) -> MeshCoverage {
    if max_size == vertices {
        MeshCoverage::WholeMesh
    } else {
        MeshCoverage::Mismatch {
            difference: max_size as i64 - vertices as i64,
        }
    }
}

/// A geometry group and one of its state groups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateLocation {
    /// `collection/geometry_<g>`
    pub geometry_path: String,
    /// `collection/geometry_<g>/state_<s>`
    pub state_path: String,
}

/// Enumerate every `geometry_<g>/state_<s>` pair under `root`.
pub fn locate_states<T: DatasetTree + ?Sized>(tree: &T, root: &str) -> Result<Vec<StateLocation>> {
    if !tree.is_group(root) {
        return Err(FieldError::structure(root, "collection group not found"));
    }

    let mut found = Vec::new();
    for g in 0.. {
        let geometry_path = join_path(root, &format!("{}{}", GEOMETRY_PREFIX, g));
        if !tree.is_group(&geometry_path) {
            break;
        }
        for s in 0.. {
            let state_path = join_path(&geometry_path, &format!("{}{}", STATE_PREFIX, s));
            if !tree.is_group(&state_path) {
                break;
            }
            found.push(StateLocation {
                geometry_path: geometry_path.clone(),
                state_path,
            });
        }
    }
    Ok(found)
}
