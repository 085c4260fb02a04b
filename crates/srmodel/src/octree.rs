//! Spatial index of unit models.
//!
//! A unit model owns a table of terrain groups. Each group points at the root
//! of a shallow tree of nodes; leaves carry compressed triangle strips. The
//! tree is read into an arena and walked with an explicit stack, so malformed
//! pointers surface as errors instead of unbounded recursion.
//!
//! ```text
//! group (0x60 bytes)          node
//! +0x2C flags (bit 0 = hide)  +0x30 strip data ptr (leaf)
//! +0x30 oct id                +0x34 subtree count  i32
//! +0x44 root node ptr         +0x38 child ptrs     u32 * count
//! +0x50 start vertex index
//! ```

use crate::error::Error;
use crate::geometry::{uv_to_texel, Geometry};
use crate::material::{Material, MaterialList, DEFAULT_COLOR};
use crate::{absolute, Polygon, Result};
use common::ByteCursor;

pub const GROUP_STRIDE: u64 = 0x60;
/// Only nodes at or above this depth open their own mesh.
pub const MAX_MERGE_DEPTH: u32 = 0;
pub const MAX_TREE_DEPTH: u32 = 64;
/// Node visits allowed per model, counting every reference to a shared node.
pub const MAX_NODE_VISITS: usize = 1 << 20;

const GROUP_FLAGS: u64 = 0x2C;
const GROUP_OCT_ID: u64 = 0x30;
const GROUP_ROOT: u64 = 0x44;
const GROUP_START_INDEX: u64 = 0x50;

const NODE_STRIPS: u64 = 0x30;
const NODE_SUBTREE_COUNT: u64 = 0x34;

const RUN_END: u32 = 0xFFFF_FFFF;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeGroup {
    pub oct_id: u32,
    pub drawn: bool,
    pub start_index: u32,
    /// Arena index of the root node, `None` for a null root pointer.
    pub root: Option<usize>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TreeNode {
    /// Mesh this node writes into. Nodes below the merge depth share their
    /// ancestor's mesh.
    pub mesh: Option<usize>,
    pub children: Vec<usize>,
    pub is_leaf: bool,
    pub depth: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Mesh {
    /// Vertex base of the group the mesh belongs to.
    pub start_index: u32,
    /// Number of strip indices decoded into this mesh, three per triangle.
    pub index_count: usize,
    /// First polygon of the mesh in the model's polygon buffer.
    pub first_polygon: usize,
    /// Resolved vertex indices, three per polygon, in polygon order.
    pub vertices: Vec<u32>,
}

impl Mesh {
    pub fn polygon_count(&self) -> usize {
        self.index_count / 3
    }

    pub fn polygon_range(&self) -> std::ops::Range<usize> {
        self.first_polygon..self.first_polygon + self.polygon_count()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Octree {
    pub groups: Vec<TreeGroup>,
    pub nodes: Vec<TreeNode>,
    /// Meshes that received at least one triangle, in creation order.
    pub meshes: Vec<Mesh>,
}

impl Octree {
    pub fn node(&self, idx: usize) -> Option<&TreeNode> {
        self.nodes.get(idx)
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|node| node.is_leaf).count()
    }
}

/// One decoded triangle before material resolution. Indices are local to the
/// owning group.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct StripTriangle {
    pub indices: [u16; 3],
    pub texture: u32,
}

#[derive(Debug, Default)]
pub(crate) struct PendingMesh {
    pub start_index: u32,
    pub index_count: usize,
    pub triangles: Vec<StripTriangle>,
}

pub(crate) struct DecodedOctree {
    pub groups: Vec<TreeGroup>,
    pub nodes: Vec<TreeNode>,
    pub meshes: Vec<PendingMesh>,
}

struct Visit {
    pointer: u32,
    depth: u32,
    parent: Option<usize>,
    /// Mesh of the nearest ancestor that owns one.
    inherited_mesh: Option<usize>,
    start_index: u32,
}

pub(crate) fn decode_octree(
    cursor: &mut ByteCursor<'_>,
    data_start: u32,
    group_table: u64,
    group_count: u32,
) -> Result<DecodedOctree> {
    cursor.ensure_table("octree group", group_table, group_count, GROUP_STRIDE)?;

    let mut out = DecodedOctree {
        groups: Vec::with_capacity(group_count as usize),
        nodes: Vec::new(),
        meshes: Vec::new(),
    };

    for t in 0..u64::from(group_count) {
        let base = group_table + t * GROUP_STRIDE;
        let flags = cursor.read_u32_at(base + GROUP_FLAGS)?;
        let oct_id = cursor.read_u32_at(base + GROUP_OCT_ID)?;
        let root_ptr = cursor.read_u32_at(base + GROUP_ROOT)?;
        let start_index = cursor.read_u32_at(base + GROUP_START_INDEX)?;

        let root = if root_ptr == 0 {
            None
        } else {
            Some(out.nodes.len())
        };
        walk_group(
            cursor,
            data_start,
            root_ptr,
            start_index,
            &mut out,
        )?;
        out.groups.push(TreeGroup {
            oct_id,
            drawn: flags & 1 == 0,
            start_index,
            root,
        });
    }

    Ok(out)
}

fn walk_group(
    cursor: &mut ByteCursor<'_>,
    data_start: u32,
    root_ptr: u32,
    start_index: u32,
    out: &mut DecodedOctree,
) -> Result<()> {
    // Pointers of the nodes from the root down to the current one. The walk
    // is preorder, so truncating to a visit's depth leaves its ancestors.
    let mut path: Vec<u64> = Vec::new();
    let mut stack = vec![Visit {
        pointer: root_ptr,
        depth: 0,
        parent: None,
        inherited_mesh: None,
        start_index,
    }];

    while let Some(visit) = stack.pop() {
        if visit.pointer == 0 {
            continue;
        }
        let node_at = absolute(data_start, visit.pointer);
        if visit.depth > MAX_TREE_DEPTH {
            return Err(Error::OctreeTooDeep {
                pointer: node_at,
                max: MAX_TREE_DEPTH,
            });
        }
        // Shared subtrees decode once per reference; only a node that is its
        // own ancestor is a cycle.
        path.truncate(visit.depth as usize);
        if path.contains(&node_at) {
            return Err(Error::OctreeCycle { pointer: node_at });
        }
        path.push(node_at);
        if out.nodes.len() >= MAX_NODE_VISITS {
            return Err(Error::OctreeTooLarge {
                pointer: node_at,
                max: MAX_NODE_VISITS,
            });
        }

        let subtree_count = {
            cursor.seek(node_at + NODE_SUBTREE_COUNT)?;
            cursor.read_i32()?
        };
        if subtree_count < 0 {
            return Err(Error::InvalidSubtreeCount {
                pointer: node_at,
                count: subtree_count,
            });
        }

        let mesh = if visit.depth <= MAX_MERGE_DEPTH {
            out.meshes.push(PendingMesh {
                start_index: visit.start_index,
                ..PendingMesh::default()
            });
            Some(out.meshes.len() - 1)
        } else {
            visit.inherited_mesh
        };

        let node_idx = out.nodes.len();
        out.nodes.push(TreeNode {
            mesh,
            children: Vec::new(),
            is_leaf: subtree_count == 0,
            depth: visit.depth,
        });
        if let Some(parent) = visit.parent {
            out.nodes[parent].children.push(node_idx);
        }

        if subtree_count == 0 {
            let strips = cursor.read_u32_at(node_at + NODE_STRIPS)?;
            if let Some(mesh) = mesh {
                let leaf_at = absolute(data_start, strips);
                decode_leaf(cursor, data_start, leaf_at, &mut out.meshes[mesh])?;
            }
            continue;
        }

        // Positive after the check above.
        let count = subtree_count as u32;
        let children_at = node_at + NODE_SUBTREE_COUNT + 4;
        cursor.ensure_table("octree child", children_at, count, 4)?;
        cursor.seek(children_at)?;
        let mut children = Vec::with_capacity(count as usize);
        for _ in 0..count {
            children.push(cursor.read_u32()?);
        }
        // Reversed so the first child is walked first.
        for &child in children.iter().rev() {
            stack.push(Visit {
                pointer: child,
                depth: visit.depth + 1,
                parent: Some(node_idx),
                inherited_mesh: mesh,
                start_index: visit.start_index,
            });
        }
    }

    Ok(())
}

/// Decodes both strip passes of one leaf into `mesh`.
pub(crate) fn decode_leaf(
    cursor: &mut ByteCursor<'_>,
    data_start: u32,
    leaf_at: u64,
    mesh: &mut PendingMesh,
) -> Result<()> {
    cursor.seek(leaf_at)?;
    let mut next_run = leaf_at;

    // Indexed strips: each run carries a vertex index list and a nested
    // stream of records indexing into it.
    loop {
        let run_len = cursor.read_u32()?;
        if run_len == 0 || run_len == RUN_END {
            break;
        }
        next_run = next_run
            .checked_add(u64::from(run_len))
            .ok_or(Error::IntegerOverflow)?;

        let index_count = cursor.read_u32()?;
        if index_count == 0 {
            continue;
        }
        let outer = cursor.read_u16_array(index_count as usize)?;
        if cursor.position() % 4 != 0 {
            cursor.skip(2)?;
        }

        loop {
            let record_at = cursor.position();
            let count = cursor.read_u32()?;
            if count == 0 {
                break;
            }
            cursor.skip(4)?;
            let texture = cursor.read_u32()?;
            cursor.skip(4)?;
            let next = absolute(data_start, cursor.read_u32()?);
            let inner_at = cursor.position();
            let inner = cursor.read_u16_array(count as usize)?;

            for tri in inner.chunks_exact(3) {
                let mut indices = [0u16; 3];
                for (slot, &i) in indices.iter_mut().zip(tri) {
                    *slot = *outer.get(usize::from(i)).ok_or(Error::StripIndexOutOfRange {
                        offset: inner_at,
                        index: i,
                        len: outer.len(),
                    })?;
                }
                mesh.triangles.push(StripTriangle { indices, texture });
                mesh.index_count += 3;
            }

            if next <= record_at {
                return Err(Error::NonAdvancingStrip {
                    offset: record_at,
                    next,
                });
            }
            cursor.seek(next)?;
        }

        cursor.seek(next_run)?;
    }

    // Direct strips: indices address the group's vertices without a lookup.
    loop {
        let record_at = cursor.position();
        let count = cursor.read_u32()?;
        if count == 0 {
            break;
        }
        cursor.skip(4)?;
        let texture = cursor.read_u32()?;
        cursor.skip(4)?;
        let next = absolute(data_start, cursor.read_u32()?);
        let direct = cursor.read_u16_array(count as usize)?;

        for tri in direct.chunks_exact(3) {
            mesh.triangles.push(StripTriangle {
                indices: [tri[0], tri[1], tri[2]],
                texture,
            });
            mesh.index_count += 3;
        }

        if next <= record_at {
            return Err(Error::NonAdvancingStrip {
                offset: record_at,
                next,
            });
        }
        cursor.seek(next)?;
    }

    Ok(())
}

/// Resolves every pending triangle against the model's vertices and
/// materials. Polygons are appended mesh by mesh; empty meshes are dropped.
pub(crate) fn finalize(
    decoded: DecodedOctree,
    geometry: &Geometry,
    materials: &mut MaterialList,
    polygons: &mut Vec<Polygon>,
) -> Result<Octree> {
    let DecodedOctree {
        groups,
        mut nodes,
        meshes: pending,
    } = decoded;

    let vertex_count = geometry.vertex_count();
    let mut remap = vec![None; pending.len()];
    let mut meshes = Vec::new();

    for (pending_idx, pending_mesh) in pending.into_iter().enumerate() {
        if pending_mesh.index_count == 0 {
            continue;
        }
        let mut mesh = Mesh {
            start_index: pending_mesh.start_index,
            index_count: pending_mesh.index_count,
            first_polygon: polygons.len(),
            vertices: Vec::with_capacity(pending_mesh.index_count),
        };

        for tri in &pending_mesh.triangles {
            let mut vertices = [0u32; 3];
            for (slot, &local) in vertices.iter_mut().zip(&tri.indices) {
                let vertex = u32::from(local)
                    .checked_add(pending_mesh.start_index)
                    .ok_or(Error::IntegerOverflow)?;
                if vertex as usize >= vertex_count {
                    return Err(Error::VertexIndexOutOfRange {
                        polygon: polygons.len(),
                        vertex,
                        vertex_count,
                    });
                }
                *slot = vertex;
            }

            let material = materials.intern(Material::new(tri.texture, DEFAULT_COLOR, true));
            let texels = vertices.map(|idx| {
                let [u, v] = geometry.uvs[idx as usize];
                [uv_to_texel(u), uv_to_texel(v)]
            });
            mesh.vertices.extend_from_slice(&vertices);
            polygons.push(Polygon {
                vertices,
                material,
                texels,
                clut: (tri.texture >> 16) as u16,
            });
        }

        remap[pending_idx] = Some(meshes.len());
        meshes.push(mesh);
    }

    for node in &mut nodes {
        node.mesh = node.mesh.and_then(|m| remap[m]);
    }

    Ok(Octree {
        groups,
        nodes,
        meshes,
    })
}
