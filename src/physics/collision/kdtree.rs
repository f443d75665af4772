//! A kd-tree over primitive bounding boxes, split on the locally largest axis.

use super::{BoundingBox, Primitive};
use crate::{config::ConfigError, math::Vec3};

/// Parameters controlling how deep a [`KdTree`] subdivides.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde-types", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-types", serde(default))]
pub struct KdTreeParams {
    /// Nodes with at most this many items are not split.
    pub max_leaf_items: usize,
    pub max_depth: usize,
    /// Nodes thinner than this along their longest axis are not split.
    pub min_split_extent: f32,
    /// How many levels in a row a split may leave all items on one side
    /// before the split is undone.
    pub max_unproductive_levels: usize,
}

impl Default for KdTreeParams {
    fn default() -> Self {
        Self {
            max_leaf_items: 4,
            max_depth: 64,
            min_split_extent: 1.0e-4,
            max_unproductive_levels: 8,
        }
    }
}

impl KdTreeParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        const TREE: &str = "kd-tree";
        if self.max_leaf_items == 0 {
            return Err(ConfigError::LeafSize { tree: TREE });
        }
        if self.max_depth == 0 {
            return Err(ConfigError::MaxDepth { tree: TREE });
        }
        if !(self.min_split_extent.is_finite() && self.min_split_extent >= 0.0) {
            return Err(ConfigError::SplitExtent {
                tree: TREE,
                value: self.min_split_extent,
            });
        }
        Ok(())
    }
}

//
// Internal types
//

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    #[inline]
    fn min_of(self, bb: &BoundingBox) -> f32 {
        match self {
            Axis::X => bb.left,
            Axis::Y => bb.top,
            Axis::Z => bb.z_low,
        }
    }

    #[inline]
    fn max_of(self, bb: &BoundingBox) -> f32 {
        match self {
            Axis::X => bb.right,
            Axis::Y => bb.bottom,
            Axis::Z => bb.z_high,
        }
    }

    #[inline]
    fn mid_of(self, bb: &BoundingBox) -> f32 {
        (self.min_of(bb) + self.max_of(bb)) * 0.5
    }

    /// The two halves of `bb` on either side of `mid`.
    fn split(self, bb: &BoundingBox, mid: f32) -> (BoundingBox, BoundingBox) {
        let (mut lo, mut hi) = (*bb, *bb);
        match self {
            Axis::X => {
                lo.right = mid;
                hi.left = mid;
            }
            Axis::Y => {
                lo.bottom = mid;
                hi.top = mid;
            }
            Axis::Z => {
                lo.z_high = mid;
                hi.z_low = mid;
            }
        }
        (lo, hi)
    }
}

#[derive(Clone, Copy, Debug)]
struct Node {
    bounds: BoundingBox,
    /// Items held directly by this node are `order[start..start + count]`.
    /// After a split these are the ones straddling the split plane.
    start: u32,
    count: u32,
    axis: Axis,
    /// Index of the first of two consecutive children.
    children: Option<u32>,
}

enum Side {
    Low,
    High,
    Straddle,
}

//
// Tree itself
//

/// A kd-tree built once over a slice of primitives.
///
/// Items are referred to by their index in that slice.
/// Primitives with unbounded boxes (planes) are kept aside and offered to every query.
#[derive(Clone, Debug)]
pub struct KdTree {
    nodes: Vec<Node>,
    /// Maximum number of nodes, fixed at build time.
    capacity: usize,
    /// Item indices, permuted so that every node's items are contiguous.
    order: Vec<u32>,
    /// Bounding boxes of all primitives at build time.
    boxes: Vec<BoundingBox>,
    unbounded: Vec<u32>,
    params: KdTreeParams,
    depth: usize,
    /// Splits skipped because the node pool was full.
    exhausted: usize,
}

impl KdTree {
    /// Build with default parameters.
    pub fn build(prims: &[Primitive]) -> Self {
        Self::build_unchecked(prims, KdTreeParams::default(), None)
    }

    pub fn build_with(prims: &[Primitive], params: &KdTreeParams) -> Result<Self, ConfigError> {
        params.validate()?;
        Ok(Self::build_unchecked(prims, *params, None))
    }

    /// `max_nodes` caps the node pool below its usual `2 * n + 1`.
    fn build_unchecked(prims: &[Primitive], params: KdTreeParams, max_nodes: Option<usize>) -> Self {
        let _span = tracy_span!("build kd-tree", "build_unchecked");

        let boxes: Vec<BoundingBox> = prims.iter().map(|p| *p.bounds()).collect();
        let mut order = Vec::with_capacity(prims.len());
        let mut unbounded = Vec::new();
        let mut root_bounds = BoundingBox::EMPTY;
        for (idx, bb) in boxes.iter().enumerate() {
            if !bb.is_valid() {
                continue;
            }
            if bb.is_finite() {
                order.push(idx as u32);
                root_bounds.extend(bb);
            } else {
                unbounded.push(idx as u32);
            }
        }

        let item_count = order.len();
        let capacity = max_nodes.map_or(2 * item_count + 1, |max| max.clamp(1, 2 * item_count + 1));
        let mut nodes = Vec::with_capacity(capacity);
        nodes.push(Node {
            bounds: root_bounds,
            start: 0,
            count: item_count as u32,
            axis: Axis::X,
            children: None,
        });

        let mut tree = Self {
            nodes,
            capacity,
            order,
            boxes,
            unbounded,
            params,
            depth: 0,
            exhausted: 0,
        };

        let mut tmp = vec![0u32; item_count];
        tree.subdivide(0, 0, 0, &mut tmp);
        if tree.exhausted > 0 {
            log::warn!(
                "kd-tree node pool ran out {} times, affected nodes were left as leaves",
                tree.exhausted
            );
        }

        log::debug!(
            "built kd-tree: {} items ({} unbounded), {} nodes, depth {}",
            item_count,
            tree.unbounded.len(),
            tree.nodes.len(),
            tree.depth
        );
        tree
    }

    fn side(&self, item: u32, axis: Axis, mid: f32) -> Side {
        let bb = &self.boxes[item as usize];
        if axis.max_of(bb) < mid {
            Side::Low
        } else if axis.min_of(bb) > mid {
            Side::High
        } else {
            Side::Straddle
        }
    }

    /// Union of the boxes of `order[start..start + count]`.
    fn items_bounds(&self, start: usize, count: usize) -> BoundingBox {
        self.order[start..start + count]
            .iter()
            .fold(BoundingBox::EMPTY, |mut bb, &item| {
                bb.extend(&self.boxes[item as usize]);
                bb
            })
    }

    fn subdivide(&mut self, node_idx: usize, level: usize, level_empty: usize, tmp: &mut [u32]) {
        self.depth = self.depth.max(level);

        let node = self.nodes[node_idx];
        let count = node.count as usize;
        if count <= self.params.max_leaf_items || level >= self.params.max_depth {
            return;
        }

        let bounds = node.bounds;
        let extents = [bounds.width(), bounds.height(), bounds.depth()];
        let axis = if extents[0] >= extents[1] && extents[0] >= extents[2] {
            Axis::X
        } else if extents[1] >= extents[2] {
            Axis::Y
        } else {
            Axis::Z
        };
        if axis.max_of(&bounds) - axis.min_of(&bounds) < self.params.min_split_extent {
            return;
        }

        if self.nodes.len() + 2 > self.capacity {
            self.exhausted += 1;
            return;
        }
        let mid = axis.mid_of(&bounds);
        let (lo_bounds, hi_bounds) = axis.split(&bounds, mid);
        let first_child = self.nodes.len();
        self.nodes.push(Node {
            bounds: lo_bounds,
            start: 0,
            count: 0,
            axis: Axis::X,
            children: None,
        });
        self.nodes.push(Node {
            bounds: hi_bounds,
            start: 0,
            count: 0,
            axis: Axis::X,
            children: None,
        });

        let start = node.start as usize;
        let range = start..start + count;
        let (mut n_lo, mut n_hi) = (0, 0);
        for &item in &self.order[range.clone()] {
            match self.side(item, axis, mid) {
                Side::Low => n_lo += 1,
                Side::High => n_hi += 1,
                Side::Straddle => {}
            }
        }
        let n_straddle = count - n_lo - n_hi;

        let nonempty = [n_lo, n_hi, n_straddle].iter().filter(|n| **n > 0).count();
        let level_empty = if nonempty < 2 { level_empty + 1 } else { 0 };
        if level_empty > self.params.max_unproductive_levels {
            // all that splitting didn't separate anything, give the nodes back
            log::trace!(
                "kd-tree: undoing split of {} items at level {} after {} unproductive levels",
                count,
                level,
                level_empty
            );
            self.nodes.truncate(first_child);
            return;
        }

        // straddling items are compacted in place at the front,
        // the others go through `tmp` to their child's range at the back
        let lo_start = start + n_straddle;
        let hi_start = lo_start + n_lo;
        let (mut kept, mut lo_fill, mut hi_fill) = (0, 0, 0);
        for i in range {
            let item = self.order[i];
            match self.side(item, axis, mid) {
                Side::Low => {
                    tmp[lo_start + lo_fill] = item;
                    lo_fill += 1;
                }
                Side::High => {
                    tmp[hi_start + hi_fill] = item;
                    hi_fill += 1;
                }
                Side::Straddle => {
                    self.order[start + kept] = item;
                    kept += 1;
                }
            }
        }
        let end = start + count;
        self.order[lo_start..end].copy_from_slice(&tmp[lo_start..end]);

        let node = &mut self.nodes[node_idx];
        node.count = n_straddle as u32;
        node.axis = axis;
        node.children = Some(first_child as u32);
        // children cover the space their items occupy, empty ones keep their half
        for (child, child_start, child_count) in
            [(first_child, lo_start, n_lo), (first_child + 1, hi_start, n_hi)]
        {
            if child_count > 0 {
                self.nodes[child].bounds = self.items_bounds(child_start, child_count);
            }
            self.nodes[child].start = child_start as u32;
            self.nodes[child].count = child_count as u32;
        }

        self.subdivide(first_child, level + 1, level_empty, tmp);
        self.subdivide(first_child + 1, level + 1, level_empty, tmp);
    }

    /// Call `visit` with the index of every primitive whose bounding box touches
    /// the sphere at `center` with squared radius `radius_sq`.
    /// Every such primitive is visited exactly once, in no particular order.
    pub fn query<F: FnMut(usize)>(&self, center: Vec3, radius_sq: f32, mut visit: F) {
        for &item in &self.unbounded {
            if self.boxes[item as usize].intersects_sphere(center, radius_sq) {
                visit(item as usize);
            }
        }
        let ball_box = BoundingBox::around_sphere(center, radius_sq.sqrt());
        self.query_node(0, center, radius_sq, &ball_box, &mut visit);
    }

    fn query_node<F: FnMut(usize)>(
        &self,
        node_idx: usize,
        center: Vec3,
        radius_sq: f32,
        ball_box: &BoundingBox,
        visit: &mut F,
    ) {
        let node = &self.nodes[node_idx];
        let start = node.start as usize;
        for &item in &self.order[start..start + node.count as usize] {
            if self.boxes[item as usize].intersects_sphere(center, radius_sq) {
                visit(item as usize);
            }
        }

        if let Some(first_child) = node.children {
            let first_child = first_child as usize;
            let mid = node.axis.mid_of(&node.bounds);
            if node.axis.min_of(ball_box) <= mid {
                self.query_node(first_child, center, radius_sq, ball_box, visit);
            }
            if node.axis.max_of(ball_box) >= mid {
                self.query_node(first_child + 1, center, radius_sq, ball_box, visit);
            }
        }
    }

    /// Number of primitives in the tree, including unbounded ones.
    pub fn len(&self) -> usize {
        self.order.len() + self.unbounded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Deepest level reached while building. The root is level 0.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Upper bound on `node_count`, fixed by the number of items.
    pub fn node_capacity(&self) -> usize {
        self.capacity
    }

    pub fn bounds(&self) -> &BoundingBox {
        &self.nodes[0].bounds
    }
}
