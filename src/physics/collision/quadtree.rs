//! A quadtree over primitive bounding boxes, split in the XY plane only.
//!
//! Tables are mostly flat, so splitting on height rarely pays off.
//! Nodes remember when everything under them belongs to one item,
//! which lets [`QuadTree::query_filtered`] skip whole subtrees of items
//! that currently can't be collided with.

use super::{primitive::ItemHandle, BoundingBox, Primitive};
use crate::{
    config::ConfigError,
    math::{Vec2, Vec3},
};

/// Parameters controlling how deep a [`QuadTree`] subdivides.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde-types", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-types", serde(default))]
pub struct QuadTreeParams {
    /// Nodes with at most this many items are not split.
    pub max_leaf_items: usize,
    pub max_depth: usize,
    /// Nodes no wider than this fraction of the root are not split.
    pub min_relative_extent: f32,
    /// How many levels in a row a split may leave at most one of its five buckets
    /// (four quadrants and the straddlers) occupied before it is undone.
    pub max_unproductive_levels: usize,
}

impl Default for QuadTreeParams {
    fn default() -> Self {
        Self {
            max_leaf_items: 4,
            max_depth: 42,
            min_relative_extent: 1.0e-4,
            max_unproductive_levels: 8,
        }
    }
}

impl QuadTreeParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        const TREE: &str = "quadtree";
        if self.max_leaf_items == 0 {
            return Err(ConfigError::LeafSize { tree: TREE });
        }
        if self.max_depth == 0 {
            return Err(ConfigError::MaxDepth { tree: TREE });
        }
        if !(self.min_relative_extent.is_finite() && self.min_relative_extent >= 0.0) {
            return Err(ConfigError::SplitExtent {
                tree: TREE,
                value: self.min_relative_extent,
            });
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
struct Node {
    bounds: BoundingBox,
    center: Vec2,
    /// Leaf items, or the items straddling `center` if the node was split.
    items: Vec<u32>,
    /// Index of the first of four consecutive children,
    /// ordered with bit 0 set for the +X side and bit 1 for the +Y side.
    children: Option<u32>,
    /// The owner shared by every item in this subtree, if there is one.
    unique_owner: Option<ItemHandle>,
}

impl Node {
    fn new(bounds: BoundingBox) -> Self {
        Self {
            bounds,
            center: bounds.center_xy(),
            items: Vec::new(),
            children: None,
            unique_owner: None,
        }
    }
}

/// A quadtree built once over a slice of primitives.
///
/// Items are referred to by their index in that slice.
/// Primitives with unbounded boxes (planes) are kept aside and offered to every query.
#[derive(Clone, Debug)]
pub struct QuadTree {
    nodes: Vec<Node>,
    boxes: Vec<BoundingBox>,
    owners: Vec<Option<ItemHandle>>,
    unbounded: Vec<u32>,
    params: QuadTreeParams,
    min_width: f32,
    item_count: usize,
    depth: usize,
}

impl QuadTree {
    /// Build with default parameters.
    pub fn build(prims: &[Primitive]) -> Self {
        Self::build_unchecked(prims, QuadTreeParams::default())
    }

    pub fn build_with(prims: &[Primitive], params: &QuadTreeParams) -> Result<Self, ConfigError> {
        params.validate()?;
        Ok(Self::build_unchecked(prims, *params))
    }

    fn build_unchecked(prims: &[Primitive], params: QuadTreeParams) -> Self {
        let _span = tracy_span!("build quadtree", "build_unchecked");

        let boxes: Vec<BoundingBox> = prims.iter().map(|p| *p.bounds()).collect();
        let owners: Vec<Option<ItemHandle>> = prims.iter().map(|p| p.props.owner).collect();

        let mut items = Vec::with_capacity(prims.len());
        let mut unbounded = Vec::new();
        let mut root_bounds = BoundingBox::EMPTY;
        for (idx, bb) in boxes.iter().enumerate() {
            if !bb.is_valid() {
                continue;
            }
            if bb.is_finite() {
                items.push(idx as u32);
                root_bounds.extend(bb);
            } else {
                unbounded.push(idx as u32);
            }
        }

        let item_count = items.len();
        let mut root = Node::new(root_bounds);
        root.items = items;
        let min_width = if item_count > 0 {
            root_bounds.width() * params.min_relative_extent
        } else {
            0.0
        };

        let mut tree = Self {
            nodes: vec![root],
            boxes,
            owners,
            unbounded,
            params,
            min_width,
            item_count,
            depth: 0,
        };
        tree.subdivide(0, 0, 0);

        log::debug!(
            "built quadtree: {} items ({} unbounded), {} nodes, depth {}",
            item_count,
            tree.unbounded.len(),
            tree.nodes.len(),
            tree.depth
        );
        tree
    }

    fn shared_owner(&self, items: &[u32]) -> Option<ItemHandle> {
        let (first, rest) = items.split_first()?;
        let owner = self.owners[*first as usize]?;
        rest.iter()
            .all(|i| self.owners[*i as usize] == Some(owner))
            .then_some(owner)
    }

    /// Which quadrant `bb` lies in entirely, if any.
    fn quadrant(bb: &BoundingBox, center: Vec2) -> Option<usize> {
        let x = if bb.right < center.x {
            0
        } else if bb.left > center.x {
            1
        } else {
            return None;
        };
        let y = if bb.bottom < center.y {
            0
        } else if bb.top > center.y {
            2
        } else {
            return None;
        };
        Some(x | y)
    }

    fn subdivide(&mut self, node_idx: usize, level: usize, level_empty: usize) {
        self.depth = self.depth.max(level);

        let owner = self.shared_owner(&self.nodes[node_idx].items);
        let node = &mut self.nodes[node_idx];
        node.unique_owner = owner;
        if node.items.len() <= self.params.max_leaf_items
            || level >= self.params.max_depth
            || node.bounds.width() <= self.min_width
        {
            return;
        }

        let center = node.center;
        let bounds = node.bounds;
        let items = std::mem::take(&mut node.items);
        let mut quadrants: [Vec<u32>; 4] = Default::default();
        let mut remain = Vec::new();
        for item in items {
            match Self::quadrant(&self.boxes[item as usize], center) {
                Some(q) => quadrants[q].push(item),
                None => remain.push(item),
            }
        }

        let empty_buckets = quadrants.iter().filter(|q| q.is_empty()).count()
            + usize::from(remain.is_empty());
        let level_empty = if empty_buckets >= 4 { level_empty + 1 } else { 0 };
        if level_empty > self.params.max_unproductive_levels {
            log::trace!(
                "quadtree: undoing split at level {} after {} unproductive levels",
                level,
                level_empty
            );
            let node = &mut self.nodes[node_idx];
            node.items = remain;
            node.items.extend(quadrants.into_iter().flatten());
            return;
        }

        let first_child = self.nodes.len();
        for (q, q_items) in quadrants.into_iter().enumerate() {
            let mut child_bounds = bounds;
            if q & 1 != 0 {
                child_bounds.left = center.x;
            } else {
                child_bounds.right = center.x;
            }
            if q & 2 != 0 {
                child_bounds.top = center.y;
            } else {
                child_bounds.bottom = center.y;
            }
            let mut child = Node::new(child_bounds);
            child.items = q_items;
            self.nodes.push(child);
        }
        let node = &mut self.nodes[node_idx];
        node.items = remain;
        node.children = Some(first_child as u32);

        for q in 0..4 {
            self.subdivide(first_child + q, level + 1, level_empty);
        }
    }

    /// Call `visit` with the index of every primitive whose bounding box touches
    /// the sphere at `center` with squared radius `radius_sq`.
    /// Every such primitive is visited exactly once, in no particular order.
    pub fn query<F: FnMut(usize)>(&self, center: Vec3, radius_sq: f32, visit: F) {
        self.query_filtered(center, radius_sq, |_| true, visit);
    }

    /// Like [`query`][Self::query], but primitives owned by an item for which
    /// `is_collidable` returns false may be skipped.
    ///
    /// Only whole subtrees with a single owner are skipped,
    /// so some non-collidable primitives may still be visited.
    pub fn query_filtered<C, F>(&self, center: Vec3, radius_sq: f32, is_collidable: C, mut visit: F)
    where
        C: Fn(ItemHandle) -> bool,
        F: FnMut(usize),
    {
        for &item in &self.unbounded {
            let item = item as usize;
            if self.owners[item].map_or(true, &is_collidable)
                && self.boxes[item].intersects_sphere(center, radius_sq)
            {
                visit(item);
            }
        }
        let ball_box = BoundingBox::around_sphere(center, radius_sq.sqrt());
        self.query_node(0, center, radius_sq, &ball_box, &is_collidable, &mut visit);
    }

    fn query_node<C, F>(
        &self,
        node_idx: usize,
        center: Vec3,
        radius_sq: f32,
        ball_box: &BoundingBox,
        is_collidable: &C,
        visit: &mut F,
    ) where
        C: Fn(ItemHandle) -> bool,
        F: FnMut(usize),
    {
        let node = &self.nodes[node_idx];
        if let Some(owner) = node.unique_owner {
            if !is_collidable(owner) {
                return;
            }
        }

        for &item in &node.items {
            let bb = &self.boxes[item as usize];
            if bb.intersects(ball_box) && bb.intersects_sphere(center, radius_sq) {
                visit(item as usize);
            }
        }

        if let Some(first_child) = node.children {
            let first_child = first_child as usize;
            let lo_x = ball_box.left <= node.center.x;
            let hi_x = ball_box.right >= node.center.x;
            let lo_y = ball_box.top <= node.center.y;
            let hi_y = ball_box.bottom >= node.center.y;
            let visits = [lo_x && lo_y, hi_x && lo_y, lo_x && hi_y, hi_x && hi_y];
            for (q, _) in visits.iter().enumerate().filter(|(_, v)| **v) {
                self.query_node(
                    first_child + q,
                    center,
                    radius_sq,
                    ball_box,
                    is_collidable,
                    visit,
                );
            }
        }
    }

    /// Number of primitives in the tree, including unbounded ones.
    pub fn len(&self) -> usize {
        self.item_count + self.unbounded.len()
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

    pub fn bounds(&self) -> &BoundingBox {
        &self.nodes[0].bounds
    }
}
