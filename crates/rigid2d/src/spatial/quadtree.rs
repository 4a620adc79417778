//! Quadtree spatial partitioning structure
//!
//! Divides the world rectangle into hierarchical quadrants for the broad
//! phase. Nodes live in a flat arena; a divided node owns four consecutive
//! child slots in NW, NE, SW, SE order (y grows downwards). The tree is
//! cleared and refilled every frame, keeping its subdivided shape so the
//! arena stops growing once occupancy settles.

use crate::core::config::QuadTreeConfig;
use crate::geometry::Rect;
use crate::physics::collider::ColliderRef;

/// Depth at which nodes stop subdividing
pub const MAX_DEPTH: usize = 5;

/// Records a node holds before it subdivides
pub const MAX_CAPACITY: usize = 8;

/// Collider handle with its world-space bounds, as stored in the tree
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimplifiedCollider {
    /// Indexed collider
    pub collider: ColliderRef,
    /// World-space bounding rectangle at insertion time
    pub bounds: Rect,
}

/// Single node in the quadtree hierarchy
#[derive(Debug, Clone)]
pub struct QuadNode {
    /// World-space boundary of this node
    pub boundary: Rect,
    /// Depth in the tree (0 = root)
    pub depth: usize,
    /// Records held directly by this node (empty once divided)
    pub records: Vec<SimplifiedCollider>,
    /// Arena index of the first of four children, if divided
    children: Option<usize>,
}

impl QuadNode {
    fn new(boundary: Rect, depth: usize) -> Self {
        Self {
            boundary,
            depth,
            records: Vec::new(),
            children: None,
        }
    }

    /// Whether the node has been subdivided
    #[inline]
    pub fn is_divided(&self) -> bool {
        self.children.is_some()
    }

    /// Arena indices of the four children in NW, NE, SW, SE order
    pub fn children(&self) -> Option<[usize; 4]> {
        self.children.map(|first| [first, first + 1, first + 2, first + 3])
    }
}

/// Quadtree over collider bounding rectangles
#[derive(Debug, Clone)]
pub struct QuadTree {
    nodes: Vec<QuadNode>,
    config: QuadTreeConfig,
}

const ROOT: usize = 0;

impl QuadTree {
    /// Create an empty tree covering `boundary`
    pub fn new(boundary: Rect, config: QuadTreeConfig) -> Self {
        Self {
            nodes: vec![QuadNode::new(boundary, 0)],
            config,
        }
    }

    /// Limits the tree was built with
    pub fn config(&self) -> &QuadTreeConfig {
        &self.config
    }

    /// Boundary of the root node
    pub fn boundary(&self) -> Rect {
        self.nodes[ROOT].boundary
    }

    /// Root node
    pub fn root(&self) -> &QuadNode {
        &self.nodes[ROOT]
    }

    /// Node by arena index
    pub fn node(&self, index: usize) -> Option<&QuadNode> {
        self.nodes.get(index)
    }

    /// Insert a record into every leaf its bounds touch
    ///
    /// Returns `false` when the record lies outside the tree.
    pub fn insert(&mut self, record: SimplifiedCollider) -> bool {
        self.insert_at(ROOT, record)
    }

    fn insert_at(&mut self, index: usize, record: SimplifiedCollider) -> bool {
        if !self.nodes[index].boundary.intersects(&record.bounds) {
            return false;
        }

        if let Some(children) = self.nodes[index].children() {
            return self.insert_into_children(children, record);
        }

        let node = &mut self.nodes[index];
        if node.records.len() < self.config.max_capacity || node.depth >= self.config.max_depth {
            node.records.push(record);
            return true;
        }

        let children = self.subdivide(index);
        let existing = std::mem::take(&mut self.nodes[index].records);
        for old in existing {
            self.insert_into_children(children, old);
        }
        self.insert_into_children(children, record)
    }

    fn insert_into_children(&mut self, children: [usize; 4], record: SimplifiedCollider) -> bool {
        // Straddling records go into every child they touch
        let mut stored = false;
        for child in children {
            stored |= self.insert_at(child, record);
        }
        stored
    }

    fn subdivide(&mut self, index: usize) -> [usize; 4] {
        let first = self.nodes.len();
        let depth = self.nodes[index].depth + 1;
        for quadrant in self.nodes[index].boundary.quadrants() {
            self.nodes.push(QuadNode::new(quadrant, depth));
        }
        self.nodes[index].children = Some(first);
        log::trace!("QuadTree subdivided node {} at depth {}", index, depth - 1);
        [first, first + 1, first + 2, first + 3]
    }

    /// Colliders whose recorded bounds intersect `bounds`
    ///
    /// A collider stored in several leaves appears once per leaf.
    pub fn get_colliders(&self, bounds: &Rect) -> Vec<ColliderRef> {
        let mut found = Vec::new();
        self.query_into(bounds, &mut found);
        found
    }

    /// Like [`QuadTree::get_colliders`], appending into any collection
    pub fn query_into<E: Extend<ColliderRef>>(&self, bounds: &Rect, found: &mut E) {
        let mut stack = vec![ROOT];
        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];
            if !node.boundary.intersects(bounds) {
                continue;
            }
            found.extend(
                node.records
                    .iter()
                    .filter(|record| record.bounds.intersects(bounds))
                    .map(|record| record.collider),
            );
            if let Some(children) = node.children() {
                stack.extend(children.iter().rev());
            }
        }
    }

    /// Resize the tree in place, recomputing every child boundary
    pub fn update_boundary(&mut self, boundary: Rect) {
        self.set_boundary(ROOT, boundary);
    }

    fn set_boundary(&mut self, index: usize, boundary: Rect) {
        self.nodes[index].boundary = boundary;
        if let Some(children) = self.nodes[index].children() {
            for (child, quadrant) in children.into_iter().zip(boundary.quadrants()) {
                self.set_boundary(child, quadrant);
            }
        }
    }

    /// Empty every node's records, keeping the subdivided shape
    pub fn clear_colliders(&mut self) {
        for node in &mut self.nodes {
            node.records.clear();
        }
    }

    /// Total records held, counting a straddling collider once per leaf
    pub fn get_all_colliders_count(&self) -> usize {
        self.nodes.iter().map(|node| node.records.len()).sum()
    }

    /// Node boundaries, depth first with each parent before its children
    pub fn get_boundaries(&self) -> Vec<Rect> {
        let mut boundaries = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![ROOT];
        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];
            boundaries.push(node.boundary);
            if let Some(children) = node.children() {
                stack.extend(children.iter().rev());
            }
        }
        boundaries
    }

    /// Number of nodes in the arena
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Depth of the deepest node
    pub fn depth_of_deepest_node(&self) -> usize {
        self.nodes.iter().map(|node| node.depth).max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::vec2;

    fn tree() -> QuadTree {
        QuadTree::new(Rect::new(vec2(0.0, 0.0), vec2(100.0, 100.0)), QuadTreeConfig::default())
    }

    fn point(index: u32, x: f32, y: f32) -> SimplifiedCollider {
        SimplifiedCollider {
            collider: ColliderRef::new(index, 0),
            bounds: Rect::new(vec2(x, y), vec2(x, y)),
        }
    }

    fn boxed(index: u32, x: f32, y: f32, size: f32) -> SimplifiedCollider {
        SimplifiedCollider {
            collider: ColliderRef::new(index, 0),
            bounds: Rect::from_position_size(vec2(x, y), vec2(size, size)),
        }
    }

    #[test]
    fn test_capacity_records_do_not_divide() {
        let mut tree = tree();
        for i in 0..8 {
            assert!(tree.insert(point(i, 10.0, 10.0)));
        }
        assert!(!tree.root().is_divided());
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.get_all_colliders_count(), 8);
    }

    #[test]
    fn test_one_past_capacity_divides_up_to_max_depth() {
        let mut tree = tree();
        for i in 0..9 {
            tree.insert(point(i, 10.0, 10.0));
        }
        assert!(tree.root().is_divided());
        assert!(tree.root().records.is_empty());
        assert_eq!(tree.depth_of_deepest_node(), MAX_DEPTH);
        assert_eq!(tree.get_all_colliders_count(), 9);

        // More records at the same point never push past the depth limit
        for i in 9..100 {
            tree.insert(point(i, 10.0, 10.0));
        }
        assert_eq!(tree.depth_of_deepest_node(), MAX_DEPTH);
        assert_eq!(tree.get_all_colliders_count(), 100);
    }

    #[test]
    fn test_insert_outside_is_rejected() {
        let mut tree = tree();
        assert!(!tree.insert(point(0, 150.0, 10.0)));
        assert_eq!(tree.get_all_colliders_count(), 0);
    }

    #[test]
    fn test_straddling_record_lands_in_several_children() {
        let mut tree = tree();
        for i in 0..8 {
            tree.insert(point(i, 10.0 + i as f32, 10.0));
        }
        tree.insert(boxed(99, 40.0, 40.0, 20.0));

        let hits = tree.get_colliders(&Rect::new(vec2(45.0, 45.0), vec2(55.0, 55.0)));
        assert_eq!(hits.iter().filter(|c| c.index == 99).count(), 4);
    }

    #[test]
    fn test_get_colliders_is_superset_of_overlaps() {
        let mut tree = tree();
        let mut records = Vec::new();
        for i in 0..60u32 {
            let record = boxed(i, (i * 7 % 90) as f32, (i * 13 % 90) as f32, 4.0 + (i % 5) as f32);
            tree.insert(record);
            records.push(record);
        }

        let query = Rect::new(vec2(20.0, 20.0), vec2(60.0, 45.0));
        let found = tree.get_colliders(&query);
        for record in records.iter().filter(|r| r.bounds.overlaps(&query)) {
            assert!(found.contains(&record.collider), "missing {:?}", record.collider);
        }
    }

    #[test]
    fn test_clear_colliders_keeps_shape() {
        let mut tree = tree();
        for i in 0..20 {
            tree.insert(point(i, 5.0 * i as f32, 5.0 * i as f32));
        }
        let nodes = tree.node_count();
        assert!(nodes > 1);

        tree.clear_colliders();
        assert_eq!(tree.get_all_colliders_count(), 0);
        assert_eq!(tree.node_count(), nodes);
        assert!(tree.root().is_divided());
        assert!(tree.get_colliders(&tree.boundary()).is_empty());
    }

    #[test]
    fn test_update_boundary_recomputes_children() {
        let mut tree = tree();
        for i in 0..9 {
            tree.insert(point(i, 10.0, 10.0));
        }
        let nodes = tree.node_count();

        tree.update_boundary(Rect::new(vec2(0.0, 0.0), vec2(200.0, 400.0)));
        assert_eq!(tree.node_count(), nodes);

        let [nw, ne, sw, se] = tree.root().children().unwrap();
        assert_eq!(tree.node(nw).unwrap().boundary, Rect::new(vec2(0.0, 0.0), vec2(100.0, 200.0)));
        assert_eq!(tree.node(ne).unwrap().boundary, Rect::new(vec2(100.0, 0.0), vec2(200.0, 200.0)));
        assert_eq!(tree.node(sw).unwrap().boundary, Rect::new(vec2(0.0, 200.0), vec2(100.0, 400.0)));
        assert_eq!(tree.node(se).unwrap().boundary, Rect::new(vec2(100.0, 200.0), vec2(200.0, 400.0)));

        let nw_children = tree.node(nw).unwrap().children().unwrap();
        assert_eq!(
            tree.node(nw_children[3]).unwrap().boundary,
            Rect::new(vec2(50.0, 100.0), vec2(100.0, 200.0))
        );
    }

    #[test]
    fn test_boundaries_are_depth_first() {
        let mut tree = tree();
        for i in 0..9 {
            tree.insert(point(i, 10.0, 10.0));
        }

        let boundaries = tree.get_boundaries();
        assert_eq!(boundaries.len(), tree.node_count());
        assert_eq!(boundaries[0], tree.boundary());
        // NW child of the root comes next, followed by its own NW child
        assert_eq!(boundaries[1], Rect::new(vec2(0.0, 0.0), vec2(50.0, 50.0)));
        assert_eq!(boundaries[2], Rect::new(vec2(0.0, 0.0), vec2(25.0, 25.0)));
    }

    #[test]
    fn test_custom_limits() {
        let config = QuadTreeConfig {
            max_depth: 1,
            max_capacity: 2,
        };
        let mut tree = QuadTree::new(Rect::new(vec2(0.0, 0.0), vec2(10.0, 10.0)), config);
        for i in 0..10 {
            tree.insert(point(i, 1.0, 1.0));
        }
        assert_eq!(tree.node_count(), 5);
        assert_eq!(tree.depth_of_deepest_node(), 1);
    }
}
