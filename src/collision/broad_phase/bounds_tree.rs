use crate::geometry::Aabb;

#[derive(Debug, Clone, Copy)]
enum NodeKind {
    /// Index of the shape in the owning body's shape list
    Leaf(usize),
    /// Child node indices
    Branch(usize, usize),
}

#[derive(Debug, Clone, Copy)]
struct Node {
    bounds: Aabb,
    kind: NodeKind,
}

/// Binary AABB tree over the shapes of a single body.
///
/// Nodes live in one vector with the root at index 0; every child is stored
/// after its parent, so a reverse sweep refits the tree bottom-up.
#[derive(Debug, Clone, Default)]
pub struct BoundsTree {
    nodes: Vec<Node>,
}

impl BoundsTree {
    /// Builds the tree from per-shape bounds, indexed like the shape list.
    pub fn build(bounds: &[Aabb]) -> Self {
        let mut tree = Self {
            nodes: Vec::with_capacity(bounds.len().saturating_mul(2)),
        };
        if !bounds.is_empty() {
            let mut shapes: Vec<usize> = (0..bounds.len()).collect();
            tree.build_node(bounds, &mut shapes);
        }
        tree
    }

    fn build_node(&mut self, bounds: &[Aabb], shapes: &mut Vec<usize>) -> usize {
        let index = self.nodes.len();
        let mut parent = Aabb::EMPTY;
        for &s in shapes.iter() {
            parent.merge(bounds[s]);
        }

        if shapes.len() == 1 {
            self.nodes.push(Node {
                bounds: parent,
                kind: NodeKind::Leaf(shapes[0]),
            });
            return index;
        }

        // Placeholder, patched once both children exist.
        self.nodes.push(Node {
            bounds: parent,
            kind: NodeKind::Leaf(usize::MAX),
        });

        let axis = parent.longest_axis();
        let split = parent.center()[axis];
        let (mut low, mut high): (Vec<usize>, Vec<usize>) =
            shapes.iter().copied().partition(|&s| bounds[s].center()[axis] < split);
        if low.is_empty() {
            if let Some(s) = high.pop() {
                low.push(s);
            }
        } else if high.is_empty() {
            if let Some(s) = low.pop() {
                high.push(s);
            }
        }

        let left = self.build_node(bounds, &mut low);
        let right = self.build_node(bounds, &mut high);
        self.nodes[index].kind = NodeKind::Branch(left, right);
        index
    }

    /// Refits node bounds bottom-up without changing the topology.
    ///
    /// `bounds_of(i)` returns the current world bounds of shape `i`.
    pub fn update(&mut self, bounds_of: impl Fn(usize) -> Aabb) {
        for i in (0..self.nodes.len()).rev() {
            self.nodes[i].bounds = match self.nodes[i].kind {
                NodeKind::Leaf(shape) => bounds_of(shape),
                NodeKind::Branch(l, r) => self.nodes[l].bounds.union(self.nodes[r].bounds),
            };
        }
    }

    /// Bounds of the whole tree, `None` when the body has no shapes
    pub fn root_bounds(&self) -> Option<Aabb> {
        self.nodes.first().map(|n| n.bounds)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of nodes (leaves plus branches)
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Dual-tree descent emitting every pair of leaves whose bounds overlap.
    ///
    /// `visit` receives the shape index in `a`'s body and the shape index in
    /// `b`'s body.
    pub fn collide(a: &BoundsTree, b: &BoundsTree, mut visit: impl FnMut(usize, usize)) {
        if a.is_empty() || b.is_empty() {
            return;
        }

        let mut stack = vec![(0usize, 0usize)];
        while let Some((ia, ib)) = stack.pop() {
            let na = &a.nodes[ia];
            let nb = &b.nodes[ib];
            if !na.bounds.intersects(nb.bounds) {
                continue;
            }

            match (na.kind, nb.kind) {
                (NodeKind::Leaf(sa), NodeKind::Leaf(sb)) => visit(sa, sb),
                (NodeKind::Branch(l, r), _) => {
                    stack.push((r, ib));
                    stack.push((l, ib));
                }
                (NodeKind::Leaf(_), NodeKind::Branch(l, r)) => {
                    stack.push((ia, r));
                    stack.push((ia, l));
                }
            }
        }
    }
}
