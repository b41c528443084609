use std::collections::HashMap;

use crate::error::OlaError;

/// Per-quasi-identifier bucket widths. `Vec`'s derived ordering is the
/// lexicographic order used for every "smallest" tie-break.
pub type RiVector = Vec<i64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Unknown,
    Pass,
    Fail,
}

/// Leveled DAG of candidate generalization vectors.
///
/// Nodes live in an arena and are unique by vector value; `index` maps a
/// vector back to its arena slot, so membership checks never scan levels.
pub struct Lattice {
    nodes: Vec<RiVector>,
    levels: Vec<Vec<usize>>,
    index: HashMap<RiVector, usize>,
    range_sizes: Vec<i64>,
    growth_factor: i64,
}

impl Lattice {
    /// Breadth-first expansion from the all-ones (finest) vector. Each child
    /// grows exactly one coordinate by `growth_factor`, clamped to that
    /// coordinate's range size. A vector reachable through several parents is
    /// inserted once, at its shallowest level. Expansion stops when a level
    /// produces no unseen vector; every coordinate is bounded, so it stops.
    pub fn build(range_sizes: Vec<i64>, growth_factor: i64) -> Self {
        let base: RiVector = vec![1; range_sizes.len()];
        let mut nodes = vec![base.clone()];
        let mut index = HashMap::from([(base, 0)]);
        let mut levels = vec![vec![0]];
        loop {
            let mut next_level = Vec::new();
            for &id in levels.last().unwrap() {
                let node = nodes[id].clone();
                for (i, &cap) in range_sizes.iter().enumerate() {
                    if node[i] >= cap {
                        continue;
                    }
                    let mut child = node.clone();
                    child[i] = (child[i] * growth_factor).min(cap);
                    if !index.contains_key(&child) {
                        let child_id = nodes.len();
                        index.insert(child.clone(), child_id);
                        nodes.push(child);
                        next_level.push(child_id);
                    }
                }
            }
            if next_level.is_empty() {
                break;
            }
            levels.push(next_level);
        }
        Self {
            nodes,
            levels,
            index,
            range_sizes,
            growth_factor,
        }
    }

    pub fn node(&self, id: usize) -> &RiVector {
        &self.nodes[id]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn levels(&self) -> &[Vec<usize>] {
        &self.levels
    }

    pub fn contains(&self, node: &RiVector) -> bool {
        self.index.contains_key(node)
    }

    pub fn range_sizes(&self) -> &[i64] {
        &self.range_sizes
    }

    pub fn growth_factor(&self) -> i64 {
        self.growth_factor
    }

    /// Number of equivalence classes the widths induce over this domain.
    pub fn count_classes(&self, widths: &[i64]) -> u64 {
        count_equivalence_classes(&self.range_sizes, widths)
    }
}

// Product of the per-dimension range/width ratios, rounded up once at the
// end. Non-increasing in every width coordinate, which is what makes the
// Pass/Fail propagation below sound.
pub fn count_equivalence_classes(range_sizes: &[i64], widths: &[i64]) -> u64 {
    let product: f64 = range_sizes
        .iter()
        .zip(widths.iter())
        .map(|(&range, &width)| range as f64 / width as f64)
        .product();
    product.ceil() as u64
}

// Every coordinate of `v` is <= the matching coordinate of `w`.
fn dominated_by(v: &[i64], w: &[i64]) -> bool {
    v.iter().zip(w.iter()).all(|(a, b)| a <= b)
}

/// Node classifications plus the running lexicographically-smallest Pass
/// vector. One search owns all of this state for its whole duration.
pub struct SearchState {
    status: Vec<Status>,
    best: Option<RiVector>,
}

impl SearchState {
    fn new(n_nodes: usize) -> Self {
        Self {
            status: vec![Status::Unknown; n_nodes],
            best: None,
        }
    }

    pub fn status(&self, id: usize) -> Status {
        self.status[id]
    }

    pub fn best(&self) -> Option<&RiVector> {
        self.best.as_ref()
    }

    /// Classify every lattice node against the class-count cap.
    ///
    /// Repeatedly picks the middle level among levels still holding Unknown
    /// nodes (binary search over levels, not nodes) and evaluates that
    /// level's Unknown nodes in ascending lexicographic order. Each verdict
    /// propagates monotonically, so most nodes are never evaluated directly.
    pub fn resolve(lattice: &Lattice, cap: u64) -> Self {
        let mut state = Self::new(lattice.len());
        loop {
            let unmarked: Vec<usize> = (0..lattice.levels().len())
                .filter(|&level| {
                    lattice.levels()[level]
                        .iter()
                        .any(|&id| state.status[id] == Status::Unknown)
                })
                .collect();
            if unmarked.is_empty() {
                break;
            }
            let mid = unmarked[unmarked.len() / 2];
            let mut pending: Vec<usize> = lattice.levels()[mid]
                .iter()
                .copied()
                .filter(|&id| state.status[id] == Status::Unknown)
                .collect();
            pending.sort_by(|&a, &b| lattice.node(a).cmp(lattice.node(b)));
            for id in pending {
                if state.status[id] != Status::Unknown {
                    // resolved by propagation from an earlier node
                    continue;
                }
                if lattice.count_classes(lattice.node(id)) <= cap {
                    state.mark_pass_downward(lattice, mid, id);
                } else {
                    state.mark_fail_upward(lattice, mid, id);
                }
            }
        }
        state
    }

    // A Pass covers every Unknown node at deeper levels that dominates this
    // one; monotonicity makes recomputing their class counts redundant.
    fn mark_pass_downward(&mut self, lattice: &Lattice, level: usize, id: usize) {
        self.mark_pass(lattice, id);
        for deeper in &lattice.levels()[level + 1..] {
            for &other in deeper {
                if self.status[other] == Status::Unknown
                    && dominated_by(lattice.node(id), lattice.node(other))
                {
                    self.mark_pass(lattice, other);
                }
            }
        }
    }

    fn mark_pass(&mut self, lattice: &Lattice, id: usize) {
        self.status[id] = Status::Pass;
        let node = lattice.node(id);
        if self.best.as_ref().map_or(true, |best| node < best) {
            self.best = Some(node.clone());
        }
    }

    // A Fail covers every Unknown node at shallower levels dominated by this
    // one.
    fn mark_fail_upward(&mut self, lattice: &Lattice, level: usize, id: usize) {
        self.status[id] = Status::Fail;
        for shallower in &lattice.levels()[..level] {
            for &other in shallower {
                if self.status[other] == Status::Unknown
                    && dominated_by(lattice.node(other), lattice.node(id))
                {
                    self.status[other] = Status::Fail;
                }
            }
        }
    }

    // Fallback when propagation never recorded a best: deepest level holding
    // any Pass node, lexicographically smallest node there.
    pub fn deepest_pass(&self, lattice: &Lattice) -> Option<RiVector> {
        for level in lattice.levels().iter().rev() {
            let smallest = level
                .iter()
                .filter(|&&id| self.status[id] == Status::Pass)
                .map(|&id| lattice.node(id))
                .min();
            if let Some(node) = smallest {
                return Some(node.clone());
            }
        }
        None
    }
}

/// Lexicographically smallest generalization vector whose induced class
/// count stays within `cap`, or `InfeasibleCap` if no lattice node does.
pub fn find_smallest_passing_ri(lattice: &Lattice, cap: u64) -> Result<RiVector, OlaError> {
    let state = SearchState::resolve(lattice, cap);
    state
        .best()
        .cloned()
        .or_else(|| state.deepest_pass(lattice))
        .ok_or(OlaError::InfeasibleCap { cap })
}
