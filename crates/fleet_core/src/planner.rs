//! Route planning: A\* search over the route model.
//!
//! [`AStarPlanner`] snaps both endpoints to their closest nodes and searches
//! with `f = g + h`, where `g` is the accumulated Euclidean path length and
//! `h` the straight-line distance to the goal node (admissible and
//! consistent on the degree plane). The produced path lists node positions
//! from the first hop after the start node through the goal node inclusive;
//! an unreachable goal is reported as `None` and the caller decides how to
//! recover.
//!
//! [`CachedPlanner`] wraps any planner with an LRU keyed by the endpoint
//! coordinates, the same shape as the route cache placed in front of slow
//! routing backends.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use lru::LruCache;

use crate::geo::Coordinate;
use crate::ids::NodeId;
use crate::route_model::RouteModel;

/// Default capacity of the planner cache.
pub const DEFAULT_ROUTE_CACHE_CAPACITY: usize = 8_192;

/// Pluggable route planner. Implementations must be `Send + Sync` so one
/// instance can be shared by the vehicle manager and test harnesses.
pub trait RoutePlanner: Send + Sync {
    /// Plan a path from `start` to `goal`, both snapped to their closest
    /// nodes. Returns `None` when the goal is unreachable.
    fn plan(&self, start: Coordinate, goal: Coordinate) -> Option<Vec<Coordinate>>;
}

/// Frontier entry ordered for a min-heap: lowest `f` pops first, ties go to
/// the lower `h` (the more goal-directed candidate), then the lower node
/// index for determinism.
#[derive(Debug, Clone, Copy)]
struct Frontier {
    f: f64,
    h: f64,
    node: NodeId,
}

impl PartialEq for Frontier {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Frontier {}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; comparisons are reversed so the smallest
        // key is popped first.
        other
            .f
            .total_cmp(&self.f)
            .then_with(|| other.h.total_cmp(&self.h))
            .then_with(|| other.node.0.cmp(&self.node.0))
    }
}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A\* over the shared [`RouteModel`].
pub struct AStarPlanner {
    model: Arc<RouteModel>,
}

impl AStarPlanner {
    pub fn new(model: Arc<RouteModel>) -> Self {
        Self { model }
    }
}

impl RoutePlanner for AStarPlanner {
    fn plan(&self, start: Coordinate, goal: Coordinate) -> Option<Vec<Coordinate>> {
        let model = &self.model;
        let start_node = model.closest_node(start);
        let goal_node = model.closest_node(goal);
        let goal_pos = model.position(goal_node);

        if start_node == goal_node {
            return Some(vec![goal_pos]);
        }

        let n = model.node_count();
        let mut visited = vec![false; n];
        let mut parent: Vec<Option<NodeId>> = vec![None; n];
        let mut g = vec![0.0_f64; n];

        let mut open = BinaryHeap::new();
        visited[start_node.index()] = true;
        let h0 = model.position(start_node).distance(goal_pos);
        open.push(Frontier {
            f: h0,
            h: h0,
            node: start_node,
        });

        while let Some(Frontier { node, .. }) = open.pop() {
            if node == goal_node {
                return Some(reconstruct(model, &parent, start_node, goal_node));
            }
            for &next in model.neighbours(node) {
                if visited[next.index()] {
                    continue;
                }
                visited[next.index()] = true;
                let tentative = g[node.index()] + model.distance(node, next);
                let h = model.position(next).distance(goal_pos);
                g[next.index()] = tentative;
                parent[next.index()] = Some(node);
                open.push(Frontier {
                    f: tentative + h,
                    h,
                    node: next,
                });
            }
        }

        None
    }
}

/// Walk parent pointers from the goal back to (but not including) the start,
/// then reverse into a start-to-goal coordinate path.
fn reconstruct(
    model: &RouteModel,
    parent: &[Option<NodeId>],
    start: NodeId,
    goal: NodeId,
) -> Vec<Coordinate> {
    let mut chain = vec![goal];
    let mut current = goal;
    while let Some(prev) = parent[current.index()] {
        if prev == start {
            break;
        }
        chain.push(prev);
        current = prev;
    }
    chain.reverse();
    chain.into_iter().map(|n| model.position(n)).collect()
}

type PathKey = (u64, u64, u64, u64);

fn path_key(start: Coordinate, goal: Coordinate) -> PathKey {
    (
        start.x.to_bits(),
        start.y.to_bits(),
        goal.x.to_bits(),
        goal.y.to_bits(),
    )
}

/// LRU-cached wrapper around any [`RoutePlanner`].
///
/// Cache key is the (start, goal) coordinate pair, directional. Only
/// successful plans are cached; an unroutable query changes the caller's
/// destination, so misses do not repeat.
pub struct CachedPlanner {
    inner: Box<dyn RoutePlanner>,
    cache: Mutex<LruCache<PathKey, Vec<Coordinate>>>,
}

impl CachedPlanner {
    pub fn new(inner: Box<dyn RoutePlanner>, capacity: usize) -> Self {
        Self {
            inner,
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity.max(1)).expect("cache capacity must be > 0"),
            )),
        }
    }
}

impl RoutePlanner for CachedPlanner {
    fn plan(&self, start: Coordinate, goal: Coordinate) -> Option<Vec<Coordinate>> {
        let key = path_key(start, goal);

        {
            let mut cache = self.cache.lock().ok()?;
            if let Some(path) = cache.get(&key) {
                return Some(path.clone());
            }
        }

        let path = self.inner.plan(start, goal)?;
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(key, path.clone());
        }
        Some(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route_model::MapGraph;
    use crate::test_helpers::grid_model;

    #[test]
    fn path_excludes_start_and_ends_at_snapped_goal() {
        let model = grid_model(3);
        let planner = AStarPlanner::new(model);
        let start = Coordinate::new(0.0, 0.0);
        let goal = Coordinate::new(2.1, 1.9); // snaps to (2, 2)
        let path = planner.plan(start, goal).expect("grid is connected");
        assert_ne!(path[0], start);
        assert_eq!(*path.last().unwrap(), Coordinate::new(2.0, 2.0));
        // Manhattan route over a unit grid: four hops.
        assert_eq!(path.len(), 4);
    }

    #[test]
    fn path_length_is_at_least_straight_line_distance() {
        let model = grid_model(3);
        let planner = AStarPlanner::new(model);
        let start = Coordinate::new(0.0, 0.0);
        let goal = Coordinate::new(2.0, 2.0);
        let path = planner.plan(start, goal).unwrap();
        let mut length = start.distance(path[0]);
        for pair in path.windows(2) {
            length += pair[0].distance(pair[1]);
        }
        assert!(length >= start.distance(goal));
    }

    #[test]
    fn same_snapped_node_yields_single_step_path() {
        let model = grid_model(3);
        let planner = AStarPlanner::new(model);
        let path = planner
            .plan(Coordinate::new(0.1, 0.1), Coordinate::new(-0.2, 0.0))
            .unwrap();
        assert_eq!(path, vec![Coordinate::new(0.0, 0.0)]);
    }

    #[test]
    fn disconnected_goal_is_unroutable() {
        let mut g = MapGraph::new();
        let a = g.add_node(Coordinate::new(0.0, 0.0));
        let b = g.add_node(Coordinate::new(1.0, 0.0));
        g.add_edge(a, b);
        g.add_node(Coordinate::new(10.0, 10.0)); // island
        let model = Arc::new(RouteModel::from_graph(g).unwrap());
        let planner = AStarPlanner::new(model);
        let path = planner.plan(Coordinate::new(0.0, 0.0), Coordinate::new(10.0, 10.0));
        assert!(path.is_none());
    }

    #[test]
    fn tie_breaking_is_deterministic() {
        // From the grid centre to a corner there are two equal-length
        // routes; the f → h → index ordering always picks the same one.
        let model = grid_model(3);
        let planner = AStarPlanner::new(model);
        let path = planner
            .plan(Coordinate::new(1.0, 1.0), Coordinate::new(2.0, 0.0))
            .unwrap();
        assert_eq!(path.len(), 2);
        assert_eq!(*path.last().unwrap(), Coordinate::new(2.0, 0.0));
        // The first hop goes through the lower-indexed of the two
        // equidistant neighbours, (1, 0).
        assert_eq!(path[0], Coordinate::new(1.0, 0.0));
        let again = planner
            .plan(Coordinate::new(1.0, 1.0), Coordinate::new(2.0, 0.0))
            .unwrap();
        assert_eq!(path, again);
    }

    #[test]
    fn cached_planner_returns_identical_paths() {
        let model = grid_model(3);
        let planner = CachedPlanner::new(
            Box::new(AStarPlanner::new(model)),
            DEFAULT_ROUTE_CACHE_CAPACITY,
        );
        let start = Coordinate::new(0.0, 0.0);
        let goal = Coordinate::new(2.0, 2.0);
        let first = planner.plan(start, goal).unwrap();
        let second = planner.plan(start, goal).unwrap();
        assert_eq!(first, second);
    }
}
