//! The road graph: node table, adjacency, bounds, and geographic lookup.
//!
//! [`RouteModel`] is immutable after [`RouteModel::from_graph`] returns, so
//! it is shared across actor threads without locking.
//!
//! Adjacency is stored in compressed sparse rows: the neighbours of node `n`
//! occupy `adjacency[row_start[n] .. row_start[n + 1]]`, preserving the order
//! the edges were loaded in. An R-tree over the node positions answers
//! nearest-node queries; equidistant candidates resolve to the lowest node
//! index so lookups are deterministic.

use rand::Rng;
use rstar::{PointDistance, RTree, RTreeObject, AABB};

use crate::error::{SimError, SimResult};
use crate::geo::{Bounds, Coordinate};
use crate::ids::NodeId;

/// Map input as delivered by the external OSM-style reader: positioned nodes
/// and undirected edges between them.
#[derive(Debug, Clone, Default)]
pub struct MapGraph {
    pub nodes: Vec<Coordinate>,
    pub edges: Vec<(NodeId, NodeId)>,
}

impl MapGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node and return its id (sequential from 0).
    pub fn add_node(&mut self, position: Coordinate) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(position);
        id
    }

    /// Add an undirected road segment between `a` and `b`.
    pub fn add_edge(&mut self, a: NodeId, b: NodeId) {
        self.edges.push((a, b));
    }
}

/// Entry in the nearest-node index: a node position plus its id.
#[derive(Debug, Clone)]
struct NodePoint {
    position: [f64; 2],
    id: NodeId,
}

impl RTreeObject for NodePoint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position)
    }
}

impl PointDistance for NodePoint {
    /// Squared Euclidean distance in (lon, lat) space.
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.position[0] - point[0];
        let dy = self.position[1] - point[1];
        dx * dx + dy * dy
    }
}

/// Immutable road graph shared by the planner and every actor.
#[derive(Debug)]
pub struct RouteModel {
    positions: Vec<Coordinate>,
    row_start: Vec<u32>,
    adjacency: Vec<NodeId>,
    bounds: Bounds,
    index: RTree<NodePoint>,
}

impl RouteModel {
    /// Build the model from loader output.
    ///
    /// Rejects graphs with no nodes, non-finite coordinates, or edges that
    /// reference nodes outside the table — all reported as
    /// [`SimError::MapLoad`] and fatal to startup.
    pub fn from_graph(graph: MapGraph) -> SimResult<Self> {
        let MapGraph { nodes, edges } = graph;
        if nodes.is_empty() {
            return Err(SimError::MapLoad("graph has no nodes".into()));
        }
        if let Some(i) = nodes.iter().position(|c| !c.is_finite()) {
            return Err(SimError::MapLoad(format!(
                "node {i} has a non-finite coordinate"
            )));
        }
        let node_count = nodes.len();
        for &(a, b) in &edges {
            if a.index() >= node_count || b.index() >= node_count {
                return Err(SimError::MapLoad(format!(
                    "edge ({a}, {b}) references a missing node (table holds {node_count})"
                )));
            }
        }

        let mut bounds = Bounds {
            min_lon: f64::INFINITY,
            max_lon: f64::NEG_INFINITY,
            min_lat: f64::INFINITY,
            max_lat: f64::NEG_INFINITY,
        };
        for c in &nodes {
            bounds.min_lon = bounds.min_lon.min(c.x);
            bounds.max_lon = bounds.max_lon.max(c.x);
            bounds.min_lat = bounds.min_lat.min(c.y);
            bounds.max_lat = bounds.max_lat.max(c.y);
        }

        // CSR over both directions of each undirected edge. Filling in edge
        // load order keeps each node's neighbour list in the order the map
        // was loaded.
        let mut degree = vec![0u32; node_count];
        for &(a, b) in &edges {
            degree[a.index()] += 1;
            degree[b.index()] += 1;
        }
        let mut row_start = vec![0u32; node_count + 1];
        for n in 0..node_count {
            row_start[n + 1] = row_start[n] + degree[n];
        }
        let mut cursor: Vec<u32> = row_start[..node_count].to_vec();
        let mut adjacency = vec![NodeId(0); edges.len() * 2];
        for &(a, b) in &edges {
            adjacency[cursor[a.index()] as usize] = b;
            cursor[a.index()] += 1;
            adjacency[cursor[b.index()] as usize] = a;
            cursor[b.index()] += 1;
        }

        let entries: Vec<NodePoint> = nodes
            .iter()
            .enumerate()
            .map(|(i, c)| NodePoint {
                position: [c.x, c.y],
                id: NodeId(i as u32),
            })
            .collect();
        let index = RTree::bulk_load(entries);

        Ok(Self {
            positions: nodes,
            row_start,
            adjacency,
            bounds,
            index,
        })
    }

    pub fn node_count(&self) -> usize {
        self.positions.len()
    }

    /// Position of a node. Ids come from this model, so indexing is direct.
    pub fn position(&self, node: NodeId) -> Coordinate {
        self.positions[node.index()]
    }

    /// All node positions, in id order. Immutable after load; the renderer
    /// reads this as the intersection layer.
    pub fn nodes(&self) -> &[Coordinate] {
        &self.positions
    }

    /// Neighbours of `node`, in the order their edges were loaded.
    pub fn neighbours(&self, node: NodeId) -> &[NodeId] {
        let start = self.row_start[node.index()] as usize;
        let end = self.row_start[node.index() + 1] as usize;
        &self.adjacency[start..end]
    }

    /// Euclidean distance between two nodes on the degree plane.
    pub fn distance(&self, a: NodeId, b: NodeId) -> f64 {
        self.position(a).distance(self.position(b))
    }

    /// The node nearest to `c` by Euclidean distance; ties break to the
    /// lowest node index.
    pub fn closest_node(&self, c: Coordinate) -> NodeId {
        let query = [c.x, c.y];
        let mut nearest = self.index.nearest_neighbor_iter(&query);
        let first = nearest
            .next()
            .expect("route model holds at least one node");
        let best_d2 = first.distance_2(&query);
        let mut best = first.id;
        for entry in nearest {
            if entry.distance_2(&query) > best_d2 {
                break;
            }
            if entry.id < best {
                best = entry.id;
            }
        }
        best
    }

    /// A uniform random position over the rectangular map bounds. Not
    /// snapped; callers snap via [`Self::closest_node`] when they need a
    /// routable point.
    pub fn random_position<R: Rng>(&self, rng: &mut R) -> Coordinate {
        Coordinate::new(
            rng.gen_range(self.bounds.min_lon..=self.bounds.max_lon),
            rng.gen_range(self.bounds.min_lat..=self.bounds.max_lat),
        )
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn line_graph() -> MapGraph {
        // n0 - n1 - n2 along the equator, one degree apart.
        let mut g = MapGraph::new();
        let a = g.add_node(Coordinate::new(0.0, 0.0));
        let b = g.add_node(Coordinate::new(1.0, 0.0));
        let c = g.add_node(Coordinate::new(2.0, 0.0));
        g.add_edge(a, b);
        g.add_edge(b, c);
        g
    }

    #[test]
    fn rejects_empty_graph() {
        let err = RouteModel::from_graph(MapGraph::new()).unwrap_err();
        assert!(matches!(err, SimError::MapLoad(_)));
    }

    #[test]
    fn rejects_out_of_range_edge() {
        let mut g = MapGraph::new();
        let a = g.add_node(Coordinate::new(0.0, 0.0));
        g.add_edge(a, NodeId(5));
        assert!(RouteModel::from_graph(g).is_err());
    }

    #[test]
    fn rejects_non_finite_coordinates() {
        let mut g = MapGraph::new();
        g.add_node(Coordinate::new(f64::NAN, 0.0));
        assert!(RouteModel::from_graph(g).is_err());
    }

    #[test]
    fn neighbours_preserve_load_order() {
        let mut g = MapGraph::new();
        let hub = g.add_node(Coordinate::new(0.0, 0.0));
        let n1 = g.add_node(Coordinate::new(1.0, 0.0));
        let n2 = g.add_node(Coordinate::new(0.0, 1.0));
        let n3 = g.add_node(Coordinate::new(-1.0, 0.0));
        g.add_edge(hub, n1);
        g.add_edge(hub, n2);
        g.add_edge(n3, hub);
        let model = RouteModel::from_graph(g).unwrap();
        assert_eq!(model.neighbours(hub), &[n1, n2, n3]);
        assert_eq!(model.neighbours(n1), &[hub]);
    }

    #[test]
    fn closest_node_breaks_ties_toward_lowest_index() {
        let mut g = MapGraph::new();
        // Two nodes equidistant from the query point.
        let a = g.add_node(Coordinate::new(-1.0, 0.0));
        let b = g.add_node(Coordinate::new(1.0, 0.0));
        g.add_edge(a, b);
        let model = RouteModel::from_graph(g).unwrap();
        assert_eq!(model.closest_node(Coordinate::new(0.0, 0.0)), a);
    }

    #[test]
    fn closest_node_picks_minimum_distance() {
        let model = RouteModel::from_graph(line_graph()).unwrap();
        assert_eq!(model.closest_node(Coordinate::new(1.9, 0.3)), NodeId(2));
        assert_eq!(model.closest_node(Coordinate::new(0.2, -0.1)), NodeId(0));
    }

    #[test]
    fn bounds_cover_all_nodes() {
        let model = RouteModel::from_graph(line_graph()).unwrap();
        let bounds = model.bounds();
        assert_eq!(bounds.min_lon, 0.0);
        assert_eq!(bounds.max_lon, 2.0);
        assert_eq!(bounds.min_lat, 0.0);
        assert_eq!(bounds.max_lat, 0.0);
    }

    #[test]
    fn random_positions_stay_in_bounds() {
        let model = RouteModel::from_graph(line_graph()).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let c = model.random_position(&mut rng);
            assert!(model.bounds().contains(c));
        }
    }

    #[test]
    fn distance_between_adjacent_nodes() {
        let model = RouteModel::from_graph(line_graph()).unwrap();
        assert_eq!(model.distance(NodeId(0), NodeId(1)), 1.0);
        assert_eq!(model.distance(NodeId(0), NodeId(2)), 2.0);
    }
}
