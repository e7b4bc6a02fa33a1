// Blast radius: what a change to one resource can reach, by relationship.
//
// Callers are walked breadth-first over inbound behavioral edges up to a
// depth bound; everything else is one hop.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use chunkgraph_extract::{ResourceIdentifier, SemanticCategory};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analyze::{Cycle, CycleAnalyzer};
use crate::store::ResourceGraph;

/// Default traversal bound for indirect callers.
pub const DEFAULT_DEPTH: usize = 3;

/// A caller two or more hops from the target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndirectCaller {
    pub id: ResourceIdentifier,
    pub depth: usize,
    /// Call chain from this caller down to the target, both ends included.
    pub path: Vec<ResourceIdentifier>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlastRadius {
    pub target: ResourceIdentifier,
    pub max_depth: usize,
    pub direct_callers: Vec<ResourceIdentifier>,
    pub indirect_callers: Vec<IndirectCaller>,
    pub direct_callees: Vec<ResourceIdentifier>,
    pub cyclic_peers: Vec<ResourceIdentifier>,
    pub visual_dependents: Vec<ResourceIdentifier>,
    pub tuning_dependents: Vec<ResourceIdentifier>,
}

impl BlastRadius {
    fn empty(target: ResourceIdentifier, max_depth: usize) -> Self {
        Self {
            target,
            max_depth,
            direct_callers: Vec::new(),
            indirect_callers: Vec::new(),
            direct_callees: Vec::new(),
            cyclic_peers: Vec::new(),
            visual_dependents: Vec::new(),
            tuning_dependents: Vec::new(),
        }
    }

    /// Distinct resources across every bucket.
    pub fn total_affected(&self) -> usize {
        let mut all: HashSet<ResourceIdentifier> = HashSet::new();
        all.extend(&self.direct_callers);
        all.extend(self.indirect_callers.iter().map(|c| c.id));
        all.extend(&self.direct_callees);
        all.extend(&self.cyclic_peers);
        all.extend(&self.visual_dependents);
        all.extend(&self.tuning_dependents);
        all.len()
    }

    /// Buckets keyed by relationship name, identifiers rendered as text.
    pub fn as_category_map(&self) -> BTreeMap<&'static str, Vec<String>> {
        let render = |ids: &[ResourceIdentifier]| -> Vec<String> {
            ids.iter().map(ToString::to_string).collect()
        };
        let mut map = BTreeMap::new();
        map.insert("direct_callers", render(&self.direct_callers));
        map.insert(
            "indirect_callers",
            self.indirect_callers.iter().map(|c| c.id.to_string()).collect(),
        );
        map.insert("direct_callees", render(&self.direct_callees));
        map.insert("cyclic_peers", render(&self.cyclic_peers));
        map.insert("visual_dependents", render(&self.visual_dependents));
        map.insert("tuning_dependents", render(&self.tuning_dependents));
        map
    }
}

/// Computes blast radii against one graph, reusing one cycle analysis.
#[derive(Debug)]
pub struct BlastRadiusCalculator<'g> {
    graph: &'g ResourceGraph,
    cycles: Vec<Cycle>,
}

impl<'g> BlastRadiusCalculator<'g> {
    pub fn new(graph: &'g ResourceGraph) -> Self {
        Self {
            graph,
            cycles: CycleAnalyzer::find_cycles(graph),
        }
    }

    pub fn with_cycles(graph: &'g ResourceGraph, cycles: Vec<Cycle>) -> Self {
        Self { graph, cycles }
    }

    /// Blast radius of `target`. Unknown identifiers yield empty buckets.
    /// A depth below 1 is treated as 1; direct callers are always reported.
    pub fn compute(&self, target: &ResourceIdentifier, max_depth: usize) -> BlastRadius {
        let max_depth = max_depth.max(1);
        let mut result = BlastRadius::empty(*target, max_depth);
        if !self.graph.contains(target) {
            return result;
        }

        self.walk_callers(&mut result);

        result.direct_callees = dedup(
            self.graph
                .what_references(target)
                .iter()
                .map(|e| e.target)
                .filter(|id| id != target),
        );

        let mut peers: Vec<ResourceIdentifier> =
            CycleAnalyzer::cycles_containing(&self.cycles, target)
            .flat_map(|c| c.members.iter().copied())
            .filter(|id| id != target)
            .collect();
        peers.sort_unstable();
        peers.dedup();
        result.cyclic_peers = peers;

        let inbound = self.graph.who_references(target);
        let sources_with = |category: SemanticCategory| {
            dedup(inbound.iter().filter(|e| e.is(category)).map(|e| e.source))
        };
        result.visual_dependents = sources_with(SemanticCategory::Visual);
        result.tuning_dependents = sources_with(SemanticCategory::Tuning);

        debug!(
            target = %target,
            direct = result.direct_callers.len(),
            indirect = result.indirect_callers.len(),
            "Blast radius computed"
        );
        result
    }

    /// Bounded BFS over inbound behavioral edges. Each node is visited once;
    /// `toward` records the next hop back toward the target for path rebuilds.
    fn walk_callers(&self, result: &mut BlastRadius) {
        let target = result.target;
        let mut toward: HashMap<ResourceIdentifier, ResourceIdentifier> = HashMap::new();
        let mut visited: HashSet<ResourceIdentifier> = HashSet::from([target]);
        let mut queue: VecDeque<(ResourceIdentifier, usize)> = VecDeque::from([(target, 0)]);

        while let Some((current, depth)) = queue.pop_front() {
            if depth == result.max_depth {
                continue;
            }
            for edge in self.graph.who_references(&current) {
                if !edge.is(SemanticCategory::Behavioral) || !visited.insert(edge.source) {
                    continue;
                }
                let caller = edge.source;
                toward.insert(caller, current);
                let caller_depth = depth + 1;
                if caller_depth == 1 {
                    result.direct_callers.push(caller);
                } else {
                    result.indirect_callers.push(IndirectCaller {
                        id: caller,
                        depth: caller_depth,
                        path: path_to(caller, target, &toward),
                    });
                }
                queue.push_back((caller, caller_depth));
            }
        }
    }
}

fn path_to(
    from: ResourceIdentifier,
    target: ResourceIdentifier,
    toward: &HashMap<ResourceIdentifier, ResourceIdentifier>,
) -> Vec<ResourceIdentifier> {
    let mut path = vec![from];
    let mut current = from;
    while current != target {
        let Some(&next) = toward.get(&current) else {
            break;
        };
        path.push(next);
        current = next;
    }
    path
}

fn dedup(ids: impl Iterator<Item = ResourceIdentifier>) -> Vec<ResourceIdentifier> {
    let mut seen = HashSet::new();
    ids.filter(|id| seen.insert(*id)).collect()
}
