//! Class hierarchy over the whole program.
//!
//! Maps every type to its direct and transitive subtypes. Only makes sense
//! with the whole program loaded; partial views would silently lose
//! subclasses and with them dispatch targets.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use petgraph::Direction;
use tracing::debug;

use crate::program::{TypeId, WholeProgram};

/// Relationship carried by a hierarchy edge, supertype to subtype
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtypeEdge {
    /// Subclass or subinterface of a declared superclass/superinterface
    Extends,
    /// Class or struct directly implementing an interface
    Implements,
}

/// Subtype DAG over all program types at unbound generic identity
///
/// `GenericSub<T> : GenericSuper<T>` contributes a single edge between the
/// two unbound definitions, and a closed specialization relates to the
/// unbound definition the same way. Interfaces participate in the DAG and
/// are additionally recorded as subtypes of the platform object root when
/// the program declares one. Built once and immutable afterwards; safe to
/// share across independent analysis runs.
#[derive(Debug)]
pub struct ClassHierarchy {
    graph: DiGraph<TypeId, SubtypeEdge>,

    /// Node handle per type, indexed by `TypeId`
    nodes: Vec<NodeIndex>,
}

impl ClassHierarchy {
    /// Build the hierarchy from the program's type sequence
    pub fn new(program: &WholeProgram) -> Self {
        let mut graph = DiGraph::new();
        let nodes: Vec<NodeIndex> = program.types().map(|ty| graph.add_node(ty.id)).collect();

        let object_root = program.object_root();

        for ty in program.types() {
            if let Some(base) = ty.base {
                graph.add_edge(nodes[base.index()], nodes[ty.id.index()], SubtypeEdge::Extends);
            }
            for &interface in &ty.interfaces {
                let kind = if ty.is_interface() {
                    SubtypeEdge::Extends
                } else {
                    SubtypeEdge::Implements
                };
                graph.add_edge(nodes[interface.index()], nodes[ty.id.index()], kind);
            }

            // Interfaces have no declared superclass but still dispatch
            // through the platform root.
            if ty.is_interface() {
                if let Some(root) = object_root {
                    if root != ty.id {
                        graph.add_edge(
                            nodes[root.index()],
                            nodes[ty.id.index()],
                            SubtypeEdge::Implements,
                        );
                    }
                }
            }
        }

        debug!(
            "Built class hierarchy: {} types, {} subtype edges",
            graph.node_count(),
            graph.edge_count()
        );

        Self { graph, nodes }
    }

    /// Immediate subclasses, subinterfaces, and directly implementing
    /// classes of a type, one hop down
    pub fn direct_subclasses(&self, ty: TypeId) -> impl Iterator<Item = TypeId> + '_ {
        self.graph
            .neighbors_directed(self.nodes[ty.index()], Direction::Outgoing)
            .filter_map(|node| self.graph.node_weight(node).copied())
    }

    /// Transitive subtypes of a type, excluding the type itself
    pub fn all_subclasses(&self, ty: TypeId) -> Vec<TypeId> {
        let start = self.nodes[ty.index()];
        let mut collected = Vec::new();

        let mut dfs = Dfs::new(&self.graph, start);
        while let Some(node) = dfs.next(&self.graph) {
            if node == start {
                continue;
            }
            if let Some(&sub) = self.graph.node_weight(node) {
                collected.push(sub);
            }
        }

        collected
    }

    /// Whether `sub` is `sup` or one of its transitive subtypes
    pub fn is_self_or_subclass(&self, sub: TypeId, sup: TypeId) -> bool {
        sub == sup || self.all_subclasses(sup).contains(&sub)
    }
}
