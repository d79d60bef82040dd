//! Cycle detection over declared `requires` edges
//!
//! Three-color depth-first search with Tarjan low-links. White modules are
//! unvisited, grey modules sit on the search stack, black modules belong to a
//! finished component. Every edge whose endpoints share a component of two or
//! more modules lies on a cycle and is reported.

use crate::directive::{ModuleDescriptor, Requires};
use crate::name::ModuleId;
use crate::table::ModuleTable;
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Grey,
    Black,
}

/// A declared `requires` that closes a cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CyclicEdge<'a> {
    pub from: &'a ModuleId,
    pub requires: &'a Requires,
}

/// Result of the cycle search
#[derive(Debug, Default)]
pub struct CycleReport<'a> {
    /// Offending edges, ordered by declaring module then declaration order
    pub edges: Vec<CyclicEdge<'a>>,
    /// Modules that sit on at least one cycle
    pub modules: BTreeSet<ModuleId>,
}

impl CycleReport<'_> {
    pub fn is_acyclic(&self) -> bool {
        self.edges.is_empty()
    }
}

struct Search<'a> {
    edges: Vec<Vec<(usize, &'a Requires)>>,
    color: Vec<Color>,
    index: Vec<usize>,
    low: Vec<usize>,
    component: Vec<usize>,
    component_sizes: Vec<usize>,
    stack: Vec<usize>,
    next_index: usize,
}

impl Search<'_> {
    fn enter(&mut self, node: usize) {
        self.color[node] = Color::Grey;
        self.index[node] = self.next_index;
        self.low[node] = self.next_index;
        self.next_index += 1;
        self.stack.push(node);
    }

    /// Iterative search from `root`; each frame is (node, next edge to follow)
    fn visit(&mut self, root: usize) {
        self.enter(root);
        let mut frames = vec![(root, 0usize)];

        while let Some(frame) = frames.last_mut() {
            let (node, edge) = *frame;
            if let Some(&(target, _)) = self.edges[node].get(edge) {
                frame.1 += 1;
                match self.color[target] {
                    Color::White => {
                        self.enter(target);
                        frames.push((target, 0));
                    }
                    Color::Grey => {
                        self.low[node] = self.low[node].min(self.index[target]);
                    }
                    Color::Black => {}
                }
                continue;
            }

            frames.pop();
            if let Some(&(parent, _)) = frames.last() {
                self.low[parent] = self.low[parent].min(self.low[node]);
            }
            if self.low[node] == self.index[node] {
                self.close_component(node);
            }
        }
    }

    fn close_component(&mut self, node: usize) {
        let id = self.component_sizes.len();
        let mut size = 0;
        while let Some(member) = self.stack.pop() {
            self.color[member] = Color::Black;
            self.component[member] = id;
            size += 1;
            if member == node {
                break;
            }
        }
        self.component_sizes.push(size);
    }
}

/// Find every declared `requires` edge among `members` that lies on a cycle
///
/// Automatic modules declare no `requires` and never take part.
pub fn find_cycles<'a>(table: &'a ModuleTable, members: &BTreeSet<ModuleId>) -> CycleReport<'a> {
    let nodes: Vec<&'a ModuleDescriptor> = members
        .iter()
        .filter_map(|m| table.get(m.as_str()))
        .map(|e| &e.descriptor)
        .filter(|d| !d.is_automatic())
        .collect();
    let index_of: HashMap<&str, usize> = nodes
        .iter()
        .enumerate()
        .map(|(i, d)| (d.name.as_str(), i))
        .collect();

    let edges = nodes
        .iter()
        .map(|d| {
            d.requires
                .iter()
                .filter_map(|r| index_of.get(r.target.as_str()).map(|&t| (t, r)))
                .collect()
        })
        .collect();

    let count = nodes.len();
    let mut search = Search {
        edges,
        color: vec![Color::White; count],
        index: vec![0; count],
        low: vec![0; count],
        component: vec![0; count],
        component_sizes: Vec::new(),
        stack: Vec::new(),
        next_index: 0,
    };
    for node in 0..count {
        if search.color[node] == Color::White {
            search.visit(node);
        }
    }

    let mut report = CycleReport::default();
    for (node, &descriptor) in nodes.iter().enumerate() {
        let component = search.component[node];
        if search.component_sizes[component] < 2 {
            continue;
        }
        report.modules.insert(descriptor.name.clone());
        for &(target, requires) in &search.edges[node] {
            if search.component[target] == component {
                report.edges.push(CyclicEdge {
                    from: &descriptor.name,
                    requires,
                });
            }
        }
    }
    report
}
