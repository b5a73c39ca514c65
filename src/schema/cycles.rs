//! Cycle detection with Tarjan's strongly connected components.

use super::TableKey;
use std::collections::{BTreeMap, BTreeSet};

/// Child → parents adjacency borrowed from the requested key set
pub(crate) type SubGraph<'a> = BTreeMap<&'a TableKey, BTreeSet<&'a TableKey>>;

/// Every multi-table cycle in the graph, each as a path in discovery order.
///
/// Nodes and neighbours are visited in sorted order so the report is stable.
pub(crate) fn find_cycles(graph: &SubGraph<'_>) -> Vec<Vec<TableKey>> {
    let mut finder = TarjanScc::new(graph);
    finder.find_sccs();

    finder
        .sccs
        .into_iter()
        .filter(|scc| scc.len() > 1)
        .map(|scc| scc.into_iter().rev().cloned().collect())
        .collect()
}

struct TarjanScc<'g, 'a> {
    graph: &'g SubGraph<'a>,
    index_counter: usize,
    stack: Vec<&'a TableKey>,
    on_stack: BTreeSet<&'a TableKey>,
    indices: BTreeMap<&'a TableKey, usize>,
    lowlinks: BTreeMap<&'a TableKey, usize>,
    sccs: Vec<Vec<&'a TableKey>>,
}

impl<'g, 'a> TarjanScc<'g, 'a> {
    fn new(graph: &'g SubGraph<'a>) -> Self {
        Self {
            graph,
            index_counter: 0,
            stack: Vec::new(),
            on_stack: BTreeSet::new(),
            indices: BTreeMap::new(),
            lowlinks: BTreeMap::new(),
            sccs: Vec::new(),
        }
    }

    fn find_sccs(&mut self) {
        let graph = self.graph;
        for &node in graph.keys() {
            if !self.indices.contains_key(node) {
                self.strongconnect(node);
            }
        }
    }

    fn strongconnect(&mut self, v: &'a TableKey) {
        self.indices.insert(v, self.index_counter);
        self.lowlinks.insert(v, self.index_counter);
        self.index_counter += 1;
        self.stack.push(v);
        self.on_stack.insert(v);

        let graph = self.graph;
        if let Some(successors) = graph.get(v) {
            for &w in successors {
                if !self.indices.contains_key(w) {
                    self.strongconnect(w);
                    let low = self.lowlinks[v].min(self.lowlinks[w]);
                    self.lowlinks.insert(v, low);
                } else if self.on_stack.contains(w) {
                    let low = self.lowlinks[v].min(self.indices[w]);
                    self.lowlinks.insert(v, low);
                }
            }
        }

        // v is the root of an SCC: pop it off the stack
        if self.lowlinks[v] == self.indices[v] {
            let mut scc = Vec::new();
            while let Some(w) = self.stack.pop() {
                self.on_stack.remove(w);
                scc.push(w);
                if w == v {
                    break;
                }
            }
            self.sccs.push(scc);
        }
    }
}
