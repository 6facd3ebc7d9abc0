//! Strongly connected components of the constraint graph.
//!
//! Uses Nuutila's variant of Tarjan's algorithm. Edges go from a variable to
//! the sinks of the operations using it, plus the control-dependence edges
//! from the bound of each symbolic intersect to the sink it constrains.

use std::collections::{BTreeSet, HashMap};

use crate::container::NodeContainer;
use crate::types::VarId;

/// Control-dependence edges: bound variable to constrained sinks.
pub type PseudoEdges = HashMap<VarId, BTreeSet<VarId>>;

struct Nuutila<'a> {
    nodes: &'a NodeContainer,
    pseudo: &'a PseudoEdges,
    index: usize,
    dfs: Vec<Option<usize>>,
    root: Vec<VarId>,
    in_component: Vec<bool>,
    stack: Vec<VarId>,
    components: Vec<Vec<VarId>>,
}

impl<'a> Nuutila<'a> {
    fn new(nodes: &'a NodeContainer, pseudo: &'a PseudoEdges) -> Self {
        let n = nodes.var_nodes().len();
        Self {
            nodes,
            pseudo,
            index: 0,
            dfs: vec![None; n],
            root: nodes.var_ids().collect(),
            in_component: vec![false; n],
            stack: Vec::new(),
            components: Vec::new(),
        }
    }

    fn successors(&self, v: VarId) -> Vec<VarId> {
        let mut succ: Vec<VarId> = self.nodes.uses(v).map(|op| self.nodes.op(op).sink()).collect();
        if let Some(sinks) = self.pseudo.get(&v) {
            succ.extend(sinks.iter().copied());
        }
        succ
    }

    fn dfs_of(&self, v: VarId) -> usize {
        self.dfs[v.index()].unwrap_or(usize::MAX)
    }

    fn visit(&mut self, v: VarId) {
        self.dfs[v.index()] = Some(self.index);
        self.index += 1;

        for w in self.successors(v) {
            if self.dfs[w.index()].is_none() {
                self.visit(w);
            }
            let (rv, rw) = (self.root[v.index()], self.root[w.index()]);
            if !self.in_component[w.index()] && self.dfs_of(rv) >= self.dfs_of(rw) {
                self.root[v.index()] = rw;
            }
        }

        if self.root[v.index()] == v {
            self.in_component[v.index()] = true;
            let mut component = vec![v];
            let own = self.dfs_of(v);
            while let Some(&top) = self.stack.last() {
                if self.dfs_of(top) <= own {
                    break;
                }
                self.stack.pop();
                self.in_component[top.index()] = true;
                component.push(top);
            }
            self.components.push(component);
        } else {
            self.stack.push(v);
        }
    }
}

/// Components in topological order: every component comes before the
/// components its variables flow into.
pub fn components(nodes: &NodeContainer, pseudo: &PseudoEdges) -> Vec<Vec<VarId>> {
    let mut n = Nuutila::new(nodes, pseudo);
    for v in nodes.var_ids() {
        if n.dfs[v.index()].is_none() {
            n.visit(v);
        }
    }
    let mut components = n.components;
    components.reverse();
    components
}
