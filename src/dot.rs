//! Constraint graph to DOT (Graphviz) conversion.
//!
//! Variables are drawn with their current range; operations are separate
//! nodes with an edge from each source and one edge to the sink. Symbolic
//! intersects add a dashed edge from their bound to the sigma they constrain.
//!
//! ```
//! use range_analysis::config::SolverConfig;
//! use range_analysis::graph::ConstraintGraph;
//! use range_analysis::ir::{Expr, Program, StmtKind, Type, UnaryOpcode};
//!
//! let mut p = Program::new();
//! let bb = p.add_block();
//! let x = p.add_value("x", Type::int(8, true));
//! let y = p.add_value("y", Type::int(16, true));
//! let convert = Expr::Unary { opcode: UnaryOpcode::Convert, arg: x };
//! p.add_stmt(bb, StmtKind::Assign { dst: y, expr: convert });
//!
//! let mut graph = ConstraintGraph::build(&p, SolverConfig::default());
//! graph.find_intervals();
//! let dot = graph.to_dot().unwrap();
//! assert!(dot.contains("sext i16"));
//! // Render with: dot -Tpng graph.dot -o graph.png
//! ```

use std::fmt::Write as _;

use crate::graph::ConstraintGraph;
use crate::ir::{Constant, UnaryOpcode};
use crate::op_node::{OpKind, OpNode};
use crate::types::VarId;

/// Visual options for DOT output. Use `DotConfig::default()` for the standard look.
#[derive(Debug, Clone)]
pub struct DotConfig {
    /// Shape of every node (default: "record")
    pub node_shape: &'static str,
    /// Font of node labels (default: "Times-Roman")
    pub font_name: &'static str,
    pub font_size: u32,
    /// Style of control-dependence edges (default: "dashed")
    pub pseudo_edge_style: &'static str,
}

impl Default for DotConfig {
    fn default() -> Self {
        Self {
            node_shape: "record",
            font_name: "Times-Roman",
            font_size: 14,
            pseudo_edge_style: "dashed",
        }
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

impl ConstraintGraph<'_> {
    /// Converts the constraint graph with its current ranges to DOT format.
    pub fn to_dot(&self) -> Result<String, std::fmt::Error> {
        self.to_dot_with_config(&DotConfig::default())
    }

    pub fn to_dot_with_config(&self, config: &DotConfig) -> Result<String, std::fmt::Error> {
        let nodes = self.nodes();

        let mut dot = String::new();
        writeln!(dot, "digraph dotgraph {{")?;
        writeln!(dot, "label=\"Constraint Graph for 'all' functions\";")?;
        writeln!(
            dot,
            "node [shape={},fontname=\"{}\",fontsize={}];",
            config.node_shape, config.font_name, config.font_size
        )?;

        for var in nodes.var_ids() {
            let node = nodes.var(var);
            let value = node.value();
            if self.program().is_constant(value) {
                writeln!(
                    dot,
                    " {} [label=\"{}\"];",
                    self.var_key(var),
                    escape(&self.constant_label(var)),
                )?;
            } else {
                let name = escape(self.program().name(value));
                writeln!(dot, " \"{}\" [label=\"{} {}\"];", name, name, node.range())?;
            }
        }

        for id in nodes.op_ids() {
            let op = nodes.op(id);
            writeln!(dot, " \"{}\" [label=\"{}\"];", id, escape(&self.op_label(op)))?;
            for source in op.sources() {
                writeln!(dot, " {} -> \"{}\";", self.var_key(source), id)?;
            }
            writeln!(dot, " \"{}\" -> {};", id, self.var_key(op.sink()))?;
            if let OpKind::Sigma {
                symbolic_source: Some(bound),
                ..
            } = op.kind()
            {
                writeln!(dot, " {} -> \"{}\";", self.var_key(*bound), id)?;
            }
        }

        for (bound, sinks) in self.control_dependences() {
            for sink in sinks {
                writeln!(
                    dot,
                    " {} -> {} [style={}];",
                    self.var_key(bound),
                    self.var_key(sink),
                    config.pseudo_edge_style
                )?;
            }
        }

        writeln!(dot, "}}")?;
        Ok(dot)
    }

    /// Node identifier of a variable: its quoted name, or a constant's value.
    fn var_key(&self, var: VarId) -> String {
        let value = self.nodes().var(var).value();
        match self.program().constant(value) {
            Some(Constant::Int(c)) => c.to_string(),
            Some(Constant::Real(_)) => format!("\"{}\"", escape(&self.constant_label(var))),
            None => format!("\"{}\"", escape(self.program().name(value))),
        }
    }

    fn constant_label(&self, var: VarId) -> String {
        let value = self.nodes().var(var).value();
        match self.program().constant(value) {
            Some(Constant::Int(c)) => c.to_string(),
            Some(Constant::Real(bits)) => format!("{:#x}", bits),
            None => self.program().name(value).to_string(),
        }
    }

    fn op_label(&self, op: &OpNode) -> String {
        let p = self.program();
        let ty = |v: VarId| p.ty(self.nodes().var(v).value());
        match op.kind() {
            OpKind::Unary {
                source,
                opcode: UnaryOpcode::Convert,
            } => {
                let (from, to) = (ty(*source), ty(op.sink()));
                let kind = if to.bit_width() < from.bit_width() {
                    "trunc"
                } else if to.bit_width() == from.bit_width() {
                    return format!("convert {}", to);
                } else if from.is_signed() {
                    "sext"
                } else {
                    "zext"
                };
                format!("{} i{}", kind, to.bit_width())
            }
            OpKind::Unary { opcode, .. } => opcode.name().to_string(),
            OpKind::Sigma { .. } => format!("SigmaOp:{}", op.intersect()),
            OpKind::Binary { opcode, .. } => opcode.name().to_string(),
            OpKind::Ternary { opcode, .. } => opcode.name().to_string(),
            OpKind::Phi { .. } => "phi".to_string(),
            OpKind::Load { .. } => "LoadOp".to_string(),
        }
    }
}
