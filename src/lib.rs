//! # range-analysis: interval analysis over a sparse constraint graph
//!
//! **`range-analysis`** infers, for every value of an SSA program, the set of
//! integers it may hold. Values have a fixed bit-width and wrap around, and
//! reals are tracked through the fields of their IEEE-754 bit pattern.
//!
//! ## How it works
//!
//! The program is turned into a [`ConstraintGraph`][crate::graph::ConstraintGraph]:
//! one variable node per value and one operation node per statement. Branch
//! conditions restrict values on each outgoing edge through sigma operations,
//! either by a constant range or symbolically by another value.
//!
//! The graph is solved one strongly connected component at a time. Loops are
//! widened (to program constants first, then to infinity) and narrowed back
//! once symbolic bounds are known.
//!
//! ## Basic Usage
//!
//! ```rust
//! use range_analysis::config::SolverConfig;
//! use range_analysis::graph::ConstraintGraph;
//! use range_analysis::ir::{BinaryOpcode, Expr, Program, StmtKind, Type};
//! use range_analysis::predicate::Predicate;
//!
//! // if (x < 10) y = x % 4;
//! let mut p = Program::new();
//! let entry = p.add_block();
//! let then_bb = p.add_block();
//! let else_bb = p.add_block();
//! let ty = Type::int(32, false);
//! let x = p.add_value("x", ty);
//! let ten = p.add_int_constant(ty, 10);
//! let four = p.add_int_constant(ty, 4);
//! let xt = p.add_value("x.t", ty);
//! let y = p.add_value("y", ty);
//! let branch = StmtKind::Branch {
//!     pred: Predicate::Lt,
//!     lhs: x,
//!     rhs: ten,
//!     true_bb: then_bb,
//!     false_bb: else_bb,
//! };
//! p.add_stmt(entry, branch);
//! p.add_stmt(then_bb, StmtKind::Sigma { dst: xt, source: x });
//! let expr = Expr::Binary { opcode: BinaryOpcode::Rem, lhs: xt, rhs: four };
//! p.add_stmt(then_bb, StmtKind::Assign { dst: y, expr });
//!
//! let mut graph = ConstraintGraph::build(&p, SolverConfig::default());
//! graph.find_intervals();
//! println!("y = {}", graph.range_of(y).unwrap());
//! ```
//!
//! ## Core Components
//!
//! - **[`range`]** and **[`real_range`]**: the interval domain and its transfer functions.
//! - **[`graph`]**: constraint-graph construction and the fixed-point solver.
//! - **[`dot`]**: Graphviz output of a solved graph.

pub mod apint;
pub mod bit_lattice;
pub mod config;
pub mod container;
pub mod dot;
pub mod graph;
pub mod interval;
pub mod ir;
pub mod meet;
pub mod op_node;
pub mod predicate;
pub mod range;
pub mod real_range;
pub mod scc;
pub mod types;
pub mod value_range;
pub mod var_node;
