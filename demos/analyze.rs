use clap::{Parser, ValueEnum};

use range_analysis::config::{MeetStrategy, RangeConfig, SolverConfig};
use range_analysis::graph::ConstraintGraph;
use range_analysis::ir::{BinaryOpcode, Expr, Program, StmtKind, Type, UnaryOpcode};
use range_analysis::predicate::Predicate;
use range_analysis::types::{BlockId, ValueId};

#[derive(Debug, Copy, Clone, ValueEnum)]
enum Sample {
    /// `for (i = 0; i < 100; i++) sum += i & 7;`
    Loop,
    /// `n = a & 15; if (x < n) y = x + 1;`
    Branch,
    /// Exponent of a float extracted through its bit pattern.
    Float,
}

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Sample program to analyse.
    #[arg(value_enum, default_value = "loop")]
    sample: Sample,

    /// Widening/narrowing strategy (cousot or cropdfs).
    #[clap(long, value_name = "STRATEGY", default_value = "cousot")]
    meet: MeetStrategy,

    /// Analysis options, e.g. `no_mul`, `ternary`.
    #[clap(long = "option", value_name = "OPTION")]
    options: Vec<String>,

    /// Print the constraint graph in DOT format instead of the ranges.
    #[clap(long)]
    dot: bool,
}

fn binary(dst: ValueId, opcode: BinaryOpcode, lhs: ValueId, rhs: ValueId) -> StmtKind {
    StmtKind::Assign {
        dst,
        expr: Expr::Binary { opcode, lhs, rhs },
    }
}

fn branch(
    pred: Predicate,
    lhs: ValueId,
    rhs: ValueId,
    true_bb: BlockId,
    false_bb: BlockId,
) -> StmtKind {
    StmtKind::Branch {
        pred,
        lhs,
        rhs,
        true_bb,
        false_bb,
    }
}

fn counting_loop() -> Program {
    let mut p = Program::new();
    let entry = p.add_block();
    let header = p.add_block();
    let body = p.add_block();
    let exit = p.add_block();
    let ty = Type::int(32, true);
    let zero = p.add_int_constant(ty, 0);
    let one = p.add_int_constant(ty, 1);
    let seven = p.add_int_constant(ty, 7);
    let hundred = p.add_int_constant(ty, 100);
    let i = p.add_value("i", ty);
    let sum = p.add_value("sum", ty);
    let i_body = p.add_value("i.body", ty);
    let i_exit = p.add_value("i.exit", ty);
    let low = p.add_value("low", ty);
    let sum_next = p.add_value("sum.next", ty);
    let i_next = p.add_value("i.next", ty);

    let phi = |dst, next| StmtKind::Phi {
        dst,
        incoming: vec![(entry, zero), (body, next)],
    };
    p.add_stmt(header, phi(i, i_next));
    p.add_stmt(header, phi(sum, sum_next));
    p.add_stmt(header, branch(Predicate::Lt, i, hundred, body, exit));
    p.add_stmt(body, StmtKind::Sigma { dst: i_body, source: i });
    p.add_stmt(body, binary(low, BinaryOpcode::BitAnd, i_body, seven));
    p.add_stmt(body, binary(sum_next, BinaryOpcode::Plus, sum, low));
    p.add_stmt(body, binary(i_next, BinaryOpcode::Plus, i_body, one));
    p.add_stmt(exit, StmtKind::Sigma { dst: i_exit, source: i });
    p
}

fn symbolic_branch() -> Program {
    let mut p = Program::new();
    let entry = p.add_block();
    let then_bb = p.add_block();
    let else_bb = p.add_block();
    let ty = Type::int(8, true);
    let a = p.add_value("a", ty);
    let x = p.add_value("x", ty);
    let n = p.add_value("n", ty);
    let mask = p.add_int_constant(ty, 15);
    let one = p.add_int_constant(ty, 1);
    let xt = p.add_value("x.t", ty);
    let xf = p.add_value("x.f", ty);
    let y = p.add_value("y", ty);

    p.add_stmt(entry, binary(n, BinaryOpcode::BitAnd, a, mask));
    p.add_stmt(entry, branch(Predicate::Lt, x, n, then_bb, else_bb));
    p.add_stmt(then_bb, StmtKind::Sigma { dst: xt, source: x });
    p.add_stmt(then_bb, binary(y, BinaryOpcode::Plus, xt, one));
    p.add_stmt(else_bb, StmtKind::Sigma { dst: xf, source: x });
    p
}

fn float_exponent() -> Program {
    let mut p = Program::new();
    let entry = p.add_block();
    let other = p.add_block();
    let join = p.add_block();
    let u32t = Type::int(32, false);
    let one = p.f32_constant(1.0);
    let half = p.f32_constant(0.5);
    let g = p.add_value("g", Type::real(32));
    let bits = p.add_value("bits", u32t);
    let shifted = p.add_value("shifted", u32t);
    let exp = p.add_value("exp", u32t);
    let c23 = p.add_int_constant(u32t, 23);
    let cff = p.add_int_constant(u32t, 0xFF);

    p.add_stmt(
        join,
        StmtKind::Phi {
            dst: g,
            incoming: vec![(entry, one), (other, half)],
        },
    );
    let view = Expr::Unary {
        opcode: UnaryOpcode::ViewConvert,
        arg: g,
    };
    p.add_stmt(join, StmtKind::Assign { dst: bits, expr: view });
    p.add_stmt(join, binary(shifted, BinaryOpcode::Shr, bits, c23));
    p.add_stmt(join, binary(exp, BinaryOpcode::BitAnd, shifted, cff));
    p
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    simplelog::TermLogger::init(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let time_total = std::time::Instant::now();

    let args = Cli::parse();
    log::info!("args = {:?}", args);

    let config = SolverConfig {
        meet: args.meet,
        ranges: RangeConfig::from_options(args.options.iter().map(String::as_str))?,
        ..SolverConfig::default()
    };

    let program = match args.sample {
        Sample::Loop => counting_loop(),
        Sample::Branch => symbolic_branch(),
        Sample::Float => float_exponent(),
    };

    let mut graph = ConstraintGraph::build(&program, config);
    graph.find_intervals();

    if args.dot {
        print!("{}", graph.to_dot()?);
    } else {
        for value in program.values() {
            if program.is_constant(value) {
                continue;
            }
            if let Some(range) = graph.range_of(value) {
                println!("{:>10}: {} {}", program.name(value), program.ty(value), range);
            }
        }
        for block in graph.dead_blocks() {
            println!("unreachable: {}", block);
        }
    }

    log::info!("Analysis finished in {:.3} s", time_total.elapsed().as_secs_f64());
    Ok(())
}
