mod benchmark;

use std::collections::HashMap;
use std::fs::File;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use benchmark::run_benchmark;
use clap::{Args, Parser, Subcommand};
use knapsacksolver::generate::GenerateArgs;
use knapsacksolver::{
    BabSolver, BalknapSolver, BellmanSolver, GreedyNlognSolver, GreedySolver, Instance,
    KnapsackSolver, Method, MinknapParams, MinknapSolver, Profit, UpperBound, Weight,
};
use lazy_static::lazy_static;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about = "Exact solvers for the 0/1 knapsack problem")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Solve an instance file.
    Solve(SolveArgs),
    /// Generate a random instance.
    Generate(GenerateArgs),
    /// Time an algorithm on an instance.
    Bench(BenchArgs),
}

#[derive(Debug, Clone, Copy, Args)]
struct SolverOptions {
    /// Upper bound used by the core solver.
    #[arg(long, value_enum, default_value_t = UpperBound::Dantzig)]
    upper_bound: UpperBound,

    /// Variable reduction: 0 none, 1 Dembo bounds, 2 Dantzig bounds.
    #[arg(long, default_value_t = 0)]
    reduction: u8,

    /// Solve the surrogate instance for a better initial solution.
    #[arg(long)]
    surrogate: bool,
}

#[derive(Debug, Args)]
struct SolveArgs {
    /// Instance file; its directory must contain a FORMAT.txt.
    #[arg(short, long, value_name = "INSTANCE_FILE", value_hint = clap::ValueHint::FilePath)]
    input: PathBuf,

    #[arg(short, long, value_enum, default_value_t = Method::DpMinknap)]
    algorithm: Method,

    #[command(flatten)]
    options: SolverOptions,

    /// Validate this certificate against the instance instead of solving.
    #[arg(long, value_name = "CERT_FILE")]
    cert: Option<PathBuf>,

    /// Write the solution as a whitespace-separated 0/1 vector.
    #[arg(short, long, value_name = "OUTPUT_FILE")]
    output: Option<PathBuf>,

    /// Write a JSON solve report (printed on stdout when omitted).
    #[arg(long, value_name = "REPORT_FILE")]
    report: Option<PathBuf>,

    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Args)]
struct BenchArgs {
    #[arg(short, long, value_name = "INSTANCE_FILE", value_hint = clap::ValueHint::FilePath)]
    input: PathBuf,

    #[arg(short, long, value_enum, default_value_t = Method::DpMinknap)]
    algorithm: Method,

    #[command(flatten)]
    options: SolverOptions,

    #[arg(short, long, value_name = "OUTPUT_FILE", default_value = "bench.json")]
    output: PathBuf,
}

#[derive(Debug, Serialize)]
struct SolveReport {
    algorithm: String,
    profit: Profit,
    weight: Weight,
    item_number: usize,
    proven_optimal: bool,
    elapsed_ms: u128,
}

type SolverFactory = fn(&SolverOptions) -> Box<dyn KnapsackSolver>;

lazy_static! {
    static ref METHOD_MAPPER: HashMap<Method, SolverFactory> = {
        let mut m: HashMap<Method, SolverFactory> = HashMap::new();
        m.insert(Method::Greedy, |_| Box::new(GreedySolver));
        m.insert(Method::GreedyNlogn, |_| Box::new(GreedyNlognSolver));
        m.insert(Method::DpBellman, |_| Box::new(BellmanSolver));
        m.insert(Method::DpBalknap, |_| Box::new(BalknapSolver));
        m.insert(Method::BabStar, |_| Box::new(BabSolver));
        m.insert(Method::DpMinknap, |options| {
            Box::new(MinknapSolver::new(MinknapParams {
                upper_bound: options.upper_bound,
                reduction: options.reduction,
                surrogate: options.surrogate,
                ..MinknapParams::default()
            }))
        });
        m
    };
}

fn get_solver(method: Method, options: &SolverOptions) -> Box<dyn KnapsackSolver> {
    METHOD_MAPPER[&method](options)
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn solve(args: SolveArgs) -> Result<i32> {
    init_tracing(args.verbose);
    let mut ins = Instance::from_file(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;

    if let Some(cert) = &args.cert {
        let profit = ins
            .check(cert)
            .with_context(|| format!("reading {}", cert.display()))?;
        println!("{}", profit);
        return Ok(if profit >= 0 { 0 } else { 2 });
    }

    let infeasible = ins.total_item_number() > 0
        && (0..ins.total_item_number() as knapsacksolver::ItemPos)
            .all(|pos| ins.item(pos).w > ins.total_capacity());

    let solver = get_solver(args.algorithm, &args.options);
    let start = Instant::now();
    let out = solver.solve(&mut ins);
    let elapsed = start.elapsed();
    info!(
        profit = out.solution.profit(),
        proven_optimal = out.proven_optimal,
        elapsed_ms = elapsed.as_millis() as u64,
        "solved"
    );

    if let Some(path) = &args.output {
        out.solution.write(path)?;
    }

    let report = SolveReport {
        algorithm: solver.method().as_ref().to_string(),
        profit: out.solution.profit(),
        weight: out.solution.weight(),
        item_number: out.solution.item_number(),
        proven_optimal: out.proven_optimal,
        elapsed_ms: elapsed.as_millis(),
    };
    match &args.report {
        Some(path) => serde_json::to_writer_pretty(File::create(path)?, &report)?,
        None => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    if infeasible {
        return Ok(3);
    }
    Ok(if out.proven_optimal { 0 } else { 1 })
}

fn bench(args: BenchArgs) -> Result<i32> {
    init_tracing(false);
    let ins = Instance::from_file(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    let solver = get_solver(args.algorithm, &args.options);
    let result = run_benchmark(solver.as_ref(), &ins)?;
    serde_json::to_writer_pretty(File::create(&args.output)?, &result)?;
    Ok(0)
}

fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Command::Solve(args) => solve(args),
        Command::Generate(args) => {
            init_tracing(false);
            args.generate()?;
            Ok(0)
        }
        Command::Bench(args) => bench(args),
    }
}

fn main() {
    let cli = Cli::parse();
    let code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {:#}", err);
            2
        }
    };
    std::process::exit(code);
}
