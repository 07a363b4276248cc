use std::path::PathBuf;
use std::process;

use cache_lib::config::Preset;
use cache_lib::error::SimulatorResult;
use cache_lib::memory::WritePolicy;
use cache_lib::run_wrapper;
use clap::Parser;
use env_logger::Env;

/// Cache hierarchy simulator: replays a memory trace and reports
/// hit/miss rates and the average memory access time.
#[derive(Parser, Debug)]
#[command(name = "cache-sim", version, about)]
struct Args {
    /// Input trace file, one `<type> <hex address>` per line
    /// (0: data read, 1: data write, 2: instruction read)
    #[arg(short, long)]
    input: PathBuf,

    /// Configuration level.
    /// 1: write-through L1, 2: write-back L1, 3: write-back L1 + L2
    #[arg(short, long)]
    config: Preset,

    /// Set associativity (blocks per set) of the last level
    #[arg(short = 's', long)]
    associativity: usize,

    /// Override the level-1 instruction cache policy (write_back|wb, write_through|wt)
    #[arg(long)]
    instruction_policy: Option<WritePolicy>,

    /// Override the level-1 data cache policy (write_back|wb, write_through|wt)
    #[arg(long)]
    data_policy: Option<WritePolicy>,

    /// Print per-access diagnostics
    #[arg(short, long)]
    debug: bool,
}

fn main() {
    let args = Args::parse();

    let env = Env::default().default_filter_or(if args.debug { "debug" } else { "warn" });
    env_logger::init_from_env(env);

    if let Err(e) = run_sim(&args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run_sim(args: &Args) -> SimulatorResult<()> {
    let mut configs = args.config.levels(args.associativity, args.debug);
    if let Some(first) = configs.first_mut() {
        *first = first.with_policies(args.instruction_policy, args.data_policy);
    }
    let mut stdout = std::io::stdout().lock();
    run_wrapper::run(&args.input, &configs, &mut stdout)?;
    Ok(())
}
