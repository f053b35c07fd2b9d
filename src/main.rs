use std::{
    fs::File,
    io::{self, BufRead, BufReader, BufWriter, Write},
    path::PathBuf,
};

use clap::{Parser, ValueEnum};
use log::LevelFilter;
use simple_logger::SimpleLogger;
use tableau_sim::TableauSimulator;

#[derive(Parser)]
#[command(version, about, long_about = None)]
/// Simulate a Clifford circuit, printing one line of outcomes per measuring instruction.
struct Cli {
    /// The circuit to simulate, one instruction such as `CX 0 1` per line. Read from standard input if omitted.
    #[arg(short, long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Where to write the outcomes. Written to standard output if omitted.
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Seed for the random measurement outcomes.
    #[arg(short, long)]
    seed: Option<u64>,

    #[arg(long, value_enum, default_value_t = LogLevel::Warn)]
    log_level: LogLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}
impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

fn main() -> io::Result<()> {
    let cli = Cli::parse();
    if let Err(e) = SimpleLogger::new().with_level(cli.log_level.into()).init() {
        eprintln!("Could not install logger: {e}");
    }

    let input: Box<dyn BufRead> = match &cli.input {
        Some(path) => Box::new(BufReader::new(File::open(path)?)),
        None => Box::new(io::stdin().lock()),
    };
    let output: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(io::stdout().lock()),
    };
    TableauSimulator::simulate_stream(input, output, cli.seed)
}
