use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;

use golomb::ruler::GolombRuler;
use golomb::solver::{GolombSolver, SolverConfig, SolverResult};

#[derive(Parser, Debug)]
#[command(name = "golomb")]
#[command(about = "Golomb Ruler Finder - Rust Implementation", long_about = None)]
struct Args {
    /// Number of marks
    #[arg(index = 1)]
    marks: usize,

    /// Verbose output
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Use multi-processing
    #[arg(long = "mp")]
    multi_processing: bool,

    /// Search only the best known length
    #[arg(short = 'b', long = "best")]
    best_length: bool,

    /// Output file
    #[arg(short = 'o', long = "output")]
    output_file: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    println!("Golomb Ruler Finder - Rust Edition");
    println!(
        "Start time: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    println!("Searching for optimal ruler with {} marks", args.marks);

    let config = SolverConfig {
        marks: args.marks,
        verbose: args.verbose,
        multi_processing: args.multi_processing,
        best_length: args.best_length,
    };

    let solver = GolombSolver::new(config);
    let result = solver.solve();

    println!(
        "End time:   {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );

    let Some(ruler) = &result.ruler else {
        println!("No ruler found for {} marks", args.marks);
        println!("Elapsed time: {}", format_duration(result.duration));
        return ExitCode::FAILURE;
    };

    println!(
        "Found ruler with {} marks and length {}",
        ruler.marks(),
        ruler.length()
    );
    println!("Positions: {}", join(ruler.positions()));
    println!("Elapsed time: {}", format_duration(result.duration));
    println!("States searched: {}", result.searched);

    let distances = ruler.pairwise_distances();
    let missing = ruler.missing_distances();
    println!("Distances ({}): {}", distances.len(), join(&distances));
    if !missing.is_empty() {
        println!("Missing ({}): {}", missing.len(), join(&missing));
    }
    println!("Optimal: {}", if result.optimal { "yes" } else { "no" });

    let output_file = args.output_file.clone().unwrap_or_else(|| {
        let mut path = PathBuf::from("out");
        path.push(format!("GOL_n{}_{}.txt", args.marks, option_string(&args)));
        path
    });

    match write_output(&output_file, ruler, &result, &option_string(&args)) {
        Ok(()) => println!("Results written to {}", output_file.display()),
        Err(err) => {
            eprintln!("Error writing output: {}", err);
            return ExitCode::FAILURE;
        }
    }

    ExitCode::SUCCESS
}

fn join(values: &[usize]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Formats a duration in a human-readable way.
fn format_duration(d: Duration) -> String {
    if d < Duration::from_secs(1) {
        format!("{:.3} ms", d.as_secs_f64() * 1000.0)
    } else {
        format!("{:.3} s", d.as_secs_f64())
    }
}

/// Option suffix used in the default output filename, ordered mp, b, v.
fn option_string(args: &Args) -> String {
    let mut options = Vec::new();

    if args.multi_processing {
        options.push("mp");
    }
    if args.best_length {
        options.push("b");
    }
    if args.verbose {
        options.push("v");
    }

    if options.is_empty() {
        "std".to_string()
    } else {
        options.join("_")
    }
}

/// Writes the result file in the key=value format shared by the other
/// implementations of this tool.
fn write_output(
    path: &PathBuf,
    ruler: &GolombRuler,
    result: &SolverResult,
    options: &str,
) -> io::Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)?;
        }
    }

    let mut file = File::create(path)?;

    writeln!(file, "length={}", ruler.length())?;
    writeln!(file, "marks={}", ruler.marks())?;
    writeln!(file, "positions={}", join(ruler.positions()))?;
    writeln!(file, "distances={}", join(&ruler.pairwise_distances()))?;
    writeln!(file, "missing={}", join(&ruler.missing_distances()))?;
    writeln!(file, "seconds={:.6}", result.duration.as_secs_f64())?;
    writeln!(file, "time={}", format_duration(result.duration))?;
    writeln!(file, "options={}", options)?;
    writeln!(
        file,
        "optimal={}",
        if result.optimal { "yes" } else { "no" }
    )?;

    Ok(())
}
