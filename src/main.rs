//! Jack Compiler CLI - Compiles Jack files to VM code in a single pass.
//!
//! Usage:
//!     JackCompiler <file.jack | directory>
//!     JackCompiler --flat -o out/ <file.jack | directory>

use clap::Parser as ClapParser;
use jack_onepass::{
    CompileOptions, Layout, compile_directory_with_options, compile_file_with_options,
    write_result,
};
use log::{LevelFilter, error, info};
use simple_logger::SimpleLogger;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(ClapParser, Debug)]
#[command(name = "JackCompiler")]
#[command(version = "0.1.0")]
#[command(about = "Single-pass Jack to VM code compiler")]
#[command(author = "nand2tetris")]
struct Args {
    /// Input .jack file or directory
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output directory (defaults to input directory)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Emit VM code without indentation
    #[arg(long)]
    flat: bool,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Args {
    fn log_level(&self) -> LevelFilter {
        if self.quiet {
            return LevelFilter::Error;
        }
        match self.verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(e) = SimpleLogger::new()
        .with_level(args.log_level())
        .env()
        .init()
    {
        eprintln!("Error: cannot initialise logger: {}", e);
    }

    let options = CompileOptions {
        layout: if args.flat {
            Layout::Flat
        } else {
            Layout::Indented
        },
    };

    let (results, output_dir) = if args.input.is_file() {
        let result = compile_file_with_options(&args.input, options);
        let output_dir = args.output.unwrap_or_else(|| {
            args.input
                .parent()
                .map_or_else(|| PathBuf::from("."), PathBuf::from)
        });
        (vec![result], output_dir)
    } else if args.input.is_dir() {
        let results = compile_directory_with_options(&args.input, options);
        let output_dir = args.output.unwrap_or_else(|| args.input.clone());
        (results, output_dir)
    } else {
        error!("Input not found: {}", args.input.display());
        return ExitCode::from(2);
    };

    if results.is_empty() {
        error!("No .jack files found in {}", args.input.display());
        return ExitCode::from(2);
    }

    let mut has_errors = false;

    for result in &results {
        if let Some(report) = result.diagnostic() {
            has_errors = true;
            eprint!("{}", report);
            continue;
        }

        match write_result(result, &output_dir) {
            Ok(()) => info!("Compiled {0}.jack -> {0}.vm", result.filename),
            Err(e) => {
                error!("Error writing {}.vm: {}", result.filename, e);
                has_errors = true;
            }
        }
    }

    if has_errors {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}
