use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use miette::{Context, IntoDiagnostic};

use accel_offload::{Accelerator, PassManager};

/// Accelerator offload toolchain
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate operator registration sources from a JSON schema
    Opgen {
        /// Operator schema (JSON)
        #[arg(short, long)]
        spec: Option<PathBuf>,

        /// Accelerator name used to namespace the generated operators
        #[arg(short, long)]
        accelerator: String,

        /// Directory receiving `<operator>.cc` and the binding file
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
    },

    /// List the built-in offload shapes
    Shapes {
        /// Only list shapes of this accelerator
        #[arg(short, long, value_parser = parse_accelerator)]
        accelerator: Option<Accelerator>,
    },
}

fn parse_accelerator(s: &str) -> Result<Accelerator, String> {
    s.parse()
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> miette::Result<()> {
    match Cli::parse().command {
        Command::Opgen {
            spec,
            accelerator,
            out_dir,
        } => opgen(spec, &accelerator, out_dir),
        Command::Shapes { accelerator } => shapes(accelerator),
    }
}

fn opgen(spec: Option<PathBuf>, accelerator: &str, out_dir: PathBuf) -> miette::Result<()> {
    let ops = accel_opgen::load_operators(spec.as_deref(), accelerator)
        .into_diagnostic()
        .wrap_err("failed to load operator schema")?;
    let written = accel_opgen::write_sources(&ops, &out_dir)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to write sources to {}", out_dir.display()))?;
    log::info!("generated {} operator(s) for '{accelerator}'", ops.len());
    for path in written {
        println!("{}", path.display());
    }
    Ok(())
}

fn shapes(only: Option<Accelerator>) -> miette::Result<()> {
    let accelerators = match only {
        Some(accel) => vec![accel],
        None => Accelerator::ALL.to_vec(),
    };
    for accel in accelerators {
        // Building the pass manager validates every shape of the accelerator.
        let passes = PassManager::for_accelerator(accel)
            .map_err(|e| miette::miette!("{e}"))
            .wrap_err_with(|| format!("invalid built-in shape for '{accel}'"))?;
        println!("{accel}:");
        for (spec, pass) in accel.shapes().iter().zip(passes.pass_names()) {
            println!("  {pass}: {spec}");
        }
    }
    Ok(())
}
