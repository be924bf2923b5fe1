//! Conveyor CLI - run shape-specialized 1D convolutions and list kernels.

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use conveyor_cli::{
    AlignmentArg, TargetArg, build_registry, convolve, format_values, list_operators,
};
use conveyor_runtime::DispatcherConfig;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "conveyor")]
#[command(about = "Shape-specialized 1D convolution on GPU or host", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convolve an input signal with a kernel
    Conv1d {
        /// Input signal values (comma-separated, e.g. 1,2,3,4,5)
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true, required = true)]
        input: Vec<f32>,

        /// Kernel taps (comma-separated, e.g. 1,0,-1)
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true, required = true)]
        kernel: Vec<f32>,

        /// Execution target
        #[arg(short, long, value_enum, default_value = "gpu")]
        target: TargetArg,

        /// Edge alignment of the kernel window
        #[arg(short, long, value_enum, default_value = "leading")]
        alignment: AlignmentArg,

        /// Run this registered operator instead of the built-in for --alignment
        #[arg(long, value_name = "NAME")]
        operator: Option<String>,

        /// Directory of .wgsl kernels registered over the built-ins
        #[arg(short, long, value_name = "DIR")]
        library: Option<PathBuf>,

        /// Threads per workgroup for GPU kernels
        #[arg(long, default_value = "256")]
        workgroup_size: u32,
    },
    /// List registered operators and their shape parameters
    Ops {
        /// Directory of .wgsl kernels registered over the built-ins
        #[arg(short, long, value_name = "DIR")]
        library: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Conv1d {
            input,
            kernel,
            target,
            alignment,
            operator,
            library,
            workgroup_size,
        } => {
            let registry = build_registry(library.as_deref())?;
            let operator = operator.unwrap_or_else(|| alignment.operator_name().to_string());
            let config = DispatcherConfig::default()
                .with_operator(operator)
                .with_workgroup_size(workgroup_size);

            let output = convolve(registry, config, target, &input, &kernel)?;
            println!("{}", format_values(&output));
        }
        Commands::Ops { library } => {
            let registry = build_registry(library.as_deref())?;
            for (name, params) in list_operators(&registry) {
                println!("{name}: {}", params.join(", "));
            }
        }
    }

    Ok(())
}

/// Log to stderr; `RUST_LOG` overrides the `-v` level.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.as_str()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
