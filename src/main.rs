//! sor4onnx command-line entry point

mod cli;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::Cli;
use sor4onnx::console::Console;
use sor4onnx::rename::Renamer;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let console = Console::from_non_verbose(cli.non_verbose);

    let rule = match cli.rule() {
        Ok(rule) => rule,
        Err(e) => {
            console.error(e.to_string());
            return ExitCode::FAILURE;
        }
    };

    let mut renamer = Renamer::new(rule)
        .input_path(&cli.input_onnx_file_path)
        .non_verbose(cli.non_verbose);
    if let Some(path) = &cli.output_onnx_file_path {
        renamer = renamer.output_path(path);
    }

    match renamer.run() {
        Ok(outcome) => {
            tracing::debug!(
                nodes = outcome.rewrite.node_names_renamed,
                tensors = outcome.rewrite.tensors_renamed,
                supplemented = outcome.rewrite.nodes_supplemented,
                "rename finished"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            console.error(e.to_string());
            ExitCode::FAILURE
        }
    }
}
