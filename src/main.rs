use anyhow::Context;
use colored::*;
use dst_extractor::cli::{Args, setup_logging};
use dst_extractor::{ExtractError, Extraction};
use std::io::{self, Write};
use std::process;

fn run() -> anyhow::Result<()> {
    let args = Args::try_parse_args(std::env::args_os())?;
    setup_logging(&args)?;

    let config = args.load_config()?;
    let request = args.to_request(&config)?;

    let stats = Extraction::new(request, config)
        .with_progress(args.show_progress())
        .run()?;

    // The output path is the only line on stdout
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", stats.output_path.display())
        .and_then(|_| stdout.flush())
        .context("Failed to write the output path to stdout")?;
    Ok(())
}

fn main() {
    match run() {
        Ok(()) => process::exit(0),
        Err(error) => {
            let extract_error = error.downcast_ref::<ExtractError>();
            let label = if extract_error.is_some_and(ExtractError::is_empty_result) {
                "No data:".bright_yellow().bold()
            } else {
                "Error:".bright_red().bold()
            };
            eprintln!("{} {:#}", label, error);
            process::exit(extract_error.map_or(1, ExtractError::exit_code));
        }
    }
}
