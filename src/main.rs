use clap::Parser;
use env_sync::{
  sync::{EnvSync, EnvSyncOptions},
  write::{Layout, write_env},
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
  name = "env-sync",
  about = "Add the keys missing from your env file using a reference env file",
  version,
  author
)]
struct Cli {
  /// Path to the reference file whose variables are added
  #[arg(short, long, default_value = ".env.template")]
  source: PathBuf,

  /// Path to the env file to update (must exist)
  #[arg(short, long, default_value = ".env")]
  target: PathBuf,

  /// Write plain sorted lines without `# <prefix>` group headers
  #[arg(long)]
  flat: bool,

  /// Print the merged file to stdout instead of writing it
  #[arg(long)]
  dry_run: bool,

  /// Don't list the variables that were added
  #[arg(short, long)]
  quiet: bool,

  /// Verbose output (-v for verbose, -vv for very verbose)
  #[arg(short, long, action = clap::ArgAction::Count)]
  verbose: u8,
}

fn setup_tracing(verbose: u8) {
  use tracing_subscriber::fmt;
  use tracing_subscriber::prelude::*;

  let log_level = match verbose {
    1 => "debug",
    2 => "trace",
    _ => "info",
  };

  tracing_subscriber::registry()
    .with(fmt::layer().with_writer(std::io::stderr))
    .with(tracing_subscriber::EnvFilter::new(
      std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
    ))
    .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
  let cli = Cli::parse();

  setup_tracing(cli.verbose);

  let layout = if cli.flat { Layout::Flat } else { Layout::Grouped };

  if cli.dry_run {
    let merge = EnvSync::new()
      .layout(layout)
      .preview(&cli.source, &cli.target)?;
    write_env(&mut std::io::stdout().lock(), &merge.merged, layout)?;
    return Ok(());
  }

  let options = EnvSyncOptions {
    source_file: cli.source,
    target_file: cli.target,
    layout,
  };

  let report = EnvSync::sync_with_options(options)?;

  if !cli.quiet {
    print!("{report}");
  }

  Ok(())
}
