use clap::Parser;
use keystash::cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    keystash::logging::init(cli.verbose);

    let result = match cli.command {
        Commands::Backup {
            ref sources,
            ref output,
            no_compress,
        } => keystash::cli::commands::backup::execute(&cli, sources, output.as_deref(), no_compress),
        Commands::Restore {
            ref archive,
            ref map,
            ref dest_dir,
            keep_existing,
        } => keystash::cli::commands::restore::execute(
            &cli,
            archive,
            map,
            dest_dir.as_deref(),
            keep_existing,
        ),
    };

    if let Err(e) = result {
        keystash::cli::output::error(&e.to_string());
        std::process::exit(1);
    }
}
