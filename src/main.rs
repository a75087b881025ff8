#[cfg(not(feature = "cli"))]
compile_error!("The `djitxt` binary requires the `cli` feature. Build with `--features cli`.");

use clap::Parser;
use std::fs::File;
use std::io::Write;
use std::process;

use djitxt::cli;
use djitxt::cli::app::{Cli, ColorMode, Commands};
use djitxt::util::logging::{init_logging, Verbosity};
use djitxt::DjiError;

fn main() {
    let cli = Cli::parse();

    init_logging(Verbosity::from_flags(cli.verbose, cli.quiet));

    // Configure rayon thread pool if --threads was specified
    if cli.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(cli.threads)
            .build_global()
            .ok(); // Ignore if already initialized
    }

    match cli.color {
        ColorMode::Always => colored::control::set_override(true),
        ColorMode::Never => colored::control::set_override(false),
        ColorMode::Auto => {} // colored auto-detects tty
    }

    let writer_result: Result<Box<dyn Write>, DjiError> = match &cli.output {
        Some(path) => File::create(path)
            .map(|f| Box::new(f) as Box<dyn Write>)
            .map_err(|e| DjiError::Io(format!("Cannot create {}: {}", path, e))),
        None => Ok(Box::new(std::io::stdout()) as Box<dyn Write>),
    };

    let mut writer = match writer_result {
        Ok(w) => w,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Info {
            file,
            header,
            records,
            distribution,
            details,
            json,
        } => cli::info::execute(
            &cli::info::InfoOptions {
                file,
                header,
                records,
                distribution,
                details,
                json,
                mmap: cli.mmap,
            },
            &mut writer,
        ),

        Commands::Parse {
            file,
            record_type,
            rows,
            pretty,
            raw,
        } => cli::parse::execute(
            &cli::parse::ParseOptions {
                file,
                record_type,
                rows,
                pretty,
                raw,
                threads: cli.threads,
                mmap: cli.mmap,
            },
            &mut writer,
        ),

        Commands::Show {
            file,
            record_type,
            hex,
            raw,
        } => cli::show::execute(
            &cli::show::ShowOptions {
                file,
                record_type,
                hex,
                raw,
                mmap: cli.mmap,
            },
            &mut writer,
        ),

        Commands::Unscramble { file, out_dir } => cli::unscramble::execute(
            &cli::unscramble::UnscrambleOptions {
                file,
                out_dir,
                mmap: cli.mmap,
            },
            &mut writer,
        ),

        Commands::Completions { shell } => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            clap_complete::generate(shell, &mut cmd, "djitxt", &mut writer);
            Ok(())
        }
    };

    if let Err(e) = result.and_then(|_| writer.flush().map_err(|e| DjiError::Io(e.to_string())))
    {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
