use anyhow::{Context as _, Result};
use clap::Parser;
use colored::Colorize;

use shopsync::cli::args::{Cli, Commands};
use shopsync::cli::commands::{self, CommandOutput, Context};
use shopsync::config::{Config, Paths};
use shopsync::logging::{self, Verbosity};
use shopsync::storage::Database;

/// Exit status when some records failed or were skipped.
const EXIT_PARTIAL_FAILURE: i32 = 2;

fn main() {
    match run() {
        Ok(output) => {
            if !output.text.is_empty() {
                println!("{}", output.text);
            }
            if output.failed {
                std::process::exit(EXIT_PARTIAL_FAILURE);
            }
        },
        Err(e) => {
            eprintln!("{}: {:#}", "error".red().bold(), e);
            std::process::exit(1);
        },
    }
}

fn run() -> Result<CommandOutput> {
    let cli = Cli::parse();
    let format = cli.output;

    // Completions need neither config nor store.
    if let Commands::Completions { shell } = cli.command {
        return Ok(commands::completions(shell)?.into());
    }

    let paths = match &cli.home {
        Some(root) => Paths::with_root(root.clone()),
        None => Paths::new()?,
    };
    paths.ensure_dirs()?;

    let config = Config::load_from_path(&paths.config_file)
        .with_context(|| format!("loading {}", paths.config_file.display()))?;
    logging::init(&config.logging, Verbosity::from_flags(cli.verbose, cli.quiet));

    let db = Database::open_at(&paths.database)
        .with_context(|| format!("opening {}", paths.database.display()))?;
    let ctx = Context::new(config, db, cli.token);

    let output = match cli.command {
        Commands::Status => commands::status(&ctx, format)?.into(),
        Commands::Push(args) => commands::push(&ctx, args.entity, args.batch, format)?,
        Commands::PushAll(args) => commands::push_all(&ctx, args, format)?,
        Commands::PushOne {
            entity,
            local_id,
            dry_run,
        } => commands::push_one(&ctx, entity, local_id, dry_run, format)?,
        Commands::Pull { entity, query } => commands::pull(&ctx, entity, query.as_deref(), format)?,
        Commands::Errors { entity, limit } => commands::errors(&ctx, entity, limit, format)?.into(),
        Commands::Requeue { entity, local_id } => commands::requeue(&ctx, entity, local_id, format)?.into(),
        Commands::Resolve(args) => commands::resolve(&ctx, &args, format)?.into(),
        Commands::Forget { entity, local_id } => commands::forget(&ctx, entity, local_id, format)?.into(),
        Commands::Completions { .. } => CommandOutput::default(),
    };

    Ok(output)
}
