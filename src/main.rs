use std::time::Duration;

use clap::Parser;

use gimport::{
    cli::{
        args::{CliArgs, Command},
        command_handlers::{do_checkout, do_clear_cache, do_import, do_resolve},
    },
    config::GimportConfig,
    Gimport, ImportOptions,
};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli_args: CliArgs = CliArgs::parse();
    let config = GimportConfig::load(cli_args.config.as_deref())?;

    let mut builder = Gimport::builder().dry_run(cli_args.dry_run);

    if let Some(cache_dir) = cli_args.cache_dir.or(config.cache_dir) {
        builder = builder.cache_directory(cache_dir);
    }
    if let Some(mirror_dir) = cli_args.mirror_dir.or(config.mirror_dir) {
        builder = builder.mirror_directory(mirror_dir);
    }
    if let Some(remote) = cli_args.remote.or(config.default_remote) {
        builder = builder.default_remote(remote);
    }
    if cli_args.no_versioning {
        builder = builder.versioning(false);
    } else if let Some(versioning) = config.versioning {
        builder = builder.versioning(versioning);
    }
    if let Some(timeout) = cli_args.timeout.map(Duration::from_secs).or(config.git_timeout) {
        builder = builder.git_timeout(timeout);
    }
    if let Some(timeout) = config.lock_timeout {
        builder = builder.lock_timeout(timeout);
    }

    let gimport = builder.try_build()?;

    match cli_args.cmd {
        Command::Import {
            repospec,
            filepath,
            imports,
            no_persist,
        } => {
            let options = ImportOptions {
                persist: !no_persist,
                imports,
            };
            do_import(&gimport, &repospec, &filepath, &options, cli_args.dry_run)
        }
        Command::Resolve { repospec } => do_resolve(&gimport, &repospec),
        Command::Checkout { repospec } => do_checkout(&gimport, &repospec),
        Command::ClearCache => do_clear_cache(&gimport),
    }
}
