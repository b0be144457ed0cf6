use clap::Parser;
use tracing_subscriber::EnvFilter;
use workorder_intake::cli::commands::{
    CommandContext, UploadArgs, cmd_clients_create, cmd_clients_list, cmd_health, cmd_profiles,
    cmd_submit, cmd_upload,
};
use workorder_intake::cli::config::{
    ClientsAction, Cli, Commands, load_config, resolve_endpoints, resolve_profile,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // RUST_LOG wins over -v
    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(cli.config.as_deref());

    // Resolve endpoints: CLI > config > env > defaults
    let endpoints = resolve_endpoints(&cli, &config);
    let (profile_name, profile) = resolve_profile(cli.profile.as_deref(), &config)?;

    let ctx = CommandContext {
        config,
        endpoints,
        profile_name,
        profile,
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Upload {
            files,
            client,
            edits,
            submit,
            output,
            backup_dir,
        } => {
            let args = UploadArgs {
                files,
                client,
                edits,
                submit,
                output,
                backup_dir,
            };
            if !cmd_upload(&ctx, &args)? {
                std::process::exit(1);
            }
        }
        Commands::Submit {
            payload,
            edits,
            backup_dir,
        } => {
            if !cmd_submit(&ctx, &payload, &edits, backup_dir.as_deref())? {
                std::process::exit(1);
            }
        }
        Commands::Clients { action } => match action {
            ClientsAction::List { search, page } => {
                cmd_clients_list(&ctx, search.as_deref(), page)?;
            }
            ClientsAction::Create { name, commission } => {
                cmd_clients_create(&ctx, &name, &commission)?;
            }
        },
        Commands::Health => cmd_health(&ctx)?,
        Commands::Profiles => cmd_profiles(&ctx)?,
    }

    Ok(())
}
