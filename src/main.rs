use clap::Parser;
use kmsvault::cli::commands;
use kmsvault::cli::{Cli, Commands, KubeAction, SecretsAction};
use tracing_subscriber::EnvFilter;

fn main() {
    init_tracing();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init => commands::init::execute(&cli),
        Commands::Encrypt { ref value, stdin } => {
            commands::encrypt::execute(&cli, value.as_deref(), stdin)
        }
        Commands::Decrypt { ref token } => commands::decrypt::execute(&cli, token),
        Commands::Secrets { ref action } => match action {
            SecretsAction::Add {
                pairs,
                file,
                name,
            } => commands::secrets_add::execute(&cli, pairs, file.as_deref(), name.as_deref()),
            SecretsAction::Remove { name } => commands::secrets_remove::execute(&cli, name),
            SecretsAction::Get { name } => commands::secrets_get::execute(&cli, name),
            SecretsAction::List => commands::secrets_list::execute(&cli),
            SecretsAction::Export {
                format,
                decrypt,
                output,
            } => commands::secrets_export::execute(&cli, format, *decrypt, output.as_deref()),
            SecretsAction::Import { file, format } => {
                commands::secrets_import::execute(&cli, file, format.as_deref())
            }
        },
        Commands::Cloudbuild => commands::cloudbuild::execute(&cli),
        Commands::Kube { ref action } => match action {
            KubeAction::Manifest { namespace } => {
                commands::kube::execute_manifest(&cli, namespace.as_deref())
            }
        },
        Commands::Completions { shell } => commands::completions::execute(shell),
    };

    if let Err(e) = result {
        kmsvault::cli::output::error(&e.to_string());
        std::process::exit(1);
    }
}

/// Diagnostics go to stderr, filtered by `KMSVAULT_LOG` (default: warn).
fn init_tracing() {
    let filter = EnvFilter::try_from_env("KMSVAULT_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
