use std::io::Write;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use keeper_cli::paths::{load_token, save_token, token_path};
use keeper_cli::{AuthenticatedUser, Config, ConfigArgs, Keeper};
use keeper_crypto::kdf::generate_key;
use keeper_store::{Secret, SecretId, SecretType};
use tracing_subscriber::EnvFilter;
use zeroize::Zeroizing;

#[derive(Parser, Debug)]
#[command(name = "keeper", author, version, about = "Keeper secret store client", long_about = None)]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,

    /// Log filter directive, e.g. `debug` or `keeper_store=trace`
    #[arg(long, env = "RUST_LOG", global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a new account
    Register {
        #[arg(long)]
        login: String,
        /// Prompted for when omitted
        #[arg(long)]
        password: Option<String>,
    },

    /// Log in and save the bearer token
    Login {
        #[arg(long)]
        login: String,
        #[arg(long)]
        password: Option<String>,
    },

    /// Create a secret, or replace one when --id is given
    Set {
        /// login, text, binary or bankcard
        #[arg(long = "type")]
        kind: SecretType,
        #[arg(long, required_unless_present = "file")]
        data: Option<String>,
        /// Read the payload from a file instead of --data
        #[arg(long, conflicts_with = "data")]
        file: Option<PathBuf>,
        #[arg(long, default_value = "")]
        metadata: String,
        #[arg(long)]
        id: Option<SecretId>,
    },

    /// List your secrets
    List,

    /// Print one secret
    Get { id: SecretId },

    /// Delete one secret
    Delete { id: SecretId },

    /// Print a fresh random encryption key
    GenKey,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::GenKey => {
            println!("{}", generate_key());
            Ok(())
        }
        Commands::Register { login, password } => {
            let keeper = connect(&cli.config).await?;
            let password = password_or_prompt(password, true)?;
            let user = keeper.register(&login, &password).await?;
            println!("registered '{}' (id {})", user.login, user.id);
            Ok(())
        }
        Commands::Login { login, password } => {
            let keeper = connect(&cli.config).await?;
            let password = password_or_prompt(password, false)?;
            let token = Zeroizing::new(keeper.login(&login, &password).await?);
            let path = token_path()?;
            save_token(&path, &token)?;
            println!("logged in; token saved to {}", path.display());
            Ok(())
        }
        Commands::Set {
            kind,
            data,
            file,
            metadata,
            id,
        } => {
            let keeper = connect(&cli.config).await?;
            let who = session(&keeper)?;
            let data = match (data, file) {
                (_, Some(path)) => std::fs::read(&path)
                    .with_context(|| format!("read {}", path.display()))?,
                (Some(data), None) => data.into_bytes(),
                (None, None) => return Err(anyhow!("either --data or --file is required")),
            };
            let mut secret = Secret::new(who.user_id(), kind, data, metadata);
            let saved = match id {
                Some(id) => {
                    secret.id = id;
                    keeper.update_secret(&who, secret).await?
                }
                None => keeper.create_secret(&who, secret).await?,
            };
            println!("saved secret {}", saved.id);
            Ok(())
        }
        Commands::List => {
            let keeper = connect(&cli.config).await?;
            let who = session(&keeper)?;
            let secrets = keeper.list_secrets(&who).await?;
            if secrets.is_empty() {
                println!("no secrets");
            }
            for s in secrets {
                println!("{}\t{}\t{}", s.id, s.kind, s.metadata);
            }
            Ok(())
        }
        Commands::Get { id } => {
            let keeper = connect(&cli.config).await?;
            let who = session(&keeper)?;
            let secret = keeper.get_secret(&who, id).await?;
            print_secret(&secret)
        }
        Commands::Delete { id } => {
            let keeper = connect(&cli.config).await?;
            let who = session(&keeper)?;
            keeper.delete_secret(&who, id).await?;
            println!("deleted secret {id}");
            Ok(())
        }
    }
}

async fn connect(args: &ConfigArgs) -> Result<Keeper> {
    let cfg = Config::resolve(args).context("invalid configuration")?;
    Keeper::from_config(&cfg)
        .await
        .context("failed to open secret store")
}

fn session(keeper: &Keeper) -> Result<AuthenticatedUser> {
    let token = Zeroizing::new(load_token(&token_path()?)?);
    let header = Zeroizing::new(format!("Bearer {}", token.as_str()));
    keeper
        .authenticate(Some(header.as_str()))
        .context("saved token rejected; run `keeper login` again")
}

fn password_or_prompt(given: Option<String>, confirm: bool) -> Result<Zeroizing<String>> {
    if let Some(pw) = given {
        return Ok(Zeroizing::new(pw));
    }
    let first = Zeroizing::new(
        rpassword::prompt_password("Password: ").map_err(|e| anyhow!("password prompt: {e}"))?,
    );
    if confirm {
        let second = Zeroizing::new(
            rpassword::prompt_password("Confirm password: ")
                .map_err(|e| anyhow!("password prompt: {e}"))?,
        );
        if *first != *second {
            return Err(anyhow!("passwords do not match"));
        }
    }
    Ok(first)
}

fn print_secret(secret: &Secret) -> Result<()> {
    eprintln!(
        "id {}  type {}  metadata {:?}",
        secret.id, secret.kind, secret.metadata
    );
    let mut out = std::io::stdout().lock();
    match secret.kind {
        SecretType::Binary => out.write_all(&secret.data)?,
        _ => writeln!(out, "{}", String::from_utf8_lossy(&secret.data))?,
    }
    out.flush()?;
    Ok(())
}
