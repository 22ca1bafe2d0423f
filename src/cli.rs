use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

#[allow(clippy::large_enum_variant)]
pub(crate) enum RunOutcome {
    Serve(SocketAddr, dailybudget::config::AppConfig),
    Exit(i32),
}

pub(crate) fn run() -> RunOutcome {
    let cli = Cli::parse();
    if let Some(Command::Init(args)) = cli.command {
        let code = run_init(args);
        return RunOutcome::Exit(code);
    }
    if let Some(Command::Secret) = cli.command {
        let code = run_secret();
        return RunOutcome::Exit(code);
    }

    let data_dir = match resolve_data_dir(&cli.data_dir) {
        Ok(data_dir) => data_dir,
        Err(err) => {
            eprintln!("error: {err}");
            return RunOutcome::Exit(2);
        }
    };

    let hmac_secret = match cli.hmac_secret.as_deref() {
        Some(raw) if raw.trim().is_empty() => {
            eprintln!("error: HMAC secret cannot be empty");
            return RunOutcome::Exit(2);
        }
        Some(raw) => Some(raw.trim().to_string()),
        None => {
            eprintln!(
                "warning: no HMAC secret configured; registration and schedule endpoints will refuse requests"
            );
            None
        }
    };

    RunOutcome::Serve(
        cli.listen,
        dailybudget::config::AppConfig {
            data_dir,
            app_name: cli.app_name,
            vapid_private_key: cli.vapid_private_key,
            vapid_public_key: cli.vapid_public_key,
            vapid_subject: cli.vapid_subject,
            hmac_secret,
        },
    )
}

#[derive(Parser, Debug)]
#[command(
    name = "dailybudget",
    version,
    about = "Push-subscription and reminder-scheduling backend for the Daily Budget app"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,
    #[arg(long, default_value = "127.0.0.1:3000")]
    listen: SocketAddr,
    #[arg(long, default_value = "Daily Budget")]
    app_name: String,
    #[arg(long, env = "DAILYBUDGET_VAPID_PRIVATE_KEY")]
    vapid_private_key: Option<String>,
    #[arg(long, env = "DAILYBUDGET_VAPID_PUBLIC_KEY")]
    vapid_public_key: Option<String>,
    #[arg(long, env = "DAILYBUDGET_VAPID_SUBJECT")]
    vapid_subject: Option<String>,
    #[arg(long, env = "DAILYBUDGET_HMAC_SECRET")]
    hmac_secret: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a VAPID keypair for push authentication
    Init(InitArgs),
    /// Generate a random HMAC secret for token signing
    Secret,
}

#[derive(Args, Debug)]
struct InitArgs {
    #[arg(long)]
    subject: Option<String>,
}

fn resolve_data_dir(raw: &PathBuf) -> Result<PathBuf, String> {
    std::fs::create_dir_all(raw)
        .map_err(|err| format!("failed to create data directory {}: {err}", raw.display()))?;
    std::fs::canonicalize(raw)
        .map_err(|err| format!("failed to resolve data directory {}: {err}", raw.display()))
}

fn run_init(args: InitArgs) -> i32 {
    let credentials = match dailybudget::generate_vapid_credentials() {
        Ok(credentials) => credentials,
        Err(err) => {
            eprintln!("failed to generate VAPID credentials: {err}");
            return 1;
        }
    };
    let (subject, show_subject_note) = match args.subject {
        Some(subject) => (subject, false),
        None => ("mailto:you@example.com".to_string(), true),
    };

    println!("VAPID credentials generated.");
    println!();
    println!(
        "DAILYBUDGET_VAPID_PRIVATE_KEY=\"{}\"",
        credentials.private_key
    );
    println!(
        "DAILYBUDGET_VAPID_PUBLIC_KEY=\"{}\"",
        credentials.public_key
    );
    println!("DAILYBUDGET_VAPID_SUBJECT=\"{subject}\"");
    if show_subject_note {
        println!();
        println!("Note: replace DAILYBUDGET_VAPID_SUBJECT with a contact URI you control.");
    }
    0
}

fn run_secret() -> i32 {
    println!("{}", dailybudget::generate_hmac_secret());
    0
}
