use std::path::PathBuf;

use clap::{Parser, Subcommand};
use lapidar::prelude::*;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};

// ---------------------------------------------------------------------------
// Arguments
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "lapidar-console")]
#[command(about = "Talk to the Lapidar bot backend from a terminal")]
struct Cli {
    /// API root, usually the front door.
    #[arg(long, default_value = "http://localhost:3000/api")]
    api: String,

    /// Where the session and anti-forgery tokens are kept between runs.
    #[arg(long, default_value = "lapidar-session.json")]
    store: PathBuf,

    #[arg(long)]
    email: Option<String>,

    #[arg(long)]
    password: Option<String>,

    /// One-time code; prompted for when the backend asks and none is given.
    #[arg(long)]
    code: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List bot commands.
    Commands,
    /// Enable or disable one command.
    Toggle {
        name: String,
        #[arg(action = clap::ArgAction::Set)]
        enabled: bool,
    },
    /// Show bot statistics.
    Stats,
    /// Show recent login attempts.
    Logs,
    /// Show the web interface ports.
    Ports,
    /// End the session and forget the stored tokens.
    Logout,
}

// ---------------------------------------------------------------------------
// Login
// ---------------------------------------------------------------------------

/// Reads one answer from `input`; the reader is shared across prompts so
/// piped input keeps its buffered lines.
async fn prompt<R: AsyncBufRead + Unpin>(input: &mut R, label: &str) -> std::io::Result<String> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(label.as_bytes()).await?;
    stdout.flush().await?;
    let mut line = String::new();
    input.read_line(&mut line).await?;
    Ok(line.trim().to_string())
}

/// Walks the login steps until authenticated or refused.
async fn log_in<T: Transport>(
    client: &ConsoleClient<T>,
    cli: &Cli,
) -> Result<LoginState, Box<dyn std::error::Error>> {
    let step = match client.login_state() {
        LoginState::Credentials(step) => step,
        resumed => return Ok(resumed),
    };
    let mut input = BufReader::new(tokio::io::stdin());

    let email = match &cli.email {
        Some(email) => email.clone(),
        None => prompt(&mut input, "email: ").await?,
    };
    let password = match &cli.password {
        Some(password) => password.clone(),
        None => prompt(&mut input, "password: ").await?,
    };

    let state: LoginState = step
        .submit_credentials(client.dispatcher(), &email, &password)
        .await
        .into();
    let LoginState::SecondFactor(step) = state else {
        return Ok(state);
    };

    let code = match &cli.code {
        Some(code) => code.clone(),
        None => prompt(&mut input, &format!("code for {}: ", step.email())).await?,
    };
    Ok(step
        .submit_second_factor(client.dispatcher(), &code)
        .await
        .into())
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    lapidar::telemetry::init_tracing("warn");
    let cli = Cli::parse();

    let store = TokenStore::open(&cli.store)?;
    let client = ConsoleClient::connect(HttpTransportConfig::new(cli.api.as_str()), store)?;

    if let Command::Logout = cli.command {
        client.login_state().logout(client.dispatcher()).await;
        println!("logged out");
        return Ok(());
    }

    let state = log_in(&client, &cli).await?;
    if !state.is_authenticated() {
        let reason = state
            .error()
            .map(ToString::to_string)
            .unwrap_or_else(|| "not logged in".to_string());
        eprintln!("login failed: {reason}");
        std::process::exit(1);
    }

    match cli.command {
        Command::Commands => {
            for command in client.list_commands().await? {
                let mark = if command.enabled { "on " } else { "off" };
                println!("[{mark}] {:<16} {}", command.name, command.description);
            }
        }
        Command::Toggle { name, enabled } => {
            client.update_command(&name, enabled).await?;
            println!("{name}: enabled={enabled}");
        }
        Command::Stats => {
            let stats = client.get_stats().await?;
            println!(
                "servers={} users={} channels={} commands={} uptime={} memory={}",
                stats.servers,
                stats.users,
                stats.channels,
                stats.commands,
                stats.uptime,
                stats.memory_usage
            );
        }
        Command::Logs => {
            for entry in client.login_logs().await? {
                let outcome = if entry.success { "ok  " } else { "fail" };
                println!(
                    "{} {outcome} {} {} {}",
                    entry.timestamp, entry.email, entry.ip, entry.message
                );
            }
        }
        Command::Ports => {
            let web = client.get_config().await?.web_interface;
            println!("primary {} alternates {:?}", web.port, web.alt_ports);
        }
        Command::Logout => {}
    }
    Ok(())
}
