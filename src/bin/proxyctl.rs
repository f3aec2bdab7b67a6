use std::path::PathBuf;

use clap::{Parser, Subcommand};
use reqwest::StatusCode;

#[derive(Parser)]
#[command(name = "proxyctl")]
#[command(about = "Management CLI for the interception proxy", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the number of diagnostic log records
    Entries,
    /// Read or replace the plugin configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Block until the proxy finishes a request
    Wait {
        /// Give up after this many milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show the active plugin configuration
    Get,
    /// Upload a plugin configuration file and reload plugins
    Set { file: PathBuf },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let res = match cli.command {
        Commands::Entries => client.get(format!("{}/num_entries", base)).send().await?,
        Commands::Config {
            action: ConfigAction::Get,
        } => client.get(format!("{}/config", base)).send().await?,
        Commands::Config {
            action: ConfigAction::Set { file },
        } => {
            let body = std::fs::read_to_string(&file)?;
            client
                .post(format!("{}/config", base))
                .header(reqwest::header::CONTENT_TYPE, "text/plain")
                .body(body)
                .send()
                .await?
        }
        Commands::Wait { timeout_ms } => {
            let mut req = client.get(format!("{}/wait_request", base));
            if let Some(ms) = timeout_ms {
                req = req.query(&[("timeout_ms", ms)]);
            }
            req.send().await?
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;

    if status.is_success() {
        println!("{}", text.trim_end());
        return Ok(());
    }

    if status == StatusCode::REQUEST_TIMEOUT {
        eprintln!("Timed out: {}", text.trim_end());
    } else {
        eprintln!("Error: proxy returned status {}", status);
        eprintln!("Response: {}", text.trim_end());
    }
    std::process::exit(1);
}
