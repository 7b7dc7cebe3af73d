use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "inference-cli")]
#[command(about = "Client and management CLI for the inference gateway", long_about = None)]
struct Cli {
    /// Gateway base URL
    #[arg(short, long, default_value = "http://localhost:5000")]
    url: String,

    /// Admin API base URL
    #[arg(short, long, default_value = "http://localhost:8081")]
    admin_url: String,

    #[arg(short, long, default_value = "CHANGE_ME_IN_PRODUCTION")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check gateway liveness
    Health,
    /// Send a text for inference
    Predict {
        #[arg(short, long)]
        text: String,
    },
    /// Show gateway version and status (admin)
    Status,
    /// Show circuit breaker state (admin)
    Breaker,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut admin_headers = HeaderMap::new();
    admin_headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let res = match cli.command {
        Commands::Health => {
            client
                .get(format!("{}/api/inference/health", cli.url))
                .send()
                .await?
        }
        Commands::Predict { text } => {
            client
                .post(format!("{}/api/inference", cli.url))
                .json(&json!({ "text": text }))
                .send()
                .await?
        }
        Commands::Status => {
            client
                .get(format!("{}/admin/status", cli.admin_url))
                .headers(admin_headers)
                .send()
                .await?
        }
        Commands::Breaker => {
            client
                .get(format!("{}/admin/breaker", cli.admin_url))
                .headers(admin_headers)
                .send()
                .await?
        }
    };
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let retry_after = res
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let text = res.text().await?;

    if !status.is_success() {
        eprintln!("Error: gateway returned status {}", status);
        if let Some(secs) = retry_after {
            eprintln!("Retry after: {}s", secs);
        }
    }

    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }
    Ok(())
}
