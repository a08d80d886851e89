use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{Map, Value};

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Management CLI for the Backpack Gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Bearer key, when the gateway has admin.api_key set
    #[arg(short, long)]
    key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the live settings
    Settings,
    /// Change some settings; omitted flags keep their value
    Set {
        #[arg(long)]
        origin: Option<String>,
        #[arg(long)]
        rate_limit: Option<bool>,
        #[arg(long)]
        cache: Option<bool>,
        #[arg(long)]
        idempotency: Option<bool>,
        #[arg(long)]
        waf: Option<bool>,
        #[arg(long)]
        per_minute: Option<u32>,
    },
    /// Show request, cache-hit and blocked-threat counters
    Metrics,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    if let Some(key) = &cli.key {
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {key}"))?);
    }

    let res = match cli.command {
        Commands::Settings => {
            client
                .get(format!("{}/api/settings", cli.url))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Set {
            origin,
            rate_limit,
            cache,
            idempotency,
            waf,
            per_minute,
        } => {
            let mut update = Map::new();
            if let Some(origin) = origin {
                update.insert("target_backend_url".into(), Value::from(origin));
            }
            if let Some(v) = rate_limit {
                update.insert("rate_limit_enabled".into(), Value::from(v));
            }
            if let Some(v) = cache {
                update.insert("cache_enabled".into(), Value::from(v));
            }
            if let Some(v) = idempotency {
                update.insert("idempotency_enabled".into(), Value::from(v));
            }
            if let Some(v) = waf {
                update.insert("waf_enabled".into(), Value::from(v));
            }
            if let Some(v) = per_minute {
                update.insert("rate_limit_per_minute".into(), Value::from(v));
            }
            client
                .post(format!("{}/api/settings", cli.url))
                .headers(headers)
                .json(&Value::Object(update))
                .send()
                .await?
        }
        Commands::Metrics => {
            client
                .get(format!("{}/api/metrics", cli.url))
                .headers(headers)
                .send()
                .await?
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: gateway returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
