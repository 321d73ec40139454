use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Value};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "subs-cli")]
#[command(about = "Management CLI for the subscription merger", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[arg(short, long, default_value = "admin-secret-key")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check service status
    Status,
    /// List configured subscription sources
    Subs,
    /// Add a subscription source
    AddSub { name: String, url: String },
    /// Remove a subscription source by name
    RemoveSub { name: String },
    /// Set the access token for /subs/{token}
    SetToken { token: String },
    /// Download the merged profile
    Fetch {
        token: String,
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    match cli.command {
        Commands::Status => {
            let res = client
                .get(format!("{}/admin/status", cli.url))
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Subs => {
            let res = client
                .get(format!("{}/admin/subs", cli.url))
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::AddSub { name, url } => {
            let mut subs = list_subs(&client, &cli.url, &headers).await?;
            if subs.iter().any(|s| s["name"] == name.as_str()) {
                eprintln!("Error: source '{}' already exists", name);
                return Ok(());
            }
            subs.push(json!({ "name": name, "url": url }));
            let res = client
                .put(format!("{}/admin/subs", cli.url))
                .headers(headers)
                .json(&subs)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::RemoveSub { name } => {
            let mut subs = list_subs(&client, &cli.url, &headers).await?;
            let before = subs.len();
            subs.retain(|s| s["name"] != name.as_str());
            if subs.len() == before {
                eprintln!("Error: no source named '{}'", name);
                return Ok(());
            }
            let res = client
                .put(format!("{}/admin/subs", cli.url))
                .headers(headers)
                .json(&subs)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::SetToken { token } => {
            let res = client
                .put(format!("{}/admin/token", cli.url))
                .headers(headers)
                .json(&json!({ "token": token }))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Fetch { token, output } => {
            let res = client
                .get(format!("{}/subs/{}", cli.url, token))
                .send()
                .await?;
            let status = res.status();
            let text = res.text().await?;
            if !status.is_success() {
                eprintln!("Error: service returned status {}", status);
                eprintln!("Response: {}", text);
                return Ok(());
            }
            match output {
                Some(path) => {
                    tokio::fs::write(&path, text).await?;
                    println!("Wrote {}", path.display());
                }
                None => print!("{}", text),
            }
        }
    }

    Ok(())
}

async fn list_subs(
    client: &reqwest::Client,
    base: &str,
    headers: &HeaderMap,
) -> Result<Vec<Value>, Box<dyn std::error::Error>> {
    let res = client
        .get(format!("{}/admin/subs", base))
        .headers(headers.clone())
        .send()
        .await?
        .error_for_status()?;
    Ok(res.json().await?)
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let text = res.text().await?;
    if text.is_empty() {
        println!("OK ({})", status);
        return Ok(());
    }
    let json: Value = serde_json::from_str(&text)?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
