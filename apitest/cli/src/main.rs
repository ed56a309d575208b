//! apitest CLI - inspect test configuration and run checked requests

use std::path::PathBuf;
use std::process::ExitCode;

use apitest_lib::{ApiClient, ApiError, Call, ClientCredentials, Session, TestConfig};
use clap::{Parser, Subcommand};
use tracing_subscriber::{filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "apitest")]
#[command(version, about = "Inspect API test configuration and run checked requests", long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', action = clap::ArgAction::Count, global = true)]
    log_verbosity: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Properties file to read [default: $APITEST_CONFIG or ./config.properties]
    #[arg(short, long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the resolved configuration
    Config {
        /// Named APIs whose base URL should be shown
        #[arg(value_name = "API")]
        apis: Vec<String>,
    },

    /// GET an endpoint and print its JSON body
    ///
    /// The response must be 2xx and arrive within request.timeout.
    Get {
        /// Named API (selects api.<API>.base.url)
        #[arg(value_name = "API")]
        api: String,

        /// Endpoint name (resolved via api.<API>.endpoint.<ENDPOINT>) or a path
        #[arg(value_name = "ENDPOINT")]
        endpoint: String,

        /// Query parameter as key=value (repeatable)
        #[arg(short, long = "query", value_name = "KEY=VALUE", value_parser = parse_key_value)]
        query: Vec<(String, String)>,

        /// Bearer token to send
        #[arg(long, conflicts_with = "client_credentials")]
        token: Option<String>,

        /// Obtain a bearer token with the configured client credentials
        #[arg(long)]
        client_credentials: bool,
    },
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))
}

/// Initialize tracing subscriber based on verbosity and output format
fn init_tracing(verbose: u8, json: bool) {
    // Default (verbose=0) shows only WARN so stdout stays clean for JSON bodies
    let base_filter = match std::env::var("RUST_LOG") {
        Ok(filter) => filter,
        Err(_) => match verbose {
            0 => "warn".to_string(),
            // -v: request/response transcripts
            1 => "warn,apitest_lib=info,apitest=info".to_string(),
            2 => "info,apitest_lib=debug,apitest=debug".to_string(),
            _ => "debug,apitest_lib=trace,apitest=trace".to_string(),
        },
    };

    let filter = EnvFilter::try_new(&base_filter).unwrap_or_else(|_| EnvFilter::new("warn"));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_file(verbose >= 3)
                    .with_line_number(verbose >= 3)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .init();
    }
}

fn show_config(config: &TestConfig, apis: &[String]) -> Result<(), ApiError> {
    let timeout = config.default_timeout()?;
    let source = config
        .source()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "<defaults>".to_string());

    println!("Config file: {source}");
    println!("Base URL:    {}", config.base_url(""));
    println!("Timeout:     {timeout} ms");
    println!("TLS relaxed: {}", config.tls_relaxed()?);
    for api in apis {
        println!("{api} URL from config: {}", config.base_url(api));
    }
    Ok(())
}

async fn get(
    config: &TestConfig,
    api: &str,
    endpoint: &str,
    query: Vec<(String, String)>,
    token: Option<String>,
    client_credentials: bool,
) -> Result<serde_json::Value, ApiError> {
    let client = ApiClient::for_api(config, api)?.build()?;
    tracing::info!(base_url = %client.base_url(), "testing API");

    let mut session = Session::anonymous();
    if let Some(token) = token {
        session.set_token(token);
    } else if client_credentials {
        let credentials = ClientCredentials::from_config(config)?;
        client.init_bearer_token(&mut session, &credentials).await?;
    }

    let path = if endpoint.starts_with('/') || endpoint.contains("://") {
        endpoint.to_string()
    } else {
        config.endpoint(api, endpoint).into_owned()
    };

    let mut call = Call::get(&path);
    if session.has_token() {
        call = call.token(&session);
    }
    for (key, value) in query {
        call = call.query(key, value);
    }
    client.execute(call).await
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.log_verbosity, cli.json);

    let config = match &cli.config {
        Some(path) => TestConfig::load(path),
        None => TestConfig::from_env(),
    };

    let result = match cli.command {
        Commands::Config { apis } => show_config(&config, &apis),
        Commands::Get {
            api,
            endpoint,
            query,
            token,
            client_credentials,
        } => get(&config, &api, &endpoint, query, token, client_credentials)
            .await
            .and_then(|body| {
                let pretty = serde_json::to_string_pretty(&body)
                    .map_err(apitest_lib::error::ValidationError::Serialize)?;
                println!("{pretty}");
                Ok(())
            }),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_value_parsing() {
        assert_eq!(
            parse_key_value("userId=1").unwrap(),
            ("userId".to_string(), "1".to_string())
        );
        assert_eq!(
            parse_key_value("q=a=b").unwrap(),
            ("q".to_string(), "a=b".to_string())
        );
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }

    #[test]
    fn cli_parses_get_with_queries() {
        let cli = Cli::try_parse_from([
            "apitest", "get", "jsonplaceholder", "posts", "-q", "userId=1", "--token", "abc",
        ])
        .unwrap();
        match cli.command {
            Commands::Get { api, query, token, .. } => {
                assert_eq!(api, "jsonplaceholder");
                assert_eq!(query, vec![("userId".to_string(), "1".to_string())]);
                assert_eq!(token.as_deref(), Some("abc"));
            }
            Commands::Config { .. } => panic!("expected get"),
        }
    }

    #[test]
    fn token_and_client_credentials_conflict() {
        let result = Cli::try_parse_from([
            "apitest",
            "get",
            "demo",
            "users",
            "--token",
            "abc",
            "--client-credentials",
        ]);
        assert!(result.is_err());
    }
}
