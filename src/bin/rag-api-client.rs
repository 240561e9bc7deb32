//! RAG API command line client
//!
//! Talks to a running RAG API server: logs in to obtain a token pair, then
//! calls the inference routes with the access token.
//!
//! ## Usage Examples
//!
//! ### Log in
//! ```bash
//! rag-api-client --base-url http://localhost:8000 login \
//!   --username alice --password "secret"
//! ```
//!
//! ### Run a prediction
//! ```bash
//! export RAG_API_TOKEN="<access_token from login>"
//! rag-api-client predict --text "What is retrieval augmented generation?"
//! ```
//!
//! ### Generate text
//! ```bash
//! # Newline-delimited JSON chunks
//! rag-api-client generate --text "Once upon a time" --context '{"topic": "fairy tales"}'
//!
//! # Relay the upstream event stream as it arrives
//! rag-api-client generate --stream --text "Once upon a time"
//! ```
//!
//! ## Environment Variables
//!
//! - `RAG_API_BASE_URL`: Base URL of the server (alternative to --base-url)
//! - `RAG_API_TOKEN`: Access token (alternative to --token)
//! - `RAG_API_REFRESH_TOKEN`: Refresh token sent as the `refresh_token` cookie
//!
//! When the server refreshes an expired token it returns the new access
//! token in the `Authorization` response header; with `--verbose` it is
//! printed to stderr.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error (network, parsing, etc.)
//! - 2: Request rejected by the server
//! - 3: Authentication error

use std::io::Write;
use std::process;

use clap::{Args, Parser, Subcommand, ValueEnum};
use futures::StreamExt;
use reqwest::header::{AUTHORIZATION, COOKIE};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::{Map, Value, json};
use thiserror::Error;

/// Main CLI application structure
#[derive(Parser)]
#[command(
    name = "rag-api-client",
    about = "RAG API command line client",
    version = env!("CARGO_PKG_VERSION")
)]
struct Cli {
    /// Base URL of the RAG API server
    #[arg(long, env = "RAG_API_BASE_URL", default_value = "http://localhost:8000")]
    base_url: String,

    /// Print request details and response status to stderr
    #[arg(short, long)]
    verbose: bool,

    /// Output format for JSON responses
    #[arg(long, value_enum, default_value = "json-pretty")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Json,
    JsonPretty,
}

#[derive(Subcommand)]
enum Commands {
    /// Exchange a username and password for a token pair
    Login(LoginArgs),
    /// Run the model once on some text
    Predict(PredictArgs),
    /// Generate text, as JSON lines or as a relayed event stream
    Generate(GenerateArgs),
}

#[derive(Args)]
struct LoginArgs {
    #[arg(long)]
    username: String,

    #[arg(long, env = "RAG_API_PASSWORD", hide_env_values = true)]
    password: String,
}

/// Credentials for the protected routes
#[derive(Args)]
struct TokenArgs {
    /// Access token
    #[arg(long, env = "RAG_API_TOKEN", hide_env_values = true)]
    token: String,

    /// Refresh token, lets the server refresh an expired access token
    #[arg(long, env = "RAG_API_REFRESH_TOKEN", hide_env_values = true)]
    refresh_token: Option<String>,
}

#[derive(Args)]
struct PredictArgs {
    #[command(flatten)]
    auth: TokenArgs,

    /// Input text
    #[arg(long)]
    text: String,
}

#[derive(Args)]
struct GenerateArgs {
    #[command(flatten)]
    auth: TokenArgs,

    /// Input text
    #[arg(long)]
    text: String,

    /// Context object sent as `prediction_data`, as JSON
    #[arg(long, default_value = "{}")]
    context: String,

    /// Use the event stream route
    #[arg(long)]
    stream: bool,
}

#[derive(Debug, Error)]
enum AppError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Output error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Request failed with status {0}: {1}")]
    Rejected(StatusCode, String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Error: {0}")]
    General(String),
}

impl AppError {
    fn exit_code(&self) -> i32 {
        match self {
            AppError::Rejected(..) => 2,
            AppError::Authentication(_) => 3,
            _ => 1,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let client = Client::new();

    let result = match &cli.command {
        Commands::Login(args) => login(&cli, &client, args).await,
        Commands::Predict(args) => predict(&cli, &client, args).await,
        Commands::Generate(args) => generate(&cli, &client, args).await,
    };

    if let Err(err) = result {
        eprintln!("{err}");
        process::exit(err.exit_code());
    }
}

fn url(cli: &Cli, path: &str) -> String {
    format!("{}{}", cli.base_url.trim_end_matches('/'), path)
}

/// Adds the bearer token and, if present, the refresh token cookie.
fn authorize(request: RequestBuilder, auth: &TokenArgs) -> RequestBuilder {
    let request = request.bearer_auth(&auth.token);
    match &auth.refresh_token {
        Some(refresh_token) => request.header(COOKIE, format!("refresh_token={refresh_token}")),
        None => request,
    }
}

/// Returns the response when it succeeded, otherwise its `detail` as an error.
async fn check(cli: &Cli, response: Response) -> Result<Response, AppError> {
    let status = response.status();
    if cli.verbose {
        eprintln!("Response status: {status}");
        if let Some(refreshed) = response.headers().get(AUTHORIZATION) {
            eprintln!("Refreshed access token: {}", refreshed.to_str().unwrap_or("<invalid>"));
        }
    }

    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await?;
    let detail = serde_json::from_str::<Value>(&text)
        .ok()
        .and_then(|body| body.get("detail").and_then(Value::as_str).map(str::to_string))
        .unwrap_or(text);

    if status == StatusCode::UNAUTHORIZED {
        Err(AppError::Authentication(detail))
    } else {
        Err(AppError::Rejected(status, detail))
    }
}

async fn login(cli: &Cli, client: &Client, args: &LoginArgs) -> Result<(), AppError> {
    if cli.verbose {
        eprintln!("Logging in as {} at {}", args.username, cli.base_url);
    }

    let response = client
        .post(url(cli, "/login"))
        .form(&[
            ("username", args.username.as_str()),
            ("password", args.password.as_str()),
        ])
        .send()
        .await?;

    let tokens: Value = check(cli, response).await?.json().await?;
    output_response(&cli.format, &tokens)
}

async fn predict(cli: &Cli, client: &Client, args: &PredictArgs) -> Result<(), AppError> {
    let request = client
        .post(url(cli, "/predict"))
        .json(&json!({ "input_text": args.text }));

    let response = authorize(request, &args.auth).send().await?;
    let result: Value = check(cli, response).await?.json().await?;
    output_response(&cli.format, &result)
}

async fn generate(cli: &Cli, client: &Client, args: &GenerateArgs) -> Result<(), AppError> {
    let context: Map<String, Value> = serde_json::from_str(&args.context)
        .map_err(|e| AppError::General(format!("Invalid context JSON: {e}")))?;
    let path = if args.stream { "/generate/stream" } else { "/generate" };

    let request = client
        .post(url(cli, path))
        .json(&json!({ "input_text": args.text, "prediction_data": context }));

    let response = authorize(request, &args.auth).send().await?;
    let response = check(cli, response).await?;

    // Print chunks as they arrive.
    let mut stdout = std::io::stdout();
    let mut body = response.bytes_stream();
    while let Some(chunk) = body.next().await {
        stdout.write_all(&chunk?)?;
        stdout.flush()?;
    }
    Ok(())
}

fn output_response(format: &OutputFormat, data: &Value) -> Result<(), AppError> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(data)?),
        OutputFormat::JsonPretty => println!("{}", serde_json::to_string_pretty(data)?),
    }
    Ok(())
}
