use anyhow::{Context, Result};
use clap::Parser;
use rhttp::commands::{self, RequestOptions};
use rhttp::http::{ClientConfig, DEFAULT_RETRIES, HttpClient};
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;

/// rhttp - HTTP requests with automatic retry of transport failures
///
/// Connection resets, timeouts and DNS failures are retried without delay.
/// HTTP error statuses are printed, not retried.
///
/// Examples:
///   rhttp request GET https://example.com/health
///   rhttp request POST https://example.com/query -H 'Authorization: Bearer abc' -d '{"q": 1}'
///   rhttp download https://example.com/dump.bin dump.bin --chunk-size 65536
#[derive(Parser, Debug)]
#[command(author, version = env!("RHTTP_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Retries after the first attempt on transport failures (also via RHTTP_RETRIES)
    #[arg(long, env = "RHTTP_RETRIES", default_value_t = DEFAULT_RETRIES, global = true)]
    pub retries: u32,

    /// Per-attempt timeout in seconds (also via RHTTP_TIMEOUT)
    #[arg(long, env = "RHTTP_TIMEOUT", value_name = "SECONDS", global = true)]
    pub timeout: Option<u64>,

    /// User-Agent header value (also via RHTTP_USER_AGENT)
    #[arg(long, env = "RHTTP_USER_AGENT", global = true)]
    pub user_agent: Option<String>,

    /// Log request and retry details
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Send a request and print the response
    Request(RequestArgs),

    /// Download a response body to a file in chunks
    Download(DownloadArgs),
}

#[derive(clap::Args, Debug)]
pub struct RequestArgs {
    /// HTTP method, e.g. GET or POST
    #[arg(value_name = "METHOD")]
    pub method: String,

    #[arg(value_name = "URL")]
    pub url: String,

    /// Request header, repeatable
    #[arg(short = 'H', long = "header", value_name = "NAME: VALUE", value_parser = header_arg)]
    pub headers: Vec<(String, String)>,

    /// JSON request body
    #[arg(short = 'd', long = "data", value_name = "JSON", value_parser = json_arg)]
    pub data: Option<Value>,

    /// Print response headers
    #[arg(short = 'i', long = "include")]
    pub include: bool,
}

#[derive(clap::Args, Debug)]
pub struct DownloadArgs {
    #[arg(value_name = "URL")]
    pub url: String,

    /// Destination file
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Request header, repeatable
    #[arg(short = 'H', long = "header", value_name = "NAME: VALUE", value_parser = header_arg)]
    pub headers: Vec<(String, String)>,

    /// Bytes per chunk written to disk (transport default when omitted)
    #[arg(long, value_name = "BYTES")]
    pub chunk_size: Option<usize>,
}

fn header_arg(arg: &str) -> Result<(String, String), String> {
    commands::parse_header(arg).map_err(|e| e.to_string())
}

fn json_arg(arg: &str) -> Result<Value, String> {
    commands::parse_json(arg).map_err(|e| format!("{:#}", e))
}

impl Cli {
    fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig {
            retries: self.retries,
            timeout: self.timeout.map(Duration::from_secs),
            ..Default::default()
        };
        if let Some(user_agent) = &self.user_agent {
            config.user_agent = user_agent.clone();
        }
        config
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let mut client = cli.client_config().build()?;

    match &cli.command {
        Commands::Request(args) => {
            let options = RequestOptions {
                method: args.method.to_uppercase(),
                url: args.url.clone(),
                headers: commands::collect_headers(&args.headers),
                data: args.data.clone(),
                include_headers: args.include,
            };
            let stdout = std::io::stdout();
            commands::request(&client, &options, &mut stdout.lock())?;
        }
        Commands::Download(args) => {
            let mut file = std::fs::File::create(&args.path)
                .with_context(|| format!("Failed to create {}", args.path.display()))?;
            let headers = commands::collect_headers(&args.headers);
            let result =
                commands::download(&client, &args.url, &headers, args.chunk_size, &mut file);
            match result {
                Ok(bytes) => println!("Downloaded {} bytes to {}", bytes, args.path.display()),
                Err(e) => {
                    drop(file);
                    if let Err(remove_err) = std::fs::remove_file(&args.path) {
                        log::warn!(
                            "Failed to remove partial download {}: {}",
                            args.path.display(),
                            remove_err
                        );
                    }
                    return Err(e);
                }
            }
        }
    }

    client.close()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_request_parsing() {
        let cli = Cli::try_parse_from([
            "rhttp",
            "request",
            "post",
            "https://example.com/query",
            "-H",
            "Authorization: Bearer abc",
            "-H",
            "x-format: tagged",
            "-d",
            r#"{"q": 1}"#,
            "-i",
        ])
        .unwrap();
        match cli.command {
            Commands::Request(args) => {
                assert_eq!(args.method, "post");
                assert_eq!(args.url, "https://example.com/query");
                assert_eq!(
                    args.headers,
                    vec![
                        ("Authorization".to_string(), "Bearer abc".to_string()),
                        ("x-format".to_string(), "tagged".to_string()),
                    ]
                );
                assert_eq!(args.data, Some(serde_json::json!({"q": 1})));
                assert!(args.include);
            }
            _ => panic!("Expected Request command"),
        }
        assert_eq!(cli.retries, DEFAULT_RETRIES);
    }

    #[test]
    fn test_cli_download_parsing() {
        let cli = Cli::try_parse_from([
            "rhttp",
            "download",
            "https://example.com/dump.bin",
            "/tmp/dump.bin",
            "--chunk-size",
            "1024",
        ])
        .unwrap();
        match cli.command {
            Commands::Download(args) => {
                assert_eq!(args.url, "https://example.com/dump.bin");
                assert_eq!(args.path, PathBuf::from("/tmp/dump.bin"));
                assert_eq!(args.chunk_size, Some(1024));
            }
            _ => panic!("Expected Download command"),
        }
    }

    #[test]
    fn test_cli_global_flags() {
        let cli = Cli::try_parse_from([
            "rhttp",
            "--retries",
            "0",
            "request",
            "GET",
            "https://example.com",
            "--timeout",
            "5",
            "--user-agent",
            "ops-check/1.0",
        ])
        .unwrap();
        let config = cli.client_config();
        assert_eq!(config.retries, 0);
        assert_eq!(config.timeout, Some(Duration::from_secs(5)));
        assert_eq!(config.user_agent, "ops-check/1.0");
    }

    #[test]
    fn test_cli_rejects_bad_header() {
        let result = Cli::try_parse_from([
            "rhttp",
            "request",
            "GET",
            "https://example.com",
            "-H",
            "missing-separator",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_rejects_bad_json() {
        let result = Cli::try_parse_from([
            "rhttp",
            "request",
            "POST",
            "https://example.com",
            "-d",
            "{oops",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_no_subcommand_fails() {
        let result = Cli::try_parse_from(["rhttp", "https://example.com"]);
        assert!(result.is_err());
    }
}
