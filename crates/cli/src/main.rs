//! sanctum - call a Sanctum-backed API from the command line.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use sanctum_client::{ApiClient, ClientError, RequestConfig};

/// Call a Sanctum-backed API
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server origin all endpoints are resolved against
    #[arg(long, env = "SERVER_URL", default_value = "http://localhost:8000")]
    server_url: String,

    /// Request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// GET an endpoint
    Get {
        endpoint: String,
        /// Query parameter as key=value
        #[arg(long = "param", value_parser = parse_key_val)]
        params: Vec<(String, String)>,
    },
    /// POST a JSON body
    Post {
        endpoint: String,
        /// JSON body
        #[arg(long, default_value = "{}")]
        data: String,
        /// Extra header as 'Name: value'
        #[arg(long = "header", value_parser = parse_header)]
        headers: Vec<(String, String)>,
    },
    /// PUT a JSON body
    Put {
        endpoint: String,
        /// JSON body
        #[arg(long, default_value = "{}")]
        data: String,
    },
    /// DELETE an endpoint
    Delete {
        endpoint: String,
        /// Query parameter as key=value
        #[arg(long = "param", value_parser = parse_key_val)]
        params: Vec<(String, String)>,
    },
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{}'", s))
}

fn parse_header(s: &str) -> Result<(String, String), String> {
    s.split_once(':')
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected 'Name: value', got '{}'", s))
}

fn params_object(params: Vec<(String, String)>) -> Value {
    Value::Object(
        params
            .into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect::<Map<_, _>>(),
    )
}

fn parse_data(data: &str) -> Result<Value> {
    serde_json::from_str(data).with_context(|| format!("--data is not valid JSON: {}", data))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut builder = ApiClient::builder().server_url(&args.server_url);
    if let Some(secs) = args.timeout {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    let client = builder.build()?;
    info!("Using server {}", client.config().server_url);

    let result = match args.command {
        Command::Get { endpoint, params } => {
            client.get(&endpoint, Some(&params_object(params))).await
        }
        Command::Post {
            endpoint,
            data,
            headers,
        } => {
            let config = headers
                .into_iter()
                .fold(RequestConfig::new(), |config, (k, v)| config.header(k, v));
            client.post(&endpoint, &parse_data(&data)?, Some(config)).await
        }
        Command::Put { endpoint, data } => client.put(&endpoint, &parse_data(&data)?).await,
        Command::Delete { endpoint, params } => {
            client.delete(&endpoint, Some(&params_object(params))).await
        }
    };

    match result {
        Ok(response) => {
            info!("{} {}", response.status(), response.url());
            println!("{}", response.text());
            Ok(())
        }
        Err(ClientError::Status { status, url, body }) => {
            println!("{}", String::from_utf8_lossy(&body));
            anyhow::bail!("{} returned {}", url, status)
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_default_server() {
        let args = Args::parse_from(["sanctum", "get", "/api/user"]);
        assert!(!args.verbose);
        match args.command {
            Command::Get { endpoint, params } => {
                assert_eq!(endpoint, "/api/user");
                assert!(params.is_empty());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_args_post_with_headers() {
        let args = Args::parse_from([
            "sanctum",
            "--server-url",
            "https://api.example.com",
            "post",
            "/login",
            "--data",
            r#"{"email":"a@b.c"}"#,
            "--header",
            "X-Requested-With: XMLHttpRequest",
        ]);
        assert_eq!(args.server_url, "https://api.example.com");
        match args.command {
            Command::Post { data, headers, .. } => {
                assert_eq!(parse_data(&data).unwrap()["email"], "a@b.c");
                assert_eq!(
                    headers,
                    vec![("X-Requested-With".to_string(), "XMLHttpRequest".to_string())]
                );
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_params_object() {
        let value = params_object(vec![("page".to_string(), "2".to_string())]);
        assert_eq!(value["page"], "2");
    }

    #[test]
    fn test_parse_key_val_rejects_missing_equals() {
        assert!(parse_key_val("page").is_err());
        assert!(parse_header(": value").is_err());
        assert!(parse_data("not json").is_err());
    }
}
