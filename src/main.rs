//! tera-httpd
//!
//! A small multi-process HTTP file server: requests resolve against one or
//! more document roots, `.tera` pages render through the template engine,
//! everything else is served as static content with a uniform caching and
//! access-control policy.
//!
//! # Architecture Overview
//!
//! ```text
//!                ┌──────────────────────────────────────────────────┐
//!                │                 COORDINATOR                       │
//!                │  supervisor: spawn one worker per CPU, respawn    │
//!                │  on exit, forward nothing but the listening port  │
//!                └───────────────┬──────────────────────────────────┘
//!                                │  re-exec with --worker
//!                ┌───────────────▼──────────────────────────────────┐
//!                │                   WORKER                          │
//!                │  ┌─────┐   ┌──────┐   ┌─────────┐   ┌─────────┐  │
//!   Request ─────┼─▶│ net │──▶│ http │──▶│ routing │──▶│ render  │  │
//!                │  └─────┘   └──────┘   └────┬────┘   └─────────┘  │
//!                │   reuseport  auth gate     │ vhost → resolve →    │
//!                │   bind, TLS  timeout,      │ probe → classify     │
//!                │              body limit    ▼                      │
//!   Response ◀───┼──────────────────── response (content type +     │
//!                │                      cache pair on every outcome) │
//!                └──────────────────────────────────────────────────┘
//! ```

use clap::Parser;

use tera_httpd::cli::{Cli, Show};
use tera_httpd::http::HttpServer;
use tera_httpd::{config, observability, supervisor};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    observability::logging::init();

    let cli = Cli::parse();
    let config = config::load(&cli)?;

    if cli.version {
        println!("{}", config.version);
        return Ok(());
    }

    if let Some(show) = cli.show {
        match show {
            Show::Config => println!("{}", serde_json::to_string_pretty(&config)?),
            Show::Define => {
                let path = config::define_path(&cli.config);
                let content = std::fs::read_to_string(&path).unwrap_or_else(|_| "{}".to_string());
                println!("{}", content.trim_end());
            }
        }
        return Ok(());
    }

    if cli.worker {
        let server = HttpServer::new(config, config::define_path(&cli.config))?;
        server.run().await?;
    } else {
        tracing::info!(
            pid = std::process::id(),
            port = config.port,
            "{} running!",
            config.title
        );
        supervisor::run(&config).await?;
    }

    Ok(())
}
