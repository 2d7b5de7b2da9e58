//! Server initialization
//!
//! Tracing setup and the `serve_stdio!` macro used by every server binary.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing for an MCP server
///
/// Logs go to stderr; stdout carries the MCP protocol and must stay clean.
/// `RUST_LOG` filters as usual, with `<crate_name>=info` added as a baseline.
/// Set `LOG_FORMAT=json` for JSON lines.
///
/// ```rust,ignore
/// mcp_common::init_tracing("mssql_mcp")?;
/// ```
pub fn init_tracing(crate_name: &str) -> anyhow::Result<()> {
    let directive = format!("{}=info", crate_name);
    let filter = EnvFilter::from_default_env().add_directive(directive.parse()?);

    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);

    if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(false),
            )
            .try_init()?;
    }

    Ok(())
}

/// Generate a `main` that serves an MCP server over stdio
///
/// The server type must provide a fallible `new() -> anyhow::Result<Self>`.
/// Construction happens before the transport is opened, so a server that
/// cannot be configured exits with an error instead of accepting requests.
///
/// ```rust,ignore
/// mcp_common::serve_stdio!(MssqlMcpServer, "mssql_mcp");
/// ```
#[macro_export]
macro_rules! serve_stdio {
    ($server_type:ty, $crate_name:expr) => {
        #[tokio::main]
        async fn main() -> anyhow::Result<()> {
            use rmcp::ServiceExt;

            $crate::init_tracing($crate_name)?;

            tracing::info!(concat!("Starting ", $crate_name, " MCP Server"));

            let server = match <$server_type>::new() {
                Ok(server) => server,
                Err(e) => {
                    tracing::error!("Startup aborted: {:#}", e);
                    return Err(e);
                }
            };
            let service = server.serve(rmcp::transport::stdio()).await?;

            tracing::info!("Server running, waiting for requests...");

            service.waiting().await?;

            tracing::info!("Server shutting down");
            Ok(())
        }
    };
}
