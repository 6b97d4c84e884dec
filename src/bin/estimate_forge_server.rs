//! Estimate Forge API Server binary
//!
//! HTTP REST API for filling estimation templates.

use clap::Parser;
use estimate_forge::api::{run_api_server, ApiConfig};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "estimate-forge-server")]
#[command(version)]
#[command(about = "Estimate Forge API Server - fill Excel estimation templates over HTTP")]
#[command(long_about = r#"
Estimate Forge API Server

Endpoints:
  - POST /api/v1/populate  - Fill a template, download the .xlsx
  - POST /api/v1/inspect   - Report how a template would be filled
  - POST /api/v1/summary   - Totals for a payload
  - POST /api/v1/export    - Features/Summary workbook for a payload

Additional endpoints:
  - GET  /health           - Health check
  - GET  /version          - Server version info
  - GET  /                 - API documentation

Example usage:
  estimate-forge-server                               # localhost:8080, built-in template
  estimate-forge-server --template Estimate.xlsx --port 3000

  curl -X POST http://localhost:8080/api/v1/populate \
    -H "Content-Type: application/json" \
    -d '{"envelope": {"rows": [{"module": "Auth", "feature": "Login"}]}}' \
    -o filled.xlsx
"#)]
struct Args {
    /// Host address to bind to (use 0.0.0.0 for all interfaces)
    #[arg(short = 'H', long, default_value = "127.0.0.1", env = "ESTIMATE_FORGE_HOST")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "8080", env = "ESTIMATE_FORGE_PORT")]
    port: u16,

    /// Template used when a request names none (defaults to the built-in template)
    #[arg(short, long, env = "ESTIMATE_FORGE_TEMPLATE")]
    template: Option<PathBuf>,

    /// Maximum request body size in bytes
    #[arg(long, default_value_t = estimate_forge::api::server::DEFAULT_MAX_UPLOAD, env = "ESTIMATE_FORGE_MAX_UPLOAD")]
    max_upload: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = ApiConfig {
        host: args.host,
        port: args.port,
        template_path: args.template,
        max_upload: args.max_upload,
    };

    run_api_server(config).await
}
