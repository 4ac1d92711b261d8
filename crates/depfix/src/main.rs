use depfix::{Remediation, RemediationRequest};
use depfix_core::ProcessRunner;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut input = String::new();
    if let Err(e) = tokio::io::stdin().read_to_string(&mut input).await {
        tracing::error!(error = %e, "failed to read request from stdin");
        return ExitCode::FAILURE;
    }

    let request: RemediationRequest = match serde_json::from_str(&input) {
        Ok(request) => request,
        Err(e) => {
            tracing::error!(error = %e, "invalid remediation request");
            return ExitCode::FAILURE;
        }
    };

    let report = Remediation::run_request(Arc::new(ProcessRunner), request).await;
    tracing::info!(
        fixed = report.fixed_count(),
        unsupported = report.unsupported_count(),
        failed = report.failed_count(),
        "remediation finished"
    );

    let mut output = match serde_json::to_vec_pretty(&report) {
        Ok(output) => output,
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize report");
            return ExitCode::FAILURE;
        }
    };
    output.push(b'\n');

    let mut stdout = tokio::io::stdout();
    if let Err(e) = stdout.write_all(&output).await {
        tracing::error!(error = %e, "failed to write report");
        return ExitCode::FAILURE;
    }
    if let Err(e) = stdout.flush().await {
        tracing::error!(error = %e, "failed to write report");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
