use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use batch_upload::{format_file_size, BatchOutcome, FileOutcome, FileSelection, ProgressUpdate, ResultReport, UploadSession};
use clap::Parser;
use error_printer::ErrorPrinter;
use upload_config::UploadConfig;
use upload_runtime::errors::map_join_error;
use upload_runtime::logging::{init_logging, LoggingConfig};

const VERSION: &str = concat!("vault-upload", "/", env!("CARGO_PKG_VERSION"));

/// Upload files to a vault-style file host in parallel and print their URLs and tokens.
#[derive(Parser)]
#[clap(name = "vault-upload", version)]
struct UploadCommand {
    /// Upload endpoint.  Overrides VAULT_UPLOAD_CLIENT_ENDPOINT.
    #[clap(long)]
    endpoint: Option<String>,

    /// Maximum number of uploads in flight at once.  Unlimited if not given.
    #[clap(long)]
    max_concurrent: Option<usize>,

    /// Print the report as JSON on stdout.
    #[clap(long)]
    json: bool,

    /// Files to upload.
    #[clap(required = true)]
    files: Vec<PathBuf>,
}

impl UploadCommand {
    fn config(&self) -> UploadConfig {
        let mut config = UploadConfig::new();
        if let Some(endpoint) = &self.endpoint {
            config = config.with_endpoint(endpoint.clone());
        }
        if self.max_concurrent.is_some() {
            config = config.with_max_concurrent_uploads(self.max_concurrent);
        }
        config
    }

    fn run(self) -> Result<BatchOutcome> {
        let config = self.config();
        init_logging(LoggingConfig::new(&config, VERSION));

        let mut selection = FileSelection::new();
        for path in &self.files {
            match selection.add_path(path) {
                Ok(d) => eprintln!("  {} ({})", d.display_name(), format_file_size(d.size_bytes())),
                Err(e) => eprintln!("  skipped: {e}"),
            }
        }
        if selection.is_empty() {
            bail!("No files selected");
        }
        eprintln!("{}", selection.summary());
        eprintln!("Uploading {} file(s) in parallel...", selection.len());

        let session = UploadSession::new(config).context("creating upload session")?;
        let batch = session.submit(selection.into_descriptors())?;

        let printer = batch.subscribe(Arc::new(|update: ProgressUpdate| {
            eprintln!("[{:>3.0}%] {}", update.fraction * 100.0, update.status_text);
        }));

        let cancel = batch.cancellation_token();
        session.runtime.spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("Interrupted; cancelling remaining uploads");
                cancel.cancel();
            }
        });

        let report = batch.await_settlement()?;

        // Let the last progress line print before the report.
        session
            .runtime
            .external_run_async_task(printer)
            .and_then(|joined| joined.map_err(map_join_error))
            .warn_error("progress printer did not finish")
            .ok();

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print_report(&report);
        }
        eprintln!("{}", report.summary_message());

        Ok(report.outcome())
    }
}

fn print_report(report: &ResultReport) {
    for entry in &report.entries {
        match entry {
            FileOutcome::Succeeded {
                display_name, url, token, ..
            } => {
                println!("{display_name}");
                println!("  URL:   {url}");
                println!("  Token: {token}");
            },
            FileOutcome::Failed {
                display_name, reason, ..
            } => {
                println!("{display_name}");
                println!("  failed: {reason}");
            },
            FileOutcome::Cancelled { display_name, .. } => {
                println!("{display_name}");
                println!("  cancelled");
            },
        }
    }
}

fn main() -> Result<()> {
    let outcome = UploadCommand::parse().run()?;
    if outcome != BatchOutcome::AllSucceeded {
        std::process::exit(1);
    }
    Ok(())
}
