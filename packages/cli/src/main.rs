#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Interactive CLI orchestrator for the address map toolchain.
//!
//! Provides a unified entry point that lets users pick which tool to run
//! (the address tools or the API server) and guides them through its
//! configuration.
//!
//! Uses `indicatif-log-bridge` (via [`address_map_cli_utils::init_logger`])
//! to route `log` output through `indicatif::MultiProgress` so that log
//! lines and progress bars never fight for the terminal.

use address_map_cli_utils::IndicatifProgress;
use dialoguer::Select;

/// Top-level tool selection for the address map toolchain.
enum Tool {
    Addresses,
    Server,
}

impl Tool {
    const ALL: &[Self] = &[Self::Addresses, Self::Server];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::Addresses => "Manage & analyze addresses",
            Self::Server => "Start server",
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = address_map_cli_utils::init_logger();

    println!("Address Map Toolchain");
    println!();

    let labels: Vec<&str> = Tool::ALL.iter().map(Tool::label).collect();

    let idx = Select::new()
        .with_prompt("What would you like to do?")
        .items(&labels)
        .default(0)
        .interact()?;

    match Tool::ALL[idx] {
        Tool::Addresses => {
            let progress = |label: &str| {
                if label == "Importing" {
                    IndicatifProgress::records_bar(&multi, label)
                } else {
                    IndicatifProgress::batch_bar(&multi, label)
                }
            };
            address_map_ingest::interactive::run(&progress).await?;
        }
        Tool::Server => {
            // The server uses actix-web's runtime, so we need to run it
            // in a blocking task to avoid nesting tokio runtimes.
            tokio::task::spawn_blocking(|| {
                actix_web::rt::System::new().block_on(address_map_server::interactive::run())
            })
            .await??;
        }
    }

    Ok(())
}
