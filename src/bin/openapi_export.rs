use std::{fs, path::PathBuf};

use clap::Parser;
use inventory_api::openapi::ApiDocV1;
use utoipa::OpenApi;

#[derive(Parser)]
#[command(name = "openapi-export", about = "Write the OpenAPI document to disk", version)]
struct Cli {
    /// Output file
    #[arg(long, default_value = "openapi/inventory-api.json")]
    output: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let json = ApiDocV1::openapi().to_pretty_json()?;

    if let Some(dir) = cli.output.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    fs::write(&cli.output, json)?;

    println!("OpenAPI document written to {}", cli.output.display());
    Ok(())
}
