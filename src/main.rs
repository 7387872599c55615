use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    tabpilot_cli::cli::run().await
}
