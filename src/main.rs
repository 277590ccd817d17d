use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    sitelens_cli::cli::run().await
}
