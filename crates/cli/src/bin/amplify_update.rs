use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    amplify_cli::main_entry().await
}
