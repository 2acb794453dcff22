use anyhow::Result;

use keyward::run_cli;

#[tokio::main]
async fn main() -> Result<()> {
    run_cli().await
}
