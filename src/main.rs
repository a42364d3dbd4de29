//! # Lambda Secrets Extension
//!
//! Binary entry point. The Lambda host starts this executable from
//! `/opt/extensions/` with no arguments; its file name is the extension name.

use anyhow::Result;

use lambda_secrets_extension::runtime::{initialize, run};

#[tokio::main]
async fn main() -> Result<()> {
    let init = initialize().await?;
    run(init).await
}
