//! Check command handler: print the current work status.

use anyhow::{Context, Result};
use jobcan_core::{CallContext, PortalClient};
use tracing::debug;

pub async fn run_check_command(client: &mut PortalClient, ctx: &CallContext) -> Result<()> {
    debug!(logged_in = client.is_logined(), "checking status");
    let status = client
        .get_status(ctx)
        .await
        .context("Failed to get current status")?;
    println!("current status is {status}");
    Ok(())
}
