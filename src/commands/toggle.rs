//! Toggle command handler: clock in or out.

use anyhow::{Context, Result};
use jobcan_core::{CallContext, PortalClient};

pub async fn run_toggle_command(client: &mut PortalClient, ctx: &CallContext) -> Result<()> {
    let outcome = client
        .toggle(ctx)
        .await
        .context("Failed to toggle status")?;
    println!("previous status was {}", outcome.previous);
    println!("current status is {}", outcome.current);
    Ok(())
}
