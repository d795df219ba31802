use crate::cli::actions::Action;
use crate::varco::{self, origin::OriginPolicy};
use anyhow::Result;

/// Handle the server action
pub async fn handle(action: Action) -> Result<()> {
    match action {
        Action::Server {
            port,
            dsn,
            origins,
            assets,
        } => {
            // Fail at startup on a malformed allow-list entry, never at
            // request time.
            let policy = OriginPolicy::from_rules(&origins)?;

            varco::new(port, dsn, policy, assets).await?;
        }
    }

    Ok(())
}
