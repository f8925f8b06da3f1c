//! Display-name enrichment.
//!
//! Applied as a post-processing pass over rendered records, never inside the
//! reconciliation engine. The local subject directory resolves first; a
//! configured roster service overrides what it knows.

use std::collections::HashMap;

use anyhow::{Context, Result};

use badgelog_db::Database;

pub fn resolve_names(
    db: &Database,
    roster_url: Option<&str>,
    ids: &[String],
) -> Result<HashMap<String, String>> {
    let mut names = db
        .subject_names(ids)
        .context("failed to read subject directory")?;

    if let Some(url) = roster_url {
        let client =
            badgelog_roster::Client::new(url).context("failed to create roster client")?;
        let runtime =
            tokio::runtime::Runtime::new().context("failed to initialize tokio runtime")?;
        let remote = runtime
            .block_on(client.display_names(ids))
            .context("failed to resolve names from roster")?;
        names.extend(remote);
    }

    Ok(names)
}
