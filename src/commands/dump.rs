//! Dump command - serialize a remote instance's configuration.
//!
//! The output is a complete document in the same shape `apply` accepts,
//! so a dumped configuration re-applied against the same instance plans
//! no changes.

use anyhow::{Context as AnyhowContext, Result};
use reconcile::{ConfigTree, RemoteClient};
use std::time::Duration;

use crate::Context;
use crate::cli::DumpArgs;
use crate::config::{dump_document, dump_settings};
use crate::remote::InstanceClient;
use crate::schema;

pub fn run(_ctx: &Context, args: DumpArgs) -> Result<()> {
    let timeout = Duration::from_secs(args.timeout);
    let host_url = args.url.trim_end_matches('/').to_string();

    let api_key = match args.api_key {
        Some(key) => key,
        None => match arrkit::probe_api_key(&host_url, timeout) {
            Ok(key) => key,
            Err(probe_err) => {
                log::debug!("initialize.js probe failed: {probe_err}");
                dialoguer::Password::new()
                    .with_prompt(format!("API key for {host_url}"))
                    .interact()
                    .context("Failed to read API key")?
            }
        },
    };

    let registry = schema::registry();
    let client = InstanceClient::new(&host_url, &api_key, timeout);

    // Dump reads every registered section, not just the ones a document
    // happens to manage.
    let mut tree = ConfigTree::new();
    for section in registry.sections() {
        let state = client
            .fetch_section(section)
            .with_context(|| format!("Failed to fetch section '{}'", section.name))?;
        tree.insert(section.name, state)?;
    }

    let settings = dump_settings(registry, &tree);
    let document = dump_document("default", &host_url, settings);
    print!(
        "{}",
        serde_yaml::to_string(&document).context("Failed to serialize document")?
    );
    Ok(())
}
