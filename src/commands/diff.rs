//! Diff command - preview what apply would change.

use anyhow::{Context as AnyhowContext, Result, bail};
use reconcile::{executor, planner};
use std::time::Duration;

use crate::Context;
use crate::cli::DiffArgs;
use crate::commands::apply::{document_path, resolve_api_key, select_instances};
use crate::config::Document;
use crate::remote::InstanceClient;
use crate::schema;
use crate::ui;

pub fn run(ctx: &Context, args: DiffArgs) -> Result<()> {
    let path = document_path(args.file)?;
    if ctx.verbose > 0 {
        ui::info(&format!("Using document {}", path.display()));
    }
    let document = Document::load(&path)?;
    let instances = select_instances(&document, args.instance.as_deref())?;
    let registry = schema::registry();

    let mut pending = 0usize;
    for (name, instance) in instances {
        if !ctx.quiet {
            ui::header(&format!("Instance '{name}' ({})", instance.host_url));
        }

        let timeout = Duration::from_secs(instance.request_timeout);
        let api_key = resolve_api_key(instance, timeout)?;
        let client = InstanceClient::new(&instance.host_url, &api_key, timeout);

        let desired = instance
            .desired_tree(registry)
            .with_context(|| format!("Invalid settings for instance '{name}'"))?;
        let actual = executor::fetch_actual(registry, &desired, &client)
            .context("Failed to fetch remote state")?;
        let plan = planner::plan(registry, &desired, &actual)?;

        ui::display_plan(registry, &plan);
        pending += plan.changeset.total_ops();
    }

    if pending > 0 {
        bail!("{pending} pending change(s); run 'arrctl apply' to converge");
    }
    Ok(())
}
