//! Apply command - converge remote instances to the document.

use anyhow::{Context as AnyhowContext, Result, bail};
use rayon::prelude::*;
use reconcile::{executor, planner};
use std::path::PathBuf;
use std::time::Duration;

use crate::Context;
use crate::cli::ApplyArgs;
use crate::config::{Document, InstanceConfig, default_document_path};
use crate::progress::BarProgress;
use crate::remote::InstanceClient;
use crate::schema;
use crate::ui;

pub fn run(ctx: &Context, args: ApplyArgs) -> Result<()> {
    let path = document_path(args.file.clone())?;
    if ctx.verbose > 0 {
        ui::info(&format!("Using document {}", path.display()));
    }
    let document = Document::load(&path)?;
    let instances = select_instances(&document, args.instance.as_deref())?;

    let parallel = args.jobs > 1 && instances.len() > 1;
    if parallel && !args.yes && !args.dry_run {
        bail!("--jobs requires --yes: confirmation prompts cannot run in parallel");
    }

    let results: Vec<(String, Result<bool>)> = if parallel {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(args.jobs)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create thread pool: {e}"))?;
        pool.install(|| {
            instances
                .par_iter()
                .map(|(name, instance)| {
                    let result = reconcile_instance(ctx, name, instance, &args);
                    ((*name).to_string(), result)
                })
                .collect()
        })
    } else {
        instances
            .iter()
            .map(|(name, instance)| {
                let result = reconcile_instance(ctx, name, instance, &args);
                ((*name).to_string(), result)
            })
            .collect()
    };

    let mut failed = 0usize;
    for (name, result) in results {
        match result {
            Ok(true) => {}
            Ok(false) => failed += 1,
            Err(e) => {
                ui::error(&format!("Instance '{name}': {e:#}"));
                failed += 1;
            }
        }
    }
    if failed > 0 {
        bail!("{failed} instance(s) did not converge");
    }
    Ok(())
}

/// Reconcile one instance. Returns whether every operation succeeded.
fn reconcile_instance(
    ctx: &Context,
    name: &str,
    instance: &InstanceConfig,
    args: &ApplyArgs,
) -> Result<bool> {
    if !ctx.quiet {
        ui::header(&format!("Instance '{name}' ({})", instance.host_url));
    }

    let registry = schema::registry();
    let timeout = Duration::from_secs(instance.request_timeout);
    let api_key = resolve_api_key(instance, timeout)?;
    let client = InstanceClient::new(&instance.host_url, &api_key, timeout);

    let desired = instance
        .desired_tree(registry)
        .with_context(|| format!("Invalid settings for instance '{name}'"))?;
    let actual = executor::fetch_actual(registry, &desired, &client)
        .context("Failed to fetch remote state")?;
    let plan = planner::plan(registry, &desired, &actual)?;

    if !ctx.quiet {
        ui::display_plan(registry, &plan);
    }
    if plan.is_empty() {
        return Ok(true);
    }
    if args.dry_run {
        return Ok(true);
    }

    if !args.yes {
        let confirmed = dialoguer::Confirm::new()
            .with_prompt("Apply changes?")
            .default(false)
            .interact()
            .context("Failed to read confirmation")?;
        if !confirmed {
            ui::info("Aborted; no changes applied.");
            return Ok(true);
        }
    }

    let mut progress = if ctx.quiet {
        BarProgress::hidden()
    } else {
        BarProgress::new(plan.changeset.total_ops())
    };
    let outcome = executor::apply(registry, &plan.changeset, &client, &mut progress)?;
    progress.finish();

    if !ctx.quiet {
        ui::display_outcome(&outcome);
    }

    if outcome.is_success() && (args.verify || instance.verify) {
        executor::verify(registry, &desired, &client)
            .context("Post-apply verification failed")?;
        if !ctx.quiet {
            ui::success("Verified: remote state matches the document");
        }
    }

    Ok(outcome.is_success())
}

/// Resolve the document path, preferring an explicit flag.
pub fn document_path(file: Option<PathBuf>) -> Result<PathBuf> {
    match file {
        Some(path) => Ok(path),
        None => default_document_path(),
    }
}

/// Select the instances to operate on, in document order.
pub fn select_instances<'a>(
    document: &'a Document,
    instance: Option<&'a str>,
) -> Result<Vec<(&'a str, &'a InstanceConfig)>> {
    match instance {
        None => Ok(document
            .instances
            .iter()
            .map(|(name, config)| (name.as_str(), config))
            .collect()),
        Some(name) => document
            .instances
            .get(name)
            .map(|config| vec![(name, config)])
            .with_context(|| format!("No instance named '{name}' in the document")),
    }
}

/// Use the configured API key, or probe the instance for one.
pub fn resolve_api_key(instance: &InstanceConfig, timeout: Duration) -> Result<String> {
    if let Some(key) = &instance.api_key {
        return Ok(key.clone());
    }
    log::info!(
        "No API key configured for {}, probing initialize.js",
        instance.host_url
    );
    arrkit::probe_api_key(&instance.host_url, timeout)
        .with_context(|| format!("Could not discover an API key for {}", instance.host_url))
}
