//! Schematisation commands: download, load, list

use super::App;
use crate::cli::{DownloadArgs, LoadArgs};
use crate::errors::{local_schematisation_not_found, no_revisions, revision_not_found};
use crate::host::{DialoguerPrompt, IndicatifProgress};
use crate::output::OutputWriter;
use crate::output_types::{LoadOutput, LocalSchematisationRow};
use anyhow::{Context, Result};
use dialoguer::Select;
use rana_core::ports::RevisionClient;
use rana_store::list_local_schematisations;
use rana_sync::loader::{local_revisions_newest_first, select_local_revision, RevisionChoice};
use rana_sync::{load_local_schematisation, load_remote_schematisation, BuildAction};

pub async fn download(args: DownloadArgs, app: &App, output: &OutputWriter) -> Result<()> {
    let ctx = app.sync_context()?;
    let client = ctx.revisions.clone();

    let schematisation = client
        .fetch_schematisation(args.id)
        .await
        .with_context(|| format!("Failed to fetch schematisation {}", args.id))?;
    let revisions = client.list_revisions(args.id).await.context("Failed to list revisions")?;

    let revision = match args.revision {
        Some(revision_id) => revisions
            .iter()
            .find(|r| r.id == revision_id)
            .cloned()
            .ok_or_else(|| revision_not_found(args.id, revision_id))?,
        None => revisions
            .iter()
            .max_by_key(|r| r.number)
            .cloned()
            .ok_or_else(|| no_revisions(args.id))?,
    };

    output.info(format!(
        "Downloading '{}' revision {} into {}",
        schematisation.name,
        revision.number,
        ctx.working_dir.display()
    ));

    let progress = IndicatifProgress::new(format!("Downloading '{}'", schematisation.name));
    let loaded = load_remote_schematisation(&ctx, &schematisation, &revision, &progress).await;
    progress.finish();

    match loaded {
        Some(path) => output.result(LoadOutput {
            schematisation_id: schematisation.id,
            revision: revision.number,
            geopackage: Some(path.display().to_string()),
        }),
        None => {
            output.warning("Nothing was loaded");
            Ok(())
        }
    }
}

pub fn load(args: LoadArgs, app: &App, output: &OutputWriter) -> Result<()> {
    let working_dir = app.working_dir();
    let mut locals = list_local_schematisations(&working_dir).context("Failed to scan working directory")?;
    let mut local = locals
        .remove(&args.id)
        .ok_or_else(|| local_schematisation_not_found(args.id, &working_dir.display().to_string()))?;

    let choices: Vec<RevisionChoice> = local_revisions_newest_first(&local)
        .into_iter()
        .map(|r| if r.is_wip() { RevisionChoice::Wip } else { RevisionChoice::Numbered(r.number) })
        .collect();
    let labels: Vec<String> = local_revisions_newest_first(&local)
        .into_iter()
        .map(|r| {
            if r.is_wip() {
                format!("Work in progress (based on revision {})", r.number)
            } else {
                format!("Revision {}", r.number)
            }
        })
        .collect();
    if choices.is_empty() {
        output.warning(format!("Schematisation '{}' has no local revisions", local.name));
        return Ok(());
    }

    let picked = Select::new()
        .with_prompt(format!("Revision of '{}' to load", local.name))
        .items(&labels)
        .default(0)
        .interact_opt()?;
    let Some(index) = picked else {
        return Ok(());
    };

    let Some(revision) = select_local_revision(&mut local, choices[index], &DialoguerPrompt)? else {
        output.info("Cancelled");
        return Ok(());
    };

    let communication = app.communication();
    let loaded =
        load_local_schematisation(communication.as_ref(), None, Some(&revision), BuildAction::Loaded, None);

    output.result(LoadOutput {
        schematisation_id: local.id,
        revision: revision.number,
        geopackage: loaded.map(|p| p.display().to_string()),
    })
}

pub fn list(app: &App, output: &OutputWriter) -> Result<()> {
    let working_dir = app.working_dir();
    let locals = list_local_schematisations(&working_dir).context("Failed to scan working directory")?;

    output.section(format!("Schematisations in {}", working_dir.display()));
    output.table(locals.values().map(LocalSchematisationRow::from).collect())
}
