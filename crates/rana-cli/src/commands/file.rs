//! Project file transfer commands

use super::App;
use crate::cli::FileArgs;
use crate::errors::remote_file_not_found;
use crate::output::OutputWriter;
use crate::output_types::TransferOutput;
use crate::progress::TransferProgress;
use anyhow::{bail, Context, Result};
use dialoguer::Confirm;
use rana_core::models::ProjectFile;
use rana_core::ports::ProjectClient;
use rana_sync::{FileDownloadWorker, FileUploadWorker, TransferEvent};
use std::path::PathBuf;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

pub async fn download(args: FileArgs, app: &App, output: &OutputWriter) -> Result<()> {
    let client = app.rana()?;
    let project = client
        .get_project(&args.project)
        .await
        .with_context(|| format!("Failed to fetch project {}", args.project))?;
    let file = client
        .stat_file(&project.id, &args.path)
        .await?
        .ok_or_else(|| remote_file_not_found(&project.name, &args.path))?;

    let worker = FileDownloadWorker::new(
        reqwest::Client::new(),
        app.settings()?,
        app.working_dir(),
        project.clone(),
        file,
    );
    let local_path = follow(worker.spawn(), &format!("Downloading {}", args.path)).await?;

    output.result(TransferOutput {
        project: project.name,
        path: args.path,
        local_path: local_path.display().to_string(),
    })
}

pub async fn upload(args: FileArgs, app: &App, output: &OutputWriter) -> Result<()> {
    let client = app.rana()?;
    let project = client
        .get_project(&args.project)
        .await
        .with_context(|| format!("Failed to fetch project {}", args.project))?;

    // The worker reads the server record itself; only the path matters here
    let file = ProjectFile {
        id: args.path.clone(),
        url: None,
        descriptor_id: None,
        data_type: None,
        size: None,
        last_modified: String::new(),
    };

    let worker = FileUploadWorker::new(
        client,
        reqwest::Client::new(),
        app.settings()?,
        app.working_dir(),
        project.clone(),
        file,
    );
    let local_path = follow(worker.spawn(), &format!("Uploading {}", args.path)).await?;

    output.result(TransferOutput {
        project: project.name,
        path: args.path,
        local_path: local_path.display().to_string(),
    })
}

/// Render a worker's events until it finishes
async fn follow(
    (handle, mut events): (JoinHandle<()>, UnboundedReceiver<TransferEvent>),
    label: &str,
) -> Result<PathBuf> {
    let mut progress = TransferProgress::new(label);
    let mut outcome: Option<Result<PathBuf>> = None;

    while let Some(event) = events.recv().await {
        match event {
            TransferEvent::Progress(percent) => progress.update(percent),
            TransferEvent::Conflict(resolver) => {
                let overwrite = progress.suspend(|| {
                    tokio::task::block_in_place(|| {
                        Confirm::new()
                            .with_prompt(
                                "The file was changed on the server since it was downloaded. Overwrite it?",
                            )
                            .default(false)
                            .interact()
                            .unwrap_or(false)
                    })
                });
                if overwrite {
                    resolver.overwrite();
                } else {
                    resolver.abort();
                }
            }
            TransferEvent::Finished(path) => {
                progress.succeed(&path.display().to_string());
                outcome = Some(Ok(path));
            }
            TransferEvent::Failed(message) => {
                progress.fail(&message);
                outcome = Some(Err(anyhow::anyhow!(message)));
            }
        }
    }
    handle.await.context("Transfer task panicked")?;

    match outcome {
        Some(result) => result,
        None => bail!("Transfer ended without a result"),
    }
}
