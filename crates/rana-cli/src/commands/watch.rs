//! Watch command: job and publication monitors on the scheduler

use super::App;
use crate::cli::WatchArgs;
use crate::output::OutputWriter;
use anyhow::Result;
use console::style;
use rana_core::models::{Job, Publication};
use rana_sync::monitor::{MonitorEvent, ProjectJobMonitor, PublicationMonitor};
use rana_sync::PersistentTaskScheduler;
use std::sync::Arc;
use std::time::Duration;

pub async fn execute(args: WatchArgs, app: &App, output: &OutputWriter) -> Result<()> {
    let client = app.rana()?;
    let (jobs, mut job_events) = ProjectJobMonitor::jobs(args.project.clone(), client.clone());
    let (publications, mut publication_events) =
        PublicationMonitor::publications(args.project.clone(), client);

    let scheduler = PersistentTaskScheduler::new(app.config.max_workers.value);
    scheduler.add_task(Arc::new(jobs), Duration::from_secs(app.config.job_poll_interval.value));
    scheduler.add_task(
        Arc::new(publications),
        Duration::from_secs(app.config.publication_poll_interval.value),
    );
    scheduler.start();
    output.info(format!("Watching project {} (Ctrl-C to stop)", args.project));

    loop {
        tokio::select! {
            Some(event) = job_events.recv() => report_job(event, app.json),
            Some(event) = publication_events.recv() => report_publication(event, app.json),
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    scheduler.stop();
    output.success("Stopped watching");
    Ok(())
}

fn report_job(event: MonitorEvent<Job>, json: bool) {
    if json {
        print_event("job", &event);
        return;
    }
    match event {
        MonitorEvent::Added(jobs) => {
            for job in jobs {
                println!("{} job {} {} ({})", style("+").green(), job.id, describe(&job.process), describe(&job.state));
            }
        }
        MonitorEvent::Updated(job) => {
            println!("{} job {} is now {}", style("~").cyan(), job.id, describe(&job.state));
        }
        MonitorEvent::Failed(message) => eprintln!("{} {}", style("⚠").yellow().bold(), message),
    }
}

fn report_publication(event: MonitorEvent<Publication>, json: bool) {
    if json {
        print_event("publication", &event);
        return;
    }
    match event {
        MonitorEvent::Added(publications) => {
            for publication in publications {
                println!(
                    "{} publication {} {}",
                    style("+").green(),
                    publication.id,
                    publication.name.as_deref().unwrap_or("")
                );
            }
        }
        MonitorEvent::Updated(publication) => {
            println!(
                "{} publication {} updated at {}",
                style("~").cyan(),
                publication.id,
                publication.updated_at
            );
        }
        MonitorEvent::Failed(message) => eprintln!("{} {}", style("⚠").yellow().bold(), message),
    }
}

fn print_event<T: serde::Serialize>(kind: &str, event: &MonitorEvent<T>) {
    let value = match event {
        MonitorEvent::Added(items) => serde_json::json!({"kind": kind, "event": "added", "items": items}),
        MonitorEvent::Updated(item) => serde_json::json!({"kind": kind, "event": "updated", "item": item}),
        MonitorEvent::Failed(message) => serde_json::json!({"kind": kind, "event": "failed", "message": message}),
    };
    println!("{}", value);
}

/// Job states and processes may be plain strings or objects
fn describe(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Object(map) => map
            .get("name")
            .or_else(|| map.get("state"))
            .map(describe)
            .unwrap_or_else(|| value.to_string()),
        serde_json::Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_describe_job_fields() {
        assert_eq!(describe(&json!("running")), "running");
        assert_eq!(describe(&json!({"name": "simulation", "id": 3})), "simulation");
        assert_eq!(describe(&json!(null)), "-");
    }
}
