//! Job CLI commands

use std::path::Path;

use anyhow::Result;

use super::output::Output;
use crate::domain::Job;
use crate::storage::{JobStore, StoreConfig};

pub fn init(output: &Output, root: &Path) -> Result<()> {
    StoreConfig::write_default(root)?;
    output.success(&format!("Initialized job store at {}", root.display()));
    Ok(())
}

pub fn add(output: &Output, store: &JobStore, name: &str, command: &str) -> Result<()> {
    let mut job = Job::shell(name, command);
    let id = store.add(&mut job)?;

    output.verbose_ctx("add", &format!("Stored job {} under kind {}", id, job.kind()));
    if output.is_json() {
        output.data(&serde_json::json!({
            "id": id,
            "name": name,
            "kind": job.kind().as_str(),
        }));
    } else {
        output.success(&format!("Added job {}: {}", id, name));
    }
    Ok(())
}

pub fn list(output: &Output, store: &JobStore) -> Result<()> {
    let jobs = store.list()?;
    output.verbose_ctx("list", &format!("Found {} jobs", jobs.len()));
    print_jobs(output, &jobs);
    Ok(())
}

pub fn show(output: &Output, store: &JobStore, id: i64) -> Result<()> {
    let job = store.get(id)?;
    if output.is_json() {
        output.data(&job);
    } else {
        println!("{}", job.info());
    }
    Ok(())
}

pub fn update(
    output: &Output,
    store: &JobStore,
    id: i64,
    name: Option<String>,
    command: Option<String>,
) -> Result<()> {
    if name.is_none() && command.is_none() {
        anyhow::bail!("Nothing to update: pass --name and/or --command");
    }

    let mut job = store.get(id)?;
    match &mut job {
        Job::Shell(shell) => {
            if let Some(name) = name {
                shell.name = name;
            }
            if let Some(command) = command {
                shell.command = command;
            }
        }
    }
    store.update(&job)?;

    output.success(&format!("Updated job {}", id));
    Ok(())
}

pub fn delete(output: &Output, store: &JobStore, id: i64) -> Result<()> {
    store.delete(id)?;
    output.success(&format!("Deleted job {}", id));
    Ok(())
}

pub fn search(output: &Output, store: &JobStore, query: &str) -> Result<()> {
    let jobs = store.search_by_name(query)?;
    output.verbose_ctx("search", &format!("Found {} jobs matching '{}'", jobs.len(), query));
    if !output.is_json() && jobs.is_empty() {
        println!("No jobs found for '{}'", query);
        return Ok(());
    }
    print_jobs(output, &jobs);
    Ok(())
}

fn print_jobs(output: &Output, jobs: &[Job]) {
    if output.is_json() {
        output.data(&jobs);
        return;
    }

    if jobs.is_empty() {
        println!("No jobs in the store");
        return;
    }

    println!("{:<6} {:<8} {:<20} COMMAND", "ID", "KIND", "NAME");
    println!("{}", "-".repeat(70));
    for job in jobs {
        match job {
            Job::Shell(shell) => {
                println!(
                    "{:<6} {:<8} {:<20} {}",
                    shell.id,
                    job.kind(),
                    shell.name,
                    shell.command
                );
            }
        }
    }
}
