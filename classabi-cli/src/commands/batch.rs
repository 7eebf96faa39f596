use std::{
    path::PathBuf,
    sync::{atomic::AtomicBool, Arc},
};

use classabi::{run_batch, AbiConfig, BatchJob, Error};
use serde::Serialize;

use crate::{
    app::GlobalOptions,
    commands::common::{exit_if_cancelled, StripInfo},
    output::print_output,
};

#[derive(Debug, Serialize)]
struct FailedJob {
    input: String,
    error: String,
}

#[derive(Debug, Serialize)]
struct BatchInfo {
    results: Vec<StripInfo>,
    failures: Vec<FailedJob>,
    total_jobs: usize,
}

pub fn run(
    jobs: &[(PathBuf, PathBuf)],
    config: &AbiConfig,
    cancel: &Arc<AtomicBool>,
    opts: &GlobalOptions,
) -> anyhow::Result<()> {
    let jobs: Vec<BatchJob> = jobs
        .iter()
        .map(|(input, output)| BatchJob {
            input: input.clone(),
            output: output.clone(),
        })
        .collect();

    let mut batch = BatchInfo {
        results: Vec::new(),
        failures: Vec::new(),
        total_jobs: jobs.len(),
    };
    let mut cancelled = false;
    for (job, result) in jobs.iter().zip(run_batch(&jobs, config, Some(cancel))) {
        match result {
            Ok(summary) => batch
                .results
                .push(StripInfo::new(&job.input, &job.output, &summary)),
            Err(Error::Cancelled) => cancelled = true,
            Err(error) => batch.failures.push(FailedJob {
                input: job.input.display().to_string(),
                error: error.to_string(),
            }),
        }
    }
    if cancelled {
        return Err(exit_if_cancelled(Error::Cancelled).into());
    }

    print_output(&batch, opts, |batch| {
        for info in &batch.results {
            println!("{}", info.line());
        }
        for failure in &batch.failures {
            eprintln!("{}: {}", failure.input, failure.error);
        }
        println!();
        println!(
            "Stripped {} of {} jars",
            batch.results.len(),
            batch.total_jobs
        );
    })?;

    if batch.failures.is_empty() {
        Ok(())
    } else {
        anyhow::bail!("{} of {} jobs failed", batch.failures.len(), batch.total_jobs)
    }
}
