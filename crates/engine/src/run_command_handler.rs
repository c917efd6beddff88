// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run Command Handler (component H): turns a resolved module list for a
//! `RunCommand` into Tradefed and non-Tradefed jobs (§4.4 `SessionStarted`
//! handling). Module *resolution* against `xts_root_dir` is out of scope
//! here; callers supply the already-resolved module names.

use ats_core::ids::{JobLocatorId, TestLocatorId};
use ats_core::job::{Job, JobLocator, JobTiming, Test, TestLocator};
use ats_core::IdGen;
use ats_core::run_command::RunCommand;
use std::collections::BTreeMap;

/// A resolved module, tagged with whether it runs under a Tradefed
/// worker subprocess or is executed directly by the engine.
#[derive(Debug, Clone)]
pub struct ResolvedModule {
    pub name: String,
    pub is_tradefed: bool,
}

pub struct BuiltJobs {
    pub tradefed_jobs: Vec<Job>,
    pub non_tradefed_jobs: Vec<Job>,
}

/// Builds Jobs from a `RunCommand`'s resolved module list (component H).
pub struct RunCommandHandler<'a> {
    id_gen: &'a dyn IdGen,
}

impl<'a> RunCommandHandler<'a> {
    pub fn new(id_gen: &'a dyn IdGen) -> Self {
        Self { id_gen }
    }

    /// One job per resolved module, split by Tradefed-ness (§4.4: "If
    /// none, add non-tradefed jobs immediately; else remember the set of
    /// running tradefed job ids").
    pub fn build_jobs(
        &self,
        command: &RunCommand,
        modules: &[ResolvedModule],
        start_epoch_ms: u64,
    ) -> BuiltJobs {
        let mut tradefed_jobs = Vec::new();
        let mut non_tradefed_jobs = Vec::new();

        for module in modules {
            let job = self.build_job(command, module, start_epoch_ms);
            if module.is_tradefed {
                tradefed_jobs.push(job);
            } else {
                non_tradefed_jobs.push(job);
            }
        }

        BuiltJobs {
            tradefed_jobs,
            non_tradefed_jobs,
        }
    }

    fn build_job(&self, command: &RunCommand, module: &ResolvedModule, start_epoch_ms: u64) -> Job {
        let job_id = JobLocatorId::new(self.id_gen.next());
        let test_id = TestLocatorId::new(self.id_gen.next());

        let start_timeout = std::time::Duration::from_secs(120);
        let job_timeout = std::time::Duration::from_secs(3600);

        let mut test = Test::new(
            TestLocator {
                id: test_id,
                name: module.name.clone(),
            },
            job_id.clone(),
        );
        if module.is_tradefed {
            // Worker subprocesses write their snapshot alongside the
            // invocation's own working directory under xts_root_dir; the
            // exact layout of that directory is out of scope (§1
            // Non-goals: "Tradefed subprocess internals").
            let path = format!(
                "{}/logs/{}/runtime_info.json",
                command.xts_root_dir.trim_end_matches('/'),
                test.locator.id.as_str()
            );
            test.properties
                .insert(ats_core::tradefed::RUNTIME_INFO_FILE_PATH_PROPERTY.to_string(), path);
        }

        Job {
            locator: JobLocator {
                id: job_id.clone(),
                name: module.name.clone(),
            },
            dimensions: BTreeMap::new(),
            parameters: BTreeMap::from([("test_plan".to_string(), command.test_plan.clone())]),
            timing: JobTiming {
                start_epoch_ms,
                end_epoch_ms: None,
                start_timeout,
                job_timeout,
            },
            result: Default::default(),
            warnings: Vec::new(),
            properties: BTreeMap::new(),
            tagged_files: BTreeMap::new(),
            tests: vec![test],
        }
    }
}

#[cfg(test)]
#[path = "run_command_handler_tests.rs"]
mod tests;
