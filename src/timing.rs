use crate::{crds::DevWorkspace, error::Result};
use std::{
    collections::BTreeMap,
    fs::{File, OpenOptions},
    io::Write,
    path::Path,
};
use tracing::debug;

/// Written by `kubectl apply`; holds the whole object and says nothing about timing
pub const LAST_APPLIED_ANNOTATION: &str = "kubectl.kubernetes.io/last-applied-configuration";

/// Key carrying the container count of the trial
pub const NUM_CONTAINERS_KEY: &str = "numContainers";

/// Derive the timing record of a running workspace: its annotations without the
/// last-applied configuration, plus the container count
pub fn timing_record(workspace: &DevWorkspace, num_containers: usize) -> BTreeMap<String, String> {
    let mut record = workspace.metadata.annotations.clone().unwrap_or_default();
    record.remove(LAST_APPLIED_ANNOTATION);
    record.insert(NUM_CONTAINERS_KEY.to_string(), num_containers.to_string());
    record
}

/// Append-only log of timing records, one pretty-printed JSON object each
pub struct TimingLog<W: Write> {
    writer: W,
    records: usize,
}

impl TimingLog<File> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut options = OpenOptions::new();
        options.append(true).create(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o644);
        }
        let file = options.open(path.as_ref())?;
        debug!("Opened timing log {}", path.as_ref().display());
        Ok(Self::new(file))
    }
}

impl<W: Write> TimingLog<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, records: 0 }
    }

    pub fn record(&mut self, workspace: &DevWorkspace, num_containers: usize) -> Result<()> {
        let record = timing_record(workspace, num_containers);
        let json = serde_json::to_string_pretty(&record)?;
        writeln!(self.writer, "{}", json)?;
        self.writer.flush()?;
        self.records += 1;
        Ok(())
    }

    /// Records appended through this handle
    pub fn records(&self) -> usize {
        self.records
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.writer
    }
}
