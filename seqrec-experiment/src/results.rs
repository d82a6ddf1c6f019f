use crate::io::ResultsSink;
use crate::session::SessionResult;
use seqrec_core::{Error, Result};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Appends one JSON line per session to `<dir>/<participant>.jsonl`.
///
/// The record is serialized completely before the file is opened, and
/// written with a single append so an interrupted write cannot interleave
/// with an earlier session's line.
#[derive(Debug, Clone)]
pub struct JsonResultsSink {
    dir: PathBuf,
}

impl JsonResultsSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, participant_id: &str) -> Result<PathBuf> {
        let valid = !participant_id.is_empty()
            && !participant_id.contains(['/', '\\'])
            && participant_id != "."
            && participant_id != "..";
        if !valid {
            return Err(Error::Results(format!(
                "participant id '{participant_id}' cannot be used as a file name"
            )));
        }
        Ok(self.dir.join(format!("{participant_id}.jsonl")))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ResultsSink for JsonResultsSink {
    fn append_session(&mut self, participant_id: &str, result: &SessionResult) -> Result<()> {
        let path = self.path_for(participant_id)?;
        let mut line = serde_json::to_string(result).map_err(|e| Error::Results(e.to_string()))?;
        line.push('\n');

        std::fs::create_dir_all(&self.dir)?;
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        file.write_all(line.as_bytes())?;
        file.sync_all()?;

        info!("results appended to {}", path.display());
        Ok(())
    }
}
