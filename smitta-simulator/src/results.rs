//! Result vector recording.
//!
//! Every emitted signal value is kept as a `(time, value)` sample of the
//! vector identified by `(module path, signal name)`. At the end of the run
//! the vectors are written as a text `.vec` file (`TV` columns), the input
//! format of the post-run conversion tool.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use smitta_core::signal::{SignalEvent, SignalListener};
use smitta_core::time::SimTime;

#[derive(Debug, Default)]
struct VectorData {
    id: usize,
    samples: Vec<(SimTime, i64)>,
}

#[derive(Debug)]
pub struct VectorRecorder {
    path: PathBuf,
    run_id: String,
    attributes: Vec<(String, String)>,
    vectors: BTreeMap<(String, String), VectorData>,
}

impl VectorRecorder {
    pub fn new(path: impl Into<PathBuf>, run_id: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            run_id: run_id.into(),
            attributes: Vec::new(),
            vectors: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: &str, value: &str) -> Self {
        self.attributes.push((key.to_string(), value.to_string()));
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Samples recorded for `(module, signal)`.
    pub fn samples(&self, module: &str, signal: &str) -> Option<&[(SimTime, i64)]> {
        self.vectors
            .get(&(module.to_string(), signal.to_string()))
            .map(|data| data.samples.as_slice())
    }

    pub fn vector_count(&self) -> usize {
        self.vectors.len()
    }

    /// Writes the `.vec` file, creating parent directories.
    pub fn write(&self) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut out = BufWriter::new(File::create(&self.path)?);
        writeln!(out, "version 2")?;
        writeln!(out, "run {}", self.run_id)?;
        for (key, value) in &self.attributes {
            writeln!(out, "attr {} {}", key, value)?;
        }
        writeln!(out)?;

        let mut by_id: Vec<(&(String, String), &VectorData)> = self.vectors.iter().collect();
        by_id.sort_by_key(|(_, data)| data.id);

        for ((module, signal), data) in &by_id {
            writeln!(out, "vector {} {} {}:vector TV", data.id, module, signal)?;
        }
        for (_, data) in &by_id {
            for (time, value) in &data.samples {
                writeln!(out, "{}\t{}\t{}", data.id, time.as_secs_f64(), value)?;
            }
        }
        out.flush()
    }
}

impl SignalListener for VectorRecorder {
    fn receive(&mut self, event: &SignalEvent<'_>) {
        let next_id = self.vectors.len();
        let data = self
            .vectors
            .entry((event.source_path.to_string(), event.name.to_string()))
            .or_insert_with(|| VectorData {
                id: next_id,
                samples: Vec::new(),
            });
        data.samples.push((event.time, event.value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smitta_core::entity::ModuleId;
    use smitta_core::signal::{SignalRegistry, INFECTION_EVENT_TIME, PACKET_SENT};

    #[test]
    fn records_and_writes_vectors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("General").join("-repit-0.vec");
        let mut recorder =
            VectorRecorder::new(&path, "General-0").with_attribute("configname", "General");

        let mut signals = SignalRegistry::new();
        let infection = signals.register(INFECTION_EVENT_TIME);
        let sent = signals.register(PACKET_SENT);
        for (time, signal, name, module, value) in [
            (5_000, infection, INFECTION_EVENT_TIME, "X.trafficController", 3),
            (5_001, sent, PACKET_SENT, "X.cbrUe[3].app[0]", 4096),
            (6_000, infection, INFECTION_EVENT_TIME, "X.trafficController", 1),
        ] {
            recorder.receive(&SignalEvent {
                time: SimTime::from_millis(time),
                source: ModuleId(0),
                source_path: module,
                signal,
                name,
                value,
            });
        }

        assert_eq!(recorder.vector_count(), 2);
        assert_eq!(
            recorder.samples("X.trafficController", INFECTION_EVENT_TIME),
            Some(&[(SimTime::from_millis(5_000), 3), (SimTime::from_millis(6_000), 1)][..])
        );

        recorder.write().unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("version 2\nrun General-0\nattr configname General\n"));
        assert!(text.contains("vector 0 X.trafficController infectionEventTime:vector TV"));
        assert!(text.contains("vector 1 X.cbrUe[3].app[0] packetSent:vector TV"));
        assert!(text.contains("0\t5\t3"));
        assert!(text.contains("1\t5.001\t4096"));
    }
}
