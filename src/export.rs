//! Writing generated batches to disk.
//!
//! A batch is stored as one `.npy` file per trace, named `<basename>_<index>` with an 8-digit
//! zero-padded index, and one `<basename>_ciphertexts.json` database listing every trace name
//! with its ciphertext, in generation order.

use std::{
    fs::{self, File},
    path::{Path, PathBuf},
};

use ndarray_npy::write_npy;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{
    Error, bits::Ciphertext, config::GeneratorConfig, processors::MeanVar, trace::TraceRecord,
};

/// Consumer of the records of a batch, called in record order.
pub trait TraceSink {
    fn write(&mut self, index: usize, record: &TraceRecord) -> Result<(), Error>;

    /// Called once after the last record.
    fn finish(&mut self) -> Result<(), Error> {
        Ok(())
    }
}

impl<S: TraceSink + ?Sized> TraceSink for &mut S {
    fn write(&mut self, index: usize, record: &TraceRecord) -> Result<(), Error> {
        (**self).write(index, record)
    }

    fn finish(&mut self) -> Result<(), Error> {
        (**self).finish()
    }
}

/// Feeds both sinks, the first one first.
impl<A: TraceSink, B: TraceSink> TraceSink for (A, B) {
    fn write(&mut self, index: usize, record: &TraceRecord) -> Result<(), Error> {
        self.0.write(index, record)?;
        self.1.write(index, record)
    }

    fn finish(&mut self) -> Result<(), Error> {
        self.0.finish()?;
        self.1.finish()
    }
}

/// Accumulates the sample-wise mean and variance of the batch.
impl TraceSink for MeanVar {
    fn write(&mut self, _index: usize, record: &TraceRecord) -> Result<(), Error> {
        self.process(record.leakage.view());
        Ok(())
    }
}

/// Keeps every record in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub records: Vec<TraceRecord>,
}

impl TraceSink for MemorySink {
    fn write(&mut self, index: usize, record: &TraceRecord) -> Result<(), Error> {
        debug_assert_eq!(index, self.records.len());

        self.records.push(record.clone());
        Ok(())
    }
}

/// Returns the name of the artifact holding trace `index`.
pub fn artifact_name(basename: &str, index: usize) -> String {
    format!("{basename}_{index:08}")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseEntry {
    /// Artifact name, without extension
    pub trace: String,
    #[serde(with = "ciphertext_hex")]
    pub ciphertext: Ciphertext,
}

/// Ordered list of the traces of a batch with their ciphertexts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TraceDatabase {
    entries: Vec<DatabaseEntry>,
}

impl TraceDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, trace: String, ciphertext: Ciphertext) {
        self.entries.push(DatabaseEntry { trace, ciphertext });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[DatabaseEntry] {
        &self.entries
    }

    /// Returns the ciphertext stored for the given artifact name.
    pub fn ciphertext(&self, trace: &str) -> Option<Ciphertext> {
        self.entries
            .iter()
            .find(|entry| entry.trace == trace)
            .map(|entry| entry.ciphertext)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let file = File::create(path)?;
        serde_json::to_writer(file, self)?;

        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let file = File::open(path)?;
        let database: TraceDatabase = serde_json::from_reader(file)?;

        Ok(database)
    }
}

/// Writes each record to its own `.npy` file and the ciphertext database at the end.
///
/// Files written before an error are left in place.
#[derive(Debug)]
pub struct NpyExporter {
    directory: PathBuf,
    basename: String,
    database: TraceDatabase,
}

impl NpyExporter {
    /// Creates the exporter, creating `directory` if needed.
    pub fn create<P: AsRef<Path>>(directory: P, basename: &str) -> Result<Self, Error> {
        let directory = directory.as_ref().to_path_buf();
        fs::create_dir_all(&directory)?;

        Ok(Self {
            directory,
            basename: basename.to_string(),
            database: TraceDatabase::new(),
        })
    }

    pub fn trace_path(&self, index: usize) -> PathBuf {
        self.directory
            .join(format!("{}.npy", artifact_name(&self.basename, index)))
    }

    pub fn database_path(&self) -> PathBuf {
        self.directory
            .join(format!("{}_ciphertexts.json", self.basename))
    }

    pub fn config_path(&self) -> PathBuf {
        self.directory
            .join(format!("{}_config.json", self.basename))
    }

    /// Saves the parameters of the batch next to its artifacts.
    pub fn save_config(&self, config: &GeneratorConfig) -> Result<(), Error> {
        config.save(self.config_path())
    }

    pub fn database(&self) -> &TraceDatabase {
        &self.database
    }
}

impl TraceSink for NpyExporter {
    fn write(&mut self, index: usize, record: &TraceRecord) -> Result<(), Error> {
        debug_assert_eq!(index, self.database.len());

        let path = self.trace_path(index);
        write_npy(&path, &record.leakage)?;
        trace!(path = %path.display(), "trace written");

        self.database
            .push(artifact_name(&self.basename, index), record.value);
        Ok(())
    }

    fn finish(&mut self) -> Result<(), Error> {
        self.database.save(self.database_path())
    }
}

mod ciphertext_hex {
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::bits::Ciphertext;

    pub fn serialize<S: Serializer>(ciphertext: &Ciphertext, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&ciphertext.to_hex())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Ciphertext, D::Error> {
        let s = String::deserialize(d)?;
        Ciphertext::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::{NpyExporter, TraceDatabase, TraceSink, artifact_name};
    use crate::{bits::Ciphertext, trace::Trace, util::load_trace};
    use ndarray::array;

    #[test]
    fn test_artifact_name() {
        assert_eq!(artifact_name("traces", 0), "traces_00000000");
        assert_eq!(artifact_name("run", 1234), "run_00001234");
    }

    #[test]
    fn test_database_json() {
        let mut database = TraceDatabase::new();
        database.push("a_00000000".to_string(), Ciphertext::from_u64(0xff));
        let json = serde_json::to_string(&database).unwrap();
        assert_eq!(
            json,
            r#"[{"trace":"a_00000000","ciphertext":"00000000000000ff"}]"#
        );
        let restored: TraceDatabase = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, database);
        assert_eq!(
            restored.ciphertext("a_00000000"),
            Some(Ciphertext::from_u64(0xff))
        );
        assert_eq!(restored.ciphertext("a_00000001"), None);
    }

    #[test]
    fn test_npy_exporter() {
        let directory =
            std::env::temp_dir().join(format!("tracegen_export_{}", std::process::id()));
        let mut exporter = NpyExporter::create(&directory, "unit").unwrap();

        let records = [
            Trace::new(array![0.0f32, 1.0, -1.0], Ciphertext::from_u64(1)),
            Trace::new(array![0.5f32, 0.25, 0.125], Ciphertext::from_u64(2)),
        ];
        for (i, record) in records.iter().enumerate() {
            exporter.write(i, record).unwrap();
        }
        exporter.finish().unwrap();

        let database = TraceDatabase::load(exporter.database_path()).unwrap();
        assert_eq!(database.len(), 2);
        for (i, (entry, record)) in database.entries().iter().zip(records.iter()).enumerate() {
            assert_eq!(entry.trace, artifact_name("unit", i));
            assert_eq!(entry.ciphertext, record.value);
            assert_eq!(load_trace(exporter.trace_path(i)).unwrap(), record.leakage);
        }

        std::fs::remove_dir_all(directory).unwrap();
    }
}
