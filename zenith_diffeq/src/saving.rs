//! Result storage for integrations.
//!
//! Accepted steps are recorded either in memory or streamed to a CSV file;
//! dense sampling on a uniform grid goes through `DenseSolution` instead.

use std::{
    fs::File,
    io::BufWriter,
    path::{Path, PathBuf},
};

use csv::Writer;

use crate::{error::OdeError, state::OdeState};

/// Where integration output goes.
///
/// `None` disables solver-side saving; the model is then responsible for
/// any output it wants.
#[derive(Clone, Debug)]
pub enum SaveMethod {
    Memory,
    File(PathBuf),
    None,
}

/// Runtime storage selected from a `SaveMethod`.
#[derive(Debug)]
pub enum ResultStorage<State>
where
    State: OdeState,
{
    Memory(MemoryResult<State>),
    File(StateWriter),
    None,
}

impl<State: OdeState> ResultStorage<State> {
    pub(crate) fn for_method(
        method: &SaveMethod,
        capacity: usize,
        y0: &State,
    ) -> Result<Self, OdeError> {
        match method {
            SaveMethod::Memory => Ok(Self::Memory(MemoryResult::new(capacity))),
            SaveMethod::File(path) => Ok(Self::File(StateWriter::create(path, y0.headers())?)),
            SaveMethod::None => Ok(Self::None),
        }
    }

    /// Record a `(t, state)` pair. No-op when storage is disabled.
    pub fn save(&mut self, t: f64, y: &State) -> Result<(), OdeError> {
        match self {
            Self::Memory(result) => {
                result.insert(t, y);
                Ok(())
            }
            Self::File(writer) => y.write_record(t, writer),
            Self::None => Ok(()),
        }
    }

    /// Release spare memory or flush buffered file output.
    pub fn finish(&mut self) -> Result<(), OdeError> {
        match self {
            Self::Memory(result) => {
                result.shrink();
                Ok(())
            }
            Self::File(writer) => writer.flush(),
            Self::None => Ok(()),
        }
    }

    pub fn into_memory(self) -> Option<MemoryResult<State>> {
        match self {
            Self::Memory(result) => Some(result),
            _ => None,
        }
    }
}

/// In-memory `(t, y)` history of one integration.
#[derive(Clone, Debug)]
pub struct MemoryResult<State>
where
    State: OdeState,
{
    pub t: Vec<f64>,
    pub y: Vec<State>,
}

impl<State: OdeState> MemoryResult<State> {
    pub fn new(capacity: usize) -> Self {
        Self {
            t: Vec::with_capacity(capacity),
            y: Vec::with_capacity(capacity),
        }
    }

    fn insert(&mut self, t: f64, y: &State) {
        self.t.push(t);
        self.y.push(y.clone());
    }

    pub fn len(&self) -> usize {
        self.t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }

    /// Last recorded `(t, y)` pair.
    pub fn last(&self) -> Option<(f64, &State)> {
        let t = *self.t.last()?;
        let y = self.y.last()?;
        Some((t, y))
    }

    fn shrink(&mut self) {
        self.t.shrink_to_fit();
        self.y.shrink_to_fit();
    }
}

/// Buffered CSV writer for state records.
#[derive(Debug)]
pub struct StateWriter {
    writer: Writer<BufWriter<File>>,
    buffer: Vec<String>,
}

impl StateWriter {
    pub fn create(path: &Path, headers: Vec<String>) -> Result<Self, OdeError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = File::create(path)?;
        let mut writer = Writer::from_writer(BufWriter::new(file));
        if !headers.is_empty() {
            writer.write_record(&headers)?;
        }
        Ok(Self { writer, buffer: Vec::new() })
    }

    /// Write the time and the state components as one row.
    pub fn write_row(&mut self, t: f64, components: &[f64]) -> Result<(), OdeError> {
        self.buffer.clear();
        self.buffer.push(t.to_string());
        for &x in components {
            self.buffer.push(x.to_string());
        }
        self.writer.write_record(&self.buffer)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), OdeError> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::StateArray;

    #[test]
    fn memory_result_records_in_order() {
        let mut storage: ResultStorage<StateArray<1>> =
            ResultStorage::Memory(MemoryResult::new(4));
        for i in 0..6 {
            storage.save(i as f64, &StateArray::new([2.0 * i as f64])).unwrap();
        }
        storage.finish().unwrap();

        let result = storage.into_memory().unwrap();
        assert_eq!(result.len(), 6);
        assert_eq!(result.t[3], 3.0);
        assert_eq!(result.y[3][0], 6.0);
        let (t, y) = result.last().unwrap();
        assert_eq!(t, 5.0);
        assert_eq!(y[0], 10.0);
    }

    #[test]
    fn disabled_storage_ignores_saves() {
        let mut storage: ResultStorage<StateArray<1>> = ResultStorage::None;
        storage.save(0.0, &StateArray::default()).unwrap();
        storage.finish().unwrap();
        assert!(storage.into_memory().is_none());
    }

    #[test]
    fn csv_writer_round_trips_records() {
        let dir = std::env::temp_dir().join("zenith_diffeq_saving_test");
        let path = dir.join("decay.csv");
        let state = StateArray::new([1.0, -2.5]);

        let mut writer = StateWriter::create(&path, state.headers()).unwrap();
        state.write_record(0.5, &mut writer).unwrap();
        writer.flush().unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let mut lines = contents.lines();
        assert_eq!(lines.next(), Some("t,x0,x1"));
        assert_eq!(lines.next(), Some("0.5,1,-2.5"));
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
