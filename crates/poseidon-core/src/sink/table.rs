use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::DeviceNotification;

use super::{RowSink, SinkError};

const PARTITION_FILE_EXTENSION: &str = "jsonl";

/// Local table store laid out as `<root>/<table>/<partition_key>.jsonl`.
///
/// The composite key `(partition_key, row_key)` is unique within one sink;
/// a repeated key is rejected before anything is written. Keys are tracked
/// for the lifetime of the sink only, so rows already on disk from earlier
/// runs are not checked. Partition files stay open in append mode until the
/// sink is dropped.
#[derive(Debug)]
pub struct PartitionedTableSink {
    table_dir: PathBuf,
    partitions: HashMap<String, File>,
    keys: HashSet<(String, String)>,
    rows_written: u64,
}

impl PartitionedTableSink {
    /// Create the table directory under `root` if needed.
    pub fn create(root: &Path, table_name: &str) -> Result<Self, SinkError> {
        let table_dir = root.join(table_name);
        fs::create_dir_all(&table_dir)?;
        Ok(Self {
            table_dir,
            partitions: HashMap::new(),
            keys: HashSet::new(),
            rows_written: 0,
        })
    }

    pub fn table_dir(&self) -> &Path {
        &self.table_dir
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// File holding the rows of one partition.
    pub fn partition_path(&self, partition_key: &str) -> PathBuf {
        self.table_dir
            .join(partition_key)
            .with_extension(PARTITION_FILE_EXTENSION)
    }

    /// Number of partition files currently held open.
    pub fn open_partitions(&self) -> usize {
        self.partitions.len()
    }

    fn partition_file(&mut self, partition_key: &str) -> Result<&mut File, SinkError> {
        let path = self.partition_path(partition_key);
        match self.partitions.entry(partition_key.to_string()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let file = OpenOptions::new().create(true).append(true).open(path)?;
                Ok(entry.insert(file))
            }
        }
    }
}

impl RowSink for PartitionedTableSink {
    fn write_row(&mut self, row: DeviceNotification) -> Result<(), SinkError> {
        let key = (row.partition_key.clone(), row.row_key.clone());
        if self.keys.contains(&key) {
            return Err(SinkError::DuplicateKey {
                partition_key: key.0,
                row_key: key.1,
            });
        }

        let mut line = serde_json::to_vec(&row)?;
        line.push(b'\n');
        self.partition_file(&row.partition_key)?.write_all(&line)?;

        self.keys.insert(key);
        self.rows_written += 1;
        Ok(())
    }
}
