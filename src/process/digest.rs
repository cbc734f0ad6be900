//! Columnar snapshot of the process registry.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Column names, in row field order.
pub const PROCESS_COLUMNS: [&str; 16] = [
    "pid",
    "name",
    "cpu",
    "memory",
    "cpuAffinity",
    "cpuContextSwitches",
    "threadCount",
    "loopCount",
    "control",
    "tmuxSession",
    "loopStat",
    "statusCode",
    "message",
    "description",
    "creationTime",
    "status",
];

/// One digest row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessRow {
    pub pid: i32,
    pub name: String,
    pub cpu: f32,
    pub memory: u64,
    pub cpu_affinity: Vec<usize>,
    pub cpu_context_switches: u64,
    pub thread_count: u64,
    pub loop_count: u64,
    pub control: i32,
    pub tmux_session: String,
    pub loop_stat: i32,
    pub status_code: i32,
    pub message: String,
    pub description: String,
    pub creation_time: u64,
    pub status: String,
}

/// Snapshot of every tracked process.
///
/// `index` is sorted ascending and lists exactly the keys of `data`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessDigest {
    pub index: Vec<PathBuf>,
    pub columns: Vec<String>,
    pub data: BTreeMap<PathBuf, ProcessRow>,
}

impl ProcessDigest {
    /// Build from rows in index order; paths without a row are dropped.
    pub fn from_rows(rows: impl IntoIterator<Item = (PathBuf, ProcessRow)>) -> Self {
        let mut index = Vec::new();
        let mut data = BTreeMap::new();
        for (path, row) in rows {
            index.push(path.clone());
            data.insert(path, row);
        }
        index.sort();
        index.dedup();

        Self {
            index,
            columns: PROCESS_COLUMNS.iter().map(|c| c.to_string()).collect(),
            data,
        }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn row(&self, path: &std::path::Path) -> Option<&ProcessRow> {
        self.data.get(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pid: i32) -> ProcessRow {
        ProcessRow {
            pid,
            name: format!("p{pid}"),
            cpu: 0.0,
            memory: 0,
            cpu_affinity: vec![0],
            cpu_context_switches: 0,
            thread_count: 1,
            loop_count: 0,
            control: 0,
            tmux_session: String::new(),
            loop_stat: 0,
            status_code: 0,
            message: String::new(),
            description: String::new(),
            creation_time: 0,
            status: "sleeping".to_string(),
        }
    }

    #[test]
    fn test_row_keys_match_columns() {
        let value = serde_json::to_value(row(1)).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), PROCESS_COLUMNS.len());
        for column in PROCESS_COLUMNS {
            assert!(object.contains_key(column), "missing {column}");
        }
    }

    #[test]
    fn test_index_sorted_and_matches_data() {
        let digest = ProcessDigest::from_rows(vec![
            (PathBuf::from("/p/proc.2.shm"), row(2)),
            (PathBuf::from("/p/proc.1.shm"), row(1)),
        ]);
        assert_eq!(
            digest.index,
            vec![PathBuf::from("/p/proc.1.shm"), PathBuf::from("/p/proc.2.shm")]
        );
        assert!(digest.index.iter().all(|p| digest.data.contains_key(p)));
        assert_eq!(digest.columns.len(), 16);
    }
}
