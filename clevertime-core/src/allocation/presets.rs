//! Built-in pools of the cache calculator

use super::{AllocationConfig, AllocationPart};

/// Memory pool: metadata, page and index caches
pub fn memory_preset() -> AllocationConfig {
    AllocationConfig {
        id: "memory".into(),
        title: "Memory".into(),
        color: "#a78bfa".into(),
        initial_total_size: 128.0,
        min_size: 1.0,
        max_size: 392.0,
        step: 1.0,
        parts: vec![
            AllocationPart::new("meta", "Meta", 15.0, "#c4b5fd"),
            AllocationPart::new("page", "Page", 50.0, "#a78bfa"),
            AllocationPart::new("index", "Index", 25.0, "#8b5cf6"),
        ],
    }
}

/// Disk pool: data, logs and write-ahead log
pub fn disk_preset() -> AllocationConfig {
    AllocationConfig {
        id: "disk".into(),
        title: "Disk".into(),
        color: "#60a5fa".into(),
        initial_total_size: 1024.0,
        min_size: 8.0,
        max_size: 1024.0,
        step: 8.0,
        parts: vec![
            AllocationPart::new("data", "Data", 70.0, "#93c5fd"),
            AllocationPart::new("logs", "Logs", 10.0, "#60a5fa"),
            AllocationPart::new("wal", "WAL", 10.0, "#3b82f6"),
        ],
    }
}

/// All built-in pools in display order
pub fn presets() -> Vec<AllocationConfig> {
    vec![memory_preset(), disk_preset()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocation::{AllocationSet, UNUSED_PART_ID};

    #[test]
    fn test_presets_build() {
        for config in presets() {
            let set = AllocationSet::new(config).unwrap();
            let unused = set.part(UNUSED_PART_ID).unwrap();
            assert!((unused.percentage - 10.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_disk_preset_sizes() {
        let set = AllocationSet::new(disk_preset()).unwrap();
        assert_eq!(set.total_capacity, 1024.0);
        assert!((set.size_of("data").unwrap() - 716.8).abs() < 1e-9);
    }
}
