//! Advertised volume access modes
//!
//! The supported set is a versioned table keyed by identifier; adding a
//! mode is a new row, not new code.

use crate::domain::ports::AccessMode;
use tracing::info;

/// Version of the access-mode table
pub const ACCESS_MODES_VERSION: &str = "v1";

/// One row of the access-mode table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessModeEntry {
    pub id: &'static str,
    pub mode: AccessMode,
    /// Table version that introduced the mode
    pub since: &'static str,
}

/// Volumes can only be published once as read/write on a single node
pub const SUPPORTED_ACCESS_MODES: &[AccessModeEntry] = &[AccessModeEntry {
    id: "single-node-writer",
    mode: AccessMode::SingleNodeWriter,
    since: "v1",
}];

/// Access modes the driver advertises, in table order
pub fn volume_access_modes() -> Vec<AccessMode> {
    info!("Loading volume access modes, table {}", ACCESS_MODES_VERSION);
    SUPPORTED_ACCESS_MODES
        .iter()
        .map(|entry| {
            info!("enabling volume access mode: {}", entry.mode);
            entry.mode
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_node_writer_only() {
        assert_eq!(volume_access_modes(), vec![AccessMode::SingleNodeWriter]);
    }

    #[test]
    fn test_table_rows_are_not_newer_than_table() {
        for entry in SUPPORTED_ACCESS_MODES {
            assert!(entry.since <= ACCESS_MODES_VERSION, "{} too new", entry.id);
        }
    }
}
