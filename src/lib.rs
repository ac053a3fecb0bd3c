//! LocalCloud - personal file storage
//!
//! Single-node file manager on an embedded SQLite database: uploads with
//! version history, soft delete and restore, folder trees, per-user quotas,
//! duplicate detection, and optional enrichment from an external analysis
//! service.

pub mod analysis;
pub mod config;
pub mod db;
pub mod error;
pub mod file;
pub mod logging;

pub use analysis::{AnalysisCollaborator, AnalysisOutcome, Enricher, HttpAnalysisClient};
pub use config::Config;
pub use db::{Database, NewUser, User, UserRepository, UserUpdate};
pub use error::{LocalCloudError, Result};
pub use file::{
    DuplicateReport, FileMetadata, FileService, FileVersion, Folder, FolderNode,
    FolderTreeService, StorageLimit, StorageStats, Upload,
};
