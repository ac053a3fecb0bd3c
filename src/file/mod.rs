//! File management module for LocalCloud.
//!
//! This module provides:
//! - Content fingerprinting
//! - Folder records and the folder tree (forest, subtree delete/restore)
//! - File and version records with the payload stored inline
//! - Per-user quota accounting
//! - Duplicate detection
//! - The file lifecycle service tying these together

mod duplicate;
mod folder;
pub mod hasher;
mod metadata;
mod quota;
mod service;
mod tree;
mod version;

pub use duplicate::{group_duplicates, DuplicateGroup, DuplicateMember, DuplicateReport};
pub use folder::{Folder, FolderRepository, NewFolder};
pub use metadata::{FileMetadata, FileRepository, NewFile};
pub use quota::{QuotaLedger, StorageLimit, StorageUsage};
pub use service::{
    resolve_mime_type, sanitize_filename, FileService, SimilarFile, StorageStats, Upload,
};
pub use tree::{
    build_forest, descendant_closure, resolve_folder_path, restore_collision, FolderNode,
    FolderTreeService, SubtreeChange, ROOT_LABEL,
};
pub use version::{FileVersion, VersionRepository};
