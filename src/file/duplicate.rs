//! Duplicate content detection.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::folder::Folder;
use super::metadata::FileMetadata;
use super::tree::resolve_folder_path;

/// One file in a duplicate group.
#[derive(Debug, Clone, Serialize)]
pub struct DuplicateMember {
    /// File ID.
    pub file_id: i64,
    /// Display name.
    pub filename: String,
    /// Size in bytes.
    pub size: i64,
    /// Resolved folder path.
    pub folder_path: String,
    /// Upload time.
    pub created_at: DateTime<Utc>,
}

/// Files sharing one digest.
#[derive(Debug, Clone, Serialize)]
pub struct DuplicateGroup {
    /// Shared digest.
    pub content_hash: String,
    /// Members, oldest first. The first one is the original.
    pub members: Vec<DuplicateMember>,
    /// Bytes held by every member except the original.
    pub wasted_bytes: i64,
}

impl DuplicateGroup {
    /// The earliest-created member.
    pub fn original(&self) -> &DuplicateMember {
        &self.members[0]
    }
}

/// Result of a duplicate scan.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DuplicateReport {
    /// Groups ordered by their original's creation time, then digest.
    pub groups: Vec<DuplicateGroup>,
    /// Sum of every group's wasted bytes.
    pub total_wasted_bytes: i64,
}

/// Group files by digest, keeping only groups with two or more members.
///
/// Files without a digest are ignored. `folders` should hold every folder of
/// the owner so paths resolve fully.
pub fn group_duplicates(files: Vec<FileMetadata>, folders: &HashMap<i64, Folder>) -> DuplicateReport {
    let mut by_hash: HashMap<String, Vec<FileMetadata>> = HashMap::new();
    for file in files {
        if let Some(hash) = file.content_hash.clone() {
            by_hash.entry(hash).or_default().push(file);
        }
    }

    let mut groups: Vec<DuplicateGroup> = by_hash
        .into_iter()
        .filter(|(_, members)| members.len() >= 2)
        .map(|(content_hash, mut members)| {
            members.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
            let wasted_bytes = members.iter().skip(1).map(|f| f.size).sum();
            let members = members
                .into_iter()
                .map(|f| DuplicateMember {
                    folder_path: resolve_folder_path(f.folder_id, folders),
                    file_id: f.id,
                    filename: f.filename,
                    size: f.size,
                    created_at: f.created_at,
                })
                .collect();

            DuplicateGroup {
                content_hash,
                members,
                wasted_bytes,
            }
        })
        .collect();

    groups.sort_by(|a, b| {
        a.original()
            .created_at
            .cmp(&b.original().created_at)
            .then_with(|| a.content_hash.cmp(&b.content_hash))
    });

    let total_wasted_bytes = groups.iter().map(|g| g.wasted_bytes).sum();
    DuplicateReport {
        groups,
        total_wasted_bytes,
    }
}
