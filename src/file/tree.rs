//! Folder tree assembly and subtree soft-delete/restore.
//!
//! The tree is never held in memory between operations. Each operation loads
//! the parent-id edges it needs and walks them.

use std::collections::{HashMap, HashSet, VecDeque};

use chrono::Utc;
use serde::Serialize;
use sqlx::{QueryBuilder, SqliteConnection};
use tracing::{debug, info};

use super::folder::{Folder, FolderRepository, NewFolder};
use crate::db::Database;
use crate::{LocalCloudError, Result};

/// Path label used for files that live outside any folder.
pub const ROOT_LABEL: &str = "Root";

/// A node in a user's folder forest.
#[derive(Debug, Clone, Serialize)]
pub struct FolderNode {
    /// Folder ID.
    pub id: i64,
    /// Folder name.
    pub name: String,
    /// Parent folder ID.
    pub parent_id: Option<i64>,
    /// Number of live files directly in this folder.
    pub file_count: i64,
    /// Child folder nodes, sorted by name.
    pub children: Vec<FolderNode>,
}

/// Outcome of a subtree soft-delete or restore.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubtreeChange {
    /// Folders whose delete state changed.
    pub folders: u64,
    /// Files whose delete state changed.
    pub files: u64,
}

/// Assemble folders into a forest of root nodes.
///
/// A folder whose parent is not among `folders` is an orphan and is left out
/// along with everything below it.
pub fn build_forest(folders: &[Folder], file_counts: &HashMap<i64, i64>) -> Vec<FolderNode> {
    let mut children: HashMap<i64, Vec<&Folder>> = HashMap::new();
    let mut roots = Vec::new();

    for folder in folders {
        match folder.parent_id {
            Some(parent_id) => children.entry(parent_id).or_default().push(folder),
            None => roots.push(folder),
        }
    }

    let mut nodes: Vec<FolderNode> = roots
        .into_iter()
        .map(|root| build_node(root, &children, file_counts))
        .collect();
    sort_nodes(&mut nodes);
    nodes
}

fn build_node(
    folder: &Folder,
    children: &HashMap<i64, Vec<&Folder>>,
    file_counts: &HashMap<i64, i64>,
) -> FolderNode {
    let mut child_nodes: Vec<FolderNode> = children
        .get(&folder.id)
        .map(|kids| {
            kids.iter()
                .map(|child| build_node(child, children, file_counts))
                .collect()
        })
        .unwrap_or_default();
    sort_nodes(&mut child_nodes);

    FolderNode {
        id: folder.id,
        name: folder.name.clone(),
        parent_id: folder.parent_id,
        file_count: file_counts.get(&folder.id).copied().unwrap_or(0),
        children: child_nodes,
    }
}

fn sort_nodes(nodes: &mut [FolderNode]) {
    nodes.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
}

/// The folder `root_id` plus every folder reachable below it.
///
/// Breadth-first over the given folders; the result starts with `root_id`.
pub fn descendant_closure(root_id: i64, folders: &[Folder]) -> Vec<i64> {
    let mut children: HashMap<i64, Vec<i64>> = HashMap::new();
    for folder in folders {
        if let Some(parent_id) = folder.parent_id {
            children.entry(parent_id).or_default().push(folder.id);
        }
    }

    let mut seen = HashSet::from([root_id]);
    let mut closure = vec![root_id];
    let mut queue = VecDeque::from([root_id]);

    while let Some(id) = queue.pop_front() {
        for &child in children.get(&id).into_iter().flatten() {
            if seen.insert(child) {
                closure.push(child);
                queue.push_back(child);
            }
        }
    }

    closure
}

/// Human-readable path of a folder, e.g. `Docs/Reports`.
///
/// `None` resolves to [`ROOT_LABEL`]. The walk stops at a missing parent or a
/// repeated id.
pub fn resolve_folder_path(folder_id: Option<i64>, folders: &HashMap<i64, Folder>) -> String {
    let mut names = Vec::new();
    let mut seen = HashSet::new();
    let mut current = folder_id;

    while let Some(id) = current {
        if !seen.insert(id) {
            break;
        }
        let Some(folder) = folders.get(&id) else {
            break;
        };
        names.push(folder.name.as_str());
        current = folder.parent_id;
    }

    if names.is_empty() {
        return ROOT_LABEL.to_string();
    }

    names.reverse();
    names.join("/")
}

/// First deleted folder in `closure` whose name would clash with a live
/// sibling, or with another folder restored alongside it.
pub fn restore_collision<'a>(closure: &[i64], folders: &'a [Folder]) -> Option<&'a Folder> {
    let mut taken: HashSet<(Option<i64>, &str)> = folders
        .iter()
        .filter(|f| !f.is_deleted)
        .map(|f| (f.parent_id, f.name.as_str()))
        .collect();
    let by_id: HashMap<i64, &Folder> = folders.iter().map(|f| (f.id, f)).collect();

    closure
        .iter()
        .filter_map(|id| by_id.get(id).copied())
        .filter(|f| f.is_deleted)
        .find(|f| !taken.insert((f.parent_id, f.name.as_str())))
}

/// Folder tree operations for a single user at a time.
#[derive(Clone)]
pub struct FolderTreeService {
    db: Database,
}

impl FolderTreeService {
    /// Create a new folder tree service.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Create a folder under `parent_id` (None = root).
    pub async fn create(&self, user_id: i64, name: &str, parent_id: Option<i64>) -> Result<Folder> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LocalCloudError::InvalidInput(
                "folder name is empty".to_string(),
            ));
        }

        let repo = FolderRepository::new(self.db.pool());

        if let Some(parent_id) = parent_id {
            if repo.get_active(user_id, parent_id).await?.is_none() {
                return Err(LocalCloudError::NotFound("parent folder".to_string()));
            }
        }

        if repo
            .find_active_sibling(user_id, parent_id, name)
            .await?
            .is_some()
        {
            return Err(LocalCloudError::DuplicateName(name.to_string()));
        }

        let folder = repo
            .create(&NewFolder::new(user_id, name).with_parent(parent_id))
            .await?;
        info!(user_id, folder_id = folder.id, "Folder created");
        Ok(folder)
    }

    /// The user's live folders as a forest, each node with its live file count.
    pub async fn tree(&self, user_id: i64) -> Result<Vec<FolderNode>> {
        let repo = FolderRepository::new(self.db.pool());
        let folders = repo.list_active(user_id).await?;
        let file_counts = repo.live_file_counts(user_id).await?;

        Ok(build_forest(&folders, &file_counts))
    }

    /// Soft-delete a live folder, its descendants, and every live file inside.
    pub async fn delete_subtree(&self, user_id: i64, folder_id: i64) -> Result<SubtreeChange> {
        let mut tx = self.db.begin().await?;

        let folders = load_folders(&mut tx, user_id, Some(false)).await?;
        if !folders.iter().any(|f| f.id == folder_id) {
            return Err(LocalCloudError::NotFound("folder".to_string()));
        }

        let closure = descendant_closure(folder_id, &folders);
        let now = Utc::now();

        let mut files: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new(
            "UPDATE files SET is_deleted = 1, deleted_at = ",
        );
        files.push_bind(now);
        files.push(", updated_at = ");
        files.push_bind(now);
        files.push(" WHERE user_id = ");
        files.push_bind(user_id);
        files.push(" AND is_deleted = 0 AND folder_id IN (");
        push_ids(&mut files, &closure);
        files.push(")");
        let file_result = files.build().execute(&mut *tx).await?;

        let mut dirs: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new(
            "UPDATE folders SET is_deleted = 1, deleted_at = ",
        );
        dirs.push_bind(now);
        dirs.push(", updated_at = ");
        dirs.push_bind(now);
        dirs.push(" WHERE user_id = ");
        dirs.push_bind(user_id);
        dirs.push(" AND is_deleted = 0 AND id IN (");
        push_ids(&mut dirs, &closure);
        dirs.push(")");
        let folder_result = dirs.build().execute(&mut *tx).await?;

        tx.commit().await?;

        let change = SubtreeChange {
            folders: folder_result.rows_affected(),
            files: file_result.rows_affected(),
        };
        info!(
            user_id,
            folder_id,
            folders = change.folders,
            files = change.files,
            "Folder subtree deleted"
        );
        Ok(change)
    }

    /// Restore a soft-deleted folder and everything soft-deleted below it.
    ///
    /// The closure is computed over all of the user's folders, so items that
    /// were deleted independently of this subtree come back too. Fails with
    /// `DuplicateName` if any restored folder would share a name with a live
    /// sibling.
    pub async fn restore_subtree(&self, user_id: i64, folder_id: i64) -> Result<SubtreeChange> {
        let mut tx = self.db.begin().await?;

        let folders = load_folders(&mut tx, user_id, None).await?;
        let Some(target) = folders
            .iter()
            .find(|f| f.id == folder_id && f.is_deleted)
        else {
            return Err(LocalCloudError::NotFound("folder".to_string()));
        };

        let closure = descendant_closure(target.id, &folders);
        if let Some(clash) = restore_collision(&closure, &folders) {
            return Err(LocalCloudError::DuplicateName(clash.name.clone()));
        }

        let now = Utc::now();

        let mut dirs: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new(
            "UPDATE folders SET is_deleted = 0, deleted_at = NULL, updated_at = ",
        );
        dirs.push_bind(now);
        dirs.push(" WHERE user_id = ");
        dirs.push_bind(user_id);
        dirs.push(" AND is_deleted = 1 AND id IN (");
        push_ids(&mut dirs, &closure);
        dirs.push(")");
        let folder_result = dirs.build().execute(&mut *tx).await?;

        let mut files: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new(
            "UPDATE files SET is_deleted = 0, deleted_at = NULL, updated_at = ",
        );
        files.push_bind(now);
        files.push(" WHERE user_id = ");
        files.push_bind(user_id);
        files.push(" AND is_deleted = 1 AND folder_id IN (");
        push_ids(&mut files, &closure);
        files.push(")");
        let file_result = files.build().execute(&mut *tx).await?;

        tx.commit().await?;

        let change = SubtreeChange {
            folders: folder_result.rows_affected(),
            files: file_result.rows_affected(),
        };
        info!(
            user_id,
            folder_id,
            folders = change.folders,
            files = change.files,
            "Folder subtree restored"
        );
        Ok(change)
    }

    /// Soft-deleted folders, most recently deleted first.
    pub async fn list_deleted(&self, user_id: i64) -> Result<Vec<Folder>> {
        FolderRepository::new(self.db.pool())
            .list_deleted(user_id)
            .await
    }
}

/// Load a user's folders inside a transaction. `deleted` filters by state.
async fn load_folders(
    conn: &mut SqliteConnection,
    user_id: i64,
    deleted: Option<bool>,
) -> Result<Vec<Folder>> {
    let mut query: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new(
        "SELECT id, user_id, parent_id, name, is_deleted, deleted_at, created_at, updated_at
         FROM folders WHERE user_id = ",
    );
    query.push_bind(user_id);
    if let Some(deleted) = deleted {
        query.push(" AND is_deleted = ");
        query.push_bind(deleted);
    }

    let folders = query
        .build_query_as::<Folder>()
        .fetch_all(conn)
        .await
        .map_err(|e| LocalCloudError::Database(e.to_string()))?;

    debug!(user_id, count = folders.len(), "Loaded folders");
    Ok(folders)
}

fn push_ids(query: &mut QueryBuilder<sqlx::Sqlite>, ids: &[i64]) {
    let mut separated = query.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{NewUser, UserRepository};

    fn folder(id: i64, parent_id: Option<i64>, name: &str) -> Folder {
        Folder {
            id,
            user_id: 1,
            parent_id,
            name: name.to_string(),
            is_deleted: false,
            deleted_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    async fn setup() -> (Database, FolderTreeService, i64) {
        let db = Database::open_in_memory().await.unwrap();
        let user = UserRepository::new(db.pool())
            .create(&NewUser::new("alice"))
            .await
            .unwrap();
        let service = FolderTreeService::new(db.clone());
        (db, service, user.id)
    }

    async fn insert_file(db: &Database, user_id: i64, folder_id: Option<i64>) -> i64 {
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO files (user_id, folder_id, filename, original_name, size, mime_type,
                                content, created_at, updated_at)
             VALUES (?, ?, 'a.txt', 'a.txt', 1, 'text/plain', x'61', ?, ?)",
        )
        .bind(user_id)
        .bind(folder_id)
        .bind(now)
        .bind(now)
        .execute(db.pool())
        .await
        .unwrap()
        .last_insert_rowid()
    }

    async fn file_deleted(db: &Database, file_id: i64) -> bool {
        let row: (bool,) = sqlx::query_as("SELECT is_deleted FROM files WHERE id = ?")
            .bind(file_id)
            .fetch_one(db.pool())
            .await
            .unwrap();
        row.0
    }

    #[test]
    fn test_build_forest_nests_and_sorts() {
        let folders = vec![
            folder(1, None, "Work"),
            folder(2, None, "Docs"),
            folder(3, Some(1), "Zeta"),
            folder(4, Some(1), "Alpha"),
            folder(5, Some(4), "Deep"),
        ];
        let counts = HashMap::from([(4, 2), (2, 1)]);

        let forest = build_forest(&folders, &counts);

        assert_eq!(forest.len(), 2);
        assert_eq!(forest[0].name, "Docs");
        assert_eq!(forest[0].file_count, 1);
        assert_eq!(forest[1].name, "Work");
        assert_eq!(forest[1].children[0].name, "Alpha");
        assert_eq!(forest[1].children[0].file_count, 2);
        assert_eq!(forest[1].children[0].children[0].name, "Deep");
        assert_eq!(forest[1].children[1].name, "Zeta");
        assert!(forest[1].children[1].children.is_empty());
    }

    #[test]
    fn test_build_forest_drops_orphans() {
        // Folder 3's parent (99) is not loaded, so 3 and its child 4 vanish.
        let folders = vec![
            folder(1, None, "Docs"),
            folder(3, Some(99), "Lost"),
            folder(4, Some(3), "Below"),
        ];

        let forest = build_forest(&folders, &HashMap::new());

        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].id, 1);
        assert!(forest[0].children.is_empty());
    }

    #[test]
    fn test_descendant_closure() {
        let folders = vec![
            folder(1, None, "A"),
            folder(2, Some(1), "B"),
            folder(3, Some(2), "C"),
            folder(4, Some(1), "D"),
            folder(5, None, "E"),
        ];

        let mut closure = descendant_closure(1, &folders);
        assert_eq!(closure[0], 1);
        closure.sort();
        assert_eq!(closure, vec![1, 2, 3, 4]);

        assert_eq!(descendant_closure(5, &folders), vec![5]);
    }

    #[test]
    fn test_descendant_closure_survives_cycle() {
        let folders = vec![folder(1, Some(2), "A"), folder(2, Some(1), "B")];

        let mut closure = descendant_closure(1, &folders);
        closure.sort();
        assert_eq!(closure, vec![1, 2]);
    }

    #[test]
    fn test_resolve_folder_path() {
        let folders: HashMap<i64, Folder> = [
            folder(1, None, "Docs"),
            folder(2, Some(1), "Reports"),
            folder(3, Some(42), "Stray"),
        ]
        .into_iter()
        .map(|f| (f.id, f))
        .collect();

        assert_eq!(resolve_folder_path(None, &folders), ROOT_LABEL);
        assert_eq!(resolve_folder_path(Some(1), &folders), "Docs");
        assert_eq!(resolve_folder_path(Some(2), &folders), "Docs/Reports");
        assert_eq!(resolve_folder_path(Some(3), &folders), "Stray");
        assert_eq!(resolve_folder_path(Some(77), &folders), ROOT_LABEL);
    }

    #[test]
    fn test_resolve_folder_path_stops_on_cycle() {
        let folders: HashMap<i64, Folder> = [folder(1, Some(2), "A"), folder(2, Some(1), "B")]
            .into_iter()
            .map(|f| (f.id, f))
            .collect();

        assert_eq!(resolve_folder_path(Some(1), &folders), "B/A");
    }

    #[tokio::test]
    async fn test_create_trims_and_rejects_empty() {
        let (_db, service, user_id) = setup().await;

        let folder = service.create(user_id, "  Docs  ", None).await.unwrap();
        assert_eq!(folder.name, "Docs");

        let result = service.create(user_id, "   ", None).await;
        assert!(matches!(result, Err(LocalCloudError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_create_duplicate_name() {
        let (_db, service, user_id) = setup().await;

        let docs = service.create(user_id, "Docs", None).await.unwrap();
        let result = service.create(user_id, "Docs", None).await;
        assert!(matches!(result, Err(LocalCloudError::DuplicateName(_))));

        // Same name under a different parent is fine.
        service.create(user_id, "Docs", Some(docs.id)).await.unwrap();
    }

    #[tokio::test]
    async fn test_create_name_reusable_after_delete() {
        let (_db, service, user_id) = setup().await;

        let docs = service.create(user_id, "Docs", None).await.unwrap();
        service.delete_subtree(user_id, docs.id).await.unwrap();

        service.create(user_id, "Docs", None).await.unwrap();
    }

    #[tokio::test]
    async fn test_create_requires_live_owned_parent() {
        let (db, service, user_id) = setup().await;
        let other = UserRepository::new(db.pool())
            .create(&NewUser::new("bob"))
            .await
            .unwrap();

        let theirs = service.create(other.id, "Private", None).await.unwrap();
        let result = service.create(user_id, "Sneaky", Some(theirs.id)).await;
        assert!(matches!(result, Err(LocalCloudError::NotFound(_))));

        let mine = service.create(user_id, "Gone", None).await.unwrap();
        service.delete_subtree(user_id, mine.id).await.unwrap();
        let result = service.create(user_id, "Child", Some(mine.id)).await;
        assert!(matches!(result, Err(LocalCloudError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_tree_counts_live_files() {
        let (db, service, user_id) = setup().await;

        let docs = service.create(user_id, "Docs", None).await.unwrap();
        let sub = service.create(user_id, "Sub", Some(docs.id)).await.unwrap();
        insert_file(&db, user_id, Some(docs.id)).await;
        insert_file(&db, user_id, Some(sub.id)).await;
        insert_file(&db, user_id, Some(sub.id)).await;
        insert_file(&db, user_id, None).await;

        let forest = service.tree(user_id).await.unwrap();

        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].file_count, 1);
        assert_eq!(forest[0].children[0].file_count, 2);
    }

    #[tokio::test]
    async fn test_delete_subtree_counts_and_isolation() {
        let (db, service, user_id) = setup().await;

        let docs = service.create(user_id, "Docs", None).await.unwrap();
        let a = service.create(user_id, "A", Some(docs.id)).await.unwrap();
        let b = service.create(user_id, "B", Some(a.id)).await.unwrap();
        let other = service.create(user_id, "Other", None).await.unwrap();

        let inside = [
            insert_file(&db, user_id, Some(docs.id)).await,
            insert_file(&db, user_id, Some(a.id)).await,
            insert_file(&db, user_id, Some(b.id)).await,
        ];
        let outside = [
            insert_file(&db, user_id, Some(other.id)).await,
            insert_file(&db, user_id, None).await,
        ];

        let change = service.delete_subtree(user_id, docs.id).await.unwrap();

        assert_eq!(change, SubtreeChange { folders: 3, files: 3 });
        for id in inside {
            assert!(file_deleted(&db, id).await);
        }
        for id in outside {
            assert!(!file_deleted(&db, id).await);
        }

        let deleted = service.list_deleted(user_id).await.unwrap();
        assert_eq!(deleted.len(), 3);
        assert!(deleted.iter().all(|f| f.deleted_at == deleted[0].deleted_at));
        assert_eq!(service.tree(user_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_subtree_not_found_cases() {
        let (db, service, user_id) = setup().await;
        let other = UserRepository::new(db.pool())
            .create(&NewUser::new("bob"))
            .await
            .unwrap();

        let result = service.delete_subtree(user_id, 999).await;
        assert!(matches!(result, Err(LocalCloudError::NotFound(_))));

        let theirs = service.create(other.id, "Theirs", None).await.unwrap();
        let result = service.delete_subtree(user_id, theirs.id).await;
        assert!(matches!(result, Err(LocalCloudError::NotFound(_))));

        let docs = service.create(user_id, "Docs", None).await.unwrap();
        service.delete_subtree(user_id, docs.id).await.unwrap();
        let result = service.delete_subtree(user_id, docs.id).await;
        assert!(matches!(result, Err(LocalCloudError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_restore_subtree() {
        let (db, service, user_id) = setup().await;

        let docs = service.create(user_id, "Docs", None).await.unwrap();
        let sub = service.create(user_id, "Sub", Some(docs.id)).await.unwrap();
        let f1 = insert_file(&db, user_id, Some(docs.id)).await;
        let f2 = insert_file(&db, user_id, Some(sub.id)).await;

        service.delete_subtree(user_id, docs.id).await.unwrap();
        let change = service.restore_subtree(user_id, docs.id).await.unwrap();

        assert_eq!(change, SubtreeChange { folders: 2, files: 2 });
        assert!(!file_deleted(&db, f1).await);
        assert!(!file_deleted(&db, f2).await);
        assert!(service.list_deleted(user_id).await.unwrap().is_empty());
        let forest = service.tree(user_id).await.unwrap();
        assert_eq!(forest[0].children[0].id, sub.id);
    }

    #[tokio::test]
    async fn test_restore_subtree_resurrects_independent_deletes() {
        let (_db, service, user_id) = setup().await;

        let docs = service.create(user_id, "Docs", None).await.unwrap();
        let sub = service.create(user_id, "Sub", Some(docs.id)).await.unwrap();

        // Sub goes first, then its parent.
        service.delete_subtree(user_id, sub.id).await.unwrap();
        service.delete_subtree(user_id, docs.id).await.unwrap();

        let change = service.restore_subtree(user_id, docs.id).await.unwrap();
        assert_eq!(change.folders, 2);
    }

    #[tokio::test]
    async fn test_restore_subtree_requires_deleted_folder() {
        let (_db, service, user_id) = setup().await;

        let docs = service.create(user_id, "Docs", None).await.unwrap();
        let result = service.restore_subtree(user_id, docs.id).await;
        assert!(matches!(result, Err(LocalCloudError::NotFound(_))));

        let result = service.restore_subtree(user_id, 999).await;
        assert!(matches!(result, Err(LocalCloudError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_restore_subtree_name_collision() {
        let (_db, service, user_id) = setup().await;

        let old = service.create(user_id, "Docs", None).await.unwrap();
        service.delete_subtree(user_id, old.id).await.unwrap();
        service.create(user_id, "Docs", None).await.unwrap();

        let result = service.restore_subtree(user_id, old.id).await;
        assert!(matches!(result, Err(LocalCloudError::DuplicateName(_))));
        assert_eq!(service.list_deleted(user_id).await.unwrap().len(), 1);
    }

    #[test]
    fn test_restore_collision_between_restored_siblings() {
        let mut old_x = folder(2, Some(1), "X");
        old_x.is_deleted = true;
        let mut other_x = folder(3, Some(1), "X");
        other_x.is_deleted = true;
        let mut parent = folder(1, None, "P");
        parent.is_deleted = true;
        let folders = vec![parent, old_x, other_x];

        let clash = restore_collision(&[1, 2, 3], &folders).unwrap();
        assert_eq!(clash.id, 3);
        assert!(restore_collision(&[1, 2], &folders).is_none());
    }

    #[tokio::test]
    async fn test_restore_subtree_nested_name_collision() {
        let (_db, service, user_id) = setup().await;

        let parent = service.create(user_id, "P", None).await.unwrap();
        let old_x = service.create(user_id, "X", Some(parent.id)).await.unwrap();
        service.delete_subtree(user_id, old_x.id).await.unwrap();
        service.create(user_id, "X", Some(parent.id)).await.unwrap();
        service.delete_subtree(user_id, parent.id).await.unwrap();

        let result = service.restore_subtree(user_id, parent.id).await;
        assert!(matches!(result, Err(LocalCloudError::DuplicateName(name)) if name == "X"));

        // Nothing came back.
        assert!(service.tree(user_id).await.unwrap().is_empty());
        assert_eq!(service.list_deleted(user_id).await.unwrap().len(), 3);
    }
}
