//! SQLite-backed nested-set store
//!
//! One `tree` table, indexed on `depth`, `left` and `right` so that subtree
//! and ancestor lookups are range scans. `left`/`right` are SQL keywords and
//! are always quoted.

use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, trace};

use crate::domain::Node;
use crate::infrastructure::traits::{NestedSetStore, Side};
use crate::infrastructure::{StoreError, StoreResult};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS tree (
    name TEXT PRIMARY KEY,
    parent TEXT REFERENCES tree(name),
    depth INTEGER NOT NULL,
    "left" INTEGER NOT NULL,
    "right" INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS tree_depth ON tree(depth);
CREATE INDEX IF NOT EXISTS tree_left ON tree("left");
CREATE INDEX IF NOT EXISTS tree_right ON tree("right");
"#;

const SELECT_COLUMNS: &str = r#"SELECT name, parent, depth, "left", "right" FROM tree"#;

#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
    path: Option<PathBuf>,
    in_transaction: bool,
}

impl SqliteStore {
    /// Open (or create) a database file; parent directories are created.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .map_err(|e| StoreError::io(format!("create {}", dir.display()), e))?;
        }
        let conn = Connection::open(&path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        debug!("opened {} (journal_mode={})", path.display(), mode);
        Self::init(conn, Some(path))
    }

    /// Private database that lives as long as the store.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?, None)
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> StoreResult<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn,
            path,
            in_transaction: false,
        })
    }

    /// Database file, `None` for in-memory databases.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn query_nodes(&self, sql: &str, params: impl rusqlite::Params) -> StoreResult<Vec<Node>> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let nodes = stmt
            .query_map(params, node_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(nodes)
    }
}

fn node_from_row(row: &Row<'_>) -> rusqlite::Result<Node> {
    Ok(Node {
        name: row.get(0)?,
        parent: row.get(1)?,
        depth: row.get(2)?,
        left: row.get(3)?,
        right: row.get(4)?,
    })
}

impl NestedSetStore for SqliteStore {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    fn get(&self, name: &str) -> StoreResult<Option<Node>> {
        let mut stmt = self
            .conn
            .prepare_cached(&format!("{SELECT_COLUMNS} WHERE name = ?1"))?;
        Ok(stmt.query_row(params![name], node_from_row).optional()?)
    }

    fn all(&self) -> StoreResult<Vec<Node>> {
        self.query_nodes(&format!(r#"{SELECT_COLUMNS} ORDER BY "left""#), [])
    }

    fn count(&self) -> StoreResult<usize> {
        let count: i64 = self
            .conn
            .prepare_cached("SELECT COUNT(*) FROM tree")?
            .query_row([], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn descendants(&self, node: &Node, max_depth: Option<u32>) -> StoreResult<Vec<Node>> {
        let depth_limit = max_depth.map_or(i64::MAX, |d| node.depth + i64::from(d));
        self.query_nodes(
            &format!(
                r#"{SELECT_COLUMNS} WHERE "left" > ?1 AND "right" < ?2 AND depth <= ?3 ORDER BY "left""#
            ),
            params![node.left, node.right, depth_limit],
        )
    }

    fn ancestors(&self, node: &Node) -> StoreResult<Vec<Node>> {
        self.query_nodes(
            &format!(r#"{SELECT_COLUMNS} WHERE "left" < ?1 AND "right" > ?2 ORDER BY "left""#),
            params![node.left, node.right],
        )
    }

    fn insert(&mut self, node: &Node) -> StoreResult<()> {
        self.conn
            .prepare_cached(
                r#"INSERT INTO tree (name, parent, depth, "left", "right") VALUES (?1, ?2, ?3, ?4, ?5)"#,
            )?
            .execute(params![
                node.name,
                node.parent,
                node.depth,
                node.left,
                node.right
            ])?;
        Ok(())
    }

    fn delete_range(&mut self, left: i64, right: i64) -> StoreResult<usize> {
        let removed = self
            .conn
            .prepare_cached(r#"DELETE FROM tree WHERE "left" >= ?1 AND "right" <= ?2"#)?
            .execute(params![left, right])?;
        Ok(removed)
    }

    fn shift_bounds(
        &mut self,
        side: Side,
        range: RangeInclusive<i64>,
        delta: i64,
    ) -> StoreResult<usize> {
        let sql = match side {
            Side::Left => r#"UPDATE tree SET "left" = "left" + ?3 WHERE "left" BETWEEN ?1 AND ?2"#,
            Side::Right => {
                r#"UPDATE tree SET "right" = "right" + ?3 WHERE "right" BETWEEN ?1 AND ?2"#
            }
        };
        let touched = self
            .conn
            .prepare_cached(sql)?
            .execute(params![range.start(), range.end(), delta])?;
        trace!("shift {:?} {:?} by {}: {} rows", side, range, delta, touched);
        Ok(touched)
    }

    fn set_parent_and_depth(
        &mut self,
        name: &str,
        parent: Option<&str>,
        depth: i64,
    ) -> StoreResult<()> {
        let updated = self
            .conn
            .prepare_cached("UPDATE tree SET parent = ?2, depth = ?3 WHERE name = ?1")?
            .execute(params![name, parent, depth])?;
        if updated == 0 {
            return Err(StoreError::MissingNode(name.to_string()));
        }
        Ok(())
    }

    fn hide_range(&mut self, left: i64, right: i64) -> StoreResult<usize> {
        let hidden = self
            .conn
            .prepare_cached(
                r#"UPDATE tree SET "left" = -"left", "right" = -"right" WHERE "left" >= ?1 AND "right" <= ?2"#,
            )?
            .execute(params![left, right])?;
        Ok(hidden)
    }

    fn reveal_hidden(&mut self, shift: i64, delta_depth: i64) -> StoreResult<usize> {
        let revealed = self
            .conn
            .prepare_cached(
                r#"UPDATE tree SET "left" = ?1 - "left", "right" = ?1 - "right", depth = depth + ?2 WHERE "left" < 0"#,
            )?
            .execute(params![shift, delta_depth])?;
        Ok(revealed)
    }

    fn begin(&mut self) -> StoreResult<()> {
        if self.in_transaction {
            return Err(StoreError::TransactionOpen);
        }
        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        self.in_transaction = true;
        Ok(())
    }

    fn commit(&mut self) -> StoreResult<()> {
        if !self.in_transaction {
            return Err(StoreError::NoTransaction);
        }
        self.conn.execute_batch("COMMIT")?;
        self.in_transaction = false;
        Ok(())
    }

    fn rollback(&mut self) -> StoreResult<()> {
        if !self.in_transaction {
            return Err(StoreError::NoTransaction);
        }
        self.in_transaction = false;
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(name: &str, parent: &str, left: i64, depth: i64) -> Node {
        Node {
            name: name.into(),
            parent: Some(parent.into()),
            left,
            right: left + 1,
            depth,
        }
    }

    fn seeded() -> SqliteStore {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store
            .insert(&Node {
                right: 6,
                ..Node::root("root")
            })
            .unwrap();
        store.insert(&leaf("a", "root", 2, 1)).unwrap();
        store.insert(&leaf("b", "root", 4, 1)).unwrap();
        store
    }

    #[test]
    fn given_fresh_database_when_opened_then_schema_is_empty() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert_eq!(store.count().unwrap(), 0);
        assert!(store.path().is_none());
        assert_eq!(store.get("root").unwrap(), None);
    }

    #[test]
    fn given_rows_when_querying_ranges_then_uses_strict_bounds() {
        let store = seeded();
        let root = store.get("root").unwrap().unwrap();
        let a = store.get("a").unwrap().unwrap();

        let names: Vec<_> = store
            .descendants(&root, None)
            .unwrap()
            .into_iter()
            .map(|n| n.name)
            .collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(store.ancestors(&a).unwrap(), vec![root]);
    }

    #[test]
    fn given_shift_when_applied_then_only_matching_side_changes() {
        let mut store = seeded();
        let touched = store.shift_bounds(Side::Left, 3..=i64::MAX, 10).unwrap();
        assert_eq!(touched, 1);
        let b = store.get("b").unwrap().unwrap();
        assert_eq!((b.left, b.right), (14, 5));
    }

    #[test]
    fn given_failed_batch_when_rolled_back_then_rows_are_unchanged() {
        let mut store = seeded();
        let before = store.all().unwrap();

        store.begin().unwrap();
        store.delete_range(2, 3).unwrap();
        // duplicate primary key aborts the batch
        assert!(store.insert(&leaf("b", "root", 8, 1)).is_err());
        store.rollback().unwrap();

        assert_eq!(store.all().unwrap(), before);
    }

    #[test]
    fn given_unknown_parent_when_inserting_then_foreign_key_rejects() {
        let mut store = seeded();
        assert!(store.insert(&leaf("x", "ghost", 8, 1)).is_err());
    }

    #[test]
    fn given_missing_node_when_reparenting_then_errors() {
        let mut store = seeded();
        assert!(matches!(
            store.set_parent_and_depth("ghost", Some("root"), 1),
            Err(StoreError::MissingNode(_))
        ));
    }
}
