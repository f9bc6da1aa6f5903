use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use reqwest::Method;
use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info};

use crate::worker::error::CacheError;
use crate::worker::storage::CacheStorage;
use crate::worker::types::{CachedEntry, Request, Response};

/// Schema migrations
/// Each version contains a list of SQL statements to execute
const MIGRATIONS: &[&[&str]] = &[
    // v1: installed_at column
    &["ALTER TABLE caches ADD COLUMN installed_at INTEGER"],
];

pub struct SqliteCacheStorage {
    conn: Mutex<Connection>,
}

impl SqliteCacheStorage {
    pub fn new(db_path: &Path) -> Result<Self, CacheError> {
        info!("Initializing cache database at {:?}", db_path);

        let conn = Connection::open(db_path)?;

        // Enable WAL mode for better concurrency
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        debug!("Database connection established");

        let storage = Self {
            conn: Mutex::new(conn),
        };

        storage.create_schema()?;
        info!("Cache storage initialized successfully");

        Ok(storage)
    }

    /// Acquire database connection lock with proper error handling
    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>, CacheError> {
        self.conn.lock().map_err(|_| CacheError::LockPoisoned)
    }

    fn current_timestamp_ms() -> i64 {
        chrono::Utc::now().timestamp_millis()
    }

    fn create_schema(&self) -> Result<(), CacheError> {
        debug!("Creating database schema");

        let conn = self.lock_conn()?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS caches (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                created_at INTEGER NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS entries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                cache_id INTEGER NOT NULL,
                method TEXT NOT NULL,
                url TEXT NOT NULL,
                status INTEGER NOT NULL,
                headers TEXT NOT NULL,
                body BLOB NOT NULL,
                stored_at INTEGER NOT NULL,
                FOREIGN KEY (cache_id) REFERENCES caches(id) ON DELETE CASCADE,
                UNIQUE(cache_id, method, url)
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_entries_request ON entries(method, url)",
            [],
        )?;

        // Apply migrations
        Self::apply_migrations(&conn)?;

        debug!("Database schema created successfully");
        Ok(())
    }

    /// Apply pending migrations based on user_version pragma
    fn apply_migrations(conn: &Connection) -> Result<(), CacheError> {
        let current_version: i32 =
            conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

        for (i, statements) in MIGRATIONS.iter().enumerate() {
            let version = (i + 1) as i32;
            if version > current_version {
                for sql in *statements {
                    match conn.execute(sql, []) {
                        Ok(_) => {}
                        Err(rusqlite::Error::SqliteFailure(_, Some(ref msg)))
                            if msg.contains("duplicate column name") =>
                        {
                            debug!("Column already exists, skipping: {}", sql);
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
                debug!("Applied migration v{}", version);
            }
        }

        let target_version = MIGRATIONS.len() as i32;
        if target_version > current_version {
            conn.pragma_update(None, "user_version", target_version)?;
            debug!("Updated schema version to v{}", target_version);
        }

        Ok(())
    }

    /// Insert the store row if missing and return its id
    fn ensure_cache(conn: &Connection, name: &str) -> Result<i64, CacheError> {
        conn.execute(
            r#"
            INSERT INTO caches (name, created_at)
            VALUES (?1, ?2)
            ON CONFLICT(name) DO NOTHING
            "#,
            (name, Self::current_timestamp_ms()),
        )?;

        let cache_id = conn.query_row("SELECT id FROM caches WHERE name = ?1", [name], |row| {
            row.get(0)
        })?;

        Ok(cache_id)
    }
}

impl CacheStorage for SqliteCacheStorage {
    fn add_all(&self, name: &str, entries: Vec<(Request, Response)>) -> Result<(), CacheError> {
        debug!("Storing {} entries in cache {}", entries.len(), name);

        let now = Self::current_timestamp_ms();

        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;

        let cache_id = Self::ensure_cache(&tx, name)?;

        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO entries (cache_id, method, url, status, headers, body, stored_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ON CONFLICT(cache_id, method, url) DO UPDATE SET
                    status = excluded.status,
                    headers = excluded.headers,
                    body = excluded.body,
                    stored_at = excluded.stored_at
                "#,
            )?;
            for (request, response) in &entries {
                let headers = serde_json::to_string(&response.headers)?;
                stmt.execute((
                    cache_id,
                    request.method.as_str(),
                    request.cache_url(),
                    response.status,
                    headers,
                    &response.body,
                    now,
                ))?;
            }
        }

        tx.execute(
            "UPDATE caches SET installed_at = ?1 WHERE id = ?2",
            (now, cache_id),
        )?;

        tx.commit()?;
        Ok(())
    }

    fn is_installed(&self, name: &str) -> Result<bool, CacheError> {
        let conn = self.lock_conn()?;
        let installed = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM caches WHERE name = ?1 AND installed_at IS NOT NULL)",
            [name],
            |row| row.get(0),
        )?;

        Ok(installed)
    }

    fn match_request(&self, request: &Request) -> Result<Option<Response>, CacheError> {
        if request.method != Method::GET {
            return Ok(None);
        }

        let conn = self.lock_conn()?;
        let row = conn
            .query_row(
                r#"
                SELECT e.status, e.headers, e.body FROM entries e
                JOIN caches c ON e.cache_id = c.id
                WHERE e.method = ?1 AND e.url = ?2
                ORDER BY c.id
                LIMIT 1
                "#,
                (request.method.as_str(), request.cache_url()),
                |row| {
                    Ok((
                        row.get::<_, u16>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Vec<u8>>(2)?,
                    ))
                },
            )
            .optional()?;

        let Some((status, headers, body)) = row else {
            return Ok(None);
        };

        Ok(Some(Response {
            status,
            headers: serde_json::from_str(&headers)?,
            body,
        }))
    }

    fn keys(&self) -> Result<Vec<String>, CacheError> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare("SELECT name FROM caches ORDER BY id")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;

        Ok(names)
    }

    fn delete(&self, name: &str) -> Result<bool, CacheError> {
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            "DELETE FROM entries WHERE cache_id IN (SELECT id FROM caches WHERE name = ?1)",
            [name],
        )?;
        let deleted = tx.execute("DELETE FROM caches WHERE name = ?1", [name])?;

        tx.commit()?;
        Ok(deleted > 0)
    }

    fn entries(&self, name: &str) -> Result<Vec<CachedEntry>, CacheError> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT e.url, e.status, length(e.body), e.stored_at FROM entries e
            JOIN caches c ON e.cache_id = c.id
            WHERE c.name = ?1
            ORDER BY e.id
            "#,
        )?;

        let entries = stmt
            .query_map([name], |row| {
                Ok(CachedEntry {
                    url: row.get(0)?,
                    status: row.get(1)?,
                    size: row.get::<_, i64>(2)? as usize,
                    stored_at: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    fn create_storage() -> (TempDir, SqliteCacheStorage) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let storage = SqliteCacheStorage::new(&db_path).unwrap();
        (temp_dir, storage)
    }

    fn entry(url: &str, body: &str) -> (Request, Response) {
        (
            Request::get(url),
            Response::new(200, body).with_header("content-type", "text/html"),
        )
    }

    #[test]
    fn add_all_marks_store_installed() {
        let (_temp_dir, storage) = create_storage();
        assert!(!storage.is_installed("v1").unwrap());

        storage.add_all("v1", vec![entry("/", "home")]).unwrap();

        assert!(storage.is_installed("v1").unwrap());
        assert!(!storage.is_installed("v2").unwrap());
    }

    #[test]
    fn store_row_without_marker_is_not_installed() {
        let (_temp_dir, storage) = create_storage();
        {
            let conn = storage.lock_conn().unwrap();
            SqliteCacheStorage::ensure_cache(&conn, "v1").unwrap();
        }

        assert_eq!(storage.keys().unwrap(), vec!["v1".to_string()]);
        assert!(!storage.is_installed("v1").unwrap());
    }

    #[test]
    fn migrations_add_installed_column_to_existing_database() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        {
            let conn = Connection::open(&db_path).unwrap();
            conn.execute(
                "CREATE TABLE caches (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL UNIQUE, created_at INTEGER NOT NULL)",
                [],
            )
            .unwrap();
            conn.execute(
                "INSERT INTO caches (name, created_at) VALUES ('v1', 0)",
                [],
            )
            .unwrap();
        }

        let storage = SqliteCacheStorage::new(&db_path).unwrap();

        assert!(!storage.is_installed("v1").unwrap());
        storage.add_all("v1", vec![entry("/", "home")]).unwrap();
        assert!(storage.is_installed("v1").unwrap());

        let version: i32 = storage
            .lock_conn()
            .unwrap()
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap();
        assert_eq!(version, MIGRATIONS.len() as i32);
    }

    #[test]
    fn delete_clears_installed_marker() {
        let (_temp_dir, storage) = create_storage();
        storage.add_all("v1", vec![entry("/", "home")]).unwrap();

        storage.delete("v1").unwrap();

        assert!(!storage.is_installed("v1").unwrap());
    }

    #[test]
    fn add_all_creates_store_if_absent() {
        let (_temp_dir, storage) = create_storage();

        storage.add_all("v1", vec![entry("/", "home")]).unwrap();

        assert_eq!(storage.keys().unwrap(), vec!["v1".to_string()]);
        assert_eq!(storage.entries("v1").unwrap().len(), 1);
    }

    #[test]
    fn add_all_replaces_existing_entries_without_duplicates() {
        let (_temp_dir, storage) = create_storage();

        storage
            .add_all("v1", vec![entry("/", "old"), entry("/about", "about")])
            .unwrap();
        storage.add_all("v1", vec![entry("/", "new")]).unwrap();

        let entries = storage.entries("v1").unwrap();
        assert_eq!(entries.len(), 2);

        let matched = storage.match_request(&Request::get("/")).unwrap().unwrap();
        assert_eq!(matched.body, b"new");
    }

    #[test]
    fn match_request_returns_stored_response_with_headers() {
        let (_temp_dir, storage) = create_storage();
        storage
            .add_all("v1", vec![entry("/verses/KJV", "In the beginning")])
            .unwrap();

        let matched = storage
            .match_request(&Request::get("/verses/KJV"))
            .unwrap()
            .unwrap();

        assert_eq!(matched.status, 200);
        assert_eq!(matched.body, b"In the beginning");
        assert_eq!(matched.header("content-type"), Some("text/html"));
    }

    #[test]
    fn match_request_ignores_fragment() {
        let (_temp_dir, storage) = create_storage();
        storage
            .add_all("v1", vec![entry("/verses/WEB", "web")])
            .unwrap();

        let matched = storage
            .match_request(&Request::get("/verses/WEB#genesis"))
            .unwrap();

        assert!(matched.is_some());
    }

    #[rstest]
    #[case(Method::GET, "/missing", false)]
    #[case(Method::POST, "/", false)]
    #[case(Method::HEAD, "/", false)]
    #[case(Method::GET, "/", true)]
    fn match_request_only_matches_get_with_exact_url(
        #[case] method: Method,
        #[case] url: &str,
        #[case] expected: bool,
    ) {
        let (_temp_dir, storage) = create_storage();
        storage.add_all("v1", vec![entry("/", "home")]).unwrap();

        let matched = storage.match_request(&Request::new(method, url)).unwrap();

        assert_eq!(matched.is_some(), expected);
    }

    #[test]
    fn match_request_prefers_oldest_store() {
        let (_temp_dir, storage) = create_storage();
        storage.add_all("v1", vec![entry("/", "first")]).unwrap();
        storage.add_all("v2", vec![entry("/", "second")]).unwrap();

        let matched = storage.match_request(&Request::get("/")).unwrap().unwrap();

        assert_eq!(matched.body, b"first");
    }

    #[test]
    fn keys_returns_names_in_creation_order() {
        let (_temp_dir, storage) = create_storage();
        storage.add_all("v2", vec![]).unwrap();
        storage.add_all("v1", vec![]).unwrap();
        storage.add_all("v3", vec![]).unwrap();

        assert_eq!(
            storage.keys().unwrap(),
            vec!["v2".to_string(), "v1".to_string(), "v3".to_string()]
        );
    }

    #[test]
    fn delete_removes_store_and_entries() {
        let (_temp_dir, storage) = create_storage();
        storage.add_all("v1", vec![entry("/", "home")]).unwrap();

        assert!(storage.delete("v1").unwrap());

        assert!(storage.keys().unwrap().is_empty());
        assert!(storage.entries("v1").unwrap().is_empty());
        assert!(storage.match_request(&Request::get("/")).unwrap().is_none());
    }

    #[test]
    fn delete_nonexistent_store_returns_false() {
        let (_temp_dir, storage) = create_storage();

        assert!(!storage.delete("never-created").unwrap());
    }

    #[test]
    fn entries_reports_url_status_and_size() {
        let (_temp_dir, storage) = create_storage();
        storage
            .add_all(
                "v1",
                vec![entry("/", "home"), entry("/static/css/style.css", "body{}")],
            )
            .unwrap();

        let entries = storage.entries("v1").unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].url, "/");
        assert_eq!(entries[0].status, 200);
        assert_eq!(entries[0].size, 4);
        assert_eq!(entries[1].url, "/static/css/style.css");
        assert_eq!(entries[1].size, 6);
        assert!(entries[0].stored_at > 0);
    }

    #[test]
    fn stores_persist_across_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        {
            let storage = SqliteCacheStorage::new(&db_path).unwrap();
            storage.add_all("v3", vec![entry("/offline", "offline")]).unwrap();
        }

        let storage = SqliteCacheStorage::new(&db_path).unwrap();
        assert_eq!(storage.keys().unwrap(), vec!["v3".to_string()]);
        assert!(
            storage
                .match_request(&Request::get("/offline"))
                .unwrap()
                .is_some()
        );
    }
}
