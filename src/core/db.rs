use std::sync::Mutex;

use rusqlite::{Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use crate::config::{post_key, user_key, USERS_LIST_KEY};
use crate::core::errors::ApiError;
use crate::core::helpers::{hash_password, now_iso};
use crate::models::models::{Post, User};

/// Document store: whole JSON documents addressed by key, backed by a single
/// sqlite table. Handlers read and write documents with `get_json`/`set_json`
/// and use `with_txn` where two documents must change together.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    pub fn open(path: &str) -> anyhow::Result<Self> {
        let conn = Connection::open(path)?;
        init_schema(&conn)?;
        Ok(Store { conn: Mutex::new(conn) })
    }

    pub fn open_in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Store { conn: Mutex::new(conn) })
    }

    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<Option<T>> {
        let conn = self.lock();
        kv_get(&conn, key)
    }

    pub fn set_json<T: Serialize>(&self, key: &str, value: &T) -> anyhow::Result<()> {
        let conn = self.lock();
        kv_set(&conn, key, value)
    }

    pub fn delete(&self, key: &str) -> anyhow::Result<()> {
        let conn = self.lock();
        conn.execute("DELETE FROM kv WHERE key = ?1", [key])?;
        Ok(())
    }

    /// Runs `f` inside a single sqlite transaction. Either every write in the
    /// scope commits or none does.
    pub fn with_txn<R>(&self, f: impl FnOnce(&Txn<'_>) -> Result<R, ApiError>) -> Result<R, ApiError> {
        let mut conn = self.lock();
        let tx = conn
            .transaction()
            .map_err(|e| ApiError::from(anyhow::Error::new(e)))?;
        let out = f(&Txn { tx: &tx })?;
        tx.commit().map_err(|e| ApiError::from(anyhow::Error::new(e)))?;
        Ok(out)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().expect("document store mutex poisoned")
    }
}

/// Transaction scope handed to `Store::with_txn` closures.
pub struct Txn<'a> {
    tx: &'a rusqlite::Transaction<'a>,
}

impl Txn<'_> {
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<Option<T>> {
        kv_get(self.tx, key)
    }

    pub fn set_json<T: Serialize>(&self, key: &str, value: &T) -> anyhow::Result<()> {
        kv_set(self.tx, key, value)
    }
}

fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS kv (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        [],
    )?;
    Ok(())
}

fn kv_get<T: DeserializeOwned>(conn: &Connection, key: &str) -> anyhow::Result<Option<T>> {
    let raw: Option<String> = conn
        .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get(0))
        .optional()?;
    match raw {
        Some(s) => Ok(Some(serde_json::from_str(&s)?)),
        None => Ok(None),
    }
}

fn kv_set<T: Serialize>(conn: &Connection, key: &str, value: &T) -> anyhow::Result<()> {
    let raw = serde_json::to_string(value)?;
    conn.execute(
        "INSERT INTO kv (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        rusqlite::params![key, raw],
    )?;
    Ok(())
}

/// Seeds a couple of demo accounts with posts so a fresh local instance has
/// something to browse. No-op once the demo users exist.
pub fn seed_demo_data(store: &Store) -> anyhow::Result<()> {
    let users: Vec<String> = store.get_json(USERS_LIST_KEY)?.unwrap_or_default();
    for id in &users {
        if let Some(u) = store.get_json::<User>(&user_key(id))? {
            if u.email == "alice@huddle.dev" {
                return Ok(());
            }
        }
    }

    let mut users = users;

    let alice_id = Uuid::new_v4().to_string();
    let alice_post = Post {
        id: Uuid::new_v4().to_string(),
        author: alice_id.clone(),
        content: "First one here. Say hi!".to_string(),
        created_at: now_iso(),
    };
    let alice = User {
        id: alice_id.clone(),
        username: "alice".to_string(),
        email: "alice@huddle.dev".to_string(),
        password: hash_password("alice")?,
        profile_picture: None,
        bio: Some("Hello, I'm Alice!".to_string()),
        gender: None,
        followers: vec![],
        following: vec![],
        posts: vec![alice_post.id.clone()],
        bookmarks: vec![],
        created_at: now_iso(),
    };
    store.set_json(&post_key(&alice_post.id), &alice_post)?;
    store.set_json(&user_key(&alice_id), &alice)?;
    users.push(alice_id);

    let bob_id = Uuid::new_v4().to_string();
    let bob_post = Post {
        id: Uuid::new_v4().to_string(),
        author: bob_id.clone(),
        content: "Just joined, looking forward to connecting with you all.".to_string(),
        created_at: now_iso(),
    };
    let bob = User {
        id: bob_id.clone(),
        username: "bob".to_string(),
        email: "bob@huddle.dev".to_string(),
        password: hash_password("bob")?,
        profile_picture: None,
        bio: Some("Bob's corner of the internet".to_string()),
        gender: None,
        followers: vec![],
        following: vec![],
        posts: vec![bob_post.id.clone()],
        bookmarks: vec![],
        created_at: now_iso(),
    };
    store.set_json(&post_key(&bob_post.id), &bob_post)?;
    store.set_json(&user_key(&bob_id), &bob)?;
    users.push(bob_id);

    store.set_json(USERS_LIST_KEY, &users)?;

    Ok(())
}
