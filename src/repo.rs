use crate::models::*;

#[derive(thiserror::Error, Debug)]
pub enum RepoError {
    #[error("not found")] NotFound,
    #[error("storage error: {0}")] Internal(String),
}

pub type RepoResult<T> = Result<T, RepoError>;

use async_trait::async_trait;

/// Filtered thread access. Mutating calls report how many rows they touched
/// so callers can tell "no match" apart from a storage failure.
#[async_trait]
pub trait ThreadRepo: Send + Sync {
    async fn insert_thread(&self, new: NewThread) -> RepoResult<Thread>;
    async fn count_threads(&self, filter: &ThreadFilter) -> RepoResult<u64>;
    async fn update_threads(&self, filter: &ThreadFilter, patch: &ThreadPatch) -> RepoResult<u64>;
    async fn delete_threads(&self, filter: &ThreadFilter) -> RepoResult<u64>;
    /// Threads of `board` by `bumped_on` desc, each with its newest `reply_limit` replies.
    async fn list_threads(&self, board: &str, thread_limit: usize, reply_limit: usize) -> RepoResult<Vec<ThreadView>>;
    /// First matching thread with every reply, oldest first.
    async fn fetch_thread(&self, filter: &ThreadFilter) -> RepoResult<Option<ThreadView>>;
}

#[async_trait]
pub trait ReplyRepo: Send + Sync {
    async fn insert_reply(&self, new: NewReply) -> RepoResult<Reply>;
    async fn count_replies(&self, filter: &ReplyFilter) -> RepoResult<u64>;
    async fn update_replies(&self, filter: &ReplyFilter, patch: &ReplyPatch) -> RepoResult<u64>;
    async fn delete_replies(&self, filter: &ReplyFilter) -> RepoResult<u64>;
}

pub trait Repo: ThreadRepo + ReplyRepo {}

impl<T> Repo for T where T: ThreadRepo + ReplyRepo {}

/// Wipe both tables, replies first so no reply is left pointing at a missing thread.
pub async fn truncate(repo: &dyn Repo) -> RepoResult<()> {
    let replies = repo.delete_replies(&ReplyFilter::default()).await?;
    let threads = repo.delete_threads(&ThreadFilter::default()).await?;
    log::info!("truncated {threads} threads and {replies} replies");
    Ok(())
}

/// Physical table names. A suffix selects an isolated dataset (e.g. `_test`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tables {
    pub threads: String,
    pub replies: String,
}

impl Tables {
    pub fn with_suffix(suffix: &str) -> Self {
        Self { threads: format!("threads{suffix}"), replies: format!("replies{suffix}") }
    }
}

impl Default for Tables {
    fn default() -> Self { Self::with_suffix("") }
}

#[cfg(feature = "inmem-store")]
pub mod inmem {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

    // BTreeMap keeps iteration in id order so equal timestamps sort stably
    #[derive(Default)]
    struct State {
        threads: BTreeMap<Id, Thread>,
        replies: BTreeMap<Id, Reply>,
        next_id: Id,
    }

    #[derive(Clone, Default)]
    pub struct InMemRepo {
        state: Arc<RwLock<State>>,
    }

    impl InMemRepo {
        pub fn new() -> Self { Self::default() }

        fn read(&self) -> RepoResult<RwLockReadGuard<'_, State>> {
            self.state.read().map_err(|_| RepoError::Internal("state lock poisoned".into()))
        }

        fn write(&self) -> RepoResult<RwLockWriteGuard<'_, State>> {
            self.state.write().map_err(|_| RepoError::Internal("state lock poisoned".into()))
        }

        fn next_id(state: &mut State) -> Id {
            state.next_id += 1;
            state.next_id
        }
    }

    #[async_trait]
    impl ThreadRepo for InMemRepo {
        async fn insert_thread(&self, new: NewThread) -> RepoResult<Thread> {
            let mut s = self.write()?;
            let id = Self::next_id(&mut s);
            let thread = Thread {
                id,
                board: new.board,
                text: new.text,
                delete_password: new.delete_password,
                created_on: new.created_on,
                bumped_on: new.bumped_on,
                reported: false,
            };
            s.threads.insert(id, thread.clone());
            Ok(thread)
        }

        async fn count_threads(&self, filter: &ThreadFilter) -> RepoResult<u64> {
            let s = self.read()?;
            Ok(s.threads.values().filter(|t| filter.matches(t)).count() as u64)
        }

        async fn update_threads(&self, filter: &ThreadFilter, patch: &ThreadPatch) -> RepoResult<u64> {
            let mut s = self.write()?;
            let mut n = 0;
            for t in s.threads.values_mut().filter(|t| filter.matches(t)) {
                patch.apply(t);
                n += 1;
            }
            Ok(n)
        }

        async fn delete_threads(&self, filter: &ThreadFilter) -> RepoResult<u64> {
            let mut s = self.write()?;
            let doomed: Vec<Id> = s.threads.values().filter(|t| filter.matches(t)).map(|t| t.id).collect();
            // same guarantee a foreign key gives the relational backend
            if s.replies.values().any(|r| doomed.contains(&r.thread_id)) {
                return Err(RepoError::Internal("thread still referenced by replies".into()));
            }
            for id in &doomed {
                s.threads.remove(id);
            }
            Ok(doomed.len() as u64)
        }

        async fn list_threads(&self, board: &str, thread_limit: usize, reply_limit: usize) -> RepoResult<Vec<ThreadView>> {
            let s = self.read()?;
            let mut threads: Vec<&Thread> = s.threads.values().filter(|t| t.board == board).collect();
            threads.sort_by(|a, b| b.bumped_on.cmp(&a.bumped_on));
            threads.truncate(thread_limit);
            let views = threads
                .into_iter()
                .map(|t| {
                    let mut replies: Vec<&Reply> = s.replies.values().filter(|r| r.thread_id == t.id).collect();
                    replies.sort_by(|a, b| b.created_on.cmp(&a.created_on));
                    let replies = replies.into_iter().take(reply_limit).cloned().map(ReplyView::from).collect();
                    ThreadView::new(t.clone(), replies)
                })
                .collect();
            Ok(views)
        }

        async fn fetch_thread(&self, filter: &ThreadFilter) -> RepoResult<Option<ThreadView>> {
            let s = self.read()?;
            let Some(t) = s.threads.values().find(|t| filter.matches(t)) else { return Ok(None) };
            let mut replies: Vec<ReplyView> = s.replies
                .values()
                .filter(|r| r.thread_id == t.id)
                .cloned()
                .map(ReplyView::from)
                .collect();
            replies.sort_by(|a, b| a.created_on.cmp(&b.created_on));    // ascending
            Ok(Some(ThreadView::new(t.clone(), replies)))
        }
    }

    #[async_trait]
    impl ReplyRepo for InMemRepo {
        async fn insert_reply(&self, new: NewReply) -> RepoResult<Reply> {
            let mut s = self.write()?;
            if !s.threads.contains_key(&new.thread_id) { return Err(RepoError::NotFound); }
            let id = Self::next_id(&mut s);
            let reply = Reply {
                id,
                thread_id: new.thread_id,
                text: new.text,
                delete_password: new.delete_password,
                created_on: new.created_on,
                reported: false,
            };
            s.replies.insert(id, reply.clone());
            Ok(reply)
        }

        async fn count_replies(&self, filter: &ReplyFilter) -> RepoResult<u64> {
            let s = self.read()?;
            Ok(s.replies.values().filter(|r| filter.matches(r)).count() as u64)
        }

        async fn update_replies(&self, filter: &ReplyFilter, patch: &ReplyPatch) -> RepoResult<u64> {
            let mut s = self.write()?;
            let mut n = 0;
            for r in s.replies.values_mut().filter(|r| filter.matches(r)) {
                patch.apply(r);
                n += 1;
            }
            Ok(n)
        }

        async fn delete_replies(&self, filter: &ReplyFilter) -> RepoResult<u64> {
            let mut s = self.write()?;
            let before = s.replies.len();
            s.replies.retain(|_, r| !filter.matches(r));
            Ok((before - s.replies.len()) as u64)
        }
    }

}

// Postgres implementation (feature = "postgres-store")
#[cfg(feature = "postgres-store")]
pub mod pg {
    use super::*;
    use sqlx::{Pool, Postgres, QueryBuilder};

    const THREAD_COLUMNS: &str = "id, board, text, delete_password, created_on, bumped_on, reported";
    const REPLY_COLUMNS: &str = "id, thread_id, text, delete_password, created_on, reported";

    fn db_err(e: sqlx::Error) -> RepoError {
        RepoError::Internal(e.to_string())
    }

    fn push_thread_filter(qb: &mut QueryBuilder<'_, Postgres>, f: &ThreadFilter) {
        qb.push(" WHERE TRUE");
        if let Some(id) = f.id { qb.push(" AND id = ").push_bind(id); }
        if let Some(ref board) = f.board { qb.push(" AND board = ").push_bind(board.clone()); }
        if let Some(ref pw) = f.delete_password { qb.push(" AND delete_password = ").push_bind(pw.clone()); }
    }

    fn push_reply_filter(qb: &mut QueryBuilder<'_, Postgres>, f: &ReplyFilter) {
        qb.push(" WHERE TRUE");
        if let Some(id) = f.id { qb.push(" AND id = ").push_bind(id); }
        if let Some(tid) = f.thread_id { qb.push(" AND thread_id = ").push_bind(tid); }
        if let Some(ref pw) = f.delete_password { qb.push(" AND delete_password = ").push_bind(pw.clone()); }
    }

    #[derive(Clone)]
    pub struct PgRepo { pool: Pool<Postgres>, tables: Tables }

    impl PgRepo {
        pub fn new(pool: Pool<Postgres>, tables: Tables) -> Self { Self { pool, tables } }

        async fn replies_for(&self, thread_ids: &[Id], per_thread: i64) -> RepoResult<Vec<ReplyView>> {
            sqlx::query_as::<_, ReplyView>(&format!(r#"
                SELECT id, thread_id, text, created_on, reported FROM (
                    SELECT r.*, ROW_NUMBER() OVER (PARTITION BY r.thread_id ORDER BY r.created_on DESC, r.id DESC) AS rn
                    FROM {} r
                    WHERE r.thread_id = ANY($1)
                ) ranked
                WHERE rn <= $2
                ORDER BY thread_id, created_on DESC, id DESC
            "#, self.tables.replies))
                .bind(thread_ids.to_vec())
                .bind(per_thread)
                .fetch_all(&self.pool).await.map_err(db_err)
        }
    }

    #[async_trait]
    impl ThreadRepo for PgRepo {
        async fn insert_thread(&self, new: NewThread) -> RepoResult<Thread> {
            sqlx::query_as::<_, Thread>(&format!(
                "INSERT INTO {} (board, text, delete_password, created_on, bumped_on) VALUES ($1,$2,$3,$4,$5) RETURNING {THREAD_COLUMNS}",
                self.tables.threads
            ))
                .bind(&new.board).bind(&new.text).bind(&new.delete_password)
                .bind(new.created_on).bind(new.bumped_on)
                .fetch_one(&self.pool).await.map_err(db_err)
        }

        async fn count_threads(&self, filter: &ThreadFilter) -> RepoResult<u64> {
            let mut qb = QueryBuilder::new(format!("SELECT COUNT(*) FROM {}", self.tables.threads));
            push_thread_filter(&mut qb, filter);
            let n: i64 = qb.build_query_scalar().fetch_one(&self.pool).await.map_err(db_err)?;
            Ok(n as u64)
        }

        async fn update_threads(&self, filter: &ThreadFilter, patch: &ThreadPatch) -> RepoResult<u64> {
            if patch.bumped_on.is_none() && patch.reported.is_none() { return Ok(0); }
            let mut qb = QueryBuilder::new(format!("UPDATE {} SET ", self.tables.threads));
            let mut set = qb.separated(", ");
            if let Some(ts) = patch.bumped_on { set.push("bumped_on = ").push_bind_unseparated(ts); }
            if let Some(flag) = patch.reported { set.push("reported = ").push_bind_unseparated(flag); }
            push_thread_filter(&mut qb, filter);
            let res = qb.build().execute(&self.pool).await.map_err(db_err)?;
            Ok(res.rows_affected())
        }

        async fn delete_threads(&self, filter: &ThreadFilter) -> RepoResult<u64> {
            let mut qb = QueryBuilder::new(format!("DELETE FROM {}", self.tables.threads));
            push_thread_filter(&mut qb, filter);
            let res = qb.build().execute(&self.pool).await.map_err(db_err)?;
            Ok(res.rows_affected())
        }

        async fn list_threads(&self, board: &str, thread_limit: usize, reply_limit: usize) -> RepoResult<Vec<ThreadView>> {
            let threads = sqlx::query_as::<_, Thread>(&format!(
                "SELECT {THREAD_COLUMNS} FROM {} WHERE board = $1 ORDER BY bumped_on DESC, id ASC LIMIT $2",
                self.tables.threads
            ))
                .bind(board)
                .bind(thread_limit as i64)
                .fetch_all(&self.pool).await.map_err(db_err)?;
            let ids: Vec<Id> = threads.iter().map(|t| t.id).collect();
            let mut replies = self.replies_for(&ids, reply_limit as i64).await?;
            Ok(threads
                .into_iter()
                .map(|t| {
                    let (mine, rest): (Vec<_>, Vec<_>) = replies.drain(..).partition(|r| r.thread_id == t.id);
                    replies = rest;
                    ThreadView::new(t, mine)
                })
                .collect())
        }

        async fn fetch_thread(&self, filter: &ThreadFilter) -> RepoResult<Option<ThreadView>> {
            let mut qb = QueryBuilder::new(format!("SELECT {THREAD_COLUMNS} FROM {}", self.tables.threads));
            push_thread_filter(&mut qb, filter);
            qb.push(" LIMIT 1");
            let Some(thread) = qb.build_query_as::<Thread>().fetch_optional(&self.pool).await.map_err(db_err)? else {
                return Ok(None);
            };
            let replies = sqlx::query_as::<_, ReplyView>(&format!(
                "SELECT id, thread_id, text, created_on, reported FROM {} WHERE thread_id = $1 ORDER BY created_on ASC, id ASC",
                self.tables.replies
            ))
                .bind(thread.id)
                .fetch_all(&self.pool).await.map_err(db_err)?;
            Ok(Some(ThreadView::new(thread, replies)))
        }
    }

    #[async_trait]
    impl ReplyRepo for PgRepo {
        async fn insert_reply(&self, new: NewReply) -> RepoResult<Reply> {
            sqlx::query_as::<_, Reply>(&format!(
                "INSERT INTO {} (thread_id, text, delete_password, created_on) VALUES ($1,$2,$3,$4) RETURNING {REPLY_COLUMNS}",
                self.tables.replies
            ))
                .bind(new.thread_id).bind(&new.text).bind(&new.delete_password).bind(new.created_on)
                .fetch_one(&self.pool).await
                .map_err(|e| match e {
                    sqlx::Error::Database(ref d) if d.is_foreign_key_violation() => RepoError::NotFound,
                    other => db_err(other),
                })
        }

        async fn count_replies(&self, filter: &ReplyFilter) -> RepoResult<u64> {
            let mut qb = QueryBuilder::new(format!("SELECT COUNT(*) FROM {}", self.tables.replies));
            push_reply_filter(&mut qb, filter);
            let n: i64 = qb.build_query_scalar().fetch_one(&self.pool).await.map_err(db_err)?;
            Ok(n as u64)
        }

        async fn update_replies(&self, filter: &ReplyFilter, patch: &ReplyPatch) -> RepoResult<u64> {
            if patch.text.is_none() && patch.reported.is_none() { return Ok(0); }
            let mut qb = QueryBuilder::new(format!("UPDATE {} SET ", self.tables.replies));
            let mut set = qb.separated(", ");
            if let Some(ref text) = patch.text { set.push("text = ").push_bind_unseparated(text.clone()); }
            if let Some(flag) = patch.reported { set.push("reported = ").push_bind_unseparated(flag); }
            push_reply_filter(&mut qb, filter);
            let res = qb.build().execute(&self.pool).await.map_err(db_err)?;
            Ok(res.rows_affected())
        }

        async fn delete_replies(&self, filter: &ReplyFilter) -> RepoResult<u64> {
            let mut qb = QueryBuilder::new(format!("DELETE FROM {}", self.tables.replies));
            push_reply_filter(&mut qb, filter);
            let res = qb.build().execute(&self.pool).await.map_err(db_err)?;
            Ok(res.rows_affected())
        }
    }
}
