use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub type Id = i64;

/// Full thread row as stored. Only returned to the client that created it.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Thread {
    #[serde(rename = "_id")]
    pub id: Id,
    pub board: String,
    pub text: String,
    pub delete_password: String,
    pub created_on: DateTime<Utc>,
    pub bumped_on: DateTime<Utc>,
    pub reported: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewThread {
    pub board: String,
    pub text: String,
    pub delete_password: String,
    pub created_on: DateTime<Utc>,
    pub bumped_on: DateTime<Utc>,
}

/// Thread as returned from `POST /api/threads/{board}`: the stored row plus an empty reply list.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreatedThread {
    #[serde(flatten)]
    pub thread: Thread,
    pub replies: Vec<ReplyView>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Reply {
    #[serde(rename = "_id")]
    pub id: Id,
    pub thread_id: Id,
    pub text: String,
    pub delete_password: String,
    pub created_on: DateTime<Utc>,
    pub reported: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewReply {
    pub thread_id: Id,
    pub text: String,
    pub delete_password: String,
    pub created_on: DateTime<Utc>,
}

// Public views never carry delete_password
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct ReplyView {
    #[serde(rename = "_id")]
    pub id: Id,
    pub thread_id: Id,
    pub text: String,
    pub created_on: DateTime<Utc>,
    pub reported: bool,
}

impl From<Reply> for ReplyView {
    fn from(r: Reply) -> Self {
        Self { id: r.id, thread_id: r.thread_id, text: r.text, created_on: r.created_on, reported: r.reported }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ThreadView {
    #[serde(rename = "_id")]
    pub id: Id,
    pub board: String,
    pub text: String,
    pub created_on: DateTime<Utc>,
    pub bumped_on: DateTime<Utc>,
    pub reported: bool,
    pub replies: Vec<ReplyView>,
}

impl ThreadView {
    pub fn new(t: Thread, replies: Vec<ReplyView>) -> Self {
        Self {
            id: t.id,
            board: t.board,
            text: t.text,
            created_on: t.created_on,
            bumped_on: t.bumped_on,
            reported: t.reported,
            replies,
        }
    }
}

/// Row selector for threads. Every `Some` field must match exactly.
#[derive(Debug, Clone, Default)]
pub struct ThreadFilter {
    pub id: Option<Id>,
    pub board: Option<String>,
    pub delete_password: Option<String>,
}

impl ThreadFilter {
    pub fn on_board(id: Id, board: &str) -> Self {
        Self { id: Some(id), board: Some(board.to_string()), delete_password: None }
    }

    pub fn with_password(mut self, password: &str) -> Self {
        self.delete_password = Some(password.to_string());
        self
    }

    pub fn matches(&self, t: &Thread) -> bool {
        self.id.map_or(true, |id| t.id == id)
            && self.board.as_deref().map_or(true, |b| t.board == b)
            && self.delete_password.as_deref().map_or(true, |p| t.delete_password == p)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReplyFilter {
    pub id: Option<Id>,
    pub thread_id: Option<Id>,
    pub delete_password: Option<String>,
}

impl ReplyFilter {
    pub fn in_thread(id: Id, thread_id: Id) -> Self {
        Self { id: Some(id), thread_id: Some(thread_id), delete_password: None }
    }

    pub fn all_in_thread(thread_id: Id) -> Self {
        Self { id: None, thread_id: Some(thread_id), delete_password: None }
    }

    pub fn with_password(mut self, password: &str) -> Self {
        self.delete_password = Some(password.to_string());
        self
    }

    pub fn matches(&self, r: &Reply) -> bool {
        self.id.map_or(true, |id| r.id == id)
            && self.thread_id.map_or(true, |tid| r.thread_id == tid)
            && self.delete_password.as_deref().map_or(true, |p| r.delete_password == p)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ThreadPatch {
    pub bumped_on: Option<DateTime<Utc>>,
    pub reported: Option<bool>,
}

impl ThreadPatch {
    pub fn apply(&self, t: &mut Thread) {
        if let Some(ts) = self.bumped_on { t.bumped_on = ts; }
        if let Some(flag) = self.reported { t.reported = flag; }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReplyPatch {
    pub text: Option<String>,
    pub reported: Option<bool>,
}

impl ReplyPatch {
    pub fn apply(&self, r: &mut Reply) {
        if let Some(ref text) = self.text { r.text = text.clone(); }
        if let Some(flag) = self.reported { r.reported = flag; }
    }
}
