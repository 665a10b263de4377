//! Board operations: thread and reply lifecycle, reporting and
//! password-gated deletion.
//!
//! Expected negative results (wrong password, unknown thread) come back as an
//! [`Outcome`]; only storage failures surface as [`ServiceError`].

use std::sync::Arc;

use chrono::Utc;
use futures_util::future::try_join;

use crate::models::*;
use crate::repo::{Repo, RepoError};

pub const THREAD_LIST_LIMIT: usize = 10;
pub const REPLY_PREVIEW_LIMIT: usize = 3;
/// Replacement text for a deleted reply.
pub const TOMBSTONE: &str = "[deleted]";

#[derive(thiserror::Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Storage(#[from] RepoError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T = ()> {
    Success(T),
    IncorrectPassword,
    NotFound,
    /// Precondition held but the follow-up write did not land.
    Error(String),
}

impl<T> Outcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    /// Plain-text body for clients that expect a bare status word.
    pub fn status_text(&self, success: &str, not_found: &str) -> String {
        match self {
            Outcome::Success(_) => success.to_string(),
            Outcome::IncorrectPassword => "incorrect password".to_string(),
            Outcome::NotFound => not_found.to_string(),
            Outcome::Error(detail) => detail.clone(),
        }
    }
}

#[derive(Clone)]
pub struct BoardService {
    repo: Arc<dyn Repo>,
}

impl BoardService {
    pub fn new(repo: Arc<dyn Repo>) -> Self { Self { repo } }

    pub fn repo(&self) -> &Arc<dyn Repo> { &self.repo }

    pub async fn create_thread(&self, board: &str, text: &str, password: &str) -> ServiceResult<CreatedThread> {
        let now = Utc::now();
        let thread = self.repo.insert_thread(NewThread {
            board: board.to_string(),
            text: text.to_string(),
            delete_password: password.to_string(),
            created_on: now,
            bumped_on: now,
        }).await?;
        log::info!("thread {} created on /{}/", thread.id, board);
        Ok(CreatedThread { thread, replies: Vec::new() })
    }

    pub async fn get_threads(&self, board: &str) -> ServiceResult<Vec<ThreadView>> {
        log::debug!("listing threads on /{board}/");
        Ok(self.repo.list_threads(board, THREAD_LIST_LIMIT, REPLY_PREVIEW_LIMIT).await?)
    }

    pub async fn report_thread(&self, thread_id: Id, board: &str) -> ServiceResult<Outcome> {
        let patch = ThreadPatch { reported: Some(true), ..Default::default() };
        let n = self.repo.update_threads(&ThreadFilter::on_board(thread_id, board), &patch).await?;
        if n == 0 {
            return Ok(Outcome::NotFound);
        }
        log::info!("thread {thread_id} on /{board}/ reported");
        Ok(Outcome::Success(()))
    }

    /// Removes every reply of the thread, then the thread itself. Not atomic:
    /// if the second delete fails the replies stay gone.
    pub async fn delete_thread(&self, thread_id: Id, board: &str, password: &str) -> ServiceResult<Outcome> {
        let filter = ThreadFilter::on_board(thread_id, board).with_password(password);
        if self.repo.count_threads(&filter).await? == 0 {
            return Ok(Outcome::IncorrectPassword);
        }
        let replies = self.repo.delete_replies(&ReplyFilter::all_in_thread(thread_id)).await?;
        let deleted = self.repo.delete_threads(&filter).await?;
        if deleted == 0 {
            return Ok(Outcome::IncorrectPassword);
        }
        log::info!("thread {thread_id} on /{board}/ deleted with {replies} replies");
        Ok(Outcome::Success(()))
    }

    /// Inserts the reply and bumps its thread, both stamped with the same instant.
    pub async fn create_reply(&self, thread_id: Id, text: &str, password: &str, board: &str) -> ServiceResult<Outcome<Reply>> {
        let thread = ThreadFilter::on_board(thread_id, board);
        if self.repo.count_threads(&thread).await? == 0 {
            return Ok(Outcome::NotFound);
        }
        let now = Utc::now();
        let bump = ThreadPatch { bumped_on: Some(now), ..Default::default() };
        let new = NewReply {
            thread_id,
            text: text.to_string(),
            delete_password: password.to_string(),
            created_on: now,
        };
        let (bumped, reply) = match try_join(self.repo.update_threads(&thread, &bump), self.repo.insert_reply(new)).await {
            Ok(pair) => pair,
            // thread deleted between the check and the insert
            Err(RepoError::NotFound) => return Ok(Outcome::Error("Error creating reply".into())),
            Err(e) => return Err(e.into()),
        };
        if bumped == 0 {
            return Ok(Outcome::Error("Error creating reply".into()));
        }
        log::info!("reply {} added to thread {thread_id} on /{board}/", reply.id);
        Ok(Outcome::Success(reply))
    }

    pub async fn get_replies(&self, thread_id: Id, board: &str) -> ServiceResult<Option<ThreadView>> {
        log::debug!("fetching thread {thread_id} on /{board}/");
        Ok(self.repo.fetch_thread(&ThreadFilter::on_board(thread_id, board)).await?)
    }

    pub async fn report_reply(&self, thread_id: Id, reply_id: Id, board: &str) -> ServiceResult<Outcome> {
        let patch = ReplyPatch { reported: Some(true), ..Default::default() };
        let (threads, flagged) = try_join(
            self.repo.count_threads(&ThreadFilter::on_board(thread_id, board)),
            self.repo.update_replies(&ReplyFilter::in_thread(reply_id, thread_id), &patch),
        ).await?;
        if threads == 0 || flagged == 0 {
            return Ok(Outcome::NotFound);
        }
        log::info!("reply {reply_id} in thread {thread_id} reported");
        Ok(Outcome::Success(()))
    }

    pub async fn delete_reply(&self, thread_id: Id, reply_id: Id, password: &str, board: &str) -> ServiceResult<Outcome> {
        let reply = ReplyFilter::in_thread(reply_id, thread_id).with_password(password);
        let (threads, replies) = try_join(
            self.repo.count_threads(&ThreadFilter::on_board(thread_id, board)),
            self.repo.count_replies(&reply),
        ).await?;
        if threads == 0 || replies == 0 {
            return Ok(Outcome::IncorrectPassword);
        }
        let patch = ReplyPatch { text: Some(TOMBSTONE.to_string()), ..Default::default() };
        if self.repo.update_replies(&reply, &patch).await? == 0 {
            return Ok(Outcome::IncorrectPassword);
        }
        log::info!("reply {reply_id} in thread {thread_id} tombstoned");
        Ok(Outcome::Success(()))
    }
}
