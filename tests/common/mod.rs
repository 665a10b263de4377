#![allow(dead_code)]

use std::sync::Arc;

use anonboard::models::{NewReply, NewThread, Thread};
use anonboard::repo::inmem::InMemRepo;
use anonboard::repo::{ReplyRepo, Repo, ThreadRepo};
use anonboard::{AppState, BoardService};
use chrono::{Duration, Utc};

pub const BOARD: &str = "test_board";

pub fn state() -> (AppState, Arc<InMemRepo>) {
    let repo = Arc::new(InMemRepo::new());
    let state = AppState { service: BoardService::new(repo.clone() as Arc<dyn Repo>) };
    (state, repo)
}

/// `threads` threads on `board`, each with `replies` replies. Timestamps are
/// spread over the last few months and deliberately not in insertion order.
pub async fn seed_threads(repo: &dyn Repo, board: &str, threads: usize, replies: usize) -> Vec<Thread> {
    let now = Utc::now();
    let mut out = Vec::with_capacity(threads);
    for i in 0..threads as i64 {
        let created_on = now - Duration::days(40 + (i * 37) % 90);
        let bumped_on = created_on + Duration::days((i * 11) % 10);
        let thread = repo
            .insert_thread(NewThread {
                board: board.to_string(),
                text: format!("thread {i}"),
                delete_password: format!("pw{i}"),
                created_on,
                bumped_on,
            })
            .await
            .unwrap();
        for j in 0..replies as i64 {
            repo.insert_reply(NewReply {
                thread_id: thread.id,
                text: format!("reply {i}.{j}"),
                delete_password: format!("rpw{j}"),
                created_on: now - Duration::hours((j * 53 + i * 7) % 600),
            })
            .await
            .unwrap();
        }
        out.push(thread);
    }
    out
}
