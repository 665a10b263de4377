#![cfg(feature = "inmem-store")]

mod common;

use actix_web::{test, web, App};
use anonboard::config;
use common::{seed_threads, state, BOARD};
use serde_json::Value;

macro_rules! app {
    ($state:expr) => {
        test::init_service(App::new().app_data(web::Data::new($state)).configure(config)).await
    };
}

async fn text_of(resp: actix_web::dev::ServiceResponse) -> String {
    String::from_utf8(test::read_body(resp).await.to_vec()).unwrap()
}

#[actix_web::test]
async fn test_thread_create_report_delete_flow() {
    let (state, _repo) = state();
    let app = app!(state);

    // create thread
    let req = test::TestRequest::post()
        .uri(&format!("/api/threads/{BOARD}"))
        .set_form([("text", "test test"), ("delete_password", "123abc")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let thread: Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    for field in ["_id", "created_on", "bumped_on", "text", "delete_password", "reported", "board", "replies"] {
        assert!(thread.get(field).is_some(), "missing {field}");
    }
    assert_eq!(thread["text"], "test test");
    assert_eq!(thread["board"], BOARD);
    assert_eq!(thread["reported"], false);
    assert_eq!(thread["replies"].as_array().unwrap().len(), 0);
    let id = thread["_id"].as_i64().unwrap();

    // report it
    let req = test::TestRequest::put()
        .uri(&format!("/api/threads/{BOARD}"))
        .set_form([("report_id", id.to_string())])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(text_of(resp).await, "reported");

    // re-fetch shows the flag, never the password
    let req = test::TestRequest::get().uri(&format!("/api/replies/{BOARD}?thread_id={id}")).to_request();
    let fetched: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(fetched["reported"], true);
    assert!(fetched.get("delete_password").is_none());

    // wrong password
    let req = test::TestRequest::delete()
        .uri(&format!("/api/threads/{BOARD}"))
        .set_form([("thread_id", id.to_string()), ("delete_password", "wrongpassword".to_string())])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(text_of(resp).await, "incorrect password");

    // right password
    let req = test::TestRequest::delete()
        .uri(&format!("/api/threads/{BOARD}"))
        .set_form([("thread_id", id.to_string()), ("delete_password", "123abc".to_string())])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(text_of(resp).await, "success");

    // gone: empty object sentinel
    let req = test::TestRequest::get().uri(&format!("/api/replies/{BOARD}?thread_id={id}")).to_request();
    let fetched: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(fetched, serde_json::json!({}));
}

#[actix_web::test]
async fn test_list_threads_limits_and_order() {
    let (state, repo) = state();
    seed_threads(repo.as_ref(), BOARD, 12, 5).await;
    seed_threads(repo.as_ref(), "elsewhere", 3, 1).await;
    let app = app!(state);

    let req = test::TestRequest::get().uri(&format!("/api/threads/{BOARD}")).to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    let threads: Vec<Value> = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    assert_eq!(threads.len(), 10);

    let ts = |v: &Value, k: &str| chrono::DateTime::parse_from_rfc3339(v[k].as_str().unwrap()).unwrap();
    for pair in threads.windows(2) {
        assert!(ts(&pair[0], "bumped_on") >= ts(&pair[1], "bumped_on"));
    }
    for t in &threads {
        assert_eq!(t["board"], BOARD);
        assert!(t.get("delete_password").is_none());
        let replies = t["replies"].as_array().unwrap();
        assert_eq!(replies.len(), 3);
        for pair in replies.windows(2) {
            assert!(ts(&pair[0], "created_on") >= ts(&pair[1], "created_on"));
        }
        assert!(replies.iter().all(|r| r.get("delete_password").is_none()));
    }
}

#[actix_web::test]
async fn test_reply_flow() {
    let (state, repo) = state();
    let seeded = seed_threads(repo.as_ref(), BOARD, 2, 0).await;
    let thread_id = seeded[0].id;
    let app = app!(state);

    // create reply
    let req = test::TestRequest::post()
        .uri(&format!("/api/replies/{BOARD}"))
        .set_form([("thread_id", thread_id.to_string()), ("text", "reply text".into()), ("delete_password", "123abc".into())])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let reply: Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    for field in ["_id", "created_on", "text", "delete_password", "reported"] {
        assert!(reply.get(field).is_some(), "missing {field}");
    }
    let reply_id = reply["_id"].as_i64().unwrap();

    // thread view contains it and was bumped to the reply's timestamp
    let req = test::TestRequest::get().uri(&format!("/api/replies/{BOARD}?thread_id={thread_id}")).to_request();
    let thread: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(thread["bumped_on"], reply["created_on"]);
    assert!(thread["replies"].as_array().unwrap().iter().any(|r| r["_id"] == reply_id));

    // bumped thread is now first in the listing
    let req = test::TestRequest::get().uri(&format!("/api/threads/{BOARD}")).to_request();
    let threads: Vec<Value> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(threads[0]["_id"], thread_id);

    let form = |pw: &str| {
        [("thread_id", thread_id.to_string()), ("reply_id", reply_id.to_string()), ("delete_password", pw.to_string())]
    };

    // wrong password
    let req = test::TestRequest::delete().uri(&format!("/api/replies/{BOARD}")).set_form(form("wrongpassword")).to_request();
    assert_eq!(text_of(test::call_service(&app, req).await).await, "incorrect password");

    // report
    let req = test::TestRequest::put()
        .uri(&format!("/api/replies/{BOARD}"))
        .set_form([("thread_id", thread_id.to_string()), ("reply_id", reply_id.to_string())])
        .to_request();
    assert_eq!(text_of(test::call_service(&app, req).await).await, "reported");

    // right password
    let req = test::TestRequest::delete().uri(&format!("/api/replies/{BOARD}")).set_form(form("123abc")).to_request();
    assert_eq!(text_of(test::call_service(&app, req).await).await, "success");

    // tombstone stays visible
    let req = test::TestRequest::get().uri(&format!("/api/replies/{BOARD}?thread_id={thread_id}")).to_request();
    let thread: Value = test::call_and_read_body_json(&app, req).await;
    let replies = thread["replies"].as_array().unwrap();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0]["text"], "[deleted]");
    assert_eq!(replies[0]["reported"], true);
}

#[actix_web::test]
async fn test_reply_to_unknown_thread() {
    let (state, _repo) = state();
    let app = app!(state);

    let req = test::TestRequest::post()
        .uri(&format!("/api/replies/{BOARD}"))
        .set_form([("thread_id", "999"), ("text", "hi"), ("delete_password", "x")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(text_of(resp).await, "thread not found");
}

#[actix_web::test]
async fn test_json_bodies_are_accepted() {
    let (state, _repo) = state();
    let app = app!(state);

    let req = test::TestRequest::post()
        .uri("/api/threads/json")
        .set_json(serde_json::json!({"text": "from json", "delete_password": "pw"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let thread: Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();

    let req = test::TestRequest::put()
        .uri("/api/threads/json")
        .set_json(serde_json::json!({"report_id": thread["_id"]}))
        .to_request();
    assert_eq!(text_of(test::call_service(&app, req).await).await, "reported");
}
