use crate::models::{CreatedThread, Reply, ReplyView, Thread, ThreadView};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::list_threads,
        crate::routes::create_thread,
        crate::routes::delete_thread,
        crate::routes::report_thread,
        crate::routes::get_replies,
        crate::routes::create_reply,
        crate::routes::delete_reply,
        crate::routes::report_reply,
    ),
    components(schemas(Thread, CreatedThread, ThreadView, Reply, ReplyView)),
    tags(
        (name = "threads", description = "Thread operations"),
        (name = "replies", description = "Reply operations"),
    )
)]
pub struct ApiDoc;
