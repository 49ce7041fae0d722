mod common;

use std::time::Duration;

use bytes::Bytes;
use futures::StreamExt;
use http::{Method, Request, StatusCode};
use http_body_util::Full;
use tsu_bridge::{Config, Error, Router, Routes, handler_fn};

use common::{body_string, channel_request, request};

#[tokio::test]
async fn params_come_from_the_matched_pattern() {
    let app = Router::new();
    app.get("/users/:id/posts/:post", handler_fn(|c| Box::pin(async move {
        let body = format!("{} {} {}", c.route_path(), c.params("id"), c.params("post"));
        c.text(body);
        Ok(())
    })));

    let res = app.test(request(Method::GET, "/users/7/posts/hello"), None).await.unwrap();
    assert_eq!(res.headers()["content-type"], "text/plain; charset=utf-8");
    assert_eq!(body_string(res).await, "/users/:id/posts/:post 7 hello");
}

#[tokio::test]
async fn unmatched_request_is_404_with_method_and_path() {
    let app = Router::new();
    app.get("/known", handler_fn(|_c| Box::pin(async { Ok(()) })));

    let res = app.test(request(Method::GET, "/nope"), None).await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_string(res).await, "Cannot GET /nope");

    let res = app.test(request(Method::POST, "/known"), None).await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_string(res).await, "Cannot POST /known");
}

#[tokio::test]
async fn middleware_runs_in_order_around_the_route() {
    let app = Router::new();
    app.middleware(handler_fn(|c| Box::pin(async move {
        c.body_writer().extend_from_slice(b"[outer ");
        let result = c.next().await;
        c.body_writer().extend_from_slice(b" outer]");
        result
    })));
    app.middleware(handler_fn(|c| Box::pin(async move {
        c.set_local("user", String::from("ada"));
        c.next().await
    })));
    app.get("/", handler_fn(|c| Box::pin(async move {
        let user = c.local_as::<String>("user").cloned().unwrap_or_default();
        c.body_writer().extend_from_slice(user.as_bytes());
        Ok(())
    })));

    let res = app.test(request(Method::GET, "/"), None).await.unwrap();
    assert_eq!(body_string(res).await, "[outer ada outer]");
}

#[tokio::test]
async fn set_local_replaces_previous_value() {
    let app = Router::new();
    app.get("/", handler_fn(|c| Box::pin(async move {
        c.set_local("n", 1u32);
        c.set_local("n", 2u32);
        let mut seen = Vec::new();
        c.visit_locals(|k, v| seen.push(format!("{k}={}", v.downcast_ref::<u32>().copied().unwrap_or(0))));
        c.text(seen.join(","));
        Ok(())
    })));

    let res = app.test(request(Method::GET, "/"), None).await.unwrap();
    assert_eq!(body_string(res).await, "n=2");
}

#[tokio::test]
async fn groups_prefix_their_routes() {
    let app = Router::new();
    let v1 = app.group("/api/").group("v1");
    v1.get("/things/:id", handler_fn(|c| Box::pin(async move {
        let body = c.route_path().to_owned();
        c.text(body);
        Ok(())
    })));

    assert_eq!(v1.prefix(), "/api/v1");
    let res = app.test(request(Method::GET, "/api/v1/things/1"), None).await.unwrap();
    assert_eq!(body_string(res).await, "/api/v1/things/:id");
}

#[tokio::test]
async fn oversized_buffered_body_is_rejected() {
    let app = Router::with_config(Config { body_limit: 4, ..Config::default() });
    app.post("/", handler_fn(|_c| Box::pin(async { Ok(()) })));

    let req = Request::builder()
        .method(Method::POST)
        .uri("/")
        .body(Full::new(Bytes::from_static(b"too long")))
        .unwrap();
    let res = app.test(req, None).await.unwrap();
    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn buffered_body_is_available_raw() {
    let app = Router::new();
    app.post("/echo", handler_fn(|c| Box::pin(async move {
        let body = c.body_raw().to_vec();
        c.status(202).send(tsu_bridge::ContentType::OctetStream, body);
        Ok(())
    })));

    let req = Request::builder()
        .method(Method::POST)
        .uri("/echo")
        .body(Full::new(Bytes::from_static(b"payload")))
        .unwrap();
    let res = app.test(req, None).await.unwrap();
    assert_eq!(res.status(), StatusCode::ACCEPTED);
    assert_eq!(res.headers()["content-type"], "application/octet-stream");
    assert_eq!(body_string(res).await, "payload");
}

#[tokio::test]
async fn json_helper_serialises() {
    #[derive(serde::Serialize)]
    struct Widget { id: u32, name: &'static str }

    let app = Router::new();
    app.get("/w", handler_fn(|c| Box::pin(async move {
        c.json(&Widget { id: 1, name: "gear" })
    })));

    let res = app.test(request(Method::GET, "/w"), None).await.unwrap();
    assert_eq!(res.headers()["content-type"], "application/json");
    assert_eq!(body_string(res).await, r#"{"id":1,"name":"gear"}"#);
}

#[tokio::test]
async fn test_times_out_slow_handlers() {
    let app = Router::new();
    app.get("/slow", handler_fn(|_c| Box::pin(async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(())
    })));

    let err = app.test(request(Method::GET, "/slow"), Some(Duration::from_millis(10))).await.unwrap_err();
    assert!(matches!(err, Error::Timeout(_)));
}

#[tokio::test]
async fn zero_timeout_waits_for_completion() {
    let app = Router::new();
    app.get("/slowish", handler_fn(|c| Box::pin(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        c.text("done");
        Ok(())
    })));

    let res = app.test(request(Method::GET, "/slowish"), Some(Duration::ZERO)).await.unwrap();
    assert_eq!(body_string(res).await, "done");
}

#[tokio::test]
async fn scope_is_cancelled_once_the_request_ends() {
    let app = Router::new();
    let (tx, rx) = tokio::sync::oneshot::channel();
    let tx = parking_lot::Mutex::new(Some(tx));
    app.get("/", handler_fn(move |c| {
        let scope = c.context().clone();
        if let Some(tx) = tx.lock().take() {
            let _ = tx.send(scope);
        }
        Box::pin(async { Ok(()) })
    }));

    app.test(request(Method::GET, "/"), None).await.unwrap();

    let scope = rx.await.unwrap();
    assert!(scope.is_cancelled());
    scope.cancelled().await;
}

#[tokio::test]
async fn body_stream_exists_only_when_streaming() {
    async fn run(app: Router) -> String {
        app.post("/", handler_fn(|c| Box::pin(async move {
            let mut chunks = Vec::new();
            match c.body_stream() {
                Some(stream) => {
                    while let Some(chunk) = stream.next().await {
                        chunks.push(String::from_utf8_lossy(&chunk?).into_owned());
                    }
                }
                None => chunks.push("buffered".to_owned()),
            }
            c.text(chunks.join(","));
            Ok(())
        })));

        let (tx, req) = channel_request("/");
        tx.unbounded_send(Bytes::from_static(b"ab")).unwrap();
        tx.unbounded_send(Bytes::from_static(b"cd")).unwrap();
        drop(tx);
        body_string(app.test(req, None).await.unwrap()).await
    }

    let streaming = Router::with_config(Config { stream_request_body: true, ..Config::default() });
    assert_eq!(run(streaming).await, "ab,cd");
    assert_eq!(run(Router::new()).await, "buffered");
}

#[tokio::test]
async fn middleware_sees_headers_written_downstream() {
    let app = Router::new();
    app.middleware(handler_fn(|c| Box::pin(async move {
        c.next().await?;
        let tagged = c.response_headers().contains_key("x-route");
        c.set("x-seen-by-middleware", if tagged { "yes" } else { "no" });
        Ok(())
    })));
    app.get("/", handler_fn(|c| Box::pin(async move {
        c.set("x-route", "root");
        Ok(())
    })));

    let res = app.test(request(Method::GET, "/"), None).await.unwrap();
    assert_eq!(res.headers()["x-seen-by-middleware"], "yes");
}
