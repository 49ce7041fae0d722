//! Minimal tsu-bridge example: a couple of API operations, a native route
//! and panic recovery.
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/widgets/42
//!   curl -X POST http://localhost:3000/widgets -d 'gear'
//!   curl http://localhost:3000/explode
//!   curl http://localhost:3000/healthz

use std::io::Write;

use http::Method;
use tokio::io::AsyncReadExt;
use tsu_bridge::api::{Context, Operation};
use tsu_bridge::{Router, Routes, Server, adapter, api, handler_fn, middleware};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let app = Router::new();
    app.middleware(middleware::recover());
    app.get("/healthz", handler_fn(|c| Box::pin(async move {
        c.text("ok");
        Ok(())
    })));

    let mut api = adapter::new(&app, api::Config::new("Widgets", "1.0.0"));

    api.register(
        Operation::new(Method::GET, "/widgets/{id}").id("get-widget").tag("widgets"),
        |ctx| Box::pin(async move {
            let body = format!(r#"{{"id":"{}","name":"gear"}}"#, ctx.param("id"));
            ctx.set_header("content-type", "application/json");
            let _ = ctx.body_writer().write_all(body.as_bytes());
        }),
    );

    api.register(
        Operation::new(Method::POST, "/widgets").id("create-widget").tag("widgets"),
        |ctx| Box::pin(async move {
            let mut name = String::new();
            if ctx.body_reader().read_to_string(&mut name).await.is_err() || name.is_empty() {
                ctx.set_status(400);
                return;
            }
            ctx.set_status(201);
            ctx.set_header("content-type", "application/json");
            let _ = write!(ctx.body_writer(), r#"{{"name":"{}"}}"#, name.trim());
        }),
    );

    api.register(Operation::new(Method::GET, "/explode").id("explode"), |ctx| Box::pin(async move {
        explode(ctx);
    }));

    if let Err(e) = Server::bind("0.0.0.0:3000").serve(app).await {
        eprintln!("server error: {e}");
    }
}

fn explode(_ctx: &mut dyn Context) {
    panic!("recovered by middleware::recover");
}
