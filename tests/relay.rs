//! End-to-end relay tests: public listener → namespace backend over Unix socket.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    http::{HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{any, get},
    Router,
};
use futures_util::stream;

mod common;

fn named(name: &str) -> Router {
    match name {
        "beta" => Router::new().fallback(|| async {
            (StatusCode::CREATED, [("x-test", "1")], "ok")
        }),
        other => {
            let body = other.to_string();
            Router::new().fallback(move || {
                let body = body.clone();
                async move { body }
            })
        }
    }
}

/// Echoes the path, every `x-` request header and the request body.
async fn echo(uri: Uri, headers: HeaderMap, body: Bytes) -> Response {
    let mut response = Response::new(Body::from(body));
    let out = response.headers_mut();
    out.insert("x-echo-path", uri.to_string().parse().unwrap());
    for (name, value) in headers.iter() {
        if name.as_str().starts_with("x-") {
            out.append(name.clone(), value.clone());
        }
    }
    out.append("x-reply", "one".parse().unwrap());
    out.append("x-reply", "two".parse().unwrap());
    response
}

fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

#[tokio::test]
async fn routes_by_namespace_parameter() {
    let proxy = common::start_proxy(&["alpha", "beta"], "alpha", named).await;
    let client = common::client();

    let res = client.get(proxy.url("/x?ns=beta")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    assert_eq!(res.headers()["x-test"], "1");
    assert_eq!(res.text().await.unwrap(), "ok");

    let res = client.get(proxy.url("/x?ns=alpha")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "alpha");

    proxy.stop().await.unwrap();
}

#[tokio::test]
async fn missing_or_unknown_namespace_uses_default() {
    let proxy = common::start_proxy(&["alpha", "beta"], "alpha", named).await;
    let client = common::client();

    for path in ["/x", "/", "/x?ns=", "/x?ns=gamma", "/x?other=beta"] {
        let res = client.get(proxy.url(path)).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::OK, "path {path}");
        assert_eq!(res.text().await.unwrap(), "alpha", "path {path}");
    }

    // First occurrence decides.
    let res = client.get(proxy.url("/x?ns=beta&ns=alpha")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    proxy.stop().await.unwrap();
}

#[tokio::test]
async fn preserves_method_path_headers_and_body() {
    let proxy = common::start_proxy(&["alpha"], "alpha", |_: &str| {
        Router::new().fallback(echo)
    })
    .await;
    let client = common::client();

    let res = client
        .put(proxy.url("/v2/library/alpine/blobs/uploads/abc?ns=alpha&digest=sha256%3A00"))
        .header("x-multi", "a")
        .header("x-multi", "b")
        .header("x-single", "value")
        .body("payload")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let headers = res.headers();
    assert_eq!(
        headers["x-echo-path"],
        "/v2/library/alpine/blobs/uploads/abc?ns=alpha&digest=sha256%3A00"
    );
    let multi: Vec<_> = headers
        .get_all("x-multi")
        .iter()
        .map(|v| v.to_str().unwrap())
        .collect();
    assert_eq!(multi, vec!["a", "b"]);
    assert_eq!(headers["x-single"], "value");
    let reply: Vec<_> = headers
        .get_all("x-reply")
        .iter()
        .map(|v| v.to_str().unwrap())
        .collect();
    assert_eq!(reply, vec!["one", "two"]);
    assert_eq!(res.text().await.unwrap(), "payload");

    proxy.stop().await.unwrap();
}

#[tokio::test]
async fn large_bodies_are_byte_identical() {
    let proxy = common::start_proxy(&["alpha"], "alpha", |_: &str| {
        Router::new()
            .route("/blob", get(|| async { pattern(1024 * 1024 + 123) }))
            .route("/upload", any(echo))
    })
    .await;
    let client = common::client();

    let res = client.get(proxy.url("/blob")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.bytes().await.unwrap().as_ref(), pattern(1024 * 1024 + 123).as_slice());

    let upload = pattern(300_000);
    let res = client
        .post(proxy.url("/upload"))
        .body(upload.clone())
        .send()
        .await
        .unwrap();
    assert_eq!(res.bytes().await.unwrap().as_ref(), upload.as_slice());

    proxy.stop().await.unwrap();
}

#[tokio::test]
async fn response_streams_before_backend_finishes() {
    let proxy = common::start_proxy(&["alpha"], "alpha", |_: &str| {
        Router::new().fallback(|| async {
            let first = stream::once(async { Ok::<_, std::io::Error>(Bytes::from_static(b"first")) });
            let never = stream::pending::<Result<Bytes, std::io::Error>>();
            Body::from_stream(futures_util::StreamExt::chain(first, never)).into_response()
        })
    })
    .await;
    let client = common::client();

    let mut res = client.get(proxy.url("/stream")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let chunk = tokio::time::timeout(Duration::from_secs(5), res.chunk())
        .await
        .expect("first chunk was held back")
        .unwrap()
        .unwrap();
    assert_eq!(chunk.as_ref(), b"first");

    drop(res);
    proxy.stop().await.unwrap();
}

/// Sets its flag when the backend drops the body it was streaming.
struct ReleaseFlag(Arc<AtomicBool>);

impl Drop for ReleaseFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn caller_disconnect_releases_backend() {
    let released = Arc::new(AtomicBool::new(false));
    let flag = released.clone();
    let proxy = common::start_proxy(&["alpha"], "alpha", move |_: &str| {
        let flag = flag.clone();
        Router::new().fallback(move || {
            let guard = ReleaseFlag(flag.clone());
            async move {
                let first = stream::once(async { Ok::<_, std::io::Error>(Bytes::from_static(b"first")) });
                let held = stream::unfold(guard, |guard| async move {
                    std::future::pending::<()>().await;
                    Some((Ok::<_, std::io::Error>(Bytes::new()), guard))
                });
                Body::from_stream(futures_util::StreamExt::chain(first, held)).into_response()
            }
        })
    })
    .await;
    let client = common::client();

    let mut res = client.get(proxy.url("/stream")).send().await.unwrap();
    let chunk = tokio::time::timeout(Duration::from_secs(5), res.chunk())
        .await
        .expect("first chunk was held back")
        .unwrap()
        .unwrap();
    assert_eq!(chunk.as_ref(), b"first");
    assert!(!released.load(Ordering::SeqCst));

    drop(res);
    drop(client);

    tokio::time::timeout(Duration::from_secs(5), async {
        while !released.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("backend body still held after the caller went away");

    proxy.stop().await.unwrap();
}

#[tokio::test]
async fn unreachable_backend_fails_only_its_namespace() {
    let proxy = common::start_proxy(&["alpha", "beta"], "alpha", named).await;
    let client = common::client();

    std::fs::remove_file(proxy.state_dir.path().join("beta/registry.sock")).unwrap();

    let res = client.get(proxy.url("/x?ns=beta")).send().await.unwrap();
    assert!(res.status().is_server_error());
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);

    let res = client.get(proxy.url("/x?ns=alpha")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "alpha");

    proxy.stop().await.unwrap();
}

#[tokio::test]
async fn concurrent_relays_are_independent() {
    let proxy = common::start_proxy(&["alpha", "beta"], "alpha", named).await;
    let client = common::client();

    let requests = (0..32).map(|i| {
        let client = client.clone();
        let url = if i % 2 == 0 {
            proxy.url("/x?ns=alpha")
        } else {
            proxy.url("/x?ns=beta")
        };
        async move {
            let res = client.get(url).send().await.unwrap();
            (i, res.status(), res.text().await.unwrap())
        }
    });

    for (i, status, body) in futures_util::future::join_all(requests).await {
        if i % 2 == 0 {
            assert_eq!((status, body.as_str()), (StatusCode::OK, "alpha"));
        } else {
            assert_eq!((status, body.as_str()), (StatusCode::CREATED, "ok"));
        }
    }

    proxy.stop().await.unwrap();
}
