use std::{convert::Infallible, fs, io::Write, str, time::Duration};

use http::{header, Method, Request, Response, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper_static_chain::{ConfigError, FromService, Static, StaticConfig, TokioFileOpener};
use tempfile::TempDir;

type FallbackFuture = std::future::Ready<Result<Response<Full<Bytes>>, Infallible>>;

/// Marks responses produced by the next handler.
fn fallback(req: Request<()>) -> FallbackFuture {
    let mut res = Response::new(Full::new(Bytes::from(format!(
        "fallback for {} {}",
        req.method(),
        req.uri().path()
    ))));
    *res.status_mut() = StatusCode::IM_A_TEAPOT;
    std::future::ready(Ok(res))
}

type Stage = Static<TokioFileOpener, fn(Request<()>) -> FallbackFuture>;

struct Harness {
    _dir: TempDir,
    static_: Stage,
}

impl Harness {
    fn new(files: Vec<(&str, &str)>) -> Harness {
        let dir = TempDir::new().unwrap();
        for (subpath, contents) in files {
            let fullpath = dir.path().join(subpath);
            if subpath.ends_with('/') {
                fs::create_dir_all(&fullpath).expect("failed to create fixture dir");
                continue;
            }
            fs::create_dir_all(fullpath.parent().unwrap())
                .and_then(|_| fs::File::create(fullpath))
                .and_then(|mut file| file.write_all(contents.as_bytes()))
                .expect("failed to write fixtures");
        }

        let mut static_ = Static::new(dir.path())
            .next(fallback as fn(Request<()>) -> FallbackFuture);
        static_.cache_headers(Some(3600));

        Harness { _dir: dir, static_ }
    }

    fn with_prefix(mut self, prefix: &str) -> Self {
        self.static_.prefix(prefix);
        self
    }

    async fn request(&self, req: Request<()>) -> Response<Bytes> {
        let res = self.static_.clone().serve(req).await.expect("serve failed");
        let (parts, body) = res.into_parts();
        let body = body.collect().await.expect("body failed").to_bytes();
        Response::from_parts(parts, body)
    }

    async fn get(&self, path: &str) -> Response<Bytes> {
        let req = Request::get(path).body(()).expect("unable to build request");
        self.request(req).await
    }
}

fn body_str(res: &Response<Bytes>) -> &str {
    str::from_utf8(res.body()).unwrap()
}

fn assert_delegated(res: &Response<Bytes>) {
    assert_eq!(res.status(), StatusCode::IM_A_TEAPOT);
    assert!(body_str(res).starts_with("fallback for"));
}

#[tokio::test]
async fn serves_regular_file() {
    let harness = Harness::new(vec![("css/app.css", "body {}")]);
    let res = harness.get("/css/app.css").await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()[header::CONTENT_TYPE], "text/css");
    assert!(res.headers().contains_key(header::LAST_MODIFIED));
    assert_eq!(body_str(&res), "body {}");
}

#[tokio::test]
async fn serves_default_file_from_root() {
    let harness = Harness::new(vec![("index.html", "this is index")]);
    let res = harness.get("/").await;
    assert_eq!(body_str(&res), "this is index");
}

#[tokio::test]
async fn serves_directory_index() {
    let harness = Harness::new(vec![("docs/index.html", "docs index")]);
    let res = harness.get("/docs/").await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()[header::CONTENT_TYPE], "text/html");
    assert_eq!(body_str(&res), "docs index");
}

#[tokio::test]
async fn redirects_if_trailing_slash_is_missing() {
    let harness = Harness::new(vec![("docs/index.html", "docs index")]);
    let res = harness.get("/docs").await;
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(res.headers()[header::LOCATION], "/docs/");
    assert!(res.body().is_empty());

    let res = harness.get("/docs?page=2").await;
    assert_eq!(res.headers()[header::LOCATION], "/docs/?page=2");
}

#[tokio::test]
async fn serves_configured_index_file() {
    let mut harness = Harness::new(vec![
        ("docs/default.htm", "default page"),
        ("docs/index.html", "index page"),
    ]);

    harness.static_.index_file("default.htm").unwrap();
    assert_eq!(body_str(&harness.get("/docs/").await), "default page");

    harness.static_.index_file("").unwrap();
    assert_eq!(body_str(&harness.get("/docs/").await), "index page");
}

#[tokio::test]
async fn rejects_index_file_outside_directory() {
    let outside = TempDir::new().unwrap();
    let secret = outside.path().join("secret.txt");
    fs::write(&secret, "top secret").unwrap();

    let mut harness = Harness::new(vec![("docs/", ""), ("docs/index.html", "index page")]);
    let secret = secret.to_str().unwrap().to_owned();
    for value in [secret.as_str(), "../secret.txt", "a/index.html", ".."] {
        let err = harness.static_.index_file(value).err();
        assert_eq!(
            err,
            Some(ConfigError::InvalidIndexFile {
                value: value.to_owned()
            })
        );
    }

    let res = harness.get("/docs/").await;
    assert_eq!(body_str(&res), "index page");
}

#[tokio::test]
async fn redirects_to_same_host() {
    let harness = Harness::new(vec![("evil.example/index.html", "")]);
    let res = harness.get("//evil.example").await;
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(res.headers()[header::LOCATION], "/evil.example/");
}

#[tokio::test]
async fn delegates_directory_without_index() {
    let harness = Harness::new(vec![("emptydir/", "")]);
    assert_delegated(&harness.get("/emptydir/").await);
}

#[tokio::test]
async fn delegates_missing_file_repeatedly() {
    let harness = Harness::new(vec![("file1.html", "this is file1")]);
    for _ in 0..3 {
        let res = harness.get("/missing.txt").await;
        assert_delegated(&res);
        assert_eq!(body_str(&res), "fallback for GET /missing.txt");
    }
}

#[tokio::test]
async fn delegates_other_methods() {
    let harness = Harness::new(vec![("file1.html", "this is file1")]);
    for method in [Method::POST, Method::PUT, Method::DELETE, Method::PATCH] {
        let req = Request::builder()
            .method(method.clone())
            .uri("/file1.html")
            .body(())
            .unwrap();
        let res = harness.request(req).await;
        assert_delegated(&res);
        assert_eq!(body_str(&res), format!("fallback for {method} /file1.html"));
    }
}

#[tokio::test]
async fn head_sends_headers_only() {
    let harness = Harness::new(vec![("file1.html", "this is file1")]);
    let req = Request::head("/file1.html").body(()).unwrap();
    let res = harness.request(req).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()[header::CONTENT_LENGTH], "13");
    assert!(res.body().is_empty());
}

#[tokio::test]
async fn filters_on_prefix() {
    let harness =
        Harness::new(vec![("image.png", "png"), ("index.html", "root")]).with_prefix("/static");

    let res = harness.get("/static/image.png").await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_str(&res), "png");

    assert_delegated(&harness.get("/staticimage.png").await);
    assert_delegated(&harness.get("/image.png").await);

    let res = harness.get("/static").await;
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(res.headers()[header::LOCATION], "/static/");

    let res = harness.get("/static/").await;
    assert_eq!(body_str(&res), "root");
}

#[tokio::test]
async fn decodes_percent_notation() {
    let harness = Harness::new(vec![("has space.html", "file with funky chars")]);
    let res = harness.get("/has%20space.html").await;
    assert_eq!(body_str(&res), "file with funky chars");
}

#[tokio::test]
async fn normalizes_path() {
    let harness = Harness::new(vec![("index.html", "this is index")]);
    let res = harness.get("/xxx/../index.html").await;
    assert_eq!(body_str(&res), "this is index");
}

#[tokio::test]
async fn prevents_from_escaping_root() {
    let harness = Harness::new(vec![("file1.html", "this is file1")]);
    for path in ["/../file1.html", "/..%2ffile1.html", "/xxx/..%2f..%2ffile1.html"] {
        let res = harness.get(path).await;
        assert_eq!(body_str(&res), "this is file1", "{path}");
    }
}

#[tokio::test]
async fn sends_headers() {
    let harness = Harness::new(vec![("file1.html", "this is file1")]);
    let res = harness.get("/file1.html").await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()[header::CONTENT_LENGTH], "13");
    assert!(res.headers().contains_key(header::LAST_MODIFIED));
    assert!(res.headers().contains_key(header::ETAG));
    assert_eq!(
        res.headers()[header::CACHE_CONTROL],
        "public, max-age=3600"
    );
    assert_eq!(res.headers()[header::CONTENT_TYPE], "text/html");
}

#[tokio::test]
async fn serves_file_with_old_if_modified_since() {
    let harness = Harness::new(vec![("file1.html", "this is file1")]);
    let if_modified =
        httpdate::fmt_http_date(std::time::SystemTime::now() - Duration::from_secs(3600));
    let req = Request::get("/file1.html")
        .header(header::IF_MODIFIED_SINCE, if_modified)
        .body(())
        .unwrap();
    let res = harness.request(req).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_str(&res), "this is file1");
}

#[tokio::test]
async fn serves_file_with_new_if_modified_since() {
    let harness = Harness::new(vec![("file1.html", "this is file1")]);
    let if_modified =
        httpdate::fmt_http_date(std::time::SystemTime::now() + Duration::from_secs(3600));
    let req = Request::get("/file1.html")
        .header(header::IF_MODIFIED_SINCE, if_modified)
        .body(())
        .unwrap();
    let res = harness.request(req).await;
    assert_eq!(res.status(), StatusCode::NOT_MODIFIED);
    assert!(res.body().is_empty());
}

#[tokio::test]
async fn serves_requested_range() {
    let harness = Harness::new(vec![("file1.html", "this is file1")]);
    let req = Request::get("/file1.html")
        .header(header::RANGE, "bytes=8-11")
        .body(())
        .unwrap();
    let res = harness.request(req).await;
    assert_eq!(res.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(res.headers()[header::CONTENT_RANGE], "bytes 8-11/13");
    assert_eq!(body_str(&res), "file");
}

#[tokio::test]
async fn default_next_handler_responds_not_found() {
    let dir = TempDir::new().unwrap();
    let static_ = Static::new(dir.path());

    let res = static_
        .clone()
        .serve(Request::get("/missing").body(()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = static_
        .serve(Request::post("/missing").body(()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn chains_static_stages() {
    let assets = TempDir::new().unwrap();
    fs::write(assets.path().join("app.js"), "js").unwrap();
    let public = TempDir::new().unwrap();
    fs::write(public.path().join("robots.txt"), "robots").unwrap();

    let config = StaticConfig {
        prefix: "/assets".to_owned(),
        ..StaticConfig::default()
    };
    let inner = Static::new(public.path());
    let outer = Static::from_config(TokioFileOpener::new(assets.path()), config)
        .unwrap()
        .next(FromService(inner));

    for (path, expected) in [("/assets/app.js", "js"), ("/robots.txt", "robots")] {
        let res = outer
            .clone()
            .serve(Request::get(path).body(()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK, "{path}");
        let body = res.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], expected.as_bytes());
    }
}
