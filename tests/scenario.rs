use std::{
    fs,
    process::{Child, Command, Stdio},
    thread::sleep,
    time::{Duration, Instant},
};

use pretty_assertions::assert_eq;
use reqwest::{StatusCode, blocking::Client, header};
use serde_json::{Value, json};
use tempfile::TempDir;

/// A running server process, killed on drop
struct TestServer {
    child: Child,
    port: u16,
    _dir: TempDir,
}

impl TestServer {
    fn start(dir: TempDir) -> Self {
        let port = port_check::free_local_port().expect("no free port");
        let child = Command::new(env!("CARGO_BIN_EXE_rootserve"))
            .arg("--host")
            .arg("127.0.0.1")
            .arg("--port")
            .arg(port.to_string())
            .arg("--dir")
            .arg(dir.path())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("failed to spawn server");

        let server = Self {
            child,
            port,
            _dir: dir,
        };
        server.wait_until_ready();
        server
    }

    fn url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{path}", self.port)
    }

    fn wait_until_ready(&self) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while Instant::now() < deadline {
            if reqwest::blocking::get(self.url("/")).is_ok() {
                return;
            }
            sleep(Duration::from_millis(100));
        }
        panic!("server did not start on port {}", self.port);
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

#[test]
fn upload_move_download_delete_over_http() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().to_path_buf();
    let server = TestServer::start(dir);
    let client = Client::new();

    let resp = client
        .post(server.url("/"))
        .json(&json!({"filename": "/a/b.txt", "content": "aGVsbG8="}))
        .send()
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.json::<Value>().unwrap()["code"], 200);
    assert_eq!(fs::read(root.join("a/b.txt")).unwrap(), b"hello");

    let resp = client
        .get(server.url("/a/b.txt?format=json"))
        .send()
        .unwrap();
    assert_eq!(resp.json::<Value>().unwrap()["data"]["content"], "aGVsbG8=");

    let resp = client
        .put(server.url("/a/b.txt"))
        .json(&json!({"act": "move", "dst": "/c.txt"}))
        .send()
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client.get(server.url("/a/b.txt")).send().unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = client.get(server.url("/c.txt")).send().unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(
        resp.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .starts_with("attachment")
    );
    assert_eq!(resp.bytes().unwrap().as_ref(), b"hello");

    let resp = client.delete(server.url("/")).send().unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = client.delete(server.url("/c.txt")).send().unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(!root.join("c.txt").exists());
}

#[test]
fn head_reports_length_without_body() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("big.bin"), vec![7u8; 4096]).unwrap();
    let server = TestServer::start(dir);

    let resp = Client::new().head(server.url("/big.bin")).send().unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let headers = resp.headers();
    assert_eq!(headers[header::CONTENT_LENGTH], "4096");
    assert_eq!(headers[header::ACCEPT_RANGES], "bytes");
    assert!(
        headers[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .starts_with("attachment")
    );
    assert!(resp.bytes().unwrap().is_empty());
}

#[test]
fn raw_traversal_is_contained() {
    let parent = TempDir::new().unwrap();
    fs::write(parent.path().join("secret.txt"), b"top secret").unwrap();
    let dir = TempDir::new_in(parent.path()).unwrap();
    let server = TestServer::start(dir);

    // An encoded separator is not normalized by the client.
    let resp = reqwest::blocking::get(server.url("/..%2Fsecret.txt")).unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[test]
fn html_listing_over_http() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("photos")).unwrap();
    let server = TestServer::start(dir);

    let resp = reqwest::blocking::get(server.url("/")).unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(
        resp.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/html")
    );
    assert!(resp.text().unwrap().contains("photos"));
}
