use crate::*;
use filedeck::error::{Error, Result};
use filedeck::manager::FileManager;
use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use serde_json::{Value, json};
use std::net::SocketAddr;
use tokio::net::TcpListener;

pub fn tests(backend: &TestBackend, tests: &mut Vec<Trial>) {
    tests.extend(async_trials!(
        backend,
        test_http_trash_round_trip,
        test_http_error_statuses,
        test_http_create_and_download,
        test_http_allows_cross_origin,
        test_http_create_trims_filename
    ));
}

fn http_err(e: reqwest::Error) -> Error {
    Error::from(std::io::Error::other(e))
}

/// Serve the router on an ephemeral port for the duration of one trial.
struct TestServer {
    addr: SocketAddr,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<Result<()>>,
}

impl TestServer {
    async fn start(manager: FileManager) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let handle = tokio::spawn(filedeck::server::serve(listener, manager));
        Ok(Self {
            addr,
            client: reqwest::Client::new(),
            handle,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    async fn json(&self, request: reqwest::RequestBuilder) -> Result<(StatusCode, Value)> {
        let response = request.send().await.map_err(http_err)?;
        let status = response.status();
        let body = response.json::<Value>().await.map_err(http_err)?;
        Ok((status, body))
    }

    async fn get_json(&self, path: &str) -> Result<(StatusCode, Value)> {
        self.json(self.client.get(self.url(path))).await
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn names(listing: &Value) -> Vec<String> {
    listing
        .as_array()
        .map(|entries| {
            entries
                .iter()
                .filter_map(|e| e["name"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

async fn test_http_trash_round_trip(manager: FileManager) -> Result<()> {
    let server = TestServer::start(manager).await?;
    let token = TEST_FIXTURE.new_token();
    let name = TEST_FIXTURE.new_name(&token, "a.txt");

    let form = Form::new().part(
        "file",
        Part::bytes(b"hi".to_vec())
            .file_name(name.clone())
            .mime_str("text/plain")
            .map_err(http_err)?,
    );
    let (status, body) = server
        .json(server.client.post(server.url("/upload")).multipart(form))
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], format!("{name} uploaded successfully"));

    let (status, files) = server.get_json(&format!("/files?search={token}")).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(names(&files), vec![name.clone()]);
    assert_eq!(files[0]["type"], "txt");
    assert_eq!(files[0]["size"], 2);

    let (status, body) = server
        .json(server.client.delete(server.url(&format!("/delete/{name}"))))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "deleted");

    let (_, files) = server.get_json(&format!("/files?search={token}")).await?;
    assert!(names(&files).is_empty());
    let (status, trash) = server.get_json(&format!("/trash?search={token}")).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(names(&trash), vec![name.clone()]);
    assert_eq!(trash[0]["size"], 2);
    assert!(trash[0]["date_deleted"].is_string());

    let (status, body) = server
        .json(server.client.put(server.url(&format!("/restore/{name}"))))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "restored");

    let (_, files) = server.get_json(&format!("/files?search={token}")).await?;
    assert_eq!(names(&files), vec![name.clone()]);
    let (_, trash) = server.get_json(&format!("/trash?search={token}")).await?;
    assert!(names(&trash).is_empty());

    Ok(())
}

async fn test_http_error_statuses(manager: FileManager) -> Result<()> {
    let server = TestServer::start(manager).await?;
    let token = TEST_FIXTURE.new_token();
    let ghost = TEST_FIXTURE.new_name(&token, "ghost.txt");

    let (status, _) = server
        .json(server.client.delete(server.url(&format!("/delete/{ghost}"))))
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = server
        .json(server.client.put(server.url(&format!("/restore/{ghost}"))))
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = server
        .json(server.client.delete(server.url(&format!("/delete-permanent/{ghost}"))))
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = server
        .json(
            server
                .client
                .put(server.url("/rename"))
                .json(&json!({ "old_name": ghost })),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Both old and new file names are required");

    let a = TEST_FIXTURE.new_name(&token, "a.txt");
    let b = TEST_FIXTURE.new_name(&token, "b.txt");
    for name in [&a, &b] {
        let (status, _) = server
            .json(
                server
                    .client
                    .post(server.url("/create-file"))
                    .json(&json!({ "filename": name, "content": "x" })),
            )
            .await?;
        assert_eq!(status, StatusCode::CREATED);
    }
    let (status, _) = server
        .json(
            server
                .client
                .put(server.url("/rename"))
                .json(&json!({ "old_name": a, "new_name": b })),
        )
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = server
        .json(
            server
                .client
                .put(server.url("/rename"))
                .json(&json!({ "old_name": ghost, "new_name": TEST_FIXTURE.new_name(&token, "c.txt") })),
        )
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = server
        .json(
            server
                .client
                .post(server.url("/create-file"))
                .json(&json!({ "content": "no name" })),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Filename is required");

    let (status, body) = server
        .json(
            server
                .client
                .post(server.url("/upload"))
                .multipart(Form::new().text("note", "no file here")),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No file uploaded");

    Ok(())
}

async fn test_http_create_and_download(manager: FileManager) -> Result<()> {
    let server = TestServer::start(manager).await?;
    let token = TEST_FIXTURE.new_token();
    let name = TEST_FIXTURE.new_name(&token, "readme.md");

    let (status, body) = server
        .json(
            server
                .client
                .post(server.url("/create-file"))
                .json(&json!({ "filename": name, "content": "# Title\n" })),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "File created successfully!");

    let response = server
        .client
        .get(server.url(&format!("/download/{name}")))
        .send()
        .await
        .map_err(http_err)?;
    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response
        .headers()
        .get(reqwest::header::CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert_eq!(disposition, format!("attachment; filename=\"{name}\""));
    let bytes = response.bytes().await.map_err(http_err)?;
    assert_eq!(bytes.as_ref(), b"# Title\n");

    let (status, _) = server
        .get_json(&format!("/download/{}", TEST_FIXTURE.new_name(&token, "nope.md")))
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    Ok(())
}

async fn test_http_allows_cross_origin(manager: FileManager) -> Result<()> {
    let server = TestServer::start(manager).await?;

    let response = server
        .client
        .get(server.url("/files"))
        .header(reqwest::header::ORIGIN, "http://localhost:3000")
        .send()
        .await
        .map_err(http_err)?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key(reqwest::header::ACCESS_CONTROL_ALLOW_ORIGIN)
    );

    let response = server
        .client
        .request(reqwest::Method::OPTIONS, server.url("/rename"))
        .header(reqwest::header::ORIGIN, "http://localhost:3000")
        .header(reqwest::header::ACCESS_CONTROL_REQUEST_METHOD, "PUT")
        .send()
        .await
        .map_err(http_err)?;
    assert!(response.status().is_success());
    assert!(
        response
            .headers()
            .contains_key(reqwest::header::ACCESS_CONTROL_ALLOW_METHODS)
    );
    Ok(())
}

async fn test_http_create_trims_filename(manager: FileManager) -> Result<()> {
    let server = TestServer::start(manager).await?;
    let token = TEST_FIXTURE.new_token();
    let name = TEST_FIXTURE.new_name(&token, "padded.txt");

    let (status, _) = server
        .json(
            server
                .client
                .post(server.url("/create-file"))
                .json(&json!({ "filename": format!("  {name} "), "content": "x" })),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);

    let (_, files) = server.get_json(&format!("/files?search={token}")).await?;
    assert_eq!(names(&files), vec![name]);
    Ok(())
}
