//! Integration tests for the registry client against a mock registry

use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::json;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use trellis_core::collaborators::{CredentialStore, NoCredentials};
use trellis_core::error::Error;
use trellis_core::types::{RegistryAuth, RegistryConfig};
use trellis_registry::RegistrySource;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn template_tarball(manifest: &str) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for (entry_path, content) in [
        ("package/template.yaml", manifest),
        ("package/src/index.ts", "export {};\n"),
        ("package/public/index.html", "<!doctype html>\n"),
    ] {
        let mut h = tar::Header::new_gnu();
        h.set_size(content.len() as u64);
        h.set_mode(0o644);
        h.set_cksum();
        builder
            .append_data(&mut h, entry_path, content.as_bytes())
            .unwrap();
    }
    let tar_bytes = builder.into_inner().unwrap();
    let mut enc = GzEncoder::new(Vec::new(), Compression::default());
    enc.write_all(&tar_bytes).unwrap();
    enc.finish().unwrap()
}

fn packument(server_uri: &str, name: &str, versions: &[&str], latest: &str) -> serde_json::Value {
    let mut version_map = serde_json::Map::new();
    for v in versions {
        version_map.insert(
            v.to_string(),
            json!({
                "name": name,
                "version": v,
                "dist": { "tarball": format!("{}/{}/-/{}-{}.tgz", server_uri, name, name, v) }
            }),
        );
    }
    json!({
        "name": name,
        "dist-tags": { "latest": latest },
        "versions": version_map
    })
}

async fn mount_package(server: &MockServer, name: &str, versions: &[&str], latest: &str) {
    let doc = packument(&server.uri(), name, versions, latest);
    Mock::given(method("GET"))
        .and(path(format!("/{}", name)))
        .respond_with(ResponseTemplate::new(200).set_body_json(doc))
        .mount(server)
        .await;

    for v in versions {
        let manifest = format!(
            "id: {}\nname: {}\nversion: {}\ntype: web\n",
            name, name, v
        );
        Mock::given(method("GET"))
            .and(path(format!("/{}/-/{}-{}.tgz", name, name, v)))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(template_tarball(&manifest)))
            .mount(server)
            .await;
    }
}

fn source_for(server: &MockServer) -> RegistrySource {
    let registry = RegistryConfig::public("mock", server.uri());
    RegistrySource::new(vec![registry], Duration::from_secs(5), Arc::new(NoCredentials)).unwrap()
}

#[tokio::test]
async fn fetches_exact_version() {
    let server = MockServer::start().await;
    mount_package(&server, "web-starter", &["1.0.0", "1.1.0"], "1.1.0").await;

    let source = source_for(&server);
    let dest = TempDir::new().unwrap();

    let fetched = source
        .fetch("web-starter", Some("1.0.0"), dest.path())
        .await
        .unwrap();

    assert_eq!(fetched.version, "1.0.0");
    assert_eq!(fetched.registry_id, "mock");
    assert!(dest.path().join("template.yaml").exists());
    assert!(dest.path().join("src/index.ts").exists());
}

#[tokio::test]
async fn resolves_latest_dist_tag_when_version_omitted() {
    let server = MockServer::start().await;
    mount_package(&server, "web-starter", &["1.0.0", "1.1.0"], "1.1.0").await;

    let source = source_for(&server);
    let dest = TempDir::new().unwrap();

    let fetched = source.fetch("web-starter", None, dest.path()).await.unwrap();
    assert_eq!(fetched.version, "1.1.0");
}

#[tokio::test]
async fn missing_version_is_ref_not_found() {
    let server = MockServer::start().await;
    mount_package(&server, "web-starter", &["1.0.0"], "1.0.0").await;

    let source = source_for(&server);
    let dest = TempDir::new().unwrap();

    let err = source
        .fetch("web-starter", Some("9.9.9"), dest.path())
        .await
        .unwrap_err();

    match err {
        Error::RefNotFound { reference, .. } => assert_eq!(reference, "9.9.9"),
        other => panic!("expected RefNotFound, got {:?}", other),
    }
}

#[tokio::test]
async fn missing_package_is_repository_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/no-such-template"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let source = source_for(&server);
    let dest = TempDir::new().unwrap();

    let err = source
        .fetch("no-such-template", None, dest.path())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::RepositoryNotFound { .. }));
}

#[tokio::test]
async fn unauthorized_is_authentication_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/private-template"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let source = source_for(&server);
    let dest = TempDir::new().unwrap();

    let err = source
        .fetch("private-template", None, dest.path())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Authentication { .. }));
}

struct StaticToken(&'static str);

impl CredentialStore for StaticToken {
    fn get(&self, _registry_id: &str) -> Option<String> {
        Some(self.0.to_string())
    }
}

#[tokio::test]
async fn sends_bearer_token_for_authenticated_registry() {
    let server = MockServer::start().await;

    let doc = packument(&server.uri(), "private-template", &["2.0.0"], "2.0.0");
    Mock::given(method("GET"))
        .and(path("/private-template"))
        .and(header("authorization", "Bearer s3cret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(doc))
        .expect(1)
        .mount(&server)
        .await;

    let manifest = "id: private-template\nname: p\nversion: 2.0.0\ntype: web\n";
    Mock::given(method("GET"))
        .and(path("/private-template/-/private-template-2.0.0.tgz"))
        .and(header("authorization", "Bearer s3cret"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(template_tarball(manifest)))
        .expect(1)
        .mount(&server)
        .await;

    let mut registry = RegistryConfig::public("corp", server.uri());
    registry.auth = RegistryAuth::Token {
        credential_id: "corp".to_string(),
    };
    let source = RegistrySource::new(
        vec![registry],
        Duration::from_secs(5),
        Arc::new(StaticToken("s3cret")),
    )
    .unwrap();

    let dest = TempDir::new().unwrap();
    let fetched = source
        .fetch("private-template", None, dest.path())
        .await
        .unwrap();
    assert_eq!(fetched.version, "2.0.0");
}

#[tokio::test]
async fn scoped_package_routes_to_scoped_registry() {
    let scoped_server = MockServer::start().await;
    let public_server = MockServer::start().await;

    // Scoped names are percent-encoded on the wire; the tarball URL is
    // taken verbatim from the packument
    let tarball_url = format!("{}/tarballs/acme-web-1.0.0.tgz", scoped_server.uri());
    let doc = json!({
        "name": "@acme/web",
        "dist-tags": { "latest": "1.0.0" },
        "versions": {
            "1.0.0": { "dist": { "tarball": tarball_url } }
        }
    });
    Mock::given(method("GET"))
        .and(path("/@acme%2Fweb"))
        .respond_with(ResponseTemplate::new(200).set_body_json(doc))
        .mount(&scoped_server)
        .await;
    let manifest = "id: \"@acme/web\"\nname: web\nversion: 1.0.0\ntype: web\n";
    Mock::given(method("GET"))
        .and(path("/tarballs/acme-web-1.0.0.tgz"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(template_tarball(manifest)))
        .mount(&scoped_server)
        .await;

    let mut acme = RegistryConfig::public("acme", scoped_server.uri());
    acme.scope = Some("@acme".to_string());
    let public = RegistryConfig::public("public", public_server.uri());

    let source = RegistrySource::new(
        vec![public, acme],
        Duration::from_secs(5),
        Arc::new(NoCredentials),
    )
    .unwrap();

    let dest = TempDir::new().unwrap();
    let fetched = source.fetch("@acme/web", None, dest.path()).await.unwrap();
    assert_eq!(fetched.registry_id, "acme");

    // The public registry was never consulted
    assert!(public_server.received_requests().await.unwrap().is_empty());
}
