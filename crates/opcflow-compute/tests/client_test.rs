//! REST client tests against a mock compute API

use opcflow_compute::{
    ComputeClient, ComputeConfig, ResourceKind, SshKey, lookup_ssh_key,
};
use opcflow_reconcile::{
    CallContext, FieldValue, Lookup, ReconcileError, RemoteError, TypedResource, attributes,
};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PREFIX: &str = "/Compute-acme/jo";

async fn setup() -> (MockServer, Arc<ComputeClient>) {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/authenticate/"))
        .and(body_partial_json(json!({"user": PREFIX, "password": "secret"})))
        .respond_with(ResponseTemplate::new(204).insert_header("set-cookie", "nimbula=abc; Path=/"))
        .mount(&server)
        .await;

    let config = ComputeConfig {
        endpoint: server.uri(),
        identity_domain: "acme".to_string(),
        user: "jo".to_string(),
        password: "secret".to_string(),
        timeout: None,
    };
    let client = Arc::new(ComputeClient::new(config).unwrap());
    (server, client)
}

fn ssh_key_body(name: &str, key: &str) -> Value {
    json!({
        "name": format!("{}/{}", PREFIX, name),
        "key": key,
        "enabled": true,
        "uri": format!("https://api/sshkey{}/{}", PREFIX, name),
    })
}

#[tokio::test]
async fn test_create_reads_back_qualified_name() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/sshkey/"))
        .and(body_partial_json(json!({
            "name": "/Compute-acme/jo/deploy",
            "key": "ssh-rsa AAA",
            "enabled": true,
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(ssh_key_body("deploy", "ssh-rsa AAA")))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/sshkey/Compute-acme/jo/deploy"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ssh_key_body("deploy", "ssh-rsa AAA")))
        .expect(1)
        .mount(&server)
        .await;

    let engine = client.engine(ResourceKind::SshKey);
    let desired = SshKey::new("deploy", "ssh-rsa AAA").to_attributes();
    let record = engine.create(&CallContext::new(), &desired).await.unwrap();

    assert_eq!(record.identity(), "deploy");
    assert_eq!(
        record.attributes().get("fqdn"),
        Some(&FieldValue::from("/Compute-acme/jo/deploy"))
    );
    assert!(!record.attributes().contains_key("uri"));
}

#[tokio::test]
async fn test_not_found_is_absent() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/seclist/Compute-acme/jo/web"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "no such list"})))
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/seclist/Compute-acme/jo/web"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let engine = client.engine(ResourceKind::SecurityList);
    let ctx = CallContext::new();

    assert_eq!(engine.read(&ctx, "web").await.unwrap(), Lookup::Absent);
    engine.delete(&ctx, "web").await.unwrap();
}

#[tokio::test]
async fn test_empty_body_is_absent() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/seclist/Compute-acme/jo/web"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let engine = client.engine(ResourceKind::SecurityList);
    assert!(engine
        .read(&CallContext::new(), "web")
        .await
        .unwrap()
        .is_absent());
}

#[tokio::test]
async fn test_api_error_carries_context() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/secapplication/Compute-acme/jo/ssh"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"message": "boom"})))
        .mount(&server)
        .await;

    let engine = client.engine(ResourceKind::SecurityApplication);
    let err = engine.read(&CallContext::new(), "ssh").await.unwrap_err();

    match &err {
        ReconcileError::Remote { name, source, .. } => {
            assert_eq!(name, "ssh");
            assert_eq!(
                source,
                &RemoteError::Api {
                    status: 500,
                    message: "boom".to_string()
                }
            );
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.to_string().contains("security_application 'ssh'"));
}

#[tokio::test]
async fn test_update_sends_mutable_fields_with_wire_names() {
    let (server, client) = setup().await;
    let object = "/network/v1/secprotocol/Compute-acme/jo/https";
    let before = json!({
        "name": "/Compute-acme/jo/https",
        "ipProtocol": "all",
        "dstPortSet": ["443"],
        "tags": ["web"],
        "uri": "https://api/network/v1/secprotocol/Compute-acme/jo/https",
    });
    let mut after = before.clone();
    after["ipProtocol"] = json!("tcp");

    Mock::given(method("GET"))
        .and(path(object))
        .respond_with(ResponseTemplate::new(200).set_body_json(before))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path(object))
        .and(body_partial_json(json!({
            "name": "/Compute-acme/jo/https",
            "ipProtocol": "tcp",
            "dstPortSet": ["443"],
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(after.clone()))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(object))
        .respond_with(ResponseTemplate::new(200).set_body_json(after))
        .mount(&server)
        .await;

    let engine = client.engine(ResourceKind::SecurityProtocol);
    let ctx = CallContext::new();
    let current = engine.read(&ctx, "https").await.unwrap().found().unwrap();

    let desired = attributes([
        ("name", FieldValue::from("https")),
        ("ip_protocol", FieldValue::from("TCP")),
        ("dst_ports", FieldValue::from(&["443"][..])),
        ("tags", FieldValue::from(&["web"][..])),
    ]);
    let updated = engine.update(&ctx, &current, &desired).await.unwrap();
    assert_eq!(
        updated.attributes().get("ip_protocol"),
        Some(&FieldValue::from("tcp"))
    );

    let requests = server.received_requests().await.unwrap();
    let put = requests
        .iter()
        .find(|r| r.method.as_str() == "PUT")
        .unwrap();
    let body: Value = serde_json::from_slice(&put.body).unwrap();
    assert!(body.get("tags").is_none());
    assert!(body.get("description").is_none());
}

#[tokio::test]
async fn test_authenticates_once_per_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/authenticate/"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sshkey/Compute-acme/jo/k1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ssh_key_body("k1", "ssh-rsa AAA")))
        .expect(2)
        .mount(&server)
        .await;

    let client = Arc::new(
        ComputeClient::new(ComputeConfig {
            endpoint: server.uri(),
            identity_domain: "acme".to_string(),
            user: "jo".to_string(),
            password: "secret".to_string(),
            timeout: None,
        })
        .unwrap(),
    );
    let engine = client.engine(ResourceKind::SshKey);
    let ctx = CallContext::new();

    engine.read(&ctx, "k1").await.unwrap();
    engine.read(&ctx, "k1").await.unwrap();
}

#[tokio::test]
async fn test_unauthorized_forces_new_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/authenticate/"))
        .respond_with(ResponseTemplate::new(204))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sshkey/Compute-acme/jo/k1"))
        .respond_with(ResponseTemplate::new(401).set_body_string("session expired"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sshkey/Compute-acme/jo/k1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ssh_key_body("k1", "ssh-rsa AAA")))
        .mount(&server)
        .await;

    let client = Arc::new(
        ComputeClient::new(ComputeConfig {
            endpoint: server.uri(),
            identity_domain: "acme".to_string(),
            user: "jo".to_string(),
            password: "secret".to_string(),
            timeout: None,
        })
        .unwrap(),
    );
    let engine = client.engine(ResourceKind::SshKey);
    let ctx = CallContext::new();

    let err = engine.read(&ctx, "k1").await.unwrap_err();
    assert!(matches!(
        err,
        ReconcileError::Remote {
            source: RemoteError::Unauthorized(_),
            ..
        }
    ));
    assert!(engine.read(&ctx, "k1").await.unwrap().found().is_some());
}

#[tokio::test]
async fn test_call_timeout() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/sshkey/Compute-acme/jo/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(ssh_key_body("slow", "ssh-rsa AAA"))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let engine = client.engine(ResourceKind::SshKey);
    let ctx = CallContext::new().with_timeout(Duration::from_millis(100));
    let err = engine.read(&ctx, "slow").await.unwrap_err();

    assert!(matches!(
        err,
        ReconcileError::Remote {
            source: RemoteError::Timeout(_),
            ..
        }
    ));
}

#[tokio::test]
async fn test_request_id_is_forwarded() {
    let (server, client) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/sshkey/Compute-acme/jo/k1"))
        .and(header("X-Request-Id", "req-7"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let engine = client.engine(ResourceKind::SshKey);
    let ctx = CallContext::new().with_request_id("req-7");
    engine.delete(&ctx, "k1").await.unwrap();
}

#[tokio::test]
async fn test_ssh_key_lookup() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/sshkey/Compute-acme/jo/deploy"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ssh_key_body("deploy", "ssh-rsa AAA")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sshkey/Compute-acme/jo/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let ctx = CallContext::new();
    let info = lookup_ssh_key(&client, &ctx, "deploy").await.unwrap().unwrap();
    assert_eq!(info.key, "ssh-rsa AAA");
    assert!(info.enabled);

    assert!(lookup_ssh_key(&client, &ctx, "missing").await.unwrap().is_none());
}
