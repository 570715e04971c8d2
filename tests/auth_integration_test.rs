use httpmock::prelude::*;
use request_dispatcher::config::{BasicAuthCreds, HeaderTemplate};
use request_dispatcher::{Dispatcher, DispatcherConfig, Record};
use serde_json::json;

fn record(value: serde_json::Value) -> Record {
    Record::try_from(value).unwrap()
}

#[tokio::test]
async fn test_basic_auth_header() -> anyhow::Result<()> {
    let server = MockServer::start();
    // user:pass
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/basic-auth/user/pass")
            .header("Authorization", "Basic dXNlcjpwYXNz");
        then.status(200)
            .json_body(json!({"authenticated": true, "user": "user"}));
    });

    let mut config = DispatcherConfig::new(server.url("/basic-auth/user/pass"));
    config.basic_auth_creds = BasicAuthCreds {
        username: Some("user".to_string()),
        password: Some("pass".to_string()),
    };

    let dispatcher = Dispatcher::new(config)?;
    let outputs = dispatcher.dispatch(&[record(json!({}))]).await;

    mock.assert();
    assert_eq!(outputs[0].get("authenticated"), Some(&json!(true)));
    Ok(())
}

#[tokio::test]
async fn test_auth_templates_from_record() -> anyhow::Result<()> {
    let server = MockServer::start();
    // alice:s3cret
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/secure")
            .header("Authorization", "Basic YWxpY2U6czNjcmV0");
        then.status(200).json_body(json!({"ok": true}));
    });

    let mut config = DispatcherConfig::new(server.url("/secure"));
    config.basic_auth_creds = BasicAuthCreds {
        username: Some("{{ $user }}".to_string()),
        password: Some("{{ $secret }}".to_string()),
    };

    let dispatcher = Dispatcher::new(config)?;
    let outputs = dispatcher
        .dispatch(&[record(json!({"user": "alice", "secret": "s3cret"}))])
        .await;

    mock.assert();
    assert_eq!(outputs.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_empty_username_sends_no_auth() -> anyhow::Result<()> {
    let server = MockServer::start();
    let with_auth = server.mock(|when, then| {
        when.method(GET).path("/open").header_exists("Authorization");
        then.status(401);
    });
    let without_auth = server.mock(|when, then| {
        when.method(GET).path("/open");
        then.status(200).json_body(json!({"ok": true}));
    });

    let mut config = DispatcherConfig::new(server.url("/open"));
    config.basic_auth_creds = BasicAuthCreds {
        username: Some(String::new()),
        password: Some("ignored".to_string()),
    };

    let dispatcher = Dispatcher::new(config)?;
    let outputs = dispatcher.dispatch(&[record(json!({}))]).await;

    with_auth.assert_hits(0);
    without_auth.assert();
    assert_eq!(outputs[0].get("ok"), Some(&json!(true)));
    Ok(())
}

#[tokio::test]
async fn test_header_templates() -> anyhow::Result<()> {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/headers")
            .header("X-Tenant", "acme")
            .header("X-Trace", "trace-42");
        then.status(200).json_body(json!({"seen": true}));
    });

    let mut config = DispatcherConfig::new(server.url("/headers"));
    config.headers = vec![
        HeaderTemplate {
            header: Some(json!("X-Tenant")),
            value: Some(json!("{{ $tenant }}")),
        },
        HeaderTemplate {
            header: Some(json!("X-Trace")),
            value: Some(json!("trace-{{ $trace }}")),
        },
        HeaderTemplate {
            header: Some(json!("X-Missing")),
            value: Some(json!("{{ $absent }}")),
        },
    ];

    let dispatcher = Dispatcher::new(config)?;
    let outputs = dispatcher
        .dispatch(&[record(json!({"tenant": "acme", "trace": 42}))])
        .await;

    mock.assert();
    assert_eq!(outputs.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_literal_braces_in_header_are_sent() -> anyhow::Result<()> {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/meta")
            .header("X-Meta", r#"{"a":{"b":1}}"#);
        then.status(200).json_body(json!({"ok": true}));
    });

    let mut config = DispatcherConfig::new(server.url("/meta"));
    config.headers = vec![HeaderTemplate {
        header: Some(json!("X-Meta")),
        value: Some(json!(r#"{"a":{"b":1}}"#)),
    }];

    let dispatcher = Dispatcher::new(config)?;
    let outputs = dispatcher.dispatch(&[record(json!({}))]).await;

    mock.assert();
    assert_eq!(outputs[0].get("ok"), Some(&json!(true)));
    Ok(())
}
