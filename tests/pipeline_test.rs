//! End-to-end invocation tests against mocked remote services
//!
//! One wiremock server stands in for the configuration store, the secret
//! vault, the image-generation API, the object store, and the email API.

use std::io::Cursor;

use base64::Engine;
use image::{DynamicImage, GenericImageView, RgbaImage};
use serde_json::json;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use picture_frame_service::config::Settings;
use picture_frame_service::error::FrameError;
use picture_frame_service::pipeline::Pipeline;
use picture_frame_service::services::app_config::SECRET_REFERENCE_CONTENT_TYPE;
use picture_frame_service::services::storage::StorageUploader;

fn sample_png_b64() -> String {
    let img = DynamicImage::ImageRgba8(RgbaImage::from_fn(100, 60, |x, y| {
        image::Rgba([(x % 256) as u8, (y % 256) as u8, 200, 255])
    }));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageOutputFormat::Png)
        .unwrap();
    base64::engine::general_purpose::STANDARD.encode(&buf)
}

async fn mount_setting(server: &MockServer, key: &str, value: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/kv/{key}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "key": key,
            "value": value,
            "content_type": null,
        })))
        .mount(server)
        .await;
}

async fn mount_secret_setting(server: &MockServer, key: &str, secret_name: &str) {
    let uri = format!("{}/secrets/{secret_name}", server.uri());
    Mock::given(method("GET"))
        .and(path(format!("/kv/{key}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "key": key,
            "value": json!({ "uri": uri }).to_string(),
            "content_type": SECRET_REFERENCE_CONTENT_TYPE,
        })))
        .mount(server)
        .await;
}

async fn mount_secret_value(server: &MockServer, secret_name: &str, value: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/secrets/{secret_name}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": value })))
        .mount(server)
        .await;
}

/// All seven settings, with both secrets resolvable through the mock vault
async fn mount_full_config(server: &MockServer) {
    mount_setting(server, "OpenAIPrompt", "a sunset").await;
    mount_secret_setting(server, "OpenAISecretKey", "openai-key").await;
    mount_secret_setting(server, "EmailServiceConnectionString", "email-conn").await;
    mount_setting(server, "StorageContainerName", "picture-frames").await;
    mount_setting(server, "SenderEmailAddress", "frames@example.net").await;
    mount_setting(server, "PictureFrameEmailAddress", "frame@example.net").await;
    mount_setting(server, "NumberOfImagesToGenerate", "1").await;

    mount_secret_value(server, "openai-key", "sk-test").await;
    mount_secret_value(
        server,
        "email-conn",
        &format!("endpoint={};accesskey=key123", server.uri()),
    )
    .await;
}

fn test_settings(server: &MockServer) -> Settings {
    Settings {
        config_store_endpoint: server.uri(),
        config_store_token: "test-token".to_string(),
        image_api_endpoint: server.uri(),
        s3_endpoint: Some(server.uri()),
        tick_interval_secs: 60,
        email_poll_interval_ms: 10,
        email_poll_max_attempts: 3,
    }
}

fn test_uploader(server: &MockServer) -> StorageUploader {
    use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};

    let config = aws_sdk_s3::config::Builder::new()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(Credentials::new("test", "test", None, None, "static"))
        .endpoint_url(server.uri())
        .force_path_style(true)
        .build();

    StorageUploader::new(aws_sdk_s3::Client::from_conf(config))
}

#[tokio::test]
async fn test_full_invocation_uploads_resizes_and_emails_one_image() {
    let server = MockServer::start().await;
    mount_full_config(&server).await;

    Mock::given(method("POST"))
        .and(path("/v1/images/generations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "b64_json": sample_png_b64() }],
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path_regex(r"^/picture-frames/[0-9a-f-]{36}\.png$"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/emails:send"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({
            "id": "op-1",
            "status": "Running",
        })))
        .expect(1)
        .mount(&server)
        .await;

    // First poll still running, second reaches the terminal state
    Mock::given(method("GET"))
        .and(path("/emails/operations/op-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "op-1",
            "status": "Running",
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/emails/operations/op-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "op-1",
            "status": "Succeeded",
        })))
        .mount(&server)
        .await;

    let settings = test_settings(&server);
    let pipeline = Pipeline::new(&settings, test_uploader(&server));
    pipeline.run_invocation().await.unwrap();

    let requests = server.received_requests().await.unwrap();

    let uploaded = requests
        .iter()
        .find(|r| r.method.to_string() == "PUT")
        .expect("blob upload request");
    let uploaded_name = uploaded
        .url
        .path()
        .strip_prefix("/picture-frames/")
        .unwrap()
        .to_string();

    let send = requests
        .iter()
        .find(|r| r.url.path() == "/emails:send")
        .expect("email send request");
    let body: serde_json::Value = serde_json::from_slice(&send.body).unwrap();

    assert_eq!(body["senderAddress"], "frames@example.net");
    assert_eq!(body["recipients"]["to"][0]["address"], "frame@example.net");
    assert_eq!(body["recipients"]["to"][0]["displayName"], "Picture Frame");

    let attachments = body["attachments"].as_array().unwrap();
    assert_eq!(attachments.len(), 1);
    assert_eq!(attachments[0]["name"], uploaded_name.as_str());

    // Attached payload is the resized variant at the display resolution
    let attached = base64::engine::general_purpose::STANDARD
        .decode(attachments[0]["contentInBase64"].as_str().unwrap())
        .unwrap();
    let decoded = image::load_from_memory(&attached).unwrap();
    assert_eq!(decoded.dimensions(), (1280, 800));
}

#[tokio::test]
async fn test_vault_failure_aborts_before_generation() {
    let server = MockServer::start().await;
    mount_setting(&server, "OpenAIPrompt", "a sunset").await;
    mount_secret_setting(&server, "OpenAISecretKey", "openai-key").await;

    Mock::given(method("GET"))
        .and(path("/secrets/openai-key"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/images/generations"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let settings = test_settings(&server);
    let pipeline = Pipeline::new(&settings, test_uploader(&server));

    let err = pipeline.run_invocation().await.unwrap_err();
    assert!(matches!(err, FrameError::SecretResolution(_)));
}

#[tokio::test]
async fn test_missing_setting_aborts_invocation() {
    let server = MockServer::start().await;
    mount_setting(&server, "OpenAIPrompt", "a sunset").await;
    mount_secret_setting(&server, "OpenAISecretKey", "openai-key").await;
    mount_secret_setting(&server, "EmailServiceConnectionString", "email-conn").await;
    mount_setting(&server, "StorageContainerName", "picture-frames").await;
    mount_secret_value(&server, "openai-key", "sk-test").await;
    mount_secret_value(&server, "email-conn", "endpoint=https://m;accesskey=k").await;
    // SenderEmailAddress deliberately not mounted; the store answers 404

    Mock::given(method("POST"))
        .and(path("/v1/images/generations"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let settings = test_settings(&server);
    let pipeline = Pipeline::new(&settings, test_uploader(&server));

    let err = pipeline.run_invocation().await.unwrap_err();
    match err {
        FrameError::ConfigMissing(key) => assert_eq!(key, "SenderEmailAddress"),
        other => panic!("expected ConfigMissing, got {other}"),
    }
}

#[tokio::test]
async fn test_send_stuck_non_terminal_fails_invocation() {
    let server = MockServer::start().await;
    mount_full_config(&server).await;

    Mock::given(method("POST"))
        .and(path("/v1/images/generations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "b64_json": sample_png_b64() }],
        })))
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path_regex(r"^/picture-frames/[0-9a-f-]{36}\.png$"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/emails:send"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({
            "id": "op-stuck",
            "status": "NotStarted",
        })))
        .mount(&server)
        .await;

    // The operation never leaves Running
    Mock::given(method("GET"))
        .and(path("/emails/operations/op-stuck"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "op-stuck",
            "status": "Running",
        })))
        .mount(&server)
        .await;

    let settings = test_settings(&server);
    let pipeline = Pipeline::new(&settings, test_uploader(&server));

    let err = pipeline.run_invocation().await.unwrap_err();
    match err {
        FrameError::Email(msg) => assert!(msg.contains("not terminal")),
        other => panic!("expected Email error, got {other}"),
    }
}

#[tokio::test]
async fn test_generation_count_is_honored_per_image() {
    let server = MockServer::start().await;
    mount_setting(&server, "OpenAIPrompt", "a sunset").await;
    mount_secret_setting(&server, "OpenAISecretKey", "openai-key").await;
    mount_secret_setting(&server, "EmailServiceConnectionString", "email-conn").await;
    mount_setting(&server, "StorageContainerName", "picture-frames").await;
    mount_setting(&server, "SenderEmailAddress", "frames@example.net").await;
    mount_setting(&server, "PictureFrameEmailAddress", "frame@example.net").await;
    mount_setting(&server, "NumberOfImagesToGenerate", "2").await;
    mount_secret_value(&server, "openai-key", "sk-test").await;
    mount_secret_value(
        &server,
        "email-conn",
        &format!("endpoint={};accesskey=key123", server.uri()),
    )
    .await;

    Mock::given(method("POST"))
        .and(path("/v1/images/generations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                { "b64_json": sample_png_b64() },
                { "b64_json": sample_png_b64() },
            ],
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path_regex(r"^/picture-frames/[0-9a-f-]{36}\.png$"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/emails:send"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({
            "id": "op-ok",
            "status": "Succeeded",
        })))
        .expect(2)
        .mount(&server)
        .await;

    let settings = test_settings(&server);
    let pipeline = Pipeline::new(&settings, test_uploader(&server));
    pipeline.run_invocation().await.unwrap();

    // Each email carries exactly one attachment, and the two uploads used
    // distinct blob names
    let requests = server.received_requests().await.unwrap();
    let blob_names: Vec<_> = requests
        .iter()
        .filter(|r| r.method.to_string() == "PUT")
        .map(|r| r.url.path().to_string())
        .collect();
    assert_eq!(blob_names.len(), 2);
    assert_ne!(blob_names[0], blob_names[1]);

    for send in requests.iter().filter(|r| r.url.path() == "/emails:send") {
        let body: serde_json::Value = serde_json::from_slice(&send.body).unwrap();
        assert_eq!(body["attachments"].as_array().unwrap().len(), 1);
    }
}
