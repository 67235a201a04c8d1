//! Integration tests for Message and Mailbox against a mock Gmail API.

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use fastgmail_message::{GmailClient, GmailError, Mailbox};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Helper to create a message resource with one PDF attachment
fn test_message(id: &str, labels: &[&str]) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "threadId": "t-1",
        "labelIds": labels,
        "snippet": "Minutes attached",
        "historyId": "77",
        "sizeEstimate": 4096,
        "internalDate": "1717581600000",
        "payload": {
            "mimeType": "multipart/mixed",
            "headers": [
                {"name": "From", "value": "\"Team Lead\" <lead@example.com>"},
                {"name": "To", "value": "me@example.com"},
                {"name": "Subject", "value": "Weekly sync"},
                {"name": "Date", "value": "Wed, 5 Jun 2024 10:00:00 +0000"}
            ],
            "parts": [
                {
                    "partId": "0",
                    "mimeType": "text/plain",
                    "filename": "",
                    "body": {"size": 16, "data": URL_SAFE.encode("Minutes attached")}
                },
                {
                    "partId": "1",
                    "mimeType": "application/pdf",
                    "filename": "minutes.pdf",
                    "body": {"size": 4, "attachmentId": "att-minutes"}
                }
            ]
        }
    })
}

async fn mailbox_with_message(mock_server: &MockServer, labels: &[&str]) -> Mailbox {
    Mock::given(method("GET"))
        .and(path("/gmail/v1/users/me/messages/m-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(test_message("m-1", labels)))
        .mount(mock_server)
        .await;

    Mailbox::new(Arc::new(GmailClient::with_base_url("test_token", &mock_server.uri())))
}

#[tokio::test]
async fn test_fetch_and_read_message() {
    let mock_server = MockServer::start().await;
    let mailbox = mailbox_with_message(&mock_server, &["INBOX", "UNREAD"]).await;

    let message = mailbox.get_message("m-1").await.unwrap();

    assert_eq!(message.subject(), Some("Weekly sync"));
    assert_eq!(message.sender().as_deref(), Some("Team Lead"));
    assert_eq!(message.plain().unwrap(), "Minutes attached");
    assert_eq!(message.created_date().unwrap().to_rfc3339(), "2024-06-05T10:00:00+00:00");
    assert!(message.is_unread());
    assert!(message.has_attachments());
}

#[tokio::test]
async fn test_mark_as_read_updates_local_labels() {
    let mock_server = MockServer::start().await;
    let mailbox = mailbox_with_message(&mock_server, &["INBOX", "UNREAD"]).await;

    Mock::given(method("POST"))
        .and(path("/gmail/v1/users/me/messages/m-1/modify"))
        .and(body_json(serde_json::json!({"removeLabelIds": ["UNREAD"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "m-1"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut message = mailbox.get_message("m-1").await.unwrap();
    message.mark_as_read().await.unwrap();

    assert!(!message.is_unread());
    assert_eq!(message.label_ids, vec!["INBOX"]);
}

#[tokio::test]
async fn test_move_to_trash_single_request() {
    let mock_server = MockServer::start().await;
    let mailbox = mailbox_with_message(&mock_server, &["INBOX", "STARRED"]).await;

    Mock::given(method("POST"))
        .and(path("/gmail/v1/users/me/messages/m-1/modify"))
        .and(body_json(serde_json::json!({
            "addLabelIds": ["TRASH"],
            "removeLabelIds": ["INBOX", "STARRED", "IMPORTANT"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "m-1"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut message = mailbox.get_message("m-1").await.unwrap();
    message.move_to_trash().await.unwrap();

    assert!(message.is_trash());
    assert!(!message.is_inbox());
    assert!(!message.is_starred());
}

#[tokio::test]
async fn test_failed_modify_keeps_labels() {
    let mock_server = MockServer::start().await;
    let mailbox = mailbox_with_message(&mock_server, &["INBOX"]).await;

    Mock::given(method("POST"))
        .and(path("/gmail/v1/users/me/messages/m-1/modify"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&mock_server)
        .await;

    let mut message = mailbox.get_message("m-1").await.unwrap();
    let err = message.mark_starred().await.unwrap_err();

    assert!(matches!(err, GmailError::AuthRequired));
    assert!(err.should_refresh_token());
    assert!(!message.is_starred());
    assert_eq!(message.label_ids, vec!["INBOX"]);
}

#[tokio::test]
async fn test_resolve_labels_through_batch() {
    let mock_server = MockServer::start().await;
    let mailbox = mailbox_with_message(&mock_server, &["INBOX", "Label_3"]).await;

    let body = concat!(
        "--batch_r\r\nContent-Type: application/http\r\nContent-ID: <response-label-0>\r\n\r\n",
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\r\n",
        "{\"id\": \"INBOX\", \"name\": \"INBOX\", \"type\": \"system\", \"messagesUnread\": 3}\r\n",
        "--batch_r\r\nContent-Type: application/http\r\nContent-ID: <response-label-1>\r\n\r\n",
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\r\n",
        "{\"id\": \"Label_3\", \"name\": \"Receipts\", \"type\": \"user\"}\r\n",
        "--batch_r--\r\n"
    );
    Mock::given(method("POST"))
        .and(path("/batch/gmail/v1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(body, "multipart/mixed; boundary=batch_r"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut message = mailbox.get_message("m-1").await.unwrap();
    let names: Vec<String> =
        message.get_labels().await.unwrap().iter().map(|l| l.name.clone()).collect();

    assert_eq!(names, vec!["INBOX", "Receipts"]);
    let labels = message.labels.as_ref().unwrap();
    assert!(labels[0].is_system());
    assert_eq!(labels[0].messages_unread, Some(3));
}

#[tokio::test]
async fn test_batch_item_failure_stores_nothing() {
    let mock_server = MockServer::start().await;
    let mailbox = mailbox_with_message(&mock_server, &["INBOX", "Label_gone"]).await;

    let body = concat!(
        "--batch_r\r\nContent-Type: application/http\r\nContent-ID: <response-label-0>\r\n\r\n",
        "HTTP/1.1 200 OK\r\n\r\n{\"id\": \"INBOX\", \"name\": \"INBOX\"}\r\n",
        "--batch_r\r\nContent-Type: application/http\r\nContent-ID: <response-label-1>\r\n\r\n",
        "HTTP/1.1 404 Not Found\r\n\r\n{\"error\": {\"code\": 404, \"message\": \"Not Found\"}}\r\n",
        "--batch_r--\r\n"
    );
    Mock::given(method("POST"))
        .and(path("/batch/gmail/v1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(body, "multipart/mixed; boundary=batch_r"),
        )
        .mount(&mock_server)
        .await;

    let mut message = mailbox.get_message("m-1").await.unwrap();
    let err = message.get_labels().await.unwrap_err();

    assert!(matches!(err, GmailError::BatchItemFailed { status: 404, .. }));
    assert!(message.labels.is_none());
}

#[tokio::test]
async fn test_download_and_save_attachment() {
    let mock_server = MockServer::start().await;
    let mailbox = mailbox_with_message(&mock_server, &["INBOX"]).await;

    Mock::given(method("GET"))
        .and(path("/gmail/v1/users/me/messages/m-1/attachments/att-minutes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "attachmentId": "att-minutes",
            "size": 4,
            "data": URL_SAFE.encode(b"%PDF")
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let message = mailbox.get_message("m-1").await.unwrap();
    let mut attachment = message.get_attachment(Some("minutes.pdf"), None).unwrap().unwrap();
    assert!(!attachment.is_downloaded());

    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("minutes.pdf");
    attachment.save(Some(target.as_path()), false).await.unwrap();

    assert_eq!(std::fs::read(&target).unwrap(), b"%PDF");
    assert!(matches!(
        attachment.save(Some(target.as_path()), false).await,
        Err(GmailError::FileExists(_))
    ));
}

#[tokio::test]
async fn test_missing_message_is_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/gmail/v1/users/me/messages/nope"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Requested entity was not found."))
        .mount(&mock_server)
        .await;

    let mailbox =
        Mailbox::new(Arc::new(GmailClient::with_base_url("test_token", &mock_server.uri())));
    assert!(matches!(mailbox.get_message("nope").await, Err(GmailError::NotFound(_))));
}
