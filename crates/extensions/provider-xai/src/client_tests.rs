use super::*;
use futures::StreamExt;

#[test]
fn test_defaults() {
    let client = XAiClient::new("key");
    assert_eq!(client.api_url(), DEFAULT_API_URL);
    assert_eq!(client.default_model(), "grok-preview");
    assert_eq!(client.default_temperature(), 0.7);
}

#[test]
fn test_mutable_defaults() {
    let mut client = XAiClient::new("key");
    client.set_default_model("grok-2");
    client.set_default_temperature(0.1);

    let messages = vec![ChatMessage::user("hi")];
    let options = CompletionOptions::default();
    let request = client.build_request(&messages, &options, false);
    assert_eq!(request.model, "grok-2");
    assert_eq!(request.temperature, 0.1);
}

#[test]
fn test_options_override_defaults() {
    let client = XAiClient::new("key");
    let messages = vec![ChatMessage::user("hi")];
    let options = CompletionOptions::default()
        .with_model("grok-beta")
        .with_temperature(0.5);

    let request = client.build_request(&messages, &options, true);
    let body = serde_json::to_value(&request).unwrap();
    assert_eq!(
        body,
        serde_json::json!({
            "model": "grok-beta",
            "messages": [{"role": "user", "content": "hi"}],
            "temperature": 0.5,
            "stream": true,
        })
    );
}

#[test]
fn test_system_prompt_prepended() {
    let messages = vec![ChatMessage::user("hi")];
    let out = ensure_system_prompt(&messages, "S");
    assert_eq!(out, vec![ChatMessage::system("S"), ChatMessage::user("hi")]);
}

#[test]
fn test_system_prompt_not_duplicated() {
    let messages = vec![ChatMessage::system("existing"), ChatMessage::user("hi")];
    assert_eq!(ensure_system_prompt(&messages, "S"), messages);
}

#[test]
fn test_system_prompt_on_empty_list() {
    assert_eq!(ensure_system_prompt(&[], "S"), vec![ChatMessage::system("S")]);
}

mod http_tests {
    use super::*;
    use wiremock::{Mock, MockServer, ResponseTemplate, matchers};

    const STREAM_BODY: &str = concat!(
        "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"He\"}}]}\n\n",
        "data: not-json\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"llo\"}}]}\n\n",
        "data: [DONE]\n\n",
    );

    #[tokio::test]
    async fn test_complete_success() {
        let mock_server = MockServer::start().await;

        Mock::given(matchers::method("POST"))
            .and(matchers::path("/"))
            .and(matchers::header("Authorization", "Bearer test-key"))
            .and(matchers::body_partial_json(serde_json::json!({
                "model": "grok-preview",
                "stream": false,
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "cmpl-1",
                "model": "grok-preview",
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": "Hello back!"},
                    "finish_reason": "stop"
                }]
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = XAiClient::with_url("test-key", mock_server.uri());
        let completion = client
            .complete(&[ChatMessage::user("Hello")], &CompletionOptions::default())
            .await
            .unwrap();
        assert_eq!(completion.content(), Some("Hello back!"));
        assert_eq!(completion.raw["id"], "cmpl-1");
    }

    #[tokio::test]
    async fn test_complete_http_error() {
        let mock_server = MockServer::start().await;

        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Invalid API key"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = XAiClient::with_url("bad-key", mock_server.uri());
        let err = client
            .complete(&[ChatMessage::user("Hello")], &CompletionOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(401));
        assert_eq!(err.to_string(), "HTTP error! status: 401");
    }

    #[tokio::test]
    async fn test_complete_with_system_prompt_sends_it_first() {
        let mock_server = MockServer::start().await;

        Mock::given(matchers::method("POST"))
            .and(matchers::body_partial_json(serde_json::json!({
                "messages": [
                    {"role": "system", "content": "S"},
                    {"role": "user", "content": "hi"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "ok"}}]
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = XAiClient::with_url("k", mock_server.uri());
        let completion = client
            .complete_with_system_prompt(
                &[ChatMessage::user("hi")],
                "S",
                &CompletionOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(completion.content(), Some("ok"));
    }

    #[tokio::test]
    async fn test_complete_stream() {
        let mock_server = MockServer::start().await;

        Mock::given(matchers::method("POST"))
            .and(matchers::body_partial_json(serde_json::json!({"stream": true})))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Content-Type", "text/event-stream")
                    .set_body_string(STREAM_BODY),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = XAiClient::with_url("k", mock_server.uri());
        let stream = client
            .complete_stream(&[ChatMessage::user("hi")], &CompletionOptions::default())
            .await
            .unwrap();
        let deltas: Vec<String> = stream.map(|d| d.unwrap()).collect().await;
        assert_eq!(deltas, vec!["He", "llo"]);
    }

    #[tokio::test]
    async fn test_complete_stream_http_error_before_data() {
        let mock_server = MockServer::start().await;

        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let client = XAiClient::with_url("k", mock_server.uri());
        let result = client
            .complete_stream_with_system_prompt(
                &[ChatMessage::user("hi")],
                "S",
                &CompletionOptions::default(),
            )
            .await;
        assert!(matches!(result, Err(ProviderError::Http { status: 500, .. })));
    }

    #[tokio::test]
    async fn test_network_error() {
        let client = XAiClient::with_url("k", "http://127.0.0.1:1");
        let result = client
            .complete(&[ChatMessage::user("hi")], &CompletionOptions::default())
            .await;
        assert!(matches!(result, Err(ProviderError::Network(_))));
    }
}
