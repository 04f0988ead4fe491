use azure_genai::codec::{EmbeddingInput, EmbeddingVector};
use azure_genai::providers::azure::types::{
    AudioResponseFormat, ChatCompletionRequest, EmbeddingsRequest, FileUpload,
    ImageEditRequest, ImageGenerationRequest, Message, StreamOptions, TranscriptionRequest,
};
use azure_genai::providers::{LLMClient, MessageChunk};
use azure_genai::{AzureError, AzureOpenAIClient, Config};
use futures::StreamExt;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CHAT_PATH: &str = "/openai/deployments/gpt-4o/chat/completions";

fn config(server: &MockServer) -> Config {
    let mut config = Config::default().with_endpoint(format!("{}/", server.uri()));
    config.api_version = "2024-02-01".to_string();
    config.deployments.chat = "gpt-4o".to_string();
    config.deployments.embeddings = "embed-small".to_string();
    config.deployments.audio = "whisper".to_string();
    config.deployments.images = "dalle".to_string();
    config
}

fn client(server: &MockServer) -> AzureOpenAIClient {
    AzureOpenAIClient::new("secret", config(server)).unwrap()
}

fn completion_body() -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "created": 1_700_000_000,
        "model": "gpt-4o",
        "choices": [{
            "index": 0,
            "finish_reason": "stop",
            "message": {"role": "assistant", "content": "Hello!"}
        }],
        "usage": {"prompt_tokens": 5, "completion_tokens": 2, "total_tokens": 7}
    })
}

fn sse(frames: &[serde_json::Value]) -> String {
    let mut body: String = frames.iter().map(|f| format!("data: {f}\n\n")).collect();
    body.push_str("data: [DONE]\n\n");
    body
}

fn delta(content: &str) -> serde_json::Value {
    json!({
        "id": "c", "object": "chat.completion.chunk", "created": 1, "model": "gpt-4o",
        "choices": [{"index": 0, "delta": {"content": content}, "finish_reason": null}]
    })
}

#[tokio::test]
async fn test_chat_completion_hits_deployment_url_with_api_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .and(query_param("api-version", "2024-02-01"))
        .and(header("api-key", "secret"))
        .and(header("content-type", "application/json"))
        .and(body_partial_json(json!({
            "messages": [{"role": "user", "content": "Hi"}],
            "stream": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body()))
        .expect(1)
        .mount(&server)
        .await;

    let request = ChatCompletionRequest::new(vec![Message::user("Hi")]);
    let completion = client(&server).chat_completion(&request).await.unwrap();

    assert_eq!(completion.choices.len(), 1);
    assert_eq!(completion.choices[0].message.content(), "Hello!");
    assert_eq!(completion.usage.total_tokens, 7);
}

#[tokio::test]
async fn test_structured_error_body_becomes_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {
                "message": "Rate limit reached",
                "type": "rate_limit_error",
                "code": 429
            }
        })))
        .mount(&server)
        .await;

    let request = ChatCompletionRequest::new(vec![Message::user("Hi")]);
    let err = client(&server).chat_completion(&request).await.unwrap_err();
    match err {
        AzureError::ApiError {
            status,
            message,
            error_type,
            code,
            ..
        } => {
            assert_eq!(status, 429);
            assert_eq!(message, "Rate limit reached");
            assert_eq!(error_type, "rate_limit_error");
            assert_eq!(code.as_deref(), Some("429"));
        }
        other => panic!("expected ApiError, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unparseable_error_body_becomes_http_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
        .mount(&server)
        .await;

    let request = ChatCompletionRequest::new(vec![Message::user("Hi")]);
    let err = client(&server).chat_completion(&request).await.unwrap_err();
    assert!(matches!(err, AzureError::HttpError { status: 502 }));
    assert_eq!(err.status(), Some(502));
}

#[tokio::test]
async fn test_malformed_success_body_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"unexpected": true})))
        .mount(&server)
        .await;

    let request = ChatCompletionRequest::new(vec![Message::user("Hi")]);
    let err = client(&server).chat_completion(&request).await.unwrap_err();
    assert!(matches!(err, AzureError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_streaming_yields_deltas_in_order_and_stops_at_done() {
    let server = MockServer::start().await;
    let mut body = sse(&[delta("Hel"), delta("lo")]);
    body.push_str(&format!("data: {}\n\n", delta("ignored")));
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .and(body_partial_json(json!({"stream": true})))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let request = ChatCompletionRequest::new(vec![Message::user("Hi")]);
    let chunks: Vec<_> = client(&server)
        .chat_completion_stream(&request)
        .await
        .unwrap()
        .collect()
        .await;

    let text: String = chunks
        .into_iter()
        .map(|chunk| chunk.unwrap().choices[0].delta.content.clone().unwrap_or_default())
        .collect();
    assert_eq!(text, "Hello");
}

#[tokio::test]
async fn test_default_streaming_body_has_no_stream_options() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_raw(sse(&[delta("a")]), "text/event-stream"))
        .mount(&server)
        .await;

    let request = ChatCompletionRequest::new(vec![Message::user("Hi")]);
    let chunks: Vec<_> = client(&server)
        .chat_completion_stream(&request)
        .await
        .unwrap()
        .collect()
        .await;
    assert_eq!(chunks.len(), 1);

    let received = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&received[0].body).unwrap();
    assert_eq!(body["stream"], json!(true));
    assert!(body.get("stream_options").is_none());
}

#[tokio::test]
async fn test_usage_reporting_is_opt_in() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .and(body_partial_json(json!({"stream_options": {"include_usage": true}})))
        .respond_with(ResponseTemplate::new(200).set_body_raw(sse(&[delta("a")]), "text/event-stream"))
        .expect(1)
        .mount(&server)
        .await;

    let request = ChatCompletionRequest {
        stream_options: Some(StreamOptions {
            include_usage: true,
        }),
        ..ChatCompletionRequest::new(vec![Message::user("Hi")])
    };
    let chunks: Vec<_> = client(&server)
        .chat_completion_stream(&request)
        .await
        .unwrap()
        .collect()
        .await;
    assert_eq!(chunks.len(), 1);
}

#[tokio::test]
async fn test_streaming_skips_malformed_frames() {
    let server = MockServer::start().await;
    let body = format!(
        "data: {}\n\ndata: {{broken\n\ndata: {}\n\ndata: [DONE]\n\n",
        delta("a"),
        delta("b")
    );
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let request = ChatCompletionRequest::new(vec![Message::user("Hi")]);
    let chunks: Vec<_> = client(&server)
        .chat_completion_stream(&request)
        .await
        .unwrap()
        .collect()
        .await;
    assert_eq!(chunks.len(), 2);
    assert!(chunks.iter().all(Result::is_ok));
}

#[tokio::test]
async fn test_cancelled_stream_ends_immediately() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(sse(&[delta("x"), delta("y")]), "text/event-stream"),
        )
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    cancel.cancel();
    let request = ChatCompletionRequest::new(vec![Message::user("Hi")]);
    let mut stream = client(&server)
        .chat_completion_stream_with_cancel(&request, cancel)
        .await
        .unwrap();
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn test_streaming_error_status_fails_before_stream() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"message": "Access denied due to invalid subscription key", "code": "401"}
        })))
        .mount(&server)
        .await;

    let request = ChatCompletionRequest::new(vec![Message::user("Hi")]);
    let result = client(&server).chat_completion_stream(&request).await;
    assert!(matches!(result, Err(AzureError::ApiError { status: 401, .. })));
}

#[tokio::test]
async fn test_llm_client_streaming_flattens_chunks() {
    let server = MockServer::start().await;
    let finish = json!({
        "id": "c", "object": "chat.completion.chunk", "created": 1, "model": "gpt-4o",
        "choices": [{"index": 0, "delta": {}, "finish_reason": "stop"}]
    });
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(sse(&[delta("Hi"), delta(" there"), finish]), "text/event-stream"),
        )
        .mount(&server)
        .await;

    let client = client(&server);
    let chunks: Vec<MessageChunk> = client
        .query_streaming(&[Message::user("Hello")], None)
        .await
        .unwrap()
        .map(Result::unwrap)
        .collect()
        .await;
    assert_eq!(chunks.len(), 3);
    assert_eq!(chunks[0], MessageChunk::Text("Hi".to_string()));
    assert!(matches!(chunks[2], MessageChunk::End(_)));
}

#[tokio::test]
async fn test_embeddings_decode_base64_vectors() {
    let server = MockServer::start().await;
    let vector = EmbeddingVector::base64_from_f32(&[0.5, -2.0]);
    Mock::given(method("POST"))
        .and(path("/openai/deployments/embed-small/embeddings"))
        .and(body_partial_json(json!({"input": ["a", "b"], "encoding_format": "base64"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "data": [{"object": "embedding", "index": 0, "embedding": vector}],
            "model": "text-embedding-3-small",
            "usage": {"prompt_tokens": 2, "total_tokens": 2}
        })))
        .mount(&server)
        .await;

    let request = EmbeddingsRequest {
        encoding_format: Some(azure_genai::providers::azure::types::EncodingFormat::Base64),
        ..EmbeddingsRequest::new(EmbeddingInput::TextArray(vec!["a".into(), "b".into()]))
    };
    let response = client(&server).embeddings(&request).await.unwrap();
    assert_eq!(response.data[0].embedding.to_f32_vec(), Some(vec![0.5, -2.0]));
}

#[tokio::test]
async fn test_transcription_sends_multipart_and_reads_text_format() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/openai/deployments/whisper/audio/transcriptions"))
        .and(header("api-key", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_string("hello world\n"))
        .mount(&server)
        .await;

    let request = TranscriptionRequest {
        language: Some("en".to_string()),
        response_format: Some(AudioResponseFormat::Text),
        ..TranscriptionRequest::new(FileUpload::new("talk.wav", b"RIFF".to_vec()))
    };
    let result = client(&server).transcribe(&request).await.unwrap();
    assert_eq!(result.text, "hello world\n");

    let received = server.received_requests().await.unwrap();
    let content_type = received[0]
        .headers
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    let boundary = content_type
        .strip_prefix("multipart/form-data; boundary=")
        .unwrap();
    let body = String::from_utf8_lossy(&received[0].body);
    assert!(body.starts_with(&format!("--{boundary}\r\n")));
    assert!(body.ends_with(&format!("--{boundary}--\r\n")));
    let file_at = body.find("name=\"file\"; filename=\"talk.wav\"").unwrap();
    let language_at = body.find("name=\"language\"").unwrap();
    let format_at = body.find("name=\"response_format\"").unwrap();
    assert!(file_at < language_at && language_at < format_at);
}

#[tokio::test]
async fn test_image_generation_and_edit() {
    let server = MockServer::start().await;
    let images = json!({"created": 1, "data": [{"url": "https://img/1.png"}]});
    Mock::given(method("POST"))
        .and(path("/openai/deployments/dalle/images/generations"))
        .and(body_partial_json(json!({"prompt": "a fox", "n": 1})))
        .respond_with(ResponseTemplate::new(200).set_body_json(images.clone()))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/openai/deployments/dalle/images/edits"))
        .respond_with(ResponseTemplate::new(200).set_body_json(images))
        .mount(&server)
        .await;

    let client = client(&server);
    let generated = client
        .generate_images(&ImageGenerationRequest {
            n: Some(1),
            ..ImageGenerationRequest::new("a fox")
        })
        .await
        .unwrap();
    assert_eq!(generated.data[0].url.as_deref(), Some("https://img/1.png"));

    let edited = client
        .edit_image(&ImageEditRequest::new(
            FileUpload::new("scene.png", vec![0x89, b'P', b'N', b'G']),
            "add a moon",
        ))
        .await
        .unwrap();
    assert_eq!(edited.data.len(), 1);
}

#[tokio::test]
async fn test_requests_after_shutdown_fail_with_client_closed() {
    let server = MockServer::start().await;
    let client = client(&server);
    client.shutdown();
    client.shutdown();

    let request = ChatCompletionRequest::new(vec![Message::user("Hi")]);
    let err = client.chat_completion(&request).await.unwrap_err();
    assert!(matches!(err, AzureError::ClientClosed));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_shared_transport_is_reused() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body()))
        .expect(2)
        .mount(&server)
        .await;

    let http = reqwest::Client::new();
    let first = AzureOpenAIClient::with_http_client("secret", config(&server), http.clone());
    let second = AzureOpenAIClient::with_http_client("secret", config(&server), http);
    let request = ChatCompletionRequest::new(vec![Message::user("Hi")]);

    first.chat_completion(&request).await.unwrap();
    first.shutdown();
    second.chat_completion(&request).await.unwrap();
}
