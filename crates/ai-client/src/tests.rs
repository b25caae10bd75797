/// Response parsing and HTTP behaviour against a local mock server.
#[cfg(test)]
mod unit {
    use crate::types::{ContentBlock, MessageResponse};

    #[test]
    fn text_joins_text_blocks_and_skips_tool_blocks() {
        let json = r#"{
            "id": "msg_01",
            "type": "message",
            "role": "assistant",
            "content": [
                {"type": "text", "text": "Looking that up."},
                {"type": "mcp_tool_use", "id": "t1", "name": "vault_get_project", "server_name": "vault-mcp", "input": {"id": 42}},
                {"type": "mcp_tool_result", "tool_use_id": "t1", "is_error": false, "content": []},
                {"type": "text", "text": "{\"name\": \"Checkout\"}"}
            ],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 120, "output_tokens": 40}
        }"#;
        let response: MessageResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.content.len(), 4);
        assert!(matches!(response.content[1], ContentBlock::Other));
        assert_eq!(response.text(), "Looking that up.\n{\"name\": \"Checkout\"}");
        assert_eq!(response.usage.unwrap().output_tokens, 40);
    }

    #[test]
    fn missing_content_is_empty_text() {
        let response: MessageResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(response.text(), "");
    }
}

#[cfg(test)]
mod http {
    use crate::{AiClient, AiClientError, AskOptions, ToolServer};
    use mockito::Matcher;
    use serde_json::json;
    use std::time::Duration;

    const OK_BODY: &str =
        r#"{"content": [{"type": "text", "text": "Beta shipped."}], "stop_reason": "end_turn"}"#;

    fn client(server: &mockito::Server) -> AiClient {
        AiClient::new("test-key")
            .unwrap()
            .with_base_url(server.url())
            .with_retry_base(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn ask_sends_model_and_returns_text() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/messages")
            .match_header("x-api-key", "test-key")
            .match_header("anthropic-version", "2023-06-01")
            .match_header("anthropic-beta", Matcher::Missing)
            .match_body(Matcher::PartialJson(json!({
                "model": "claude-sonnet-4-20250514",
                "max_tokens": 200,
                "messages": [{"role": "user", "content": "Summarize"}]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(OK_BODY)
            .create_async()
            .await;

        let options = AskOptions {
            max_tokens: Some(200),
            ..Default::default()
        };
        let answer = client(&server).ask("Summarize", &options).await.unwrap();
        mock.assert_async().await;
        assert_eq!(answer, "Beta shipped.");
    }

    #[tokio::test]
    async fn tools_attach_mcp_servers_with_beta_header() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/messages")
            .match_header("anthropic-beta", "mcp-client-2025-04-04")
            .match_body(Matcher::PartialJson(json!({
                "mcp_servers": [{
                    "type": "url",
                    "url": "https://vault.example.com/mcp",
                    "name": "vault-mcp",
                    "authorization_token": "vault-token"
                }]
            })))
            .with_status(200)
            .with_body(OK_BODY)
            .create_async()
            .await;

        let client = client(&server).with_tool(ToolServer {
            name: "vault-mcp".into(),
            url: "https://vault.example.com/mcp".into(),
            authorization_token: Some("vault-token".into()),
        });
        let options = AskOptions {
            tools: vec!["vault-mcp".into()],
            ..Default::default()
        };
        client.ask("Fetch project #43504", &options).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn unknown_tool_fails_before_sending() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/messages")
            .expect(0)
            .create_async()
            .await;
        let options = AskOptions {
            tools: vec!["nope".into()],
            ..Default::default()
        };
        let err = client(&server).ask("x", &options).await.unwrap_err();
        assert!(matches!(err, AiClientError::UnknownTool(ref name) if name == "nope"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn api_error_carries_status_and_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/messages")
            .with_status(400)
            .with_body(r#"{"error": {"message": "bad model"}}"#)
            .create_async()
            .await;
        let err = client(&server)
            .ask("x", &AskOptions::default())
            .await
            .unwrap_err();
        match err {
            AiClientError::Api { status, body } => {
                assert_eq!(status, 400);
                assert!(body.contains("bad model"));
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn persistent_rate_limit_gives_up_after_three_attempts() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/messages")
            .with_status(429)
            .expect(3)
            .create_async()
            .await;
        let err = client(&server)
            .ask("x", &AskOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AiClientError::RateLimited { attempts: 3 }));
        mock.assert_async().await;
    }

    #[test]
    fn from_env_requires_key() {
        let err = AiClient::from_env("WEEKLY_TEST_SURELY_UNSET_KEY").err().unwrap();
        assert!(matches!(err, AiClientError::MissingApiKey(_)));
    }
}
