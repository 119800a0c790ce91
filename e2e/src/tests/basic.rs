//! Basic relay behavior - verbatim streaming, upstream request shape, input handling

use serde_json::json;

use crate::backend::{drain_requests, queue_response};
use crate::client::{send_chat, send_streaming};
use crate::runner::TestContext;
use crate::types::MockResponse;

use super::helpers::*;

/// The upstream event stream reaches the client unchanged
pub async fn test_streaming_passthrough(ctx: TestContext) -> anyhow::Result<()> {
    let upstream = MockResponse::sse(upstream_stream(&["Bonjour", " !"]));
    let expected_raw = upstream.body();
    queue_response(&ctx.backend_state, upstream);

    let resp = send_streaming(&ctx.http_client, &ctx.relay_addr, basic_request("Salut")).await?;

    assert_true(resp.has_done_marker(), "SSE stream must end with [DONE]")?;
    assert_eq_str(&resp.accumulated_content(), "Bonjour !", "accumulated content")?;
    assert_eq_str(&resp.raw, &expected_raw, "raw stream body")?;
    assert_eq_str(
        resp.model_used.as_deref().unwrap_or(""),
        "mistral-large-latest",
        "X-Model-Used",
    )?;

    Ok(())
}

/// The relay sends a streaming request with credentials to the upstream
pub async fn test_upstream_request_shape(ctx: TestContext) -> anyhow::Result<()> {
    queue_response(&ctx.backend_state, MockResponse::sse(upstream_stream(&["ok"])));

    send_streaming(&ctx.http_client, &ctx.relay_addr, basic_request("hi")).await?;

    let reqs = drain_requests(&ctx.backend_state);
    assert_true(reqs.len() == 1, &format!("Expected 1 upstream request, got {}", reqs.len()))?;
    let req = &reqs[0];

    assert_eq_str(req.model(), "mistral-large-latest", "model")?;
    assert_true(req.body["stream"] == json!(true), "Relay must request stream:true")?;
    assert_true(req.body["safe_prompt"] == json!(true), "Relay must request safe_prompt:true")?;
    let temperature = req.body["temperature"].as_f64().unwrap_or(-1.0);
    assert_true(
        (temperature - 0.2).abs() < 1e-6,
        &format!("Expected default temperature 0.2, got {}", temperature),
    )?;
    assert_eq_str(
        req.authorization.as_deref().unwrap_or(""),
        "Bearer e2e-test-key",
        "Authorization header",
    )?;
    assert_eq_str(req.accept.as_deref().unwrap_or(""), "text/event-stream", "Accept header")?;

    Ok(())
}

/// The empty assistant placeholder never reaches the upstream
pub async fn test_placeholder_stripped(ctx: TestContext) -> anyhow::Result<()> {
    queue_response(&ctx.backend_state, MockResponse::sse(upstream_stream(&["ok"])));

    send_streaming(&ctx.http_client, &ctx.relay_addr, request_with_placeholder("hi")).await?;

    let reqs = drain_requests(&ctx.backend_state);
    let messages = reqs
        .first()
        .and_then(|r| r.body["messages"].as_array().cloned())
        .ok_or_else(|| anyhow::anyhow!("Upstream received no messages"))?;
    assert_true(
        messages.len() == 1,
        &format!("Placeholder must be dropped, upstream got {} messages", messages.len()),
    )?;
    assert_true(messages[0]["role"] == json!("user"), "Remaining message must be the user turn")?;

    Ok(())
}

/// A preferred-model override and temperature are honored
pub async fn test_model_override(ctx: TestContext) -> anyhow::Result<()> {
    queue_response(&ctx.backend_state, MockResponse::sse(upstream_stream(&["ok"])));

    let body = json!({
        "messages": [{"role": "user", "content": "hi"}],
        "model": "open-mistral-nemo",
        "temperature": 0.7
    });
    let resp = send_streaming(&ctx.http_client, &ctx.relay_addr, body).await?;

    assert_eq_str(resp.model_used.as_deref().unwrap_or(""), "open-mistral-nemo", "X-Model-Used")?;
    let reqs = drain_requests(&ctx.backend_state);
    assert_eq_str(reqs[0].model(), "open-mistral-nemo", "upstream model")?;
    let temperature = reqs[0].body["temperature"].as_f64().unwrap_or(-1.0);
    assert_true((temperature - 0.7).abs() < 1e-6, &format!("Expected temperature 0.7, got {}", temperature))?;

    Ok(())
}

/// A body without messages is rejected before any upstream call
pub async fn test_bad_request_body(ctx: TestContext) -> anyhow::Result<()> {
    let resp = send_chat(&ctx.http_client, &ctx.relay_addr, json!({"msgs": []})).await?;

    assert_true(resp.status == 400, &format!("Expected 400, got {}", resp.status))?;
    assert_true(
        resp.body.contains("Invalid request body"),
        &format!("Expected a descriptive error, got: {:?}", resp.body),
    )?;
    assert_true(drain_requests(&ctx.backend_state).is_empty(), "Upstream must not be called")?;

    Ok(())
}
