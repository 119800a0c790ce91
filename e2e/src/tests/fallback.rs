//! Model fallback - capacity retries, fallback order and exhaustion

use crate::backend::{drain_requests, queue_response};
use crate::client::{send_chat, send_streaming};
use crate::runner::TestContext;
use crate::types::MockResponse;

use super::helpers::*;

fn upstream_models(ctx: &TestContext) -> Vec<String> {
    drain_requests(&ctx.backend_state)
        .iter()
        .map(|r| r.model().to_string())
        .collect()
}

/// One capacity error on the preferred model is retried on the same model
pub async fn test_retry_same_model(ctx: TestContext) -> anyhow::Result<()> {
    queue_response(&ctx.backend_state, MockResponse::capacity_exceeded());
    queue_response(&ctx.backend_state, MockResponse::sse(upstream_stream(&["ok"])));

    let resp = send_streaming(&ctx.http_client, &ctx.relay_addr, basic_request("hi")).await?;

    assert_eq_str(resp.model_used.as_deref().unwrap_or(""), "mistral-large-latest", "X-Model-Used")?;
    let models = upstream_models(&ctx);
    assert_true(
        models == ["mistral-large-latest", "mistral-large-latest"],
        &format!("Unexpected attempt order: {:?}", models),
    )?;

    Ok(())
}

/// Preferred x2 and first fallback x1 at capacity, second fallback answers
pub async fn test_lands_on_second_fallback(ctx: TestContext) -> anyhow::Result<()> {
    for _ in 0..3 {
        queue_response(&ctx.backend_state, MockResponse::capacity_exceeded());
    }
    queue_response(&ctx.backend_state, MockResponse::sse(upstream_stream(&["from small"])));

    let resp = send_streaming(&ctx.http_client, &ctx.relay_addr, basic_request("hi")).await?;

    assert_eq_str(resp.model_used.as_deref().unwrap_or(""), "mistral-small-latest", "X-Model-Used")?;
    assert_eq_str(&resp.accumulated_content(), "from small", "content")?;
    let models = upstream_models(&ctx);
    assert_true(
        models
            == [
                "mistral-large-latest",
                "mistral-large-latest",
                "mistral-medium-latest",
                "mistral-small-latest",
            ],
        &format!("Unexpected attempt order: {:?}", models),
    )?;

    Ok(())
}

/// A capacity message without a 429 status still counts as a capacity error
pub async fn test_overloaded_message(ctx: TestContext) -> anyhow::Result<()> {
    queue_response(
        &ctx.backend_state,
        MockResponse::error(503, r#"{"object":"error","message":"Model is overloaded, try again later"}"#),
    );
    queue_response(&ctx.backend_state, MockResponse::sse(upstream_stream(&["ok"])));

    let resp = send_streaming(&ctx.http_client, &ctx.relay_addr, basic_request("hi")).await?;

    assert_eq_str(resp.model_used.as_deref().unwrap_or(""), "mistral-large-latest", "X-Model-Used")?;
    assert_true(upstream_models(&ctx).len() == 2, "Expected exactly one retry")?;

    Ok(())
}

/// Every candidate at capacity gives a 503 naming all of them
pub async fn test_all_candidates_exhausted(ctx: TestContext) -> anyhow::Result<()> {
    for _ in 0..4 {
        queue_response(&ctx.backend_state, MockResponse::capacity_exceeded());
    }

    let resp = send_chat(&ctx.http_client, &ctx.relay_addr, basic_request("hi")).await?;

    assert_true(resp.status == 503, &format!("Expected 503, got {}", resp.status))?;
    for model in ["mistral-large-latest", "mistral-medium-latest", "mistral-small-latest"] {
        assert_true(
            resp.body.contains(model),
            &format!("Error should name {}, got: {:?}", model, resp.body),
        )?;
    }
    assert_true(resp.model_used.is_none(), "No X-Model-Used on failure")?;
    assert_true(upstream_models(&ctx).len() == 4, "Expected 4 upstream attempts")?;

    Ok(())
}

/// A non-capacity error stops the fallback chain at once
pub async fn test_non_capacity_error_stops(ctx: TestContext) -> anyhow::Result<()> {
    let body = r#"{"object":"error","message":"Assistant message must have either content or tool_calls","type":"invalid_request_message_order"}"#;
    queue_response(&ctx.backend_state, MockResponse::error(400, body));
    queue_response(&ctx.backend_state, MockResponse::sse(upstream_stream(&["unused"])));

    let resp = send_chat(&ctx.http_client, &ctx.relay_addr, basic_request("hi")).await?;

    assert_true(resp.status == 400, &format!("Expected 400, got {}", resp.status))?;
    assert_eq_str(&resp.body, body, "error body")?;
    assert_true(upstream_models(&ctx).len() == 1, "No further attempts after a non-capacity error")?;

    Ok(())
}
