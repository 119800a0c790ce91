//! Test registry - all test cases are registered here

pub mod basic;
pub mod fallback;
pub mod helpers;

use crate::runner::TestCase;

/// Build and return all test cases
///
/// Tests are grouped by category. Each test:
/// 1. Queues mock upstream responses (what the hosted API would return)
/// 2. Sends a request to the REAL relay
/// 3. Validates the response and what the upstream received
pub fn all_tests() -> Vec<TestCase> {
    macro_rules! test {
        ($name:expr, $desc:expr, $func:path) => {
            TestCase {
                name: $name,
                description: $desc,
                run: Box::new(|ctx| Box::pin($func(ctx))),
            }
        };
    }

    vec![
        // ── Basic behavior ────────────────────────────────────────────────────
        test!(
            "basic/streaming_passthrough",
            "Upstream SSE is forwarded byte-for-byte with X-Model-Used",
            basic::test_streaming_passthrough
        ),
        test!(
            "basic/upstream_request_shape",
            "Relay sends stream, safe_prompt, temperature and bearer auth upstream",
            basic::test_upstream_request_shape
        ),
        test!(
            "basic/placeholder_stripped",
            "Empty assistant placeholder is not sent upstream",
            basic::test_placeholder_stripped
        ),
        test!(
            "basic/model_override",
            "Preferred model override and temperature are honored",
            basic::test_model_override
        ),
        test!(
            "basic/bad_request_body",
            "Malformed request body gets a 400 without an upstream call",
            basic::test_bad_request_body
        ),

        // ── Fallback ──────────────────────────────────────────────────────────
        test!(
            "fallback/retry_same_model",
            "A capacity error on the preferred model is retried once",
            fallback::test_retry_same_model
        ),
        test!(
            "fallback/second_fallback",
            "Capacity on preferred x2 and first fallback lands on second fallback",
            fallback::test_lands_on_second_fallback
        ),
        test!(
            "fallback/overloaded_message",
            "Capacity wording in a non-429 error triggers a retry",
            fallback::test_overloaded_message
        ),
        test!(
            "fallback/exhausted",
            "All candidates at capacity gives 503 naming every model",
            fallback::test_all_candidates_exhausted
        ),
        test!(
            "fallback/non_capacity_stops",
            "A 400 from upstream is returned verbatim with no further attempts",
            fallback::test_non_capacity_error_stops
        ),

        // ── Pass-through ─────────────────────────────────────────────────────
        test!(
            "passthrough/health",
            "/health is answered by the relay with OK",
            passthrough::test_health
        ),
        test!(
            "passthrough/unauthorized",
            "Upstream 401 status and body reach the client",
            passthrough::test_unauthorized_passthrough
        ),
        test!(
            "passthrough/server_error",
            "Upstream 500 is forwarded without retry",
            passthrough::test_server_error_passthrough
        ),
    ]
}
