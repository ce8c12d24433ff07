//! Property-based tests for the Gemini translation layer
//!
//! - Request translation preserves turn order, roles and text
//! - Empty turns never reach the wire
//! - Normalized responses are never empty

use super::gemini::test_helpers::{normalize_json, request_json};
use super::types::{LlmMessage, LlmRequest, MessageRole, SystemContent};
use proptest::prelude::*;
use serde_json::json;

fn arb_message() -> impl Strategy<Value = LlmMessage> {
    (
        prop_oneof![Just(MessageRole::User), Just(MessageRole::Model)],
        "[a-zA-Z0-9 _.!?,*`\n]{0,80}",
    )
        .prop_map(|(role, text)| LlmMessage { role, text })
}

fn arb_request() -> impl Strategy<Value = LlmRequest> {
    (
        proptest::collection::vec(arb_message(), 0..12),
        proptest::option::of(1u32..4096),
        proptest::collection::vec("[a-zA-Z ]{1,40}", 0..3),
    )
        .prop_map(|(messages, max_tokens, system)| LlmRequest {
            system: system.into_iter().map(SystemContent::new).collect(),
            messages,
            max_tokens,
        })
}

proptest! {
    #[test]
    fn prop_translation_preserves_order_and_roles(request in arb_request()) {
        let body = request_json(&request);
        let contents = body["contents"].as_array().cloned().unwrap_or_default();

        let expected: Vec<_> = request.messages.iter().filter(|m| !m.text.is_empty()).collect();
        prop_assert_eq!(contents.len(), expected.len());

        for (wire, msg) in contents.iter().zip(expected) {
            let role = match msg.role {
                MessageRole::User => "user",
                MessageRole::Model => "model",
            };
            prop_assert_eq!(wire["role"].as_str(), Some(role));
            prop_assert_eq!(wire["parts"][0]["text"].as_str(), Some(msg.text.as_str()));
        }
    }

    #[test]
    fn prop_generation_bound_round_trips(request in arb_request()) {
        let body = request_json(&request);
        match request.max_tokens {
            Some(max) => prop_assert_eq!(
                body["generationConfig"]["maxOutputTokens"].as_u64(),
                Some(u64::from(max))
            ),
            None => prop_assert!(body.get("generationConfig").is_none()),
        }
    }

    #[test]
    fn prop_system_instruction_joins_all_parts(request in arb_request()) {
        let body = request_json(&request);
        if request.system.is_empty() {
            prop_assert!(body.get("systemInstruction").is_none());
        } else {
            let text = body["systemInstruction"]["parts"][0]["text"].as_str().unwrap_or_default();
            for part in &request.system {
                prop_assert!(text.contains(part.text.as_str()));
            }
        }
    }

    #[test]
    fn prop_normalize_ok_implies_nonempty(
        parts in proptest::collection::vec("[a-zA-Z0-9 ]{0,20}", 0..4)
    ) {
        let wire_parts: Vec<_> = parts.iter().map(|p| json!({"text": p})).collect();
        let result = normalize_json(&json!({
            "candidates": [{"content": {"parts": wire_parts}, "finishReason": "STOP"}]
        }));

        let joined: String = parts.concat();
        if joined.trim().is_empty() {
            prop_assert!(result.is_err());
        } else {
            let resp = result.unwrap();
            prop_assert_eq!(resp.text, joined);
        }
    }
}
