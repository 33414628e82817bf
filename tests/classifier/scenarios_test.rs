//! End-to-end classification scenarios and classifier properties.

use serde_json::json;

use truth_serum::classifier::{classify, Honesty, RunMode, VerdictKind};
use truth_serum::exit_code::translate;
use truth_serum::probe::{ProbeResult, TransportError};
use truth_serum::report::{aggregate, Headline};

use crate::support::{captured_at, default_deny, result, target};

#[test]
fn scenario_real_tweet_passes_with_exit_zero() {
    let r = result(
        "twitter",
        200,
        json!({"success": true, "tweetId": "1987654321098765432"}),
    );
    let v = classify(&r, &target("twitter"), RunMode::Strict, &default_deny());

    assert_eq!(v.verdict_kind, VerdictKind::Pass);
    assert_eq!(v.honesty, Honesty::Truthful);
    assert_eq!(translate(&aggregate(&[v]), RunMode::Strict), 0);
}

#[test]
fn scenario_mock_tweet_is_liar_with_exit_two() {
    let r = result("twitter", 200, json!({"success": true, "tweetId": "mock-12345"}));
    let v = classify(&r, &target("twitter"), RunMode::Strict, &default_deny());

    assert_eq!(v.verdict_kind, VerdictKind::LiarDetected);
    assert_eq!(translate(&aggregate(&[v]), RunMode::Strict), 2);
}

#[test]
fn scenario_unconfigured_keys_strict_vs_lenient() {
    let deny = default_deny();
    let r = result(
        "twitter",
        200,
        json!({"success": false, "disabled": true, "error": "keys not configured"}),
    );

    let strict = classify(&r, &target("twitter"), RunMode::Strict, &deny);
    assert_eq!(strict.verdict_kind, VerdictKind::Disabled);
    assert_eq!(translate(&aggregate(&[strict]), RunMode::Strict), 1);

    let lenient = classify(&r, &target("twitter"), RunMode::Lenient, &deny);
    assert_eq!(lenient.verdict_kind, VerdictKind::Pass);
    assert_eq!(translate(&aggregate(&[lenient]), RunMode::Lenient), 0);
}

#[test]
fn scenario_connection_refused_is_truthful_fail() {
    let error = TransportError::Connect("tcp connect error: Connection refused".to_owned());
    let r = ProbeResult::transport_failure("twitter", &error, 3, captured_at());
    assert_eq!(r.http_status, 0);
    assert!(r.is_transport_failure());

    let v = classify(&r, &target("twitter"), RunMode::Strict, &default_deny());

    assert_eq!(v.verdict_kind, VerdictKind::Fail);
    assert_eq!(v.honesty, Honesty::Truthful);
    assert!(v.reasons[0].contains("unreachable"));
}

#[test]
fn scenario_worst_result_dominates() {
    let deny = default_deny();
    let good = classify(
        &result(
            "twitter",
            200,
            json!({"success": true, "tweetId": "1987654321098765432"}),
        ),
        &target("twitter"),
        RunMode::Strict,
        &deny,
    );
    let liar = classify(
        &result("linkedin", 200, json!({"success": true, "postId": "fake-post-0001"})),
        &target("linkedin"),
        RunMode::Strict,
        &deny,
    );
    let verdicts = vec![good, liar];
    let summary = aggregate(&verdicts);

    assert_eq!(summary.liars, 1);
    assert_eq!(summary.pass, 1);
    assert_eq!(Headline::for_verdicts(&verdicts).banner(), "DISHONESTY DETECTED");
    assert_eq!(translate(&summary, RunMode::Strict), 2);
}

#[test]
fn fake_prefixes_always_liar() {
    let deny = default_deny();
    for prefix in ["mock-", "fake-", "test-", "placeholder"] {
        let id = format!("{prefix}1987654321098765432");
        let r = result("twitter", 200, json!({"success": true, "tweetId": id}));
        let v = classify(&r, &target("twitter"), RunMode::Lenient, &deny);
        assert_eq!(v.verdict_kind, VerdictKind::LiarDetected, "prefix {prefix}");
    }
}

#[test]
fn classification_is_idempotent() {
    let deny = default_deny();
    let bodies = [
        json!({"success": true, "tweetId": "1987654321098765432"}),
        json!({"success": true, "tweetId": "mock-1"}),
        json!({"success": true, "tweetId": "1987654321098765432", "invoice": {"timestamp": "2026-03-01T11:00:00Z"}}),
        json!({"disabled": true}),
        json!({"success": false, "error": "boom"}),
    ];
    for body in bodies {
        let r = result("twitter", 200, body);
        let first = classify(&r, &target("twitter"), RunMode::Strict, &deny);
        let second = classify(&r, &target("twitter"), RunMode::Strict, &deny);
        assert_eq!(first, second);
    }
}

#[test]
fn classifier_never_returns_outside_the_four_kinds() {
    let deny = default_deny();
    for status in [0_u16, 100, 200, 204, 301, 400, 401, 403, 404, 418, 429, 500, 599] {
        for body in ["", "null", "[]", "{}", "{\"success\":true}", "garbage"] {
            let mut r = result("twitter", status, json!(null));
            r.raw_body = body.to_owned();
            let v = classify(&r, &target("twitter"), RunMode::Strict, &deny);
            assert!(matches!(
                v.verdict_kind,
                VerdictKind::Pass | VerdictKind::Fail | VerdictKind::Disabled | VerdictKind::LiarDetected
            ));
            assert!(!v.reasons.is_empty(), "status {status} body {body:?}");
        }
    }
}
