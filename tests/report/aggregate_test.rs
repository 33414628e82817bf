//! Verdict aggregation and headline selection.

use serde_json::json;

use truth_serum::classifier::{classify, RunMode, Verdict, VerdictKind};
use truth_serum::report::{aggregate, worst_kind, Headline};

use crate::support::{default_deny, result, target};

fn pass() -> Verdict {
    classify(
        &result(
            "twitter",
            200,
            json!({"success": true, "tweetId": "1987654321098765432"}),
        ),
        &target("twitter"),
        RunMode::Strict,
        &default_deny(),
    )
}

fn fail() -> Verdict {
    classify(
        &result("facebook", 500, json!({"error": "upstream"})),
        &target("facebook"),
        RunMode::Strict,
        &default_deny(),
    )
}

fn disabled() -> Verdict {
    classify(
        &result("linkedin", 200, json!({"success": false, "disabled": true})),
        &target("linkedin"),
        RunMode::Strict,
        &default_deny(),
    )
}

fn liar() -> Verdict {
    classify(
        &result("linkedin", 200, json!({"success": true, "postId": "mock-post-1"})),
        &target("linkedin"),
        RunMode::Strict,
        &default_deny(),
    )
}

fn suspicious_fail() -> Verdict {
    classify(
        &result("twitter", 404, json!({"message": "?"})),
        &target("twitter"),
        RunMode::Strict,
        &default_deny(),
    )
}

#[test]
fn empty_run_has_zero_counts_and_no_worst() {
    let summary = aggregate(&[]);
    assert_eq!(summary.total, 0);
    assert!(summary.all_honest);
    assert_eq!(worst_kind(&[]), None);
    assert_eq!(Headline::for_verdicts(&[]), Headline::NoTargetsProbed);
}

#[test]
fn counts_partition_the_total() {
    let verdicts = vec![pass(), pass(), fail(), disabled(), liar()];
    let s = aggregate(&verdicts);

    assert_eq!(s.total, 5);
    assert_eq!(s.pass, 2);
    assert_eq!(s.fail, 1);
    assert_eq!(s.disabled, 1);
    assert_eq!(s.liars, 1);
    assert_eq!(s.pass + s.fail + s.disabled + s.liars, s.total);
    assert!(!s.all_honest);
}

#[test]
fn all_honest_requires_every_verdict_truthful() {
    assert!(aggregate(&[pass(), fail(), disabled()]).all_honest);
    assert!(!aggregate(&[pass(), suspicious_fail()]).all_honest);
}

#[test]
fn headline_follows_worst_verdict() {
    assert_eq!(
        Headline::for_verdicts(&[pass(), pass()]),
        Headline::AllClaimsVerified
    );
    assert_eq!(
        Headline::for_verdicts(&[pass(), disabled()]),
        Headline::TargetsDisabled
    );
    assert_eq!(
        Headline::for_verdicts(&[disabled(), fail(), pass()]),
        Headline::FailuresDetected
    );
    assert_eq!(
        Headline::for_verdicts(&[fail(), liar(), disabled()]),
        Headline::DishonestyDetected
    );
}

#[test]
fn worst_kind_uses_severity_not_order() {
    assert_eq!(
        worst_kind(&[liar(), pass(), fail()]),
        Some(VerdictKind::LiarDetected)
    );
    assert_eq!(worst_kind(&[disabled(), pass()]), Some(VerdictKind::Disabled));
}

#[test]
fn severity_ranks_are_strictly_ordered() {
    assert!(VerdictKind::LiarDetected.severity() > VerdictKind::Fail.severity());
    assert!(VerdictKind::Fail.severity() > VerdictKind::Disabled.severity());
    assert!(VerdictKind::Disabled.severity() > VerdictKind::Pass.severity());
}

#[test]
fn appending_a_pass_never_improves_honesty_or_headline() {
    let starts = vec![
        vec![suspicious_fail()],
        vec![liar()],
        vec![pass(), liar()],
        vec![suspicious_fail(), disabled()],
    ];
    for start in starts {
        let before_honest = aggregate(&start).all_honest;
        let before_headline = Headline::for_verdicts(&start);

        let mut extended = start.clone();
        extended.push(pass());
        let after = aggregate(&extended);

        assert!(!before_honest);
        assert!(!after.all_honest, "a PASS made a dishonest run honest");
        assert_eq!(Headline::for_verdicts(&extended), before_headline);
        assert_eq!(after.total, aggregate(&start).total + 1);
    }

    let mut dishonest = vec![liar()];
    for _ in 0..5 {
        dishonest.push(pass());
        assert_eq!(Headline::for_verdicts(&dishonest), Headline::DishonestyDetected);
    }
}
