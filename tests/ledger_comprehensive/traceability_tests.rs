//! Matrix builds over recorded runs

use tally::{Defect, RunOutcome, RunRequest, Story, TestCase};

use crate::test_utils::Fixture;

fn stories() -> Vec<Story> {
    vec![
        Story::new(7, "MS-005: Checkout"),
        Story::new(5, "Wishlist"),
        Story::new(9, "Gift cards"),
    ]
}

fn tests() -> Vec<TestCase> {
    vec![
        TestCase::new("shop/checkout_card", Some("MS-005")),
        TestCase::new("shop/checkout_paypal", Some("ms-5")),
        TestCase::new("shop/checkout_cash", Some("#7")),
        TestCase::new("shop/wishlist_add", Some("5")),
        TestCase::new("shop/legacy", None),
    ]
}

fn record(f: &Fixture, path: &str, result: RunOutcome) {
    f.tally.record_run(RunRequest::new(path, result)).unwrap();
}

#[test]
fn test_matrix_from_recorded_runs() {
    let f = Fixture::new();
    record(&f, "shop/checkout_card", RunOutcome::Pass);
    record(&f, "shop/checkout_paypal", RunOutcome::Fail);
    f.tick();
    record(&f, "shop/checkout_paypal", RunOutcome::Pass);
    record(&f, "shop/wishlist_add", RunOutcome::Fail);

    let defects = vec![
        Defect::new(40, "Card declined").with_story_ref("MS-5"),
        Defect::new(41, "Stray"),
    ];
    let matrix = f
        .tally
        .build_matrix(&stories(), &tests(), &defects, false)
        .unwrap();

    let checkout = matrix.entry(7).unwrap();
    assert_eq!(checkout.test_count, 3);
    assert_eq!((checkout.pass, checkout.fail, checkout.no_run), (2, 0, 1));
    assert_eq!(checkout.coverage_percent, 66.7);
    assert_eq!(checkout.defects, vec![40]);

    // Plain "5" belongs to story 5, never to MS-005. Story 5 has no custom
    // id, so references spelled MS-005 reach it by number as well.
    let wishlist = matrix.entry(5).unwrap();
    let paths: Vec<&str> = wishlist.tests.iter().map(|t| t.path.as_str()).collect();
    assert_eq!(
        paths,
        vec!["shop/checkout_card", "shop/checkout_paypal", "shop/wishlist_add"]
    );
    assert_eq!((wishlist.pass, wishlist.fail), (2, 1));
    assert_eq!(wishlist.defects, vec![40]);
    assert_eq!(matrix.summary.matched_tests, 4);

    assert_eq!(matrix.gaps.stories_without_tests, vec![9]);
    assert_eq!(matrix.gaps.orphan_tests, vec!["shop/legacy"]);
    assert_eq!(matrix.gaps.unlinked_defects, vec![41]);
}

#[test]
fn test_matrix_cached_until_forced() {
    let f = Fixture::new();
    let first = f.tally.build_matrix(&stories(), &tests(), &[], false).unwrap();
    assert_eq!(first.summary.pass, 0);

    record(&f, "shop/checkout_card", RunOutcome::Pass);
    let cached = f.tally.build_matrix(&stories(), &tests(), &[], false).unwrap();
    assert_eq!(cached.summary.pass, 0);
    assert_eq!(cached.fetched_at, first.fetched_at);

    let forced = f.tally.build_matrix(&stories(), &tests(), &[], true).unwrap();
    assert_eq!(forced.summary.pass, 1);
}

#[test]
fn test_matrix_refreshes_after_ttl() {
    let f = Fixture::new();
    f.tally.build_matrix(&stories(), &tests(), &[], false).unwrap();
    record(&f, "shop/checkout_card", RunOutcome::Pass);

    f.clock.advance_ms(60_000);
    let matrix = f.tally.build_matrix(&stories(), &tests(), &[], false).unwrap();
    assert_eq!(matrix.summary.pass, 1);
}

#[test]
fn test_delete_run_invalidates_matrix() {
    let f = Fixture::new();
    let run = f
        .tally
        .record_run(RunRequest::new("shop/checkout_card", RunOutcome::Pass))
        .unwrap();
    let before = f.tally.build_matrix(&stories(), &tests(), &[], false).unwrap();
    assert_eq!(before.summary.pass, 1);

    f.tally
        .delete_run("shop/checkout_card", &run.record_ref.run_file.to_string())
        .unwrap();
    let after = f.tally.build_matrix(&stories(), &tests(), &[], false).unwrap();
    assert_eq!(after.summary.pass, 0);
    assert_eq!(after.entry(7).unwrap().no_run, 3);
}

#[test]
fn test_matrix_ignores_pointer_files() {
    let f = Fixture::new();
    record(&f, "shop/checkout_card", RunOutcome::Fail);
    f.tally.ledger().rebuild_latest("shop/checkout_card").unwrap();

    let matrix = f.tally.build_matrix(&stories(), &tests(), &[], true).unwrap();
    assert_eq!(matrix.summary.fail, 1);
    assert_eq!(matrix.summary.tests, 5);
}

#[test]
fn test_matrix_is_deterministic() {
    let f = Fixture::new();
    record(&f, "shop/checkout_card", RunOutcome::Pass);
    let a = f.tally.build_matrix(&stories(), &tests(), &[], true).unwrap();
    let b = f.tally.build_matrix(&stories(), &tests(), &[], true).unwrap();
    assert_eq!(
        serde_json::to_string(&*a).unwrap(),
        serde_json::to_string(&*b).unwrap()
    );
}
