//! Change observation tests
//!
//! Subscriptions start with the stored record and follow every committed
//! change, whether it came from this store or another connection.

mod common;

use common::{Example, TestFixture, WAIT, t42};
use settings_records::SettingsRecord;
use time::OffsetDateTime;

#[test]
fn test_first_snapshot_is_current_state() {
    let fixture = TestFixture::new();
    fixture.store.set(|s| &mut s.is_on, true);
    fixture.store.flush().unwrap();

    let changes = fixture.store.observe();
    let first = changes.recv_timeout(WAIT).unwrap();
    assert!(first.is_on);
}

#[test]
fn test_own_writes_are_observed() {
    let fixture = TestFixture::new();
    let changes = fixture.store.observe();
    assert_eq!(changes.recv_timeout(WAIT), Some(Example::empty()));

    fixture.store.set(|s| &mut s.api, Some("https://example.com".into()));

    let updated = std::iter::from_fn(|| changes.recv_timeout(WAIT)).find(|s| s.api.is_some());
    assert_eq!(
        updated.and_then(|s| s.api).as_deref(),
        Some("https://example.com")
    );
}

#[test]
fn test_observed_record_matches_cache() {
    let fixture = TestFixture::new();
    let changes = fixture.store.observe();
    assert_eq!(changes.recv_timeout(WAIT), Some(Example::empty()));

    fixture.store.set(|s| &mut s.armed_at, OffsetDateTime::now_utc());
    let cached = fixture.store.snapshot();

    let observed = std::iter::from_fn(|| changes.recv_timeout(WAIT)).find(|s| *s != Example::empty());
    assert_eq!(observed, Some(cached));
}

#[test]
fn test_erase_is_observed_as_empty() {
    let fixture = TestFixture::new();
    fixture.store.save(Example {
        is_on: true,
        api: Some("https://example.com".into()),
        armed_at: t42(),
    });
    fixture.store.flush().unwrap();

    let changes = fixture.store.observe();
    assert!(changes.recv_timeout(WAIT).unwrap().is_on);

    fixture.store.erase();
    fixture.store.flush().unwrap();

    let mut last = None;
    while let Some(snapshot) = changes.recv_timeout(WAIT) {
        let done = snapshot == Example::empty();
        last = Some(snapshot);
        if done {
            break;
        }
    }
    assert_eq!(last, Some(Example::empty()));
}

#[test]
fn test_other_store_writes_reach_subscribers() {
    let fixture = TestFixture::new();
    let changes = fixture.store.observe();
    assert_eq!(changes.recv_timeout(WAIT), Some(Example::empty()));

    let other = fixture.reopen();
    other.set(|s| &mut s.armed_at, t42());
    other.flush().unwrap();

    let observed = std::iter::from_fn(|| changes.recv_timeout(WAIT))
        .find(|s| s.armed_at == t42());
    assert!(observed.is_some());

    // The first store's cache is not refreshed by observation
    assert_eq!(fixture.store.get(|s| s.armed_at), Example::empty().armed_at);
}

#[test]
fn test_dropping_subscription_unregisters() {
    let fixture = TestFixture::new();
    let first = fixture.store.observe();
    let second = fixture.store.observe();
    assert_eq!(fixture.store.database().subscriber_count(), 2);

    drop(first);
    assert_eq!(fixture.store.database().subscriber_count(), 1);

    drop(second);
    assert_eq!(fixture.store.database().subscriber_count(), 0);
}

#[test]
fn test_subscription_ends_with_store() {
    let fixture = TestFixture::new();
    let TestFixture { temp_dir, store } = fixture;
    let changes = store.observe();
    assert!(changes.recv_timeout(WAIT).is_some());

    drop(store);
    assert_eq!(changes.recv(), None);
    drop(temp_dir);
}
