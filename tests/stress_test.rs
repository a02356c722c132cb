mod common;

use common::{Example, TestFixture, t42};
use settings_records::SettingsRecord;
use std::sync::{Arc, Barrier};
use std::thread;
use time::OffsetDateTime;

#[test]
fn test_concurrent_sets_on_different_fields() {
    let fixture = TestFixture::new();
    let store = Arc::new(fixture.reopen());
    let barrier = Arc::new(Barrier::new(2));

    let flag = {
        let s = Arc::clone(&store);
        let b = Arc::clone(&barrier);
        thread::spawn(move || {
            b.wait();
            for i in 0..200 {
                s.set(|r| &mut r.is_on, i % 2 == 0);
            }
            s.set(|r| &mut r.is_on, true);
        })
    };
    let url = {
        let s = Arc::clone(&store);
        let b = Arc::clone(&barrier);
        thread::spawn(move || {
            b.wait();
            for i in 0..200 {
                s.set(|r| &mut r.api, Some(format!("https://{i}.example")));
            }
        })
    };

    flag.join().unwrap();
    url.join().unwrap();

    // Neither writer's last value was lost to the other
    let snapshot = store.snapshot();
    assert!(snapshot.is_on);
    assert_eq!(snapshot.api.as_deref(), Some("https://199.example"));

    // The last durable write carries the same record as the cache
    store.flush().unwrap();
    assert_eq!(fixture.reopen().snapshot(), snapshot);
}

#[test]
fn test_mixed_readers_and_writers() {
    let fixture = TestFixture::new();
    let store = Arc::new(fixture.reopen());
    let barrier = Arc::new(Barrier::new(10));
    let mut handles = vec![];

    for i in 0..10 {
        let s = Arc::clone(&store);
        let b = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            b.wait();
            for _ in 0..50 {
                if i % 2 == 0 {
                    // A record is always one of the whole values written
                    let r = s.snapshot();
                    assert!(r == Example::empty() || r.armed_at == t42());
                    assert_eq!(r.is_on, r.api.is_some());
                } else if i % 3 == 0 {
                    s.save(Example {
                        is_on: true,
                        api: Some("https://example.com".into()),
                        armed_at: t42(),
                    });
                } else {
                    s.erase();
                }
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    store.flush().unwrap();
    assert_eq!(fixture.reopen().snapshot(), store.snapshot());
}

#[test]
fn test_concurrent_updates_are_serialized() {
    let fixture = TestFixture::new();
    let store = Arc::new(fixture.reopen());
    let barrier = Arc::new(Barrier::new(4));
    let mut handles = vec![];

    for _ in 0..4 {
        let s = Arc::clone(&store);
        let b = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            b.wait();
            for _ in 0..25 {
                s.update(|r| r.armed_at += time::Duration::seconds(1));
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    let expected = OffsetDateTime::UNIX_EPOCH + time::Duration::seconds(100);
    assert_eq!(store.get(|r| r.armed_at), expected);

    store.flush().unwrap();
    assert_eq!(fixture.reopen().get(|r| r.armed_at), expected);
}
