//! In-memory copy of the current record
//!
//! Every operation goes through a single critical section, and no critical
//! section calls back into the cache, so a plain non-reentrant mutex is
//! enough. Nothing inside the guard does I/O.

use crate::record::SettingsRecord;
use crate::sync::MutexExt;
use std::sync::Mutex;

pub struct SettingsCache<R> {
    current: Mutex<R>,
}

impl<R: SettingsRecord> SettingsCache<R> {
    pub fn new(initial: R) -> Self {
        Self {
            current: Mutex::new(initial),
        }
    }

    fn critical_section<T>(&self, f: impl FnOnce(&mut R) -> T) -> T {
        let mut guard = self.current.lock_recovered();
        f(&mut *guard)
    }

    /// Read one field of the cached record
    pub fn read<T>(&self, field: impl FnOnce(&R) -> T) -> T {
        self.critical_section(|record| field(record))
    }

    /// Copy of the whole cached record
    pub fn snapshot(&self) -> R {
        self.critical_section(|record| record.clone())
    }

    /// Overwrite the cached record
    pub fn replace(&self, record: R) -> R {
        self.replace_with(record, |_| ())
    }

    /// Overwrite the cached record, then hand the new value to `publish`
    /// before the guard is released
    pub fn replace_with(&self, record: R, publish: impl FnOnce(&R)) -> R {
        self.critical_section(|current| {
            *current = record;
            publish(current);
            current.clone()
        })
    }

    /// Change the cached record and return the result
    pub fn mutate(&self, change: impl FnOnce(&mut R)) -> R {
        self.mutate_with(change, |_| ())
    }

    /// Change a copy of the cached record, hand it to `publish`, then
    /// install it before the guard is released. If `change` panics the
    /// cached record is left as it was.
    pub fn mutate_with(&self, change: impl FnOnce(&mut R), publish: impl FnOnce(&R)) -> R {
        self.critical_section(|current| {
            let mut next = current.clone();
            change(&mut next);
            publish(&next);
            *current = next.clone();
            next
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::ColumnDef;
    use crate::row::Row;
    use std::sync::Arc;
    use std::thread;

    #[derive(Debug, Clone, PartialEq)]
    struct Pair {
        left: u32,
        right: u32,
    }

    impl SettingsRecord for Pair {
        const TABLE: &'static str = "pair";

        fn empty() -> Self {
            Pair { left: 0, right: 0 }
        }

        fn columns() -> Vec<ColumnDef> {
            Vec::new()
        }

        fn encode(&self) -> Row {
            Row::new()
        }

        fn decode(_row: &Row) -> Self {
            Self::empty()
        }
    }

    #[test]
    fn test_mutate_returns_whole_record() {
        let cache = SettingsCache::new(Pair::empty());
        let updated = cache.mutate(|p| p.left = 3);

        assert_eq!(updated, Pair { left: 3, right: 0 });
        assert_eq!(cache.read(|p| p.left), 3);
    }

    #[test]
    fn test_replace_and_publish_see_new_value() {
        let cache = SettingsCache::new(Pair::empty());
        let mut published = None;

        let result = cache.replace_with(Pair { left: 1, right: 2 }, |p| published = Some(p.clone()));

        assert_eq!(result, Pair { left: 1, right: 2 });
        assert_eq!(published, Some(result.clone()));
        assert_eq!(cache.snapshot(), result);
    }

    #[test]
    fn test_panicking_change_leaves_record_intact() {
        let cache = Arc::new(SettingsCache::new(Pair { left: 1, right: 1 }));

        let shared = Arc::clone(&cache);
        let result = thread::spawn(move || {
            shared.mutate(|p| {
                p.left = 99;
                panic!("change failed halfway");
            });
        })
        .join();

        assert!(result.is_err());
        assert_eq!(cache.snapshot(), Pair { left: 1, right: 1 });
        assert_eq!(cache.mutate(|p| p.right = 2), Pair { left: 1, right: 2 });
    }

    #[test]
    fn test_concurrent_mutations_are_not_lost() {
        let cache = Arc::new(SettingsCache::new(Pair::empty()));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        if i % 2 == 0 {
                            cache.mutate(|p| p.left += 1);
                        } else {
                            cache.mutate(|p| p.right += 1);
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.snapshot(), Pair { left: 4000, right: 4000 });
    }
}
