//! Common assertions for gcsvfs testing

use crate::MockStore;
use std::ops::Range;

/// Asserts the exact ranges fetched since the last [`MockStore::clear_calls`]
pub fn assert_fetches(store: &MockStore, expected: &[Range<u64>]) {
    let fetches = store.fetches();
    assert_eq!(
        fetches, expected,
        "Fetch mismatch: expected {:?}, got {:?}",
        expected, fetches
    );
}

/// Asserts that no range fetch reached the backend
pub fn assert_no_fetches(store: &MockStore) {
    assert_fetches(store, &[]);
}

/// Asserts that no call of any kind reached the backend
pub fn assert_untouched(store: &MockStore) {
    let calls = store.calls();
    assert!(calls.is_empty(), "Expected no backend calls, got {:?}", calls);
}
