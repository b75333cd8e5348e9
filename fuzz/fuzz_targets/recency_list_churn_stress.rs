#![no_main]

use bufcache::ds::{NodeId, RecencyList};
use libfuzzer_sys::fuzz_target;

// Stress RecencyList with heavy push/remove/relink churn
//
// Keeps the list near a small fixed size so free slots are constantly
// recycled, the access pattern the cache subjects it to: entries are
// repurposed in place forever, never growing the backing storage.
fuzz_target!(|data: &[u8]| {
    const TARGET_LEN: usize = 16;

    let mut list: RecencyList<u64> = RecencyList::with_capacity(TARGET_LEN);
    let mut live: Vec<NodeId> = Vec::new();
    let mut next_value = 0u64;

    for (step, &byte) in data.iter().enumerate() {
        if list.len() >= TARGET_LEN || (byte % 4 == 0 && !live.is_empty()) {
            // evict from the back, the way victim selection does
            let id = list.back_id().unwrap();
            assert!(list.remove(id).is_some());
            live.retain(|&x| x != id);
        } else if byte % 4 == 1 && !live.is_empty() {
            let id = live[byte as usize % live.len()];
            assert!(list.move_to_front(id));
        } else {
            next_value += 1;
            let id = list.push_front(next_value);
            live.push(id);
        }

        assert_eq!(list.len(), live.len());
        if step % 32 == 0 {
            list.debug_validate_invariants();
        }
    }

    // drain through the victim path until empty
    while let Some(id) = list.back_id() {
        assert!(list.remove(id).is_some());
    }
    assert!(list.is_empty());
    list.debug_validate_invariants();
});
