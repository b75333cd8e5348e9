#![no_main]

use bufcache::ds::{NodeId, RecencyList};
use libfuzzer_sys::fuzz_target;

// Fuzz arbitrary operation sequences on RecencyList
//
// Drives random sequences of push_front, remove, move_to_front, get and
// iteration against a Vec model holding the live elements in list order
// (front first). Every divergence between list and model is a bug.
fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    let mut list: RecencyList<u32> = RecencyList::new();
    let mut model: Vec<(NodeId, u32)> = Vec::new();

    let mut idx = 0;
    while idx + 1 < data.len() {
        let op = data[idx] % 7;
        let arg = data[idx + 1];
        idx += 2;

        match op {
            0 => {
                // push_front
                let value = u32::from(arg);
                let id = list.push_front(value);
                model.insert(0, (id, value));

                assert!(list.contains(id));
                assert_eq!(list.get(id), Some(&value));
                assert_eq!(list.front_id(), Some(id));
            }
            1 => {
                // remove a live element
                if model.is_empty() {
                    continue;
                }
                let pos = arg as usize % model.len();
                let (id, value) = model.remove(pos);

                assert_eq!(list.remove(id), Some(value));
                assert!(!list.contains(id));
            }
            2 => {
                // move_to_front
                if model.is_empty() {
                    continue;
                }
                let pos = arg as usize % model.len();
                let entry = model.remove(pos);
                model.insert(0, entry);

                assert!(list.move_to_front(entry.0));
                assert_eq!(list.front_id(), Some(entry.0));
            }
            3 => {
                // get / get_mut round-trip
                if model.is_empty() {
                    continue;
                }
                let pos = arg as usize % model.len();
                let (id, value) = model[pos];

                assert_eq!(list.get(id), Some(&value));
                let bumped = value.wrapping_add(1);
                *list.get_mut(id).unwrap() = bumped;
                model[pos].1 = bumped;
            }
            4 => {
                // front/back agree with the model ends
                assert_eq!(list.front_id(), model.first().map(|&(id, _)| id));
                assert_eq!(list.back_id(), model.last().map(|&(id, _)| id));
            }
            5 => {
                // forward iteration matches the model order
                let listed: Vec<(NodeId, u32)> = list.iter().map(|(id, &v)| (id, v)).collect();
                assert_eq!(listed, model);
            }
            6 => {
                // lru iteration is the exact reversal
                let lru: Vec<(NodeId, u32)> = list.iter_lru().map(|(id, &v)| (id, v)).collect();
                let expected: Vec<(NodeId, u32)> = model.iter().rev().copied().collect();
                assert_eq!(lru, expected);
            }
            _ => unreachable!(),
        }

        assert_eq!(list.len(), model.len());
        assert_eq!(list.is_empty(), model.is_empty());
        list.debug_validate_invariants();
    }
});
