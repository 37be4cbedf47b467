use glam::Vec3;
use proptest::prelude::*;
use std::cmp::Reverse;
use xrinteract_core::ObjectId;
use xrinteract_interaction::raycast::{sort_hits, HitSource};
use xrinteract_interaction::RaycastHit;

type Keys = (i32, i32, i32, i32, u8, Option<u32>);

fn hit(index: usize, keys: Keys) -> RaycastHit {
    let (context_priority, sorting_layer, sorting_order, depth, distance, root) = keys;
    RaycastHit {
        object: ObjectId(index as u32),
        interactable: Some(ObjectId(index as u32)),
        source: if root.is_some() { HitSource::Graphic } else { HitSource::Physics },
        distance: f32::from(distance) * 0.5,
        point: Vec3::ZERO,
        normal: Vec3::Z,
        context_priority,
        sorting_layer,
        sorting_order,
        depth,
        root,
        index,
    }
}

/// Small key ranges so ties on every key are common; roots mix colliders and several canvases.
fn keys() -> impl Strategy<Value = Vec<Keys>> {
    prop::collection::vec(
        (0i32..3, -1i32..2, 0i32..3, 0i32..6, 0u8..8, prop::option::of(0u32..3)),
        1..24,
    )
}

fn hits(keys: Vec<Keys>) -> Vec<RaycastHit> {
    keys.into_iter().enumerate().map(|(i, k)| hit(i, k)).collect()
}

fn sorted(mut hits: Vec<RaycastHit>) -> Vec<RaycastHit> {
    sort_hits(&mut hits);
    hits
}

fn bucket(h: &RaycastHit) -> (Reverse<i32>, Reverse<i32>, Reverse<i32>) {
    (Reverse(h.context_priority), Reverse(h.sorting_layer), Reverse(h.sorting_order))
}

proptest! {
    #[test]
    fn ranking_ignores_arrival_order(keys in keys(), seed in any::<u64>()) {
        let hits = hits(keys);
        let mut shuffled = hits.clone();
        let len = shuffled.len();
        // Deterministic rotation and reversal from the seed.
        shuffled.rotate_left((seed as usize) % len);
        if seed & 1 == 1 {
            shuffled.reverse();
        }
        prop_assert_eq!(sorted(hits), sorted(shuffled));
    }

    #[test]
    fn leading_keys_are_monotone(keys in keys()) {
        let hits = sorted(hits(keys));
        for pair in hits.windows(2) {
            prop_assert!(bucket(&pair[0]) <= bucket(&pair[1]));
        }
    }

    #[test]
    fn same_root_hits_rank_by_depth_then_distance(keys in keys()) {
        let hits = sorted(hits(keys));
        for (i, a) in hits.iter().enumerate() {
            for b in &hits[i + 1..] {
                if a.root.is_some() && a.root == b.root && bucket(a) == bucket(b) {
                    let key_a = (Reverse(a.depth), (a.distance * 2.0) as u32, a.index);
                    let key_b = (Reverse(b.depth), (b.distance * 2.0) as u32, b.index);
                    prop_assert!(key_a < key_b, "{:?} before {:?}", a, b);
                }
            }
        }
    }

    #[test]
    fn one_hit_per_root_ranks_by_distance(keys in keys()) {
        let mut hits = hits(keys);
        for h in &mut hits {
            h.root = h.root.map(|_| h.index as u32);
        }
        let hits = sorted(hits);
        for pair in hits.windows(2) {
            let key = |h: &RaycastHit| (bucket(h), (h.distance * 2.0) as u32, h.index);
            prop_assert!(key(&pair[0]) < key(&pair[1]));
        }
    }
}
