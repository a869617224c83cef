//! Registry populations shaped like real modded processes.

use std::sync::Arc;

use latch::component::{Kind, Registry};
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::components::Health;

/// Register `count` kinds and return them in raw id order.
pub fn dense_kinds(registry: &Registry, count: usize) -> Vec<Arc<Kind>> {
    (0..count)
        .map(|i| {
            registry
                .register_if_absent::<Health>(format!("bench:kind{i}").parse().unwrap())
                .unwrap()
        })
        .collect()
}

/// Pick a sparse subset of kinds: each kind kept with the given probability.
pub fn sparse_subset(kinds: &[Arc<Kind>], keep: f64, rng: &mut ChaCha8Rng) -> Vec<Arc<Kind>> {
    kinds
        .iter()
        .filter(|_| rng.gen_bool(keep))
        .map(Arc::clone)
        .collect()
}
