use std::time::Duration;

use criterion::{Criterion, Throughput};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Scene sizes every group is measured at.
pub const NODE_COUNTS: [usize; 4] = [16, 256, 1024, 4096];

/// Import and sweep timings are short and stable; fewer, shorter samples suffice.
pub fn default_criterion() -> Criterion {
    Criterion::default()
        .configure_from_args()
        .sample_size(30)
        .warm_up_time(Duration::from_millis(500))
        .measurement_time(Duration::from_secs(3))
}

/// Deterministic generator for synthetic scenes.
pub fn scene_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

pub fn nodes_throughput(nodes: usize) -> Throughput {
    Throughput::Elements(nodes.max(1) as u64)
}

#[allow(dead_code)]
pub fn bytes_throughput(bytes: usize) -> Throughput {
    Throughput::Bytes(bytes.max(1) as u64)
}
