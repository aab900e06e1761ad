use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

/// A fixed-size atomic Bloom filter gating the exact-match cache lookup.
/// A miss here guarantees the key is absent, letting `get` skip the
/// DashMap probe entirely on the common negative path.
pub struct AtomicBloom {
    bits: Vec<AtomicU64>,
    num_bits: u64,
    num_hashes: u32,
}

impl AtomicBloom {
    pub fn new(capacity: usize, false_positive_rate: f64) -> Self {
        let num_bits = Self::optimal_num_bits(capacity, false_positive_rate).max(64);
        let num_hashes = Self::optimal_num_hashes(num_bits, capacity);
        let words = (num_bits as usize).div_ceil(64);
        Self {
            bits: (0..words).map(|_| AtomicU64::new(0)).collect(),
            num_bits,
            num_hashes,
        }
    }

    fn optimal_num_bits(capacity: usize, fp_rate: f64) -> u64 {
        if capacity == 0 {
            return 64;
        }
        let m = -(capacity as f64 * fp_rate.ln()) / (std::f64::consts::LN_2.powi(2));
        m.ceil() as u64
    }

    fn optimal_num_hashes(num_bits: u64, capacity: usize) -> u32 {
        if capacity == 0 {
            return 1;
        }
        let k = (num_bits as f64 / capacity as f64) * std::f64::consts::LN_2;
        (k.round() as u32).clamp(1, 16)
    }

    fn hash_indices(&self, key: &str) -> impl Iterator<Item = u64> + '_ {
        let mut base_hasher = DefaultHasher::new();
        key.hash(&mut base_hasher);
        let h1 = base_hasher.finish();
        let h2 = h1.rotate_left(32) ^ 0x9E3779B97F4A7C15;
        (0..self.num_hashes as u64).map(move |i| (h1.wrapping_add(i.wrapping_mul(h2))) % self.num_bits)
    }

    pub fn check(&self, key: &str) -> bool {
        self.hash_indices(key).all(|idx| {
            let word = &self.bits[(idx / 64) as usize];
            let mask = 1u64 << (idx % 64);
            word.load(Ordering::Relaxed) & mask != 0
        })
    }

    pub fn set(&self, key: &str) {
        for idx in self.hash_indices(key).collect::<Vec<_>>() {
            let word = &self.bits[(idx / 64) as usize];
            let mask = 1u64 << (idx % 64);
            word.fetch_or(mask, Ordering::Relaxed);
        }
    }

    pub fn clear(&self) {
        for word in &self.bits {
            word.store(0, Ordering::Relaxed);
        }
    }
}
