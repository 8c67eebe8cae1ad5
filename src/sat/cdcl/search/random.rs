pub struct Random {
    seed: f64,
}

impl Random {
    pub fn new(seed: f64) -> Random {
        assert!(seed > 0.0, "seed must be positive");
        Random { seed }
    }

    // Returns a random float 0 <= x < 1. Seed must never be 0.
    pub fn drand(&mut self) -> f64 {
        self.seed *= 1389796.0;
        let q = (self.seed / 2147483647.0) as i32;
        self.seed -= (q as f64) * 2147483647.0;
        self.seed / 2147483647.0
    }

    // Returns a random integer 0 <= x < size. Seed must never be 0.
    pub fn irand(&mut self, size: usize) -> usize {
        (self.drand() * (size as f64)) as usize
    }

    pub fn chance(&mut self, p: f64) -> bool {
        self.drand() < p
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range() {
        let mut rand = Random::new(91648253.0);
        for _ in 0..1000 {
            let x = rand.drand();
            assert!(0.0 <= x && x < 1.0);
            let i = rand.irand(10);
            assert!(i < 10);
        }
    }

    #[test]
    fn test_deterministic() {
        let mut a = Random::new(42.0);
        let mut b = Random::new(42.0);
        for _ in 0..100 {
            assert_eq!(a.drand().to_bits(), b.drand().to_bits());
        }
    }
}
