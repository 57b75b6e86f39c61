/// Multiply-with-carry style generator pinned to the classic solver
/// constants; the fixed default seed keeps runs reproducible.
pub struct Random {
    seed: f64,
}

impl Random {
    pub fn new(seed: f64) -> Random {
        assert!(seed > 0.0, "random seed must be positive");
        Random { seed }
    }

    // Returns a random float 0 <= x < 1.
    pub fn drand(&mut self) -> f64 {
        self.seed *= 1389796.0;
        let q = (self.seed / 2147483647.0) as i32;
        self.seed -= (q as f64) * 2147483647.0;
        self.seed / 2147483647.0
    }

    // Returns a random integer 0 <= x < size.
    pub fn irand(&mut self, size: usize) -> usize {
        (self.drand() * (size as f64)) as usize
    }

    pub fn chance(&mut self, p: f64) -> bool {
        self.drand() < p
    }
}


/// Reluctant-doubling sequence: 1,1,2,1,1,2,4,... scaled by powers of `y`.
pub fn luby(y: f64, mut x: u32) -> f64 {
    // Find the finite subsequence that contains index 'x', and the
    // size of that subsequence:
    let mut size = 1;
    let mut seq = 0;

    while size < x + 1 {
        seq += 1;
        size = 2 * size + 1;
    }

    while size - 1 != x {
        size = (size - 1) >> 1;
        seq -= 1;
        x = x % size;
    }

    y.powi(seq)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn luby_prefix() {
        let expected = [1, 1, 2, 1, 1, 2, 4, 1, 1, 2, 1, 1, 2, 4, 8];
        for (i, &e) in expected.iter().enumerate() {
            assert_eq!(luby(2.0, i as u32) as u64, e, "luby(2, {})", i);
        }
    }

    #[test]
    fn random_is_deterministic_and_bounded() {
        let mut a = Random::new(91648253.0);
        let mut b = Random::new(91648253.0);
        for _ in 0..1000 {
            let x = a.drand();
            assert_eq!(x, b.drand());
            assert!(0.0 <= x && x < 1.0);
        }
        for _ in 0..1000 {
            assert!(a.irand(10) < 10);
        }
    }
}
