//! Genetic operators on [`Genome`]s.
//!
//! Every operator works field by field and clamps its result into the
//! field's bounds, so the genomes it returns are always valid.
//!
//! - [`random`] samples every field uniformly within its bounds
//! - [`blx_alpha`] is BLX-α crossover: each child value is drawn from the
//!   parents' interval widened by `alpha` times its length on both sides
//! - [`mutate`] adds Gaussian noise to a field with probability `rate`; the
//!   standard deviation is `strength` times the width of the field's bounds

use rand::Rng;
use rand_distr::Normal;
use sternhalma_evaluator::genome::{Genome, GenomeField};

fn width(field: GenomeField) -> f64 {
    let bounds = field.bounds();
    bounds.end() - bounds.start()
}

/// A genome with every field drawn uniformly from its bounds.
pub fn random<R>(rng: &mut R) -> Genome
where
    R: Rng + ?Sized,
{
    Genome::from_fn(|field| rng.random_range(field.bounds()))
}

/// BLX-α crossover of two parents.
///
/// # Example
///
/// ```
/// use rand::SeedableRng;
/// use rand_pcg::Pcg32;
/// use sternhalma_evaluator::genome::Genome;
/// use sternhalma_training::genome_ops;
///
/// let mut rng = Pcg32::seed_from_u64(0);
/// let parent = Genome::default();
/// // identical parents leave nothing to blend
/// assert_eq!(genome_ops::blx_alpha(&parent, &parent, 0.5, &mut rng), parent);
/// ```
pub fn blx_alpha<R>(p1: &Genome, p2: &Genome, alpha: f64, rng: &mut R) -> Genome
where
    R: Rng + ?Sized,
{
    Genome::from_fn(|field| {
        let x1 = p1.get(field);
        let x2 = p2.get(field);
        let min = f64::min(x1, x2);
        let max = f64::max(x1, x2);
        let d = max - min;
        let lower = min - alpha * d;
        let upper = max + alpha * d;
        field.clamp(rng.random_range(lower..=upper))
    })
}

/// Gaussian mutation. Returns the mutated copy.
pub fn mutate<R>(genome: &Genome, strength: f64, rate: f64, rng: &mut R) -> Genome
where
    R: Rng + ?Sized,
{
    let rate = rate.clamp(0.0, 1.0);
    Genome::from_fn(|field| {
        let value = genome.get(field);
        if !rng.random_bool(rate) {
            return value;
        }
        match Normal::new(0.0, strength * width(field)) {
            Ok(normal) => field.clamp(value + rng.sample(normal)),
            Err(_) => value,
        }
    })
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    use super::*;

    #[test]
    fn test_random_is_within_bounds() {
        let mut rng = Pcg32::seed_from_u64(1);
        for _ in 0..100 {
            assert!(random(&mut rng).is_within_bounds());
        }
    }

    #[test]
    fn test_blx_alpha_stays_near_parents() {
        let mut rng = Pcg32::seed_from_u64(2);
        let p1 = Genome::default();
        let p2 = random(&mut rng);
        for _ in 0..100 {
            let child = blx_alpha(&p1, &p2, 0.5, &mut rng);
            assert!(child.is_within_bounds());
            for field in GenomeField::ALL {
                let (a, b) = (p1.get(field), p2.get(field));
                let d = (a - b).abs();
                let v = child.get(field);
                assert!(v >= a.min(b) - 0.5 * d - 1e-9);
                assert!(v <= a.max(b) + 0.5 * d + 1e-9);
            }
        }
    }

    #[test]
    fn test_mutate_rate() {
        let mut rng = Pcg32::seed_from_u64(3);
        let genome = Genome::default();
        assert_eq!(mutate(&genome, 0.5, 0.0, &mut rng), genome);

        let mutated = mutate(&genome, 0.5, 1.0, &mut rng);
        assert!(mutated.is_within_bounds());
        let changed = GenomeField::ALL
            .iter()
            .filter(|&&f| mutated.get(f) != genome.get(f))
            .count();
        assert!(changed > GenomeField::LEN / 2);
    }

    #[test]
    fn test_mutate_clamps_at_bounds() {
        let mut rng = Pcg32::seed_from_u64(4);
        let top = Genome::from_fn(|field| *field.bounds().end());
        for _ in 0..20 {
            let mutated = mutate(&top, 2.0, 1.0, &mut rng);
            assert!(mutated.is_within_bounds());
        }
    }
}
