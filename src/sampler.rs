//! Income Sampler
//!
//! Assigns every consumer one of the configured income tiers. Small populations
//! take the tiers in order; larger ones are guaranteed one consumer per tier and
//! the rest are drawn by weight, then shuffled.

use rand::{
    Rng,
    distributions::{Distribution, WeightedIndex},
    seq::SliceRandom,
};

use crate::params::{Parameters, ParametersError, validate_distribution};

/// Income assigned to each consumer, indexed by consumer.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsumerIncomes(Vec<f64>);

impl ConsumerIncomes {
    /// Wrap an explicit assignment.
    ///
    /// Membership in the configured tiers is checked when the assignment is
    /// handed to the model builder.
    pub fn new(incomes: Vec<f64>) -> Self {
        Self(incomes)
    }

    /// Sample incomes for the consumers described by `params`.
    ///
    /// # Errors
    ///
    /// Returns a [`ParametersError`] if the tier distribution is invalid.
    pub fn sample<R: Rng + ?Sized>(
        params: &Parameters,
        rng: &mut R,
    ) -> Result<Self, ParametersError> {
        sample_incomes(
            params.incomes(),
            params.probabilities(),
            params.consumers(),
            rng,
        )
    }

    /// Income of a single consumer
    pub fn get(&self, consumer: usize) -> Option<f64> {
        self.0.get(consumer).copied()
    }

    /// Number of consumers
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no consumers
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Incomes in consumer order
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Iterate `(consumer, income)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.0.iter().copied().enumerate()
    }
}

/// Produce an income for each of `consumers` consumers.
///
/// # Errors
///
/// Returns a [`ParametersError`] if `probabilities` does not match `tiers` in
/// length or does not sum to one.
pub fn sample_incomes<R: Rng + ?Sized>(
    tiers: &[f64],
    probabilities: &[f64],
    consumers: usize,
    rng: &mut R,
) -> Result<ConsumerIncomes, ParametersError> {
    validate_distribution(tiers, probabilities)?;

    if consumers <= tiers.len() {
        return Ok(ConsumerIncomes(tiers.iter().copied().take(consumers).collect()));
    }

    let weights = WeightedIndex::new(probabilities)?;

    // One consumer per tier first so every tier is represented.
    let mut incomes = Vec::with_capacity(consumers);
    incomes.extend_from_slice(tiers);

    for _ in tiers.len()..consumers {
        let tier_idx = weights.sample(rng);

        let tier = tiers
            .get(tier_idx)
            .copied()
            .ok_or(ParametersError::LengthMismatch {
                field: "probabilities",
                expected: tiers.len(),
                found: tier_idx + 1,
            })?;

        incomes.push(tier);
    }

    incomes.shuffle(rng);

    Ok(ConsumerIncomes(incomes))
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use testresult::TestResult;

    use super::*;

    const TIERS: [f64; 4] = [25_000.0, 75_000.0, 125_000.0, 175_000.0];
    const PROBABILITIES: [f64; 4] = [0.442, 0.347, 0.145, 0.066];

    #[test]
    fn small_population_takes_tiers_in_order() -> TestResult {
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        let incomes = sample_incomes(&TIERS, &PROBABILITIES, 4, &mut rng)?;

        assert_eq!(incomes.as_slice(), &TIERS);

        let partial = sample_incomes(&TIERS, &PROBABILITIES, 2, &mut rng)?;

        assert_eq!(partial.as_slice(), &[25_000.0, 75_000.0]);

        Ok(())
    }

    #[test]
    fn deterministic_path_does_not_consume_randomness() -> TestResult {
        let mut used = ChaCha8Rng::seed_from_u64(3);
        let mut fresh = ChaCha8Rng::seed_from_u64(3);

        sample_incomes(&TIERS, &PROBABILITIES, 3, &mut used)?;

        assert_eq!(used.r#gen::<u64>(), fresh.r#gen::<u64>());

        Ok(())
    }

    #[test]
    fn large_population_covers_every_tier() -> TestResult {
        let mut rng = ChaCha8Rng::seed_from_u64(11);

        let incomes = sample_incomes(&TIERS, &PROBABILITIES, 25, &mut rng)?;

        assert_eq!(incomes.len(), 25);

        for tier in TIERS {
            assert!(
                incomes.as_slice().contains(&tier),
                "tier {tier} missing from {incomes:?}"
            );
        }

        Ok(())
    }

    #[test]
    fn same_seed_gives_same_assignment() -> TestResult {
        let first = sample_incomes(
            &TIERS,
            &PROBABILITIES,
            50,
            &mut ChaCha8Rng::seed_from_u64(42),
        )?;
        let second = sample_incomes(
            &TIERS,
            &PROBABILITIES,
            50,
            &mut ChaCha8Rng::seed_from_u64(42),
        )?;

        assert_eq!(first, second);

        Ok(())
    }

    #[test]
    fn zero_weight_tier_still_appears_once() -> TestResult {
        let mut rng = ChaCha8Rng::seed_from_u64(5);

        let incomes = sample_incomes(&[10.0, 20.0], &[1.0, 0.0], 30, &mut rng)?;

        let count = incomes.iter().filter(|(_, income)| *income > 15.0).count();

        assert_eq!(count, 1);

        Ok(())
    }

    #[test]
    fn invalid_probabilities_fail_before_sampling() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let err = sample_incomes(&TIERS, &[0.5, 0.5], 10, &mut rng).err();

        assert!(matches!(err, Some(ParametersError::LengthMismatch { .. })));

        let err = sample_incomes(&TIERS, &[0.4, 0.4, 0.4, 0.4], 2, &mut rng).err();

        assert!(matches!(err, Some(ParametersError::ProbabilitySum(_))));
    }
}
