//! Frequency-based stochastic thinning of token streams.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::SubsampleConfig;
use crate::error::Result;
use crate::metrics::SubsampleStats;
use crate::vocabulary::Vocabulary;

/// Retention probability of a token seen `frequency` times against the absolute threshold.
///
/// Values `>= 1` mean the token is always kept.
#[must_use]
pub fn retain_probability(frequency: u64, absolute_threshold: f64) -> f64 {
    let frequency = frequency as f64;
    ((frequency / absolute_threshold).sqrt() + 1.0) * (absolute_threshold / frequency)
}

/// Lazy subsampling adapter.
///
/// Tokens missing from the vocabulary, or present with a zero count, are dropped without being
/// counted.  Every other occurrence is kept with [`retain_probability`] using an independent draw.
#[derive(Debug)]
pub struct Subsampler<'v, I, R = StdRng> {
    tokens: I,
    vocabulary: &'v Vocabulary,
    absolute_threshold: f64,
    rng: R,
    stats: SubsampleStats,
}

impl<'v, I> Subsampler<'v, I, StdRng>
where
    I: Iterator<Item = String>,
{
    /// Creates a subsampler seeded from `cfg.seed`, or from entropy when unset.
    pub fn new(
        tokens: I,
        total_count: u64,
        vocabulary: &'v Vocabulary,
        cfg: &SubsampleConfig,
    ) -> Result<Self> {
        cfg.validate()?;
        let rng = match cfg.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self::with_rng(tokens, total_count, vocabulary, cfg.threshold, rng))
    }
}

impl<'v, I, R> Subsampler<'v, I, R>
where
    I: Iterator<Item = String>,
    R: Rng,
{
    /// Creates a subsampler drawing from `rng`.
    pub fn with_rng(
        tokens: I,
        total_count: u64,
        vocabulary: &'v Vocabulary,
        threshold: f64,
        rng: R,
    ) -> Self {
        Self {
            tokens,
            vocabulary,
            absolute_threshold: threshold * total_count as f64,
            rng,
            stats: SubsampleStats::default(),
        }
    }

    /// Counters accumulated so far.
    #[must_use]
    pub fn stats(&self) -> SubsampleStats {
        self.stats
    }
}

impl<'v, I, R> Iterator for Subsampler<'v, I, R>
where
    I: Iterator<Item = String>,
    R: Rng,
{
    type Item = String;

    fn next(&mut self) -> Option<String> {
        loop {
            let token = self.tokens.next()?;
            let Some(word) = self.vocabulary.get(&token) else {
                continue;
            };
            if word.count == 0 {
                continue;
            }
            self.stats.examined += 1;
            let probability = retain_probability(word.count, self.absolute_threshold);
            if probability < 1.0 && probability < self.rng.gen::<f64>() {
                self.stats.discarded += 1;
                continue;
            }
            return Some(token);
        }
    }
}

/// Subsamples `tokens` with the given total corpus count and configuration.
pub fn subsample<'v, I>(
    tokens: I,
    total_count: u64,
    vocabulary: &'v Vocabulary,
    cfg: &SubsampleConfig,
) -> Result<Subsampler<'v, I>>
where
    I: Iterator<Item = String>,
{
    Subsampler::new(tokens, total_count, vocabulary, cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocabulary::Word;

    fn vocabulary() -> Vocabulary {
        Vocabulary::from_words(vec![
            ("the".to_string(), Word::new(0, 9_000)),
            ("cat".to_string(), Word::new(1, 10)),
            ("ghost".to_string(), Word::new(2, 0)),
        ])
        .expect("valid vocabulary")
    }

    fn stream(tokens: &[&str]) -> impl Iterator<Item = String> {
        tokens
            .iter()
            .map(|token| token.to_string())
            .collect::<Vec<_>>()
            .into_iter()
    }

    #[test]
    fn frequencies_at_or_below_threshold_are_always_retained() {
        for frequency in [1u64, 5, 99, 100] {
            assert!(retain_probability(frequency, 100.0) >= 1.0);
        }
        assert!(retain_probability(10_000, 100.0) < 1.0);
    }

    #[test]
    fn probability_matches_formula() {
        let p = retain_probability(400, 100.0);
        assert!((p - 0.75).abs() < 1e-12);
    }

    #[test]
    fn unknown_and_zero_count_tokens_are_dropped_uncounted() {
        let vocab = vocabulary();
        let cfg = SubsampleConfig {
            threshold: 1.0,
            seed: Some(1),
        };
        let mut sampler =
            Subsampler::new(stream(&["dog", "ghost", "cat", "the"]), 9_010, &vocab, &cfg)
                .expect("valid config");
        let kept: Vec<String> = sampler.by_ref().collect();
        assert_eq!(kept, vec!["cat", "the"]);
        assert_eq!(
            sampler.stats(),
            SubsampleStats {
                examined: 2,
                discarded: 0
            }
        );
    }

    #[test]
    fn frequent_tokens_are_thinned_reproducibly() {
        let vocab = vocabulary();
        let cfg = SubsampleConfig {
            threshold: 1e-4,
            seed: Some(42),
        };
        let tokens: Vec<&str> = std::iter::repeat("the").take(2_000).collect();
        let run = || {
            let mut sampler =
                subsample(stream(&tokens), 9_010, &vocab, &cfg).expect("valid config");
            let kept = sampler.by_ref().count();
            (kept, sampler.stats())
        };
        let (kept, stats) = run();
        assert_eq!(run(), (kept, stats));
        assert_eq!(stats.examined, 2_000);
        assert_eq!(stats.retained() as usize, kept);
        // Retention probability is roughly 0.0106 for this configuration.
        assert!(kept < 200, "kept {kept} of 2000");
        assert!(stats.discarded > 1_500);
    }

    #[test]
    fn invalid_threshold_is_rejected() {
        let vocab = vocabulary();
        let cfg = SubsampleConfig {
            threshold: -1.0,
            seed: None,
        };
        assert!(Subsampler::new(stream(&["the"]), 1, &vocab, &cfg).is_err());
    }
}
