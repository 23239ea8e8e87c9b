//! Fitness function implementations for evolutionary pattern search.
//!
//! Provides pluggable image metrics and the blending of objective scores with
//! user ratings.

use crate::compute::{Canvas, Pattern};
use crate::schema::{FitnessConfig, FitnessMetric, FitnessMode};

/// Scores patterns according to a [`FitnessConfig`].
#[derive(Debug, Clone)]
pub struct FitnessEvaluator {
    config: FitnessConfig,
}

impl FitnessEvaluator {
    /// Create a new fitness evaluator. `user_weight` is clamped to `[0, 1]`.
    pub fn new(mut config: FitnessConfig) -> Self {
        config.user_weight = config.user_weight.clamp(0.0, 1.0);
        Self { config }
    }

    pub fn mode(&self) -> FitnessMode {
        self.config.mode
    }

    pub fn user_weight(&self) -> f32 {
        self.config.user_weight
    }

    /// Compute every configured metric on `canvas` and their weighted mean.
    pub fn objective(&self, canvas: &Canvas) -> (f32, Vec<MetricResult>) {
        let results: Vec<MetricResult> = self
            .config
            .metrics
            .iter()
            .map(|weighted| MetricResult {
                metric: weighted.metric.clone(),
                score: compute_metric(&weighted.metric, canvas),
                weight: weighted.weight,
            })
            .collect();

        (weighted_mean(&results), results)
    }

    /// Score a pattern from its canvas and rating, storing the metrics and
    /// fitness on it. Returns the new fitness.
    pub fn evaluate(&self, pattern: &mut Pattern) -> Option<f32> {
        let (_, metrics) = self.objective(&pattern.canvas);
        pattern.metrics = metrics;
        self.rescore(pattern)
    }

    /// Recompute fitness from the metrics already stored on the pattern.
    ///
    /// Used after a rating changes, where the canvas is untouched.
    pub fn rescore(&self, pattern: &mut Pattern) -> Option<f32> {
        let rating = pattern.rating.map(|r| r.clamp(0.0, 1.0));
        let fitness = match self.config.mode {
            FitnessMode::Objective => Some(weighted_mean(&pattern.metrics)),
            FitnessMode::Interactive => rating,
            FitnessMode::Hybrid => {
                let objective = weighted_mean(&pattern.metrics);
                Some(match rating {
                    Some(r) => self.combine_scores(objective, r),
                    None => objective,
                })
            }
        };
        pattern.fitness = fitness;
        fitness
    }

    /// Blend an objective score with a user rating.
    pub fn combine_scores(&self, objective: f32, subjective: f32) -> f32 {
        let objective = objective.clamp(0.0, 1.0);
        let subjective = subjective.clamp(0.0, 1.0);
        (1.0 - self.config.user_weight) * objective + self.config.user_weight * subjective
    }
}

/// Result of evaluating a single metric.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricResult {
    pub metric: FitnessMetric,
    pub score: f32,
    pub weight: f32,
}

fn weighted_mean(results: &[MetricResult]) -> f32 {
    let total_weight: f32 = results.iter().map(|r| r.weight).sum();
    if total_weight <= 0.0 {
        return 0.0;
    }
    let sum: f32 = results.iter().map(|r| r.score * r.weight).sum();
    (sum / total_weight).clamp(0.0, 1.0)
}

/// Compute a single metric score in `[0, 1]`.
pub fn compute_metric(metric: &FitnessMetric, canvas: &Canvas) -> f32 {
    if canvas.is_empty() {
        return 0.0;
    }
    let score = match metric {
        FitnessMetric::Symmetry => compute_symmetry(canvas),
        FitnessMetric::Complexity => compute_complexity(canvas),
        FitnessMetric::Contrast => compute_contrast(canvas),
        FitnessMetric::EdgeDensity { threshold } => compute_edge_density(canvas, *threshold),
        FitnessMetric::ActiveArea { threshold } => compute_active_area(canvas, *threshold),
        FitnessMetric::Coherence { clusters } => compute_coherence(canvas, *clusters),
    };
    score.clamp(0.0, 1.0)
}

/// Left/right mirror symmetry. The center column of odd widths is skipped.
fn compute_symmetry(canvas: &Canvas) -> f32 {
    let half = canvas.width / 2;
    if half == 0 {
        return 1.0;
    }

    let mut diff = 0.0f32;
    for y in 0..canvas.height {
        for x in 0..half {
            let mirrored = canvas.width - 1 - x;
            diff += (canvas.get(x, y) - canvas.get(mirrored, y)).abs();
        }
    }
    1.0 - diff / (half * canvas.height) as f32
}

/// Shannon entropy of a 256-bin histogram, normalized by `log2(256)`.
fn compute_complexity(canvas: &Canvas) -> f32 {
    let mut histogram = [0usize; 256];
    for &v in &canvas.pixels {
        let bin = ((v.clamp(0.0, 1.0) * 256.0) as usize).min(255);
        histogram[bin] += 1;
    }

    let n = canvas.len() as f32;
    let entropy: f32 = histogram
        .iter()
        .filter(|&&count| count > 0)
        .map(|&count| {
            let p = count as f32 / n;
            -p * p.log2()
        })
        .sum();
    entropy / 8.0
}

/// Standard deviation of the intensities, floored at 0.1.
fn compute_contrast(canvas: &Canvas) -> f32 {
    canvas.std().max(0.1)
}

/// Fraction of pixels whose Sobel gradient magnitude exceeds `threshold`.
fn compute_edge_density(canvas: &Canvas, threshold: f32) -> f32 {
    let (w, h) = (canvas.width as isize, canvas.height as isize);
    let at = |x: isize, y: isize| canvas.get(x.clamp(0, w - 1) as usize, y.clamp(0, h - 1) as usize);

    let mut edges = 0usize;
    for y in 0..h {
        for x in 0..w {
            let gx = (at(x + 1, y - 1) + 2.0 * at(x + 1, y) + at(x + 1, y + 1))
                - (at(x - 1, y - 1) + 2.0 * at(x - 1, y) + at(x - 1, y + 1));
            let gy = (at(x - 1, y + 1) + 2.0 * at(x, y + 1) + at(x + 1, y + 1))
                - (at(x - 1, y - 1) + 2.0 * at(x, y - 1) + at(x + 1, y - 1));
            if gx.hypot(gy) > threshold {
                edges += 1;
            }
        }
    }
    edges as f32 / canvas.len() as f32
}

/// Fraction of pixels brighter than `threshold`.
fn compute_active_area(canvas: &Canvas, threshold: f32) -> f32 {
    let active = canvas.pixels.iter().filter(|&&v| v > threshold).count();
    active as f32 / canvas.len() as f32
}

/// One minus the share of the largest intensity cluster.
///
/// Runs 1-D k-means over the 8-bit intensity histogram, so the cost is
/// independent of the canvas size.
fn compute_coherence(canvas: &Canvas, clusters: usize) -> f32 {
    let k = clusters.max(2);
    let mut histogram = [0usize; 256];
    for b in canvas.to_luma8() {
        histogram[b as usize] += 1;
    }
    let n = canvas.len();

    // Initial centroids at evenly spaced quantiles.
    let mut centroids: Vec<f32> = (0..k)
        .map(|i| {
            let target = (2 * i + 1) * n / (2 * k);
            let mut seen = 0;
            for (level, &count) in histogram.iter().enumerate() {
                seen += count;
                if seen > target {
                    return level as f32;
                }
            }
            255.0
        })
        .collect();

    let nearest = |centroids: &[f32], level: usize| -> usize {
        let v = level as f32;
        let mut best = 0;
        for (c, centroid) in centroids.iter().enumerate() {
            if (v - centroid).abs() < (v - centroids[best]).abs() {
                best = c;
            }
        }
        best
    };

    let mut sizes = vec![0usize; k];
    for _ in 0..32 {
        let mut sums = vec![0.0f32; k];
        sizes.iter_mut().for_each(|s| *s = 0);
        for (level, &count) in histogram.iter().enumerate() {
            if count == 0 {
                continue;
            }
            let c = nearest(&centroids, level);
            sums[c] += level as f32 * count as f32;
            sizes[c] += count;
        }

        let mut moved = false;
        for c in 0..k {
            if sizes[c] > 0 {
                let updated = sums[c] / sizes[c] as f32;
                moved |= (updated - centroids[c]).abs() > 1e-3;
                centroids[c] = updated;
            }
        }
        if !moved {
            break;
        }
    }

    let largest = sizes.iter().copied().max().unwrap_or(n);
    1.0 - largest as f32 / n as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::Generator;
    use crate::schema::{CanvasConfig, NetworkConfig, NetworkGenome, WeightedMetric};

    fn all_metrics() -> Vec<WeightedMetric> {
        [
            FitnessMetric::Symmetry,
            FitnessMetric::Complexity,
            FitnessMetric::Contrast,
            FitnessMetric::EdgeDensity { threshold: 0.2 },
            FitnessMetric::ActiveArea { threshold: 0.1 },
            FitnessMetric::Coherence { clusters: 3 },
        ]
        .into_iter()
        .map(|metric| WeightedMetric {
            metric,
            weight: 1.0,
        })
        .collect()
    }

    fn pattern_from(canvas: Canvas) -> Pattern {
        let mut p = Pattern::unrendered(0, NetworkGenome::zeros(&NetworkConfig::default()), 0);
        p.canvas = canvas;
        p
    }

    fn gradient(width: usize, height: usize) -> Canvas {
        let pixels = (0..width * height)
            .map(|i| (i % width) as f32 / (width - 1) as f32)
            .collect();
        Canvas::from_pixels(width, height, pixels).unwrap()
    }

    #[test]
    fn test_scores_in_unit_range() {
        let generator = Generator::new(
            NetworkConfig::default(),
            CanvasConfig {
                width: 32,
                height: 32,
            },
        );
        let evaluator = FitnessEvaluator::new(FitnessConfig {
            mode: FitnessMode::Objective,
            metrics: all_metrics(),
            ..Default::default()
        });

        for seed in 0..8 {
            let mut pattern = pattern_from(generator.generate(seed));
            let fitness = evaluator.evaluate(&mut pattern).unwrap();
            assert!((0.0..=1.0).contains(&fitness));
            assert_eq!(pattern.metrics.len(), 6);
            for m in &pattern.metrics {
                assert!((0.0..=1.0).contains(&m.score), "{:?} = {}", m.metric, m.score);
            }
        }
    }

    #[test]
    fn test_symmetry() {
        let symmetric = Canvas::from_pixels(3, 1, vec![0.2, 0.9, 0.2]).unwrap();
        assert!((compute_symmetry(&symmetric) - 1.0).abs() < 1e-6);

        let ramp = gradient(4, 2);
        assert!(compute_symmetry(&ramp) < 1.0);
    }

    #[test]
    fn test_complexity_bounds() {
        let flat = Canvas::new(8, 8);
        assert!(compute_complexity(&flat).abs() < 1e-6);

        let pixels = (0..256).map(|i| i as f32 / 255.0).collect();
        let spread = Canvas::from_pixels(16, 16, pixels).unwrap();
        assert!((compute_complexity(&spread) - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_contrast_floor() {
        assert!((compute_contrast(&Canvas::new(4, 4)) - 0.1).abs() < 1e-6);
        let checker = Canvas::from_pixels(2, 1, vec![0.0, 1.0]).unwrap();
        assert!((compute_contrast(&checker) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_edge_density() {
        assert_eq!(compute_edge_density(&Canvas::new(6, 6), 0.2), 0.0);

        let mut step = Canvas::new(6, 6);
        for y in 0..6 {
            for x in 3..6 {
                step.pixels[y * 6 + x] = 1.0;
            }
        }
        let density = compute_edge_density(&step, 0.2);
        assert!(density > 0.0 && density < 1.0);
    }

    #[test]
    fn test_active_area() {
        let canvas = Canvas::from_pixels(4, 1, vec![0.0, 0.05, 0.5, 1.0]).unwrap();
        assert!((compute_active_area(&canvas, 0.1) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_coherence() {
        assert_eq!(compute_coherence(&Canvas::new(4, 4), 3), 0.0);

        let halves = Canvas::from_pixels(4, 1, vec![0.0, 0.0, 1.0, 1.0]).unwrap();
        assert!((compute_coherence(&halves, 2) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_interactive_mode_needs_rating() {
        let evaluator = FitnessEvaluator::new(FitnessConfig {
            mode: FitnessMode::Interactive,
            ..Default::default()
        });
        let mut pattern = pattern_from(gradient(8, 8));
        assert_eq!(evaluator.evaluate(&mut pattern), None);

        pattern.rating = Some(0.8);
        assert_eq!(evaluator.rescore(&mut pattern), Some(0.8));
    }

    #[test]
    fn test_hybrid_blends_rating() {
        let evaluator = FitnessEvaluator::new(FitnessConfig::default());
        let mut pattern = pattern_from(gradient(8, 8));
        let objective = evaluator.evaluate(&mut pattern).unwrap();

        pattern.rating = Some(1.0);
        let blended = evaluator.rescore(&mut pattern).unwrap();
        let expected = 0.7 * objective + 0.3;
        assert!((blended - expected).abs() < 1e-5);
    }

    #[test]
    fn test_user_weight_clamped() {
        let evaluator = FitnessEvaluator::new(FitnessConfig {
            user_weight: 4.0,
            ..Default::default()
        });
        assert_eq!(evaluator.user_weight(), 1.0);
        assert_eq!(evaluator.combine_scores(0.2, 0.6), 0.6);
    }
}
