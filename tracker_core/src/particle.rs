//! Condensation-style particle filter: one instance per target per view.
//!
//! # Belief cycle
//! - `predict` resamples the particle set by cumulative weight, advances each
//!   particle through the hand-tuned motion model by the wall-clock `dt`
//!   since the previous step, then resets weights to 1/N.
//! - `correct` scores every particle against the pending measurement queue
//!   (max over measurements of an isotropic radial likelihood) and
//!   renormalizes. A fully degenerate belief is recovered by silent
//!   reinitialization, not reported as an error.
//!
//! ## Motion model
//! x += vx·dt + N(0, σ_pos)          per axis
//! v  *= (1 − airResistance)^dt      drag
//! v  += a·dt (+ gravity·dt on y)
//! a  *= accelReduction^dt
//! plus cubic boundary repulsion toward the domain center, a per-axis
//! acceleration clamp, and a small-probability full velocity redraw.

use crate::config::ParticleConfig;
use crate::error::TrackerError;
use crate::types::{Estimate2d, Rgb};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use std::f64::consts::PI;
use std::time::Instant;

// ---------------------------------------------------------------------------
// Particle
// ---------------------------------------------------------------------------

/// A single state hypothesis. The cumulative weight `cum` is the prefix sum
/// of `weight` over the particle array, maintained after every reweighting.
#[derive(Clone, Copy, Debug, Default)]
pub struct Particle {
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    pub accx: f64,
    pub accy: f64,
    pub weight: f64,
    pub cum: f64,
}

// ---------------------------------------------------------------------------
// Pending measurement
// ---------------------------------------------------------------------------

/// A matched detection influencing correction until its lifetime expires.
#[derive(Clone, Copy, Debug)]
pub struct PendingMeasurement {
    pub x: f64,
    pub y: f64,
    /// Static weight, set by the associator (ROI penalty · score²)
    pub weight: f64,
    pub max_age: u32,
    /// Remaining lifetime, decremented once per frame; dead at 0
    pub lives: u32,
}

impl PendingMeasurement {
    pub fn new(x: f64, y: f64, weight: f64, max_age: u32) -> Self {
        Self {
            x,
            y,
            weight,
            max_age,
            lives: max_age,
        }
    }

    pub fn age(&mut self) {
        self.lives = self.lives.saturating_sub(1);
    }

    pub fn is_dead(&self) -> bool {
        self.lives == 0
    }
}

// ---------------------------------------------------------------------------
// Filter
// ---------------------------------------------------------------------------

/// Particle filter over planar position/velocity/acceleration.
///
/// Construction is two-phase: `new` wires configuration and the reference
/// appearance, `init` establishes the spatial domain (known only once the
/// frame geometry is) and draws the initial particle set. `predict` and
/// `correct` before `init` fail with [`TrackerError::NotInitialized`].
pub struct ParticleFilter {
    config: ParticleConfig,
    reference_color: Rgb,
    domain: Option<(f64, f64)>,
    particles: Vec<Particle>,
    measurements: Vec<PendingMeasurement>,
    last_estimate: Estimate2d,
    last_step: Option<Instant>,
    rng: ChaCha8Rng,
    noise_pos: Normal<f64>,
    noise_vel: Normal<f64>,
    noise_acc: Normal<f64>,
}

impl ParticleFilter {
    /// Create an uninitialized filter for one target in one view.
    pub fn new(config: ParticleConfig, reference_color: Rgb, seed: u64) -> Self {
        // sigma == 0 is a valid (deterministic) configuration
        let noise_pos =
            Normal::new(0.0, config.sigma_pos).expect("sigma_pos must be finite and >= 0");
        let noise_vel =
            Normal::new(0.0, config.sigma_vel).expect("sigma_vel must be finite and >= 0");
        let noise_acc =
            Normal::new(0.0, config.sigma_acc).expect("sigma_acc must be finite and >= 0");
        Self {
            config,
            reference_color,
            domain: None,
            particles: Vec::new(),
            measurements: Vec::new(),
            last_estimate: Estimate2d::default(),
            last_step: None,
            rng: ChaCha8Rng::seed_from_u64(seed),
            noise_pos,
            noise_vel,
            noise_acc,
        }
    }

    /// Establish the spatial domain and draw the initial particle set.
    pub fn init(&mut self, x_range: f64, y_range: f64) {
        self.domain = Some((x_range, y_range));
        self.reinitialize();
    }

    pub fn is_initialized(&self) -> bool {
        self.domain.is_some()
    }

    /// Redraw all particles uniformly over the domain with weights 1/N.
    ///
    /// Public: the recovery path for a lost track, callable by any event
    /// source. No-op before `init`.
    pub fn reinitialize(&mut self) {
        let Some((x_range, y_range)) = self.domain else {
            return;
        };
        let n = self.config.n_particles;
        let w = 1.0 / n as f64;
        let mut cum = 0.0;
        self.particles = (0..n)
            .map(|_| {
                cum += w;
                Particle {
                    x: self.rng.gen::<f64>() * x_range,
                    y: self.rng.gen::<f64>() * y_range,
                    weight: w,
                    cum,
                    ..Particle::default()
                }
            })
            .collect();
        self.last_step = Some(Instant::now());
        self.last_estimate = self.centroid();
    }

    pub fn reference_color(&self) -> Rgb {
        self.reference_color
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Centroid returned by the most recent `predict` (or `init`).
    pub fn last_estimate(&self) -> Estimate2d {
        self.last_estimate
    }

    // -----------------------------------------------------------------------
    // Predict
    // -----------------------------------------------------------------------

    /// Resample, advance dynamics by the elapsed wall-clock time, reset
    /// weights to 1/N and return the new centroid.
    pub fn predict(&mut self) -> Result<Estimate2d, TrackerError> {
        if self.domain.is_none() {
            return Err(TrackerError::NotInitialized);
        }
        let now = Instant::now();
        let dt = self
            .last_step
            .map(|prev| now.duration_since(prev).as_secs_f64())
            .unwrap_or(0.0);
        self.last_step = Some(now);
        Ok(self.step(dt))
    }

    /// One predict cycle with an explicit `dt`, for deterministic use.
    fn step(&mut self, dt: f64) -> Estimate2d {
        let n = self.particles.len();

        // Resample: weighted draw with replacement, r ∈ (0, 1]
        let mut next = Vec::with_capacity(n);
        for _ in 0..n {
            let r = 1.0 - self.rng.gen::<f64>();
            next.push(self.particles[self.index_for(r)]);
        }
        self.particles = next;

        self.apply_dynamics(dt);

        // Equal weights after resampling
        let w = 1.0 / n as f64;
        let mut cum = 0.0;
        for p in &mut self.particles {
            p.weight = w;
            cum += w;
            p.cum = cum;
        }

        let est = self.centroid();
        self.last_estimate = est;
        est
    }

    /// First particle whose cumulative weight reaches `r` (iterative binary
    /// search over the nondecreasing `cum` sequence).
    fn index_for(&self, r: f64) -> usize {
        let idx = self.particles.partition_point(|p| p.cum < r);
        idx.min(self.particles.len() - 1)
    }

    fn apply_dynamics(&mut self, dt: f64) {
        let (x_range, y_range) = self.domain.expect("dynamics require an initialized domain");
        let cfg = &self.config;
        let drag = (1.0 - cfg.air_resistance).powf(dt);
        let acc_decay = cfg.accel_reduction.powf(dt);
        let half_x = x_range / 2.0;
        let half_y = y_range / 2.0;

        let rng = &mut self.rng;
        let noise_pos = self.noise_pos;
        let noise_acc = self.noise_acc;
        let noise_vel = self.noise_vel;

        for p in &mut self.particles {
            p.x += p.vx * dt + noise_pos.sample(rng);
            p.y += p.vy * dt + noise_pos.sample(rng);
            p.vx *= drag;
            p.vy *= drag;
            p.vx += p.accx * dt;
            p.vy += p.accy * dt + cfg.gravity * dt;
            p.accx *= acc_decay;
            p.accy *= acc_decay;

            // Repulsion back toward the domain center, cubic in the
            // normalized distance so it only bites near the edges.
            let prob_x = (half_x - p.x).abs() / half_x;
            if rng.gen::<f64>() < prob_x * prob_x * prob_x {
                p.accx += noise_acc.sample(rng).abs() * sign(half_x - p.x);
            }
            let prob_y = (half_y - p.y).abs() / half_y;
            if rng.gen::<f64>() < prob_y * prob_y * prob_y {
                p.accy += noise_acc.sample(rng).abs() * sign(half_y - p.y);
            }

            if p.accx.abs() > cfg.max_accel {
                p.accx = sign(p.accx) * cfg.max_accel;
            }
            if p.accy.abs() > cfg.max_accel {
                p.accy = sign(p.accy) * cfg.max_accel;
            }

            // Sudden unmodeled motion: drop acceleration, redraw velocity
            if rng.gen::<f64>() < cfg.random_hit_prob {
                p.accx = 0.0;
                p.accy = 0.0;
                p.vx = noise_vel.sample(rng);
                p.vy = noise_vel.sample(rng);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Correct
    // -----------------------------------------------------------------------

    /// Reweight the belief against the pending measurement queue and return
    /// the corrected centroid. An empty queue leaves everything untouched
    /// and returns the prior centroid.
    pub fn correct(&mut self) -> Result<Estimate2d, TrackerError> {
        if self.domain.is_none() {
            return Err(TrackerError::NotInitialized);
        }
        if self.measurements.is_empty() {
            return Ok(self.last_estimate);
        }

        self.inject_escape_particles();

        for p in &mut self.particles {
            p.weight = 0.0;
        }

        let sigma = self.config.sigma_meas;
        for m in &self.measurements {
            let mw = m.weight * m.lives as f64 / m.max_age as f64;
            for p in &mut self.particles {
                let w = mw * radial_likelihood(m.x - p.x, m.y - p.y, sigma);
                p.weight = p.weight.max(w);
            }
        }

        let total: f64 = self.particles.iter().map(|p| p.weight).sum();
        if total == 0.0 {
            // Total track loss: every measurement is too far to carry weight.
            // Designed recovery path, not an error.
            tracing::debug!("belief degenerated, reinitializing");
            self.reinitialize();
        } else {
            let mut cum = 0.0;
            for p in &mut self.particles {
                p.weight /= total;
                cum += p.weight;
                p.cum = cum;
            }
        }

        Ok(self.centroid())
    }

    /// Overwrite K weighted-draw victim slots with particles placed uniformly
    /// over the domain. Hedges against the target relocating outside the
    /// current belief.
    fn inject_escape_particles(&mut self) {
        let Some((x_range, y_range)) = self.domain else {
            return;
        };
        let noise_vel = self.noise_vel;
        for _ in 0..self.config.escape_particles {
            let escape = Particle {
                x: self.rng.gen::<f64>() * x_range,
                y: self.rng.gen::<f64>() * y_range,
                vx: noise_vel.sample(&mut self.rng),
                vy: noise_vel.sample(&mut self.rng),
                ..Particle::default()
            };
            let r = 1.0 - self.rng.gen::<f64>();
            let victim = self.index_for(r);
            self.particles[victim] = escape;
        }
    }

    fn centroid(&self) -> Estimate2d {
        let mut cx = 0.0;
        let mut cy = 0.0;
        for p in &self.particles {
            cx += p.weight * p.x;
            cy += p.weight * p.y;
        }
        Estimate2d::new(cx, cy)
    }

    // -----------------------------------------------------------------------
    // Appearance
    // -----------------------------------------------------------------------

    /// Similarity of a sampled patch color to this target's reference color:
    /// normalized cross-correlation over the three channels, mapped from
    /// [−1, 1] to [0, 1]. Samples darker than the configured threshold on
    /// every channel score 0 (near-black detector artifacts).
    pub fn estimate_hit(&self, sampled: Rgb) -> f64 {
        let s = sampled.channels();
        if s.iter().all(|&ch| ch < self.config.dark_color_threshold) {
            return 0.0;
        }
        let r = self.reference_color.channels();

        let mean_s = (s[0] + s[1] + s[2]) / 3.0;
        let mean_r = (r[0] + r[1] + r[2]) / 3.0;

        let mut cross = 0.0;
        let mut var_s = 0.0;
        let mut var_r = 0.0;
        for ch in 0..3 {
            let ds = s[ch] - mean_s;
            let dr = r[ch] - mean_r;
            cross += ds * dr;
            var_s += ds * ds;
            var_r += dr * dr;
        }
        // Achromatic sample or reference: no chroma signal to correlate
        if var_s == 0.0 || var_r == 0.0 {
            return 0.0;
        }

        let corr = cross / (var_s * var_r).sqrt();
        (corr + 1.0) / 2.0
    }

    // -----------------------------------------------------------------------
    // Measurement queue
    // -----------------------------------------------------------------------

    pub fn measurements(&self) -> &[PendingMeasurement] {
        &self.measurements
    }

    /// Append a matched measurement (at most one per frame per filter).
    pub fn push_measurement(&mut self, m: PendingMeasurement) {
        self.measurements.push(m);
    }

    /// Decrement every pending measurement's lifetime and drop the dead.
    /// Called once per frame before association.
    pub fn age_measurements(&mut self) {
        for m in &mut self.measurements {
            m.age();
        }
        self.measurements.retain(|m| !m.is_dead());
    }
}

fn sign(d: f64) -> f64 {
    if d < 0.0 {
        -1.0
    } else {
        1.0
    }
}

/// Isotropic un-normalized-per-axis Gaussian likelihood. The single `sigma`
/// divides the squared radial distance directly (intentional tuning choice,
/// not an axis-independent density).
fn radial_likelihood(dx: f64, dy: f64, sigma: f64) -> f64 {
    (-0.5 * (dx * dx + dy * dy) / sigma).exp() / (2.0 * PI * sigma)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn quiet_config() -> ParticleConfig {
        // All stochastic terms disabled: dynamics become deterministic
        ParticleConfig {
            n_particles: 1,
            escape_particles: 0,
            sigma_pos: 0.0,
            sigma_vel: 0.0,
            sigma_acc: 0.0,
            gravity: 0.0,
            random_hit_prob: 0.0,
            ..ParticleConfig::default()
        }
    }

    fn init_filter(config: ParticleConfig) -> ParticleFilter {
        let mut f = ParticleFilter::new(config, Rgb::new(200.0, 60.0, 50.0), 7);
        f.init(640.0, 480.0);
        f
    }

    fn assert_weights_normalized(f: &ParticleFilter) {
        let sum: f64 = f.particles().iter().map(|p| p.weight).sum();
        assert_abs_diff_eq!(sum, 1.0, epsilon = 1e-9);
        let mut prev = 0.0;
        for p in f.particles() {
            assert!(p.cum >= prev, "cumulative weights must be nondecreasing");
            prev = p.cum;
        }
        assert_abs_diff_eq!(prev, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn operations_before_init_fail() {
        let mut f = ParticleFilter::new(ParticleConfig::default(), Rgb::default(), 1);
        assert_eq!(f.predict(), Err(TrackerError::NotInitialized));
        assert_eq!(f.correct(), Err(TrackerError::NotInitialized));
    }

    #[test]
    fn weights_normalized_after_predict() {
        let mut f = init_filter(ParticleConfig::default());
        f.step(1.0 / 30.0);
        assert_weights_normalized(&f);
    }

    #[test]
    fn weights_normalized_after_correct() {
        let mut f = init_filter(ParticleConfig::default());
        f.step(1.0 / 30.0);
        f.push_measurement(PendingMeasurement::new(320.0, 240.0, 1.0, 5));
        f.correct().unwrap();
        assert_weights_normalized(&f);
    }

    #[test]
    fn correct_with_empty_queue_is_noop() {
        let mut f = init_filter(ParticleConfig::default());
        let prior = f.step(1.0 / 30.0);
        let before: Vec<Particle> = f.particles().to_vec();

        let est = f.correct().unwrap();
        assert_eq!(est, prior);
        for (a, b) in before.iter().zip(f.particles()) {
            assert_eq!(a.x, b.x);
            assert_eq!(a.y, b.y);
            assert_eq!(a.weight, b.weight);
        }
    }

    #[test]
    fn degenerate_single_particle_recovers_measurement() {
        let mut f = init_filter(quiet_config());
        let p = f.particles()[0];
        f.push_measurement(PendingMeasurement::new(p.x, p.y, 1.0, 5));

        let est = f.correct().unwrap();
        assert_eq!(est.x, p.x);
        assert_eq!(est.y, p.y);
        assert_eq!(f.particles()[0].weight, 1.0);
    }

    #[test]
    fn zero_total_weight_reinitializes() {
        let mut f = init_filter(ParticleConfig::default());
        f.step(1.0 / 30.0);
        // Likelihood underflows to exactly 0 at this distance
        f.push_measurement(PendingMeasurement::new(1e9, 1e9, 1.0, 5));
        f.correct().unwrap();

        assert_weights_normalized(&f);
        let n = f.particles().len();
        for p in f.particles() {
            assert_abs_diff_eq!(p.weight, 1.0 / n as f64, epsilon = 1e-12);
        }
    }

    #[test]
    fn resampling_matches_weight_distribution() {
        // Fixed weight vector; chi-square goodness of fit over many draws.
        let mut f = init_filter(ParticleConfig {
            n_particles: 4,
            ..ParticleConfig::default()
        });
        let weights = [0.1, 0.2, 0.3, 0.4];
        let mut cum = 0.0;
        for (p, w) in f.particles.iter_mut().zip(weights) {
            p.weight = w;
            cum += w;
            p.cum = cum;
        }

        let trials = 10_000usize;
        let mut counts = [0usize; 4];
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        for _ in 0..trials {
            let r = 1.0 - rng.gen::<f64>();
            counts[f.index_for(r)] += 1;
        }

        let mut chi2 = 0.0;
        for (i, w) in weights.iter().enumerate() {
            let expected = w * trials as f64;
            let diff = counts[i] as f64 - expected;
            chi2 += diff * diff / expected;
        }
        // χ²(0.99, df=3) ≈ 11.34
        assert!(chi2 < 11.34, "chi-square too large: {chi2}");
    }

    #[test]
    fn binary_search_boundaries() {
        let f = init_filter(ParticleConfig {
            n_particles: 8,
            ..ParticleConfig::default()
        });
        assert_eq!(f.index_for(1e-12), 0);
        assert_eq!(f.index_for(1.0), f.particles().len() - 1);
    }

    #[test]
    fn measurement_lifetime_expires() {
        let mut f = init_filter(ParticleConfig::default());
        f.push_measurement(PendingMeasurement::new(10.0, 10.0, 1.0, 2));
        f.age_measurements();
        assert_eq!(f.measurements().len(), 1);
        assert_eq!(f.measurements()[0].lives, 1);
        f.age_measurements();
        assert!(f.measurements().is_empty());
    }

    #[test]
    fn estimate_hit_scores() {
        let f = init_filter(ParticleConfig::default());
        // Exact match correlates perfectly
        assert_abs_diff_eq!(f.estimate_hit(Rgb::new(200.0, 60.0, 50.0)), 1.0, epsilon = 1e-12);
        // Dark sample rejected outright
        assert_eq!(f.estimate_hit(Rgb::new(10.0, 10.0, 10.0)), 0.0);
        // Achromatic sample carries no chroma signal
        assert_eq!(f.estimate_hit(Rgb::new(120.0, 120.0, 120.0)), 0.0);
    }

    #[test]
    fn gravity_pulls_particles_down() {
        let mut f = init_filter(ParticleConfig {
            sigma_pos: 0.0,
            sigma_vel: 0.0,
            sigma_acc: 0.0,
            random_hit_prob: 0.0,
            gravity: 100.0,
            ..ParticleConfig::default()
        });
        let before: f64 = f.particles().iter().map(|p| p.vy).sum();
        f.step(0.5);
        let after: f64 = f.particles().iter().map(|p| p.vy).sum();
        assert!(
            after > before,
            "vertical velocity must grow under gravity: {before} -> {after}"
        );
    }
}
