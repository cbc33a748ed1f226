// Price-equilibrium solver.
//
// Buyers and sellers are modelled as normal distributions over price. Demand is
// the share of buyers still willing to pay `p` (survival function), supply is the
// share of sellers willing to part with stock at `p` (CDF). The market clears
// where the two shares meet.

use serde::{Deserialize, Serialize};

use crate::error::{ConvergenceError, CurveSide, SolveError};

const FRAC_1_SQRT_2PI: f64 = 0.398_942_280_401_432_7;
const FRAC_1_SQRT_PI: f64 = 0.564_189_583_547_756_3;

/// Below this the series for erf is used, above it the continued fraction.
const ERFC_SERIES_LIMIT: f64 = 2.0;
const ERFC_FRACTION_DEPTH: u32 = 100;

// === NORMAL DISTRIBUTION ===

/// Complementary error function.
///
/// Maclaurin series of erf near zero, Laplace continued fraction in the tail.
/// Both keep ~1e-13 relative accuracy, so `erfc(0) == 1`, `erfc(-x) == 2 - erfc(x)`
/// and tail values stay positive until they underflow.
pub fn erfc(x: f64) -> f64 {
    if x.is_nan() {
        return f64::NAN;
    }
    if x < 0.0 {
        return 2.0 - erfc(-x);
    }
    if x < ERFC_SERIES_LIMIT {
        1.0 - erf_series(x)
    } else {
        erfc_continued_fraction(x)
    }
}

fn erf_series(x: f64) -> f64 {
    let x2 = x * x;
    let mut term = x;
    let mut sum = x;
    for n in 1..80 {
        term *= -x2 / n as f64;
        let add = term / (2 * n + 1) as f64;
        sum += add;
        if add.abs() <= 1e-17 * sum.abs() {
            break;
        }
    }
    2.0 * FRAC_1_SQRT_PI * sum
}

fn erfc_continued_fraction(x: f64) -> f64 {
    // erfc(x) = e^{-x^2}/sqrt(pi) * 1/(x + (1/2)/(x + (2/2)/(x + (3/2)/(x + ...))))
    let mut tail = 0.0;
    for k in (1..=ERFC_FRACTION_DEPTH).rev() {
        tail = (k as f64 * 0.5) / (x + tail);
    }
    (-x * x).exp() * FRAC_1_SQRT_PI / (x + tail)
}

/// Standard normal CDF
pub fn norm_cdf(z: f64) -> f64 {
    0.5 * erfc(-z * std::f64::consts::FRAC_1_SQRT_2)
}

/// Standard normal survival function, `1 - cdf` without cancellation
pub fn norm_sf(z: f64) -> f64 {
    0.5 * erfc(z * std::f64::consts::FRAC_1_SQRT_2)
}

/// Standard normal density
pub fn norm_pdf(z: f64) -> f64 {
    FRAC_1_SQRT_2PI * (-0.5 * z * z).exp()
}

// === CURVES ===

/// Willingness-to-pay of buyers for one good.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DemandCurve {
    pub mean: f64,
    pub spread: f64,
}

/// Willingness-to-sell of sellers for one good.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SupplyCurve {
    pub mean: f64,
    pub spread: f64,
}

impl DemandCurve {
    pub fn new(mean: f64, spread: f64) -> Self {
        Self { mean, spread }
    }

    /// Share of buyers willing to pay at least `price`. Non-increasing in `price`.
    pub fn share_at(&self, price: f64) -> f64 {
        norm_sf((price - self.mean) / self.spread)
    }

    /// Magnitude of the slope of `share_at`.
    pub fn density_at(&self, price: f64) -> f64 {
        norm_pdf((price - self.mean) / self.spread) / self.spread
    }
}

impl SupplyCurve {
    pub fn new(mean: f64, spread: f64) -> Self {
        Self { mean, spread }
    }

    /// Share of sellers willing to sell at or below `price`. Non-decreasing in `price`.
    pub fn share_at(&self, price: f64) -> f64 {
        norm_cdf((price - self.mean) / self.spread)
    }

    /// Slope of `share_at`.
    pub fn density_at(&self, price: f64) -> f64 {
        norm_pdf((price - self.mean) / self.spread) / self.spread
    }
}

fn check_curve(side: CurveSide, mean: f64, spread: f64) -> Result<(), SolveError> {
    if !mean.is_finite() {
        return Err(SolveError::InvalidParameter {
            side,
            param: "mean",
            value: mean,
        });
    }
    if !spread.is_finite() || spread <= 0.0 {
        return Err(SolveError::InvalidParameter {
            side,
            param: "spread",
            value: spread,
        });
    }
    Ok(())
}

// === SOLVER ===

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Seed price for the search
    pub initial_guess: f64,
    /// Stop once a step moves the price by less than `price_tolerance * (1 + |p|)`
    pub price_tolerance: f64,
    pub max_iterations: u32,
    /// Doublings allowed while looking for a sign change around the seed
    pub max_bracket_expansions: u32,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            initial_guess: 0.5,
            price_tolerance: 1e-10,
            max_iterations: 100,
            max_bracket_expansions: 64,
        }
    }
}

/// Market-clearing point for one good.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Equilibrium {
    pub price: f64,
    /// Share of stock that clears at `price`, in [0, 1]
    pub fraction: f64,
    pub iterations: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EquilibriumSolver {
    config: SolverConfig,
}

impl EquilibriumSolver {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Find `p*` with `supply(p*) == demand(p*)`.
    ///
    /// The excess `supply(p) - demand(p)` rises monotonically from -1 to 1, so the
    /// search first walks away from the seed with doubling steps until the sign
    /// flips, then runs Newton steps inside that bracket, falling back to
    /// bisection whenever a Newton step would leave it. Curves many spreads apart
    /// still cross; only a gap so wide that both shares underflow is `Degenerate`.
    pub fn solve(
        &self,
        demand: &DemandCurve,
        supply: &SupplyCurve,
    ) -> Result<Equilibrium, SolveError> {
        check_curve(CurveSide::Demand, demand.mean, demand.spread)?;
        check_curve(CurveSide::Supply, supply.mean, supply.spread)?;
        let cfg = &self.config;
        if !cfg.initial_guess.is_finite() {
            return Err(SolveError::InvalidGuess {
                value: cfg.initial_guess,
            });
        }

        let excess = |p: f64| Tails::at(demand, supply, p).excess();
        let scale = demand.spread.max(supply.spread);

        let guess = cfg.initial_guess;
        let (mut lo, mut hi) = self.bracket(guess, scale, &excess)?;

        let mut p = if guess > lo && guess < hi {
            guess
        } else {
            0.5 * (lo + hi)
        };

        for iteration in 1..=cfg.max_iterations {
            let tails = Tails::at(demand, supply, p);
            let f = tails.excess();

            if f == 0.0 {
                return finish(p, iteration, demand, supply);
            }
            if f < 0.0 {
                lo = p;
            } else {
                hi = p;
            }

            let next = tails
                .newton(p)
                .filter(|&newton| newton > lo && newton < hi)
                .unwrap_or(0.5 * (lo + hi));

            let step = (next - p).abs();
            p = next;
            if step <= cfg.price_tolerance * (1.0 + p.abs()) {
                return finish(p, iteration, demand, supply);
            }
        }

        Err(ConvergenceError::IterationLimit {
            limit: cfg.max_iterations,
            price: p,
            residual: excess(p),
        }
        .into())
    }

    /// Expand from the seed until `excess` changes sign. Returns `(lo, hi)` with
    /// `excess(lo) <= 0 <= excess(hi)`.
    fn bracket(
        &self,
        guess: f64,
        scale: f64,
        excess: &impl Fn(f64) -> f64,
    ) -> Result<(f64, f64), ConvergenceError> {
        let f0 = excess(guess);
        if f0 == 0.0 {
            return Ok((guess, guess));
        }
        // Root lies above the seed when sellers are still scarcer than buyers.
        let direction = if f0 < 0.0 { 1.0 } else { -1.0 };
        let mut inner = guess;
        let mut step = scale;

        for _ in 0..self.config.max_bracket_expansions {
            let outer = guess + direction * step;
            let f = excess(outer);
            if f == 0.0 || f.signum() != f0.signum() {
                return Ok(if direction > 0.0 {
                    (inner, outer)
                } else {
                    (outer, inner)
                });
            }
            inner = outer;
            step *= 2.0;
        }

        Err(ConvergenceError::NoBracket {
            guess,
            expansions: self.config.max_bracket_expansions,
        })
    }
}

/// The excess `supply(p) - demand(p)` written as a difference of two normal
/// tails, `rising - falling`, each carried with its slope.
///
/// Below both means this is `supply - demand` as is. Where both shares are
/// above one half it is `(1 - demand) - (1 - supply)`, so the small complements
/// are compared instead of two numbers near 1. Either way both terms keep full
/// relative precision far out in the tails, and the crossing is only lost once
/// both underflow to zero.
#[derive(Debug, Clone, Copy)]
struct Tails {
    rising: f64,
    rising_slope: f64,
    falling: f64,
    falling_slope: f64,
}

impl Tails {
    fn at(demand: &DemandCurve, supply: &SupplyCurve, price: f64) -> Self {
        let zs = (price - supply.mean) / supply.spread;
        let zd = (price - demand.mean) / demand.spread;
        if zs > 0.0 && zd < 0.0 {
            Self {
                rising: norm_cdf(zd),
                rising_slope: demand.density_at(price),
                falling: norm_sf(zs),
                falling_slope: supply.density_at(price),
            }
        } else {
            Self {
                rising: supply.share_at(price),
                rising_slope: supply.density_at(price),
                falling: demand.share_at(price),
                falling_slope: demand.density_at(price),
            }
        }
    }

    fn excess(&self) -> f64 {
        self.rising - self.falling
    }

    /// Newton step on `ln(rising) - ln(falling)`, which stays close to linear
    /// in the tails where the plain difference is exponentially flat.
    fn newton(&self, price: f64) -> Option<f64> {
        if self.rising <= 0.0 || self.falling <= 0.0 {
            return None;
        }
        let g = self.rising.ln() - self.falling.ln();
        let dg = self.rising_slope / self.rising + self.falling_slope / self.falling;
        let next = price - g / dg;
        (dg > 0.0 && next.is_finite()).then_some(next)
    }

    fn underflowed(&self) -> bool {
        self.rising == 0.0 && self.falling == 0.0
    }
}

fn finish(
    price: f64,
    iterations: u32,
    demand: &DemandCurve,
    supply: &SupplyCurve,
) -> Result<Equilibrium, SolveError> {
    // Both tails at zero: every price in the gap looks like a root.
    if Tails::at(demand, supply, price).underflowed() {
        return Err(ConvergenceError::Degenerate { price }.into());
    }
    Ok(Equilibrium {
        price,
        fraction: supply.share_at(price).clamp(0.0, 1.0),
        iterations,
    })
}

/// Solve with the default configuration (seed 0.5).
pub fn solve_equilibrium(
    demand: &DemandCurve,
    supply: &SupplyCurve,
) -> Result<Equilibrium, SolveError> {
    EquilibriumSolver::default().solve(demand, supply)
}
