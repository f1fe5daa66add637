//! Iterative 1D adaptive kernel density estimation on a bounded domain.
//!
//! The first iterate uses one global bandwidth (Abraham's heuristic). Each later
//! iterate picks a bandwidth per sample, `bw_fac / sqrt(density)`, reading the
//! density from the previous iterate: kernels narrow where samples are dense.
//!
//! Kernels are truncated to the grid domain `[a, b]` and rescaled so that each
//! one still carries unit mass, which keeps the estimate normalized near the
//! boundaries of the efficiency domain.

use crate::error::{Error, Result};
use std::f64::consts::{FRAC_1_SQRT_2, PI};

/// Largest tolerated deviation of the integrated density from 1.
pub const AREA_TOLERANCE: f64 = 1e-3;

/// Bandwidths below this are treated as degenerate.
const MIN_BANDWIDTH: f64 = 1e-7;

/// Functions needed to estimate a density with one kernel shape.
pub trait KernelFamily {
    /// Unit kernel centered at 0.
    fn kernel(&self, x: f64) -> f64;
    fn cdf(&self, x: f64) -> f64;
    /// Factor bringing the unit kernel truncated to `[a, b]` back to unit mass.
    fn scaling(&self, a: f64, b: f64) -> f64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Gaussian;

impl KernelFamily for Gaussian {
    fn kernel(&self, x: f64) -> f64 {
        1.0 / (2.0 * PI).sqrt() * (-0.5 * x.powi(2)).exp()
    }

    fn cdf(&self, x: f64) -> f64 {
        0.5 * (1.0 + libm::erf(x * FRAC_1_SQRT_2))
    }

    fn scaling(&self, a: f64, b: f64) -> f64 {
        -2.0 / (libm::erf(a * FRAC_1_SQRT_2) + libm::erf(-b * FRAC_1_SQRT_2))
    }
}

/// Abraham's bandwidth heuristic, `((4σ⁵)/(3n))^(1/5)`.
///
/// σ is the population standard deviation. Degenerate (near zero variance)
/// samples get a bandwidth of 1.
pub fn bandwidth_estimate(samples: &[f64]) -> Result<f64> {
    if samples.is_empty() {
        return Err(Error::EmptySamples);
    }
    let n = samples.len() as f64;
    let mean = samples.iter().sum::<f64>() / n;
    let sigma = (samples.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n).sqrt();
    let candidate = ((4.0 * sigma.powf(5.0)) / (3.0 * n)).powf(1.0 / 5.0);
    if candidate < MIN_BANDWIDTH {
        Ok(1.0)
    } else {
        Ok(candidate)
    }
}

/// `num` evenly spaced points from `start` to `stop` inclusive.
pub fn linspace(start: f64, stop: f64, num: usize) -> Vec<f64> {
    match num {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (num - 1) as f64;
            let mut v: Vec<f64> = (0..num).map(|i| start + i as f64 * step).collect();
            v[num - 1] = stop;
            v
        }
    }
}

fn basic_simpson(y: &[f64], x: &[f64], start: usize, stop: usize) -> f64 {
    let mut result = 0.0;
    let mut i = start;
    while i + 2 <= stop {
        let h0 = x[i + 1] - x[i];
        let h1 = x[i + 2] - x[i + 1];
        let hsum = h0 + h1;
        let hprod = h0 * h1;
        let h0divh1 = h0 / h1;
        result += hsum / 6.0
            * (y[i] * (2.0 - 1.0 / h0divh1)
                + y[i + 1] * (hsum * hsum / hprod)
                + y[i + 2] * (2.0 - h0divh1));
        i += 2;
    }
    result
}

/// Composite Simpson's rule over possibly uneven samples.
///
/// With an odd number of intervals, the result averages "Simpson then one
/// trapezoid" and "one trapezoid then Simpson".
pub fn simpson(y: &[f64], x: &[f64]) -> Result<f64> {
    if y.len() != x.len() {
        return Err(Error::LengthMismatch {
            x: x.len(),
            y: y.len(),
        });
    }
    Ok(integrate(y, x))
}

fn integrate(y: &[f64], x: &[f64]) -> f64 {
    let n = y.len();
    match n {
        0 | 1 => 0.0,
        2 => 0.5 * (x[1] - x[0]) * (y[0] + y[1]),
        _ if n % 2 == 1 => basic_simpson(y, x, 0, n - 1),
        _ => {
            let last = 0.5 * (x[n - 1] - x[n - 2]) * (y[n - 1] + y[n - 2]);
            let first = 0.5 * (x[1] - x[0]) * (y[0] + y[1]);
            let val1 = basic_simpson(y, x, 0, n - 2) + last;
            let val2 = first + basic_simpson(y, x, 1, n - 1);
            (val1 + val2) / 2.0
        }
    }
}

/// A density sampled on a grid of at least two points.
#[derive(Debug, Clone, PartialEq)]
pub struct DensityEstimate {
    x: Vec<f64>,
    density: Vec<f64>,
    area: f64,
}

impl DensityEstimate {
    pub fn new(x: Vec<f64>, density: Vec<f64>) -> Result<Self> {
        if x.len() < 2 {
            return Err(Error::GridTooSmall(x.len()));
        }
        let area = simpson(&density, &x)?;
        Ok(Self { x, density, area })
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn density(&self) -> &[f64] {
        &self.density
    }

    /// Integral of the density over the grid.
    pub fn area(&self) -> f64 {
        self.area
    }

    /// Step lookup: the value at the first grid point at or after `lx`,
    /// or the last value past the end of the grid.
    pub fn step_at(&self, lx: f64) -> f64 {
        let loc = self.x.partition_point(|&g| g < lx);
        self.density[loc.min(self.density.len() - 1)]
    }

    pub fn is_normalized(&self) -> bool {
        (self.area - 1.0).abs() <= AREA_TOLERANCE
    }

    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.x.iter().copied().zip(self.density.iter().copied())
    }
}

/// Adaptive kernel density estimator.
///
/// Holds the previous iterate between calls to [`Akde::pdf`]; one instance
/// must not be refined from several places at once.
#[derive(Debug, Clone)]
pub struct Akde<K: KernelFamily = Gaussian> {
    kernel_family: K,
    clip: bool,
    bw_fac: f64,
    bw0: f64,
    x: Vec<f64>,
    samples: Vec<f64>,
    last_pdf: Option<DensityEstimate>,
}

impl Akde<Gaussian> {
    /// Gaussian estimator on grid `x`, with boundary clipping.
    pub fn new(x: Vec<f64>, samples: Vec<f64>, bw_fac: f64) -> Result<Self> {
        Akde::with_kernel(Gaussian, x, samples, bw_fac, true)
    }
}

impl<K: KernelFamily> Akde<K> {
    pub fn with_kernel(
        kernel_family: K,
        x: Vec<f64>,
        samples: Vec<f64>,
        bw_fac: f64,
        clip: bool,
    ) -> Result<Self> {
        if x.len() < 2 {
            return Err(Error::GridTooSmall(x.len()));
        }
        let bw0 = bandwidth_estimate(&samples)?;
        if clip {
            let (lower, upper) = (x[0], x[x.len() - 1]);
            if let Some(&sample) = samples.iter().find(|&&s| !(s >= lower && s <= upper)) {
                return Err(Error::SampleOutOfDomain {
                    sample,
                    lower,
                    upper,
                });
            }
        }
        Ok(Self {
            kernel_family,
            clip,
            bw_fac,
            bw0,
            x,
            samples,
            last_pdf: None,
        })
    }

    pub fn grid(&self) -> &[f64] {
        &self.x
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn initial_bandwidth(&self) -> f64 {
        self.bw0
    }

    pub fn last_pdf(&self) -> Option<&DensityEstimate> {
        self.last_pdf.as_ref()
    }

    /// Forgets the previous iterate; the next [`Akde::pdf`] starts over with the global bandwidth.
    pub fn reset(&mut self) {
        self.last_pdf = None;
    }

    /// Density at `lx` according to the previous iterate.
    pub fn density_estimate(&self, lx: f64) -> Option<f64> {
        self.last_pdf.as_ref().map(|pdf| pdf.step_at(lx))
    }

    /// Reconstruction bandwidth at `lx`.
    pub fn bandwidth(&self, lx: f64) -> f64 {
        match self.density_estimate(lx) {
            None => self.bw0,
            Some(density) => self.bw_fac * density.powf(-0.5),
        }
    }

    fn boundary_scaling(&self, s: f64, h: f64) -> f64 {
        if self.clip {
            let a = self.x[0];
            let b = self.x[self.x.len() - 1];
            self.kernel_family.scaling((a - s) / h, (b - s) / h)
        } else {
            1.0
        }
    }

    /// One estimation step. Returns the new iterate and keeps it for the next step.
    pub fn pdf(&mut self) -> DensityEstimate {
        let mut pdf = vec![0.0; self.x.len()];
        for &s in &self.samples {
            let h = self.bandwidth(s);
            let scaling = self.boundary_scaling(s, h);
            for (p, &x) in pdf.iter_mut().zip(&self.x) {
                *p += 1.0 / h * scaling * self.kernel_family.kernel((x - s) / h);
            }
        }
        let n = self.samples.len() as f64;
        pdf.iter_mut().for_each(|p| *p /= n);
        let area = integrate(&pdf, &self.x);
        log::debug!("AKDE iterate area: {}", area);
        if self.clip && (area - 1.0).abs() > AREA_TOLERANCE {
            log::warn!(
                "Area under PDF is {}; it should be very close to 1.0. This is likely sampling error.",
                area
            );
        }
        let estimate = DensityEstimate {
            x: self.x.clone(),
            density: pdf,
            area,
        };
        self.last_pdf = Some(estimate.clone());
        estimate
    }

    /// Resets, then runs `num` steps and returns every iterate.
    pub fn pdf_series(&mut self, num: usize) -> Vec<DensityEstimate> {
        self.reset();
        (0..num).map(|_| self.pdf()).collect()
    }

    /// Resets, then runs `num` steps and returns the last iterate.
    pub fn pdf_refine(&mut self, num: usize) -> Result<DensityEstimate> {
        if num == 0 {
            return Err(Error::NoIterations);
        }
        self.reset();
        let mut last = self.pdf();
        for _ in 1..num {
            last = self.pdf();
        }
        Ok(last)
    }

    /// Cumulative distribution on the grid with the current bandwidths.
    pub fn cdf(&self) -> Vec<f64> {
        let a = self.x[0];
        let mut cdf = vec![0.0; self.x.len()];
        for &s in &self.samples {
            let h = self.bandwidth(s);
            let scaling = self.boundary_scaling(s, h);
            let origin = self.kernel_family.cdf((a - s) / h);
            for (c, &x) in cdf.iter_mut().zip(&self.x) {
                *c += scaling * (self.kernel_family.cdf((x - s) / h) - origin);
            }
        }
        let n = self.samples.len() as f64;
        cdf.iter_mut().for_each(|c| *c /= n);
        cdf
    }
}

/// Parameters of the efficiency density charts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AkdeConfig {
    pub grid_points: usize,
    pub bw_fac: f64,
    pub iterations: usize,
}

impl Default for AkdeConfig {
    fn default() -> Self {
        Self {
            grid_points: 1000,
            bw_fac: 0.05,
            iterations: 10,
        }
    }
}

impl AkdeConfig {
    /// Refined density of efficiency samples over `[0, 1]`.
    pub fn efficiency_density(&self, samples: &[f64]) -> Result<DensityEstimate> {
        let mut sorted = samples.to_vec();
        sorted.sort_by(f64::total_cmp);
        let mut akde = Akde::new(linspace(0.0, 1.0, self.grid_points), sorted, self.bw_fac)?;
        akde.pdf_refine(self.iterations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn grid() {
        let x = linspace(0.0, 1.0, 1001);
        assert_eq!(x.len(), 1001);
        assert_eq!(x[0], 0.0);
        assert_eq!(x[1000], 1.0);
        assert_relative_eq!(x[500], 0.5);
        assert_eq!(linspace(0.0, 1.0, 1), vec![0.0]);
        assert!(linspace(0.0, 1.0, 0).is_empty());
    }

    #[test]
    fn simpson_polynomials() {
        let x = linspace(0.0, 2.0, 11);
        let y: Vec<f64> = x.iter().map(|x| x * x).collect();
        assert_relative_eq!(simpson(&y, &x).unwrap(), 8.0 / 3.0, epsilon = 1e-12);
        // even number of points
        let x = linspace(0.0, 1.0, 10);
        let y: Vec<f64> = x.iter().map(|x| 3.0 * x + 1.0).collect();
        assert_relative_eq!(simpson(&y, &x).unwrap(), 2.5, epsilon = 1e-12);
        assert_eq!(simpson(&[1.0], &[0.0]).unwrap(), 0.0);
        assert!(matches!(
            simpson(&[1.0, 2.0], &[0.0, 0.5, 1.0]),
            Err(Error::LengthMismatch { x: 3, y: 2 })
        ));
    }

    #[test]
    fn gaussian_family() {
        let g = Gaussian;
        assert_relative_eq!(g.kernel(0.0), 0.3989422804014327, epsilon = 1e-15);
        assert_relative_eq!(g.cdf(0.0), 0.5);
        // untruncated kernel needs no rescaling
        assert_relative_eq!(g.scaling(-40.0, 40.0), 1.0, epsilon = 1e-12);
        // half of the kernel is cut off
        assert_relative_eq!(g.scaling(0.0, 40.0), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn bandwidth() {
        assert!(matches!(bandwidth_estimate(&[]), Err(Error::EmptySamples)));
        assert_eq!(bandwidth_estimate(&[0.5, 0.5, 0.5]).unwrap(), 1.0);
        let s = [0.0, 1.0];
        // sigma = 0.5
        let expected = ((4.0 * 0.5f64.powf(5.0)) / 6.0).powf(0.2);
        assert_relative_eq!(bandwidth_estimate(&s).unwrap(), expected);
    }

    #[test]
    fn construction_errors() {
        assert!(matches!(
            Akde::new(vec![0.0], vec![0.5], 0.05),
            Err(Error::GridTooSmall(1))
        ));
        assert!(matches!(
            Akde::new(linspace(0.0, 1.0, 10), vec![], 0.05),
            Err(Error::EmptySamples)
        ));
        assert!(matches!(
            Akde::new(linspace(0.0, 1.0, 10), vec![0.5, 1.5], 0.05),
            Err(Error::SampleOutOfDomain { .. })
        ));
        assert!(Akde::with_kernel(Gaussian, linspace(0.0, 1.0, 10), vec![1.5], 0.05, false).is_ok());
    }

    #[test]
    fn step_lookup() {
        let d = DensityEstimate::new(vec![0.0, 0.5, 1.0], vec![1.0, 2.0, 3.0]).unwrap();
        assert_relative_eq!(d.area(), 2.0);
        assert_eq!(d.step_at(0.0), 1.0);
        assert_eq!(d.step_at(0.2), 2.0);
        assert_eq!(d.step_at(0.5), 2.0);
        assert_eq!(d.step_at(0.7), 3.0);
        assert_eq!(d.step_at(2.0), 3.0);
        assert!(matches!(
            DensityEstimate::new(vec![], vec![]),
            Err(Error::GridTooSmall(0))
        ));
        assert!(matches!(
            DensityEstimate::new(vec![0.0, 1.0], vec![1.0]),
            Err(Error::LengthMismatch { .. })
        ));
    }

    #[test]
    fn state_machine() {
        let mut akde = Akde::new(linspace(0.0, 1.0, 101), vec![0.2, 0.4, 0.9], 0.05).unwrap();
        assert!(akde.last_pdf().is_none());
        assert_eq!(akde.bandwidth(0.2), akde.initial_bandwidth());
        let first = akde.pdf();
        assert!(akde.last_pdf().is_some());
        let d = first.step_at(0.2);
        assert_relative_eq!(akde.bandwidth(0.2), 0.05 / d.sqrt());
        akde.reset();
        assert!(akde.last_pdf().is_none());
        let again = akde.pdf();
        assert_eq!(first, again);
    }

    #[test]
    fn series_and_refine_agree() {
        let samples = vec![0.1, 0.15, 0.3, 0.6, 0.62, 0.95];
        let mut akde = Akde::new(linspace(0.0, 1.0, 201), samples, 0.05).unwrap();
        let series = akde.pdf_series(4);
        assert_eq!(series.len(), 4);
        let refined = akde.pdf_refine(4).unwrap();
        assert_eq!(series[3], refined);
        assert!(matches!(akde.pdf_refine(0), Err(Error::NoIterations)));
    }

    #[test]
    fn uniform_samples_integrate_to_one() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let samples: Vec<f64> = (0..200).map(|_| rng.random::<f64>()).collect();
        let mut akde = Akde::new(linspace(0.0, 1.0, 1001), samples, 0.05).unwrap();
        let pdf = akde.pdf_refine(10).unwrap();
        assert!((pdf.area() - 1.0).abs() < 1e-2, "area {}", pdf.area());
        assert!(pdf.density().iter().all(|d| *d >= 0.0 && d.is_finite()));
    }

    #[test]
    fn boundary_samples() {
        let samples = vec![0.0, 0.0, 1.0, 1.0, 0.5];
        let mut akde = Akde::new(linspace(0.0, 1.0, 1001), samples, 0.05).unwrap();
        let pdf = akde.pdf_refine(3).unwrap();
        assert!((pdf.area() - 1.0).abs() < 1e-2, "area {}", pdf.area());
    }

    #[test]
    fn cdf_reaches_one() {
        let mut akde = Akde::new(linspace(0.0, 1.0, 501), vec![0.2, 0.3, 0.35, 0.8], 0.05).unwrap();
        let cdf = akde.cdf();
        assert_eq!(cdf[0], 0.0);
        assert_relative_eq!(cdf[500], 1.0, epsilon = 1e-9);
        akde.pdf();
        let cdf = akde.cdf();
        assert_relative_eq!(cdf[500], 1.0, epsilon = 1e-9);
        assert!(cdf.windows(2).all(|w| w[0] <= w[1] + 1e-15));
    }

    #[test]
    fn default_config() {
        let c = AkdeConfig::default();
        let pdf = c.efficiency_density(&[0.9, 0.1, 0.5, 0.55]).unwrap();
        assert_eq!(pdf.x().len(), 1000);
        assert_eq!(pdf.density().len(), 1000);
    }
}
