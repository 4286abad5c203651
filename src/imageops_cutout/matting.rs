//! Closed-form alpha matting over the unknown band of a trimap.
//!
//! The matting Laplacian of Levin, Lischinski and Weiss is never assembled.
//! Its product with a vector is evaluated through box-filtered window
//! statistics, in the same way the colour guided filter computes its linear
//! coefficients, and the constrained system
//!
//! ```text
//! (L + lambda * D) alpha = lambda * D * trimap
//! ```
//!
//! is solved with Jacobi-preconditioned conjugate gradients. `D` selects the
//! pixels whose trimap value is definite.

use std::sync::Arc;

use image::{Luma, Rgb};
use imageproc::definitions::Image;

use crate::config::MattingConfig;
use crate::error::MattingError;
use crate::imageops_cutout::box_filter::Plane;
use crate::imageops_cutout::outcome::{Stage, StageOutcome};
use crate::imageops_cutout::trimap::Trimap;
use crate::utils::{quantize_unit, to_unit_rgb};

/// Trimap values at or above this are treated as definite foreground
const KNOWN_FOREGROUND: f32 = 0.9;
/// Trimap values at or below this are treated as definite background
const KNOWN_BACKGROUND: f32 = 0.1;

/// An alpha estimator driven by a trimap
///
/// Both inputs are in `[0, 1]`. Implementations return an alpha of the same
/// dimensions, also in `[0, 1]`.
pub trait AlphaMatting: Send + Sync {
    /// # Errors
    ///
    /// Any [`MattingError`]; callers fall back to the pre-matting alpha.
    fn estimate_alpha(
        &self,
        image: &Image<Rgb<f32>>,
        trimap: &Image<Luma<f32>>,
    ) -> Result<Image<Luma<f32>>, MattingError>;
}

/// Built-in closed-form matting solver
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosedFormMatting {
    epsilon: f64,
    window_radius: u32,
    lambda: f64,
    max_iterations: usize,
    tolerance: f64,
    max_pixels: u64,
}

impl Default for ClosedFormMatting {
    fn default() -> Self {
        Self::new(&MattingConfig::default())
    }
}

impl ClosedFormMatting {
    #[must_use]
    pub const fn new(config: &MattingConfig) -> Self {
        Self {
            epsilon: config.epsilon,
            window_radius: config.window_radius,
            lambda: config.lambda,
            max_iterations: config.max_iterations,
            tolerance: config.tolerance,
            max_pixels: config.max_pixels,
        }
    }
}

impl AlphaMatting for ClosedFormMatting {
    fn estimate_alpha(
        &self,
        image: &Image<Rgb<f32>>,
        trimap: &Image<Luma<f32>>,
    ) -> Result<Image<Luma<f32>>, MattingError> {
        if image.dimensions() != trimap.dimensions() {
            return Err(MattingError::DimensionMismatch {
                image: image.dimensions(),
                trimap: trimap.dimensions(),
            });
        }

        let (width, height) = image.dimensions();
        let pixels = u64::from(width) * u64::from(height);
        if pixels > self.max_pixels {
            return Err(MattingError::ImageTooLarge {
                pixels,
                limit: self.max_pixels,
            });
        }

        let mut known = Vec::with_capacity(pixels as usize);
        let mut target = Vec::with_capacity(pixels as usize);
        for Luma([t]) in trimap.pixels() {
            if *t >= KNOWN_FOREGROUND {
                known.push(true);
                target.push(1.0);
            } else if *t <= KNOWN_BACKGROUND {
                known.push(true);
                target.push(0.0);
            } else {
                known.push(false);
                target.push(0.5);
            }
        }

        let known_count = known.iter().filter(|&&k| k).count();
        if known_count == 0 {
            return Err(MattingError::NoKnownPixels);
        }

        let alpha = if known_count == known.len() {
            target
        } else {
            let laplacian = MattingLaplacian::new(image, self.window_radius, self.epsilon);
            let system = ConstrainedSystem {
                laplacian: &laplacian,
                known: &known,
                lambda: self.lambda,
            };
            let mut alpha = self.solve(&system, &target)?;
            for ((a, &k), &t) in alpha.iter_mut().zip(&known).zip(&target) {
                *a = if k { t } else { a.clamp(0.0, 1.0) };
            }
            alpha
        };

        Ok(Image::from_fn(width, height, |x, y| {
            Luma([alpha[y as usize * width as usize + x as usize] as f32])
        }))
    }
}

impl ClosedFormMatting {
    /// Preconditioned conjugate gradients from the trimap as initial guess
    fn solve(&self, system: &ConstrainedSystem<'_>, target: &[f64]) -> Result<Vec<f64>, MattingError> {
        let rhs: Vec<f64> = system
            .known
            .iter()
            .zip(target)
            .map(|(&k, &t)| if k { system.lambda * t } else { 0.0 })
            .collect();
        let rhs_norm = dot(&rhs, &rhs).sqrt();
        if rhs_norm == 0.0 {
            // only background constraints: the minimiser is identically zero
            return Ok(vec![0.0; target.len()]);
        }

        let inverse_diagonal: Vec<f64> = system
            .diagonal()
            .into_iter()
            .map(|d| if d > f64::EPSILON { 1.0 / d } else { 1.0 })
            .collect();

        let mut x = target.to_vec();
        let ax = system.apply(&x);
        let mut r: Vec<f64> = rhs.iter().zip(&ax).map(|(b, a)| b - a).collect();
        let mut z: Vec<f64> = r.iter().zip(&inverse_diagonal).map(|(r, m)| r * m).collect();
        let mut p = z.clone();
        let mut rz = dot(&r, &z);

        for iteration in 0..self.max_iterations {
            let residual = dot(&r, &r).sqrt();
            if !residual.is_finite() {
                return Err(MattingError::Diverged { iteration });
            }
            if residual <= self.tolerance * rhs_norm {
                tracing::debug!(iteration, residual, "matting converged");
                return Ok(x);
            }

            let ap = system.apply(&p);
            let curvature = dot(&p, &ap);
            if !curvature.is_finite() {
                return Err(MattingError::Diverged { iteration });
            }
            if curvature <= 0.0 {
                break;
            }

            let step = rz / curvature;
            axpy(step, &p, &mut x);
            axpy(-step, &ap, &mut r);

            for ((z, r), m) in z.iter_mut().zip(&r).zip(&inverse_diagonal) {
                *z = r * m;
            }
            let rz_next = dot(&r, &z);
            let beta = rz_next / rz;
            for (p, z) in p.iter_mut().zip(&z) {
                *p = z + beta * *p;
            }
            rz = rz_next;
        }

        tracing::debug!(
            iterations = self.max_iterations,
            "matting stopped at iteration budget"
        );
        Ok(x)
    }
}

/// Per-window colour statistics defining the matting Laplacian
struct MattingLaplacian {
    radius: u32,
    /// Colour channels of the source image
    channels: [Plane; 3],
    /// Window colour means
    means: [Plane; 3],
    /// Inverse regularised window covariance `[rr, rg, rb, gg, gb, bb]`
    inverse_covariance: [Plane; 6],
    /// Pixels per clipped window, also the number of windows covering a pixel
    window_sizes: Plane,
}

impl MattingLaplacian {
    fn new(image: &Image<Rgb<f32>>, radius: u32, epsilon: f64) -> Self {
        let (width, height) = image.dimensions();
        let channel = |c: usize| {
            Plane::new(
                width,
                height,
                image.pixels().map(|p| f64::from(p[c])).collect(),
            )
        };
        let channels = [channel(0), channel(1), channel(2)];
        let means = [
            channels[0].box_mean(radius),
            channels[1].box_mean(radius),
            channels[2].box_mean(radius),
        ];
        let window_sizes = Plane::window_sizes(width, height, radius);

        let second_moment = |a: usize, b: usize| {
            channels[a]
                .zip_map(&channels[b], |x, y| x * y)
                .box_mean(radius)
        };
        let moments = [
            second_moment(0, 0),
            second_moment(0, 1),
            second_moment(0, 2),
            second_moment(1, 1),
            second_moment(1, 2),
            second_moment(2, 2),
        ];

        let len = window_sizes.data().len();
        let mut inverse = [
            vec![0.0; len],
            vec![0.0; len],
            vec![0.0; len],
            vec![0.0; len],
            vec![0.0; len],
            vec![0.0; len],
        ];

        for i in 0..len {
            let [mr, mg, mb] = [means[0].data()[i], means[1].data()[i], means[2].data()[i]];
            let reg = epsilon / window_sizes.data()[i];

            let rr = mr.mul_add(-mr, moments[0].data()[i]) + reg;
            let rg = mr.mul_add(-mg, moments[1].data()[i]);
            let rb = mr.mul_add(-mb, moments[2].data()[i]);
            let gg = mg.mul_add(-mg, moments[3].data()[i]) + reg;
            let gb = mg.mul_add(-mb, moments[4].data()[i]);
            let bb = mb.mul_add(-mb, moments[5].data()[i]) + reg;

            // cofactor inverse of the symmetric 3x3 covariance
            let c_rr = gg.mul_add(bb, -(gb * gb));
            let c_rg = rb.mul_add(gb, -(rg * bb));
            let c_rb = rg.mul_add(gb, -(gg * rb));
            let det = rr.mul_add(c_rr, rg.mul_add(c_rg, rb * c_rb));

            if det.is_normal() {
                let inv_det = 1.0 / det;
                inverse[0][i] = c_rr * inv_det;
                inverse[1][i] = c_rg * inv_det;
                inverse[2][i] = c_rb * inv_det;
                inverse[3][i] = rr.mul_add(bb, -(rb * rb)) * inv_det;
                inverse[4][i] = rb.mul_add(rg, -(rr * gb)) * inv_det;
                inverse[5][i] = rr.mul_add(gg, -(rg * rg)) * inv_det;
            }
        }

        let inverse_covariance = inverse.map(|data| Plane::new(width, height, data));

        Self {
            radius,
            channels,
            means,
            inverse_covariance,
            window_sizes,
        }
    }

    fn width(&self) -> u32 {
        self.window_sizes.width()
    }

    fn height(&self) -> u32 {
        self.window_sizes.height()
    }

    /// `inverse_covariance * v` for the symmetric matrix stored at pixel `i`
    fn inverse_times(&self, i: usize, v: [f64; 3]) -> [f64; 3] {
        let m = |k: usize| self.inverse_covariance[k].data()[i];
        [
            m(0).mul_add(v[0], m(1).mul_add(v[1], m(2) * v[2])),
            m(1).mul_add(v[0], m(3).mul_add(v[1], m(4) * v[2])),
            m(2).mul_add(v[0], m(4).mul_add(v[1], m(5) * v[2])),
        ]
    }

    /// `L p` without forming `L`
    ///
    /// For each window `k` the best local linear fit `a_k . I + b_k` of `p` is
    /// computed; `(L p)_i` is the sum over the windows covering `i` of
    /// `p_i - (a_k . I_i + b_k)`.
    fn apply(&self, p: &[f64]) -> Vec<f64> {
        let (width, height) = (self.width(), self.height());
        let p_plane = Plane::new(width, height, p.to_vec());
        let mean_p = p_plane.box_mean(self.radius);
        let mean_ip = [
            self.channels[0].zip_map(&p_plane, |c, v| c * v).box_mean(self.radius),
            self.channels[1].zip_map(&p_plane, |c, v| c * v).box_mean(self.radius),
            self.channels[2].zip_map(&p_plane, |c, v| c * v).box_mean(self.radius),
        ];

        let len = p.len();
        let mut a = [vec![0.0; len], vec![0.0; len], vec![0.0; len]];
        let mut b = vec![0.0; len];
        for i in 0..len {
            let mp = mean_p.data()[i];
            let mu = [
                self.means[0].data()[i],
                self.means[1].data()[i],
                self.means[2].data()[i],
            ];
            let cov = [
                mu[0].mul_add(-mp, mean_ip[0].data()[i]),
                mu[1].mul_add(-mp, mean_ip[1].data()[i]),
                mu[2].mul_add(-mp, mean_ip[2].data()[i]),
            ];
            let coeff = self.inverse_times(i, cov);
            a[0][i] = coeff[0];
            a[1][i] = coeff[1];
            a[2][i] = coeff[2];
            b[i] = mp - coeff[0].mul_add(mu[0], coeff[1].mul_add(mu[1], coeff[2] * mu[2]));
        }

        let [a_r, a_g, a_b] = a.map(|data| Plane::new(width, height, data).box_sum(self.radius));
        let b_sum = Plane::new(width, height, b).box_sum(self.radius);

        (0..len)
            .map(|i| {
                let fit = a_r.data()[i].mul_add(
                    self.channels[0].data()[i],
                    a_g.data()[i].mul_add(
                        self.channels[1].data()[i],
                        a_b.data()[i] * self.channels[2].data()[i],
                    ),
                ) + b_sum.data()[i];
                self.window_sizes.data()[i].mul_add(p[i], -fit)
            })
            .collect()
    }

    /// Diagonal of `L`, used as the Jacobi preconditioner
    ///
    /// `L_ii = sum_k 1 - (1 + (I_i - mu_k)' S_k (I_i - mu_k)) / |w_k|`, expanded
    /// so that every sum over `k` is a box sum of per-window terms.
    fn diagonal(&self) -> Vec<f64> {
        let (width, height) = (self.width(), self.height());
        let len = self.window_sizes.data().len();
        let radius = self.radius;

        let per_window = |f: &dyn Fn(usize) -> f64| {
            Plane::new(width, height, (0..len).map(f).collect()).box_sum(radius)
        };

        let inv_size = |k: usize| 1.0 / self.window_sizes.data()[k];
        let sum_inv_size = per_window(&|k| inv_size(k));
        let sum_s: Vec<Plane> = (0..6)
            .map(|e| per_window(&|k| self.inverse_covariance[e].data()[k] * inv_size(k)))
            .collect();
        let s_mu = |k: usize| {
            let mu = [
                self.means[0].data()[k],
                self.means[1].data()[k],
                self.means[2].data()[k],
            ];
            (self.inverse_times(k, mu), mu)
        };
        let sum_s_mu: Vec<Plane> = (0..3)
            .map(|c| per_window(&|k| s_mu(k).0[c] * inv_size(k)))
            .collect();
        let sum_mu_s_mu = per_window(&|k| {
            let (smu, mu) = s_mu(k);
            (mu[0] * smu[0] + mu[1] * smu[1] + mu[2] * smu[2]) * inv_size(k)
        });

        (0..len)
            .map(|i| {
                let c = [
                    self.channels[0].data()[i],
                    self.channels[1].data()[i],
                    self.channels[2].data()[i],
                ];
                let s = |e: usize| sum_s[e].data()[i];
                let quadratic = s(0) * c[0] * c[0]
                    + s(3) * c[1] * c[1]
                    + s(5) * c[2] * c[2]
                    + 2.0 * (s(1) * c[0] * c[1] + s(2) * c[0] * c[2] + s(4) * c[1] * c[2]);
                let linear = c[0] * sum_s_mu[0].data()[i]
                    + c[1] * sum_s_mu[1].data()[i]
                    + c[2] * sum_s_mu[2].data()[i];
                self.window_sizes.data()[i]
                    - sum_inv_size.data()[i]
                    - (quadratic - 2.0 * linear + sum_mu_s_mu.data()[i])
            })
            .collect()
    }
}

/// `L + lambda * D`
struct ConstrainedSystem<'a> {
    laplacian: &'a MattingLaplacian,
    known: &'a [bool],
    lambda: f64,
}

impl ConstrainedSystem<'_> {
    fn apply(&self, p: &[f64]) -> Vec<f64> {
        let mut out = self.laplacian.apply(p);
        for ((o, &k), &v) in out.iter_mut().zip(self.known).zip(p) {
            if k {
                *o = self.lambda.mul_add(v, *o);
            }
        }
        out
    }

    fn diagonal(&self) -> Vec<f64> {
        self.laplacian
            .diagonal()
            .into_iter()
            .zip(self.known)
            .map(|(d, &k)| if k { d + self.lambda } else { d })
            .collect()
    }
}

#[cfg(not(feature = "rayon"))]
fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[cfg(feature = "rayon")]
fn dot(a: &[f64], b: &[f64]) -> f64 {
    use rayon::prelude::*;
    a.par_iter().zip(b.par_iter()).map(|(x, y)| x * y).sum()
}

#[cfg(not(feature = "rayon"))]
fn axpy(scale: f64, x: &[f64], y: &mut [f64]) {
    for (y, x) in y.iter_mut().zip(x) {
        *y = scale.mul_add(*x, *y);
    }
}

#[cfg(feature = "rayon")]
fn axpy(scale: f64, x: &[f64], y: &mut [f64]) {
    use rayon::prelude::*;
    y.par_iter_mut()
        .zip(x.par_iter())
        .for_each(|(y, x)| *y = scale.mul_add(*x, *y));
}

/// Matting stage with an optional solver
///
/// A refiner without a solver behaves as if matting were not installed: it
/// always reports a degradation and hands back the pre-matting alpha.
#[derive(Clone)]
pub struct MatteRefiner {
    solver: Option<Arc<dyn AlphaMatting>>,
}

impl std::fmt::Debug for MatteRefiner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatteRefiner")
            .field("solver_installed", &self.is_available())
            .finish()
    }
}

impl MatteRefiner {
    #[must_use]
    pub fn new(solver: Arc<dyn AlphaMatting>) -> Self {
        Self {
            solver: Some(solver),
        }
    }

    /// Refiner backed by [`ClosedFormMatting`]
    #[must_use]
    pub fn closed_form(config: &MattingConfig) -> Self {
        Self::new(Arc::new(ClosedFormMatting::new(config)))
    }

    /// Refiner with no solver installed
    #[must_use]
    pub const fn unavailable() -> Self {
        Self { solver: None }
    }

    #[must_use]
    pub const fn is_available(&self) -> bool {
        self.solver.is_some()
    }

    /// Recovers soft edges inside the unknown band of `trimap`
    ///
    /// On any solver failure the returned outcome is degraded and carries an
    /// exact copy of `fallback`.
    pub fn refine(
        &self,
        image: &Image<Rgb<u8>>,
        trimap: &Trimap,
        fallback: &Image<Luma<u8>>,
    ) -> StageOutcome<Image<Luma<u8>>> {
        let result = self
            .solver
            .as_ref()
            .ok_or_else(|| MattingError::Unavailable("no matting solver installed".to_owned()))
            .and_then(|solver| solver.estimate_alpha(&to_unit_rgb(image), &trimap.to_unit()))
            .and_then(|alpha| {
                if alpha.dimensions() == image.dimensions() {
                    Ok(quantize_unit(&alpha))
                } else {
                    Err(MattingError::DimensionMismatch {
                        image: image.dimensions(),
                        trimap: alpha.dimensions(),
                    })
                }
            });

        StageOutcome::from_result(result, Stage::Matting, || fallback.clone())
    }
}
