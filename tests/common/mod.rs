//! Seeded test systems shared by the integration tests.
#![allow(dead_code)]

use faer::Mat;
use krylov_replay::{MatVec, Scalar};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub fn cast<T: Scalar>(v: f64) -> T {
    T::from_f64(v).unwrap()
}

/// `C = R + 3√n I` with `R` uniform in [-1, 1]; singular values of `C` stay within a factor
/// of about 2.3 of each other, so `C Cᵀ` has condition number around 5.
fn well_conditioned_factor(n: usize, rng: &mut StdRng) -> Vec<f64> {
    let shift = 3.0 * (n as f64).sqrt();
    let mut c = vec![0.0; n * n];
    for i in 0..n {
        for j in 0..n {
            c[i * n + j] = rng.gen_range(-1.0..1.0) + if i == j { shift } else { 0.0 };
        }
    }
    c
}

fn gram(c: &[f64], n: usize) -> Vec<f64> {
    let mut a = vec![0.0; n * n];
    for i in 0..n {
        for j in 0..n {
            a[i * n + j] = (0..n).map(|k| c[i * n + k] * c[j * n + k]).sum();
        }
    }
    a
}

/// A linear system with known solution: `(A, x_true, b = A x_true)`.
pub struct System<T> {
    pub a: Mat<T>,
    pub x_true: Vec<T>,
    pub b: Vec<T>,
}

fn finish<T: Scalar>(a: &[f64], n: usize, rng: &mut StdRng) -> System<T> {
    let a = Mat::from_fn(n, n, |i, j| cast::<T>(a[i * n + j]));
    let x_true: Vec<T> = (0..n).map(|_| cast(rng.gen_range(-1.0..1.0))).collect();
    let mut b = vec![T::zero(); n];
    a.matvec(&x_true, &mut b);
    System { a, x_true, b }
}

/// SPD `A = C Cᵀ`.
pub fn spd<T: Scalar>(n: usize, seed: u64) -> System<T> {
    let mut rng = StdRng::seed_from_u64(seed);
    let c = well_conditioned_factor(n, &mut rng);
    let a = gram(&c, n);
    finish(&a, n, &mut rng)
}

/// Nonsymmetric `A = C Cᵀ diag(s)` with `s` uniform in [0.5, 2].
pub fn nonsymmetric<T: Scalar>(n: usize, seed: u64) -> System<T> {
    let mut rng = StdRng::seed_from_u64(seed);
    let c = well_conditioned_factor(n, &mut rng);
    let mut a = gram(&c, n);
    let s: Vec<f64> = (0..n).map(|_| rng.gen_range(0.5..2.0)).collect();
    for i in 0..n {
        for j in 0..n {
            a[i * n + j] *= s[j];
        }
    }
    finish(&a, n, &mut rng)
}

/// SPD `D C Cᵀ D` with `D` spanning two orders of magnitude: hard without diagonal scaling.
pub fn badly_scaled_spd(n: usize, seed: u64) -> System<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let c = well_conditioned_factor(n, &mut rng);
    let mut a = gram(&c, n);
    let d: Vec<f64> = (0..n).map(|i| 10f64.powf(2.0 * i as f64 / (n - 1) as f64)).collect();
    for i in 0..n {
        for j in 0..n {
            a[i * n + j] *= d[i] * d[j];
        }
    }
    finish(&a, n, &mut rng)
}

/// `A = C Cᵀ`, `b = C f` with `C` and `f` uniform in [-100, 100]: the normal equations of a
/// random least-squares problem. Condition numbers run to 1e5 and beyond at n = 64.
pub struct LeastSquares<T> {
    pub a: Mat<T>,
    pub b: Vec<T>,
}

fn least_squares_parts(n: usize, rng: &mut StdRng) -> (Vec<f64>, Vec<f64>) {
    let c: Vec<f64> = (0..n * n).map(|_| rng.gen_range(-100.0..100.0)).collect();
    let f: Vec<f64> = (0..n).map(|_| rng.gen_range(-100.0..100.0)).collect();
    let b = (0..n).map(|i| (0..n).map(|k| c[i * n + k] * f[k]).sum()).collect();
    (gram(&c, n), b)
}

fn least_squares_finish<T: Scalar>(a: &[f64], b: &[f64], n: usize) -> LeastSquares<T> {
    LeastSquares {
        a: Mat::from_fn(n, n, |i, j| cast::<T>(a[i * n + j])),
        b: b.iter().map(|&v| cast(v)).collect(),
    }
}

/// SPD least-squares system.
pub fn least_squares_spd<T: Scalar>(n: usize, seed: u64) -> LeastSquares<T> {
    let mut rng = StdRng::seed_from_u64(seed);
    let (a, b) = least_squares_parts(n, &mut rng);
    least_squares_finish(&a, &b, n)
}

/// Least-squares system with its columns rescaled by `s` uniform in [0.1, 10].
pub fn least_squares_nonsymmetric<T: Scalar>(n: usize, seed: u64) -> LeastSquares<T> {
    let mut rng = StdRng::seed_from_u64(seed);
    let s: Vec<f64> = (0..n).map(|_| rng.gen_range(0.1..10.0)).collect();
    let (mut a, b) = least_squares_parts(n, &mut rng);
    for i in 0..n {
        for j in 0..n {
            a[i * n + j] *= s[j];
        }
    }
    least_squares_finish(&a, &b, n)
}

/// ‖b − A x‖
pub fn true_residual<T: Scalar>(a: &Mat<T>, x: &[T], b: &[T]) -> T {
    let mut ax = vec![T::zero(); b.len()];
    a.matvec(x, &mut ax);
    ax.iter()
        .zip(b)
        .map(|(&p, &q)| (q - p) * (q - p))
        .fold(T::zero(), |acc, v| acc + v)
        .sqrt()
}

/// max_i |x_i − y_i|
pub fn max_diff<T: Scalar>(x: &[T], y: &[T]) -> T {
    x.iter().zip(y).fold(T::zero(), |m, (&p, &q)| m.max((p - q).abs()))
}
