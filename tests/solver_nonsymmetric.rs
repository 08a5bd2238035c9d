//! BiCGSTAB and restarted GMRES on seeded nonsymmetric systems.

mod common;

use common::{max_diff, nonsymmetric, spd, true_residual};
use faer::Mat;
use krylov_replay::{
    BiCgStabSolver, GmresSolver, LinearSolver, PcSide, Preconditioner, SolverOptions, Status,
    bicgstab, gmres, preconditioner,
};

type Solve = fn(
    &Mat<f64>,
    &[f64],
    &mut [f64],
    Option<&dyn Preconditioner<f64>>,
    &SolverOptions<f64>,
) -> Result<krylov_replay::ConvergenceResult<f64>, krylov_replay::KError>;

const METHODS: [(&str, Solve); 2] = [("bicgstab", bicgstab), ("gmres", gmres)];

#[test]
fn both_methods_converge_on_both_sides_f64() {
    let sys = nonsymmetric::<f64>(32, 11);
    let m = preconditioner(&sys.a, "diag").unwrap();
    for (name, solve) in METHODS {
        for side in [PcSide::Left, PcSide::Right] {
            for pc in [None, Some(&*m)] {
                let mut x = vec![0.0; 32];
                let opts = SolverOptions::new().tol(1e-10).maxiter(500).side(side);
                let stats = solve(&sys.a, &sys.b, &mut x, pc, &opts).unwrap();
                let label = format!("{name} {side:?} pc={}", pc.is_some());
                assert!(stats.converged, "{label}: {stats:?}");
                assert!(
                    true_residual(&sys.a, &x, &sys.b) <= 2.0 * stats.tolerance,
                    "{label}"
                );
                assert!(max_diff(&x, &sys.x_true) < 1e-8, "{label}");
            }
        }
    }
}

#[test]
fn both_methods_converge_f32() {
    let sys = nonsymmetric::<f32>(24, 12);
    let m = preconditioner(&sys.a, "diag").unwrap();
    for side in [PcSide::Left, PcSide::Right] {
        let opts = SolverOptions::new().tol(1e-5).maxiter(300).side(side);

        let mut x = vec![0.0f32; 24];
        let stats = bicgstab(&sys.a, &sys.b, &mut x, Some(&*m), &opts).unwrap();
        assert!(stats.converged, "bicgstab {side:?}: {stats:?}");
        assert!(true_residual(&sys.a, &x, &sys.b) <= 32.0 * stats.tolerance);

        let mut x = vec![0.0f32; 24];
        let stats = gmres(&sys.a, &sys.b, &mut x, Some(&*m), &opts).unwrap();
        assert!(stats.converged, "gmres {side:?}: {stats:?}");
        assert!(true_residual(&sys.a, &x, &sys.b) <= 32.0 * stats.tolerance);
    }
}

#[test]
fn gmres_with_short_restart() {
    let sys = spd::<f64>(32, 13);
    let mut x = vec![0.0; 32];
    let opts = SolverOptions::new().tol(1e-10).maxiter(1000).restart(4);
    let stats = gmres(&sys.a, &sys.b, &mut x, None, &opts).unwrap();
    assert!(stats.converged, "{stats:?}");
    assert!(stats.iterations > 4, "a 32x32 system needs more than one cycle of 4");
    assert!(true_residual(&sys.a, &x, &sys.b) <= 2.0 * stats.tolerance);
}

#[test]
fn gmres_budget_counts_inner_steps() {
    let sys = nonsymmetric::<f64>(32, 14);
    let mut x = vec![0.0; 32];
    let mut solver = GmresSolver::new(31, 1e-14, 5);
    let stats = solver.solve(&sys.a, None, &sys.b, &mut x).unwrap();
    assert_eq!(stats.iterations, 5);
    assert_eq!(stats.status, Status::MAXITER);
    assert!(true_residual(&sys.a, &x, &sys.b) < true_residual(&sys.a, &vec![0.0; 32], &sys.b));
}

#[test]
fn restart_larger_than_system_is_clamped() {
    let sys = nonsymmetric::<f64>(6, 15);
    let mut x = vec![0.0; 6];
    let opts = SolverOptions::new().tol(1e-10).restart(100).maxiter(60);
    let stats = gmres(&sys.a, &sys.b, &mut x, None, &opts).unwrap();
    assert!(stats.converged, "{stats:?}");
    assert!(stats.iterations <= 12);
}

#[test]
fn bicgstab_breakdown_is_a_result_not_an_error() {
    // rotation by 90°: A r₀ is orthogonal to the shadow residual r₀
    let a = Mat::from_fn(2, 2, |i, j| [[0.0, 1.0], [-1.0, 0.0]][i][j]);
    let b = vec![1.0, 0.0];
    for side in [PcSide::Left, PcSide::Right] {
        let mut x = vec![0.0; 2];
        let mut solver = BiCgStabSolver::new(1e-10, 50).with_preconditioning(side);
        let stats = solver.solve(&a, None, &b, &mut x).unwrap();
        assert!(stats.breakdown, "{side:?}");
        assert!(!stats.converged);
        assert!(stats.iterations < 50);
    }
}

#[test]
fn nan_operator_is_divergence() {
    let sys = nonsymmetric::<f64>(6, 16);
    let mut a = sys.a.clone();
    a[(2, 2)] = f64::NAN;
    for (name, solve) in METHODS {
        let mut x = vec![0.5; 6];
        let stats = solve(&a, &sys.b, &mut x, None, &SolverOptions::new()).unwrap();
        assert!(!stats.converged, "{name}");
        assert!(stats.status.contains(Status::DIVERGED), "{name}: {stats:?}");
    }
}
