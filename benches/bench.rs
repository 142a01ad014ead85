use faer::{Col, Mat};

use almanac::callback::NoOpCallback;
use almanac::constraint::Constraint;
use almanac::function_ops::{LinearFunction, QuadraticDistanceCost};
use almanac::manifold::VectorSpace;
use almanac::pdal::results::Results;
use almanac::pdal::workspace::Workspace;
use almanac::pdal::{PdalSolver, SolverOptions};
use almanac::problem::Problem;
use almanac::{ConvergedFlag, E};

fn main() {
    divan::main();
}

fn equality_qp(n: usize) -> Problem {
    let mut problem =
        Problem::unconstrained(Box::new(QuadraticDistanceCost::new(Col::zeros(n))));
    let a = Mat::from_fn(1, n, |_, j| 1.0 + 0.1 * j as E);
    let b = Col::from_fn(1, |_| -1.0);
    problem.add_constraint(Constraint::equality(Box::new(LinearFunction::new(a, b))));
    problem
}

#[divan::bench(args = [2, 8, 32])]
fn solve_equality_qp(n: usize) -> ConvergedFlag {
    let manifold = VectorSpace::new(n);
    let problem = equality_qp(n);
    let mut workspace = Workspace::new(n, n, &problem);
    let mut results = Results::new(n, &problem);
    let mut solver = PdalSolver::new(&manifold, &problem, SolverOptions::default());
    let mut callback = NoOpCallback::default();

    solver
        .solve(
            &mut workspace,
            &mut results,
            Col::<E>::zeros(n).as_ref(),
            None,
            &mut callback,
        )
        .unwrap()
}
