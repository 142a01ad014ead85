use faer::Col;

use crate::E;
use crate::pdal::results::Results;
use crate::pdal::workspace::Workspace;

/// Hook invoked once per inner iteration with read access to the solver
/// scratch state and the current results.
pub trait Callback {
    /// Called at the end of each inner iteration.
    fn call(&mut self, workspace: &Workspace, results: &Results);
}

/// A callback that does nothing. Use when no per-iteration output is
/// needed.
#[derive(Default)]
pub struct NoOpCallback {}

impl Callback for NoOpCallback {
    fn call(&mut self, _workspace: &Workspace, _results: &Results) {
        // Do nothing
    }
}

/// Prints objective value and infeasibility measures to stdout each
/// iteration.
#[derive(Default)]
pub struct IterationPrinter {}

impl Callback for IterationPrinter {
    fn call(&mut self, workspace: &Workspace, results: &Results) {
        let txt = format!(
            "| {:4}: | {:<12.4e} | {:<8.2e} | {:<8.2e} |",
            results.num_iters, results.value, workspace.prim_infeas, workspace.dual_infeas,
        );
        println!("{}", txt);
    }
}

/// Append-only record of the solver trajectory.
#[derive(Default)]
pub struct HistoryStorage {
    pub xs: Vec<Col<E>>,
    pub lams: Vec<Vec<Col<E>>>,
    pub values: Vec<E>,
    pub prim_infeas: Vec<E>,
    pub dual_infeas: Vec<E>,
}

/// Stores the history of the solver's variables, one entry per inner
/// iteration.
#[derive(Default)]
pub struct HistoryCallback {
    pub storage: HistoryStorage,
}

impl HistoryCallback {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Callback for HistoryCallback {
    fn call(&mut self, workspace: &Workspace, results: &Results) {
        self.storage.xs.push(results.x_opt.clone());
        self.storage.lams.push(results.lams_opt.clone());
        self.storage.values.push(results.value);
        self.storage.prim_infeas.push(workspace.prim_infeas);
        self.storage.dual_infeas.push(workspace.dual_infeas);
    }
}
