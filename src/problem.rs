use crate::I;
use crate::constraint::Constraint;
use crate::function::Cost;

/// A constrained minimization problem: a scalar cost together with an
/// ordered list of constraint blocks.
///
/// The problem is borrowed read-only for the duration of a solve and must
/// outlive the solver using it.
pub struct Problem {
    cost: Box<dyn Cost>,
    constraints: Vec<Constraint>,
}

impl Problem {
    pub fn new(cost: Box<dyn Cost>, constraints: Vec<Constraint>) -> Self {
        Self { cost, constraints }
    }

    /// An unconstrained problem.
    pub fn unconstrained(cost: Box<dyn Cost>) -> Self {
        Self::new(cost, Vec::new())
    }

    /// Appends a constraint block to the problem.
    pub fn add_constraint(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    pub fn cost(&self) -> &dyn Cost {
        self.cost.as_ref()
    }

    /// Number of constraint blocks.
    pub fn num_constraints(&self) -> I {
        self.constraints.len()
    }

    pub fn constraint(&self, i: I) -> &Constraint {
        &self.constraints[i]
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Dimension of the `i`-th constraint block.
    pub fn constraint_dim(&self, i: I) -> I {
        self.constraints[i].nr()
    }

    /// Sum of all constraint block dimensions.
    pub fn total_constraint_dim(&self) -> I {
        self.constraints.iter().map(|c| c.nr()).sum()
    }
}
