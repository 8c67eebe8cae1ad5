use crate::sat::formula::{Lit, LitMap, Var, VarMap};
use crate::sat::cdcl::budget::Budget;

pub mod cdcl;
pub mod dimacs;
pub mod formula;
pub mod incremental;
pub mod proof;


#[derive(Default, Debug, Clone)]
pub struct Stats {
    pub solves: u64,
    pub restarts: u64,
    pub blocked_restarts: u64,
    pub decisions: u64,
    pub rnd_decisions: u64,
    pub conflicts: u64,
    pub propagations: u64,
    pub inspections: u64,
    pub reduces: u64,
    pub chrono_backtracks: u64,
    pub sls_runs: u64,
    pub replayed_assigns: u64,
    pub tot_literals: u64,
    pub del_literals: u64,
}


pub enum SolveRes {
    /// Unsatisfiable. With assumptions, the map holds the clause of
    /// negated failed assumptions; without, it is empty and the result
    /// is final.
    UnSAT(LitMap<()>, Stats),
    SAT(VarMap<bool>, Stats),
    /// Cancelled cooperatively; the payload is a progress estimate.
    Unknown(f64, Stats),
}


pub trait Solver {
    fn n_vars(&self) -> usize;
    fn n_clauses(&self) -> usize;
    fn new_var(&mut self, upol: Option<bool>, dvar: bool) -> Var;
    fn add_clause(&mut self, clause: &[Lit]) -> bool;
    fn preprocess(&mut self, budget: &Budget) -> bool;
    fn solve_limited(&mut self, budget: &Budget, assumptions: &[Lit]) -> SolveRes;
    fn stats(&self) -> Stats;
}
