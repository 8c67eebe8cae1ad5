use std::mem;
use crate::sat::{SolveRes, Solver, Stats};
use crate::sat::cdcl::{SimpSettings, SimpSolver};
use crate::sat::cdcl::budget::Budget;
use crate::sat::formula::{LBool, Lit, LitMap, Var, VarMap};
use crate::sat::proof::Proof;


#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum SolveStatus {
    Sat,
    Unsat,
    Unknown,
}


/// Stateful solving session: clauses accumulate across queries, each
/// query may carry assumption literals, and the model or the
/// failed-assumption core stays readable until the next mutation.
/// Simplification runs on the first query only, so later clause
/// additions never race against variable elimination.
pub struct IncrementalSolver {
    solver: SimpSolver,
    budget: Budget,
    assumptions: Vec<Lit>,
    model: Option<VarMap<bool>>,
    conflict: Option<LitMap<()>>,
    queries: u64,
    finalized: bool,
}

impl IncrementalSolver {
    pub fn new(settings: SimpSettings) -> Self {
        let mut budget = Budget::new();
        budget.off();
        IncrementalSolver {
            solver: SimpSolver::new(settings),
            budget,
            assumptions: Vec::new(),
            model: None,
            conflict: None,
            queries: 0,
            finalized: false,
        }
    }

    pub fn n_vars(&self) -> usize {
        self.solver.n_vars()
    }

    pub fn n_clauses(&self) -> usize {
        self.solver.n_clauses()
    }

    pub fn new_var(&mut self) -> Var {
        debug_assert!(!self.finalized);
        self.invalidate();
        self.solver.new_var(None, true)
    }

    fn ensure_var(&mut self, v: Var) {
        use crate::sat::formula::Idx;
        while self.solver.n_vars() <= v.idx() {
            self.solver.new_var(None, true);
        }
    }

    /// Appends a permanent clause. Returns false once the formula is
    /// known unsatisfiable regardless of assumptions.
    pub fn add_clause(&mut self, clause: &[Lit]) -> bool {
        debug_assert!(!self.finalized);
        self.invalidate();
        for &lit in clause {
            self.ensure_var(lit.var());
        }
        self.solver.add_clause(clause)
    }

    /// Queues an assumption literal for the next `solve` call.
    pub fn assume(&mut self, lit: Lit) {
        debug_assert!(!self.finalized);
        self.invalidate();
        self.ensure_var(lit.var());
        self.assumptions.push(lit);
    }

    pub fn solve(&mut self) -> SolveStatus {
        debug_assert!(!self.finalized);
        self.run(false)
    }

    /// As `solve`, but the session is over afterwards; the first and
    /// only query of a session is allowed to simplify the formula.
    pub fn solve_final(&mut self) -> SolveStatus {
        let do_simp = self.queries == 0;
        let status = self.run(do_simp);
        self.finalized = true;
        status
    }

    fn run(&mut self, do_simp: bool) -> SolveStatus {
        self.queries += 1;
        let assumptions = mem::replace(&mut self.assumptions, Vec::new());

        match self
            .solver
            .solve_limited_with(&self.budget, &assumptions, do_simp)
        {
            SolveRes::SAT(model, _) => {
                self.model = Some(model);
                self.conflict = None;
                SolveStatus::Sat
            }

            SolveRes::UnSAT(conflict, _) => {
                self.model = None;
                self.conflict = Some(conflict);
                SolveStatus::Unsat
            }

            SolveRes::Unknown(_, _) => {
                self.model = None;
                self.conflict = None;
                SolveStatus::Unknown
            }
        }
    }

    /// Model polarity of `lit` after a satisfiable query.
    pub fn value(&self, lit: Lit) -> LBool {
        match self.model {
            Some(ref model) => match model.get(&lit.var()) {
                Some(&value) => LBool::from_bool(value != lit.sign()),
                None => LBool::Undef,
            },
            None => {
                debug_assert!(false, "value() queried without a model");
                LBool::Undef
            }
        }
    }

    /// After an unsatisfiable query: did `lit` take part in the failed
    /// assumption set?
    pub fn failed(&self, lit: Lit) -> bool {
        match self.conflict {
            Some(ref conflict) => {
                conflict.contains_key(&lit) || conflict.contains_key(&!lit)
            }
            None => {
                debug_assert!(false, "failed() queried without a conflict");
                false
            }
        }
    }

    /// Excludes a variable from elimination for the whole session.
    pub fn freeze(&mut self, v: Var) {
        self.ensure_var(v);
        self.solver.set_frozen(v, true);
    }

    pub fn set_proof(&mut self, proof: Proof) {
        self.solver.set_proof(proof);
    }

    /// Cooperative cancellation hook, polled at conflicts and restarts.
    /// A true return unwinds the running query to `Unknown`.
    pub fn set_terminate<F: FnMut() -> bool + 'static>(&mut self, cb: F) {
        self.solver.set_terminate_callback(Some(Box::new(cb)));
    }

    pub fn clear_terminate(&mut self) {
        self.solver.set_terminate_callback(None);
    }

    /// Export hook for learnt clauses of at most `max_len` literals.
    pub fn set_learn<F: FnMut(&[Lit]) + 'static>(&mut self, cb: F, max_len: usize) {
        self.solver.set_learn_callback(Some((Box::new(cb), max_len)));
    }

    pub fn clear_learn(&mut self) {
        self.solver.set_learn_callback(None);
    }

    pub fn stats(&self) -> Stats {
        self.solver.stats()
    }

    fn invalidate(&mut self) {
        self.model = None;
        self.conflict = None;
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::sat::formula::Idx;

    fn lit(i: i32) -> Lit {
        let v: Var = Idx::unidx((i.abs() - 1) as usize);
        v.lit(i < 0)
    }

    #[test]
    fn test_incremental_session() {
        let mut solver = IncrementalSolver::new(Default::default());

        // (x1 ∨ x2), assume ¬x1
        assert!(solver.add_clause(&[lit(1), lit(2)]));
        solver.assume(lit(-1));
        assert_eq!(solver.solve(), SolveStatus::Sat);
        assert_eq!(solver.value(lit(2)), LBool::True);
        assert_eq!(solver.value(lit(1)), LBool::False);

        // add (¬x2), assume ¬x1 again: now contradictory
        assert!(solver.add_clause(&[lit(-2)]));
        solver.assume(lit(-1));
        assert_eq!(solver.solve(), SolveStatus::Unsat);
        assert!(solver.failed(lit(-1)));

        // without the assumption x1 = true works
        assert_eq!(solver.solve(), SolveStatus::Sat);
        assert_eq!(solver.value(lit(1)), LBool::True);
    }

    #[test]
    fn test_unconditional_unsat_sticks() {
        let mut solver = IncrementalSolver::new(Default::default());
        assert!(solver.add_clause(&[lit(1)]));
        let still_ok = solver.add_clause(&[lit(-1)]);
        assert!(!still_ok);
        assert_eq!(solver.solve(), SolveStatus::Unsat);
        assert!(!solver.failed(lit(1)));
        assert_eq!(solver.solve_final(), SolveStatus::Unsat);
    }

    #[test]
    fn test_termination_callback() {
        let mut solver = IncrementalSolver::new(Default::default());
        // a small hard instance: 3 pigeons, 2 holes
        let mut php = Vec::new();
        for p in 0..3i32 {
            php.push(vec![lit(2 * p + 1), lit(2 * p + 2)]);
        }
        for h in 1..=2i32 {
            for p in 0..3i32 {
                for q in (p + 1)..3i32 {
                    php.push(vec![lit(-(2 * p + h)), lit(-(2 * q + h))]);
                }
            }
        }
        for clause in php.iter() {
            solver.add_clause(clause);
        }

        solver.set_terminate(|| true);
        assert_eq!(solver.solve(), SolveStatus::Unknown);

        solver.clear_terminate();
        assert_eq!(solver.solve(), SolveStatus::Unsat);
    }
}
