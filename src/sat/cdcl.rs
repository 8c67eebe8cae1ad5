use crate::sat::{SolveRes, Solver, Stats};
use crate::sat::formula::{Lit, LitMap, Var};
use crate::sat::proof::Proof;
use self::budget::Budget;
use self::search::{AddClauseRes, SearchRes, SearchSettings, Searcher, SearcherSettings};
use self::search::clause_db::ClauseDBSettings;
pub use self::search::conflict::CCMinMode;
use self::search::decision_heuristic::DecisionHeuristicSettings;
pub use self::search::decision_heuristic::PhaseSaving;
use self::search::simplify::elim_clauses::ElimClauses;
use self::search::simplify::{Simplificator, SimplificatorSettings};
use self::search::{LearnCallback, TerminateCallback};

pub mod budget;
pub mod search;


#[derive(Default)]
pub struct CoreSettings {
    pub heur: DecisionHeuristicSettings,
    pub db: ClauseDBSettings,
    pub ccmin_mode: CCMinMode,
    pub search: SearchSettings,
    pub core: SearcherSettings,
}


/// Plain CDCL solver without the inprocessing layer.
pub struct CoreSolver {
    ok: bool, // If false, the constraints are already unsatisfiable. No part of the solver state may be used!
    ss: SearchSettings,
    pub(crate) search: Searcher,
}

impl Solver for CoreSolver {
    fn n_vars(&self) -> usize {
        self.search.number_of_vars()
    }

    fn n_clauses(&self) -> usize {
        self.search.number_of_clauses()
    }

    fn new_var(&mut self, upol: Option<bool>, dvar: bool) -> Var {
        self.search.new_var(upol, dvar)
    }

    fn add_clause(&mut self, clause: &[Lit]) -> bool {
        if self.ok {
            if let AddClauseRes::UnSAT = self.search.add_clause(clause) {
                self.ok = false;
            }
        }
        self.ok
    }

    fn preprocess(&mut self, _: &Budget) -> bool {
        if self.ok {
            self.ok = self.search.preprocess();
        }
        self.ok
    }

    fn solve_limited(&mut self, budget: &Budget, assumptions: &[Lit]) -> SolveRes {
        if !self.ok {
            return SolveRes::UnSAT(LitMap::new(), self.search.stats());
        }

        match self.search.search(&self.ss, budget, assumptions) {
            SearchRes::UnSAT(stats) => {
                self.ok = false;
                SolveRes::UnSAT(LitMap::new(), stats)
            }

            SearchRes::AssumpsConfl(conflict, stats) => SolveRes::UnSAT(conflict, stats),

            SearchRes::SAT(model, stats) => SolveRes::SAT(model, stats),

            SearchRes::Interrupted(progress, stats) => SolveRes::Unknown(progress, stats),
        }
    }

    fn stats(&self) -> Stats {
        self.search.stats()
    }
}

impl CoreSolver {
    pub fn new(settings: CoreSettings) -> Self {
        CoreSolver {
            ok: true,
            ss: settings.search,
            search: Searcher::new(
                settings.core,
                settings.db,
                settings.heur,
                settings.ccmin_mode,
            ),
        }
    }

    pub fn set_proof(&mut self, proof: Proof) {
        self.search.set_proof(proof);
    }

    pub fn set_terminate_callback(&mut self, cb: Option<TerminateCallback>) {
        self.search.set_terminate_callback(cb);
    }

    pub fn set_learn_callback(&mut self, cb: Option<(LearnCallback, usize)>) {
        self.search.set_learn_callback(cb);
    }
}


pub struct SimpSettings {
    pub core: CoreSettings,
    pub simp: SimplificatorSettings,
    pub extend_model: bool, // Flag to indicate whether the user needs to look at the full model.
}

impl Default for SimpSettings {
    fn default() -> Self {
        SimpSettings {
            core: Default::default(),
            simp: Default::default(),
            extend_model: true,
        }
    }
}


/// CDCL solver with preprocessing: bounded variable elimination and
/// backward subsumption run against the clause set before the search,
/// and the reported model is extended back over eliminated variables.
pub struct SimpSolver {
    core: CoreSolver,
    elimclauses: ElimClauses,
    simp: Option<Simplificator>,
}

impl Solver for SimpSolver {
    fn n_vars(&self) -> usize {
        self.core.n_vars()
    }

    fn n_clauses(&self) -> usize {
        self.core.n_clauses()
    }

    fn new_var(&mut self, upol: Option<bool>, dvar: bool) -> Var {
        let v = self.core.new_var(upol, dvar);
        if let Some(ref mut simp) = self.simp {
            simp.init_var(v);
        }
        v
    }

    fn add_clause(&mut self, ps: &[Lit]) -> bool {
        if let Some(ref simp) = self.simp {
            debug_assert!(
                ps.iter().all(|l| !simp.is_eliminated(l.var())),
                "clause over an eliminated variable"
            );
        }
        self.core.add_clause(ps)
    }

    fn preprocess(&mut self, budget: &Budget) -> bool {
        if !self.core.preprocess(budget) {
            return false;
        }

        let result = if let Some(ref mut simp) = self.simp {
            if simp.eliminate(&mut self.core.search, budget, &mut self.elimclauses) {
                true
            } else {
                self.core.ok = false;
                false
            }
        } else {
            return true;
        };

        self.elimclauses.log_size();
        result
    }

    fn solve_limited(&mut self, budget: &Budget, assumptions: &[Lit]) -> SolveRes {
        self.solve_limited_with(budget, assumptions, true)
    }

    fn stats(&self) -> Stats {
        self.core.stats()
    }
}

impl SimpSolver {
    pub fn new(settings: SimpSettings) -> Self {
        let mut core = CoreSolver::new(settings.core);
        Simplificator::on(&mut core.search);
        SimpSolver {
            core,
            elimclauses: ElimClauses::new(settings.extend_model),
            simp: Some(Simplificator::new(settings.simp)),
        }
    }

    pub fn set_proof(&mut self, proof: Proof) {
        self.core.set_proof(proof);
    }

    pub fn set_terminate_callback(&mut self, cb: Option<TerminateCallback>) {
        self.core.set_terminate_callback(cb);
    }

    pub fn set_learn_callback(&mut self, cb: Option<(LearnCallback, usize)>) {
        self.core.set_learn_callback(cb);
    }

    pub fn set_frozen(&mut self, v: Var, frozen: bool) {
        if let Some(ref mut simp) = self.simp {
            simp.set_frozen(v, frozen);
        }
    }

    pub fn is_eliminated(&self, v: Var) -> bool {
        match self.simp {
            Some(ref simp) => simp.is_eliminated(v),
            None => false,
        }
    }

    /// Like `solve_limited`, but inprocessing can be switched off for
    /// the call; incremental use keeps it off after the first solve.
    pub fn solve_limited_with(
        &mut self,
        budget: &Budget,
        assumptions: &[Lit],
        do_simp: bool,
    ) -> SolveRes {
        if !self.core.ok {
            return SolveRes::UnSAT(LitMap::new(), self.core.search.stats());
        }

        let res = match self.simp {
            Some(ref mut simp) if do_simp => simp.solve_limited(
                &mut self.core.search,
                &self.core.ss,
                budget,
                &mut self.elimclauses,
                assumptions,
            ),

            _ => {
                if !self.core.search.preprocess() {
                    SearchRes::UnSAT(self.core.search.stats())
                } else {
                    self.core.search.search(&self.core.ss, budget, assumptions)
                }
            }
        };

        match res {
            SearchRes::UnSAT(stats) => {
                self.core.ok = false;
                SolveRes::UnSAT(LitMap::new(), stats)
            }

            SearchRes::AssumpsConfl(conflict, stats) => SolveRes::UnSAT(conflict, stats),

            SearchRes::SAT(mut model, stats) => {
                self.elimclauses.extend(&mut model);
                SolveRes::SAT(model, stats)
            }

            SearchRes::Interrupted(progress, stats) => SolveRes::Unknown(progress, stats),
        }
    }

    pub fn simp_off(&mut self) {
        if self.simp.take().is_some() {
            Simplificator::off(&mut self.core.search);
        }
    }
}
