use crate::sat;
use crate::sat::formula::{assignment::*, clause::*, Idx, LBool, Lit, LitMap, Var, VarMap};
use crate::sat::proof::Proof;
use self::backtrack::TrailSaver;
use self::clause_db::DbEvent;
use self::conflict::{AnalyzeContext, AnalyzeRes, CCMinMode, Conflict};
use self::decision_heuristic::{DecisionHeuristic, DecisionHeuristicSettings};
use self::restart::{RestartControl, RestartSettings};
use self::sls::{LocalSearch, SlsSettings};
use self::watches::Watches;
use super::budget::Budget;

pub mod backtrack;
pub mod clause_db;
pub mod conflict;
pub mod decision_heuristic;
mod luby;
mod random;
pub mod restart;
pub mod simplify;
pub mod sls;
mod watches;


/// Per-solve knobs of the search loop itself; the clause database and
/// heuristic carry their own settings.
#[derive(Clone, Copy, Debug)]
pub struct SearchSettings {
    pub restart: RestartSettings,
    pub chrono_threshold: Option<usize>, // Backtrack one level instead of jumping when the jump is at least this deep.
    pub sls: SlsSettings,
}

impl Default for SearchSettings {
    fn default() -> Self {
        SearchSettings {
            restart: RestartSettings::default(),
            chrono_threshold: Some(100),
            sls: SlsSettings::default(),
        }
    }
}


struct SimplifyGuard {
    simp_db_assigns: Option<usize>, // Number of top-level assignments since last execution of 'simplify()'.
    simp_db_props: u64,
}

impl SimplifyGuard {
    pub fn new() -> Self {
        SimplifyGuard {
            simp_db_assigns: None,
            simp_db_props: 0,
        }
    }

    pub fn skip(&self, assigns: usize, propagations: u64) -> bool {
        Some(assigns) == self.simp_db_assigns || propagations < self.simp_db_props
    }

    pub fn set_next(&mut self, assigns: usize, propagations: u64, prop_limit: u64) {
        self.simp_db_assigns = Some(assigns);
        self.simp_db_props = propagations + prop_limit;
    }
}


#[derive(Default)]
struct Stats {
    solves: u64,
    starts: u64,
    decisions: u64,
    conflicts: u64,
    reduces: u64,
    chrono_backtracks: u64,
    sls_runs: u64,
}


pub struct SearcherSettings {
    pub garbage_frac: f64, // The fraction of wasted memory allowed before a garbage collection is triggered.
    pub use_rcheck: bool,  // Check if a clause is already implied. Pretty costly, and subsumes subsumptions :)
}

impl Default for SearcherSettings {
    fn default() -> Self {
        SearcherSettings {
            garbage_frac: 0.20,
            use_rcheck: false,
        }
    }
}


pub enum AddClauseRes {
    UnSAT,
    Consumed,
    Added(ClauseRef),
}


pub enum SearchRes {
    UnSAT(sat::Stats),
    SAT(VarMap<bool>, sat::Stats),
    AssumpsConfl(LitMap<()>, sat::Stats),
    Interrupted(f64, sat::Stats),
}


pub type TerminateCallback = Box<dyn FnMut() -> bool>;
pub type LearnCallback = Box<dyn FnMut(&[Lit])>;


/// The CDCL engine: propagate, analyze, learn, backtrack, restart,
/// reduce, hand polarities to the local-search helper, and log proof
/// records while doing so.
pub struct Searcher {
    pub settings: SearcherSettings,
    pub(crate) ca: ClauseAllocator,
    pub(crate) assigns: Assignment,
    pub(crate) watches: Watches,
    pub(crate) db: clause_db::ClauseDB,
    pub(crate) heur: DecisionHeuristic,
    pub(crate) proof: Option<Proof>,
    pub(crate) saver: TrailSaver,
    analyze: AnalyzeContext,
    restart: RestartControl,
    simp: SimplifyGuard,
    terminate_cb: Option<TerminateCallback>,
    learn_cb: Option<(LearnCallback, usize)>,
    next_reduce: u64,
    reduce_rounds: u64,
    last_core_conflict: u64,
    sls_ran_at: u64,
    stats: Stats,
}

impl Searcher {
    pub fn new(
        settings: SearcherSettings,
        db_set: clause_db::ClauseDBSettings,
        heur_set: DecisionHeuristicSettings,
        ccmin_mode: CCMinMode,
    ) -> Self {
        let next_reduce = db_set.reduce_first;
        Searcher {
            settings,
            ca: ClauseAllocator::new_empty(),
            assigns: Assignment::new(),
            watches: Watches::new(),
            db: clause_db::ClauseDB::new(db_set),
            heur: DecisionHeuristic::new(heur_set),
            proof: None,
            saver: TrailSaver::new(),
            analyze: AnalyzeContext::new(ccmin_mode),
            restart: RestartControl::new(RestartSettings::default()),
            simp: SimplifyGuard::new(),
            terminate_cb: None,
            learn_cb: None,
            next_reduce,
            reduce_rounds: 0,
            last_core_conflict: 0,
            sls_ran_at: 0,
            stats: Stats::default(),
        }
    }

    pub fn number_of_vars(&self) -> usize {
        self.assigns.number_of_vars()
    }

    pub fn number_of_clauses(&self) -> usize {
        self.db.stats.num_clauses
    }

    pub fn set_proof(&mut self, proof: Proof) {
        self.proof = Some(proof);
    }

    pub fn set_terminate_callback(&mut self, cb: Option<TerminateCallback>) {
        self.terminate_cb = cb;
    }

    pub fn set_learn_callback(&mut self, cb: Option<(LearnCallback, usize)>) {
        self.learn_cb = cb;
    }

    pub fn new_var(&mut self, upol: Option<bool>, dvar: bool) -> Var {
        let v = self.assigns.new_var();
        self.watches.init_var(v);
        self.heur.init_var(v, upol, dvar);
        self.analyze.init_var(v);
        v
    }

    /// Appends a permanent input clause.
    pub fn add_clause(&mut self, clause: &[Lit]) -> AddClauseRes {
        self.add_clause_impl(clause, false)
    }

    /// Appends a permanent clause derived from existing ones (an
    /// inprocessing resolvent); the proof records it as an addition
    /// instead of an input axiom.
    pub(crate) fn add_derived_clause(&mut self, clause: &[Lit]) -> AddClauseRes {
        self.add_clause_impl(clause, true)
    }

    fn add_clause_impl(&mut self, clause: &[Lit], derived: bool) -> AddClauseRes {
        assert!(self.assigns.is_ground_level());

        if self.settings.use_rcheck && is_implied(self, clause) {
            if !derived {
                if let Some(proof) = self.proof.as_mut() {
                    proof.register_original(clause);
                }
            }
            return AddClauseRes::Consumed;
        }

        let ps = {
            let mut ps = clause.to_vec();

            // Check if clause is satisfied and remove false/duplicate literals:
            ps.sort();
            ps.dedup();
            ps.retain(|&lit| !self.assigns.is_assigned_neg(lit));

            {
                let mut prev = None;
                for &lit in ps.iter() {
                    if self.assigns.is_assigned_pos(lit) || prev == Some(!lit) {
                        if !derived {
                            if let Some(proof) = self.proof.as_mut() {
                                proof.register_original(clause);
                            }
                        }
                        return AddClauseRes::Consumed;
                    }
                    prev = Some(lit);
                }
            }

            ps
        };

        if let Some(proof) = self.proof.as_mut() {
            if derived {
                if ps.is_empty() {
                    proof.conclude_unsat();
                } else {
                    proof.add_clause(&ps);
                }
            } else {
                proof.register_original(clause);

                // The stored clause lost literals relative to the input;
                // the stripped form is a consequence, record the rewrite.
                let mut normalized = clause.to_vec();
                normalized.sort();
                normalized.dedup();
                if ps.len() != normalized.len() {
                    if ps.is_empty() {
                        proof.conclude_unsat();
                    } else {
                        proof.add_clause(&ps);
                        proof.delete_clause(clause);
                    }
                }
            }
        }

        match &ps[..] {
            [] => AddClauseRes::UnSAT,

            [unit] => {
                self.assigns.assign_lit(*unit, None);
                match self.propagate() {
                    None => AddClauseRes::Consumed,
                    Some(_) => {
                        if let Some(proof) = self.proof.as_mut() {
                            proof.conclude_unsat();
                        }
                        AddClauseRes::UnSAT
                    }
                }
            }

            lits => {
                let cr = self.db.add_clause(&mut self.ca, lits);
                self.attach(cr);
                AddClauseRes::Added(cr)
            }
        }
    }

    pub fn attach(&mut self, cr: ClauseRef) {
        let c = self.ca.view(cr);
        self.watches.watch_clause(c, cr);
    }

    pub fn propagate(&mut self) -> Option<ClauseRef> {
        if !self.saver.is_empty() {
            self.saver.replay(&self.ca, &mut self.assigns);
        }
        self.watches.propagate(&mut self.ca, &mut self.assigns)
    }

    pub fn preprocess(&mut self) -> bool {
        if let Some(_) = self.propagate() {
            if let Some(proof) = self.proof.as_mut() {
                proof.conclude_unsat();
            }
            false
        } else {
            self.try_simplify();
            true
        }
    }

    pub fn search(
        &mut self,
        ss: &SearchSettings,
        budget: &Budget,
        assumptions: &[Lit],
    ) -> SearchRes {
        info!("============================[ Search Statistics ]==============================");
        info!("| Conflicts |          ORIGINAL         |          LEARNT          | Progress |");
        info!("|           |    Vars  Clauses Literals |  Clauses Freed           |          |");
        info!("===============================================================================");

        let res = self.search_internal(ss, budget, assumptions);
        self.saver.clear();

        info!("===============================================================================");
        res
    }

    fn search_internal(
        &mut self,
        ss: &SearchSettings,
        budget: &Budget,
        assumptions: &[Lit],
    ) -> SearchRes {
        debug_assert!(self.assigns.is_ground_level());
        self.stats.solves += 1;
        self.stats.starts += 1;
        self.restart.reset(ss.restart);

        loop {
            match self.propagate() {
                Some(confl) => {
                    self.stats.conflicts += 1;

                    // Cooperative cancellation, polled at the head of the
                    // conflict-analysis path.
                    if !budget.within(self.stats.conflicts, self.watches.propagations)
                        || self.should_terminate()
                    {
                        return self.interrupt();
                    }

                    if !self.handle_conflict(ss, confl) {
                        if let Some(proof) = self.proof.as_mut() {
                            proof.conclude_unsat();
                        }
                        self.cancel_until(GROUND_LEVEL, false);
                        return SearchRes::UnSAT(self.stats());
                    }
                }

                None => {
                    if !budget.within(self.stats.conflicts, self.watches.propagations)
                        || self.should_terminate()
                    {
                        return self.interrupt();
                    }

                    if self.restart.should_restart(self.assigns.number_of_assigns())
                        && !self.assigns.is_ground_level()
                    {
                        self.restart.on_restart();
                        self.stats.starts += 1;
                        self.saver.clear();
                        self.cancel_until(GROUND_LEVEL, false);
                        continue;
                    }

                    // Simplify the set of problem clauses:
                    if self.assigns.is_ground_level() {
                        self.try_simplify();
                    }

                    if self.stats.conflicts >= self.next_reduce {
                        self.reduce_db();
                    }

                    self.maybe_run_sls(ss);

                    match self.decide(assumptions) {
                        Err(confl) => {
                            let res = SearchRes::AssumpsConfl(confl, self.stats());
                            self.cancel_until(GROUND_LEVEL, false);
                            return res;
                        }

                        Ok(None) => {
                            // Model found:
                            let model = crate::sat::formula::util::extract_model(&self.assigns);
                            self.cancel_until(GROUND_LEVEL, false);
                            return SearchRes::SAT(model, self.stats());
                        }

                        Ok(Some(next)) => {
                            self.assigns.new_decision_level();
                            self.assigns.assign_lit(next, None);
                        }
                    }
                }
            }
        }
    }

    fn interrupt(&mut self) -> SearchRes {
        let progress = progress_estimate(&self.assigns);
        self.cancel_until(GROUND_LEVEL, false);
        SearchRes::Interrupted(progress, self.stats())
    }

    fn should_terminate(&mut self) -> bool {
        match self.terminate_cb {
            Some(ref mut cb) => cb(),
            None => false,
        }
    }

    // Forces pending assumptions first; afterwards the heuristic picks.
    fn decide(&mut self, assumptions: &[Lit]) -> Result<Option<Lit>, LitMap<()>> {
        while let Some(&p) = assumptions
            .get(self.assigns.current_level().offset_from_ground())
        {
            match self.assigns.of_lit(p) {
                LBool::True => {
                    // Dummy decision level:
                    self.assigns.new_decision_level();
                }
                LBool::False => {
                    let conflict = self.analyze.analyze_final(&self.ca, &self.assigns, !p);
                    return Err(conflict);
                }
                LBool::Undef => {
                    return Ok(Some(p));
                }
            }
        }

        // New variable decision:
        self.stats.decisions += 1;
        Ok(self.heur.pick_branch_lit(&self.assigns))
    }

    // Returns false when the conflict is at the ground level, i.e. the
    // formula is refuted.
    fn handle_conflict(&mut self, ss: &SearchSettings, confl: ClauseRef) -> bool {
        let now = self.stats.conflicts;
        let conflict_level = self.assigns.current_level();

        let res = {
            let Searcher {
                ref mut analyze,
                ref mut heur,
                ref mut db,
                ref assigns,
                ref mut ca,
                ..
            } = *self;
            analyze.analyze(
                assigns,
                ca,
                confl,
                |v| heur.bump_activity(v),
                |ca, assigns, cr| db.clause_used(ca, assigns, cr, now),
            )
        };

        let mut out_learnt = match res {
            AnalyzeRes::Ground => return false,
            AnalyzeRes::Learnt(lits) => lits,
        };

        self.bin_res_minimize(&mut out_learnt);

        if let Some((ref mut cb, max_len)) = self.learn_cb {
            if out_learnt.len() <= max_len {
                cb(&out_learnt);
            }
        }

        let lbd = self.analyze.lbd(&self.assigns, &out_learnt);
        self.restart
            .on_conflict(lbd, self.assigns.number_of_assigns());

        match AnalyzeContext::prepare_learnt(&self.assigns, out_learnt) {
            Conflict::Unit(unit) => {
                if let Some(proof) = self.proof.as_mut() {
                    proof.add_clause(&[unit]);
                }
                self.cancel_until(GROUND_LEVEL, true);
                self.assigns.assign_lit(unit, None);
            }

            Conflict::Learned(level, lit, lits) => {
                // A deep backjump throws away assignments that chances are
                // would be redone verbatim; backtracking chronologically
                // keeps them and still asserts the learnt clause.
                let target = match ss.chrono_threshold {
                    Some(threshold)
                        if conflict_level.offset_from_ground()
                            >= level.offset_from_ground() + 1 + threshold =>
                    {
                        self.stats.chrono_backtracks += 1;
                        conflict_level.prev()
                    }
                    _ => level,
                };

                self.cancel_until(target, true);

                let cr = self.db.learn_clause(&mut self.ca, &lits, lbd, now);
                if let Some(proof) = self.proof.as_mut() {
                    proof.add_clause(self.ca.view(cr).lits());
                }
                if self.ca.view(cr).header.tier() == Tier::Core {
                    self.last_core_conflict = now;
                }
                self.attach(cr);
                self.assigns.assign_lit(lit, Some(cr));
            }
        }

        self.heur.decay_activity();
        self.db.decay_activity();
        self.heur.after_conflict(self.stats.conflicts, &self.assigns);

        true
    }

    // Strengthen the learnt clause against binary clauses containing its
    // asserting literal: a true partner literal whose negation sits in
    // the clause makes that negation redundant.
    fn bin_res_minimize(&mut self, out_learnt: &mut Vec<Lit>) {
        if out_learnt.len() < 2 || out_learnt.len() > 30 {
            return;
        }

        let mut drop = vec![false; out_learnt.len()];
        {
            let assigns = &self.assigns;
            let lits = &out_learnt[..];
            let drop = &mut drop;
            self.watches
                .binary_partners(&self.ca, lits[0], |partner| {
                    if assigns.is_assigned_pos(partner) {
                        if let Some(pos) = lits[1..].iter().position(|&l| l == !partner) {
                            drop[pos + 1] = true;
                        }
                    }
                });
        }

        if drop.iter().any(|&d| d) {
            let mut index = 0;
            out_learnt.retain(|_| {
                let keep = !drop[index];
                index += 1;
                keep
            });
        }
    }

    // Revert to the state at the given level (keeping all assignments at
    // 'target' but not beyond).
    pub(crate) fn cancel_until(&mut self, target: DecisionLevel, save_trail: bool) {
        if save_trail {
            self.saver.clear();
        }
        let top = self.assigns.current_level();
        let Searcher {
            ref mut assigns,
            ref mut heur,
            ref mut saver,
            ..
        } = *self;
        assigns.rewind_until_level(target, |level, lit, reason| {
            heur.cancel(lit, level == top);
            if save_trail {
                saver.save(lit, reason);
            }
        });
    }

    // Description:
    //   Simplify the clause database according to the current top-level
    //   assignment: satisfied clauses go away, falsified literals are
    //   stripped from the rest.
    pub fn try_simplify(&mut self) {
        debug_assert!(self.assigns.is_ground_level());
        if self
            .simp
            .skip(self.assigns.number_of_assigns(), self.watches.propagations)
        {
            return;
        }

        self.saver.clear();
        {
            let Searcher {
                ref mut db,
                ref mut ca,
                ref assigns,
                ref mut watches,
                ref mut proof,
                ..
            } = *self;
            db.remove_satisfied(ca, assigns, |event| match event {
                DbEvent::Deleted(c) => {
                    watches.unwatch_clause_lazy(c);
                    if let Some(proof) = proof.as_mut() {
                        proof.delete_clause(c.lits());
                    }
                }
                DbEvent::Shrunk { old, new } => {
                    if let Some(proof) = proof.as_mut() {
                        proof.add_clause(new);
                        proof.delete_clause(old);
                    }
                }
            });
        }

        self.try_garbage_collect();

        self.heur.rebuild_order_heap(&self.assigns);
        self.simp.set_next(
            self.assigns.number_of_assigns(),
            self.watches.propagations,
            self.db.stats.clauses_literals + self.db.stats.learnts_literals, // (shouldn't depend on stats really, but it will do for now)
        );
    }

    fn reduce_db(&mut self) {
        let now = self.stats.conflicts;
        self.saver.clear();

        let freed = {
            let Searcher {
                ref mut db,
                ref mut ca,
                ref assigns,
                ref mut watches,
                ref mut proof,
                ..
            } = *self;
            db.reduce(ca, assigns, now, |c| {
                watches.unwatch_clause_lazy(c);
                if let Some(proof) = proof.as_mut() {
                    proof.delete_clause(c.lits());
                }
            })
        };

        self.stats.reduces += 1;
        self.reduce_rounds += 1;
        self.next_reduce = now
            + self.db.settings.reduce_first
            + self.db.settings.reduce_inc * self.reduce_rounds;

        info!(
            "| {:9} | {:7} {:8} {:8} | {:8} {:8}          | {:6.3} % |",
            self.stats.conflicts,
            self.heur.dec_vars - self.assigns.number_of_ground_assigns(),
            self.db.stats.num_clauses,
            self.db.stats.clauses_literals,
            self.db.stats.num_learnts,
            freed,
            progress_estimate(&self.assigns) * 100.0
        );

        self.try_garbage_collect();
    }

    // Kick the local-search helper once the learner has gone a long time
    // without producing a core-tier clause, and take its best assignment
    // as saved phases.
    fn maybe_run_sls(&mut self, ss: &SearchSettings) {
        if !ss.sls.enabled || !self.assigns.is_ground_level() {
            return;
        }
        let now = self.stats.conflicts;
        if now.saturating_sub(self.last_core_conflict) < ss.sls.stall_window
            || now.saturating_sub(self.sls_ran_at) < ss.sls.stall_window
        {
            return;
        }

        let n_vars = self.assigns.number_of_vars();
        let init: Vec<bool> = (0..n_vars)
            .map(|i| self.heur.preferred_value(Var::unidx(i)))
            .collect();

        let mut snapshot: Vec<Vec<Lit>> = Vec::with_capacity(self.db.stats.num_clauses);
        for &cr in self.db.original_clauses() {
            if !self.ca.is_deleted(cr) {
                snapshot.push(self.ca.literals(cr).to_vec());
            }
        }
        for &lit in self.assigns.trail() {
            snapshot.push(vec![lit]);
        }

        let mut ls = LocalSearch::new(ss.sls, n_vars, snapshot.iter().map(|c| &c[..]), &init);
        let unsat_left = ls.run();
        self.heur.import_phases(&ls.best_phases());

        self.stats.sls_runs += 1;
        self.sls_ran_at = now;
        self.last_core_conflict = now;
        debug!(
            "|  Local search: {:10} flips budget, {:8} clauses left unsat            |",
            ss.sls.max_flips, unsat_left
        );
    }

    fn try_garbage_collect(&mut self) {
        if self.ca.check_garbage(self.settings.garbage_frac) {
            self.garbage_collect();
        }
    }

    pub fn garbage_collect(&mut self) {
        self.saver.clear();
        let before = self.ca.size();

        let Searcher {
            ref mut ca,
            ref mut watches,
            ref mut assigns,
            ref mut db,
            ..
        } = *self;
        let mut gc = ClauseGC::new(ca);
        watches.gc(&mut gc);
        assigns.gc(&mut gc);
        db.gc(&mut gc);
        let to = gc.finish();
        *ca = to;

        debug!(
            "|  Garbage collection:   {:12} bytes => {:12} bytes             |",
            before,
            self.ca.size()
        );
    }

    pub fn stats(&self) -> sat::Stats {
        sat::Stats {
            solves: self.stats.solves,
            restarts: self.stats.starts,
            blocked_restarts: self.restart.blocked,
            decisions: self.stats.decisions,
            rnd_decisions: self.heur.rnd_decisions,
            conflicts: self.stats.conflicts,
            propagations: self.watches.propagations,
            inspections: self.watches.inspections,
            reduces: self.stats.reduces,
            chrono_backtracks: self.stats.chrono_backtracks,
            sls_runs: self.stats.sls_runs,
            replayed_assigns: self.saver.replayed,
            tot_literals: self.analyze.tot_literals,
            del_literals: self.analyze.max_literals - self.analyze.tot_literals,
        }
    }
}


fn is_implied(search: &mut Searcher, c: &[Lit]) -> bool {
    assert!(search.assigns.is_ground_level());

    search.assigns.new_decision_level();
    for &lit in c.iter() {
        match search.assigns.of_lit(lit) {
            LBool::True => {
                search.cancel_until(GROUND_LEVEL, false);
                return true;
            }
            LBool::Undef => {
                search.assigns.assign_lit(!lit, None);
            }
            LBool::False => {}
        }
    }

    let result = search.propagate().is_some();
    search.cancel_until(GROUND_LEVEL, false);
    result
}
