use crate::sat::formula::{Idx, Lit, Var, VarMap};
use crate::sat::formula::assignment::*;
use crate::sat::formula::clause::*;
use crate::sat::formula::subsumes::*;
use crate::sat::formula::util::*;
use super::{AddClauseRes, SearchRes, SearchSettings, Searcher};
use super::super::budget::Budget;
use self::elim_clauses::ElimClauses;
use self::elim_queue::{ElimQueue, OccLists, VarStatus};
use self::subsumption_queue::{SubsumptionJob, SubsumptionQueue};

pub mod elim_clauses;
pub mod elim_queue;
mod subsumption_queue;


pub struct SimplificatorSettings {
    pub grow: usize, // Allow a variable elimination step to grow by a number of clauses (default to zero).
    pub clause_lim: i32, // Variables are not eliminated if it produces a resolvent with a length above this limit. -1 means no limit.
    pub subsumption_lim: i32, // Do not check if subsumption against a clause larger than this. -1 means no limit.
    pub simp_garbage_frac: f64, // A different limit for when to issue a GC during simplification (Also see 'garbage_frac').
    pub use_asymm: bool,        // Shrink clauses by asymmetric branching.
    pub use_elim: bool,         // Perform variable elimination.
}

impl Default for SimplificatorSettings {
    fn default() -> Self {
        SimplificatorSettings {
            grow: 0,
            clause_lim: 20,
            subsumption_lim: 1000,
            simp_garbage_frac: 0.5,
            use_asymm: false,
            use_elim: true,
        }
    }
}


#[derive(Default)]
struct Stats {
    merges: u64,
    asymm_lits: u64,
    eliminated_vars: u64,
    subsumed: u64,
    deleted_literals: u64,
}


/// Bounded variable elimination plus backward subsumption over the
/// original clauses, run at the ground level before a solve. Occurrence
/// lists and work queues are rebuilt for every pass and torn down
/// afterwards, so the searcher is free to collect garbage in between;
/// only the frozen/eliminated flags persist.
pub struct Simplificator {
    pub settings: SimplificatorSettings,
    stats: Stats,
    var_status: VarMap<VarStatus>,
    occurs: OccLists,
    elim: ElimQueue,
    touched: VarMap<i8>,
    n_touched: usize,
    subsumption_queue: SubsumptionQueue,
}

impl Simplificator {
    pub fn new(settings: SimplificatorSettings) -> Self {
        Simplificator {
            settings,
            stats: Stats::default(),
            var_status: VarMap::new(),
            occurs: OccLists::new(),
            elim: ElimQueue::new(),
            touched: VarMap::new(),
            n_touched: 0,
            subsumption_queue: SubsumptionQueue::new(),
        }
    }

    pub fn init_var(&mut self, v: Var) {
        self.var_status.insert(
            &v,
            VarStatus {
                frozen: false,
                eliminated: false,
            },
        );
    }

    pub fn set_frozen(&mut self, v: Var, frozen: bool) {
        self.var_status[&v].frozen = frozen;
    }

    pub fn is_eliminated(&self, v: Var) -> bool {
        self.var_status[&v].eliminated
    }

    pub fn solve_limited(
        &mut self,
        search: &mut Searcher,
        ss: &SearchSettings,
        budget: &Budget,
        elimclauses: &mut ElimClauses,
        assumptions: &[Lit],
    ) -> SearchRes {
        // Assumptions must be temporarily frozen to run variable elimination:
        let mut extra_frozen: Vec<Var> = Vec::new();
        for lit in assumptions.iter() {
            let st = &mut self.var_status[&lit.var()];
            assert!(!st.eliminated, "assumption on an eliminated variable");
            if !st.frozen {
                st.frozen = true;
                extra_frozen.push(lit.var());
            }
        }

        let res = if search.preprocess() && self.eliminate(search, budget, elimclauses) {
            search.search(ss, budget, assumptions)
        } else {
            SearchRes::UnSAT(search.stats())
        };

        for &v in extra_frozen.iter() {
            self.var_status[&v].frozen = false;
        }

        res
    }

    pub fn eliminate(
        &mut self,
        search: &mut Searcher,
        budget: &Budget,
        elimclauses: &mut ElimClauses,
    ) -> bool {
        debug_assert!(search.assigns.is_ground_level());
        search.saver.clear();
        self.build_occurrences(search);

        let ok = self.eliminate_loop(search, budget, elimclauses);
        if !ok {
            if let Some(proof) = search.proof.as_mut() {
                proof.conclude_unsat();
            }
        }

        self.teardown();
        ok
    }

    fn eliminate_loop(
        &mut self,
        search: &mut Searcher,
        budget: &Budget,
        elimclauses: &mut ElimClauses,
    ) -> bool {
        // Main simplification loop:
        while self.n_touched > 0
            || self.subsumption_queue.assigns_left(&search.assigns) > 0
            || self.elim.len() > 0
        {
            self.gather_touched_clauses(&mut search.ca);

            if !self.backward_subsumption_check(search, budget, true) {
                return false;
            }

            // Empty elim queue and return immediately on user-interrupt:
            if budget.interrupted() {
                self.elim.clear();
                return true;
            }

            trace!("ELIM: vars = {}", self.elim.len());
            let mut cnt = 0;
            while let Some(var) = self.elim.pop() {
                if budget.interrupted() {
                    break;
                }
                if !self.var_status[&var].eliminated && search.assigns.is_undef(var) {
                    if cnt % 100 == 0 {
                        trace!("elimination left: {:10}", self.elim.len());
                    }

                    if self.settings.use_asymm {
                        // Temporarily freeze variable. Otherwise, it
                        // would immediately end up on the queue again:
                        let was_frozen = self.var_status[&var].frozen;
                        self.var_status[&var].frozen = true;
                        if !self.asymm_var(search, budget, var) {
                            return false;
                        }
                        self.var_status[&var].frozen = was_frozen;
                    }

                    // At this point the variable may have been set by
                    // asymmetric branching; check it again, and never
                    // touch frozen variables:
                    if self.settings.use_elim
                        && search.assigns.is_undef(var)
                        && !self.var_status[&var].frozen
                        && !self.eliminate_var(search, budget, elimclauses, var)
                    {
                        return false;
                    }

                    if search.ca.check_garbage(self.settings.simp_garbage_frac) {
                        self.garbage_collect(search);
                    }
                }

                cnt += 1;
            }

            debug_assert!(self.subsumption_queue.is_empty());
        }

        info!(
            "|  Simplification: {:8} subsumed, {:8} strengthened, {:8} eliminated  |",
            self.stats.subsumed, self.stats.deleted_literals, self.stats.eliminated_vars
        );
        true
    }

    fn build_occurrences(&mut self, search: &mut Searcher) {
        self.occurs.clear();
        self.elim.clear();
        self.n_touched = 0;
        self.subsumption_queue = SubsumptionQueue::new();

        for i in 0..search.assigns.number_of_vars() {
            let v: Var = Idx::unidx(i);
            self.touched.insert(&v, 0);
            if !self.var_status[&v].eliminated {
                self.occurs.init_var(&v);
                self.elim.init_var(v);
            }
        }

        let crs: Vec<ClauseRef> = search.db.original_clauses().to_vec();
        for cr in crs {
            if search.ca.is_deleted(cr) {
                continue;
            }
            self.subsumption_queue.push(cr);
            for &lit in search.ca.literals(cr) {
                self.occurs.push_occ(&lit.var(), cr);
                self.elim.bump_lit_occ(&lit, 1);
            }
        }
    }

    fn teardown(&mut self) {
        self.occurs.clear();
        self.elim.clear();
        self.touched.clear();
        self.n_touched = 0;
        self.subsumption_queue = SubsumptionQueue::new();
    }

    // Registers a clause produced during simplification (a resolvent).
    fn add_clause(&mut self, search: &mut Searcher, ps: &[Lit]) -> Result<(), ()> {
        debug_assert!(ps.iter().all(|l| !self.var_status[&l.var()].eliminated));

        match search.add_derived_clause(ps) {
            AddClauseRes::UnSAT => Err(()),
            AddClauseRes::Consumed => Ok(()),
            AddClauseRes::Added(cr) => {
                // NOTE: the clause is added to the queue immediately and then
                // again during 'gather_touched_clauses()'. If nothing happens
                // in between, it will only be checked once. Otherwise, it may
                // be checked twice unnecessarily. This is an unfortunate
                // consequence of how backward subsumption is used to mimic
                // forward subsumption.
                self.subsumption_queue.push(cr);

                for &lit in search.ca.literals(cr) {
                    self.occurs.push_occ(&lit.var(), cr);
                    self.touched[&lit.var()] = 1;
                    self.n_touched += 1;
                    self.elim.bump_lit_occ(&lit, 1);
                }

                Ok(())
            }
        }
    }

    fn remove_clause(&mut self, search: &mut Searcher, cr: ClauseRef) {
        {
            let lits = search.ca.literals(cr);
            for &lit in lits {
                self.elim.bump_lit_occ(&lit, -1);
                self.elim
                    .update_elim_heap(lit.var(), &self.var_status, &search.assigns);
                self.occurs.smudge(&lit.var());
            }
        }

        search.watches.unwatch_clause_lazy(search.ca.view(cr));
        if let Some(proof) = search.proof.as_mut() {
            proof.delete_clause(search.ca.view(cr).lits());
        }
        search.db.remove_clause(&mut search.ca, cr);
    }

    fn strengthen_clause(&mut self, search: &mut Searcher, cr: ClauseRef, l: Lit) -> bool {
        debug_assert!(search.assigns.is_ground_level());

        // FIX: this is too inefficient but would be nice to have (properly implemented)
        // if (!find(subsumption_queue, &c))
        self.subsumption_queue.push(cr);

        let len = search.ca.view(cr).len();
        if len == 2 {
            let unit = {
                let c = search.ca.view(cr);
                let (c0, c1) = c.head_pair();
                if c0 == l {
                    c1
                } else {
                    c0
                }
            };
            if let Some(proof) = search.proof.as_mut() {
                proof.add_clause(&[unit]);
            }
            self.remove_clause(search, cr);

            if !try_assign_lit(&mut search.assigns, unit, None) {
                if let Some(proof) = search.proof.as_mut() {
                    proof.conclude_unsat();
                }
                return false;
            }
            match search.propagate() {
                None => true,
                Some(_) => {
                    if let Some(proof) = search.proof.as_mut() {
                        proof.conclude_unsat();
                    }
                    false
                }
            }
        } else {
            let old = search.ca.view(cr).lits().to_vec();

            search.watches.unwatch_clause_strict(search.ca.view(cr), cr);
            search.db.edit_clause(&mut search.ca, cr, |c| {
                c.strengthen(l);
                debug_assert_eq!(c.len(), len - 1);
            });
            search.attach(cr);

            if let Some(proof) = search.proof.as_mut() {
                proof.add_clause(search.ca.view(cr).lits());
                proof.delete_clause(&old);
            }

            self.occurs.remove_occ(&l.var(), cr);
            self.elim.bump_lit_occ(&l, -1);
            self.elim
                .update_elim_heap(l.var(), &self.var_status, &search.assigns);
            true
        }
    }

    fn eliminate_var(
        &mut self,
        search: &mut Searcher,
        budget: &Budget,
        elimclauses: &mut ElimClauses,
        v: Var,
    ) -> bool {
        debug_assert!({
            let st = &self.var_status[&v];
            !st.frozen && !st.eliminated
        });
        debug_assert!(search.assigns.is_undef(v));

        // Split the occurrences into positive and negative:
        let cls = self.occurs.lookup(&v, &search.ca).clone();
        let mut pos = Vec::new();
        let mut neg = Vec::new();
        for &cr in cls.iter() {
            for &l in search.ca.literals(cr) {
                if l.var() == v {
                    if l.sign() {
                        neg.push(cr);
                    } else {
                        pos.push(cr);
                    }
                    break;
                }
            }
        }

        // Check whether the number of clauses stays within the allowed
        // growth and no resolvent exceeds the clause length limit:
        let mut resolvents = Vec::new();
        for &pr in pos.iter() {
            for &nr in neg.iter() {
                self.stats.merges += 1;
                if let Some(resolvent) = merge(v, search.ca.literals(pr), search.ca.literals(nr)) {
                    if resolvents.len() + 1 > cls.len() + self.settings.grow
                        || (self.settings.clause_lim != -1
                            && (resolvent.len() as i32) > self.settings.clause_lim)
                    {
                        return true;
                    }
                    resolvents.push(resolvent);
                }
            }
        }

        // The variable goes away: remember one side of its occurrences
        // for model reconstruction, produce the resolvents, then drop
        // every clause it appears in.
        self.var_status[&v].eliminated = true;
        search.heur.set_decision_var(v, false);
        self.stats.eliminated_vars += 1;

        if pos.len() > neg.len() {
            for &cr in neg.iter() {
                elimclauses.mk_elim_clause(v, search.ca.literals(cr));
            }
            elimclauses.mk_elim_unit(v.pos_lit());
        } else {
            for &cr in pos.iter() {
                elimclauses.mk_elim_clause(v, search.ca.literals(cr));
            }
            elimclauses.mk_elim_unit(v.neg_lit());
        }

        // Resolvents enter the database (and the proof) while their
        // parents are still present:
        for resolvent in resolvents.iter() {
            if self.add_clause(search, resolvent).is_err() {
                return false;
            }
        }

        for &cr in cls.iter() {
            self.remove_clause(search, cr);
        }

        // Free the occurrence list of this variable:
        self.occurs.clear_var(&v);
        search.watches.try_clear_var(v);

        self.backward_subsumption_check(search, budget, false)
    }

    fn asymm_var(&mut self, search: &mut Searcher, budget: &Budget, v: Var) -> bool {
        let cls = {
            let cls = self.occurs.lookup(&v, &search.ca);
            if !search.assigns.is_undef(v) || cls.is_empty() {
                return true;
            }
            cls.clone()
        };

        for &cr in cls.iter() {
            if search.ca.is_deleted(cr) {
                continue;
            }
            if let Some(l) = asymmetric_branching(search, v, cr) {
                self.stats.asymm_lits += 1;
                if !self.strengthen_clause(search, cr, l) {
                    return false;
                }
            }
        }

        self.backward_subsumption_check(search, budget, false)
    }

    // Backward subsumption + backward subsumption resolution
    fn backward_subsumption_check(
        &mut self,
        search: &mut Searcher,
        budget: &Budget,
        verbose: bool,
    ) -> bool {
        debug_assert!(search.assigns.is_ground_level());

        if verbose {
            trace!(
                "BWD-SUB: queue = {}, trail = {}",
                self.subsumption_queue.len(),
                self.subsumption_queue.assigns_left(&search.assigns)
            );
        }

        let mut cnt = 0u64;
        while let Some(job) = self.subsumption_queue.pop(&search.ca, &search.assigns) {
            // Empty subsumption queue and return immediately on user-interrupt:
            if budget.interrupted() {
                self.subsumption_queue.clear(&search.assigns);
                break;
            }

            if verbose && cnt % 1000 == 0 {
                trace!(
                    "subsumption left: {:10} ({:10} subsumed, {:10} deleted literals)",
                    self.subsumption_queue.len(),
                    self.stats.subsumed,
                    self.stats.deleted_literals
                );
            }
            cnt += 1;

            match job {
                SubsumptionJob::Assign(unit) => {
                    for &cj in self.occurs.lookup(&unit.var(), &search.ca).clone().iter() {
                        if {
                            let c = search.ca.view(cj);
                            !c.is_deleted()
                                && (self.settings.subsumption_lim == -1
                                    || (c.len() as i32) < self.settings.subsumption_lim)
                        } {
                            match unit_subsumes(unit, search.ca.view(cj)) {
                                Subsumes::Different => {}

                                Subsumes::Exact => {
                                    self.stats.subsumed += 1;
                                    self.remove_clause(search, cj);
                                }

                                Subsumes::LitSign(l) => {
                                    self.stats.deleted_literals += 1;
                                    if !self.strengthen_clause(search, cj, !l) {
                                        return false;
                                    }
                                }
                            }
                        }
                    }
                }

                SubsumptionJob::Clause(cr) => {
                    let best = {
                        let c = search.ca.view(cr);
                        let mut best = c.head().var();
                        for &lit in &c.lits()[1..] {
                            if self.occurs.occs_dirty(lit.var()) < self.occurs.occs_dirty(best) {
                                best = lit.var();
                            }
                        }
                        best
                    };

                    for &cj in self.occurs.lookup(&best, &search.ca).clone().iter() {
                        if search.ca.is_deleted(cr) {
                            break;
                        }

                        if cj != cr && {
                            let c = search.ca.view(cj);
                            !c.is_deleted()
                                && (self.settings.subsumption_lim == -1
                                    || (c.len() as i32) < self.settings.subsumption_lim)
                        } {
                            match subsumes(search.ca.view(cr), search.ca.view(cj)) {
                                Subsumes::Different => {}

                                Subsumes::Exact => {
                                    self.stats.subsumed += 1;
                                    self.remove_clause(search, cj);
                                }

                                Subsumes::LitSign(l) => {
                                    self.stats.deleted_literals += 1;
                                    if !self.strengthen_clause(search, cj, !l) {
                                        return false;
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }

        true
    }

    fn gather_touched_clauses(&mut self, ca: &mut ClauseAllocator) {
        if self.n_touched == 0 {
            return;
        }

        self.subsumption_queue.remark_touched(ca, false);

        for (v, touched) in self.touched.iter_mut() {
            if *touched != 0 && !self.var_status[&v].eliminated {
                for &cr in self.occurs.lookup(&v, ca) {
                    let c = ca.edit(cr);
                    if !c.is_touched() {
                        self.subsumption_queue.push(cr);
                        c.set_touched(true);
                    }
                }
                *touched = 0;
            }
        }

        self.subsumption_queue.remark_touched(ca, true);
        self.n_touched = 0;
    }

    fn garbage_collect(&mut self, search: &mut Searcher) {
        search.saver.clear();
        let Searcher {
            ref mut ca,
            ref mut watches,
            ref mut assigns,
            ref mut db,
            ..
        } = *search;

        let mut gc = ClauseGC::new(ca);
        self.occurs.gc(&mut gc);
        self.subsumption_queue.gc(&mut gc);
        watches.gc(&mut gc);
        assigns.gc(&mut gc);
        db.gc(&mut gc);
        *ca = gc.finish();
    }

    pub fn on(search: &mut Searcher) {
        search.ca.extra_clause_field = true;
        search.db.settings.remove_satisfied = false;
    }

    pub fn off(search: &mut Searcher) {
        search.db.settings.remove_satisfied = true;
        search.ca.extra_clause_field = false;

        // Force full cleanup (this is safe and desirable since it only happens once):
        search.heur.rebuild_order_heap(&search.assigns);
        search.garbage_collect();
    }
}


// Propagates the negation of the clause without 'v'; a conflict means
// the clause can lose the literal of 'v'.
fn asymmetric_branching(search: &mut Searcher, v: Var, cr: ClauseRef) -> Option<Lit> {
    debug_assert!(search.assigns.is_ground_level());

    let l = {
        let c = search.ca.view(cr);
        if c.is_deleted() || satisfied_with_assignment(c.lits(), &search.assigns) {
            return None;
        }

        search.assigns.new_decision_level();

        let mut vl = None;
        for &lit in c.lits() {
            if v == lit.var() {
                vl = Some(lit);
            } else if search.assigns.is_undef(lit.var()) {
                search.assigns.assign_lit(!lit, None);
            }
        }

        vl.unwrap()
    };

    let res = search.watches.propagate(&mut search.ca, &mut search.assigns);
    search.cancel_until(GROUND_LEVEL, false);
    res.map(|_| l)
}
