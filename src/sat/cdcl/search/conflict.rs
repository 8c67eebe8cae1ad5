use crate::sat::formula::{assignment::*, clause::*, Lit, LitMap, Var, VarMap};


#[derive(PartialEq, Eq)]
pub enum CCMinMode {
    None,
    Basic,
    Deep,
}

impl Default for CCMinMode {
    fn default() -> Self {
        CCMinMode::Deep
    }
}


#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[repr(u8)]
enum Seen {
    Undef = 0,
    Source = 1,
    Removable = 2,
    Failed = 3,
}


pub enum AnalyzeRes {
    Ground,
    Learnt(Vec<Lit>),
}

pub enum Conflict {
    Unit(Lit),
    Learned(DecisionLevel, Lit, Vec<Lit>),
}


pub struct AnalyzeContext {
    ccmin_mode: CCMinMode, // Controls conflict clause minimization
    seen: VarMap<Seen>,
    analyze_toclear: Vec<Lit>,
    level_stamp: Vec<u64>,
    stamp: u64,
    pub max_literals: u64,
    pub tot_literals: u64,
}

impl AnalyzeContext {
    pub fn new(ccmin_mode: CCMinMode) -> AnalyzeContext {
        AnalyzeContext {
            ccmin_mode,
            seen: VarMap::new(),
            analyze_toclear: Vec::new(),
            level_stamp: Vec::new(),
            stamp: 0,
            max_literals: 0,
            tot_literals: 0,
        }
    }

    pub fn init_var(&mut self, v: Var) {
        self.seen.insert(&v, Seen::Undef);
    }

    /// Number of distinct decision levels among `lits` (all falsified).
    pub fn lbd(&mut self, assigns: &Assignment, lits: &[Lit]) -> u32 {
        if self.level_stamp.len() <= assigns.number_of_vars() {
            self.level_stamp.resize(assigns.number_of_vars() + 1, 0);
        }

        self.stamp += 1;
        let mut distinct = 0;
        for &lit in lits {
            let level = assigns.vardata(lit).level.offset_from_ground();
            if self.level_stamp[level] != self.stamp {
                self.level_stamp[level] = self.stamp;
                distinct += 1;
            }
        }
        distinct
    }

    // Description:
    //   Analyze conflict and produce a reason clause.
    //
    //   Pre-conditions:
    //     * Current decision level must be greater than root level.
    //
    //   Post-conditions:
    //     * The head of the returned clause is the asserting literal of
    //       the first unique implication point.
    pub fn analyze<BV, BC>(
        &mut self,
        assigns: &Assignment,
        ca: &mut ClauseAllocator,
        confl0: ClauseRef,
        mut bump_var: BV,
        mut on_reason: BC,
    ) -> AnalyzeRes
    where
        BV: FnMut(Var),
        BC: FnMut(&mut ClauseAllocator, &Assignment, ClauseRef),
    {
        if assigns.is_ground_level() {
            return AnalyzeRes::Ground;
        }

        // Generate conflict clause by resolving backwards over the trail:
        let mut out_learnt = Vec::new();
        {
            let mut confl = confl0;
            let mut path_c = 0;

            let trail = assigns.trail();
            let mut index = trail.len();
            loop {
                on_reason(ca, assigns, confl);

                let base = if confl == confl0 { 0 } else { 1 };
                for &q in &ca.view(confl).lits()[base..] {
                    let v = q.var();
                    if self.seen[&v] == Seen::Undef {
                        let level = assigns.vardata(q).level;
                        if level > GROUND_LEVEL {
                            self.seen[&v] = Seen::Source;
                            bump_var(v);
                            if level >= assigns.current_level() {
                                path_c += 1;
                            } else {
                                out_learnt.push(q);
                            }
                        }
                    }
                }

                // Select next literal to resolve on:
                let pl = {
                    loop {
                        index -= 1;
                        if self.seen[&trail[index].var()] != Seen::Undef {
                            break;
                        }
                    }
                    trail[index]
                };

                self.seen[&pl.var()] = Seen::Undef;

                path_c -= 1;
                if path_c <= 0 {
                    out_learnt.insert(0, !pl);
                    break;
                }

                confl = assigns.vardata(!pl).reason.unwrap();
            }
        }

        // Minimize conflict clause:
        self.analyze_toclear = out_learnt.clone();
        self.max_literals += out_learnt.len() as u64;
        match self.ccmin_mode {
            CCMinMode::Deep => {
                let asserting = out_learnt[0];
                out_learnt.retain(|&l| l == asserting || !self.lit_redundant(ca, assigns, l));
            }
            CCMinMode::Basic => {
                let asserting = out_learnt[0];
                out_learnt
                    .retain(|&l| l == asserting || !self.lit_redundant_basic(ca, assigns, l));
            }
            CCMinMode::None => {}
        }
        self.tot_literals += out_learnt.len() as u64;

        for l in self.analyze_toclear.iter() {
            self.seen[&l.var()] = Seen::Undef;
        }

        AnalyzeRes::Learnt(out_learnt)
    }

    /// Picks the backtrack level of a minimized learnt clause and moves
    /// the deepest remaining literal into the second watch position.
    pub fn prepare_learnt(assigns: &Assignment, mut out_learnt: Vec<Lit>) -> Conflict {
        if out_learnt.len() == 1 {
            Conflict::Unit(out_learnt[0])
        } else {
            let mut max_i = 1;
            let mut max_level = assigns.vardata(out_learnt[1]).level;
            for i in 2..out_learnt.len() {
                let level = assigns.vardata(out_learnt[i]).level;
                if level > max_level {
                    max_i = i;
                    max_level = level;
                }
            }

            out_learnt.swap(1, max_i);
            Conflict::Learned(max_level, out_learnt[0], out_learnt)
        }
    }

    fn lit_redundant_basic(&self, ca: &ClauseAllocator, assigns: &Assignment, literal: Lit) -> bool {
        match assigns.vardata(literal).reason {
            None => false,
            Some(cr) => {
                for &lit in &ca.view(cr).lits()[1..] {
                    if self.seen[&lit.var()] == Seen::Undef
                        && assigns.vardata(lit).level > GROUND_LEVEL
                    {
                        return false;
                    }
                }
                true
            }
        }
    }

    // Check if 'literal' can be removed from a conflict clause by
    // recursively resolving it against the reasons of its antecedents.
    fn lit_redundant(&mut self, ca: &ClauseAllocator, assigns: &Assignment, literal: Lit) -> bool {
        debug_assert!({
            let s = self.seen[&literal.var()];
            s == Seen::Undef || s == Seen::Source
        });

        let mut analyze_stack = match assigns.vardata(literal).reason {
            None => return false,
            Some(cr) => vec![(literal, &ca.view(cr).lits()[1..])],
        };

        while let Some((p, lits)) = analyze_stack.pop() {
            match lits.split_first() {
                Some((&l, tail)) => {
                    analyze_stack.push((p, tail));
                    let vd = assigns.vardata(l);
                    let seen = self.seen[&l.var()];

                    // Variable at level 0 or previously shown removable:
                    if vd.level == GROUND_LEVEL || seen == Seen::Source || seen == Seen::Removable {
                        continue;
                    }

                    match vd.reason {
                        // Recursively check 'l':
                        Some(cr) if seen == Seen::Undef => {
                            analyze_stack.push((l, &ca.view(cr).lits()[1..]));
                        }

                        // 'l' is a decision or already failed; everything
                        // on the stack is tainted.
                        _ => {
                            for &(l, _) in analyze_stack.iter() {
                                if self.seen[&l.var()] == Seen::Undef {
                                    self.seen[&l.var()] = Seen::Failed;
                                    self.analyze_toclear.push(l);
                                }
                            }
                            return false;
                        }
                    }
                }

                None => {
                    // Finished with current element 'p':
                    if self.seen[&p.var()] == Seen::Undef {
                        self.seen[&p.var()] = Seen::Removable;
                        self.analyze_toclear.push(p);
                    }
                }
            }
        }

        true
    }

    // Description:
    //   Specialized analysis procedure to express the final conflict in
    //   terms of assumptions. Computes the set of assumption literals
    //   that suffice to falsify 'p' and returns them, negated, together
    //   with 'p' itself (the failed-assumption clause).
    pub fn analyze_final(
        &mut self,
        ca: &ClauseAllocator,
        assigns: &Assignment,
        p: Lit,
    ) -> LitMap<()> {
        let mut out_conflict = LitMap::new();
        out_conflict.insert(&p, ());

        if assigns.is_ground_level() {
            return out_conflict;
        }

        let mut to_clear = vec![p.var()];
        self.seen[&p.var()] = Seen::Source;

        for &lit in assigns.trail_above(GROUND_LEVEL).iter().rev() {
            let v = lit.var();
            if self.seen[&v] != Seen::Undef {
                match assigns.vardata_of(v).reason {
                    None => {
                        debug_assert!(assigns.vardata_of(v).level > GROUND_LEVEL);
                        out_conflict.insert(&!lit, ());
                    }

                    Some(cr) => {
                        for &l in &ca.view(cr).lits()[1..] {
                            if assigns.vardata(l).level > GROUND_LEVEL
                                && self.seen[&l.var()] == Seen::Undef
                            {
                                self.seen[&l.var()] = Seen::Source;
                                to_clear.push(l.var());
                            }
                        }
                    }
                }
            }
        }

        for v in to_clear {
            self.seen[&v] = Seen::Undef;
        }

        out_conflict
    }
}
