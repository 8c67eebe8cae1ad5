use std::collections::HashMap;
use std::fmt;
use crate::sat::formula::{Idx, LBool, Lit};


#[derive(Debug)]
pub struct ProofViolation {
    reason: &'static str,
    clause: Vec<Lit>,
}

impl ProofViolation {
    fn new(reason: &'static str, clause: &[Lit]) -> Self {
        ProofViolation {
            reason,
            clause: clause.to_vec(),
        }
    }
}

impl fmt::Display for ProofViolation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: (", self.reason)?;
        for (i, lit) in self.clause.iter().enumerate() {
            if i > 0 {
                write!(f, " ∨ ")?;
            }
            write!(f, "{:?}", lit)?;
        }
        write!(f, ")")
    }
}


/// Independent replica of the clause set that verifies every emitted
/// proof record on the fly. Additions must be reverse-unit-propagation
/// consequences of the current set (DRUP); when propagation alone is
/// inconclusive, resolvents on the first literal are checked instead
/// (RAT). Deletions must name a clause that is actually present.
///
/// The replica keeps a persistent trail of everything forced by unit
/// clauses; temporary assumptions made during a check are rewound but
/// the persistent prefix only ever grows.
pub struct OnlineChecker {
    clauses: Vec<Vec<Lit>>, // an empty vector marks a deleted clause
    index: HashMap<Vec<Lit>, Vec<usize>>, // key: sorted, deduplicated literals
    watches: Vec<Vec<usize>>, // per literal: clauses watching it at slots 0 and 1
    occs: Vec<Vec<usize>>,  // per literal: clauses containing it
    values: Vec<LBool>,     // per variable
    trail: Vec<Lit>,
    qhead: usize,
    base_assigns: usize,
    ok: bool, // false once the empty clause is derived
    pub checked_additions: u64,
}

impl OnlineChecker {
    pub fn new() -> OnlineChecker {
        OnlineChecker {
            clauses: Vec::new(),
            index: HashMap::new(),
            watches: Vec::new(),
            occs: Vec::new(),
            values: Vec::new(),
            trail: Vec::new(),
            qhead: 0,
            base_assigns: 0,
            ok: true,
            checked_additions: 0,
        }
    }

    fn key(lits: &[Lit]) -> Vec<Lit> {
        let mut key = lits.to_vec();
        key.sort();
        key.dedup();
        key
    }

    fn ensure_lit(&mut self, lit: Lit) {
        let want = lit.var().idx() + 1;
        if self.values.len() < want {
            self.values.resize(want, LBool::Undef);
        }
        if self.watches.len() < 2 * want {
            self.watches.resize(2 * want, Vec::new());
        }
        if self.occs.len() < 2 * want {
            self.occs.resize(2 * want, Vec::new());
        }
    }

    #[inline]
    fn value(&self, lit: Lit) -> LBool {
        let value = self.values[lit.var().idx()];
        if lit.sign() {
            !value
        } else {
            value
        }
    }

    #[inline]
    fn enqueue(&mut self, lit: Lit) {
        debug_assert!(self.value(lit).is_undef());
        self.values[lit.var().idx()] = LBool::from_bool(!lit.sign());
        self.trail.push(lit);
    }

    fn rewind_to(&mut self, mark: usize) {
        while self.trail.len() > mark {
            let lit = self.trail.pop().unwrap();
            self.values[lit.var().idx()] = LBool::Undef;
        }
        self.qhead = mark;
    }

    // Unit propagation over the stored clauses; true on conflict.
    fn propagate(&mut self) -> bool {
        while self.qhead < self.trail.len() {
            let p = self.trail[self.qhead];
            self.qhead += 1;
            let falsified = !p;

            let mut watchers = std::mem::replace(&mut self.watches[falsified.idx()], Vec::new());
            let mut i = 0;
            let mut j = 0;
            let mut conflict = false;
            while i < watchers.len() {
                let ci = watchers[i];
                i += 1;

                if self.clauses[ci].is_empty() {
                    continue; // deleted, sweep lazily
                }

                {
                    let lits = &mut self.clauses[ci];
                    if lits[0] == falsified {
                        lits.swap(0, 1);
                    }
                    debug_assert_eq!(lits[1], falsified);
                }

                let first = self.clauses[ci][0];
                if self.value(first).is_true() {
                    watchers[j] = ci;
                    j += 1;
                    continue;
                }

                let mut moved = false;
                for k in 2..self.clauses[ci].len() {
                    let cand = self.clauses[ci][k];
                    if !self.value(cand).is_false() {
                        self.clauses[ci].swap(1, k);
                        moved = true;
                        break;
                    }
                }
                if moved {
                    let new_watch = self.clauses[ci][1];
                    self.watches[new_watch.idx()].push(ci);
                    continue;
                }

                watchers[j] = ci;
                j += 1;

                match self.value(first) {
                    LBool::True => {}
                    LBool::Undef => self.enqueue(first),
                    LBool::False => {
                        while i < watchers.len() {
                            watchers[j] = watchers[i];
                            j += 1;
                            i += 1;
                        }
                        conflict = true;
                    }
                }
            }
            watchers.truncate(j);
            let slot = &mut self.watches[falsified.idx()];
            debug_assert!(slot.is_empty());
            *slot = watchers;

            if conflict {
                self.qhead = self.trail.len();
                return true;
            }
        }
        false
    }

    // Reverse unit propagation: assuming the negation of `lits` must
    // yield a conflict. Leaves the persistent prefix untouched.
    fn propagates_to_conflict(&mut self, lits: &[Lit]) -> bool {
        let mark = self.trail.len();
        debug_assert_eq!(self.qhead, mark);

        let mut conflict = false;
        for &lit in lits {
            match self.value(lit) {
                LBool::True => {
                    conflict = true; // the negation is immediately inconsistent
                    break;
                }
                LBool::False => {}
                LBool::Undef => self.enqueue(!lit),
            }
        }

        if !conflict {
            conflict = self.propagate();
        }

        self.rewind_to(mark);
        conflict
    }

    fn attach(&mut self, mut lits: Vec<Lit>) {
        for &lit in lits.iter() {
            self.ensure_lit(lit);
        }

        if lits.is_empty() {
            self.ok = false;
            return;
        }

        // Prefer non-false literals in the watched slots; a clause that
        // has at most one of them is forcing under the persistent prefix.
        let mut non_false = 0;
        for k in 0..lits.len() {
            if !self.value(lits[k]).is_false() {
                lits.swap(non_false, k);
                non_false += 1;
                if non_false == 2 {
                    break;
                }
            }
        }

        let key = Self::key(&lits);
        let slot = self.clauses.len();

        match non_false {
            0 => {
                self.ok = false;
            }
            1 => {
                if self.value(lits[0]).is_undef() {
                    self.enqueue(lits[0]);
                    if self.propagate() {
                        self.ok = false;
                    }
                    self.base_assigns = self.trail.len();
                }
            }
            _ => {}
        }

        if lits.len() > 1 {
            self.watches[lits[0].idx()].push(slot);
            self.watches[lits[1].idx()].push(slot);
        }
        for &lit in lits.iter() {
            self.occs[lit.idx()].push(slot);
        }
        self.clauses.push(lits);
        self.index.entry(key).or_insert_with(Vec::new).push(slot);
    }

    /// Registers an input clause without verification.
    pub fn add_axiom(&mut self, lits: &[Lit]) {
        self.attach(lits.to_vec());
    }

    /// Verifies an emitted clause addition and installs the clause.
    pub fn add_checked(&mut self, lits: &[Lit]) -> Result<(), ProofViolation> {
        if !self.ok {
            return Ok(()); // everything follows from the empty clause
        }
        self.checked_additions += 1;

        for &lit in lits {
            self.ensure_lit(lit);
        }

        if !self.propagates_to_conflict(lits) && !self.check_rat(lits) {
            return Err(ProofViolation::new(
                "clause addition is neither RUP nor RAT",
                lits,
            ));
        }

        self.attach(lits.to_vec());
        Ok(())
    }

    // Resolution asymmetric tautology on the first literal: every
    // resolvent with a clause containing its negation must be a
    // reverse-unit-propagation consequence.
    fn check_rat(&mut self, lits: &[Lit]) -> bool {
        let pivot = match lits.first() {
            Some(&l) => l,
            None => return false,
        };

        let partners = self.occs[(!pivot).idx()].clone();
        for ci in partners {
            if self.clauses[ci].is_empty() {
                continue;
            }

            let resolvent = {
                let mut res: Vec<Lit> = lits[1..].to_vec();
                res.extend(self.clauses[ci].iter().cloned().filter(|&l| l != !pivot));
                res.sort();
                res.dedup();
                res
            };

            if resolvent.windows(2).any(|w| w[0] == !w[1]) {
                continue; // tautological resolvent
            }

            if !self.propagates_to_conflict(&resolvent) {
                return false;
            }
        }
        true
    }

    /// Verifies an emitted clause deletion.
    pub fn delete(&mut self, lits: &[Lit]) -> Result<(), ProofViolation> {
        if !self.ok {
            return Ok(());
        }

        let key = Self::key(lits);
        let slot = match self.index.get_mut(&key) {
            Some(slots) if !slots.is_empty() => slots.pop().unwrap(),
            _ => {
                return Err(ProofViolation::new(
                    "deletion of a clause that is not present",
                    lits,
                ));
            }
        };

        // Unit clauses keep their propagated assignment, the way offline
        // checkers treat unit deletions.
        self.clauses[slot].clear();
        Ok(())
    }

    pub fn is_refuted(&self) -> bool {
        !self.ok
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::sat::formula::Var;

    fn lit(i: i32) -> Lit {
        Var::unidx((i.abs() - 1) as usize).lit(i < 0)
    }

    fn clause(ids: &[i32]) -> Vec<Lit> {
        ids.iter().map(|&i| lit(i)).collect()
    }

    #[test]
    fn test_accepts_rup_addition() {
        let mut checker = OnlineChecker::new();
        checker.add_axiom(&clause(&[1, 2]));
        checker.add_axiom(&clause(&[1, -2]));

        // (x1) follows by resolution and is RUP
        assert!(checker.add_checked(&clause(&[1])).is_ok());
    }

    #[test]
    fn test_rejects_unsupported_addition() {
        let mut checker = OnlineChecker::new();
        checker.add_axiom(&clause(&[1, 2]));

        assert!(checker.add_checked(&clause(&[2])).is_err());
    }

    #[test]
    fn test_accepts_rat_addition() {
        let mut checker = OnlineChecker::new();
        checker.add_axiom(&clause(&[1, 2]));
        checker.add_axiom(&clause(&[-1, 3]));

        // (x3 ∨ ¬x2) is not RUP, but it is RAT on x3: no clause contains
        // ¬x3, so there are no resolvents to check.
        assert!(checker.add_checked(&clause(&[3, -2])).is_ok());
    }

    #[test]
    fn test_refutation_roundtrip() {
        let mut checker = OnlineChecker::new();
        checker.add_axiom(&clause(&[1, 2]));
        checker.add_axiom(&clause(&[1, -2]));
        checker.add_axiom(&clause(&[-1, 2]));
        checker.add_axiom(&clause(&[-1, -2]));

        assert!(checker.add_checked(&clause(&[1])).is_ok());
        assert!(checker.add_checked(&clause(&[])).is_ok());
        assert!(checker.is_refuted());
    }

    #[test]
    fn test_deletion_bookkeeping() {
        let mut checker = OnlineChecker::new();
        checker.add_axiom(&clause(&[1, 2, 3]));
        assert!(checker.delete(&clause(&[3, 2, 1])).is_ok());
        assert!(checker.delete(&clause(&[1, 2, 3])).is_err());
    }
}
