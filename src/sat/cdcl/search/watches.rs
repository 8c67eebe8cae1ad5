use std::mem;
use crate::sat::formula::{Lit, LitVec, Var};
use crate::sat::formula::assignment::Assignment;
use crate::sat::formula::clause::*;


#[derive(Clone, Copy, Debug)]
struct Watcher {
    cref: ClauseRef,
    blocker: Lit,
}


#[derive(Default, Debug)]
struct WatchesLine {
    watchers: Vec<Watcher>,
    dirty: bool,
}


/// Watched-literal index. `watches[lit]` lists the clauses to inspect
/// when `lit` becomes true; entries referencing freed clauses are swept
/// out lazily via the per-line dirty bit.
pub struct Watches {
    watches: LitVec<WatchesLine>,
    pub propagations: u64,
    pub inspections: u64,
}

impl Watches {
    pub fn new() -> Self {
        Watches {
            watches: LitVec::new(),
            propagations: 0,
            inspections: 0,
        }
    }

    pub fn init_var(&mut self, v: Var) {
        self.watches.init(v.pos_lit());
        self.watches.init(v.neg_lit());
    }

    pub fn try_clear_var(&mut self, _: Var) {}

    pub fn watch_clause(&mut self, c: &Clause, cr: ClauseRef) {
        let (c0, c1) = c.head_pair();
        self.watches[!c0].watchers.push(Watcher {
            cref: cr,
            blocker: c1,
        });
        self.watches[!c1].watchers.push(Watcher {
            cref: cr,
            blocker: c0,
        });
    }

    pub fn unwatch_clause_strict(&mut self, c: &Clause, cr: ClauseRef) {
        let (c0, c1) = c.head_pair();
        self.watches[!c0].watchers.retain(|w| w.cref != cr);
        self.watches[!c1].watchers.retain(|w| w.cref != cr);
    }

    pub fn unwatch_clause_lazy(&mut self, c: &Clause) {
        let (c0, c1) = c.head_pair();
        self.watches[!c0].dirty = true;
        self.watches[!c1].dirty = true;
    }

    // The other watched literal of an attached binary clause containing
    // `lit`; used by learnt-clause strengthening against binaries.
    pub fn binary_partners<F: FnMut(Lit)>(&self, ca: &ClauseAllocator, lit: Lit, mut f: F) {
        for w in self.watches[!lit].watchers.iter() {
            if !ca.is_deleted(w.cref) && ca.view(w.cref).len() == 2 {
                f(w.blocker);
            }
        }
    }

    // Description:
    //   Propagates all enqueued facts. If a conflict arises, the
    //   conflicting clause is returned.
    //
    //   Post-conditions:
    //     * the propagation queue is empty, even if there was a conflict.
    pub fn propagate(
        &mut self,
        ca: &mut ClauseAllocator,
        assigns: &mut Assignment,
    ) -> Option<ClauseRef> {
        let mut confl = None;

        while let Some(p) = assigns.dequeue() {
            self.propagations += 1;
            let false_lit = !p;

            {
                let line = &mut self.watches[p];
                if line.dirty {
                    line.watchers.retain(|w| !ca.is_deleted(w.cref));
                    line.dirty = false;
                }
            }

            let mut line = mem::take(&mut self.watches[p]);
            let mut i = 0;
            let mut j = 0;
            while i < line.watchers.len() {
                let w = line.watchers[i];
                i += 1;
                self.inspections += 1;

                if assigns.is_assigned_pos(w.blocker) {
                    line.watchers[j] = w;
                    j += 1;
                    continue;
                }

                let c = ca.edit(w.cref);
                if c.head() == false_lit {
                    c.swap(0, 1);
                }
                debug_assert_eq!(c[1], false_lit);

                // If the other watched literal is true, the clause is
                // already satisfied.
                let first = c.head();
                let cw = Watcher {
                    cref: w.cref,
                    blocker: first,
                };
                if first != w.blocker && assigns.is_assigned_pos(first) {
                    line.watchers[j] = cw;
                    j += 1;
                    continue;
                }

                // Look for a new literal to watch:
                match c.pull_literal(1, |lit| !assigns.is_assigned_neg(lit)) {
                    Some(lit) => {
                        self.watches[!lit].watchers.push(cw);
                    }

                    // No replacement found; the clause is unit under the
                    // current assignment.
                    None => {
                        line.watchers[j] = cw;
                        j += 1;

                        if assigns.is_assigned_neg(first) {
                            assigns.dequeue_all();

                            // Keep the remaining watchers:
                            while i < line.watchers.len() {
                                line.watchers[j] = line.watchers[i];
                                j += 1;
                                i += 1;
                            }

                            confl = Some(cw.cref);
                        } else {
                            assigns.assign_lit(first, Some(cw.cref));
                        }
                    }
                }
            }
            line.watchers.truncate(j);

            let slot = &mut self.watches[p];
            debug_assert!(slot.watchers.is_empty());
            line.dirty = slot.dirty;
            *slot = line;
        }

        confl
    }

    pub fn gc(&mut self, gc: &mut ClauseGC) {
        for line in self.watches.iter_mut() {
            line.dirty = false;
            let mut j = 0;
            for i in 0..line.watchers.len() {
                let mut w = line.watchers[i];
                if let Some(cr) = gc.relocate(w.cref) {
                    w.cref = cr;
                    line.watchers[j] = w;
                    j += 1;
                }
            }
            line.watchers.truncate(j);
        }
    }
}
