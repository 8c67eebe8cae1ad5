use crate::sat::formula::Lit;
use crate::sat::formula::assignment::Assignment;
use crate::sat::formula::clause::{ClauseAllocator, ClauseRef};


/// Cache of the implications undone by the latest backjump. Right after
/// the jump most of them are still forced by the very same reasons, so
/// the next propagation replays them directly instead of rediscovering
/// them through the watch lists. Every entry is re-validated against the
/// current assignment before it is replayed; the cache must be dropped
/// whenever a clause may have been freed or moved.
pub struct TrailSaver {
    saved: Vec<(Lit, ClauseRef)>, // newest first
    pub replayed: u64,
}

impl TrailSaver {
    pub fn new() -> Self {
        TrailSaver {
            saved: Vec::new(),
            replayed: 0,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.saved.is_empty()
    }

    pub fn clear(&mut self) {
        self.saved.clear();
    }

    #[inline]
    pub fn save(&mut self, lit: Lit, reason: Option<ClauseRef>) {
        // Decisions are not replayable; implications are.
        if let Some(cr) = reason {
            self.saved.push((lit, cr));
        }
    }

    pub fn replay(&mut self, ca: &ClauseAllocator, assigns: &mut Assignment) {
        for &(lit, cr) in self.saved.iter().rev() {
            if !assigns.is_undef(lit.var()) || ca.is_deleted(cr) {
                continue;
            }

            if Self::still_forces(ca, assigns, cr, lit) {
                assigns.assign_lit(lit, Some(cr));
                self.replayed += 1;
            }
        }
        self.saved.clear();
    }

    // The saved reason still propagates `lit`: the clause leads with it
    // and every other literal is false.
    fn still_forces(ca: &ClauseAllocator, assigns: &Assignment, cr: ClauseRef, lit: Lit) -> bool {
        let c = ca.view(cr);
        if c.head() != lit {
            return false;
        }
        c.lits()[1..].iter().all(|&l| assigns.is_assigned_neg(l))
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::sat::formula::Var;
    use crate::sat::formula::assignment::GROUND_LEVEL;
    use crate::sat::formula::clause::ClauseHeader;

    #[test]
    fn test_replay_reuses_reason() {
        let mut assigns = Assignment::new();
        let x = assigns.new_var();
        let y = assigns.new_var();
        let z = assigns.new_var();

        let mut ca = ClauseAllocator::new_empty();
        // (¬x ∨ ¬y ∨ z)
        let lits = vec![z.pos_lit(), x.neg_lit(), y.neg_lit()];
        let (_, cr) = ca.alloc(&lits, ClauseHeader::Clause { abstraction: None });

        assigns.new_decision_level();
        assigns.assign_lit(x.pos_lit(), None);
        assigns.new_decision_level();
        assigns.assign_lit(y.pos_lit(), None);
        assigns.assign_lit(z.pos_lit(), Some(cr));

        let mut saver = TrailSaver::new();
        assigns.rewind_until_level(GROUND_LEVEL, |_, lit, reason| saver.save(lit, reason));

        // Re-create the context the implication depends on; the decision
        // itself is made afresh.
        assigns.new_decision_level();
        assigns.assign_lit(x.pos_lit(), None);
        assigns.assign_lit(y.pos_lit(), None);

        saver.replay(&ca, &mut assigns);
        assert!(assigns.is_assigned_pos(z.pos_lit()));
        assert_eq!(assigns.vardata_of(z).reason, Some(cr));
        assert_eq!(saver.replayed, 1);
        assert!(saver.is_empty());
    }

    #[test]
    fn test_replay_skips_stale_reason() {
        let mut assigns = Assignment::new();
        let x = assigns.new_var();
        let y = assigns.new_var();

        let mut ca = ClauseAllocator::new_empty();
        let lits = vec![y.pos_lit(), x.neg_lit()];
        let (_, cr) = ca.alloc(&lits, ClauseHeader::Clause { abstraction: None });

        assigns.new_decision_level();
        assigns.assign_lit(x.pos_lit(), None);
        assigns.assign_lit(y.pos_lit(), Some(cr));

        let mut saver = TrailSaver::new();
        assigns.rewind_until_level(GROUND_LEVEL, |_, lit, reason| saver.save(lit, reason));

        // x stays unassigned this time; the implication must not replay.
        saver.replay(&ca, &mut assigns);
        assert!(assigns.is_undef(y));
        assert_eq!(saver.replayed, 0);
    }
}
