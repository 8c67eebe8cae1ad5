use std::{cmp, fmt};
use super::{LBool, Lit, Var};
use super::clause::{ClauseAllocator, ClauseGC, ClauseRef};


#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Debug)]
pub struct DecisionLevel(usize);

pub const GROUND_LEVEL: DecisionLevel = DecisionLevel(0);

impl DecisionLevel {
    #[inline]
    pub fn offset_from_ground(self) -> usize {
        self.0
    }

    #[inline]
    pub fn is_ground(self) -> bool {
        self.0 == 0
    }

    // The next level down; used by chronological backtracking.
    #[inline]
    pub fn prev(self) -> DecisionLevel {
        DecisionLevel(self.0.saturating_sub(1))
    }
}


pub struct VarData {
    pub reason: Option<ClauseRef>,
    pub level: DecisionLevel,
}


struct VarLine {
    value: LBool, // value of the positive literal
    vd: VarData,
}


/// Tri-valued assignment vector together with the trail, the per-level
/// trail index and the propagation queue head.
pub struct Assignment {
    lines: Vec<VarLine>,
    free_vars: Vec<Var>,
    trail: Vec<Lit>,
    lim: Vec<usize>,
    qhead: usize,
}

impl Assignment {
    pub fn new() -> Assignment {
        Assignment {
            lines: Vec::new(),
            free_vars: Vec::new(),
            trail: Vec::new(),
            lim: Vec::new(),
            qhead: 0,
        }
    }


    #[inline]
    pub fn number_of_vars(&self) -> usize {
        self.lines.len()
    }

    #[inline]
    pub fn number_of_assigns(&self) -> usize {
        self.trail.len()
    }

    #[inline]
    pub fn number_of_ground_assigns(&self) -> usize {
        match self.lim.first() {
            Some(&lim) => lim,
            None => self.trail.len(),
        }
    }


    pub fn new_var(&mut self) -> Var {
        let line = VarLine {
            value: LBool::Undef,
            vd: VarData {
                reason: None,
                level: GROUND_LEVEL,
            },
        };

        match self.free_vars.pop() {
            Some(var) => {
                self.lines[var.index()] = line;
                var
            }

            None => {
                self.lines.push(line);
                Var::from_index(self.lines.len() - 1)
            }
        }
    }

    pub fn free_var(&mut self, v: Var) {
        self.free_vars.push(v);
    }


    #[inline]
    pub fn current_level(&self) -> DecisionLevel {
        DecisionLevel(self.lim.len())
    }

    #[inline]
    pub fn is_ground_level(&self) -> bool {
        self.lim.is_empty()
    }

    #[inline]
    pub fn new_decision_level(&mut self) {
        self.lim.push(self.trail.len());
    }


    #[inline]
    pub fn assign_lit(&mut self, lit: Lit, reason: Option<ClauseRef>) {
        let level = DecisionLevel(self.lim.len());
        let line = &mut self.lines[lit.var_index()];

        assert!(line.value.is_undef());
        line.value = LBool::from_bool(!lit.sign());
        line.vd.level = level;
        line.vd.reason = reason;
        self.trail.push(lit);
    }

    // Unwinds the trail down to `target_level`, invoking `f` for every
    // removed literal with the level it was assigned at and its reason.
    // Literals are reported newest first.
    #[inline]
    pub fn rewind_until_level<F>(&mut self, DecisionLevel(target_level): DecisionLevel, mut f: F)
    where
        F: FnMut(DecisionLevel, Lit, Option<ClauseRef>),
    {
        while self.lim.len() > target_level {
            let level = self.lim.len();
            let bottom = self.lim.pop().unwrap();
            while self.trail.len() > bottom {
                let lit = self.trail.pop().unwrap();
                let line = &mut self.lines[lit.var_index()];

                f(DecisionLevel(level), lit, line.vd.reason);

                line.value = LBool::Undef;
                line.vd.reason = None;
            }
        }

        self.qhead = cmp::min(self.qhead, self.trail.len());
    }


    #[inline]
    pub fn dequeue_all(&mut self) {
        self.qhead = self.trail.len()
    }

    #[inline]
    pub fn dequeue(&mut self) -> Option<Lit> {
        if self.qhead < self.trail.len() {
            let p = self.trail[self.qhead];
            self.qhead += 1;
            Some(p)
        } else {
            None
        }
    }

    #[inline]
    pub fn assign_at(&self, index: usize) -> Lit {
        self.trail[index]
    }

    #[inline]
    pub fn trail(&self) -> &[Lit] {
        &self.trail
    }

    #[inline]
    pub fn trail_above(&self, DecisionLevel(level): DecisionLevel) -> &[Lit] {
        if self.lim.len() > level {
            &self.trail[self.lim[level]..]
        } else {
            &[]
        }
    }


    #[inline]
    pub fn is_undef(&self, var: Var) -> bool {
        self.lines[var.index()].value.is_undef()
    }

    #[inline]
    pub fn of_var(&self, var: Var) -> LBool {
        self.lines[var.index()].value
    }

    #[inline]
    pub fn of_lit(&self, lit: Lit) -> LBool {
        let value = self.lines[lit.var_index()].value;
        if lit.sign() {
            !value
        } else {
            value
        }
    }

    #[inline]
    pub fn is_assigned_pos(&self, lit: Lit) -> bool {
        self.of_lit(lit).is_true()
    }

    #[inline]
    pub fn is_assigned_neg(&self, lit: Lit) -> bool {
        self.of_lit(lit).is_false()
    }

    // Assignment data of a falsified literal; used during conflict
    // analysis where every inspected literal is false.
    #[inline]
    pub fn vardata(&self, lit: Lit) -> &VarData {
        let line = &self.lines[lit.var_index()];
        debug_assert!(self.of_lit(lit).is_false());
        &line.vd
    }

    #[inline]
    pub fn vardata_of(&self, var: Var) -> &VarData {
        &self.lines[var.index()].vd
    }


    pub fn gc(&mut self, gc: &mut ClauseGC) {
        for &lit in self.trail.iter() {
            let reason = &mut self.lines[lit.var_index()].vd.reason;
            *reason = reason.and_then(|cr| gc.relocate(cr));
        }
    }

    pub fn is_locked(&self, ca: &ClauseAllocator, cr: ClauseRef) -> bool {
        let lit = ca.view(cr).head();
        let line = &self.lines[lit.var_index()];
        self.of_lit(lit).is_true() && line.vd.reason == Some(cr)
    }
}

impl fmt::Debug for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for level in 0..self.lim.len() + 1 {
            let l = if level > 0 { self.lim[level - 1] } else { 0 };
            let r = if level < self.lim.len() {
                self.lim[level]
            } else {
                self.trail.len()
            };

            if r > l {
                write!(f, "[{}:", level)?;
                for lit in self.trail[l..r].iter() {
                    write!(f, " {:?}", lit)?;
                }
                write!(f, " ]")?;
            }
        }

        Ok(())
    }
}


pub fn progress_estimate(assigns: &Assignment) -> f64 {
    let f = 1.0 / (assigns.number_of_vars() as f64);
    let mut progress = 0.0;
    let mut factor = f;

    let levels = assigns.lim.len();
    for level in 0..levels + 1 {
        let l = if level == 0 { 0 } else { assigns.lim[level - 1] };
        let r = if level == levels {
            assigns.trail.len()
        } else {
            assigns.lim[level]
        };
        progress += factor * ((r - l) as f64);
        factor *= f;
    }
    progress
}


pub fn try_assign_lit(assigns: &mut Assignment, p: Lit, from: Option<ClauseRef>) -> bool {
    match assigns.of_lit(p) {
        LBool::True => true,
        LBool::False => false,
        LBool::Undef => {
            assigns.assign_lit(p, from);
            true
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trail_levels() {
        let mut assigns = Assignment::new();
        let x = assigns.new_var();
        let y = assigns.new_var();
        let z = assigns.new_var();

        assigns.assign_lit(x.pos_lit(), None);
        assert_eq!(assigns.number_of_ground_assigns(), 1);

        assigns.new_decision_level();
        assigns.assign_lit(y.neg_lit(), None);
        assigns.new_decision_level();
        assigns.assign_lit(z.pos_lit(), None);

        assert_eq!(assigns.current_level(), DecisionLevel(2));
        assert!(assigns.is_assigned_pos(x.pos_lit()));
        assert!(assigns.is_assigned_neg(y.pos_lit()));
        assert_eq!(assigns.number_of_assigns(), 3);

        let mut removed = Vec::new();
        assigns.rewind_until_level(GROUND_LEVEL, |level, lit, _| {
            removed.push((level.offset_from_ground(), lit));
        });
        assert_eq!(removed, vec![(2, z.pos_lit()), (1, y.neg_lit())]);
        assert!(assigns.is_undef(y));
        assert!(assigns.is_undef(z));
        assert!(assigns.is_assigned_pos(x.pos_lit()));
    }

    #[test]
    fn test_queue() {
        let mut assigns = Assignment::new();
        let x = assigns.new_var();
        let y = assigns.new_var();

        assigns.assign_lit(x.pos_lit(), None);
        assigns.assign_lit(y.pos_lit(), None);
        assert_eq!(assigns.dequeue(), Some(x.pos_lit()));
        assert_eq!(assigns.dequeue(), Some(y.pos_lit()));
        assert_eq!(assigns.dequeue(), None);
    }
}
