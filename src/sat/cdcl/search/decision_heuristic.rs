use crate::sat::formula::{Lit, Var, VarHeap, VarMap};
use crate::sat::formula::assignment::Assignment;
use super::random::Random;


#[derive(PartialEq, Eq)]
pub enum PhaseSaving {
    None,
    Limited,
    Full,
}


pub struct DecisionHeuristicSettings {
    pub var_decay: f64,
    pub random_seed: f64,
    pub random_var_freq: f64,
    pub phase_saving: PhaseSaving, // Controls the level of phase saving
    pub rnd_pol: bool,             // Use random polarities for branching heuristics.
    pub rnd_init_act: bool,        // Initialize variable activities with a small random value.
    pub distance_conflicts: u64,   // Rank variables by conflict history for this many conflicts (0 disables).
}

impl Default for DecisionHeuristicSettings {
    fn default() -> Self {
        DecisionHeuristicSettings {
            var_decay: 0.95,
            random_seed: 91648253.0,
            random_var_freq: 0.0,
            phase_saving: PhaseSaving::Full,
            rnd_pol: false,
            rnd_init_act: false,
            distance_conflicts: 50000,
        }
    }
}


#[derive(Debug)]
struct VarLine {
    polarity: bool,         // The preferred polarity of each variable.
    user_pol: Option<bool>, // The users preferred polarity of each variable.
    decision: bool, // Declares if a variable is eligible for selection in the decision heuristic.
}


/// Variable order for branching. Activity works the classic way: bumped
/// multiplicatively on every conflict involvement and decayed between
/// conflicts. During the opening phase of the search the heap is keyed
/// by a plain conflict-history counter instead, which favours variables
/// that appeared in recent conflicts regardless of their long-term
/// activity.
pub struct DecisionHeuristic {
    settings: DecisionHeuristicSettings,
    var_inc: f64, // Amount to bump next variable with.
    rand: Random,
    var: VarMap<VarLine>,
    activity: VarMap<f64>,
    conflicted: VarMap<f64>, // Conflict-history counters for the opening phase.
    queue: VarHeap, // A priority queue of variables ordered with respect to the active score.
    use_distance: bool,

    pub dec_vars: usize,
    pub rnd_decisions: u64,
}

impl DecisionHeuristic {
    pub fn new(settings: DecisionHeuristicSettings) -> DecisionHeuristic {
        let seed = settings.random_seed;
        let use_distance = settings.distance_conflicts > 0;
        DecisionHeuristic {
            settings,
            var_inc: 1.0,
            rand: Random::new(seed),
            var: VarMap::new(),
            activity: VarMap::new(),
            conflicted: VarMap::new(),
            queue: VarHeap::new(),
            use_distance,
            dec_vars: 0,
            rnd_decisions: 0,
        }
    }

    pub fn init_var(&mut self, v: Var, upol: Option<bool>, dvar: bool) {
        self.activity.insert(
            &v,
            if self.settings.rnd_init_act {
                self.rand.drand() * 0.00001
            } else {
                0.0
            },
        );
        self.conflicted.insert(&v, 0.0);
        self.var.insert(
            &v,
            VarLine {
                polarity: true,
                user_pol: upol,
                decision: false,
            },
        );
        self.set_decision_var(v, dvar);
    }

    pub fn set_decision_var(&mut self, v: Var, b: bool) {
        let changed = {
            let ln = &mut self.var[&v];
            if b != ln.decision {
                ln.decision = b;
                true
            } else {
                false
            }
        };

        if changed {
            if b {
                self.dec_vars += 1;
                let score = if self.use_distance {
                    &self.conflicted
                } else {
                    &self.activity
                };
                self.queue.insert(v, |a, b| score[a] > score[b]);
            } else {
                self.dec_vars -= 1;
            }
        }
    }

    pub fn cancel(&mut self, lit: Lit, top_level: bool) {
        let decision = {
            let ln = &mut self.var[&lit.var()];
            match self.settings.phase_saving {
                PhaseSaving::Full => {
                    ln.polarity = lit.sign();
                }
                PhaseSaving::Limited if top_level => {
                    ln.polarity = lit.sign();
                }
                _ => {}
            }
            ln.decision
        };

        if decision {
            let score = if self.use_distance {
                &self.conflicted
            } else {
                &self.activity
            };
            self.queue.insert(lit.var(), |a, b| score[a] > score[b]);
        }
    }

    pub fn bump_activity(&mut self, v: Var) {
        self.conflicted[&v] += 1.0;

        let new = self.activity[&v] + self.var_inc;
        if new > 1e100 {
            self.var_inc *= 1e-100;
            for (_, act) in self.activity.iter_mut() {
                *act *= 1e-100;
            }
            self.activity[&v] = new * 1e-100;
        } else {
            self.activity[&v] = new;
        }

        let score = if self.use_distance {
            &self.conflicted
        } else {
            &self.activity
        };
        self.queue.update(&v, |a, b| score[a] > score[b]);
    }

    pub fn decay_activity(&mut self) {
        self.var_inc *= 1.0 / self.settings.var_decay;
    }

    // Called once per conflict; flips the heap from conflict-history
    // order to activity order when the opening phase is over.
    pub fn after_conflict(&mut self, conflicts: u64, assigns: &Assignment) {
        if self.use_distance && conflicts >= self.settings.distance_conflicts {
            self.use_distance = false;
            self.rebuild_order_heap(assigns);
        }
    }

    // The value the variable would be branched to right now.
    pub fn preferred_value(&self, v: Var) -> bool {
        let ln = &self.var[&v];
        match ln.user_pol {
            Some(sign) => !sign,
            None => !ln.polarity,
        }
    }

    // Overwrites the saved phases with an assignment found elsewhere
    // (the local-search helper); the formal search state is untouched.
    pub fn import_phases(&mut self, model: &VarMap<bool>) {
        for (v, &value) in model.iter() {
            if self.var.contains_key(&v) {
                self.var[&v].polarity = !value;
            }
        }
    }

    pub fn rebuild_order_heap(&mut self, assigns: &Assignment) {
        let mut tmp = Vec::with_capacity(self.queue.len());
        for (v, vl) in self.var.iter() {
            if vl.decision && assigns.is_undef(v) {
                tmp.push(v);
            }
        }

        let score = if self.use_distance {
            &self.conflicted
        } else {
            &self.activity
        };
        self.queue.heapify_from(tmp, |a, b| score[a] > score[b]);
    }

    fn pick_branch_var(&mut self, assigns: &Assignment) -> Option<Var> {
        // Random decision:
        if self.rand.chance(self.settings.random_var_freq) && !self.queue.is_empty() {
            let v = self.queue[self.rand.irand(self.queue.len())];
            if assigns.is_undef(v) && self.var[&v].decision {
                self.rnd_decisions += 1;
                return Some(v);
            }
        }

        // Score based decision:
        loop {
            let popped = {
                let score = if self.use_distance {
                    &self.conflicted
                } else {
                    &self.activity
                };
                self.queue.pop(|a, b| score[a] > score[b])
            };
            match popped {
                None => return None,
                Some(v) => {
                    if assigns.is_undef(v) && self.var[&v].decision {
                        return Some(v);
                    }
                }
            }
        }
    }

    pub fn pick_branch_lit(&mut self, assigns: &Assignment) -> Option<Lit> {
        // Choose polarity based on different polarity modes (global or per-variable):
        self.pick_branch_var(assigns).map(|v| {
            let ln = &self.var[&v];
            let s = match ln.user_pol {
                Some(s) => s,
                None if self.settings.rnd_pol => self.rand.chance(0.5),
                None => ln.polarity,
            };
            v.lit(s)
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::sat::formula::assignment::Assignment;

    fn setup(n: usize) -> (DecisionHeuristic, Assignment, Vec<Var>) {
        let mut heur = DecisionHeuristic::new(DecisionHeuristicSettings {
            distance_conflicts: 0,
            ..Default::default()
        });
        let mut assigns = Assignment::new();
        let vars: Vec<Var> = (0..n)
            .map(|_| {
                let v = assigns.new_var();
                heur.init_var(v, None, true);
                v
            })
            .collect();
        (heur, assigns, vars)
    }

    #[test]
    fn test_picks_most_active() {
        let (mut heur, assigns, vars) = setup(4);
        heur.bump_activity(vars[2]);
        heur.bump_activity(vars[2]);
        heur.bump_activity(vars[1]);

        let lit = heur.pick_branch_lit(&assigns).unwrap();
        assert_eq!(lit.var(), vars[2]);
    }

    #[test]
    fn test_phase_saving() {
        let (mut heur, mut assigns, vars) = setup(2);
        assigns.new_decision_level();
        assigns.assign_lit(vars[0].pos_lit(), None);
        assigns.rewind_until_level(
            crate::sat::formula::assignment::GROUND_LEVEL,
            |_, _, _| {},
        );
        heur.cancel(vars[0].pos_lit(), true);

        heur.bump_activity(vars[0]);
        let lit = heur.pick_branch_lit(&assigns).unwrap();
        assert_eq!(lit, vars[0].pos_lit());
    }

    #[test]
    fn test_distance_phase_switch() {
        let mut heur = DecisionHeuristic::new(DecisionHeuristicSettings {
            distance_conflicts: 10,
            ..Default::default()
        });
        let mut assigns = Assignment::new();
        for _ in 0..3 {
            let v = assigns.new_var();
            heur.init_var(v, None, true);
        }
        assert!(heur.use_distance);
        heur.after_conflict(10, &assigns);
        assert!(!heur.use_distance);
    }
}
