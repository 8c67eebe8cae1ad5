use std::cmp::Ordering;
use crate::sat::formula::{assignment::Assignment, clause::*, util::*, Lit};


pub struct ClauseDBSettings {
    pub remove_satisfied: bool, // Indicates whether possibly inefficient linear scan for satisfied clauses should be performed in 'simplify'.
    pub clause_decay: f64,
    pub core_lbd_cut: u32,        // LBD at or below which a learnt clause is kept forever.
    pub midtier_lbd_cut: u32,     // LBD at or below which a learnt clause goes to the middle tier.
    pub midtier_unused_window: u64, // Conflicts a middle-tier clause may go unused before demotion.
    pub reduce_first: u64,        // Conflicts before the first database reduction.
    pub reduce_inc: u64,          // Increment of the reduction interval.
}

impl Default for ClauseDBSettings {
    fn default() -> ClauseDBSettings {
        ClauseDBSettings {
            remove_satisfied: true,
            clause_decay: 0.999,
            core_lbd_cut: 2,
            midtier_lbd_cut: 6,
            midtier_unused_window: 30000,
            reduce_first: 2000,
            reduce_inc: 300,
        }
    }
}


/// Database maintenance event, reported to the caller so that watch
/// lists and the proof log stay in sync with the arena.
pub enum DbEvent<'a> {
    Deleted(&'a Clause),
    Shrunk { old: &'a [Lit], new: &'a [Lit] },
}


#[derive(Clone, Copy, Debug, Default)]
pub struct Stats {
    pub num_clauses: usize,
    pub num_learnts: usize,
    pub clauses_literals: u64,
    pub learnts_literals: u64,
}

impl Stats {
    fn add(&mut self, clause: &Clause) {
        if clause.is_learnt() {
            self.num_learnts += 1;
            self.learnts_literals += clause.len() as u64;
        } else {
            self.num_clauses += 1;
            self.clauses_literals += clause.len() as u64;
        }
    }

    fn del(&mut self, clause: &Clause) {
        if clause.is_learnt() {
            self.num_learnts -= 1;
            self.learnts_literals -= clause.len() as u64;
        } else {
            self.num_clauses -= 1;
            self.clauses_literals -= clause.len() as u64;
        }
    }
}


/// Clause lists plus the tier bookkeeping of the learnt database.
/// Original clauses are never tiered; every learnt clause carries its
/// tier in the arena header, so a single list suffices and tier moves
/// are plain header updates.
pub struct ClauseDB {
    pub settings: ClauseDBSettings,
    cla_inc: f64,            // Amount to bump next clause with.
    clauses: Vec<ClauseRef>, // List of problem clauses.
    learnts: Vec<ClauseRef>, // List of learnt clauses of all tiers.
    level_stamp: Vec<u64>,
    stamp: u64,
    pub stats: Stats,
}

impl ClauseDB {
    pub fn new(settings: ClauseDBSettings) -> ClauseDB {
        ClauseDB {
            settings,
            cla_inc: 1.0,
            clauses: Vec::new(),
            learnts: Vec::new(),
            level_stamp: Vec::new(),
            stamp: 0,
            stats: Stats::default(),
        }
    }

    pub fn tier_for(&self, lbd: u32) -> Tier {
        if lbd <= self.settings.core_lbd_cut {
            Tier::Core
        } else if lbd <= self.settings.midtier_lbd_cut {
            Tier::Midtier
        } else {
            Tier::Local
        }
    }

    pub fn add_clause(&mut self, ca: &mut ClauseAllocator, literals: &[Lit]) -> ClauseRef {
        let header = ClauseHeader::Clause {
            abstraction: if ca.extra_clause_field {
                Some(calc_abstraction(literals))
            } else {
                None
            },
        };
        let (c, cr) = ca.alloc(literals, header);
        self.stats.add(c);
        self.clauses.push(cr);
        cr
    }

    pub fn learn_clause(
        &mut self,
        ca: &mut ClauseAllocator,
        literals: &[Lit],
        lbd: u32,
        now: u64,
    ) -> ClauseRef {
        let header = ClauseHeader::Learnt {
            activity: 0.0,
            lbd,
            tier: self.tier_for(lbd),
            touched_at: now,
        };
        let (c, cr) = ca.alloc(literals, header);
        self.stats.add(c);
        self.learnts.push(cr);
        self.bump_activity(ca, cr);
        cr
    }

    pub fn remove_clause(&mut self, ca: &mut ClauseAllocator, cr: ClauseRef) {
        self.stats.del(ca.view(cr));
        ca.free(cr);
    }

    pub fn edit_clause<F: FnOnce(&mut Clause)>(
        &mut self,
        ca: &mut ClauseAllocator,
        cr: ClauseRef,
        f: F,
    ) {
        let c = ca.edit(cr);
        self.stats.del(c);
        f(c);
        self.stats.add(c);
    }

    pub fn bump_activity(&mut self, ca: &mut ClauseAllocator, cr: ClauseRef) {
        let new = {
            let c = ca.edit(cr);
            if let ClauseHeader::Learnt {
                ref mut activity, ..
            } = c.header
            {
                let new = *activity as f64 + self.cla_inc;
                *activity = new as f32;
                new
            } else {
                return;
            }
        };

        if new > 1e20 {
            self.cla_inc *= 1e-20;
            for &cri in self.learnts.iter() {
                let c = ca.edit(cri);
                if let ClauseHeader::Learnt {
                    ref mut activity, ..
                } = c.header
                {
                    *activity = ((*activity as f64) * 1e-20) as f32;
                }
            }
        }
    }

    pub fn decay_activity(&mut self) {
        self.cla_inc *= 1.0 / self.settings.clause_decay;
    }

    fn compute_lbd(&mut self, assigns: &Assignment, lits: &[Lit]) -> u32 {
        if self.level_stamp.len() <= assigns.number_of_vars() {
            self.level_stamp.resize(assigns.number_of_vars() + 1, 0);
        }

        self.stamp += 1;
        let mut distinct = 0;
        for &lit in lits {
            let level = assigns.vardata_of(lit.var()).level.offset_from_ground();
            if self.level_stamp[level] != self.stamp {
                self.level_stamp[level] = self.stamp;
                distinct += 1;
            }
        }
        distinct
    }

    // A learnt clause took part in conflict analysis: refresh its use
    // stamp, re-evaluate its LBD and promote it when the LBD improved
    // past a tier bound. Clauses never move down here.
    pub fn clause_used(
        &mut self,
        ca: &mut ClauseAllocator,
        assigns: &Assignment,
        cr: ClauseRef,
        now: u64,
    ) {
        self.bump_activity(ca, cr);

        if !ca.view(cr).is_learnt() {
            return;
        }

        let new_lbd = self.compute_lbd(assigns, ca.view(cr).lits());
        let new_tier = self.tier_for(new_lbd);
        let c = ca.edit(cr);
        if let ClauseHeader::Learnt {
            ref mut lbd,
            ref mut tier,
            ref mut touched_at,
            ..
        } = c.header
        {
            *touched_at = now;
            if new_lbd < *lbd {
                *lbd = new_lbd;
                if new_tier > *tier {
                    *tier = new_tier;
                }
            }
        }
    }

    // Description:
    //   Demote middle-tier clauses that went unused for too long, then
    //   free the worse half of the local tier ordered by (LBD, activity).
    //   Clauses locked as reasons and binary clauses survive regardless.
    pub fn reduce<F: FnMut(&Clause)>(
        &mut self,
        ca: &mut ClauseAllocator,
        assigns: &Assignment,
        now: u64,
        mut notify: F,
    ) -> usize {
        let window = self.settings.midtier_unused_window;
        let mut local: Vec<ClauseRef> = Vec::new();

        self.learnts.retain(|&cr| {
            if ca.is_deleted(cr) {
                return false;
            }

            let c = ca.edit(cr);
            if let ClauseHeader::Learnt {
                ref mut tier,
                touched_at,
                ..
            } = c.header
            {
                if *tier == Tier::Midtier && now.saturating_sub(touched_at) >= window {
                    *tier = Tier::Local;
                }
                if *tier == Tier::Local {
                    local.push(cr);
                }
            }
            true
        });

        local.sort_by(|&rx, &ry| {
            let x = ca.view(rx);
            let y = ca.view(ry);
            match x.header.lbd().cmp(&y.header.lbd()) {
                Ordering::Equal => y
                    .header
                    .activity()
                    .partial_cmp(&x.header.activity())
                    .unwrap_or(Ordering::Equal),
                ord => ord,
            }
        });

        let keep_limit = local.len() / 2;
        let mut freed = 0;
        for &cr in local[keep_limit..].iter() {
            let remove = {
                let c = ca.view(cr);
                c.len() > 2 && !assigns.is_locked(ca, cr)
            };
            if remove {
                notify(ca.view(cr));
                self.stats.del(ca.view(cr));
                ca.free(cr);
                freed += 1;
            }
        }

        self.learnts.retain(|&cr| !ca.is_deleted(cr));
        freed
    }

    fn retain_clause<F: FnMut(DbEvent)>(
        stats: &mut Stats,
        ca: &mut ClauseAllocator,
        assigns: &Assignment,
        notify: &mut F,
        cr: ClauseRef,
    ) -> bool {
        if ca.is_deleted(cr) {
            false
        } else if satisfied_with_assignment(ca.view(cr).lits(), assigns) {
            notify(DbEvent::Deleted(ca.view(cr)));
            stats.del(ca.view(cr));
            ca.free(cr);
            false
        } else {
            let clause = ca.edit(cr);
            debug_assert!({
                let (c0, c1) = clause.head_pair();
                assigns.is_undef(c0.var()) && assigns.is_undef(c1.var())
            });

            let had = clause.len();
            if clause.lits()[2..]
                .iter()
                .any(|&l| assigns.is_assigned_neg(l))
            {
                let old = clause.lits().to_vec();
                stats.del(clause);
                clause.retain_suffix(2, |l| !assigns.is_assigned_neg(l));
                clause.update_abstraction();
                stats.add(clause);
                debug_assert!(clause.len() < had);
                notify(DbEvent::Shrunk {
                    old: &old,
                    new: clause.lits(),
                });
            }
            true
        }
    }

    // Removes clauses satisfied at the ground level and strips falsified
    // literals from the survivors.
    pub fn remove_satisfied<F: FnMut(DbEvent)>(
        &mut self,
        ca: &mut ClauseAllocator,
        assigns: &Assignment,
        mut notify: F,
    ) {
        let stats = &mut self.stats;
        self.learnts.retain(|&cr| {
            Self::retain_clause(stats, ca, assigns, &mut notify, cr)
        });

        if self.settings.remove_satisfied {
            // Can be turned off.
            self.clauses.retain(|&cr| {
                Self::retain_clause(stats, ca, assigns, &mut notify, cr)
            });
        }
    }

    pub fn original_clauses(&self) -> &[ClauseRef] {
        &self.clauses
    }

    pub fn gc(&mut self, gc: &mut ClauseGC) {
        let mut j = 0;
        for i in 0..self.learnts.len() {
            if let Some(cr) = gc.relocate(self.learnts[i]) {
                self.learnts[j] = cr;
                j += 1;
            }
        }
        self.learnts.truncate(j);

        let mut j = 0;
        for i in 0..self.clauses.len() {
            if let Some(cr) = gc.relocate(self.clauses[i]) {
                self.clauses[j] = cr;
                j += 1;
            }
        }
        self.clauses.truncate(j);
    }
}
