use crate::sat::formula::{Idx, Lit, Var, VarMap};
use super::random::Random;


#[derive(Clone, Copy, Debug)]
pub struct SlsSettings {
    pub enabled: bool,
    pub max_flips: u64,     // Flip budget of a single invocation.
    pub stall_window: u64,  // Conflicts without a fresh core clause before the helper runs.
    pub swt_threshold: i64, // Average clause weight that triggers smoothing.
    pub swt_p: f64,         // Weight kept by smoothing.
    pub swt_q: f64,         // Share of the average mixed back in.
    pub random_seed: f64,
}

impl Default for SlsSettings {
    fn default() -> Self {
        SlsSettings {
            enabled: true,
            max_flips: 1000000,
            stall_window: 30000,
            swt_threshold: 50,
            swt_p: 0.3,
            swt_q: 0.7,
            random_seed: 91648253.0,
        }
    }
}


struct SlsVar {
    occs: Vec<(usize, bool)>, // (clause index, sense the clause wants)
    neighbours: Vec<usize>,
    score: i64,
    last_flip: u64,
    unsat_appear: u32,
    cc: bool,
    in_ccd: bool,
}

struct SlsClause {
    lits: Vec<(usize, bool)>,
    sat_count: u32,
    sat_var: usize, // meaningful when sat_count == 1
    weight: i64,
}


/// Weighted local search over a snapshot of the original clauses, in the
/// style of CCAnr: greedy moves are restricted to configuration-changed
/// decreasing variables, with an aspiration pass and weighted focused
/// random walk as fallbacks, and clause weights are smoothed once their
/// average grows past a threshold. The caller imports the best found
/// assignment as branching phases only.
pub struct LocalSearch {
    settings: SlsSettings,
    vars: Vec<SlsVar>,
    clauses: Vec<SlsClause>,
    solution: Vec<bool>,
    best_solution: Vec<bool>,
    best_unsat: usize,
    unsat_clauses: Vec<usize>,
    idx_in_unsat_clauses: Vec<usize>,
    unsat_vars: Vec<usize>,
    idx_in_unsat_vars: Vec<usize>,
    ccd_vars: Vec<usize>,
    avg_clause_weight: i64,
    delta_total_weight: i64,
    step: u64,
    rand: Random,
}

impl LocalSearch {
    pub fn new<'c, I>(settings: SlsSettings, n_vars: usize, clause_iter: I, init: &[bool]) -> Self
    where
        I: Iterator<Item = &'c [Lit]>,
    {
        assert_eq!(init.len(), n_vars);

        let mut vars: Vec<SlsVar> = (0..n_vars)
            .map(|_| SlsVar {
                occs: Vec::new(),
                neighbours: Vec::new(),
                score: 0,
                last_flip: 0,
                unsat_appear: 0,
                cc: true,
                in_ccd: false,
            })
            .collect();

        let mut clauses = Vec::new();
        for lits in clause_iter {
            let ci = clauses.len();
            let mut sls_lits = Vec::with_capacity(lits.len());
            for &lit in lits {
                let v = lit.var().idx();
                let sense = !lit.sign();
                vars[v].occs.push((ci, sense));
                sls_lits.push((v, sense));
            }
            clauses.push(SlsClause {
                lits: sls_lits,
                sat_count: 0,
                sat_var: 0,
                weight: 1,
            });
        }

        // neighbourhood for configuration checking
        let mut mark = vec![usize::max_value(); n_vars];
        for (vi, var) in vars.iter_mut().enumerate() {
            mark[vi] = vi;
            var.neighbours = Vec::new();
        }
        for vi in 0..n_vars {
            let mut neighbours = Vec::new();
            let occs = vars[vi].occs.clone();
            for &(ci, _) in occs.iter() {
                for k in 0..clauses[ci].lits.len() {
                    let u = clauses[ci].lits[k].0;
                    if u != vi && mark[u] != vi {
                        mark[u] = vi;
                        neighbours.push(u);
                    }
                }
            }
            vars[vi].neighbours = neighbours;
        }

        let seed = settings.random_seed;
        let mut ls = LocalSearch {
            settings,
            vars,
            clauses,
            solution: init.to_vec(),
            best_solution: init.to_vec(),
            best_unsat: usize::max_value(),
            unsat_clauses: Vec::new(),
            idx_in_unsat_clauses: Vec::new(),
            unsat_vars: Vec::new(),
            idx_in_unsat_vars: Vec::new(),
            ccd_vars: Vec::new(),
            avg_clause_weight: 1,
            delta_total_weight: 0,
            step: 0,
            rand: Random::new(seed),
        };
        ls.initialize();
        ls
    }

    fn initialize(&mut self) {
        self.idx_in_unsat_clauses = vec![0; self.clauses.len()];
        self.idx_in_unsat_vars = vec![0; self.vars.len()];

        for ci in 0..self.clauses.len() {
            self.clauses[ci].sat_count = 0;
            for k in 0..self.clauses[ci].lits.len() {
                let (v, sense) = self.clauses[ci].lits[k];
                if self.solution[v] == sense {
                    self.clauses[ci].sat_count += 1;
                    self.clauses[ci].sat_var = v;
                }
            }
            if self.clauses[ci].sat_count == 0 {
                self.unsat_a_clause(ci);
            }
        }

        for v in 0..self.vars.len() {
            let mut score = 0;
            for &(ci, sense) in self.vars[v].occs.iter() {
                let c = &self.clauses[ci];
                if c.sat_count == 0 {
                    score += c.weight;
                } else if c.sat_count == 1 && self.solution[v] == sense {
                    score -= c.weight;
                }
            }
            let var = &mut self.vars[v];
            var.score = score;
            var.last_flip = 0;
            var.cc = true;
        }

        self.ccd_vars.clear();
        for v in 0..self.vars.len() {
            let var = &mut self.vars[v];
            var.in_ccd = var.score > 0;
            if var.in_ccd {
                self.ccd_vars.push(v);
            }
        }

        if self.unsat_clauses.len() < self.best_unsat {
            self.best_unsat = self.unsat_clauses.len();
            self.best_solution.copy_from_slice(&self.solution);
        }
    }

    /// Runs until the flip budget is spent or the snapshot is satisfied.
    /// Returns the number of clauses the best assignment leaves unsat.
    pub fn run(&mut self) -> usize {
        let max_flips = self.settings.max_flips;
        for _ in 0..max_flips {
            if self.unsat_clauses.is_empty() {
                break;
            }
            self.step += 1;
            let v = self.pick_var();
            self.flip(v);

            if self.unsat_clauses.len() < self.best_unsat {
                self.best_unsat = self.unsat_clauses.len();
                self.best_solution.copy_from_slice(&self.solution);
            }
        }
        self.best_unsat
    }

    pub fn best_phases(&self) -> VarMap<bool> {
        let mut phases = VarMap::new();
        for (i, &value) in self.best_solution.iter().enumerate() {
            phases.insert(&Var::unidx(i), value);
        }
        phases
    }

    fn pick_var(&mut self) -> usize {
        if !self.ccd_vars.is_empty() {
            let mut best = self.ccd_vars[0];
            for &v in self.ccd_vars.iter() {
                if self.better(v, best) {
                    best = v;
                }
            }
            return best;
        }

        // Aspiration: any variable of an unsatisfied clause whose score
        // beats the average clause weight may move even with cc unset.
        {
            let threshold = self.avg_clause_weight;
            let mut best = None;
            for &v in self.unsat_vars.iter() {
                match best {
                    None => {
                        if self.vars[v].score > threshold {
                            best = Some(v);
                        }
                    }
                    Some(b) => {
                        if self.better(v, b) {
                            best = Some(v);
                        }
                    }
                }
            }
            if let Some(v) = best {
                return v;
            }
        }

        // Diversification: bump the weights of everything unsatisfied and
        // walk inside a random unsatisfied clause.
        self.update_clause_weights();

        let pick = self.rand.irand(self.unsat_clauses.len());
        let ci = self.unsat_clauses[pick];
        let c = &self.clauses[ci];
        let mut best = c.lits[0].0;
        for k in 1..c.lits.len() {
            let v = c.lits[k].0;
            if self.vars[v].score > self.vars[best].score
                || (self.vars[v].score == self.vars[best].score
                    && self.vars[v].last_flip < self.vars[best].last_flip)
            {
                best = v;
            }
        }
        best
    }

    #[inline]
    fn better(&self, a: usize, b: usize) -> bool {
        self.vars[a].score > self.vars[b].score
            || (self.vars[a].score == self.vars[b].score
                && self.vars[a].last_flip < self.vars[b].last_flip)
    }

    fn flip(&mut self, flipv: usize) {
        self.solution[flipv] = !self.solution[flipv];
        let org_score = self.vars[flipv].score;

        let occs = std::mem::replace(&mut self.vars[flipv].occs, Vec::new());
        for &(ci, sense) in occs.iter() {
            let weight = self.clauses[ci].weight;
            if self.solution[flipv] == sense {
                self.clauses[ci].sat_count += 1;
                match self.clauses[ci].sat_count {
                    1 => {
                        self.sat_a_clause(ci);
                        self.clauses[ci].sat_var = flipv;
                        for k in 0..self.clauses[ci].lits.len() {
                            let u = self.clauses[ci].lits[k].0;
                            self.vars[u].score -= weight;
                        }
                    }
                    2 => {
                        let sat_var = self.clauses[ci].sat_var;
                        self.vars[sat_var].score += weight;
                    }
                    _ => {}
                }
            } else {
                self.clauses[ci].sat_count -= 1;
                match self.clauses[ci].sat_count {
                    0 => {
                        self.unsat_a_clause(ci);
                        for k in 0..self.clauses[ci].lits.len() {
                            let u = self.clauses[ci].lits[k].0;
                            self.vars[u].score += weight;
                        }
                    }
                    1 => {
                        for k in 0..self.clauses[ci].lits.len() {
                            let (u, u_sense) = self.clauses[ci].lits[k];
                            if self.solution[u] == u_sense {
                                self.vars[u].score -= weight;
                                self.clauses[ci].sat_var = u;
                                break;
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
        self.vars[flipv].occs = occs;

        self.vars[flipv].score = -org_score;
        self.vars[flipv].last_flip = self.step;
        self.update_cc_after_flip(flipv);
    }

    fn update_cc_after_flip(&mut self, flipv: usize) {
        self.vars[flipv].cc = false;

        for index in (0..self.ccd_vars.len()).rev() {
            let v = self.ccd_vars[index];
            if self.vars[v].score <= 0 {
                self.ccd_vars.swap_remove(index);
                self.vars[v].in_ccd = false;
            }
        }

        let neighbours = std::mem::replace(&mut self.vars[flipv].neighbours, Vec::new());
        for &v in neighbours.iter() {
            self.vars[v].cc = true;
            if self.vars[v].score > 0 && !self.vars[v].in_ccd {
                self.ccd_vars.push(v);
                self.vars[v].in_ccd = true;
            }
        }
        self.vars[flipv].neighbours = neighbours;
    }

    fn sat_a_clause(&mut self, ci: usize) {
        let last = *self.unsat_clauses.last().unwrap();
        let index = self.idx_in_unsat_clauses[ci];
        self.unsat_clauses[index] = last;
        self.idx_in_unsat_clauses[last] = index;
        self.unsat_clauses.pop();

        for k in 0..self.clauses[ci].lits.len() {
            let v = self.clauses[ci].lits[k].0;
            self.vars[v].unsat_appear -= 1;
            if self.vars[v].unsat_appear == 0 {
                let last = *self.unsat_vars.last().unwrap();
                let index = self.idx_in_unsat_vars[v];
                self.unsat_vars[index] = last;
                self.idx_in_unsat_vars[last] = index;
                self.unsat_vars.pop();
            }
        }
    }

    fn unsat_a_clause(&mut self, ci: usize) {
        self.idx_in_unsat_clauses[ci] = self.unsat_clauses.len();
        self.unsat_clauses.push(ci);

        for k in 0..self.clauses[ci].lits.len() {
            let v = self.clauses[ci].lits[k].0;
            self.vars[v].unsat_appear += 1;
            if self.vars[v].unsat_appear == 1 {
                self.idx_in_unsat_vars[v] = self.unsat_vars.len();
                self.unsat_vars.push(v);
            }
        }
    }

    fn update_clause_weights(&mut self) {
        for &ci in self.unsat_clauses.iter() {
            self.clauses[ci].weight += 1;
        }
        for &v in self.unsat_vars.iter() {
            self.vars[v].score += self.vars[v].unsat_appear as i64;
            if self.vars[v].score > 0 && self.vars[v].cc && !self.vars[v].in_ccd {
                self.ccd_vars.push(v);
                self.vars[v].in_ccd = true;
            }
        }

        self.delta_total_weight += self.unsat_clauses.len() as i64;
        if self.delta_total_weight >= self.clauses.len() as i64 {
            self.avg_clause_weight += 1;
            self.delta_total_weight -= self.clauses.len() as i64;
            if self.avg_clause_weight > self.settings.swt_threshold {
                self.smooth_clause_weights();
            }
        }
    }

    fn smooth_clause_weights(&mut self) {
        for var in self.vars.iter_mut() {
            var.score = 0;
        }

        let scale_avg = (self.avg_clause_weight as f64 * self.settings.swt_q) as i64;
        self.avg_clause_weight = 0;
        self.delta_total_weight = 0;

        for ci in 0..self.clauses.len() {
            let weight = {
                let c = &mut self.clauses[ci];
                c.weight = ((c.weight as f64) * self.settings.swt_p) as i64 + scale_avg;
                if c.weight < 1 {
                    c.weight = 1;
                }
                c.weight
            };

            self.delta_total_weight += weight;
            if self.delta_total_weight >= self.clauses.len() as i64 {
                self.avg_clause_weight += 1;
                self.delta_total_weight -= self.clauses.len() as i64;
            }

            if self.clauses[ci].sat_count == 0 {
                for k in 0..self.clauses[ci].lits.len() {
                    let v = self.clauses[ci].lits[k].0;
                    self.vars[v].score += weight;
                }
            } else if self.clauses[ci].sat_count == 1 {
                let sat_var = self.clauses[ci].sat_var;
                self.vars[sat_var].score -= weight;
            }
        }

        self.ccd_vars.clear();
        for v in 0..self.vars.len() {
            let var = &mut self.vars[v];
            var.in_ccd = var.score > 0 && var.cc;
            if var.in_ccd {
                self.ccd_vars.push(v);
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::sat::formula::Var;

    fn lit(i: i32) -> Lit {
        Var::unidx((i.abs() - 1) as usize).lit(i < 0)
    }

    fn clauses(raw: &[&[i32]]) -> Vec<Vec<Lit>> {
        raw.iter()
            .map(|ids| ids.iter().map(|&i| lit(i)).collect())
            .collect()
    }

    #[test]
    fn test_solves_simple_formula() {
        let cls = clauses(&[&[1, 2], &[-1, 2], &[1, -2], &[3]]);
        let mut ls = LocalSearch::new(
            SlsSettings::default(),
            3,
            cls.iter().map(|c| &c[..]),
            &[false, false, false],
        );
        let unsat = ls.run();
        assert_eq!(unsat, 0);

        let phases = ls.best_phases();
        assert_eq!(phases.get(&Var::unidx(0)), Some(&true));
        assert_eq!(phases.get(&Var::unidx(1)), Some(&true));
        assert_eq!(phases.get(&Var::unidx(2)), Some(&true));
    }

    #[test]
    fn test_reports_best_on_unsat_snapshot() {
        let cls = clauses(&[&[1], &[-1]]);
        let mut ls = LocalSearch::new(
            SlsSettings {
                max_flips: 1000,
                ..Default::default()
            },
            1,
            cls.iter().map(|c| &c[..]),
            &[false],
        );
        let unsat = ls.run();
        assert_eq!(unsat, 1);
    }
}
