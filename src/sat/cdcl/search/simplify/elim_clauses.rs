use std::mem;
use crate::sat::formula::{Lit, Var, VarMap};


/// Clauses removed by variable elimination, recorded so that a model of
/// the reduced formula can be extended to the original one. Clauses are
/// stored flattened, each with the eliminated variable's literal in
/// front, and are replayed in reverse elimination order.
pub struct ElimClauses {
    extend_model: bool,
    literals: Vec<Lit>,
    sizes: Vec<usize>,
}

impl ElimClauses {
    pub fn new(extend_model: bool) -> ElimClauses {
        ElimClauses {
            extend_model,
            literals: Vec::new(),
            sizes: Vec::new(),
        }
    }

    pub fn mk_elim_unit(&mut self, x: Lit) {
        self.literals.push(x);
        self.sizes.push(1);
    }

    pub fn mk_elim_clause(&mut self, v: Var, clause: &[Lit]) {
        assert!(clause.len() > 1);
        let first = self.literals.len();

        // Copy clause to the flat store, remembering where the literal
        // of 'v' landed:
        let mut v_pos = first;
        let mut v_found = false;
        for &lit in clause {
            self.literals.push(lit);
            if lit.var() == v {
                v_found = true;
            } else if !v_found {
                v_pos += 1;
            }
        }
        assert!(v_found);

        // Swap the 'v' literal to the front of the stored clause:
        self.literals.swap(first, v_pos);

        self.sizes.push(clause.len());
    }

    /// Walks the stack newest first and flips the eliminated variable of
    /// every clause not already satisfied by the model.
    pub fn extend(&self, assigns: &mut VarMap<bool>) {
        if !self.extend_model {
            return;
        }

        let mut i = self.literals.len();
        let mut c_index = self.sizes.len();
        while c_index > 0 && i > 0 {
            c_index -= 1;
            let mut cur_size = self.sizes[c_index];
            assert!(cur_size > 0);

            i -= 1;
            let mut skip = false;
            while cur_size > 1 {
                let lit = self.literals[i];
                match assigns.get(&lit.var()) {
                    Some(sign) if *sign != lit.sign() => {
                        skip = true;
                        break;
                    }
                    _ => {}
                }

                cur_size -= 1;
                i -= 1;
            }

            if !skip {
                let lit = self.literals[i];
                assigns.insert(&lit.var(), !lit.sign());
            }

            if i > cur_size - 1 {
                i -= cur_size - 1;
            } else {
                i = 0
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }

    pub fn log_size(&self) {
        let sz = self.literals.len() + self.sizes.len();
        if sz > 0 {
            info!(
                "|  Eliminated clauses:     {:10.2} Mb                                      |",
                ((sz * mem::size_of::<u32>()) as f64) / (1024.0 * 1024.0)
            );
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::sat::formula::Idx;

    fn lit(i: i32) -> Lit {
        Var::unidx((i.abs() - 1) as usize).lit(i < 0)
    }

    #[test]
    fn test_extend_picks_satisfying_polarity() {
        let v = lit(1).var();
        let mut elim = ElimClauses::new(true);
        // eliminate v from (v ∨ x2) and (¬v ∨ x3)
        elim.mk_elim_clause(v, &[lit(1), lit(2)]);
        elim.mk_elim_clause(v, &[lit(-1), lit(3)]);

        // model: x2 false, x3 true ⇒ v must be true
        let mut model = VarMap::new();
        model.insert(&lit(2).var(), false);
        model.insert(&lit(3).var(), true);
        elim.extend(&mut model);
        assert_eq!(model.get(&v), Some(&true));
    }

    #[test]
    fn test_extend_unit() {
        let mut elim = ElimClauses::new(true);
        elim.mk_elim_unit(lit(-4));

        let mut model = VarMap::new();
        elim.extend(&mut model);
        assert_eq!(model.get(&lit(4).var()), Some(&false));
    }
}
