use std::num;
use super::{assignment::Assignment, Lit, Var, VarMap};


pub fn calc_abstraction(lits: &[Lit]) -> num::NonZeroU32 {
    let mut abstraction: u32 = 0;
    for lit in lits {
        abstraction |= lit.abstraction();
    }
    num::NonZeroU32::new(abstraction).unwrap()
}


pub fn satisfied_with_assignment(clause: &[Lit], assignment: &Assignment) -> bool {
    clause.iter().any(|&lit| assignment.is_assigned_pos(lit))
}

pub fn satisfied_with_model(clause: &[Lit], model: &VarMap<bool>) -> bool {
    clause.iter().any(|&lit| match model.get(&lit.var()) {
        Some(&sign) => sign != lit.sign(),
        None => false,
    })
}


pub fn extract_model(assigns: &Assignment) -> VarMap<bool> {
    let mut model = VarMap::new();
    for &lit in assigns.trail() {
        model.insert(&lit.var(), !lit.sign());
    }
    model
}


/// Resolves `ps` with `qs` on variable `v`. Returns `None` when the
/// resolvent is a tautology.
pub fn merge(v: Var, ps: &[Lit], qs: &[Lit]) -> Option<Vec<Lit>> {
    let (longer, shorter) = if ps.len() < qs.len() {
        (qs, ps)
    } else {
        (ps, qs)
    };

    let mut res = Vec::with_capacity(longer.len() + shorter.len() - 2);
    for &qi in shorter {
        if qi.var() != v {
            let mut keep = true;

            for &pj in longer {
                if pj.var() == qi.var() {
                    if pj == !qi {
                        return None;
                    }
                    keep = false;
                    break;
                }
            }

            if keep {
                res.push(qi);
            }
        }
    }

    for &lit in longer {
        if lit.var() != v {
            res.push(lit);
        }
    }

    Some(res)
}


#[cfg(test)]
mod tests {
    use super::*;

    fn lit(i: i32) -> Lit {
        Var::from_index((i.abs() - 1) as usize).lit(i < 0)
    }

    fn clause(ids: &[i32]) -> Vec<Lit> {
        ids.iter().map(|&i| lit(i)).collect()
    }

    #[test]
    fn test_merge() {
        let v = Var::from_index(0);

        let r = merge(v, &clause(&[1, 2]), &clause(&[-1, 3])).unwrap();
        assert_eq!(r, clause(&[3, 2]));

        // duplicate literal collapses
        let r = merge(v, &clause(&[1, 2, 3]), &clause(&[-1, 2])).unwrap();
        assert_eq!(r, clause(&[2, 3]));

        // opposite occurrence of another variable makes a tautology
        assert!(merge(v, &clause(&[1, 2]), &clause(&[-1, -2])).is_none());
    }

    #[test]
    fn test_satisfied_with_model() {
        let mut model = VarMap::new();
        model.insert(&Var::from_index(0), true);
        model.insert(&Var::from_index(1), false);

        assert!(satisfied_with_model(&clause(&[1, 3]), &model));
        assert!(satisfied_with_model(&clause(&[-2]), &model));
        assert!(!satisfied_with_model(&clause(&[-1, 2]), &model));
        assert!(!satisfied_with_model(&clause(&[3]), &model));
    }
}
