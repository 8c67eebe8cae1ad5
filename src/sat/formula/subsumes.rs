use super::Lit;
use super::clause::Clause;


pub enum Subsumes {
    Different,
    Exact,
    LitSign(Lit),
}

/// Checks whether `this` subsumes `other`, or subsumes it after flipping
/// the sign of exactly one literal (self-subsuming resolution).
pub fn subsumes(this: &Clause, other: &Clause) -> Subsumes {
    assert!(!this.is_learnt());
    assert!(!other.is_learnt());

    if other.len() < this.len() || (this.abstraction() & !other.abstraction()) != 0 {
        return Subsumes::Different;
    }

    let mut ret = Subsumes::Exact;
    for &lit in this.lits() {
        // search for lit or ¬lit
        let mut found = false;
        for &cur in other.lits() {
            if lit == cur {
                found = true;
                break;
            } else if lit == !cur {
                if let Subsumes::Exact = ret {
                    ret = Subsumes::LitSign(lit);
                    found = true;
                    break;
                } else {
                    return Subsumes::Different;
                }
            }
        }

        if !found {
            return Subsumes::Different;
        }
    }

    ret
}

pub fn unit_subsumes(unit: Lit, c: &Clause) -> Subsumes {
    assert!(!c.is_learnt());

    if unit.abstraction() & !c.abstraction() != 0 {
        return Subsumes::Different;
    }

    for &cur in c.lits() {
        if unit == cur {
            return Subsumes::Exact;
        } else if unit == !cur {
            return Subsumes::LitSign(unit);
        }
    }

    Subsumes::Different
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::sat::formula::Var;
    use crate::sat::formula::clause::{ClauseAllocator, ClauseHeader};
    use crate::sat::formula::util::calc_abstraction;

    fn alloc(ca: &mut ClauseAllocator, ids: &[i32]) -> crate::sat::formula::clause::ClauseRef {
        let lits: Vec<Lit> = ids
            .iter()
            .map(|&i| Var::from_index((i.abs() - 1) as usize).lit(i < 0))
            .collect();
        let header = ClauseHeader::Clause {
            abstraction: Some(calc_abstraction(&lits)),
        };
        ca.alloc(&lits, header).1
    }

    #[test]
    fn test_subsumes() {
        let mut ca = ClauseAllocator::new_empty();
        let small = alloc(&mut ca, &[1, 2]);
        let large = alloc(&mut ca, &[1, 2, 3]);
        let flipped = alloc(&mut ca, &[1, -2, 3]);
        let disjoint = alloc(&mut ca, &[4, 5]);

        match subsumes(ca.view(small), ca.view(large)) {
            Subsumes::Exact => {}
            _ => panic!("expected exact subsumption"),
        }
        match subsumes(ca.view(large), ca.view(small)) {
            Subsumes::Different => {}
            _ => panic!("longer clause cannot subsume a shorter one"),
        }
        match subsumes(ca.view(small), ca.view(flipped)) {
            Subsumes::LitSign(l) => assert_eq!(l, Var::from_index(1).pos_lit()),
            _ => panic!("expected self-subsuming resolution"),
        }
        match subsumes(ca.view(small), ca.view(disjoint)) {
            Subsumes::Different => {}
            _ => panic!("disjoint clauses must not subsume"),
        }
    }

    #[test]
    fn test_unit_subsumes() {
        let mut ca = ClauseAllocator::new_empty();
        let c = alloc(&mut ca, &[1, -2, 3]);

        match unit_subsumes(Var::from_index(0).pos_lit(), ca.view(c)) {
            Subsumes::Exact => {}
            _ => panic!("unit in clause"),
        }
        match unit_subsumes(Var::from_index(1).pos_lit(), ca.view(c)) {
            Subsumes::LitSign(_) => {}
            _ => panic!("unit negated in clause"),
        }
        match unit_subsumes(Var::from_index(10).pos_lit(), ca.view(c)) {
            Subsumes::Different => {}
            _ => panic!("unrelated unit"),
        }
    }
}
