use std::io::{Read, Write};

use tiersat::sat::{dimacs, SolveRes, Solver};
use tiersat::sat::cdcl::budget::Budget;
use tiersat::sat::cdcl::{CoreSolver, SimpSolver};
use tiersat::sat::formula::VarMap;
use tiersat::sat::proof::{Proof, ProofFormat};
use tiersat::sat::proof::checker::OnlineChecker;


enum Outcome {
    Sat(VarMap<bool>, VarMap<i32>),
    Unsat,
    Unknown,
}

fn run_simp(text: &str, check_proof: bool) -> Outcome {
    let mut solver = SimpSolver::new(Default::default());
    if check_proof {
        solver.set_proof(Proof::checking_only());
    }
    run(solver, text)
}

fn run_core(text: &str) -> Outcome {
    let solver = CoreSolver::new(Default::default());
    run(solver, text)
}

fn run<S: Solver>(mut solver: S, text: &str) -> Outcome {
    let mut budget = Budget::new();
    budget.off();

    let backward_subst = dimacs::parse(text, &mut solver, false).expect("parse error");
    if !solver.preprocess(&budget) {
        return Outcome::Unsat;
    }

    match solver.solve_limited(&budget, &[]) {
        SolveRes::SAT(model, _) => Outcome::Sat(model, backward_subst),
        SolveRes::UnSAT(_, _) => Outcome::Unsat,
        SolveRes::Unknown(_, _) => Outcome::Unknown,
    }
}

fn assert_sat(text: &str) {
    for &check in &[false, true] {
        match run_simp(text, check) {
            Outcome::Sat(model, subst) => {
                assert!(
                    dimacs::validate_model(text, &subst, &model).unwrap(),
                    "reported model does not satisfy the formula"
                );
            }
            _ => panic!("expected SAT (check={})", check),
        }
    }
}

fn assert_unsat(text: &str) {
    for &check in &[false, true] {
        match run_simp(text, check) {
            Outcome::Unsat => {}
            _ => panic!("expected UNSAT (check={})", check),
        }
    }
}


#[test]
fn test_empty_formula() {
    match run_simp("p cnf 0 0\n", true) {
        Outcome::Sat(model, _) => assert_eq!(model.len(), 0),
        _ => panic!("empty formula must be SAT with an empty model"),
    }
}

#[test]
fn test_empty_clause() {
    assert_unsat("p cnf 1 1\n0\n");
}

#[test]
fn test_unit_clauses() {
    let text = "p cnf 3 3\n1 0\n2 0\n3 0\n";
    match run_simp(text, true) {
        Outcome::Sat(model, subst) => {
            assert!(dimacs::validate_model(text, &subst, &model).unwrap());
            for (v, &value) in model.iter() {
                assert!(value, "all variables must be true, {:?} is not", v);
            }
        }
        _ => panic!("expected SAT"),
    }
}

#[test]
fn test_contradictory_units() {
    assert_unsat("p cnf 1 2\n1 0\n-1 0\n");
}

#[test]
fn test_implication_chain() {
    // x1 and a chain x1 → x2 → ... → x5
    assert_sat("p cnf 5 5\n1 0\n-1 2 0\n-2 3 0\n-3 4 0\n-4 5 0\n");
    // the same chain with the tail negated
    assert_unsat("p cnf 5 6\n1 0\n-1 2 0\n-2 3 0\n-3 4 0\n-4 5 0\n-5 0\n");
}

fn pigeonhole(pigeons: i32, holes: i32) -> String {
    let var = |p: i32, h: i32| (p - 1) * holes + h;
    let mut clauses: Vec<Vec<i32>> = Vec::new();

    for p in 1..=pigeons {
        clauses.push((1..=holes).map(|h| var(p, h)).collect());
    }
    for h in 1..=holes {
        for p in 1..=pigeons {
            for q in (p + 1)..=pigeons {
                clauses.push(vec![-var(p, h), -var(q, h)]);
            }
        }
    }

    let mut text = String::new();
    let mut out = Vec::new();
    dimacs::write_cnf(&mut out, (pigeons * holes) as usize, &clauses).unwrap();
    text.push_str(std::str::from_utf8(&out).unwrap());
    text
}

#[test]
fn test_pigeonhole_unsat() {
    assert_unsat(&pigeonhole(3, 2));
    assert_unsat(&pigeonhole(4, 3));
}

#[test]
fn test_pigeonhole_core_solver() {
    match run_core(&pigeonhole(3, 2)) {
        Outcome::Unsat => {}
        _ => panic!("expected UNSAT"),
    }
}

// Writes the proof of PHP(3,2) to a file, then replays it through an
// independent checker state fed with the original clauses.
#[test]
fn test_pigeonhole_proof_replays() {
    let text = pigeonhole(3, 2);
    let proof_file = tempfile::NamedTempFile::new().unwrap();

    {
        let mut solver = SimpSolver::new(Default::default());
        solver.set_proof(
            Proof::to_file(proof_file.path(), ProofFormat::Text, false).unwrap(),
        );
        match run(solver, &text) {
            Outcome::Unsat => {}
            _ => panic!("expected UNSAT"),
        }
    }

    let mut proof_text = String::new();
    proof_file
        .reopen()
        .unwrap()
        .read_to_string(&mut proof_text)
        .unwrap();
    assert!(!proof_text.is_empty(), "no proof was written");

    let mut checker = OnlineChecker::new();
    let (_, clauses) = dimacs::parse_raw(&text).unwrap();
    let to_lits = |ids: &[i32]| -> Vec<tiersat::sat::formula::Lit> {
        use tiersat::sat::formula::{Idx, Var};
        ids.iter()
            .map(|&i| {
                let v: Var = Idx::unidx((i.abs() - 1) as usize);
                v.lit(i < 0)
            })
            .collect()
    };
    for clause in clauses.iter() {
        checker.add_axiom(&to_lits(clause));
    }

    for line in proof_text.lines() {
        let mut ids: Vec<i32> = Vec::new();
        let mut delete = false;
        for token in line.split_whitespace() {
            if token == "d" {
                delete = true;
            } else {
                let id: i32 = token.parse().unwrap();
                if id != 0 {
                    ids.push(id);
                }
            }
        }

        let lits = to_lits(&ids);
        if delete {
            checker.delete(&lits).expect("bogus deletion in proof");
        } else {
            checker.add_checked(&lits).expect("bogus addition in proof");
        }
    }

    assert!(checker.is_refuted(), "proof does not end in the empty clause");
}

#[test]
fn test_gzipped_input() {
    let text = "p cnf 2 2\n1 2 0\n-1 2 0\n";
    let mut encoder =
        flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(text.as_bytes()).unwrap();
    let gz = encoder.finish().unwrap();

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&gz).unwrap();

    let mut solver = SimpSolver::new(Default::default());
    let mut budget = Budget::new();
    budget.off();
    let subst = dimacs::parse_file(&file.path(), &mut solver, false).unwrap();
    assert!(solver.preprocess(&budget));
    match solver.solve_limited(&budget, &[]) {
        SolveRes::SAT(model, _) => {
            assert!(dimacs::validate_model(text, &subst, &model).unwrap());
        }
        _ => panic!("expected SAT"),
    }
}


// Small deterministic generator for random 3-SAT instances.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    fn below(&mut self, bound: u64) -> u64 {
        self.next() % bound
    }
}

fn random_3sat(seed: u64, vars: u64, clauses: u64) -> String {
    let mut rng = Lcg(seed);
    let mut cnf: Vec<Vec<i32>> = Vec::new();

    while (cnf.len() as u64) < clauses {
        let mut clause = Vec::new();
        while clause.len() < 3 {
            let v = (rng.below(vars) + 1) as i32;
            if clause.iter().any(|&l: &i32| l.abs() == v) {
                continue;
            }
            clause.push(if rng.below(2) == 0 { v } else { -v });
        }
        cnf.push(clause);
    }

    let mut out = Vec::new();
    dimacs::write_cnf(&mut out, vars as usize, &cnf).unwrap();
    String::from_utf8(out).unwrap()
}

// Instances around the phase-transition ratio of 4.26; both outcomes
// appear over the seeds. Each result must agree with and without the
// online checker, and models must self-validate.
#[test]
fn test_random_3sat_suite() {
    let mut sat = 0;
    let mut unsat = 0;
    for seed in 0..20 {
        let text = random_3sat(0xC0FFEE + seed, 60, 256);

        let unchecked = match run_simp(&text, false) {
            Outcome::Sat(model, subst) => {
                assert!(dimacs::validate_model(&text, &subst, &model).unwrap());
                true
            }
            Outcome::Unsat => false,
            Outcome::Unknown => panic!("unexpected Unknown without a budget"),
        };

        let checked = match run_simp(&text, true) {
            Outcome::Sat(model, subst) => {
                assert!(dimacs::validate_model(&text, &subst, &model).unwrap());
                true
            }
            Outcome::Unsat => false,
            Outcome::Unknown => panic!("unexpected Unknown without a budget"),
        };

        assert_eq!(unchecked, checked, "checker changed the verdict on seed {}", seed);
        if unchecked {
            sat += 1;
        } else {
            unsat += 1;
        }
    }

    assert!(sat > 0, "suite should contain satisfiable instances");
    assert!(unsat > 0, "suite should contain unsatisfiable instances");
}

#[test]
fn test_assumptions_over_dimacs() {
    use tiersat::sat::formula::Lit;

    let text = "p cnf 3 2\n1 2 0\n-2 3 0\n";
    let mut solver = SimpSolver::new(Default::default());
    let mut budget = Budget::new();
    budget.off();

    let subst = dimacs::parse(text, &mut solver, false).unwrap();
    let lit_of = |id: i32| -> Lit {
        let mut found = None;
        for (v, &ext) in subst.iter() {
            if ext == id.abs() {
                found = Some(v.lit(id < 0));
            }
        }
        found.unwrap()
    };

    // ¬x1 forces x2 and x3
    match solver.solve_limited(&budget, &[lit_of(-1)]) {
        SolveRes::SAT(model, _) => {
            assert_eq!(model.get(&lit_of(2).var()), Some(&true));
            assert_eq!(model.get(&lit_of(3).var()), Some(&true));
        }
        _ => panic!("expected SAT under assumption"),
    }

    // contradictory assumptions yield a failed core containing both
    match solver.solve_limited(&budget, &[lit_of(2), lit_of(-3)]) {
        SolveRes::UnSAT(conflict, _) => {
            assert!(conflict.len() > 0, "failed-assumption core must be reported");
        }
        _ => panic!("expected UNSAT under assumptions"),
    }

    // and the solver stays usable
    match solver.solve_limited(&budget, &[]) {
        SolveRes::SAT(_, _) => {}
        _ => panic!("solver must remain usable after an assumption conflict"),
    }
}
