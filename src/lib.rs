#[macro_use]
extern crate log;
use time;

use std::{io, path};
use crate::sat::*;
use crate::sat::cdcl::budget::Budget;
use crate::sat::proof::{Proof, ProofFormat};

pub mod sat;
pub(crate) mod util;


pub enum SolverOptions {
    Core(sat::cdcl::CoreSettings),
    Simp(sat::cdcl::SimpSettings),
}

pub struct MainOptions {
    pub strict: bool,
    pub pre: bool,
    pub solve: bool,
    pub in_path: path::PathBuf,
    pub out_path: Option<path::PathBuf>,
    pub proof_path: Option<path::PathBuf>,
    pub proof_binary: bool,
    pub proof_check: bool,
}

pub const EXIT_SAT: i32 = 10;
pub const EXIT_UNSAT: i32 = 20;
pub const EXIT_INDETERMINATE: i32 = 0;


pub fn solve(main_opts: MainOptions, solver_opts: SolverOptions) -> io::Result<i32> {
    let proof = match main_opts.proof_path {
        Some(ref path) => {
            let format = if main_opts.proof_binary {
                ProofFormat::Binary
            } else {
                ProofFormat::Text
            };
            Some(Proof::to_file(path, format, main_opts.proof_check)?)
        }
        None if main_opts.proof_check => Some(Proof::checking_only()),
        None => None,
    };

    match solver_opts {
        SolverOptions::Core(opts) => {
            let mut solver = sat::cdcl::CoreSolver::new(opts);
            if let Some(proof) = proof {
                solver.set_proof(proof);
            }
            solve_with(solver, main_opts)
        }

        SolverOptions::Simp(opts) => {
            let mut solver = sat::cdcl::SimpSolver::new(opts);
            if let Some(proof) = proof {
                solver.set_proof(proof);
            }
            if !main_opts.pre {
                solver.simp_off();
            }
            solve_with(solver, main_opts)
        }
    }
}


pub fn solve_with<S: Solver>(mut solver: S, options: MainOptions) -> io::Result<i32> {
    info!("============================[ Problem Statistics ]=============================");
    info!("|                                                                             |");

    let initial_time = time::precise_time_s();
    let backward_subst = dimacs::parse_file(&options.in_path, &mut solver, options.strict)?;
    let parse_end_time = time::precise_time_s();

    info!("|  Number of variables:  {:12}                                         |", solver.n_vars());
    info!("|  Number of clauses:    {:12}                                         |", solver.n_clauses());

    {
        let parse_time = parse_end_time - initial_time;
        info!("|  Parse time:           {:12.2} s                                       |", parse_time);
    }

    let mut budget = Budget::new();
    budget.off();

    let elim_res = solver.preprocess(&budget);

    {
        let simplify_time = time::precise_time_s() - parse_end_time;
        info!("|  Simplification time:  {:12.2} s                                       |", simplify_time);
    }

    info!("|                                                                             |");

    let result = if !elim_res {
        info!("===============================================================================");
        info!("Solved by simplification");
        SolveRes::UnSAT(sat::formula::LitMap::new(), solver.stats())
    } else if options.solve {
        solver.solve_limited(&budget, &[])
    } else {
        info!("===============================================================================");
        SolveRes::Unknown(0.0, solver.stats())
    };

    let cpu_time = time::precise_time_s() - initial_time;
    let mem_used = util::mem_used_peak();
    let exit_code = match result {
        SolveRes::UnSAT(_, ref stats) => {
            print_stats(stats, cpu_time, mem_used);
            println!("UNSATISFIABLE");
            EXIT_UNSAT
        }

        SolveRes::Unknown(_, ref stats) => {
            print_stats(stats, cpu_time, mem_used);
            println!("INDETERMINATE");
            EXIT_INDETERMINATE
        }

        SolveRes::SAT(ref model, ref stats) => {
            print_stats(stats, cpu_time, mem_used);
            println!("SATISFIABLE");
            assert!(
                dimacs::validate_model_file(&options.in_path, &backward_subst, model)?,
                "SELF-CHECK FAILED"
            );
            EXIT_SAT
        }
    };

    if let Some(path) = options.out_path {
        let out = std::fs::File::create(path)?;
        dimacs::write_result(out, &result, &backward_subst)?;
    }

    Ok(exit_code)
}

fn print_stats(stats: &Stats, cpu_time: f64, mem_used: Option<usize>) {
    info!("restarts              : {:<12} ({} blocked)", stats.restarts, stats.blocked_restarts);

    {
        let confl_per_s = (stats.conflicts as f64) / cpu_time;
        info!("conflicts             : {:<12}   ({:.0} /sec)", stats.conflicts, confl_per_s);
    }

    {
        let rnd_percent = (stats.rnd_decisions as f64) * 100.0 / (stats.decisions as f64);
        let decisions_per_s = (stats.decisions as f64) / cpu_time;
        info!("decisions             : {:<12}   ({:4.2} % random) ({:.0} /sec)", stats.decisions, rnd_percent, decisions_per_s);
    }

    {
        let props_per_s = (stats.propagations as f64) / cpu_time;
        info!("propagations          : {:<12}   ({:.0} /sec)", stats.propagations, props_per_s);
    }

    {
        let del_percent = (stats.del_literals as f64) * 100.0 / ((stats.del_literals + stats.tot_literals) as f64);
        info!("conflict literals     : {:<12}   ({:4.2} % deleted)", stats.tot_literals, del_percent);
    }

    info!("chrono backtracks     : {:<12}", stats.chrono_backtracks);
    info!("trail replays         : {:<12}", stats.replayed_assigns);
    info!("database reductions   : {:<12}", stats.reduces);
    info!("local search runs     : {:<12}", stats.sls_runs);

    if let Some(mem_used) = mem_used {
        info!("Memory used           : {:.2} MB", (mem_used as f64) / 1024.0);
    }
    info!("CPU time              : {} s", cpu_time);
    info!("");
}
