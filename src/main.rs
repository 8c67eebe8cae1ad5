use std::default::Default;
use std::io::Write;
use std::process;
use log;
#[macro_use]
extern crate clap;
use tiersat::{solve, MainOptions, SolverOptions};
use tiersat::sat::cdcl::{CCMinMode, CoreSettings, PhaseSaving, SimpSettings};


fn main() {
    let ls012 = ["0", "1", "2"];
    let matches = clap::App::new("tiersat")
        .version(&crate_version!()[..])
        .about("A CDCL SAT solver with tiered clause retention")

        .arg(clap::Arg::with_name("verb").long("verb").takes_value(true).possible_values(&ls012).help("Verbosity level (0=silent, 1=some, 2=more)"))
        .arg(clap::Arg::with_name("core").long("core").help("Use the core solver without preprocessing"))
        .arg(clap::Arg::with_name("strict").long("strict").help("Validate DIMACS header during parsing"))
        .arg(clap::Arg::with_name("pre").long("pre").help("Completely turn on/off any preprocessing"))
        .arg(clap::Arg::with_name("no-pre").long("no-pre").conflicts_with("pre"))
        .arg(clap::Arg::with_name("solve").long("solve").help("Completely turn on/off solving after preprocessing"))
        .arg(clap::Arg::with_name("no-solve").long("no-solve").conflicts_with("solve"))
        .arg(clap::Arg::with_name("input").required(true))
        .arg(clap::Arg::with_name("output").required(false))

        .arg(clap::Arg::with_name("var-decay").long("var-decay").takes_value(true).help("The variable activity decay factor"))
        .arg(clap::Arg::with_name("cla-decay").long("cla-decay").takes_value(true).help("The clause activity decay factor"))
        .arg(clap::Arg::with_name("rnd-freq").long("rnd-freq").takes_value(true).help("The frequency with which the decision heuristic tries to choose a random variable"))
        .arg(clap::Arg::with_name("rnd-seed").long("rnd-seed").takes_value(true).help("Used by the random variable selection"))
        .arg(clap::Arg::with_name("ccmin-mode").long("ccmin-mode").takes_value(true).possible_values(&ls012).help("Controls conflict clause minimization (0=none, 1=basic, 2=deep)"))
        .arg(clap::Arg::with_name("phase-saving").long("phase-saving").takes_value(true).possible_values(&ls012).help("Controls the level of phase saving (0=none, 1=limited, 2=full)"))
        .arg(clap::Arg::with_name("rnd-init").long("rnd-init").help("Randomize the initial activity"))
        .arg(clap::Arg::with_name("no-rnd-init").long("no-rnd-init").conflicts_with("rnd-init"))
        .arg(clap::Arg::with_name("distance").long("distance").takes_value(true).help("Rank variables by conflict history for this many conflicts (0 disables)"))

        .arg(clap::Arg::with_name("luby").long("luby").help("Use the Luby restart sequence exclusively"))
        .arg(clap::Arg::with_name("no-luby").long("no-luby").conflicts_with("luby"))
        .arg(clap::Arg::with_name("rfirst").long("rfirst").takes_value(true).help("The base restart interval of the Luby schedule"))
        .arg(clap::Arg::with_name("rinc").long("rinc").takes_value(true).help("Restart interval increase factor"))
        .arg(clap::Arg::with_name("restart-margin").long("restart-margin").takes_value(true).help("Restart when the fast LBD average times this margin exceeds the slow one"))
        .arg(clap::Arg::with_name("restart-blocking").long("restart-blocking").takes_value(true).help("Block restarts while the trail exceeds its average by this factor"))

        .arg(clap::Arg::with_name("chrono").long("chrono").takes_value(true).allow_hyphen_values(true).help("Chronological backtracking threshold, -1 disables"))

        .arg(clap::Arg::with_name("core-lbd").long("core-lbd").takes_value(true).help("Learnt clauses at or below this LBD are kept forever"))
        .arg(clap::Arg::with_name("tier2-lbd").long("tier2-lbd").takes_value(true).help("Learnt clauses at or below this LBD go to the middle tier"))
        .arg(clap::Arg::with_name("tier2-window").long("tier2-window").takes_value(true).help("Conflicts a middle-tier clause may go unused before demotion"))
        .arg(clap::Arg::with_name("reduce-first").long("reduce-first").takes_value(true).help("Conflicts before the first learnt database reduction"))
        .arg(clap::Arg::with_name("reduce-inc").long("reduce-inc").takes_value(true).help("Increment of the reduction interval"))
        .arg(clap::Arg::with_name("gc-frac").long("gc-frac").takes_value(true).help("The fraction of wasted memory allowed before a garbage collection is triggered"))

        .arg(clap::Arg::with_name("no-sls").long("no-sls").help("Disable the local-search phase seeder"))
        .arg(clap::Arg::with_name("sls-flips").long("sls-flips").takes_value(true).help("Flip budget of a local-search run"))

        .arg(clap::Arg::with_name("proof").long("proof").takes_value(true).help("Write a DRUP proof to this file"))
        .arg(clap::Arg::with_name("proof-binary").long("proof-binary").help("Use the binary proof encoding"))
        .arg(clap::Arg::with_name("proof-check").long("proof-check").help("Verify every proof record on the fly"))

        .arg(clap::Arg::with_name("asymm").long("asymm").help("Shrink clauses by asymmetric branching"))
        .arg(clap::Arg::with_name("no-asymm").long("no-asymm").conflicts_with("asymm"))
        .arg(clap::Arg::with_name("rcheck").long("rcheck").help("Check if a clause is already implied. (costly)"))
        .arg(clap::Arg::with_name("no-rcheck").long("no-rcheck").conflicts_with("rcheck"))
        .arg(clap::Arg::with_name("elim").long("elim").help("Perform variable elimination"))
        .arg(clap::Arg::with_name("no-elim").long("no-elim").conflicts_with("elim"))
        .arg(clap::Arg::with_name("grow").long("grow").takes_value(true).help("Allow a variable elimination step to grow by a number of clauses"))
        .arg(clap::Arg::with_name("cl-lim").long("cl-lim").takes_value(true).allow_hyphen_values(true).help("Variables are not eliminated if it produces a resolvent with a length above this limit. -1 means no limit"))
        .arg(clap::Arg::with_name("sub-lim").long("sub-lim").takes_value(true).allow_hyphen_values(true).help("Do not check if subsumption against a clause larger than this. -1 means no limit."))
        .arg(clap::Arg::with_name("simp-gc-frac").long("simp-gc-frac").takes_value(true).help("The fraction of wasted memory allowed before a garbage collection is triggered during simplification."))

        .get_matches();

    {
        let mut builder = env_logger::Builder::new();
        builder.format(|buf, record| writeln!(buf, "{}", record.args()));
        builder.filter(
            None,
            matches
                .value_of("verb")
                .map(|v| match v {
                    "1" => log::LevelFilter::Info,
                    "2" => log::LevelFilter::Trace,
                    _ => log::LevelFilter::Off,
                })
                .unwrap_or(log::LevelFilter::Info),
        );
        builder.init();
    }

    let core_options = {
        let mut s: CoreSettings = Default::default();

        for x in matches.value_of("var-decay").and_then(|s| s.parse().ok()).iter() {
            if 0.0 < *x && *x < 1.0 {
                s.heur.var_decay = *x;
            }
        }

        for x in matches.value_of("cla-decay").and_then(|s| s.parse().ok()).iter() {
            if 0.0 < *x && *x < 1.0 {
                s.db.clause_decay = *x;
            }
        }

        for x in matches.value_of("rnd-freq").and_then(|s| s.parse().ok()).iter() {
            if 0.0 <= *x && *x <= 1.0 {
                s.heur.random_var_freq = *x;
            }
        }

        for x in matches.value_of("rnd-seed").and_then(|s| s.parse().ok()).iter() {
            if 0.0 < *x {
                s.heur.random_seed = *x;
                s.search.sls.random_seed = *x;
            }
        }

        for x in matches.value_of("distance").and_then(|s| s.parse().ok()).iter() {
            s.heur.distance_conflicts = *x;
        }

        for x in matches.value_of("ccmin-mode").iter() {
            match *x {
                "0" => s.ccmin_mode = CCMinMode::None,
                "1" => s.ccmin_mode = CCMinMode::Basic,
                "2" => s.ccmin_mode = CCMinMode::Deep,
                _ => {}
            }
        }

        for x in matches.value_of("phase-saving").iter() {
            match *x {
                "0" => s.heur.phase_saving = PhaseSaving::None,
                "1" => s.heur.phase_saving = PhaseSaving::Limited,
                "2" => s.heur.phase_saving = PhaseSaving::Full,
                _ => {}
            }
        }

        if matches.is_present("rnd-init") {
            s.heur.rnd_init_act = true;
        }
        if matches.is_present("no-rnd-init") {
            s.heur.rnd_init_act = false;
        }

        if matches.is_present("luby") {
            s.search.restart.luby_restart = true;
        }
        if matches.is_present("no-luby") {
            s.search.restart.luby_restart = false;
        }

        for x in matches.value_of("rfirst").and_then(|s| s.parse().ok()).iter() {
            if 0.0 < *x {
                s.search.restart.restart_first = *x;
            }
        }

        for x in matches.value_of("rinc").and_then(|s| s.parse().ok()).iter() {
            if 1.0 < *x {
                s.search.restart.restart_inc = *x;
            }
        }

        for x in matches.value_of("restart-margin").and_then(|s| s.parse().ok()).iter() {
            if 0.0 < *x && *x <= 1.0 {
                s.search.restart.restart_margin = *x;
            }
        }

        for x in matches.value_of("restart-blocking").and_then(|s| s.parse().ok()).iter() {
            if 1.0 < *x {
                s.search.restart.blocking_factor = *x;
            }
        }

        for x in matches.value_of("chrono").and_then(|s| s.parse::<i64>().ok()).iter() {
            s.search.chrono_threshold = if *x < 0 { None } else { Some(*x as usize) };
        }

        for x in matches.value_of("core-lbd").and_then(|s| s.parse().ok()).iter() {
            s.db.core_lbd_cut = *x;
        }

        for x in matches.value_of("tier2-lbd").and_then(|s| s.parse().ok()).iter() {
            s.db.midtier_lbd_cut = *x;
        }

        for x in matches.value_of("tier2-window").and_then(|s| s.parse().ok()).iter() {
            s.db.midtier_unused_window = *x;
        }

        for x in matches.value_of("reduce-first").and_then(|s| s.parse().ok()).iter() {
            s.db.reduce_first = *x;
        }

        for x in matches.value_of("reduce-inc").and_then(|s| s.parse().ok()).iter() {
            s.db.reduce_inc = *x;
        }

        for x in matches.value_of("gc-frac").and_then(|s| s.parse().ok()).iter() {
            if 0.0 < *x && *x <= 1.0 {
                s.core.garbage_frac = *x;
            }
        }

        if matches.is_present("no-sls") {
            s.search.sls.enabled = false;
        }

        for x in matches.value_of("sls-flips").and_then(|s| s.parse().ok()).iter() {
            s.search.sls.max_flips = *x;
        }

        if matches.is_present("rcheck") {
            s.core.use_rcheck = true;
        }
        if matches.is_present("no-rcheck") {
            s.core.use_rcheck = false;
        }

        s
    };

    let options = MainOptions {
        strict: matches.is_present("strict"),
        pre: !matches.is_present("no-pre"),
        solve: !matches.is_present("no-solve"),
        in_path: matches.value_of("input").unwrap().into(),
        out_path: matches.value_of("output").map(|x| x.into()),
        proof_path: matches.value_of("proof").map(|x| x.into()),
        proof_binary: matches.is_present("proof-binary"),
        proof_check: matches.is_present("proof-check"),
    };

    let solver_options = if matches.is_present("core") {
        SolverOptions::Core(core_options)
    } else {
        let mut s = SimpSettings {
            core: core_options,
            ..Default::default()
        };

        if matches.is_present("asymm") {
            s.simp.use_asymm = true;
        }
        if matches.is_present("no-asymm") {
            s.simp.use_asymm = false;
        }

        if matches.is_present("elim") {
            s.simp.use_elim = true;
        }
        if matches.is_present("no-elim") {
            s.simp.use_elim = false;
        }

        for x in matches.value_of("grow").and_then(|s| s.parse().ok()).iter() {
            s.simp.grow = *x;
        }

        for x in matches.value_of("cl-lim").and_then(|s| s.parse().ok()).iter() {
            if -1 <= *x {
                s.simp.clause_lim = *x;
            }
        }

        for x in matches.value_of("sub-lim").and_then(|s| s.parse().ok()).iter() {
            if -1 <= *x {
                s.simp.subsumption_lim = *x;
            }
        }

        for x in matches.value_of("simp-gc-frac").and_then(|s| s.parse().ok()).iter() {
            if 0.0 < *x && *x <= 1.0 {
                s.simp.simp_garbage_frac = *x;
            }
        }

        SolverOptions::Simp(s)
    };

    match solve(options, solver_options) {
        Ok(code) => process::exit(code),
        Err(err) => {
            eprintln!("Error: {}", err);
            process::exit(1);
        }
    }
}
