extern crate clap;
extern crate env_logger;
#[macro_use]
extern crate log;

use std::sync::Arc;
use std::time::Duration;
use std::{env, path, process, thread};
use satyr::solver::budget::Budget;
use satyr::solver::{self, CCMinMode, PhaseSaving};
use satyr::{solve, MainOptions, Outcome, SolverOptions};


fn main() {
    let ls012 = ["0", "1", "2"];
    let matches = clap::App::new("satyr")
        .version(clap::crate_version!())
        .about("CDCL SAT solver with a variable-elimination simplifier")

        .arg(clap::Arg::with_name("verb").long("verb").takes_value(true).possible_values(&ls012).help("Verbosity level (0=silent, 1=some, 2=more)"))
        .arg(clap::Arg::with_name("core").long("core").help("Use the core solver without preprocessing machinery"))
        .arg(clap::Arg::with_name("strict").long("strict").help("Validate DIMACS header during parsing"))
        .arg(clap::Arg::with_name("cpu-lim").long("cpu-lim").takes_value(true).help("Limit on CPU time allowed in seconds"))
        .arg(clap::Arg::with_name("mem-lim").long("mem-lim").takes_value(true).help("Limit on memory usage in megabytes"))
        .arg(clap::Arg::with_name("pre").long("pre").help("Completely turn on/off any preprocessing"))
        .arg(clap::Arg::with_name("no-pre").long("no-pre").conflicts_with("pre"))
        .arg(clap::Arg::with_name("solve").long("solve").help("Completely turn on/off solving after preprocessing"))
        .arg(clap::Arg::with_name("no-solve").long("no-solve").conflicts_with("solve"))
        .arg(clap::Arg::with_name("dimacs").long("dimacs").takes_value(true).help("If given, stop after preprocessing and write the result to this file"))
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
        .arg(clap::Arg::with_name("rnd-pol").long("rnd-pol").help("Use random polarities for branching"))
        .arg(clap::Arg::with_name("no-rnd-pol").long("no-rnd-pol").conflicts_with("rnd-pol"))
        .arg(clap::Arg::with_name("luby").long("luby").help("Use the Luby restart sequence"))
        .arg(clap::Arg::with_name("no-luby").long("no-luby").conflicts_with("luby"))
        .arg(clap::Arg::with_name("rfirst").long("rfirst").takes_value(true).help("The base restart interval"))
        .arg(clap::Arg::with_name("rinc").long("rinc").takes_value(true).help("Restart interval increase factor"))
        .arg(clap::Arg::with_name("gc-frac").long("gc-frac").takes_value(true).help("The fraction of wasted memory allowed before a garbage collection is triggered"))
        .arg(clap::Arg::with_name("min-learnts").long("min-learnts").takes_value(true).help("Minimum learnt clause limit"))

        .arg(clap::Arg::with_name("asymm").long("asymm").help("Shrink clauses by asymmetric branching"))
        .arg(clap::Arg::with_name("no-asymm").long("no-asymm").conflicts_with("asymm"))
        .arg(clap::Arg::with_name("rcheck").long("rcheck").help("Check if a clause is already implied. (costly)"))
        .arg(clap::Arg::with_name("no-rcheck").long("no-rcheck").conflicts_with("rcheck"))
        .arg(clap::Arg::with_name("elim").long("elim").help("Perform variable elimination"))
        .arg(clap::Arg::with_name("no-elim").long("no-elim").conflicts_with("elim"))
        .arg(clap::Arg::with_name("grow").long("grow").takes_value(true).help("Allow a variable elimination step to grow by a number of clauses"))
        .arg(clap::Arg::with_name("cl-lim").long("cl-lim").takes_value(true).help("Variables are not eliminated if it produces a resolvent with a length above this limit. -1 means no limit"))
        .arg(clap::Arg::with_name("sub-lim").long("sub-lim").takes_value(true).help("Do not check if subsumption against a clause larger than this. -1 means no limit."))
        .arg(clap::Arg::with_name("simp-gc-frac").long("simp-gc-frac").takes_value(true).help("The fraction of wasted memory allowed before a garbage collection is triggered during simplification."))

        .get_matches();

    {
        let verb = string_option(&matches, "verb");
        let mut builder = env_logger::Builder::new();
        builder.format(|buf, record| {
            use std::io::Write;
            writeln!(buf, "{}", record.args())
        });
        builder.filter(
            None,
            match verb.as_ref().map(|s| s.as_str()) {
                Some("0") => log::LevelFilter::Off,
                Some("2") => log::LevelFilter::Trace,
                _ => log::LevelFilter::Info,
            },
        );
        builder.init();
    }

    let core_options = {
        let mut s: solver::CoreSettings = Default::default();

        if let Some(x) = f64_option(&matches, "var-decay") {
            check(0.0 < x && x < 1.0, "var-decay must be in (0, 1)");
            s.heur.var_decay = x;
        }

        if let Some(x) = f64_option(&matches, "cla-decay") {
            check(0.0 < x && x < 1.0, "cla-decay must be in (0, 1)");
            s.db.clause_decay = x;
        }

        if let Some(x) = f64_option(&matches, "rnd-freq") {
            check(0.0 <= x && x <= 1.0, "rnd-freq must be in [0, 1]");
            s.heur.random_var_freq = x;
        }

        if let Some(x) = f64_option(&matches, "rnd-seed") {
            check(0.0 < x, "rnd-seed must be positive");
            s.heur.random_seed = x;
        }

        if let Some(x) = string_option(&matches, "ccmin-mode") {
            s.ccmin_mode = match x.as_str() {
                "0" => CCMinMode::None,
                "1" => CCMinMode::Basic,
                "2" => CCMinMode::Deep,
                _ => invalid_option("ccmin-mode must be one of 0, 1, 2"),
            };
        }

        if let Some(x) = string_option(&matches, "phase-saving") {
            s.heur.phase_saving = match x.as_str() {
                "0" => PhaseSaving::None,
                "1" => PhaseSaving::Limited,
                "2" => PhaseSaving::Full,
                _ => invalid_option("phase-saving must be one of 0, 1, 2"),
            };
        }

        if let Some(x) = flag_option(&matches, "rnd-init") {
            s.heur.rnd_init_act = x;
        }

        if let Some(x) = flag_option(&matches, "rnd-pol") {
            s.heur.rnd_pol = x;
        }

        if let Some(x) = flag_option(&matches, "luby") {
            s.search.restart.luby_restart = x;
        }

        if let Some(x) = f64_option(&matches, "rfirst") {
            check(0.0 < x, "rfirst must be positive");
            s.search.restart.restart_first = x;
        }

        if let Some(x) = f64_option(&matches, "rinc") {
            check(1.0 < x, "rinc must be greater than 1");
            s.search.restart.restart_inc = x;
        }

        if let Some(x) = f64_option(&matches, "gc-frac") {
            check(0.0 < x && x <= 1.0, "gc-frac must be in (0, 1]");
            s.core.garbage_frac = x;
        }

        if let Some(x) = i64_option(&matches, "min-learnts") {
            check(0 <= x, "min-learnts must be non-negative");
            s.search.learn.min_learnts_lim = x as i32;
        }

        if let Some(x) = flag_option(&matches, "rcheck") {
            s.core.use_rcheck = x;
        }

        s
    };

    let simp_options = {
        let mut s: solver::SimplificatorSettings = Default::default();

        if let Some(x) = flag_option(&matches, "asymm") {
            s.use_asymm = x;
        }

        if let Some(x) = flag_option(&matches, "elim") {
            s.use_elim = x;
        }

        if let Some(x) = i64_option(&matches, "grow") {
            check(0 <= x, "grow must be non-negative");
            s.grow = x as usize;
        }

        if let Some(x) = i64_option(&matches, "cl-lim") {
            check(-1 <= x, "cl-lim must be -1 or above");
            s.clause_lim = x as i32;
        }

        if let Some(x) = i64_option(&matches, "sub-lim") {
            check(-1 <= x, "sub-lim must be -1 or above");
            s.subsumption_lim = x as i32;
        }

        if let Some(x) = f64_option(&matches, "simp-gc-frac") {
            check(0.0 < x && x <= 1.0, "simp-gc-frac must be in (0, 1]");
            s.simp_garbage_frac = x;
        }

        s
    };

    let options = MainOptions {
        strict: matches.is_present("strict"),
        pre: !matches.is_present("no-pre"),
        solve: !matches.is_present("no-solve"),
        in_path: path::PathBuf::from(matches.value_of("input").unwrap()),
        out_path: matches.value_of("output").map(path::PathBuf::from),
        dimacs_path: matches.value_of("dimacs").map(path::PathBuf::from),
    };

    let mut budget = Budget::new();
    budget.off();
    let budget = Arc::new(budget);

    if let Some(secs) = f64_option(&matches, "cpu-lim") {
        check(0.0 < secs, "cpu-lim must be positive");
        let armed = budget.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis((secs * 1000.0) as u64));
            warn!("CPU time limit reached; interrupting");
            armed.interrupt();
        });
    }

    if f64_option(&matches, "mem-lim").is_some() {
        warn!("WARNING! Memory limit not supported on this platform.");
    }

    let solver_options = if matches.is_present("core") {
        SolverOptions::Core(core_options)
    } else {
        SolverOptions::Simp(solver::SimpSettings {
            core: core_options,
            simp: simp_options,
            extend_model: true,
        })
    };

    match solve(options, solver_options, &budget) {
        Ok(Outcome::Sat) => process::exit(10),
        Ok(Outcome::Unsat) => process::exit(20),
        Ok(Outcome::Indeterminate) => process::exit(0),
        Err(err) => {
            eprintln!("ERROR! {}", err);
            process::exit(1);
        }
    }
}


// CLI takes precedence; MINISAT_<OPTION> environment variables fill the gaps.
fn env_option(name: &str) -> Option<String> {
    let key = format!("MINISAT_{}", name.to_uppercase().replace('-', "_"));
    env::var(key).ok()
}

fn string_option(matches: &clap::ArgMatches, name: &str) -> Option<String> {
    matches
        .value_of(name)
        .map(|v| v.to_string())
        .or_else(|| env_option(name))
}

fn f64_option(matches: &clap::ArgMatches, name: &str) -> Option<f64> {
    string_option(matches, name).map(|v| match v.parse() {
        Ok(x) => x,
        Err(_) => invalid_option(&format!("invalid value '{}' for option '{}'", v, name)),
    })
}

fn i64_option(matches: &clap::ArgMatches, name: &str) -> Option<i64> {
    string_option(matches, name).map(|v| match v.parse() {
        Ok(x) => x,
        Err(_) => invalid_option(&format!("invalid value '{}' for option '{}'", v, name)),
    })
}

fn flag_option(matches: &clap::ArgMatches, name: &str) -> Option<bool> {
    if matches.is_present(name) {
        Some(true)
    } else if matches.is_present(&format!("no-{}", name)) {
        Some(false)
    } else {
        env_option(name).map(|v| match v.as_str() {
            "1" | "true" | "on" => true,
            "0" | "false" | "off" => false,
            _ => invalid_option(&format!("invalid value '{}' for option '{}'", v, name)),
        })
    }
}

fn check(condition: bool, message: &str) {
    if !condition {
        invalid_option(message);
    }
}

fn invalid_option(message: &str) -> ! {
    eprintln!("ERROR! {}", message);
    eprintln!("Run with --help for usage.");
    process::exit(1);
}
