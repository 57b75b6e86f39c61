#[macro_use]
extern crate log;

use std::{fs, io, path};
use crate::formula::{Lit, Var, VarMap};
use crate::solver::budget::Budget;

pub mod dimacs;
pub mod formula;
pub mod solver;
pub(crate) mod util;


#[derive(Default, Debug, Clone, Copy)]
pub struct Stats {
    pub solves: u64,
    pub restarts: u64,
    pub decisions: u64,
    pub rnd_decisions: u64,
    pub conflicts: u64,
    pub propagations: u64,
    pub tot_literals: u64,
    pub del_literals: u64,
}


pub enum SolveRes<S> {
    UnSAT(Stats),
    SAT(VarMap<bool>, Stats),
    AssumpsConfl(Vec<Lit>, Stats),
    Interrupted(f64, S),
}


pub trait Solver: Sized {
    fn n_vars(&self) -> usize;
    fn n_clauses(&self) -> usize;
    fn new_var(&mut self, upol: Option<bool>, dvar: bool) -> Var;
    fn add_clause(&mut self, clause: &[Lit]) -> bool;
    fn preprocess(&mut self, budget: &Budget) -> bool;
    fn solve_limited(self, budget: &Budget, assumptions: &[Lit]) -> SolveRes<Self>;
    fn stats(&self) -> Stats;
    fn export_clauses(&self) -> Vec<Vec<Lit>>;
}


/// Front-end verdict, mapped to the conventional exit codes by the binary.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum Outcome {
    Sat,
    Unsat,
    Indeterminate,
}


pub enum SolverOptions {
    Core(solver::CoreSettings),
    Simp(solver::SimpSettings),
}

pub struct MainOptions {
    pub strict: bool,
    pub pre: bool,
    pub solve: bool,
    pub in_path: path::PathBuf,
    pub out_path: Option<path::PathBuf>,
    pub dimacs_path: Option<path::PathBuf>,
}


pub fn solve(main_opts: MainOptions, solver_opts: SolverOptions, budget: &Budget) -> io::Result<Outcome> {
    match solver_opts {
        SolverOptions::Core(opts) => {
            let solver = solver::CoreSolver::new(opts);
            solve_with(solver, main_opts, budget)
        }

        SolverOptions::Simp(opts) => {
            let mut solver = solver::SimpSolver::new(opts);
            if !main_opts.pre {
                // An empty-database preprocess just switches the
                // simplifier machinery off for good.
                solver.preprocess(&Budget::new());
            }
            solve_with(solver, main_opts, budget)
        }
    }
}

pub fn solve_with<S: Solver>(mut solver: S, options: MainOptions, budget: &Budget) -> io::Result<Outcome> {
    info!("============================[ Problem Statistics ]=============================");
    info!("|                                                                             |");

    let initial_time = time::precise_time_s();
    let backward_subst = dimacs::parse_file(&options.in_path, &mut solver, options.strict)?;
    let parse_end_time = time::precise_time_s();

    info!("|  Number of variables:  {:12}                                         |", solver.n_vars());
    info!("|  Number of clauses:    {:12}                                         |", solver.n_clauses());
    info!("|  Parse time:           {:12.2} s                                       |", parse_end_time - initial_time);

    let elim_res = solver.preprocess(budget);

    info!("|  Simplification time:  {:12.2} s                                       |", time::precise_time_s() - parse_end_time);
    info!("|                                                                             |");

    if let Some(ref path) = options.dimacs_path {
        let mut out = io::BufWriter::new(fs::File::create(path)?);
        if elim_res {
            dimacs::write_cnf(&mut out, &solver)?;
        } else {
            dimacs::write_unsat_cnf(&mut out)?;
        }
        info!("===============================================================================");
        info!("Simplified formula written to {}", path.display());
        return Ok(Outcome::Indeterminate);
    }

    let result = if !elim_res {
        info!("===============================================================================");
        info!("Solved by simplification");
        SolveRes::UnSAT(solver.stats())
    } else if options.solve {
        solver.solve_limited(budget, &[])
    } else {
        info!("===============================================================================");
        SolveRes::Interrupted(0.0, solver)
    };

    let cpu_time = time::precise_time_s() - initial_time;
    let mem_used = util::mem_used_peak();
    let outcome = match result {
        SolveRes::UnSAT(ref stats) | SolveRes::AssumpsConfl(_, ref stats) => {
            print_stats(stats, cpu_time, mem_used);
            println!("UNSATISFIABLE");
            Outcome::Unsat
        }

        SolveRes::Interrupted(_, ref s) => {
            print_stats(&s.stats(), cpu_time, mem_used);
            println!("INDETERMINATE");
            Outcome::Indeterminate
        }

        SolveRes::SAT(ref model, ref stats) => {
            print_stats(stats, cpu_time, mem_used);
            println!("SATISFIABLE");
            assert!(
                dimacs::validate_model_file(&options.in_path, &backward_subst, model)?,
                "SELF-CHECK FAILED"
            );
            Outcome::Sat
        }
    };

    if let Some(path) = options.out_path {
        dimacs::write_result(fs::File::create(path)?, result, &backward_subst)?;
    }

    Ok(outcome)
}

fn print_stats(stats: &Stats, cpu_time: f64, mem_used: Option<usize>) {
    info!("restarts              : {:<12}", stats.restarts);

    info!("conflicts             : {:<12}   ({:.0} /sec)",
        stats.conflicts,
        (stats.conflicts as f64) / cpu_time);

    info!("decisions             : {:<12}   ({:4.2} % random) ({:.0} /sec)",
        stats.decisions,
        (stats.rnd_decisions as f64) * 100.0 / (stats.decisions as f64),
        (stats.decisions as f64) / cpu_time);

    info!("propagations          : {:<12}   ({:.0} /sec)",
        stats.propagations,
        (stats.propagations as f64) / cpu_time);

    info!("conflict literals     : {:<12}   ({:4.2} % deleted)",
        stats.tot_literals,
        (stats.del_literals as f64) * 100.0 / ((stats.del_literals + stats.tot_literals) as f64));

    if let Some(mem_used) = mem_used {
        info!("Memory used           : {:.2} MB", (mem_used as f64) / 1024.0);
    }
    info!("CPU time              : {} s", cpu_time);
    info!("");
}
