use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use satyr::formula::{Lit, Var, VarMap};
use satyr::solver::budget::Budget;
use satyr::solver::{CoreSettings, CoreSolver, SimpSettings, SimpSolver};
use satyr::{SolveRes, Solver, Stats};


#[derive(Debug)]
enum Verdict {
    Sat(VarMap<bool>),
    Unsat,
    Confl(Vec<Lit>),
    Indet,
}

impl Verdict {
    fn is_sat(&self) -> bool {
        match self {
            Verdict::Sat(_) => true,
            _ => false,
        }
    }

    fn is_unsat(&self) -> bool {
        match self {
            Verdict::Unsat | Verdict::Confl(_) => true,
            _ => false,
        }
    }
}


fn lit(id: i32) -> Lit {
    assert!(id != 0);
    Var::from_index((id.abs() - 1) as usize).lit(id < 0)
}

fn load<S: Solver>(solver: &mut S, n_vars: usize, clauses: &[Vec<i32>]) {
    while solver.n_vars() < n_vars {
        solver.new_var(None, true);
    }
    for c in clauses {
        let lits: Vec<Lit> = c.iter().map(|&id| lit(id)).collect();
        solver.add_clause(&lits);
    }
}

fn finish<S: Solver>(result: SolveRes<S>) -> (Verdict, Stats) {
    match result {
        SolveRes::UnSAT(stats) => (Verdict::Unsat, stats),
        SolveRes::SAT(model, stats) => (Verdict::Sat(model), stats),
        SolveRes::AssumpsConfl(conflict, stats) => (Verdict::Confl(conflict), stats),
        SolveRes::Interrupted(_, s) => {
            let stats = s.stats();
            (Verdict::Indet, stats)
        }
    }
}

fn solve_simp(n_vars: usize, clauses: &[Vec<i32>], assumptions: &[i32], pre: bool) -> (Verdict, Stats) {
    let mut budget = Budget::new();
    budget.off();

    let mut solver = SimpSolver::new(SimpSettings::default());
    if !pre {
        solver.preprocess(&budget);
    }
    load(&mut solver, n_vars, clauses);

    if !solver.preprocess(&budget) {
        let stats = solver.stats();
        return (Verdict::Unsat, stats);
    }

    let assumption_lits: Vec<Lit> = assumptions.iter().map(|&id| lit(id)).collect();
    finish(solver.solve_limited(&budget, &assumption_lits))
}

fn solve_core(n_vars: usize, clauses: &[Vec<i32>], assumptions: &[i32]) -> (Verdict, Stats) {
    let mut budget = Budget::new();
    budget.off();

    let mut solver = CoreSolver::new(CoreSettings::default());
    load(&mut solver, n_vars, clauses);

    if !solver.preprocess(&budget) {
        let stats = solver.stats();
        return (Verdict::Unsat, stats);
    }

    let assumption_lits: Vec<Lit> = assumptions.iter().map(|&id| lit(id)).collect();
    finish(solver.solve_limited(&budget, &assumption_lits))
}

fn model_satisfies(model: &VarMap<bool>, clauses: &[Vec<i32>]) -> bool {
    clauses.iter().all(|c| {
        c.iter().any(|&id| {
            let l = lit(id);
            match model.get(l.var()) {
                Some(&value) => value != l.sign(),
                None => false,
            }
        })
    })
}

fn brute_force_sat(n_vars: usize, clauses: &[Vec<i32>]) -> bool {
    assert!(n_vars <= 16);
    for bits in 0u32..(1 << n_vars) {
        let sat = clauses.iter().all(|c| {
            c.iter().any(|&id| {
                let value = (bits >> (id.abs() - 1)) & 1 == 1;
                if id > 0 {
                    value
                } else {
                    !value
                }
            })
        });
        if sat {
            return true;
        }
    }
    false
}

fn random_cnf(rng: &mut StdRng, n_vars: usize, n_clauses: usize, width: usize) -> Vec<Vec<i32>> {
    let mut clauses = Vec::with_capacity(n_clauses);
    for _ in 0..n_clauses {
        let mut clause: Vec<i32> = Vec::with_capacity(width);
        while clause.len() < width {
            let v = rng.gen_range(1, n_vars as i32 + 1);
            if !clause.iter().any(|l| l.abs() == v) {
                clause.push(if rng.gen::<bool>() { v } else { -v });
            }
        }
        clauses.push(clause);
    }
    clauses
}

// Random formula guaranteed satisfiable: every clause is patched to agree
// with a hidden assignment on at least one literal.
fn random_satisfiable_cnf(rng: &mut StdRng, n_vars: usize, n_clauses: usize) -> Vec<Vec<i32>> {
    let hidden: Vec<bool> = (0..n_vars).map(|_| rng.gen()).collect();
    let mut clauses = random_cnf(rng, n_vars, n_clauses, 3);
    for clause in clauses.iter_mut() {
        let agrees = clause.iter().any(|&id| hidden[(id.abs() - 1) as usize] == (id > 0));
        if !agrees {
            let k = rng.gen_range(0, clause.len());
            clause[k] = -clause[k];
        }
    }
    clauses
}


#[test]
fn trivial_contradiction_is_unsat() {
    let clauses = vec![vec![1], vec![-1]];
    let (verdict, _) = solve_simp(1, &clauses, &[], true);
    assert!(verdict.is_unsat());
}

#[test]
fn small_sat_instance_has_valid_model() {
    let clauses = vec![vec![1, 2, 3], vec![-1, 2], vec![-2, 3]];
    match solve_simp(3, &clauses, &[], true) {
        (Verdict::Sat(model), _) => assert!(model_satisfies(&model, &clauses)),
        other => panic!("expected SAT, got {:?}", other.0),
    }
}

#[test]
fn empty_formula_is_sat() {
    let (verdict, _) = solve_simp(0, &[], &[], true);
    assert!(verdict.is_sat());
}

#[test]
fn pigeonhole_is_unsat() {
    // 3 pigeons into 2 holes; var of pigeon i in hole h is 2*i + h + 1.
    let mut clauses = Vec::new();
    for i in 0..3 {
        clauses.push(vec![2 * i + 1, 2 * i + 2]);
    }
    for h in 0..2 {
        for i in 0..3 {
            for j in (i + 1)..3 {
                clauses.push(vec![-(2 * i + h + 1), -(2 * j + h + 1)]);
            }
        }
    }

    let (verdict, _) = solve_simp(6, &clauses, &[], true);
    assert!(verdict.is_unsat());
    let (verdict, _) = solve_core(6, &clauses, &[]);
    assert!(verdict.is_unsat());
}

#[test]
fn tautological_clause_changes_nothing() {
    let base = vec![vec![1, 2], vec![-1, 2], vec![-2, 3]];
    let mut with_taut = base.clone();
    with_taut.push(vec![1, -1, 2]);

    let (a, _) = solve_simp(3, &base, &[], true);
    let (b, _) = solve_simp(3, &with_taut, &[], true);
    assert_eq!(a.is_sat(), b.is_sat());
    if let Verdict::Sat(model) = b {
        assert!(model_satisfies(&model, &base));
    }
}

#[test]
fn contradictory_assumptions_report_final_conflict() {
    let clauses = vec![vec![1, 2]];
    match solve_core(2, &clauses, &[1, -1]) {
        (Verdict::Confl(conflict), _) => {
            assert!(!conflict.is_empty());
            for l in conflict {
                assert_eq!(l.var(), lit(1).var());
            }
        }
        other => panic!("expected a final conflict, got {:?}", other.0),
    }
}

#[test]
fn failing_assumption_is_reported() {
    // 1 forces 2; assuming -2 and 1 is contradictory.
    let clauses = vec![vec![-1, 2]];
    match solve_core(2, &clauses, &[1, -2]) {
        (Verdict::Confl(conflict), _) => {
            // The conflict is expressed in negations of the assumptions used.
            for l in conflict.iter() {
                assert!(l.var() == lit(1).var() || l.var() == lit(2).var());
            }
        }
        other => panic!("expected a final conflict, got {:?}", other.0),
    }
}

#[test]
fn matches_brute_force_on_small_instances() {
    let mut rng = StdRng::seed_from_u64(0xC0FFEE);
    for round in 0..200 {
        let n_vars = 2 + (round % 7);
        let n_clauses = 3 + (round % 17);
        let width = (2 + round % 3).min(n_vars);
        let clauses = random_cnf(&mut rng, n_vars, n_clauses, width);

        let expected = brute_force_sat(n_vars, &clauses);
        let (simp, _) = solve_simp(n_vars, &clauses, &[], true);
        let (core, _) = solve_core(n_vars, &clauses, &[]);

        assert_eq!(simp.is_sat(), expected, "simp vs brute force on {:?}", clauses);
        assert_eq!(core.is_sat(), expected, "core vs brute force on {:?}", clauses);

        if let Verdict::Sat(model) = simp {
            assert!(model_satisfies(&model, &clauses), "bad model on {:?}", clauses);
        }
        if let Verdict::Sat(model) = core {
            assert!(model_satisfies(&model, &clauses), "bad model on {:?}", clauses);
        }
    }
}

#[test]
fn planted_instances_never_come_out_unsat() {
    let mut rng = StdRng::seed_from_u64(31337);
    for _ in 0..30 {
        let clauses = random_satisfiable_cnf(&mut rng, 30, 120);
        let (verdict, _) = solve_simp(30, &clauses, &[], true);
        match verdict {
            Verdict::Sat(model) => assert!(model_satisfies(&model, &clauses)),
            other => panic!("satisfiable instance reported {:?}", other),
        }
    }
}

#[test]
fn identical_runs_are_deterministic() {
    let mut rng = StdRng::seed_from_u64(7);
    let clauses = random_cnf(&mut rng, 40, 170, 3);

    let (v1, s1) = solve_simp(40, &clauses, &[], true);
    let (v2, s2) = solve_simp(40, &clauses, &[], true);

    assert_eq!(s1.conflicts, s2.conflicts);
    assert_eq!(s1.decisions, s2.decisions);
    assert_eq!(s1.propagations, s2.propagations);
    match (v1, v2) {
        (Verdict::Sat(m1), Verdict::Sat(m2)) => {
            for (v, &value) in m1.iter() {
                assert_eq!(m2.get(v), Some(&value));
            }
        }
        (Verdict::Unsat, Verdict::Unsat) => {}
        (a, b) => panic!("diverging outcomes: {:?} vs {:?}", a, b),
    }
}

#[test]
fn preprocessing_preserves_satisfiability() {
    let mut rng = StdRng::seed_from_u64(0xBEEF);
    for round in 0..20 {
        let clauses = random_cnf(&mut rng, 100, 420, 3);

        let (with_pre, _) = solve_simp(100, &clauses, &[], true);
        let (without_pre, _) = solve_simp(100, &clauses, &[], false);
        let (core, _) = solve_core(100, &clauses, &[]);

        assert_eq!(with_pre.is_sat(), without_pre.is_sat(), "round {}", round);
        assert_eq!(with_pre.is_sat(), core.is_sat(), "round {}", round);

        // Models over eliminated variables must extend to the original formula:
        if let Verdict::Sat(model) = with_pre {
            assert!(model_satisfies(&model, &clauses), "round {}", round);
        }
    }
}

#[test]
fn elimination_extends_model_over_removed_vars() {
    // Var 2 occurs positively once and negatively once; it is a prime
    // candidate for elimination yet the reported model must still cover it.
    let clauses = vec![vec![1, 2], vec![-2, 3], vec![1, 3, 4], vec![-4, -1]];
    match solve_simp(4, &clauses, &[], true) {
        (Verdict::Sat(model), _) => assert!(model_satisfies(&model, &clauses)),
        other => panic!("expected SAT, got {:?}", other.0),
    }
}

#[test]
fn conflict_budget_interrupts() {
    // pigeonhole over 4 holes keeps the solver busy past one conflict
    let mut php = Vec::new();
    for i in 0..5 {
        php.push((0..4).map(|h| (i * 4 + h + 1) as i32).collect::<Vec<i32>>());
    }
    for h in 0..4 {
        for i in 0..5 {
            for j in (i + 1)..5 {
                php.push(vec![-((i * 4 + h + 1) as i32), -((j * 4 + h + 1) as i32)]);
            }
        }
    }

    let mut budget = Budget::new();
    budget.limit_conflicts(1);

    let mut solver = CoreSolver::new(CoreSettings::default());
    load(&mut solver, 20, &php);
    assert!(solver.preprocess(&budget));
    match solver.solve_limited(&budget, &[]) {
        SolveRes::Interrupted(_, _) => {}
        SolveRes::UnSAT(_) => panic!("budget of one conflict cannot refute PHP(5,4)"),
        SolveRes::SAT(_, _) => panic!("PHP(5,4) is unsatisfiable"),
        SolveRes::AssumpsConfl(_, _) => panic!("no assumptions were given"),
    }
}

#[test]
fn interrupt_flag_stops_the_search() {
    let mut rng = StdRng::seed_from_u64(99);
    let clauses = random_cnf(&mut rng, 50, 210, 3);

    let mut budget = Budget::new();
    budget.off();
    budget.interrupt();

    let mut solver = CoreSolver::new(CoreSettings::default());
    load(&mut solver, 50, &clauses);
    solver.preprocess(&budget);
    match solver.solve_limited(&budget, &[]) {
        SolveRes::Interrupted(_, _) => {}
        _ => panic!("interrupted solve must be indeterminate"),
    }
}
