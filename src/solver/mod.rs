use crate::formula::assignment::extract_model;
use crate::formula::clause::OutOfMemory;
use crate::formula::{Lit, Var};
use crate::{SolveRes, Solver, Stats};
use self::budget::Budget;
use self::search::{AddClauseRes, SearchRes, SearchSettings, Searcher};
use self::simplify::elim_clauses::ElimClauses;
use self::simplify::Simplificator;

pub mod budget;
mod clause_db;
mod conflict;
mod heuristic;
pub mod search;
pub mod simplify;
mod util;
mod watches;

pub use self::clause_db::ClauseDBSettings;
pub use self::conflict::CCMinMode;
pub use self::heuristic::{HeuristicSettings, PhaseSaving};
pub use self::search::{LearningStrategy, RestartStrategy, SearcherSettings};
pub use self::simplify::SimplificatorSettings;


#[derive(Default)]
pub struct CoreSettings {
    pub heur: HeuristicSettings,
    pub db: ClauseDBSettings,
    pub ccmin_mode: CCMinMode,
    pub search: SearchSettings,
    pub core: SearcherSettings,
}


pub struct SimpSettings {
    pub core: CoreSettings,
    pub simp: SimplificatorSettings,
    pub extend_model: bool, // Whether the user needs to look at the full model.
}

impl Default for SimpSettings {
    fn default() -> Self {
        SimpSettings {
            core: Default::default(),
            simp: Default::default(),
            extend_model: true,
        }
    }
}


/// Plain CDCL solver without pre/inprocessing.
pub struct CoreSolver {
    ok: bool, // If false, the constraints are already unsatisfiable; no part of the solver state may be used.
    oom: bool, // The arena gave up; only an indeterminate answer may be reported.
    ss: SearchSettings,
    search: Searcher,
}

impl Solver for CoreSolver {
    fn n_vars(&self) -> usize {
        self.search.number_of_vars()
    }

    fn n_clauses(&self) -> usize {
        self.search.number_of_clauses()
    }

    fn new_var(&mut self, upol: Option<bool>, dvar: bool) -> Var {
        self.search.new_var(upol, dvar)
    }

    fn add_clause(&mut self, clause: &[Lit]) -> bool {
        if self.ok && !self.oom {
            match self.search.add_clause(clause) {
                Ok(AddClauseRes::UnSAT) => {
                    self.ok = false;
                }
                Ok(_) => {}
                Err(OutOfMemory) => {
                    warn!("arena exhausted while adding a clause");
                    self.oom = true;
                }
            }
        }
        self.ok
    }

    fn preprocess(&mut self, _: &Budget) -> bool {
        if self.ok && !self.oom {
            self.ok = self.search.preprocess();
        }
        self.ok
    }

    fn solve_limited(self, budget: &Budget, assumptions: &[Lit]) -> SolveRes<Self> {
        if !self.ok {
            return SolveRes::UnSAT(self.search.stats());
        }
        if self.oom {
            return SolveRes::Interrupted(0.0, self);
        }

        match self.search.search(&self.ss, budget, assumptions) {
            SearchRes::UnSAT(stats) => SolveRes::UnSAT(stats),

            SearchRes::SAT(assigns, stats) => SolveRes::SAT(extract_model(&assigns), stats),

            SearchRes::AssumpsConfl(conflict, stats) => SolveRes::AssumpsConfl(conflict, stats),

            SearchRes::Interrupted(c, s) => SolveRes::Interrupted(
                c,
                CoreSolver {
                    ok: true,
                    oom: false,
                    ss: self.ss,
                    search: s,
                },
            ),
        }
    }

    fn stats(&self) -> Stats {
        self.search.stats()
    }

    fn export_clauses(&self) -> Vec<Vec<Lit>> {
        self.search.export_cnf()
    }
}

impl CoreSolver {
    pub fn new(settings: CoreSettings) -> Self {
        CoreSolver {
            ok: true,
            oom: false,
            ss: settings.search,
            search: Searcher::new(
                settings.core,
                settings.db,
                settings.heur,
                settings.ccmin_mode,
            ),
        }
    }
}


/// CDCL solver with the variable-elimination simplifier in front. The
/// simplifier owns the occurrence lists until it is switched off after
/// the first `preprocess`.
pub struct SimpSolver {
    core: CoreSolver,
    elimclauses: ElimClauses,
    simp: Option<Simplificator>,
}

impl Solver for SimpSolver {
    fn n_vars(&self) -> usize {
        self.core.n_vars()
    }

    fn n_clauses(&self) -> usize {
        self.core.n_clauses()
    }

    fn new_var(&mut self, upol: Option<bool>, dvar: bool) -> Var {
        let v = self.core.new_var(upol, dvar);
        if let Some(ref mut simp) = self.simp {
            simp.init_var(v);
        }
        v
    }

    fn add_clause(&mut self, ps: &[Lit]) -> bool {
        match self.simp {
            None => self.core.add_clause(ps),
            Some(ref mut simp) => {
                if self.core.ok && !self.core.oom {
                    match simp.add_clause(&mut self.core.search, ps) {
                        Ok(true) => {}
                        Ok(false) => {
                            self.core.ok = false;
                        }
                        Err(OutOfMemory) => {
                            warn!("arena exhausted while adding a clause");
                            self.core.oom = true;
                        }
                    }
                }
                self.core.ok
            }
        }
    }

    fn preprocess(&mut self, budget: &Budget) -> bool {
        if !self.core.preprocess(budget) {
            return false;
        }

        let result = match self.simp {
            None => {
                return true;
            }
            Some(ref mut simp) => {
                if self.core.oom {
                    true
                } else {
                    match simp.eliminate(&mut self.core.search, budget, &mut self.elimclauses) {
                        Ok(ok) => {
                            self.core.ok = ok;
                            ok
                        }
                        Err(OutOfMemory) => {
                            warn!("arena exhausted during preprocessing");
                            self.core.oom = true;
                            true
                        }
                    }
                }
            }
        };

        self.simp_off();
        self.elimclauses.log_size();
        result
    }

    fn solve_limited(mut self, budget: &Budget, assumptions: &[Lit]) -> SolveRes<Self> {
        if !self.core.ok {
            return SolveRes::UnSAT(self.core.search.stats());
        }
        if self.core.oom {
            return SolveRes::Interrupted(0.0, self);
        }

        match self.simp {
            Some(mut simp) => {
                match simp.solve_limited(
                    self.core.search,
                    &self.core.ss,
                    budget,
                    &mut self.elimclauses,
                    assumptions,
                ) {
                    SearchRes::UnSAT(stats) => SolveRes::UnSAT(stats),

                    SearchRes::SAT(assigns, stats) => {
                        let mut model = extract_model(&assigns);
                        self.elimclauses.extend(&mut model);
                        SolveRes::SAT(model, stats)
                    }

                    SearchRes::AssumpsConfl(conflict, stats) => {
                        SolveRes::AssumpsConfl(conflict, stats)
                    }

                    SearchRes::Interrupted(c, s) => SolveRes::Interrupted(
                        c,
                        SimpSolver {
                            core: CoreSolver {
                                ok: true,
                                oom: false,
                                ss: self.core.ss,
                                search: s,
                            },
                            elimclauses: self.elimclauses,
                            simp: Some(simp),
                        },
                    ),
                }
            }

            None => match self.core.search.search(&self.core.ss, budget, assumptions) {
                SearchRes::UnSAT(stats) => SolveRes::UnSAT(stats),

                SearchRes::SAT(assigns, stats) => {
                    let mut model = extract_model(&assigns);
                    self.elimclauses.extend(&mut model);
                    SolveRes::SAT(model, stats)
                }

                SearchRes::AssumpsConfl(conflict, stats) => {
                    SolveRes::AssumpsConfl(conflict, stats)
                }

                SearchRes::Interrupted(c, s) => SolveRes::Interrupted(
                    c,
                    SimpSolver {
                        core: CoreSolver {
                            ok: true,
                            oom: false,
                            ss: self.core.ss,
                            search: s,
                        },
                        elimclauses: self.elimclauses,
                        simp: None,
                    },
                ),
            },
        }
    }

    fn stats(&self) -> Stats {
        self.core.search.stats()
    }

    fn export_clauses(&self) -> Vec<Vec<Lit>> {
        self.core.search.export_cnf()
    }
}

impl SimpSolver {
    pub fn new(settings: SimpSettings) -> Self {
        let mut core = CoreSolver::new(settings.core);
        Simplificator::on(&mut core.search);
        SimpSolver {
            core,
            elimclauses: ElimClauses::new(settings.extend_model),
            simp: Some(Simplificator::new(settings.simp)),
        }
    }

    pub fn is_eliminated(&self, v: Var) -> bool {
        match self.simp {
            Some(ref simp) => simp.is_eliminated(v),
            None => false,
        }
    }

    fn simp_off(&mut self) {
        if self.simp.is_some() {
            Simplificator::off(&mut self.core.search);
            self.simp = None;
        }
    }
}
