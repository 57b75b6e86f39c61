use crate::formula::assignment::*;
use crate::formula::clause::*;
use crate::formula::{LBool, Lit, Var};
use crate::Stats;
use super::budget::Budget;
use super::clause_db::{ClauseDB, ClauseDBSettings};
use super::conflict::{AnalyzeContext, CCMinMode, Conflict};
use super::heuristic::{DecisionHeuristic, HeuristicSettings};
use super::util;
use super::watches::Watches;


#[derive(Clone, Copy, Debug)]
pub struct RestartStrategy {
    pub luby_restart: bool,
    pub restart_first: f64, // The initial restart limit.
    pub restart_inc: f64,   // The factor with which the restart limit is multiplied in each restart.
}

impl Default for RestartStrategy {
    fn default() -> Self {
        RestartStrategy {
            luby_restart: true,
            restart_first: 100.0,
            restart_inc: 2.0,
        }
    }
}

impl RestartStrategy {
    pub fn conflicts_to_go(&self, restarts: u32) -> u64 {
        let base = if self.luby_restart {
            util::luby(self.restart_inc, restarts)
        } else {
            self.restart_inc.powi(restarts as i32)
        };

        (base * self.restart_first) as u64
    }
}


#[derive(Clone, Copy, Debug)]
pub struct LearningStrategy {
    pub min_learnts_lim: i32, // Minimum number to set the learnts limit to.
    pub size_factor: f64,     // The initial limit for learnt clauses as a factor of the original clauses.
    pub size_inc: f64,        // The limit for learnt clauses is multiplied with this factor on each adjust.
    pub size_adjust_start_confl: i32,
    pub size_adjust_inc: f64,
}

impl Default for LearningStrategy {
    fn default() -> Self {
        LearningStrategy {
            min_learnts_lim: 0,
            size_factor: 1.0 / 3.0,
            size_inc: 1.1,
            size_adjust_start_confl: 100,
            size_adjust_inc: 1.5,
        }
    }
}


/// Running learnt-DB budget; `bump` returns true on the adjust cadence,
/// which is also when a statistics row is printed.
struct LearningGuard {
    settings: LearningStrategy,
    max_learnts: f64,
    size_adjust_confl: f64,
    size_adjust_cnt: i32,
}

impl LearningGuard {
    fn new(settings: LearningStrategy) -> Self {
        LearningGuard {
            settings,
            max_learnts: 0.0,
            size_adjust_confl: 0.0,
            size_adjust_cnt: 0,
        }
    }

    fn reset(&mut self, clauses: usize) {
        self.max_learnts = ((clauses as f64) * self.settings.size_factor)
            .max(self.settings.min_learnts_lim as f64);
        self.size_adjust_confl = self.settings.size_adjust_start_confl as f64;
        self.size_adjust_cnt = self.settings.size_adjust_start_confl;
    }

    fn bump(&mut self) -> bool {
        self.size_adjust_cnt -= 1;
        if self.size_adjust_cnt == 0 {
            self.size_adjust_confl *= self.settings.size_adjust_inc;
            self.size_adjust_cnt = self.size_adjust_confl as i32;
            self.max_learnts *= self.settings.size_inc;
            true
        } else {
            false
        }
    }

    fn border(&self) -> f64 {
        self.max_learnts
    }
}


/// Skips a `simplify` run when nothing happened since the previous one.
struct SimplifyGuard {
    last_assigns: Option<usize>,
    props_to_go: u64,
}

impl SimplifyGuard {
    fn new() -> Self {
        SimplifyGuard {
            last_assigns: None,
            props_to_go: 0,
        }
    }

    fn skip(&self, assigns: usize, propagations: u64) -> bool {
        Some(assigns) == self.last_assigns || propagations < self.props_to_go
    }

    fn set_next(&mut self, assigns: usize, propagations: u64, prop_limit: u64) {
        self.last_assigns = Some(assigns);
        self.props_to_go = propagations + prop_limit;
    }
}


#[derive(Default)]
struct SearchStats {
    solves: u64,
    starts: u64,
    decisions: u64,
    conflicts: u64,
}


#[derive(Clone, Copy, Default, Debug)]
pub struct SearchSettings {
    pub restart: RestartStrategy,
    pub learn: LearningStrategy,
}


pub struct SearcherSettings {
    pub garbage_frac: f64, // The fraction of wasted memory allowed before a garbage collection is triggered.
    pub use_rcheck: bool,  // Check if a clause is already implied. Costly, and subsumes subsumption.
}

impl Default for SearcherSettings {
    fn default() -> Self {
        SearcherSettings {
            garbage_frac: 0.20,
            use_rcheck: false,
        }
    }
}


pub enum AddClauseRes {
    UnSAT,
    Consumed,
    Added(ClauseRef),
}


pub enum SearchRes {
    UnSAT(Stats),
    SAT(Assignment, Stats),
    AssumpsConfl(Vec<Lit>, Stats),
    Interrupted(f64, Searcher),
}


enum LoopRes {
    Restart,
    UnSAT,
    SAT,
    AssumpsConfl(Vec<Lit>),
    Interrupted(f64),
}


/// The solving kernel: arena, clause lists, trail, watches, branching
/// order and conflict analysis, driven by the restart loop in `search`.
pub struct Searcher {
    settings: SearcherSettings,
    stats: SearchStats,
    pub(crate) ca: ClauseAllocator,
    pub(crate) db: ClauseDB,
    pub(crate) assigns: Assignment,
    pub(crate) watches: Watches,
    pub(crate) heur: DecisionHeuristic,
    analyze: AnalyzeContext,
    simp: SimplifyGuard,
}

impl Searcher {
    pub fn new(
        settings: SearcherSettings,
        db_set: ClauseDBSettings,
        heur_set: HeuristicSettings,
        ccmin_mode: CCMinMode,
    ) -> Self {
        Searcher {
            settings,
            stats: SearchStats::default(),
            ca: ClauseAllocator::new(),
            db: ClauseDB::new(db_set),
            assigns: Assignment::new(),
            watches: Watches::new(),
            heur: DecisionHeuristic::new(heur_set),
            analyze: AnalyzeContext::new(ccmin_mode),
            simp: SimplifyGuard::new(),
        }
    }

    pub fn number_of_vars(&self) -> usize {
        self.assigns.number_of_vars()
    }

    pub fn number_of_clauses(&self) -> usize {
        self.db.stats.num_clauses
    }

    pub fn new_var(&mut self, upol: Option<bool>, dvar: bool) -> Var {
        let v = self.assigns.new_var();
        self.watches.init_var(v);
        self.heur.init_var(v, upol, dvar);
        self.analyze.init_var(v);
        v
    }

    /// Ingests a clause at level 0: sorts and dedups the literals, drops
    /// tautologies and already-satisfied clauses, strips false literals.
    pub fn add_clause(&mut self, clause: &[Lit]) -> Result<AddClauseRes, OutOfMemory> {
        assert!(self.assigns.is_ground_level());

        if self.settings.use_rcheck && is_implied(self, clause) {
            return Ok(AddClauseRes::Consumed);
        }

        let ps = {
            let mut ps = clause.to_vec();
            ps.sort();
            ps.dedup();
            ps.retain(|&lit| !self.assigns.is_false(lit));

            let mut prev = None;
            for &lit in ps.iter() {
                if self.assigns.is_true(lit) || prev == Some(!lit) {
                    return Ok(AddClauseRes::Consumed);
                }
                prev = Some(lit);
            }

            ps
        };

        match ps.len() {
            0 => Ok(AddClauseRes::UnSAT),

            1 => {
                self.assigns.assign_lit(ps[0], None);
                match self.watches.propagate(&mut self.ca, &mut self.assigns) {
                    None => Ok(AddClauseRes::Consumed),
                    Some(_) => Ok(AddClauseRes::UnSAT),
                }
            }

            _ => {
                let cr = self.db.add_clause(&mut self.ca, &ps)?;
                self.watches.watch_clause(self.ca.view(cr), cr);
                Ok(AddClauseRes::Added(cr))
            }
        }
    }

    /// Top-level unit propagation; false means UNSAT was already derived.
    pub fn preprocess(&mut self) -> bool {
        if self.watches.propagate(&mut self.ca, &mut self.assigns).is_none() {
            self.simplify();
            true
        } else {
            false
        }
    }

    pub fn search(mut self, ss: &SearchSettings, budget: &Budget, assumptions: &[Lit]) -> SearchRes {
        info!("============================[ Search Statistics ]==============================");
        info!("| Conflicts |          ORIGINAL         |          LEARNT          | Progress |");
        info!("|           |    Vars  Clauses Literals |    Limit  Clauses Lit/Cl |          |");
        info!("===============================================================================");

        self.stats.solves += 1;
        let mut learnt = LearningGuard::new(ss.learn);
        learnt.reset(self.db.stats.num_clauses);

        let mut curr_restarts = 0;
        loop {
            let conflicts_to_go = ss.restart.conflicts_to_go(curr_restarts);
            match self.search_loop(conflicts_to_go, budget, &mut learnt, assumptions) {
                LoopRes::Restart => {
                    curr_restarts += 1;
                }

                LoopRes::SAT => {
                    info!("===============================================================================");
                    let stats = self.stats();
                    return SearchRes::SAT(self.assigns, stats);
                }

                LoopRes::UnSAT => {
                    info!("===============================================================================");
                    return SearchRes::UnSAT(self.stats());
                }

                LoopRes::AssumpsConfl(conflict) => {
                    self.cancel_until(GROUND_LEVEL);
                    info!("===============================================================================");
                    let stats = self.stats();
                    return SearchRes::AssumpsConfl(conflict, stats);
                }

                LoopRes::Interrupted(c) => {
                    self.cancel_until(GROUND_LEVEL);
                    info!("===============================================================================");
                    return SearchRes::Interrupted(c, self);
                }
            }
        }
    }

    // One restart period: propagate/learn/backjump until the conflict
    // budget of this period runs out, a definite answer is found, or an
    // assumption fails.
    fn search_loop(
        &mut self,
        nof_conflicts: u64,
        budget: &Budget,
        learnt: &mut LearningGuard,
        assumptions: &[Lit],
    ) -> LoopRes {
        self.stats.starts += 1;

        let confl_limit = self.stats.conflicts + nof_conflicts;
        loop {
            match self.propagate_learn_backjump(learnt) {
                PropagateRes::UnSAT => {
                    return LoopRes::UnSAT;
                }
                PropagateRes::OutOfMemory => {
                    warn!("arena exhausted; giving up on the current solve");
                    let progress = progress_estimate(&self.assigns);
                    return LoopRes::Interrupted(progress);
                }
                PropagateRes::Done => {}
            }

            if !budget.within(self.stats.conflicts, self.watches.propagations) {
                let progress = progress_estimate(&self.assigns);
                return LoopRes::Interrupted(progress);
            }

            if self.stats.conflicts >= confl_limit {
                self.cancel_until(GROUND_LEVEL);
                return LoopRes::Restart;
            }

            // Simplify the set of problem clauses:
            self.simplify();

            if (self.db.number_of_learnts() as f64)
                >= learnt.border() + (self.assigns.number_of_assigns() as f64)
            {
                // Reduce the set of learnt clauses:
                {
                    let watches = &mut self.watches;
                    self.db.reduce(&mut self.ca, &self.assigns, |c| {
                        watches.unwatch_clause_lazy(c);
                    });
                }

                if self.ca.check_garbage(self.settings.garbage_frac) {
                    self.garbage_collect();
                }
            }

            let next = {
                let mut next = None;
                while self.assigns.decision_level() < assumptions.len() {
                    // Perform user provided assumption:
                    let p = assumptions[self.assigns.decision_level()];
                    match self.assigns.value_of(p) {
                        LBool::True => {
                            // Dummy decision level:
                            self.assigns.new_decision_level();
                        }
                        LBool::False => {
                            let conflict =
                                self.analyze.analyze_final(&self.ca, &self.assigns, !p);
                            return LoopRes::AssumpsConfl(conflict);
                        }
                        LBool::Undef => {
                            next = Some(p);
                            break;
                        }
                    }
                }

                if next.is_none() {
                    // New variable decision:
                    self.stats.decisions += 1;
                    match self.heur.pick_branch_lit(&self.assigns) {
                        Some(n) => {
                            next = Some(n);
                        }
                        None => {
                            // Model found:
                            return LoopRes::SAT;
                        }
                    }
                }

                next.unwrap()
            };

            // Increase decision level and enqueue 'next'
            self.assigns.new_decision_level();
            self.assigns.assign_lit(next, None);
        }
    }

    fn propagate_learn_backjump(&mut self, learnt: &mut LearningGuard) -> PropagateRes {
        while let Some(confl) = self.watches.propagate(&mut self.ca, &mut self.assigns) {
            self.stats.conflicts += 1;

            let heur = &mut self.heur;
            let db = &mut self.db;
            match self.analyze.analyze(
                &self.assigns,
                &mut self.ca,
                confl,
                |v| heur.bump_activity(v),
                |ca, cr| db.bump_activity(ca, cr),
            ) {
                Conflict::Ground => {
                    return PropagateRes::UnSAT;
                }

                Conflict::Unit(unit) => {
                    self.cancel_until(GROUND_LEVEL);
                    self.assigns.assign_lit(unit, None);
                }

                Conflict::Learned(level, lit, clause) => {
                    self.cancel_until(level);
                    match self.db.learn_clause(&mut self.ca, &clause) {
                        Ok(cr) => {
                            self.watches.watch_clause(self.ca.view(cr), cr);
                            self.assigns.assign_lit(lit, Some(cr));
                        }
                        Err(OutOfMemory) => {
                            return PropagateRes::OutOfMemory;
                        }
                    }
                }
            }

            self.heur.decay_activity();
            self.db.decay_activity();

            if learnt.bump() {
                info!(
                    "| {:9} | {:7} {:8} {:8} | {:8} {:8} {:6.0} | {:6.3} % |",
                    self.stats.conflicts,
                    self.heur.dec_vars - self.assigns.number_of_ground_assigns(),
                    self.db.stats.num_clauses,
                    self.db.stats.clauses_literals,
                    learnt.border() as u64,
                    self.db.stats.num_learnts,
                    (self.db.stats.learnts_literals as f64) / (self.db.stats.num_learnts as f64),
                    progress_estimate(&self.assigns) * 100.0
                );
            }
        }

        PropagateRes::Done
    }

    /// Level-0 cleanup of satisfied clauses, then heap rebuild and a GC
    /// check. Cheap to call; skips itself unless new facts arrived.
    pub fn simplify(&mut self) {
        if !self.assigns.is_ground_level()
            || self
                .simp
                .skip(self.assigns.number_of_assigns(), self.watches.propagations)
        {
            return;
        }

        {
            let watches = &mut self.watches;
            self.db.remove_satisfied(&mut self.ca, &self.assigns, |c| {
                watches.unwatch_clause_lazy(c);
            });
        }

        if self.ca.check_garbage(self.settings.garbage_frac) {
            self.garbage_collect();
        }

        self.heur.rebuild_order(&self.assigns);
        self.simp.set_next(
            self.assigns.number_of_assigns(),
            self.watches.propagations,
            self.db.stats.clauses_literals + self.db.stats.learnts_literals,
        );
    }

    // Revert to the state at given level (keeping all assignment at 'level' but not beyond).
    pub(crate) fn cancel_until(&mut self, target_level: usize) {
        let heur = &mut self.heur;
        let top_level = self.assigns.decision_level();
        self.assigns.rewind_until_level(target_level, |level, lit| {
            heur.cancel(lit, level == top_level);
        });
    }

    pub(crate) fn garbage_collect(&mut self) {
        let to = ClauseAllocator::new_for_gc(&self.ca);
        self.reloc_gc(to);
    }

    pub(crate) fn reloc_gc(&mut self, mut to: ClauseAllocator) {
        self.watches.reloc_gc(&mut self.ca, &mut to);
        self.assigns.reloc_gc(&mut self.ca, &mut to);
        self.db.reloc_gc(&mut self.ca, &mut to);
        self.ca = to;
    }

    /// Live original clauses plus level-0 facts, for the DIMACS export.
    pub fn export_cnf(&self) -> Vec<Vec<Lit>> {
        let mut out = Vec::new();
        for i in 0..self.assigns.number_of_ground_assigns() {
            out.push(vec![self.assigns.assign_at(i)]);
        }
        for &cr in self.db.original_clauses() {
            if !self.ca.is_deleted(cr) {
                let lits = self.ca.view(cr).lits();
                if !lits.iter().any(|&l| self.assigns.is_true(l)) {
                    out.push(lits.iter().cloned().filter(|&l| !self.assigns.is_false(l)).collect());
                }
            }
        }
        out
    }

    pub fn stats(&self) -> Stats {
        Stats {
            solves: self.stats.solves,
            restarts: self.stats.starts,
            decisions: self.stats.decisions,
            rnd_decisions: self.heur.rnd_decisions,
            conflicts: self.stats.conflicts,
            propagations: self.watches.propagations,
            tot_literals: self.analyze.tot_literals,
            del_literals: self.analyze.max_literals - self.analyze.tot_literals,
        }
    }
}


enum PropagateRes {
    Done,
    UnSAT,
    OutOfMemory,
}


// Trial propagation of the negated clause; an immediate conflict means
// the clause is already implied by the level-0 database.
fn is_implied(search: &mut Searcher, c: &[Lit]) -> bool {
    assert!(search.assigns.is_ground_level());

    search.assigns.new_decision_level();
    for &lit in c.iter() {
        match search.assigns.value_of(lit) {
            LBool::True => {
                search.cancel_until(GROUND_LEVEL);
                return true;
            }
            LBool::Undef => {
                search.assigns.assign_lit(!lit, None);
            }
            LBool::False => {}
        }
    }

    let result = search
        .watches
        .propagate(&mut search.ca, &mut search.assigns)
        .is_some();
    search.cancel_until(GROUND_LEVEL);
    result
}
