use crate::formula::assignment::{try_assign_lit, GROUND_LEVEL};
use crate::formula::clause::{ClauseAllocator, ClauseRef, OutOfMemory};
use crate::formula::subsumes::{subsumes, unit_subsumes, Subsumes};
use crate::formula::util::{merge, satisfied_with_assignment};
use crate::formula::{Lit, Var, VarMap};
use super::budget::Budget;
use super::search::{AddClauseRes, SearchRes, SearchSettings, Searcher};
use self::elim_queue::{ElimQueue, OccLists, VarStatus};
use self::subsumption_queue::{SubsumptionJob, SubsumptionQueue};

pub mod elim_clauses;
mod elim_queue;
mod subsumption_queue;


pub struct SimplificatorSettings {
    pub grow: usize,          // Allow a variable elimination step to grow by this number of clauses.
    pub clause_lim: i32,      // Do not produce resolvents longer than this. -1 means no limit.
    pub subsumption_lim: i32, // Do not check subsumption against clauses larger than this. -1 means no limit.
    pub simp_garbage_frac: f64, // GC trigger while the simplifier runs (also see 'garbage_frac').
    pub use_asymm: bool,      // Shrink clauses by asymmetric branching.
    pub use_elim: bool,       // Perform variable elimination.
}

impl Default for SimplificatorSettings {
    fn default() -> Self {
        SimplificatorSettings {
            grow: 0,
            clause_lim: 20,
            subsumption_lim: 1000,
            simp_garbage_frac: 0.5,
            use_asymm: false,
            use_elim: true,
        }
    }
}


#[derive(Default)]
struct SimpStats {
    merges: u64,
    asymm_lits: u64,
    eliminated_vars: u64,
}


/// Pre/inprocessing over the level-0 clause database: backward
/// subsumption, self-subsuming resolution and bounded variable
/// elimination, interleaved until fixpoint or budget.
pub struct Simplificator {
    settings: SimplificatorSettings,
    stats: SimpStats,
    var_status: VarMap<VarStatus>,
    occurs: OccLists,
    elim: ElimQueue,
    touched: VarMap<i8>,
    n_touched: usize,
    subsumption_queue: SubsumptionQueue,
}

impl Simplificator {
    pub fn new(settings: SimplificatorSettings) -> Self {
        Simplificator {
            settings,
            stats: SimpStats::default(),
            var_status: VarMap::new(),
            occurs: OccLists::new(),
            elim: ElimQueue::new(),
            touched: VarMap::new(),
            n_touched: 0,
            subsumption_queue: SubsumptionQueue::new(),
        }
    }

    pub fn init_var(&mut self, v: Var) {
        self.var_status.insert(
            v,
            VarStatus {
                frozen: false,
                eliminated: false,
            },
        );
        self.occurs.init_var(v);
        self.touched.insert(v, 0);
        self.elim.init_var(v);
    }

    pub fn is_eliminated(&self, v: Var) -> bool {
        self.var_status[v].eliminated
    }

    pub fn set_frozen(&mut self, v: Var, frozen: bool) {
        self.var_status[v].frozen = frozen;
    }

    pub fn number_of_eliminated_vars(&self) -> u64 {
        self.stats.eliminated_vars
    }

    pub fn add_clause(&mut self, search: &mut Searcher, ps: &[Lit]) -> Result<bool, OutOfMemory> {
        debug_assert!(ps.iter().all(|l| !self.var_status[l.var()].eliminated));

        match search.add_clause(ps)? {
            AddClauseRes::UnSAT => Ok(false),
            AddClauseRes::Consumed => Ok(true),
            AddClauseRes::Added(cr) => {
                // The clause goes onto the queue now and possibly again in
                // 'gather_touched_clauses'; backward subsumption mimicking
                // forward subsumption makes the double check unavoidable.
                self.subsumption_queue.push(cr);

                let lits: Vec<Lit> = search.ca.view(cr).lits().to_vec();
                for &lit in &lits {
                    self.occurs.push_occ(lit.var(), cr);
                    self.touched[lit.var()] = 1;
                    self.n_touched += 1;
                    self.elim.bump_lit_occ(lit, 1);
                }

                Ok(true)
            }
        }
    }

    pub fn solve_limited(
        &mut self,
        mut search: Searcher,
        ss: &SearchSettings,
        budget: &Budget,
        elimclauses: &mut elim_clauses::ElimClauses,
        assumptions: &[Lit],
    ) -> SearchRes {
        // Assumptions must be temporarily frozen to run variable elimination:
        let mut extra_frozen: Vec<Var> = Vec::new();
        for lit in assumptions.iter() {
            let st = &mut self.var_status[lit.var()];

            assert!(!st.eliminated, "assumption on an eliminated variable");
            if !st.frozen {
                st.frozen = true;
                extra_frozen.push(lit.var());
            }
        }

        if !search.preprocess() {
            return SearchRes::UnSAT(search.stats());
        }

        match self.eliminate(&mut search, budget, elimclauses) {
            Ok(true) => {}
            Ok(false) => {
                return SearchRes::UnSAT(search.stats());
            }
            Err(OutOfMemory) => {
                warn!("arena exhausted during simplification; giving up on the current solve");
                return SearchRes::Interrupted(0.0, search);
            }
        }

        match search.search(ss, budget, assumptions) {
            SearchRes::Interrupted(prog, ns) => {
                // Unfreeze the assumptions that were frozen:
                for &v in extra_frozen.iter() {
                    self.var_status[v].frozen = false;
                    self.elim.update_elim_heap(v, &self.var_status, &ns.assigns);
                }

                SearchRes::Interrupted(prog, ns)
            }

            other => other,
        }
    }

    /// Main simplification loop; `Ok(false)` means UNSAT was derived.
    pub fn eliminate(
        &mut self,
        search: &mut Searcher,
        budget: &Budget,
        elimclauses: &mut elim_clauses::ElimClauses,
    ) -> Result<bool, OutOfMemory> {
        while self.n_touched > 0
            || self.subsumption_queue.assigns_left(&search.assigns) > 0
            || self.elim.len() > 0
        {
            self.gather_touched_clauses(&mut search.ca);

            if !self.backward_subsumption_check(search, budget, true)? {
                return Ok(false);
            }

            // Empty elim_heap and return immediately on user-interrupt:
            if budget.interrupted() {
                assert!(self.subsumption_queue.is_empty());
                assert_eq!(self.n_touched, 0);
                self.elim.clear();
                return Ok(true);
            }

            trace!("ELIM: vars = {}", self.elim.len());
            let mut cnt = 0;
            while let Some(var) = self.elim.pop() {
                if budget.interrupted() {
                    break;
                }
                if self.var_status[var].eliminated || !search.assigns.is_undef(var) {
                    cnt += 1;
                    continue;
                }

                if cnt % 100 == 0 {
                    trace!("elimination left: {:10}", self.elim.len());
                }

                if self.settings.use_asymm {
                    // Temporarily freeze the variable, or it would
                    // immediately end up on the queue again:
                    let was_frozen = self.var_status[var].frozen;
                    self.var_status[var].frozen = true;
                    if !self.asymm_var(search, budget, var)? {
                        return Ok(false);
                    }
                    self.var_status[var].frozen = was_frozen;
                }

                // Asymmetric branching may have assigned the variable;
                // check again, and never eliminate frozen variables:
                if self.settings.use_elim
                    && search.assigns.is_undef(var)
                    && !self.var_status[var].frozen
                    && !self.eliminate_var(search, budget, elimclauses, var)?
                {
                    return Ok(false);
                }

                if search.ca.check_garbage(self.settings.simp_garbage_frac) {
                    self.garbage_collect(search);
                }

                cnt += 1;
            }

            assert!(self.subsumption_queue.is_empty());
        }

        Ok(true)
    }

    fn asymm_var(&mut self, search: &mut Searcher, budget: &Budget, v: Var) -> Result<bool, OutOfMemory> {
        let cls = {
            let cls = self.occurs.lookup(v, &search.ca);
            if !search.assigns.is_undef(v) || cls.is_empty() {
                return Ok(true);
            }
            cls.clone()
        };

        for &cr in cls.iter() {
            if let Some(l) = asymmetric_branching(search, v, cr) {
                self.stats.asymm_lits += 1;
                if !self.strengthen_clause(search, cr, l)? {
                    return Ok(false);
                }
            }
        }

        self.backward_subsumption_check(search, budget, false)
    }

    fn remove_clause(&mut self, search: &mut Searcher, cr: ClauseRef) {
        let lits: Vec<Lit> = search.ca.view(cr).lits().to_vec();
        for &lit in &lits {
            self.elim.bump_lit_occ(lit, -1);
            self.elim
                .update_elim_heap(lit.var(), &self.var_status, &search.assigns);
            self.occurs.smudge(lit.var());
        }

        search.watches.unwatch_clause_lazy(search.ca.view(cr));
        search.db.remove_clause(&mut search.ca, cr);
    }

    fn strengthen_clause(
        &mut self,
        search: &mut Searcher,
        cr: ClauseRef,
        l: Lit,
    ) -> Result<bool, OutOfMemory> {
        assert!(search.assigns.is_ground_level());

        self.subsumption_queue.push(cr);

        let len = search.ca.view(cr).len();
        if len == 2 {
            // Strengthening a binary clause leaves a unit fact:
            let unit = {
                let c = search.ca.view(cr);
                let (c0, c1) = c.head_pair();
                if c0 == l {
                    c1
                } else {
                    c0
                }
            };
            self.remove_clause(search, cr);
            Ok(try_assign_lit(&mut search.assigns, unit, None)
                && search
                    .watches
                    .propagate(&mut search.ca, &mut search.assigns)
                    .is_none())
        } else {
            search.watches.unwatch_clause_strict(search.ca.view(cr), cr);
            {
                let ca = &mut search.ca;
                search.db.edit_clause(ca, cr, |c| {
                    c.strengthen(l);
                    debug_assert_eq!(c.len(), len - 1);
                });
            }
            search.watches.watch_clause(search.ca.view(cr), cr);

            self.occurs.remove_occ(l.var(), cr);
            self.elim.bump_lit_occ(l, -1);
            self.elim
                .update_elim_heap(l.var(), &self.var_status, &search.assigns);
            Ok(true)
        }
    }

    fn eliminate_var(
        &mut self,
        search: &mut Searcher,
        budget: &Budget,
        elimclauses: &mut elim_clauses::ElimClauses,
        v: Var,
    ) -> Result<bool, OutOfMemory> {
        debug_assert!({
            let st = &self.var_status[v];
            !st.frozen && !st.eliminated
        });
        debug_assert!(search.assigns.is_undef(v));

        // Split the occurrences into positive and negative:
        let cls = self.occurs.lookup(v, &search.ca).clone();
        let mut pos = Vec::new();
        let mut neg = Vec::new();
        for &cr in cls.iter() {
            for &l in search.ca.view(cr).lits() {
                if l.var() == v {
                    if l.sign() {
                        neg.push(cr);
                    } else {
                        pos.push(cr);
                    }
                    break;
                }
            }
        }

        // The number of non-tautological resolvents must stay within
        // 'grow', and no resolvent may exceed the length limit:
        let mut cnt = 0;
        for &pr in pos.iter() {
            for &nr in neg.iter() {
                self.stats.merges += 1;
                if let Some(resolvent) = merge(v, search.ca.view(pr).lits(), search.ca.view(nr).lits()) {
                    cnt += 1;
                    if cnt > cls.len() + self.settings.grow
                        || (self.settings.clause_lim != -1
                            && (resolvent.len() as i32) > self.settings.clause_lim)
                    {
                        return Ok(true);
                    }
                }
            }
        }

        self.var_status[v].eliminated = true;
        search.heur.set_decision_var(v, false);
        self.stats.eliminated_vars += 1;

        // Record the smaller side for model reconstruction; the unit
        // after it is the variable's default polarity:
        if pos.len() > neg.len() {
            for &cr in neg.iter() {
                elimclauses.mk_elim_clause(v, search.ca.view(cr).lits());
            }
            elimclauses.mk_elim_unit(v.pos_lit());
        } else {
            for &cr in pos.iter() {
                elimclauses.mk_elim_clause(v, search.ca.view(cr).lits());
            }
            elimclauses.mk_elim_unit(v.neg_lit());
        }

        // Produce clauses in cross product:
        let mut resolvents = Vec::new();
        for &pr in pos.iter() {
            for &nr in neg.iter() {
                self.stats.merges += 1;
                if let Some(resolvent) = merge(v, search.ca.view(pr).lits(), search.ca.view(nr).lits()) {
                    resolvents.push(resolvent);
                }
            }
        }

        for &cr in cls.iter() {
            self.remove_clause(search, cr);
        }

        for resolvent in resolvents.iter() {
            if !self.add_clause(search, resolvent)? {
                return Ok(false);
            }
        }

        // Free the occurrence list for this variable:
        self.occurs.clear_var(v);

        self.backward_subsumption_check(search, budget, false)
    }

    // Backward subsumption + backward subsumption resolution
    fn backward_subsumption_check(
        &mut self,
        search: &mut Searcher,
        budget: &Budget,
        verbose: bool,
    ) -> Result<bool, OutOfMemory> {
        assert!(search.assigns.is_ground_level());

        if verbose {
            trace!(
                "BWD-SUB: queue = {}, trail = {}",
                self.subsumption_queue.len(),
                self.subsumption_queue.assigns_left(&search.assigns)
            );
        }

        let mut cnt = 0u64;
        let mut subsumed = 0u64;
        let mut deleted_literals = 0u64;

        while let Some(job) = self.subsumption_queue.pop(&search.ca, &search.assigns) {
            // Empty subsumption queue and return immediately on user-interrupt:
            if budget.interrupted() {
                self.subsumption_queue.clear(&search.assigns);
                break;
            }

            if verbose && cnt % 1000 == 0 {
                trace!(
                    "subsumption left: {:10} ({:10} subsumed, {:10} deleted literals)",
                    self.subsumption_queue.len(),
                    subsumed,
                    deleted_literals
                );
            }
            cnt += 1;

            match job {
                SubsumptionJob::Assign(unit) => {
                    for &cj in self.occurs.lookup(unit.var(), &search.ca).clone().iter() {
                        let candidate = {
                            let c = search.ca.view(cj);
                            !c.is_deleted()
                                && (self.settings.subsumption_lim == -1
                                    || (c.len() as i32) < self.settings.subsumption_lim)
                        };
                        if candidate {
                            match unit_subsumes(unit, search.ca.view(cj)) {
                                Subsumes::Different => {}

                                Subsumes::Exact => {
                                    subsumed += 1;
                                    self.remove_clause(search, cj);
                                }

                                Subsumes::LitSign(l) => {
                                    deleted_literals += 1;
                                    if !self.strengthen_clause(search, cj, !l)? {
                                        return Ok(false);
                                    }
                                }
                            }
                        }
                    }
                }

                SubsumptionJob::Clause(cr) => {
                    // Scan the occurrence list of the rarest variable:
                    let best = {
                        let c = search.ca.view(cr);
                        let mut best = c.head().var();
                        for &lit in &c.lits()[1..] {
                            if self.occurs.occs_dirty(lit.var()) < self.occurs.occs_dirty(best) {
                                best = lit.var();
                            }
                        }
                        best
                    };

                    for &cj in self.occurs.lookup(best, &search.ca).clone().iter() {
                        if search.ca.is_deleted(cr) {
                            break;
                        }

                        let candidate = cj != cr && {
                            let c = search.ca.view(cj);
                            !c.is_deleted()
                                && (self.settings.subsumption_lim == -1
                                    || (c.len() as i32) < self.settings.subsumption_lim)
                        };
                        if candidate {
                            match subsumes(search.ca.view(cr), search.ca.view(cj)) {
                                Subsumes::Different => {}

                                Subsumes::Exact => {
                                    subsumed += 1;
                                    self.remove_clause(search, cj);
                                }

                                Subsumes::LitSign(l) => {
                                    deleted_literals += 1;
                                    if !self.strengthen_clause(search, cj, !l)? {
                                        return Ok(false);
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }

        Ok(true)
    }

    fn gather_touched_clauses(&mut self, ca: &mut ClauseAllocator) {
        if self.n_touched == 0 {
            return;
        }

        self.subsumption_queue.remark_touched(ca, false);

        {
            let occurs = &mut self.occurs;
            let var_status = &self.var_status;
            let queue = &mut self.subsumption_queue;
            for (v, touched) in self.touched.iter_mut() {
                if *touched != 0 && !var_status[v].eliminated {
                    for &cr in occurs.lookup(v, ca) {
                        let c = ca.edit(cr);
                        if !c.touched() {
                            queue.push(cr);
                            c.set_touched(true);
                        }
                    }
                    *touched = 0;
                }
            }
        }

        self.subsumption_queue.remark_touched(ca, true);
        self.n_touched = 0;
    }

    pub fn garbage_collect(&mut self, search: &mut Searcher) {
        let mut to = ClauseAllocator::new_for_gc(&search.ca);
        self.occurs.reloc_gc(&mut search.ca, &mut to);
        self.subsumption_queue.reloc_gc(&mut search.ca, &mut to);
        search.reloc_gc(to);
    }

    /// Hands the database back to the plain searcher: satisfied-clause
    /// removal goes back on and the arena is compacted once.
    pub fn off(search: &mut Searcher) {
        search.db.settings.remove_satisfied = true;
        search.heur.rebuild_order(&search.assigns);
        search.garbage_collect();
    }

    pub fn on(search: &mut Searcher) {
        search.db.settings.remove_satisfied = false;
    }
}


// Propagate the negation of every other literal of the clause; if that
// already conflicts, the clause can be strengthened by the literal of `v`.
fn asymmetric_branching(search: &mut Searcher, v: Var, cr: ClauseRef) -> Option<Lit> {
    assert!(search.assigns.is_ground_level());

    let l = {
        let c = search.ca.view(cr);
        if c.is_deleted() || satisfied_with_assignment(c.lits(), &search.assigns) {
            return None;
        }

        search.assigns.new_decision_level();

        let mut vl = None;
        for &lit in c.lits() {
            if v == lit.var() {
                vl = Some(lit);
            } else if search.assigns.is_undef(lit.var()) {
                search.assigns.assign_lit(!lit, None);
            }
        }

        vl.unwrap()
    };

    let res = search
        .watches
        .propagate(&mut search.ca, &mut search.assigns);
    search.cancel_until(GROUND_LEVEL);
    res.map(|_| l)
}
