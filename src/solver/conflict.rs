use crate::formula::assignment::{Assignment, GROUND_LEVEL};
use crate::formula::clause::{ClauseAllocator, ClauseRef};
use crate::formula::{Lit, Var, VarMap};


/// Learnt-clause minimisation policy (`ccmin-mode`).
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum CCMinMode {
    None,
    Basic,
    Deep,
}

impl Default for CCMinMode {
    fn default() -> Self {
        CCMinMode::Deep
    }
}


#[derive(PartialEq, Eq, Clone, Copy, Debug)]
enum Seen {
    Undef,
    Source,
    Removable,
    Failed,
}


pub enum Conflict {
    /// Conflict at level 0: the formula is unsatisfiable.
    Ground,
    /// The learnt clause is a unit fact; backjump to level 0.
    Unit(Lit),
    /// Backjump level, asserting literal, full learnt clause.
    Learned(usize, Lit, Vec<Lit>),
}


/// Scratch state for 1-UIP analysis. The `seen` marks are cleared via
/// `analyze_toclear` before every return, so resets cost O(touched).
pub struct AnalyzeContext {
    ccmin_mode: CCMinMode,
    seen: VarMap<Seen>,
    analyze_toclear: Vec<Lit>,
    pub max_literals: u64,
    pub tot_literals: u64,
}

impl AnalyzeContext {
    pub fn new(ccmin_mode: CCMinMode) -> AnalyzeContext {
        AnalyzeContext {
            ccmin_mode,
            seen: VarMap::new(),
            analyze_toclear: Vec::new(),
            max_literals: 0,
            tot_literals: 0,
        }
    }

    pub fn init_var(&mut self, v: Var) {
        self.seen.insert(v, Seen::Undef);
    }

    /// Resolves backwards from the conflicting clause to the first unique
    /// implication point of the current level. The returned clause has the
    /// asserting literal first and a literal of the backjump level second.
    pub fn analyze<BV, BC>(
        &mut self,
        assigns: &Assignment,
        ca: &mut ClauseAllocator,
        confl0: ClauseRef,
        mut bump_var: BV,
        mut bump_cla: BC,
    ) -> Conflict
    where
        BV: FnMut(Var),
        BC: FnMut(&mut ClauseAllocator, ClauseRef),
    {
        if assigns.is_ground_level() {
            return Conflict::Ground;
        }

        let current_level = assigns.decision_level();
        let mut out_learnt: Vec<Lit> = Vec::new();

        {
            let mut confl = confl0;
            let mut path_c = 0i32;

            let trail = assigns.trail();
            let mut index = trail.len();
            loop {
                bump_cla(ca, confl);

                let base = if confl == confl0 { 0 } else { 1 };
                for &q in &ca.view(confl).lits()[base..] {
                    let v = q.var();
                    if self.seen[v] == Seen::Undef {
                        let level = assigns.vardata(v).level;
                        if level > GROUND_LEVEL {
                            self.seen[v] = Seen::Source;
                            bump_var(v);
                            if level >= current_level {
                                path_c += 1;
                            } else {
                                out_learnt.push(q);
                            }
                        }
                    }
                }

                // Select next literal to resolve on:
                let pivot = {
                    loop {
                        index -= 1;
                        if self.seen[trail[index].var()] != Seen::Undef {
                            break;
                        }
                    }
                    trail[index]
                };

                self.seen[pivot.var()] = Seen::Undef;

                path_c -= 1;
                if path_c <= 0 {
                    out_learnt.insert(0, !pivot);
                    break;
                }

                confl = assigns.vardata(pivot.var()).reason.unwrap();
            }
        }

        // Minimise conflict clause:
        self.analyze_toclear = out_learnt.clone();
        self.max_literals += out_learnt.len() as u64;
        match self.ccmin_mode {
            CCMinMode::Deep => {
                let abstract_levels = self.abstract_levels(assigns, &out_learnt);
                let uip = out_learnt[0];
                out_learnt
                    .retain(|&l| l == uip || !self.lit_redundant(ca, assigns, l, abstract_levels));
            }
            CCMinMode::Basic => {
                let uip = out_learnt[0];
                out_learnt.retain(|&l| l == uip || !self.lit_redundant_basic(ca, assigns, l));
            }
            CCMinMode::None => {}
        }
        self.tot_literals += out_learnt.len() as u64;

        for l in self.analyze_toclear.iter() {
            self.seen[l.var()] = Seen::Undef; // ('seen[]' is now cleared)
        }

        // Find correct backjump level:
        if out_learnt.len() == 1 {
            Conflict::Unit(out_learnt[0])
        } else {
            let mut max_i = 1;
            let mut max_level = assigns.vardata(out_learnt[1].var()).level;
            for i in 2..out_learnt.len() {
                let level = assigns.vardata(out_learnt[i].var()).level;
                if level > max_level {
                    max_i = i;
                    max_level = level;
                }
            }

            // The second slot holds a literal of the backjump level so it
            // stays a valid watch right after backjumping:
            out_learnt.swap(1, max_i);
            Conflict::Learned(max_level, out_learnt[0], out_learnt)
        }
    }

    // Level-set hash of the learnt clause; a reason literal at a level
    // outside this set can never be absorbed.
    fn abstract_levels(&self, assigns: &Assignment, out_learnt: &[Lit]) -> u32 {
        let mut mask = 0u32;
        for &l in &out_learnt[1..] {
            mask |= 1 << (assigns.vardata(l.var()).level & 31);
        }
        mask
    }

    fn lit_redundant_basic(&self, ca: &ClauseAllocator, assigns: &Assignment, lit: Lit) -> bool {
        match assigns.vardata(lit.var()).reason {
            None => false,
            Some(cr) => {
                for &q in &ca.view(cr).lits()[1..] {
                    if self.seen[q.var()] == Seen::Undef
                        && assigns.vardata(q.var()).level > GROUND_LEVEL
                    {
                        return false;
                    }
                }
                true
            }
        }
    }

    // Check if 'lit' is dominated by the clause literals, walking its
    // implication ancestry with an explicit stack. On failure every node
    // on the stack is marked Failed so later queries bail out early.
    fn lit_redundant(
        &mut self,
        ca: &ClauseAllocator,
        assigns: &Assignment,
        lit: Lit,
        abstract_levels: u32,
    ) -> bool {
        assert!({
            let s = self.seen[lit.var()];
            s == Seen::Undef || s == Seen::Source
        });

        let mut stack = match assigns.vardata(lit.var()).reason {
            None => return false,
            Some(cr) => vec![(lit, &ca.view(cr).lits()[1..])],
        };

        while let Some((p, lits)) = stack.pop() {
            match lits.split_first() {
                Some((&l, tail)) => {
                    stack.push((p, tail));
                    let vd = assigns.vardata(l.var());
                    let seen = self.seen[l.var()];

                    if vd.level == GROUND_LEVEL || seen == Seen::Source || seen == Seen::Removable {
                        continue;
                    }

                    match vd.reason {
                        Some(cr)
                            if seen == Seen::Undef
                                && (1 << (vd.level & 31)) & abstract_levels != 0 =>
                        {
                            stack.push((l, &ca.view(cr).lits()[1..]));
                        }

                        _ => {
                            for &(q, _) in stack.iter() {
                                if self.seen[q.var()] == Seen::Undef {
                                    self.seen[q.var()] = Seen::Failed;
                                    self.analyze_toclear.push(q);
                                }
                            }
                            return false;
                        }
                    }
                }

                None => {
                    if self.seen[p.var()] == Seen::Undef {
                        self.seen[p.var()] = Seen::Removable;
                        self.analyze_toclear.push(p);
                    }
                }
            }
        }

        true
    }

    /// Expresses the final conflict in terms of assumptions: the set of
    /// assumption-negations in the reason closure of `p`.
    pub fn analyze_final(&mut self, ca: &ClauseAllocator, assigns: &Assignment, p: Lit) -> Vec<Lit> {
        let mut out_conflict = vec![p];
        if assigns.is_ground_level() {
            return out_conflict;
        }

        self.seen[p.var()] = Seen::Source;

        let ground = assigns.number_of_ground_assigns();
        for &lit in assigns.trail()[ground..].iter().rev() {
            let x = lit.var();
            if self.seen[x] != Seen::Undef {
                match assigns.vardata(x).reason {
                    None => {
                        assert!(assigns.vardata(x).level > GROUND_LEVEL);
                        out_conflict.push(!lit);
                    }

                    Some(cr) => {
                        for &q in &ca.view(cr).lits()[1..] {
                            if assigns.vardata(q.var()).level > GROUND_LEVEL {
                                self.seen[q.var()] = Seen::Source;
                            }
                        }
                    }
                }
                self.seen[x] = Seen::Undef;
            }
        }
        self.seen[p.var()] = Seen::Undef;

        out_conflict.sort();
        out_conflict.dedup();
        out_conflict
    }
}
