use crate::formula::assignment::Assignment;
use crate::formula::clause::{ClauseAllocator, ClauseRef};
use crate::formula::{Lit, LitMap, Var, VarHeap, VarMap};


#[derive(Debug, Clone, Copy)]
pub struct VarStatus {
    pub frozen: bool,
    pub eliminated: bool,
}


/// Candidate queue for variable elimination, cheapest first. The cost of
/// a variable is the product of its positive and negative occurrence
/// counts; ties break on variable id to keep runs reproducible.
pub struct ElimQueue {
    heap: VarHeap,
    n_occ: LitMap<isize>,
}

impl ElimQueue {
    pub fn new() -> ElimQueue {
        ElimQueue {
            heap: VarHeap::new(),
            n_occ: LitMap::new(),
        }
    }

    pub fn init_var(&mut self, v: Var) {
        self.n_occ.insert(v.pos_lit(), 0);
        self.n_occ.insert(v.neg_lit(), 0);

        let n_occ = &self.n_occ;
        self.heap.insert(v, |a, b| Self::before(n_occ, a, b));
    }

    #[inline]
    fn before(n_occ: &LitMap<isize>, a: Var, b: Var) -> bool {
        let cost_a = (n_occ[a.pos_lit()] as u64) * (n_occ[a.neg_lit()] as u64);
        let cost_b = (n_occ[b.pos_lit()] as u64) * (n_occ[b.neg_lit()] as u64);
        cost_a < cost_b || (cost_a == cost_b && a < b)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn update_elim_heap(&mut self, v: Var, var_status: &VarMap<VarStatus>, assigns: &Assignment) {
        let n_occ = &self.n_occ;
        if self.heap.contains(v) {
            self.heap.update(v, |a, b| Self::before(n_occ, a, b));
        } else if !var_status[v].frozen && !var_status[v].eliminated && assigns.is_undef(v) {
            self.heap.insert(v, |a, b| Self::before(n_occ, a, b));
        }
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }

    pub fn bump_lit_occ(&mut self, lit: Lit, delta: isize) {
        self.n_occ[lit] += delta;

        let n_occ = &self.n_occ;
        self.heap.update(lit.var(), |a, b| Self::before(n_occ, a, b));
    }

    pub fn pop(&mut self) -> Option<Var> {
        let n_occ = &self.n_occ;
        self.heap.pop(|a, b| Self::before(n_occ, a, b))
    }
}


#[derive(Debug)]
struct OccLine {
    occs: Vec<ClauseRef>,
    dirty: bool,
}

/// Per-variable lists of original clauses containing the variable,
/// cleaned lazily against the deleted bit.
pub struct OccLists {
    occs: VarMap<OccLine>,
}

impl OccLists {
    pub fn new() -> OccLists {
        OccLists { occs: VarMap::new() }
    }

    pub fn init_var(&mut self, v: Var) {
        self.occs.insert(
            v,
            OccLine {
                occs: Vec::new(),
                dirty: false,
            },
        );
    }

    pub fn clear_var(&mut self, v: Var) {
        self.occs.remove(v);
    }

    pub fn push_occ(&mut self, v: Var, cr: ClauseRef) {
        self.occs[v].occs.push(cr);
    }

    pub fn remove_occ(&mut self, v: Var, cr: ClauseRef) {
        self.occs[v].occs.retain(|&y| y != cr)
    }

    pub fn lookup(&mut self, v: Var, ca: &ClauseAllocator) -> &Vec<ClauseRef> {
        let line = &mut self.occs[v];
        if line.dirty {
            line.occs.retain(|&cr| !ca.is_deleted(cr));
            line.dirty = false;
        }
        &line.occs
    }

    /// Occurrence count including not-yet-filtered deleted clauses; good
    /// enough to pick the cheapest scan list.
    pub fn occs_dirty(&self, v: Var) -> usize {
        self.occs[v].occs.len()
    }

    pub fn smudge(&mut self, v: Var) {
        self.occs[v].dirty = true;
    }

    pub fn reloc_gc(&mut self, from: &mut ClauseAllocator, to: &mut ClauseAllocator) {
        for (_, line) in self.occs.iter_mut() {
            line.dirty = false;
            let mut j = 0;
            for i in 0..line.occs.len() {
                if let Some(cr) = from.reloc_to(to, line.occs[i]) {
                    line.occs[j] = cr;
                    j += 1;
                }
            }
            line.occs.truncate(j);
        }
    }
}
