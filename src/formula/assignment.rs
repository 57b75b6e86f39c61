use std::{cmp, fmt};
use super::clause::{ClauseAllocator, ClauseRef};
use super::{LBool, Lit, Var, VarMap};


pub const GROUND_LEVEL: usize = 0;


pub struct VarData {
    pub reason: Option<ClauseRef>,
    pub level: usize,
}


struct VarLine {
    value: LBool,
    vd: VarData,
}


/// Current partial assignment: per-variable value/level/reason plus the
/// trail of assigned literals with decision-level markers. The trail
/// doubles as the propagation queue via `qhead`.
pub struct Assignment {
    lines: Vec<VarLine>,
    trail: Vec<Lit>,
    lim: Vec<usize>,
    qhead: usize,
}

impl Assignment {
    pub fn new() -> Assignment {
        Assignment {
            lines: Vec::new(),
            trail: Vec::new(),
            lim: Vec::new(),
            qhead: 0,
        }
    }


    #[inline]
    pub fn number_of_vars(&self) -> usize {
        self.lines.len()
    }

    #[inline]
    pub fn number_of_assigns(&self) -> usize {
        self.trail.len()
    }

    #[inline]
    pub fn number_of_ground_assigns(&self) -> usize {
        match self.lim.first() {
            Some(&lim) => lim,
            None => self.trail.len(),
        }
    }


    pub fn new_var(&mut self) -> Var {
        self.lines.push(VarLine {
            value: LBool::Undef,
            vd: VarData {
                reason: None,
                level: GROUND_LEVEL,
            },
        });
        Var::from_index(self.lines.len() - 1)
    }


    #[inline]
    pub fn decision_level(&self) -> usize {
        self.lim.len()
    }

    #[inline]
    pub fn is_ground_level(&self) -> bool {
        self.lim.is_empty()
    }

    #[inline]
    pub fn new_decision_level(&mut self) {
        self.lim.push(self.trail.len());
    }


    #[inline]
    pub fn assign_lit(&mut self, lit: Lit, reason: Option<ClauseRef>) {
        let level = self.lim.len();
        let line = &mut self.lines[lit.var().index()];

        assert!(line.value.is_undef());
        line.value = LBool::from_bool(!lit.sign());
        line.vd.level = level;
        line.vd.reason = reason;
        self.trail.push(lit);
    }

    /// Pops the trail back to `target_level`, reporting each undone
    /// literal (with the level it was assigned at) to `f`.
    pub fn rewind_until_level<F: FnMut(usize, Lit)>(&mut self, target_level: usize, mut f: F) {
        while self.lim.len() > target_level {
            let level = self.lim.len();
            let bottom = self.lim.pop().unwrap();
            while self.trail.len() > bottom {
                let lit = self.trail.pop().unwrap();

                f(level, lit);

                let line = &mut self.lines[lit.var().index()];
                line.value = LBool::Undef;
                line.vd.reason = None;
            }
        }

        self.qhead = cmp::min(self.qhead, self.trail.len());
    }


    #[inline]
    pub fn dequeue_all(&mut self) {
        self.qhead = self.trail.len()
    }

    #[inline]
    pub fn dequeue(&mut self) -> Option<Lit> {
        if self.qhead < self.trail.len() {
            let p = self.trail[self.qhead];
            self.qhead += 1;
            Some(p)
        } else {
            None
        }
    }

    #[inline]
    pub fn assign_at(&self, index: usize) -> Lit {
        self.trail[index]
    }

    #[inline]
    pub fn trail(&self) -> &[Lit] {
        &self.trail
    }


    #[inline]
    pub fn is_undef(&self, var: Var) -> bool {
        self.lines[var.index()].value.is_undef()
    }

    #[inline]
    pub fn value_of(&self, lit: Lit) -> LBool {
        lit.apply_sign(self.lines[lit.var().index()].value)
    }

    #[inline]
    pub fn is_true(&self, lit: Lit) -> bool {
        self.value_of(lit) == LBool::True
    }

    #[inline]
    pub fn is_false(&self, lit: Lit) -> bool {
        self.value_of(lit) == LBool::False
    }

    #[inline]
    pub fn vardata(&self, var: Var) -> &VarData {
        &self.lines[var.index()].vd
    }


    pub fn reloc_gc(&mut self, from: &mut ClauseAllocator, to: &mut ClauseAllocator) {
        for &lit in self.trail.iter() {
            let reason = &mut self.lines[lit.var().index()].vd.reason;
            *reason = reason.and_then(|cr| from.reloc_to(to, cr));
        }
    }

    /// A clause is locked while it is the reason of its own head literal.
    pub fn is_locked(&self, ca: &ClauseAllocator, cr: ClauseRef) -> bool {
        let lit = ca.view(cr).head();
        let line = &self.lines[lit.var().index()];
        self.value_of(lit) == LBool::True && line.vd.reason == Some(cr)
    }
}

impl fmt::Debug for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for level in 0..self.lim.len() + 1 {
            let l = if level > 0 { self.lim[level - 1] } else { 0 };
            let r = if level < self.lim.len() {
                self.lim[level]
            } else {
                self.trail.len()
            };

            if r > l {
                write!(f, "[{}:", level)?;
                for lit in self.trail[l..r].iter() {
                    write!(f, " {:?}", lit)?;
                }
                write!(f, " ]")?;
            }
        }

        Ok(())
    }
}


/// Fraction of the search space the current trail pins down; used only
/// for the progress column of the statistics table.
pub fn progress_estimate(assigns: &Assignment) -> f64 {
    let f = 1.0 / (assigns.number_of_vars() as f64);
    let mut progress = 0.0;

    let cl = assigns.lim.len();
    for level in 0..cl + 1 {
        let l = if level == 0 { 0 } else { assigns.lim[level - 1] };
        let r = if level == cl {
            assigns.trail.len()
        } else {
            assigns.lim[level]
        };
        progress += f.powi(level as i32) * ((r - l) as f64);
    }
    progress * f
}


pub fn extract_model(assigns: &Assignment) -> VarMap<bool> {
    let mut model = VarMap::new();
    for &lit in assigns.trail.iter() {
        model.insert(lit.var(), !lit.sign());
    }
    model
}


pub fn try_assign_lit(assigns: &mut Assignment, p: Lit, reason: Option<ClauseRef>) -> bool {
    match assigns.value_of(p) {
        LBool::True => true,
        LBool::False => false,
        LBool::Undef => {
            assigns.assign_lit(p, reason);
            true
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trail_levels() {
        let mut assigns = Assignment::new();
        let x = assigns.new_var();
        let y = assigns.new_var();
        let z = assigns.new_var();

        assigns.assign_lit(x.pos_lit(), None);
        assert_eq!(assigns.vardata(x).level, GROUND_LEVEL);

        assigns.new_decision_level();
        assigns.assign_lit(y.neg_lit(), None);
        assigns.new_decision_level();
        assigns.assign_lit(z.pos_lit(), None);

        assert_eq!(assigns.decision_level(), 2);
        assert_eq!(assigns.vardata(y).level, 1);
        assert_eq!(assigns.vardata(z).level, 2);
        assert!(assigns.is_true(x.pos_lit()));
        assert!(assigns.is_false(y.pos_lit()));

        let mut undone = Vec::new();
        assigns.rewind_until_level(GROUND_LEVEL, |_, lit| undone.push(lit));
        assert_eq!(undone, vec![z.pos_lit(), y.neg_lit()]);
        assert!(assigns.is_undef(y));
        assert!(assigns.is_undef(z));
        assert_eq!(assigns.number_of_assigns(), 1);
    }

    #[test]
    fn queue_consumes_trail_once() {
        let mut assigns = Assignment::new();
        let x = assigns.new_var();
        let y = assigns.new_var();

        assigns.assign_lit(x.pos_lit(), None);
        assert_eq!(assigns.dequeue(), Some(x.pos_lit()));
        assert_eq!(assigns.dequeue(), None);

        assigns.assign_lit(y.neg_lit(), None);
        assert_eq!(assigns.dequeue(), Some(y.neg_lit()));
        assert_eq!(assigns.dequeue(), None);
    }

    #[test]
    fn progress_counts_ground_assigns() {
        let mut assigns = Assignment::new();
        for _ in 0..4 {
            assigns.new_var();
        }
        assert_eq!(progress_estimate(&assigns), 0.0);

        assigns.assign_lit(Var::from_index(0).pos_lit(), None);
        assigns.assign_lit(Var::from_index(1).pos_lit(), None);
        assert!((progress_estimate(&assigns) - 0.5).abs() < 1e-9);
    }
}
