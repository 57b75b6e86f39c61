use std::cmp::Ordering;
use crate::formula::assignment::Assignment;
use crate::formula::clause::*;
use crate::formula::util::{calc_abstraction, satisfied_with_assignment};
use crate::formula::Lit;


pub struct ClauseDBSettings {
    pub remove_satisfied: bool, // Linear scan for satisfied clauses in 'simplify'; off while the simplifier owns the occurrence lists.
    pub clause_decay: f64,
}

impl Default for ClauseDBSettings {
    fn default() -> ClauseDBSettings {
        ClauseDBSettings {
            remove_satisfied: true,
            clause_decay: 0.999,
        }
    }
}


#[derive(Clone, Copy, Debug, Default)]
pub struct DBStats {
    pub num_clauses: usize,
    pub num_learnts: usize,
    pub clauses_literals: u64,
    pub learnts_literals: u64,
}

impl DBStats {
    fn add(&mut self, clause: &Clause) {
        if clause.is_learnt() {
            self.num_learnts += 1;
            self.learnts_literals += clause.len() as u64;
        } else {
            self.num_clauses += 1;
            self.clauses_literals += clause.len() as u64;
        }
    }

    fn del(&mut self, clause: &Clause) {
        if clause.is_learnt() {
            self.num_learnts -= 1;
            self.learnts_literals -= clause.len() as u64;
        } else {
            self.num_clauses -= 1;
            self.clauses_literals -= clause.len() as u64;
        }
    }
}


/// Lists of original and learnt clauses plus learnt-clause activities.
/// Activities are bumped with a geometrically growing `cla_inc` and
/// rescaled at 1e20, mirroring the variable activities.
pub struct ClauseDB {
    pub settings: ClauseDBSettings,
    cla_inc: f64,
    clauses: Vec<ClauseRef>,
    learnts: Vec<ClauseRef>,
    pub stats: DBStats,
}

impl ClauseDB {
    pub fn new(settings: ClauseDBSettings) -> ClauseDB {
        ClauseDB {
            settings,
            cla_inc: 1.0,
            clauses: Vec::new(),
            learnts: Vec::new(),
            stats: DBStats::default(),
        }
    }

    pub fn add_clause(
        &mut self,
        ca: &mut ClauseAllocator,
        lits: &[Lit],
    ) -> Result<ClauseRef, OutOfMemory> {
        let header = ClauseHeader::Original {
            abstraction: calc_abstraction(lits),
        };
        let (c, cr) = ca.alloc(lits, header)?;
        self.stats.add(c);
        self.clauses.push(cr);
        Ok(cr)
    }

    pub fn learn_clause(
        &mut self,
        ca: &mut ClauseAllocator,
        lits: &[Lit],
    ) -> Result<ClauseRef, OutOfMemory> {
        let header = ClauseHeader::Learnt { activity: 0.0 };
        let (c, cr) = ca.alloc(lits, header)?;
        self.stats.add(c);
        self.learnts.push(cr);
        self.bump_activity(ca, cr);
        Ok(cr)
    }

    pub fn remove_clause(&mut self, ca: &mut ClauseAllocator, cr: ClauseRef) {
        self.stats.del(ca.view(cr));
        ca.free(cr);
    }

    pub fn edit_clause<F: FnOnce(&mut Clause)>(
        &mut self,
        ca: &mut ClauseAllocator,
        cr: ClauseRef,
        f: F,
    ) {
        let c = ca.edit(cr);
        self.stats.del(c);
        f(c);
        self.stats.add(c);
    }

    pub fn bump_activity(&mut self, ca: &mut ClauseAllocator, cr: ClauseRef) {
        let new = {
            let c = ca.edit(cr);
            if let ClauseHeader::Learnt { ref mut activity } = c.header {
                let new = *activity as f64 + self.cla_inc;
                *activity = new as f32;
                new
            } else {
                return;
            }
        };

        if new > 1e20 {
            self.cla_inc *= 1e-20;
            for &cri in self.learnts.iter() {
                let c = ca.edit(cri);
                if let ClauseHeader::Learnt { ref mut activity } = c.header {
                    *activity = ((*activity as f64) * 1e-20) as f32;
                } else {
                    panic!("learnt clause expected");
                }
            }
        }
    }

    pub fn decay_activity(&mut self) {
        self.cla_inc *= 1.0 / self.settings.clause_decay;
    }

    pub fn number_of_learnts(&self) -> usize {
        self.learnts.len()
    }

    pub fn original_clauses(&self) -> &[ClauseRef] {
        &self.clauses
    }

    /// Removes roughly half of the learnt clauses, lowest activity first.
    /// Binary clauses and clauses locked as a reason survive.
    pub fn reduce<F: FnMut(&Clause)>(
        &mut self,
        ca: &mut ClauseAllocator,
        assigns: &Assignment,
        mut notify: F,
    ) {
        self.learnts.sort_by(|&rx, &ry| {
            let x = ca.view(rx);
            let y = ca.view(ry);

            if x.len() == 2 && y.len() == 2 {
                Ordering::Equal
            } else if x.len() == 2 {
                Ordering::Greater
            } else if y.len() == 2 {
                Ordering::Less
            } else {
                x.header
                    .activity()
                    .partial_cmp(&y.header.activity())
                    .unwrap_or(Ordering::Equal)
            }
        });

        {
            let index_lim = self.learnts.len() / 2;
            let extra_lim = self.cla_inc / self.learnts.len() as f64; // Remove any clause below this activity
            let stats = &mut self.stats;

            let mut i = 0;
            self.learnts.retain(|&cr| {
                if ca.is_deleted(cr) {
                    i += 1;
                    return false;
                }

                let remove = {
                    let c = ca.view(cr);
                    let remove = c.len() > 2
                        && !assigns.is_locked(ca, cr)
                        && (i < index_lim || (c.header.activity() as f64) < extra_lim);

                    if remove {
                        notify(c);
                        stats.del(c);
                    }

                    remove
                };

                i += 1;
                if remove {
                    ca.free(cr);
                    false
                } else {
                    true
                }
            });
        }
    }

    fn retain_live<F: FnMut(&Clause)>(
        stats: &mut DBStats,
        ca: &mut ClauseAllocator,
        assigns: &Assignment,
        notify: &mut F,
        cr: ClauseRef,
    ) -> bool {
        if ca.is_deleted(cr) {
            false
        } else if satisfied_with_assignment(ca.view(cr).lits(), assigns) {
            notify(ca.view(cr));
            stats.del(ca.view(cr));
            ca.free(cr);
            false
        } else {
            let c = ca.edit(cr);
            debug_assert!({
                let (c0, c1) = c.head_pair();
                assigns.is_undef(c0.var()) && assigns.is_undef(c1.var())
            });
            c.retain_suffix(2, |lit| !assigns.is_false(lit));
            true
        }
    }

    /// Level-0 cleanup: drops satisfied clauses and strips false literals
    /// from the rest (beyond the watched positions, which BCP closure
    /// guarantees are unassigned here).
    pub fn remove_satisfied<F: FnMut(&Clause)>(
        &mut self,
        ca: &mut ClauseAllocator,
        assigns: &Assignment,
        mut notify: F,
    ) {
        let stats = &mut self.stats;
        self.learnts
            .retain(|&cr| Self::retain_live(stats, ca, assigns, &mut notify, cr));

        if self.settings.remove_satisfied {
            self.clauses
                .retain(|&cr| Self::retain_live(stats, ca, assigns, &mut notify, cr));
        }
    }

    pub fn reloc_gc(&mut self, from: &mut ClauseAllocator, to: &mut ClauseAllocator) {
        let relocate = |list: &mut Vec<ClauseRef>, from: &mut ClauseAllocator, to: &mut ClauseAllocator| {
            let mut j = 0;
            for i in 0..list.len() {
                if let Some(cr) = from.reloc_to(to, list[i]) {
                    list[j] = cr;
                    j += 1;
                }
            }
            list.truncate(j);
        };

        relocate(&mut self.learnts, from, to);
        relocate(&mut self.clauses, from, to);
    }
}
