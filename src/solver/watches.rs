use std::mem;
use crate::formula::assignment::Assignment;
use crate::formula::clause::{Clause, ClauseAllocator, ClauseRef};
use crate::formula::{Lit, LitMap, Var};


#[derive(Clone, Copy, Debug)]
struct Watcher {
    cref: ClauseRef,
    blocker: Lit,
}


#[derive(Debug)]
struct WatchesLine {
    watchers: Vec<Watcher>,
    dirty: bool,
}


/// Watch lists per literal, each entry caching a blocker literal so a
/// satisfied clause is skipped without touching the arena. Entries of
/// removed clauses are filtered lazily on the next scan of their line.
pub struct Watches {
    watches: LitMap<WatchesLine>,
    pub propagations: u64,
}

impl Watches {
    pub fn new() -> Self {
        Watches {
            watches: LitMap::new(),
            propagations: 0,
        }
    }

    pub fn init_var(&mut self, v: Var) {
        for &lit in &[v.pos_lit(), v.neg_lit()] {
            self.watches.insert(
                lit,
                WatchesLine {
                    watchers: Vec::new(),
                    dirty: false,
                },
            );
        }
    }

    pub fn watch_clause(&mut self, c: &Clause, cr: ClauseRef) {
        let (c0, c1) = c.head_pair();
        self.watches[!c0].watchers.push(Watcher { cref: cr, blocker: c1 });
        self.watches[!c1].watchers.push(Watcher { cref: cr, blocker: c0 });
    }

    pub fn unwatch_clause_strict(&mut self, c: &Clause, cr: ClauseRef) {
        let (c0, c1) = c.head_pair();
        self.watches[!c0].watchers.retain(|w| w.cref != cr);
        self.watches[!c1].watchers.retain(|w| w.cref != cr);
    }

    pub fn unwatch_clause_lazy(&mut self, c: &Clause) {
        let (c0, c1) = c.head_pair();
        self.watches[!c0].dirty = true;
        self.watches[!c1].dirty = true;
    }

    /// Propagates all enqueued facts. Returns the conflicting clause if
    /// one arises, and leaves the propagation queue empty either way.
    pub fn propagate(
        &mut self,
        ca: &mut ClauseAllocator,
        assigns: &mut Assignment,
    ) -> Option<ClauseRef> {
        let mut confl = None;

        while let Some(p) = assigns.dequeue() {
            self.propagations += 1;
            let false_lit = !p;

            {
                let line = &mut self.watches[p];
                if line.dirty {
                    line.watchers.retain(|w| !ca.is_deleted(w.cref));
                    line.dirty = false;
                }
            }

            // Detach the line so new watchers can be pushed onto other
            // lines while this one is scanned. The new watch can never be
            // `!p` itself (that literal is false right now).
            let mut line = mem::replace(&mut self.watches[p].watchers, Vec::new());

            let mut i = 0;
            let mut j = 0;
            while i < line.len() {
                let w = line[i];
                i += 1;

                if assigns.is_true(w.blocker) {
                    line[j] = w;
                    j += 1;
                    continue;
                }

                let (first, new_watch) = {
                    let c = ca.edit(w.cref);
                    if c.head() == false_lit {
                        c.swap(0, 1);
                    }
                    debug_assert_eq!(c[1], false_lit);

                    let first = c.head();
                    if first != w.blocker && assigns.is_true(first) {
                        (first, NewWatch::Satisfied)
                    } else {
                        let mut found = None;
                        for k in 2..c.len() {
                            if !assigns.is_false(c[k]) {
                                found = Some(k);
                                break;
                            }
                        }
                        match found {
                            Some(k) => {
                                c.swap(1, k);
                                (first, NewWatch::Moved(c[1]))
                            }
                            None => (first, NewWatch::None),
                        }
                    }
                };

                let fw = Watcher {
                    cref: w.cref,
                    blocker: first,
                };
                match new_watch {
                    NewWatch::Satisfied => {
                        line[j] = fw;
                        j += 1;
                    }

                    NewWatch::Moved(lit) => {
                        self.watches[!lit].watchers.push(fw);
                    }

                    // Clause is unit or conflicting under `first`:
                    NewWatch::None => {
                        line[j] = fw;
                        j += 1;

                        if assigns.is_false(first) {
                            assigns.dequeue_all();

                            // Copy the remaining watches:
                            while i < line.len() {
                                line[j] = line[i];
                                j += 1;
                                i += 1;
                            }

                            confl = Some(w.cref);
                        } else {
                            assigns.assign_lit(first, Some(w.cref));
                        }
                    }
                }
            }

            line.truncate(j);
            self.watches[p].watchers = line;
        }

        confl
    }

    pub fn reloc_gc(&mut self, from: &mut ClauseAllocator, to: &mut ClauseAllocator) {
        for (_, line) in self.watches.iter_mut() {
            line.dirty = false;
            line.watchers.retain(|w| !from.is_deleted(w.cref));
            for w in line.watchers.iter_mut() {
                w.cref = from.reloc_to(to, w.cref).unwrap();
            }
        }
    }
}


enum NewWatch {
    Satisfied,
    Moved(Lit),
    None,
}
