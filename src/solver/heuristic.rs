use crate::formula::assignment::Assignment;
use crate::formula::{Lit, Var, VarHeap, VarMap};
use super::util::Random;


#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum PhaseSaving {
    None,
    Limited,
    Full,
}


pub struct HeuristicSettings {
    pub var_decay: f64,
    pub random_seed: f64,
    pub random_var_freq: f64,
    pub phase_saving: PhaseSaving,
    pub rnd_pol: bool,      // Use random polarities for branching.
    pub rnd_init_act: bool, // Initialize variable activities with a small random value.
}

impl Default for HeuristicSettings {
    fn default() -> Self {
        HeuristicSettings {
            var_decay: 0.95,
            random_seed: 91648253.0,
            random_var_freq: 0.0,
            phase_saving: PhaseSaving::Full,
            rnd_pol: false,
            rnd_init_act: false,
        }
    }
}


#[derive(Debug)]
struct VarLine {
    polarity: bool,         // Sign assigned last time, for phase saving.
    user_pol: Option<bool>, // Sign pinned by the user, if any.
    decision: bool,         // Eligible for branching.
}


/// VSIDS order over variable activities. Bumps grow `var_inc`
/// geometrically instead of decaying stored activities; a rescale at
/// 1e100 keeps everything finite without disturbing relative order.
pub struct DecisionHeuristic {
    settings: HeuristicSettings,
    var_inc: f64,
    rand: Random,
    var: VarMap<VarLine>,
    activity: VarMap<f64>,
    order: VarHeap,

    pub dec_vars: usize,
    pub rnd_decisions: u64,
}

impl DecisionHeuristic {
    pub fn new(settings: HeuristicSettings) -> DecisionHeuristic {
        let seed = settings.random_seed;
        DecisionHeuristic {
            settings,
            var_inc: 1.0,
            rand: Random::new(seed),
            var: VarMap::new(),
            activity: VarMap::new(),
            order: VarHeap::new(),
            dec_vars: 0,
            rnd_decisions: 0,
        }
    }

    pub fn init_var(&mut self, v: Var, upol: Option<bool>, dvar: bool) {
        self.activity.insert(
            v,
            if self.settings.rnd_init_act {
                self.rand.drand() * 0.00001
            } else {
                0.0
            },
        );
        self.var.insert(
            v,
            VarLine {
                polarity: true,
                user_pol: upol,
                decision: false,
            },
        );
        self.set_decision_var(v, dvar);
    }

    pub fn is_decision_var(&self, v: Var) -> bool {
        self.var[v].decision
    }

    pub fn set_decision_var(&mut self, v: Var, dvar: bool) {
        let line = &mut self.var[v];
        if dvar != line.decision {
            if dvar {
                self.dec_vars += 1;
                let act = &self.activity;
                self.order.insert(v, |a, b| act[a] > act[b]);
            } else {
                self.dec_vars -= 1;
            }
            line.decision = dvar;
        }
    }

    /// Called for every literal undone by backjumping: saves the phase
    /// and puts the variable back into the branching order.
    pub fn cancel(&mut self, lit: Lit, top_level: bool) {
        let line = &mut self.var[lit.var()];
        match self.settings.phase_saving {
            PhaseSaving::Full => {
                line.polarity = lit.sign();
            }
            PhaseSaving::Limited if top_level => {
                line.polarity = lit.sign();
            }
            _ => {}
        }
        if line.decision {
            let act = &self.activity;
            self.order.insert(lit.var(), |a, b| act[a] > act[b]);
        }
    }

    pub fn bump_activity(&mut self, v: Var) {
        let new = self.activity[v] + self.var_inc;
        if new > 1e100 {
            self.var_inc *= 1e-100;
            for (_, act) in self.activity.iter_mut() {
                *act *= 1e-100;
            }
            self.activity[v] = new * 1e-100;
        } else {
            self.activity[v] = new;
        }

        let act = &self.activity;
        self.order.update(v, |a, b| act[a] > act[b]);
    }

    pub fn decay_activity(&mut self) {
        self.var_inc *= 1.0 / self.settings.var_decay;
    }

    pub fn rebuild_order(&mut self, assigns: &Assignment) {
        let mut pending = Vec::with_capacity(self.order.len());
        for (v, line) in self.var.iter() {
            if line.decision && assigns.is_undef(v) {
                pending.push(v);
            }
        }

        let act = &self.activity;
        self.order.heapify_from(pending, |a, b| act[a] > act[b]);
    }

    fn pick_branch_var(&mut self, assigns: &Assignment) -> Option<Var> {
        // Random decision:
        if self.rand.chance(self.settings.random_var_freq) && !self.order.is_empty() {
            let v = self.order[self.rand.irand(self.order.len())];
            if assigns.is_undef(v) && self.var[v].decision {
                self.rnd_decisions += 1;
                return Some(v);
            }
        }

        // Activity based decision:
        loop {
            let v = {
                let act = &self.activity;
                self.order.pop(|a, b| act[a] > act[b])?
            };
            if assigns.is_undef(v) && self.var[v].decision {
                return Some(v);
            }
        }
    }

    pub fn pick_branch_lit(&mut self, assigns: &Assignment) -> Option<Lit> {
        self.pick_branch_var(assigns).map(|v| {
            let line = &self.var[v];
            let sign = match line.user_pol {
                Some(s) => s,
                None if self.settings.rnd_pol => self.rand.chance(0.5),
                None => line.polarity,
            };
            v.lit(sign)
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_highest_activity_first() {
        let mut assigns = Assignment::new();
        let mut heur = DecisionHeuristic::new(Default::default());
        let vars: Vec<Var> = (0..4).map(|_| assigns.new_var()).collect();
        for &v in &vars {
            heur.init_var(v, None, true);
        }

        heur.bump_activity(vars[2]);
        heur.decay_activity();
        heur.bump_activity(vars[1]);

        // later bump outweighs earlier one after decay
        let first = heur.pick_branch_lit(&assigns).unwrap();
        assert_eq!(first.var(), vars[1]);
        let second = heur.pick_branch_lit(&assigns).unwrap();
        assert_eq!(second.var(), vars[2]);
    }

    #[test]
    fn skips_assigned_vars() {
        let mut assigns = Assignment::new();
        let mut heur = DecisionHeuristic::new(Default::default());
        let x = assigns.new_var();
        let y = assigns.new_var();
        heur.init_var(x, None, true);
        heur.init_var(y, None, true);
        heur.bump_activity(x);

        assigns.assign_lit(x.pos_lit(), None);
        let picked = heur.pick_branch_lit(&assigns).unwrap();
        assert_eq!(picked.var(), y);
        assert_eq!(heur.pick_branch_lit(&assigns), None);
    }

    #[test]
    fn saved_phase_is_replayed() {
        let mut assigns = Assignment::new();
        let mut heur = DecisionHeuristic::new(Default::default());
        let x = assigns.new_var();
        heur.init_var(x, None, true);

        assigns.new_decision_level();
        assigns.assign_lit(x.pos_lit(), None);
        assigns.rewind_until_level(0, |level, lit| heur.cancel(lit, level == 1));

        assert_eq!(heur.pick_branch_lit(&assigns), Some(x.pos_lit()));
    }

    #[test]
    fn user_polarity_wins() {
        let mut assigns = Assignment::new();
        let mut heur = DecisionHeuristic::new(Default::default());
        let x = assigns.new_var();
        heur.init_var(x, Some(true), true);
        assert_eq!(heur.pick_branch_lit(&assigns), Some(x.neg_lit()));
    }

    #[test]
    fn non_decision_vars_are_never_picked() {
        let mut assigns = Assignment::new();
        let mut heur = DecisionHeuristic::new(Default::default());
        let x = assigns.new_var();
        heur.init_var(x, None, false);
        assert_eq!(heur.pick_branch_lit(&assigns), None);
    }
}
