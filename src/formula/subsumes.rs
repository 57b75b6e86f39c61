use super::clause::Clause;
use super::Lit;


pub enum Subsumes {
    Different,
    Exact,
    LitSign(Lit),
}

/// Classifies `this` against `other`: `Exact` when every literal of
/// `this` occurs in `other`; `LitSign(l)` when they agree except that
/// `l` occurs negated in `other` (self-subsuming resolution strengthens
/// `other` by `!l`); `Different` otherwise. The abstraction words prune
/// most non-subsumptions without touching the literals.
pub fn subsumes(this: &Clause, other: &Clause) -> Subsumes {
    assert!(!this.is_learnt());
    assert!(!other.is_learnt());

    if other.len() < this.len() || (this.abstraction() & !other.abstraction()) != 0 {
        return Subsumes::Different;
    }

    let mut ret = Subsumes::Exact;
    for &lit in this.lits() {
        let mut found = false;
        for &cur in other.lits() {
            if lit == cur {
                found = true;
                break;
            } else if lit == !cur {
                if let Subsumes::Exact = ret {
                    ret = Subsumes::LitSign(lit);
                    found = true;
                    break;
                } else {
                    return Subsumes::Different;
                }
            }
        }

        if !found {
            return Subsumes::Different;
        }
    }

    ret
}

/// Subsumption against a single top-level fact.
pub fn unit_subsumes(unit: Lit, c: &Clause) -> Subsumes {
    assert!(!c.is_learnt());

    if unit.abstraction() & !c.abstraction() != 0 {
        return Subsumes::Different;
    }

    for &cur in c.lits() {
        if unit == cur {
            return Subsumes::Exact;
        } else if unit == !cur {
            return Subsumes::LitSign(unit);
        }
    }

    Subsumes::Different
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::clause::{ClauseAllocator, ClauseHeader, ClauseRef};
    use crate::formula::util::calc_abstraction;
    use crate::formula::Var;

    fn lit(v: usize, s: bool) -> Lit {
        Var::from_index(v).lit(s)
    }

    fn alloc(ca: &mut ClauseAllocator, lits: &[Lit]) -> ClauseRef {
        let abstraction = calc_abstraction(lits);
        let (_, cr) = ca.alloc(lits, ClauseHeader::Original { abstraction }).unwrap();
        cr
    }

    #[test]
    fn exact_subsumption() {
        let mut ca = ClauseAllocator::new();
        let small = alloc(&mut ca, &[lit(0, false), lit(2, true)]);
        let big = alloc(&mut ca, &[lit(0, false), lit(1, false), lit(2, true)]);

        match subsumes(ca.view(small), ca.view(big)) {
            Subsumes::Exact => {}
            _ => panic!("expected exact subsumption"),
        }
        match subsumes(ca.view(big), ca.view(small)) {
            Subsumes::Different => {}
            _ => panic!("longer clause cannot subsume"),
        }
    }

    #[test]
    fn self_subsuming_resolution() {
        let mut ca = ClauseAllocator::new();
        let this = alloc(&mut ca, &[lit(0, false), lit(1, false)]);
        let other = alloc(&mut ca, &[lit(0, false), lit(1, true), lit(2, false)]);

        match subsumes(ca.view(this), ca.view(other)) {
            Subsumes::LitSign(l) => assert_eq!(l, lit(1, false)),
            _ => panic!("expected strengthening literal"),
        }
    }

    #[test]
    fn two_sign_flips_differ() {
        let mut ca = ClauseAllocator::new();
        let this = alloc(&mut ca, &[lit(0, false), lit(1, false)]);
        let other = alloc(&mut ca, &[lit(0, true), lit(1, true)]);

        match subsumes(ca.view(this), ca.view(other)) {
            Subsumes::Different => {}
            _ => panic!("double flip must not subsume"),
        }
    }

    #[test]
    fn unit_cases() {
        let mut ca = ClauseAllocator::new();
        let c = alloc(&mut ca, &[lit(0, false), lit(1, true)]);

        match unit_subsumes(lit(0, false), ca.view(c)) {
            Subsumes::Exact => {}
            _ => panic!("unit occurs in clause"),
        }
        match unit_subsumes(lit(1, false), ca.view(c)) {
            Subsumes::LitSign(l) => assert_eq!(l, lit(1, false)),
            _ => panic!("unit occurs negated"),
        }
        match unit_subsumes(lit(5, false), ca.view(c)) {
            Subsumes::Different => {}
            _ => panic!("unit unrelated"),
        }
    }
}
