//! Orchestration above the `state::*` store layer for actions that touch
//! more than one collection or need a role/invariant check before the
//! mutation (spec §4.J/K).

pub mod approval;
pub mod installment;
pub mod loan;
