//! Monomorphs and lazily computed types
//!
//! A monomorph is a write-once cell standing in for a type that is not known yet.
//! A lazy cell wraps a thunk that produces a type on first demand; while the thunk
//! runs the cell hands out a stand-in so a cycle of lazies terminates.

use super::context::TypeloadContext;
use super::core::Type;
use super::errors::TypeloadError;
use super::{LazyId, MonoId};
use std::fmt;

#[derive(Debug, Clone, Default)]
struct MonoCell {
    bound: Option<Type>,
}

/// Binding an already bound monomorph. This is a bug in the caller, not a user error.
#[derive(Debug, Clone, PartialEq)]
pub struct MonoAlreadyBound {
    pub mono: MonoId,
    pub existing: Type,
}

impl fmt::Display for MonoAlreadyBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "monomorph {} is already bound to {:?}", self.mono, self.existing)
    }
}

impl std::error::Error for MonoAlreadyBound {}

#[derive(Debug, Default)]
pub struct MonomorphTable {
    cells: Vec<MonoCell>,
}

impl MonomorphTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fresh(&mut self) -> Type {
        let id = MonoId::from_index(self.cells.len());
        self.cells.push(MonoCell::default());
        Type::Mono(id)
    }

    pub fn bound(&self, id: MonoId) -> Option<&Type> {
        self.cells.get(id.index()).and_then(|c| c.bound.as_ref())
    }

    pub fn is_bound(&self, id: MonoId) -> bool {
        self.bound(id).is_some()
    }

    pub fn bind(&mut self, id: MonoId, t: Type) -> Result<(), MonoAlreadyBound> {
        let cell = &mut self.cells[id.index()];
        if let Some(existing) = &cell.bound {
            return Err(MonoAlreadyBound {
                mono: id,
                existing: existing.clone(),
            });
        }
        log::trace!("bind {} := {:?}", id, t);
        cell.bound = Some(t);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

pub type LazyThunk = Box<dyn FnOnce(&mut TypeloadContext) -> Result<Type, TypeloadError>>;

pub enum LazyState {
    Unforced { thunk: LazyThunk, stand_in: Type },
    Forcing { stand_in: Type },
    Forced(Type),
}

impl fmt::Debug for LazyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LazyState::Unforced { stand_in, .. } => {
                f.debug_struct("Unforced").field("stand_in", stand_in).finish()
            }
            LazyState::Forcing { stand_in } => {
                f.debug_struct("Forcing").field("stand_in", stand_in).finish()
            }
            LazyState::Forced(t) => f.debug_tuple("Forced").field(t).finish(),
        }
    }
}

/// What the caller of [`LazyTable::begin_forcing`] has to do next
pub enum LazyProgress {
    Ready(Type),
    /// Re-entered while the thunk runs: use the stand-in
    InProgress(Type),
    Run { thunk: LazyThunk, stand_in: Type },
}

#[derive(Debug, Default)]
pub struct LazyTable {
    cells: Vec<LazyState>,
}

impl LazyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, thunk: LazyThunk, stand_in: Type) -> LazyId {
        let id = LazyId::from_index(self.cells.len());
        self.cells.push(LazyState::Unforced { thunk, stand_in });
        id
    }

    pub fn state(&self, id: LazyId) -> &LazyState {
        &self.cells[id.index()]
    }

    pub fn forced_value(&self, id: LazyId) -> Option<&Type> {
        match self.cells.get(id.index()) {
            Some(LazyState::Forced(t)) => Some(t),
            _ => None,
        }
    }

    pub fn is_forcing(&self, id: LazyId) -> bool {
        matches!(self.cells.get(id.index()), Some(LazyState::Forcing { .. }))
    }

    /// Marks the cell as forcing before its thunk is handed out
    pub fn begin_forcing(&mut self, id: LazyId) -> LazyProgress {
        let cell = &mut self.cells[id.index()];
        match cell {
            LazyState::Forced(t) => LazyProgress::Ready(t.clone()),
            LazyState::Forcing { stand_in } => LazyProgress::InProgress(stand_in.clone()),
            LazyState::Unforced { stand_in, .. } => {
                let stand_in = stand_in.clone();
                let previous = std::mem::replace(
                    cell,
                    LazyState::Forcing {
                        stand_in: stand_in.clone(),
                    },
                );
                match previous {
                    LazyState::Unforced { thunk, .. } => LazyProgress::Run { thunk, stand_in },
                    _ => LazyProgress::InProgress(stand_in),
                }
            }
        }
    }

    pub fn finish(&mut self, id: LazyId, value: Type) {
        self.cells[id.index()] = LazyState::Forced(value);
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mono_is_write_once() {
        let mut monos = MonomorphTable::new();
        let Type::Mono(id) = monos.fresh() else {
            panic!("fresh must return a monomorph");
        };
        assert!(!monos.is_bound(id));
        monos.bind(id, Type::dynamic()).unwrap();
        assert_eq!(monos.bound(id), Some(&Type::dynamic()));

        let err = monos.bind(id, Type::dynamic()).unwrap_err();
        assert_eq!(err.mono, id);
    }

    #[test]
    fn test_lazy_progress_states() {
        let mut lazies = LazyTable::new();
        let id = lazies.create(Box::new(|_| Ok(Type::dynamic())), Type::dynamic());

        let LazyProgress::Run { .. } = lazies.begin_forcing(id) else {
            panic!("first force must run the thunk");
        };
        assert!(lazies.is_forcing(id));
        assert!(matches!(lazies.begin_forcing(id), LazyProgress::InProgress(_)));

        lazies.finish(id, Type::dynamic());
        assert!(matches!(lazies.begin_forcing(id), LazyProgress::Ready(_)));
        assert_eq!(lazies.forced_value(id), Some(&Type::dynamic()));
    }
}
