//! Pass-ordered work queues
//!
//! Deferred work is enqueued against a [`Pass`]. Draining always takes the first
//! task of the lowest non-empty pass, so everything queued for an earlier pass runs
//! before anything queued for a later one, and a task that enqueues more work on its
//! own pass sees that work run after the rest of the pass drains.

use super::context::TypeloadContext;
use std::collections::VecDeque;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Pass {
    /// Module-level declarations: typedef targets, enum constructors, abstracts
    BuildModule,
    /// Class heritage and field tables
    BuildClass,
    /// Override and interface checks once field tables are final
    ConnectField,
    /// Per-field checks such as final initialization
    TypeField,
    CheckConstraint,
    /// Force lazily computed types so their errors surface
    Force,
    Final,
}

impl Pass {
    pub const ALL: [Pass; 7] = [
        Pass::BuildModule,
        Pass::BuildClass,
        Pass::ConnectField,
        Pass::TypeField,
        Pass::CheckConstraint,
        Pass::Force,
        Pass::Final,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Pass::BuildModule => "build-module",
            Pass::BuildClass => "build-class",
            Pass::ConnectField => "connect-field",
            Pass::TypeField => "type-field",
            Pass::CheckConstraint => "check-constraint",
            Pass::Force => "force",
            Pass::Final => "final",
        };
        f.write_str(name)
    }
}

const PASS_COUNT: usize = Pass::ALL.len();

pub type DelayedTask = Box<dyn FnOnce(&mut TypeloadContext)>;

#[derive(Default)]
pub struct PassScheduler {
    queues: [VecDeque<DelayedTask>; PASS_COUNT],
    executed: usize,
}

impl fmt::Debug for PassScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pending: Vec<(Pass, usize)> = Pass::ALL
            .iter()
            .map(|p| (*p, self.queues[p.index()].len()))
            .filter(|(_, n)| *n > 0)
            .collect();
        f.debug_struct("PassScheduler")
            .field("pending", &pending)
            .field("executed", &self.executed)
            .finish()
    }
}

impl PassScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a task to the back of `pass`
    pub fn delay(&mut self, pass: Pass, task: impl FnOnce(&mut TypeloadContext) + 'static) {
        self.queues[pass.index()].push_back(Box::new(task));
    }

    /// Takes the next task of the lowest non-empty pass not later than `until`
    pub fn next_task(&mut self, until: Pass) -> Option<(Pass, DelayedTask)> {
        for pass in Pass::ALL.iter().copied().take_while(|p| *p <= until) {
            if let Some(task) = self.queues[pass.index()].pop_front() {
                self.executed += 1;
                return Some((pass, task));
            }
        }
        None
    }

    pub fn pending(&self) -> usize {
        self.queues.iter().map(VecDeque::len).sum()
    }

    pub fn pending_in(&self, pass: Pass) -> usize {
        self.queues[pass.index()].len()
    }

    pub fn executed(&self) -> usize {
        self.executed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passes_are_ordered() {
        assert!(Pass::BuildClass < Pass::ConnectField);
        assert!(Pass::CheckConstraint < Pass::Force);
        assert_eq!(Pass::ALL.len(), 7);
        assert_eq!(Pass::Final.index(), 6);
    }

    #[test]
    fn test_next_task_respects_until() {
        let mut scheduler = PassScheduler::new();
        scheduler.delay(Pass::Final, |_| {});
        scheduler.delay(Pass::BuildClass, |_| {});
        assert_eq!(scheduler.pending(), 2);

        let (pass, _) = scheduler.next_task(Pass::Final).unwrap();
        assert_eq!(pass, Pass::BuildClass);
        assert!(scheduler.next_task(Pass::Force).is_none());
        assert_eq!(scheduler.pending_in(Pass::Final), 1);
    }
}
