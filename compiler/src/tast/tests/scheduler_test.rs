#[cfg(test)]
mod scheduler_tests {
    use crate::tast::tests::test_helpers::*;
    use crate::tast::{BuildCancelled, BuildState, Pass, Type, TypeloadError, TypeloadContext};
    use source_map::SourceSpan;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<&'static str>>>;

    fn record(ctx: &mut TypeloadContext, log: &Log, pass: Pass, name: &'static str) {
        let log = log.clone();
        ctx.scheduler.delay(pass, move |_| log.borrow_mut().push(name));
    }

    #[test]
    fn test_earlier_passes_run_first() {
        let mut ctx = context(Vec::new());
        let log: Log = Rc::default();
        record(&mut ctx, &log, Pass::Final, "final");
        record(&mut ctx, &log, Pass::Force, "force");
        record(&mut ctx, &log, Pass::BuildClass, "build-1");
        record(&mut ctx, &log, Pass::ConnectField, "connect");
        record(&mut ctx, &log, Pass::BuildClass, "build-2");
        ctx.run_all();
        assert_eq!(*log.borrow(), vec!["build-1", "build-2", "connect", "force", "final"]);
        assert_eq!(ctx.scheduler.pending(), 0);
    }

    #[test]
    fn test_same_pass_work_appends() {
        let mut ctx = context(Vec::new());
        let log: Log = Rc::default();
        let inner = log.clone();
        ctx.scheduler.delay(Pass::ConnectField, move |ctx| {
            inner.borrow_mut().push("outer");
            let nested = inner.clone();
            ctx.scheduler.delay(Pass::ConnectField, move |_| nested.borrow_mut().push("nested"));
        });
        record(&mut ctx, &log, Pass::ConnectField, "sibling");
        record(&mut ctx, &log, Pass::Force, "later");
        ctx.run_all();
        assert_eq!(*log.borrow(), vec!["outer", "sibling", "nested", "later"]);
    }

    #[test]
    fn test_earlier_pass_queued_late_runs_next() {
        let mut ctx = context(Vec::new());
        let log: Log = Rc::default();
        let inner = log.clone();
        ctx.scheduler.delay(Pass::Force, move |ctx| {
            inner.borrow_mut().push("force-1");
            let early = inner.clone();
            ctx.scheduler.delay(Pass::BuildClass, move |_| early.borrow_mut().push("build"));
        });
        record(&mut ctx, &log, Pass::Force, "force-2");
        ctx.run_all();
        assert_eq!(*log.borrow(), vec!["force-1", "build", "force-2"]);
    }

    #[test]
    fn test_flush_stops_at_pass() {
        let mut ctx = context(Vec::new());
        let log: Log = Rc::default();
        record(&mut ctx, &log, Pass::ConnectField, "connect");
        record(&mut ctx, &log, Pass::Final, "final");
        ctx.flush_pass(Pass::CheckConstraint);
        assert_eq!(*log.borrow(), vec!["connect"]);
        assert_eq!(ctx.scheduler.pending_in(Pass::Final), 1);
    }

    #[test]
    fn test_lazy_is_forced_once() {
        let mut ctx = context(Vec::new());
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let int = ctx.std.int_type();
        let stand_in = ctx.monos.fresh();
        let lazy = ctx.make_lazy(stand_in, move |_| {
            counter.set(counter.get() + 1);
            Ok(int)
        });
        let first = ctx.follow(&lazy);
        let second = ctx.follow(&lazy);
        assert_eq!(first, second);
        assert_eq!(ctx.type_to_string(&first), "Int");
        ctx.run_all();
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_lazies_are_forced_by_the_force_pass() {
        let mut ctx = context(Vec::new());
        let forced = Rc::new(Cell::new(false));
        let flag = forced.clone();
        let stand_in = ctx.monos.fresh();
        let lazy = ctx.make_lazy(stand_in, move |ctx| {
            flag.set(true);
            Ok(ctx.std.bool_type())
        });
        ctx.flush_pass(Pass::CheckConstraint);
        assert!(!forced.get());
        ctx.run_all();
        assert!(forced.get());
        assert_eq!(ctx.type_to_string(&lazy), "Bool");
    }

    #[test]
    fn test_reentrant_force_sees_stand_in() {
        let mut ctx = context(Vec::new());
        let stand_in = ctx.monos.fresh();
        let Type::Mono(mono) = stand_in.clone() else {
            panic!("fresh monomorph expected");
        };
        let seen = Rc::new(RefCell::new(None));
        let slot = seen.clone();
        let lazy_slot: Rc<RefCell<Option<Type>>> = Rc::default();
        let me = lazy_slot.clone();
        let lazy = ctx.make_lazy(stand_in.clone(), move |ctx| {
            let own = me.borrow().clone().unwrap_or_else(Type::dynamic);
            *slot.borrow_mut() = Some(ctx.follow(&own));
            Ok(ctx.std.string_type())
        });
        *lazy_slot.borrow_mut() = Some(lazy.clone());

        let value = ctx.follow(&lazy);
        assert_eq!(ctx.type_to_string(&value), "String");
        assert_eq!(seen.borrow().clone(), Some(stand_in));
        assert!(ctx.monos.is_bound(mono));
        assert_no_errors(&ctx);
    }

    #[test]
    fn test_failed_lazy_reports_once() {
        let mut ctx = context(Vec::new());
        let stand_in = ctx.monos.fresh();
        let lazy = ctx.make_lazy(stand_in, |_| Err(TypeloadError::custom("cannot compute", SourceSpan::unknown())));
        ctx.follow(&lazy);
        ctx.run_all();
        assert_single_error(&ctx, "cannot compute");
        assert_eq!(ctx.follow(&lazy), Type::dynamic());
    }

    #[test]
    fn test_retried_check_discards_cancelled_diagnostics() {
        let mut ctx = context(Vec::new());
        let owner = ctx.std.array;
        let dependency_ready = Rc::new(Cell::new(false));
        let ready = dependency_ready.clone();
        let attempts = Rc::new(Cell::new(0));
        let counter = attempts.clone();
        ctx.delay_retrying(
            Pass::ConnectField,
            owner,
            Rc::new(move |ctx: &mut TypeloadContext| {
                counter.set(counter.get() + 1);
                ctx.report(TypeloadError::custom(
                    format!("attempt {}", counter.get()),
                    SourceSpan::unknown(),
                ));
                if ready.get() {
                    Ok(())
                } else {
                    Err(BuildCancelled {
                        decl: owner,
                        state: BuildState::Building(Default::default()),
                    })
                }
            }),
        );
        let ready = dependency_ready.clone();
        ctx.scheduler.delay(Pass::ConnectField, move |_| ready.set(true));
        ctx.run_all();
        assert_eq!(attempts.get(), 2);
        assert_eq!(error_messages(&ctx), vec!["attempt 2"]);
    }
}
