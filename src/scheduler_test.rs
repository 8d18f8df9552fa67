#[cfg(test)]
mod tests {
    use super::super::agent::AgentArena;
    use super::super::events::*;
    use super::super::scheduler::*;
    use super::super::simulation::{MarketVariables, Population, StepContext};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    struct TestWorld {
        arena: AgentArena,
        market: MarketVariables,
        rng: StdRng,
    }

    impl TestWorld {
        fn new() -> Self {
            Self {
                arena: AgentArena::new(),
                market: MarketVariables::default(),
                rng: StdRng::seed_from_u64(1),
            }
        }

        fn ctx(&mut self, step: u32) -> StepContext<'_> {
            StepContext {
                step,
                population: Population::Arena(&mut self.arena),
                market: &mut self.market,
                rng: &mut self.rng,
            }
        }
    }

    fn shock_event(id: &str, step: u32) -> Event {
        Event::new(
            id,
            step,
            EventKind::EconomicShock(EconomicShockParams {
                severity: 0.1,
                ..Default::default()
            }),
        )
    }

    fn noop_handler() -> Handler {
        Box::new(|_, _| Ok(EventResult::new()))
    }

    fn failing_handler() -> Handler {
        Box::new(|_, _| Err("handler exploded".to_string()))
    }

    #[test]
    fn test_inject_and_process() {
        let mut world = TestWorld::new();
        let mut scheduler = EventScheduler::new();
        scheduler.register_handler(EventType::EconomicShock, noop_handler());

        scheduler.inject(shock_event("a", 3)).unwrap();
        scheduler.inject(shock_event("b", 1)).unwrap();

        let early = scheduler.process(0, &mut world.ctx(0));
        assert!(early.is_empty());
        assert_eq!(scheduler.pending().len(), 2);

        let step1 = scheduler.process(1, &mut world.ctx(1));
        assert_eq!(step1.len(), 1);
        assert_eq!(step1[0].id, "b");
        assert_eq!(step1[0].status, EventStatus::Completed);

        let step3 = scheduler.process(3, &mut world.ctx(3));
        assert_eq!(step3.len(), 1);
        assert_eq!(step3[0].id, "a");
        assert!(scheduler.pending().is_empty());
    }

    #[test]
    fn test_duplicate_injection_rejected() {
        let mut scheduler = EventScheduler::new();
        assert!(scheduler.inject(shock_event("dup", 2)).is_ok());
        assert_eq!(
            scheduler.inject(shock_event("dup", 5)),
            Err(RejectReason::DuplicateId)
        );
        assert_eq!(scheduler.pending().len(), 1);
    }

    #[test]
    fn test_reinjection_after_processing_rejected() {
        let mut world = TestWorld::new();
        let mut scheduler = EventScheduler::new();
        scheduler.register_handler(EventType::EconomicShock, noop_handler());

        scheduler.inject(shock_event("once", 0)).unwrap();
        let done = scheduler.process(0, &mut world.ctx(0));
        assert_eq!(done.len(), 1);

        assert_eq!(
            scheduler.inject(shock_event("once", 4)),
            Err(RejectReason::AlreadyProcessed)
        );
        // Even a forced second pass never re-delivers.
        let again = scheduler.process(5, &mut world.ctx(5));
        assert!(again.is_empty());
        assert_eq!(scheduler.processed().len(), 1);
    }

    #[test]
    fn test_at_most_once_across_repeated_process_calls() {
        let mut world = TestWorld::new();
        let mut scheduler = EventScheduler::new();
        scheduler.register_handler(EventType::EconomicShock, noop_handler());

        for i in 0..5 {
            scheduler.inject(shock_event(&format!("e{i}"), i)).unwrap();
        }

        let mut delivered = Vec::new();
        for step in 0..10 {
            for event in scheduler.process(step, &mut world.ctx(step)) {
                delivered.push(event.id);
            }
        }

        delivered.sort();
        let expected: Vec<String> = (0..5).map(|i| format!("e{i}")).collect();
        assert_eq!(delivered, expected);
        // Terminal-bucket invariant: each id in exactly one bucket.
        assert_eq!(scheduler.processed().len(), 5);
        assert!(scheduler.failed().is_empty());
        assert!(scheduler.pending().is_empty());
    }

    #[test]
    fn test_stable_order_within_step() {
        let mut world = TestWorld::new();
        let mut scheduler = EventScheduler::new();
        scheduler.register_handler(EventType::EconomicShock, noop_handler());

        scheduler.inject(shock_event("first", 2)).unwrap();
        scheduler.inject(shock_event("second", 2)).unwrap();
        scheduler.inject(shock_event("third", 2)).unwrap();

        let batch = scheduler.process(2, &mut world.ctx(2));
        let ids: Vec<&str> = batch.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_failing_handler_does_not_block_others() {
        let mut world = TestWorld::new();
        let mut scheduler = EventScheduler::new();
        scheduler.register_handler(EventType::EconomicShock, failing_handler());
        scheduler.register_handler(EventType::ProductLaunch, noop_handler());

        scheduler.inject(shock_event("bad", 1)).unwrap();
        scheduler
            .inject(Event::new(
                "good",
                1,
                EventKind::ProductLaunch(ProductLaunchParams {
                    product_type: "savings_account".to_string(),
                    ..Default::default()
                }),
            ))
            .unwrap();

        let completed = scheduler.process(1, &mut world.ctx(1));
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].id, "good");

        assert_eq!(scheduler.failed().len(), 1);
        let failed = &scheduler.failed()[0];
        assert_eq!(failed.id, "bad");
        assert_eq!(failed.status, EventStatus::Failed);
        assert_eq!(failed.error.as_deref(), Some("handler exploded"));

        // Failed events are never retried.
        let retry = scheduler.process(2, &mut world.ctx(2));
        assert!(retry.is_empty());
        assert_eq!(scheduler.failed().len(), 1);
    }

    #[test]
    fn test_unhandled_event_type_completes_as_noop() {
        let mut world = TestWorld::new();
        let mut scheduler = EventScheduler::new();
        // No handler registered at all.
        scheduler.inject(shock_event("orphan", 0)).unwrap();

        let completed = scheduler.process(0, &mut world.ctx(0));
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].status, EventStatus::Completed);
        assert!(completed[0].result.is_empty());
    }

    #[test]
    fn test_multiple_handlers_all_run_and_merge_results() {
        let mut world = TestWorld::new();
        let mut scheduler = EventScheduler::new();
        scheduler.register_handler(
            EventType::EconomicShock,
            Box::new(|_, _| {
                let mut result = EventResult::new();
                result.set("first", 1.0);
                Ok(result)
            }),
        );
        scheduler.register_handler(
            EventType::EconomicShock,
            Box::new(|_, _| {
                let mut result = EventResult::new();
                result.set("second", 2.0);
                Ok(result)
            }),
        );

        scheduler.inject(shock_event("multi", 0)).unwrap();
        let completed = scheduler.process(0, &mut world.ctx(0));
        assert_eq!(completed[0].result.get("first"), Some(1.0));
        assert_eq!(completed[0].result.get("second"), Some(2.0));
    }

    #[test]
    fn test_summary_counts() {
        let mut world = TestWorld::new();
        let mut scheduler = EventScheduler::new();
        scheduler.register_handler(EventType::EconomicShock, failing_handler());

        scheduler.inject(shock_event("f1", 0)).unwrap();
        scheduler.inject(shock_event("p1", 9)).unwrap();
        scheduler.process(0, &mut world.ctx(0));

        let summary = scheduler.summary();
        assert_eq!(summary.total(), 2);
        assert_eq!(summary.pending, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.completed, 0);
        assert_eq!(summary.by_type[&EventType::EconomicShock], 2);
    }

    #[test]
    fn test_history_records_terminal_events() {
        let mut world = TestWorld::new();
        let mut scheduler = EventScheduler::new();
        scheduler.register_handler(EventType::EconomicShock, noop_handler());

        scheduler.inject(shock_event("h1", 0)).unwrap();
        scheduler.inject(shock_event("h2", 1)).unwrap();
        scheduler.process(0, &mut world.ctx(0));
        scheduler.process(1, &mut world.ctx(1));

        let history = scheduler.export_history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].event_id, "h1");
        assert_eq!(history[0].step, 0);
        assert_eq!(history[1].event_id, "h2");
        assert_eq!(history[1].status, EventStatus::Completed);
    }

    #[test]
    fn test_clear_pending_keeps_history() {
        let mut world = TestWorld::new();
        let mut scheduler = EventScheduler::new();
        scheduler.register_handler(EventType::EconomicShock, noop_handler());

        scheduler.inject(shock_event("done", 0)).unwrap();
        scheduler.process(0, &mut world.ctx(0));
        scheduler.inject(shock_event("waiting", 5)).unwrap();

        scheduler.clear_pending();
        assert!(scheduler.pending().is_empty());
        assert_eq!(scheduler.processed().len(), 1);
        assert_eq!(scheduler.export_history().len(), 1);
        assert!(scheduler.is_processed("done"));
    }
}
