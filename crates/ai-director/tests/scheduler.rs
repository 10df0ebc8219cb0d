mod common;

use ai_core::{AgentId, AgentKind, Outbound, Priority};
use ai_director::{AgentState, Director, DirectorError, DirectorState, ManualClock};
use ai_tools::SharedTraceLog;
use common::{quiet_config, Scripted, TestWorld};
use serde_json::json;

fn running(config: ai_director::DirectorConfig, clock: &ManualClock) -> Director<TestWorld> {
    let mut director = Director::new(config).unwrap().with_clock(clock.clone());
    director.start().unwrap();
    director
}

#[test]
fn urgent_message_preempts_higher_scored_agents() {
    let clock = ManualClock::new();
    let mut config = quiet_config();
    config.max_agents_per_frame = 1;
    let mut world = TestWorld::default();
    let mut director = running(config, &clock);

    let busy = director
        .create_agent(None, Box::new(Scripted::new(AgentKind::Nation)), &world)
        .unwrap();
    let quiet = director
        .create_agent(None, Box::new(Scripted::new(AgentKind::Character)), &world)
        .unwrap();

    for i in 0..20 {
        director.publish(Outbound::to_agent(busy, json!(i)).with_priority(Priority::High));
    }
    director.publish(Outbound::to_agent(quiet, json!("now")).with_priority(Priority::Urgent));

    let report = director.process_frame(0.016, &mut world);
    assert_eq!(report.serviced, vec![quiet]);

    let report = director.process_frame(0.016, &mut world);
    assert_eq!(report.serviced, vec![busy]);
}

#[test]
fn agent_with_pending_work_is_serviced_within_the_starvation_bound() {
    for bound in [1u64, 3, 10] {
        let clock = ManualClock::new();
        let mut config = quiet_config();
        config.max_agents_per_frame = 1;
        config.max_starvation_frames = bound;
        let mut world = TestWorld::default();
        let mut director = running(config, &clock);
        let trace = SharedTraceLog::new();
        director.set_trace_sink(Box::new(trace.clone()));

        let hot = director
            .create_agent(None, Box::new(Scripted::new(AgentKind::Nation)), &world)
            .unwrap();
        let cold_logic = Scripted::new(AgentKind::Character);
        let cold_journal = cold_logic.journal();
        let cold = director
            .create_agent(None, Box::new(cold_logic), &world)
            .unwrap();
        director.publish(Outbound::to_agent(cold, json!("waiting")).with_priority(Priority::Low));

        for _ in 0..=bound {
            director.publish(Outbound::to_agent(hot, json!("more")).with_priority(Priority::High));
            director.publish(Outbound::to_agent(hot, json!("more")).with_priority(Priority::High));
            director.process_frame(0.016, &mut world);
        }

        let visits = cold_journal.borrow();
        assert_eq!(visits.len(), 1, "bound {bound}");
        assert_eq!(visits[0].frame, bound);
        assert_eq!(visits[0].inbox, vec![json!("waiting")]);
        assert_eq!(trace.count("director.starve"), 1);
    }
}

#[test]
fn frame_stops_servicing_once_the_time_budget_is_spent() {
    let clock = ManualClock::new();
    let mut config = quiet_config();
    config.per_frame_time_budget_ms = 4.0;
    let mut world = TestWorld::default();
    let mut director = running(config, &clock);
    let trace = SharedTraceLog::new();
    director.set_trace_sink(Box::new(trace.clone()));

    let ids: Vec<AgentId> = (0..5)
        .map(|_| {
            director
                .create_agent(
                    None,
                    Box::new(Scripted::new(AgentKind::Character).costing(&clock, 3.0)),
                    &world,
                )
                .unwrap()
        })
        .collect();

    let first = director.process_frame(0.016, &mut world);
    assert_eq!(first.serviced, vec![ids[0], ids[1]]);
    assert!(first.overrun);
    assert_eq!(first.deferred, 3);
    assert!((first.elapsed_ms - 6.0).abs() < 1e-6);
    assert_eq!(trace.count("director.defer"), 3);

    // Deferred agents are now the stalest and go first.
    let second = director.process_frame(0.016, &mut world);
    assert_eq!(second.serviced, vec![ids[2], ids[3]]);

    let third = director.process_frame(0.016, &mut world);
    assert_eq!(third.serviced[0], ids[4]);

    let metrics = director.metrics();
    assert_eq!(metrics.total_frames, 3);
    assert_eq!(metrics.budget_overruns, 3);
    assert!((metrics.max_frame_time_ms - 6.0).abs() < 1e-6);
}

#[test]
fn first_candidate_runs_even_when_it_alone_exceeds_the_budget() {
    let clock = ManualClock::new();
    let mut config = quiet_config();
    config.per_frame_time_budget_ms = 1.0;
    let mut world = TestWorld::default();
    let mut director = running(config, &clock);

    let slow = director
        .create_agent(
            None,
            Box::new(Scripted::new(AgentKind::Council).costing(&clock, 25.0)),
            &world,
        )
        .unwrap();

    let report = director.process_frame(0.016, &mut world);
    assert_eq!(report.serviced, vec![slow]);
    assert!(report.overrun);
    assert_eq!(report.deferred, 0);
}

#[test]
fn message_budget_caps_each_service() {
    let clock = ManualClock::new();
    let mut world = TestWorld::default();
    let mut director = running(quiet_config(), &clock);

    let logic = Scripted::new(AgentKind::Nation);
    let journal = logic.journal();
    let id = director.create_agent(None, Box::new(logic), &world).unwrap();
    for i in 0..12 {
        director.publish(Outbound::to_agent(id, json!(i)));
    }

    director.process_frame(0.016, &mut world);
    director.process_frame(0.016, &mut world);
    director.process_frame(0.016, &mut world);

    let sizes: Vec<usize> = journal.borrow().iter().map(|v| v.inbox.len()).collect();
    assert_eq!(sizes, vec![5, 5, 2]);
    assert_eq!(director.metrics().messages_processed, 12);
}

#[test]
fn agent_replies_are_routed_to_their_recipient() {
    let clock = ManualClock::new();
    let mut world = TestWorld::default();
    let mut director = running(quiet_config(), &clock);

    let listener_logic = Scripted::new(AgentKind::Character);
    let journal = listener_logic.journal();
    let listener = director
        .create_agent(None, Box::new(listener_logic), &world)
        .unwrap();
    director
        .create_agent(
            None,
            Box::new(
                Scripted::new(AgentKind::Nation)
                    .replying(Outbound::to_agent(listener, json!({"treaty": "offered"}))),
            ),
            &world,
        )
        .unwrap();

    director.process_frame(0.016, &mut world);
    director.process_frame(0.016, &mut world);

    let visits = journal.borrow();
    let received: Vec<_> = visits.iter().flat_map(|v| v.inbox.clone()).collect();
    assert_eq!(received, vec![json!({"treaty": "offered"})]);
}

#[test]
fn failing_agent_is_paused_and_can_be_resumed() {
    let clock = ManualClock::new();
    let mut world = TestWorld::default();
    let mut director = running(quiet_config(), &clock);
    let trace = SharedTraceLog::new();
    director.set_trace_sink(Box::new(trace.clone()));

    let logic = Scripted::new(AgentKind::Council).failing();
    let journal = logic.journal();
    let id = director.create_agent(None, Box::new(logic), &world).unwrap();

    director.process_frame(0.016, &mut world);
    assert_eq!(director.agent_state(id), Some(AgentState::Paused));
    assert!(director.agent(id).unwrap().fault().is_some());
    assert_eq!(director.metrics().faulted_agents, 1);
    assert_eq!(trace.count("director.fault"), 1);

    director.process_frame(0.016, &mut world);
    assert_eq!(journal.borrow().len(), 1, "paused agents are not serviced");

    director.resume_agent(id).unwrap();
    assert_eq!(director.agent_state(id), Some(AgentState::Active));
    assert!(director.agent(id).unwrap().fault().is_none());
}

#[test]
fn paused_agent_keeps_receiving_messages() {
    let clock = ManualClock::new();
    let mut world = TestWorld::default();
    let mut director = running(quiet_config(), &clock);

    let logic = Scripted::new(AgentKind::Character);
    let journal = logic.journal();
    let id = director.create_agent(None, Box::new(logic), &world).unwrap();

    director.pause_agent(id).unwrap();
    director.publish(Outbound::to_agent(id, json!("held")));
    director.process_frame(0.016, &mut world);
    assert!(journal.borrow().is_empty());
    assert_eq!(director.agent(id).unwrap().mailbox().len(), 1);

    director.resume_agent(id).unwrap();
    director.process_frame(0.016, &mut world);
    assert_eq!(journal.borrow()[0].inbox, vec![json!("held")]);
}

#[test]
fn lifecycle_transitions_follow_the_state_machine() {
    let clock = ManualClock::new();
    let mut world = TestWorld::default();
    let mut director: Director<TestWorld> =
        Director::new(quiet_config()).unwrap().with_clock(clock.clone());

    assert_eq!(director.state(), DirectorState::Stopped);
    assert!(director.process_frame(0.016, &mut world).is_noop());
    assert!(matches!(
        director.pause(),
        Err(DirectorError::InvalidTransition {
            from: DirectorState::Stopped,
            operation: "pause"
        })
    ));
    assert!(director.resume().is_err());

    director.start().unwrap();
    director.start().unwrap();
    assert_eq!(director.state(), DirectorState::Running);

    let id = director
        .create_agent(None, Box::new(Scripted::new(AgentKind::Nation)), &world)
        .unwrap();

    director.pause().unwrap();
    director.pause().unwrap();
    assert_eq!(director.state(), DirectorState::Paused);
    assert!(director.process_frame(0.016, &mut world).is_noop());
    assert_eq!(director.frame(), 0);
    assert!(director.start().is_err());

    director.resume().unwrap();
    director.resume().unwrap();
    director.process_frame(0.016, &mut world);
    assert_eq!(director.frame(), 1);

    director.stop().unwrap();
    director.stop().unwrap();
    assert_eq!(director.state(), DirectorState::Stopped);
    assert!(director.agent(id).is_none());
    assert_eq!(director.agent_count(), 0);

    director.start().unwrap();
    director.process_frame(0.016, &mut world);
    assert_eq!(director.frame(), 2, "frame counter survives a restart");
}

#[test]
fn stop_handle_stops_the_director_from_another_thread() {
    let clock = ManualClock::new();
    let mut world = TestWorld::default();
    let mut director = running(quiet_config(), &clock);
    for _ in 0..3 {
        director
            .create_agent(None, Box::new(Scripted::new(AgentKind::Character)), &world)
            .unwrap();
    }

    let handle = director.stop_handle();
    std::thread::spawn(move || handle.request_stop())
        .join()
        .unwrap();

    let report = director.process_frame(0.016, &mut world);
    assert!(report.stopped);
    assert!(report.serviced.is_empty());
    assert_eq!(report.deferred, 3);
    assert_eq!(director.state(), DirectorState::Stopped);
    assert_eq!(director.agent_count(), 0);
    assert!(!director.stop_handle().is_requested());
}

#[test]
fn load_balancer_adjusts_agents_per_frame() {
    let clock = ManualClock::new();
    let mut config = quiet_config();
    config.load_balance.enabled = true;
    config.load_balance.interval_frames = 2;
    config.load_balance.overload_queue_depth = 2;
    config.load_balance.overloaded_agents_threshold = 1;
    config.load_balance.min_agents_per_frame = 1;
    let mut world = TestWorld::default();
    let mut director = running(config, &clock);

    let ids: Vec<AgentId> = (0..3)
        .map(|_| {
            director
                .create_agent(None, Box::new(Scripted::new(AgentKind::Nation)), &world)
                .unwrap()
        })
        .collect();
    for &id in &ids {
        director.set_message_budget(id, 1).unwrap();
        for i in 0..10 {
            director.publish(Outbound::to_agent(id, json!(i)));
        }
    }

    director.process_frame(0.016, &mut world);
    assert_eq!(director.max_agents_per_frame(), 10);
    director.process_frame(0.016, &mut world);
    assert_eq!(director.max_agents_per_frame(), 12);

    for &id in &ids {
        director.destroy_agent(id);
    }
    director.process_frame(0.016, &mut world);
    director.process_frame(0.016, &mut world);
    assert_eq!(director.max_agents_per_frame(), 11);
}

#[test]
fn metrics_and_reports_reflect_processed_frames() {
    let clock = ManualClock::new();
    let mut world = TestWorld::default();
    let mut director = running(quiet_config(), &clock);

    let id = director
        .create_agent(
            None,
            Box::new(Scripted::new(AgentKind::Nation).costing(&clock, 1.0)),
            &world,
        )
        .unwrap();
    director.publish(Outbound::to_agent(id, json!("hello")));
    director.publish(Outbound::to_agent(AgentId(999), json!("nobody")));

    for _ in 0..3 {
        director.process_frame(0.016, &mut world);
    }

    let metrics = director.metrics();
    assert_eq!(metrics.total_frames, 3);
    assert_eq!(metrics.messages_processed, 1);
    assert_eq!(metrics.undeliverable_count, 1);
    assert_eq!(metrics.active_agents, 1);
    assert!((metrics.average_frame_time_ms - 1.0).abs() < 1e-6);
    assert!((metrics.per_agent_type_average_ms[&AgentKind::Nation] - 1.0).abs() < 1e-6);

    let report = director.performance_report();
    assert!(report.iter().any(|line| line == "Total Frames: 3"));
    assert!(report.iter().any(|line| line == "State: RUNNING"));

    let summaries = director.agent_summaries();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].services, 3);

    let snapshot = director.snapshot_agents();
    assert_eq!(snapshot[id.0.to_string()]["logic"]["visits"], 3);
    assert_eq!(snapshot[id.0.to_string()]["kind"], "nation");

    director.reset_metrics();
    assert_eq!(director.metrics().total_frames, 0);
    assert_eq!(director.frame(), 3);
}

#[test]
fn idle_rebalancing_never_raises_a_small_agent_budget() {
    let mut config = ai_director::DirectorConfig::default();
    config.max_agents_per_frame = 2;
    assert!(matches!(
        Director::<TestWorld>::new(config.clone()),
        Err(DirectorError::Config(_))
    ));

    let clock = ManualClock::new();
    config.max_agents_per_frame = 6;
    config.load_balance.interval_frames = 2;
    let mut world = TestWorld::default();
    let mut director = running(config, &clock);
    for _ in 0..8 {
        director
            .create_agent(None, Box::new(Scripted::new(AgentKind::Character)), &world)
            .unwrap();
    }

    let mut budgets = Vec::new();
    for _ in 0..6 {
        let report = director.process_frame(0.016, &mut world);
        assert!(report.serviced.len() <= 6);
        budgets.push(director.max_agents_per_frame());
    }
    assert_eq!(budgets, vec![6, 5, 5, 5, 5, 5]);
    assert_eq!(director.process_frame(0.016, &mut world).serviced.len(), 5);

    assert!(director.set_max_agents_per_frame(2).is_err());
    assert_eq!(director.max_agents_per_frame(), 5);
}

#[test]
fn pausing_and_resuming_leaves_queues_and_counters_untouched() {
    let clock = ManualClock::new();
    let mut world = TestWorld::default();
    let mut director = running(quiet_config(), &clock);

    let ids: Vec<AgentId> = (0..3)
        .map(|_| {
            director
                .create_agent(None, Box::new(Scripted::new(AgentKind::Council)), &world)
                .unwrap()
        })
        .collect();
    director.process_frame(0.016, &mut world);

    let priorities = [Priority::Low, Priority::Urgent, Priority::Normal, Priority::High];
    for (i, &id) in ids.iter().enumerate() {
        for (j, &priority) in priorities.iter().cycle().skip(i).take(5).enumerate() {
            director.publish(Outbound::to_agent(id, json!([i, j])).with_priority(priority));
        }
    }
    director.pause_agent(ids[2]).unwrap();

    let observe = |director: &Director<TestWorld>| {
        let queues: Vec<(Vec<u64>, Option<AgentState>)> = ids
            .iter()
            .map(|&id| {
                let seqs: Vec<u64> = director
                    .agent(id)
                    .unwrap()
                    .mailbox()
                    .iter()
                    .map(|m| m.seq())
                    .collect();
                (seqs, director.agent_state(id))
            })
            .collect();
        (queues, director.frame(), director.queued_messages())
    };

    let before = observe(&director);
    director.pause().unwrap();
    assert_eq!(observe(&director), before);
    director.resume().unwrap();
    assert_eq!(observe(&director), before);
    assert_eq!(director.state(), DirectorState::Running);
    assert_eq!(director.agent_state(ids[2]), Some(AgentState::Paused));
}

#[test]
fn runtime_tuning_is_validated_before_it_applies() {
    let clock = ManualClock::new();
    let mut world = TestWorld::default();
    let mut director = running(quiet_config(), &clock);

    let ids: Vec<AgentId> = (0..4)
        .map(|_| {
            director
                .create_agent(
                    None,
                    Box::new(Scripted::new(AgentKind::Nation).costing(&clock, 1.0)),
                    &world,
                )
                .unwrap()
        })
        .collect();
    for &id in &ids {
        for i in 0..6 {
            director.publish(Outbound::to_agent(id, json!(i)));
        }
    }

    assert!(matches!(
        director.set_max_agents_per_frame(0),
        Err(DirectorError::Config(_))
    ));
    assert!(director.set_frame_time_budget_ms(f64::NAN).is_err());
    assert!(director.set_frame_time_budget_ms(-1.0).is_err());
    assert!(director.set_max_messages_per_agent(0).is_err());
    assert_eq!(director.max_agents_per_frame(), 10);
    assert_eq!(director.config().per_frame_time_budget_ms, 4.0);
    assert_eq!(director.config().max_messages_per_agent_per_frame, 5);

    director.set_max_agents_per_frame(3).unwrap();
    director.set_max_messages_per_agent(2).unwrap();
    assert_eq!(director.config().max_agents_per_frame, 3);
    assert!(ids
        .iter()
        .all(|&id| director.agent(id).unwrap().message_budget() == 2));

    let report = director.process_frame(0.016, &mut world);
    assert_eq!(report.serviced.len(), 3);
    assert_eq!(report.messages_processed, 6);

    director.set_frame_time_budget_ms(1.5).unwrap();
    let report = director.process_frame(0.016, &mut world);
    assert_eq!(report.serviced.len(), 2);
    assert!(report.deferred > 0);

    let late = director
        .create_agent(None, Box::new(Scripted::new(AgentKind::Character)), &world)
        .unwrap();
    assert_eq!(director.agent(late).unwrap().message_budget(), 2);
}

#[test]
fn backlog_is_broken_down_by_priority() {
    let clock = ManualClock::new();
    let world = TestWorld::default();
    let mut director = running(quiet_config(), &clock);

    let a = director
        .create_agent(None, Box::new(Scripted::new(AgentKind::Nation)), &world)
        .unwrap();
    let b = director
        .create_agent(None, Box::new(Scripted::new(AgentKind::Character)), &world)
        .unwrap();
    director.publish(Outbound::to_agent(a, json!(1)).with_priority(Priority::Urgent));
    director.publish(Outbound::to_agent(a, json!(2)).with_priority(Priority::Low));
    director.publish(Outbound::to_agent(a, json!(3)).with_priority(Priority::Low));
    director.publish(Outbound::to_agent(b, json!(4)).with_priority(Priority::High));
    director.publish(Outbound::to_agent(b, json!(5)));

    let summaries = director.agent_summaries();
    let of = |id: AgentId| summaries.iter().find(|s| s.id == id).unwrap();
    assert_eq!(of(a).backlog_by_priority[&Priority::Low], 2);
    assert_eq!(of(a).backlog_by_priority[&Priority::Normal], 0);
    assert_eq!(of(a).backlog_by_priority[&Priority::Urgent], 1);
    assert_eq!(of(b).backlog_by_priority[&Priority::High], 1);
    assert_eq!(of(b).backlog_by_priority[&Priority::Normal], 1);

    let totals = director.queued_by_priority();
    assert_eq!(totals.values().sum::<usize>(), 5);
    assert_eq!(totals[&Priority::Low], 2);

    let json = serde_json::to_value(of(a)).unwrap();
    assert_eq!(json["backlog_by_priority"]["urgent"], 1);

    let report = director.performance_report();
    assert!(report
        .iter()
        .any(|line| line == "Queued by Priority: low=2 normal=1 high=1 urgent=1"));
}

#[test]
fn service_trace_records_elapsed_microseconds() {
    let clock = ManualClock::new();
    let mut world = TestWorld::default();
    let mut director = running(quiet_config(), &clock);
    let trace = SharedTraceLog::new();
    director.set_trace_sink(Box::new(trace.clone()));

    let id = director
        .create_agent(
            None,
            Box::new(Scripted::new(AgentKind::Nation).costing(&clock, 2.0)),
            &world,
        )
        .unwrap();
    director.process_frame(0.016, &mut world);

    let services: Vec<_> = trace
        .events()
        .into_iter()
        .filter(|e| e.tag == "director.service")
        .collect();
    assert_eq!(services.len(), 1);
    assert_eq!(services[0].a, id.stable_id());
    assert_eq!(services[0].b, 2000);
}
