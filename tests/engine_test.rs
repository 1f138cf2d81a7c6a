use approx::assert_relative_eq;
use ordered_float::OrderedFloat;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::{Rc, Weak};
use tracing_subscriber::EnvFilter;
use tweenery::prelude::*;
use tweenery::{InvalidTimingError, TweenError, TweenRequest};

mod supersession {
    use super::*;

    #[test]
    fn same_turn_restart_cancels_older_tween() {
        let scene = Scene::new();
        let element = Element::new();
        let a = scene
            .animate(&element, "A", "x")
            .from_to(0, 100)
            .duration(200.0)
            .start()
            .unwrap();
        let b = scene
            .animate(&element, "B", "x")
            .from_to(100, 0)
            .duration(200.0)
            .start()
            .unwrap();

        scene.run(&[0.0, 100.0, 200.0]);

        assert_eq!(scene.journal.events(), &["A start", "A cancel", "B start", "B end"]);
        assert!(scene.journal.writes("A").is_empty());
        assert_eq!(
            scene.journal.writes("B"),
            &[Value::from(100), Value::from(50), Value::from(0)]
        );
        assert_eq!(a.status(), Status::Ended);
        assert_eq!(b.status(), Status::Ended);
        assert_eq!(element.value("x"), Some(Value::from(0)));
    }

    #[test]
    fn only_youngest_of_simultaneous_tweens_runs() {
        let scene = Scene::new();
        let element = Element::new();
        for (label, end) in [("A", 10), ("B", 20), ("C", 30)] {
            scene
                .animate(&element, label, "x")
                .from_to(0, end)
                .duration(100.0)
                .start()
                .unwrap();
        }

        scene.run(&[0.0, 100.0]);

        assert_eq!(
            scene.journal.events(),
            &["A start", "A cancel", "B start", "B cancel", "C start", "C end"]
        );
        assert!(scene.journal.writes("A").is_empty());
        assert!(scene.journal.writes("B").is_empty());
        assert_eq!(element.value("x"), Some(Value::from(30)));
    }

    #[test]
    fn new_tween_interrupts_running_tween_from_its_current_value() {
        let scene = Scene::new();
        let element = Element::new();
        let a = scene
            .animate(&element, "A", "x")
            .from_to(0, 100)
            .duration(100.0)
            .start()
            .unwrap();
        scene.run(&[0.0, 50.0]);
        assert_eq!(a.status(), Status::Running);

        scene
            .animate(&element, "B", "x")
            .to(0)
            .duration(100.0)
            .start()
            .unwrap();
        scene.run(&[60.0, 110.0, 160.0]);

        assert_eq!(
            scene.journal.events(),
            &["A start", "A interrupt", "B start", "B end"]
        );
        assert_eq!(
            scene.journal.writes("A"),
            &[Value::from(0), Value::from(50), Value::from(60)]
        );
        // B was requested at 50, so its first frame at 60 is already 10 into its duration.
        for (actual, expected) in scene.journal.numbers("B").into_iter().zip([54.0, 24.0, 0.0]) {
            assert_relative_eq!(actual, expected);
        }
        assert_eq!(scene.journal.numbers("B").len(), 3);
        assert_eq!(a.status(), Status::Ended);
    }

    #[test]
    fn pending_older_tween_is_cancelled_by_younger_start() {
        let scene = Scene::new();
        let element = Element::new();
        let a = scene
            .animate(&element, "A", "x")
            .from_to(0, 10)
            .delay(100.0)
            .start()
            .unwrap();
        scene.run(&[0.0]);
        assert_eq!(a.status(), Status::Scheduled);

        scene.animate(&element, "B", "x").from_to(5, 10).start().unwrap();
        scene.run(&[10.0]);

        assert_eq!(scene.journal.events(), &["A cancel", "B start"]);
        assert_eq!(a.status(), Status::Ended);
        assert_eq!(scene.engine.live_tweens(&element).len(), 1);
    }

    #[test]
    fn younger_pending_tween_is_left_alone() {
        let scene = Scene::new();
        let element = Element::new();
        scene
            .animate(&element, "A", "x")
            .from_to(0, 10)
            .delay(50.0)
            .duration(100.0)
            .start()
            .unwrap();
        let b = scene
            .animate(&element, "B", "x")
            .from_to(0, 20)
            .delay(500.0)
            .duration(100.0)
            .start()
            .unwrap();

        scene.run(&[0.0, 50.0, 150.0]);

        assert_eq!(scene.journal.events(), &["A start", "A end"]);
        assert_eq!(b.status(), Status::Scheduled);
        assert_eq!(element.value("x"), Some(Value::from(10)));
    }

    #[test]
    fn tweens_of_different_properties_run_independently() {
        let scene = Scene::new();
        let element = Element::new();
        scene.animate(&element, "X", "x").from_to(0, 1).start().unwrap();
        scene.animate(&element, "Y", "y").from_to(0, 2).start().unwrap();

        scene.run(&[0.0, 250.0]);

        assert_eq!(
            scene.journal.events(),
            &["X start", "Y start", "X end", "Y end"]
        );
        assert_eq!(element.value("x"), Some(Value::from(1)));
        assert_eq!(element.value("y"), Some(Value::from(2)));
    }
}

mod lifecycle {
    use super::*;

    #[test]
    fn delayed_tween_ends_by_delay_plus_duration() {
        let scene = Scene::new();
        let element = Element::new();
        let tween = scene
            .animate(&element, "A", "opacity")
            .from_to(0, 1)
            .delay(50.0)
            .duration(100.0)
            .ease(Easing::InOutCubic)
            .start()
            .unwrap();

        let mut statuses = Vec::new();
        let mut samples = BTreeMap::new();
        for time in [0.0, 50.0, 100.0, 150.0] {
            scene.timer.flush_at(time);
            statuses.push(tween.status());
            if let Some(value) = element.value("opacity").and_then(|value| value.as_number()) {
                samples.insert(OrderedFloat(time), value);
            }
        }

        assert_eq!(
            statuses,
            &[Status::Scheduled, Status::Running, Status::Running, Status::Ended]
        );
        assert_eq!(samples[&OrderedFloat(50.0)], 0.0);
        assert_relative_eq!(samples[&OrderedFloat(100.0)], 0.5);
        assert_eq!(samples[&OrderedFloat(150.0)], 1.0);
        assert_eq!(scene.journal.events(), &["A start", "A end"]);
    }

    #[test]
    fn equal_start_and_end_runs_callbacks_without_writing() {
        let scene = Scene::new();
        let element = Element::new();
        let tween = scene
            .animate(&element, "A", "x")
            .from_to(5, 5)
            .duration(100.0)
            .start()
            .unwrap();
        scene.animate(&element, "B", "fill").hold("red").start().unwrap();

        scene.run(&[0.0, 50.0, 100.0, 250.0]);

        assert_eq!(
            scene.journal.events(),
            &["A start", "B start", "A end", "B end"]
        );
        assert!(scene.journal.writes("A").is_empty());
        assert!(scene.journal.writes("B").is_empty());
        assert_eq!(tween.get(), Value::from(5));
    }

    #[test]
    fn final_frame_is_exactly_the_end_value() {
        let scene = Scene::new();
        let element = Element::new();
        scene
            .animate(&element, "A", "x")
            .from_to(0.1, 0.3)
            .duration(100.0)
            .ease(Easing::OutBack(1.70158))
            .start()
            .unwrap();
        scene
            .animate(&element, "B", "fill")
            .from_to("red", "blue")
            .duration(100.0)
            .start()
            .unwrap();
        scene
            .animate(&element, "C", "width")
            .from_to("0px", "100px")
            .duration(100.0)
            .ease(Easing::Linear)
            .start()
            .unwrap();

        scene.run(&[0.0, 50.0]);
        let overshoot = element.value("x").and_then(|value| value.as_number()).unwrap();
        assert!(overshoot > 0.3);
        assert_eq!(element.value("width"), Some(Value::from("50px")));
        let fill = element.value("fill").unwrap();
        assert!(fill.as_text().unwrap().starts_with("rgb("));

        scene.run(&[100.0]);
        assert_eq!(element.value("x"), Some(Value::Number(0.3)));
        assert_eq!(element.value("fill"), Some(Value::from("blue")));
        assert_eq!(element.value("width"), Some(Value::from("100px")));
    }

    #[test]
    fn get_reports_start_value_before_running() {
        let scene = Scene::new();
        let element = Element::new();
        element.set("x", Value::from(4));

        let explicit = scene.animate(&element, "A", "y").from_to(3, 9).start().unwrap();
        let live = scene.animate(&element, "B", "x").to(9).start().unwrap();

        assert_eq!(explicit.status(), Status::Created);
        assert_eq!(explicit.get(), Value::from(3));
        assert_eq!(live.get(), Value::from(4));
        assert!(scene.journal.writes("A").is_empty());
    }

    #[test]
    fn handle_callbacks_can_be_added_after_creation() {
        let scene = Scene::new();
        let element = Element::new();
        let tween = scene.animate(&element, "A", "x").from_to(0, 1).start().unwrap();
        let journal = scene.journal.clone();
        tween.on_end(move || journal.record("A end (handle)"));

        scene.run(&[0.0, 250.0]);

        assert_eq!(
            scene.journal.events(),
            &["A start", "A end", "A end (handle)"]
        );
    }

    #[test]
    fn rejects_invalid_requests() {
        let scene = Scene::new();
        let element = Element::new();

        let empty = scene.engine.start(
            &element,
            "",
            TweenValues::to(1),
            Property::default(),
            TimingConfiguration::new(),
            Callbacks::new(),
        );
        let negative_delay = scene.engine.start(
            &element,
            "x",
            TweenValues::to(1),
            Property::default(),
            TimingConfiguration::new().delay(-1.0),
            Callbacks::new(),
        );

        assert_eq!(empty.unwrap_err(), TweenError::EmptyName);
        assert_eq!(
            negative_delay.unwrap_err(),
            TweenError::InvalidTiming(InvalidTimingError::Delay(-1.0))
        );
        assert_eq!(scene.engine.target_count(), 0);
        assert_eq!(scene.timer.pending(), 0);
    }
}

mod reentrancy {
    use super::*;

    #[test]
    fn end_callback_can_start_follow_up_tween() {
        let scene = Scene::new();
        let element = Element::new();
        let follow_up = scene.animate(&element, "B", "x").from_to(10, 20).duration(100.0);
        let journal = scene.journal.clone();
        scene
            .animate(&element, "A", "x")
            .from_to(0, 10)
            .duration(100.0)
            .on_end(move || {
                journal.record("A chains B");
                follow_up.start().unwrap();
            })
            .start()
            .unwrap();

        scene.run(&[0.0, 100.0, 200.0]);

        assert_eq!(
            scene.journal.events(),
            &["A start", "A end", "A chains B", "B start", "B end"]
        );
        assert_eq!(scene.journal.writes("A"), &[Value::from(0), Value::from(10)]);
        assert_eq!(scene.journal.writes("B"), &[Value::from(10), Value::from(20)]);
        assert!(!scene.engine.has_target(&element));
    }

    #[test]
    fn start_callback_can_request_replacement_that_interrupts_it() {
        let scene = Scene::new();
        let element = Element::new();
        let replacement = scene.animate(&element, "C", "x").from_to(0, 50).duration(100.0);
        let a = scene
            .animate(&element, "A", "x")
            .from_to(0, 10)
            .duration(100.0)
            .on_start(move || {
                replacement.start().unwrap();
            })
            .start()
            .unwrap();

        scene.run(&[0.0, 100.0]);

        assert_eq!(
            scene.journal.events(),
            &["A start", "A interrupt", "C start", "C end"]
        );
        assert_eq!(scene.journal.writes("A"), &[Value::from(0)]);
        assert_eq!(a.status(), Status::Ended);
        assert_eq!(element.value("x"), Some(Value::from(50)));
    }

    #[test]
    fn tween_ended_by_its_own_start_callback_never_runs() {
        let scene = Scene::new();
        let element = Element::new();
        let other = Element::new();
        let request = scene.animate(&element, "A", "x").from_to(0, 10).duration(100.0);
        let follow_up = scene.animate(&other, "B", "y").hold(1);
        let a = request
            .on_start(move || {
                drop(element);
                follow_up.start().unwrap();
            })
            .start()
            .unwrap();

        scene.run(&[0.0, 50.0, 300.0]);

        assert_eq!(scene.journal.events(), &["A start", "B start", "B end"]);
        assert!(scene.journal.writes("A").is_empty());
        assert_eq!(a.status(), Status::Ended);
        assert_eq!(scene.engine.target_count(), 0);
        assert_eq!(scene.timer.pending(), 0);
    }

    #[test]
    fn callbacks_can_read_their_own_tween() {
        let scene = Scene::new();
        let element = Element::new();
        let a = scene
            .animate(&element, "A", "x")
            .from_to(0, 10)
            .duration(100.0)
            .start()
            .unwrap();
        let reads = Rc::new(RefCell::new(Vec::new()));
        for phase in [Phase::Start, Phase::End] {
            let (handle, engine, target, reads) =
                (a.clone(), scene.engine.clone(), element.clone(), reads.clone());
            a.on(phase, move || {
                let status = engine.get_tween(&target, "x").map(|tween| tween.status());
                reads.borrow_mut().push((handle.get(), status));
            });
        }

        scene.run(&[0.0, 100.0]);

        assert_eq!(
            *reads.borrow(),
            vec![
                (Value::from(0), Some(Status::Starting)),
                (Value::from(10), Some(Status::Ending)),
            ]
        );
        assert_eq!(scene.journal.events(), &["A start", "A end"]);
        assert!(scene.engine.get_tween(&element, "x").is_none());
    }
}

mod registry {
    use super::*;

    #[test]
    fn target_is_dropped_after_its_last_tween_ends() {
        let scene = Scene::new();
        let element = Element::new();
        scene.animate(&element, "X", "x").from_to(0, 1).duration(100.0).start().unwrap();
        scene.animate(&element, "Y", "y").from_to(0, 1).duration(200.0).start().unwrap();

        scene.run(&[0.0, 100.0]);
        let live: Vec<_> = scene
            .engine
            .live_tweens(&element)
            .iter()
            .map(|tween| tween.name().to_owned())
            .collect();
        assert_eq!(live, &["y"]);
        assert!(scene.engine.get_tween(&element, "x").is_none());
        assert!(scene.engine.get_tween(&element, "y").is_some());

        scene.run(&[200.0]);
        assert!(!scene.engine.has_target(&element));
        assert_eq!(scene.engine.target_count(), 0);
        assert_eq!(scene.timer.pending(), 0);
    }

    #[test]
    fn repeated_cycles_do_not_grow_registry() {
        let scene = Scene::new();
        let element = Element::new();

        for end in 1..=20 {
            scene
                .animate(&element, "A", "x")
                .from_to(end - 1, end)
                .duration(100.0)
                .start()
                .unwrap();
            scene.timer.advance(0.0);
            assert_eq!(scene.engine.target_count(), 1);
            scene.timer.advance(100.0);
            assert_eq!(scene.engine.target_count(), 0);
            assert_eq!(scene.timer.pending(), 0);
        }
        assert_eq!(element.value("x"), Some(Value::from(20)));
    }

    #[test]
    fn dropped_targets_are_not_kept_alive() {
        let scene = Scene::new();
        let element = Element::new();
        let other = Element::new();
        let weak = Rc::downgrade(&element);
        let tween = scene
            .animate(&element, "A", "x")
            .from_to(0, 10)
            .duration(100.0)
            .start()
            .unwrap();
        scene.run(&[0.0]);

        drop(element);
        assert!(weak.upgrade().is_none());
        assert_eq!(scene.engine.target_count(), 0);

        scene.animate(&other, "B", "x").from_to(0, 1).start().unwrap();
        assert_eq!(tween.status(), Status::Ended);
        assert_eq!(scene.timer.pending(), 1);

        scene.run(&[50.0]);
        assert_eq!(scene.journal.events(), &["A start", "B start"]);
        assert_eq!(scene.engine.target_count(), 1);
    }

    #[test]
    fn dropped_target_stops_its_tweens_without_another_start() {
        let scene = Scene::new();
        let element = Element::new();
        let tween = scene
            .animate(&element, "A", "x")
            .from_to(0, 10)
            .duration(100.0)
            .start()
            .unwrap();
        scene.run(&[0.0]);

        drop(element);
        scene.run(&[50.0, 100.0]);

        assert_eq!(scene.journal.events(), &["A start"]);
        assert_eq!(scene.journal.numbers("A"), &[0.0]);
        assert_eq!(tween.status(), Status::Ended);
        assert_eq!(scene.engine.target_count(), 0);
        assert_eq!(scene.timer.pending(), 0);
    }

    #[test]
    fn ended_tweens_release_their_callbacks() {
        let scene = Scene::new();
        let element = Element::new();
        let tween = scene
            .animate(&element, "A", "x")
            .from_to(0, 10)
            .duration(100.0)
            .start()
            .unwrap();
        let guard = Rc::new(());
        let held = guard.clone();
        tween.on_interrupt(move || drop(held));
        assert_eq!(Rc::strong_count(&guard), 2);

        scene.run(&[0.0, 100.0]);

        assert_eq!(tween.status(), Status::Ended);
        assert_eq!(scene.journal.events(), &["A start", "A end"]);
        assert_eq!(Rc::strong_count(&guard), 1);
    }
}

/// A target whose properties are stored by name.
#[derive(Debug, Default)]
struct Element {
    values: RefCell<HashMap<String, Value>>,
}

impl Element {
    fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    fn value(&self, name: &str) -> Option<Value> {
        self.values.borrow().get(name).cloned()
    }

    fn set(&self, name: &str, value: Value) {
        self.values.borrow_mut().insert(name.to_owned(), value);
    }
}

/// Records lifecycle events and property writes, labelled by tween.
#[derive(Clone, Default)]
struct Journal {
    events: Rc<RefCell<Vec<String>>>,
    writes: Rc<RefCell<Vec<(&'static str, Value)>>>,
}

impl Journal {
    fn record(&self, event: impl Into<String>) {
        self.events.borrow_mut().push(event.into());
    }

    fn recorder(&self, event: String) -> impl FnOnce() + 'static {
        let journal = self.clone();
        move || journal.record(event)
    }

    fn events(&self) -> Vec<String> {
        self.events.borrow().clone()
    }

    fn numbers(&self, label: &str) -> Vec<f64> {
        self.writes(label)
            .iter()
            .filter_map(Value::as_number)
            .collect()
    }

    fn writes(&self, label: &str) -> Vec<Value> {
        self.writes
            .borrow()
            .iter()
            .filter(|(tween, _)| *tween == label)
            .map(|(_, value)| value.clone())
            .collect()
    }
}

struct Scene {
    timer: Rc<FrameTimer>,
    engine: Engine<Element>,
    journal: Journal,
}

impl Scene {
    fn new() -> Self {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
        let timer = Rc::new(FrameTimer::new());
        Self {
            engine: Engine::new(timer.clone()),
            timer,
            journal: Journal::default(),
        }
    }

    /// Starts a request for `name` on `element` that records everything `label`'s tween does.
    ///
    /// The setter and getter hold the element weakly, so the request never keeps it alive.
    fn animate(
        &self,
        element: &Rc<Element>,
        label: &'static str,
        name: &str,
    ) -> TweenRequest<Element> {
        let (setter_element, getter_element) = (Rc::downgrade(element), Rc::downgrade(element));
        let writes = self.journal.writes.clone();
        self.engine
            .tween(element, name)
            .ease(Easing::Linear)
            .setter(move |name, value| {
                writes.borrow_mut().push((label, value.clone()));
                if let Some(element) = setter_element.upgrade() {
                    element.set(name, value.clone());
                }
            })
            .getter(move |name| Weak::upgrade(&getter_element)?.value(name))
            .on_start(self.journal.recorder(format!("{label} start")))
            .on_cancel(self.journal.recorder(format!("{label} cancel")))
            .on_interrupt(self.journal.recorder(format!("{label} interrupt")))
            .on_end(self.journal.recorder(format!("{label} end")))
    }

    fn run(&self, times: &[f64]) {
        for &time in times {
            self.timer.flush_at(time);
        }
    }
}
