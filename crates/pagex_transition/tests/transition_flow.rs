//! End-to-end transition flows driven by a deterministic clock

use pagex_animation::{Channel, KeyframeMap, ManualClock, StyleFrame};
use pagex_core::{
    InterruptPolicy, MachineState, NavigationEvent, Outcome, RouteDefinition, RouteTable,
};
use pagex_transition::{
    component, Component, EnteringPolicy, Item, ItemKeyframes, ItemProps, PageRole,
    TransitionConfig, TransitionHost,
};

const FRAME_MS: f64 = 20.0;

fn slide_page() -> Component {
    let keyframes = ItemKeyframes::new()
        .enter(
            KeyframeMap::new()
                .at(0.0, StyleFrame::new().with(Channel::TranslateY, 100.0))
                .at(1.0, StyleFrame::new().with(Channel::TranslateY, 0.0)),
        )
        .exit(
            KeyframeMap::new()
                .at(0.0, StyleFrame::new().with(Channel::Opacity, 1.0))
                .at(1.0, StyleFrame::new().with(Channel::Opacity, 0.0)),
        );
    component(move |scope| {
        let props = ItemProps::new()
            .keyframes(keyframes.clone())
            .attribute("data-route", scope.route());
        Ok(vec![Item::new(scope, props)?])
    })
}

struct Fixture {
    host: TransitionHost,
    clock: ManualClock,
}

impl Fixture {
    fn new(config: TransitionConfig) -> Self {
        let mut routes = RouteTable::new();
        routes.define("/a", slide_page()).unwrap();
        routes.define("/b", slide_page()).unwrap();
        routes.define("/c", slide_page()).unwrap();
        routes
            .route(RouteDefinition::new("/instant", slide_page()).enter_duration(0.0))
            .unwrap();
        let clock = ManualClock::new();
        let host = TransitionHost::with_time_source(routes, config, clock.clone());
        Self { host, clock }
    }

    fn config(entering: EnteringPolicy, interrupt: InterruptPolicy) -> TransitionConfig {
        TransitionConfig {
            enter_duration_ms: 100.0,
            exit_duration_ms: 100.0,
            entering_policy: entering,
            interrupt_policy: interrupt,
            ..TransitionConfig::default()
        }
    }

    fn go(&mut self, path: &str) -> Option<Outcome> {
        self.host
            .navigate(NavigationEvent::Complete(path.to_string()))
            .unwrap()
            .map(|transition| transition.outcome)
    }

    fn frame(&mut self) {
        self.host.frame().unwrap();
        self.clock.advance(FRAME_MS);
    }

    /// Run frames until `done` holds; returns the number of frames run
    fn run_until(&mut self, mut done: impl FnMut(&TransitionHost) -> bool) -> usize {
        for frame in 0..1000 {
            if done(&self.host) {
                return frame;
            }
            self.frame();
        }
        panic!("condition not reached, host: {:?}", self.host);
    }

    fn settle(&mut self) {
        self.run_until(|host| host.is_idle());
    }

    fn roles(&self) -> Vec<(String, PageRole)> {
        self.host
            .views()
            .iter()
            .map(|view| (view.route.to_string(), view.role))
            .collect()
    }
}

fn roles(entries: &[(&str, PageRole)]) -> Vec<(String, PageRole)> {
    entries
        .iter()
        .map(|(route, role)| (route.to_string(), *role))
        .collect()
}

#[test]
fn hard_cut_sequence() {
    let mut fx = Fixture::new(Fixture::config(EnteringPolicy::HardCut, InterruptPolicy::Ignore));
    fx.go("/a");
    fx.settle();
    assert_eq!(fx.roles(), roles(&[("/a", PageRole::Resident)]));

    assert_eq!(fx.go("/b"), Some(Outcome::Changed));
    assert_eq!(fx.host.state(), MachineState::Entering);
    assert_eq!(fx.host.context().current_route(), Some("/a"));
    assert_eq!(fx.host.context().next_route(), Some("/b"));
    // The outgoing page is cut immediately
    assert_eq!(fx.roles(), roles(&[("/b", PageRole::Entering)]));

    fx.run_until(|host| host.state() == MachineState::Exiting);
    assert_eq!(
        fx.roles(),
        roles(&[("/a", PageRole::Exiting), ("/b", PageRole::Resident)])
    );

    fx.run_until(|host| host.state() == MachineState::Stationary);
    assert_eq!(fx.host.context().current_route(), Some("/b"));
    assert!(fx.host.context().next.is_none());
    assert_eq!(fx.roles(), roles(&[("/b", PageRole::Resident)]));
    assert_eq!(fx.host.mounted_count(), 1);
}

#[test]
fn overlap_holds_outgoing_page() {
    let mut fx = Fixture::new(Fixture::config(EnteringPolicy::Overlap, InterruptPolicy::Ignore));
    fx.go("/a");
    fx.settle();
    let held_scope = fx.host.scope("/a").unwrap();

    fx.go("/b");
    assert_eq!(
        fx.roles(),
        roles(&[("/a", PageRole::Held), ("/b", PageRole::Entering)])
    );

    fx.frame();
    fx.frame();
    let views = fx.host.views();
    assert_eq!(views[0].enter_progress, 1.0);
    assert_eq!(views[0].exit_progress, None);
    assert!(views[1].enter_progress > 0.0);
    drop(views);

    fx.run_until(|host| host.state() == MachineState::Exiting);
    // Same mount, now exiting
    assert!(held_scope.is_active());
    assert_eq!(
        fx.roles(),
        roles(&[("/a", PageRole::Exiting), ("/b", PageRole::Resident)])
    );

    fx.run_until(|host| host.state() == MachineState::Stationary);
    assert!(!held_scope.is_active());
}

#[test]
fn first_navigation_has_nothing_to_exit() {
    let mut fx = Fixture::new(Fixture::config(EnteringPolicy::HardCut, InterruptPolicy::Ignore));
    fx.go("/a");
    let frames = fx.run_until(|host| host.state() == MachineState::Stationary);

    // Entrance only: 100ms at 20ms a frame, plus the frame that starts the clock
    assert!(frames <= 7, "took {frames} frames");
    assert_eq!(fx.host.context().current_route(), Some("/a"));
}

#[test]
fn same_route_is_noop() {
    let mut fx = Fixture::new(Fixture::config(EnteringPolicy::HardCut, InterruptPolicy::Ignore));
    fx.go("/a");
    fx.settle();
    let scope = fx.host.scope("/a").unwrap();

    assert_eq!(fx.go("/a"), Some(Outcome::Ignored));
    assert_eq!(fx.host.state(), MachineState::Stationary);
    assert_eq!(fx.host.scope("/a").map(|s| s.id()), Some(scope.id()));
}

#[test]
fn navigation_start_is_noop() {
    let mut fx = Fixture::new(Fixture::config(EnteringPolicy::HardCut, InterruptPolicy::Ignore));
    fx.go("/a");
    fx.settle();

    let start = fx
        .host
        .navigate(NavigationEvent::Start("/b".into()))
        .unwrap()
        .map(|t| t.outcome);
    assert_eq!(start, Some(Outcome::Ignored));
    assert_eq!(fx.host.state(), MachineState::Stationary);
    assert_eq!(fx.roles(), roles(&[("/a", PageRole::Resident)]));
}

#[test]
fn mid_transition_navigation_ignored_by_default() {
    let mut fx = Fixture::new(Fixture::config(EnteringPolicy::HardCut, InterruptPolicy::Ignore));
    fx.go("/a");
    fx.settle();
    fx.go("/b");
    fx.frame();

    assert_eq!(fx.go("/c"), Some(Outcome::Ignored));
    assert_eq!(fx.host.pending_route(), None);

    fx.settle();
    assert_eq!(fx.host.context().current_route(), Some("/b"));
}

#[test]
fn mid_transition_navigation_queued_latest() {
    let mut fx = Fixture::new(Fixture::config(
        EnteringPolicy::HardCut,
        InterruptPolicy::QueueLatest,
    ));
    fx.go("/a");
    fx.settle();
    fx.go("/b");
    fx.frame();

    assert_eq!(fx.go("/a"), Some(Outcome::Queued));
    assert_eq!(fx.go("/c"), Some(Outcome::Queued));
    assert_eq!(fx.host.pending_route(), Some("/c"));

    fx.run_until(|host| host.context().next_route() == Some("/c"));
    assert_eq!(fx.host.context().current_route(), Some("/b"));
    assert_eq!(fx.host.state(), MachineState::Entering);

    fx.settle();
    assert_eq!(fx.host.context().current_route(), Some("/c"));
    assert_eq!(fx.roles(), roles(&[("/c", PageRole::Resident)]));
}

#[test]
fn route_duration_override() {
    let mut fx = Fixture::new(Fixture::config(EnteringPolicy::HardCut, InterruptPolicy::Ignore));
    fx.go("/instant");
    fx.frame();
    assert_eq!(fx.host.state(), MachineState::Stationary);
    assert_eq!(fx.host.context().current_route(), Some("/instant"));
}

#[test]
fn item_styles_follow_progress() {
    let mut fx = Fixture::new(Fixture::config(EnteringPolicy::HardCut, InterruptPolicy::Ignore));
    fx.go("/a");

    let initial = fx.host.views()[0].styles()[0].clone();
    assert_eq!(initial.get(Channel::TranslateY).value, 100.0);
    assert_eq!(
        initial.attributes().get("data-route").map(String::as_str),
        Some("/a")
    );

    fx.settle();
    let resident = fx.host.views()[0].styles()[0].clone();
    assert_eq!(resident.transform(), "none");
    assert_eq!(resident.opacity(), 1.0);

    fx.go("/b");
    fx.run_until(|host| host.state() == MachineState::Exiting);
    fx.run_until(|host| {
        host.views()
            .iter()
            .find(|view| view.role == PageRole::Exiting)
            .is_some_and(|view| view.styles()[0].opacity() < 0.5)
    });
}

#[test]
fn exited_page_is_torn_down() {
    let mut fx = Fixture::new(Fixture::config(EnteringPolicy::HardCut, InterruptPolicy::Ignore));
    fx.go("/a");
    fx.settle();
    fx.go("/b");
    fx.run_until(|host| host.state() == MachineState::Exiting);
    let exiting = fx.host.scope("/a").unwrap();
    assert!(exiting.is_active());

    fx.run_until(|host| host.state() == MachineState::Stationary);
    assert!(!exiting.is_active());
    assert!(exiting.enter_progress().is_err());
    assert!(fx.host.scope("/a").is_none());
}
