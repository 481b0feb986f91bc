//! Transition host
//!
//! The host composes the pieces: navigation events from the router go
//! through route matching into the [`TransitionMachine`], and after every
//! event or frame the host reconciles the set of mounted pages against what
//! the machine says should be on screen.
//!
//! | Machine state             | Pages rendered                                   |
//! |---------------------------|--------------------------------------------------|
//! | `stationary`              | `current` (resident)                             |
//! | `transitioning.entering`  | `next` (entering); `current` held under overlap  |
//! | `transitioning.exiting`   | `current` (exiting) and `next` (resident)        |
//!
//! Page lifecycles post completion signals; the host drains them once per
//! frame and forwards the ones that still describe the machine's pages.
//!
//! A component that fails to mount is reported to the caller, and the machine
//! drops its page so later navigations proceed normally.

use pagex_animation::{FrameScheduler, SchedulerHandle, SystemClock, TimeSource};
use pagex_core::{
    MachineState, NavigationEvent, Outcome, PageRef, Result, RouteMatcher, RouteTable, Transition,
    TransitionContext, TransitionEvent, TransitionMachine,
};
use rustc_hash::FxHashMap;
use slotmap::SlotMap;
use std::fmt;
use std::rc::Rc;

use crate::config::{EnteringPolicy, TransitionConfig};
use crate::item::Item;
use crate::page::{
    PageDurations, PageEnvironment, PageId, PageLifecycle, PageRole, PageScope, PageSignal,
    SignalQueue,
};
use crate::style::ItemStyle;

/// Renders a page's content
///
/// Called once per mount with the page's scope; the returned items live as
/// long as the mounted page.
pub trait PageComponent {
    fn mount(&self, scope: &PageScope) -> Result<Vec<Item>>;
}

impl<F> PageComponent for F
where
    F: Fn(&PageScope) -> Result<Vec<Item>>,
{
    fn mount(&self, scope: &PageScope) -> Result<Vec<Item>> {
        self(scope)
    }
}

/// Shared render target registered with a route
pub type Component = Rc<dyn PageComponent>;

/// Wrap a closure as a [`Component`]
pub fn component<F>(f: F) -> Component
where
    F: Fn(&PageScope) -> Result<Vec<Item>> + 'static,
{
    Rc::new(f)
}

/// What the router told us about a route when it was last navigated to
#[derive(Clone, Debug, Default)]
struct RouteInfo {
    durations: PageDurations,
    params: Vec<(String, String)>,
}

struct MountedPage {
    // Items unsubscribe before the lifecycle's clocks stop
    items: Vec<Item>,
    lifecycle: PageLifecycle,
    role: PageRole,
    params: Vec<(String, String)>,
}

/// A mounted page as the renderer sees it
pub struct PageView<'a> {
    pub id: PageId,
    pub route: &'a str,
    pub role: PageRole,
    pub enter_progress: f32,
    pub exit_progress: Option<f32>,
    pub params: &'a [(String, String)],
    pub items: &'a [Item],
}

impl PageView<'_> {
    pub fn styles(&self) -> Vec<ItemStyle> {
        self.items.iter().map(Item::style).collect()
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

impl fmt::Debug for PageView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageView")
            .field("id", &self.id)
            .field("route", &self.route)
            .field("role", &self.role)
            .field("enter_progress", &self.enter_progress)
            .field("exit_progress", &self.exit_progress)
            .field("items", &self.items.len())
            .finish()
    }
}

/// Drives page transitions for one application session
pub struct TransitionHost<M = RouteTable<Component>> {
    matcher: M,
    config: TransitionConfig,
    machine: TransitionMachine<Component>,
    scheduler: FrameScheduler,
    environment: Rc<PageEnvironment>,
    signals: SignalQueue,
    pages: SlotMap<PageId, MountedPage>,
    /// Live page per route; orphaned exiting pages are not listed
    by_route: FxHashMap<String, PageId>,
    routes: FxHashMap<String, RouteInfo>,
}

impl<M: RouteMatcher<Component>> TransitionHost<M> {
    /// Create a host driven by the system clock
    pub fn new(matcher: M, config: TransitionConfig) -> Self {
        Self::with_time_source(matcher, config, SystemClock::new())
    }

    /// Create a host driven by `time`
    pub fn with_time_source(
        matcher: M,
        config: TransitionConfig,
        time: impl TimeSource + 'static,
    ) -> Self {
        let scheduler = FrameScheduler::with_time_source(time);
        let environment = PageEnvironment::new(scheduler.handle())
            .with_throttle_ms(config.throttle_ms)
            .with_springs(config.spring_configs());

        tracing::debug!(
            "transition host created (entering={:?}, interrupt={:?})",
            config.entering_policy,
            config.interrupt_policy
        );

        Self {
            matcher,
            machine: TransitionMachine::new().with_interrupt_policy(config.interrupt_policy),
            config,
            scheduler,
            environment: Rc::new(environment),
            signals: SignalQueue::new(),
            pages: SlotMap::with_key(),
            by_route: FxHashMap::default(),
            routes: FxHashMap::default(),
        }
    }

    pub fn config(&self) -> &TransitionConfig {
        &self.config
    }

    pub fn matcher(&self) -> &M {
        &self.matcher
    }

    pub fn state(&self) -> MachineState {
        self.machine.state()
    }

    pub fn context(&self) -> &TransitionContext<Component> {
        self.machine.context()
    }

    /// Route change held for replay under `queue-latest`
    pub fn pending_route(&self) -> Option<&str> {
        self.machine.pending().map(|page| page.route.as_str())
    }

    pub fn scheduler(&self) -> SchedulerHandle {
        self.scheduler.handle()
    }

    pub fn now_ms(&self) -> f64 {
        self.scheduler.now_ms()
    }

    /// Feed a router event
    ///
    /// Returns the machine transition it caused, or `None` if nothing was
    /// dispatched (navigation errors, unmatched paths).
    pub fn navigate(&mut self, event: NavigationEvent) -> Result<Option<Transition>> {
        let transition = match event {
            NavigationEvent::Start(path) => match self.matcher.match_path(&path) {
                // The render target is resolved on completion
                Some(matched) => Some(self.machine.send(TransitionEvent::RouteChange {
                    route: Some(matched.route),
                    component: None,
                })),
                None => {
                    tracing::debug!("navigation to {} matched no route", path);
                    None
                }
            },
            NavigationEvent::Complete(path) => match self.matcher.match_path(&path) {
                Some(matched) => {
                    let info = RouteInfo {
                        durations: PageDurations {
                            enter_ms: matched
                                .enter_duration_ms
                                .map(f64::from)
                                .unwrap_or(self.config.enter_duration_ms),
                            exit_ms: matched
                                .exit_duration_ms
                                .map(f64::from)
                                .unwrap_or(self.config.exit_duration_ms),
                        },
                        params: matched.params,
                    };
                    let route = matched.route;
                    let transition = self
                        .machine
                        .send(TransitionEvent::route_change(route.clone(), matched.target));
                    if transition.outcome != Outcome::Ignored {
                        self.routes.insert(route, info);
                    }
                    Some(transition)
                }
                None => {
                    tracing::debug!("navigation to {} matched no route", path);
                    None
                }
            },
            NavigationEvent::Error(path) => {
                tracing::warn!("navigation to {} failed", path);
                None
            }
        };

        self.settle()?;
        Ok(transition)
    }

    /// Run one animation frame, then apply the lifecycle signals it produced
    pub fn frame(&mut self) -> Result<()> {
        self.scheduler.tick();
        self.settle()
    }

    /// Run one animation frame at an explicit time
    pub fn frame_at(&mut self, now_ms: f64) -> Result<()> {
        self.scheduler.tick_at(now_ms);
        self.settle()
    }

    /// No transition running and every item at rest
    pub fn is_idle(&self) -> bool {
        self.machine.state() == MachineState::Stationary
            && self.signals.is_empty()
            && self
                .pages
                .values()
                .all(|page| page.items.iter().all(Item::is_settled))
    }

    /// Mounted pages in paint order: outgoing pages first
    pub fn views(&self) -> Vec<PageView<'_>> {
        let mut views: Vec<PageView<'_>> = self
            .pages
            .iter()
            .map(|(id, page)| PageView {
                id,
                route: page.lifecycle.route(),
                role: page.role,
                enter_progress: page.lifecycle.enter_progress(),
                exit_progress: page.lifecycle.exit_progress(),
                params: &page.params,
                items: &page.items,
            })
            .collect();
        views.sort_by_key(|view| match view.role {
            PageRole::Held | PageRole::Exiting => 0,
            PageRole::Resident | PageRole::Entering => 1,
        });
        views
    }

    /// Number of mounted pages, including orphaned exiting ones
    pub fn mounted_count(&self) -> usize {
        self.pages.len()
    }

    /// Scope of the live page for `route`
    pub fn scope(&self, route: &str) -> Option<PageScope> {
        self.by_route
            .get(route)
            .and_then(|id| self.pages.get(*id))
            .map(|page| page.lifecycle.scope())
    }

    fn settle(&mut self) -> Result<()> {
        let mut failure = None;
        loop {
            let mut progressed = false;
            while let Some(signal) = self.signals.pop() {
                self.handle_signal(signal);
                progressed = true;
            }

            if let Err(err) = self.reconcile() {
                // The machine has dropped the failed page; reconcile again
                failure.get_or_insert(err);
                progressed = true;
            }

            // Nothing to play out on the very first navigation
            if self.machine.state() == MachineState::Exiting
                && self.machine.context().current.is_none()
            {
                self.machine.send(TransitionEvent::ExitComplete);
                progressed = true;
            }

            if !progressed && self.signals.is_empty() {
                return match failure {
                    Some(err) => Err(err),
                    None => Ok(()),
                };
            }
        }
    }

    fn handle_signal(&mut self, signal: PageSignal) {
        let state = self.machine.state();
        match signal {
            PageSignal::EnterComplete(id) => {
                if state == MachineState::Entering
                    && self.is_live(id, self.machine.context().next_route())
                {
                    self.machine.send(TransitionEvent::EnterComplete);
                } else {
                    tracing::trace!("stale enter completion from {:?}", id);
                }
            }
            PageSignal::ExitComplete(id) => {
                if state == MachineState::Exiting
                    && self.is_live(id, self.machine.context().current_route())
                {
                    self.machine.send(TransitionEvent::ExitComplete);
                } else {
                    tracing::trace!("stale exit completion from {:?}", id);
                }
                self.unmount(id);
            }
        }
    }

    fn is_live(&self, id: PageId, route: Option<&str>) -> bool {
        route
            .and_then(|route| self.by_route.get(route))
            .is_some_and(|live| *live == id)
    }

    /// Pages the machine wants on screen, with their roles
    fn desired(&self) -> Vec<(PageRef<Component>, PageRole)> {
        let context = self.machine.context();
        let mut desired = Vec::with_capacity(2);
        match self.machine.state() {
            MachineState::Stationary => {
                if let Some(current) = &context.current {
                    desired.push((current.clone(), PageRole::Resident));
                }
            }
            MachineState::Entering => {
                if self.config.entering_policy == EnteringPolicy::Overlap {
                    if let Some(current) = &context.current {
                        desired.push((current.clone(), PageRole::Held));
                    }
                }
                if let Some(next) = &context.next {
                    desired.push((next.clone(), PageRole::Entering));
                }
            }
            MachineState::Exiting => {
                if let Some(current) = &context.current {
                    desired.push((current.clone(), PageRole::Exiting));
                }
                if let Some(next) = &context.next {
                    desired.push((next.clone(), PageRole::Resident));
                }
            }
        }
        desired
    }

    fn reconcile(&mut self) -> Result<()> {
        let desired = self.desired();

        // Pages no longer wanted: exiting ones finish their exit, the rest go
        let stale: Vec<(String, PageId)> = self
            .by_route
            .iter()
            .filter(|(route, _)| !desired.iter().any(|(page, _)| &page.route == *route))
            .map(|(route, id)| (route.clone(), *id))
            .collect();
        for (route, id) in stale {
            if self.pages.get(id).is_some_and(|page| page.role == PageRole::Exiting) {
                tracing::trace!("page {} orphaned while exiting", route);
                self.by_route.remove(&route);
            } else {
                self.unmount(id);
            }
        }

        for (page, role) in desired {
            let live = self.by_route.get(&page.route).copied();
            match live.and_then(|id| self.pages.get_mut(id)) {
                Some(mounted) => {
                    if mounted.role == role {
                        continue;
                    }
                    if mounted.role == PageRole::Exiting {
                        // An exit can't be undone; remount alongside it
                        tracing::trace!("page {} orphaned while exiting", page.route);
                        self.by_route.remove(&page.route);
                        self.mount(&page, role)?;
                        continue;
                    }
                    if role == PageRole::Exiting {
                        mounted.lifecycle.begin_exit();
                    }
                    tracing::trace!("page {} {} -> {}", page.route, mounted.role, role);
                    mounted.role = role;
                }
                None => {
                    self.mount(&page, role)?;
                }
            }
        }
        Ok(())
    }

    fn mount(&mut self, page: &PageRef<Component>, role: PageRole) -> Result<PageId> {
        let info = self.routes.get(&page.route).cloned().unwrap_or_else(|| RouteInfo {
            durations: PageDurations {
                enter_ms: self.config.enter_duration_ms,
                exit_ms: self.config.exit_duration_ms,
            },
            params: Vec::new(),
        });
        let environment = Rc::clone(&self.environment);
        let signals = self.signals.clone();

        let id = self.pages.insert_with_key(|id| {
            let lifecycle = match role {
                PageRole::Entering => {
                    PageLifecycle::mount(id, &page.route, info.durations, environment, signals)
                }
                PageRole::Resident | PageRole::Held | PageRole::Exiting => {
                    PageLifecycle::mount_entered(id, &page.route, info.durations, environment, signals)
                }
            };
            MountedPage {
                items: Vec::new(),
                lifecycle,
                role,
                params: info.params,
            }
        });

        let scope = self.pages[id].lifecycle.scope();
        let items = match page.component.mount(&scope) {
            Ok(items) => items,
            Err(err) => {
                tracing::warn!("page {} failed to mount: {}", page.route, err);
                self.pages.remove(id);
                self.machine.send(TransitionEvent::MountFailed(page.route.clone()));
                return Err(err);
            }
        };

        let mounted = &mut self.pages[id];
        mounted.items = items;
        if role == PageRole::Exiting {
            mounted.lifecycle.begin_exit();
        }
        self.by_route.insert(page.route.clone(), id);
        tracing::debug!("mounted {} as {} ({} items)", page.route, role, mounted.items.len());
        Ok(id)
    }

    fn unmount(&mut self, id: PageId) {
        let Some(page) = self.pages.remove(id) else {
            return;
        };
        let route = page.lifecycle.route();
        if self.by_route.get(route) == Some(&id) {
            self.by_route.remove(route);
        }
        tracing::debug!("unmounted {} ({})", route, page.role);
    }
}

impl<M> fmt::Debug for TransitionHost<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransitionHost")
            .field("state", &self.machine.state())
            .field("context", self.machine.context())
            .field("mounted", &self.pages.len())
            .finish()
    }
}
