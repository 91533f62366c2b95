//! Hierarchical state machine engine: a rooted tree of named states with
//! enter/exit/update actions, event-driven transitions resolved against the
//! active path, shallow history, and ordered per-state condition checks. One
//! machine is built per NPC at spawn and lives as long as the actor does; its
//! only mutable structural state is the active root-to-leaf stack plus each
//! compound state's last-active child.

pub mod actions;
pub mod conditions;
pub mod roles;

use thiserror::Error;

use crate::actor::ActionCtx;
use crate::steering::Behavior;
use conditions::Condition;

/// Everything that can be signalled to a role state machine, by any of its
/// own actions, its condition checks, or outside systems.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    FoundJar,
    FoundPlayer,
    FoundPlayerCarrying,
    FoundPlayerEmptyHanded,
    TookDamage,
    CriticalDamage,
    JarLost,
    JarStolen,
    JarStashed,
    PlayerNetted,
    PlayerStillNear,
    PlayerFled,
    AttackDone,
    AlertOver,
    FleeTimeout,
    DangerPassed,
    SafeZoneFound,
    EggLaid,
    OffspringHatched,
    EnemyNearby,
}

pub type EnterFn = fn(&mut ActionCtx, &StateParams);
pub type ExitFn = fn(&mut ActionCtx, &StateParams);
pub type UpdateFn = fn(&mut ActionCtx, f32, &StateParams);

/// Tuning bag handed to a state's actions. Conditions carry their own
/// parameters inside the `Condition` variants instead.
#[derive(Debug, Clone)]
pub struct StateParams {
    /// Steering template cloned onto the NPC when the state configures
    /// movement on entry.
    pub behavior: Option<Behavior>,
    /// Ordered condition checks; the order is the firing priority.
    pub checks: Vec<(Condition, Event)>,
    /// Whether this state's movement integrates rotation instead of deriving
    /// orientation from velocity.
    pub rotation_driven: bool,
    pub net_range: f32,
    pub windup_duration: f32,
    pub flee_duration: f32,
    pub steal_radius: f32,
    pub steal_duration: f32,
    pub egg_lay_duration: f32,
    pub min_safe_distance: f32,
    pub top_candidates: usize,
}

impl Default for StateParams {
    fn default() -> Self {
        Self {
            behavior: None,
            checks: Vec::new(),
            rotation_driven: false,
            net_range: 200.0,
            windup_duration: 0.8,
            flee_duration: 6.0,
            steal_radius: 48.0,
            steal_duration: 0.6,
            egg_lay_duration: 2.0,
            min_safe_distance: 200.0,
            top_candidates: 8,
        }
    }
}

/// Declarative definition of one state, nested into a tree by the role
/// builders and flattened into the engine's arena by `Hsm::new`.
pub struct StateDef {
    name: &'static str,
    on_enter: Option<EnterFn>,
    on_exit: Option<ExitFn>,
    on_update: Option<UpdateFn>,
    transitions: Vec<(Event, &'static str)>,
    children: Vec<StateDef>,
    initial: Option<&'static str>,
    history: bool,
    params: StateParams,
}

impl StateDef {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            on_enter: None,
            on_exit: None,
            on_update: None,
            transitions: Vec::new(),
            children: Vec::new(),
            initial: None,
            history: false,
            params: StateParams::default(),
        }
    }

    pub fn on_enter(mut self, f: EnterFn) -> Self {
        self.on_enter = Some(f);
        self
    }

    pub fn on_exit(mut self, f: ExitFn) -> Self {
        self.on_exit = Some(f);
        self
    }

    pub fn on_update(mut self, f: UpdateFn) -> Self {
        self.on_update = Some(f);
        self
    }

    /// Map an event to a destination: either a bare state name or an
    /// absolute slash-path of child names below the root ("Tend/Protect").
    pub fn transition(mut self, event: Event, dest: &'static str) -> Self {
        self.transitions.push((event, dest));
        self
    }

    pub fn child(mut self, child: StateDef) -> Self {
        self.children.push(child);
        self
    }

    pub fn initial(mut self, name: &'static str) -> Self {
        self.initial = Some(name);
        self
    }

    /// Remember the last active child and re-enter it instead of the
    /// declared initial (shallow history).
    pub fn history(mut self) -> Self {
        self.history = true;
        self
    }

    pub fn params(mut self, params: StateParams) -> Self {
        self.params = params;
        self
    }
}

#[derive(Debug, Error)]
pub enum HsmBuildError {
    /// Duplicate names would make bare-name transition targets ambiguous, so
    /// they are rejected outright instead of resolved by traversal order.
    #[error("duplicate state name '{0}' in one state tree")]
    DuplicateStateName(&'static str),
    #[error("state '{0}' declares unknown initial child '{1}'")]
    UnknownInitialChild(&'static str, &'static str),
}

pub type StateId = usize;

struct Node {
    name: &'static str,
    parent: Option<StateId>,
    children: Vec<StateId>,
    initial: Option<StateId>,
    history: bool,
    last_active: Option<StateId>,
    on_enter: Option<EnterFn>,
    on_exit: Option<ExitFn>,
    on_update: Option<UpdateFn>,
    transitions: Vec<(Event, &'static str)>,
    params: StateParams,
}

pub struct Hsm {
    nodes: Vec<Node>,
    /// Active path from the root (index 0) down to the current leaf.
    active: Vec<StateId>,
    /// Optional enter/exit trace, mostly for tests; log::debug always runs.
    journal: Option<Vec<String>>,
}

impl Hsm {
    /// Flatten a state tree into the arena, rejecting duplicate names and
    /// unknown initial children. The machine starts un-entered; the first
    /// `update` (or an explicit `start`) performs the initial descent.
    pub fn new(root: StateDef) -> Result<Self, HsmBuildError> {
        let mut hsm = Self {
            nodes: Vec::new(),
            active: Vec::new(),
            journal: None,
        };
        hsm.flatten(root, None)?;
        Ok(hsm)
    }

    fn flatten(&mut self, def: StateDef, parent: Option<StateId>) -> Result<StateId, HsmBuildError> {
        if self.nodes.iter().any(|n| n.name == def.name) {
            return Err(HsmBuildError::DuplicateStateName(def.name));
        }
        let id = self.nodes.len();
        self.nodes.push(Node {
            name: def.name,
            parent,
            children: Vec::new(),
            initial: None,
            history: def.history,
            last_active: None,
            on_enter: def.on_enter,
            on_exit: def.on_exit,
            on_update: def.on_update,
            transitions: def.transitions,
            params: def.params,
        });

        let mut child_ids = Vec::with_capacity(def.children.len());
        for child in def.children {
            child_ids.push(self.flatten(child, Some(id))?);
        }
        if let Some(initial_name) = def.initial {
            let initial_id = child_ids
                .iter()
                .copied()
                .find(|&c| self.nodes[c].name == initial_name)
                .ok_or(HsmBuildError::UnknownInitialChild(
                    self.nodes[id].name,
                    initial_name,
                ))?;
            self.nodes[id].initial = Some(initial_id);
        }
        self.nodes[id].children = child_ids;
        Ok(id)
    }

    /// Record enter/exit lines into an internal journal, retrievable with
    /// `take_journal`.
    pub fn enable_journal(&mut self) {
        self.journal = Some(Vec::new());
    }

    pub fn take_journal(&mut self) -> Vec<String> {
        match &mut self.journal {
            Some(journal) => std::mem::take(journal),
            None => Vec::new(),
        }
    }

    /// "Root/Tend/SearchJars" for the current active path.
    pub fn active_path(&self) -> String {
        let names: Vec<&str> = self.active.iter().map(|&id| self.nodes[id].name).collect();
        names.join("/")
    }

    pub fn active_leaf(&self) -> Option<&'static str> {
        self.active.last().map(|&id| self.nodes[id].name)
    }

    fn trace(&mut self, verb: &str) {
        let line = format!("{verb} -> {}", self.active_path());
        log::debug!("[hsm] {line}");
        if let Some(journal) = &mut self.journal {
            journal.push(line);
        }
    }

    /// Enter the root and descend to a leaf. Idempotent once entered.
    pub fn start(&mut self, ctx: &mut ActionCtx) {
        if self.active.is_empty() {
            self.enter_descending(0, ctx);
        }
    }

    fn push_state(&mut self, id: StateId, ctx: &mut ActionCtx) {
        if let Some(enter) = self.nodes[id].on_enter {
            enter(ctx, &self.nodes[id].params);
        }
        self.active.push(id);
        self.trace("enter");
    }

    fn pop_state(&mut self, ctx: &mut ActionCtx) {
        let Some(id) = self.active.pop() else {
            return;
        };
        if let Some(exit) = self.nodes[id].on_exit {
            exit(ctx, &self.nodes[id].params);
        }
        if let Some(parent) = self.nodes[id].parent {
            if self.nodes[parent].history {
                self.nodes[parent].last_active = Some(id);
            }
        }
        self.trace("exit");
    }

    /// Enter a node and keep descending through history (when enabled and
    /// populated) or the declared initial child until reaching a leaf.
    fn enter_descending(&mut self, id: StateId, ctx: &mut ActionCtx) {
        self.push_state(id, ctx);
        let node = &self.nodes[id];
        let next = if node.history { node.last_active.or(node.initial) } else { node.initial };
        if let Some(child) = next {
            self.enter_descending(child, ctx);
        }
    }

    fn find_by_name(&self, from: StateId, name: &str) -> Option<StateId> {
        if self.nodes[from].name == name {
            return Some(from);
        }
        self.nodes[from]
            .children
            .iter()
            .find_map(|&c| self.find_by_name(c, name))
    }

    /// Resolve a transition destination. A path with '/' walks child names
    /// down from the root; a bare name is a whole-tree search, unambiguous
    /// because duplicate names are rejected at build time.
    fn resolve(&self, dest: &str) -> Option<StateId> {
        if dest.contains('/') {
            let mut node = 0;
            for part in dest.trim_matches('/').split('/') {
                node = self.nodes[node]
                    .children
                    .iter()
                    .copied()
                    .find(|&c| self.nodes[c].name == part)?;
            }
            Some(node)
        } else {
            self.find_by_name(0, dest)
        }
    }

    fn is_ancestor_or_self(&self, candidate: StateId, mut node: StateId) -> bool {
        loop {
            if node == candidate {
                return true;
            }
            match self.nodes[node].parent {
                Some(parent) => node = parent,
                None => return false,
            }
        }
    }

    /// Lowest common ancestor by walking both ancestor chains.
    fn lca(&self, a: StateId, b: StateId) -> StateId {
        let mut node = a;
        loop {
            if self.is_ancestor_or_self(node, b) {
                return node;
            }
            match self.nodes[node].parent {
                Some(parent) => node = parent,
                None => return 0,
            }
        }
    }

    /// Search the active path leaf-to-root for a transition on this event
    /// and run it. An event no state handles is silently ignored.
    pub fn handle_event(&mut self, event: Event, ctx: &mut ActionCtx) -> bool {
        let mut handler: Option<(StateId, &'static str)> = None;
        for &id in self.active.iter().rev() {
            if let Some(&(_, dest)) = self.nodes[id].transitions.iter().find(|(e, _)| *e == event) {
                handler = Some((id, dest));
                break;
            }
        }
        let Some((source, dest_path)) = handler else {
            return false;
        };
        self.transition(source, dest_path, ctx);
        true
    }

    fn transition(&mut self, source: StateId, dest_path: &str, ctx: &mut ActionCtx) {
        let Some(dest) = self.resolve(dest_path) else {
            // A transition naming a missing state is a wiring bug, but a
            // production tick must shrug it off as a no-op.
            debug_assert!(false, "unresolvable transition target '{dest_path}'");
            log::warn!("ignoring transition to unresolvable state '{dest_path}'");
            return;
        };

        let lca = self.lca(source, dest);

        // Exit bottom-up to (but not including) the LCA.
        while self.active.last().is_some_and(|&top| top != lca) {
            self.pop_state(ctx);
        }

        // Enter top-down from just below the LCA to the destination.
        let mut to_enter = Vec::new();
        let mut node = dest;
        while node != lca {
            to_enter.push(node);
            node = match self.nodes[node].parent {
                Some(parent) => parent,
                None => break,
            };
        }
        for &id in to_enter.iter().rev() {
            self.push_state(id, ctx);
        }

        // A compound destination keeps descending via history/initial.
        let node = &self.nodes[dest];
        let next = if node.history { node.last_active.or(node.initial) } else { node.initial };
        if let Some(child) = next {
            self.enter_descending(child, ctx);
        }
    }

    /// One simulation tick: evaluate condition checks from the leaf upward
    /// (first true condition fires its event, at most one transition per
    /// tick), else run the leaf's update action; finally drain events the
    /// actions queued on the NPC.
    pub fn update(&mut self, dt: f32, ctx: &mut ActionCtx) {
        self.start(ctx);

        let mut fired = None;
        'search: for &id in self.active.iter().rev() {
            for (condition, event) in &self.nodes[id].params.checks {
                if conditions::evaluate(condition, ctx.npc, ctx.world) {
                    fired = Some(*event);
                    break 'search;
                }
            }
        }

        match fired {
            Some(event) => {
                self.handle_event(event, ctx);
            }
            None => {
                if let Some(&leaf) = self.active.last() {
                    if let Some(update) = self.nodes[leaf].on_update {
                        update(ctx, dt, &self.nodes[leaf].params);
                    }
                }
            }
        }

        let pending = std::mem::take(&mut ctx.npc.pending_events);
        for event in pending {
            self.handle_event(event, ctx);
        }
    }
}
