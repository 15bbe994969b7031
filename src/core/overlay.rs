//! Mutually exclusive overlay panels and outside-interaction dismissal.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError, Weak};

use tracing::debug;

use crate::core::session::SessionState;

/// Surfaces that can be layered over the session view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverlayPanel {
    ModelPicker,
    ParameterPanel,
    InstructionEditor,
}

/// Current overlay state. At most one panel is ever open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlayState {
    #[default]
    Closed,
    ModelPicker,
    ParameterPanel,
    InstructionEditor,
}

impl OverlayState {
    pub fn panel(self) -> Option<OverlayPanel> {
        match self {
            OverlayState::Closed => None,
            OverlayState::ModelPicker => Some(OverlayPanel::ModelPicker),
            OverlayState::ParameterPanel => Some(OverlayPanel::ParameterPanel),
            OverlayState::InstructionEditor => Some(OverlayPanel::InstructionEditor),
        }
    }

    pub fn is_open(self, panel: OverlayPanel) -> bool {
        self.panel() == Some(panel)
    }
}

impl From<OverlayPanel> for OverlayState {
    fn from(panel: OverlayPanel) -> Self {
        match panel {
            OverlayPanel::ModelPicker => OverlayState::ModelPicker,
            OverlayPanel::ParameterPanel => OverlayState::ParameterPanel,
            OverlayPanel::InstructionEditor => OverlayState::InstructionEditor,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned bounds of a rendered surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Region {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x
            && point.x < self.x + self.width
            && point.y >= self.y
            && point.y < self.y + self.height
    }
}

/// Where each panel and its toggle control were last rendered.
#[derive(Debug, Clone, Copy, Default)]
pub struct PanelBounds {
    pub panel: Option<Region>,
    pub toggle: Option<Region>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OverlayLayout {
    pub model_picker: PanelBounds,
    pub parameter_panel: PanelBounds,
    pub instruction_editor: PanelBounds,
}

impl OverlayLayout {
    pub fn bounds(&self, panel: OverlayPanel) -> &PanelBounds {
        match panel {
            OverlayPanel::ModelPicker => &self.model_picker,
            OverlayPanel::ParameterPanel => &self.parameter_panel,
            OverlayPanel::InstructionEditor => &self.instruction_editor,
        }
    }
}

/// Decide whether an interaction at `point` dismisses the open panel.
///
/// A panel that has not been laid out yet is never dismissed, and its own
/// toggle is exempt so the toggle's click handler stays in charge.
pub fn dismisses(bounds: &PanelBounds, point: Point) -> bool {
    let Some(panel) = bounds.panel else {
        return false;
    };
    if panel.contains(point) {
        return false;
    }
    !bounds.toggle.is_some_and(|toggle| toggle.contains(point))
}

#[derive(Debug, Default)]
pub struct OverlayCoordinator {
    state: OverlayState,
    layout: OverlayLayout,
}

pub type SharedOverlay = Arc<Mutex<OverlayCoordinator>>;

impl OverlayCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedOverlay {
        Arc::new(Mutex::new(Self::new()))
    }

    pub fn state(&self) -> OverlayState {
        self.state
    }

    pub fn layout(&self) -> &OverlayLayout {
        &self.layout
    }

    pub fn set_layout(&mut self, layout: OverlayLayout) {
        self.layout = layout;
    }

    /// Open `panel`, replacing whichever panel was open.
    pub fn open(&mut self, panel: OverlayPanel) {
        let next = OverlayState::from(panel);
        if self.state != next {
            debug!(from = ?self.state, to = ?next, "overlay transition");
        }
        self.state = next;
    }

    /// Toggle control behaviour: close the panel if it is open, otherwise
    /// open it in place of any other panel.
    pub fn toggle(&mut self, panel: OverlayPanel) {
        if self.state.is_open(panel) {
            self.close();
        } else {
            self.open(panel);
        }
    }

    pub fn close(&mut self) {
        if self.state != OverlayState::Closed {
            debug!(from = ?self.state, "overlay closed");
        }
        self.state = OverlayState::Closed;
    }

    /// Apply the boundary test for an interaction. Returns true when the
    /// interaction closed the open panel.
    pub fn handle_interaction(&mut self, point: Point) -> bool {
        let Some(panel) = self.state.panel() else {
            return false;
        };
        if dismisses(self.layout.bounds(panel), point) {
            self.close();
            true
        } else {
            false
        }
    }

    /// Select a model from the picker. The picker closes whether or not the
    /// selection was accepted.
    pub fn select_model(
        &mut self,
        session: &mut SessionState,
        model_name: &str,
    ) -> Result<(), String> {
        let result = session.update_model(model_name);
        self.close();
        result
    }

    /// Start routing outside interactions from `hub` to this coordinator.
    /// Routing stops when the returned guard is dropped.
    pub fn mount(overlay: &SharedOverlay, hub: &Arc<InteractionHub>) -> DismissalGuard {
        let weak: Weak<Mutex<OverlayCoordinator>> = Arc::downgrade(overlay);
        hub.install(Arc::new(move |point: Point| {
            if let Some(overlay) = weak.upgrade() {
                overlay
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .handle_interaction(point);
            }
        }))
    }
}

type InteractionHandler = Arc<dyn Fn(Point) + Send + Sync>;

/// Process-wide fan-out of pointer interactions to mounted overlays.
#[derive(Default)]
pub struct InteractionHub {
    next_id: AtomicU64,
    handlers: Mutex<Vec<(u64, InteractionHandler)>>,
}

impl InteractionHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn global() -> Arc<InteractionHub> {
        static GLOBAL: OnceLock<Arc<InteractionHub>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(InteractionHub::new())))
    }

    pub fn install(self: &Arc<Self>, handler: InteractionHandler) -> DismissalGuard {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock_handlers().push((id, handler));
        debug!(id, "interaction handler installed");
        DismissalGuard {
            hub: Arc::downgrade(self),
            id,
        }
    }

    fn uninstall(&self, id: u64) {
        self.lock_handlers().retain(|(existing, _)| *existing != id);
        debug!(id, "interaction handler removed");
    }

    pub fn handler_count(&self) -> usize {
        self.lock_handlers().len()
    }

    /// Deliver an interaction to every installed handler.
    pub fn dispatch(&self, point: Point) {
        let handlers: Vec<InteractionHandler> = self
            .lock_handlers()
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect();
        for handler in handlers {
            handler(point);
        }
    }

    fn lock_handlers(&self) -> std::sync::MutexGuard<'_, Vec<(u64, InteractionHandler)>> {
        self.handlers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Uninstalls its handler exactly once, on drop.
#[must_use = "dropping the guard immediately uninstalls the handler"]
pub struct DismissalGuard {
    hub: Weak<InteractionHub>,
    id: u64,
}

impl Drop for DismissalGuard {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.uninstall(self.id);
        }
    }
}
