// SPDX: CC0-1.0

//! The stateful plotting surface a user interface drives.
//!
//! Every call runs to completion. Mutations only mark the picture dirty;
//! [`Plotter::frame`] redraws at most once however many came before it.

use crate::{
    analysis::{self, samples},
    cache::CompileCache,
    canvas::DisplayList,
    classify::Curve,
    expr::{palette_color, ExprId, Expression, ParamErr},
    render::{self, Frame, Settings},
    viewport::{Viewport, ViewportErr, ZOOM_IN, ZOOM_OUT},
    Number, Point,
};
use chrono::{DateTime, Utc};
use core::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerPhase {
    Down,
    Move,
    Up,
    Leave,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerSource {
    Mouse,
    /// Fingers currently on the screen.
    Touch { touches: usize },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerEvent {
    pub phase: PointerPhase,
    pub source: PointerSource,
    /// Canvas pixels.
    pub position: Point<Number>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WheelEvent {
    pub position: Point<Number>,
    /// Positive scrolls away from the user and zooms out.
    pub delta_y: Number,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KeyChord {
    pub key: char,
    pub ctrl: bool,
    pub meta: bool,
    pub alt: bool,
}

impl KeyChord {
    pub const fn new(key: char) -> Self {
        Self {
            key,
            ctrl: false,
            meta: false,
            alt: false,
        }
    }

    pub const fn ctrl(self) -> Self {
        Self { ctrl: true, ..self }
    }

    pub const fn meta(self) -> Self {
        Self { meta: true, ..self }
    }

    pub const fn alt(self) -> Self {
        Self { alt: true, ..self }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shortcut {
    NewExpression,
    ZoomIn,
    ZoomOut,
    FitAll,
}

impl Shortcut {
    /// Control and command are interchangeable.
    pub fn from_key(chord: &KeyChord) -> Option<Self> {
        let modifier = chord.ctrl || chord.meta;
        match chord.key {
            'n' if modifier => Some(Self::NewExpression),
            'e' if chord.alt => Some(Self::NewExpression),
            '+' | '=' if modifier => Some(Self::ZoomIn),
            '-' if modifier => Some(Self::ZoomOut),
            'a' if modifier => Some(Self::FitAll),
            _ => None,
        }
    }
}

/// Transient pointer state.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Interaction {
    pan_from: Option<Point<Number>>,
    hover: Option<Point<Number>>,
}

impl Interaction {
    pub fn is_dragging(&self) -> bool {
        self.pan_from.is_some()
    }

    /// World point under the pointer.
    pub fn hover(&self) -> Option<Point<Number>> {
        self.hover
    }
}

#[derive(Debug)]
pub enum PlotterErr {
    UnknownExpression(ExprId),
    UnknownParameter { id: ExprId, name: String },
    Param(ParamErr),
    Viewport(ViewportErr),
}

impl fmt::Display for PlotterErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownExpression(id) => write!(f, "no expression {id}"),
            Self::UnknownParameter { id, name } => {
                write!(f, "expression {id} has no parameter '{name}'")
            }
            Self::Param(err) => write!(f, "{err}"),
            Self::Viewport(err) => write!(f, "{err}"),
        }
    }
}

impl From<ParamErr> for PlotterErr {
    fn from(err: ParamErr) -> Self {
        Self::Param(err)
    }
}

impl From<ViewportErr> for PlotterErr {
    fn from(err: ViewportErr) -> Self {
        Self::Viewport(err)
    }
}

#[derive(Debug)]
pub struct Plotter {
    cache: Arc<CompileCache>,
    expressions: Vec<Expression>,
    viewport: Viewport,
    settings: Settings,
    interaction: Interaction,
    last_tick: Option<DateTime<Utc>>,
    dirty: bool,
    surface: DisplayList,
}

impl Default for Plotter {
    fn default() -> Self {
        Self::new(Arc::new(CompileCache::new()))
    }
}

impl Plotter {
    pub fn new(cache: Arc<CompileCache>) -> Self {
        Self {
            cache,
            expressions: Vec::new(),
            viewport: Viewport::default(),
            settings: Settings::default(),
            interaction: Interaction::default(),
            last_tick: None,
            dirty: true,
            surface: DisplayList::default(),
        }
    }

    pub fn cache(&self) -> &Arc<CompileCache> {
        &self.cache
    }

    pub fn expressions(&self) -> &[Expression] {
        &self.expressions
    }

    pub fn expression(&self, id: ExprId) -> Option<&Expression> {
        self.expressions.iter().find(|expr| expr.id() == id)
    }

    /// Runs `f` on the expression and marks the picture dirty.
    pub fn with_expression<R>(
        &mut self,
        id: ExprId,
        f: impl FnOnce(&mut Expression) -> R,
    ) -> Result<R, PlotterErr> {
        let expr = self
            .expressions
            .iter_mut()
            .find(|expr| expr.id() == id)
            .ok_or(PlotterErr::UnknownExpression(id))?;
        let ret = f(expr);
        self.dirty = true;
        Ok(ret)
    }

    /// Replaces the expression list with one expression per line of text,
    /// coloured by position.
    pub fn set_expressions<S: AsRef<str>>(&mut self, texts: impl IntoIterator<Item = S>) {
        self.expressions = texts
            .into_iter()
            .enumerate()
            .map(|(idx, text)| Expression::with_text(text.as_ref(), palette_color(idx), &self.cache))
            .collect();
        self.dirty = true;
    }

    pub fn add_expression(&mut self, text: &str) -> ExprId {
        let expr = Expression::with_text(text, palette_color(self.expressions.len()), &self.cache);
        let id = expr.id();
        self.expressions.push(expr);
        self.dirty = true;
        id
    }

    /// Appends an empty expression waiting for text.
    pub fn new_expression(&mut self) -> ExprId {
        let expr = Expression::new(palette_color(self.expressions.len()));
        let id = expr.id();
        self.expressions.push(expr);
        self.dirty = true;
        id
    }

    pub fn update_expression(&mut self, id: ExprId, text: &str) -> Result<(), PlotterErr> {
        let cache = Arc::clone(&self.cache);
        self.with_expression(id, |expr| expr.set_text(text, &cache))
    }

    pub fn remove_expression(&mut self, id: ExprId) -> Result<(), PlotterErr> {
        let idx = self
            .expressions
            .iter()
            .position(|expr| expr.id() == id)
            .ok_or(PlotterErr::UnknownExpression(id))?;
        self.expressions.remove(idx);
        self.dirty = true;
        Ok(())
    }

    pub fn set_parameter(&mut self, id: ExprId, name: &str, value: Number) -> Result<(), PlotterErr> {
        self.with_expression(id, |expr| match expr.parameter_mut(name) {
            Some(param) => param.set_value(value).map_err(PlotterErr::from),
            None => Err(PlotterErr::UnknownParameter {
                id,
                name: name.to_string(),
            }),
        })?
    }

    pub fn set_animating(&mut self, id: ExprId, name: &str, animating: bool) -> Result<(), PlotterErr> {
        self.with_expression(id, |expr| match expr.parameter_mut(name) {
            Some(param) => {
                param.set_animating(animating);
                Ok(())
            }
            None => Err(PlotterErr::UnknownParameter {
                id,
                name: name.to_string(),
            }),
        })?
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Rejects degenerate viewports, keeping the current one.
    pub fn set_viewport(&mut self, viewport: Viewport) -> Result<(), ViewportErr> {
        if let Err(err) = viewport.validate() {
            warn!(%err, "rejected viewport");
            return Err(err);
        }
        self.viewport = viewport;
        self.dirty = true;
        Ok(())
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: Settings) {
        self.settings = settings;
        self.dirty = true;
    }

    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    pub fn handle_pointer_event(&mut self, event: PointerEvent) {
        let pannable = match event.source {
            PointerSource::Mouse => true,
            PointerSource::Touch { touches } => touches == 1,
        };
        match event.phase {
            PointerPhase::Down => {
                if pannable {
                    self.interaction.pan_from = Some(event.position);
                }
            }
            PointerPhase::Move => {
                if let PointerSource::Mouse = event.source {
                    self.interaction.hover = Some(self.viewport.to_world(event.position));
                    self.dirty = true;
                }
                if let (true, Some(from)) = (pannable, self.interaction.pan_from) {
                    let delta = event.position - from;
                    let mut moved = self.viewport.clone();
                    moved.pan(delta.x, delta.y);
                    self.commit_view(moved);
                    self.interaction.pan_from = Some(event.position);
                    self.dirty = true;
                }
            }
            PointerPhase::Up => {
                self.interaction.pan_from = None;
                self.dirty = true;
            }
            PointerPhase::Leave => {
                self.interaction = Interaction::default();
                self.dirty = true;
            }
        }
    }

    pub fn handle_wheel_event(&mut self, event: WheelEvent) {
        let factor = if event.delta_y > 0.0 { ZOOM_OUT } else { ZOOM_IN };
        let mut zoomed = self.viewport.clone();
        zoomed.zoom_at(event.position, factor);
        self.commit_view(zoomed);
        self.dirty = true;
    }

    /// Applies the shortcut bound to `chord`, if any.
    pub fn handle_key_event(&mut self, chord: &KeyChord) -> Option<Shortcut> {
        let shortcut = Shortcut::from_key(chord)?;
        self.apply_shortcut(shortcut);
        Some(shortcut)
    }

    pub fn apply_shortcut(&mut self, shortcut: Shortcut) {
        match shortcut {
            Shortcut::NewExpression => {
                self.new_expression();
            }
            Shortcut::ZoomIn | Shortcut::ZoomOut => {
                let factor = if shortcut == Shortcut::ZoomIn { ZOOM_IN } else { ZOOM_OUT };
                let mut zoomed = self.viewport.clone();
                zoomed.zoom_centered(factor);
                self.commit_view(zoomed);
            }
            Shortcut::FitAll => self.fit_all(),
        }
        self.dirty = true;
    }

    /// Frames every valid function curve as sampled over the visible x range.
    ///
    /// Falls back to the default ranges when the padded extent overflows.
    pub fn fit_all(&mut self) {
        let vp = &self.viewport;
        let step = vp.x_span() / (2.0 * vp.width);
        let mut points = Vec::new();
        for expr in &self.expressions {
            let Some(Curve::Function(f)) = expr.curve() else {
                continue;
            };
            let params = expr.param_values();
            points.extend(samples(vp.x.start, vp.x.end, step).filter_map(|x| {
                analysis::evaluate_at(f.as_ref(), x, &params).map(|y| Point::new(x, y))
            }));
        }
        let fitted = vp.fit(points);
        let fallback = Viewport::default().with_size(vp.width, vp.height);
        if !self.commit_view(fitted) {
            self.viewport = fallback;
        }
        debug!(viewport = %self.viewport, "fit all curves");
        self.dirty = true;
    }

    /// Replaces the viewport unless `candidate` is degenerate. Returns
    /// whether it was taken.
    fn commit_view(&mut self, candidate: Viewport) -> bool {
        match candidate.validate() {
            Ok(()) => {
                self.viewport = candidate;
                true
            }
            Err(err) => {
                warn!(%err, "kept previous viewport");
                false
            }
        }
    }

    /// Advances animating parameters by the time since the previous tick.
    ///
    /// The first tick after animation starts only records the time. Returns
    /// whether any parameter moved.
    pub fn tick(&mut self, now: DateTime<Utc>) -> bool {
        if !self.expressions.iter().any(Expression::is_animating) {
            self.last_tick = None;
            return false;
        }
        let elapsed = self
            .last_tick
            .and_then(|last| (now - last).num_microseconds())
            .map_or(0.0, |us| us as Number / 1e6);
        self.last_tick = Some(now);

        let mut moved = false;
        for expr in &mut self.expressions {
            moved |= expr.advance_animations(elapsed);
        }
        self.dirty |= moved;
        moved
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Redraws if anything changed since the last draw. Returns whether it
    /// drew.
    pub fn frame(&mut self) -> bool {
        if !self.dirty {
            return false;
        }
        // a refused viewport leaves an empty surface, already logged
        let _ = self.render();
        true
    }

    /// Redraws unconditionally.
    pub fn render(&mut self) -> Result<(), ViewportErr> {
        self.dirty = false;
        let mut surface = DisplayList::new(self.viewport.width, self.viewport.height);
        let hover = if self.interaction.is_dragging() {
            None
        } else {
            self.interaction.hover
        };
        let ret = render::draw(
            &mut surface,
            &Frame {
                expressions: &self.expressions,
                viewport: &self.viewport,
                settings: &self.settings,
                hover,
            },
        );
        self.surface = surface;
        ret
    }

    /// The most recently drawn picture.
    pub fn snapshot(&self) -> DisplayList {
        self.surface.clone()
    }
}
