// SPDX: CC0-1.0

use chrono::{Duration, Utc};
use graph_calc::{
    cache::{CompileCache, ManualClock},
    canvas::DisplayList,
    classify::Kind,
    expr::PALETTE,
    plotter::{KeyChord, Plotter, PointerEvent, PointerPhase, PointerSource, Shortcut},
    viewport::Viewport,
    Point,
};
use std::sync::Arc;

fn small_plotter() -> Plotter {
    let mut p = Plotter::default();
    p.set_viewport(Viewport {
        x: -3.0..3.0,
        y: -3.0..3.0,
        width: 60.0,
        height: 40.0,
    })
    .unwrap();
    p
}

#[test]
fn three_curves_and_a_typo() {
    let mut p = Plotter::default();
    p.set_expressions(["x^2", "sin(x)", "2*x + 1", "sqrtt(x)"]);
    p.render().unwrap();

    let snap = p.snapshot();
    assert!(!snap.is_empty());
    for color in &PALETTE[..3] {
        assert_eq!(snap.strokes_in(*color).count(), 1);
    }
    let typo = &p.expressions()[3];
    assert!(!typo.is_valid());
    let err = typo.error().unwrap();
    assert!(err.contains("'sqrtt'"), "{err}");
    assert!(err.contains("did you mean 'sqrt'"), "{err}");
}

#[test]
fn plotters_share_one_cache() {
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let cache = Arc::new(CompileCache::with_clock(clock.clone()).with_ttl(Duration::minutes(1)));

    let mut first = Plotter::new(Arc::clone(&cache));
    let mut second = Plotter::new(Arc::clone(&cache));
    first.add_expression("x^2");
    second.add_expression("x^2");
    second.add_expression("r = 2");
    assert_eq!(cache.len(), 2);
    assert_eq!(second.expressions()[1].kind(), Kind::Polar);

    clock.advance(Duration::minutes(2));
    assert!(cache.get("x^2").is_none());
    assert!(cache.get("r = 2").is_none());
    assert!(first.expressions()[0].is_valid(), "compiled curves outlive the cache");
}

#[test]
fn tangent_and_integral_labels() {
    let mut p = small_plotter();
    let parabola = p.add_expression("x^2");
    let line = p.add_expression("x");
    p.with_expression(parabola, |expr| expr.tangent_at = Some(1.0))
        .unwrap();
    p.with_expression(line, |expr| expr.integral = Some(0.0..2.0))
        .unwrap();
    p.render().unwrap();

    let snap = p.snapshot();
    let texts: Vec<&str> = snap.texts().collect();
    assert!(texts.contains(&"f'(1.00) = 2.000"), "{texts:?}");
    assert!(texts.contains(&"∫ = 2.000"), "{texts:?}");
    assert_eq!(snap.strokes_in(PALETTE[1]).count(), 0, "shaded instead of stroked");
}

#[test]
fn snapshot_replays_identically() {
    let mut p = small_plotter();
    p.set_expressions(["cos(x)", "y < x", "x = cos(t), y = sin(t)", "x^2 + y^2 = 4"]);
    p.render().unwrap();
    let snap = p.snapshot();

    let mut copy = DisplayList::new(snap.width, snap.height);
    snap.replay(&mut copy);
    assert_eq!(copy, snap);
}

#[test]
fn animation_changes_the_picture() {
    let mut p = small_plotter();
    let id = p.add_expression("a*x");
    p.set_animating(id, "a", true).unwrap();
    p.frame();
    let before = p.snapshot();

    let start = Utc::now();
    p.tick(start);
    assert!(p.tick(start + Duration::milliseconds(500)));
    assert!(p.frame());
    assert_ne!(p.snapshot(), before);
}

#[test]
fn keyboard_workflow() {
    let mut p = small_plotter();
    assert_eq!(
        p.handle_key_event(&KeyChord::new('e').alt()),
        Some(Shortcut::NewExpression)
    );
    let id = p.expressions()[0].id();
    p.update_expression(id, "x + 20").unwrap();
    assert!(p.expressions()[0].is_valid());

    p.handle_key_event(&KeyChord::new('a').meta());
    let vp = p.viewport();
    assert!(vp.y.start < 17.0 && 23.0 < vp.y.end, "{vp}");
    assert!(p.handle_key_event(&KeyChord::new('x').ctrl()).is_none());
}

#[test]
fn drag_then_hover() {
    let mut p = small_plotter();
    let touch = |phase, x| PointerEvent {
        phase,
        source: PointerSource::Touch { touches: 1 },
        position: Point::new(x, 20.0),
    };
    p.handle_pointer_event(touch(PointerPhase::Down, 30.0));
    p.handle_pointer_event(touch(PointerPhase::Move, 40.0));
    p.handle_pointer_event(touch(PointerPhase::Up, 40.0));
    // 10px of 60px is a sixth of the 6 unit span
    assert!((p.viewport().x.start + 4.0).abs() < 1e-12);
    assert!(p.interaction().hover().is_none(), "touches do not hover");
}
