// SPDX: CC0-1.0

use chrono::{DateTime, Duration, Utc};
use graph_calc::{
    analysis,
    classify::{self, Curve, Kind},
    eval::{self, Handle},
    expr::{ExprId, ParamErr},
    plotter::{Plotter, Shortcut},
    render::{self, CoordinateSystem, Theme},
    shell::{self, Command},
    viewport::ZOOM_IN,
    Number, Point,
};
use std::{
    io::{stdout, BufWriter, Write},
    process::ExitCode,
};
use tracing_subscriber::EnvFilter;

/// Animation frames per simulated second.
const TICK_RATE: Number = 60.0;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    match try_main() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("unexpected error: {err}");
            let chain = err.chain();
            if chain.len() > 1 {
                eprintln!();
                eprintln!("context:");
                for it in chain.skip(1) {
                    eprintln!("  {it}");
                }
            }
            ExitCode::FAILURE
        }
    }
}

#[derive(Debug)]
struct State {
    plotter: Plotter,
    /// Simulated wall clock driving animation ticks.
    now: DateTime<Utc>,
}

fn try_main() -> anyhow::Result<()> {
    let mut state = State {
        plotter: Plotter::default(),
        now: Utc::now(),
    };
    state.plotter.add_expression("sin(x)");

    let mut stdout = BufWriter::new(stdout());
    loop {
        match state.plotter.expressions().len() {
            0 => writeln!(stdout, "nothing is graphed")?,
            1 => writeln!(stdout, "graphing {}", state.plotter.expressions()[0].text())?,
            n => writeln!(stdout, "graphing {n} expressions")?,
        }

        let mut try_cmd = shell::input(&mut stdout, "> ")?;
        try_cmd.make_ascii_lowercase();
        writeln!(stdout)?;

        if let Ok(cmd) = try_cmd.parse::<Command>() {
            match cmd {
                Command::Help => {
                    for c in Command::exhaustive() {
                        writeln!(stdout, "{name}: {help}", name = c.name(), help = c.help())?;
                    }
                }

                Command::Quit => break,

                Command::Add => add_expr(&mut stdout, &mut state)?,

                Command::Edit => edit_expr(&mut stdout, &mut state)?,

                Command::Remove => {
                    if let Some(id) = select(&mut stdout, &state, "?remove #")? {
                        if let Err(err) = state.plotter.remove_expression(id) {
                            writeln!(stdout, "error: {err}")?;
                        }
                    }
                }

                Command::List => {
                    if state.plotter.expressions().is_empty() {
                        shell::no_expressions(&mut stdout)?;
                    }
                    for (idx, expr) in state.plotter.expressions().iter().enumerate() {
                        shell::describe(&mut stdout, idx + 1, expr)?;
                    }
                }

                Command::Param => set_param(&mut stdout, &mut state)?,

                Command::Animate => toggle_animation(&mut stdout, &mut state)?,

                Command::Tick => run_ticks(&mut stdout, &mut state)?,

                Command::Window => set_win(&mut stdout, &mut state)?,

                Command::Zoom => zoom(&mut stdout, &mut state)?,

                Command::Fit => {
                    state.plotter.apply_shortcut(Shortcut::FitAll);
                    writeln!(stdout, "view = {:#}", state.plotter.viewport())?;
                }

                Command::Tangent => set_tangent(&mut stdout, &mut state)?,

                Command::Integral => set_integral(&mut stdout, &mut state)?,

                Command::Range => set_param_range(&mut stdout, &mut state)?,

                Command::Table => print_table(&mut stdout, &mut state)?,

                Command::Intersect => intersect(&mut stdout, &mut state)?,

                Command::Settings => set_settings(&mut stdout, &mut state)?,

                Command::Plot => match state.plotter.render() {
                    Ok(()) => shell::summarize(&mut stdout, &state.plotter.snapshot())?,
                    Err(err) => writeln!(stdout, "error: {err}")?,
                },

                Command::PrintProg => print_prog(&mut stdout, &mut state)?,
            }
        } else {
            writeln!(stdout, r#"Unknown command, try "help" for help"#)?;
        }

        writeln!(stdout)?;
    }
    stdout.flush()?;
    Ok(())
}

/// Asks for an expression by its listed number.
fn select<W: Write>(mut out: W, state: &State, prompt: &str) -> anyhow::Result<Option<ExprId>> {
    let exprs = state.plotter.expressions();
    if exprs.is_empty() {
        shell::no_expressions(&mut out)?;
        return Ok(None);
    }
    let num = match shell::read_fromstr::<_, usize>(
        &mut out,
        format_args!("{prompt} (1-{len}) = ", len = exprs.len()),
        false,
    )? {
        Ok(Some(num)) => num,
        Ok(None) | Err(_) => return Ok(None),
    };
    match num.checked_sub(1).and_then(|idx| exprs.get(idx)) {
        Some(expr) => Ok(Some(expr.id())),
        None => {
            writeln!(out, "error: there is no expression {num}")?;
            Ok(None)
        }
    }
}

/// Like [`select`], but only accepts functions of `x`.
fn select_function<W: Write>(
    mut out: W,
    state: &State,
    prompt: &str,
) -> anyhow::Result<Option<(ExprId, Handle)>> {
    let Some(id) = select(&mut out, state, prompt)? else {
        return Ok(None);
    };
    match state.plotter.expression(id).and_then(|expr| expr.curve()) {
        Some(Curve::Function(f)) => Ok(Some((id, f.clone()))),
        Some(curve) => {
            writeln!(out, "error: expected a function of x but found a {} curve", curve.kind())?;
            Ok(None)
        }
        None => {
            writeln!(out, "error: the expression is not valid")?;
            Ok(None)
        }
    }
}

fn read_number<W: Write>(
    out: W,
    prompt: std::fmt::Arguments,
) -> anyhow::Result<Result<Option<Number>, ()>> {
    Ok(shell::read_fromstr::<_, Number>(out, prompt, true)?.map_err(|_| ()))
}

/// Reports the structured error of an expression that failed to compile.
fn report_invalid<W: Write>(mut out: W, state: &State, id: ExprId) -> anyhow::Result<()> {
    let Some(expr) = state.plotter.expression(id) else {
        return Ok(());
    };
    if expr.is_valid() {
        writeln!(out, "{} curve", expr.kind())?;
        return Ok(());
    }
    match classify::classify(expr.text()) {
        Err(err) => shell::report_expr_err(&mut out, &err)?,
        Ok(_) => writeln!(out, "error: {}", expr.error().unwrap_or("invalid expression"))?,
    }
    Ok(())
}

fn add_expr<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    let text = shell::input(&mut out, "expr: ")?;
    if text.is_empty() {
        return Ok(());
    }
    let id = state.plotter.add_expression(&text);
    report_invalid(&mut out, state, id)
}

fn edit_expr<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    let Some(id) = select(&mut out, state, "?edit #")? else {
        return Ok(());
    };
    let old = state
        .plotter
        .expression(id)
        .map(|expr| expr.text().to_string())
        .unwrap_or_default();
    writeln!(out, "note: leave blank to keep '{old}'")?;
    let text = shell::input(&mut out, "expr: ")?;
    if text.is_empty() {
        return Ok(());
    }
    if let Err(err) = state.plotter.update_expression(id, &text) {
        writeln!(out, "error: {err}")?;
        return Ok(());
    }
    report_invalid(&mut out, state, id)
}

fn read_param_name<W: Write>(
    mut out: W,
    state: &State,
    id: ExprId,
) -> anyhow::Result<Option<String>> {
    let Some(expr) = state.plotter.expression(id) else {
        return Ok(None);
    };
    let names: Vec<&str> = expr.parameters().map(|param| param.name()).collect();
    if names.is_empty() {
        writeln!(out, "error: the expression has no parameters")?;
        return Ok(None);
    }
    let name = shell::input(&mut out, format_args!("?parameter ({}) = ", names.join(", ")))?;
    if !names.contains(&name.as_str()) {
        writeln!(out, "error: no parameter '{name}'")?;
        return Ok(None);
    }
    Ok(Some(name))
}

fn set_param<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    let Some(id) = select(&mut out, state, "?expression #")? else {
        return Ok(());
    };
    let Some(name) = read_param_name(&mut out, state, id)? else {
        return Ok(());
    };
    let Some(param) = state
        .plotter
        .expression(id)
        .and_then(|expr| expr.parameter(&name))
        .cloned()
    else {
        return Ok(());
    };

    writeln!(out, "note: leave blank to skip")?;
    let mut answers = [None; 4];
    for (answer, (field, cur)) in answers.iter_mut().zip([
        ("min", param.min()),
        ("max", param.max()),
        ("step", param.step()),
        ("value", param.value()),
    ]) {
        match read_number(&mut out, format_args!("?{name} {field} (is {cur}) = "))? {
            Ok(new) => *answer = new,
            Err(()) => return Ok(()),
        }
    }
    let [min, max, step, value] = answers;

    let applied = state.plotter.with_expression(id, |expr| -> Result<(), ParamErr> {
        let Some(param) = expr.parameter_mut(&name) else {
            return Ok(());
        };
        if min.is_some() || max.is_some() {
            let (lo, hi) = (min.unwrap_or(param.min()), max.unwrap_or(param.max()));
            param.set_range(lo, hi)?;
        }
        if let Some(step) = step {
            param.set_step(step)?;
        }
        if let Some(value) = value {
            param.set_value(value)?;
        }
        Ok(())
    });
    match applied {
        Ok(Ok(())) => {}
        Ok(Err(err)) => writeln!(out, "error: {err}")?,
        Err(err) => writeln!(out, "error: {err}")?,
    }
    Ok(())
}

fn toggle_animation<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    let Some(id) = select(&mut out, state, "?expression #")? else {
        return Ok(());
    };
    let Some(name) = read_param_name(&mut out, state, id)? else {
        return Ok(());
    };
    let animating = state
        .plotter
        .expression(id)
        .and_then(|expr| expr.parameter(&name))
        .is_some_and(|param| param.is_animating());
    match state.plotter.set_animating(id, &name, !animating) {
        Ok(()) if animating => writeln!(out, "stopped animating {name}")?,
        Ok(()) => writeln!(out, "animating {name}, use \"tick\" to advance")?,
        Err(err) => writeln!(out, "error: {err}")?,
    }
    Ok(())
}

fn run_ticks<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    let secs = match read_number(&mut out, format_args!("?seconds = "))? {
        Ok(Some(secs)) if secs.is_finite() && secs > 0.0 => secs,
        Ok(_) => {
            writeln!(out, "error: seconds must be a positive number")?;
            return Ok(());
        }
        Err(()) => return Ok(()),
    };

    let frame = Duration::microseconds((1e6 / TICK_RATE) as i64);
    let frames = (secs * TICK_RATE).ceil() as u64;
    state.plotter.tick(state.now);
    let mut moved = false;
    for _ in 0..frames {
        state.now = state.now + frame;
        moved |= state.plotter.tick(state.now);
        state.plotter.frame();
    }
    if !moved {
        writeln!(out, "nothing is animating")?;
        return Ok(());
    }
    for (idx, expr) in state.plotter.expressions().iter().enumerate() {
        for param in expr.parameters().filter(|param| param.is_animating()) {
            writeln!(out, "{num}: {name} = {val:.3}", num = idx + 1, name = param.name(), val = param.value())?;
        }
    }
    Ok(())
}

fn set_win<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    let mut vp = state.plotter.viewport().clone();
    writeln!(out, "view = {vp:#}")?;
    writeln!(out)?;
    writeln!(out, "note: leave blank to skip")?;

    for (name, dst) in [
        ("x min", &mut vp.x.start),
        ("x max", &mut vp.x.end),
        ("y min", &mut vp.y.start),
        ("y max", &mut vp.y.end),
        ("width", &mut vp.width),
        ("height", &mut vp.height),
    ] {
        match read_number(&mut out, format_args!("?{name} (is {cur}) = ", cur = *dst))? {
            Ok(Some(new)) => *dst = new,
            Ok(None) => {}
            Err(()) => return Ok(()),
        }
    }

    if let Err(err) = state.plotter.set_viewport(vp) {
        writeln!(out, "error: {err}")?;
        writeln!(out, "note: the view was left unchanged")?;
    }
    Ok(())
}

fn zoom<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    let factor = match read_number(
        &mut out,
        format_args!("?factor (below 1 zooms in, blank is {ZOOM_IN}) = "),
    )? {
        Ok(factor) => factor.unwrap_or(ZOOM_IN),
        Err(()) => return Ok(()),
    };
    let mut vp = state.plotter.viewport().clone();
    vp.zoom_centered(factor);
    match state.plotter.set_viewport(vp) {
        Ok(()) => writeln!(out, "view = {:#}", state.plotter.viewport())?,
        Err(err) => writeln!(out, "error: {err}")?,
    }
    Ok(())
}

fn set_tangent<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    let Some((id, f)) = select_function(&mut out, state, "?expression #")? else {
        return Ok(());
    };
    let x0 = match read_number(&mut out, format_args!("?x (blank to hide) = "))? {
        Ok(x0) => x0,
        Err(()) => return Ok(()),
    };
    let params = state
        .plotter
        .with_expression(id, |expr| {
            expr.tangent_at = x0;
            expr.param_values()
        })
        .unwrap_or_default();
    let Some(x0) = x0 else {
        return Ok(());
    };
    match analysis::tangent_line(f.as_ref(), x0, &params) {
        Some(t) => writeln!(
            out,
            "f'({x0}) = {slope:.6}, tangent y = {slope:.6}x + {intercept:.6}",
            slope = t.slope,
            intercept = t.intercept
        )?,
        None => writeln!(out, "the function is not differentiable at {x0}")?,
    }
    Ok(())
}

/// Reads `start..end`, both blank meaning none.
fn read_range<W: Write>(
    mut out: W,
    what: &str,
) -> anyhow::Result<Option<Option<core::ops::Range<Number>>>> {
    let mut ends = [None; 2];
    for (end, name) in ends.iter_mut().zip(["start", "end"]) {
        match read_number(&mut out, format_args!("?{what} {name} = "))? {
            Ok(val) => *end = val,
            Err(()) => return Ok(None),
        }
    }
    match ends {
        [None, None] => Ok(Some(None)),
        [Some(start), Some(end)] if start.is_finite() && end.is_finite() && start < end => {
            Ok(Some(Some(start..end)))
        }
        _ => {
            writeln!(out, "error: {what} needs finite start < end")?;
            Ok(None)
        }
    }
}

fn set_integral<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    let Some((id, f)) = select_function(&mut out, state, "?expression #")? else {
        return Ok(());
    };
    writeln!(out, "note: leave both blank to hide")?;
    let Some(range) = read_range(&mut out, "integral")? else {
        return Ok(());
    };
    let params = state
        .plotter
        .with_expression(id, |expr| {
            expr.integral = range.clone();
            expr.param_values()
        })
        .unwrap_or_default();
    if let Some(range) = range {
        match analysis::definite_integral(f.as_ref(), range.start, range.end, &params) {
            Some(area) => writeln!(out, "integral from {} to {} = {area:.6}", range.start, range.end)?,
            None => writeln!(out, "the integral is undefined over that interval")?,
        }
    }
    Ok(())
}

fn set_param_range<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    let Some(id) = select(&mut out, state, "?expression #")? else {
        return Ok(());
    };
    match state.plotter.expression(id).map(|expr| expr.kind()) {
        Some(Kind::Parametric | Kind::Polar) => {}
        Some(kind) => {
            writeln!(out, "error: a {kind} curve has no t range")?;
            return Ok(());
        }
        None => return Ok(()),
    }
    let sweep = render::default_sweep();
    writeln!(
        out,
        "note: leave both blank to sweep {}..{}",
        sweep.start, sweep.end
    )?;
    let Some(range) = read_range(&mut out, "t")? else {
        return Ok(());
    };
    let _ = state
        .plotter
        .with_expression(id, |expr| expr.param_range = range);
    Ok(())
}

fn print_table<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    let Some((id, f)) = select_function(&mut out, state, "?expression #")? else {
        return Ok(());
    };
    let vp = state.plotter.viewport().clone();
    writeln!(out, "note: leave blank to use the visible x range and a step of 1")?;
    let mut answers = [vp.x.start, vp.x.end, 1.0];
    for (answer, name) in answers.iter_mut().zip(["x start", "x end", "step"]) {
        match read_number(&mut out, format_args!("?{name} (is {cur}) = ", cur = *answer))? {
            Ok(Some(new)) => *answer = new,
            Ok(None) => {}
            Err(()) => return Ok(()),
        }
    }
    let [start, end, step] = answers;
    let params = state
        .plotter
        .expression(id)
        .map(|expr| expr.param_values())
        .unwrap_or_default();
    let rows = analysis::table(f.as_ref(), start..end, step, &params);
    if rows.is_empty() {
        writeln!(out, "no defined values in that range")?;
    }
    writeln!(out, "{:>12}  {:>12}", "x", "f(x)")?;
    for Point { x, y } in rows {
        writeln!(out, "{x:>12.4}  {y:>12.6}")?;
    }
    Ok(())
}

fn intersect<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    let Some((id1, f1)) = select_function(&mut out, state, "?first #")? else {
        return Ok(());
    };
    let Some((id2, f2)) = select_function(&mut out, state, "?second #")? else {
        return Ok(());
    };
    let params = |id: ExprId| {
        state
            .plotter
            .expression(id)
            .map(|expr| expr.param_values())
            .unwrap_or_default()
    };
    let points = analysis::find_intersections(
        f1.as_ref(),
        f2.as_ref(),
        state.plotter.viewport().x.clone(),
        &params(id1),
        &params(id2),
    );
    if points.is_empty() {
        writeln!(out, "no intersections in view")?;
    }
    for p in points {
        writeln!(out, "{p:.4}")?;
    }
    Ok(())
}

fn set_settings<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    let mut settings = *state.plotter.settings();
    writeln!(out, "note: leave blank to skip")?;
    for (name, dst) in [
        ("show grid", &mut settings.show_grid),
        ("show axes", &mut settings.show_axes),
    ] {
        match shell::read_fromstr::<_, bool>(&mut out, format_args!("?{name} (is {dst}) = "), true)? {
            Ok(Some(new)) => *dst = new,
            Ok(None) => {}
            Err(_) => return Ok(()),
        }
    }
    match shell::read_fromstr::<_, Theme>(
        &mut out,
        format_args!("?theme (is {:?}) = ", settings.theme),
        true,
    )? {
        Ok(Some(new)) => settings.theme = new,
        Ok(None) => {}
        Err(_) => return Ok(()),
    }
    match shell::read_fromstr::<_, CoordinateSystem>(
        &mut out,
        format_args!("?coordinates (is {:?}) = ", settings.coordinates),
        true,
    )? {
        Ok(Some(new)) => settings.coordinates = new,
        Ok(None) => {}
        Err(_) => return Ok(()),
    }
    state.plotter.set_settings(settings);
    Ok(())
}

fn print_prog<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    let Some(id) = select(&mut out, state, "?expression #")? else {
        return Ok(());
    };
    let Some(text) = state.plotter.expression(id).map(|expr| expr.text().to_string()) else {
        return Ok(());
    };
    let form = match classify::split(&text) {
        Ok(form) => form,
        Err(err) => {
            writeln!(out, "error: {err}")?;
            return Ok(());
        }
    };
    writeln!(out, "{} curve", form.kind())?;
    for body in form.bodies() {
        match eval::compile(body) {
            Ok(prog) => shell::dump_program(&mut out, &prog, format_args!("program for '{body}'"))?,
            Err(err) => {
                shell::underline(&mut out, &err.loc)?;
                writeln!(out, "parse error: {}", err.typ)?;
            }
        }
    }
    Ok(())
}
