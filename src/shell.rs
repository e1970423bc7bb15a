// SPDX: CC0-1.0

use crate::{
    canvas::{DisplayList, DrawCmd},
    classify::{CompileErr, ExprErr},
    eval::Program,
    expr::Expression,
    lex::SubStr,
};
use anyhow::Context;
use core::fmt;
use std::{
    io::{self, stdin, BufRead, Write},
    sync::Arc,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Help,
    Quit,
    Add,
    Edit,
    Remove,
    List,
    Param,
    Animate,
    Tick,
    Window,
    Zoom,
    Fit,
    Tangent,
    Integral,
    Range,
    Table,
    Intersect,
    Settings,
    Plot,
    PrintProg,
}

impl Command {
    pub const fn exhaustive() -> &'static [Command] {
        &[
            Self::Help,
            Self::Quit,
            Self::Add,
            Self::Edit,
            Self::Remove,
            Self::List,
            Self::Param,
            Self::Animate,
            Self::Tick,
            Self::Window,
            Self::Zoom,
            Self::Fit,
            Self::Tangent,
            Self::Integral,
            Self::Range,
            Self::Table,
            Self::Intersect,
            Self::Settings,
            Self::Plot,
            Self::PrintProg,
        ]
    }

    pub const fn help(&self) -> &'static str {
        match self {
            Self::Help => "display help for each command",
            Self::Quit => "quit the shell",
            Self::Add => "add an expression to the graph",
            Self::Edit => "replace the text of an expression",
            Self::Remove => "remove an expression",
            Self::List => "list expressions with their kind and parameters",
            Self::Param => "set the value, bounds or step of a parameter",
            Self::Animate => "start or stop animating a parameter",
            Self::Tick => "let animations run for some seconds",
            Self::Window => "set viewport ranges and canvas size",
            Self::Zoom => "zoom around the centre of the view",
            Self::Fit => "fit the view to every function",
            Self::Tangent => "show the tangent line of a function at a point",
            Self::Integral => "shade the definite integral of a function",
            Self::Range => "set the t range of a parametric or polar curve",
            Self::Table => "print a table of values of a function",
            Self::Intersect => "find where two functions cross in view",
            Self::Settings => "toggle grid and axes, pick theme and coordinates",
            Self::Plot => "draw the graph and summarize what was drawn",
            Self::PrintProg => "print programs compiled from an expression (for debugging)",
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Help => "help",
            Self::Quit => "quit",
            Self::Add => "add",
            Self::Edit => "edit",
            Self::Remove => "rm",
            Self::List => "list",
            Self::Param => "param",
            Self::Animate => "animate",
            Self::Tick => "tick",
            Self::Window => "window",
            Self::Zoom => "zoom",
            Self::Fit => "fit",
            Self::Tangent => "tangent",
            Self::Integral => "integral",
            Self::Range => "range",
            Self::Table => "table",
            Self::Intersect => "intersect",
            Self::Settings => "settings",
            Self::Plot => "plot",
            Self::PrintProg => "prog",
        }
    }
}

impl core::str::FromStr for Command {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::exhaustive()
            .iter()
            .find(|c| c.name() == s)
            .copied()
            .ok_or(())
    }
}

pub fn input<W: Write>(out: W, prompt: impl fmt::Display) -> anyhow::Result<String> {
    fn inner<W: Write>(mut out: W, prompt: impl fmt::Display) -> io::Result<String> {
        write!(out, "{prompt}")?;
        out.flush()?;
        let mut stdin = stdin().lock();
        let mut s = String::new();
        stdin.read_line(&mut s)?;
        Ok(s.trim().to_string())
    }

    let s = inner(out, prompt).context("read from standard input failed")?;
    Ok(s)
}

/// Prompts until a line is read, parsing it as `T`.
///
/// A parse failure is reported to `out` and handed back so the caller can
/// abandon the command.
pub fn read_fromstr<W: Write, T: core::str::FromStr>(
    mut out: W,
    prompt: impl fmt::Display,
    ignore_empty: bool,
) -> anyhow::Result<Result<Option<T>, <T as core::str::FromStr>::Err>>
where
    <T as core::str::FromStr>::Err: fmt::Display,
{
    let input = Arc::new(input(&mut out, prompt)?);
    if ignore_empty && input.is_empty() {
        return Ok(Ok(None));
    }
    match input.parse::<T>() {
        Ok(new) => Ok(Ok(Some(new))),
        Err(err) => {
            writeln!(out)?;
            underline(&mut out, &SubStr::all(input))?;
            writeln!(out, "parse error: {err}")?;
            Ok(Err(err))
        }
    }
}

pub fn underline<W: Write>(mut out: W, span: &SubStr) -> io::Result<()> {
    writeln!(out, "{}", span.src())?;
    writeln!(
        out,
        "{}{}",
        " ".repeat(span.start()),
        "^".repeat(span.len().max(1))
    )?;
    Ok(())
}

pub fn dump_program<W: Write>(
    mut out: W,
    prog: &Program,
    title: core::fmt::Arguments,
) -> io::Result<()> {
    writeln!(out, "{title}: ")?;
    if prog.ops().len() == 0 {
        writeln!(out, "  (empty)")?;
    }
    for op in prog.ops() {
        writeln!(out, "  {op}")?;
    }
    Ok(())
}

/// Prints why an expression failed, pointing at the offending span when
/// the parser found one.
pub fn report_expr_err<W: Write>(mut out: W, err: &ExprErr) -> io::Result<()> {
    if let ExprErr::Compile(compile) = err {
        if let Some(loc) = compile.loc() {
            underline(&mut out, loc)?;
        }
    }
    writeln!(out, "error: {err}")?;
    if let ExprErr::Compile(CompileErr::UndefinedSymbol { .. }) = err {
        writeln!(
            out,
            "note: parameters are single letters, other names must be built-in functions"
        )?;
    }
    Ok(())
}

/// One line per expression, then one per parameter.
pub fn describe<W: Write>(mut out: W, num: usize, expr: &Expression) -> io::Result<()> {
    let text = if expr.text().is_empty() {
        "(empty)"
    } else {
        expr.text()
    };
    write!(out, "{num}: {text}  [{kind}, {color}]", kind = expr.kind(), color = expr.color)?;
    match expr.error() {
        Some(err) if !expr.text().is_empty() => writeln!(out, "  error: {err}")?,
        _ => writeln!(out)?,
    }
    for param in expr.parameters() {
        writeln!(
            out,
            "     {name} = {value} in {min}..{max} step {step}{anim}",
            name = param.name(),
            value = param.value(),
            min = param.min(),
            max = param.max(),
            step = param.step(),
            anim = if param.is_animating() { " (animating)" } else { "" },
        )?;
    }
    if let Some(x0) = expr.tangent_at {
        writeln!(out, "     tangent at x = {x0}")?;
    }
    if let Some(ref range) = expr.integral {
        writeln!(out, "     integral over {}..{}", range.start, range.end)?;
    }
    if let Some(ref range) = expr.param_range {
        writeln!(out, "     t over {}..{}", range.start, range.end)?;
    }
    Ok(())
}

/// Counts of what a frame drew, followed by every label.
pub fn summarize<W: Write>(mut out: W, list: &DisplayList) -> io::Result<()> {
    let (mut rects, mut paths, mut fills, mut squares, mut dots) = (0, 0, 0, 0, 0);
    for cmd in list.cmds() {
        match cmd {
            DrawCmd::FillRect { .. } | DrawCmd::StrokeRect { .. } => rects += 1,
            DrawCmd::StrokePath { .. } => paths += 1,
            DrawCmd::FillPath { .. } => fills += 1,
            DrawCmd::FillSquares { centers, .. } => squares += centers.len(),
            DrawCmd::FillCircle { .. } => dots += 1,
            DrawCmd::Text { .. } => {}
        }
    }
    writeln!(
        out,
        "drew {len} commands on {w}x{h}: {rects} rects, {paths} strokes, {fills} fills, {squares} cells, {dots} markers",
        len = list.len(),
        w = list.width,
        h = list.height,
    )?;
    for text in list.texts() {
        writeln!(out, "  \"{text}\"")?;
    }
    Ok(())
}

pub fn no_expressions<W: Write>(mut out: W) -> io::Result<()> {
    writeln!(out, "error: no expressions are defined, try \"add\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{cache::CompileCache, classify, expr::PALETTE};

    fn written(f: impl FnOnce(&mut Vec<u8>) -> io::Result<()>) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn command_names_round_trip() {
        for c in Command::exhaustive() {
            assert_eq!(c.name().parse::<Command>(), Ok(*c));
        }
        assert!("remove".parse::<Command>().is_err());
    }

    #[test]
    fn syntax_errors_are_underlined() {
        let err = classify::classify("sin(x").unwrap_err();
        let text = written(|out| report_expr_err(out, &err));
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "sin(x");
        assert!(lines[1].trim_start().starts_with('^'));
        assert!(lines[2].starts_with("error: "));
    }

    #[test]
    fn describe_lists_parameters() {
        let cache = CompileCache::new();
        let mut expr = Expression::with_text("a*x + b", PALETTE[0], &cache);
        expr.tangent_at = Some(1.5);
        let text = written(|out| describe(out, 1, &expr));
        assert!(text.starts_with("1: a*x + b  [function, #3b82f6]"), "{text}");
        assert!(text.contains("a = 1 in -10..10 step 0.1"));
        assert!(text.contains("b = 1"));
        assert!(text.contains("tangent at x = 1.5"));
    }

    #[test]
    fn summary_counts_commands() {
        let mut list = DisplayList::new(10.0, 10.0);
        crate::canvas::Surface::fill_rect(
            &mut list,
            crate::canvas::Rect::new(0.0, 0.0, 10.0, 10.0),
            PALETTE[1],
        );
        let text = written(|out| summarize(out, &list));
        assert!(text.starts_with("drew 1 commands on 10x10: 1 rects, 0 strokes"));
    }
}
