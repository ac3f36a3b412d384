use std::io::Write;

use anyhow::Result;
use arbor_core::engine::{LevelDirection, OrderDirection};
use serde::Serialize;

use super::{target, Tree};
use crate::args::DirectionArg;
use crate::output;

#[derive(Debug, Serialize)]
pub struct MoveOut<'a> {
    pub id: &'a str,
    pub action: &'a str,
    pub moved: bool,
}

pub fn duplicate(tree: &mut Tree, key: &str) -> Result<()> {
    let id = target(tree, key)?;
    let copy = tree.duplicate(&id)?;
    output::emit(&copy, |out| {
        write!(out, "duplicated as ")?;
        output::category_line(out, 0, &copy)
    })
}

pub fn move_order(tree: &mut Tree, key: &str, direction: DirectionArg) -> Result<()> {
    let id = target(tree, key)?;
    let (dir, action) = match direction {
        DirectionArg::Up => (OrderDirection::Up, "up"),
        DirectionArg::Down => (OrderDirection::Down, "down"),
    };
    let moved = tree.move_order(&id, dir)?;
    report(&MoveOut { id: id.as_str(), action, moved })
}

pub fn indent(tree: &mut Tree, key: &str) -> Result<()> {
    level(tree, key, LevelDirection::Indent)
}

pub fn outdent(tree: &mut Tree, key: &str) -> Result<()> {
    level(tree, key, LevelDirection::Outdent)
}

fn level(tree: &mut Tree, key: &str, direction: LevelDirection) -> Result<()> {
    let id = target(tree, key)?;
    let moved = tree.reparent_level(&id, direction)?;
    report(&MoveOut { id: id.as_str(), action: direction.as_str(), moved })
}

fn report(out: &MoveOut<'_>) -> Result<()> {
    output::emit(out, |w| {
        if out.moved {
            writeln!(w, "{}: {}", out.action, out.id)
        } else {
            writeln!(w, "{}: {} is already at the edge; nothing changed", out.action, out.id)
        }
    })
}
