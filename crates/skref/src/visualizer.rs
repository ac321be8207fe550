//! Draw-tick consumers of a level.
//!
//! The world hands its current level to a [`LevelVisualizer`] on every draw
//! tick. Logic and draw ticks never interleave, so a visualizer always sees
//! whole rects.

use std::io::Write;

use crate::level::{Level, PLAYER_KIND};

pub trait LevelVisualizer<const N: usize> {
    fn draw(&mut self, level: &Level<N>);

    /// Called instead of [`draw`](Self::draw) while a level is being built.
    fn draw_loading(&mut self, _id: &str) {}
}

/// Renders a 2D level as a character grid.
///
/// One cell covers `cell` world units on both axes; y grows downward. Cells
/// are filled in ascending draw order, so higher `order` wins.
///
/// | char | entity             |
/// |------|--------------------|
/// | `@`  | the player         |
/// | `#`  | material           |
/// | `.`  | non-material       |
pub struct AsciiVisualizer<W: Write> {
    out: W,
    cell: f64,
    every: u64,
    frames_drawn: u64,
}

impl<W: Write> AsciiVisualizer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            cell: 1.0,
            every: 1,
            frames_drawn: 0,
        }
    }

    pub fn with_cell_size(mut self, cell: f64) -> Self {
        self.cell = cell.max(f64::EPSILON);
        self
    }

    /// Only emit every `n`th frame.
    pub fn every(mut self, n: u64) -> Self {
        self.every = n.max(1);
        self
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn render(&self, level: &Level<2>) -> String {
        let bounds = level.dimensions();
        let columns = self.cells(bounds.size[0]);
        let rows = self.cells(bounds.size[1]);
        let mut grid = vec![vec![' '; columns]; rows];

        let mut entities: Vec<_> = level.entities().map(|(_, e)| e).collect();
        entities.sort_by_key(|e| e.order());
        for entity in entities {
            let glyph = if entity.kind() == PLAYER_KIND {
                '@'
            } else if entity.is_material() {
                '#'
            } else {
                '.'
            };
            let rect = entity.rect();
            let (x0, x1) = self.span(rect.position[0] - bounds.position[0], rect.size[0], columns);
            let (y0, y1) = self.span(rect.position[1] - bounds.position[1], rect.size[1], rows);
            for row in &mut grid[y0..y1] {
                for cell in &mut row[x0..x1] {
                    *cell = glyph;
                }
            }
        }

        let mut frame = String::with_capacity((columns + 1) * rows);
        for row in grid {
            frame.extend(row);
            frame.push('\n');
        }
        frame
    }

    fn cells(&self, extent: f64) -> usize {
        (extent / self.cell).ceil().max(0.0) as usize
    }

    /// Cells covered by `[start, start + size)`, at least one, clipped to
    /// `limit`.
    fn span(&self, start: f64, size: f64, limit: usize) -> (usize, usize) {
        let first = (start / self.cell).floor().max(0.0) as usize;
        let last = ((start + size) / self.cell).ceil().max(0.0) as usize;
        let first = first.min(limit);
        (first, last.max(first + 1).min(limit))
    }
}

impl<W: Write> LevelVisualizer<2> for AsciiVisualizer<W> {
    fn draw(&mut self, level: &Level<2>) {
        self.frames_drawn += 1;
        if (self.frames_drawn - 1) % self.every != 0 {
            return;
        }
        let frame = self.render(level);
        if let Err(e) = write!(self.out, "{}\n{frame}", level.id()) {
            log::warn!("visualizer output failed: {e}");
        }
    }

    fn draw_loading(&mut self, id: &str) {
        if let Err(e) = writeln!(self.out, "loading {id}...") {
            log::warn!("visualizer output failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Entity;
    use crate::geom::Aabb2;

    fn level() -> Level<2> {
        let mut level = Level::new("room", Aabb2::from_xy(0.0, 0.0, 4.0, 2.0));
        level.attach(Entity::builder("wall", Aabb2::from_xy(0.0, 0.0, 4.0, 1.0)).build());
        level.attach(
            Entity::builder("egg", Aabb2::from_xy(3.0, 1.0, 0.5, 0.5))
                .material(false)
                .build(),
        );
        level
    }

    #[test]
    fn renders_material_and_pickups() {
        let vis = AsciiVisualizer::new(Vec::new());
        assert_eq!(vis.render(&level()), "####\n   .\n");
    }

    #[test]
    fn higher_order_draws_on_top() {
        let mut level = level();
        level.attach(
            Entity::builder(PLAYER_KIND, Aabb2::from_xy(1.0, 0.0, 1.0, 1.0))
                .order(1)
                .build(),
        );
        let vis = AsciiVisualizer::new(Vec::new());
        assert_eq!(vis.render(&level), "#@##\n   .\n");
    }

    #[test]
    fn out_of_bounds_entities_are_clipped() {
        let mut level = Level::new("tiny", Aabb2::from_xy(0.0, 0.0, 2.0, 1.0));
        level.attach(Entity::builder("far", Aabb2::from_xy(10.0, 0.0, 1.0, 1.0)).build());
        let vis = AsciiVisualizer::new(Vec::new());
        assert_eq!(vis.render(&level), "  \n");
    }

    #[test]
    fn draw_writes_every_nth_frame() {
        let mut vis = AsciiVisualizer::new(Vec::new()).every(2);
        let level = level();
        for _ in 0..3 {
            vis.draw(&level);
        }
        vis.draw_loading("next");
        assert_eq!(vis.frames_drawn(), 3);
        let out = String::from_utf8(vis.into_inner()).unwrap();
        assert_eq!(out.matches("room\n").count(), 2);
        assert!(out.ends_with("loading next...\n"));
    }
}
