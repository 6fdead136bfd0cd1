use super::anchor::{AnchorGraph, AnchorId};
use crate::error::{AtlasError, Result};
use crate::model::{Module, Placement, Rect};
use tracing::{debug, trace};

/// Greedy single-page packer over an [`AnchorGraph`].
///
/// Every module is dropped on the live anchor that grows the bounding box the
/// least. Candidates are ranked by `(max(new_w, new_h), added_h, added_w, y, x)`
/// so the canvas stays close to square. When no anchor admits a module the
/// frontier grows along the shorter side of the current bounds.
pub struct GreedyPacker {
    graph: AnchorGraph,
    max_extent: u32,
    width: u32,
    height: u32,
}

type Rank = (u32, u32, u32, u32, u32);

impl GreedyPacker {
    /// `max_extent` bounds both sides of the padded placement area.
    pub fn new(max_extent: u32) -> Self {
        Self {
            graph: AnchorGraph::new(),
            max_extent,
            width: 0,
            height: 0,
        }
    }

    pub fn graph(&self) -> &AnchorGraph {
        &self.graph
    }

    /// Running bounds of the placed padded rectangles.
    pub fn bounds(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn rank(&self, x: u32, y: u32, w: u32, h: u32) -> Option<Rank> {
        let right = x.checked_add(w)?;
        let bottom = y.checked_add(h)?;
        if right > self.max_extent || bottom > self.max_extent {
            return None;
        }
        if !self.graph.is_free(&Rect::new(x, y, w, h)) {
            return None;
        }
        let new_w = self.width.max(right);
        let new_h = self.height.max(bottom);
        Some((
            new_w.max(new_h),
            new_h - self.height,
            new_w - self.width,
            y,
            x,
        ))
    }

    fn best_anchor(&self, w: u32, h: u32) -> Option<(AnchorId, u32, u32)> {
        self.graph
            .live()
            .filter_map(|(id, x, y)| self.rank(x, y, w, h).map(|r| (r, id, x, y)))
            .min_by_key(|&(r, ..)| r)
            .map(|(_, id, x, y)| (id, x, y))
    }

    fn grow_frontier(&mut self, w: u32, h: u32) -> Option<(AnchorId, u32, u32)> {
        let right = (self.width, 0);
        let down = (0, self.height);
        let order = if self.width <= self.height {
            [right, down]
        } else {
            [down, right]
        };
        for (x, y) in order {
            if self.rank(x, y, w, h).is_none() {
                continue;
            }
            if let Some(id) = self.graph.add_anchor(x, y) {
                trace!(x, y, "frontier anchor");
                return Some((id, x, y));
            }
        }
        None
    }

    /// Places one module, writing its coordinates. Returns `false` when the
    /// module cannot be placed within `max_extent`.
    pub fn place(&mut self, module: &mut Module) -> bool {
        let (w, h) = (module.padded_width(), module.padded_height());
        let chosen = match self.best_anchor(w, h) {
            Some(c) => Some(c),
            None => self.grow_frontier(w, h),
        };
        let Some((id, x, y)) = chosen else {
            return false;
        };
        self.graph.occupy(id, Rect::new(x, y, w, h));
        module.x = x;
        module.y = y;
        self.width = self.width.max(x + w);
        self.height = self.height.max(y + h);
        true
    }
}

/// Packs `modules` into one placement. Modules are stable-sorted by padded
/// area, largest first; the returned placement lists them in that order.
pub fn pack_modules(mut modules: Vec<Module>, max_extent: u32) -> Result<Placement> {
    if modules.is_empty() {
        return Err(AtlasError::Empty);
    }
    for m in &modules {
        if m.padded_width() > max_extent || m.padded_height() > max_extent {
            return Err(AtlasError::PackingImpossible {
                key: m.key.clone(),
                width: m.padded_width(),
                height: m.padded_height(),
                max: max_extent,
            });
        }
    }
    modules.sort_by(|a, b| b.padded_area().cmp(&a.padded_area()));

    let total = modules.len();
    let mut packer = GreedyPacker::new(max_extent);
    for (placed, m) in modules.iter_mut().enumerate() {
        if !packer.place(m) {
            return Err(AtlasError::OutOfSpace {
                placed,
                total,
                max: max_extent,
            });
        }
    }
    let (width, height) = packer.bounds();
    debug!(
        width,
        height,
        modules = total,
        anchors = packer.graph().live_count(),
        "greedy packing finished"
    );
    Ok(Placement {
        width,
        height,
        modules,
    })
}
