use crate::model::Rect;
use serde::Serialize;

/// Index of an anchor inside its graph's arena.
pub type AnchorId = usize;

#[derive(Debug, Clone)]
struct Anchor {
    x: u32,
    y: u32,
    alive: bool,
    incoming: Vec<AnchorId>,
    outgoing: Vec<AnchorId>,
}

impl Anchor {
    fn new(x: u32, y: u32) -> Self {
        Self {
            x,
            y,
            alive: true,
            incoming: Vec::new(),
            outgoing: Vec::new(),
        }
    }
}

/// A live anchor as seen from outside the graph, with sorted edge lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnchorSnapshot {
    pub id: AnchorId,
    pub x: u32,
    pub y: u32,
    pub incoming: Vec<AnchorId>,
    pub outgoing: Vec<AnchorId>,
}

/// Free-space bookkeeping for the greedy packer.
///
/// Anchors live in an arena and are never removed, only marked dead, so an
/// `AnchorId` stays valid for the lifetime of the graph. Occupying an anchor
/// records the placed rectangle, spawns the guillotine split points to the
/// right of and below it, and prunes every anchor the rectangle now covers.
#[derive(Debug, Clone)]
pub struct AnchorGraph {
    anchors: Vec<Anchor>,
    placed: Vec<Rect>,
}

impl Default for AnchorGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl AnchorGraph {
    /// Creates a graph seeded with the origin anchor.
    pub fn new() -> Self {
        Self {
            anchors: vec![Anchor::new(0, 0)],
            placed: Vec::new(),
        }
    }

    /// Live anchors as `(id, x, y)` in creation order.
    pub fn live(&self) -> impl Iterator<Item = (AnchorId, u32, u32)> + '_ {
        self.anchors
            .iter()
            .enumerate()
            .filter(|(_, a)| a.alive)
            .map(|(i, a)| (i, a.x, a.y))
    }

    pub fn live_count(&self) -> usize {
        self.anchors.iter().filter(|a| a.alive).count()
    }

    pub fn placed(&self) -> &[Rect] {
        &self.placed
    }

    /// True if `rect` shares no area with any placed rectangle.
    pub fn is_free(&self, rect: &Rect) -> bool {
        !self.placed.iter().any(|p| p.intersects(rect))
    }

    fn is_covered(&self, x: u32, y: u32) -> bool {
        self.placed.iter().any(|p| p.contains_point(x, y))
    }

    fn find_live(&self, x: u32, y: u32) -> Option<AnchorId> {
        self.anchors
            .iter()
            .position(|a| a.alive && a.x == x && a.y == y)
    }

    /// Adds a parentless anchor (used to grow the frontier). Returns the
    /// existing anchor if one already sits at the point, `None` if the point
    /// is inside a placed rectangle.
    pub fn add_anchor(&mut self, x: u32, y: u32) -> Option<AnchorId> {
        if self.is_covered(x, y) {
            return None;
        }
        if let Some(id) = self.find_live(x, y) {
            return Some(id);
        }
        self.anchors.push(Anchor::new(x, y));
        Some(self.anchors.len() - 1)
    }

    /// Places `rect` at anchor `id`. The rectangle's top-left must be the
    /// anchor's point.
    pub fn occupy(&mut self, id: AnchorId, rect: Rect) {
        debug_assert!(self.anchors[id].alive);
        debug_assert_eq!((self.anchors[id].x, self.anchors[id].y), (rect.x, rect.y));

        // spent anchors keep their outgoing edges to the split points
        self.anchors[id].alive = false;
        self.placed.push(rect);

        for (cx, cy) in [(rect.right(), rect.y), (rect.x, rect.bottom())] {
            if self.is_covered(cx, cy) {
                continue;
            }
            let child = match self.find_live(cx, cy) {
                Some(existing) => existing,
                None => {
                    self.anchors.push(Anchor::new(cx, cy));
                    self.anchors.len() - 1
                }
            };
            self.link(id, child);
        }

        let covered: Vec<AnchorId> = self
            .anchors
            .iter()
            .enumerate()
            .filter(|(_, a)| a.alive && rect.contains_point(a.x, a.y))
            .map(|(i, _)| i)
            .collect();
        for k in covered {
            self.prune(k);
        }
    }

    fn link(&mut self, from: AnchorId, to: AnchorId) {
        if from == to || self.anchors[from].outgoing.contains(&to) {
            return;
        }
        self.anchors[from].outgoing.push(to);
        self.anchors[to].incoming.push(from);
    }

    fn prune(&mut self, k: AnchorId) {
        let incoming = std::mem::take(&mut self.anchors[k].incoming);
        let outgoing = std::mem::take(&mut self.anchors[k].outgoing);
        for p in incoming {
            self.anchors[p].outgoing.retain(|&c| c != k);
        }
        for c in outgoing {
            self.anchors[c].incoming.retain(|&p| p != k);
        }
        self.anchors[k].alive = false;
    }

    /// Live anchors ordered by id, each with sorted edge lists.
    pub fn snapshot(&self) -> Vec<AnchorSnapshot> {
        self.anchors
            .iter()
            .enumerate()
            .filter(|(_, a)| a.alive)
            .map(|(id, a)| {
                let mut incoming = a.incoming.clone();
                let mut outgoing = a.outgoing.clone();
                incoming.sort_unstable();
                outgoing.sort_unstable();
                AnchorSnapshot {
                    id,
                    x: a.x,
                    y: a.y,
                    incoming,
                    outgoing,
                }
            })
            .collect()
    }
}
