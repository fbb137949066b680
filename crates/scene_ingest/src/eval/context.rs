//! Per-tick evaluation state: the clock and the dirty attribute set.
use std::collections::HashSet;

/// Time plus the attribute paths invalidated since the last sweep.
///
/// Paths are `node.attr` text. Marking a path also covers everything below
/// it, so `pma1.output3D` invalidates `pma1.output3D[0].output3Dx`, and a bare
/// node name invalidates every attribute of that node.
#[derive(Clone, Debug, Default)]
pub struct EvalContext {
    time: f64,
    pending: HashSet<String>,
    pending_nodes: HashSet<String>,
    published: HashSet<String>,
}

impl EvalContext {
    pub fn new(time: f64) -> Self {
        Self {
            time,
            ..Default::default()
        }
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn set_time(&mut self, time: f64) {
        self.time = time;
    }

    /// Marks `path` dirty for the current sweep.
    pub fn mark_dirty(&mut self, path: impl Into<String>) {
        let path = path.into();
        let node = node_part(&path);
        if !self.pending_nodes.contains(node) {
            self.pending_nodes.insert(node.to_owned());
        }
        self.pending.insert(path);
    }

    /// True when `path` or any enclosing path is pending.
    pub fn is_dirty(&self, path: &str) -> bool {
        enclosing_paths(path).any(|p| self.pending.contains(p))
    }

    /// True when any pending path belongs to `node`.
    pub fn touches_node(&self, node: &str) -> bool {
        self.pending_nodes.contains(node)
    }

    pub fn pending(&self) -> impl Iterator<Item = &str> {
        self.pending.iter().map(String::as_str)
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// True when the last completed sweep invalidated `path` or an enclosing path.
    pub fn was_dirtied(&self, path: &str) -> bool {
        enclosing_paths(path).any(|p| self.published.contains(p))
    }

    /// Paths invalidated by the last completed sweep.
    pub fn published(&self) -> impl Iterator<Item = &str> {
        self.published.iter().map(String::as_str)
    }

    /// Moves pending paths into the published set, replacing the previous one.
    pub(crate) fn publish(&mut self) {
        self.published = std::mem::take(&mut self.pending);
        self.pending_nodes.clear();
    }
}

fn node_part(path: &str) -> &str {
    path.split_once('.').map_or(path, |(node, _)| node)
}

/// `path` itself, then every prefix ending at a `.` or `[` boundary.
fn enclosing_paths(path: &str) -> impl Iterator<Item = &str> {
    std::iter::once(path).chain(
        path.char_indices()
            .filter(|(_, c)| *c == '.' || *c == '[')
            .map(move |(i, _)| &path[..i])
            .filter(|p| !p.is_empty()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marking_covers_nested_paths() {
        let mut ctx = EvalContext::new(0.0);
        ctx.mark_dirty("pma1.output3D");
        assert!(ctx.is_dirty("pma1.output3D"));
        assert!(ctx.is_dirty("pma1.output3D[0].output3Dx"));
        assert!(!ctx.is_dirty("pma1.input3D[0]"));
        assert!(ctx.touches_node("pma1"));
        assert!(!ctx.touches_node("pma"));
    }

    #[test]
    fn bare_node_name_covers_all_attributes() {
        let mut ctx = EvalContext::new(0.0);
        ctx.mark_dirty("time1");
        assert!(ctx.is_dirty("time1.outTime"));
        assert!(!ctx.is_dirty("time10.outTime"));
    }

    #[test]
    fn publish_moves_pending_to_published() {
        let mut ctx = EvalContext::new(1.0);
        ctx.mark_dirty("a.tx");
        ctx.publish();
        assert!(!ctx.has_pending());
        assert!(!ctx.is_dirty("a.tx"));
        assert!(!ctx.touches_node("a"));
        assert!(ctx.was_dirtied("a.tx"));

        ctx.publish();
        assert!(!ctx.was_dirtied("a.tx"));
    }
}
