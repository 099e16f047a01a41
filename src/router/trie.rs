//! Segment trie used by the [`Router`](super::Router), one per HTTP method.
//!
//! Each node stands for one `/`-delimited segment. A node whose `pattern` is
//! non-empty terminates exactly one registered route; every other node is an
//! intermediate segment shared by the routes below it.

/// Split a pattern or request path into its segments.
///
/// Empty segments are dropped, so leading, trailing and repeated slashes do not
/// matter. Everything after the first segment starting with `*` is discarded:
/// a trailing wildcard always ends the pattern.
///
/// The same function decomposes registered patterns and incoming paths, which
/// is what makes them comparable segment by segment.
///
/// # Examples
///
/// ```
/// use twig::router::parse_pattern;
///
/// assert_eq!(parse_pattern("/p/:name"), vec!["p", ":name"]);
/// assert_eq!(parse_pattern("//p/*name/ignored/"), vec!["p", "*name"]);
/// assert!(parse_pattern("/").is_empty());
/// ```
pub fn parse_pattern(pattern: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    for item in pattern.split('/').filter(|s| !s.is_empty()) {
        parts.push(item);
        if item.starts_with('*') {
            break;
        }
    }
    parts
}

pub(crate) fn is_wild(part: &str) -> bool {
    part.starts_with(':') || part.starts_with('*')
}

/// A trie node for one path segment.
#[derive(Debug, Default)]
pub struct Node {
    // Full route pattern, e.g. `/p/:lang`; empty unless a route ends here.
    pattern: String,
    // This node's segment, e.g. `:lang`.
    part: String,
    children: Vec<Node>,
    is_wild: bool,
}

impl Node {
    pub(crate) fn root() -> Self {
        Self::default()
    }

    fn segment(part: &str) -> Self {
        Self {
            pattern: String::new(),
            part: part.to_owned(),
            children: Vec::new(),
            is_wild: is_wild(part),
        }
    }

    /// The registered pattern that terminates at this node, e.g. `/hello/:name`.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// The segment this node represents, e.g. `:name`.
    pub fn part(&self) -> &str {
        &self.part
    }

    pub fn is_wild(&self) -> bool {
        self.is_wild
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    // First child an insertion of `part` should descend into. A literal only
    // reuses an identical literal; a wildcard reuses any wildcard.
    fn child_index(&self, part: &str) -> Option<usize> {
        self.children
            .iter()
            .position(|child| child.part == part)
            .or_else(|| {
                if is_wild(part) {
                    self.children.iter().position(|child| child.is_wild)
                } else {
                    None
                }
            })
    }

    /// Insert `pattern`, whose decomposition is `parts`, below this node.
    ///
    /// Inserting a different pattern that lands on an already terminating node
    /// overwrites it; the router checks for that with [`Node::locate`] first.
    pub(crate) fn insert(&mut self, pattern: &str, parts: &[&str], height: usize) {
        if parts.len() == height {
            self.pattern = pattern.to_owned();
            return;
        }

        let part = parts[height];
        let index = match self.child_index(part) {
            Some(index) => index,
            None => {
                self.children.push(Node::segment(part));
                self.children.len() - 1
            }
        };
        self.children[index].insert(pattern, parts, height + 1);
    }

    /// The node [`insert`](Self::insert) would terminate on, if it exists yet.
    pub(crate) fn locate(&self, parts: &[&str], height: usize) -> Option<&Node> {
        if parts.len() == height {
            return Some(self);
        }
        let index = self.child_index(parts[height])?;
        self.children[index].locate(parts, height + 1)
    }

    // First route pattern terminating at or below this node.
    fn any_pattern(&self) -> Option<&str> {
        if !self.pattern.is_empty() {
            return Some(&self.pattern);
        }
        self.children.iter().find_map(Node::any_pattern)
    }

    /// An existing route that inserting `parts` would share a wildcard node
    /// with: a `:param` and a `*wildcard` in the same slot, or any segment
    /// below a `*wildcard`.
    pub(crate) fn wildcard_clash(&self, parts: &[&str], height: usize) -> Option<&str> {
        if parts.len() == height {
            return None;
        }
        if self.part.starts_with('*') {
            return self.any_pattern();
        }

        let part = parts[height];
        let child = &self.children[self.child_index(part)?];
        if child.is_wild && child.part.chars().next() != part.chars().next() {
            return child.any_pattern();
        }
        child.wildcard_clash(parts, height + 1)
    }

    /// Find the route terminus matching the request segments `parts`.
    ///
    /// Literal and wildcard children are both candidates at every level and are
    /// tried in insertion order; a candidate that dead-ends is abandoned and
    /// the next sibling is tried.
    pub(crate) fn search(&self, parts: &[&str], height: usize) -> Option<&Node> {
        if parts.len() == height || self.part.starts_with('*') {
            return (!self.pattern.is_empty()).then_some(self);
        }

        let part = parts[height];
        self.children
            .iter()
            .filter(|child| child.part == part || child.is_wild)
            .find_map(|child| child.search(parts, height + 1))
    }
}
