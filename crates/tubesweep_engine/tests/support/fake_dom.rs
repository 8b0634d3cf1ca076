//! Scripted in-memory document implementing the engine's DOM traits.
//!
//! Selectors understand tags, `#id`, `.class`, `[attr]`, `[attr='v']`,
//! descendant chains and comma-separated alternatives, which covers every
//! selector the engine issues.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tubesweep_core::{BoundingBox, MENU_REMOVE_FROM_HISTORY};
use tubesweep_engine::{DomElement, DomError, DomPage, ElementHandle};

const MENU_ITEM_TAG: &str = "ytd-menu-service-item-renderer";
/// Wheel distance below which a scroll only nudges the viewport.
const FEED_SCROLL_MIN: f64 = 200.0;

#[derive(Debug, Clone)]
pub struct NodeSpec {
    tag: String,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<(String, String)>,
    text: String,
    children: Vec<NodeSpec>,
    visible: bool,
    rect: BoundingBox,
    menu: Option<MenuSpec>,
}

#[derive(Debug, Clone)]
struct MenuSpec {
    key: String,
    labels: Vec<String>,
}

pub fn el(tag: &str) -> NodeSpec {
    NodeSpec {
        tag: tag.to_string(),
        id: None,
        classes: Vec::new(),
        attrs: Vec::new(),
        text: String::new(),
        children: Vec::new(),
        visible: true,
        rect: BoundingBox {
            x: 0.0,
            y: 0.0,
            width: 300.0,
            height: 40.0,
        },
        menu: None,
    }
}

impl NodeSpec {
    pub fn id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn class(mut self, class: &str) -> Self {
        self.classes.push(class.to_string());
        self
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.push((name.to_string(), value.to_string()));
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn child(mut self, child: NodeSpec) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = NodeSpec>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Clicking this node opens a popup menu with `labels`; the remove
    /// entry records `key` as acted upon.
    pub fn menu(mut self, key: &str, labels: &[&str]) -> Self {
        self.menu = Some(MenuSpec {
            key: key.to_string(),
            labels: labels.iter().map(|label| label.to_string()).collect(),
        });
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Events {
    pub navigations: Vec<String>,
    pub escapes: usize,
    pub scrolls: Vec<(f64, u32)>,
    pub menu_opens: usize,
    pub point_clicks: Vec<(f64, f64)>,
    pub acted: Vec<String>,
    pub removed: usize,
}

struct Node {
    tag: String,
    id: Option<String>,
    classes: Vec<String>,
    attrs: HashMap<String, String>,
    text: String,
    children: Vec<usize>,
    parent: Option<usize>,
    attached: bool,
    visible: bool,
    rect: BoundingBox,
    menu: Option<MenuSpec>,
}

struct Tree {
    nodes: Vec<Node>,
    root: usize,
    popup: usize,
    open_menu: Option<usize>,
    menu_lag: u32,
    pending_reads: u32,
    batches: VecDeque<(String, Vec<NodeSpec>)>,
    broken: bool,
    events: Events,
}

#[derive(Clone)]
pub struct FakeDom {
    tree: Arc<Mutex<Tree>>,
}

impl FakeDom {
    /// Document whose body holds `body`, followed by a hidden popup menu.
    pub fn new(body: Vec<NodeSpec>) -> Self {
        let mut tree = Tree {
            nodes: Vec::new(),
            root: 0,
            popup: 0,
            open_menu: None,
            menu_lag: 0,
            pending_reads: 0,
            batches: VecDeque::new(),
            broken: false,
            events: Events::default(),
        };
        tree.root = tree.insert(el("body"), None);
        for spec in body {
            tree.insert(spec, Some(tree.root));
        }
        let container = tree.insert(el("ytd-popup-container"), Some(tree.root));
        tree.popup = tree.insert(el("tp-yt-iron-dropdown").id("contentWrapper").hidden(), Some(container));
        Self {
            tree: Arc::new(Mutex::new(tree)),
        }
    }

    /// Appends `batch` under the first match of `parent` on the next feed scroll.
    pub fn grow_on_scroll(&self, parent: &str, batch: Vec<NodeSpec>) {
        self.lock().batches.push_back((parent.to_string(), batch));
    }

    /// Number of reads of an opened popup that still come back empty.
    pub fn set_menu_lag(&self, reads: u32) {
        self.lock().menu_lag = reads;
    }

    /// Every later operation fails as if the browser went away.
    pub fn break_session(&self) {
        self.lock().broken = true;
    }

    pub fn events(&self) -> Events {
        self.lock().events.clone()
    }

    pub fn count(&self, selector: &str) -> usize {
        let tree = self.lock();
        tree.select(tree.root, selector).len()
    }

    pub fn element(&self, selector: &str) -> Option<ElementHandle> {
        let found = {
            let tree = self.lock();
            tree.select(tree.root, selector).first().copied()
        };
        found.map(|node| self.handle(node))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Tree> {
        self.tree.lock().unwrap()
    }

    fn handle(&self, node: usize) -> ElementHandle {
        Box::new(FakeElement {
            tree: self.tree.clone(),
            node,
        })
    }

    fn handles(&self, nodes: Vec<usize>) -> Vec<ElementHandle> {
        nodes.into_iter().map(|node| self.handle(node)).collect()
    }

    fn check(&self) -> Result<(), DomError> {
        if self.lock().broken {
            return Err(DomError::Session("connection closed".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl DomPage for FakeDom {
    async fn navigate(&self, url: &str) -> Result<(), DomError> {
        self.check()?;
        self.lock().events.navigations.push(url.to_string());
        Ok(())
    }

    async fn query(&self, selector: &str) -> Result<Option<ElementHandle>, DomError> {
        Ok(self.query_all(selector).await?.into_iter().next())
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<ElementHandle>, DomError> {
        self.check()?;
        let nodes = {
            let tree = self.lock();
            tree.select(tree.root, selector)
        };
        Ok(self.handles(nodes))
    }

    async fn wait_load(&self) -> Result<(), DomError> {
        self.check()
    }

    async fn wait_stable(&self) -> Result<(), DomError> {
        self.check()
    }

    async fn press_escape(&self) -> Result<(), DomError> {
        self.check()?;
        let mut tree = self.lock();
        tree.events.escapes += 1;
        tree.close_menu();
        Ok(())
    }

    async fn click_at(&self, x: f64, y: f64) -> Result<(), DomError> {
        self.check()?;
        let mut guard = self.lock();
        let tree = &mut *guard;
        tree.events.point_clicks.push((x, y));
        let popup = tree.popup;
        let hit = tree
            .select(popup, MENU_ITEM_TAG)
            .into_iter()
            .find(|&item| tree.is_visible(item) && contains(&tree.nodes[item].rect, x, y));
        let (Some(item), Some(trigger)) = (hit, tree.open_menu) else {
            return Ok(());
        };
        let label = tree.nodes[item].text.clone();
        if label == MENU_REMOVE_FROM_HISTORY {
            if let Some(menu) = tree.nodes[trigger].menu.as_mut() {
                menu.labels.retain(|existing| existing != &label);
                let key = menu.key.clone();
                tree.events.acted.push(key);
            }
        }
        tree.close_menu();
        Ok(())
    }

    async fn scroll_by(&self, _dx: f64, dy: f64, steps: u32) -> Result<(), DomError> {
        self.check()?;
        let mut tree = self.lock();
        tree.events.scrolls.push((dy, steps));
        if dy * f64::from(steps) < FEED_SCROLL_MIN {
            return Ok(());
        }
        if let Some((parent, batch)) = tree.batches.pop_front() {
            let target = tree.select(tree.root, &parent).first().copied().unwrap_or(tree.root);
            for spec in batch {
                tree.insert(spec, Some(target));
            }
        }
        Ok(())
    }
}

pub struct FakeElement {
    tree: Arc<Mutex<Tree>>,
    node: usize,
}

impl FakeElement {
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Tree>, DomError> {
        let tree = self.tree.lock().unwrap();
        if tree.broken {
            return Err(DomError::Session("connection closed".into()));
        }
        if !tree.nodes[self.node].attached {
            return Err(DomError::Stale(format!("n{}", self.node)));
        }
        Ok(tree)
    }

    fn handles(&self, nodes: Vec<usize>) -> Vec<ElementHandle> {
        nodes
            .into_iter()
            .map(|node| {
                Box::new(FakeElement {
                    tree: self.tree.clone(),
                    node,
                }) as ElementHandle
            })
            .collect()
    }
}

#[async_trait]
impl DomElement for FakeElement {
    fn id(&self) -> String {
        format!("n{}", self.node)
    }

    async fn query(&self, selector: &str) -> Result<Option<ElementHandle>, DomError> {
        Ok(self.query_all(selector).await?.into_iter().next())
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<ElementHandle>, DomError> {
        let nodes = {
            let mut tree = self.lock()?;
            if self.node == tree.popup && tree.pending_reads > 0 {
                tree.pending_reads -= 1;
                Vec::new()
            } else {
                tree.select(self.node, selector)
            }
        };
        Ok(self.handles(nodes))
    }

    async fn text(&self) -> Result<String, DomError> {
        let tree = self.lock()?;
        Ok(tree.text(self.node))
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>, DomError> {
        let tree = self.lock()?;
        Ok(tree.attribute(self.node, name))
    }

    async fn html(&self) -> Result<String, DomError> {
        let tree = self.lock()?;
        Ok(tree.html(self.node))
    }

    async fn is_visible(&self) -> Result<bool, DomError> {
        let tree = self.lock()?;
        Ok(tree.is_visible(self.node))
    }

    async fn bounding_box(&self) -> Result<Option<BoundingBox>, DomError> {
        let tree = self.lock()?;
        Ok(tree.is_visible(self.node).then(|| tree.nodes[self.node].rect))
    }

    async fn click(&self) -> Result<(), DomError> {
        let mut tree = self.lock()?;
        if !tree.is_visible(self.node) {
            return Err(DomError::NotVisible(format!("n{}", self.node)));
        }
        if tree.nodes[self.node].menu.is_some() {
            tree.open_menu(self.node);
        }
        Ok(())
    }

    async fn remove(&self) -> Result<(), DomError> {
        let mut tree = self.lock()?;
        tree.detach(self.node);
        tree.events.removed += 1;
        Ok(())
    }
}

impl Tree {
    fn insert(&mut self, spec: NodeSpec, parent: Option<usize>) -> usize {
        let index = self.nodes.len();
        self.nodes.push(Node {
            tag: spec.tag,
            id: spec.id,
            classes: spec.classes,
            attrs: spec.attrs.into_iter().collect(),
            text: spec.text,
            children: Vec::new(),
            parent,
            attached: true,
            visible: spec.visible,
            rect: spec.rect,
            menu: spec.menu,
        });
        if let Some(parent) = parent {
            self.nodes[parent].children.push(index);
        }
        for child in spec.children {
            self.insert(child, Some(index));
        }
        index
    }

    fn detach(&mut self, node: usize) {
        if let Some(parent) = self.nodes[node].parent {
            self.nodes[parent].children.retain(|&child| child != node);
        }
        self.nodes[node].attached = false;
    }

    fn open_menu(&mut self, trigger: usize) {
        self.close_menu();
        let labels = self.nodes[trigger]
            .menu
            .as_ref()
            .map(|menu| menu.labels.clone())
            .unwrap_or_default();
        for (row, label) in labels.iter().enumerate() {
            let mut item = el(MENU_ITEM_TAG).text(label);
            item.rect = BoundingBox {
                x: 600.0,
                y: 100.0 + 40.0 * row as f64,
                width: 220.0,
                height: 36.0,
            };
            self.insert(item, Some(self.popup));
        }
        let popup = self.popup;
        self.nodes[popup].visible = true;
        self.open_menu = Some(trigger);
        self.pending_reads = self.menu_lag;
        self.events.menu_opens += 1;
    }

    fn close_menu(&mut self) {
        let popup = self.popup;
        for child in std::mem::take(&mut self.nodes[popup].children) {
            self.nodes[child].attached = false;
        }
        self.nodes[popup].visible = false;
        self.open_menu = None;
    }

    fn is_visible(&self, node: usize) -> bool {
        let mut current = Some(node);
        while let Some(index) = current {
            if !self.nodes[index].visible {
                return false;
            }
            current = self.nodes[index].parent;
        }
        true
    }

    fn text(&self, node: usize) -> String {
        let mut parts = Vec::new();
        self.collect_text(node, &mut parts);
        parts.join(" ")
    }

    fn collect_text(&self, node: usize, parts: &mut Vec<String>) {
        let own = self.nodes[node].text.trim();
        if !own.is_empty() {
            parts.push(own.to_string());
        }
        for &child in &self.nodes[node].children {
            self.collect_text(child, parts);
        }
    }

    fn attribute(&self, node: usize, name: &str) -> Option<String> {
        let node = &self.nodes[node];
        match name {
            "id" => node.id.clone(),
            "class" if !node.classes.is_empty() => Some(node.classes.join(" ")),
            _ => node.attrs.get(name).cloned(),
        }
    }

    fn html(&self, node: usize) -> String {
        let current = &self.nodes[node];
        let mut open = current.tag.clone();
        if let Some(id) = &current.id {
            open.push_str(&format!(" id=\"{id}\""));
        }
        if !current.classes.is_empty() {
            open.push_str(&format!(" class=\"{}\"", current.classes.join(" ")));
        }
        let inner: String = current
            .children
            .iter()
            .map(|&child| self.html(child))
            .collect();
        format!("<{open}>{}{inner}</{}>", current.text, current.tag)
    }

    /// Attached descendants of `scope` matching `selector`, in document order.
    fn select(&self, scope: usize, selector: &str) -> Vec<usize> {
        let alternatives: Vec<Vec<Compound>> = selector
            .split(',')
            .map(|alternative| alternative.split_whitespace().map(Compound::parse).collect())
            .collect();
        let mut found = Vec::new();
        self.walk(scope, &mut |node| {
            if alternatives.iter().any(|chain| self.matches_chain(node, chain)) {
                found.push(node);
            }
        });
        found
    }

    fn walk(&self, node: usize, visit: &mut dyn FnMut(usize)) {
        for &child in &self.nodes[node].children {
            visit(child);
            self.walk(child, visit);
        }
    }

    fn matches_chain(&self, node: usize, chain: &[Compound]) -> bool {
        let Some((last, ancestors)) = chain.split_last() else {
            return false;
        };
        if !last.matches(&self.nodes[node]) {
            return false;
        }
        let mut remaining = ancestors.iter().rev().peekable();
        let mut current = self.nodes[node].parent;
        while let (Some(wanted), Some(index)) = (remaining.peek(), current) {
            if wanted.matches(&self.nodes[index]) {
                remaining.next();
            }
            current = self.nodes[index].parent;
        }
        remaining.peek().is_none()
    }
}

/// One compound selector such as `a#id.class[role='text']`.
#[derive(Debug, Default)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<(String, Option<String>)>,
}

impl Compound {
    fn parse(raw: &str) -> Self {
        let mut compound = Compound::default();
        let mut rest = raw;
        let tag_end = rest.find(['#', '.', '[']).unwrap_or(rest.len());
        if tag_end > 0 {
            compound.tag = Some(rest[..tag_end].to_string());
        }
        rest = &rest[tag_end..];
        while !rest.is_empty() {
            let marker = rest.as_bytes()[0];
            if marker == b'[' {
                let close = rest.find(']').unwrap_or(rest.len() - 1);
                let body = &rest[1..close];
                let attr = match body.split_once('=') {
                    Some((name, value)) => (
                        name.to_string(),
                        Some(value.trim_matches(|c| c == '\'' || c == '"').to_string()),
                    ),
                    None => (body.to_string(), None),
                };
                compound.attrs.push(attr);
                rest = &rest[close + 1..];
                continue;
            }
            let body = &rest[1..];
            let end = body.find(['#', '.', '[']).unwrap_or(body.len());
            let name = body[..end].to_string();
            if marker == b'#' {
                compound.id = Some(name);
            } else {
                compound.classes.push(name);
            }
            rest = &body[end..];
        }
        compound
    }

    fn matches(&self, node: &Node) -> bool {
        if self.tag.as_deref().is_some_and(|tag| tag != node.tag) {
            return false;
        }
        if self.id.is_some() && self.id != node.id {
            return false;
        }
        if !self.classes.iter().all(|class| node.classes.contains(class)) {
            return false;
        }
        self.attrs.iter().all(|(name, value)| match (node.attrs.get(name), value) {
            (Some(actual), Some(wanted)) => actual == wanted,
            (Some(_), None) => true,
            (None, _) => false,
        })
    }
}

fn contains(rect: &BoundingBox, x: f64, y: f64) -> bool {
    x > rect.x && x < rect.x + rect.width && y > rect.y && y < rect.y + rect.height
}
