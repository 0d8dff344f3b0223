//! In-memory workbench used by the integration tests
//!
//! Renders side bar sections as virtualized lists (only `window` rows of the
//! flattened tree are materialized at a time), plus an Output panel with a
//! channel combo. Node ids encode what they point at and are recomputed on
//! every query, so they go stale exactly the way a live UI's do.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use vstester_common::{AutomationHandle, Error, Key, Locator, Node, Result, SessionConfig};
use vstester_e2e::Application;

#[derive(Debug, Clone)]
pub struct Entry {
    pub label: String,
    pub children: Option<Vec<Entry>>,
    pub expanded: bool,
}

pub fn leaf(label: &str) -> Entry {
    Entry {
        label: label.to_string(),
        children: None,
        expanded: false,
    }
}

pub fn folder(label: &str, children: Vec<Entry>) -> Entry {
    Entry {
        label: label.to_string(),
        children: Some(children),
        expanded: false,
    }
}

impl Entry {
    pub fn expanded(mut self) -> Self {
        self.expanded = true;
        self
    }
}

#[derive(Debug, Clone)]
pub struct FakeSection {
    pub title: String,
    pub header_hidden: bool,
    pub expanded: bool,
    pub actions: Vec<String>,
    pub entries: Vec<Entry>,
    pub window: usize,
    pub offset: usize,
    pub page_forwards: usize,
}

impl FakeSection {
    pub fn new(title: &str, entries: Vec<Entry>) -> Self {
        Self {
            title: title.to_string(),
            header_hidden: false,
            expanded: true,
            actions: Vec::new(),
            entries,
            window: 10,
            offset: 0,
            page_forwards: 0,
        }
    }

    pub fn window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    pub fn hidden_header(mut self) -> Self {
        self.header_hidden = true;
        self
    }

    pub fn collapsed(mut self) -> Self {
        self.expanded = false;
        self
    }

    pub fn actions(mut self, actions: &[&str]) -> Self {
        self.actions = actions.iter().map(|a| a.to_string()).collect();
        self
    }

    /// (path into `entries`, level) for every row of the expanded tree.
    fn flatten(&self) -> Vec<(Vec<usize>, u32)> {
        fn walk(entries: &[Entry], prefix: &mut Vec<usize>, level: u32, out: &mut Vec<(Vec<usize>, u32)>) {
            for (i, entry) in entries.iter().enumerate() {
                prefix.push(i);
                out.push((prefix.clone(), level));
                if entry.expanded {
                    if let Some(children) = &entry.children {
                        walk(children, prefix, level + 1, out);
                    }
                }
                prefix.pop();
            }
        }
        let mut out = Vec::new();
        walk(&self.entries, &mut Vec::new(), 1, &mut out);
        out
    }

    fn entry(&self, path: &[usize]) -> &Entry {
        let mut entry = &self.entries[path[0]];
        for &i in &path[1..] {
            entry = &entry.children.as_ref().expect("path through leaf")[i];
        }
        entry
    }

    fn entry_mut(&mut self, path: &[usize]) -> &mut Entry {
        let mut entry = &mut self.entries[path[0]];
        for &i in &path[1..] {
            entry = &mut entry.children.as_mut().expect("path through leaf")[i];
        }
        entry
    }

    fn window_range(&self) -> std::ops::Range<usize> {
        if !self.expanded {
            return 0..0;
        }
        let len = self.flatten().len();
        let start = self.offset.min(len);
        start..(start + self.window).min(len)
    }

    fn clamp_offset(&mut self) {
        let len = self.flatten().len();
        self.offset = self.offset.min(len.saturating_sub(self.window));
    }
}

#[derive(Debug, Clone)]
pub struct Channel {
    pub name: String,
    pub disabled: bool,
    pub text: String,
}

#[derive(Default)]
struct State {
    ready_at: Option<Instant>,
    sections: Vec<FakeSection>,
    channels: Vec<Channel>,
    selected_channel: usize,
    menu_open: bool,
    clipboard: String,
    clicks: Vec<String>,
}

#[derive(Default)]
pub struct FakeWorkbench {
    state: Mutex<State>,
}

impl FakeWorkbench {
    pub fn new(sections: Vec<FakeSection>) -> Arc<Self> {
        let workbench = Self::default();
        {
            let mut state = workbench.state.lock();
            state.sections = sections;
            state.ready_at = Some(Instant::now());
        }
        Arc::new(workbench)
    }

    pub fn with_channels(self: Arc<Self>, channels: Vec<Channel>) -> Arc<Self> {
        self.state.lock().channels = channels;
        self
    }

    /// The ready marker appears `delay` from now; `None` means never.
    pub fn ready_after(&self, delay: Option<Duration>) {
        self.state.lock().ready_at = delay.map(|d| Instant::now() + d);
    }

    pub fn page_forwards(&self, title: &str) -> usize {
        self.section(title, |s| s.page_forwards)
    }

    pub fn scroll_offset(&self, title: &str) -> usize {
        self.section(title, |s| s.offset)
    }

    pub fn set_scroll_offset(&self, title: &str, offset: usize) {
        let mut state = self.state.lock();
        let section = state.sections.iter_mut().find(|s| s.title == title).unwrap();
        section.offset = offset;
        section.clamp_offset();
    }

    pub fn set_expanded(&self, title: &str, path: &[usize], expanded: bool) {
        let mut state = self.state.lock();
        let section = state.sections.iter_mut().find(|s| s.title == title).unwrap();
        section.entry_mut(path).expanded = expanded;
    }

    pub fn is_entry_expanded(&self, title: &str, path: &[usize]) -> bool {
        self.section(title, |s| s.entry(path).expanded)
    }

    pub fn section_expanded(&self, title: &str) -> bool {
        self.section(title, |s| s.expanded)
    }

    pub fn clicks(&self) -> Vec<String> {
        self.state.lock().clicks.clone()
    }

    pub fn selected_channel(&self) -> String {
        let state = self.state.lock();
        state.channels[state.selected_channel].name.clone()
    }

    pub fn open_menu(&self) {
        self.state.lock().menu_open = true;
    }

    pub fn menu_open(&self) -> bool {
        self.state.lock().menu_open
    }

    fn section<T>(&self, title: &str, f: impl FnOnce(&FakeSection) -> T) -> T {
        let state = self.state.lock();
        f(state.sections.iter().find(|s| s.title == title).unwrap())
    }
}

fn node(id: String) -> Node {
    Node::new(id)
}

/// Split "kind:section:index" style ids.
fn parts(node: &Node) -> Vec<&str> {
    node.id().splitn(3, ':').collect()
}

impl State {
    fn is_ready(&self) -> bool {
        self.ready_at.map(|at| Instant::now() >= at).unwrap_or(false)
    }

    fn section_idx(&self, title: &str) -> Option<usize> {
        self.sections.iter().position(|s| s.title == title)
    }

    fn find(&self, scope: Option<&Node>, locator: &Locator) -> Vec<Node> {
        let Some(scope) = scope else {
            return match locator {
                Locator::Class { value } if value == "split-view-view" => self
                    .sections
                    .iter()
                    .map(|s| node(format!("view:{}", s.title)))
                    .collect(),
                Locator::Class { value } if value == "monaco-workbench" && self.is_ready() => {
                    vec![node("workbench".into())]
                }
                Locator::Attribute { name, value } if name == "id" && value == "workbench.panel.output" => {
                    vec![node("output".into())]
                }
                _ => vec![],
            };
        };

        let p = parts(scope);
        match (p.as_slice(), locator) {
            (["view", title], Locator::Tag { value }) if value == "h3" => vec![node(format!("h3:{}", title))],
            (["view", title], Locator::Class { value }) if value == "panel-header" => {
                vec![node(format!("header:{}", title))]
            }
            (["view", title], Locator::Class { value }) if value == "monaco-list" => {
                vec![node(format!("list:{}", title))]
            }
            (["header", title], Locator::Class { value }) if value == "actions" => {
                vec![node(format!("actions:{}", title))]
            }
            (["actions", title], Locator::Attribute { name, value }) if name == "role" && value == "button" => {
                let Some(s) = self.section_idx(title) else { return vec![] };
                (0..self.sections[s].actions.len())
                    .map(|i| node(format!("action:{}:{}", title, i)))
                    .collect()
            }
            (["list", title], Locator::Class { value }) if value == "monaco-list-row" => {
                let Some(s) = self.section_idx(title) else { return vec![] };
                self.sections[s]
                    .window_range()
                    .map(|i| node(format!("row:{}:{}", title, i)))
                    .collect()
            }
            (["row", title, index], Locator::Class { value }) if value == "monaco-tl-twistie" => {
                match self.row_entry(title, index) {
                    Some((entry, _)) if entry.children.is_some() => {
                        vec![node(format!("twistie:{}:{}", title, index))]
                    }
                    _ => vec![],
                }
            }
            (["output"], Locator::Attribute { name, value }) if name == "aria-label" && value == "Output actions" => {
                vec![node("output-actions".into())]
            }
            (["output"], Locator::Tag { value }) if value == "select" => vec![node("select".into())],
            (["output"], Locator::Tag { value }) if value == "textarea" => vec![node("textarea".into())],
            (["output-actions"], Locator::Tag { value }) if value == "option" => {
                (0..self.channels.len()).map(|i| node(format!("option:{}", i))).collect()
            }
            (["output-actions"], Locator::Class { value }) if value == "clear-output" => {
                vec![node("clear-output".into())]
            }
            (["workbench"], Locator::Class { value }) if value == "context-view" => {
                vec![node("context-view".into())]
            }
            (["context-view"], Locator::Class { value }) if value == "monaco-list-row" && self.menu_open => {
                (0..self.channels.len()).map(|i| node(format!("menu-row:{}", i))).collect()
            }
            (["menu-row", index], Locator::Class { value }) if value == "option-text" => {
                vec![node(format!("option-text:{}", index))]
            }
            _ => vec![],
        }
    }

    fn row_entry(&self, title: &str, index: &str) -> Option<(&Entry, u32)> {
        let section = &self.sections[self.section_idx(title)?];
        let index: usize = index.parse().ok()?;
        let rows = section.flatten();
        let (path, level) = rows.get(index)?;
        Some((section.entry(path), *level))
    }

    fn attribute(&self, target: &Node, name: &str) -> Result<Option<String>> {
        let p = parts(target);
        let value = match (p.as_slice(), name) {
            (["header", title], "class") => {
                let s = &self.sections[self.section_idx(title).unwrap()];
                Some(if s.header_hidden {
                    "panel-header hidden".to_string()
                } else {
                    "panel-header".to_string()
                })
            }
            (["header", title], "aria-expanded") => {
                let s = &self.sections[self.section_idx(title).unwrap()];
                Some(s.expanded.to_string())
            }
            (["row", title, index], attr) => {
                let (entry, level) = self
                    .row_entry(title, index)
                    .ok_or_else(|| Error::Automation(format!("stale element reference: {}", target)))?;
                let section = &self.sections[self.section_idx(title).unwrap()];
                let is_last = index.parse::<usize>().ok() == section.flatten().len().checked_sub(1);
                match attr {
                    "aria-label" => Some(entry.label.clone()),
                    "aria-level" => Some(level.to_string()),
                    "aria-expanded" => entry.children.as_ref().map(|_| entry.expanded.to_string()),
                    "data-last-element" => Some(is_last.to_string()),
                    "class" => Some("monaco-list-row".to_string()),
                    _ => None,
                }
            }
            (["action", title, index], "title") => {
                let s = &self.sections[self.section_idx(title).unwrap()];
                s.actions.get(index.parse::<usize>().unwrap()).cloned()
            }
            (["option", index], "value") => Some(self.channels[index.parse::<usize>().unwrap()].name.clone()),
            (["option", index], "disabled") => {
                let channel = &self.channels[index.parse::<usize>().unwrap()];
                channel.disabled.then(|| "true".to_string())
            }
            (["menu-row", index], "class") => {
                let channel = &self.channels[index.parse::<usize>().unwrap()];
                Some(if channel.disabled {
                    "monaco-list-row disabled".to_string()
                } else {
                    "monaco-list-row".to_string()
                })
            }
            _ => None,
        };
        Ok(value)
    }

    fn click(&mut self, target: &Node) -> Result<()> {
        self.clicks.push(target.id().to_string());
        let owned: Vec<String> = parts(target).iter().map(|s| s.to_string()).collect();
        let p: Vec<&str> = owned.iter().map(String::as_str).collect();

        match p.as_slice() {
            ["header", title] => {
                let s = self.section_idx(title).unwrap();
                let section = &mut self.sections[s];
                if !section.header_hidden {
                    section.expanded = !section.expanded;
                }
            }
            ["row", title, index] | ["twistie", title, index] => {
                let s = self.section_idx(title).unwrap();
                let section = &mut self.sections[s];
                let index: usize = index.parse().unwrap();
                let rows = section.flatten();
                let (path, _) = rows
                    .get(index)
                    .cloned()
                    .ok_or_else(|| Error::Automation(format!("stale element reference: {}", target)))?;
                let entry = section.entry_mut(&path);
                if entry.children.is_some() {
                    entry.expanded = !entry.expanded;
                }
                section.clamp_offset();
            }
            ["select"] => self.menu_open = !self.menu_open,
            ["menu-row", index] => {
                self.selected_channel = index.parse().unwrap();
                self.menu_open = false;
            }
            ["clear-output"] => {
                let selected = self.selected_channel;
                self.channels[selected].text.clear();
            }
            _ => {}
        }
        Ok(())
    }

    fn keys(&mut self, target: &Node, key: &Key) {
        let owned: Vec<String> = parts(target).iter().map(|s| s.to_string()).collect();
        match (owned.first().map(String::as_str), key) {
            (Some("list"), Key::Home) => {
                let s = self.section_idx(&owned[1]).unwrap();
                self.sections[s].offset = 0;
            }
            (Some("list"), Key::PageDown) => {
                let s = self.section_idx(&owned[1]).unwrap();
                let section = &mut self.sections[s];
                section.page_forwards += 1;
                section.offset += section.window;
                section.clamp_offset();
            }
            (Some("textarea"), Key::Chord(_, 'c')) => {
                self.clipboard = self.channels[self.selected_channel].text.clone();
            }
            _ => {}
        }
    }
}

#[async_trait]
impl AutomationHandle for FakeWorkbench {
    async fn find_nodes(&self, scope: Option<&Node>, locator: &Locator) -> Result<Vec<Node>> {
        Ok(self.state.lock().find(scope, locator))
    }

    async fn get_attribute(&self, node: &Node, name: &str) -> Result<Option<String>> {
        self.state.lock().attribute(node, name)
    }

    async fn get_text(&self, node: &Node) -> Result<String> {
        let state = self.state.lock();
        let p = parts(node);
        Ok(match p.as_slice() {
            ["h3", title] => title.to_uppercase(),
            ["option-text", index] => state.channels[index.parse::<usize>().unwrap()].name.clone(),
            _ => String::new(),
        })
    }

    async fn click(&self, node: &Node) -> Result<()> {
        self.state.lock().click(node)
    }

    async fn send_keys(&self, node: &Node, keys: &Key) -> Result<()> {
        self.state.lock().keys(node, keys);
        Ok(())
    }

    async fn is_displayed(&self, node: &Node) -> Result<bool> {
        let state = self.state.lock();
        Ok(match node.id() {
            "context-view" => state.menu_open,
            _ => true,
        })
    }

    async fn read_clipboard(&self) -> Result<String> {
        Ok(self.state.lock().clipboard.clone())
    }
}

/// What happened to a [`FakeApp`] over its lifetime.
#[derive(Debug, Default)]
pub struct AppLog {
    pub starts: usize,
    pub quits: usize,
}

/// Application double driving a [`FakeWorkbench`].
pub struct FakeApp {
    pub workbench: Arc<FakeWorkbench>,
    pub log: Arc<Mutex<AppLog>>,
    pub ready_delay: Option<Duration>,
    pub fail_start: bool,
    pub fail_quit: bool,
    running: bool,
}

impl FakeApp {
    pub fn new(workbench: Arc<FakeWorkbench>) -> Self {
        Self {
            workbench,
            log: Arc::new(Mutex::new(AppLog::default())),
            ready_delay: Some(Duration::from_millis(300)),
            fail_start: false,
            fail_quit: false,
            running: false,
        }
    }
}

#[async_trait]
impl Application for FakeApp {
    async fn start(&mut self, _config: &SessionConfig) -> Result<()> {
        self.log.lock().starts += 1;
        if self.fail_start {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "binary not found",
            )));
        }
        self.workbench.ready_after(self.ready_delay);
        self.running = true;
        Ok(())
    }

    fn automation(&self) -> Option<Arc<dyn AutomationHandle>> {
        if self.running {
            Some(self.workbench.clone())
        } else {
            None
        }
    }

    async fn quit(&mut self) -> Result<()> {
        if !self.running {
            return Ok(());
        }
        self.running = false;
        self.log.lock().quits += 1;
        if self.fail_quit {
            return Err(Error::Automation("process did not exit".into()));
        }
        Ok(())
    }
}

/// Session config with the reference timings and a fast poll.
pub fn config() -> SessionConfig {
    SessionConfig {
        binary_path: "fake-editor".into(),
        poll_interval_ms: 50,
        ..Default::default()
    }
}
