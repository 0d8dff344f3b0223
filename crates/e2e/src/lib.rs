//! vstester E2E Test Framework
//!
//! This crate drives a long-lived workbench application through an
//! [`AutomationHandle`](vstester_common::AutomationHandle) and runs a batch
//! of test cases against one shared session of it:
//! - Launches the application once and waits for it to become ready
//! - Navigates virtualized lists and nested trees by label
//! - Runs closure-based or declarative YAML test cases serially
//! - Tears the application down exactly once and reports one exit status
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  SuiteRunner (host framework)               │
//! ├─────────────────────────────────────────────────────────────┤
//! │  SessionOrchestrator: SuiteHooks                            │
//! │    ├── before_all() -> launch() -> SessionContext           │
//! │    └── after_all()  -> close()                              │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestCase::run(&SessionContext)                             │
//! │    ├── Section { find_item, open_item, actions }            │
//! │    │     ├── VirtualListNavigator::locate                   │
//! │    │     └── PathResolver::open_path -> Vec<TreeItem>       │
//! │    └── OutputPanel { select_channel, text, clear_text }     │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod app;
pub mod panel;
pub mod path;
pub mod runner;
pub mod section;
pub mod session;
pub mod spec;
pub mod tree_item;
pub mod virtual_list;

pub use app::{Application, ProcessApplication};
pub use panel::OutputPanel;
pub use path::{PathNode, PathResolver, PathRoot};
pub use runner::{exit_code_for, FnCase, SuiteHooks, SuiteResult, SuiteRunner, TestCase, TestResult};
pub use section::{HeaderAction, HeaderState, Section};
pub use session::{SessionContext, SessionOrchestrator, SessionState};
pub use spec::{TestSpec, TestStep};
pub use tree_item::TreeItem;
pub use virtual_list::{ListBody, ListRow, VirtualContainer, VirtualListNavigator};

use tracing_subscriber::EnvFilter;

/// Install a `fmt` subscriber filtered by `RUST_LOG` (default `info`).
///
/// Returns `false` if a subscriber was already installed.
pub fn init_tracing() -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .is_ok()
}
