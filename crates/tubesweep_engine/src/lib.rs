//! Tubesweep engine: DevTools session, DOM capability traits, layout
//! resolution and the walker that executes pagination effects.
mod action;
mod cdp;
mod devtools;
mod dom;
mod resolve;
mod types;
mod walker;

pub use action::{ActionSettings, MenuAction};
pub use cdp::{CdpElement, CdpPage, PageTimings, Session, SessionError};
pub use devtools::{BrowserVersion, DevtoolsClient, DevtoolsSettings, DevtoolsTarget, DiscoveryError};
pub use dom::{DomElement, DomError, DomPage, ElementHandle};
pub use resolve::resolve;
pub use types::{ActionFailure, WalkError, WalkEvent, WalkReport, WalkSettings, WalkSink};
pub use walker::Walker;
