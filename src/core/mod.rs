//! Core assistant components
//!
//! This module contains the session controller behind the in-app chat widget.

mod session;

pub use session::{ChatWidget, PendingReply, SessionSnapshot, WidgetEvent};
