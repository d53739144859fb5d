//! The homeframe daemon: one process supervising the presence poller and
//! the web dashboard.
//!
//! The two share the device wrappers, the mode handle and the poller
//! status. A dashboard mode change wakes the poller through the mode
//! channel; ctrl-c or SIGTERM stops both through [`shutdown::ShutdownSignal`].

pub mod daemon;
pub mod poller;
pub mod shutdown;
