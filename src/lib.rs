//! icinga-notify: Icinga2 notification plugins
//!
//! Mail, Slack, Pushover, Request Tracker and Netbox path impact
//! notifications sharing one settings resolver.

pub mod cli;
pub mod config;
pub mod grafana;
pub mod icinga;
pub mod logging;
pub mod netbox;
pub mod notify;
