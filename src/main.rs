//! icinga-notify: Icinga2 notification plugins

use anyhow::Result;

fn main() -> Result<()> {
    icinga_notify::cli::run()
}
