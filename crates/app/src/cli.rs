use clap::Parser;

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// Serve from the in-memory gateway instead of the hosted backend.
    #[arg(long, default_value_t = false)]
    pub offline: bool,
    /// Disable periodic vote refreshes.
    #[arg(long, default_value_t = false)]
    pub no_poll: bool,
}

impl Cli {
    pub fn run_poller(&self, interval_secs: u64) -> bool {
        !self.no_poll && interval_secs > 0
    }
}
