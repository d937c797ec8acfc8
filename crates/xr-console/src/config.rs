//! Configuration for console sessions.
//!
//! All timing and bounding knobs live here so the dialogue logic stays
//! free of magic constants: the per-read timeout, the inter-read settle
//! delay used when vacuuming the transport, the retry budget for
//! unmatched prompts, and the history bound on the stream buffer.

use std::time::Duration;

/// Default timeout for the first read of a drain call (2 seconds).
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(2);

/// Default settle delay between follow-up reads of a drain call.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(100);

/// Default TCP connect timeout (10 seconds).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default retry budget: unmatched read/classify cycles tolerated before
/// a dialogue gives up.
pub const DEFAULT_RETRY_BUDGET: u32 = 5;

/// Default hard bound on total engine cycles per dialogue, matched or not.
pub const DEFAULT_MAX_CYCLES: u32 = 100;

/// Default number of decoded chunks the stream buffer retains.
pub const DEFAULT_MAX_HISTORY_CHUNKS: usize = 64;

/// Default line ending appended to every sent line.
pub const DEFAULT_LINE_ENDING: &str = "\n";

/// Configuration for a console session.
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    /// How long a drain call blocks waiting for the first byte.
    pub read_timeout: Duration,

    /// How long follow-up reads wait for the stream to settle.
    pub settle_delay: Duration,

    /// TCP connect timeout.
    pub connect_timeout: Duration,

    /// Unmatched read/classify cycles a dialogue tolerates before
    /// reporting a timeout.
    pub retry_budget: u32,

    /// Hard bound on total engine cycles per dialogue run.
    pub max_cycles: u32,

    /// Number of decoded chunks retained in the stream buffer; the
    /// oldest chunk is evicted past this bound.
    pub max_history_chunks: usize,

    /// Line ending appended by `send_line`.
    pub line_ending: &'static str,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            read_timeout: DEFAULT_READ_TIMEOUT,
            settle_delay: DEFAULT_SETTLE_DELAY,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            retry_budget: DEFAULT_RETRY_BUDGET,
            max_cycles: DEFAULT_MAX_CYCLES,
            max_history_chunks: DEFAULT_MAX_HISTORY_CHUNKS,
            line_ending: DEFAULT_LINE_ENDING,
        }
    }
}

impl ConsoleConfig {
    /// Create a configuration with all defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the first-read timeout.
    #[must_use]
    pub const fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set the inter-read settle delay.
    #[must_use]
    pub const fn settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Set the TCP connect timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the retry budget.
    #[must_use]
    pub const fn retry_budget(mut self, budget: u32) -> Self {
        self.retry_budget = budget;
        self
    }

    /// Set the hard cycle bound.
    #[must_use]
    pub const fn max_cycles(mut self, max: u32) -> Self {
        self.max_cycles = max;
        self
    }

    /// Set the stream buffer history bound.
    #[must_use]
    pub const fn max_history_chunks(mut self, chunks: usize) -> Self {
        self.max_history_chunks = chunks;
        self
    }

    /// Set the line ending appended to sent lines.
    #[must_use]
    pub const fn line_ending(mut self, ending: &'static str) -> Self {
        self.line_ending = ending;
        self
    }
}
