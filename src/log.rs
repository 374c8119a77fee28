use std::collections::VecDeque;

const DEFAULT_LIMIT: usize = 100;

// Bounded diagnostic log for the host boundary (registration notices etc).
// The decoding core itself never logs - read errors propagate to the host instead.
pub struct Log {
    pub lines: VecDeque<String>,
    limit: usize,
}

impl Log {
    pub fn new() -> Log {
        Log::with_limit(DEFAULT_LIMIT)
    }

    pub fn with_limit(limit: usize) -> Log {
        Log {lines: VecDeque::new(), limit}
    }

    pub fn add_line(&mut self, line: String) {
        self.lines.push_back(line);
        while self.lines.len() > self.limit {
            self.lines.pop_front();
        }
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

#[macro_export]
macro_rules! log {
    ($log:expr, $($arg:tt)*) => (
        ($log).add_line(format!($($arg)*))
    );
}
