use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Process-wide switches that gate real side effects.
///
/// Shared between handlers through [`SharedFlags`]. Both flags start out
/// `false` unless startup configuration says otherwise, and live in memory
/// only.
#[derive(Debug, Default)]
pub struct Flags {
    paused: AtomicBool,
    dry_run: AtomicBool,
}

pub type SharedFlags = Arc<Flags>;

impl Flags {
    pub fn new(paused: bool, dry_run: bool) -> Self {
        Self {
            paused: AtomicBool::new(paused),
            dry_run: AtomicBool::new(dry_run),
        }
    }

    pub fn shared(paused: bool, dry_run: bool) -> SharedFlags {
        Arc::new(Self::new(paused, dry_run))
    }

    pub fn paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::SeqCst);
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run.load(Ordering::SeqCst)
    }

    /// Flips the dry-run flag and returns its new value.
    pub fn toggle_dry_run(&self) -> bool {
        !self.dry_run.fetch_xor(true, Ordering::SeqCst)
    }

    /// Human-readable listing used by the `config` command.
    pub fn listing(&self) -> String {
        format!("Dry Run: {}\nPaused: {}", self.dry_run(), self.paused())
    }
}
