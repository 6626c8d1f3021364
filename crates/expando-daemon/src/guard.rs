use std::sync::atomic::{AtomicBool, Ordering};

/// Shared between the hook callback and the injector while a replacement is
/// being typed. Events seen while the guard is active are our own echoes;
/// a mouse click in that window interrupts the injection instead.
#[derive(Debug, Default)]
pub struct InjectionGuard {
    active: AtomicBool,
    interrupted: AtomicBool,
}

impl InjectionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the guard until the returned scope is dropped, including
    /// during unwinding.
    pub fn begin(&self) -> InjectionScope<'_> {
        self.interrupted.store(false, Ordering::SeqCst);
        self.active.store(true, Ordering::SeqCst);
        InjectionScope { guard: self }
    }

    fn end(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Only has an effect while an injection is running.
    pub fn interrupt(&self) {
        if self.is_active() {
            self.interrupted.store(true, Ordering::SeqCst);
        }
    }

    pub fn was_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }
}

/// Lowers the guard when dropped.
#[must_use = "the guard is lowered as soon as the scope is dropped"]
pub struct InjectionScope<'a> {
    guard: &'a InjectionGuard,
}

impl Drop for InjectionScope<'_> {
    fn drop(&mut self) {
        self.guard.end();
    }
}
