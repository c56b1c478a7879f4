//! Names of the classes currently being written
//!
//! Writing a class file claims its name first. A second writer for the same
//! name waits until the first one releases it, so two compilations never
//! interleave output for one class.

use crate::common::error::{Error, Result};
use std::collections::HashSet;
use std::sync::{Condvar, Mutex};

#[derive(Debug, Default)]
pub struct ActiveCompilations {
    names: Mutex<HashSet<String>>,
    released: Condvar,
}

/// Claim on one class name, released on drop
#[derive(Debug)]
pub struct ActiveGuard<'a> {
    registry: &'a ActiveCompilations,
    name: String,
}

impl ActiveCompilations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `name`, waiting while another writer holds it
    pub fn acquire(&self, name: &str) -> Result<ActiveGuard<'_>> {
        let poisoned = |_| Error::internal("active compilation registry poisoned");
        let mut names = self.names.lock().map_err(poisoned)?;
        while names.contains(name) {
            log::trace!("registry: waiting for {}", name);
            names = self.released.wait(names).map_err(poisoned)?;
        }
        names.insert(name.to_string());
        Ok(ActiveGuard { registry: self, name: name.to_string() })
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.names.lock().map(|names| names.contains(name)).unwrap_or(false)
    }
}

impl ActiveGuard<'_> {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        let mut names = match self.registry.names.lock() {
            Ok(names) => names,
            Err(poisoned) => poisoned.into_inner(),
        };
        names.remove(&self.name);
        self.registry.released.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn released_on_drop() {
        let registry = ActiveCompilations::new();
        {
            let guard = registry.acquire("p.A").unwrap();
            assert_eq!(guard.name(), "p.A");
            assert!(registry.is_active("p.A"));
            let _other = registry.acquire("p.B").unwrap();
        }
        assert!(!registry.is_active("p.A"));
        assert!(!registry.is_active("p.B"));
    }

    #[test]
    fn same_name_writers_take_turns() {
        let registry = Arc::new(ActiveCompilations::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let overlap = Arc::new(AtomicUsize::new(0));
        let workers: Vec<_> = (0..4)
            .map(|_| {
                let (registry, inside, overlap) = (registry.clone(), inside.clone(), overlap.clone());
                thread::spawn(move || {
                    for _ in 0..10 {
                        let _guard = registry.acquire("A").unwrap();
                        if inside.fetch_add(1, Ordering::SeqCst) != 0 {
                            overlap.fetch_add(1, Ordering::SeqCst);
                        }
                        thread::sleep(Duration::from_micros(50));
                        inside.fetch_sub(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }
        assert_eq!(overlap.load(Ordering::SeqCst), 0);
        assert!(!registry.is_active("A"));
    }
}
