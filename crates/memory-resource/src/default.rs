// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The process-wide default resource and its RAII guard.
//!
//! Code that does not care which allocator it uses asks for
//! [`default_resource`]. Tests redirect that traffic by installing an
//! instrumented resource for a scope with [`DefaultResourceGuard`]; the
//! previous default is restored when the guard drops, however the scope
//! exits.

use crate::{system_resource, MemoryResource};
use std::mem;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

fn slot() -> &'static Mutex<Arc<dyn MemoryResource>> {
    static DEFAULT: OnceLock<Mutex<Arc<dyn MemoryResource>>> = OnceLock::new();
    DEFAULT.get_or_init(|| Mutex::new(system_resource()))
}

/// Returns the current process-wide default resource.
pub fn default_resource() -> Arc<dyn MemoryResource> {
    slot()
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// Installs `replacement` as the process-wide default and returns the
/// previous default. `None` restores the system resource.
pub fn set_default_resource(
    replacement: Option<Arc<dyn MemoryResource>>,
) -> Arc<dyn MemoryResource> {
    let replacement = replacement.unwrap_or_else(|| system_resource());
    let mut current = slot().lock().unwrap_or_else(PoisonError::into_inner);
    mem::replace(&mut *current, replacement)
}

/// Scoped replacement of the process-wide default resource.
///
/// # Example
/// ```
/// use memory_resource::{default_resource, system_resource, DefaultResourceGuard};
/// use std::sync::Arc;
///
/// {
///     let mine = system_resource(); // stand-in for an instrumented resource
///     let _guard = DefaultResourceGuard::new(Some(mine.clone()));
///     assert!(default_resource().is_equal(&*mine));
/// }
/// // previous default restored here
/// ```
pub struct DefaultResourceGuard {
    previous: Option<Arc<dyn MemoryResource>>,
}

impl DefaultResourceGuard {
    /// Installs `replacement` for the guard's lifetime. With `None` the
    /// guard is an identity: nothing is installed or restored.
    pub fn new(replacement: Option<Arc<dyn MemoryResource>>) -> Self {
        let previous = replacement.map(|r| set_default_resource(Some(r)));
        Self { previous }
    }
}

impl Drop for DefaultResourceGuard {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            set_default_resource(Some(previous));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::same_resource;

    // The default slot is process-global, so these tests serialize on a
    // local mutex to keep cargo's parallel test runner from interleaving.
    static SERIAL: Mutex<()> = Mutex::new(());

    #[test]
    fn test_default_starts_as_system() {
        let _s = SERIAL.lock().unwrap_or_else(PoisonError::into_inner);
        set_default_resource(None);
        assert!(same_resource(&*default_resource(), &*system_resource()));
    }

    #[test]
    fn test_guard_installs_and_restores() {
        let _s = SERIAL.lock().unwrap_or_else(PoisonError::into_inner);
        set_default_resource(None);
        let replacement: Arc<dyn MemoryResource> = system_resource();
        {
            let _guard = DefaultResourceGuard::new(Some(replacement.clone()));
            assert!(same_resource(&*default_resource(), &*replacement));
        }
        assert!(same_resource(&*default_resource(), &*system_resource()));
    }

    #[test]
    fn test_identity_guard_changes_nothing() {
        let _s = SERIAL.lock().unwrap_or_else(PoisonError::into_inner);
        set_default_resource(None);
        let before = default_resource();
        {
            let _guard = DefaultResourceGuard::new(None);
            assert!(same_resource(&*default_resource(), &*before));
        }
        assert!(same_resource(&*default_resource(), &*before));
    }
}
