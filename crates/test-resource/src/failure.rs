// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The allocation-failure test loop.
//!
//! [`exception_test_loop`] drives a closure under every possible
//! injected-failure position: iteration `i` allows exactly `i`
//! allocations before the resource fails with
//! [`ResourceError::InjectedFailure`]. A closure that cleans up
//! correctly on the error path (which in Rust means: its guards drop
//! while the `?` propagates) leaves no trace behind, and the loop ends
//! when the closure finally runs to completion — i.e. when its code
//! path demanded at most `i` allocations.

use crate::TestResource;
use memory_resource::{ResourceError, ResourceId};

/// The payload of an injected allocation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InjectedFailureInfo {
    /// The resource whose countdown fired.
    pub origin: ResourceId,
    /// Requested size of the failed allocation.
    pub bytes: usize,
    /// Requested alignment of the failed allocation.
    pub align: usize,
}

/// Implemented by error types the failure loop can look through.
///
/// The loop retries only on an injected failure; any other error is the
/// closure's own and propagates. Custom error types that wrap
/// [`ResourceError`] implement this to stay usable with the loop.
pub trait FailureSource {
    /// The injected failure inside this error, if that is what it is.
    fn injected_failure(&self) -> Option<InjectedFailureInfo>;
}

impl FailureSource for ResourceError {
    fn injected_failure(&self) -> Option<InjectedFailureInfo> {
        match *self {
            ResourceError::InjectedFailure {
                origin,
                bytes,
                align,
            } => Some(InjectedFailureInfo {
                origin,
                bytes,
                align,
            }),
            _ => None,
        }
    }
}

/// Runs `f` under an advancing injected-failure position until it
/// completes without hitting one.
///
/// The resource's allocation limit is saved up front and restored both
/// around every attempt and on exit. Injected failures originating from
/// a *different* resource are logged and propagated: they mean the test
/// wired its resources up wrong, and retrying would hide that.
///
/// # Example
/// ```
/// use test_resource::{exception_test_loop, TestResource};
/// use memory_resource::ResourceError;
///
/// let tr = TestResource::with_name("loop");
/// let mut attempts = 0;
/// exception_test_loop(&tr, |tr| {
///     attempts += 1;
///     let a = tr.allocate(16, 8)?;
///     unsafe { tr.deallocate(a.as_ptr(), 16, 8) };
///     Ok::<_, ResourceError>(())
/// })
/// .unwrap();
/// // Failed at limit 0, completed at limit 1.
/// assert_eq!(attempts, 2);
/// ```
pub fn exception_test_loop<T, E, F>(resource: &TestResource, mut f: F) -> Result<T, E>
where
    E: FailureSource,
    F: FnMut(&TestResource) -> Result<T, E>,
{
    let original_limit = resource.allocation_limit();

    let mut attempt: i64 = 0;
    loop {
        resource.set_allocation_limit(attempt);
        let outcome = f(resource);
        resource.set_allocation_limit(original_limit);

        let error = match outcome {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        match error.injected_failure() {
            Some(info) if info.origin == resource.id() => {
                if resource.is_verbose() {
                    resource.reporter().log(format_args!(
                        "  *** injected failure: allocation limit = {attempt}, \
                         last request = {} bytes aligned to {} ***\n",
                        info.bytes, info.align,
                    ));
                }
                attempt += 1;
            }
            Some(info) => {
                resource.reporter().log(format_args!(
                    "  *** injected failure from unexpected resource {} ***\n",
                    info.origin,
                ));
                return Err(error);
            }
            None => return Err(error),
        }
    }
}
