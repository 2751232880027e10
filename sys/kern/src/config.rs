// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Boot-time configuration (spec §6, §9 ambient addition).
//!
//! The reference implementation's timing and pool-size constants are
//! compile-time `#define`s; this crate groups them into one `const`-
//! constructible struct instead of scattering bare top-level `const`s,
//! following the pattern the lineage this crate descends from uses for its
//! own build-time-generated configuration, adapted here to a plain
//! `const fn` since this kernel has no declarative build-time config stage
//! (see SPEC_FULL.md §2, "crate layout"). Tests that need to exercise
//! boundary behavior (e.g. pool exhaustion) construct a non-default
//! `KernelConfig`.

/// Timing and capacity constants threaded through [`crate::kernel::Kernel::new`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct KernelConfig {
    pub timeslice_us: u32,
    pub psecond_us: u32,
}

impl KernelConfig {
    pub const DEFAULT: KernelConfig = KernelConfig {
        timeslice_us: abi::TIMESLICE_US,
        psecond_us: abi::PSECOND_US,
    };
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
