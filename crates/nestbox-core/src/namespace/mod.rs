//! Linux namespace management for container isolation.
//!
//! Namespaces are attached when the child process is created with
//! `clone(2)`; this module only resolves *which* ones.

pub mod uts;

use nestbox_common::types::{IsolationFlag, IsolationFlags};
use nix::sched::CloneFlags;

/// Kernel namespace flags resolved from a launch's isolation request.
///
/// Fixed before process creation: nothing in this crate adds a namespace
/// to a process that is already running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamespaceSet {
    flags: CloneFlags,
}

impl NamespaceSet {
    /// Maps each requested isolation flag to its `CLONE_NEW*` bit.
    #[must_use]
    pub fn from_flags(isolation: &IsolationFlags) -> Self {
        let flags = isolation
            .iter()
            .fold(CloneFlags::empty(), |acc, flag| acc | clone_flag(flag));
        Self { flags }
    }

    /// Flags to pass to `clone(2)`.
    #[must_use]
    pub const fn clone_flags(self) -> CloneFlags {
        self.flags
    }

    /// Returns `true` if the namespace for `flag` will be created.
    #[must_use]
    pub const fn contains(self, flag: IsolationFlag) -> bool {
        self.flags.contains(clone_flag(flag))
    }

    /// Returns `true` if no namespace will be created.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.flags.is_empty()
    }
}

const fn clone_flag(flag: IsolationFlag) -> CloneFlags {
    match flag {
        IsolationFlag::Uts => CloneFlags::CLONE_NEWUTS,
        IsolationFlag::Pid => CloneFlags::CLONE_NEWPID,
        IsolationFlag::Mount => CloneFlags::CLONE_NEWNS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_flags_map_to_three_namespaces() {
        let set = NamespaceSet::from_flags(&IsolationFlags::all());
        assert_eq!(
            set.clone_flags(),
            CloneFlags::CLONE_NEWUTS | CloneFlags::CLONE_NEWPID | CloneFlags::CLONE_NEWNS
        );
    }

    #[test]
    fn no_flags_map_to_empty_set() {
        let set = NamespaceSet::from_flags(&IsolationFlags::none());
        assert!(set.is_empty());
        assert!(!set.contains(IsolationFlag::Uts));
    }

    #[test]
    fn single_flag_does_not_leak_others() {
        let set = NamespaceSet::from_flags(&[IsolationFlag::Pid].into_iter().collect());
        assert!(set.contains(IsolationFlag::Pid));
        assert!(!set.contains(IsolationFlag::Mount));
        assert!(!set.clone_flags().contains(CloneFlags::CLONE_NEWNET));
    }
}
