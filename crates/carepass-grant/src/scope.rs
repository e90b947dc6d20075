//! Access scope model
//!
//! Default-deny: only history and prescriptions are granted unless a request
//! names its flags explicitly.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One permission a grant may carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeFlag {
    ViewHistory,
    ViewPrescriptions,
    CreateEncounters,
    ViewAuditLogs,
}

impl ScopeFlag {
    /// Every flag
    pub const ALL: [ScopeFlag; 4] = [
        ScopeFlag::ViewHistory,
        ScopeFlag::ViewPrescriptions,
        ScopeFlag::CreateEncounters,
        ScopeFlag::ViewAuditLogs,
    ];

    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeFlag::ViewHistory => "view_history",
            ScopeFlag::ViewPrescriptions => "view_prescriptions",
            ScopeFlag::CreateEncounters => "create_encounters",
            ScopeFlag::ViewAuditLogs => "view_audit_logs",
        }
    }
}

impl fmt::Display for ScopeFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScopeFlag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ScopeFlag::ALL
            .into_iter()
            .find(|flag| flag.as_str() == s)
            .ok_or_else(|| format!("unknown scope '{s}'"))
    }
}

/// Permissions carried by a grant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessScope {
    pub can_view_history: bool,
    pub can_view_prescriptions: bool,
    pub can_create_encounters: bool,
    pub can_view_audit_logs: bool,
}

impl Default for AccessScope {
    fn default() -> Self {
        Self {
            can_view_history: true,
            can_view_prescriptions: true,
            can_create_encounters: false,
            can_view_audit_logs: false,
        }
    }
}

impl AccessScope {
    /// A scope with exactly these flags set. An empty list yields the default.
    pub fn from_flags(flags: &[ScopeFlag]) -> Self {
        if flags.is_empty() {
            return Self::default();
        }
        let mut scope = Self::none();
        for flag in flags {
            scope.set(*flag, true);
        }
        scope
    }

    /// A scope with nothing set
    pub fn none() -> Self {
        Self {
            can_view_history: false,
            can_view_prescriptions: false,
            can_create_encounters: false,
            can_view_audit_logs: false,
        }
    }

    /// Whether `flag` is set
    pub fn allows(&self, flag: ScopeFlag) -> bool {
        match flag {
            ScopeFlag::ViewHistory => self.can_view_history,
            ScopeFlag::ViewPrescriptions => self.can_view_prescriptions,
            ScopeFlag::CreateEncounters => self.can_create_encounters,
            ScopeFlag::ViewAuditLogs => self.can_view_audit_logs,
        }
    }

    /// Set or clear `flag`
    pub fn set(&mut self, flag: ScopeFlag, value: bool) {
        match flag {
            ScopeFlag::ViewHistory => self.can_view_history = value,
            ScopeFlag::ViewPrescriptions => self.can_view_prescriptions = value,
            ScopeFlag::CreateEncounters => self.can_create_encounters = value,
            ScopeFlag::ViewAuditLogs => self.can_view_audit_logs = value,
        }
    }

    /// Flags that are set
    pub fn flags(&self) -> Vec<ScopeFlag> {
        ScopeFlag::ALL
            .into_iter()
            .filter(|flag| self.allows(*flag))
            .collect()
    }

    /// Whether no flag is set
    pub fn is_empty(&self) -> bool {
        self.flags().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_denies_write_and_audit() {
        let scope = AccessScope::default();
        assert!(scope.allows(ScopeFlag::ViewHistory));
        assert!(scope.allows(ScopeFlag::ViewPrescriptions));
        assert!(!scope.allows(ScopeFlag::CreateEncounters));
        assert!(!scope.allows(ScopeFlag::ViewAuditLogs));
    }

    #[test]
    fn explicit_flags_replace_defaults() {
        let scope = AccessScope::from_flags(&[ScopeFlag::ViewAuditLogs]);
        assert_eq!(scope.flags(), vec![ScopeFlag::ViewAuditLogs]);
    }

    #[test]
    fn parses_wire_names() {
        assert_eq!(
            "create_encounters".parse::<ScopeFlag>().unwrap(),
            ScopeFlag::CreateEncounters
        );
        assert!("admin".parse::<ScopeFlag>().is_err());
    }
}
