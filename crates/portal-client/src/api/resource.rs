//! Backend collection paths.

use std::fmt;

/// Top-level collections exposed by the NCD backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Series,
    Investors,
    Payouts,
    Grievances,
    Compliance,
    AuditLogs,
    Dashboard,
}

impl Resource {
    pub const ALL: [Resource; 7] = [
        Resource::Series,
        Resource::Investors,
        Resource::Payouts,
        Resource::Grievances,
        Resource::Compliance,
        Resource::AuditLogs,
        Resource::Dashboard,
    ];

    /// Collection path relative to the API base URL.
    pub fn path(self) -> &'static str {
        match self {
            Resource::Series => "/series",
            Resource::Investors => "/investors",
            Resource::Payouts => "/payouts",
            Resource::Grievances => "/grievances",
            Resource::Compliance => "/compliance",
            Resource::AuditLogs => "/audit-logs",
            Resource::Dashboard => "/dashboard",
        }
    }

    /// Path of one item in the collection, e.g. `/series/NCD-2025-A`.
    ///
    /// `id` is percent-encoded as a single path segment, so `/` and spaces
    /// in ids cannot change the route.
    pub fn item(self, id: &str) -> String {
        let mut path = String::with_capacity(self.path().len() + 1 + id.len());
        path.push_str(self.path());
        path.push('/');
        for b in id.bytes() {
            if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~') {
                path.push(char::from(b));
            } else {
                path.push_str(&format!("%{b:02X}"));
            }
        }
        path
    }

    /// Resolve a CLI-style name (`series`, `audit-logs`, …).
    pub fn from_name(name: &str) -> Option<Self> {
        let wanted = name.trim().trim_start_matches('/');
        Self::ALL.into_iter().find(|r| &r.path()[1..] == wanted)
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path()[1..])
    }
}
