//! Role and method identities
//!
//! The closed set of core object roles and the static method table of each.
//! Resolving a declared `(role, name, parameter types)` triple against these
//! tables is the only introspection the interception layer needs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// A behavioral contract a core object may implement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    Executor,
    StatementHandler,
    ParameterHandler,
    ResultSetHandler,
}

/// Roles offered by a single object, in a stable order.
pub type RoleSet = BTreeSet<Role>;

impl Role {
    pub const ALL: [Role; 4] = [
        Role::Executor,
        Role::StatementHandler,
        Role::ParameterHandler,
        Role::ResultSetHandler,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Executor => "Executor",
            Self::StatementHandler => "StatementHandler",
            Self::ParameterHandler => "ParameterHandler",
            Self::ResultSetHandler => "ResultSetHandler",
        }
    }

    /// Every method declared on this role.
    pub fn methods(self) -> impl Iterator<Item = Method> {
        Method::ALL.into_iter().filter(move |m| m.role() == self)
    }

    /// Resolve a method by exact name and parameter-type list.
    pub fn resolve<S: AsRef<str>>(self, name: &str, params: &[S]) -> Option<Method> {
        self.methods().find(|m| {
            m.name() == name
                && m.params().len() == params.len()
                && m.params().iter().zip(params).all(|(a, b)| *a == b.as_ref())
        })
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| format!("unknown role: {}", s))
    }
}

/// Identity of one method on one role.
///
/// Overloads share a name and differ by parameter types, e.g. the two
/// `Executor.query` variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Method {
    ExecutorUpdate,
    ExecutorQuery,
    ExecutorQueryWithBounds,
    ExecutorCommit,
    ExecutorRollback,
    ExecutorClose,
    ExecutorIsClosed,
    StatementPrepare,
    StatementParameterize,
    StatementUpdate,
    StatementQuery,
    ParameterGetObject,
    ParameterSet,
    ResultSetHandle,
}

impl Method {
    pub const ALL: [Method; 14] = [
        Method::ExecutorUpdate,
        Method::ExecutorQuery,
        Method::ExecutorQueryWithBounds,
        Method::ExecutorCommit,
        Method::ExecutorRollback,
        Method::ExecutorClose,
        Method::ExecutorIsClosed,
        Method::StatementPrepare,
        Method::StatementParameterize,
        Method::StatementUpdate,
        Method::StatementQuery,
        Method::ParameterGetObject,
        Method::ParameterSet,
        Method::ResultSetHandle,
    ];

    /// The role that declares this method.
    pub fn role(self) -> Role {
        match self {
            Self::ExecutorUpdate
            | Self::ExecutorQuery
            | Self::ExecutorQueryWithBounds
            | Self::ExecutorCommit
            | Self::ExecutorRollback
            | Self::ExecutorClose
            | Self::ExecutorIsClosed => Role::Executor,
            Self::StatementPrepare
            | Self::StatementParameterize
            | Self::StatementUpdate
            | Self::StatementQuery => Role::StatementHandler,
            Self::ParameterGetObject | Self::ParameterSet => Role::ParameterHandler,
            Self::ResultSetHandle => Role::ResultSetHandler,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::ExecutorUpdate | Self::StatementUpdate => "update",
            Self::ExecutorQuery | Self::ExecutorQueryWithBounds | Self::StatementQuery => "query",
            Self::ExecutorCommit => "commit",
            Self::ExecutorRollback => "rollback",
            Self::ExecutorClose => "close",
            Self::ExecutorIsClosed => "isClosed",
            Self::StatementPrepare => "prepare",
            Self::StatementParameterize => "parameterize",
            Self::ParameterGetObject => "getParameterObject",
            Self::ParameterSet => "setParameters",
            Self::ResultSetHandle => "handleResultSets",
        }
    }

    /// Declared parameter types, in call order.
    pub fn params(self) -> &'static [&'static str] {
        match self {
            Self::ExecutorUpdate | Self::ExecutorQuery => &["Statement", "Object"],
            Self::ExecutorQueryWithBounds => &["Statement", "Object", "RowBounds"],
            Self::ExecutorCommit | Self::ExecutorRollback => &["boolean"],
            Self::StatementQuery => &["RowBounds"],
            Self::ResultSetHandle => &["List"],
            Self::ExecutorClose
            | Self::ExecutorIsClosed
            | Self::StatementPrepare
            | Self::StatementParameterize
            | Self::StatementUpdate
            | Self::ParameterGetObject
            | Self::ParameterSet => &[],
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}({})", self.role(), self.name(), self.params().join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_method_resolves_to_itself() {
        for m in Method::ALL {
            assert_eq!(m.role().resolve(m.name(), m.params()), Some(m), "{}", m);
        }
    }

    #[test]
    fn overloads_are_distinguished_by_params() {
        assert_eq!(
            Role::Executor.resolve("query", &["Statement", "Object"]),
            Some(Method::ExecutorQuery)
        );
        assert_eq!(
            Role::Executor.resolve("query", &["Statement", "Object", "RowBounds"]),
            Some(Method::ExecutorQueryWithBounds)
        );
        assert_eq!(Role::Executor.resolve("query", &["Statement"]), None);
    }

    #[test]
    fn method_names_do_not_leak_across_roles() {
        assert_eq!(Role::ResultSetHandler.resolve("query", &["RowBounds"]), None);
        assert_eq!(
            Role::StatementHandler.resolve("query", &["RowBounds"]),
            Some(Method::StatementQuery)
        );
    }

    #[test]
    fn display_shows_signature() {
        assert_eq!(
            Method::ExecutorQuery.to_string(),
            "Executor.query(Statement, Object)"
        );
        assert_eq!(Method::ExecutorClose.to_string(), "Executor.close()");
    }
}
