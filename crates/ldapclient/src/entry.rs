//! Request and result types exchanged with the directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Represents the search scope for LDAP queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchScope {
    /// Base object only.
    Base,
    /// One level below the base.
    OneLevel,
    /// Entire subtree.
    Subtree,
}

impl From<SearchScope> for ldap3::Scope {
    fn from(scope: SearchScope) -> Self {
        match scope {
            SearchScope::Base => ldap3::Scope::Base,
            SearchScope::OneLevel => ldap3::Scope::OneLevel,
            SearchScope::Subtree => ldap3::Scope::Subtree,
        }
    }
}

/// Alias dereferencing policy for a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerefAliases {
    /// Never dereference aliases.
    Never,
    /// Dereference while searching below the base.
    InSearching,
    /// Dereference only when locating the base object.
    FindingBaseObject,
    /// Always dereference.
    Always,
}

impl From<DerefAliases> for ldap3::DerefAliases {
    fn from(deref: DerefAliases) -> Self {
        match deref {
            DerefAliases::Never => ldap3::DerefAliases::Never,
            DerefAliases::InSearching => ldap3::DerefAliases::Searching,
            DerefAliases::FindingBaseObject => ldap3::DerefAliases::Finding,
            DerefAliases::Always => ldap3::DerefAliases::Always,
        }
    }
}

/// Search request handed to a [`crate::DirectorySession`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    /// Base DN of the search.
    pub base: String,
    /// Traversal scope.
    pub scope: SearchScope,
    /// Filter expression, e.g. `(objectClass=person)`.
    pub filter: String,
    /// Requested attributes; empty requests all user attributes.
    pub attributes: Vec<String>,
    /// Alias dereferencing policy.
    pub deref_aliases: DerefAliases,
    /// Maximum number of entries (0 = no limit).
    pub size_limit: i32,
    /// Maximum server-side time in seconds (0 = no limit).
    pub time_limit: i32,
    /// Return attribute names only, without values.
    pub types_only: bool,
}

impl SearchRequest {
    /// Creates a request that never dereferences aliases, has no limits and returns values.
    #[must_use]
    pub fn new(
        base: impl Into<String>,
        scope: SearchScope,
        filter: impl Into<String>,
        attributes: &[&str],
    ) -> Self {
        Self {
            base: base.into(),
            scope,
            filter: filter.into(),
            attributes: attributes.iter().map(|attr| (*attr).to_string()).collect(),
            deref_aliases: DerefAliases::Never,
            size_limit: 0,
            time_limit: 0,
            types_only: false,
        }
    }

    /// Returns true if the request asks for every user attribute.
    #[must_use]
    pub fn requests_all_attributes(&self) -> bool {
        self.attributes.is_empty()
    }
}

/// LDAP entry representation used by the client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LdapEntry {
    /// Distinguished name of the entry.
    pub dn: String,
    /// Attribute map (values preserve order from server).
    pub attributes: HashMap<String, Vec<String>>,
    /// Attributes whose values are not valid UTF-8.
    pub binary_attributes: HashMap<String, Vec<Vec<u8>>>,
}

impl LdapEntry {
    /// Returns the first value of the attribute if present.
    #[must_use]
    pub fn first(&self, attribute: &str) -> Option<&str> {
        self.attributes
            .get(attribute)
            .and_then(|values| values.first().map(String::as_str))
    }

    /// Returns all values for the attribute.
    #[must_use]
    pub fn values(&self, attribute: &str) -> Option<&[String]> {
        self.attributes.get(attribute).map(Vec::as_slice)
    }

    /// Returns true if the entry carries the attribute, textual or binary.
    #[must_use]
    pub fn has_attribute(&self, attribute: &str) -> bool {
        self.attributes.contains_key(attribute) || self.binary_attributes.contains_key(attribute)
    }
}

/// Result of a search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchResult {
    /// Entries returned by the server.
    pub entries: Vec<LdapEntry>,
    /// Referral URLs returned alongside the entries.
    pub referrals: Vec<String>,
}

impl SearchResult {
    /// Number of returned entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no entries were returned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// LDAP modification request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DirectoryModification {
    /// Add attribute values.
    Add {
        /// Attribute to modify.
        attribute: String,
        /// Values to add.
        values: Vec<String>,
    },
    /// Delete attribute values.
    Delete {
        /// Attribute to modify.
        attribute: String,
        /// Values to delete (empty removes attribute).
        values: Vec<String>,
    },
    /// Replace attribute values.
    Replace {
        /// Attribute to modify.
        attribute: String,
        /// Replacement values (empty removes attribute).
        values: Vec<String>,
    },
}

impl DirectoryModification {
    /// Builds a replace modification.
    #[must_use]
    pub fn replace(attribute: impl Into<String>, values: &[&str]) -> Self {
        Self::Replace {
            attribute: attribute.into(),
            values: values.iter().map(|value| (*value).to_string()).collect(),
        }
    }

    /// Attribute targeted by the modification.
    #[must_use]
    pub fn attribute(&self) -> &str {
        match self {
            Self::Add { attribute, .. }
            | Self::Delete { attribute, .. }
            | Self::Replace { attribute, .. } => attribute,
        }
    }
}

/// Escapes a value for use inside a search filter (RFC 4515).
#[must_use]
pub fn escape_filter_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '*' => escaped.push_str("\\2a"),
            '(' => escaped.push_str("\\28"),
            ')' => escaped.push_str("\\29"),
            '\\' => escaped.push_str("\\5c"),
            '\0' => escaped.push_str("\\00"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
