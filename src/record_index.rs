// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Point-in-time view of a zone's address records.
//!
//! The index is built from a fresh listing at the start of every reconciliation
//! and never outlives it. Lookups enforce the invariants the naming convention
//! guarantees: one record per hostname, one record per address, one value per
//! record.

use crate::errors::RecordIndexViolation;
use crate::types::AddressRecord;
use regex::Regex;
use std::net::IpAddr;

/// Snapshot of a zone's address records with by-name, by-address and by-pattern views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordIndex {
    domain: String,
    records: Vec<AddressRecord>,
}

impl RecordIndex {
    /// Build an index over the records of the zone named `domain`.
    pub fn new(domain: impl Into<String>, records: Vec<AddressRecord>) -> Self {
        let domain = domain.into().trim_end_matches('.').to_string();
        Self { domain, records }
    }

    /// Zone domain name, without trailing dot
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    #[must_use]
    pub fn records(&self) -> &[AddressRecord] {
        &self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Host label of a record relative to this zone
    #[must_use]
    pub fn host_label<'a>(&self, record: &'a AddressRecord) -> &'a str {
        record.host_label(&self.domain)
    }

    /// Host labels of every record, in listing order
    #[must_use]
    pub fn host_labels(&self) -> Vec<&str> {
        self.records.iter().map(|r| self.host_label(r)).collect()
    }

    /// Record whose host label equals `hostname` exactly.
    ///
    /// # Errors
    ///
    /// Returns [`RecordIndexViolation::MultipleNameMatches`] if more than one record matches.
    pub fn by_hostname(
        &self,
        hostname: &str,
    ) -> Result<Option<&AddressRecord>, RecordIndexViolation> {
        let matches: Vec<&AddressRecord> = self
            .records
            .iter()
            .filter(|r| self.host_label(r) == hostname)
            .collect();

        match matches.as_slice() {
            [] => Ok(None),
            [record] => Ok(Some(*record)),
            _ => Err(RecordIndexViolation::MultipleNameMatches {
                domain: self.domain.clone(),
                hostname: hostname.to_string(),
                count: matches.len(),
            }),
        }
    }

    /// Record that carries `address` among its values.
    ///
    /// # Errors
    ///
    /// Returns [`RecordIndexViolation::MultipleAddressMatches`] if more than one record
    /// carries the address, or [`RecordIndexViolation::UnexpectedMultiValue`] if the
    /// single match carries other values as well.
    pub fn by_address(
        &self,
        address: IpAddr,
    ) -> Result<Option<&AddressRecord>, RecordIndexViolation> {
        let matches: Vec<&AddressRecord> = self
            .records
            .iter()
            .filter(|r| r.values.contains(&address))
            .collect();

        match matches.as_slice() {
            [] => Ok(None),
            [record] if record.values.len() > 1 => {
                let extra: Vec<String> = record
                    .values
                    .iter()
                    .filter(|v| **v != address)
                    .map(ToString::to_string)
                    .collect();
                Err(RecordIndexViolation::UnexpectedMultiValue {
                    name: record.name.clone(),
                    address,
                    extra: extra.join(", "),
                })
            }
            [record] => Ok(Some(*record)),
            _ => {
                let names: Vec<&str> = matches.iter().map(|r| r.name.as_str()).collect();
                Err(RecordIndexViolation::MultipleAddressMatches {
                    domain: self.domain.clone(),
                    address,
                    names: names.join(", "),
                })
            }
        }
    }

    /// Records whose host label matches `pattern`.
    #[must_use]
    pub fn matching_pattern(&self, pattern: &Regex) -> Vec<&AddressRecord> {
        self.records
            .iter()
            .filter(|r| pattern.is_match(self.host_label(r)))
            .collect()
    }

    /// A new index restricted to the records matching `pattern`.
    #[must_use]
    pub fn narrowed(&self, pattern: &Regex) -> Self {
        Self {
            domain: self.domain.clone(),
            records: self.matching_pattern(pattern).into_iter().cloned().collect(),
        }
    }
}

#[cfg(test)]
#[path = "record_index_tests.rs"]
mod record_index_tests;
