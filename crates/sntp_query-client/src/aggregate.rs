// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Combining endpoint outcomes into the result of a whole query.

use crate::error::QueryResult;

/// Running summary of the endpoints finished so far.
///
/// Keeps the most specific failure regardless of the order failures arrive in. Successes
/// only mark the query as successful; they never enter the failure ranking.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Aggregate {
    worst: Option<QueryResult>,
    succeeded: bool,
}

impl Aggregate {
    /// An empty aggregate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold in one endpoint's result.
    pub fn record(&mut self, result: QueryResult) {
        if result.is_success() {
            self.succeeded = true;
            return;
        }
        self.worst = Some(match self.worst {
            Some(w) => w.most_specific(result),
            None => result,
        });
    }

    /// Whether any endpoint succeeded.
    pub fn succeeded(&self) -> bool {
        self.succeeded
    }

    /// The most specific failure recorded, if any.
    pub fn most_specific_failure(&self) -> Option<QueryResult> {
        self.worst
    }

    /// The failure to report for the query, or `None` if an endpoint succeeded.
    ///
    /// With nothing recorded at all there is no server to blame, so this is `Internal`.
    pub fn final_failure(&self) -> Option<QueryResult> {
        if self.succeeded {
            None
        } else {
            Some(self.most_specific_failure().unwrap_or(QueryResult::Internal))
        }
    }

    /// The overall result: `Success` if any endpoint succeeded, else the final failure.
    pub fn overall(&self) -> QueryResult {
        self.final_failure().unwrap_or(QueryResult::Success)
    }
}
