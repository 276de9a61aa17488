//! Route → endpoint airport resolution.
//!
//! Route keys are plain strings, so one key can in principle show up with
//! different airport pairs. The map keeps the first complete pair seen for
//! each route (or, failing that, the first pair with the most codes present)
//! and counts the routes that were observed with a conflicting complete pair.

use crate::market::types::FlightRecord;
use std::collections::{BTreeSet, HashMap};
use tracing::warn;

/// Origin and destination airport codes of a route. `None` means unresolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Endpoints {
    pub from: Option<String>,
    pub to: Option<String>,
}

impl Endpoints {
    fn of(record: &FlightRecord) -> Self {
        let code = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        Self {
            from: code(&record.from_airport),
            to: code(&record.to_airport),
        }
    }

    fn known(&self) -> usize {
        usize::from(self.from.is_some()) + usize::from(self.to.is_some())
    }

    pub fn is_complete(&self) -> bool {
        self.known() == 2
    }
}

#[derive(Debug, Default)]
pub struct RouteEndpointMap {
    routes: HashMap<String, Endpoints>,
    ambiguous: BTreeSet<String>,
}

impl RouteEndpointMap {
    #[tracing::instrument(skip_all, fields(records = records.len()))]
    pub fn build(records: &[FlightRecord]) -> Self {
        let mut map = Self::default();

        for record in records {
            let Some(route) = record.route() else {
                continue;
            };
            let candidate = Endpoints::of(record);

            match map.routes.get_mut(route) {
                None => {
                    map.routes.insert(route.to_string(), candidate);
                }
                Some(current) => {
                    if candidate.known() > current.known() {
                        *current = candidate;
                    } else if current.is_complete()
                        && candidate.is_complete()
                        && *current != candidate
                    {
                        map.ambiguous.insert(route.to_string());
                    }
                }
            }
        }

        if !map.ambiguous.is_empty() {
            warn!(
                routes = map.ambiguous.len(),
                first = map.ambiguous.iter().next().map(String::as_str),
                "Routes observed with more than one airport pair; keeping the first pair seen"
            );
        }
        map
    }

    pub fn get(&self, route: &str) -> Option<&Endpoints> {
        self.routes.get(route)
    }

    pub fn origin(&self, route: &str) -> Option<&str> {
        self.get(route).and_then(|e| e.from.as_deref())
    }

    pub fn destination(&self, route: &str) -> Option<&str> {
        self.get(route).and_then(|e| e.to.as_deref())
    }

    pub fn ambiguous_routes(&self) -> impl Iterator<Item = &str> {
        self.ambiguous.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
