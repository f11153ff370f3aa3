use std::collections::BTreeSet;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::models::OpportunityRecord;

pub const ALL: &str = "All";

/// An equality predicate on one field. `All` places no restriction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Selection {
    #[default]
    All,
    Only(String),
}

impl Selection {
    pub fn matches(&self, value: Option<&str>) -> bool {
        match self {
            Selection::All => true,
            Selection::Only(wanted) => value == Some(wanted.as_str()),
        }
    }
}

impl FromStr for Selection {
    type Err = Infallible;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(if value == ALL {
            Selection::All
        } else {
            Selection::Only(value.to_string())
        })
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::All => f.write_str(ALL),
            Selection::Only(value) => f.write_str(value),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    pub category: Selection,
    pub borough: Selection,
}

impl Filter {
    pub fn matches(&self, record: &OpportunityRecord) -> bool {
        self.category.matches(record.category.as_deref())
            && self.borough.matches(record.borough.as_deref())
    }

    pub fn apply<'a>(&self, records: &'a [OpportunityRecord]) -> Vec<&'a OpportunityRecord> {
        records.iter().filter(|record| self.matches(record)).collect()
    }

    pub fn is_unrestricted(&self) -> bool {
        self.category == Selection::All && self.borough == Selection::All
    }
}

/// Distinct values offered by the category and borough pickers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
    pub categories: Vec<String>,
    pub boroughs: Vec<String>,
}

impl FilterOptions {
    pub fn collect(records: &[OpportunityRecord]) -> Self {
        let mut categories = BTreeSet::new();
        let mut boroughs = BTreeSet::new();

        for record in records {
            if let Some(category) = &record.category {
                categories.insert(category.clone());
            }
            if let Some(borough) = &record.borough {
                boroughs.insert(borough.clone());
            }
        }

        Self {
            categories: categories.into_iter().collect(),
            boroughs: boroughs.into_iter().collect(),
        }
    }
}
