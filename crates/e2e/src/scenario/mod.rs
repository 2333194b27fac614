//! The catalog scenarios
//!
//! Every test case logs in, opens the catalog (capturing the baseline
//! total) and then runs its own body against that context.

pub mod auth;
pub mod catalog;
pub mod export;
pub mod filters;
pub mod products;
pub mod search;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{E2eError, E2eResult};
use crate::session::Session;

pub use catalog::CatalogContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scenario {
    InteractWithProducts,
    InteractWithFilters,
    SearchInCatalog,
    ExportProduct,
}

impl Scenario {
    pub const ALL: [Scenario; 4] = [
        Scenario::InteractWithProducts,
        Scenario::InteractWithFilters,
        Scenario::SearchInCatalog,
        Scenario::ExportProduct,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Scenario::InteractWithProducts => "interact-with-products",
            Scenario::InteractWithFilters => "interact-with-filters",
            Scenario::SearchInCatalog => "search-in-catalog",
            Scenario::ExportProduct => "export-product",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Scenario::InteractWithProducts => "Select, unselect and open products",
            Scenario::InteractWithFilters => "Narrow the catalog with filters and clear them",
            Scenario::SearchInCatalog => "Search by reference and by free text",
            Scenario::ExportProduct => "Open and dismiss the product export modal",
        }
    }

    /// Log in, open the catalog, then run the scenario body
    pub async fn execute(self, session: &mut Session<'_>) -> E2eResult<()> {
        auth::login(session).await?;
        let context = catalog::open_catalog(session).await?;

        match self {
            Scenario::InteractWithProducts => products::interact_with_products(session, &context).await?,
            Scenario::InteractWithFilters => filters::interact_with_filters(session, &context).await?,
            Scenario::SearchInCatalog => search::search_in_catalog(session).await?,
            Scenario::ExportProduct => export::export_product(session).await?,
        }

        info!(scenario = self.name(), "scenario passed");
        Ok(())
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Scenario {
    type Err = E2eError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Scenario::ALL
            .into_iter()
            .find(|scenario| scenario.name() == s)
            .ok_or_else(|| E2eError::UnknownScenario(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for scenario in Scenario::ALL {
            assert_eq!(scenario.name().parse::<Scenario>().unwrap(), scenario);
        }
    }

    #[test]
    fn test_unknown_name() {
        let err = "delete-everything".parse::<Scenario>().unwrap_err();
        assert!(matches!(err, E2eError::UnknownScenario(name) if name == "delete-everything"));
    }

    #[test]
    fn test_serde_names_match_cli_names() {
        let json = serde_json::to_string(&Scenario::SearchInCatalog).unwrap();
        assert_eq!(json, "\"search-in-catalog\"");
    }
}
