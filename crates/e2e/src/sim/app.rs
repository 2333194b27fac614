//! Catalog application state behind the selector contract

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;
use tokio::time::Instant;

use super::dataset::{format_total, Product, Status};
use super::SimOptions;
use crate::page::Target;
use crate::selectors::*;

const EXPORT_ACTIONS: [&str; 2] = ["Export fiche produit", "Export catalogue complet"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum Route {
    Blank,
    Login,
    Catalog,
    Product(usize),
}

/// Query behind the listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub(crate) struct Listing {
    draft_only: bool,
    packshot: Option<bool>,
    query: String,
}

impl Listing {
    fn has_filters(&self) -> bool {
        self.draft_only || self.packshot.is_some()
    }
}

#[derive(Debug)]
enum Completion {
    Login { accepted: bool },
    Listing(Listing),
    Product,
}

#[derive(Debug)]
struct Pending {
    deadline: Instant,
    completion: Completion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Field {
    Username,
    Password,
    Search,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Action {
    None,
    Submit,
    DismissOverlay,
    ToggleSelectAll,
    OpenProduct(usize),
    ToggleRow(usize),
    ToggleDraft,
    TogglePackshotGroup,
    ApplyPackshot(bool),
    ClearFilters,
    ToggleDropdown,
    OpenExportModal,
    CloseModal,
}

/// A rendered element, detached from the state it was read from
#[derive(Debug, Clone)]
pub(crate) struct Element {
    pub text: String,
    pub field: Option<Field>,
    pub value: Option<String>,
    pub visible: bool,
    pub disabled: bool,
    pub action: Action,
}

impl Element {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            field: None,
            value: None,
            visible: true,
            disabled: false,
            action: Action::None,
        }
    }

    fn button(text: impl Into<String>, action: Action) -> Self {
        Self {
            action,
            ..Self::text(text)
        }
    }

    fn input(field: Field, value: &str) -> Self {
        Self {
            field: Some(field),
            value: Some(value.to_string()),
            ..Self::text("")
        }
    }

    fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    fn visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }
}

/// What a failure dump records
#[derive(Debug, Serialize)]
pub(crate) struct Snapshot {
    route: Route,
    logged_in: bool,
    loading: bool,
    total: Option<String>,
    rows: usize,
    selected: usize,
    filters: Listing,
    overlay_open: bool,
    export_modal_open: bool,
}

pub(crate) struct CatalogApp {
    options: SimOptions,
    products: Arc<Vec<Product>>,
    now: Instant,
    route: Route,
    username: String,
    password: String,
    search: String,
    submitted: bool,
    logged_in: bool,
    overlay_open: bool,
    overlay_shown: bool,
    shown: Option<Listing>,
    requested: Listing,
    pending: Option<Pending>,
    selected: BTreeSet<usize>,
    packshot_expanded: bool,
    dropdown_open: bool,
    export_modal_open: bool,
}

impl CatalogApp {
    pub fn new(options: SimOptions, products: Arc<Vec<Product>>) -> Self {
        let packshot_expanded = !options.packshot_collapsed;
        Self {
            options,
            products,
            now: Instant::now(),
            route: Route::Blank,
            username: String::new(),
            password: String::new(),
            search: String::new(),
            submitted: false,
            logged_in: false,
            overlay_open: false,
            overlay_shown: false,
            shown: None,
            requested: Listing::default(),
            pending: None,
            selected: BTreeSet::new(),
            packshot_expanded,
            dropdown_open: false,
            export_modal_open: false,
        }
    }

    #[cfg(test)]
    pub fn force_login(&mut self) {
        self.logged_in = true;
    }

    /// Advance the clock, applying a fetch whose latency has elapsed
    pub fn settle(&mut self, now: Instant) {
        self.now = now;
        let due = matches!(&self.pending, Some(p) if p.deadline <= now);
        if !due {
            return;
        }
        if let Some(pending) = self.pending.take() {
            match pending.completion {
                Completion::Login { accepted } => {
                    if accepted {
                        self.logged_in = true;
                    } else {
                        self.submitted = false;
                    }
                }
                Completion::Listing(listing) => {
                    if self.shown.as_ref() != Some(&listing) {
                        self.selected.clear();
                    }
                    self.shown = Some(listing);
                }
                Completion::Product => {}
            }
        }
    }

    fn start(&mut self, completion: Completion) {
        self.pending = Some(Pending {
            deadline: self.now + self.options.fetch_latency,
            completion,
        });
    }

    fn refetch(&mut self) {
        self.dropdown_open = false;
        let listing = self.requested.clone();
        self.start(Completion::Listing(listing));
    }

    fn is_fetching(&self) -> bool {
        matches!(
            &self.pending,
            Some(Pending {
                completion: Completion::Listing(_) | Completion::Product,
                ..
            })
        )
    }

    pub fn navigate(&mut self, route: &str) {
        self.pending = None;
        self.dropdown_open = false;
        self.export_modal_open = false;
        self.overlay_open = false;

        match route {
            CATALOG_ROUTE if self.logged_in => {
                self.route = Route::Catalog;
                if self.options.confirm_overlay && !self.overlay_shown {
                    self.overlay_open = true;
                    self.overlay_shown = true;
                }
                self.shown = None;
                self.requested = Listing::default();
                self.search.clear();
                self.selected.clear();
                self.packshot_expanded = !self.options.packshot_collapsed;
                self.refetch();
            }
            // unauthenticated visits land on the login form
            LOGIN_ROUTE | CATALOG_ROUTE => {
                self.route = Route::Login;
                self.username.clear();
                self.password.clear();
                self.submitted = false;
            }
            _ => self.route = Route::Blank,
        }
    }

    pub fn fill(&mut self, field: Field, value: &str) {
        match field {
            Field::Username => self.username = value.to_string(),
            Field::Password => self.password = value.to_string(),
            Field::Search => {
                self.search = value.to_string();
                self.requested.query = value.trim().to_string();
                self.refetch();
            }
        }
    }

    pub fn perform(&mut self, action: Action) {
        match action {
            Action::None => {}
            Action::Submit => {
                self.submitted = true;
                let accepted = self.username == self.options.credentials.username
                    && self.password == self.options.credentials.password;
                self.start(Completion::Login { accepted });
            }
            Action::DismissOverlay => self.overlay_open = false,
            Action::ToggleSelectAll => {
                let rows = self.page_rows();
                let all_selected = !rows.is_empty() && rows.iter().all(|i| self.selected.contains(i));
                if all_selected {
                    for i in &rows {
                        self.selected.remove(i);
                    }
                } else {
                    self.selected.extend(rows);
                }
            }
            Action::OpenProduct(index) => {
                self.route = Route::Product(index);
                self.dropdown_open = false;
                self.start(Completion::Product);
            }
            Action::ToggleRow(index) => {
                if !self.selected.remove(&index) {
                    self.selected.insert(index);
                }
            }
            Action::ToggleDraft => {
                self.requested.draft_only = !self.requested.draft_only;
                self.refetch();
            }
            Action::TogglePackshotGroup => self.packshot_expanded = !self.packshot_expanded,
            Action::ApplyPackshot(with_packshot) => {
                self.requested.packshot = Some(with_packshot);
                self.refetch();
            }
            Action::ClearFilters => {
                if self.options.clear_filters_restores {
                    self.requested.draft_only = false;
                }
                self.requested.packshot = None;
                self.refetch();
            }
            Action::ToggleDropdown => self.dropdown_open = !self.dropdown_open,
            Action::OpenExportModal => {
                self.dropdown_open = false;
                if !self.selected.is_empty() {
                    self.export_modal_open = true;
                }
            }
            Action::CloseModal => {
                if self.options.close_hides_modal {
                    self.export_modal_open = false;
                }
            }
        }
    }

    fn matches_query(&self, product: &Product, query: &str) -> bool {
        if self.options.case_insensitive_search {
            let query = query.to_lowercase();
            product.gtin.contains(&query) || product.name.to_lowercase().contains(&query)
        } else {
            product.gtin.contains(query) || product.name.contains(query)
        }
    }

    fn results(&self, listing: &Listing) -> Vec<usize> {
        let draft_only = listing.draft_only && self.options.status_filter_effective;
        let packshot = listing.packshot.filter(|_| self.options.packshot_filter_effective);
        self.products
            .iter()
            .enumerate()
            .filter(|(_, p)| !draft_only || p.status == Status::Draft)
            .filter(|(_, p)| packshot.map_or(true, |wanted| p.has_packshot == wanted))
            .filter(|(_, p)| listing.query.is_empty() || self.matches_query(p, &listing.query))
            .map(|(i, _)| i)
            .collect()
    }

    fn page_rows(&self) -> Vec<usize> {
        match (&self.route, &self.shown) {
            (Route::Catalog, Some(listing)) => self
                .results(listing)
                .into_iter()
                .take(self.options.page_size)
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn elements(&self, target: &Target) -> Vec<Element> {
        match target {
            Target::Css(css) => self.css_elements(css),
            Target::Text(text) => self.text_elements(text),
        }
    }

    fn text_elements(&self, text: &str) -> Vec<Element> {
        if !self.dropdown_open {
            return Vec::new();
        }
        let needle = text.to_lowercase();
        EXPORT_ACTIONS
            .iter()
            .filter(|label| label.to_lowercase().contains(&needle))
            .map(|label| Element::button(*label, Action::OpenExportModal))
            .collect()
    }

    fn css_elements(&self, css: &str) -> Vec<Element> {
        let on_login = self.route == Route::Login;
        match css {
            USERNAME_INPUT if on_login => vec![Element::input(Field::Username, &self.username)],
            PASSWORD_INPUT if on_login => vec![Element::input(Field::Password, &self.password)],
            SUBMIT_BUTTON if on_login => {
                vec![Element::button("Se connecter", Action::Submit).disabled(self.submitted)]
            }
            NAVBAR if self.logged_in => vec![Element::text("Catalogue")],
            CONFIRM_MODAL if self.overlay_open => {
                vec![Element::button("Confirmer", Action::DismissOverlay)]
            }
            LOADER if self.is_fetching() => vec![Element::text("")],
            PRODUCT_FOOTER => match self.route {
                Route::Product(index) if !self.is_fetching() => {
                    vec![Element::text(format!("Produit {}", self.products[index].gtin))]
                }
                _ => Vec::new(),
            },
            _ if self.route == Route::Catalog && self.logged_in => self.listing_elements(css),
            _ => Vec::new(),
        }
    }

    fn listing_elements(&self, css: &str) -> Vec<Element> {
        let rows = self.page_rows();
        let products = &self.products;

        match css {
            TABLE_ROW => rows.iter().map(|i| Element::text(&products[*i].name)).collect(),
            SELECTED_ROW => rows
                .iter()
                .filter(|i| self.selected.contains(*i))
                .map(|i| Element::text(&products[*i].name))
                .collect(),
            TOTAL_LABEL => match &self.shown {
                Some(_) if self.options.selection_changes_total && !self.selected.is_empty() => {
                    vec![Element::text(format_total(self.selected.len()))]
                }
                Some(listing) => vec![Element::text(format_total(self.results(listing).len()))],
                None => Vec::new(),
            },
            SELECT_ALL => vec![Element::button("", Action::ToggleSelectAll)],
            ROW_LINK => rows
                .iter()
                .map(|i| Element::button(&products[*i].name, Action::OpenProduct(*i)))
                .collect(),
            ROW_CHECKBOX => rows
                .iter()
                .map(|i| Element::button("", Action::ToggleRow(*i)))
                .collect(),
            PRODUCT_REFERENCE | GTIN_CELL => {
                rows.iter().map(|i| Element::text(&products[*i].gtin)).collect()
            }
            NAME_CELL => rows.iter().map(|i| Element::text(&products[*i].name)).collect(),
            STATUS_FILTER_DRAFT => vec![Element::button("Brouillon", Action::ToggleDraft)],
            PACKSHOT_COLLAPSED if !self.packshot_expanded => vec![Element::text("")],
            PACKSHOT_TOGGLE => vec![Element::button("Packshot", Action::TogglePackshotGroup)],
            PACKSHOT_OPTION => vec![
                Element::button("Avec packshot", Action::ApplyPackshot(true))
                    .visible(self.packshot_expanded),
                Element::button("Sans packshot", Action::ApplyPackshot(false))
                    .visible(self.packshot_expanded),
            ],
            FILTER_REMOVE if self.requested.has_filters() => {
                vec![Element::button("", Action::ClearFilters)]
            }
            SEARCH_INPUT => vec![Element::input(Field::Search, &self.search)],
            DROPDOWN_BUTTON => vec![Element::button(
                format!("Exporter {}", self.selected.len()),
                Action::ToggleDropdown,
            )
            .disabled(self.selected.is_empty())],
            EXPORT_FORMAT_SELECTOR if self.export_modal_open => vec![Element::text("PDF")],
            MODAL_CLOSE if self.export_modal_open => {
                vec![Element::button("Fermer", Action::CloseModal)]
            }
            _ => Vec::new(),
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            route: self.route,
            logged_in: self.logged_in,
            loading: self.is_fetching(),
            total: self
                .shown
                .as_ref()
                .map(|listing| format_total(self.results(listing).len())),
            rows: self.page_rows().len(),
            selected: self.selected.len(),
            filters: self.requested.clone(),
            overlay_open: self.overlay_open,
            export_modal_open: self.export_modal_open,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::dataset::generate_catalog;
    use std::time::Duration;

    fn app(options: SimOptions) -> CatalogApp {
        let products = Arc::new(generate_catalog(options.products));
        let mut app = CatalogApp::new(options, products);
        app.force_login();
        app
    }

    fn css(app: &CatalogApp, selector: &str) -> Vec<Element> {
        app.elements(&Target::Css(selector.to_string()))
    }

    fn loaded_catalog(options: SimOptions) -> CatalogApp {
        let mut app = app(options);
        app.navigate(CATALOG_ROUTE);
        let later = app.now + Duration::from_secs(1);
        app.settle(later);
        app
    }

    fn total(app: &CatalogApp) -> String {
        css(app, TOTAL_LABEL)[0].text.clone()
    }

    fn settle_later(app: &mut CatalogApp) {
        let later = app.now + Duration::from_secs(1);
        app.settle(later);
    }

    #[test]
    fn test_fetch_keeps_previous_listing_until_due() {
        let mut app = loaded_catalog(SimOptions::default());
        assert_eq!(total(&app), "1,204 résultats");
        assert!(css(&app, LOADER).is_empty());

        app.perform(Action::ToggleDraft);
        assert_eq!(css(&app, LOADER).len(), 1);
        assert_eq!(total(&app), "1,204 résultats");

        settle_later(&mut app);
        assert!(css(&app, LOADER).is_empty());
        assert_eq!(total(&app), "301 résultats");
    }

    #[test]
    fn test_filters_narrow_then_clear() {
        let mut app = loaded_catalog(SimOptions::default());
        app.perform(Action::ToggleDraft);
        settle_later(&mut app);
        app.perform(Action::ApplyPackshot(true));
        settle_later(&mut app);
        assert_eq!(total(&app), "200 résultats");

        app.perform(Action::ClearFilters);
        settle_later(&mut app);
        assert_eq!(total(&app), "1,204 résultats");
        assert!(css(&app, FILTER_REMOVE).is_empty());
    }

    #[test]
    fn test_partial_clear_keeps_status_filter() {
        let mut app = loaded_catalog(SimOptions {
            clear_filters_restores: false,
            ..SimOptions::default()
        });
        app.perform(Action::ToggleDraft);
        settle_later(&mut app);
        app.perform(Action::ApplyPackshot(true));
        settle_later(&mut app);

        app.perform(Action::ClearFilters);
        settle_later(&mut app);
        assert_eq!(total(&app), "301 résultats");
    }

    #[test]
    fn test_ineffective_packshot_filter() {
        let mut app = loaded_catalog(SimOptions {
            packshot_filter_effective: false,
            ..SimOptions::default()
        });
        app.perform(Action::ToggleDraft);
        settle_later(&mut app);
        app.perform(Action::ApplyPackshot(true));
        assert_eq!(css(&app, LOADER).len(), 1);
        settle_later(&mut app);
        assert_eq!(total(&app), "301 résultats");
    }

    #[test]
    fn test_select_all_toggles_page() {
        let mut app = loaded_catalog(SimOptions::default());
        app.perform(Action::ToggleSelectAll);
        assert_eq!(css(&app, SELECTED_ROW).len(), 20);
        app.perform(Action::ToggleSelectAll);
        assert!(css(&app, SELECTED_ROW).is_empty());
    }

    #[test]
    fn test_search_matches_name_case_sensitively() {
        let mut app = loaded_catalog(SimOptions::default());
        app.fill(Field::Search, "KAT");
        settle_later(&mut app);
        let names: Vec<String> = css(&app, NAME_CELL).into_iter().map(|e| e.text).collect();
        assert_eq!(names.len(), 20);
        assert!(names.iter().all(|n| n.contains("KAT")));
    }

    #[test]
    fn test_failed_login_reenables_submit() {
        let products = Arc::new(generate_catalog(10));
        let mut app = CatalogApp::new(SimOptions::default(), products);
        app.navigate(LOGIN_ROUTE);
        app.fill(Field::Username, "intruder");
        app.perform(Action::Submit);
        assert!(css(&app, SUBMIT_BUTTON)[0].disabled);

        settle_later(&mut app);
        assert!(!css(&app, SUBMIT_BUTTON)[0].disabled);
        assert!(css(&app, NAVBAR).is_empty());
    }

    #[test]
    fn test_catalog_requires_login() {
        let products = Arc::new(generate_catalog(10));
        let mut app = CatalogApp::new(SimOptions::default(), products);
        app.navigate(CATALOG_ROUTE);
        assert_eq!(app.route, Route::Login);
        assert!(css(&app, TABLE_ROW).is_empty());
    }

    #[test]
    fn test_export_modal_needs_selection() {
        let mut app = loaded_catalog(SimOptions::default());
        app.perform(Action::OpenExportModal);
        assert!(css(&app, MODAL_CLOSE).is_empty());

        app.perform(Action::ToggleRow(0));
        assert_eq!(css(&app, DROPDOWN_BUTTON)[0].text, "Exporter 1");
        app.perform(Action::ToggleDropdown);
        assert_eq!(app.elements(&Target::Text("export fiche".to_string())).len(), 1);
        app.perform(Action::OpenExportModal);
        assert_eq!(css(&app, EXPORT_FORMAT_SELECTOR).len(), 1);
        app.perform(Action::CloseModal);
        assert!(css(&app, MODAL_CLOSE).is_empty());
    }
}
