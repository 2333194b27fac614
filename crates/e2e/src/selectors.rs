//! Routes and DOM selectors exposed by the catalog application
//!
//! These strings are the contract between the suite and the UI. Both the
//! Playwright driver and the simulated catalog resolve elements through them.

pub const LOGIN_ROUTE: &str = "/#/login";
pub const CATALOG_ROUTE: &str = "/#/catalog/all";

// Login form
pub const USERNAME_INPUT: &str = "#username";
pub const PASSWORD_INPUT: &str = "#password";
pub const SUBMIT_BUTTON: &str = "#submit";
pub const NAVBAR: &str = ".navbar";

// Shared chrome
pub const CONFIRM_MODAL: &str = "[data-testid='Modal-confirm']";
pub const LOADER: &str = ".Loader";

// Listing
pub const TABLE_ROW: &str = ".ListTableRow";
pub const SELECTED_ROW: &str = ".ListTableRow--selected";
pub const TOTAL_LABEL: &str = ".ListPaginationInfo__total";
pub const SELECT_ALL: &str = "#list-actions-select-all";
pub const ROW_LINK: &str = ".CatalogCellActionWrapper--link";
pub const ROW_CHECKBOX: &str = "[id^='catalog-row-checkbox-']";
pub const PRODUCT_REFERENCE: &str = "[data-testid='ProductReference__copyWrapper']";
pub const GTIN_CELL: &str = "[data-code='GTIN']";
pub const NAME_CELL: &str = "[data-code='NAME']";

// Filters
pub const STATUS_FILTER_DRAFT: &str = ".SourceProductStatusFilter--DRAFT";
pub const PACKSHOT_COLLAPSED: &str = "#list-filter-packshot .ListCollapsibleFilter--collapsed";
pub const PACKSHOT_TOGGLE: &str = "#list-filter-packshot button";
pub const PACKSHOT_OPTION: &str = "#list-filter-packshot .ListSimpleFilterItem";
pub const FILTER_REMOVE: &str = ".ListSelectedFilters_remove";

// Search
pub const SEARCH_INPUT: &str = ".Search .Search__input";

// Product detail
pub const PRODUCT_FOOTER: &str = ".ProductFooter";

// Export
pub const DROPDOWN_BUTTON: &str = ".Dropdown__button";
pub const EXPORT_FORMAT_SELECTOR: &str = "#SimpleSelect-catalog-export-modal-format-selector";
pub const MODAL_CLOSE: &str = ".Modal__footerCloseButton";
