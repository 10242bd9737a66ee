//! Result page classification
//!
//! A search page from the registry comes in one of a few shapes. This module
//! turns a fetched HTML document into a [`PageOutcome`] in a single step so the
//! crawl state machine never has to look at markup.

use crate::state::OVERFLOW_OFFSET;
use scraper::{ElementRef, Html, Selector};

/// Result list of a search listing
const LIST_SELECTOR: &str = "ul.list-group.aphia_core_list_group_hover";

/// Classification breadcrumb of a taxon detail page
const BREADCRUMB_SELECTOR: &str = "ol.aphia_core_breadcrumb-classification";

/// Species names are rendered in italics
const NAME_SELECTOR: &str = "i";

/// Shape of one fetched search page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    /// A page of the listing; more pages may follow
    ListPage(Vec<String>),

    /// The search narrowed to one taxon and was redirected to its detail page
    SingleResult(String),

    /// No result list on the page
    Empty,

    /// A result list at an offset past the pagination ceiling
    Overflow,
}

/// Classifies a fetched search page
///
/// # Decision Order
///
/// 1. Breadcrumb classification with a name → `SingleResult` (always wins)
/// 2. No result list → `Empty`
/// 3. Result list and `offset > 4900` → `Overflow`, whatever the list holds
/// 4. Result list → `ListPage` with every non-empty italic name in it
///
/// A result list whose rows all filter out still yields `ListPage(vec![])`,
/// so the crawl keeps paginating instead of treating the prefix as empty.
///
/// # Example
///
/// ```
/// use aphia_harvest::crawler::{classify_page, PageOutcome};
///
/// let html = r#"<ul class="list-group aphia_core_list_group_hover">
///     <li><i>Abra alba</i></li>
/// </ul>"#;
/// assert_eq!(
///     classify_page(html, 0),
///     PageOutcome::ListPage(vec!["Abra alba".to_string()])
/// );
/// ```
pub fn classify_page(html: &str, offset: u32) -> PageOutcome {
    let document = Html::parse_document(html);

    if let Some(name) = extract_redirected_name(&document) {
        return PageOutcome::SingleResult(name);
    }

    let Some(list) = select_first(&document, LIST_SELECTOR) else {
        return PageOutcome::Empty;
    };

    if offset > OVERFLOW_OFFSET {
        return PageOutcome::Overflow;
    }

    PageOutcome::ListPage(extract_names(list))
}

/// Last italic name inside the classification breadcrumb, if any
fn extract_redirected_name(document: &Html) -> Option<String> {
    let breadcrumb = select_first(document, BREADCRUMB_SELECTOR)?;
    let name_selector = Selector::parse(NAME_SELECTOR).ok()?;

    breadcrumb
        .select(&name_selector)
        .last()
        .map(normalised_text)
        .filter(|name| !name.is_empty())
}

/// All italic names inside a result list, skipping ones without any word
fn extract_names(list: ElementRef<'_>) -> Vec<String> {
    let Ok(name_selector) = Selector::parse(NAME_SELECTOR) else {
        return Vec::new();
    };

    list.select(&name_selector)
        .map(normalised_text)
        .filter(|name| name.split_whitespace().next().is_some())
        .collect()
}

fn select_first<'a>(document: &'a Html, selector: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(selector).ok()?;
    document.select(&selector).next()
}

/// Element text with surrounding whitespace trimmed and inner runs collapsed
fn normalised_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
