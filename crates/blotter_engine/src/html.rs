//! Small tree-walking helpers over `scraper` documents.

use scraper::ElementRef;

/// Elements named `tag` below `root` (inclusive), in document order.
pub(crate) fn descendants_named<'a>(
    root: ElementRef<'a>,
    tag: &'a str,
) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    root.descendants()
        .filter_map(ElementRef::wrap)
        .filter(move |element| element.value().name() == tag)
}

/// Direct children of `parent` named `tag`.
pub(crate) fn children_named<'a>(
    parent: ElementRef<'a>,
    tag: &'a str,
) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    parent
        .children()
        .filter_map(ElementRef::wrap)
        .filter(move |element| element.value().name() == tag)
}

pub(crate) fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect()
}
