//! Thin query layer over `scraper`.
//!
//! A [`Document`] is parsed, queried and dropped inside synchronous code; it is
//! never held across an `.await`.

use scraper::{ElementRef, Html, Selector};

pub struct Document {
    html: Html,
}

impl Document {
    pub fn parse(markup: &str) -> Self {
        Self {
            html: Html::parse_document(markup),
        }
    }

    /// All elements matching `selector`, in document order.
    pub fn find_all<'a>(&'a self, selector: &'a Selector) -> impl Iterator<Item = ElementRef<'a>> + 'a {
        self.html.select(selector)
    }

    /// First element matching `selector` whose `attr` equals `value`.
    pub fn find_first<'a>(
        &'a self,
        selector: &Selector,
        attr: &str,
        value: &str,
    ) -> Option<ElementRef<'a>> {
        self.html
            .select(selector)
            .find(|element| element.value().attr(attr) == Some(value))
    }

    /// First element after `marker` in document order that matches `selector`
    /// and satisfies `predicate`. Descendants of `marker` count as "after".
    pub fn find_next_after<'a, P>(
        &'a self,
        marker: ElementRef<'a>,
        selector: &Selector,
        predicate: P,
    ) -> Option<ElementRef<'a>>
    where
        P: Fn(&ElementRef<'a>) -> bool,
    {
        let marker_id = marker.id();
        self.html
            .root_element()
            .descendants()
            .skip_while(|node| node.id() != marker_id)
            .skip(1)
            .filter_map(ElementRef::wrap)
            .find(|element| selector.matches(element) && predicate(element))
    }
}

/// First descendant of `scope` matching `selector`.
pub fn first_within<'a>(scope: &ElementRef<'a>, selector: &Selector) -> Option<ElementRef<'a>> {
    scope.select(selector).next()
}

pub fn attr<'a>(element: &ElementRef<'a>, name: &str) -> Option<&'a str> {
    element.value().attr(name)
}

/// Concatenated text content, trimmed.
pub fn text(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MARKUP: &str = r#"
        <html><body>
            <a id="first" title="Before">before</a>
            <a id="artists">Artists</a>
            <div>
                <a title="Wanted" href="/one">  one <small> Someone </small></a>
                <a title="Wanted" href="/two">two</a>
            </div>
        </body></html>
    "#;

    #[test]
    fn test_find_first_by_attribute() {
        let doc = Document::parse(MARKUP);
        let anchors = Selector::parse("a").unwrap();
        let marker = doc.find_first(&anchors, "id", "artists").unwrap();
        assert_eq!(text(&marker), "Artists");
        assert!(doc.find_first(&anchors, "id", "missing").is_none());
    }

    #[test]
    fn test_find_next_after_skips_earlier_elements() {
        let doc = Document::parse(MARKUP);
        let anchors = Selector::parse("a").unwrap();
        let marker = doc.find_first(&anchors, "id", "artists").unwrap();

        let found = doc
            .find_next_after(marker, &anchors, |el| attr(el, "title") == Some("Wanted"))
            .unwrap();
        assert_eq!(attr(&found, "href"), Some("/one"));

        let before = doc.find_next_after(marker, &anchors, |el| attr(el, "title") == Some("Before"));
        assert!(before.is_none());
    }

    #[test]
    fn test_text_is_trimmed_and_scoped_search() {
        let doc = Document::parse(MARKUP);
        let anchors = Selector::parse("a").unwrap();
        let small = Selector::parse("small").unwrap();
        let entry = doc.find_first(&anchors, "href", "/one").unwrap();

        assert_eq!(text(&first_within(&entry, &small).unwrap()), "Someone");
        assert_eq!(text(&entry), "one  Someone");
    }

    #[test]
    fn test_find_all_in_document_order() {
        let doc = Document::parse(MARKUP);
        let anchors = Selector::parse("a").unwrap();
        let ids: Vec<_> = doc
            .find_all(&anchors)
            .filter_map(|el| attr(&el, "id"))
            .collect();
        assert_eq!(ids, vec!["first", "artists"]);
    }
}
