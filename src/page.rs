//! The page a feed is rendered into.
//!
//! [`FeedPage`] resolves the page's fixed elements once (feed container,
//! empty-state container, card template) and is passed to the renderer
//! explicitly. Changes are recorded on the page and applied when it is
//! written back out with [`FeedPage::to_html`].

use crate::dom;
use crate::template::{Card, CardTemplate};
use crate::{Error, Result};
use scraper::{ElementRef, Html, Selector};

/// Selectors of the page's fixed elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSelectors {
    pub feed: String,
    pub empty: String,
    pub template: String,
}

impl Default for PageSelectors {
    fn default() -> Self {
        Self {
            feed: "#feed".to_string(),
            empty: "#empty".to_string(),
            template: r#"script[type="text/template"]"#.to_string(),
        }
    }
}

/// Class that hides a container.
pub const HIDDEN_CLASS: &str = "hidden";

#[derive(Debug)]
pub struct FeedPage {
    source: String,
    feed_selector: Selector,
    empty_selector: Selector,
    template: CardTemplate,
    feed_hidden: bool,
    empty_hidden: bool,
    cards: Option<Vec<Card>>,
}

impl FeedPage {
    /// Parse a page using the default selectors.
    pub fn parse(source: impl Into<String>) -> Result<Self> {
        Self::with_selectors(source, &PageSelectors::default())
    }

    pub fn with_selectors(source: impl Into<String>, selectors: &PageSelectors) -> Result<Self> {
        let source = source.into();
        let feed_selector = dom::selector(&selectors.feed)?;
        let empty_selector = dom::selector(&selectors.empty)?;
        let template_selector = dom::selector(&selectors.template)?;

        let doc = Html::parse_document(&source);
        let feed = doc
            .select(&feed_selector)
            .next()
            .ok_or_else(|| Error::TemplateError(format!("page has no '{}'", selectors.feed)))?;
        let empty = doc
            .select(&empty_selector)
            .next()
            .ok_or_else(|| Error::TemplateError(format!("page has no '{}'", selectors.empty)))?;
        let template_el = doc.select(&template_selector).next().ok_or_else(|| {
            Error::TemplateError(format!("page has no '{}'", selectors.template))
        })?;

        let markup = template_el.text().collect::<String>();
        let template = CardTemplate::parse(&markup)?;
        let feed_hidden = has_class(feed, HIDDEN_CLASS);
        let empty_hidden = has_class(empty, HIDDEN_CLASS);

        Ok(Self {
            source,
            feed_selector,
            empty_selector,
            template,
            feed_hidden,
            empty_hidden,
            cards: None,
        })
    }

    pub fn template(&self) -> &CardTemplate {
        &self.template
    }

    pub fn is_feed_visible(&self) -> bool {
        !self.feed_hidden
    }

    pub fn is_empty_visible(&self) -> bool {
        !self.empty_hidden
    }

    /// Cards placed by the last render, `None` if the feed was never replaced.
    pub fn cards(&self) -> Option<&[Card]> {
        self.cards.as_deref()
    }

    /// Hide the feed and show the empty-state placeholder.
    ///
    /// The feed's content is left as it was.
    pub fn show_empty_state(&mut self) {
        self.feed_hidden = true;
        self.empty_hidden = false;
    }

    /// Discard the feed's content and put `cards` in its place, all at once.
    pub fn replace_cards(&mut self, cards: Vec<Card>) {
        self.cards = Some(cards);
        self.feed_hidden = false;
        self.empty_hidden = true;
    }

    /// Markup of the feed container's content as it currently stands.
    pub fn feed_html(&self) -> String {
        let doc = self.build();
        doc.select(&self.feed_selector)
            .next()
            .map(|feed| feed.inner_html())
            .unwrap_or_default()
    }

    /// Serialize the whole page with every recorded change applied.
    pub fn to_html(&self) -> String {
        dom::write_document(&self.build())
    }

    /// Parse a fresh copy of the page and apply the recorded changes to it.
    fn build(&self) -> Html {
        let mut doc = Html::parse_document(&self.source);
        let feed = doc.select(&self.feed_selector).next().map(|el| el.id());
        let empty = doc.select(&self.empty_selector).next().map(|el| el.id());

        if let Some(feed) = feed {
            dom::toggle_class(&mut doc, feed, HIDDEN_CLASS, self.feed_hidden);
            if let Some(cards) = &self.cards {
                dom::clear_children(&mut doc, feed);
                for card in cards {
                    self.template.stamp_into(card, &mut doc, feed);
                }
            }
        }
        if let Some(empty) = empty {
            dom::toggle_class(&mut doc, empty, HIDDEN_CLASS, self.empty_hidden);
        }
        doc
    }
}

fn has_class(el: ElementRef<'_>, class: &str) -> bool {
    el.value().classes().any(|c| c == class)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::PillPlacement;

    const PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Feed</title></head>
<body>
<main id="feed" class="grid"><p class="loading">Loading…</p></main>
<section id="empty" class="hidden">Nothing to show</section>
<script type="text/template">
  <article class="card"><a class="card-link"><div class="thumb"><img alt=""><span class="pill"></span></div><div class="content"><h2 class="title"></h2><p class="desc"></p><div class="meta"></div></div></a></article>
</script>
</body>
</html>"#;

    fn card(title: &str) -> Card {
        Card {
            href: "https://example.com/".into(),
            title: title.into(),
            description: String::new(),
            brand: "example.com".into(),
            click_label: None,
            meta: "example.com".into(),
            image: None,
            thumb_hidden: true,
            pill: PillPlacement::Content,
        }
    }

    #[test]
    fn reads_initial_visibility() {
        let page = FeedPage::parse(PAGE).unwrap();
        assert!(page.is_feed_visible());
        assert!(!page.is_empty_visible());
        assert!(page.cards().is_none());
        assert!(page.template().markup().starts_with("<article"));
    }

    #[test]
    fn missing_elements_are_template_errors() {
        let no_feed = PAGE.replace(r#"id="feed""#, r#"id="other""#);
        assert!(matches!(FeedPage::parse(no_feed), Err(Error::TemplateError(_))));

        let no_template = PAGE.replace("text/template", "text/javascript");
        assert!(matches!(FeedPage::parse(no_template), Err(Error::TemplateError(_))));
    }

    #[test]
    fn empty_state_toggles_classes_and_keeps_feed_content() {
        let mut page = FeedPage::parse(PAGE).unwrap();
        page.show_empty_state();
        let html = page.to_html();
        let doc = Html::parse_document(&html);

        let feed = doc.select(&Selector::parse("#feed").unwrap()).next().unwrap();
        assert!(has_class(feed, "hidden"));
        assert!(has_class(feed, "grid"));
        let empty = doc.select(&Selector::parse("#empty").unwrap()).next().unwrap();
        assert!(!has_class(empty, "hidden"));
        assert!(page.feed_html().contains("Loading"));
        assert!(html.starts_with("<!DOCTYPE html>"));
    }

    #[test]
    fn replace_cards_discards_previous_content() {
        let mut page = FeedPage::parse(PAGE).unwrap();
        page.show_empty_state();
        page.replace_cards(vec![card("one"), card("two")]);
        assert!(page.is_feed_visible());
        assert!(!page.is_empty_visible());

        let html = page.to_html();
        let doc = Html::parse_document(&html);
        let cards = doc.select(&Selector::parse("#feed > article.card").unwrap()).count();
        assert_eq!(cards, 2);
        assert!(!page.feed_html().contains("Loading"));

        // The template stays intact for the next pass.
        let reparsed = FeedPage::parse(html).unwrap();
        assert_eq!(reparsed.template().markup(), page.template().markup());
    }

    #[test]
    fn markup_outside_the_feed_is_preserved() {
        let source = PAGE.replace(
            "<body>",
            r##"<body><!-- nav --><svg class="icons"><use xlink:href="#icon"></use></svg><p title="a &quot;b&quot;">x &amp; y</p>"##,
        );
        let mut page = FeedPage::parse(source.clone()).unwrap();
        page.replace_cards(vec![card("one")]);
        let html = page.to_html();

        assert!(html.contains(r##"<use xlink:href="#icon"></use>"##));
        assert!(html.contains("<!-- nav -->"));
        assert!(html.contains(r#"title="a &quot;b&quot;""#));
        assert!(html.contains("x &amp; y"));

        // Apart from the feed and the two toggled containers, the page is
        // written exactly as scraper serializes it.
        let original = Html::parse_document(&source);
        let svg = Selector::parse("svg").unwrap();
        assert_eq!(
            original.select(&svg).next().unwrap().html(),
            Html::parse_document(&html).select(&svg).next().unwrap().html()
        );
    }
}
