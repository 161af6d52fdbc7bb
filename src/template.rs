//! Card template stamping.
//!
//! A [`CardTemplate`] holds the card markup taken from the page's
//! `script[type="text/template"]`. Every [`Card`] is written from a fresh
//! parse of that markup, so the template itself is never modified.

use crate::dom;
use crate::image::{ImageLoadState, ImageLoader};
use crate::{Error, Result};
use ego_tree::NodeId;
use scraper::{ElementRef, Html, Selector};

/// Where the pill should end up relative to the thumbnail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PillPlacement {
    /// Leave it where the template puts it
    Template,
    /// Overlaid on the thumbnail (appended to `.thumb`)
    Thumb,
    /// In the text flow (first child of `.content`) if it was in `.thumb`
    Content,
}

/// Thumbnail of a card that has an image source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardImage {
    pub alt: String,
    pub loader: ImageLoader,
}

/// A populated card, ready to be written through the template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    pub href: String,
    pub title: String,
    pub description: String,
    pub brand: String,
    /// Grouped view count with suffix, shown after the brand in the pill
    pub click_label: Option<String>,
    /// Brand plus optional date
    pub meta: String,
    pub image: Option<CardImage>,
    pub thumb_hidden: bool,
    pub pill: PillPlacement,
}

impl Card {
    /// Text content of the pill as a browser would report it.
    pub fn pill_text(&self) -> String {
        match &self.click_label {
            Some(label) => format!("{} · {}", self.brand, label),
            None => self.brand.clone(),
        }
    }

    pub fn image_state(&self) -> ImageLoadState {
        self.image
            .as_ref()
            .map(|img| img.loader.state())
            .unwrap_or(ImageLoadState::Unset)
    }

    /// Apply the visual consequence of the image's current state.
    ///
    /// No image or a failed ladder hides the thumbnail and sends the pill to
    /// the content area; a loaded image takes the pill as an overlay.
    pub fn settle_image(&mut self) {
        match self.image_state() {
            ImageLoadState::Unset | ImageLoadState::Fallback => {
                self.thumb_hidden = true;
                self.pill = PillPlacement::Content;
            }
            ImageLoadState::Loaded(_) => {
                self.thumb_hidden = false;
                self.pill = PillPlacement::Thumb;
            }
            ImageLoadState::Loading(_) => {}
        }
    }
}

struct CardSelectors {
    link: Selector,
    img: Selector,
    title: Selector,
    desc: Selector,
    pill: Selector,
    meta: Selector,
    thumb: Selector,
    content: Selector,
}

impl CardSelectors {
    fn new() -> Result<Self> {
        Ok(Self {
            link: dom::selector(".card-link")?,
            img: dom::selector("img")?,
            title: dom::selector(".title")?,
            desc: dom::selector(".desc")?,
            pill: dom::selector(".pill")?,
            meta: dom::selector(".meta")?,
            thumb: dom::selector(".thumb")?,
            content: dom::selector(".content")?,
        })
    }
}

/// Parsed card markup used as a stamp.
pub struct CardTemplate {
    markup: String,
    selectors: CardSelectors,
}

impl std::fmt::Debug for CardTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardTemplate").field("markup", &self.markup).finish()
    }
}

impl CardTemplate {
    /// Build a template from the inner markup of the template element.
    ///
    /// The first element of the trimmed markup is the card.
    pub fn parse(markup: &str) -> Result<Self> {
        let template = Self {
            markup: markup.trim().to_string(),
            selectors: CardSelectors::new()?,
        };
        let fragment = Html::parse_fragment(&template.markup);
        if first_element(&fragment).is_none() {
            return Err(Error::TemplateError("card template has no element".into()));
        }
        Ok(template)
    }

    pub fn markup(&self) -> &str {
        &self.markup
    }

    /// Parse a fresh copy of the template and fill it in for `card`.
    ///
    /// The card is the first element of the returned fragment.
    pub fn stamp(&self, card: &Card) -> Html {
        let mut fragment = Html::parse_fragment(&self.markup);
        let slots = first_element(&fragment).map(|root| CardSlots::locate(root, &self.selectors));
        if let Some(slots) = slots {
            slots.fill(&mut fragment, card);
        }
        fragment
    }

    /// Stamp `card` and append it to `parent` in `doc`.
    pub(crate) fn stamp_into(&self, card: &Card, doc: &mut Html, parent: NodeId) {
        let fragment = self.stamp(card);
        if let Some(root) = first_element(&fragment) {
            dom::append_copy(doc, parent, *root);
        }
    }

    /// Stamp `card` and return the markup.
    pub fn render(&self, card: &Card) -> String {
        let fragment = self.stamp(card);
        first_element(&fragment).map(|root| root.html()).unwrap_or_default()
    }
}

fn first_element(fragment: &Html) -> Option<ElementRef<'_>> {
    fragment.root_element().children().find_map(ElementRef::wrap)
}

/// The template's recognized descendants of one stamped card.
///
/// Like `querySelector`, lookups search below the card root only.
struct CardSlots {
    link: Option<NodeId>,
    img: Option<NodeId>,
    title: Option<NodeId>,
    desc: Option<NodeId>,
    pill: Option<NodeId>,
    meta: Option<NodeId>,
    thumb: Option<NodeId>,
    content: Option<NodeId>,
    pill_parent: Option<NodeId>,
}

impl CardSlots {
    fn locate(root: ElementRef<'_>, sel: &CardSelectors) -> Self {
        let find = |s: &Selector| root.select(s).next();
        let pill = find(&sel.pill);
        Self {
            link: find(&sel.link).map(|el| el.id()),
            img: find(&sel.img).map(|el| el.id()),
            title: find(&sel.title).map(|el| el.id()),
            desc: find(&sel.desc).map(|el| el.id()),
            pill: pill.map(|el| el.id()),
            meta: find(&sel.meta).map(|el| el.id()),
            thumb: find(&sel.thumb).map(|el| el.id()),
            content: find(&sel.content).map(|el| el.id()),
            pill_parent: pill.and_then(|el| el.parent()).map(|p| p.id()),
        }
    }

    fn fill(&self, doc: &mut Html, card: &Card) {
        if let Some(link) = self.link {
            dom::set_attr(doc, link, "href", &card.href);
        }
        if let (Some(thumb), true) = (self.thumb, card.thumb_hidden) {
            dom::set_style(doc, thumb, &[("display", "none")]);
        }
        if let Some(img) = self.img {
            fill_image(doc, img, card);
        }
        for (slot, text) in [(self.title, &card.title), (self.desc, &card.description), (self.meta, &card.meta)] {
            if let Some(id) = slot {
                dom::set_text(doc, id, text);
            }
        }
        if let Some(pill) = self.pill {
            dom::set_text(doc, pill, &card.brand);
            if let Some(label) = &card.click_label {
                dom::append_text(doc, pill, " · ");
                if let Some(count) = dom::append_element(doc, pill, "span", &[("class", "count")]) {
                    dom::set_text(doc, count, label);
                }
            }
            self.place_pill(doc, pill, card.pill);
        }
    }

    /// Overlay: last child of `.thumb`. Text flow: first child of `.content`,
    /// only when the pill currently sits in `.thumb`.
    fn place_pill(&self, doc: &mut Html, pill: NodeId, placement: PillPlacement) {
        let in_thumb = self.thumb.is_some() && self.pill_parent == self.thumb;
        match placement {
            PillPlacement::Thumb if !in_thumb => {
                if let Some(thumb) = self.thumb {
                    dom::move_child(doc, pill, thumb, false);
                }
            }
            PillPlacement::Content if in_thumb => {
                if let Some(content) = self.content {
                    dom::move_child(doc, pill, content, true);
                }
            }
            _ => {}
        }
    }
}

fn fill_image(doc: &mut Html, img: NodeId, card: &Card) {
    let state = card.image_state();
    dom::set_attr(doc, img, "data-image-state", state.label());
    if let Some(image) = &card.image {
        dom::set_attr(doc, img, "src", image.loader.src());
        dom::set_attr(doc, img, "alt", &image.alt);
        let opacity = if matches!(state, ImageLoadState::Loaded(_)) { "1" } else { "0" };
        dom::set_style(doc, img, &[("opacity", opacity), ("transition", "opacity 0.3s")]);
    }
    match state.attempt() {
        Some(attempt) => {
            dom::set_attr(doc, img, "referrerpolicy", attempt.referrer_policy.as_str());
            if attempt.cross_origin {
                dom::set_attr(doc, img, "crossorigin", "anonymous");
            } else {
                dom::remove_attr(doc, img, "crossorigin");
            }
        }
        None if state == ImageLoadState::Fallback => dom::remove_attr(doc, img, "crossorigin"),
        None => {}
    }
}
