//! In-place edits on parsed `scraper` documents.
//!
//! `Html::tree` is a plain `ego_tree::Tree<Node>`. Elements are addressed by
//! `NodeId` and edited through their public `attrs`; the edited tree is
//! written back out with html5ever's serializer (`ElementRef::html`).

use crate::{Error, Result};
use ego_tree::{NodeId, NodeRef};
use html5ever::tendril::StrTendril;
use html5ever::{LocalName, Namespace, QualName};
use scraper::node::{Element, Text};
use scraper::{ElementRef, Html, Node, Selector};
use std::collections::HashSet;

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

pub(crate) fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css)
        .map_err(|e| Error::TemplateError(format!("bad selector '{}': {:?}", css, e)))
}

/// Name of a plain (non-namespaced) attribute.
fn attr_name(name: &str) -> QualName {
    QualName::new(None, Namespace::from(""), LocalName::from(name))
}

fn tendril(s: &str) -> StrTendril {
    StrTendril::from_slice(s)
}

/// Run `f` on the element at `id`. Other node kinds are left alone.
fn edit_element(doc: &mut Html, id: NodeId, f: impl FnOnce(&mut Element)) {
    if let Some(mut node) = doc.tree.get_mut(id) {
        if let Node::Element(el) = node.value() {
            f(el);
        }
    }
}

/// Keep the element's cached id and class set in line with its attributes.
fn sync_cached(el: &mut Element, name: &str) {
    match name {
        "class" => {
            el.classes = el
                .attr("class")
                .unwrap_or("")
                .split_whitespace()
                .map(LocalName::from)
                .collect()
        }
        "id" => el.id = el.attr("id").map(LocalName::from),
        _ => {}
    }
}

pub(crate) fn set_attr(doc: &mut Html, id: NodeId, name: &str, value: &str) {
    edit_element(doc, id, |el| {
        el.attrs.insert(attr_name(name), tendril(value));
        sync_cached(el, name);
    });
}

pub(crate) fn remove_attr(doc: &mut Html, id: NodeId, name: &str) {
    edit_element(doc, id, |el| {
        el.attrs.remove(&attr_name(name));
        sync_cached(el, name);
    });
}

/// Set inline style properties, replacing earlier values of the same property.
pub(crate) fn set_style(doc: &mut Html, id: NodeId, props: &[(&str, &str)]) {
    edit_element(doc, id, |el| {
        let style = merge_style(el.attr("style").unwrap_or(""), props);
        el.attrs.insert(attr_name("style"), tendril(&style));
    });
}

/// Add or remove a class token. An emptied class list drops the attribute.
pub(crate) fn toggle_class(doc: &mut Html, id: NodeId, class: &str, on: bool) {
    edit_element(doc, id, |el| {
        let classes = toggle_token(el.attr("class").unwrap_or(""), class, on);
        if classes.is_empty() {
            el.attrs.remove(&attr_name("class"));
        } else {
            el.attrs.insert(attr_name("class"), tendril(&classes));
        }
        sync_cached(el, "class");
    });
}

fn merge_style(current: &str, props: &[(&str, &str)]) -> String {
    let mut decls: Vec<(String, String)> = current
        .split(';')
        .filter_map(|decl| {
            let (k, v) = decl.split_once(':')?;
            Some((k.trim().to_string(), v.trim().to_string()))
        })
        .filter(|(k, _)| !k.is_empty())
        .collect();
    for (prop, value) in props {
        match decls.iter_mut().find(|(k, _)| k == prop) {
            Some(slot) => slot.1 = value.to_string(),
            None => decls.push((prop.to_string(), value.to_string())),
        }
    }
    decls
        .iter()
        .map(|(k, v)| format!("{}: {}", k, v))
        .collect::<Vec<_>>()
        .join("; ")
}

fn toggle_token(current: &str, token: &str, on: bool) -> String {
    let mut tokens: Vec<&str> = current.split_whitespace().filter(|t| *t != token).collect();
    if on {
        tokens.push(token);
    }
    tokens.join(" ")
}

/// Detach every child of `id`.
pub(crate) fn clear_children(doc: &mut Html, id: NodeId) {
    let children: Vec<NodeId> = match doc.tree.get(id) {
        Some(node) => node.children().map(|c| c.id()).collect(),
        None => return,
    };
    for child in children {
        if let Some(mut node) = doc.tree.get_mut(child) {
            node.detach();
        }
    }
}

pub(crate) fn append_text(doc: &mut Html, id: NodeId, text: &str) {
    if let Some(mut node) = doc.tree.get_mut(id) {
        node.append(Node::Text(Text { text: tendril(text) }));
    }
}

/// Replace the children of `id` with a single text node.
pub(crate) fn set_text(doc: &mut Html, id: NodeId, text: &str) {
    clear_children(doc, id);
    append_text(doc, id, text);
}

/// Append a new, empty HTML element under `parent`.
pub(crate) fn append_element(
    doc: &mut Html,
    parent: NodeId,
    tag: &str,
    attrs: &[(&str, &str)],
) -> Option<NodeId> {
    let mut el = Element {
        name: QualName::new(None, Namespace::from(HTML_NAMESPACE), LocalName::from(tag)),
        id: None,
        classes: HashSet::new(),
        attrs: Default::default(),
    };
    for (name, value) in attrs {
        el.attrs.insert(attr_name(name), tendril(value));
        sync_cached(&mut el, name);
    }
    let mut node = doc.tree.get_mut(parent)?;
    Some(node.append(Node::Element(el)).id())
}

/// Move `node` to the start (`first`) or end of `parent`'s children.
///
/// A move that would place a node inside itself is ignored.
pub(crate) fn move_child(doc: &mut Html, node: NodeId, parent: NodeId, first: bool) {
    let Some(target) = doc.tree.get(parent) else {
        return;
    };
    if target.id() == node || target.ancestors().any(|a| a.id() == node) {
        return;
    }
    if let Some(mut target) = doc.tree.get_mut(parent) {
        if first {
            target.prepend_id(node);
        } else {
            target.append_id(node);
        }
    }
}

/// Deep-copy `src` (from any tree) as the last child of `parent`.
pub(crate) fn append_copy(doc: &mut Html, parent: NodeId, src: NodeRef<'_, Node>) {
    let copied = match doc.tree.get_mut(parent) {
        Some(mut node) => node.append(src.value().clone()).id(),
        None => return,
    };
    for child in src.children() {
        append_copy(doc, copied, child);
    }
}

/// Serialize a whole document, doctype included.
pub(crate) fn write_document(doc: &Html) -> String {
    let mut out = String::new();
    for child in doc.tree.root().children() {
        match child.value() {
            Node::Doctype(doctype) => {
                out.push_str("<!DOCTYPE ");
                out.push_str(doctype.name());
                out.push_str(">\n");
            }
            Node::Comment(comment) => {
                out.push_str("<!--");
                out.push_str(comment);
                out.push_str("-->");
            }
            _ => {
                if let Some(el) = ElementRef::wrap(child) {
                    out.push_str(&el.html());
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find(doc: &Html, css: &str) -> NodeId {
        doc.select(&selector(css).unwrap()).next().unwrap().id()
    }

    fn outer(doc: &Html, css: &str) -> String {
        doc.select(&selector(css).unwrap()).next().unwrap().html()
    }

    #[test]
    fn attribute_edits_are_serialized() {
        let mut doc = Html::parse_fragment(r#"<div><a class="link">x</a></div>"#);
        let a = find(&doc, "a");
        set_attr(&mut doc, a, "href", "https://example.com/?a=1&b=2");
        set_attr(&mut doc, a, "class", "link visited");
        assert_eq!(doc.select(&selector(".visited").unwrap()).count(), 1);

        let html = outer(&doc, "a");
        assert!(html.contains(r#"href="https://example.com/?a=1&amp;b=2""#));

        remove_attr(&mut doc, a, "href");
        assert!(!outer(&doc, "a").contains("href"));
    }

    #[test]
    fn text_is_replaced_and_escaped() {
        let mut doc = Html::parse_fragment("<p>old <b>bold</b></p>");
        let p = find(&doc, "p");
        set_text(&mut doc, p, "1 < 2 & 3");
        assert_eq!(outer(&doc, "p"), "<p>1 &lt; 2 &amp; 3</p>");
    }

    #[test]
    fn appended_elements_carry_classes() {
        let mut doc = Html::parse_fragment("<p></p>");
        let p = find(&doc, "p");
        let span = append_element(&mut doc, p, "span", &[("class", "count")]).unwrap();
        set_text(&mut doc, span, "7");
        assert_eq!(outer(&doc, "p"), r#"<p><span class="count">7</span></p>"#);
        assert_eq!(doc.select(&selector("p > .count").unwrap()).count(), 1);
    }

    #[test]
    fn moves_children_but_never_into_themselves() {
        let mut doc = Html::parse_fragment(r#"<div><section><i></i></section><b></b></div>"#);
        let section = find(&doc, "section");
        let i = find(&doc, "i");
        let b = find(&doc, "b");

        move_child(&mut doc, b, section, true);
        assert_eq!(outer(&doc, "div"), "<div><section><b></b><i></i></section></div>");

        move_child(&mut doc, section, i, false);
        assert_eq!(outer(&doc, "div"), "<div><section><b></b><i></i></section></div>");
    }

    #[test]
    fn copies_subtrees_between_documents() {
        let src = Html::parse_fragment(r#"<article class="card"><h2>T</h2></article>"#);
        let mut dst = Html::parse_fragment("<main></main>");
        let main = find(&dst, "main");
        let card = src.select(&selector("article").unwrap()).next().unwrap();
        append_copy(&mut dst, main, *card);
        append_copy(&mut dst, main, *card);
        assert_eq!(dst.select(&selector("main > article.card > h2").unwrap()).count(), 2);
    }

    #[test]
    fn style_and_class_merging() {
        assert_eq!(
            merge_style("color: red; opacity: 0.5", &[("opacity", "1"), ("display", "none")]),
            "color: red; opacity: 1; display: none"
        );
        assert_eq!(merge_style("", &[("display", "none")]), "display: none");

        assert_eq!(toggle_token("feed hidden grid", "hidden", false), "feed grid");
        assert_eq!(toggle_token("feed grid", "hidden", true), "feed grid hidden");
        assert_eq!(toggle_token("hidden", "hidden", false), "");
    }

    #[test]
    fn toggling_the_last_class_drops_the_attribute() {
        let mut doc = Html::parse_fragment(r#"<div class="hidden"></div>"#);
        let div = find(&doc, "div");
        toggle_class(&mut doc, div, "hidden", false);
        assert_eq!(outer(&doc, "div"), "<div></div>");
        toggle_class(&mut doc, div, "hidden", true);
        assert_eq!(outer(&doc, "div"), r#"<div class="hidden"></div>"#);
    }

    #[test]
    fn documents_keep_their_doctype() {
        let doc = Html::parse_document("<!DOCTYPE html><html><head></head><body><p>x</p></body></html>");
        assert_eq!(
            write_document(&doc),
            "<!DOCTYPE html>\n<html><head></head><body><p>x</p></body></html>"
        );
    }
}
