//! End-to-end snapshot tests against a CDP-shaped page

use dom::{DomArena, DomRect, DomService, NodeId};
use serde_json::{json, Value};
use snapshot::{
    snapshot, AttributeValue, NodeType, SerializeOptions, SerializedNode, SerializedNodeWithId,
    Session, SlimDomOptions, IGNORED_NODE, SCRIPT_PLACEHOLDER,
};

fn element(backend: u32, tag: &str, attributes: Value, children: Vec<Value>) -> Value {
    json!({
        "nodeId": backend,
        "backendNodeId": backend,
        "nodeType": 1,
        "nodeName": tag.to_uppercase(),
        "localName": tag,
        "attributes": attributes,
        "children": children
    })
}

fn text(backend: u32, value: &str) -> Value {
    json!({
        "nodeId": backend,
        "backendNodeId": backend,
        "nodeType": 3,
        "nodeName": "#text",
        "nodeValue": value
    })
}

fn page_response() -> Value {
    let mut iframe = element(60, "iframe", json!(["src", "/frame.html"]), vec![]);
    iframe["contentDocument"] = json!({
        "nodeId": 61,
        "backendNodeId": 61,
        "nodeType": 9,
        "nodeName": "#document",
        "documentURL": "https://example.com/frame.html",
        "children": [element(62, "html", json!([]), vec![
            element(63, "body", json!([]), vec![text(64, "inner")])
        ])]
    });

    json!({
        "root": {
            "nodeId": 1,
            "backendNodeId": 1,
            "nodeType": 9,
            "nodeName": "#document",
            "documentURL": "https://example.com/shop/index.html",
            "children": [
                {
                    "nodeId": 2,
                    "backendNodeId": 2,
                    "nodeType": 10,
                    "nodeName": "html",
                    "publicId": "",
                    "systemId": ""
                },
                element(3, "html", json!(["lang", "en"]), vec![
                    element(10, "head", json!([]), vec![
                        text(11, "\n  "),
                        element(12, "meta", json!(["name", "description", "content", "Shoes"]), vec![]),
                        element(13, "meta", json!(["property", "og:title", "content", "Shop"]), vec![]),
                        element(14, "script", json!(["src", "app.js"]), vec![text(15, "var token = 'abc';")]),
                        text(16, "\n"),
                    ]),
                    element(20, "body", json!(["class", "page"]), vec![
                        element(21, "div", json!(["id", "card", "class", "card rr-block"]), vec![
                            element(22, "p", json!([]), vec![text(23, "4111 1111 1111 1111")]),
                        ]),
                        element(30, "p", json!([]), vec![text(31, "Hello")]),
                        text(32, "   "),
                        json!({
                            "nodeId": 33,
                            "backendNodeId": 33,
                            "nodeType": 8,
                            "nodeName": "#comment",
                            "nodeValue": " note "
                        }),
                        element(40, "span", json!(["class", "rr-mask"]), vec![text(41, "Jane Doe")]),
                        element(50, "img", json!(["src", "img/logo.png"]), vec![]),
                        iframe,
                    ]),
                ]),
            ]
        }
    })
}

fn load_page() -> (DomArena, NodeId) {
    let mut service = DomService::new();
    let root = service.parse_cdp_dom_tree(&page_response()).unwrap();
    let mut arena = service.into_arena();
    let card = arena.get_by_backend_id(21).unwrap().node_id;
    arena.element_state_mut(card).unwrap().bounds = Some(DomRect::new(0.0, 0.0, 120.0, 40.5));
    (arena, root)
}

fn backend(arena: &DomArena, id: u32) -> NodeId {
    arena.get_by_backend_id(id).unwrap().node_id
}

fn find_tag<'a>(sn: &'a SerializedNodeWithId, tag: &str) -> Option<&'a SerializedNodeWithId> {
    if sn.node.tag_name() == Some(tag) {
        return Some(sn);
    }
    sn.node.child_nodes().iter().find_map(|child| find_tag(child, tag))
}

fn ids(sn: &SerializedNodeWithId) -> Vec<i32> {
    let mut ids = Vec::new();
    sn.visit(|node| ids.push(node.id));
    ids
}

#[test]
fn test_ids_follow_walk_order() {
    let (arena, root) = load_page();
    let mut session = Session::new();
    let (sn, map) = snapshot(&arena, root, &mut session, &SerializeOptions::default());
    let sn = sn.unwrap();

    let ids = ids(&sn);
    assert_eq!(ids[0], 1);
    assert!(ids.windows(2).all(|pair| pair[0] < pair[1]), "{ids:?}");
    assert_eq!(map.len(), ids.len());
    assert_eq!(map.get(&1), Some(&root));
    assert_eq!(sn.node.node_type(), NodeType::Document);
}

#[test]
fn test_ids_stable_across_snapshots_and_reset() {
    let (arena, root) = load_page();
    let mut session = Session::new();
    let options = SerializeOptions::default();

    let first = snapshot(&arena, root, &mut session, &options).0.unwrap();
    let second = snapshot(&arena, root, &mut session, &options).0.unwrap();
    assert_eq!(first, second);

    let hello = backend(&arena, 30);
    let hello_id = session.id_of(&arena, hello).unwrap();
    // the blocked card hides its own <p>, so the first one is "Hello"
    assert_eq!(find_tag(&second, "p").map(|p| p.id), Some(hello_id));

    session.reset();
    let (fresh_arena, fresh_root) = load_page();
    let fresh = snapshot(&fresh_arena, fresh_root, &mut session, &options).0.unwrap();
    assert_eq!(fresh.id, 1);
}

#[test]
fn test_script_text_is_redacted() {
    let (arena, root) = load_page();
    let mut session = Session::new();
    let sn = snapshot(&arena, root, &mut session, &SerializeOptions::default()).0.unwrap();

    let script = find_tag(&sn, "script").unwrap();
    let script_text = &script.node.child_nodes()[0];
    assert_eq!(script_text.node.text_content(), Some(SCRIPT_PLACEHOLDER));
    assert_eq!(
        script.node.attributes().unwrap().get_str("src"),
        Some("https://example.com/shop/app.js")
    );
    let json = sn.to_json().unwrap();
    assert!(!json.contains("token"));
}

#[test]
fn test_blocked_element_keeps_only_layout() {
    let (arena, root) = load_page();
    let mut session = Session::new();
    let sn = snapshot(&arena, root, &mut session, &SerializeOptions::default()).0.unwrap();

    let body = find_tag(&sn, "body").unwrap();
    let card = find_tag(body, "div").unwrap();
    assert!(card.node.needs_blocking());
    assert!(card.node.child_nodes().is_empty());
    let attrs = card.node.attributes().unwrap();
    assert_eq!(attrs.get_str("rr_width"), Some("120px"));
    assert_eq!(attrs.get_str("rr_height"), Some("40.5px"));
    assert_eq!(session.id_of(&arena, backend(&arena, 22)), None);
    assert!(!sn.to_json().unwrap().contains("4111"));
}

#[test]
fn test_whitespace_pruning() {
    let (arena, root) = load_page();
    let options = SerializeOptions {
        preserve_white_space: false,
        ..Default::default()
    };
    let mut session = Session::new();
    let sn = snapshot(&arena, root, &mut session, &options).0.unwrap();

    let body = find_tag(&sn, "body").unwrap();
    assert!(body.node.child_nodes().iter().all(|c| !c.node.is_blank_text()));
    assert_eq!(session.id_of(&arena, backend(&arena, 32)), Some(IGNORED_NODE));
    let hello = find_tag(body, "p").unwrap();
    assert_eq!(hello.node.child_nodes()[0].node.text_content(), Some("Hello"));
}

#[test]
fn test_slim_dom_sensible() {
    let (arena, root) = load_page();
    let options = SerializeOptions {
        slim_dom: SlimDomOptions::sensible(),
        ..Default::default()
    };
    let mut session = Session::new();
    let sn = snapshot(&arena, root, &mut session, &options).0.unwrap();

    let head = find_tag(&sn, "head").unwrap();
    let tags: Vec<_> = head
        .node
        .child_nodes()
        .iter()
        .map(|c| c.node.node_type())
        .collect();
    // whitespace text, og:title and script are gone; description stays
    assert_eq!(tags, vec![NodeType::Element]);
    assert_eq!(
        head.node.child_nodes()[0].node.attributes().unwrap().get_str("name"),
        Some("description")
    );

    let body = find_tag(&sn, "body").unwrap();
    assert!(body
        .node
        .child_nodes()
        .iter()
        .all(|c| c.node.node_type() != NodeType::Comment));
    // whitespace outside <head> survives
    assert!(body.node.child_nodes().iter().any(|c| c.node.is_blank_text()));
}

#[test]
fn test_text_masking_and_urls() {
    let (arena, root) = load_page();
    let mut session = Session::new();
    let sn = snapshot(&arena, root, &mut session, &SerializeOptions::default()).0.unwrap();

    let span = find_tag(&sn, "span").unwrap();
    assert_eq!(span.node.child_nodes()[0].node.text_content(), Some("**** ***"));

    let img = find_tag(&sn, "img").unwrap();
    assert_eq!(
        img.node.attributes().unwrap().get_str("src"),
        Some("https://example.com/shop/img/logo.png")
    );
}

#[test]
fn test_iframe_document_nested() {
    let (arena, root) = load_page();
    let mut session = Session::new();
    let sn = snapshot(&arena, root, &mut session, &SerializeOptions::default()).0.unwrap();

    let iframe = find_tag(&sn, "iframe").unwrap();
    assert!(!iframe.node.attributes().unwrap().contains("src"));
    let nested = iframe.node.child_nodes().last().unwrap();
    assert!(matches!(nested.node, SerializedNode::Document { .. }));
    assert_eq!(nested.root_id, None);

    let mut nested_roots = Vec::new();
    for child in nested.node.child_nodes() {
        child.visit(|n| nested_roots.push(n.root_id));
    }
    assert_eq!(nested_roots.len(), 3);
    assert!(nested_roots.iter().all(|r| *r == Some(nested.id)));

    let outer_body = find_tag(&sn, "body").unwrap();
    assert_eq!(outer_body.root_id, None);
}

#[test]
fn test_json_round_trip() {
    let (arena, root) = load_page();
    let mut session = Session::new();
    let sn = snapshot(&arena, root, &mut session, &SerializeOptions::default()).0.unwrap();

    let value: Value = serde_json::to_value(&sn).unwrap();
    assert_eq!(value["type"], 0);
    assert_eq!(value["childNodes"][0]["type"], 1);
    assert_eq!(value["childNodes"][0]["name"], "html");
    assert_eq!(value["childNodes"][1]["attributes"]["lang"], "en");

    let back = SerializedNodeWithId::from_json(&sn.to_json().unwrap()).unwrap();
    assert_eq!(back, sn);
}

#[test]
fn test_checked_state_captured() {
    let mut arena = DomArena::new();
    let doc = arena.create_document("https://example.com/");
    let input = arena.create_element("input");
    arena.append_child(doc, input).unwrap();
    arena.set_attribute(input, "type", "radio").unwrap();
    arena.element_state_mut(input).unwrap().checked = true;

    let mut session = Session::new();
    let sn = snapshot(&arena, doc, &mut session, &SerializeOptions::default()).0.unwrap();
    let input_sn = &sn.node.child_nodes()[0];
    assert_eq!(
        input_sn.node.attributes().unwrap().get("checked"),
        Some(&AttributeValue::Bool(true))
    );
}

#[test]
fn test_unsupported_nodes_are_skipped() {
    let mut arena = DomArena::new();
    let doc = arena.create_document("https://example.com/");
    let pi = arena.create_processing_instruction("xml-stylesheet", "href=\"a.css\"");
    let comment = arena.create_comment("kept");
    arena.append_child(doc, pi).unwrap();
    arena.append_child(doc, comment).unwrap();

    let mut session = Session::new();
    let (sn, map) = snapshot(&arena, doc, &mut session, &SerializeOptions::default());
    let sn = sn.unwrap();
    assert_eq!(sn.node.child_nodes().len(), 1);
    assert_eq!(sn.node.child_nodes()[0].node.node_type(), NodeType::Comment);
    assert_eq!(session.id_of(&arena, pi), None);
    assert_eq!(map.len(), 2);
}

#[test]
fn test_ignored_binding_stays_with_its_page() {
    let options = SerializeOptions {
        slim_dom: SlimDomOptions::all(),
        ..Default::default()
    };
    let mut first = DomArena::new();
    let first_doc = first.create_document("https://a.example/");
    let note = first.create_comment("hidden");
    first.append_child(first_doc, note).unwrap();

    let mut session = Session::new();
    snapshot(&first, first_doc, &mut session, &options).0.unwrap();
    assert!(session.is_ignored(&first, note));

    // same slots in a second page: the <html> there must not inherit the ignore
    let mut second = DomArena::new();
    let second_doc = second.create_document("https://b.example/");
    let html = second.create_element("html");
    let body = second.create_element("body");
    second.append_child(second_doc, html).unwrap();
    second.append_child(html, body).unwrap();
    assert_eq!(html, note);

    let (sn, map) = snapshot(&second, second_doc, &mut session, &SerializeOptions::default());
    let sn = sn.unwrap();
    assert_eq!(map.len(), 3);
    assert!(find_tag(&sn, "body").is_some());
    assert!(!session.is_ignored(&second, html));
}
