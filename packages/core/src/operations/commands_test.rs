use super::*;
use crate::models::ATTR_CHECKED;

fn doc(children: Vec<Node>) -> Document {
    Document::new(children)
}

fn p(text: &str) -> Node {
    Node::paragraph_with_text(text)
}

fn cursor(path: Vec<usize>, offset: usize) -> Selection {
    Selection::cursor(path, offset)
}

fn range(from: (Vec<usize>, usize), to: (Vec<usize>, usize)) -> Selection {
    Selection::range(Position::new(from.0, from.1), Position::new(to.0, to.1))
}

#[test]
fn test_set_heading_without_selection_is_noop() {
    let original = doc(vec![p("hello")]);
    let result = EditorCommand::SetHeading { level: 1 }.apply(&original, None);

    assert!(!result.applied);
    assert_eq!(result.document, original);
    assert_eq!(result.selection, None);
}

#[test]
fn test_command_with_dangling_selection_is_noop() {
    let original = doc(vec![p("hello")]);
    let selection = cursor(vec![4], 0);
    let result = EditorCommand::ToggleBulletList.apply(&original, Some(&selection));
    assert!(!result.applied);
    assert_eq!(result.document, original);

    let past_end = cursor(vec![0], 99);
    let result = EditorCommand::ToggleBulletList.apply(&original, Some(&past_end));
    assert!(!result.applied);
}

#[test]
fn test_set_heading_converts_and_toggles_back() {
    let original = doc(vec![p("Title"), p("body")]);
    let selection = cursor(vec![0], 2);

    let once = EditorCommand::SetHeading { level: 2 }.apply(&original, Some(&selection));
    assert!(once.applied);
    assert_eq!(once.document.children[0].heading_level(), Some(2));
    assert_eq!(once.document.children[1], p("body"));

    let twice = EditorCommand::SetHeading { level: 2 }
        .apply(&once.document, once.selection.as_ref());
    assert_eq!(twice.document, original);
}

#[test]
fn test_set_heading_changes_level_of_existing_heading() {
    let original = doc(vec![Node::heading(1, vec![Node::text("T")])]);
    let result =
        EditorCommand::SetHeading { level: 3 }.apply(&original, Some(&cursor(vec![0], 0)));
    assert_eq!(result.document.children[0].heading_level(), Some(3));
}

#[test]
fn test_set_heading_rejects_out_of_range_level() {
    let original = doc(vec![p("x")]);
    let result =
        EditorCommand::SetHeading { level: 4 }.apply(&original, Some(&cursor(vec![0], 0)));
    assert!(!result.applied);
    assert_eq!(result.document, original);
}

#[test]
fn test_toggle_bullet_list_twice_restores_document() {
    let original = doc(vec![p("one"), p("two"), p("three")]);
    let selection = range((vec![0], 1), (vec![1], 2));

    let once = EditorCommand::ToggleBulletList.apply(&original, Some(&selection));
    assert!(once.applied);
    assert_eq!(once.document.children.len(), 2);
    let list = &once.document.children[0];
    assert_eq!(list.kind, NodeKind::BulletList);
    assert_eq!(list.child_count(), 2);
    assert_eq!(once.document.children[1], p("three"));
    assert!(once.document.validate().is_ok());

    let twice = EditorCommand::ToggleBulletList.apply(&once.document, once.selection.as_ref());
    assert_eq!(twice.document, original);
    assert_eq!(twice.selection, Some(selection));
}

#[test]
fn test_selection_follows_text_into_list() {
    let original = doc(vec![p("one")]);
    let result = EditorCommand::ToggleOrderedList.apply(&original, Some(&cursor(vec![0], 2)));
    assert_eq!(result.selection, Some(cursor(vec![0, 0, 0], 2)));
}

#[test]
fn test_heading_cannot_stay_inside_list() {
    let original = doc(vec![Node::with_children(
        NodeKind::BulletList,
        vec![Node::list_item(vec![p("item")])],
    )]);
    let result =
        EditorCommand::SetHeading { level: 1 }.apply(&original, Some(&cursor(vec![0, 0, 0], 0)));

    assert_eq!(result.document.children.len(), 1);
    assert_eq!(result.document.children[0].kind, NodeKind::Heading);
    assert_eq!(result.document.children[0].text_content(), "item");
}

#[test]
fn test_switch_list_kind_keeps_text() {
    let original = doc(vec![Node::with_children(
        NodeKind::BulletList,
        vec![
            Node::list_item(vec![p("a")]),
            Node::list_item(vec![p("b")]),
        ],
    )]);
    let selection = range((vec![0, 0, 0], 0), (vec![0, 1, 0], 1));
    let result = EditorCommand::ToggleTaskList.apply(&original, Some(&selection));

    let list = &result.document.children[0];
    assert_eq!(list.kind, NodeKind::TaskList);
    assert_eq!(list.child_count(), 2);
    for item in list.children() {
        assert_eq!(item.kind, NodeKind::TaskItem);
        assert_eq!(item.attrs.get(ATTR_CHECKED), Some(&serde_json::Value::Bool(false)));
    }
}

#[test]
fn test_toggle_list_off_for_middle_item_splits_list() {
    let original = doc(vec![Node::with_children(
        NodeKind::BulletList,
        vec![
            Node::list_item(vec![p("a")]),
            Node::list_item(vec![p("b")]),
            Node::list_item(vec![p("c")]),
        ],
    )]);
    let result = EditorCommand::ToggleBulletList.apply(&original, Some(&cursor(vec![0, 1, 0], 0)));

    let children = &result.document.children;
    assert_eq!(children.len(), 3);
    assert_eq!(children[0].kind, NodeKind::BulletList);
    assert_eq!(children[0].child_count(), 1);
    assert_eq!(children[1], p("b"));
    assert_eq!(children[2].kind, NodeKind::BulletList);
    assert_eq!(children[2].text_content(), "c");
    assert_eq!(result.selection, Some(cursor(vec![1], 0)));
}

#[test]
fn test_toggle_blockquote_round_trip() {
    let original = doc(vec![p("quote me")]);
    let once = EditorCommand::ToggleBlockquote.apply(&original, Some(&cursor(vec![0], 0)));
    assert_eq!(once.document.children[0].kind, NodeKind::Blockquote);

    let twice = EditorCommand::ToggleBlockquote.apply(&once.document, once.selection.as_ref());
    assert_eq!(twice.document, original);
}

#[test]
fn test_toggle_list_inside_blockquote_keeps_quote() {
    let original = doc(vec![Node::with_children(NodeKind::Blockquote, vec![p("quoted")])]);

    let once = EditorCommand::ToggleBulletList.apply(&original, Some(&cursor(vec![0, 0], 0)));
    let quote = &once.document.children[0];
    assert_eq!(quote.kind, NodeKind::Blockquote);
    assert_eq!(quote.children()[0].kind, NodeKind::BulletList);
    assert_eq!(once.selection, Some(cursor(vec![0, 0, 0, 0], 0)));
    assert!(once.document.validate().is_ok());

    let twice = EditorCommand::ToggleBulletList.apply(&once.document, once.selection.as_ref());
    assert_eq!(twice.document, original);
}

#[test]
fn test_heading_inside_blockquote_round_trip() {
    let original = doc(vec![Node::with_children(
        NodeKind::Blockquote,
        vec![p("cited"), p("rest")],
    )]);
    let selection = cursor(vec![0, 1], 2);

    let once = EditorCommand::SetHeading { level: 1 }.apply(&original, Some(&selection));
    let quote = &once.document.children[0];
    assert_eq!(quote.kind, NodeKind::Blockquote);
    assert_eq!(quote.children()[0], p("cited"));
    assert_eq!(quote.children()[1].heading_level(), Some(1));

    let twice = EditorCommand::SetHeading { level: 1 }
        .apply(&once.document, once.selection.as_ref());
    assert_eq!(twice.document, original);
    assert_eq!(twice.selection, Some(selection));
}

#[test]
fn test_blockquote_wraps_list_without_clearing_it() {
    let original = doc(vec![Node::with_children(
        NodeKind::OrderedList,
        vec![
            Node::list_item(vec![p("a")]),
            Node::list_item(vec![p("b")]),
        ],
    )]);
    let selection = range((vec![0, 0, 0], 0), (vec![0, 1, 0], 1));

    let once = EditorCommand::ToggleBlockquote.apply(&original, Some(&selection));
    let quote = &once.document.children[0];
    assert_eq!(quote.kind, NodeKind::Blockquote);
    assert_eq!(quote.children()[0].kind, NodeKind::OrderedList);

    let twice = EditorCommand::ToggleBlockquote.apply(&once.document, once.selection.as_ref());
    assert_eq!(twice.document, original);
}

#[test]
fn test_toggle_code_block_strips_marks() {
    let original = doc(vec![Node::paragraph_with(vec![
        Node::text_with_marks("let", vec![Mark::Bold]),
        Node::text(" x = 1;"),
    ])]);
    let once = EditorCommand::ToggleCodeBlock.apply(&original, Some(&cursor(vec![0], 0)));
    let code = &once.document.children[0];
    assert_eq!(code.kind, NodeKind::CodeBlock);
    assert_eq!(code.text_content(), "let x = 1;");
    assert!(code.children().iter().all(|t| t.marks.is_empty()));

    let twice = EditorCommand::ToggleCodeBlock.apply(&once.document, once.selection.as_ref());
    assert_eq!(twice.document, doc(vec![p("let x = 1;")]));
}

#[test]
fn test_toggle_inside_section_stays_in_section() {
    let mut section = Node::section();
    section.children = Some(vec![p("inner")]);
    let original = doc(vec![p("outer"), section]);

    let result = EditorCommand::ToggleBulletList.apply(&original, Some(&cursor(vec![1, 0], 0)));
    let section = &result.document.children[1];
    assert_eq!(section.kind, NodeKind::Section);
    assert_eq!(section.children()[0].kind, NodeKind::BulletList);
    assert_eq!(result.document.children[0], p("outer"));
}

#[test]
fn test_insert_section_after_cursor_block() {
    let original = doc(vec![p("first"), p("last")]);
    let result = EditorCommand::InsertSection.apply(&original, Some(&cursor(vec![0], 5)));

    assert!(result.applied);
    assert_eq!(result.document.children.len(), 3);
    assert_eq!(result.document.children[1], Node::section());
    assert_eq!(result.selection, Some(cursor(vec![1, 0], 0)));
    assert!(result.document.validate().is_ok());
}

#[test]
fn test_line_break_on_empty_paragraph_inserts_section() {
    let original = doc(vec![p("title"), Node::paragraph()]);
    let selection = cursor(vec![1], 0);

    let handled = handle_line_break(&original, Some(&selection), false).unwrap();
    assert_eq!(handled.document.children[2], Node::section());

    assert!(handle_line_break(&original, Some(&selection), true).is_none());
    assert!(handle_line_break(&original, Some(&cursor(vec![0], 5)), false).is_none());
    assert!(handle_line_break(&original, None, false).is_none());
}

#[test]
fn test_toggle_bold_splits_and_merges() {
    let original = doc(vec![p("hello world")]);
    let selection = range((vec![0], 0), (vec![0], 5));

    let once = EditorCommand::ToggleMark {
        mark: MarkKind::Bold,
    }
    .apply(&original, Some(&selection));
    let inline = once.document.children[0].children();
    assert_eq!(inline.len(), 2);
    assert_eq!(inline[0].text.as_deref(), Some("hello"));
    assert_eq!(inline[0].marks, vec![Mark::Bold]);
    assert!(inline[1].marks.is_empty());

    let twice = EditorCommand::ToggleMark {
        mark: MarkKind::Bold,
    }
    .apply(&once.document, Some(&selection));
    assert_eq!(twice.document, original);
}

#[test]
fn test_toggle_mark_partially_marked_range_adds() {
    let original = doc(vec![Node::paragraph_with(vec![
        Node::text_with_marks("ab", vec![Mark::Italic]),
        Node::text("cd"),
    ])]);
    let selection = range((vec![0], 0), (vec![0], 4));
    let result = EditorCommand::ToggleMark {
        mark: MarkKind::Italic,
    }
    .apply(&original, Some(&selection));

    let inline = result.document.children[0].children();
    assert_eq!(inline.len(), 1);
    assert_eq!(inline[0].text.as_deref(), Some("abcd"));
    assert_eq!(inline[0].marks, vec![Mark::Italic]);
}

#[test]
fn test_mark_on_collapsed_selection_is_noop() {
    let original = doc(vec![p("hello")]);
    let result = EditorCommand::ToggleMark {
        mark: MarkKind::Underline,
    }
    .apply(&original, Some(&cursor(vec![0], 2)));
    assert!(!result.applied);
}

#[test]
fn test_mark_across_blocks_skips_code() {
    let original = doc(vec![p("abc"), Node::code_block("fn x()"), p("def")]);
    let selection = range((vec![0], 1), (vec![2], 2));
    let result = EditorCommand::ToggleMark {
        mark: MarkKind::Strike,
    }
    .apply(&original, Some(&selection));

    let first = result.document.children[0].children();
    assert_eq!(first[1].text.as_deref(), Some("bc"));
    assert!(first[1].has_mark(MarkKind::Strike));
    assert_eq!(result.document.children[1], Node::code_block("fn x()"));
    let last = result.document.children[2].children();
    assert_eq!(last[0].text.as_deref(), Some("de"));
    assert!(last[0].has_mark(MarkKind::Strike));
}

#[test]
fn test_set_link_replaces_and_removes() {
    let original = doc(vec![p("docs")]);
    let selection = range((vec![0], 0), (vec![0], 4));

    let linked = EditorCommand::SetLink {
        href: Some("https://a.example".to_string()),
    }
    .apply(&original, Some(&selection));
    let relinked = EditorCommand::SetLink {
        href: Some("https://b.example".to_string()),
    }
    .apply(&linked.document, Some(&selection));
    let text = &relinked.document.children[0].children()[0];
    assert_eq!(text.marks, vec![Mark::link("https://b.example")]);

    let cleared = EditorCommand::SetLink {
        href: Some(String::new()),
    }
    .apply(&relinked.document, Some(&selection));
    assert_eq!(cleared.document, original);

    let cleared_none = EditorCommand::SetLink { href: None }.apply(&linked.document, Some(&selection));
    assert_eq!(cleared_none.document, original);
}

#[test]
fn test_text_align_applies_to_paragraphs_and_headings_only() {
    let original = doc(vec![
        Node::heading(1, vec![Node::text("h")]),
        Node::code_block("c"),
        p("p"),
    ]);
    let selection = range((vec![0], 0), (vec![2], 1));
    let result = EditorCommand::SetTextAlign {
        alignment: Alignment::Center,
    }
    .apply(&original, Some(&selection));

    assert_eq!(result.document.children[0].alignment(), Some(Alignment::Center));
    assert_eq!(result.document.children[1].alignment(), None);
    assert_eq!(result.document.children[2].alignment(), Some(Alignment::Center));

    let right = EditorCommand::SetTextAlign {
        alignment: Alignment::Right,
    }
    .apply(&result.document, Some(&cursor(vec![2], 0)));
    assert_eq!(right.document.children[2].alignment(), Some(Alignment::Right));
}

#[test]
fn test_align_on_code_block_only_is_noop() {
    let original = doc(vec![Node::code_block("c")]);
    let result = EditorCommand::SetTextAlign {
        alignment: Alignment::Left,
    }
    .apply(&original, Some(&cursor(vec![0], 0)));
    assert!(!result.applied);
}

#[test]
fn test_command_wire_shape() {
    let value = serde_json::to_value(EditorCommand::SetHeading { level: 2 }).unwrap();
    assert_eq!(value, serde_json::json!({"command": "setHeading", "level": 2}));

    let parsed: EditorCommand =
        serde_json::from_value(serde_json::json!({"command": "toggleMark", "mark": "bold"}))
            .unwrap();
    assert_eq!(
        parsed,
        EditorCommand::ToggleMark {
            mark: MarkKind::Bold
        }
    );
}
