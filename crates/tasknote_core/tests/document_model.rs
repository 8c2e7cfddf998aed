use tasknote_core::model::document::UNTAGGED_SECTION_KEY;
use tasknote_core::{Document, IdentityMap, LineCodec, Priority, SortPolicy, Task};

const NOTE: &str = "\
# Inbox notes

Loose reminder line
- [ ] Call mom

### Work

- [ ] Write report !
- [x] File expenses !!!
  - [ ] Attach receipts

### Home

- [ ] Fix sink #urgent
";

fn parse(text: &str) -> (Document, IdentityMap) {
    let mut identity = IdentityMap::in_memory();
    let document = Document::parse(text, &LineCodec::default(), &mut identity);
    (document, identity)
}

#[test]
fn headings_become_lowercase_section_keys() {
    let (document, _) = parse(NOTE);
    let keys: Vec<&str> = document
        .sections()
        .iter()
        .map(|section| section.key.as_str())
        .collect();
    assert_eq!(keys, vec!["inbox notes", "work", "home"]);
    assert_eq!(document.tasks().count(), 5);
}

#[test]
fn single_word_heading_implies_a_tag() {
    let (document, _) = parse(NOTE);
    let home = document.section("home").unwrap();
    let sink = home.tasks().next().unwrap();
    assert_eq!(sink.tags, vec!["home", "urgent"]);

    let inbox = document.section("inbox notes").unwrap();
    assert_eq!(inbox.implied_tag(), None);
    assert!(inbox.tasks().next().unwrap().tags.is_empty());
}

#[test]
fn render_keeps_verbatim_lines_and_omits_implied_tags() {
    let (mut document, _) = parse(NOTE);
    document.sort(SortPolicy::Priority);
    let rendered = document.render(&LineCodec::default());
    assert_eq!(
        rendered,
        "\
# Inbox notes

Loose reminder line
- [ ] Call mom

### Work

- [x] File expenses !!!
  - [ ] Attach receipts
- [ ] Write report !

### Home

- [ ] Fix sink #urgent
"
    );
}

#[test]
fn render_is_a_fixed_point_after_one_pass() {
    let codec = LineCodec::default();
    let mut identity = IdentityMap::in_memory();
    let first = Document::parse(NOTE, &codec, &mut identity).render(&codec);
    let second = Document::parse(&first, &codec, &mut identity).render(&codec);
    assert_eq!(first, second);
}

#[test]
fn ids_are_stable_across_parses() {
    let codec = LineCodec::default();
    let mut identity = IdentityMap::in_memory();
    let first = Document::parse(NOTE, &codec, &mut identity).task_ids();
    let second = Document::parse(NOTE, &codec, &mut identity).task_ids();
    assert_eq!(first, second);
    assert_eq!(first.len(), 5);
}

#[test]
fn duplicate_lines_get_distinct_ids() {
    let text = "- [ ] Water plants\n- [ ] Water plants\n";
    let codec = LineCodec::default();
    let mut identity = IdentityMap::in_memory();
    let first: Vec<String> = Document::parse(text, &codec, &mut identity)
        .tasks()
        .map(|task| task.id.clone())
        .collect();
    let second: Vec<String> = Document::parse(text, &codec, &mut identity)
        .tasks()
        .map(|task| task.id.clone())
        .collect();
    assert_ne!(first[0], first[1]);
    assert_eq!(first, second);
}

#[test]
fn indentation_infers_blockers() {
    let text = "\
- [ ] Parent
  - [ ] Child A
  - [ ] Child B
        - [ ] Grandchild
- [ ] Sibling
";
    let (document, _) = parse(text);
    let records = document.records();
    let id_of = |text: &str| {
        records
            .iter()
            .find(|record| record.text == text)
            .map(|record| record.id.clone())
            .unwrap()
    };
    let blocker_of = |text: &str| {
        records
            .iter()
            .find(|record| record.text == text)
            .and_then(|record| record.blocked_by.clone())
    };

    assert_eq!(blocker_of("Parent"), None);
    assert_eq!(blocker_of("Child A"), Some(id_of("Parent")));
    assert_eq!(blocker_of("Child B"), Some(id_of("Parent")));
    assert_eq!(blocker_of("Grandchild"), Some(id_of("Child B")));
    assert_eq!(blocker_of("Sibling"), None);
    assert_eq!(records[3].indent, 8);
}

#[test]
fn legacy_bracket_id_is_adopted_and_dropped_on_render() {
    let text = "- [ ] [DEADBEEF] Renew passport !\n";
    let codec = LineCodec::default();
    let (document, identity) = parse(text);
    let task = document.tasks().next().unwrap();
    assert_eq!(task.id, "deadbeef");
    assert_eq!(identity.lookup("renew passport").map(String::as_str), Some("deadbeef"));
    assert_eq!(document.render(&codec), "- [ ] Renew passport !\n");
}

#[test]
fn removing_last_task_drops_the_heading() {
    let (mut document, _) = parse(NOTE);
    let sink = document.section("home").unwrap().tasks().next().unwrap().id.clone();
    document.remove_task(&sink).unwrap();
    let rendered = document.render(&LineCodec::default());
    assert!(!rendered.contains("### Home"));
    assert!(rendered.contains("### Work"));
}

#[test]
fn empty_heading_is_kept_and_new_sections_append() {
    let (mut document, _) = parse("### Someday\n");
    let mut task = Task::new("0000aaaa", "Learn Rust");
    task.priority = Priority::High;
    task.tags = vec!["study".to_string()];
    document.insert_task(Some("study"), task, 3);

    let mut loose = Task::new("0000bbbb", "Stretch");
    loose.priority = Priority::Low;
    document.insert_task(None, loose, 3);

    assert_eq!(document.sections()[0].key, UNTAGGED_SECTION_KEY);
    assert_eq!(
        document.render(&LineCodec::default()),
        "- [ ] Stretch\n\n### Someday\n\n### study\n\n- [ ] Learn Rust !!\n"
    );
}

#[test]
fn edited_copy_above_the_original_does_not_take_its_id() {
    let codec = LineCodec::default();
    let mut identity = IdentityMap::in_memory();
    let original = Document::parse("- [ ] Call mom about the trip\n", &codec, &mut identity)
        .tasks()
        .next()
        .unwrap()
        .id
        .clone();

    let edited = Document::parse(
        "- [ ] Call mom about the trips\n- [ ] Call mom about the trip\n",
        &codec,
        &mut identity,
    );
    let ids: Vec<&str> = edited.tasks().map(|task| task.id.as_str()).collect();
    assert_eq!(ids[1], original);
    assert_ne!(ids[0], original);
}
