use chrono::{DateTime, TimeZone, Utc};
use hn_thread::hierarchy::HierarchicalView;
use hn_thread::slideshow::Slideshow;
use hn_thread::{Post, ThreadError, ThreadNavigator};

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

fn post(id: &str, secs: i64) -> Post {
    Post::new(id, at(secs))
}

fn assert_sorted(nav: &ThreadNavigator) {
    let sequence = nav.sequence();
    let keys: Vec<_> = sequence
        .iter()
        .map(|id| (nav.tree().get_node(id).unwrap().timestamp(), id.clone()))
        .collect();
    assert!(
        keys.windows(2).all(|pair| pair[0] <= pair[1]),
        "sequence out of order: {keys:?}"
    );
    assert_eq!(sequence.len(), nav.tree().len());
}

#[test]
fn documented_scenario() {
    let mut nav = ThreadNavigator::new();
    nav.upsert_root(post("R", 0)).unwrap();
    nav.upsert_replies("R", [post("A", 5), post("B", 2)], true)
        .unwrap();
    assert_eq!(nav.sequence().to_vec(), ["R", "B", "A"]);

    nav.upsert_replies("B", [post("C", 1)], true).unwrap();
    assert_eq!(nav.sequence().to_vec(), ["R", "C", "B", "A"]);
    assert_eq!(nav.tree().depth_of("C"), Ok(2));

    nav.move_to_root();
    assert!(nav.move_to_next());
    assert_eq!(nav.cursor(), Some("C"));

    assert_eq!(
        nav.move_to("unknown"),
        Err(ThreadError::UnknownNode("unknown".into()))
    );
    assert_eq!(nav.cursor(), Some("C"));

    nav.move_to("A").unwrap();
    assert!(!nav.move_to_next());
    assert_eq!(nav.cursor(), Some("A"));
}

#[test]
fn walking_forward_and_back_visits_every_post() {
    let mut nav = ThreadNavigator::new();
    nav.upsert_root(post("root", 100)).unwrap();
    nav.upsert_replies("root", [post("x", 300), post("y", 110)], true)
        .unwrap();
    nav.upsert_replies("x", [post("x1", 105), post("x2", 400)], true)
        .unwrap();
    nav.upsert_replies("y", [post("y1", 105)], false).unwrap();
    assert_sorted(&nav);

    let mut forward = vec![nav.cursor().unwrap().to_string()];
    while nav.move_to_next() {
        let here = nav.cursor().unwrap().to_string();
        assert!(nav.move_to_prev());
        assert_eq!(nav.cursor(), forward.last().map(String::as_str));
        assert!(nav.move_to_next());
        forward.push(here);
    }
    assert_eq!(forward, ["root", "x1", "y1", "y", "x", "x2"]);

    let mut backward = vec![nav.cursor().unwrap().to_string()];
    while nav.move_to_prev() {
        backward.push(nav.cursor().unwrap().to_string());
    }
    backward.reverse();
    assert_eq!(forward, backward);
}

#[test]
fn overlapping_fetches_do_not_duplicate() {
    let mut nav = ThreadNavigator::new();
    nav.upsert_root(post("R", 0)).unwrap();
    for _ in 0..3 {
        nav.upsert_replies("R", [post("A", 5), post("B", 2)], true)
            .unwrap();
        nav.upsert_replies("B", [post("C", 1)], true).unwrap();
    }
    assert_eq!(nav.tree().len(), 4);
    assert_eq!(nav.tree().children_of("R").len(), 2);
    assert_eq!(nav.sequence().to_vec(), ["R", "C", "B", "A"]);
}

#[test]
fn later_timestamp_wins_on_merge() {
    let mut nav = ThreadNavigator::new();
    nav.upsert_root(post("R", 0)).unwrap();
    nav.upsert_replies("R", [post("A", 5), post("B", 2)], true)
        .unwrap();
    nav.upsert_replies("R", [post("B", 9)], true).unwrap();
    assert_eq!(nav.sequence().to_vec(), ["R", "A", "B"]);
    assert_sorted(&nav);
}

#[test]
fn views_agree_on_membership() {
    let mut nav = ThreadNavigator::new();
    nav.upsert_root(post("R", 0)).unwrap();
    nav.upsert_replies("R", [post("late", 50), post("early", 1)], true)
        .unwrap();
    nav.upsert_replies("late", [post("deep", 2)], true).unwrap();

    let rows = HierarchicalView::new().visible_rows(nav.tree());
    let mut nested: Vec<_> = rows.iter().map(|row| row.id.clone()).collect();
    assert_eq!(nested, ["R", "late", "deep", "early"]);

    let mut flat = nav.sequence().to_vec();
    assert_eq!(flat, ["R", "early", "deep", "late"]);

    nested.sort();
    flat.sort();
    assert_eq!(nested, flat);
}

#[test]
fn slideshow_loops_while_thread_grows() {
    let mut nav = ThreadNavigator::new();
    let mut show = Slideshow::default();
    nav.upsert_root(post("R", 0)).unwrap();
    nav.upsert_replies("R", [post("A", 5)], false).unwrap();

    assert!(show.next(&mut nav));
    assert!(show.next(&mut nav));
    assert_eq!(nav.cursor(), Some("R"));

    nav.move_to("A").unwrap();
    nav.upsert_replies("A", [post("B", 7)], true).unwrap();
    assert!(show.next(&mut nav));
    assert_eq!(nav.cursor(), Some("B"));
    assert_eq!(Slideshow::label(&nav), "3 / 3");
}
