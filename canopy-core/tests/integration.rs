//! Integration Tests for Reactive Trees
//!
//! These tests verify that zoomed and chosen nodes, activation and batched
//! delivery work together through the public API.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use canopy_core::prelude::*;
use canopy_core::{in_batch, SubscriberId};

type Log<T> = Rc<RefCell<Vec<T>>>;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Subscribe a recorder to `store`, returning its log and the live handle.
fn record<T, S>(store: &S) -> (Log<T>, Subscription)
where
    T: Clone + 'static,
    S: Readable<T>,
{
    let log: Log<T> = Rc::default();
    let sink = Rc::clone(&log);
    let subscription = store.subscribe(move |value: &T| sink.borrow_mut().push(value.clone()));
    (log, subscription)
}

fn logged<T: Clone>(log: &Log<T>) -> Vec<T> {
    log.borrow().clone()
}

// ----------------------------------------------------------------------------
// Fixtures
// ----------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq)]
struct Flat {
    one: i32,
    two: i32,
    three: i32,
}
impl Identity for Flat {}

#[derive(Clone, Debug, PartialEq)]
struct Deep {
    one: One,
}
impl Identity for Deep {}

#[derive(Clone, Debug, PartialEq)]
struct One {
    two: Two,
}
impl Identity for One {}

#[derive(Clone, Debug, PartialEq)]
struct Two {
    three: i32,
}
impl Identity for Two {}

fn flat() -> Flat {
    Flat {
        one: 1,
        two: 2,
        three: 3,
    }
}

fn deep() -> Deep {
    Deep {
        one: One {
            two: Two { three: 0 },
        },
    }
}

// ----------------------------------------------------------------------------
// Store contract
// ----------------------------------------------------------------------------

#[test]
fn writable_tree_delivers_until_unsubscribed() {
    init_tracing();
    let count = writable_tree(0);
    let (values, subscription) = record(&count);

    count.set(1);
    count.update(|n| n + 1);
    subscription.unsubscribe();

    count.set(3);
    count.update(|n| n + 1);

    assert_eq!(logged(&values), vec![0, 1, 2]);
    assert_eq!(count.get(), Some(4));
}

#[test]
fn empty_value_is_delivered_initially() {
    let store: Tree<Option<i32>> = writable_tree(None);
    let (values, subscription) = record(&store);
    subscription.unsubscribe();

    assert_eq!(logged(&values), vec![None]);
}

#[test]
fn start_callback_follows_the_first_and_last_subscriber() {
    let called = Rc::new(Cell::new(0));
    let counter = Rc::clone(&called);
    let store = Tree::with_activation(0, move |_set: Setter<i32>| {
        counter.set(counter.get() + 1);
        let counter = Rc::clone(&counter);
        Teardown::new(move || counter.set(counter.get() - 1))
    });

    let first = store.subscribe(|_| {});
    assert_eq!(called.get(), 1);

    let second = store.subscribe(|_| {});
    assert_eq!(called.get(), 1);

    first.unsubscribe();
    assert_eq!(called.get(), 1);

    second.unsubscribe();
    assert_eq!(called.get(), 0);
}

#[test]
fn compound_values_are_never_assumed_unchanged() {
    let store = writable_tree(flat());
    let called = Rc::new(Cell::new(0));
    let counter = Rc::clone(&called);
    let _subscription = store.subscribe(move |_| counter.set(counter.get() + 1));

    store.set(flat());
    assert_eq!(called.get(), 2);

    store.update(|value| value);
    assert_eq!(called.get(), 3);
}

#[test]
fn subscriber_is_called_once_initially_including_on_resubscription() {
    let num = Rc::new(Cell::new(0));
    let source = Rc::clone(&num);
    let store = Tree::with_activation(0, move |set: Setter<i32>| {
        source.set(source.get() + 1);
        set.set(source.get());
        Teardown::none()
    });

    let count1 = Rc::new(Cell::new(0));
    let counter = Rc::clone(&count1);
    store
        .subscribe(move |_| counter.set(counter.get() + 1))
        .unsubscribe();
    assert_eq!(count1.get(), 1);

    let count2 = Rc::new(Cell::new(0));
    let counter = Rc::clone(&count2);
    let subscription = store.subscribe(move |_| counter.set(counter.get() + 1));
    assert_eq!(count2.get(), 1);
    assert_eq!(num.get(), 2);

    subscription.unsubscribe();
}

// ----------------------------------------------------------------------------
// Zoom
// ----------------------------------------------------------------------------

#[test]
fn setting_the_parent_calls_child_and_parent_subscribers() {
    let parent = writable_tree(flat());
    let child_one = parent.zoom(field!(Flat, one));
    let child_two = parent.zoom(field!(Flat, two));
    let child_three = parent.zoom(field!(Flat, three));

    let (one, _s1) = record(&child_one);
    let (two, _s2) = record(&child_two);
    let (three, _s3) = record(&child_three);
    let (whole, _s4) = record(&parent);

    parent.set(flat());

    assert_eq!(logged(&one), vec![1, 1]);
    assert_eq!(logged(&two), vec![2, 2]);
    assert_eq!(logged(&three), vec![3, 3]);
    assert_eq!(logged(&whole), vec![flat(), flat()]);
}

#[test]
fn setting_the_parent_calls_all_descendant_subscribers() {
    let parent = writable_tree(deep());
    let child_one = parent.zoom(field!(Deep, one));
    let child_two = child_one.zoom(field!(One, two));
    let child_three = child_two.zoom(field!(Two, three));

    let (one, _s1) = record(&child_one);
    let (two, _s2) = record(&child_two);
    let (three, _s3) = record(&child_three);
    let (whole, _s4) = record(&parent);

    parent.set(deep());

    let init = deep();
    assert_eq!(logged(&one), vec![init.one.clone(); 2]);
    assert_eq!(logged(&two), vec![init.one.two.clone(); 2]);
    assert_eq!(logged(&three), vec![0, 0]);
    assert_eq!(logged(&whole), vec![init; 2]);
}

#[test]
fn setting_a_middle_node_calls_ancestors_itself_and_descendants() {
    let parent = writable_tree(deep());
    let child_one = parent.zoom(field!(Deep, one));
    let child_two = child_one.zoom(field!(One, two));
    let child_three = child_two.zoom(field!(Two, three));

    let (one, _s1) = record(&child_one);
    let (two, _s2) = record(&child_two);
    let (three, _s3) = record(&child_three);
    let (whole, _s4) = record(&parent);

    let init = deep();
    child_one.set(init.one.clone());
    child_two.set(init.one.two.clone());

    assert_eq!(logged(&one), vec![init.one.clone(); 3]);
    assert_eq!(logged(&two), vec![init.one.two.clone(); 3]);
    assert_eq!(logged(&three), vec![0; 3]);
    assert_eq!(logged(&whole), vec![init; 3]);
}

#[test]
fn setting_a_middle_node_skips_its_siblings() {
    #[derive(Clone, Debug, PartialEq)]
    struct Root {
        one: Branches,
    }
    impl Identity for Root {}

    #[derive(Clone, Debug, PartialEq)]
    struct Branches {
        two: Two,
        another_two: Two,
    }
    impl Identity for Branches {}

    let init = Root {
        one: Branches {
            two: Two { three: 0 },
            another_two: Two { three: 0 },
        },
    };
    let parent = writable_tree(init.clone());
    let child_one = parent.zoom(field!(Root, one));
    let child_two = child_one.zoom(field!(Branches, two));
    let child_another_two = child_one.zoom(field!(Branches, another_two));
    let child_three = child_two.zoom(field!(Two, three));
    let child_another_three = child_another_two.zoom(field!(Two, three));

    let (one, _s1) = record(&child_one);
    let (two, _s2) = record(&child_two);
    let (another_two, _s3) = record(&child_another_two);
    let (three, _s4) = record(&child_three);
    let (another_three, _s5) = record(&child_another_three);
    let (whole, _s6) = record(&parent);

    let set_value = Two { three: 2 };
    let mut expected = init.clone();
    expected.one.two = set_value.clone();

    child_two.set(set_value.clone());

    assert_eq!(logged(&one), vec![init.one.clone(), expected.one.clone()]);
    assert_eq!(logged(&two), vec![init.one.two.clone(), set_value]);
    assert_eq!(logged(&another_two), vec![init.one.another_two.clone()]);
    assert_eq!(logged(&three), vec![0, 2]);
    assert_eq!(logged(&another_three), vec![0]);
    assert_eq!(logged(&whole), vec![init, expected]);
}

#[test]
fn updating_a_leaf_calls_its_ancestors() {
    #[derive(Clone, Debug, PartialEq)]
    struct Parent {
        child: Child,
    }
    impl Identity for Parent {}

    #[derive(Clone, Debug, PartialEq)]
    struct Child {
        grand_child: i32,
    }
    impl Identity for Child {}

    let parent = writable_tree(Parent {
        child: Child { grand_child: 1 },
    });
    let child = parent.zoom(field!(Parent, child));
    let grand_child = child.zoom(field!(Child, grand_child));

    let (parents, _s1) = record(&parent);
    let (children, _s2) = record(&child);
    let (grand_children, _s3) = record(&grand_child);

    assert!(grand_child.update(|n| n + 1));

    assert_eq!(
        logged(&parents),
        vec![
            Parent {
                child: Child { grand_child: 1 }
            },
            Parent {
                child: Child { grand_child: 2 }
            },
        ]
    );
    assert_eq!(
        logged(&children),
        vec![Child { grand_child: 1 }, Child { grand_child: 2 }]
    );
    assert_eq!(logged(&grand_children), vec![1, 2]);
}

#[test]
fn setting_a_leaf_skips_its_siblings() {
    let parent = writable_tree(flat());
    let child_one = parent.zoom(field!(Flat, one));
    let child_two = parent.zoom(field!(Flat, two));
    let child_three = parent.zoom(field!(Flat, three));

    let (one, _s1) = record(&child_one);
    let (two, _s2) = record(&child_two);
    let (three, _s3) = record(&child_three);
    let (whole, _s4) = record(&parent);

    child_one.set(9);

    assert_eq!(logged(&one), vec![1, 9]);
    assert_eq!(logged(&two), vec![2]);
    assert_eq!(logged(&three), vec![3]);
    assert_eq!(logged(&whole), vec![flat(), Flat { one: 9, ..flat() }]);
}

#[test]
fn deliveries_run_ancestors_then_self_then_descendants_breadth_first() {
    let parent = writable_tree(deep());
    let one = parent.zoom(field!(Deep, one));
    let two = one.zoom(field!(One, two));
    let three = two.zoom(field!(Two, three));

    let order: Log<&'static str> = Rc::default();
    let mut subscriptions = Vec::new();
    let sink = Rc::clone(&order);
    subscriptions.push(parent.subscribe(move |_| sink.borrow_mut().push("root")));
    let sink = Rc::clone(&order);
    subscriptions.push(one.subscribe(move |_| sink.borrow_mut().push("one")));
    let sink = Rc::clone(&order);
    subscriptions.push(two.subscribe(move |_| sink.borrow_mut().push("two")));
    let sink = Rc::clone(&order);
    subscriptions.push(three.subscribe(move |_| sink.borrow_mut().push("three")));
    order.borrow_mut().clear();

    two.set(Two { three: 1 });
    assert_eq!(logged(&order), vec!["one", "root", "two", "three"]);

    order.borrow_mut().clear();
    parent.set(deep());
    assert_eq!(logged(&order), vec!["root", "one", "two", "three"]);
}

// ----------------------------------------------------------------------------
// Choose
// ----------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq)]
enum Shape {
    A(i32),
    B(String),
}
impl Identity for Shape {}

#[test]
fn chosen_subscribers_are_called_only_when_accepted() {
    let both: Tree<Option<Shape>> = writable_tree(None);
    let a = both.choose_writable(|v: &Option<Shape>| {
        v.clone().filter(|s| matches!(s, Shape::A(_)))
    });
    let b = both.choose_writable(|v: &Option<Shape>| {
        v.clone().filter(|s| matches!(s, Shape::B(_)))
    });

    let (all, _s1) = record(&both);
    let (only_a, _s2) = record(&a);
    let (only_b, _s3) = record(&b);

    both.set(Some(Shape::A(100)));

    assert_eq!(logged(&only_a), vec![Shape::A(100)]);
    assert!(logged(&only_b).is_empty());
    assert_eq!(logged(&all), vec![None, Some(Shape::A(100))]);

    b.set(Shape::B("written through b".to_string()));
    assert_eq!(logged(&only_a), vec![Shape::A(100)]);
    assert_eq!(logged(&only_b), vec![Shape::B("written through b".to_string())]);
}

#[derive(Clone, Debug, PartialEq)]
struct Value {
    value: String,
    child: Option<Child>,
}
impl Identity for Value {}

#[derive(Clone, Debug, PartialEq)]
struct Child {
    child_value: String,
    grand_child: GrandChild,
}
impl Identity for Child {}

#[derive(Clone, Debug, PartialEq)]
struct GrandChild {
    a: String,
    b: String,
}
impl Identity for GrandChild {}

fn grand_child(a: &str, b: &str) -> GrandChild {
    GrandChild {
        a: a.to_string(),
        b: b.to_string(),
    }
}

fn child(child_value: &str, a: &str, b: &str) -> Child {
    Child {
        child_value: child_value.to_string(),
        grand_child: grand_child(a, b),
    }
}

struct Family {
    parent: Tree<Value>,
    maybe_child: Tree<Option<Child>>,
    init: Value,
    parents: Log<Value>,
    maybe_children: Log<Option<Child>>,
    children: Log<Child>,
    grand_children: Log<GrandChild>,
    a: Log<String>,
    b: Log<String>,
    _subscriptions: Vec<Subscription>,
}

fn family() -> Family {
    let init = Value {
        value: "initValue".to_string(),
        child: Some(child("initChildValue", "initA", "initB")),
    };

    let parent = writable_tree(init.clone());
    let maybe_child = parent.zoom(field!(Value, child));
    let chosen = maybe_child.choose_writable(present());
    let grand = chosen.zoom(field!(Child, grand_child));
    let a = grand.zoom(field!(GrandChild, a));
    let b = grand.zoom(field!(GrandChild, b));

    let (parents, s1) = record(&parent);
    let (maybe_children, s2) = record(&maybe_child);
    let (children, s3) = record(&chosen);
    let (grand_children, s4) = record(&grand);
    let (a_log, s5) = record(&a);
    let (b_log, s6) = record(&b);

    Family {
        parent,
        maybe_child,
        init,
        parents,
        maybe_children,
        children,
        grand_children,
        a: a_log,
        b: b_log,
        _subscriptions: vec![s1, s2, s3, s4, s5, s6],
    }
}

#[test]
fn refused_branch_prunes_descendants_until_accepted_again() {
    let family = family();
    let init_child = family.init.child.clone();
    let set_child = child("newChildValue", "newA", "newB");

    family.maybe_child.set(None);
    family.maybe_child.set(Some(set_child.clone()));

    let cleared = Value {
        child: None,
        ..family.init.clone()
    };
    let refilled = Value {
        child: Some(set_child.clone()),
        ..family.init.clone()
    };
    assert_eq!(
        logged(&family.parents),
        vec![family.init.clone(), cleared, refilled]
    );
    assert_eq!(
        logged(&family.maybe_children),
        vec![init_child.clone(), None, Some(set_child.clone())]
    );
    assert_eq!(
        logged(&family.children),
        vec![init_child.clone().unwrap(), set_child.clone()]
    );
    assert_eq!(
        logged(&family.grand_children),
        vec![grand_child("initA", "initB"), grand_child("newA", "newB")]
    );
    assert_eq!(logged(&family.a), vec!["initA", "newA"]);
    assert_eq!(logged(&family.b), vec!["initB", "newB"]);
}

#[test]
fn refused_branch_from_the_root_prunes_descendants() {
    let family = family();
    let set1 = Value {
        value: "value1".to_string(),
        child: None,
    };
    let set2 = Value {
        value: "value2".to_string(),
        child: Some(child("childValue2", "A2", "B2")),
    };

    family.parent.set(set1.clone());
    family.parent.set(set2.clone());

    assert_eq!(
        logged(&family.parents),
        vec![family.init.clone(), set1.clone(), set2.clone()]
    );
    assert_eq!(
        logged(&family.maybe_children),
        vec![family.init.child.clone(), None, set2.child.clone()]
    );
    assert_eq!(
        logged(&family.children),
        vec![family.init.child.clone().unwrap(), set2.child.clone().unwrap()]
    );
    assert_eq!(
        logged(&family.grand_children),
        vec![grand_child("initA", "initB"), grand_child("A2", "B2")]
    );
    assert_eq!(logged(&family.a), vec!["initA", "A2"]);
    assert_eq!(logged(&family.b), vec!["initB", "B2"]);
}

#[test]
fn writes_below_a_refused_branch_fail() {
    let family = family();
    let a = family
        .maybe_child
        .choose_writable(present())
        .zoom(field!(Child, grand_child))
        .zoom(field!(GrandChild, a));

    family.maybe_child.set(None);

    assert_eq!(a.try_set("lost".to_string()), Err(TreeError::Vacant));
    assert!(!a.update(|s| s + "!"));
    assert_eq!(a.get(), None);
    assert_eq!(family.maybe_child.get(), Some(None));
}

#[test]
fn filter_suppresses_and_resumes() {
    let number = writable_tree(1);
    let even = number.filter(|n| n % 2 == 0);
    let (evens, _s) = record(&even);
    assert!(logged(&evens).is_empty());

    number.set(2);
    number.set(3);
    number.set(4);
    assert_eq!(logged(&evens), vec![2, 4]);

    // Writes go through even when the result is refused.
    even.set(5);
    assert_eq!(number.get(), Some(5));
    assert_eq!(even.get(), None);
    assert_eq!(logged(&evens), vec![2, 4]);
}

#[test]
fn read_only_choose_tracks_the_parent() {
    let shape: Tree<Option<Shape>> = writable_tree(Some(Shape::B("b".to_string())));
    let number = shape.read_only().choose(|v: &Option<Shape>| match v {
        Some(Shape::A(n)) => Some(*n),
        _ => None,
    });
    let (numbers, _s) = record(&number);

    shape.set(Some(Shape::A(1)));
    shape.set(Some(Shape::A(2)));
    shape.set(None);

    assert_eq!(logged(&numbers), vec![1, 2]);
    assert_eq!(number.get(), None);
}

// ----------------------------------------------------------------------------
// Keyed zoom
// ----------------------------------------------------------------------------

#[test]
fn zoom_in_reads_and_inserts_map_entries() {
    let scores = writable_tree(BTreeMap::from([("ann".to_string(), 1)]));
    let ann = scores.zoom_in("ann".to_string());
    let bob = scores.zoom_in("bob".to_string());

    let (anns, _s1) = record(&ann);
    let (bobs, _s2) = record(&bob);
    assert!(logged(&bobs).is_empty());

    bob.set(7);
    ann.set(2);

    assert_eq!(logged(&anns), vec![1, 2]);
    assert_eq!(logged(&bobs), vec![7]);
    assert_eq!(
        scores.get(),
        Some(BTreeMap::from([("ann".to_string(), 2), ("bob".to_string(), 7)]))
    );
}

#[test]
fn entry_deletes_with_none() {
    let flags = writable_tree(HashMap::from([("dark", true), ("compact", false)]));
    let dark = flags.zoom(entry("dark"));
    let (seen, _s) = record(&dark);

    dark.set(None);

    assert_eq!(logged(&seen), vec![Some(true), None]);
    assert_eq!(flags.get().map(|m| m.contains_key("dark")), Some(false));
}

#[test]
fn vec_items_are_addressed_by_index() {
    let items = writable_tree(vec![10, 20]);
    let second = items.zoom_in(1);
    let third = items.zoom_in(2);
    let (seconds, _s1) = record(&second);
    let (thirds, _s2) = record(&third);

    second.update(|n| n + 1);
    third.set(30);

    assert_eq!(logged(&seconds), vec![20, 21]);
    assert_eq!(logged(&thirds), vec![30]);
    assert_eq!(items.get(), Some(vec![10, 21, 30]));
}

#[test]
fn write_past_the_end_of_a_vec_is_an_error() {
    let items = writable_tree(vec![1]);
    let (seen, _s) = record(&items);

    assert_eq!(
        items.zoom_in(5).try_set(7),
        Err(TreeError::OutOfRange { index: 5, len: 1 })
    );
    assert!(items.zoom_in(5).modify(|n| *n += 1).is_err());

    assert_eq!(items.get(), Some(vec![1]));
    assert_eq!(logged(&seen), vec![vec![1]]);
}

#[cfg(feature = "json")]
#[test]
fn json_members_are_zoomable() {
    use canopy_core::lens::json::{element, member};
    use serde_json::{json, Value as Json};

    let doc = writable_tree(json!({ "user": { "name": "ann", "tags": ["a"] } }));
    let name = doc.zoom(member("user")).zoom(member("name"));
    let first_tag = doc.zoom(member("user")).zoom(member("tags")).zoom(element(0));
    let (names, _s1) = record(&name);
    let (tags, _s2) = record(&first_tag);

    assert_eq!(name.try_set(json!("ann")), Ok(false));
    name.set(json!("bob"));

    assert_eq!(logged(&names), vec![Json::from("ann"), Json::from("bob")]);
    assert_eq!(logged(&tags), vec![json!("a")]);
    assert_eq!(
        doc.get(),
        Some(json!({ "user": { "name": "bob", "tags": ["a"] } }))
    );
}

// ----------------------------------------------------------------------------
// Activation
// ----------------------------------------------------------------------------

#[test]
fn activation_is_shared_by_every_derived_node() {
    let running = Rc::new(Cell::new(false));
    let flag = Rc::clone(&running);
    let parent = Tree::with_activation(flat(), move |_set: Setter<Flat>| {
        flag.set(true);
        let flag = Rc::clone(&flag);
        Teardown::new(move || flag.set(false))
    });
    let one = parent.zoom(field!(Flat, one));
    let two = parent.zoom(field!(Flat, two));

    let s1 = one.subscribe(|_| {});
    assert!(running.get());
    assert!(parent.is_active());

    let s2 = two.subscribe(|_| {});
    assert_eq!(parent.subscriber_count(), 2);

    s1.unsubscribe();
    assert!(running.get());
    s2.unsubscribe();
    assert!(!running.get());
    assert!(!one.is_active());
}

#[test]
fn setter_feeds_derived_subscribers_while_active() {
    let captured: Rc<RefCell<Option<Setter<Flat>>>> = Rc::default();
    let sink = Rc::clone(&captured);
    let parent = Tree::with_activation(flat(), move |set: Setter<Flat>| {
        *sink.borrow_mut() = Some(set);
        Teardown::none()
    });
    let two = parent.zoom(field!(Flat, two));
    let (twos, subscription) = record(&two);

    let setter = captured.borrow_mut().take().expect("activation ran");
    assert!(setter.update(|value| Flat { two: 20, ..value }));
    assert_eq!(logged(&twos), vec![2, 20]);

    subscription.unsubscribe();
    assert!(!setter.is_live());
    assert!(!setter.set(flat()));
    assert_eq!(parent.get().map(|v| v.two), Some(20));
}

#[test]
fn writes_to_an_inactive_tree_commit_silently() {
    let tree = writable_tree(0);
    let child = tree.zoom(accessor(|n: &i32| Some(n * 2), |n: &mut i32, v: i32| *n = v / 2));

    child.set(10);
    assert_eq!(tree.get(), Some(5));
    assert_eq!(child.get(), Some(10));
    assert!(!tree.is_active());
}

// ----------------------------------------------------------------------------
// Batching
// ----------------------------------------------------------------------------

#[test]
fn reentrant_writes_join_the_running_batch() {
    #[derive(Clone, Debug, PartialEq)]
    struct Pair {
        x: i32,
        y: i32,
    }
    impl Identity for Pair {}

    let tree = writable_tree(Pair { x: 0, y: 0 });
    let x = tree.zoom(field!(Pair, x));
    let y = tree.zoom(field!(Pair, y));

    let events: Log<String> = Rc::default();
    let sink = Rc::clone(&events);
    let _root = tree.subscribe(move |p: &Pair| {
        sink.borrow_mut().push(format!("root {} {}", p.x, p.y));
    });
    let sink = Rc::clone(&events);
    let _x = x.subscribe(move |v: &i32| {
        sink.borrow_mut().push(format!("x {v}"));
        if *v == 1 {
            assert!(in_batch());
            y.set(10);
            // Not delivered yet: the outer flush owns the batch.
            assert_eq!(sink.borrow().last().map(String::as_str), Some("x 1"));
        }
    });

    x.set(1);

    assert_eq!(
        logged(&events),
        vec!["root 0 0", "x 0", "root 1 0", "x 1", "root 1 10"]
    );
    assert!(!in_batch());
}

#[test]
fn unsubscribing_mid_flush_keeps_the_queued_delivery() {
    let tree = writable_tree(0);
    let second: Rc<RefCell<Option<Subscription>>> = Rc::default();

    let handle = Rc::clone(&second);
    let _first = tree.subscribe(move |v: &i32| {
        if *v == 1 {
            drop(handle.borrow_mut().take());
        }
    });
    let (seconds, subscription) = record(&tree);
    *second.borrow_mut() = Some(subscription);

    tree.set(1);
    tree.set(2);

    assert_eq!(logged(&seconds), vec![0, 1]);
    assert_eq!(tree.subscriber_count(), 1);
}

#[test]
fn subscribing_mid_flush_gets_the_current_value_once() {
    let tree = writable_tree(0);
    let late: Log<i32> = Rc::default();
    let held: Rc<RefCell<Vec<Subscription>>> = Rc::default();

    let (store, sink, keep) = (tree.clone(), Rc::clone(&late), Rc::clone(&held));
    let _first = tree.subscribe(move |v: &i32| {
        if *v == 1 {
            let sink = Rc::clone(&sink);
            keep.borrow_mut()
                .push(store.subscribe(move |v: &i32| sink.borrow_mut().push(*v)));
        }
    });

    tree.set(1);
    tree.set(2);

    assert_eq!(logged(&late), vec![1, 2]);
}

#[test]
fn write_from_an_invalidate_callback_leaves_every_listener_current() {
    let tree = writable_tree(0);
    let events: Log<(&'static str, i32)> = Rc::default();

    let sink = Rc::clone(&events);
    let _a = tree.subscribe(move |v: &i32| sink.borrow_mut().push(("a", *v)));
    let (sink, store, fired) = (Rc::clone(&events), tree.clone(), Rc::new(Cell::new(false)));
    let _b = tree.subscribe_with(
        move |v: &i32| sink.borrow_mut().push(("b", *v)),
        move || {
            if !fired.replace(true) {
                store.set(99);
            }
        },
    );

    tree.set(1);

    assert_eq!(tree.get(), Some(99));
    let events = logged(&events);
    let last = |name| events.iter().rev().find(|(n, _)| *n == name).map(|(_, v)| *v);
    assert_eq!(last("a"), Some(99));
    assert_eq!(last("b"), Some(99));
    assert_eq!(events[..3], [("a", 0), ("b", 0), ("a", 1)]);
}

#[test]
fn panicking_start_callback_does_not_wedge_the_tree() {
    init_tracing();
    let armed = Rc::new(Cell::new(true));
    let trip = Rc::clone(&armed);
    let tree = Tree::with_activation(0, move |_set: Setter<i32>| {
        if trip.replace(false) {
            panic!("source unavailable");
        }
        Teardown::none()
    });

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| tree.subscribe(|_| {})));
    assert!(result.is_err());
    assert_eq!(tree.subscriber_count(), 0);
    assert!(!tree.is_active());

    let (values, _s) = record(&tree);
    assert!(tree.is_active());
    tree.set(5);
    assert_eq!(logged(&values), vec![0, 5]);
}

#[test]
fn panicking_listener_does_not_wedge_the_tree() {
    init_tracing();
    let tree = writable_tree(0);
    let _bomb = tree.subscribe(|v: &i32| {
        if *v == 1 {
            panic!("listener failed");
        }
    });
    let (values, _s) = record(&tree);

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| tree.set(1)));
    assert!(result.is_err());
    assert!(!in_batch());

    tree.set(2);
    assert_eq!(logged(&values), vec![0, 2]);
}

#[test]
fn invalidate_precedes_every_delivery_of_a_batch() {
    let parent = writable_tree(flat());
    let one = parent.zoom(field!(Flat, one));

    let events: Log<&'static str> = Rc::default();
    let (run, invalidate) = (Rc::clone(&events), Rc::clone(&events));
    let _parent = parent.subscribe_with(
        move |_| run.borrow_mut().push("parent run"),
        move || invalidate.borrow_mut().push("parent invalidate"),
    );
    let (run, invalidate) = (Rc::clone(&events), Rc::clone(&events));
    let _one = one.subscribe_with(
        move |_| run.borrow_mut().push("one run"),
        move || invalidate.borrow_mut().push("one invalidate"),
    );
    events.borrow_mut().clear();

    parent.set(flat());

    assert_eq!(
        logged(&events),
        vec!["parent invalidate", "one invalidate", "parent run", "one run"]
    );
}

#[test]
fn subscription_ids_are_distinct() {
    let tree = writable_tree(0);
    let a = tree.subscribe(|_| {});
    let b = tree.subscribe(|_| {});
    let ids: [SubscriberId; 2] = [a.id(), b.id()];
    assert_ne!(ids[0], ids[1]);
}
