use super::*;

#[test]
fn new_channel_is_empty() {
    let ch = FeedbackChannel::new();
    assert!(ch.is_empty());
    assert!(ch.messages().next().is_none());
}

#[test]
fn pushes_queue_in_arrival_order() {
    let mut ch = FeedbackChannel::new();
    let a = ch.push(FeedbackKind::Info, "first", 3000);
    let b = ch.push(FeedbackKind::Error, "second", 3000);
    let c = ch.push(FeedbackKind::Info, "first", 3000);
    assert!(a < b && b < c);
    let texts: Vec<&str> = ch.messages().map(|m| m.text.as_str()).collect();
    assert_eq!(texts, ["first", "second", "first"]);
    assert_eq!(ch.messages().next().unwrap().id, a);
}

#[test]
fn dismiss_removes_only_the_front() {
    let mut ch = FeedbackChannel::new();
    ch.push(FeedbackKind::Info, "one", 3000);
    ch.push(FeedbackKind::Info, "two", 3000);
    assert_eq!(ch.dismiss().unwrap().text, "one");
    assert_eq!(ch.messages().next().unwrap().text, "two");
    assert_eq!(ch.len(), 1);
}

#[test]
fn dismiss_on_empty_is_none() {
    let mut ch = FeedbackChannel::new();
    assert!(ch.dismiss().is_none());
}

#[test]
fn expire_starts_clock_on_first_sight() {
    let mut ch = FeedbackChannel::new();
    ch.push(FeedbackKind::Info, "saved", 1000);
    let t0 = Instant::now();
    assert!(ch.expire(t0).is_none());
    assert!(ch.expire(t0 + Duration::from_millis(999)).is_none());
    let expired = ch.expire(t0 + Duration::from_millis(1000)).unwrap();
    assert_eq!(expired.text, "saved");
    assert!(ch.is_empty());
}

#[test]
fn expire_shows_messages_one_at_a_time() {
    let mut ch = FeedbackChannel::new();
    ch.push(FeedbackKind::Info, "a", 100);
    ch.push(FeedbackKind::Info, "b", 100);
    let t0 = Instant::now();
    ch.expire(t0);
    assert_eq!(ch.expire(t0 + Duration::from_millis(100)).unwrap().text, "a");
    // "b" starts its own display time when "a" leaves.
    assert!(ch.expire(t0 + Duration::from_millis(150)).is_none());
    assert_eq!(ch.expire(t0 + Duration::from_millis(200)).unwrap().text, "b");
}

#[test]
fn expire_on_empty_is_none() {
    let mut ch = FeedbackChannel::new();
    assert!(ch.expire(Instant::now()).is_none());
}
