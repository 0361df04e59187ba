//! Integration tests for the matchmaking queue, driven through in-memory
//! connections with a paused clock.

use std::sync::Arc;
use std::time::Duration;

use hakkero_matchmaking::{Queue, QueueConfig, QueueSeat, StaticOpenings};
use hakkero_protocol::{JsonCodec, RoomId};
use hakkero_room::{RoomConfig, RoomError, RoomHandle, RoomManager, RoomRegistry};
use hakkero_session::{ActorConfig, ConnectionActor, User};
use hakkero_transport::{MemoryConnection, MemoryPeer};
use serde_json::{Value, json};
use tokio::task::JoinHandle;

// =========================================================================
// Helpers
// =========================================================================

fn seat(name: &str) -> (QueueSeat, MemoryPeer) {
    let (conn, peer) = MemoryConnection::pair();
    let actor = ConnectionActor::spawn(conn, JsonCodec, &ActorConfig::default());
    (QueueSeat::new(actor, User::new(name).unwrap()), peer)
}

fn queue_with<R: RoomManager>(
    config: QueueConfig,
    rooms: Arc<R>,
    openings: StaticOpenings,
) -> Arc<Queue<R, StaticOpenings>> {
    Arc::new(Queue::new(config, rooms, openings))
}

fn registry() -> Arc<RoomRegistry> {
    Arc::new(RoomRegistry::new(RoomConfig::default()))
}

fn spawn_enqueue<R: RoomManager>(
    queue: &Arc<Queue<R, StaticOpenings>>,
    seat: QueueSeat,
) -> JoinHandle<()> {
    let queue = Arc::clone(queue);
    tokio::spawn(async move { queue.enqueue(seat).await })
}

async fn recv(peer: &MemoryPeer) -> Value {
    let frame = peer.recv().await.expect("connection should still be open");
    serde_json::from_slice(&frame).unwrap()
}

async fn expect(peer: &MemoryPeer, kind: &str) -> Value {
    let value = recv(peer).await;
    assert_eq!(value["type"], kind, "unexpected message: {value}");
    value["message"].clone()
}

/// Skips queue-size updates and returns the next other message.
async fn after_sizes(peer: &MemoryPeer) -> Value {
    loop {
        let value = recv(peer).await;
        if value["type"] != "size" {
            return value;
        }
    }
}

fn answer(peer: &MemoryPeer, accepted: bool) {
    assert!(peer.send(json!({ "accepted": accepted }).to_string()));
}

/// Queues `names` so that the last one completes the batch. Returns the
/// peers, the users' identifiers and the task running the ready-check.
async fn fill<R: RoomManager>(
    queue: &Arc<Queue<R, StaticOpenings>>,
    names: &[&str],
) -> (Vec<MemoryPeer>, Vec<String>, JoinHandle<()>) {
    let mut peers = Vec::new();
    let mut ids = Vec::new();
    let (last, first) = names.split_last().unwrap();
    for name in first {
        let (seat, peer) = seat(name);
        ids.push(seat.user().id().to_owned());
        queue.enqueue(seat).await;
        peers.push(peer);
    }
    let (seat, peer) = seat(last);
    ids.push(seat.user().id().to_owned());
    peers.push(peer);
    let check = spawn_enqueue(queue, seat);
    (peers, ids, check)
}

/// A room manager that never manages to create a room.
struct NoRooms;

impl RoomManager for NoRooms {
    fn create(&self, _: Vec<User>, _: Duration, _: String) -> Result<RoomId, RoomError> {
        Err(RoomError::CreationFailed("out of rooms".into()))
    }

    fn get(&self, id: RoomId) -> Result<RoomHandle, RoomError> {
        Err(RoomError::NotFound(id))
    }
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_queue_size_is_broadcast_to_everyone_waiting() {
    let queue = queue_with(QueueConfig::default(), registry(), StaticOpenings::default());
    let (a, a_peer) = seat("ada");
    let (b, b_peer) = seat("bob");

    queue.enqueue(a).await;
    assert_eq!(expect(&a_peer, "size").await, json!({"size": 1}));

    queue.enqueue(b).await;
    assert_eq!(expect(&a_peer, "size").await, json!({"size": 2}));
    assert_eq!(expect(&b_peer, "size").await, json!({"size": 2}));
    assert_eq!(queue.waiting(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_all_accept_creates_one_room() {
    let rooms = registry();
    let queue = queue_with(QueueConfig::default(), Arc::clone(&rooms), StaticOpenings::default());
    let (peers, ids, check) = fill(&queue, &["a", "b", "c", "d"]).await;

    for size in 1..=4 {
        assert_eq!(expect(&peers[0], "size").await["size"], size);
    }
    assert_eq!(expect(&peers[3], "size").await["size"], 4);

    for peer in &peers {
        assert_eq!(after_sizes(peer).await["type"], "found");
        answer(peer, true);
    }
    for peer in &peers {
        let announcement = expect(peer, "announcement").await;
        assert_eq!(announcement["success"], true);
        assert_eq!(announcement["room"], 0);
        assert!(peer.recv().await.is_none(), "queue connection is closed");
    }
    check.await.unwrap();

    assert_eq!(rooms.len(), 1);
    let room = rooms.get(RoomId(0)).unwrap();
    for id in &ids {
        assert!(room.seat_of(id).is_some());
    }
    assert_eq!(queue.waiting(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_decline_recycles_the_acceptors() {
    let rooms = registry();
    let queue = queue_with(QueueConfig::default(), Arc::clone(&rooms), StaticOpenings::default());
    let (peers, _, check) = fill(&queue, &["a", "b", "c", "d"]).await;

    for (i, peer) in peers.iter().enumerate() {
        assert_eq!(after_sizes(peer).await["type"], "found");
        answer(peer, i != 2);
    }

    let rejected = expect(&peers[2], "announcement").await;
    assert_eq!(rejected["success"], false);
    assert!(rejected["announcement"].as_str().unwrap().contains("rejected"));
    assert!(peers[2].recv().await.is_none());

    for i in [0, 1, 3] {
        let failed = expect(&peers[i], "announcement").await;
        assert_eq!(failed["success"], false);
        assert!(failed.get("room").is_none());
    }
    check.await.unwrap();

    // Back in the queue, in their original order.
    assert_eq!(expect(&peers[0], "size").await["size"], 1);
    assert_eq!(expect(&peers[0], "size").await["size"], 2);
    assert_eq!(expect(&peers[1], "size").await["size"], 2);
    assert_eq!(expect(&peers[3], "size").await["size"], 3);
    assert_eq!(queue.waiting(), 3);
    assert!(rooms.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_silent_player_times_out_of_the_check() {
    let rooms = registry();
    let queue = queue_with(QueueConfig::default(), Arc::clone(&rooms), StaticOpenings::default());
    let (peers, _, check) = fill(&queue, &["a", "b", "c", "d"]).await;

    for (i, peer) in peers.iter().enumerate() {
        after_sizes(peer).await;
        if i != 3 {
            answer(peer, true);
        }
    }

    let timed_out = expect(&peers[3], "announcement").await;
    assert!(timed_out["announcement"].as_str().unwrap().contains("timed out"));
    assert!(peers[3].recv().await.is_none());
    check.await.unwrap();

    assert_eq!(queue.waiting(), 3);
    assert!(rooms.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_answer_sent_before_found_is_ignored() {
    let config = QueueConfig::default().with_player_limit(2);
    let queue = queue_with(config, registry(), StaticOpenings::default());

    let (a, a_peer) = seat("ada");
    queue.enqueue(a).await;
    expect(&a_peer, "size").await;
    answer(&a_peer, true);
    tokio::time::sleep(Duration::from_secs(1)).await;

    let (b, b_peer) = seat("bob");
    let check = spawn_enqueue(&queue, b);
    assert_eq!(after_sizes(&b_peer).await["type"], "found");
    answer(&b_peer, true);

    // Ada's early answer does not count, so she times out.
    assert_eq!(after_sizes(&a_peer).await["type"], "found");
    let timed_out = expect(&a_peer, "announcement").await;
    assert!(timed_out["announcement"].as_str().unwrap().contains("timed out"));
    check.await.unwrap();

    expect(&b_peer, "announcement").await;
    assert_eq!(expect(&b_peer, "size").await["size"], 1);
}

#[tokio::test(start_paused = true)]
async fn test_missing_opening_cancels_and_recycles() {
    let rooms = registry();
    let config = QueueConfig::default().with_player_limit(2);
    let queue = queue_with(config, Arc::clone(&rooms), StaticOpenings::new(Vec::new()));
    let (peers, _, check) = fill(&queue, &["a", "b"]).await;

    for peer in &peers {
        after_sizes(peer).await;
        answer(peer, true);
    }
    for peer in &peers {
        let cancelled = expect(peer, "announcement").await;
        assert_eq!(cancelled["success"], false);
        assert!(cancelled["announcement"].as_str().unwrap().contains("cancelled"));
    }

    // After the pause they are matched again.
    for peer in &peers {
        assert_eq!(after_sizes(peer).await["type"], "found");
    }
    assert!(rooms.is_empty());
    drop(peers);
    check.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_room_creation_failure_cancels_the_match() {
    let config = QueueConfig::default().with_player_limit(2);
    let queue = queue_with(config, Arc::new(NoRooms), StaticOpenings::default());
    let (peers, _, check) = fill(&queue, &["a", "b"]).await;

    for peer in &peers {
        after_sizes(peer).await;
        answer(peer, true);
    }
    for peer in &peers {
        let cancelled = expect(peer, "announcement").await;
        assert_eq!(cancelled["success"], false);
        assert!(cancelled["announcement"].as_str().unwrap().contains("game room"));
    }
    drop(peers);
    check.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_dead_connections_are_pruned_on_enqueue() {
    let queue = queue_with(QueueConfig::default(), registry(), StaticOpenings::default());

    let (a, a_peer) = seat("ada");
    queue.enqueue(a).await;
    drop(a_peer);
    tokio::time::sleep(Duration::from_millis(10)).await;

    let (b, b_peer) = seat("bob");
    queue.enqueue(b).await;
    assert_eq!(expect(&b_peer, "size").await, json!({"size": 1}));
    assert_eq!(queue.waiting(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_batches_are_checked_concurrently() {
    let rooms = registry();
    let config = QueueConfig::default().with_player_limit(2);
    let queue = queue_with(config, Arc::clone(&rooms), StaticOpenings::default());

    // First batch is mid-check...
    let (first, _, first_check) = fill(&queue, &["a", "b"]).await;
    for peer in &first {
        assert_eq!(after_sizes(peer).await["type"], "found");
    }
    // ...while a second one forms and gets checked.
    let (second, _, second_check) = fill(&queue, &["c", "d"]).await;
    assert_eq!(expect(&second[0], "size").await["size"], 1);
    for peer in &second {
        assert_eq!(after_sizes(peer).await["type"], "found");
    }

    for peer in first.iter().chain(&second) {
        answer(peer, true);
    }
    first_check.await.unwrap();
    second_check.await.unwrap();
    assert_eq!(rooms.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_recycled_players_wait_in_queue_during_next_check() {
    let rooms = registry();
    let config = QueueConfig::default().with_player_limit(3);
    let queue = queue_with(config, Arc::clone(&rooms), StaticOpenings::default());

    let (first, _, check) = fill(&queue, &["a", "b", "c"]).await;
    for peer in &first {
        assert_eq!(after_sizes(peer).await["type"], "found");
    }
    let (d, d_peer) = seat("d");
    queue.enqueue(d).await;
    let (e, e_peer) = seat("e");
    queue.enqueue(e).await;

    answer(&first[0], true);
    answer(&first[1], true);
    answer(&first[2], false);

    // a completes {d, e, a}; b is back in the queue while that is checked.
    assert_eq!(expect(&first[0], "announcement").await["success"], false);
    assert_eq!(after_sizes(&first[0]).await["type"], "found");
    expect(&first[1], "announcement").await;
    assert_eq!(expect(&first[1], "size").await, json!({"size": 1}));
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(queue.waiting(), 1);

    for peer in [&d_peer, &e_peer] {
        assert_eq!(after_sizes(peer).await["type"], "found");
    }
    for peer in [&d_peer, &e_peer, &first[0]] {
        answer(peer, true);
    }
    check.await.unwrap();
    assert_eq!(rooms.len(), 1);
    assert_eq!(queue.waiting(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_queue_size_notices_never_go_backwards() {
    let config = QueueConfig::default().with_player_limit(50);
    let queue = queue_with(config, registry(), StaticOpenings::default());

    let (first, first_peer) = seat("first");
    queue.enqueue(first).await;

    let mut peers = Vec::new();
    let mut joins = Vec::new();
    for i in 0..20 {
        let (seat, peer) = seat(&format!("p{i}"));
        peers.push(peer);
        joins.push(spawn_enqueue(&queue, seat));
    }
    for join in joins {
        join.await.unwrap();
    }
    assert_eq!(queue.waiting(), 21);

    let mut last = 0;
    while let Ok(Some(frame)) =
        tokio::time::timeout(Duration::from_millis(100), first_peer.recv()).await
    {
        let value: Value = serde_json::from_slice(&frame).unwrap();
        let size = value["message"]["size"].as_u64().unwrap();
        assert!(size > last, "size {size} arrived after {last}");
        last = size;
    }
    assert_eq!(last, 21);
}
