//! Connection handler driven over in-memory channels.

use std::time::Duration;
use strictly_duel::{
    ClientMessage, Mark, MemoryChannel, MemoryClient, Registry, SeatId, ServerMessage, Square,
    Winner, handle_connection,
};
use tokio::task::JoinHandle;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

fn connect(registry: &Registry) -> (MemoryClient, JoinHandle<()>) {
    let (channel, client) = MemoryChannel::pair();
    let task = tokio::spawn(handle_connection(channel, registry.clone()));
    (client, task)
}

async fn next(client: &mut MemoryClient) -> ServerMessage {
    timeout(WAIT, client.recv())
        .await
        .expect("message within timeout")
        .expect("channel open")
}

type Seated = (MemoryClient, JoinHandle<()>);

async fn seated_pair(registry: &Registry) -> (Seated, Seated) {
    let (mut x, x_task) = connect(registry);
    assert_eq!(next(&mut x).await, ServerMessage::Start { symbol: Mark::X });
    let (mut o, o_task) = connect(registry);
    assert_eq!(next(&mut o).await, ServerMessage::Start { symbol: Mark::O });
    assert!(matches!(next(&mut o).await, ServerMessage::Update { my_turn: false, .. }));
    assert!(matches!(next(&mut x).await, ServerMessage::Update { my_turn: true, .. }));
    ((x, x_task), (o, o_task))
}

async fn wait_until_released(registry: &Registry, seat: SeatId) {
    let session = registry.current().expect("session exists");
    timeout(WAIT, async {
        while session.occupant(seat).is_some() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("seat released");
}

#[tokio::test]
async fn test_third_connection_gets_full_and_is_closed() {
    let registry = Registry::new();
    let ((_x, _), (_o, _)) = seated_pair(&registry).await;

    let (mut third, task) = connect(&registry);
    assert_eq!(next(&mut third).await, ServerMessage::Full);
    timeout(WAIT, task).await.expect("task ends").expect("no panic");
    assert_eq!(third.recv().await, None);
}

#[tokio::test]
async fn test_moves_are_broadcast_to_both() {
    let registry = Registry::new();
    let ((mut x, _), (mut o, _)) = seated_pair(&registry).await;

    x.send(&ClientMessage::move_to(4)).expect("sent");
    for (client, my_turn) in [(&mut x, false), (&mut o, true)] {
        match next(client).await {
            ServerMessage::Update { board, my_turn: turn } => {
                assert_eq!(turn, my_turn);
                assert_eq!(board.squares()[4], Square::Occupied(Mark::X));
            }
            other => panic!("expected update, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_illegal_moves_are_silent() {
    let registry = Registry::new();
    let ((mut x, _), (mut o, _)) = seated_pair(&registry).await;

    x.send(&ClientMessage::move_to(1)).expect("sent");
    next(&mut x).await;
    next(&mut o).await;

    // All from one connection, so the task handles them in order: the legal
    // move at the end proves the connection survived and that nothing before
    // it produced a message.
    o.send(&ClientMessage::move_to(1)).expect("sent");
    o.send_raw(r#"{"type":"move","index":"12"}"#).expect("sent");
    o.send_raw(r#"{"type":"move"}"#).expect("sent");
    o.send_raw(r#"{"type":"wave"}"#).expect("sent");
    o.send(&ClientMessage::move_to(0)).expect("sent");

    match next(&mut o).await {
        ServerMessage::Update { board, my_turn } => {
            assert!(!my_turn);
            assert_eq!(board.squares()[0], Square::Occupied(Mark::O));
            assert_eq!(board.squares()[1], Square::Occupied(Mark::X));
        }
        other => panic!("expected update, got {other:?}"),
    }
    assert!(matches!(next(&mut x).await, ServerMessage::Update { my_turn: true, .. }));
    assert_eq!(x.try_recv(), None);
}

#[tokio::test]
async fn test_win_is_announced_with_final_board() {
    let registry = Registry::new();
    let ((mut x, _), (mut o, _)) = seated_pair(&registry).await;

    for (n, index) in [0usize, 3, 1, 4].into_iter().enumerate() {
        let mover = if n % 2 == 0 { &x } else { &o };
        mover.send(&ClientMessage::move_to(index)).expect("sent");
        next(&mut x).await;
        next(&mut o).await;
    }
    x.send(&ClientMessage::move_to(2)).expect("sent");

    for client in [&mut x, &mut o] {
        match next(client).await {
            ServerMessage::End { board, winner } => {
                assert_eq!(winner, Winner::Mark(Mark::X));
                assert!(strictly_duel::check_win(&board, Mark::X));
            }
            other => panic!("expected end, got {other:?}"),
        }
    }

    x.send(&ClientMessage::Restart).expect("sent");
    assert!(matches!(next(&mut x).await, ServerMessage::Update { my_turn: true, .. }));
    assert!(matches!(next(&mut o).await, ServerMessage::Update { my_turn: false, .. }));
}

#[tokio::test]
async fn test_disconnect_frees_seat_without_notice() {
    let registry = Registry::new();
    let ((mut x, _), (mut o, o_task)) = seated_pair(&registry).await;

    o.close();
    timeout(WAIT, o_task).await.expect("task ends").expect("no panic");
    wait_until_released(&registry, SeatId::Second).await;
    assert_eq!(x.try_recv(), None);

    let (mut newcomer, _) = connect(&registry);
    assert_eq!(next(&mut newcomer).await, ServerMessage::Start { symbol: Mark::O });
    assert!(matches!(next(&mut x).await, ServerMessage::Update { my_turn: true, .. }));
}

#[tokio::test]
async fn test_malformed_frame_drops_connection() {
    let registry = Registry::new();
    let ((_x, _), (o, o_task)) = seated_pair(&registry).await;

    o.send_raw("this is not json").expect("sent");
    timeout(WAIT, o_task).await.expect("task ends").expect("no panic");
    wait_until_released(&registry, SeatId::Second).await;
}

#[tokio::test]
async fn test_shapeless_frames_keep_the_seat() {
    let registry = Registry::new();
    let ((mut x, x_task), (mut o, _)) = seated_pair(&registry).await;

    x.send_raw("{}").expect("sent");
    x.send_raw(r#"{"index":"1"}"#).expect("sent");
    x.send_raw(r#"{"type":null}"#).expect("sent");
    x.send_raw(r#"{"type":"move","index":null}"#).expect("sent");
    x.send(&ClientMessage::move_to(4)).expect("sent");

    match next(&mut x).await {
        ServerMessage::Update { board, my_turn } => {
            assert!(!my_turn);
            assert_eq!(board.squares()[4], Square::Occupied(Mark::X));
            assert_eq!(board.squares()[1], Square::Empty);
        }
        other => panic!("expected update, got {other:?}"),
    }
    assert!(matches!(next(&mut o).await, ServerMessage::Update { my_turn: true, .. }));
    assert!(!x_task.is_finished());
    let session = registry.current().expect("session exists");
    assert!(session.occupant(SeatId::First).is_some());
}
